//! Remote-registry backends: the concrete git and GitLab implementations of
//! [`RemoteInteractor`], and the retry policy they share with the rest of
//! the system's HTTP calls.

pub mod error;
pub mod git;
pub mod gitlab;
pub mod interactor;
pub mod retry;

pub use error::{ClientError, InteractorError};
pub use git::{GitConfig, GitInteractor};
pub use gitlab::{GitlabConfig, GitlabInteractor};
pub use interactor::RemoteInteractor;
pub use retry::retry_with_backoff;
