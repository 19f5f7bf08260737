//! Shared data model for Sparrow: the types that flow between the loader,
//! the checks controller, the result store, the target manager and the HTTP API.
//!
//! Nothing in this crate talks to the network or the filesystem; it only
//! defines the wire-stable shapes (§3, §6 of the spec) and the schema/error
//! plumbing shared by every other crate.

pub mod config;
pub mod error;
pub mod registry_file;
pub mod result;
pub mod schema;
pub mod target;

pub use config::{CheckKind, RetryConfig, RuntimeConfig, TracerouteConfig, TracerouteTarget, UrlCheckConfig};
pub use error::CoreError;
pub use registry_file::RegistryFile;
pub use result::{Result as CheckResult, ResultRecord};
pub use schema::CheckSchema;
pub use target::GlobalTarget;
