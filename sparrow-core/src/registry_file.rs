//! [`RegistryFile`]: the unit the remote interactor reads and writes (§3, §6).

use serde::{Deserialize, Serialize};

use crate::target::GlobalTarget;

/// One file in the peer registry, named `{name}.json` in the remote store.
///
/// `authorName`/`authorEmail`/`commitMessage` are commit metadata for
/// backends that version their writes (the git and GitLab interactors);
/// backends without a commit concept simply ignore them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryFile {
    /// File stem, also the peer's Sparrow instance name.
    pub name: String,
    /// Commit author name, for backends that record one.
    #[serde(rename = "authorName")]
    pub author_name: String,
    /// Commit author email, for backends that record one.
    #[serde(rename = "authorEmail")]
    pub author_email: String,
    /// Commit message, for backends that record one.
    #[serde(rename = "commitMessage")]
    pub commit_message: String,
    /// The peer entry itself.
    pub content: GlobalTarget,
}

impl RegistryFile {
    /// The path/key this entry is stored under in the remote store.
    pub fn file_name(&self) -> String {
        format!("{}.json", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn file_name_appends_json_suffix() {
        let rf = RegistryFile {
            name: "sparrow-eu-1".into(),
            author_name: "sparrow".into(),
            author_email: "sparrow@example.com".into(),
            commit_message: "update sparrow-eu-1".into(),
            content: GlobalTarget {
                url: "https://sparrow-eu-1.example".into(),
                last_seen: Utc::now(),
            },
        };
        assert_eq!(rf.file_name(), "sparrow-eu-1.json");
    }

    #[test]
    fn round_trips_through_json_with_wire_field_names() {
        let rf = RegistryFile {
            name: "sparrow-eu-1".into(),
            author_name: "sparrow".into(),
            author_email: "sparrow@example.com".into(),
            commit_message: "update sparrow-eu-1".into(),
            content: GlobalTarget {
                url: "https://sparrow-eu-1.example".into(),
                last_seen: Utc::now(),
            },
        };
        let v = serde_json::to_value(&rf).unwrap();
        assert!(v.get("authorName").is_some());
        assert!(v.get("commitMessage").is_some());
        let back: RegistryFile = serde_json::from_value(v).unwrap();
        assert_eq!(rf, back);
    }
}
