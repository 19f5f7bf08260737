//! Top-level error types for the binary: config loading and the
//! shutdown-time error aggregation the orchestrator performs (§7).

use thiserror::Error;

/// Failures while assembling [`crate::config::SparrowConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}

/// A fatal error from one managed component, tagged with its name.
#[derive(Debug, Error)]
#[error("{component}: {message}")]
pub struct ComponentError {
    pub component: String,
    pub message: String,
}

/// Aggregates every component error observed during shutdown, mirroring
/// `sparrow-client`'s layered error enums but flat, since the orchestrator
/// only needs to report these, never match on them.
#[derive(Debug, Error, Default)]
#[error("{} component error(s) during shutdown", self.0.len())]
pub struct ShutdownErrors(pub Vec<ComponentError>);

impl ShutdownErrors {
    pub fn push(&mut self, component: impl Into<String>, message: impl std::fmt::Display) {
        self.0.push(ComponentError {
            component: component.into(),
            message: message.to_string(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_accumulates_errors() {
        let mut errors = ShutdownErrors::default();
        assert!(errors.is_empty());
        errors.push("loader", "connection refused");
        assert!(!errors.is_empty());
        assert_eq!(errors.0[0].component, "loader");
    }
}
