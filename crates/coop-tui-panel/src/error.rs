//! Error taxonomy of the panel.
//!
//! Everything here is non-fatal once the UI is running: errors become result
//! messages at the command boundary and end up as log lines.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PanelError {
    /// Any backend failure.
    #[error("provider error: {0}")]
    Provider(String),

    /// A lookup target disappeared.
    #[error("{0} not found")]
    NotFound(String),

    /// No external terminal or VNC viewer on this host.
    #[error("unavailable: {0}")]
    ResourceUnavailable(String),

    /// Settings could not be read or written.
    #[error("config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(String),
}

impl PanelError {
    pub fn provider(message: impl Into<String>) -> Self {
        PanelError::Provider(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, PanelError::NotFound(_))
    }
}

impl From<std::io::Error> for PanelError {
    fn from(err: std::io::Error) -> Self {
        PanelError::Io(err.to_string())
    }
}

impl From<toml::de::Error> for PanelError {
    fn from(err: toml::de::Error) -> Self {
        PanelError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for PanelError {
    fn from(err: toml::ser::Error) -> Self {
        PanelError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(PanelError::NotFound("alpha".into()).to_string(), "alpha not found");
        assert_eq!(
            PanelError::provider("boom").to_string(),
            "provider error: boom"
        );
        assert!(PanelError::NotFound("x".into()).is_not_found());
        assert!(!PanelError::Io("x".into()).is_not_found());
    }
}
