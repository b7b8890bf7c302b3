//! Client context attached to every record
//!
//! Origin data is descriptive only. It is never used for authorization and
//! may be missing or wrong.

use serde::{Deserialize, Serialize};

/// Agent string used when the host application does not supply one
pub const DEFAULT_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Best-effort description of where an event came from
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Origin {
    /// Sanitized host label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// Client or request agent string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
}

impl Origin {
    /// Describe the current process: local hostname plus the given agent,
    /// or [`DEFAULT_AGENT`].
    pub fn detect(agent: Option<String>) -> Self {
        let host = hostname::get()
            .ok()
            .map(|h| sanitize_host(&h.to_string_lossy()))
            .filter(|h| !h.is_empty());

        Self {
            host,
            agent: Some(agent.unwrap_or_else(|| DEFAULT_AGENT.to_string())),
        }
    }

    pub fn with_agent(mut self, agent: impl Into<String>) -> Self {
        self.agent = Some(agent.into());
        self
    }
}

/// Keep alphanumerics, `-`, `_` and `.`; cap at 64 characters.
fn sanitize_host(hostname: &str) -> String {
    hostname
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.'))
        .take(64)
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_host() {
        assert_eq!(sanitize_host("ward-3.clinic.local"), "ward-3.clinic.local");
        assert_eq!(sanitize_host("front desk!"), "frontdesk");
        assert_eq!(sanitize_host(&"x".repeat(100)).len(), 64);
    }

    #[test]
    fn test_detect_uses_default_agent() {
        let origin = Origin::detect(None);
        assert_eq!(origin.agent.as_deref(), Some(DEFAULT_AGENT));
    }

    #[test]
    fn test_detect_keeps_supplied_agent() {
        let origin = Origin::detect(Some("reception-kiosk/2.1".into()));
        assert_eq!(origin.agent.as_deref(), Some("reception-kiosk/2.1"));
    }
}
