//! ---
//! rra_section: "02-messaging-ipc-data-model"
//! rra_subsection: "module"
//! rra_type: "source"
//! rra_scope: "code"
//! rra_description: "Cross-frame envelope schema and messaging channel."
//! rra_version: "v0.0.0-prealpha"
//! rra_owner: "tbd"
//! ---
use serde::{Deserialize, Serialize};

/// Wildcard target origin.
pub const ANY_ORIGIN: &str = "*";

/// Which origin a channel posts to and accepts messages from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OriginPolicy {
    /// Post with `*` and accept messages from anywhere.
    Any,
    /// Post to and accept messages from exactly this origin.
    Exact(String),
}

impl OriginPolicy {
    /// Restrict the channel to `origin`. A trailing slash is ignored.
    pub fn exact(origin: impl Into<String>) -> Self {
        let origin = origin.into();
        OriginPolicy::Exact(origin.trim_end_matches('/').to_owned())
    }

    /// Target origin handed to `post_message`.
    pub fn target_origin(&self) -> &str {
        match self {
            OriginPolicy::Any => ANY_ORIGIN,
            OriginPolicy::Exact(origin) => origin,
        }
    }

    /// Whether a message from `origin` may be dispatched.
    pub fn accepts(&self, origin: &str) -> bool {
        match self {
            OriginPolicy::Any => true,
            OriginPolicy::Exact(expected) => expected == origin,
        }
    }
}

impl From<Option<String>> for OriginPolicy {
    fn from(origin: Option<String>) -> Self {
        match origin {
            Some(origin) => OriginPolicy::exact(origin),
            None => OriginPolicy::Any,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_policy_filters_origins() {
        let policy = OriginPolicy::exact("https://editor.example.org/");
        assert_eq!(policy.target_origin(), "https://editor.example.org");
        assert!(policy.accepts("https://editor.example.org"));
        assert!(!policy.accepts("https://evil.example.org"));
        assert!(!policy.accepts("null"));
    }

    #[test]
    fn any_policy_uses_wildcard() {
        let policy = OriginPolicy::from(None);
        assert_eq!(policy.target_origin(), "*");
        assert!(policy.accepts("https://anything.example.org"));
    }
}
