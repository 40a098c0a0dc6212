use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Routing mode of the proxy engine. Exactly one is active at any time.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RoutingMode {
    #[default]
    Rule,
    Global,
    Direct,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown routing mode '{0}' (expected rule, global or direct)")]
pub struct InvalidMode(pub String);

impl RoutingMode {
    pub const ALL: [RoutingMode; 3] = [RoutingMode::Rule, RoutingMode::Global, RoutingMode::Direct];

    pub fn as_str(self) -> &'static str {
        match self {
            RoutingMode::Rule => "rule",
            RoutingMode::Global => "global",
            RoutingMode::Direct => "direct",
        }
    }
}

impl fmt::Display for RoutingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoutingMode {
    type Err = InvalidMode;

    /// Case-insensitive; engines report both `Rule` and `rule`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        RoutingMode::ALL
            .into_iter()
            .find(|m| m.as_str() == lowered)
            .ok_or_else(|| InvalidMode(s.to_string()))
    }
}
