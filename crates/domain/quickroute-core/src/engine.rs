use serde::{Deserialize, Serialize};

use crate::mode::{InvalidMode, RoutingMode};

/// Subset of the engine's running configuration the core looks at.
///
/// `mode` is kept as the raw reported string so an out-of-range value can be
/// observed and corrected instead of failing deserialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    #[serde(default)]
    pub mode: String,
    #[serde(default, flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl EngineConfig {
    pub fn with_mode(mode: impl Into<String>) -> Self {
        Self {
            mode: mode.into(),
            extra: serde_json::Map::new(),
        }
    }

    pub fn routing_mode(&self) -> Result<RoutingMode, InvalidMode> {
        self.mode.parse()
    }

    pub fn mode_lowercase(&self) -> String {
        self.mode.trim().to_ascii_lowercase()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EnginePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<RoutingMode>,
}

impl EnginePatch {
    pub fn mode(mode: RoutingMode) -> Self {
        Self { mode: Some(mode) }
    }
}
