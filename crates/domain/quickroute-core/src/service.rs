use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of the privileged helper service as last reported by the OS.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    #[serde(alias = "uninstall")]
    Uninstalled,
    Installing,
    Installed,
    Active,
    #[default]
    #[serde(other)]
    Unknown,
}

impl ServiceStatus {
    /// `Unknown` counts as not installed when choosing between install and toggle.
    pub fn is_installed(self) -> bool {
        !matches!(self, ServiceStatus::Uninstalled | ServiceStatus::Unknown)
    }

    pub fn is_active(self) -> bool {
        self == ServiceStatus::Active
    }

    pub fn parse_lossy(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "uninstall" | "uninstalled" => ServiceStatus::Uninstalled,
            "installing" => ServiceStatus::Installing,
            "installed" => ServiceStatus::Installed,
            "active" => ServiceStatus::Active,
            _ => ServiceStatus::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ServiceStatus::Uninstalled => "uninstalled",
            ServiceStatus::Installing => "installing",
            ServiceStatus::Installed => "installed",
            ServiceStatus::Active => "active",
            ServiceStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
