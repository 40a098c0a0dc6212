use serde::{Deserialize, Serialize};

/// Persisted application switches that the orchestration core reads or drives.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppFlags {
    #[serde(default)]
    pub enable_service_mode: bool,
    #[serde(default)]
    pub enable_tun_mode: bool,
    #[serde(default)]
    pub enable_system_proxy: bool,
    #[serde(default)]
    pub auto_close_connection: bool,
}

impl AppFlags {
    /// Quick-connect is on only when all three routing switches are on together.
    pub fn quick_connected(&self) -> bool {
        self.enable_service_mode && self.enable_tun_mode && self.enable_system_proxy
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FlagsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_service_mode: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_tun_mode: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_system_proxy: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_close_connection: Option<bool>,
}

impl FlagsPatch {
    pub fn service_mode(on: bool) -> Self {
        Self {
            enable_service_mode: Some(on),
            ..Default::default()
        }
    }

    pub fn tun_mode(on: bool) -> Self {
        Self {
            enable_tun_mode: Some(on),
            ..Default::default()
        }
    }

    pub fn system_proxy(on: bool) -> Self {
        Self {
            enable_system_proxy: Some(on),
            ..Default::default()
        }
    }

    pub fn auto_close_connection(on: bool) -> Self {
        Self {
            auto_close_connection: Some(on),
            ..Default::default()
        }
    }

    pub fn apply_to(&self, flags: &mut AppFlags) {
        if let Some(v) = self.enable_service_mode {
            flags.enable_service_mode = v;
        }
        if let Some(v) = self.enable_tun_mode {
            flags.enable_tun_mode = v;
        }
        if let Some(v) = self.enable_system_proxy {
            flags.enable_system_proxy = v;
        }
        if let Some(v) = self.auto_close_connection {
            flags.auto_close_connection = v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_touches_only_set_fields() {
        let mut flags = AppFlags {
            auto_close_connection: true,
            ..Default::default()
        };
        FlagsPatch::tun_mode(true).apply_to(&mut flags);
        assert!(flags.enable_tun_mode);
        assert!(flags.auto_close_connection);
        assert!(!flags.quick_connected());
    }

    #[test]
    fn empty_fields_are_not_serialized() {
        let json = serde_json::to_string(&FlagsPatch::system_proxy(false)).unwrap();
        assert_eq!(json, r#"{"enable_system_proxy":false}"#);
    }
}
