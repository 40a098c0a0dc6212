use serde::{Deserialize, Serialize};

pub mod engine;
pub mod flags;
pub mod logs;
pub mod mode;
pub mod service;

pub use engine::{EngineConfig, EnginePatch};
pub use flags::{AppFlags, FlagsPatch};
pub use logs::{LogLine, RuntimeLogs};
pub use mode::{InvalidMode, RoutingMode};
pub use service::ServiceStatus;

pub type ProfileUid = String;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(from = "String", into = "String")]
pub enum ProfileKind {
    Local,
    Remote,
    /// Merge/script helpers and anything else the backend stores next to real
    /// profiles. The raw type is kept so a save writes it back unchanged.
    Other(String),
}

impl ProfileKind {
    /// Local and remote profiles are the ones a user can route traffic through.
    pub fn is_selectable(&self) -> bool {
        matches!(self, ProfileKind::Local | ProfileKind::Remote)
    }

    pub fn as_str(&self) -> &str {
        match self {
            ProfileKind::Local => "local",
            ProfileKind::Remote => "remote",
            ProfileKind::Other(raw) => raw,
        }
    }
}

impl From<String> for ProfileKind {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "local" => ProfileKind::Local,
            "remote" => ProfileKind::Remote,
            _ => ProfileKind::Other(raw),
        }
    }
}

impl From<ProfileKind> for String {
    fn from(kind: ProfileKind) -> Self {
        match kind {
            ProfileKind::Other(raw) => raw,
            known => known.as_str().to_owned(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Profile {
    pub uid: ProfileUid,
    #[serde(rename = "type")]
    pub kind: ProfileKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<i64>,
    /// Metadata the orchestration core carries around without interpreting.
    #[serde(default, flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Profile {
    pub fn new(uid: impl Into<ProfileUid>, kind: ProfileKind) -> Self {
        Self {
            uid: uid.into(),
            kind,
            name: None,
            file: None,
            url: None,
            updated: None,
            extra: serde_json::Map::new(),
        }
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.uid)
    }
}

/// Ordered profiles plus the `current` pointer.
///
/// Order is meaningful: it is the display order and what drag-and-drop persists.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProfileCollection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<ProfileUid>,
    #[serde(default)]
    pub items: Vec<Profile>,
}

impl ProfileCollection {
    pub fn new(items: Vec<Profile>, current: Option<ProfileUid>) -> Self {
        let mut collection = Self { current, items };
        collection.normalize();
        collection
    }

    /// Drops a `current` pointer that is empty or references a missing profile.
    pub fn normalize(&mut self) {
        let dangling = match self.current.as_deref() {
            Some(uid) => uid.is_empty() || !self.contains(uid),
            None => false,
        };
        if dangling {
            self.current = None;
        }
    }

    /// Current uid, or `""` when there is no active profile.
    pub fn current_uid(&self) -> &str {
        match self.current.as_deref() {
            Some(uid) if self.contains(uid) => uid,
            _ => "",
        }
    }

    pub fn active(&self) -> Option<&Profile> {
        self.current.as_deref().and_then(|uid| self.get(uid))
    }

    pub fn is_current(&self, uid: &str) -> bool {
        !uid.is_empty() && self.current_uid() == uid
    }

    pub fn get(&self, uid: &str) -> Option<&Profile> {
        self.items.iter().find(|p| p.uid == uid)
    }

    pub fn contains(&self, uid: &str) -> bool {
        self.position(uid).is_some()
    }

    pub fn position(&self, uid: &str) -> Option<usize> {
        self.items.iter().position(|p| p.uid == uid)
    }

    pub fn selectable(&self) -> impl Iterator<Item = &Profile> {
        self.items.iter().filter(|p| p.kind.is_selectable())
    }

    pub fn has_selectable(&self) -> bool {
        self.selectable().next().is_some()
    }

    pub fn first_remote(&self) -> Option<&Profile> {
        self.items.iter().find(|p| p.kind == ProfileKind::Remote)
    }

    pub fn uids(&self) -> Vec<ProfileUid> {
        self.items.iter().map(|p| p.uid.clone()).collect()
    }

    /// Moves `source` to the index `target` occupied before the move.
    ///
    /// Returns `false` (and leaves the order untouched) when either uid is
    /// missing or both are the same profile.
    pub fn move_to(&mut self, source: &str, target: &str) -> bool {
        if source == target {
            return false;
        }
        let (Some(from), Some(to)) = (self.position(source), self.position(target)) else {
            return false;
        };
        let item = self.items.remove(from);
        self.items.insert(to, item);
        true
    }

    /// Removes a profile, clearing `current` when it pointed at it.
    pub fn remove(&mut self, uid: &str) -> Option<Profile> {
        let ix = self.position(uid)?;
        let removed = self.items.remove(ix);
        if self.current.as_deref() == Some(uid) {
            self.current = None;
        }
        Some(removed)
    }
}
