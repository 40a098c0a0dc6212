use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::ProfileUid;

/// One `(level, message)` pair produced while enhancing a profile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogLine(pub String, pub String);

/// Enhancement logs keyed by profile uid. Informational only.
pub type RuntimeLogs = BTreeMap<ProfileUid, Vec<LogLine>>;
