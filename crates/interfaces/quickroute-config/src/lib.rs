//! Central configuration constants for timings and defaults.

use std::time::Duration;

/// Delay before an activation shows its progress indicator. Activations that
/// resolve faster than this never flicker the UI.
pub const ACTIVATING_DEBOUNCE: Duration = Duration::from_millis(100);

/// Delay between the immediate and the follow-up service status re-fetch.
pub const SERVICE_SETTLE_DELAY: Duration = Duration::from_millis(2000);

/// Delay between importing a remote profile and re-applying the enhanced config.
pub const IMPORT_ACTIVATE_DELAY: Duration = Duration::from_millis(2000);

/// Default interval for the background service status poller.
pub const DEFAULT_STATUS_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Default external controller address of the proxy engine.
pub const DEFAULT_CONTROLLER_URL: &str = "http://127.0.0.1:9097";

/// Default timeout applied by the HTTP controller client.
pub const DEFAULT_CONTROLLER_TIMEOUT: Duration = Duration::from_secs(10);

/// Notice display durations, in milliseconds.
pub const NOTICE_SUCCESS_MS: u64 = 1000;
pub const NOTICE_ERROR_MS: u64 = 3000;
pub const NOTICE_ACTIVATION_ERROR_MS: u64 = 4000;

/// Name of the state file kept in the state directory.
pub const STATE_FILE_NAME: &str = "quickroute.json";

/// Directory (inside the state directory) holding imported profile documents.
pub const PROFILES_DIR_NAME: &str = "profiles";
