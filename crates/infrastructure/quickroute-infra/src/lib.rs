pub mod controller;
pub mod helper;
pub mod profiles;
pub mod state;

// Re-exports for convenience
pub use controller::{ControllerClient, ControllerError};
pub use helper::{HelperCommands, HelperError, HelperService};
pub use profiles::FileProfiles;
pub use state::{PersistedState, StateFile, StateFileError};
