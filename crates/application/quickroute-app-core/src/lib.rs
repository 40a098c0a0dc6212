pub mod activation;
pub mod app_core;
pub mod domain;
pub mod error;
pub mod kernel;
pub mod mode;
pub mod ports;
pub mod profiles;
mod progress;
pub mod quick_connect;
pub mod service;

pub use activation::{ActivationOrchestrator, ActivationOutcome, ActivationRequest};
pub use app_core::*;
pub use domain::{ActivationPhase, ActivationRunId, Notice, NoticeLevel, UiState};
pub use error::{CoreError, ValidationError};
pub use kernel::{AppKernel, Backends, CommandOutcome, KernelOptions};
pub use mode::{ModeController, ModeOutcome};
pub use ports::*;
pub use profiles::ProfileStore;
pub use quick_connect::{QuickConnectOutcome, QuickConnectToggle, SagaReport, SagaStep, StepReport};
pub use service::{Platform, ServiceLifecycleManager, ServiceOutcome};
