pub mod control;
pub mod control_client;
pub mod options;
pub mod orchestrator;
pub mod retry;

pub use control::TransportControl;
pub use control_client::ControlChannelClient;
pub use options::TransportOptions;
pub use orchestrator::{TransportOrchestrator, TransportOrchestratorDeps};
pub use retry::RetryScheduler;
