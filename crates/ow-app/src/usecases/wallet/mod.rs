pub mod comms;
pub mod coordinator;

pub use comms::CommsConfigFactory;
pub use coordinator::{WalletLifecycleCoordinator, WalletLifecycleCoordinatorDeps};
