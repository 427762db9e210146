//! Adapters for the Tor client: the child process and its control port.

pub mod control;
pub mod process;
pub mod protocol;

pub use control::{TorControlChannel, TorControlConnector};
pub use process::TorProcess;
pub use protocol::ControlProtocolError;
