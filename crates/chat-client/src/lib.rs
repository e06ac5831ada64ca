//! Chat connection boundary: inbound message types and outbound transports.

mod console;
mod error;
mod transport;
mod types;

pub use console::{ConsoleReceiver, ConsoleTransport};
pub use error::ChatError;
pub use transport::ChatTransport;
pub use types::*;
