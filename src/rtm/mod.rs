// Public API modules
pub mod message;
pub mod options;

// External collaborator seams
pub mod session;
pub mod transport;

// Internal modules
mod queue;
mod connection;

// Client implementation
mod client;

#[cfg(test)]
pub(crate) mod testutil;

// Re-export public types
pub use message::{Message, TYPE_HELLO, TYPE_MESSAGE, TYPE_NONE, TYPE_RECONNECT_URL};
pub use options::RtmOptions;
pub use session::{HttpSessionNegotiator, SessionNegotiator};
pub use transport::{Connector, Frame, Transport, WsConnector};

// Re-export core types
pub use queue::MessageQueue;
pub use connection::ConnectionManager;
pub use client::RtmClient;
