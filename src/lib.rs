//! # RTM Bridge
//!
//! A persistent-connection client that bridges a bidirectional real-time
//! messaging WebSocket to two independent message queues: one for inbound
//! events, one for outbound events. Socket I/O runs on two background
//! threads (a receive loop and a send loop) so application code never
//! blocks on the wire.
//!
//! ```no_run
//! use rtm_bridge::{Message, RtmClient, RtmOptions, TYPE_MESSAGE};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = RtmClient::start("api-token", RtmOptions::new())?;
//!
//! client.send_message(
//!     Message::new(TYPE_MESSAGE)
//!         .with("channel", "C123")
//!         .with("text", "hello"),
//! );
//!
//! let received = client.read_message();
//! if !received.is_none() {
//!     println!("got: {:?}", received);
//! }
//! # Ok(())
//! # }
//! ```

mod rtm;
mod error;

pub use rtm::*;
pub use error::{RtmResult, RtmError};
