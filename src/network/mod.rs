mod hub;
mod message;

use std::fmt::Display;

pub use hub::{BroadcastHub, DEFAULT_PORT};
pub use message::Message;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeerId(pub u32);

impl Display for PeerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "peer #{}", self.0)
    }
}

/// Outbound side of the broadcast channel, as seen from inside a callback.
pub trait Transport {
    fn broadcast(&mut self, text: &str);
    fn send_to(&mut self, peer: PeerId, text: &str);
    /// Stop the event loop once the current callback returns.
    fn request_stop(&mut self);
}

/// Receives the events of the broadcast channel, one at a time.
pub trait MessageSink {
    type Error;

    fn on_message(&mut self, line: &str, transport: &mut dyn Transport) -> Result<(), Self::Error>;
    fn on_new_connection(&mut self, peer: PeerId, transport: &mut dyn Transport);
}
