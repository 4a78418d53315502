//! # Adapters Layer (Hexagonal Architecture)
//!
//! In-process implementations of the outbound ports.

mod clock;
mod loopback;
mod vault;

pub use clock::{ManualClock, SystemClock};
pub use loopback::{
    BridgeTransfer, LoopbackBridgeChannel, LoopbackMessageChannel, OutboundMessage,
};
pub use vault::InMemoryVault;
