//! WebSocket fan-out.
//!
//! Three logical channels share one [`ConnectionHub`]:
//! - `alerts`: alert lifecycle events filtered by subscription tags
//! - `realtime`: topic-based pushes
//! - `notifications`: urgent alerts routed by user and role
//!
//! In dedicated mode only `/ws/alerts` is served.

pub mod connection;
pub mod hub;
pub mod protocol;

pub use connection::{ChannelKind, ConnectionInfo, WILDCARD};
pub use hub::{ConnectionHub, ADMIN_ROLE};
pub use protocol::{parse_frame, InboundFrame, Outbound, ProtocolError};
