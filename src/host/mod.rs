//! Host-facing message surface: envelopes, command channel, and the stdio
//! bridge between the background context and its callers.

pub mod channel;
pub mod contract;
pub mod handler;
pub mod stdio;

pub use channel::{HostClient, HostServer, command_channel};
pub use contract::{CommandEnvelope, CommandName, EventEnvelope, PROTOCOL_VERSION, ResponseEnvelope};
pub use handler::{MemoryHostHandler, StoreHostHandler};
pub use stdio::run_stdio_bridge;
