//! Connection admission and the live connection registry.
//!
//! - `gate` -- `PresenceGate` authenticating handshake tokens
//! - `registry` -- `ConnectionRegistry` mapping users to their live connection

pub mod gate;
pub mod registry;

pub use gate::{IdentityResolver, PresenceGate};
pub use registry::{ConnectionId, ConnectionRegistry, Registration, RegistryError};
