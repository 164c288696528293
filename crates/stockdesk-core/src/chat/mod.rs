//! Chat delivery for StockDesk.
//!
//! - `partners` -- `PartnerResolver`, who may chat with whom
//! - `coordinator` -- `DeliveryCoordinator`, persist-then-push for chat and read events
//! - `session` -- `ConnectionSession`, the per-connection state machine

pub mod coordinator;
pub mod partners;
pub mod session;

pub use coordinator::DeliveryCoordinator;
pub use partners::PartnerResolver;
pub use session::{ConnectionSession, InboundFrame, SessionPhase};
