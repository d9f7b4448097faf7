//! Timeline projection for smesher monitoring.
//!
//! Items (epochs, layers, PoET rounds and events) live in a keyed store and
//! carry one status per identity. The [`TimelineEngine`] keeps that store in
//! step with the clock and with an [`EventLog`](smeshmon_ledger::EventLog).

mod item;
mod store;
mod messages;
mod window;
mod projector;
mod engine;

pub use item::{Group, IdentityState, IdentityStatus, ItemKey, ItemKind, ItemStyle, TimelineItem};
pub use store::{ItemPatch, TimelineStore};
pub use messages::{MessageBoard, MessageKind, StatusMessage};
pub use window::{LookaheadWindow, LOOKAHEAD_EPOCHS};
pub use projector::{EligibilityBook, Projection, ProjectionContext, ProjectionError, Result};
pub use engine::{TimelineEngine, TimelineGroup};
