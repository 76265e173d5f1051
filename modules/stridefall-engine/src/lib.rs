//! Territory conquest engine: turns a closed run path into a territory
//! claim, resolves it against the shared map, and produces one atomic
//! mutation plan plus notification intents.
//!
//! The engine owns decisions, not rows: all durable state lives behind the
//! [`ports::TerritoryStore`] trait, and every claim commits through a single
//! [`plan::ClaimPlan`].

pub mod effects;
pub mod memory;
pub mod normalize;
pub mod plan;
pub mod ports;
pub mod resolve;
pub mod rewards;
pub mod rules;
pub mod service;

pub use memory::{MemoryStore, RecordingNotifier};
pub use plan::{ApplyOutcome, ClaimAction, ClaimPlan, ClaimReport};
pub use ports::{Authenticator, Notifier, TerritoryStore};
pub use service::ClaimService;
