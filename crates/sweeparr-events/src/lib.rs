#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, missing_docs)]

//! Domain events emitted by the cleanup jobs and the bus that carries them.
//!
//! Publishing never fails: a bus without subscribers still records the event
//! in its replay journal.

pub mod bus;
pub mod payloads;

pub use bus::{EventBus, EventStream};
pub use payloads::{DEFAULT_REPLAY_CAPACITY, Event, EventEnvelope, EventId};
