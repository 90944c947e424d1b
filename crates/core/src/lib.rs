//! `keel-core`: message and entity building blocks shared by the bus and the record store.
//!
//! This crate contains **pure** primitives (no IO, no logging, no locking).

pub mod entity;
pub mod error;
pub mod id;
pub mod message;

pub use entity::{Entity, LifecycleFlags};
pub use error::{DomainError, DomainResult};
pub use id::{EntityId, MessageId};
pub use message::{Message, MessageClass, MessageKind, Origin};
