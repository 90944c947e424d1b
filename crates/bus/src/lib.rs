//! `keel-bus` routes messages through validation, storage, dispatch and acknowledgment.
//!
//! ```text
//! post(messages) → filter → store → envelope → registry lookup → dispatchers
//!                                                        └─ none → dead letter
//!                    acknowledgments (on_next / on_error / on_completed) → poster
//! ```

pub mod ack;
pub mod bus;
pub mod channel;
pub mod command_bus;
pub mod config;
pub mod dispatcher;
pub mod envelope;
pub mod error;
pub mod event_bus;
pub mod filter;
pub mod registry;
pub mod store;

pub use ack::{AckObserver, MemoizingObserver};
pub use bus::{Bus, BusCore};
pub use channel::{ChannelDispatcher, Subscription};
pub use command_bus::CommandBus;
pub use config::{BusConfig, DeadLetterPolicy};
pub use dispatcher::{DispatchTargets, Dispatcher, FnDispatcher, TargetId};
pub use envelope::Envelope;
pub use error::{BusError, DispatchError, RegistrationError, StoreError};
pub use event_bus::EventBus;
pub use filter::{BusFilter, KindFilter, RejectEmpty};
pub use registry::{DispatcherRegistry, RegistryMode};
pub use store::{InMemoryMessageStore, MessageStore};
