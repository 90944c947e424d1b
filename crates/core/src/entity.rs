//! Entity trait: identity + state + lifecycle.
//!
//! Aggregates, projections and process managers are all entities from the
//! storage point of view: an identifier, a state payload, a version and a
//! pair of lifecycle flags.

use serde::{Deserialize, Serialize};

/// Lifecycle flags every stored entity carries.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LifecycleFlags {
    pub archived: bool,
    pub deleted: bool,
}

impl LifecycleFlags {
    pub fn archived() -> Self {
        Self {
            archived: true,
            deleted: false,
        }
    }

    pub fn deleted() -> Self {
        Self {
            archived: false,
            deleted: true,
        }
    }

    /// Neither archived nor deleted.
    pub fn is_active(&self) -> bool {
        !self.archived && !self.deleted
    }
}

/// Entity marker + minimal interface.
pub trait Entity: Send + Sync + 'static {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug + Send + Sync + 'static;

    /// State payload (the part described by state columns).
    type State: Send + Sync + 'static;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;

    /// Returns the current state payload.
    fn state(&self) -> &Self::State;

    /// Monotonically increasing version of the entity state.
    fn version(&self) -> u64;

    fn lifecycle(&self) -> LifecycleFlags {
        LifecycleFlags::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_flags_are_active() {
        assert!(LifecycleFlags::default().is_active());
        assert!(!LifecycleFlags::archived().is_active());
        assert!(!LifecycleFlags::deleted().is_active());
    }
}
