use std::collections::HashSet;

use sk_core::ActorId;
use tracing::debug;

use crate::host::WorldFreeze;

/// Tracks which actors may keep updating while combat is running.
///
/// The host asks [`should_tick`](WorldFreezer::should_tick) before running
/// an actor's real-time behavior.
#[derive(Debug, Clone, Default)]
pub struct WorldFreezer {
    active: bool,
    exempt: HashSet<ActorId>,
}

impl WorldFreezer {
    /// Create an inactive freezer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an actor may run its real-time behavior this tick.
    pub fn should_tick(&self, actor: ActorId) -> bool {
        !self.active || self.exempt.contains(&actor)
    }

    /// Number of exempt actors while frozen.
    pub fn exempt_count(&self) -> usize {
        self.exempt.len()
    }
}

impl WorldFreeze for WorldFreezer {
    fn freeze(&mut self, exempt: &HashSet<ActorId>) {
        self.active = true;
        self.exempt = exempt.clone();
        debug!(exempt = self.exempt.len(), "world frozen");
    }

    fn unfreeze(&mut self) {
        if self.active {
            debug!("world unfrozen");
        }
        self.active = false;
        self.exempt.clear();
    }

    fn is_frozen(&self) -> bool {
        self.active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn everything_ticks_when_inactive() {
        let freezer = WorldFreezer::new();
        assert!(!freezer.is_frozen());
        assert!(freezer.should_tick(ActorId::new()));
    }

    #[test]
    fn only_exempt_actors_tick_while_frozen() {
        let fighter = ActorId::new();
        let bystander = ActorId::new();
        let mut freezer = WorldFreezer::new();
        freezer.freeze(&HashSet::from([fighter]));

        assert!(freezer.is_frozen());
        assert!(freezer.should_tick(fighter));
        assert!(!freezer.should_tick(bystander));
        assert_eq!(freezer.exempt_count(), 1);

        freezer.unfreeze();
        assert!(freezer.should_tick(bystander));
        assert_eq!(freezer.exempt_count(), 0);
    }
}
