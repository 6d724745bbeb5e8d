use super::config::{ADULT_AFTER, TEEN_AFTER};
use super::creature::{Creature, Stage};
use super::lock::AnimationLock;

/// The stage the creature is due to evolve into, if its stage time is up.
pub fn due(creature: &Creature) -> Option<Stage> {
    match creature.stage {
        Stage::Baby if creature.stage_timer >= TEEN_AFTER => Some(Stage::Teen),
        Stage::Teen if creature.stage_timer >= ADULT_AFTER => Some(Stage::Adult),
        _ => None,
    }
}

/// Starts evolutions when they come due, or holds them until the display
/// slot is free.
#[derive(Debug, Default)]
pub struct EvolutionGate {
    pending: Option<Stage>,
}

impl EvolutionGate {
    pub fn pending(&self) -> Option<Stage> {
        self.pending
    }

    pub fn clear(&mut self) {
        self.pending = None;
    }

    /// Returns the target stage when an evolution should start now.
    pub fn check(&mut self, creature: &Creature, lock: &AnimationLock) -> Option<Stage> {
        if lock.evolving() {
            return None;
        }
        let target = self.pending.or_else(|| due(creature))?;
        if lock.is_free() {
            self.pending = None;
            return Some(target);
        }
        if self.pending.is_none() {
            tracing::info!(
                target = ?target,
                busy = ?lock.holder(),
                "evolution queued until animation finishes"
            );
            self.pending = Some(target);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::engine::lock::Exclusive;

    fn baby_at(secs: u64) -> Creature {
        let mut c = Creature::new();
        c.stage_timer = Duration::from_secs(secs);
        c
    }

    #[test]
    fn test_due() {
        assert_eq!(due(&baby_at(599)), None);
        assert_eq!(due(&baby_at(600)), Some(Stage::Teen));

        let mut teen = baby_at(3599);
        teen.stage = Stage::Teen;
        assert_eq!(due(&teen), None);
        teen.stage_timer = ADULT_AFTER;
        assert_eq!(due(&teen), Some(Stage::Adult));

        let mut adult = baby_at(100_000);
        adult.stage = Stage::Adult;
        assert_eq!(due(&adult), None);
    }

    #[test]
    fn test_starts_when_free() {
        let mut gate = EvolutionGate::default();
        let lock = AnimationLock::Free;
        assert_eq!(gate.check(&baby_at(600), &lock), Some(Stage::Teen));
        assert_eq!(gate.pending(), None);
    }

    #[test]
    fn test_queues_while_busy() {
        let mut gate = EvolutionGate::default();
        let busy = AnimationLock::Playing(Exclusive::Feeding);
        let c = baby_at(700);

        assert_eq!(gate.check(&c, &busy), None);
        assert_eq!(gate.pending(), Some(Stage::Teen));
        // Still busy: stays queued
        assert_eq!(gate.check(&c, &busy), None);
        assert_eq!(gate.pending(), Some(Stage::Teen));

        assert_eq!(gate.check(&c, &AnimationLock::Free), Some(Stage::Teen));
        assert_eq!(gate.pending(), None);
    }

    #[test]
    fn test_noop_while_evolving() {
        let mut gate = EvolutionGate::default();
        let evolving = AnimationLock::Playing(Exclusive::Evolution);
        assert_eq!(gate.check(&baby_at(900), &evolving), None);
        assert_eq!(gate.pending(), None);
    }
}
