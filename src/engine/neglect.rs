use std::time::Duration;

use super::config::NEGLECT_DEATH_AFTER;
use super::creature::{Creature, Stage};

/// Advance the neglect timer by `dt`. Babies are exempt. Returns true when
/// the creature has been neglected long enough to die.
pub fn update(creature: &mut Creature, dt: Duration) -> bool {
    if !matches!(creature.stage, Stage::Teen | Stage::Adult) {
        return false;
    }
    if creature.stats.is_neglected() {
        creature.neglect_timer += dt;
        creature.neglect_timer >= NEGLECT_DEATH_AFTER
    } else {
        creature.neglect_timer = Duration::ZERO;
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn starving_teen() -> Creature {
        let mut c = Creature::new();
        c.stage = Stage::Teen;
        c.stats.hunger = 0;
        c
    }

    #[test]
    fn test_baby_is_exempt() {
        let mut c = Creature::new();
        c.stats.hunger = 0;
        assert!(!update(&mut c, NEGLECT_DEATH_AFTER * 2));
        assert_eq!(c.neglect_timer, Duration::ZERO);
    }

    #[test]
    fn test_accumulates_monotonically() {
        let mut c = starving_teen();
        let mut last = Duration::ZERO;
        for _ in 0..10 {
            assert!(!update(&mut c, Duration::from_secs(60)));
            assert!(c.neglect_timer > last);
            last = c.neglect_timer;
        }
    }

    #[test]
    fn test_resets_when_cared_for() {
        let mut c = starving_teen();
        update(&mut c, Duration::from_secs(5000));
        c.stats.hunger = 1;
        update(&mut c, Duration::from_millis(100));
        assert_eq!(c.neglect_timer, Duration::ZERO);
    }

    #[test]
    fn test_unhappy_counts_as_neglect() {
        let mut c = Creature::new();
        c.stage = Stage::Adult;
        c.stats.happiness = 0;
        assert!(!update(&mut c, Duration::from_secs(10_799)));
        assert!(update(&mut c, Duration::from_secs(1)));
    }
}
