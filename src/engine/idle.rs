use std::time::Duration;

use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

use super::assets::AssetConfig;
use super::config::*;
use super::creature::Creature;
use super::effects::{Animation, Effect, SequenceId, Sprite};

/// Idle wander: every interval, shuffle one step sideways and pick a new pose.
#[derive(Debug, Default)]
pub struct IdleWander {
    timer: Duration,
}

impl IdleWander {
    pub fn reset(&mut self) {
        self.timer = Duration::ZERO;
    }

    pub fn tick<R: Rng>(
        &mut self,
        dt: Duration,
        creature: &mut Creature,
        assets: &AssetConfig,
        rng: &mut R,
        out: &mut Vec<Effect>,
    ) {
        self.timer += dt;
        if self.timer < IDLE_INTERVAL {
            return;
        }
        self.timer = Duration::ZERO;
        step_sideways(creature, rng, out);
        refresh_pose(creature, assets, rng, out);
    }
}

fn step_sideways<R: Rng>(creature: &mut Creature, rng: &mut R, out: &mut Vec<Effect>) {
    let x = creature.position.x;
    let can_left = x > IDLE_LIMIT_LEFT;
    let can_right = x < IDLE_LIMIT_RIGHT;
    let left = can_left && rng.gen_bool(0.5);
    let right = can_right && !left;
    if !left && !right {
        return;
    }
    let dx = if left { -IDLE_STEP } else { IDLE_STEP };
    let x = (x + dx).clamp(IDLE_LIMIT_LEFT, IDLE_LIMIT_RIGHT);
    creature.position = creature.position.with_x(x);
    out.push(Effect::SetPosition {
        sprite: Sprite::Creature,
        position: creature.position,
    });
}

/// Pick an idle frame, weighted when the stage has usable weights.
pub fn pick_pose<R: Rng>(assets: &AssetConfig, creature: &Creature, rng: &mut R) -> Option<usize> {
    let frames = assets.frames(creature.stage);
    if frames.idle == 0 {
        return None;
    }
    if let Some(weights) = frames.usable_weights() {
        if let Ok(dist) = WeightedIndex::new(weights) {
            return Some(dist.sample(rng));
        }
    }
    Some(rng.gen_range(0..frames.idle))
}

fn refresh_pose<R: Rng>(
    creature: &Creature,
    assets: &AssetConfig,
    rng: &mut R,
    out: &mut Vec<Effect>,
) {
    if let Some(index) = pick_pose(assets, creature, rng) {
        out.push(Effect::SetFrame {
            sprite: Sprite::Creature,
            sequence: SequenceId::Creature {
                stage: creature.stage.frame_stage(),
                animation: Animation::Idle,
            },
            index,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_stays_within_limits() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut creature = Creature::new();
        let assets = AssetConfig::default();
        let mut idle = IdleWander::default();
        let mut out = Vec::new();
        for _ in 0..2000 {
            idle.tick(IDLE_INTERVAL, &mut creature, &assets, &mut rng, &mut out);
            assert!(creature.position.x >= IDLE_LIMIT_LEFT);
            assert!(creature.position.x <= IDLE_LIMIT_RIGHT);
        }
    }

    #[test]
    fn test_waits_for_interval() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut creature = Creature::new();
        let assets = AssetConfig::default();
        let mut idle = IdleWander::default();
        let mut out = Vec::new();
        idle.tick(Duration::from_millis(400), &mut creature, &assets, &mut rng, &mut out);
        assert!(out.is_empty());
        idle.tick(Duration::from_millis(100), &mut creature, &assets, &mut rng, &mut out);
        // A step (always possible from the centre) and a pose
        assert_eq!(out.len(), 2);
        assert_eq!(creature.position.x.abs(), IDLE_STEP);
    }

    #[test]
    fn test_at_left_limit_moves_right() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut creature = Creature::new();
        creature.position.x = IDLE_LIMIT_LEFT;
        let mut out = Vec::new();
        step_sideways(&mut creature, &mut rng, &mut out);
        assert_eq!(creature.position.x, IDLE_LIMIT_LEFT + IDLE_STEP);
    }

    #[test]
    fn test_weighted_pose_skips_zero_weights() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut assets = AssetConfig::default();
        assets.baby.idle = 3;
        assets.baby.idle_weights = vec![0.0, 1.0, 0.0];
        let creature = Creature::new();
        for _ in 0..100 {
            assert_eq!(pick_pose(&assets, &creature, &mut rng), Some(1));
        }
    }

    #[test]
    fn test_mismatched_weights_fall_back_to_uniform() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut assets = AssetConfig::default();
        assets.baby.idle_weights = vec![1.0];
        let creature = Creature::new();
        let mut seen = [false; 4];
        for _ in 0..200 {
            let i = pick_pose(&assets, &creature, &mut rng).unwrap();
            seen[i] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn test_no_idle_frames() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut assets = AssetConfig::default();
        assets.baby.idle = 0;
        assert_eq!(pick_pose(&assets, &Creature::new(), &mut rng), None);
    }
}
