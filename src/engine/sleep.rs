// Nap and full-sleep scheduling against the day cycle, plus the looping sleep
// animation that runs alongside it.

use std::time::Duration;

use chrono::{NaiveDateTime, Timelike};

use super::clock::{is_daytime, next_day_start};
use super::config::*;
use super::creature::{Creature, SleepState, Stage};
use super::effects::{Animation, Effect, SequenceId, Sprite};

/// What a nap request made at `now` turns into. Naps are only allowed in the
/// daytime window; one that would run past night start becomes a full sleep,
/// and so does a request outside the window.
pub fn plan_nap(now: NaiveDateTime) -> SleepState {
    if !is_daytime(now) {
        return plan_full_sleep(now);
    }
    let wake_at = now + chrono::Duration::hours(NAP_LENGTH_HOURS);
    if wake_at.hour() >= NIGHT_START_HOUR || wake_at.date() != now.date() {
        plan_full_sleep(now)
    } else {
        SleepState::Napping { wake_at }
    }
}

/// Full sleep always lasts until the next day start.
pub fn plan_full_sleep(now: NaiveDateTime) -> SleepState {
    SleepState::FullSleep {
        wake_at: next_day_start(now),
    }
}

/// Put the creature to sleep in the given state and move it to its sleep spot.
pub fn enter(creature: &mut Creature, state: SleepState, out: &mut Vec<Effect>) {
    debug_assert!(!state.is_awake());
    creature.sleep = state;
    creature.position = match state {
        SleepState::FullSleep { .. } => FULL_SLEEP_POSITION,
        _ => creature.position.with_x(NAP_X),
    };
    out.push(Effect::SetPosition {
        sprite: Sprite::Creature,
        position: creature.position,
    });
    tracing::info!(state = ?state, wake_at = ?state.wake_at(), "dragon fell asleep");
}

/// Wake the creature. Energy is restored; only a full sleep ages it.
/// Returns whether the creature aged.
pub fn wake(creature: &mut Creature, out: &mut Vec<Effect>) -> bool {
    let aged = matches!(creature.sleep, SleepState::FullSleep { .. });
    creature.sleep = SleepState::Awake;
    creature.stats.energy = MAX_ENERGY;
    if aged {
        creature.stats.age += 1;
    }
    out.push(Effect::SetFrame {
        sprite: Sprite::Creature,
        sequence: SequenceId::Creature {
            stage: creature.stage.frame_stage(),
            animation: Animation::Idle,
        },
        index: 0,
    });
    tracing::info!(age = creature.stats.age, aged, "dragon woke up");
    aged
}

/// Whether a sleeping creature's wake time has come.
pub fn wake_due(creature: &Creature, now: NaiveDateTime) -> bool {
    creature.sleep.wake_at().is_some_and(|at| now >= at)
}

/// Looping sleep frames. Not exclusive: it never takes the animation lock,
/// and its frames are simply not drawn while someone else owns the slot.
#[derive(Debug)]
pub struct SleepLoop {
    stage: Stage,
    frames: usize,
    frame: usize,
    wait: Duration,
}

impl SleepLoop {
    /// Returns `None` when the stage has no sleep frames.
    pub fn new(stage: Stage, frames: usize) -> Option<Self> {
        if frames == 0 {
            tracing::warn!(stage = ?stage, "no sleep frames, skipping sleep animation");
            return None;
        }
        Some(Self {
            stage: stage.frame_stage(),
            frames,
            frame: 0,
            wait: Duration::ZERO,
        })
    }

    pub fn advance(&mut self, dt: Duration, draw: bool, out: &mut Vec<Effect>) {
        let mut budget = dt;
        while self.wait <= budget {
            budget -= self.wait;
            if draw {
                out.push(Effect::SetFrame {
                    sprite: Sprite::Creature,
                    sequence: SequenceId::Creature {
                        stage: self.stage,
                        animation: Animation::Sleep,
                    },
                    index: self.frame,
                });
            }
            self.frame = (self.frame + 1) % self.frames;
            self.wait = SLEEP_FRAME_TIME;
        }
        self.wait -= budget;
    }
}
