use std::time::Duration;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::config::*;
use super::effects::Position;
use super::error::PetError;

/// Developmental stage. Only ever moves forward; `Dead` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Baby,
    Teen,
    Adult,
    Dead,
}

impl Stage {
    /// The stage this one evolves into, if any.
    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::Baby => Some(Stage::Teen),
            Stage::Teen => Some(Stage::Adult),
            Stage::Adult | Stage::Dead => None,
        }
    }

    /// Floor weight for the stage. A dead creature keeps the adult floor.
    pub fn base_weight(self) -> i32 {
        match self {
            Stage::Baby => BASE_WEIGHT[0],
            Stage::Teen => BASE_WEIGHT[1],
            Stage::Adult | Stage::Dead => BASE_WEIGHT[2],
        }
    }

    /// Stage whose frame sets are used when drawing. The grave has no
    /// creature frames of its own, so it falls back to the adult set.
    pub fn frame_stage(self) -> Stage {
        match self {
            Stage::Dead => Stage::Adult,
            s => s,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Stage::Baby => "baby",
            Stage::Teen => "teen",
            Stage::Adult => "adult",
            Stage::Dead => "dead",
        }
    }
}

/// What the player puts in front of the dragon.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FoodKind {
    /// Restores hunger.
    Fish,
    /// Restores happiness, always adds weight.
    Cake,
}

impl FoodKind {
    pub fn label(self) -> &'static str {
        match self {
            FoodKind::Fish => "fish",
            FoodKind::Cake => "cake",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SleepState {
    Awake,
    Napping { wake_at: NaiveDateTime },
    FullSleep { wake_at: NaiveDateTime },
}

impl SleepState {
    pub fn is_awake(&self) -> bool {
        matches!(self, SleepState::Awake)
    }

    pub fn wake_at(&self) -> Option<NaiveDateTime> {
        match *self {
            SleepState::Awake => None,
            SleepState::Napping { wake_at } | SleepState::FullSleep { wake_at } => Some(wake_at),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub age: i32,
    pub weight: i32,
    pub hunger: i32,
    pub happiness: i32,
    pub energy: i32,
}

impl Default for Stats {
    fn default() -> Self {
        Stats {
            age: START_AGE,
            weight: Stage::Baby.base_weight(),
            hunger: START_HUNGER,
            happiness: START_HAPPINESS,
            energy: START_ENERGY,
        }
    }
}

impl Stats {
    /// Hunger or happiness has bottomed out.
    pub fn is_neglected(&self) -> bool {
        self.hunger == 0 || self.happiness == 0
    }

    /// Apply the stat effect of one serving of food.
    pub fn feed(&mut self, kind: FoodKind) -> Result<(), PetError> {
        match kind {
            FoodKind::Fish => {
                if self.hunger >= MAX_HUNGER {
                    return Err(PetError::AlreadyFull);
                }
                self.hunger = (self.hunger + FEED_HUNGER_GAIN).min(MAX_HUNGER);
                self.weight += 1;
            }
            FoodKind::Cake => {
                self.weight += 1;
                if self.happiness < MAX_HAPPINESS {
                    self.happiness = (self.happiness + CAKE_HAPPINESS_GAIN).min(MAX_HAPPINESS);
                }
            }
        }
        Ok(())
    }

    pub fn play(&mut self) -> Result<(), PetError> {
        if self.happiness >= MAX_HAPPINESS {
            return Err(PetError::AlreadyHappy);
        }
        if self.energy <= PLAY_MIN_ENERGY {
            return Err(PetError::TooTired);
        }
        self.happiness = (self.happiness + PLAY_HAPPINESS_GAIN).min(MAX_HAPPINESS);
        self.energy = (self.energy - PLAY_ENERGY_COST).max(0);
        Ok(())
    }

    /// One decay step: happiness and hunger each drop by one, floored at 0.
    pub fn decay(&mut self) {
        self.happiness = (self.happiness - 1).max(0);
        self.hunger = (self.hunger - 1).max(0);
    }

    /// Move the weight onto a new stage floor, keeping whatever the player
    /// earned above the old one.
    pub fn rebase_weight(&mut self, from: Stage, to: Stage) {
        let overage = self.weight - from.base_weight();
        self.weight = (to.base_weight() + overage).max(0);
    }

    fn in_range(&self) -> bool {
        (0..=MAX_HUNGER).contains(&self.hunger)
            && (0..=MAX_HAPPINESS).contains(&self.happiness)
            && (0..=MAX_ENERGY).contains(&self.energy)
            && self.weight >= 0
            && self.age >= 0
    }
}

/// The simulated dragon.
#[derive(Clone, Debug)]
pub struct Creature {
    pub stage: Stage,
    pub stats: Stats,
    /// Time spent in the current stage.
    pub stage_timer: Duration,
    /// Time spent neglected while a teen or adult.
    pub neglect_timer: Duration,
    pub sleep: SleepState,
    pub position: Position,
}

impl Default for Creature {
    fn default() -> Self {
        Self::new()
    }
}

impl Creature {
    pub fn new() -> Self {
        Creature {
            stage: Stage::Baby,
            stats: Stats::default(),
            stage_timer: Duration::ZERO,
            neglect_timer: Duration::ZERO,
            sleep: SleepState::Awake,
            position: Position::default(),
        }
    }

    pub fn is_dead(&self) -> bool {
        self.stage == Stage::Dead
    }

    pub fn is_awake(&self) -> bool {
        self.sleep.is_awake()
    }

    /// Enter a new stage. Resets the stage timer.
    pub fn set_stage(&mut self, stage: Stage) {
        debug_assert!(stage >= self.stage, "stage regressed from {:?}", self.stage);
        self.stage = stage;
        self.stage_timer = Duration::ZERO;
    }

    /// Invariant check used by debug builds and tests.
    pub fn check_invariants(&self) -> bool {
        self.stats.in_range() && (self.stage != Stage::Dead || self.sleep.is_awake())
    }
}
