use std::time::Duration;

use super::effects::Position;

// Stat ranges
pub const MAX_HUNGER: i32 = 8;
pub const MAX_HAPPINESS: i32 = 8;
pub const MAX_ENERGY: i32 = 10;

// Starting stats for a freshly created creature
pub const START_AGE: i32 = 0;
pub const START_HUNGER: i32 = MAX_HUNGER;
pub const START_HAPPINESS: i32 = MAX_HAPPINESS;
pub const START_ENERGY: i32 = MAX_ENERGY;

// Floor weight per stage [baby, teen, adult]
pub const BASE_WEIGHT: [i32; 3] = [5, 10, 20];

// Stat effects
pub const FEED_HUNGER_GAIN: i32 = 2;
pub const CAKE_HAPPINESS_GAIN: i32 = 2;
pub const PLAY_HAPPINESS_GAIN: i32 = 2;
pub const PLAY_ENERGY_COST: i32 = 2;
/// Play is refused unless energy is strictly above this.
pub const PLAY_MIN_ENERGY: i32 = 2;

// Simulation timers
pub const DECAY_INTERVAL: Duration = Duration::from_secs(60);
pub const TEEN_AFTER: Duration = Duration::from_secs(600);
pub const ADULT_AFTER: Duration = Duration::from_secs(3600);
pub const NEGLECT_DEATH_AFTER: Duration = Duration::from_secs(10_800);

// Poop
pub const POOP_INTERVAL: Duration = Duration::from_secs(1800);
pub const MAX_POOP: u8 = 4;
pub const POOP_POSITIONS: [Position; 2] = [
    Position::new(-36.0, -10.0, 0.0),
    Position::new(-36.0, 12.0, 0.0),
];

// Day cycle (hour of day, local time)
pub const DAY_START_HOUR: u32 = 7;
pub const NIGHT_START_HOUR: u32 = 21;
pub const NAP_LENGTH_HOURS: i64 = 3;

// Feeding sequence
pub const EAT_X: f32 = 12.0;
pub const FOOD_POSITION: (f32, f32) = (-27.0, -12.0);
pub const EAT_DURATION: Duration = Duration::from_secs(8);
pub const EAT_FRAME_TIME: Duration = Duration::from_secs(1);
pub const HAPPY_X: f32 = 0.0;
pub const HAPPY_DURATION: Duration = Duration::from_secs(3);
pub const HAPPY_FRAME_TIME: Duration = Duration::from_millis(500);

// Refusal sequence
pub const REFUSE_X: f32 = 0.0;
pub const REFUSE_DURATION: Duration = Duration::from_secs(3);
pub const REFUSE_FRAME_TIME: Duration = Duration::from_secs(1);

// Sleep loop
pub const SLEEP_FRAME_TIME: Duration = Duration::from_secs(1);
pub const NAP_X: f32 = 0.0;
pub const FULL_SLEEP_POSITION: Position = Position::new(0.0, 0.0, 0.0);

// Evolution sequence
pub const EVOLVE_FADE_IN: Duration = Duration::from_secs(1);
pub const EVOLVE_HOLD: Duration = Duration::from_millis(500);
pub const EVOLVE_FADE_OUT: Duration = Duration::from_secs(1);

// Warning flash
pub const WARNING_FLASHES: u32 = 3;
pub const WARNING_BRIGHT_TIME: Duration = Duration::from_millis(500);
pub const WARNING_DIM_TIME: Duration = Duration::from_millis(500);
pub const WARNING_BRIGHT_ALPHA: f32 = 1.0;
pub const WARNING_DIM_ALPHA: f32 = 110.0 / 255.0;

// Idle wander
pub const IDLE_INTERVAL: Duration = Duration::from_millis(500);
pub const IDLE_STEP: f32 = 3.0;
pub const IDLE_LIMIT_LEFT: f32 = -24.0;
pub const IDLE_LIMIT_RIGHT: f32 = 24.0;

// Death
pub const DEATH_X: f32 = 0.0;
