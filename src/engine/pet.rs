// The simulation. One creature, one display slot, one tick driver that advances
// every timer in a fixed order and then the active animation sequence.

use std::time::Duration;

use chrono::NaiveDateTime;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::metrics;

use super::assets::AssetConfig;
use super::clock::{crossed_night_start, DayClock};
use super::config::*;
use super::creature::{Creature, FoodKind, SleepState, Stage, Stats};
use super::effects::{Animation, Clip, Effect, Position, SequenceId, Sprite};
use super::error::PetError;
use super::evolution::EvolutionGate;
use super::idle::IdleWander;
use super::lock::{AnimationLock, Exclusive};
use super::neglect;
use super::poop::PoopState;
use super::sequence::{Active, Cx, Evolution, Feeding, Refusal, Runner};
use super::sleep::{self, SleepLoop};
use super::warning::WarningState;

/// Screen modes reported by the host. Poops are hidden while either is on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiMode {
    #[serde(default)]
    pub in_feed_mode: bool,
    #[serde(default)]
    pub in_info_mode: bool,
}

/// What a feeding request turned into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedingOutcome {
    Eating,
    Refused,
}

/// Serializable view of the whole simulation.
#[derive(Clone, Debug, Serialize)]
pub struct PetSnapshot {
    pub stage: Stage,
    pub stats: Stats,
    pub stage_time_secs: f64,
    pub neglect_time_secs: f64,
    pub sleep: SleepState,
    pub position: Position,
    pub is_dead: bool,
    pub lock: AnimationLock,
    pub animation_playing: bool,
    pub evolving: bool,
    pub eating_locked: bool,
    pub pending_evolution: Option<Stage>,
    pub night_pending: bool,
    pub poop_count: u8,
    pub warning_active: bool,
    pub alert_fired: bool,
    pub ui: UiMode,
    pub now: NaiveDateTime,
    pub sim_time_secs: f64,
    pub ticks: u64,
}

pub struct Pet {
    creature: Creature,
    lock: AnimationLock,
    active: Option<Runner>,
    gate: EvolutionGate,
    poop: PoopState,
    warning: WarningState,
    idle: IdleWander,
    sleep_loop: Option<SleepLoop>,
    /// Night fell while an exclusive animation held the slot.
    night_pending: bool,
    decay_timer: Duration,
    ui: UiMode,
    clock: Box<dyn DayClock>,
    last_seen: NaiveDateTime,
    assets: AssetConfig,
    rng: StdRng,
    out: Vec<Effect>,
    ticks: u64,
    sim_time: Duration,
}

impl Pet {
    pub fn new(clock: Box<dyn DayClock>, assets: AssetConfig, seed: u64) -> Self {
        assets.report();
        let last_seen = clock.now();
        let mut pet = Pet {
            creature: Creature::new(),
            lock: AnimationLock::Free,
            active: None,
            gate: EvolutionGate::default(),
            poop: PoopState::default(),
            warning: WarningState::default(),
            idle: IdleWander::default(),
            sleep_loop: None,
            night_pending: false,
            decay_timer: Duration::ZERO,
            ui: UiMode::default(),
            clock,
            last_seen,
            assets,
            rng: StdRng::seed_from_u64(seed),
            out: Vec::new(),
            ticks: 0,
            sim_time: Duration::ZERO,
        };
        pet.present_fresh();
        tracing::info!(stage = ?pet.creature.stage, "dragon hatched");
        pet
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn creature(&self) -> &Creature {
        &self.creature
    }

    pub fn lock(&self) -> AnimationLock {
        self.lock
    }

    pub fn animation_playing(&self) -> bool {
        self.lock.animation_playing()
    }

    pub fn evolving(&self) -> bool {
        self.lock.evolving()
    }

    pub fn eating_locked(&self) -> bool {
        self.lock.eating_locked()
    }

    pub fn pending_evolution(&self) -> Option<Stage> {
        self.gate.pending()
    }

    pub fn night_pending(&self) -> bool {
        self.night_pending
    }

    pub fn poop(&self) -> &PoopState {
        &self.poop
    }

    pub fn warning(&self) -> &WarningState {
        &self.warning
    }

    pub fn ui_mode(&self) -> UiMode {
        self.ui
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn now(&self) -> NaiveDateTime {
        self.clock.now()
    }

    /// Take every presentation command emitted since the last drain.
    pub fn drain_effects(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.out)
    }

    pub fn snapshot(&self) -> PetSnapshot {
        let c = &self.creature;
        PetSnapshot {
            stage: c.stage,
            stats: c.stats,
            stage_time_secs: c.stage_timer.as_secs_f64(),
            neglect_time_secs: c.neglect_timer.as_secs_f64(),
            sleep: c.sleep,
            position: c.position,
            is_dead: c.is_dead(),
            lock: self.lock,
            animation_playing: self.lock.animation_playing(),
            evolving: self.lock.evolving(),
            eating_locked: self.lock.eating_locked(),
            pending_evolution: self.gate.pending(),
            night_pending: self.night_pending,
            poop_count: self.poop.count,
            warning_active: self.warning.flashing(),
            alert_fired: self.warning.alert_fired,
            ui: self.ui,
            now: self.clock.now(),
            sim_time_secs: self.sim_time.as_secs_f64(),
            ticks: self.ticks,
        }
    }

    // ── Tick driver ──────────────────────────────────────────────────

    /// Advance the whole simulation by `dt`.
    ///
    /// Order:
    /// 1. Stat decay
    /// 2. Poop spawner
    /// 3. Warning check (and any in-flight flash)
    /// 4. Idle wander
    /// 5. Stage timer and evolution gate
    /// 6. Neglect monitor
    /// 7. Sleep boundaries (forced night sleep, wake time). Night sleep
    ///    waits for the animation slot to be free.
    /// 8. Active sequence and sleep loop
    pub fn tick(&mut self, dt: Duration) {
        self.ticks += 1;
        self.sim_time += dt;
        let now = self.clock.now();

        if self.creature.is_dead() {
            self.last_seen = now;
            return;
        }

        let awake = self.creature.is_awake();

        // 1. Decay
        if awake {
            self.decay_timer += dt;
            while self.decay_timer >= DECAY_INTERVAL {
                self.decay_timer -= DECAY_INTERVAL;
                self.creature.stats.decay();
                tracing::debug!(
                    hunger = self.creature.stats.hunger,
                    happiness = self.creature.stats.happiness,
                    "stats decayed"
                );
            }
        }

        // 2. Poop
        if awake {
            let added = self
                .poop
                .tick(dt, self.lock.animation_playing(), &mut self.out);
            if added > 0 {
                metrics::POOPS_SPAWNED_TOTAL.inc_by(u64::from(added));
            }
        }

        // 3. Warning
        if awake && self.warning.check(self.creature.stats.is_neglected(), dt) {
            metrics::ALERTS_TOTAL.inc();
        }
        self.warning.advance(dt, &mut self.out);

        // 4. Idle wander
        if awake && self.lock.is_free() {
            self.idle.tick(
                dt,
                &mut self.creature,
                &self.assets,
                &mut self.rng,
                &mut self.out,
            );
        }

        // 5. Evolution
        if awake {
            self.creature.stage_timer += dt;
            if let Some(target) = self.gate.check(&self.creature, &self.lock) {
                self.start_evolution(target);
            }
        }

        // 6. Neglect
        if awake && neglect::update(&mut self.creature, dt) {
            self.die();
            self.last_seen = now;
            return;
        }

        // 7. Sleep boundaries
        if self.creature.is_awake() {
            if crossed_night_start(self.last_seen, now) {
                tracing::info!(%now, busy = ?self.lock.holder(), "night fell");
                self.night_pending = true;
            }
            if self.night_pending && self.lock.is_free() {
                self.night_pending = false;
                self.enter_sleep(sleep::plan_full_sleep(now));
            }
        } else if sleep::wake_due(&self.creature, now) {
            self.wake();
        }
        self.last_seen = now;

        // 8. Sequencer
        self.drive_active(dt);
        if let Some(sl) = self.sleep_loop.as_mut() {
            sl.advance(dt, self.lock.is_free(), &mut self.out);
        }

        self.sync_poop_visibility();
        debug_assert!(self.creature.check_invariants());
    }

    // ── Operations ───────────────────────────────────────────────────

    fn ensure_alive(&self) -> Result<(), PetError> {
        if self.creature.is_dead() {
            return Err(PetError::Dead);
        }
        Ok(())
    }

    /// Care actions need a living, awake creature.
    fn ensure_awake(&self) -> Result<(), PetError> {
        self.ensure_alive()?;
        if !self.creature.is_awake() {
            return Err(PetError::Asleep);
        }
        Ok(())
    }

    /// Sleep transitions move the creature, so they wait for the slot.
    fn ensure_slot_free(&self) -> Result<(), PetError> {
        match self.lock.holder() {
            Some(holder) => Err(PetError::AnimationLocked(holder)),
            None => Ok(()),
        }
    }

    /// Apply the stat effect of food directly, without the animation.
    pub fn feed(&mut self, kind: FoodKind) -> Result<(), PetError> {
        self.ensure_awake()?;
        let result = self.creature.stats.feed(kind);
        record_feeding(kind, result.is_ok());
        result
    }

    pub fn play(&mut self) -> Result<(), PetError> {
        self.ensure_awake()?;
        self.creature.stats.play()
    }

    pub fn start_nap(&mut self) -> Result<SleepState, PetError> {
        self.ensure_alive()?;
        if !self.creature.is_awake() {
            return Err(PetError::AlreadyAsleep);
        }
        self.ensure_slot_free()?;
        let state = sleep::plan_nap(self.clock.now());
        self.enter_sleep(state);
        Ok(state)
    }

    pub fn start_full_sleep(&mut self) -> Result<SleepState, PetError> {
        self.ensure_alive()?;
        if !self.creature.is_awake() {
            return Err(PetError::AlreadyAsleep);
        }
        self.ensure_slot_free()?;
        self.night_pending = false;
        let state = sleep::plan_full_sleep(self.clock.now());
        self.enter_sleep(state);
        Ok(state)
    }

    /// Wake early. Returns whether the creature aged.
    pub fn wake_up(&mut self) -> Result<bool, PetError> {
        self.ensure_alive()?;
        if self.creature.is_awake() {
            return Err(PetError::AlreadyAwake);
        }
        self.ensure_slot_free()?;
        Ok(self.wake())
    }

    /// Play the feeding animation, or the refusal when offered fish on a
    /// full stomach.
    pub fn start_feeding(&mut self, kind: FoodKind) -> Result<FeedingOutcome, PetError> {
        self.ensure_awake()?;
        if let Some(holder) = self.lock.holder() {
            tracing::warn!(food = kind.label(), busy = %holder, "feeding rejected");
            return Err(PetError::AnimationLocked(holder));
        }
        if kind == FoodKind::Fish && self.creature.stats.hunger >= MAX_HUNGER {
            tracing::debug!("hunger is full, refusing fish");
            record_feeding(kind, false);
            self.start_sequence(Active::Refusal(Refusal::new(&self.creature)))?;
            return Ok(FeedingOutcome::Refused);
        }
        record_feeding(kind, true);
        self.start_sequence(Active::Feeding(Feeding::new(kind, &self.creature)))?;
        Ok(FeedingOutcome::Eating)
    }

    /// Stop the feeding animation. The cancellation is observed right away.
    pub fn cancel_feeding(&mut self) -> Result<(), PetError> {
        let Some(runner) = self.active.as_mut() else {
            return Err(PetError::NothingToCancel);
        };
        if !runner.cancel_feeding() {
            return Err(PetError::NothingToCancel);
        }
        self.drive_active(Duration::ZERO);
        debug_assert!(self.active.is_none());
        Ok(())
    }

    pub fn flush_poop(&mut self) {
        self.poop.flush(&mut self.out);
        tracing::debug!("poop flushed");
    }

    pub fn set_ui_mode(&mut self, mode: UiMode) {
        self.ui = mode;
        self.sync_poop_visibility();
    }

    /// Replace the creature with a fresh one and clear every timer and
    /// sequence. The clock, assets and random stream are kept.
    pub fn reset(&mut self) {
        if let Some(runner) = self.active.take() {
            let mut cx = Cx {
                creature: &mut self.creature,
                assets: &self.assets,
                out: &mut self.out,
            };
            runner.abort(&mut cx);
        }
        self.creature = Creature::new();
        self.lock = AnimationLock::Free;
        self.gate.clear();
        self.poop.flush(&mut self.out);
        self.warning = WarningState::default();
        self.idle.reset();
        self.sleep_loop = None;
        self.night_pending = false;
        self.decay_timer = Duration::ZERO;
        self.last_seen = self.clock.now();
        self.present_fresh();
        tracing::info!("simulation reset");
    }

    // ── Internals ────────────────────────────────────────────────────

    fn start_sequence(&mut self, seq: Active) -> Result<(), PetError> {
        let kind = seq.kind();
        self.lock
            .acquire(kind)
            .map_err(PetError::AnimationLocked)?;
        tracing::debug!(sequence = %kind, "sequence started");
        self.active = Some(Runner::new(seq));
        self.sync_poop_visibility();
        self.drive_active(Duration::ZERO);
        Ok(())
    }

    fn start_evolution(&mut self, target: Stage) {
        let from = self.creature.stage;
        if let Err(e) = self.start_sequence(Active::Evolution(Evolution::new(from, target))) {
            tracing::warn!(error = %e, "evolution could not start");
        }
    }

    fn drive_active(&mut self, dt: Duration) {
        let Some(runner) = self.active.as_mut() else {
            return;
        };
        let mut cx = Cx {
            creature: &mut self.creature,
            assets: &self.assets,
            out: &mut self.out,
        };
        if runner.drive(&mut cx, dt) {
            let kind = runner.kind();
            self.finish_sequence(kind);
        }
    }

    fn finish_sequence(&mut self, kind: Exclusive) {
        self.active = None;
        self.lock.release(kind);
        if kind == Exclusive::Evolution {
            metrics::EVOLUTIONS_TOTAL
                .with_label_values(&[self.creature.stage.label()])
                .inc();
        }
        tracing::debug!(sequence = %kind, "sequence finished");
        self.sync_poop_visibility();
    }

    fn enter_sleep(&mut self, state: SleepState) {
        sleep::enter(&mut self.creature, state, &mut self.out);
        let frames = self.assets.count(self.creature.stage, Animation::Sleep);
        self.sleep_loop = SleepLoop::new(self.creature.stage, frames);
    }

    fn wake(&mut self) -> bool {
        self.sleep_loop = None;
        self.idle.reset();
        sleep::wake(&mut self.creature, &mut self.out)
    }

    fn die(&mut self) {
        if let Some(runner) = self.active.take() {
            let kind = runner.kind();
            let mut cx = Cx {
                creature: &mut self.creature,
                assets: &self.assets,
                out: &mut self.out,
            };
            runner.abort(&mut cx);
            self.lock.release(kind);
        }
        self.gate.clear();
        self.sleep_loop = None;
        self.night_pending = false;
        self.creature.sleep = SleepState::Awake;
        self.creature.set_stage(Stage::Dead);
        self.creature.position = self.creature.position.with_x(DEATH_X);
        self.out.push(Effect::SetPosition {
            sprite: Sprite::Creature,
            position: self.creature.position,
        });
        self.out.push(Effect::SetFrame {
            sprite: Sprite::Creature,
            sequence: SequenceId::Gravestone,
            index: 0,
        });
        self.out.push(Effect::PlayOneShot { clip: Clip::Death });
        metrics::DEATHS_TOTAL.inc();
        tracing::info!(
            age = self.creature.stats.age,
            weight = self.creature.stats.weight,
            "dragon died of neglect"
        );
        self.sync_poop_visibility();
    }

    fn sync_poop_visibility(&mut self) {
        let allowed = self.lock.is_free() && !self.ui.in_feed_mode && !self.ui.in_info_mode;
        self.poop.sync_visibility(allowed, &mut self.out);
    }

    /// Commands that put a fresh creature on screen.
    fn present_fresh(&mut self) {
        let position = self.creature.position;
        self.out.extend([
            Effect::SetVisible {
                sprite: Sprite::Overlay,
                visible: false,
            },
            Effect::SetVisible {
                sprite: Sprite::Food,
                visible: false,
            },
            Effect::SetVisible {
                sprite: Sprite::Creature,
                visible: true,
            },
            Effect::SetPosition {
                sprite: Sprite::Creature,
                position,
            },
            Effect::SetFrame {
                sprite: Sprite::Creature,
                sequence: SequenceId::Creature {
                    stage: self.creature.stage,
                    animation: Animation::Idle,
                },
                index: 0,
            },
            Effect::SetAlpha {
                sprite: Sprite::Warning,
                alpha: WARNING_DIM_ALPHA,
            },
        ]);
    }
}

fn record_feeding(kind: FoodKind, accepted: bool) {
    let outcome = if accepted { "accepted" } else { "refused" };
    metrics::FEEDINGS_TOTAL
        .with_label_values(&[kind.label(), outcome])
        .inc();
}
