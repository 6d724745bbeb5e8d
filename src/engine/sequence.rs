// Exclusive animation sequences. Each sequence is a resumable state machine:
// `step` runs one phase and says how long to wait before the next one. The
// runner owns the remaining wait and spends the tick budget across phases.

use std::time::Duration;

use super::assets::AssetConfig;
use super::config::*;
use super::creature::{Creature, FoodKind, Stage};
use super::effects::{Animation, Clip, Effect, Position, SequenceId, Sprite};
use super::lock::Exclusive;

/// What a phase wants next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Resume after this much simulated time.
    Wait(Duration),
    /// Resume on the next tick.
    Yield,
    /// Sequence finished; release the lock.
    Done,
}

/// Everything a phase may touch.
pub struct Cx<'a> {
    pub creature: &'a mut Creature,
    pub assets: &'a AssetConfig,
    pub out: &'a mut Vec<Effect>,
}

impl Cx<'_> {
    fn emit(&mut self, effect: Effect) {
        self.out.push(effect);
    }

    fn move_creature(&mut self, position: Position) {
        self.creature.position = position;
        self.emit(Effect::SetPosition {
            sprite: Sprite::Creature,
            position,
        });
    }

    fn creature_frame(&mut self, stage: Stage, animation: Animation, index: usize) {
        self.emit(Effect::SetFrame {
            sprite: Sprite::Creature,
            sequence: SequenceId::Creature { stage, animation },
            index,
        });
    }
}

// ---- Feeding ----

#[derive(Debug, Clone, Copy, PartialEq)]
enum FeedPhase {
    Start,
    Eating { elapsed: Duration, frame: usize },
    HappyStart,
    Happy { elapsed: Duration, frame: usize },
}

/// Eat loop at the eating position, then a happy loop. The stat effect is
/// applied once, when the sequence starts.
#[derive(Debug)]
pub struct Feeding {
    kind: FoodKind,
    stage: Stage,
    phase: FeedPhase,
    home: Position,
    stats_applied: bool,
    food_shown: bool,
    cancelled: bool,
}

impl Feeding {
    pub fn new(kind: FoodKind, creature: &Creature) -> Self {
        Self {
            kind,
            stage: creature.stage.frame_stage(),
            phase: FeedPhase::Start,
            home: creature.position,
            stats_applied: false,
            food_shown: false,
            cancelled: false,
        }
    }

    pub fn kind(&self) -> FoodKind {
        self.kind
    }

    fn hide_food(&mut self, cx: &mut Cx) {
        if self.food_shown {
            self.food_shown = false;
            cx.emit(Effect::SetVisible {
                sprite: Sprite::Food,
                visible: false,
            });
        }
    }

    fn step(&mut self, cx: &mut Cx) -> Step {
        if self.cancelled {
            tracing::debug!(food = self.kind.label(), "feeding cancelled");
            self.hide_food(cx);
            cx.move_creature(self.home);
            return Step::Done;
        }

        match self.phase {
            FeedPhase::Start => {
                cx.move_creature(self.home.with_x(EAT_X));
                if !self.stats_applied {
                    self.stats_applied = true;
                    if let Err(e) = cx.creature.stats.feed(self.kind) {
                        tracing::debug!(error = %e, "feeding had no stat effect");
                    }
                }
                if cx.assets.food_sprites(self.kind) > 0 {
                    self.food_shown = true;
                    cx.emit(Effect::SetPosition {
                        sprite: Sprite::Food,
                        position: Position::new(FOOD_POSITION.0, FOOD_POSITION.1, 0.0),
                    });
                    cx.emit(Effect::SetVisible {
                        sprite: Sprite::Food,
                        visible: true,
                    });
                }
                self.phase = FeedPhase::Eating {
                    elapsed: Duration::ZERO,
                    frame: 0,
                };
                Step::Wait(Duration::ZERO)
            }
            FeedPhase::Eating { elapsed, frame } => {
                let frames = cx.assets.count(self.stage, Animation::Eat);
                if elapsed >= EAT_DURATION || frames == 0 {
                    if frames == 0 {
                        tracing::warn!(stage = ?self.stage, "no eat frames, skipping eat phase");
                    }
                    self.hide_food(cx);
                    self.phase = FeedPhase::HappyStart;
                    return Step::Wait(Duration::ZERO);
                }

                cx.creature_frame(self.stage, Animation::Eat, frame);

                let sprites = cx.assets.food_sprites(self.kind);
                if self.food_shown && sprites > 0 {
                    let segment = EAT_DURATION.as_secs_f64() / sprites as f64;
                    let index = ((elapsed.as_secs_f64() / segment) as usize).min(sprites - 1);
                    cx.emit(Effect::SetFrame {
                        sprite: Sprite::Food,
                        sequence: SequenceId::Food(self.kind),
                        index,
                    });
                }

                self.phase = FeedPhase::Eating {
                    elapsed: elapsed + EAT_FRAME_TIME,
                    frame: (frame + 1) % frames,
                };
                Step::Wait(EAT_FRAME_TIME)
            }
            FeedPhase::HappyStart => {
                cx.move_creature(self.home.with_x(HAPPY_X));
                cx.emit(Effect::PlayOneShot { clip: Clip::Happy });
                self.phase = FeedPhase::Happy {
                    elapsed: Duration::ZERO,
                    frame: 0,
                };
                Step::Wait(Duration::ZERO)
            }
            FeedPhase::Happy { elapsed, frame } => {
                let frames = cx.assets.count(self.stage, Animation::Happy);
                if elapsed >= HAPPY_DURATION || frames == 0 {
                    if frames == 0 {
                        tracing::warn!(stage = ?self.stage, "no happy frames, skipping happy phase");
                    }
                    cx.move_creature(self.home);
                    return Step::Done;
                }
                cx.creature_frame(self.stage, Animation::Happy, frame);
                self.phase = FeedPhase::Happy {
                    elapsed: elapsed + HAPPY_FRAME_TIME,
                    frame: (frame + 1) % frames,
                };
                Step::Wait(HAPPY_FRAME_TIME)
            }
        }
    }

    fn abort(&mut self, cx: &mut Cx) {
        self.hide_food(cx);
    }
}

// ---- Refusal ----

#[derive(Debug, Clone, Copy, PartialEq)]
enum RefusePhase {
    Start,
    Looping { elapsed: Duration, frame: usize },
    Finish,
}

/// Head shake when offered fish on a full stomach. No stat effect.
#[derive(Debug)]
pub struct Refusal {
    stage: Stage,
    phase: RefusePhase,
    home: Position,
}

impl Refusal {
    pub fn new(creature: &Creature) -> Self {
        Self {
            stage: creature.stage.frame_stage(),
            phase: RefusePhase::Start,
            home: creature.position,
        }
    }

    fn step(&mut self, cx: &mut Cx) -> Step {
        match self.phase {
            RefusePhase::Start => {
                cx.move_creature(self.home.with_x(REFUSE_X));
                if cx.assets.count(self.stage, Animation::Refuse) == 0 {
                    tracing::warn!(stage = ?self.stage, "no refuse frames, waiting instead");
                    self.phase = RefusePhase::Finish;
                    return Step::Wait(REFUSE_DURATION);
                }
                cx.emit(Effect::PlayOneShot { clip: Clip::Refuse });
                self.phase = RefusePhase::Looping {
                    elapsed: Duration::ZERO,
                    frame: 0,
                };
                Step::Wait(Duration::ZERO)
            }
            RefusePhase::Looping { elapsed, frame } => {
                if elapsed >= REFUSE_DURATION {
                    self.phase = RefusePhase::Finish;
                    return Step::Wait(Duration::ZERO);
                }
                let frames = cx.assets.count(self.stage, Animation::Refuse).max(1);
                cx.creature_frame(self.stage, Animation::Refuse, frame % frames);
                self.phase = RefusePhase::Looping {
                    elapsed: elapsed + REFUSE_FRAME_TIME,
                    frame: (frame + 1) % frames,
                };
                Step::Wait(REFUSE_FRAME_TIME)
            }
            RefusePhase::Finish => {
                cx.move_creature(self.home);
                Step::Done
            }
        }
    }
}

// ---- Evolution ----

#[derive(Debug, Clone, Copy, PartialEq)]
enum EvolvePhase {
    Start,
    FadeIn { elapsed: Duration },
    Hold,
    Cue,
    FadeOut { elapsed: Duration },
    Commit,
}

/// Overlay fade that hides the creature while its stage changes.
#[derive(Debug)]
pub struct Evolution {
    from: Stage,
    to: Stage,
    phase: EvolvePhase,
}

fn fraction(elapsed: Duration, total: Duration) -> f32 {
    if total.is_zero() {
        return 1.0;
    }
    (elapsed.as_secs_f32() / total.as_secs_f32()).clamp(0.0, 1.0)
}

impl Evolution {
    pub fn new(from: Stage, to: Stage) -> Self {
        debug_assert_eq!(from.next(), Some(to));
        Self {
            from,
            to,
            phase: EvolvePhase::Start,
        }
    }

    pub fn target(&self) -> Stage {
        self.to
    }

    fn overlay_alpha(cx: &mut Cx, alpha: f32) {
        cx.emit(Effect::SetAlpha {
            sprite: Sprite::Overlay,
            alpha,
        });
    }

    fn step(&mut self, cx: &mut Cx, dt: Duration) -> Step {
        match self.phase {
            EvolvePhase::Start => {
                cx.emit(Effect::SetVisible {
                    sprite: Sprite::Creature,
                    visible: false,
                });
                Self::overlay_alpha(cx, 0.0);
                cx.emit(Effect::SetVisible {
                    sprite: Sprite::Overlay,
                    visible: true,
                });
                self.phase = EvolvePhase::FadeIn {
                    elapsed: Duration::ZERO,
                };
                Step::Wait(Duration::ZERO)
            }
            EvolvePhase::FadeIn { elapsed } => {
                let elapsed = elapsed + dt;
                Self::overlay_alpha(cx, fraction(elapsed, EVOLVE_FADE_IN));
                self.phase = if elapsed >= EVOLVE_FADE_IN {
                    EvolvePhase::Hold
                } else {
                    EvolvePhase::FadeIn { elapsed }
                };
                Step::Yield
            }
            EvolvePhase::Hold => {
                self.phase = EvolvePhase::Cue;
                Step::Wait(EVOLVE_HOLD)
            }
            EvolvePhase::Cue => {
                cx.emit(Effect::PlayOneShot { clip: Clip::Evolve });
                self.phase = EvolvePhase::FadeOut {
                    elapsed: Duration::ZERO,
                };
                Step::Wait(Duration::ZERO)
            }
            EvolvePhase::FadeOut { elapsed } => {
                let elapsed = elapsed + dt;
                Self::overlay_alpha(cx, 1.0 - fraction(elapsed, EVOLVE_FADE_OUT));
                self.phase = if elapsed >= EVOLVE_FADE_OUT {
                    EvolvePhase::Commit
                } else {
                    EvolvePhase::FadeOut { elapsed }
                };
                Step::Yield
            }
            EvolvePhase::Commit => {
                cx.emit(Effect::SetVisible {
                    sprite: Sprite::Overlay,
                    visible: false,
                });
                cx.creature.stats.rebase_weight(self.from, self.to);
                cx.creature.set_stage(self.to);
                cx.emit(Effect::SetVisible {
                    sprite: Sprite::Creature,
                    visible: true,
                });
                cx.creature_frame(self.to, Animation::Idle, 0);
                tracing::info!(
                    from = ?self.from,
                    to = ?self.to,
                    weight = cx.creature.stats.weight,
                    "dragon evolved"
                );
                Step::Done
            }
        }
    }

    fn abort(&mut self, cx: &mut Cx) {
        if self.phase != EvolvePhase::Start {
            cx.emit(Effect::SetVisible {
                sprite: Sprite::Overlay,
                visible: false,
            });
            cx.emit(Effect::SetVisible {
                sprite: Sprite::Creature,
                visible: true,
            });
        }
    }
}

// ---- Runner ----

/// The one exclusive sequence in flight.
#[derive(Debug)]
pub enum Active {
    Feeding(Feeding),
    Refusal(Refusal),
    Evolution(Evolution),
}

impl Active {
    pub fn kind(&self) -> Exclusive {
        match self {
            Active::Feeding(_) => Exclusive::Feeding,
            Active::Refusal(_) => Exclusive::Refusal,
            Active::Evolution(_) => Exclusive::Evolution,
        }
    }

    fn step(&mut self, cx: &mut Cx, dt: Duration) -> Step {
        match self {
            Active::Feeding(s) => s.step(cx),
            Active::Refusal(s) => s.step(cx),
            Active::Evolution(s) => s.step(cx, dt),
        }
    }
}

/// Drives an `Active` sequence with simulated time.
#[derive(Debug)]
pub struct Runner {
    seq: Active,
    wait: Duration,
}

impl Runner {
    pub fn new(seq: Active) -> Self {
        Self {
            seq,
            wait: Duration::ZERO,
        }
    }

    pub fn kind(&self) -> Exclusive {
        self.seq.kind()
    }

    pub fn sequence(&self) -> &Active {
        &self.seq
    }

    /// Spend `dt` of simulated time. Returns true once the sequence is done.
    pub fn drive(&mut self, cx: &mut Cx, dt: Duration) -> bool {
        let mut budget = dt;
        loop {
            if self.wait > budget {
                self.wait -= budget;
                return false;
            }
            budget -= self.wait;
            self.wait = Duration::ZERO;
            // Phases that animate over time only see what is left of the tick
            match self.seq.step(cx, budget) {
                Step::Wait(d) => self.wait = d,
                Step::Yield => return false,
                Step::Done => return true,
            }
        }
    }

    /// Flag a feeding sequence as cancelled and make the next step observe it
    /// right away. Returns false for any other sequence.
    pub fn cancel_feeding(&mut self) -> bool {
        match &mut self.seq {
            Active::Feeding(f) => {
                f.cancelled = true;
                self.wait = Duration::ZERO;
                true
            }
            _ => false,
        }
    }

    /// Stop without finishing, clearing any transient visuals.
    pub fn abort(mut self, cx: &mut Cx) {
        match &mut self.seq {
            Active::Feeding(s) => s.abort(cx),
            Active::Refusal(_) => {}
            Active::Evolution(s) => s.abort(cx),
        }
    }
}
