// Presentation commands emitted by the simulation for the render and audio
// collaborators. The core never renders anything itself: every visible or
// audible side effect is pushed here and drained by the host.

use serde::Serialize;

use super::creature::{FoodKind, Stage};

/// A point in scene space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Position {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Position { x, y, z }
    }

    /// Same position with a different x coordinate.
    pub fn with_x(self, x: f32) -> Self {
        Position { x, ..self }
    }
}

/// Display targets the core writes to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Sprite {
    /// The creature itself (the shared display slot).
    Creature,
    /// Food item shown while eating.
    Food,
    /// Full-screen overlay used by the evolution fade.
    Overlay,
    /// One of the two poop slots (0 or 1).
    Poop(usize),
    /// The flashing warning icon.
    Warning,
}

/// Per-stage creature animations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Animation {
    Idle,
    Eat,
    Happy,
    Refuse,
    Sleep,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PoopLook {
    Normal,
    Changed,
}

/// Identifies a frame sequence in the collaborator's sprite sheets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SequenceId {
    Creature { stage: Stage, animation: Animation },
    Food(FoodKind),
    Poop(PoopLook),
    Gravestone,
}

/// One-shot audio clips.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Clip {
    Happy,
    Refuse,
    Evolve,
    Warning,
    Death,
}

/// A single fire-and-forget presentation command.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Effect {
    SetFrame {
        sprite: Sprite,
        sequence: SequenceId,
        index: usize,
    },
    SetPosition {
        sprite: Sprite,
        position: Position,
    },
    SetVisible {
        sprite: Sprite,
        visible: bool,
    },
    SetAlpha {
        sprite: Sprite,
        alpha: f32,
    },
    PlayOneShot {
        clip: Clip,
    },
}

/// Render and audio collaborator contract.
pub trait Presenter {
    fn set_frame(&mut self, sprite: Sprite, sequence: SequenceId, index: usize);
    fn set_position(&mut self, sprite: Sprite, position: Position);
    fn set_visible(&mut self, sprite: Sprite, visible: bool);
    fn set_alpha(&mut self, sprite: Sprite, alpha: f32);
    fn play_one_shot(&mut self, clip: Clip);
}

impl Effect {
    /// Dispatch this command to a presenter.
    pub fn apply(&self, presenter: &mut dyn Presenter) {
        match *self {
            Effect::SetFrame {
                sprite,
                sequence,
                index,
            } => presenter.set_frame(sprite, sequence, index),
            Effect::SetPosition { sprite, position } => presenter.set_position(sprite, position),
            Effect::SetVisible { sprite, visible } => presenter.set_visible(sprite, visible),
            Effect::SetAlpha { sprite, alpha } => presenter.set_alpha(sprite, alpha),
            Effect::PlayOneShot { clip } => presenter.play_one_shot(clip),
        }
    }
}

/// Presenter that only logs, used by headless runs.
#[derive(Debug, Default)]
pub struct LogPresenter {
    pub commands: u64,
}

impl Presenter for LogPresenter {
    fn set_frame(&mut self, sprite: Sprite, sequence: SequenceId, index: usize) {
        self.commands += 1;
        tracing::trace!(?sprite, ?sequence, index, "set_frame");
    }

    fn set_position(&mut self, sprite: Sprite, position: Position) {
        self.commands += 1;
        tracing::trace!(?sprite, x = position.x, y = position.y, "set_position");
    }

    fn set_visible(&mut self, sprite: Sprite, visible: bool) {
        self.commands += 1;
        tracing::trace!(?sprite, visible, "set_visible");
    }

    fn set_alpha(&mut self, sprite: Sprite, alpha: f32) {
        self.commands += 1;
        tracing::trace!(?sprite, alpha, "set_alpha");
    }

    fn play_one_shot(&mut self, clip: Clip) {
        self.commands += 1;
        tracing::debug!(?clip, "play_one_shot");
    }
}
