// Frame-set description handed over by the render collaborator. The core only
// needs counts: which indices exist for each stage and animation.

use serde::{Deserialize, Serialize};

use super::creature::{FoodKind, Stage};
use super::effects::Animation;

/// Problems found in an asset description. None of them are fatal; the
/// affected feature degrades and the problem is logged.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("invalid asset description: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("no {animation:?} frames for stage {stage:?}")]
    MissingFrames { stage: Stage, animation: Animation },

    #[error("stage {stage:?} has {weights} idle weights for {frames} idle frames, falling back to uniform")]
    WeightMismatch {
        stage: Stage,
        weights: usize,
        frames: usize,
    },

    #[error("idle weights for stage {stage:?} must be non-negative with a positive sum")]
    BadWeights { stage: Stage },

    #[error("no food sprites for {0:?}")]
    MissingFoodSprites(FoodKind),
}

/// Frame counts for one stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageFrames {
    pub idle: usize,
    pub eat: usize,
    pub happy: usize,
    pub refuse: usize,
    pub sleep: usize,
    /// Relative idle pose weights. Used only when there is one per idle frame.
    #[serde(default)]
    pub idle_weights: Vec<f32>,
}

impl StageFrames {
    pub fn count(&self, animation: Animation) -> usize {
        match animation {
            Animation::Idle => self.idle,
            Animation::Eat => self.eat,
            Animation::Happy => self.happy,
            Animation::Refuse => self.refuse,
            Animation::Sleep => self.sleep,
        }
    }

    /// Weights usable for a weighted idle pick, if they line up with the frames.
    pub fn usable_weights(&self) -> Option<&[f32]> {
        let ok = self.idle_weights.len() == self.idle
            && self.idle > 0
            && self.idle_weights.iter().all(|w| w.is_finite() && *w >= 0.0)
            && self.idle_weights.iter().sum::<f32>() > 0.0;
        ok.then_some(self.idle_weights.as_slice())
    }
}

impl Default for StageFrames {
    fn default() -> Self {
        StageFrames {
            idle: 4,
            eat: 2,
            happy: 2,
            refuse: 2,
            sleep: 2,
            idle_weights: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    pub baby: StageFrames,
    pub teen: StageFrames,
    pub adult: StageFrames,
    pub fish_sprites: usize,
    pub cake_sprites: usize,
}

impl Default for AssetConfig {
    fn default() -> Self {
        AssetConfig {
            baby: StageFrames::default(),
            teen: StageFrames::default(),
            adult: StageFrames::default(),
            fish_sprites: 4,
            cake_sprites: 4,
        }
    }
}

impl AssetConfig {
    pub fn from_json(json: &str) -> Result<Self, AssetError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Frames for a stage. The grave reuses the adult set.
    pub fn frames(&self, stage: Stage) -> &StageFrames {
        match stage.frame_stage() {
            Stage::Baby => &self.baby,
            Stage::Teen => &self.teen,
            _ => &self.adult,
        }
    }

    pub fn count(&self, stage: Stage, animation: Animation) -> usize {
        self.frames(stage).count(animation)
    }

    pub fn food_sprites(&self, kind: FoodKind) -> usize {
        match kind {
            FoodKind::Fish => self.fish_sprites,
            FoodKind::Cake => self.cake_sprites,
        }
    }

    /// Every problem in the description, in a stable order.
    pub fn validate(&self) -> Vec<AssetError> {
        let mut problems = Vec::new();
        for stage in [Stage::Baby, Stage::Teen, Stage::Adult] {
            let frames = self.frames(stage);
            for animation in [
                Animation::Idle,
                Animation::Eat,
                Animation::Happy,
                Animation::Refuse,
                Animation::Sleep,
            ] {
                if frames.count(animation) == 0 {
                    problems.push(AssetError::MissingFrames { stage, animation });
                }
            }
            if !frames.idle_weights.is_empty() {
                if frames.idle_weights.len() != frames.idle {
                    problems.push(AssetError::WeightMismatch {
                        stage,
                        weights: frames.idle_weights.len(),
                        frames: frames.idle,
                    });
                } else if frames.usable_weights().is_none() {
                    problems.push(AssetError::BadWeights { stage });
                }
            }
        }
        for kind in [FoodKind::Fish, FoodKind::Cake] {
            if self.food_sprites(kind) == 0 {
                problems.push(AssetError::MissingFoodSprites(kind));
            }
        }
        problems
    }

    /// Validate and log each problem. Returns the number of problems found.
    pub fn report(&self) -> usize {
        let problems = self.validate();
        for problem in &problems {
            tracing::warn!(%problem, "asset configuration degraded");
        }
        problems.len()
    }
}
