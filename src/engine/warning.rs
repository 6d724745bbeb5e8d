use std::time::Duration;

use serde::Serialize;

use super::config::*;
use super::effects::{Clip, Effect, Sprite};

/// One-shot flash of the warning icon.
#[derive(Debug, Clone, Copy)]
struct Flash {
    /// Half-cycles shown so far (bright, dim, bright, ...).
    step: u32,
    wait: Duration,
}

impl Flash {
    fn new() -> Self {
        Self {
            step: 0,
            wait: Duration::ZERO,
        }
    }

    /// Returns true once every flash has been shown.
    fn advance(&mut self, dt: Duration, out: &mut Vec<Effect>) -> bool {
        let mut budget = dt;
        while self.wait <= budget {
            budget -= self.wait;
            if self.step >= WARNING_FLASHES * 2 {
                return true;
            }
            if self.step % 2 == 0 {
                out.push(Effect::SetAlpha {
                    sprite: Sprite::Warning,
                    alpha: WARNING_BRIGHT_ALPHA,
                });
                out.push(Effect::PlayOneShot {
                    clip: Clip::Warning,
                });
                self.wait = WARNING_BRIGHT_TIME;
            } else {
                out.push(Effect::SetAlpha {
                    sprite: Sprite::Warning,
                    alpha: WARNING_DIM_ALPHA,
                });
                self.wait = WARNING_DIM_TIME;
            }
            self.step += 1;
        }
        self.wait -= budget;
        false
    }
}

/// Alert raised when hunger or happiness bottoms out.
#[derive(Debug, Default, Serialize)]
pub struct WarningState {
    /// How long the warning condition has persisted.
    #[serde(skip)]
    pub timer: Duration,
    pub alert_fired: bool,
    #[serde(skip)]
    flash: Option<Flash>,
}

impl WarningState {
    pub fn flashing(&self) -> bool {
        self.flash.is_some()
    }

    /// Evaluate the condition for this tick. Returns true when a new alert
    /// was raised.
    pub fn check(&mut self, neglected: bool, dt: Duration) -> bool {
        if !neglected {
            self.timer = Duration::ZERO;
            self.alert_fired = false;
            return false;
        }
        self.timer += dt;
        if self.alert_fired || self.flash.is_some() {
            return false;
        }
        self.alert_fired = true;
        self.flash = Some(Flash::new());
        tracing::info!("dragon needs attention");
        true
    }

    /// Run any in-flight flash. It always finishes, even if the condition
    /// clears meanwhile.
    pub fn advance(&mut self, dt: Duration, out: &mut Vec<Effect>) {
        if let Some(flash) = self.flash.as_mut() {
            if flash.advance(dt, out) {
                self.flash = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clips(out: &[Effect]) -> usize {
        out.iter()
            .filter(|e| matches!(e, Effect::PlayOneShot { clip: Clip::Warning }))
            .count()
    }

    #[test]
    fn test_fires_once_per_episode() {
        let mut w = WarningState::default();
        assert!(w.check(true, Duration::ZERO));
        assert!(!w.check(true, Duration::from_secs(1)));
        assert!(!w.check(true, Duration::from_secs(1)));
        assert_eq!(w.timer, Duration::from_secs(2));

        // Condition clears, guard resets
        assert!(!w.check(false, Duration::from_secs(1)));
        assert!(!w.alert_fired);
        assert_eq!(w.timer, Duration::ZERO);
    }

    #[test]
    fn test_flash_pattern() {
        let mut w = WarningState::default();
        let mut out = Vec::new();
        w.check(true, Duration::ZERO);
        w.advance(Duration::ZERO, &mut out);
        assert!(w.flashing());
        for _ in 0..30 {
            w.advance(Duration::from_millis(100), &mut out);
        }
        assert!(!w.flashing());
        assert_eq!(clips(&out), 3);

        let alphas: Vec<f32> = out
            .iter()
            .filter_map(|e| match e {
                Effect::SetAlpha { alpha, .. } => Some(*alpha),
                _ => None,
            })
            .collect();
        assert_eq!(
            alphas,
            vec![
                WARNING_BRIGHT_ALPHA,
                WARNING_DIM_ALPHA,
                WARNING_BRIGHT_ALPHA,
                WARNING_DIM_ALPHA,
                WARNING_BRIGHT_ALPHA,
                WARNING_DIM_ALPHA,
            ]
        );
    }

    #[test]
    fn test_no_refire_while_flashing() {
        let mut w = WarningState::default();
        let mut out = Vec::new();
        assert!(w.check(true, Duration::ZERO));
        w.advance(Duration::from_millis(200), &mut out);
        // Condition clears and returns before the flash is done
        w.check(false, Duration::from_millis(100));
        assert!(!w.check(true, Duration::from_millis(100)));
        w.advance(Duration::from_secs(5), &mut out);
        assert!(!w.flashing());
        assert_eq!(clips(&out), 3);
    }
}
