use std::time::Duration;

use serde::Serialize;

use super::config::{MAX_POOP, POOP_INTERVAL, POOP_POSITIONS};
use super::effects::{Effect, PoopLook, SequenceId, Sprite};

/// Poop spawner. The two display slots fill first, later firings swap them
/// to the "changed" look.
#[derive(Debug, Default, Serialize)]
pub struct PoopState {
    pub count: u8,
    #[serde(skip)]
    pub timer: Duration,
    #[serde(skip)]
    shown: [bool; 2],
}

impl PoopState {
    /// Advance the spawn timer. The timer does not run while `paused`.
    /// Returns how many poops were added.
    pub fn tick(&mut self, dt: Duration, paused: bool, out: &mut Vec<Effect>) -> u32 {
        if paused {
            return 0;
        }
        self.timer += dt;
        let mut added = 0;
        while self.timer >= POOP_INTERVAL {
            self.timer -= POOP_INTERVAL;
            if self.add(out) {
                added += 1;
            }
        }
        added
    }

    /// One spawner firing. Returns false once saturated.
    pub fn add(&mut self, out: &mut Vec<Effect>) -> bool {
        if self.count >= MAX_POOP {
            tracing::debug!(count = self.count, "poop limit reached");
            return false;
        }
        self.count += 1;
        let (slot, look) = match self.count {
            1 => (0, PoopLook::Normal),
            2 => (1, PoopLook::Normal),
            3 => (0, PoopLook::Changed),
            _ => (1, PoopLook::Changed),
        };
        if look == PoopLook::Normal {
            out.push(Effect::SetPosition {
                sprite: Sprite::Poop(slot),
                position: POOP_POSITIONS[slot],
            });
        }
        out.push(Effect::SetFrame {
            sprite: Sprite::Poop(slot),
            sequence: SequenceId::Poop(look),
            index: 0,
        });
        tracing::debug!(count = self.count, "poop spawned");
        true
    }

    pub fn flush(&mut self, out: &mut Vec<Effect>) {
        self.count = 0;
        self.timer = Duration::ZERO;
        self.sync_visibility(false, out);
    }

    /// Show the occupied slots when `allowed`, hide everything otherwise.
    /// Only changes are emitted.
    pub fn sync_visibility(&mut self, allowed: bool, out: &mut Vec<Effect>) {
        for slot in 0..self.shown.len() {
            let want = allowed && usize::from(self.count) > slot;
            if self.shown[slot] != want {
                self.shown[slot] = want;
                out.push(Effect::SetVisible {
                    sprite: Sprite::Poop(slot),
                    visible: want,
                });
            }
        }
    }

    pub fn visible(&self) -> [bool; 2] {
        self.shown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_saturates_at_four() {
        let mut poop = PoopState::default();
        let mut out = Vec::new();
        let added = poop.tick(POOP_INTERVAL * 6, false, &mut out);
        assert_eq!(added, 4);
        assert_eq!(poop.count, MAX_POOP);
        assert!(!poop.add(&mut out));
        assert_eq!(poop.count, MAX_POOP);
    }

    #[test]
    fn test_one_poop_per_half_hour() {
        let mut poop = PoopState::default();
        let mut out = Vec::new();
        // Twenty seconds is nowhere near enough
        assert_eq!(poop.tick(Duration::from_secs(20), false, &mut out), 0);
        assert_eq!(poop.tick(Duration::from_secs(29 * 60), false, &mut out), 0);
        assert_eq!(poop.tick(Duration::from_secs(40), false, &mut out), 1);
        assert_eq!(POOP_INTERVAL, Duration::from_secs(30 * 60));
    }

    #[test]
    fn test_third_and_fourth_change_look() {
        let mut poop = PoopState::default();
        let mut out = Vec::new();
        for _ in 0..4 {
            poop.add(&mut out);
        }
        let looks: Vec<(Sprite, SequenceId)> = out
            .iter()
            .filter_map(|e| match e {
                Effect::SetFrame {
                    sprite, sequence, ..
                } => Some((*sprite, *sequence)),
                _ => None,
            })
            .collect();
        assert_eq!(
            looks,
            vec![
                (Sprite::Poop(0), SequenceId::Poop(PoopLook::Normal)),
                (Sprite::Poop(1), SequenceId::Poop(PoopLook::Normal)),
                (Sprite::Poop(0), SequenceId::Poop(PoopLook::Changed)),
                (Sprite::Poop(1), SequenceId::Poop(PoopLook::Changed)),
            ]
        );
    }

    #[test]
    fn test_paused_timer_does_not_advance() {
        let mut poop = PoopState::default();
        let mut out = Vec::new();
        poop.tick(POOP_INTERVAL - Duration::from_secs(1), false, &mut out);
        assert_eq!(poop.tick(Duration::from_secs(3600), true, &mut out), 0);
        assert_eq!(poop.count, 0);
        assert_eq!(poop.tick(Duration::from_secs(1), false, &mut out), 1);
    }

    #[test]
    fn test_flush_resets_and_hides() {
        let mut poop = PoopState::default();
        let mut out = Vec::new();
        poop.tick(POOP_INTERVAL * 2 + Duration::from_secs(10), false, &mut out);
        poop.sync_visibility(true, &mut out);
        assert_eq!(poop.visible(), [true, true]);

        out.clear();
        poop.flush(&mut out);
        assert_eq!(poop.count, 0);
        assert_eq!(poop.timer, Duration::ZERO);
        assert_eq!(poop.visible(), [false, false]);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_visibility_only_emits_changes() {
        let mut poop = PoopState::default();
        let mut out = Vec::new();
        poop.add(&mut out);
        out.clear();

        poop.sync_visibility(true, &mut out);
        poop.sync_visibility(true, &mut out);
        assert_eq!(
            out,
            vec![Effect::SetVisible {
                sprite: Sprite::Poop(0),
                visible: true
            }]
        );

        poop.sync_visibility(false, &mut out);
        assert_eq!(poop.visible(), [false, false]);
        assert_eq!(out.len(), 2);
    }
}
