use std::fmt;

use serde::Serialize;

/// The exclusive sequences that can own the display slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Exclusive {
    Feeding,
    Refusal,
    Evolution,
}

impl fmt::Display for Exclusive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Exclusive::Feeding => "feeding",
            Exclusive::Refusal => "refusal",
            Exclusive::Evolution => "evolution",
        })
    }
}

/// Who currently owns the display slot. Only the legal flag combinations
/// are representable: at most one exclusive sequence holds the lock.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "lock", content = "by", rename_all = "snake_case")]
pub enum AnimationLock {
    #[default]
    Free,
    Playing(Exclusive),
}

impl AnimationLock {
    /// Take the lock for `kind`. Fails with the current holder if taken.
    pub fn acquire(&mut self, kind: Exclusive) -> Result<(), Exclusive> {
        match *self {
            AnimationLock::Free => {
                *self = AnimationLock::Playing(kind);
                Ok(())
            }
            AnimationLock::Playing(holder) => Err(holder),
        }
    }

    /// Release the lock held by `kind`.
    pub fn release(&mut self, kind: Exclusive) {
        debug_assert_eq!(
            *self,
            AnimationLock::Playing(kind),
            "lock released by a sequence that does not hold it"
        );
        if *self == AnimationLock::Playing(kind) {
            *self = AnimationLock::Free;
        }
    }

    pub fn holder(&self) -> Option<Exclusive> {
        match *self {
            AnimationLock::Free => None,
            AnimationLock::Playing(kind) => Some(kind),
        }
    }

    pub fn is_free(&self) -> bool {
        *self == AnimationLock::Free
    }

    pub fn animation_playing(&self) -> bool {
        !self.is_free()
    }

    pub fn evolving(&self) -> bool {
        *self == AnimationLock::Playing(Exclusive::Evolution)
    }

    pub fn eating_locked(&self) -> bool {
        *self == AnimationLock::Playing(Exclusive::Feeding)
    }
}
