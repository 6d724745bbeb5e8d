use super::lock::Exclusive;

/// Why a requested operation was rejected. A rejection is always a no-op:
/// the creature is left exactly as it was.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PetError {
    #[error("the dragon is dead")]
    Dead,

    #[error("the dragon is already full")]
    AlreadyFull,

    #[error("the dragon is already as happy as it gets")]
    AlreadyHappy,

    #[error("the dragon is too tired to play")]
    TooTired,

    #[error("busy: {0} animation in progress")]
    AnimationLocked(Exclusive),

    #[error("the dragon is already asleep")]
    AlreadyAsleep,

    #[error("the dragon is already awake")]
    AlreadyAwake,

    #[error("the dragon is asleep")]
    Asleep,

    #[error("no feeding animation to cancel")]
    NothingToCancel,
}

impl PetError {
    /// Stable machine-readable code for API responses and metric labels.
    pub fn code(&self) -> &'static str {
        match self {
            PetError::Dead => "dead",
            PetError::AlreadyFull => "already_full",
            PetError::AlreadyHappy => "already_happy",
            PetError::TooTired => "too_tired",
            PetError::AnimationLocked(_) => "animation_locked",
            PetError::AlreadyAsleep => "already_asleep",
            PetError::AlreadyAwake => "already_awake",
            PetError::Asleep => "asleep",
            PetError::NothingToCancel => "nothing_to_cancel",
        }
    }
}
