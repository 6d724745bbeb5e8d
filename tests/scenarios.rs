// End-to-end scenarios driven through the public simulation API with a
// manual day clock.

use std::time::Duration;

use dragon_pet::engine::assets::AssetConfig;
use dragon_pet::engine::clock::ManualClock;
use dragon_pet::engine::config::*;
use dragon_pet::engine::creature::{FoodKind, SleepState, Stage};
use dragon_pet::engine::effects::{Animation, Effect, SequenceId, Sprite};
use dragon_pet::engine::error::PetError;
use dragon_pet::engine::lock::{AnimationLock, Exclusive};
use dragon_pet::engine::pet::{FeedingOutcome, Pet};

const SECOND: Duration = Duration::from_secs(1);

fn pet_at(hour: u32) -> (Pet, ManualClock) {
    let clock = ManualClock::at(hour, 0);
    let pet = Pet::new(Box::new(clock.clone()), AssetConfig::default(), 7);
    (pet, clock)
}

/// Advance clock and simulation together in one-second steps.
fn run(pet: &mut Pet, clock: &ManualClock, secs: u64) {
    for _ in 0..secs {
        clock.advance(SECOND);
        pet.tick(SECOND);
    }
}

#[test]
fn fish_feeds_until_full_then_is_refused() {
    let (mut pet, clock) = pet_at(8);
    run(&mut pet, &clock, 5 * 60);
    assert_eq!(pet.creature().stats.hunger, MAX_HUNGER - 5);

    pet.feed(FoodKind::Fish).unwrap();
    pet.feed(FoodKind::Fish).unwrap();
    // The third serving is capped at the maximum
    pet.feed(FoodKind::Fish).unwrap();
    let stats = pet.creature().stats;
    assert_eq!(stats.hunger, MAX_HUNGER);
    assert_eq!(stats.weight, 8);

    assert_eq!(pet.feed(FoodKind::Fish), Err(PetError::AlreadyFull));
    assert_eq!(pet.creature().stats, stats);
}

#[test]
fn play_spends_energy_until_tired() {
    let (mut pet, clock) = pet_at(8);
    assert_eq!(pet.play(), Err(PetError::AlreadyHappy));

    run(&mut pet, &clock, 8 * 60);
    assert_eq!(pet.creature().stats.happiness, 0);
    for _ in 0..4 {
        pet.play().unwrap();
    }
    assert_eq!(pet.creature().stats.energy, 2);
    assert_eq!(pet.creature().stats.happiness, MAX_HAPPINESS);

    run(&mut pet, &clock, 60);
    assert_eq!(pet.play(), Err(PetError::TooTired));
    assert_eq!(pet.creature().stats.happiness, MAX_HAPPINESS - 1);
}

#[test]
fn weight_carries_over_on_evolution() {
    let (mut pet, clock) = pet_at(8);
    for _ in 0..3 {
        pet.feed(FoodKind::Cake).unwrap();
    }
    assert_eq!(pet.creature().stats.weight, 8);

    run(&mut pet, &clock, 610);
    assert_eq!(pet.creature().stage, Stage::Teen);
    assert_eq!(pet.creature().stats.weight, 13);
    assert!(pet.lock().is_free());
}

#[test]
fn evolution_waits_for_feeding_to_finish() {
    let (mut pet, clock) = pet_at(8);
    run(&mut pet, &clock, 599);
    assert_eq!(
        pet.start_feeding(FoodKind::Fish),
        Ok(FeedingOutcome::Eating)
    );

    run(&mut pet, &clock, 5);
    assert_eq!(pet.pending_evolution(), Some(Stage::Teen));
    assert_eq!(pet.creature().stage, Stage::Baby);
    assert!(pet.eating_locked());

    let mut waited = 0;
    while pet.creature().stage == Stage::Baby && waited < 30 {
        run(&mut pet, &clock, 1);
        waited += 1;
    }
    assert_eq!(pet.creature().stage, Stage::Teen);
    // Committed on this tick, so the new stage starts from zero
    assert_eq!(pet.creature().stage_timer, Duration::ZERO);
    assert_eq!(pet.pending_evolution(), None);
    // One fish above the baby floor
    assert_eq!(pet.creature().stats.weight, BASE_WEIGHT[1] + 1);
    assert!(pet.lock().is_free());
}

#[test]
fn feeding_rejected_while_evolving() {
    let (mut pet, clock) = pet_at(8);
    run(&mut pet, &clock, 600);
    assert!(pet.evolving());
    assert_eq!(
        pet.start_feeding(FoodKind::Cake),
        Err(PetError::AnimationLocked(Exclusive::Evolution))
    );
}

#[test]
fn refusal_plays_and_changes_nothing() {
    let (mut pet, clock) = pet_at(8);
    let before = pet.creature().stats;
    assert_eq!(
        pet.start_feeding(FoodKind::Fish),
        Ok(FeedingOutcome::Refused)
    );
    assert_eq!(pet.lock(), AnimationLock::Playing(Exclusive::Refusal));

    run(&mut pet, &clock, 4);
    assert!(pet.lock().is_free());
    assert_eq!(pet.creature().stats, before);
}

#[test]
fn cancelled_feeding_hides_food_and_frees_the_slot() {
    let (mut pet, clock) = pet_at(8);
    run(&mut pet, &clock, 2);
    pet.drain_effects();

    pet.start_feeding(FoodKind::Cake).unwrap();
    run(&mut pet, &clock, 2);
    pet.drain_effects();

    pet.cancel_feeding().unwrap();
    assert!(pet.lock().is_free());
    assert_eq!(pet.creature().stats.weight, 6);
    let mut effects = pet.drain_effects();
    assert!(effects.contains(&Effect::SetVisible {
        sprite: Sprite::Food,
        visible: false,
    }));
    assert_eq!(pet.cancel_feeding(), Err(PetError::NothingToCancel));

    // Nothing of the happy phase shows up, then or later
    run(&mut pet, &clock, (EAT_DURATION + HAPPY_DURATION).as_secs() + 2);
    effects.extend(pet.drain_effects());
    let happy_frames = effects
        .iter()
        .filter(|e| {
            matches!(
                e,
                Effect::SetFrame {
                    sequence: SequenceId::Creature {
                        animation: Animation::Happy,
                        ..
                    },
                    ..
                }
            )
        })
        .count();
    assert_eq!(happy_frames, 0);
}

#[test]
fn night_during_feeding_sleeps_once_the_meal_is_over() {
    let (mut pet, clock) = pet_at(20);
    run(&mut pet, &clock, 3595);
    assert!(pet.lock().is_free());
    assert_eq!(
        pet.start_feeding(FoodKind::Cake),
        Ok(FeedingOutcome::Eating)
    );

    run(&mut pet, &clock, 6);
    assert!(pet.creature().is_awake());
    assert!(pet.eating_locked());
    assert!(pet.night_pending());

    run(&mut pet, &clock, 15);
    assert!(pet.lock().is_free());
    assert!(matches!(
        pet.creature().sleep,
        SleepState::FullSleep { .. }
    ));
    assert_eq!(pet.creature().position, FULL_SLEEP_POSITION);
}

#[test]
fn sleep_requests_wait_for_the_slot() {
    let (mut pet, clock) = pet_at(10);
    run(&mut pet, &clock, 120);
    pet.start_feeding(FoodKind::Fish).unwrap();
    let locked = Err(PetError::AnimationLocked(Exclusive::Feeding));
    assert_eq!(pet.start_nap(), locked);
    assert_eq!(pet.start_full_sleep(), locked);

    run(&mut pet, &clock, 12);
    assert!(pet.lock().is_free());
    assert!(matches!(pet.start_nap(), Ok(SleepState::Napping { .. })));
    assert_eq!(pet.creature().position.x, NAP_X);
    assert_eq!(pet.start_feeding(FoodKind::Cake), Err(PetError::Asleep));
}

#[test]
fn poop_saturates_and_flushes() {
    let (mut pet, clock) = pet_at(7);
    run(&mut pet, &clock, 7300);
    assert_eq!(pet.poop().count, MAX_POOP);

    run(&mut pet, &clock, 1900);
    assert_eq!(pet.poop().count, MAX_POOP);

    pet.flush_poop();
    assert_eq!(pet.poop().count, 0);
    assert_eq!(pet.poop().visible(), [false, false]);
}

#[test]
fn neglect_kills_a_teen_and_death_is_final() {
    let (mut pet, clock) = pet_at(7);
    run(&mut pet, &clock, 12_000);

    assert!(pet.creature().is_dead());
    assert_eq!(pet.creature().stage, Stage::Dead);
    assert!(pet.lock().is_free());
    assert_eq!(pet.creature().position.x, DEATH_X);

    let stats = pet.creature().stats;
    assert_eq!(pet.feed(FoodKind::Cake), Err(PetError::Dead));
    assert_eq!(pet.play(), Err(PetError::Dead));
    assert_eq!(pet.start_nap(), Err(PetError::Dead));
    assert_eq!(pet.start_feeding(FoodKind::Cake), Err(PetError::Dead));

    run(&mut pet, &clock, 600);
    assert_eq!(pet.creature().stage, Stage::Dead);
    assert_eq!(pet.creature().stats, stats);
}

#[test]
fn babies_survive_neglect() {
    let (mut pet, clock) = pet_at(7);
    run(&mut pet, &clock, 590);
    assert!(pet.creature().stats.is_neglected());
    assert!(pet.warning().alert_fired);
    assert!(!pet.creature().is_dead());
    assert_eq!(pet.creature().neglect_timer, Duration::ZERO);
}

#[test]
fn night_forces_sleep_and_morning_ages() {
    let (mut pet, clock) = pet_at(20);
    run(&mut pet, &clock, 3600 + 5);
    assert!(matches!(
        pet.creature().sleep,
        SleepState::FullSleep { .. }
    ));

    let stats = pet.creature().stats;
    run(&mut pet, &clock, 3600);
    // Asleep: nothing decays
    assert_eq!(pet.creature().stats.hunger, stats.hunger);

    // Sleep through to the next day start at 07:00
    run(&mut pet, &clock, 9 * 3600);
    assert!(pet.creature().is_awake());
    assert_eq!(pet.creature().stats.age, 1);
    assert_eq!(pet.creature().stats.energy, MAX_ENERGY);
}

#[test]
fn nap_wakes_without_aging() {
    let (mut pet, clock) = pet_at(10);
    assert!(matches!(
        pet.start_nap(),
        Ok(SleepState::Napping { .. })
    ));
    run(&mut pet, &clock, 3 * 3600 + 1);
    assert!(pet.creature().is_awake());
    assert_eq!(pet.creature().stats.age, 0);
}

#[test]
fn late_nap_becomes_full_sleep() {
    let (mut pet, _) = pet_at(19);
    assert!(matches!(
        pet.start_nap(),
        Ok(SleepState::FullSleep { .. })
    ));
    assert_eq!(pet.wake_up(), Ok(true));
    assert_eq!(pet.creature().stats.age, 1);
    assert_eq!(pet.wake_up(), Err(PetError::AlreadyAwake));
}
