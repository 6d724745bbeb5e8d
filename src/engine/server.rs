// Pet server: owns the simulation on a dedicated thread, applies commands sent
// from the HTTP layer and broadcasts state to WebSocket clients.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, oneshot};

use crate::metrics;

use super::assets::AssetConfig;
use super::clock::{DayClock, ManualClock, ScaledClock, SystemClock};
use super::creature::{FoodKind, SleepState};
use super::effects::{Effect, LogPresenter};
use super::error::PetError;
use super::pet::{FeedingOutcome, Pet, PetSnapshot, UiMode};

/// Messages sent from the simulation loop to WebSocket clients.
#[derive(Clone, Serialize, Debug)]
#[serde(tag = "type")]
pub enum PetMessage {
    /// Full state after a tick.
    #[serde(rename = "snapshot")]
    Snapshot(PetSnapshot),
    /// Presentation commands emitted since the previous batch.
    #[serde(rename = "effects")]
    Effects { tick: u64, effects: Vec<Effect> },
    /// The simulation loop stopped.
    #[serde(rename = "stopped")]
    Stopped { reason: String },
}

impl PetMessage {
    pub fn kind(&self) -> MessageKind {
        match self {
            PetMessage::Snapshot(_) => MessageKind::Snapshot,
            PetMessage::Effects { .. } => MessageKind::Effects,
            PetMessage::Stopped { .. } => MessageKind::Stopped,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Snapshot,
    Effects,
    Stopped,
}

/// A published message: its kind, so subscribers can filter without
/// parsing, and the JSON sent over the wire.
#[derive(Debug, Clone)]
pub struct Broadcast {
    pub kind: MessageKind,
    pub json: String,
}

/// Operations the host can request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Feed(FoodKind),
    Play,
    Nap,
    FullSleep,
    Wake,
    StartFeeding(FoodKind),
    CancelFeeding,
    FlushPoop,
    Reset,
    SetUiMode(UiMode),
    Snapshot,
}

impl Command {
    pub fn label(&self) -> &'static str {
        match self {
            Command::Feed(_) => "feed",
            Command::Play => "play",
            Command::Nap => "nap",
            Command::FullSleep => "sleep",
            Command::Wake => "wake",
            Command::StartFeeding(_) => "start_feeding",
            Command::CancelFeeding => "cancel_feeding",
            Command::FlushPoop => "flush",
            Command::Reset => "reset",
            Command::SetUiMode(_) => "ui_mode",
            Command::Snapshot => "snapshot",
        }
    }
}

/// What an accepted command did.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Outcome {
    Done,
    Feeding { outcome: FeedingOutcome },
    Asleep { sleep: SleepState },
    Awake { aged: bool },
}

/// Answer to a command, with the state right after it was applied.
#[derive(Debug, Clone)]
pub struct CommandReply {
    pub result: Result<Outcome, PetError>,
    pub snapshot: PetSnapshot,
}

struct Envelope {
    command: Command,
    reply: oneshot::Sender<CommandReply>,
}

/// Apply one command to the simulation.
pub fn apply(pet: &mut Pet, command: Command) -> Result<Outcome, PetError> {
    let result = match command {
        Command::Feed(kind) => pet.feed(kind).map(|_| Outcome::Done),
        Command::Play => pet.play().map(|_| Outcome::Done),
        Command::Nap => pet.start_nap().map(|sleep| Outcome::Asleep { sleep }),
        Command::FullSleep => pet
            .start_full_sleep()
            .map(|sleep| Outcome::Asleep { sleep }),
        Command::Wake => pet.wake_up().map(|aged| Outcome::Awake { aged }),
        Command::StartFeeding(kind) => pet
            .start_feeding(kind)
            .map(|outcome| Outcome::Feeding { outcome }),
        Command::CancelFeeding => pet.cancel_feeding().map(|_| Outcome::Done),
        Command::FlushPoop => {
            pet.flush_poop();
            Ok(Outcome::Done)
        }
        Command::Reset => {
            pet.reset();
            Ok(Outcome::Done)
        }
        Command::SetUiMode(mode) => {
            pet.set_ui_mode(mode);
            Ok(Outcome::Done)
        }
        Command::Snapshot => Ok(Outcome::Done),
    };
    if let Err(e) = &result {
        tracing::warn!(command = command.label(), error = %e, "command rejected");
        metrics::COMMANDS_REJECTED_TOTAL
            .with_label_values(&[e.code()])
            .inc();
    }
    result
}

/// How to run the simulation loop.
pub struct SimSettings {
    /// Real time between ticks.
    pub tick: Duration,
    /// Simulated seconds per real second.
    pub time_scale: f64,
    pub assets: AssetConfig,
    pub seed: u64,
    /// Day-cycle source. `None` picks a clock matching `time_scale`.
    pub clock: Option<Box<dyn DayClock>>,
}

impl Default for SimSettings {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(100),
            time_scale: 1.0,
            assets: AssetConfig::default(),
            seed: 0,
            clock: None,
        }
    }
}

impl SimSettings {
    /// Simulated time per tick.
    pub fn sim_dt(&self) -> Duration {
        self.tick.mul_f64(self.time_scale.max(0.0))
    }

    fn take_clock(&mut self) -> Box<dyn DayClock> {
        match self.clock.take() {
            Some(clock) => clock,
            None if (self.time_scale - 1.0).abs() < f64::EPSILON => Box::new(SystemClock),
            None => Box::new(ScaledClock::from_local(self.time_scale)),
        }
    }
}

fn publish(tx: &broadcast::Sender<Broadcast>, msg: &PetMessage) -> Option<String> {
    match serde_json::to_string(msg) {
        Ok(json) => {
            // No subscribers is fine
            let _ = tx.send(Broadcast {
                kind: msg.kind(),
                json: json.clone(),
            });
            Some(json)
        }
        Err(e) => {
            tracing::error!("Failed to serialize pet message: {e}");
            None
        }
    }
}

fn panic_message(panic_info: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic_info.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic_info.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Result of a headless run.
#[derive(Debug, Clone, Serialize)]
pub struct HeadlessReport {
    pub ticks: u64,
    pub presented_commands: u64,
    pub snapshot: PetSnapshot,
}

/// Run the simulation headless: no per-tick sleep, no broadcast, and the day
/// clock advanced with simulated time. Effects go to a logging presenter.
pub fn run_headless(mut settings: SimSettings, duration: Duration) -> Result<HeadlessReport, String> {
    let dt = settings.sim_dt();
    if dt.is_zero() {
        return Err("tick duration must be positive".into());
    }
    let clock = ManualClock::new(chrono::Local::now().naive_local());
    let assets = std::mem::take(&mut settings.assets);
    let seed = settings.seed;

    let result = std::panic::catch_unwind(AssertUnwindSafe(|| {
        let mut pet = Pet::new(Box::new(clock.clone()), assets, seed);
        let mut presenter = LogPresenter::default();
        let mut elapsed = Duration::ZERO;
        while elapsed < duration {
            clock.advance(dt);
            pet.tick(dt);
            elapsed += dt;
            metrics::TICKS_TOTAL.inc();
            for effect in pet.drain_effects() {
                effect.apply(&mut presenter);
            }
        }
        HeadlessReport {
            ticks: pet.ticks(),
            presented_commands: presenter.commands,
            snapshot: pet.snapshot(),
        }
    }));

    result.map_err(|panic_info| {
        let msg = panic_message(panic_info.as_ref());
        tracing::error!("Headless run panicked: {}", msg);
        msg
    })
}

/// Runs the pet on a dedicated thread and relays commands and state.
pub struct PetServer {
    broadcast_tx: broadcast::Sender<Broadcast>,
    commands: Mutex<Option<mpsc::Sender<Envelope>>>,
    running: Arc<AtomicBool>,
    /// Cached snapshot JSON so late-joining WS clients see the pet at once.
    latest_json: Arc<Mutex<Option<String>>>,
    current_tick: Arc<AtomicU64>,
}

impl Default for PetServer {
    fn default() -> Self {
        Self::new()
    }
}

impl PetServer {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(256);
        Self {
            broadcast_tx: tx,
            commands: Mutex::new(None),
            running: Arc::new(AtomicBool::new(false)),
            latest_json: Arc::new(Mutex::new(None)),
            current_tick: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Subscribe to pet messages.
    pub fn subscribe(&self) -> broadcast::Receiver<Broadcast> {
        self.broadcast_tx.subscribe()
    }

    pub fn latest_json(&self) -> Option<String> {
        self.latest_json
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    pub fn current_tick(&self) -> u64 {
        self.current_tick.load(Ordering::Relaxed)
    }

    pub fn subscriber_count(&self) -> usize {
        self.broadcast_tx.receiver_count()
    }

    /// Ask the loop to stop after its current tick.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);
        *self.commands.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }

    /// Start the simulation loop on its own OS thread.
    pub fn start(&self, mut settings: SimSettings) -> Result<(), String> {
        if self.is_running() {
            return Err("The simulation is already running".into());
        }
        if settings.tick.is_zero() {
            return Err("tick duration must be positive".into());
        }

        let (cmd_tx, cmd_rx) = mpsc::channel::<Envelope>();
        *self.commands.lock().unwrap_or_else(|e| e.into_inner()) = Some(cmd_tx);

        let tx = self.broadcast_tx.clone();
        let running = self.running.clone();
        let latest_json = self.latest_json.clone();
        let current_tick = self.current_tick.clone();
        let real_tick = settings.tick;
        let dt = settings.sim_dt();
        let clock = settings.take_clock();
        let assets = std::mem::take(&mut settings.assets);
        let seed = settings.seed;

        running.store(true, Ordering::Relaxed);
        current_tick.store(0, Ordering::Relaxed);
        tracing::info!(
            tick_ms = real_tick.as_millis() as u64,
            time_scale = settings.time_scale,
            seed,
            "simulation starting"
        );

        std::thread::spawn(move || {
            let result = std::panic::catch_unwind(AssertUnwindSafe(|| {
                let mut pet = Pet::new(clock, assets, seed);
                if let Some(json) = publish(&tx, &PetMessage::Snapshot(pet.snapshot())) {
                    *latest_json.lock().unwrap_or_else(|e| e.into_inner()) = Some(json);
                }

                while running.load(Ordering::Relaxed) {
                    let tick_start = Instant::now();

                    loop {
                        match cmd_rx.try_recv() {
                            Ok(env) => {
                                let result = apply(&mut pet, env.command);
                                let reply = CommandReply {
                                    result,
                                    snapshot: pet.snapshot(),
                                };
                                // The caller may have given up waiting
                                let _ = env.reply.send(reply);
                            }
                            Err(mpsc::TryRecvError::Empty) => break,
                            Err(mpsc::TryRecvError::Disconnected) => {
                                running.store(false, Ordering::Relaxed);
                                break;
                            }
                        }
                    }

                    pet.tick(dt);
                    let tick_elapsed_ms = tick_start.elapsed().as_secs_f64() * 1000.0;
                    metrics::TICK_DURATION_MS.observe(tick_elapsed_ms);
                    metrics::TICKS_TOTAL.inc();
                    current_tick.store(pet.ticks(), Ordering::Relaxed);

                    let effects = pet.drain_effects();
                    if !effects.is_empty() {
                        publish(
                            &tx,
                            &PetMessage::Effects {
                                tick: pet.ticks(),
                                effects,
                            },
                        );
                    }
                    if let Some(json) = publish(&tx, &PetMessage::Snapshot(pet.snapshot())) {
                        *latest_json.lock().unwrap_or_else(|e| e.into_inner()) = Some(json);
                    }

                    std::thread::sleep(real_tick.saturating_sub(tick_start.elapsed()));
                }
            }));

            let reason = match result {
                Ok(()) => "stopped".to_string(),
                Err(panic_info) => {
                    let msg = panic_message(panic_info.as_ref());
                    tracing::error!("Simulation thread panicked: {}", msg);
                    format!("panicked: {msg}")
                }
            };
            publish(&tx, &PetMessage::Stopped { reason });
            running.store(false, Ordering::Relaxed);
            tracing::info!("simulation stopped");
        });

        Ok(())
    }

    /// Send a command to the simulation thread and wait for its reply.
    pub async fn send(&self, command: Command) -> Result<CommandReply, String> {
        let (reply_tx, reply_rx) = oneshot::channel();
        {
            let guard = self.commands.lock().unwrap_or_else(|e| e.into_inner());
            let sender = guard
                .as_ref()
                .ok_or_else(|| "The simulation is not running".to_string())?;
            sender
                .send(Envelope {
                    command,
                    reply: reply_tx,
                })
                .map_err(|_| "The simulation is not running".to_string())?;
        }
        reply_rx
            .await
            .map_err(|_| "The simulation stopped before replying".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::creature::Stage;

    fn fast_settings(clock: ManualClock) -> SimSettings {
        SimSettings {
            tick: Duration::from_millis(5),
            clock: Some(Box::new(clock)),
            ..SimSettings::default()
        }
    }

    #[test]
    fn test_pet_server_new() {
        let server = PetServer::new();
        assert!(!server.is_running());
        assert!(server.latest_json().is_none());
    }

    #[test]
    fn test_message_serialization() {
        let clock = ManualClock::at(10, 0);
        let pet = Pet::new(Box::new(clock), AssetConfig::default(), 1);
        let json = serde_json::to_string(&PetMessage::Snapshot(pet.snapshot())).unwrap();
        assert!(json.contains("\"type\":\"snapshot\""));
        assert!(json.contains("\"stage\":\"baby\""));

        let json = serde_json::to_string(&PetMessage::Effects {
            tick: 3,
            effects: vec![Effect::PlayOneShot {
                clip: crate::engine::effects::Clip::Happy,
            }],
        })
        .unwrap();
        assert!(json.contains("\"type\":\"effects\""));
        assert!(json.contains("\"op\":\"play_one_shot\""));
    }

    #[test]
    fn test_apply_maps_operations() {
        let clock = ManualClock::at(10, 0);
        let mut pet = Pet::new(Box::new(clock), AssetConfig::default(), 1);
        assert_eq!(
            apply(&mut pet, Command::Feed(FoodKind::Fish)),
            Err(PetError::AlreadyFull)
        );
        assert_eq!(apply(&mut pet, Command::Wake), Err(PetError::AlreadyAwake));
        assert!(matches!(
            apply(&mut pet, Command::Nap),
            Ok(Outcome::Asleep {
                sleep: SleepState::Napping { .. }
            })
        ));
        assert_eq!(
            apply(&mut pet, Command::Wake),
            Ok(Outcome::Awake { aged: false })
        );
    }

    #[test]
    fn test_headless_run() {
        let settings = SimSettings {
            tick: Duration::from_secs(1),
            ..SimSettings::default()
        };
        let report = run_headless(settings, Duration::from_secs(120)).unwrap();
        assert_eq!(report.ticks, 120);
        assert!(report.presented_commands > 0);
        assert_eq!(report.snapshot.stage, Stage::Baby);
    }

    #[test]
    fn test_start_while_running() {
        let server = PetServer::new();
        assert!(server.start(fast_settings(ManualClock::at(10, 0))).is_ok());
        assert!(server.start(fast_settings(ManualClock::at(10, 0))).is_err());
        server.stop();
        std::thread::sleep(Duration::from_millis(100));
        assert!(!server.is_running());
    }

    #[tokio::test]
    async fn test_subscribers_see_message_kinds() {
        let server = PetServer::new();
        let mut rx = server.subscribe();
        server.start(fast_settings(ManualClock::at(10, 0))).unwrap();

        let first = rx.recv().await.unwrap();
        assert_eq!(first.kind, MessageKind::Snapshot);
        assert!(first.json.contains("\"type\":\"snapshot\""));

        server.stop();
        loop {
            match rx.recv().await {
                Ok(msg) if msg.kind == MessageKind::Stopped => {
                    assert!(msg.json.contains("\"type\":\"stopped\""));
                    break;
                }
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(e) => panic!("channel closed before stop message: {e}"),
            }
        }
    }

    #[tokio::test]
    async fn test_send_command() {
        let server = PetServer::new();
        server.start(fast_settings(ManualClock::at(10, 0))).unwrap();

        let reply = server.send(Command::Feed(FoodKind::Cake)).await.unwrap();
        assert_eq!(reply.result, Ok(Outcome::Done));
        assert_eq!(reply.snapshot.stats.weight, 6);

        let reply = server.send(Command::Feed(FoodKind::Fish)).await.unwrap();
        assert_eq!(reply.result, Err(PetError::AlreadyFull));

        server.stop();
        assert!(server.send(Command::Snapshot).await.is_err());
    }
}
