// Prometheus metrics definitions for the dragon pet service.

use std::sync::Once;

use lazy_static::lazy_static;
use prometheus::{
    Encoder, Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts,
    Registry, TextEncoder,
};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // ── Gauges ───────────────────────────────────────────────────────

    /// Live WebSocket connections.
    pub static ref CONNECTED_WEBSOCKETS: IntGauge =
        IntGauge::new("pet_connected_websockets", "Live WebSocket connections").unwrap();

    // ── Counters ─────────────────────────────────────────────────────

    /// Simulation ticks processed.
    pub static ref TICKS_TOTAL: IntCounter =
        IntCounter::new("pet_ticks_total", "Simulation ticks processed").unwrap();

    /// Completed evolutions, by the stage reached.
    pub static ref EVOLUTIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("pet_evolutions_total", "Completed evolutions"),
        &["stage"],
    )
    .unwrap();

    /// Deaths from neglect.
    pub static ref DEATHS_TOTAL: IntCounter =
        IntCounter::new("pet_deaths_total", "Deaths from neglect").unwrap();

    /// Feeding requests, by food and outcome (accepted, refused).
    pub static ref FEEDINGS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("pet_feedings_total", "Feeding requests"),
        &["food", "outcome"],
    )
    .unwrap();

    /// Warning alerts raised.
    pub static ref ALERTS_TOTAL: IntCounter =
        IntCounter::new("pet_alerts_total", "Warning alerts raised").unwrap();

    /// Poops spawned.
    pub static ref POOPS_SPAWNED_TOTAL: IntCounter =
        IntCounter::new("pet_poops_spawned_total", "Poops spawned").unwrap();

    /// Commands rejected by the simulation, by reason.
    pub static ref COMMANDS_REJECTED_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("pet_commands_rejected_total", "Commands rejected by the simulation"),
        &["reason"],
    )
    .unwrap();

    /// Total API requests, by method/endpoint/status.
    pub static ref API_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("pet_api_requests_total", "Total API requests"),
        &["method", "endpoint", "status"],
    )
    .unwrap();

    /// Total WebSocket messages sent to clients.
    pub static ref WEBSOCKET_MESSAGES_SENT_TOTAL: IntCounter = IntCounter::new(
        "pet_websocket_messages_sent_total",
        "Total WebSocket messages sent",
    )
    .unwrap();

    // ── Histograms ───────────────────────────────────────────────────

    /// Per-tick processing time in milliseconds.
    pub static ref TICK_DURATION_MS: Histogram = Histogram::with_opts(
        HistogramOpts::new("pet_tick_duration_ms", "Per-tick processing time in ms")
            .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 50.0]),
    )
    .unwrap();

    /// API request duration in seconds, by endpoint.
    pub static ref API_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "pet_api_request_duration_seconds",
            "API request duration in seconds",
        )
        .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 5.0]),
        &["endpoint"],
    )
    .unwrap();
}

static REGISTER: Once = Once::new();

/// Register all metrics with the custom registry. Safe to call more than once.
pub fn register_metrics() {
    REGISTER.call_once(|| {
        let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
            Box::new(CONNECTED_WEBSOCKETS.clone()),
            Box::new(TICKS_TOTAL.clone()),
            Box::new(EVOLUTIONS_TOTAL.clone()),
            Box::new(DEATHS_TOTAL.clone()),
            Box::new(FEEDINGS_TOTAL.clone()),
            Box::new(ALERTS_TOTAL.clone()),
            Box::new(POOPS_SPAWNED_TOTAL.clone()),
            Box::new(COMMANDS_REJECTED_TOTAL.clone()),
            Box::new(API_REQUESTS_TOTAL.clone()),
            Box::new(WEBSOCKET_MESSAGES_SENT_TOTAL.clone()),
            Box::new(TICK_DURATION_MS.clone()),
            Box::new(API_REQUEST_DURATION_SECONDS.clone()),
        ];

        for c in collectors {
            if let Err(e) = REGISTRY.register(c) {
                tracing::warn!("failed to register metric: {e}");
            }
        }
    });
}

/// Serialize all registered metrics to the Prometheus text exposition format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("failed to encode metrics: {e}");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Collapse a request path to a low-cardinality label. Unknown paths are
/// grouped so scanners cannot blow up the label set.
pub fn normalize_path(path: &str) -> String {
    const KNOWN: &[&str] = &["/health", "/metrics", "/ws/pet", "/api/pet"];
    if KNOWN.contains(&path) || path.starts_with("/api/pet/") {
        path.trim_end_matches('/').to_string()
    } else {
        "other".to_string()
    }
}
