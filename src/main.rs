use std::sync::Arc;

use tower_http::cors::CorsLayer;

use dragon_pet::api;
use dragon_pet::config::Config;
use dragon_pet::engine::server::{run_headless, PetServer};
use dragon_pet::metrics;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cfg = Config::load();
    metrics::register_metrics();

    if let Some(duration) = cfg.headless {
        tracing::info!(seconds = duration.as_secs(), seed = cfg.seed, "Running headless");
        let report = run_headless(cfg.sim_settings(), duration).expect("Headless run failed");
        let json = serde_json::to_string_pretty(&report).expect("Failed to serialize report");
        println!("{json}");
        return;
    }

    let pet_server = Arc::new(PetServer::new());
    pet_server
        .start(cfg.sim_settings())
        .expect("Failed to start pet simulation");

    let app = api::router(pet_server.clone()).layer(CorsLayer::permissive());

    let addr = format!("0.0.0.0:{}", cfg.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| panic!("Failed to bind to {addr}: {e}"));

    tracing::info!(
        port = cfg.port,
        tick_ms = cfg.tick.as_millis() as u64,
        time_scale = cfg.time_scale,
        "Dragon pet listening"
    );
    axum::serve(listener, app)
        .await
        .expect("Failed to start server");

    pet_server.stop();
}
