// Application configuration, loaded from environment variables and CLI flags.

use std::time::Duration;

use crate::engine::assets::AssetConfig;
use crate::engine::server::SimSettings;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Real time between simulation ticks.
    pub tick: Duration,
    /// Simulated seconds per real second.
    pub time_scale: f64,
    /// Frame-set description for the render collaborator.
    pub assets: AssetConfig,
    /// Seed for idle wander and pose selection.
    pub seed: u64,
    /// When set, run headless for this much simulated time and exit.
    pub headless: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: 3000,
            tick: Duration::from_millis(100),
            time_scale: 1.0,
            assets: AssetConfig::default(),
            seed: 0,
            headless: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables and CLI arguments.
    ///
    /// Environment variables:
    /// - `PORT` - HTTP server port (default: 3000)
    /// - `PET_TICK_MS` - milliseconds between ticks (default: 100)
    /// - `PET_TIME_SCALE` - simulated seconds per real second (default: 1)
    /// - `PET_ASSETS` - path to a JSON frame-set description
    /// - `PET_SEED` - random seed (default: taken from the clock)
    ///
    /// CLI flags:
    /// - `--port <PORT>` - Override the port
    /// - `--headless <SECONDS>` - Run for that many simulated seconds, print
    ///   the final state and exit
    pub fn load() -> Self {
        let args: Vec<String> = std::env::args().collect();
        let env = |key: &str| std::env::var(key).ok();
        Self::from_sources(&args, env)
    }

    /// Build a config from explicit sources. `env` looks up a variable.
    pub fn from_sources(args: &[String], env: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Config::default();

        // Port: CLI flag --port takes precedence, then env var, then default
        let port = Self::parse_cli_value(args, "--port")
            .and_then(|v| v.parse().ok())
            .or_else(|| env("PORT").and_then(|v| v.parse().ok()))
            .unwrap_or(defaults.port);

        let tick = env("PET_TICK_MS")
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
            .unwrap_or(defaults.tick);

        let time_scale = env("PET_TIME_SCALE")
            .and_then(|v| v.parse::<f64>().ok())
            .filter(|s| s.is_finite() && *s > 0.0)
            .unwrap_or(defaults.time_scale);

        let assets = match env("PET_ASSETS") {
            Some(path) => Self::load_assets(&path),
            None => defaults.assets,
        };

        let seed = env("PET_SEED")
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(|| chrono::Utc::now().timestamp_micros() as u64);

        let headless = Self::parse_cli_value(args, "--headless")
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs);

        Config {
            port,
            tick,
            time_scale,
            assets,
            seed,
            headless,
        }
    }

    /// Read an asset description, falling back to the defaults on any error.
    fn load_assets(path: &str) -> AssetConfig {
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!("Failed to read asset description '{}': {}", path, e);
                return AssetConfig::default();
            }
        };
        match AssetConfig::from_json(&contents) {
            Ok(assets) => assets,
            Err(e) => {
                tracing::warn!("Ignoring asset description '{}': {}", path, e);
                AssetConfig::default()
            }
        }
    }

    /// Simulation settings for the pet server.
    pub fn sim_settings(&self) -> SimSettings {
        SimSettings {
            tick: self.tick,
            time_scale: self.time_scale,
            assets: self.assets.clone(),
            seed: self.seed,
            clock: None,
        }
    }

    /// Parse a CLI flag value like `--port 8080`.
    fn parse_cli_value(args: &[String], flag: &str) -> Option<String> {
        args.windows(2).find_map(|pair| {
            if pair[0] == flag {
                Some(pair[1].clone())
            } else {
                None
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn load(list: &[&str], vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_sources(&args(list), |k| vars.get(k).cloned())
    }

    #[test]
    fn test_defaults() {
        let cfg = load(&["dragon-pet"], &[("PET_SEED", "9")]);
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.tick, Duration::from_millis(100));
        assert_eq!(cfg.time_scale, 1.0);
        assert_eq!(cfg.seed, 9);
        assert!(cfg.headless.is_none());
    }

    #[test]
    fn test_cli_port_beats_env() {
        let cfg = load(&["dragon-pet", "--port", "8080"], &[("PORT", "9000")]);
        assert_eq!(cfg.port, 8080);
        let cfg = load(&["dragon-pet"], &[("PORT", "9000")]);
        assert_eq!(cfg.port, 9000);
    }

    #[test]
    fn test_tuning_values() {
        let cfg = load(
            &["dragon-pet", "--headless", "3600"],
            &[("PET_TICK_MS", "50"), ("PET_TIME_SCALE", "60")],
        );
        assert_eq!(cfg.tick, Duration::from_millis(50));
        assert_eq!(cfg.time_scale, 60.0);
        assert_eq!(cfg.headless, Some(Duration::from_secs(3600)));
        assert_eq!(cfg.sim_settings().sim_dt(), Duration::from_secs(3));
    }

    #[test]
    fn test_bad_values_fall_back() {
        let cfg = load(
            &["dragon-pet"],
            &[
                ("PET_TICK_MS", "0"),
                ("PET_TIME_SCALE", "-2"),
                ("PET_ASSETS", "/definitely/not/here.json"),
            ],
        );
        assert_eq!(cfg.tick, Duration::from_millis(100));
        assert_eq!(cfg.time_scale, 1.0);
        assert_eq!(cfg.assets, AssetConfig::default());
    }
}
