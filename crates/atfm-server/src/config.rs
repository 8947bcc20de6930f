//! Server configuration from environment.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use atfm_core::{EngineSettings, WrapMode};

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    pub backend_url: String,
    /// Bearer token for the analytics backend; empty disables auth
    pub backend_token: String,
    pub tick_ms: u64,
    pub wrap_mode: WrapMode,
    pub focus_window_s: f64,
    pub hotspot_threshold: f64,
    /// Hotspot polling interval; 0 disables the poller
    pub hotspot_poll_s: u64,
    pub ranking_top_k: usize,
    pub cache_max_entries: usize,
    pub cache_max_age_s: u64,
    /// JSON array of flight segments loaded at start-up
    pub flights_path: Option<String>,
    /// JSON array of sector metadata loaded at start-up
    pub sectors_path: Option<String>,
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn env_path(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            server_port: env_or("ATFM_PORT", 3100),
            backend_url: env::var("ATFM_BACKEND_URL")
                .unwrap_or_else(|_| "http://localhost:8000".to_string()),
            backend_token: env::var("ATFM_BACKEND_TOKEN").unwrap_or_default(),
            tick_ms: env_or("ATFM_TICK_MS", 33_u64).max(1),
            wrap_mode: env_or("ATFM_WRAP_MODE", WrapMode::Carry),
            focus_window_s: env_or("ATFM_FOCUS_WINDOW_S", 3600.0_f64),
            hotspot_threshold: env_or("ATFM_HOTSPOT_THRESHOLD", 0.0),
            hotspot_poll_s: env_or("ATFM_HOTSPOT_POLL_S", 60),
            ranking_top_k: env_or("ATFM_RANKING_TOP_K", 50),
            cache_max_entries: env_or("ATFM_CACHE_MAX_ENTRIES", 64),
            cache_max_age_s: env_or("ATFM_CACHE_MAX_AGE_S", 300),
            flights_path: env_path("ATFM_FLIGHTS_PATH"),
            sectors_path: env_path("ATFM_SECTORS_PATH"),
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn cache_max_age(&self) -> Duration {
        Duration::from_secs(self.cache_max_age_s)
    }

    /// Engine settings derived from the environment overrides.
    pub fn engine_settings(&self) -> EngineSettings {
        let mut settings = EngineSettings {
            wrap_mode: self.wrap_mode,
            ranking_top_k: self.ranking_top_k,
            ..EngineSettings::default()
        };
        if self.focus_window_s.is_finite() && self.focus_window_s > 0.0 {
            settings.focus_window_s = self.focus_window_s;
        }
        settings
    }
}
