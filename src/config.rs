//! Server configuration loaded from the environment

use std::net::IpAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: IpAddr,
    pub port: u16,
    /// Directory served for everything that isn't the API or the socket
    pub static_dir: PathBuf,
    /// Advisory countdown length sent with every timer start
    pub timer_seconds: u32,
    /// Per-room broadcast buffer; slower subscribers lag past this
    pub room_channel_capacity: usize,
    pub rate_limit_enabled: bool,
    pub rate_limit_max: u32,
    pub rate_limit_window: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: IpAddr::from([0, 0, 0, 0]),
            port: 3000,
            static_dir: PathBuf::from("static"),
            timer_seconds: 10,
            room_channel_capacity: 256,
            rate_limit_enabled: true,
            rate_limit_max: 60,
            rate_limit_window: Duration::from_secs(10),
        }
    }
}

impl ServerConfig {
    /// Load config from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let config = Self {
            bind_addr: env_parse("PLANPOKER_BIND", defaults.bind_addr),
            port: env_parse("PORT", defaults.port),
            static_dir: std::env::var("PLANPOKER_STATIC_DIR")
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.static_dir),
            timer_seconds: env_nonzero("PLANPOKER_TIMER_SECONDS", defaults.timer_seconds),
            room_channel_capacity: env_nonzero(
                "PLANPOKER_ROOM_CHANNEL_CAPACITY",
                defaults.room_channel_capacity,
            ),
            rate_limit_enabled: env_flag("PLANPOKER_RATE_LIMIT", defaults.rate_limit_enabled),
            rate_limit_max: env_nonzero("PLANPOKER_RATE_LIMIT_MAX", defaults.rate_limit_max),
            rate_limit_window: Duration::from_secs(env_nonzero(
                "PLANPOKER_RATE_LIMIT_WINDOW",
                defaults.rate_limit_window.as_secs(),
            )),
        };

        tracing::info!(
            port = config.port,
            timer_seconds = config.timer_seconds,
            rate_limit_enabled = config.rate_limit_enabled,
            "Server config loaded"
        );

        config
    }
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!("Ignoring invalid {}={:?}, using default", key, raw);
                default
            }
        },
        Err(_) => default,
    }
}

fn env_nonzero<T: FromStr + PartialEq + Default + Copy>(key: &str, default: T) -> T {
    let value = env_parse(key, default);
    if value == T::default() {
        tracing::warn!("{} must be greater than zero, using default", key);
        return default;
    }
    value
}

fn env_flag(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| v.trim() != "0" && v.trim().to_lowercase() != "false")
        .unwrap_or(default)
}
