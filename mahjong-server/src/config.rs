//! Runtime configuration, read once at startup from the environment.
//!
//! There is no config-file framework here, matching the teacher: a handful
//! of `env::var` reads with hardcoded fallbacks is all this server needs.

use std::{net::SocketAddr, time::Duration};

/// Timing and networking knobs for every room hosted by this process.
#[derive(Debug, Clone, Copy)]
pub struct RoomConfig {
    /// How long a claim window stays open for humans with a legal claim.
    pub claim_window_timeout: Duration,
    /// Pacing delay before a bot seat acts, so humans can follow the game.
    pub bot_think_delay: Duration,
    /// How long a disconnected seat's reconnect token stays valid before the
    /// seat is permanently handed to the bot policy.
    pub disconnect_grace_period: Duration,
    /// Address the WebSocket listener binds to.
    pub listen_addr: SocketAddr,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            claim_window_timeout: Duration::from_secs(15),
            bot_think_delay: Duration::from_millis(800),
            disconnect_grace_period: Duration::from_secs(60),
            listen_addr: ([127, 0, 0, 1], 3030).into(),
        }
    }
}

impl RoomConfig {
    /// Builds a config from defaults, overridden by any of
    /// `MAHJONG_CLAIM_WINDOW_SECS`, `MAHJONG_BOT_DELAY_MS`,
    /// `MAHJONG_DISCONNECT_GRACE_SECS`, or `MAHJONG_LISTEN_ADDR` present in
    /// the environment. Malformed overrides are logged and ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(secs) = read_env_u64("MAHJONG_CLAIM_WINDOW_SECS") {
            config.claim_window_timeout = Duration::from_secs(secs);
        }
        if let Some(ms) = read_env_u64("MAHJONG_BOT_DELAY_MS") {
            config.bot_think_delay = Duration::from_millis(ms);
        }
        if let Some(secs) = read_env_u64("MAHJONG_DISCONNECT_GRACE_SECS") {
            config.disconnect_grace_period = Duration::from_secs(secs);
        }
        if let Ok(raw) = std::env::var("MAHJONG_LISTEN_ADDR") {
            match raw.parse() {
                Ok(addr) => config.listen_addr = addr,
                Err(err) => {
                    tracing::warn!(%err, value = %raw, "ignoring invalid MAHJONG_LISTEN_ADDR");
                }
            }
        }

        config
    }
}

fn read_env_u64(key: &str) -> Option<u64> {
    match std::env::var(key) {
        Ok(raw) => match raw.parse() {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!(%err, %key, value = %raw, "ignoring invalid environment override");
                None
            }
        },
        Err(_) => None,
    }
}
