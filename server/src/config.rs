//! Command-line and rule configuration for the server

use crate::weapons::WeaponKind;
use clap::Parser;
use shared::{
    MAX_HEALTH, MAX_PARTICIPANTS, RESPAWN_DELAY, RESTART_DELAY, SPAWN_EXCLUSION_RADIUS, WAITING_TO_START_DURATION,
    WIN_SCORE,
};
use std::time::Duration;

/// Longest respawn delay the server accepts. Each whole second of delay
/// schedules a countdown timer.
pub const MAX_RESPAWN_DELAY: f32 = 60.0;

/// Match rules the session runs with
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub win_score: u32,
    pub countdown: f32,
    pub restart_delay: f32,
    pub respawn_delay: f32,
    /// Delay before retrying a spawn that found no usable point
    pub respawn_retry_delay: f32,
    pub max_health: f32,
    pub spawn_exclusion_radius: f32,
    pub starting_weapon: WeaponKind,
    /// Fixed RNG seed for reproducible spawn selection
    pub seed: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            win_score: WIN_SCORE,
            countdown: WAITING_TO_START_DURATION,
            restart_delay: RESTART_DELAY,
            respawn_delay: RESPAWN_DELAY,
            respawn_retry_delay: 1.0,
            max_health: MAX_HEALTH,
            spawn_exclusion_radius: SPAWN_EXCLUSION_RADIUS,
            starting_weapon: WeaponKind::Pistol,
            seed: None,
        }
    }
}

/// Authoritative team shooter server
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about)]
pub struct ServerConfig {
    /// Server IP address to bind to
    #[clap(short = 'H', long, default_value = "127.0.0.1")]
    pub host: String,
    /// Server port to listen on
    #[clap(short, long, default_value = "8080")]
    pub port: u16,
    /// Tick rate (updates per second)
    #[clap(short, long, default_value = "30")]
    pub tick_rate: u32,
    /// Maximum number of connected clients, at most 16
    #[clap(short, long, default_value = "16")]
    pub max_clients: usize,
    /// Seed for spawn selection; random when omitted
    #[clap(long)]
    pub seed: Option<u64>,
    /// Seconds between death and respawn, at most 60
    #[clap(long, default_value_t = RESPAWN_DELAY)]
    pub respawn_delay: f32,
    /// Seconds of ready-check countdown before a match starts
    #[clap(long, default_value_t = WAITING_TO_START_DURATION)]
    pub countdown: f32,
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.tick_rate.max(1)))
    }

    pub fn max_clients(&self) -> usize {
        self.max_clients.clamp(1, MAX_PARTICIPANTS)
    }

    /// Respawn delay limited to `[0, MAX_RESPAWN_DELAY]`. A non-finite value
    /// falls back to the default.
    pub fn respawn_delay(&self) -> f32 {
        if self.respawn_delay.is_finite() {
            self.respawn_delay.clamp(0.0, MAX_RESPAWN_DELAY)
        } else {
            RESPAWN_DELAY
        }
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            respawn_delay: self.respawn_delay(),
            countdown: self.countdown,
            seed: self.seed,
            ..SessionConfig::default()
        }
    }
}
