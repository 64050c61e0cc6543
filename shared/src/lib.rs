//! Wire protocol and value types shared by the authoritative server and its
//! observing clients.
//!
//! Clients only ever send [`Packet::Connect`], [`Packet::Intent`] and
//! [`Packet::Disconnect`]. Everything the server pushes back is either a
//! continuously-synchronized [`SessionSnapshot`] or a one-shot
//! [`ServerEvent`] wrapped with a per-recipient event id.

use glam::Vec3;
use serde::{Deserialize, Serialize};

pub const PROTOCOL_VERSION: u32 = 1;

/// Team score that ends the match.
pub const WIN_SCORE: u32 = 10;
/// Seconds the ready-check countdown runs before the match starts.
pub const WAITING_TO_START_DURATION: f32 = 5.0;
/// Seconds between the end of a match and the automatic restart.
pub const RESTART_DELAY: f32 = 5.0;
/// Seconds between an avatar's death and its replacement.
pub const RESPAWN_DELAY: f32 = 5.0;
pub const MAX_HEALTH: f32 = 100.0;
/// No spawn point within this distance of an enemy avatar is preferred.
pub const SPAWN_EXCLUSION_RADIUS: f32 = 1000.0;
pub const MAX_CHAT_LENGTH: usize = 256;
/// Display names longer than this are cut at connect time.
pub const MAX_NAME_LENGTH: usize = 32;
/// Most participants a server admits
pub const MAX_PARTICIPANTS: usize = 16;
/// Receive buffer size on both ends. A snapshot with [`MAX_PARTICIPANTS`]
/// maximum-length names must fit.
pub const MAX_PACKET_SIZE: usize = 4096;

pub const START_ALERT_DURATION: f32 = 3.0;
pub const WIN_ALERT_DURATION: f32 = 5.0;
pub const STREAK_ALERT_DURATION: f32 = 2.5;

/// Kill-streak thresholds and the text appended to the player's name.
pub const STREAK_MESSAGES: [(u32, &str); 4] = [
    (3, "is on a killing spree!"),
    (5, "is dominating!"),
    (7, "is UNSTOPPABLE!"),
    (9, "is GODLIKE!"),
];

/// Trims a requested display name and cuts it to [`MAX_NAME_LENGTH`] characters.
pub fn clamp_name(name: &str) -> String {
    name.trim().chars().take(MAX_NAME_LENGTH).collect()
}

/// Returns the streak template for an exact threshold value.
pub fn streak_message(streak: u32) -> Option<&'static str> {
    STREAK_MESSAGES
        .iter()
        .find(|(threshold, _)| *threshold == streak)
        .map(|(_, message)| *message)
}

pub type ParticipantId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum Team {
    #[default]
    None,
    A,
    B,
}

impl Team {
    pub fn label(&self) -> &'static str {
        match self {
            Team::None => "NONE",
            Team::A => "A",
            Team::B => "B",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MatchPhase {
    #[default]
    WaitingToStart,
    InProgress,
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChatChannel {
    All,
    Team,
}

impl ChatChannel {
    pub fn tag(&self) -> &'static str {
        match self {
            ChatChannel::All => "[All]",
            ChatChannel::Team => "[Team]",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertColor {
    White,
    Green,
    Team(Team),
}

impl AlertColor {
    /// Team-colored alert, falling back to white for unassigned participants.
    pub fn for_team(team: Team) -> Self {
        match team {
            Team::None => AlertColor::White,
            team => AlertColor::Team(team),
        }
    }
}

/// Requests a client may make. No other mutation path into the session exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Intent {
    StartFire,
    StopFire,
    SwitchWeapon,
    ToggleReady(bool),
    SendChat { channel: ChatChannel, text: String },
}

/// One-shot notifications pushed to observers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ServerEvent {
    Alert {
        text: String,
        color: AlertColor,
        duration: f32,
    },
    HealthChanged {
        participant: ParticipantId,
        fraction: f32,
    },
    AmmoChanged {
        magazine: u32,
        ammo: u32,
    },
    Death {
        respawn_in: f32,
    },
    RespawnCountdown {
        seconds: u32,
    },
    Spawned {
        position: Vec3,
    },
    StreakSound {
        streak: u32,
    },
    ReadyChanged {
        ready: bool,
    },
    Chat {
        channel: ChatChannel,
        sender: String,
        text: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantInfo {
    pub id: ParticipantId,
    pub name: String,
    pub team: Team,
    pub score: u32,
    pub ready: bool,
    pub alive: bool,
    pub health: f32,
}

/// Continuously-synchronized session fields. Last write wins on the client.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub tick: u32,
    pub phase: MatchPhase,
    pub team_a_score: u32,
    pub team_b_score: u32,
    pub losses_a: u32,
    pub losses_b: u32,
    pub countdown: f32,
    pub players_ready: u32,
    pub player_count: u32,
    pub participants: Vec<ParticipantInfo>,
}

impl SessionSnapshot {
    pub fn score_of(&self, team: Team) -> u32 {
        match team {
            Team::A => self.team_a_score,
            Team::B => self.team_b_score,
            Team::None => 0,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub enum Packet {
    Connect {
        client_version: u32,
        name: String,
    },
    Intent {
        sequence: u32,
        intent: Intent,
    },
    Heartbeat,
    Disconnect,

    Connected {
        client_id: ParticipantId,
    },
    Snapshot(SessionSnapshot),
    Event {
        id: u64,
        event: ServerEvent,
    },
    Disconnected {
        reason: String,
    },
}

/// A client intent tagged with its per-connection sequence number.
#[derive(Debug, Clone, PartialEq)]
pub struct IntentRecord {
    pub sequence: u32,
    pub intent: Intent,
}
