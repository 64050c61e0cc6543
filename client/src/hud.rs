//! Client-side view of the session built from snapshots and events
//!
//! Snapshots overwrite the replicated fields wholesale. Events are applied
//! once each: the server stamps every event with an id and resends are
//! recognised by that id. Only the last [`EVENT_WINDOW`] ids are remembered;
//! anything older than that is treated as already seen.

use log::debug;
use shared::{AlertColor, ChatChannel, MatchPhase, ParticipantId, ServerEvent, SessionSnapshot, Team};
use std::collections::{BTreeSet, VecDeque};

/// Chat lines kept for display
pub const CHAT_HISTORY: usize = 8;

/// How far behind the newest event id a late event may still be applied
pub const EVENT_WINDOW: u64 = 1024;

#[derive(Debug, Clone, PartialEq)]
pub struct ActiveAlert {
    pub text: String,
    pub color: AlertColor,
    /// Seconds left on screen
    pub remaining: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatLine {
    pub channel: ChatChannel,
    pub sender: String,
    pub text: String,
}

impl ChatLine {
    pub fn render(&self) -> String {
        format!("{} {}: {}", self.channel.tag(), self.sender, self.text)
    }
}

/// The line a terminal prints for `event`, if it is worth printing at all
pub fn headline(event: &ServerEvent) -> Option<String> {
    match event {
        ServerEvent::Alert { text, .. } => Some(format!(">> {}", text)),
        ServerEvent::StreakSound { streak } => Some(format!("** streak {} **", streak)),
        ServerEvent::Death { respawn_in } => {
            Some(format!("You died. Respawning in {:.0}s", respawn_in.ceil()))
        }
        ServerEvent::Chat {
            channel,
            sender,
            text,
        } => Some(format!("{} {}: {}", channel.tag(), sender, text)),
        _ => None,
    }
}

#[derive(Debug, Default)]
pub struct Hud {
    local_id: Option<ParticipantId>,
    snapshot: SessionSnapshot,
    health_fraction: f32,
    magazine: u32,
    ammo: u32,
    alive: bool,
    ready: bool,
    respawn_countdown: Option<u32>,
    alert: Option<ActiveAlert>,
    chat: VecDeque<ChatLine>,
    seen_events: BTreeSet<u64>,
    newest_event: Option<u64>,
}

impl Hud {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_local_id(&mut self, id: ParticipantId) {
        self.local_id = Some(id);
    }

    pub fn local_id(&self) -> Option<ParticipantId> {
        self.local_id
    }

    /// Replaces the replicated fields with the newest snapshot. Stale
    /// snapshots (older tick) are ignored.
    pub fn apply_snapshot(&mut self, snapshot: SessionSnapshot) {
        if snapshot.tick < self.snapshot.tick {
            debug!("Ignoring stale snapshot for tick {}", snapshot.tick);
            return;
        }
        self.snapshot = snapshot;
    }

    /// Records `id` and reports whether it is new. Ids at or below
    /// `newest - EVENT_WINDOW` are rejected and pruned.
    fn first_sighting(&mut self, id: u64) -> bool {
        if let Some(newest) = self.newest_event {
            if id.saturating_add(EVENT_WINDOW) <= newest {
                return false;
            }
        }
        if !self.seen_events.insert(id) {
            return false;
        }

        let newest = self.newest_event.map_or(id, |newest| newest.max(id));
        self.newest_event = Some(newest);
        let floor = newest.saturating_sub(EVENT_WINDOW);
        while let Some(&oldest) = self.seen_events.first() {
            if oldest > floor {
                break;
            }
            self.seen_events.pop_first();
        }
        true
    }

    /// Applies an event once. Returns false for a repeated id.
    pub fn apply_event(&mut self, id: u64, event: ServerEvent) -> bool {
        if !self.first_sighting(id) {
            return false;
        }

        match event {
            ServerEvent::Alert {
                text,
                color,
                duration,
            } => {
                self.alert = Some(ActiveAlert {
                    text,
                    color,
                    remaining: duration,
                });
            }
            ServerEvent::HealthChanged {
                participant,
                fraction,
            } => {
                if Some(participant) == self.local_id {
                    self.health_fraction = fraction;
                }
            }
            ServerEvent::AmmoChanged { magazine, ammo } => {
                self.magazine = magazine;
                self.ammo = ammo;
            }
            ServerEvent::Death { respawn_in } => {
                self.alive = false;
                self.health_fraction = 0.0;
                self.respawn_countdown = Some(respawn_in.ceil() as u32);
            }
            ServerEvent::RespawnCountdown { seconds } => {
                self.respawn_countdown = Some(seconds);
            }
            ServerEvent::Spawned { .. } => {
                self.alive = true;
                self.health_fraction = 1.0;
                self.respawn_countdown = None;
            }
            ServerEvent::StreakSound { streak } => {
                debug!("Streak sound {}", streak);
            }
            ServerEvent::ReadyChanged { ready } => {
                self.ready = ready;
            }
            ServerEvent::Chat {
                channel,
                sender,
                text,
            } => {
                self.chat.push_back(ChatLine {
                    channel,
                    sender,
                    text,
                });
                while self.chat.len() > CHAT_HISTORY {
                    self.chat.pop_front();
                }
            }
        }
        true
    }

    /// Ages the on-screen alert
    pub fn update(&mut self, dt: f32) {
        if let Some(alert) = &mut self.alert {
            alert.remaining -= dt;
            if alert.remaining <= 0.0 {
                self.alert = None;
            }
        }
    }

    pub fn snapshot(&self) -> &SessionSnapshot {
        &self.snapshot
    }

    pub fn phase(&self) -> MatchPhase {
        self.snapshot.phase
    }

    pub fn health_fraction(&self) -> f32 {
        self.health_fraction
    }

    pub fn ammo(&self) -> (u32, u32) {
        (self.magazine, self.ammo)
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn respawn_countdown(&self) -> Option<u32> {
        self.respawn_countdown
    }

    pub fn alert(&self) -> Option<&ActiveAlert> {
        self.alert.as_ref()
    }

    pub fn chat(&self) -> impl Iterator<Item = &ChatLine> {
        self.chat.iter()
    }

    pub fn local_team(&self) -> Team {
        self.local_id
            .and_then(|id| self.snapshot.participants.iter().find(|p| p.id == id))
            .map(|p| p.team)
            .unwrap_or_default()
    }

    /// One status line for the terminal
    pub fn status_line(&self) -> String {
        let phase = match self.snapshot.phase {
            MatchPhase::WaitingToStart => format!(
                "WAITING {}/{} ready, starts in {:.0}s",
                self.snapshot.players_ready,
                self.snapshot.player_count,
                self.snapshot.countdown.ceil()
            ),
            MatchPhase::InProgress => "IN PROGRESS".to_string(),
            MatchPhase::Ended => "ENDED".to_string(),
        };

        let vitals = match self.respawn_countdown {
            Some(seconds) if !self.alive => format!("respawn in {}", seconds),
            _ => format!(
                "hp {:.0}% ammo {}/{}",
                self.health_fraction * 100.0,
                self.magazine,
                self.ammo
            ),
        };

        format!(
            "[{}] A {} - {} B | team {} | {}",
            phase,
            self.snapshot.team_a_score,
            self.snapshot.team_b_score,
            self.local_team().label(),
            vitals
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn chat(text: &str) -> ServerEvent {
        ServerEvent::Chat {
            channel: ChatChannel::All,
            sender: "alice".to_string(),
            text: text.to_string(),
        }
    }

    #[test]
    fn test_events_apply_once_per_id() {
        let mut hud = Hud::new();

        assert!(hud.apply_event(1, chat("hi")));
        assert!(!hud.apply_event(1, chat("hi")));
        assert!(hud.apply_event(2, chat("again")));

        assert_eq!(hud.chat().count(), 2);
    }

    #[test]
    fn test_chat_history_is_bounded() {
        let mut hud = Hud::new();
        for i in 0..(CHAT_HISTORY as u64 + 3) {
            hud.apply_event(i, chat(&format!("line {}", i)));
        }

        let lines: Vec<&ChatLine> = hud.chat().collect();
        assert_eq!(lines.len(), CHAT_HISTORY);
        assert_eq!(lines[0].text, "line 3");
        assert_eq!(lines[0].render(), "[All] alice: line 3");
    }

    #[test]
    fn test_alert_expires() {
        let mut hud = Hud::new();
        hud.apply_event(
            1,
            ServerEvent::Alert {
                text: "STARTING MATCH".to_string(),
                color: AlertColor::Green,
                duration: 3.0,
            },
        );

        hud.update(2.0);
        let alert = hud.alert().unwrap();
        assert_eq!(alert.text, "STARTING MATCH");
        assert_approx_eq!(alert.remaining, 1.0);

        hud.update(1.5);
        assert!(hud.alert().is_none());
    }

    #[test]
    fn test_death_and_respawn_cycle() {
        let mut hud = Hud::new();
        hud.set_local_id(7);
        hud.apply_event(1, ServerEvent::Spawned { position: Default::default() });
        hud.apply_event(
            2,
            ServerEvent::HealthChanged {
                participant: 7,
                fraction: 0.4,
            },
        );
        assert_approx_eq!(hud.health_fraction(), 0.4);

        hud.apply_event(3, ServerEvent::Death { respawn_in: 5.0 });
        assert!(!hud.is_alive());
        assert_eq!(hud.respawn_countdown(), Some(5));
        assert!(hud.status_line().contains("respawn in 5"));

        hud.apply_event(4, ServerEvent::RespawnCountdown { seconds: 2 });
        assert_eq!(hud.respawn_countdown(), Some(2));

        hud.apply_event(5, ServerEvent::Spawned { position: Default::default() });
        assert!(hud.is_alive());
        assert_eq!(hud.respawn_countdown(), None);
        assert_approx_eq!(hud.health_fraction(), 1.0);
    }

    #[test]
    fn test_other_participants_health_is_ignored() {
        let mut hud = Hud::new();
        hud.set_local_id(1);
        hud.apply_event(
            1,
            ServerEvent::HealthChanged {
                participant: 2,
                fraction: 0.1,
            },
        );
        assert_approx_eq!(hud.health_fraction(), 0.0);
    }

    #[test]
    fn test_stale_snapshot_is_ignored() {
        let mut hud = Hud::new();
        hud.apply_snapshot(SessionSnapshot {
            tick: 10,
            team_a_score: 3,
            ..Default::default()
        });
        hud.apply_snapshot(SessionSnapshot {
            tick: 9,
            team_a_score: 1,
            ..Default::default()
        });

        assert_eq!(hud.snapshot().tick, 10);
        assert_eq!(hud.snapshot().team_a_score, 3);
    }

    #[test]
    fn test_headline_only_for_printable_events() {
        assert_eq!(headline(&chat("hi")).as_deref(), Some("[All] alice: hi"));
        assert_eq!(
            headline(&ServerEvent::StreakSound { streak: 5 }).as_deref(),
            Some("** streak 5 **")
        );
        assert_eq!(
            headline(&ServerEvent::Death { respawn_in: 4.2 }).as_deref(),
            Some("You died. Respawning in 5s")
        );
        assert_eq!(headline(&ServerEvent::AmmoChanged { magazine: 3, ammo: 9 }), None);
        assert_eq!(headline(&ServerEvent::ReadyChanged { ready: true }), None);
    }

    #[test]
    fn test_seen_event_ids_stay_bounded() {
        let mut hud = Hud::new();
        let total = EVENT_WINDOW * 3;
        for id in 1..=total {
            assert!(hud.apply_event(id, ServerEvent::ReadyChanged { ready: id % 2 == 0 }));
        }

        assert!(hud.seen_events.len() as u64 <= EVENT_WINDOW);
        // Long gone from the window, so a late copy is not applied again
        assert!(!hud.apply_event(1, chat("late")));
        assert_eq!(hud.chat().count(), 0);
        // A late but recent id not seen yet still lands
        hud.seen_events.remove(&(total - 1));
        assert!(hud.apply_event(total - 1, chat("reordered")));
        assert!(!hud.apply_event(total, chat("duplicate")));
    }
}
