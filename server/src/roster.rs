//! Participant records, team balancing and ready-check aggregation
//!
//! A participant lives from join to disconnect and survives any number of
//! avatar deaths. Team assignment is idempotent: once a participant is on a
//! team, later calls to [`Roster::assign_team`] leave it there.

use crate::streak::KillStreak;
use log::{debug, info};
use shared::{clamp_name, ParticipantId, ParticipantInfo, Team};
use std::collections::HashMap;

/// A connected player's persistent record
#[derive(Debug, Clone)]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
    pub team: Team,
    pub score: u32,
    pub streak: KillStreak,
    pub ready: bool,
}

impl Participant {
    pub fn new(id: ParticipantId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            team: Team::None,
            score: 0,
            streak: KillStreak::new(),
            ready: false,
        }
    }
}

/// All participants of the session plus the counters derived from them
#[derive(Debug, Default)]
pub struct Roster {
    participants: HashMap<ParticipantId, Participant>,
    join_order: Vec<ParticipantId>,
    team_a_count: u32,
    team_b_count: u32,
    ready_count: u32,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a participant. Re-joining with a known id keeps the existing record.
    ///
    /// Names are trimmed and cut to `MAX_NAME_LENGTH` characters, since every
    /// snapshot carries all of them.
    pub fn join(&mut self, id: ParticipantId, name: &str) -> &mut Participant {
        let name = clamp_name(name);
        let name = name.as_str();
        if !self.participants.contains_key(&id) {
            info!("Participant {} ({}) joined", id, name);
            self.join_order.push(id);
        }
        self.participants
            .entry(id)
            .or_insert_with(|| Participant::new(id, name))
    }

    /// Removes a participant and releases its team slot and ready vote.
    pub fn leave(&mut self, id: ParticipantId) -> Option<Participant> {
        let participant = self.participants.remove(&id)?;
        self.join_order.retain(|other| *other != id);

        match participant.team {
            Team::A => self.team_a_count = self.team_a_count.saturating_sub(1),
            Team::B => self.team_b_count = self.team_b_count.saturating_sub(1),
            Team::None => {}
        }
        if participant.ready {
            self.ready_count = self.ready_count.saturating_sub(1);
        }

        info!("Participant {} ({}) left", id, participant.name);
        Some(participant)
    }

    /// Puts an unassigned participant on the smaller team, A on ties.
    ///
    /// Returns the participant's team, which is unchanged if it already had one.
    pub fn assign_team(&mut self, id: ParticipantId) -> Option<Team> {
        let participant = self.participants.get_mut(&id)?;
        if participant.team != Team::None {
            return Some(participant.team);
        }

        let team = if self.team_a_count <= self.team_b_count {
            self.team_a_count += 1;
            Team::A
        } else {
            self.team_b_count += 1;
            Team::B
        };
        participant.team = team;

        info!("Participant {} assigned to team {}", id, team.label());
        Some(team)
    }

    /// Records a ready vote. Returns true if the ready count changed.
    ///
    /// Repeating the current state and un-readying with a zero count are no-ops.
    pub fn set_ready(&mut self, id: ParticipantId, ready: bool) -> bool {
        let Some(participant) = self.participants.get_mut(&id) else {
            return false;
        };
        if participant.ready == ready {
            debug!("Participant {} already ready={}, ignoring", id, ready);
            return false;
        }

        participant.ready = ready;
        if ready {
            self.ready_count += 1;
        } else if self.ready_count > 0 {
            self.ready_count -= 1;
        } else {
            return false;
        }
        true
    }

    /// Clears per-match state and re-balances teams in join order.
    pub fn reset_for_restart(&mut self) {
        self.team_a_count = 0;
        self.team_b_count = 0;
        self.ready_count = 0;

        for participant in self.participants.values_mut() {
            participant.team = Team::None;
            participant.score = 0;
            participant.ready = false;
            participant.streak.reset();
        }

        for id in self.join_order.clone() {
            self.assign_team(id);
        }
    }

    pub fn get(&self, id: ParticipantId) -> Option<&Participant> {
        self.participants.get(&id)
    }

    pub fn get_mut(&mut self, id: ParticipantId) -> Option<&mut Participant> {
        self.participants.get_mut(&id)
    }

    pub fn team_of(&self, id: ParticipantId) -> Team {
        self.participants
            .get(&id)
            .map(|participant| participant.team)
            .unwrap_or_default()
    }

    /// Participant ids in the order they joined
    pub fn ids(&self) -> &[ParticipantId] {
        &self.join_order
    }

    pub fn iter(&self) -> impl Iterator<Item = &Participant> {
        self.join_order
            .iter()
            .filter_map(|id| self.participants.get(id))
    }

    pub fn team_count(&self, team: Team) -> u32 {
        match team {
            Team::A => self.team_a_count,
            Team::B => self.team_b_count,
            Team::None => 0,
        }
    }

    pub fn ready_count(&self) -> u32 {
        self.ready_count
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    /// True when at least one participant exists and every one of them is ready
    pub fn all_ready(&self) -> bool {
        !self.is_empty() && self.ready_count as usize == self.len()
    }

    pub fn info(&self, id: ParticipantId, alive: bool, health: f32) -> Option<ParticipantInfo> {
        self.participants.get(&id).map(|participant| ParticipantInfo {
            id,
            name: participant.name.clone(),
            team: participant.team,
            score: participant.score,
            ready: participant.ready,
            alive,
            health,
        })
    }
}
