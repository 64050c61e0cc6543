//! Match phase state machine
//!
//! WaitingToStart -> InProgress -> Ended -> (restart) -> WaitingToStart
//!
//! The coordinator only decides transitions. Side effects such as alerts,
//! spawning and scheduling the restart belong to the session, which reacts to
//! the returned [`PhaseChange`].

use crate::combat::Scoreboard;
use crate::roster::Roster;
use log::{debug, info};
use shared::{MatchPhase, Team};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseChange {
    MatchStarted,
    MatchEnded { winner: Team },
}

#[derive(Debug, Clone)]
pub struct MatchCoordinator {
    phase: MatchPhase,
    countdown: f32,
    countdown_duration: f32,
    win_score: u32,
}

impl MatchCoordinator {
    pub fn new(countdown_duration: f32, win_score: u32) -> Self {
        Self {
            phase: MatchPhase::WaitingToStart,
            countdown: countdown_duration,
            countdown_duration,
            win_score,
        }
    }

    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    /// Seconds left before the match starts
    pub fn countdown(&self) -> f32 {
        self.countdown
    }

    /// Advances the phase machine by `dt` seconds.
    ///
    /// The countdown only runs while every participant is ready. It pauses
    /// when someone un-readies and resumes from where it stopped.
    pub fn tick(&mut self, dt: f32, roster: &Roster, scores: &Scoreboard) -> Option<PhaseChange> {
        match self.phase {
            MatchPhase::WaitingToStart => {
                if !roster.all_ready() {
                    return None;
                }

                self.countdown -= dt;
                if self.countdown > 0.0 {
                    return None;
                }

                self.countdown = 0.0;
                self.phase = MatchPhase::InProgress;
                info!("Match started with {} participants", roster.len());
                Some(PhaseChange::MatchStarted)
            }
            MatchPhase::InProgress => {
                let winner = scores.leader_at(self.win_score)?;
                self.phase = MatchPhase::Ended;
                info!(
                    "Match ended, team {} wins {}-{}",
                    winner.label(),
                    scores.score(Team::A),
                    scores.score(Team::B)
                );
                Some(PhaseChange::MatchEnded { winner })
            }
            MatchPhase::Ended => None,
        }
    }

    /// Back to WaitingToStart with a full countdown
    pub fn reset(&mut self) {
        debug!("Coordinator reset from {:?}", self.phase);
        self.phase = MatchPhase::WaitingToStart;
        self.countdown = self.countdown_duration;
    }
}
