//! Avatars, damage resolution and kill credit
//!
//! Combat never reaches for the session directly. Everything a kill can
//! touch is borrowed into a [`CombatContext`] for the duration of one call.

use crate::config::MAX_RESPAWN_DELAY;
use crate::notify::NotificationRouter;
use crate::roster::Roster;
use crate::timers::{AvatarId, Scheduler, Task, TimerOwner};
use crate::weapons::Loadout;
use glam::Vec3;
use log::{debug, info};
use shared::{
    AlertColor, MatchPhase, ParticipantId, ServerEvent, Team, STREAK_ALERT_DURATION,
};

/// Streak length at which dying is announced to everyone
pub const STREAK_BREAK_THRESHOLD: u32 = 3;

/// Team scores and the per-team death tally
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scoreboard {
    team_a: u32,
    team_b: u32,
    losses_a: u32,
    losses_b: u32,
}

impl Scoreboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn score(&self, team: Team) -> u32 {
        match team {
            Team::A => self.team_a,
            Team::B => self.team_b,
            Team::None => 0,
        }
    }

    pub fn losses(&self, team: Team) -> u32 {
        match team {
            Team::A => self.losses_a,
            Team::B => self.losses_b,
            Team::None => 0,
        }
    }

    /// Adds one point to `team`. Unassigned participants score nothing.
    pub fn credit(&mut self, team: Team) {
        match team {
            Team::A => self.team_a += 1,
            Team::B => self.team_b += 1,
            Team::None => debug!("Kill by unassigned participant, no team credit"),
        }
    }

    pub fn record_loss(&mut self, team: Team) {
        match team {
            Team::A => self.losses_a += 1,
            Team::B => self.losses_b += 1,
            Team::None => {}
        }
    }

    /// First team at or above `win_score`, checking A before B
    pub fn leader_at(&self, win_score: u32) -> Option<Team> {
        [Team::A, Team::B]
            .into_iter()
            .find(|team| self.score(*team) >= win_score)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// The in-world body of a participant
#[derive(Debug, Clone)]
pub struct Avatar {
    pub id: AvatarId,
    pub owner: ParticipantId,
    pub team: Team,
    pub position: Vec3,
    pub velocity: Vec3,
    pub loadout: Loadout,
    health: f32,
    max_health: f32,
    alive: bool,
    input_enabled: bool,
    respawn_at: Option<f64>,
}

impl Avatar {
    pub fn new(id: AvatarId, owner: ParticipantId, team: Team, max_health: f32, position: Vec3) -> Self {
        Self {
            id,
            owner,
            team,
            position,
            velocity: Vec3::ZERO,
            loadout: Loadout::new(),
            health: max_health,
            max_health,
            alive: true,
            input_enabled: true,
            respawn_at: None,
        }
    }

    pub fn health(&self) -> f32 {
        self.health
    }

    /// Health as shown on a health bar, clamped to `[0, 1]`
    pub fn health_fraction(&self) -> f32 {
        if self.max_health <= 0.0 {
            return 0.0;
        }
        (self.health / self.max_health).clamp(0.0, 1.0)
    }

    pub fn is_alive(&self) -> bool {
        self.alive && self.health > 0.0
    }

    pub fn accepts_input(&self) -> bool {
        self.alive && self.input_enabled
    }

    /// Clock time at which the replacement avatar is due, once dead
    pub fn respawn_at(&self) -> Option<f64> {
        self.respawn_at
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DamageOutcome {
    /// The avatar was already dead
    Ignored,
    Damaged { fraction: f32 },
    Killed { credited: bool },
}

/// Mutable session state a damage call may touch
pub struct CombatContext<'a> {
    pub phase: MatchPhase,
    pub roster: &'a mut Roster,
    pub scores: &'a mut Scoreboard,
    pub router: &'a mut NotificationRouter,
    pub scheduler: &'a mut Scheduler,
    pub respawn_delay: f32,
}

/// Applies `amount` damage to `avatar`, resolving death and kill credit.
pub fn apply_damage(
    ctx: &mut CombatContext<'_>,
    avatar: &mut Avatar,
    amount: f32,
    instigator: Option<ParticipantId>,
) -> DamageOutcome {
    if avatar.health <= 0.0 || !avatar.alive {
        debug!("Avatar {} is already dead, ignoring damage", avatar.id);
        return DamageOutcome::Ignored;
    }

    avatar.health -= amount;

    let outcome = if avatar.health <= 0.0 {
        let credited = match instigator {
            Some(killer) if ctx.phase == MatchPhase::InProgress => credit_kill(ctx, killer),
            _ => false,
        };
        if let Some(killer) = instigator {
            announce_streak_break(ctx, killer, avatar.owner);
        }
        die(ctx, avatar);
        DamageOutcome::Killed { credited }
    } else {
        DamageOutcome::Damaged {
            fraction: avatar.health_fraction(),
        }
    };

    ctx.router.publish(ServerEvent::HealthChanged {
        participant: avatar.owner,
        fraction: avatar.health_fraction(),
    });
    outcome
}

/// Scores a kill for `killer`. Returns false if the killer already left.
fn credit_kill(ctx: &mut CombatContext<'_>, killer: ParticipantId) -> bool {
    let Some(participant) = ctx.roster.get_mut(killer) else {
        debug!("Killer {} is no longer in the session", killer);
        return false;
    };

    participant.score += 1;
    let team = participant.team;
    let name = participant.name.clone();
    let milestone = participant.streak.add_kill();
    info!("{} scored a kill for team {}", name, team.label());

    if let Some(milestone) = milestone {
        ctx.router.broadcast(
            format!("{} {}", name, milestone.template),
            AlertColor::for_team(team),
            STREAK_ALERT_DURATION,
        );
        ctx.router.publish(ServerEvent::StreakSound {
            streak: milestone.streak,
        });
    }

    ctx.scores.credit(team);
    true
}

fn announce_streak_break(ctx: &mut CombatContext<'_>, killer: ParticipantId, victim: ParticipantId) {
    let Some(victim_record) = ctx.roster.get(victim) else {
        return;
    };
    if victim_record.streak.count() < STREAK_BREAK_THRESHOLD {
        return;
    }
    let Some(killer_record) = ctx.roster.get(killer) else {
        return;
    };

    let text = format!("{} ended {}'s streak!", killer_record.name, victim_record.name);
    let color = AlertColor::for_team(killer_record.team);
    ctx.router.broadcast(text, color, STREAK_ALERT_DURATION);
}

/// Takes the avatar out of play and schedules its replacement.
pub fn die(ctx: &mut CombatContext<'_>, avatar: &mut Avatar) {
    info!("Participant {} died (avatar {})", avatar.owner, avatar.id);

    avatar.loadout.deactivate_all();
    if let Some(participant) = ctx.roster.get_mut(avatar.owner) {
        participant.streak.reset();
    }
    ctx.scores.record_loss(avatar.team);

    avatar.alive = false;
    avatar.input_enabled = false;
    avatar.velocity = Vec3::ZERO;

    let delay = ctx.respawn_delay.max(0.0).min(MAX_RESPAWN_DELAY);
    avatar.respawn_at = Some(ctx.scheduler.now() + f64::from(delay));

    ctx.router
        .send_to(avatar.owner, ServerEvent::AmmoChanged { magazine: 0, ammo: 0 });
    ctx.router
        .send_to(avatar.owner, ServerEvent::Death { respawn_in: delay });

    let owner = TimerOwner::Avatar(avatar.id);
    let whole_seconds = delay.ceil() as u32;
    for elapsed in 1..whole_seconds {
        ctx.scheduler.schedule(
            owner,
            elapsed as f32,
            Task::RespawnCountdown {
                avatar: avatar.id,
                seconds: whole_seconds - elapsed,
            },
        );
    }
    ctx.scheduler
        .schedule(owner, delay, Task::Respawn { avatar: avatar.id });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::recording::RecordingObserver;
    use assert_approx_eq::assert_approx_eq;

    struct Fixture {
        roster: Roster,
        scores: Scoreboard,
        router: NotificationRouter,
        scheduler: Scheduler,
        observers: Vec<RecordingObserver>,
    }

    impl Fixture {
        /// Participant 1 on A, participant 2 on B
        fn new() -> Self {
            let mut roster = Roster::new();
            let mut router = NotificationRouter::new();
            let mut observers = Vec::new();
            for (id, name) in [(1, "alice"), (2, "bob")] {
                roster.join(id, name);
                roster.assign_team(id);
                let observer = RecordingObserver::default();
                router.register(id, Box::new(observer.clone()));
                observers.push(observer);
            }
            Self {
                roster,
                scores: Scoreboard::new(),
                router,
                scheduler: Scheduler::new(),
                observers,
            }
        }

        fn ctx(&mut self, phase: MatchPhase) -> CombatContext<'_> {
            CombatContext {
                phase,
                roster: &mut self.roster,
                scores: &mut self.scores,
                router: &mut self.router,
                scheduler: &mut self.scheduler,
                respawn_delay: 5.0,
            }
        }
    }

    fn avatar_for(id: ParticipantId, team: Team) -> Avatar {
        let mut avatar = Avatar::new(u64::from(id) * 10, id, team, 100.0, Vec3::ZERO);
        avatar.loadout.add_weapon(crate::weapons::WeaponKind::Pistol);
        avatar
    }

    fn deaths(observer: &RecordingObserver) -> usize {
        observer
            .events()
            .iter()
            .filter(|event| matches!(event, ServerEvent::Death { .. }))
            .count()
    }

    #[test]
    fn test_oversized_respawn_delay_is_capped() {
        let mut fixture = Fixture::new();
        let mut victim = avatar_for(2, Team::B);
        let mut ctx = fixture.ctx(MatchPhase::InProgress);
        ctx.respawn_delay = 1.0e9;

        apply_damage(&mut ctx, &mut victim, 100.0, Some(1));

        // One countdown tick per whole second plus the respawn itself
        assert_eq!(fixture.scheduler.len(), MAX_RESPAWN_DELAY as usize);
        let remaining = fixture
            .scheduler
            .remaining(&Task::Respawn { avatar: victim.id })
            .unwrap();
        assert_approx_eq!(remaining, f64::from(MAX_RESPAWN_DELAY), 0.0001);
    }

    #[test]
    fn test_partial_damage_reports_fraction() {
        let mut fixture = Fixture::new();
        let mut victim = avatar_for(2, Team::B);

        let outcome = apply_damage(&mut fixture.ctx(MatchPhase::InProgress), &mut victim, 35.0, Some(1));
        match outcome {
            DamageOutcome::Damaged { fraction } => assert_approx_eq!(fraction, 0.65, 0.0001),
            other => panic!("Unexpected outcome {:?}", other),
        }
        assert!(victim.is_alive());
        assert!(fixture.observers[0]
            .events()
            .contains(&ServerEvent::HealthChanged {
                participant: 2,
                fraction: 0.65
            }));
    }

    #[test]
    fn test_exact_lethal_damage_dies_once() {
        let mut fixture = Fixture::new();
        let mut victim = avatar_for(2, Team::B);

        let first = apply_damage(&mut fixture.ctx(MatchPhase::InProgress), &mut victim, 100.0, Some(1));
        let second = apply_damage(&mut fixture.ctx(MatchPhase::InProgress), &mut victim, 100.0, Some(1));

        assert_eq!(first, DamageOutcome::Killed { credited: true });
        assert_eq!(second, DamageOutcome::Ignored);
        assert!(!victim.is_alive());
        assert_approx_eq!(victim.health(), 0.0, 0.0001);
        assert_eq!(deaths(&fixture.observers[1]), 1);
        assert_eq!(fixture.scores.losses(Team::B), 1);
        assert!(fixture.scheduler.is_scheduled(&Task::Respawn { avatar: victim.id }));
    }

    #[test]
    fn test_overkill_fraction_is_clamped() {
        let mut fixture = Fixture::new();
        let mut victim = avatar_for(2, Team::B);

        apply_damage(&mut fixture.ctx(MatchPhase::InProgress), &mut victim, 250.0, None);
        assert!(victim.health() < 0.0);
        assert_approx_eq!(victim.health_fraction(), 0.0, 0.0001);
    }

    #[test]
    fn test_kill_credits_killer_and_team() {
        let mut fixture = Fixture::new();
        let mut victim = avatar_for(2, Team::B);

        apply_damage(&mut fixture.ctx(MatchPhase::InProgress), &mut victim, 100.0, Some(1));

        assert_eq!(fixture.roster.get(1).unwrap().score, 1);
        assert_eq!(fixture.roster.get(1).unwrap().streak.count(), 1);
        assert_eq!(fixture.scores.score(Team::A), 1);
        assert_eq!(fixture.scores.score(Team::B), 0);
    }

    #[test]
    fn test_no_credit_outside_match() {
        let mut fixture = Fixture::new();
        let mut victim = avatar_for(2, Team::B);

        let outcome = apply_damage(&mut fixture.ctx(MatchPhase::WaitingToStart), &mut victim, 100.0, Some(1));

        assert_eq!(outcome, DamageOutcome::Killed { credited: false });
        assert_eq!(fixture.roster.get(1).unwrap().score, 0);
        assert_eq!(fixture.scores.score(Team::A), 0);
        assert_eq!(deaths(&fixture.observers[1]), 1);
    }

    #[test]
    fn test_no_credit_without_instigator() {
        let mut fixture = Fixture::new();
        let mut victim = avatar_for(2, Team::B);

        let outcome = apply_damage(&mut fixture.ctx(MatchPhase::InProgress), &mut victim, 100.0, None);
        assert_eq!(outcome, DamageOutcome::Killed { credited: false });
        assert_eq!(fixture.scores, {
            let mut expected = Scoreboard::new();
            expected.record_loss(Team::B);
            expected
        });
    }

    #[test]
    fn test_third_kill_announces_spree() {
        let mut fixture = Fixture::new();
        for _ in 0..3 {
            let mut victim = avatar_for(2, Team::B);
            apply_damage(&mut fixture.ctx(MatchPhase::InProgress), &mut victim, 100.0, Some(1));
        }

        let alerts = fixture.observers[1].alerts();
        assert_eq!(alerts, vec!["alice is on a killing spree!".to_string()]);
        assert!(fixture.observers[1]
            .events()
            .contains(&ServerEvent::StreakSound { streak: 3 }));
    }

    #[test]
    fn test_death_resets_streak_and_announces_break() {
        let mut fixture = Fixture::new();
        for _ in 0..3 {
            let mut victim = avatar_for(2, Team::B);
            apply_damage(&mut fixture.ctx(MatchPhase::InProgress), &mut victim, 100.0, Some(1));
        }

        let mut alice = avatar_for(1, Team::A);
        apply_damage(&mut fixture.ctx(MatchPhase::InProgress), &mut alice, 100.0, Some(2));

        assert_eq!(fixture.roster.get(1).unwrap().streak.count(), 0);
        assert!(!fixture.roster.get(1).unwrap().streak.was_notified(3));
        let last = fixture.observers[0].events().into_iter().rev().find(|event| {
            matches!(event, ServerEvent::Alert { .. })
        });
        assert_eq!(
            last,
            Some(ServerEvent::Alert {
                text: "bob ended alice's streak!".to_string(),
                color: AlertColor::Team(Team::B),
                duration: STREAK_ALERT_DURATION,
            })
        );
    }

    #[test]
    fn test_short_streak_break_is_silent() {
        let mut fixture = Fixture::new();
        let mut victim = avatar_for(2, Team::B);
        apply_damage(&mut fixture.ctx(MatchPhase::InProgress), &mut victim, 100.0, Some(1));

        let mut alice = avatar_for(1, Team::A);
        apply_damage(&mut fixture.ctx(MatchPhase::InProgress), &mut alice, 100.0, Some(2));

        assert!(fixture.observers[0].alerts().is_empty());
    }

    #[test]
    fn test_death_goes_to_owner_only() {
        let mut fixture = Fixture::new();
        let mut victim = avatar_for(2, Team::B);
        apply_damage(&mut fixture.ctx(MatchPhase::InProgress), &mut victim, 100.0, Some(1));

        assert_eq!(deaths(&fixture.observers[0]), 0);
        let owner_events = fixture.observers[1].events();
        assert!(owner_events.contains(&ServerEvent::AmmoChanged { magazine: 0, ammo: 0 }));
        assert!(owner_events.contains(&ServerEvent::Death { respawn_in: 5.0 }));
    }

    #[test]
    fn test_death_disables_weapon_and_input() {
        let mut fixture = Fixture::new();
        let mut victim = avatar_for(2, Team::B);
        victim.loadout.start_firing();
        victim.velocity = Vec3::new(300.0, 0.0, 0.0);

        apply_damage(&mut fixture.ctx(MatchPhase::InProgress), &mut victim, 100.0, Some(1));

        assert!(!victim.accepts_input());
        assert_eq!(victim.velocity, Vec3::ZERO);
        assert!(!victim.loadout.active().unwrap().is_active());
        assert!(victim.loadout.tick(1.0).is_none());
        assert_approx_eq!(victim.respawn_at().unwrap() as f32, 5.0, 0.0001);
    }

    #[test]
    fn test_respawn_countdown_ticks_scheduled() {
        let mut fixture = Fixture::new();
        let mut victim = avatar_for(2, Team::B);
        apply_damage(&mut fixture.ctx(MatchPhase::InProgress), &mut victim, 100.0, Some(1));

        let fired = fixture.scheduler.advance(5.0);
        let avatar = victim.id;
        assert_eq!(
            fired,
            vec![
                Task::RespawnCountdown { avatar, seconds: 4 },
                Task::RespawnCountdown { avatar, seconds: 3 },
                Task::RespawnCountdown { avatar, seconds: 2 },
                Task::RespawnCountdown { avatar, seconds: 1 },
                Task::Respawn { avatar },
            ]
        );
    }

    #[test]
    fn test_scoreboard_leader() {
        let mut scores = Scoreboard::new();
        assert_eq!(scores.leader_at(2), None);
        scores.credit(Team::B);
        scores.credit(Team::B);
        assert_eq!(scores.leader_at(2), Some(Team::B));
        scores.reset();
        assert_eq!(scores.score(Team::B), 0);
    }
}
