//! The authoritative session
//!
//! [`Session`] owns every piece of mutable match state: the roster, the
//! scoreboard, avatars and their loadouts, the phase machine and the timer
//! queue. It is driven from a single thread of control. Client requests enter
//! only through [`Session::handle_intent`]; the world reports damage,
//! pickups and movement through the other `&mut self` methods.

use crate::arena::{Combatant, Occupancy, WorldSurface};
use crate::combat::{self, Avatar, CombatContext, DamageOutcome, Scoreboard};
use crate::config::SessionConfig;
use crate::coordinator::{MatchCoordinator, PhaseChange};
use crate::notify::{NotificationRouter, Observer};
use crate::pickup::Pickup;
use crate::roster::Roster;
use crate::spawn::{AvatarMarker, SpawnSelector};
use crate::timers::{AvatarId, Scheduler, Task, TimerOwner};
use crate::weapons::WeaponKind;
use glam::Vec3;
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::{
    AlertColor, Intent, MatchPhase, ParticipantId, ServerEvent, SessionSnapshot, Team,
    START_ALERT_DURATION, WIN_ALERT_DURATION,
};
use std::collections::HashMap;

pub struct Session {
    config: SessionConfig,
    coordinator: MatchCoordinator,
    roster: Roster,
    scores: Scoreboard,
    router: NotificationRouter,
    scheduler: Scheduler,
    spawns: SpawnSelector,
    world: Box<dyn WorldSurface>,
    avatars: HashMap<AvatarId, Avatar>,
    /// The avatar each participant currently controls, alive or awaiting respawn
    controlled: HashMap<ParticipantId, AvatarId>,
    pickups: HashMap<u32, Pickup>,
    next_avatar_id: AvatarId,
    rng: StdRng,
    tick: u32,
}

fn ammo_event(avatar: &Avatar) -> Option<ServerEvent> {
    avatar.loadout.active().map(|weapon| ServerEvent::AmmoChanged {
        magazine: weapon.magazine(),
        ammo: weapon.ammo(),
    })
}

impl Session {
    pub fn new(config: SessionConfig, world: Box<dyn WorldSurface>) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let spawns = SpawnSelector::new(world.spawn_points(), config.spawn_exclusion_radius);

        Self {
            coordinator: MatchCoordinator::new(config.countdown, config.win_score),
            config,
            roster: Roster::new(),
            scores: Scoreboard::new(),
            router: NotificationRouter::new(),
            scheduler: Scheduler::new(),
            spawns,
            world,
            avatars: HashMap::new(),
            controlled: HashMap::new(),
            pickups: HashMap::new(),
            next_avatar_id: 1,
            rng,
            tick: 0,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn phase(&self) -> MatchPhase {
        self.coordinator.phase()
    }

    pub fn countdown(&self) -> f32 {
        self.coordinator.countdown()
    }

    pub fn tick_count(&self) -> u32 {
        self.tick
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn scores(&self) -> &Scoreboard {
        &self.scores
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// The avatar `participant` controls, including a dead one awaiting respawn
    pub fn avatar_of(&self, participant: ParticipantId) -> Option<&Avatar> {
        self.controlled
            .get(&participant)
            .and_then(|id| self.avatars.get(id))
    }

    pub fn alive_count(&self) -> usize {
        self.avatars.values().filter(|avatar| avatar.is_alive()).count()
    }

    /// Adds a participant, balances it onto a team and registers its observer.
    ///
    /// A participant joining mid-match gets an avatar straight away.
    pub fn join(
        &mut self,
        id: ParticipantId,
        name: &str,
        observer: Option<Box<dyn Observer>>,
    ) -> Team {
        self.roster.join(id, name);
        if let Some(observer) = observer {
            self.router.register(id, observer);
        }
        let team = self.roster.assign_team(id).unwrap_or_default();

        if self.phase() == MatchPhase::InProgress {
            self.spawn_participant(id);
        }
        team
    }

    /// Removes a participant along with its avatar and every timer it owns.
    pub fn leave(&mut self, id: ParticipantId) -> bool {
        if let Some(avatar_id) = self.controlled.remove(&id) {
            self.destroy_avatar(avatar_id);
        }
        self.scheduler.cancel_owner(TimerOwner::Participant(id));
        self.router.unregister(id);
        self.roster.leave(id).is_some()
    }

    /// Applies one client request. Returns whether it changed anything.
    pub fn handle_intent(&mut self, id: ParticipantId, intent: Intent) -> bool {
        if self.roster.get(id).is_none() {
            debug!("Intent from unknown participant {}", id);
            return false;
        }

        match intent {
            Intent::StartFire => match self.active_avatar_mut(id) {
                Some(avatar) => avatar.loadout.start_firing(),
                None => false,
            },
            Intent::StopFire => match self.active_avatar_mut(id) {
                Some(avatar) => avatar.loadout.stop_firing(),
                None => false,
            },
            Intent::SwitchWeapon => {
                let Some(avatar) = self.active_avatar_mut(id) else {
                    return false;
                };
                if !avatar.loadout.switch_weapon() {
                    debug!("Participant {} has nothing to switch to", id);
                    return false;
                }
                if let Some(event) = ammo_event(avatar) {
                    self.router.send_to(id, event);
                }
                true
            }
            Intent::ToggleReady(ready) => {
                let changed = self.roster.set_ready(id, ready);
                let ready = self.roster.get(id).map_or(false, |participant| participant.ready);
                self.router.send_to(id, ServerEvent::ReadyChanged { ready });
                changed
            }
            Intent::SendChat { channel, text } => {
                self.router.send_chat(&self.roster, channel, id, &text) > 0
            }
        }
    }

    /// Damages the avatar controlled by `target`.
    pub fn apply_damage(
        &mut self,
        target: ParticipantId,
        amount: f32,
        instigator: Option<ParticipantId>,
    ) -> DamageOutcome {
        let Some(avatar_id) = self.controlled.get(&target).copied() else {
            debug!("Participant {} has no avatar to damage", target);
            return DamageOutcome::Ignored;
        };
        let Some(avatar) = self.avatars.get_mut(&avatar_id) else {
            return DamageOutcome::Ignored;
        };

        let mut ctx = CombatContext {
            phase: self.coordinator.phase(),
            roster: &mut self.roster,
            scores: &mut self.scores,
            router: &mut self.router,
            scheduler: &mut self.scheduler,
            respawn_delay: self.config.respawn_delay,
        };
        combat::apply_damage(&mut ctx, avatar, amount, instigator)
    }

    /// Grants a weapon to a living avatar. Owning one of that kind already is a no-op.
    pub fn add_weapon(&mut self, participant: ParticipantId, kind: WeaponKind) -> bool {
        let Some(avatar) = self.active_avatar_mut(participant) else {
            return false;
        };
        if !avatar.loadout.add_weapon(kind) {
            return false;
        }
        if let Some(event) = ammo_event(avatar) {
            self.router.send_to(participant, event);
        }
        true
    }

    /// Refills the active weapon. Rejected when it is already full.
    pub fn add_ammo(&mut self, participant: ParticipantId, amount: u32) -> bool {
        let Some(avatar) = self.active_avatar_mut(participant) else {
            return false;
        };
        let refilled = match avatar.loadout.active_mut() {
            Some(weapon) => weapon.add_ammo(amount),
            None => false,
        };
        if !refilled {
            return false;
        }
        if let Some(event) = ammo_event(avatar) {
            self.router.send_to(participant, event);
        }
        true
    }

    pub fn place_pickup(&mut self, pickup: Pickup) {
        self.pickups.insert(pickup.id, pickup);
    }

    pub fn pickup_count(&self) -> usize {
        self.pickups.len()
    }

    /// The world reports `participant` overlapping a pickup. The first
    /// successful grant consumes it.
    pub fn touch_pickup(&mut self, participant: ParticipantId, pickup_id: u32) -> bool {
        let avatar = self
            .controlled
            .get(&participant)
            .and_then(|id| self.avatars.get_mut(id))
            .filter(|avatar| avatar.accepts_input());
        let Some(avatar) = avatar else {
            return false;
        };
        let Some(pickup) = self.pickups.get_mut(&pickup_id) else {
            return false;
        };
        if !pickup.try_apply(&mut avatar.loadout) {
            return false;
        }

        let event = ammo_event(avatar);
        self.pickups.remove(&pickup_id);
        debug!("Pickup {} consumed by participant {}", pickup_id, participant);
        if let Some(event) = event {
            self.router.send_to(participant, event);
        }
        true
    }

    /// The world reports where an avatar has moved to.
    pub fn move_avatar(&mut self, participant: ParticipantId, position: Vec3) -> bool {
        match self.active_avatar_mut(participant) {
            Some(avatar) => {
                avatar.position = position;
                true
            }
            None => false,
        }
    }

    /// Advances the session clock: fires due timers, resolves weapon fire and
    /// steps the phase machine.
    pub fn tick(&mut self, dt: f32) -> Option<PhaseChange> {
        self.tick = self.tick.wrapping_add(1);

        for task in self.scheduler.advance(dt) {
            debug!("Timer fired: {:?}", task);
            let restarted = task == Task::RestartMatch;
            self.run_task(task);
            if restarted {
                // Everything else from this batch belonged to the old match
                break;
            }
        }

        self.fire_weapons(dt);

        let change = self.coordinator.tick(dt, &self.roster, &self.scores);
        if let Some(change) = change {
            self.on_phase_change(change);
        }
        change
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let participants = self
            .roster
            .iter()
            .filter_map(|participant| {
                let (alive, health) = match self.avatar_of(participant.id) {
                    Some(avatar) => (avatar.is_alive(), avatar.health_fraction()),
                    None => (false, 0.0),
                };
                self.roster.info(participant.id, alive, health)
            })
            .collect();

        SessionSnapshot {
            tick: self.tick,
            phase: self.phase(),
            team_a_score: self.scores.score(Team::A),
            team_b_score: self.scores.score(Team::B),
            losses_a: self.scores.losses(Team::A),
            losses_b: self.scores.losses(Team::B),
            countdown: self.countdown(),
            players_ready: self.roster.ready_count(),
            player_count: self.roster.len() as u32,
            participants,
        }
    }

    /// Tears the match down and waits for everyone to ready up again.
    pub fn restart(&mut self) {
        info!("Restarting match");
        self.avatars.clear();
        self.controlled.clear();
        self.scheduler.clear();
        self.scores.reset();
        self.roster.reset_for_restart();
        self.coordinator.reset();
    }

    fn active_avatar_mut(&mut self, participant: ParticipantId) -> Option<&mut Avatar> {
        let avatar_id = *self.controlled.get(&participant)?;
        self.avatars
            .get_mut(&avatar_id)
            .filter(|avatar| avatar.accepts_input())
    }

    fn markers(&self) -> Vec<AvatarMarker> {
        self.avatars
            .values()
            .filter(|avatar| avatar.is_alive())
            .map(|avatar| AvatarMarker {
                team: avatar.team,
                position: avatar.position,
            })
            .collect()
    }

    fn combatants(&self) -> Vec<Combatant> {
        self.avatars
            .values()
            .filter(|avatar| avatar.is_alive())
            .map(|avatar| Combatant {
                participant: avatar.owner,
                team: avatar.team,
                position: avatar.position,
            })
            .collect()
    }

    fn destroy_avatar(&mut self, avatar_id: AvatarId) {
        self.scheduler.cancel_owner(TimerOwner::Avatar(avatar_id));
        self.avatars.remove(&avatar_id);
    }

    fn run_task(&mut self, task: Task) {
        match task {
            Task::Respawn { avatar } => self.respawn(avatar),
            Task::RespawnCountdown { avatar, seconds } => {
                if let Some(owner) = self.avatars.get(&avatar).map(|avatar| avatar.owner) {
                    self.router
                        .send_to(owner, ServerEvent::RespawnCountdown { seconds });
                }
            }
            Task::RetrySpawn { participant } => {
                self.spawn_participant(participant);
            }
            Task::RestartMatch => self.restart(),
        }
    }

    /// Discards a dead avatar and puts its owner back into play.
    fn respawn(&mut self, avatar_id: AvatarId) {
        let Some(old) = self.avatars.remove(&avatar_id) else {
            debug!("Avatar {} already gone, skipping respawn", avatar_id);
            return;
        };
        self.scheduler.cancel_owner(TimerOwner::Avatar(avatar_id));
        if self.controlled.get(&old.owner) == Some(&avatar_id) {
            self.controlled.remove(&old.owner);
        }
        self.spawn_participant(old.owner);
    }

    /// Creates a fresh avatar for `id` at a spawn point chosen for its team.
    ///
    /// When no point is usable a retry is scheduled instead.
    fn spawn_participant(&mut self, id: ParticipantId) -> Option<AvatarId> {
        if self.phase() == MatchPhase::WaitingToStart {
            debug!("Not spawning participant {} before the match starts", id);
            return None;
        }
        if let Some(existing) = self.controlled.get(&id) {
            return Some(*existing);
        }
        let team = self.roster.assign_team(id)?;

        let markers = self.markers();
        let occupancy = Occupancy::new(&*self.world, &markers);
        let chosen = self
            .spawns
            .choose_spawn(team, &occupancy, &markers, &mut self.rng)
            .map(|point| point.position);

        let Some(position) = chosen else {
            warn!("No spawn point available for participant {} on team {}", id, team.label());
            let retry = Task::RetrySpawn { participant: id };
            if !self.scheduler.is_scheduled(&retry) {
                self.scheduler.schedule(
                    TimerOwner::Participant(id),
                    self.config.respawn_retry_delay,
                    retry,
                );
            }
            return None;
        };

        let avatar_id = self.next_avatar_id;
        self.next_avatar_id += 1;

        let mut avatar = Avatar::new(avatar_id, id, team, self.config.max_health, position);
        avatar.loadout.add_weapon(self.config.starting_weapon);
        let ammo = ammo_event(&avatar);
        self.avatars.insert(avatar_id, avatar);
        self.controlled.insert(id, avatar_id);

        info!("Spawned participant {} (team {}) at {}", id, team.label(), position);
        self.router.send_to(id, ServerEvent::Spawned { position });
        if let Some(event) = ammo {
            self.router.send_to(id, event);
        }
        self.router.publish(ServerEvent::HealthChanged {
            participant: id,
            fraction: 1.0,
        });
        Some(avatar_id)
    }

    fn fire_weapons(&mut self, dt: f32) {
        let mut ids: Vec<AvatarId> = self.avatars.keys().copied().collect();
        ids.sort_unstable();

        let mut volleys = Vec::new();
        for avatar_id in ids {
            let Some(avatar) = self.avatars.get_mut(&avatar_id) else {
                continue;
            };
            if !avatar.accepts_input() {
                continue;
            }
            let Some(volley) = avatar.loadout.tick(dt) else {
                continue;
            };
            if let Some(event) = ammo_event(avatar) {
                self.router.send_to(avatar.owner, event);
            }
            volleys.push((avatar_id, volley));
        }

        for (avatar_id, volley) in volleys {
            for _ in 0..volley.shots {
                let Some(shooter) = self.avatars.get(&avatar_id).filter(|a| a.is_alive()) else {
                    break;
                };
                let shooter = Combatant {
                    participant: shooter.owner,
                    team: shooter.team,
                    position: shooter.position,
                };

                let targets = self.combatants();
                let hit = self
                    .world
                    .resolve_shot(&shooter, volley.kind.range(), &targets);
                if let Some(target) = hit {
                    self.apply_damage(target, volley.kind.damage(), Some(shooter.participant));
                }
            }
        }
    }

    fn on_phase_change(&mut self, change: PhaseChange) {
        match change {
            PhaseChange::MatchStarted => {
                self.router
                    .broadcast("STARTING MATCH", AlertColor::Green, START_ALERT_DURATION);
                for id in self.roster.ids().to_vec() {
                    self.spawn_participant(id);
                }
            }
            PhaseChange::MatchEnded { winner } => {
                self.router.broadcast(
                    format!("TEAM {} WINS", winner.label()),
                    AlertColor::for_team(winner),
                    WIN_ALERT_DURATION,
                );
                self.scheduler.schedule(
                    TimerOwner::Session,
                    self.config.restart_delay,
                    Task::RestartMatch,
                );
            }
        }
    }
}
