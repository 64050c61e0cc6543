//! The world surface the session queries for placement and hit resolution
//!
//! Movement and physics stay outside the session. What the session needs from
//! the world is narrow: where the spawn points are, whether a point is
//! blocked by a live avatar, and who a shot hits. [`Arena`] is the built-in
//! flat-floor implementation used by the server binary and the tests.

use crate::spawn::{AvatarMarker, Placement, SpawnPoint, SpawnTag};
use glam::Vec3;
use shared::{ParticipantId, Team};

pub const AVATAR_RADIUS: f32 = 40.0;

/// A live avatar as seen by hit resolution
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Combatant {
    pub participant: ParticipantId,
    pub team: Team,
    pub position: Vec3,
}

pub trait WorldSurface: Send + Sync {
    fn spawn_points(&self) -> Vec<SpawnPoint>;

    fn is_encroached(&self, point: &SpawnPoint, avatars: &[AvatarMarker]) -> bool;

    fn can_teleport(&self, point: &SpawnPoint, avatars: &[AvatarMarker]) -> bool;

    /// Who a shot fired by `shooter` hits, if anyone
    fn resolve_shot(&self, shooter: &Combatant, range: f32, targets: &[Combatant]) -> Option<ParticipantId>;
}

/// A world surface paired with the avatars alive at the time of the query
pub struct Occupancy<'a> {
    world: &'a dyn WorldSurface,
    avatars: &'a [AvatarMarker],
}

impl<'a> Occupancy<'a> {
    pub fn new(world: &'a dyn WorldSurface, avatars: &'a [AvatarMarker]) -> Self {
        Self { world, avatars }
    }
}

impl Placement for Occupancy<'_> {
    fn is_encroached(&self, point: &SpawnPoint) -> bool {
        self.world.is_encroached(point, self.avatars)
    }

    fn can_teleport(&self, point: &SpawnPoint) -> bool {
        self.world.can_teleport(point, self.avatars)
    }
}

#[derive(Debug, Clone)]
pub struct Arena {
    spawn_points: Vec<SpawnPoint>,
    avatar_radius: f32,
}

impl Arena {
    pub fn new(spawn_points: Vec<SpawnPoint>, avatar_radius: f32) -> Self {
        Self {
            spawn_points,
            avatar_radius,
        }
    }

    /// Two team bases at opposite ends, an untagged middle and two backup points
    pub fn standard() -> Self {
        let mut points = Vec::new();
        let mut id = 0;
        let mut push = |tag: SpawnTag, position: Vec3| {
            id += 1;
            points.push(SpawnPoint::new(id, tag, position));
        };

        for z in [-600.0, 0.0, 600.0] {
            push(SpawnTag::Team(Team::A), Vec3::new(-3000.0, 0.0, z));
        }
        for z in [-600.0, 0.0, 600.0] {
            push(SpawnTag::Team(Team::B), Vec3::new(3000.0, 0.0, z));
        }
        push(SpawnTag::Untagged, Vec3::new(0.0, 0.0, -300.0));
        push(SpawnTag::Untagged, Vec3::new(0.0, 0.0, 300.0));
        push(SpawnTag::Backup, Vec3::new(0.0, 0.0, -4000.0));
        push(SpawnTag::Backup, Vec3::new(0.0, 0.0, 4000.0));

        Self::new(points, AVATAR_RADIUS)
    }

    fn blocked(&self, position: Vec3, avatars: &[AvatarMarker]) -> bool {
        avatars
            .iter()
            .any(|avatar| avatar.position.distance(position) < self.avatar_radius * 2.0)
    }
}

impl Default for Arena {
    fn default() -> Self {
        Self::standard()
    }
}

impl WorldSurface for Arena {
    fn spawn_points(&self) -> Vec<SpawnPoint> {
        self.spawn_points.clone()
    }

    fn is_encroached(&self, point: &SpawnPoint, avatars: &[AvatarMarker]) -> bool {
        self.blocked(point.position, avatars)
    }

    fn can_teleport(&self, point: &SpawnPoint, avatars: &[AvatarMarker]) -> bool {
        let step = self.avatar_radius * 3.0;
        [Vec3::X, Vec3::NEG_X, Vec3::Z, Vec3::NEG_Z]
            .into_iter()
            .any(|direction| !self.blocked(point.position + direction * step, avatars))
    }

    fn resolve_shot(&self, shooter: &Combatant, range: f32, targets: &[Combatant]) -> Option<ParticipantId> {
        targets
            .iter()
            .filter(|target| target.participant != shooter.participant)
            .filter(|target| shooter.team == Team::None || target.team != shooter.team)
            .map(|target| (target, target.position.distance(shooter.position)))
            .filter(|(_, distance)| *distance <= range)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(target, _)| target.participant)
    }
}
