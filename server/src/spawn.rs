//! Spawn point selection with tiered fallback
//!
//! Candidates are bucketed into three tiers and the first non-empty tier wins:
//!
//! 1. free points matching the team tag, with no enemy nearby
//! 2. occupied points matching the team tag that still have a teleport spot,
//!    with no enemy nearby
//! 3. backup points, regardless of team or enemies
//!
//! A point flagged `force_here` bypasses all of this and is returned as soon
//! as it is seen.

use glam::Vec3;
use rand::seq::SliceRandom;
use rand::Rng;
use shared::Team;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnTag {
    Team(Team),
    Backup,
    Untagged,
}

impl SpawnTag {
    fn matches(&self, team: Team) -> bool {
        match (self, team) {
            (SpawnTag::Untagged, Team::None) => true,
            (SpawnTag::Team(tagged), team) => team != Team::None && *tagged == team,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpawnPoint {
    pub id: u32,
    pub tag: SpawnTag,
    pub position: Vec3,
    pub force_here: bool,
}

impl SpawnPoint {
    pub fn new(id: u32, tag: SpawnTag, position: Vec3) -> Self {
        Self {
            id,
            tag,
            position,
            force_here: false,
        }
    }
}

/// Occupancy queries answered by the world
pub trait Placement {
    /// True if an avatar placed exactly here would overlap something
    fn is_encroached(&self, point: &SpawnPoint) -> bool;

    /// True if an encroached point has a nearby free spot to nudge into
    fn can_teleport(&self, point: &SpawnPoint) -> bool;
}

/// A live avatar as seen by the spawn selector
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AvatarMarker {
    pub team: Team,
    pub position: Vec3,
}

pub struct SpawnSelector {
    points: Vec<SpawnPoint>,
    exclusion_radius: f32,
}

impl SpawnSelector {
    pub fn new(points: Vec<SpawnPoint>, exclusion_radius: f32) -> Self {
        Self {
            points,
            exclusion_radius,
        }
    }

    fn enemy_nearby(&self, point: &SpawnPoint, team: Team, avatars: &[AvatarMarker]) -> bool {
        avatars.iter().any(|avatar| {
            avatar.team != team
                && avatar.team != Team::None
                && avatar.position.distance(point.position) <= self.exclusion_radius
        })
    }

    /// Picks a spawn point for a participant of `team`.
    ///
    /// Returns `None` only when every tier is empty; the caller decides what
    /// to do about it.
    pub fn choose_spawn<R: Rng + ?Sized>(
        &self,
        team: Team,
        placement: &dyn Placement,
        avatars: &[AvatarMarker],
        rng: &mut R,
    ) -> Option<&SpawnPoint> {
        let mut unoccupied = Vec::new();
        let mut occupied = Vec::new();
        let mut backup = Vec::new();

        for point in &self.points {
            if point.force_here {
                return Some(point);
            }

            if point.tag == SpawnTag::Backup {
                backup.push(point);
            } else if point.tag.matches(team) {
                if !placement.is_encroached(point) {
                    unoccupied.push(point);
                } else if placement.can_teleport(point) {
                    occupied.push(point);
                }
            }
        }

        unoccupied.retain(|point| !self.enemy_nearby(point, team, avatars));
        occupied.retain(|point| !self.enemy_nearby(point, team, avatars));

        [unoccupied, occupied, backup]
            .into_iter()
            .find(|tier| !tier.is_empty())
            .and_then(|tier| tier.choose(rng).copied())
    }
}
