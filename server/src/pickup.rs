//! World pickups that grant ammo or weapons on overlap
//!
//! A pickup is consumed at most once. The first avatar it is successfully
//! applied to wins; a rejected grant (full magazine, weapon already owned)
//! leaves the pickup in the world for someone else.

use crate::weapons::{Loadout, WeaponKind};
use glam::Vec3;
use log::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickupKind {
    Ammo { amount: u32 },
    Weapon { kind: WeaponKind },
}

#[derive(Debug, Clone)]
pub struct Pickup {
    pub id: u32,
    pub kind: PickupKind,
    pub position: Vec3,
    consumed: bool,
}

impl Pickup {
    pub fn ammo(id: u32, amount: u32, position: Vec3) -> Self {
        Self {
            id,
            kind: PickupKind::Ammo { amount },
            position,
            consumed: false,
        }
    }

    pub fn weapon(id: u32, kind: WeaponKind, position: Vec3) -> Self {
        Self {
            id,
            kind: PickupKind::Weapon { kind },
            position,
            consumed: false,
        }
    }

    pub fn is_consumed(&self) -> bool {
        self.consumed
    }

    /// Grants this pickup to `loadout`. Returns true only on the call that
    /// consumed it.
    pub fn try_apply(&mut self, loadout: &mut Loadout) -> bool {
        if self.consumed {
            return false;
        }

        let granted = match self.kind {
            PickupKind::Ammo { amount } => match loadout.active_mut() {
                Some(weapon) => weapon.add_ammo(amount),
                None => false,
            },
            PickupKind::Weapon { kind } => loadout.add_weapon(kind),
        };

        if granted {
            self.consumed = true;
        } else {
            debug!("Pickup {} rejected", self.id);
        }
        granted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drained_pistol() -> Loadout {
        let mut loadout = Loadout::new();
        loadout.add_weapon(WeaponKind::Pistol);
        loadout.start_firing();
        loadout.tick(0.0);
        loadout.stop_firing();
        loadout
    }

    #[test]
    fn test_ammo_pickup_rejected_when_full() {
        let mut loadout = Loadout::new();
        loadout.add_weapon(WeaponKind::Pistol);
        let mut pickup = Pickup::ammo(1, 5, Vec3::ZERO);

        assert!(!pickup.try_apply(&mut loadout));
        assert!(!pickup.is_consumed());
    }

    #[test]
    fn test_ammo_pickup_consumed_once() {
        let mut first = drained_pistol();
        let mut second = drained_pistol();
        let mut pickup = Pickup::ammo(1, 5, Vec3::ZERO);

        assert!(pickup.try_apply(&mut first));
        assert!(!pickup.try_apply(&mut second));
        assert_eq!(first.active().unwrap().ammo(), 12);
        assert_eq!(second.active().unwrap().ammo(), 11);
    }

    #[test]
    fn test_ammo_pickup_without_weapon() {
        let mut loadout = Loadout::new();
        let mut pickup = Pickup::ammo(1, 5, Vec3::ZERO);
        assert!(!pickup.try_apply(&mut loadout));
    }

    #[test]
    fn test_weapon_pickup_skips_owners() {
        let mut owner = Loadout::new();
        owner.add_weapon(WeaponKind::Rifle);
        let mut other = Loadout::new();
        other.add_weapon(WeaponKind::Pistol);
        let mut pickup = Pickup::weapon(2, WeaponKind::Rifle, Vec3::ZERO);

        assert!(!pickup.try_apply(&mut owner));
        assert!(pickup.try_apply(&mut other));
        assert_eq!(other.active_kind(), Some(WeaponKind::Rifle));
        assert!(pickup.is_consumed());
    }
}
