//! Weapon ownership, switching, ammo and trigger state
//!
//! Each avatar owns a [`Loadout`]. Weapons are unique by kind within a
//! loadout, kept in insertion order, and at most one of them is active.

use log::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WeaponKind {
    Pistol,
    Rifle,
    Shotgun,
}

impl WeaponKind {
    pub fn magazine_size(&self) -> u32 {
        match self {
            WeaponKind::Pistol => 12,
            WeaponKind::Rifle => 30,
            WeaponKind::Shotgun => 6,
        }
    }

    pub fn damage(&self) -> f32 {
        match self {
            WeaponKind::Pistol => 20.0,
            WeaponKind::Rifle => 12.0,
            WeaponKind::Shotgun => 45.0,
        }
    }

    /// Seconds between consecutive shots while the trigger is held
    pub fn refire_interval(&self) -> f32 {
        match self {
            WeaponKind::Pistol => 0.4,
            WeaponKind::Rifle => 0.1,
            WeaponKind::Shotgun => 0.9,
        }
    }

    pub fn range(&self) -> f32 {
        match self {
            WeaponKind::Pistol => 2500.0,
            WeaponKind::Rifle => 5000.0,
            WeaponKind::Shotgun => 800.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Weapon {
    pub kind: WeaponKind,
    ammo: u32,
    magazine: u32,
    active: bool,
    firing: bool,
    cooldown: f32,
}

impl Weapon {
    /// A fully loaded, inactive weapon
    pub fn new(kind: WeaponKind) -> Self {
        Self {
            kind,
            ammo: kind.magazine_size(),
            magazine: kind.magazine_size(),
            active: false,
            firing: false,
            cooldown: 0.0,
        }
    }

    pub fn ammo(&self) -> u32 {
        self.ammo
    }

    pub fn magazine(&self) -> u32 {
        self.magazine
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_firing(&self) -> bool {
        self.firing
    }

    pub fn is_full(&self) -> bool {
        self.ammo >= self.magazine
    }

    /// Refills up to the magazine size. Returns false, consuming nothing, if full.
    pub fn add_ammo(&mut self, amount: u32) -> bool {
        if self.is_full() {
            return false;
        }
        self.ammo = (self.ammo + amount).min(self.magazine);
        true
    }

    fn activate(&mut self) {
        self.active = true;
    }

    fn deactivate(&mut self) {
        self.active = false;
        self.firing = false;
    }

    /// Advances the refire clock and returns how many shots were fired.
    fn tick(&mut self, dt: f32) -> u32 {
        self.cooldown = (self.cooldown - dt).max(0.0);
        if !self.active || !self.firing {
            return 0;
        }

        let mut shots = 0;
        while self.firing && self.cooldown <= 0.0 && self.ammo > 0 {
            self.ammo -= 1;
            self.cooldown += self.kind.refire_interval();
            shots += 1;
        }
        if self.ammo == 0 {
            self.firing = false;
        }
        shots
    }
}

/// Shots produced by one loadout tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Volley {
    pub kind: WeaponKind,
    pub shots: u32,
}

/// The weapons owned by one avatar
#[derive(Debug, Clone, Default)]
pub struct Loadout {
    weapons: Vec<Weapon>,
    active: Option<usize>,
}

impl Loadout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.weapons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weapons.is_empty()
    }

    pub fn owns(&self, kind: WeaponKind) -> bool {
        self.weapons.iter().any(|weapon| weapon.kind == kind)
    }

    pub fn active(&self) -> Option<&Weapon> {
        self.active.and_then(|index| self.weapons.get(index))
    }

    pub fn active_mut(&mut self) -> Option<&mut Weapon> {
        match self.active {
            Some(index) => self.weapons.get_mut(index),
            None => None,
        }
    }

    pub fn active_kind(&self) -> Option<WeaponKind> {
        self.active().map(|weapon| weapon.kind)
    }

    /// Adds and equips a weapon of `kind`. Returns false if one is already owned.
    pub fn add_weapon(&mut self, kind: WeaponKind) -> bool {
        if self.owns(kind) {
            debug!("Already own a {:?}, ignoring", kind);
            return false;
        }

        self.weapons.push(Weapon::new(kind));
        if let Some(current) = self.active_mut() {
            current.deactivate();
        }

        let index = self.weapons.len() - 1;
        self.weapons[index].activate();
        self.active = Some(index);
        true
    }

    /// Cycles to the next owned weapon in insertion order, wrapping around.
    ///
    /// Returns false without touching anything when fewer than two are owned.
    pub fn switch_weapon(&mut self) -> bool {
        if self.weapons.len() <= 1 {
            return false;
        }

        let current = self.active.unwrap_or(0);
        self.weapons[current].deactivate();

        let next = if current + 1 >= self.weapons.len() {
            0
        } else {
            current + 1
        };
        self.weapons[next].activate();
        self.active = Some(next);
        true
    }

    pub fn start_firing(&mut self) -> bool {
        match self.active_mut() {
            Some(weapon) if weapon.ammo > 0 => {
                weapon.firing = true;
                true
            }
            _ => false,
        }
    }

    pub fn stop_firing(&mut self) -> bool {
        match self.active_mut() {
            Some(weapon) if weapon.firing => {
                weapon.firing = false;
                true
            }
            _ => false,
        }
    }

    /// Deactivates the active weapon, keeping it selected for the record.
    pub fn deactivate_all(&mut self) {
        for weapon in &mut self.weapons {
            weapon.deactivate();
        }
    }

    pub fn tick(&mut self, dt: f32) -> Option<Volley> {
        let weapon = self.active_mut()?;
        let shots = weapon.tick(dt);
        if shots == 0 {
            return None;
        }
        Some(Volley {
            kind: weapon.kind,
            shots,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_weapon_activates_newest() {
        let mut loadout = Loadout::new();
        assert!(loadout.add_weapon(WeaponKind::Pistol));
        assert!(loadout.add_weapon(WeaponKind::Rifle));

        assert_eq!(loadout.active_kind(), Some(WeaponKind::Rifle));
        let active_count = loadout.weapons.iter().filter(|w| w.is_active()).count();
        assert_eq!(active_count, 1);
    }

    #[test]
    fn test_add_weapon_unique_by_kind() {
        let mut loadout = Loadout::new();
        assert!(loadout.add_weapon(WeaponKind::Pistol));
        assert!(loadout.add_weapon(WeaponKind::Rifle));
        assert!(!loadout.add_weapon(WeaponKind::Pistol));

        assert_eq!(loadout.len(), 2);
        assert_eq!(loadout.active_kind(), Some(WeaponKind::Rifle));
    }

    #[test]
    fn test_switch_with_single_weapon_is_noop() {
        let mut loadout = Loadout::new();
        loadout.add_weapon(WeaponKind::Shotgun);

        assert!(!loadout.switch_weapon());
        assert_eq!(loadout.active_kind(), Some(WeaponKind::Shotgun));
        assert!(loadout.active().unwrap().is_active());
    }

    #[test]
    fn test_switch_with_no_weapons_is_noop() {
        let mut loadout = Loadout::new();
        assert!(!loadout.switch_weapon());
        assert!(loadout.active().is_none());
    }

    #[test]
    fn test_switch_cycles_and_wraps() {
        let mut loadout = Loadout::new();
        loadout.add_weapon(WeaponKind::Pistol);
        loadout.add_weapon(WeaponKind::Rifle);
        loadout.add_weapon(WeaponKind::Shotgun);
        assert_eq!(loadout.active_kind(), Some(WeaponKind::Shotgun));

        assert!(loadout.switch_weapon());
        assert_eq!(loadout.active_kind(), Some(WeaponKind::Pistol));
        assert!(loadout.switch_weapon());
        assert_eq!(loadout.active_kind(), Some(WeaponKind::Rifle));
        assert!(loadout.switch_weapon());
        assert_eq!(loadout.active_kind(), Some(WeaponKind::Shotgun));

        let active_count = loadout.weapons.iter().filter(|w| w.is_active()).count();
        assert_eq!(active_count, 1);
    }

    #[test]
    fn test_add_ammo_rejected_when_full() {
        let mut weapon = Weapon::new(WeaponKind::Pistol);
        assert!(weapon.is_full());
        assert!(!weapon.add_ammo(5));
        assert_eq!(weapon.ammo(), 12);
    }

    #[test]
    fn test_add_ammo_clamps_to_magazine() {
        let mut weapon = Weapon::new(WeaponKind::Pistol);
        weapon.ammo = 10;
        assert!(weapon.add_ammo(5));
        assert_eq!(weapon.ammo(), 12);
    }

    #[test]
    fn test_firing_consumes_ammo_at_refire_rate() {
        let mut loadout = Loadout::new();
        loadout.add_weapon(WeaponKind::Rifle);
        assert!(loadout.start_firing());

        // First shot is immediate, then one every 0.1s
        let volley = loadout.tick(0.0).unwrap();
        assert_eq!(volley.shots, 1);
        assert!(loadout.tick(0.05).is_none());
        let volley = loadout.tick(0.05).unwrap();
        assert_eq!(volley.shots, 1);
        assert_eq!(loadout.active().unwrap().ammo(), 28);

        assert!(loadout.stop_firing());
        assert!(loadout.tick(1.0).is_none());
    }

    #[test]
    fn test_firing_stops_when_empty() {
        let mut loadout = Loadout::new();
        loadout.add_weapon(WeaponKind::Shotgun);
        loadout.start_firing();

        let mut total = 0;
        for _ in 0..20 {
            if let Some(volley) = loadout.tick(1.0) {
                total += volley.shots;
            }
        }
        assert_eq!(total, 6);
        assert!(!loadout.active().unwrap().is_firing());
        assert!(!loadout.start_firing());
    }

    #[test]
    fn test_switch_releases_trigger() {
        let mut loadout = Loadout::new();
        loadout.add_weapon(WeaponKind::Pistol);
        loadout.add_weapon(WeaponKind::Rifle);
        loadout.start_firing();

        loadout.switch_weapon();
        assert!(!loadout.weapons.iter().any(|w| w.is_firing()));
    }

    #[test]
    fn test_deactivate_all() {
        let mut loadout = Loadout::new();
        loadout.add_weapon(WeaponKind::Pistol);
        loadout.start_firing();
        loadout.deactivate_all();

        assert!(!loadout.active().unwrap().is_active());
        assert!(loadout.tick(1.0).is_none());
    }
}
