//! Per-entity state shared by several entity kinds.

use shared::{EntityId, StatusId};
use std::collections::BTreeMap;

/// Hit points with an invulnerability window.
#[derive(Debug, Clone, PartialEq)]
pub struct Health {
    pub current: f32,
    pub max: f32,
    /// Remaining invulnerability; hits are ignored while positive.
    pub invuln_ms: f64,
    /// Invulnerability granted after every applied hit.
    pub hit_invuln_ms: f64,
}

impl Health {
    pub fn new(max: f32) -> Self {
        Self {
            current: max,
            max,
            invuln_ms: 0.0,
            hit_invuln_ms: 0.0,
        }
    }

    pub fn with_hit_invuln(mut self, ms: f64) -> Self {
        self.hit_invuln_ms = ms;
        self
    }

    pub fn is_invulnerable(&self) -> bool {
        self.invuln_ms > 0.0
    }

    pub fn is_depleted(&self) -> bool {
        self.current <= 0.0
    }

    /// Sets `current`, clamped to `[0, max]`.
    pub fn set(&mut self, value: f32) {
        self.current = value.clamp(0.0, self.max);
    }

    pub fn heal(&mut self, amount: f32) {
        self.set(self.current + amount);
    }

    /// Changes `max` and shifts `current` by the same amount.
    pub fn raise_max(&mut self, new_max: f32) {
        let delta = new_max - self.max;
        self.max = new_max;
        self.set(self.current + delta);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatusInstance {
    pub duration_ms: f64,
    pub elapsed_ms: f64,
    /// Time accumulated toward the next periodic effect.
    pub pulse_ms: f64,
    pub source: Option<EntityId>,
}

/// Active status effects keyed by id. Re-applying refreshes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusContainer {
    active: BTreeMap<StatusId, StatusInstance>,
}

impl StatusContainer {
    /// Applies or refreshes `status`. Returns true if it was not already active.
    pub fn apply(&mut self, status: StatusId, duration_ms: f64, source: Option<EntityId>) -> bool {
        match self.active.get_mut(&status) {
            Some(existing) => {
                existing.elapsed_ms = 0.0;
                existing.duration_ms = duration_ms;
                existing.source = source.or(existing.source);
                false
            }
            None => {
                self.active.insert(
                    status,
                    StatusInstance {
                        duration_ms,
                        elapsed_ms: 0.0,
                        pulse_ms: 0.0,
                        source,
                    },
                );
                true
            }
        }
    }

    pub fn has(&self, status: StatusId) -> bool {
        self.active.contains_key(&status)
    }

    pub fn get(&self, status: StatusId) -> Option<&StatusInstance> {
        self.active.get(&status)
    }

    pub fn remove(&mut self, status: StatusId) -> Option<StatusInstance> {
        self.active.remove(&status)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&StatusId, &mut StatusInstance)> {
        self.active.iter_mut()
    }

    pub fn ids(&self) -> Vec<StatusId> {
        self.active.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}

/// Magazine and timers of a player's weapon.
#[derive(Debug, Clone, PartialEq)]
pub struct WeaponState {
    pub ammo: u32,
    pub magazine: u32,
    pub cooldown_ms: f64,
    pub reload_left_ms: Option<f64>,
}

impl WeaponState {
    pub fn new(magazine: u32) -> Self {
        Self {
            ammo: magazine,
            magazine,
            cooldown_ms: 0.0,
            reload_left_ms: None,
        }
    }

    pub fn is_reloading(&self) -> bool {
        self.reload_left_ms.is_some()
    }

    pub fn can_fire(&self) -> bool {
        self.ammo > 0 && self.cooldown_ms <= 0.0 && !self.is_reloading()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_clamps() {
        let mut health = Health::new(100.0);
        health.set(150.0);
        assert_eq!(health.current, 100.0);
        health.set(-20.0);
        assert_eq!(health.current, 0.0);
        assert!(health.is_depleted());
    }

    #[test]
    fn test_raise_max_keeps_damage() {
        let mut health = Health::new(200.0);
        health.set(150.0);
        health.raise_max(500.0);
        assert_eq!(health.max, 500.0);
        assert_eq!(health.current, 450.0);
    }

    #[test]
    fn test_status_reapply_refreshes() {
        let mut statuses = StatusContainer::default();
        assert!(statuses.apply(StatusId::Burn, 3000.0, None));
        for (_, inst) in statuses.iter_mut() {
            inst.elapsed_ms = 2500.0;
        }
        assert!(!statuses.apply(StatusId::Burn, 3000.0, None));
        assert_eq!(statuses.len(), 1);
        assert_eq!(statuses.get(StatusId::Burn).unwrap().elapsed_ms, 0.0);
    }

    #[test]
    fn test_weapon_state_gates() {
        let mut weapon = WeaponState::new(2);
        assert!(weapon.can_fire());
        weapon.cooldown_ms = 10.0;
        assert!(!weapon.can_fire());
        weapon.cooldown_ms = 0.0;
        weapon.reload_left_ms = Some(100.0);
        assert!(!weapon.can_fire());
    }
}
