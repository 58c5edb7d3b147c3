use super::System;
use crate::defs::status_def;
use crate::world::{DamageRequest, World};
use shared::{EntityId, EntityKind, EventKind, StatusId};

/// Applies or refreshes a status with its default duration. Emits
/// `StatusApplied` only when the status was not already active.
pub fn apply_status(world: &mut World, target: EntityId, status: StatusId, source: Option<EntityId>) -> bool {
    let duration = status_def(status).duration_ms;
    let fresh = match world.entity_mut(target).filter(|e| e.alive).and_then(|e| e.statuses_mut()) {
        Some(statuses) => statuses.apply(status, duration, source),
        None => return false,
    };
    if fresh {
        world.emit(EventKind::StatusApplied { target, status });
    }
    fresh
}

pub struct StatusSystem;

impl System for StatusSystem {
    fn name(&self) -> &'static str {
        "status"
    }

    fn update(&mut self, world: &mut World, dt_ms: f64) {
        let mut damage = Vec::new();
        let mut heals = Vec::new();
        let mut expired = Vec::new();

        for kind in [EntityKind::Player, EntityKind::Enemy, EntityKind::Building] {
            for id in world.ids_of(kind) {
                let Some(statuses) = world.entity_mut(id).filter(|e| e.alive).and_then(|e| e.statuses_mut()) else {
                    continue;
                };
                for (status, instance) in statuses.iter_mut() {
                    let def = status_def(*status);
                    instance.elapsed_ms += dt_ms;
                    if def.pulse_ms > 0.0 {
                        instance.pulse_ms += dt_ms;
                        let mut pulses = 0u32;
                        while instance.pulse_ms >= def.pulse_ms {
                            instance.pulse_ms -= def.pulse_ms;
                            pulses += 1;
                        }
                        if pulses > 0 && def.damage_per_pulse > 0.0 {
                            damage.push(DamageRequest {
                                target: id,
                                source: instance.source,
                                amount: def.damage_per_pulse * pulses as f32,
                                status: None,
                            });
                        }
                        if pulses > 0 && def.heal_per_pulse > 0.0 {
                            heals.push((id, def.heal_per_pulse * pulses as f32));
                        }
                    }
                    if instance.elapsed_ms >= instance.duration_ms {
                        expired.push((id, *status));
                    }
                }
            }
        }

        for request in damage {
            world.queue_damage(request);
        }
        for (id, amount) in heals {
            if let Some(health) = world.entity_mut(id).and_then(|e| e.health_mut()) {
                health.heal(amount);
            }
        }
        for (target, status) in expired {
            if let Some(statuses) = world.entity_mut(target).and_then(|e| e.statuses_mut()) {
                statuses.remove(status);
            }
            world.emit(EventKind::StatusExpired { target, status });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::defs::{enemy_def, EnemyKind};
    use crate::entity::Entity;
    use crate::math::Vec2;

    fn setup() -> (World, EntityId) {
        let mut world = World::new(&SimConfig::default());
        let pos = Vec2::new(400.0, 400.0);
        let grunt = world.spawn(Entity::enemy(&enemy_def(EnemyKind::Grunt), pos, 1.0, pos));
        (world, grunt)
    }

    #[test]
    fn test_reapply_refreshes_without_stacking() {
        let (mut world, grunt) = setup();
        assert!(apply_status(&mut world, grunt, StatusId::Slow, None));
        StatusSystem.update(&mut world, 1500.0);
        assert!(!apply_status(&mut world, grunt, StatusId::Slow, None));
        let statuses = world.entity(grunt).unwrap().statuses().unwrap();
        assert_eq!(statuses.len(), 1);
        assert_eq!(statuses.get(StatusId::Slow).unwrap().elapsed_ms, 0.0);

        let applied = world
            .events
            .pending()
            .iter()
            .filter(|e| matches!(e.kind, EventKind::StatusApplied { .. }))
            .count();
        assert_eq!(applied, 1);
    }

    #[test]
    fn test_burn_queues_periodic_damage() {
        let (mut world, grunt) = setup();
        apply_status(&mut world, grunt, StatusId::Burn, Some(EntityId(77)));
        StatusSystem.update(&mut world, 250.0);
        assert!(world.damage_queue.is_empty());
        StatusSystem.update(&mut world, 250.0);
        assert_eq!(world.damage_queue.len(), 1);
        assert_eq!(world.damage_queue[0].amount, 4.0);
        assert_eq!(world.damage_queue[0].source, Some(EntityId(77)));
    }

    #[test]
    fn test_expiry_removes_and_emits() {
        let (mut world, grunt) = setup();
        apply_status(&mut world, grunt, StatusId::Slow, None);
        StatusSystem.update(&mut world, 2000.0);
        assert!(world.entity(grunt).unwrap().statuses().unwrap().is_empty());
        assert!(world
            .events
            .pending()
            .iter()
            .any(|e| e.kind == EventKind::StatusExpired { target: grunt, status: StatusId::Slow }));
    }

    #[test]
    fn test_regen_heals() {
        let mut world = World::new(&SimConfig::default());
        let player = world.spawn(Entity::player(Vec2::new(100.0, 100.0)));
        world.entity_mut(player).unwrap().health_mut().unwrap().set(50.0);
        apply_status(&mut world, player, StatusId::Regen, None);
        StatusSystem.update(&mut world, 500.0);
        assert_eq!(world.entity(player).unwrap().health().unwrap().current, 55.0);
    }
}
