use super::System;
use crate::math::Vec2;
use crate::world::World;
use shared::EntityKind;

/// Semi-implicit Euler integration with per-tick friction.
pub struct MovementSystem;

impl System for MovementSystem {
    fn name(&self) -> &'static str {
        "movement"
    }

    fn update(&mut self, world: &mut World, dt_ms: f64) {
        let dt = (dt_ms / 1000.0) as f32;
        let friction = world.friction;
        for kind in [EntityKind::Player, EntityKind::Enemy, EntityKind::Pickup] {
            for id in world.ids_of(kind) {
                let Some(entity) = world.entity_mut(id).filter(|e| e.alive) else {
                    continue;
                };
                if entity.vel.length_squared() == 0.0 {
                    continue;
                }
                let next = entity.pos + entity.vel * dt;
                entity.vel = entity.vel * friction;
                if entity.vel.length_squared() < 1e-4 {
                    entity.vel = Vec2::ZERO;
                }
                world.set_position(id, next);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::entity::Entity;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_integrates_then_applies_friction() {
        let mut world = World::new(&SimConfig {
            friction: 0.5,
            ..Default::default()
        });
        let id = world.spawn(Entity::player(Vec2::new(100.0, 100.0)));
        world.entity_mut(id).unwrap().vel = Vec2::new(100.0, 0.0);
        MovementSystem.update(&mut world, 100.0);
        let player = world.entity(id).unwrap();
        assert_approx_eq!(player.pos.x, 110.0);
        assert_approx_eq!(player.vel.x, 50.0);
        assert!(world.query_circle(110.0, 100.0, 1.0).contains(&id));
    }

    #[test]
    fn test_static_entities_do_not_move() {
        let mut world = World::new(&SimConfig::default());
        let id = world.spawn(Entity::player(Vec2::new(100.0, 100.0)));
        MovementSystem.update(&mut world, 33.0);
        assert_eq!(world.entity(id).unwrap().pos, Vec2::new(100.0, 100.0));
    }
}
