use super::System;
use crate::world::World;
use shared::EntityKind;

/// Runs every enemy's goal selector.
pub struct AiSystem;

impl System for AiSystem {
    fn name(&self) -> &'static str {
        "ai"
    }

    fn update(&mut self, world: &mut World, dt_ms: f64) {
        for id in world.ids_of(EntityKind::Enemy) {
            // The selector leaves the entity while it runs so goals can
            // borrow the whole world.
            let Some(enemy) = world.entity_mut(id).filter(|e| e.alive).and_then(|e| e.as_enemy_mut()) else {
                continue;
            };
            let mut goals = std::mem::take(&mut enemy.goals);
            goals.tick(world, id, dt_ms);
            if let Some(enemy) = world.entity_mut(id).and_then(|e| e.as_enemy_mut()) {
                enemy.goals = goals;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::Control;
    use crate::config::SimConfig;
    use crate::defs::{enemy_def, EnemyKind};
    use crate::entity::Entity;
    use crate::math::Vec2;

    #[test]
    fn test_goals_survive_the_tick() {
        let mut world = World::new(&SimConfig::default());
        let pos = Vec2::new(500.0, 500.0);
        let grunt = world.spawn(Entity::enemy(&enemy_def(EnemyKind::Grunt), pos, 1.0, pos));
        world.spawn(Entity::player(Vec2::new(700.0, 500.0)));
        AiSystem.update(&mut world, 33.0);
        let goals = &world.entity(grunt).unwrap().as_enemy().unwrap().goals;
        assert_eq!(goals.len(), 4);
        assert_eq!(goals.holders(Control::Move), vec!["go_to_target"]);
    }

    #[test]
    fn test_channels_stay_exclusive_over_time() {
        let mut world = World::new(&SimConfig::default());
        let mut enemies = Vec::new();
        for i in 0..10 {
            let pos = Vec2::new(300.0 + i as f32 * 40.0, 400.0);
            let kind = if i % 2 == 0 { EnemyKind::Grunt } else { EnemyKind::Archer };
            enemies.push(world.spawn(Entity::enemy(&enemy_def(kind), pos, 1.0, pos)));
        }
        let player = world.spawn(Entity::player(Vec2::new(500.0, 600.0)));
        for tick in 0..120 {
            if tick == 60 {
                world.kill(player);
            }
            AiSystem.update(&mut world, 33.0);
            for id in &enemies {
                let goals = &world.entity(*id).unwrap().as_enemy().unwrap().goals;
                for control in Control::ALL {
                    assert!(goals.holders(control).len() <= 1);
                }
            }
        }
    }
}
