use super::System;
use crate::math::Vec2;
use crate::world::World;
use shared::{EntityId, EntityKind};

/// Overlap resolution for players and enemies against each other and
/// against static obstacles, followed by a clamp into the world.
pub struct CollisionSystem;

struct Body {
    pos: Vec2,
    vel: Vec2,
    radius: f32,
    dynamic: bool,
}

fn body(world: &World, id: EntityId) -> Option<Body> {
    world.alive(id).filter(|e| e.is_solid()).map(|e| Body {
        pos: e.pos,
        vel: e.vel,
        radius: e.radius,
        dynamic: e.is_dynamic(),
    })
}

fn write_back(world: &mut World, id: EntityId, pos: Vec2, vel: Vec2) {
    if let Some(entity) = world.entity_mut(id) {
        entity.vel = vel;
    }
    world.set_position(id, pos);
}

/// Drops the component of `vel` along `normal` when it points that way.
fn remove_approach(vel: Vec2, normal: Vec2) -> Vec2 {
    let along = vel.dot(normal);
    if along > 0.0 {
        vel - normal * along
    } else {
        vel
    }
}

impl CollisionSystem {
    fn resolve_pair(world: &mut World, a: EntityId, b: EntityId) {
        let (Some(first), Some(second)) = (body(world, a), body(world, b)) else {
            return;
        };
        let offset = second.pos - first.pos;
        let dist = offset.length();
        let depth = first.radius + second.radius - dist;
        if depth <= 0.0 {
            return;
        }
        let normal = if dist > 0.0 { offset * (1.0 / dist) } else { Vec2::new(1.0, 0.0) };

        match (first.dynamic, second.dynamic) {
            (true, true) => {
                let half = depth * 0.5;
                write_back(world, a, first.pos - normal * half, remove_approach(first.vel, normal));
                write_back(world, b, second.pos + normal * half, remove_approach(second.vel, -normal));
            }
            (true, false) => {
                write_back(world, a, first.pos - normal * depth, remove_approach(first.vel, normal));
            }
            (false, true) => {
                write_back(world, b, second.pos + normal * depth, remove_approach(second.vel, -normal));
            }
            (false, false) => {}
        }
    }

    fn clamp_to_bounds(world: &mut World, id: EntityId) {
        let (width, height) = (world.width, world.height);
        let Some(Body { mut pos, mut vel, radius, .. }) = body(world, id) else {
            return;
        };
        let (min_x, max_x) = (radius, (width - radius).max(radius));
        let (min_y, max_y) = (radius, (height - radius).max(radius));
        if pos.x < min_x {
            pos.x = min_x;
            vel.x = vel.x.max(0.0);
        } else if pos.x > max_x {
            pos.x = max_x;
            vel.x = vel.x.min(0.0);
        }
        if pos.y < min_y {
            pos.y = min_y;
            vel.y = vel.y.max(0.0);
        } else if pos.y > max_y {
            pos.y = max_y;
            vel.y = vel.y.min(0.0);
        }
        write_back(world, id, pos, vel);
    }
}

impl System for CollisionSystem {
    fn name(&self) -> &'static str {
        "collision"
    }

    fn update(&mut self, world: &mut World, _dt_ms: f64) {
        let mut movers = world.ids_of(EntityKind::Player);
        movers.extend(world.ids_of(EntityKind::Enemy));
        movers.sort_unstable();

        for &a in &movers {
            let Some(me) = body(world, a) else {
                continue;
            };
            for b in world.query_near(me.pos, me.radius) {
                if b == a {
                    continue;
                }
                let dynamic = world.alive(b).map_or(false, |e| e.is_dynamic());
                // Dynamic pairs resolve once, from the lower id.
                if dynamic && b < a {
                    continue;
                }
                Self::resolve_pair(world, a, b);
            }
        }
        for &id in &movers {
            Self::clamp_to_bounds(world, id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::defs::{resource_def, ResourceKind};
    use crate::entity::Entity;
    use assert_approx_eq::assert_approx_eq;

    fn test_world() -> World {
        World::new(&SimConfig::default())
    }

    #[test]
    fn test_dynamic_pair_split_evenly() {
        let mut world = test_world();
        let a = world.spawn(Entity::player(Vec2::new(100.0, 100.0)));
        let b = world.spawn(Entity::player(Vec2::new(120.0, 100.0)));
        world.entity_mut(a).unwrap().vel = Vec2::new(50.0, 0.0);
        CollisionSystem.update(&mut world, 33.0);
        let (pa, pb) = (world.entity(a).unwrap().pos, world.entity(b).unwrap().pos);
        assert_approx_eq!(pa.x, 94.0);
        assert_approx_eq!(pb.x, 126.0);
        assert_approx_eq!(world.entity(a).unwrap().vel.x, 0.0);
    }

    #[test]
    fn test_obstacle_pushes_only_mover() {
        let mut world = test_world();
        let tree = world.spawn(Entity::resource_node(&resource_def(ResourceKind::Tree), Vec2::new(200.0, 200.0)));
        let player = world.spawn(Entity::player(Vec2::new(230.0, 200.0)));
        CollisionSystem.update(&mut world, 33.0);
        assert_eq!(world.entity(tree).unwrap().pos, Vec2::new(200.0, 200.0));
        assert_approx_eq!(world.entity(player).unwrap().pos.x, 238.0);
    }

    #[test]
    fn test_coincident_centres_use_fixed_normal() {
        let mut world = test_world();
        let a = world.spawn(Entity::player(Vec2::new(300.0, 300.0)));
        let b = world.spawn(Entity::player(Vec2::new(300.0, 300.0)));
        CollisionSystem.update(&mut world, 33.0);
        assert_approx_eq!(world.entity(a).unwrap().pos.x, 284.0);
        assert_approx_eq!(world.entity(b).unwrap().pos.x, 316.0);
    }

    #[test]
    fn test_clamped_into_world() {
        let mut world = test_world();
        let id = world.spawn(Entity::player(Vec2::new(-50.0, 2100.0)));
        world.entity_mut(id).unwrap().vel = Vec2::new(-10.0, 10.0);
        CollisionSystem.update(&mut world, 33.0);
        let player = world.entity(id).unwrap();
        assert_eq!(player.pos, Vec2::new(16.0, 1984.0));
        assert_eq!(player.vel, Vec2::ZERO);
    }
}
