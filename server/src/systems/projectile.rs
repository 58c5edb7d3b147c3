use super::System;
use crate::defs::WeaponDef;
use crate::entity::{Entity, EntityData, Team};
use crate::math::Vec2;
use crate::world::{DamageRequest, World};
use shared::{EntityId, EntityKind};

/// Spawns a projectile. Returns `None` for a degenerate origin or direction.
pub fn fire(
    world: &mut World,
    shooter: Option<EntityId>,
    origin: Vec2,
    dir: Vec2,
    weapon: &WeaponDef,
    team: Team,
) -> Option<EntityId> {
    if !origin.is_finite() || !dir.is_finite() || dir.length_squared() == 0.0 {
        return None;
    }
    Some(world.spawn(Entity::projectile(shooter, team, origin, dir, weapon)))
}

/// Earliest `t` in `[0, 1]` at which a circle of radius `r` moving from
/// `start` by `delta` touches the circle at `center`.
fn sweep_hit(start: Vec2, delta: Vec2, center: Vec2, r: f32) -> Option<f32> {
    let offset = start - center;
    let c = offset.length_squared() - r * r;
    if c < 0.0 {
        return Some(0.0);
    }
    let a = delta.length_squared();
    if a == 0.0 {
        return None;
    }
    let b = 2.0 * offset.dot(delta);
    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        return None;
    }
    let t = (-b - disc.sqrt()) / (2.0 * a);
    (0.0..=1.0).contains(&t).then_some(t)
}

/// Reflects a point and direction off the world edges. Returns whether any
/// edge was crossed.
fn reflect(pos: &mut Vec2, dir: &mut Vec2, radius: f32, width: f32, height: f32) -> bool {
    let mut crossed = false;
    if pos.x < radius {
        pos.x = 2.0 * radius - pos.x;
        dir.x = dir.x.abs();
        crossed = true;
    } else if pos.x > width - radius {
        pos.x = 2.0 * (width - radius) - pos.x;
        dir.x = -dir.x.abs();
        crossed = true;
    }
    if pos.y < radius {
        pos.y = 2.0 * radius - pos.y;
        dir.y = dir.y.abs();
        crossed = true;
    } else if pos.y > height - radius {
        pos.y = 2.0 * (height - radius) - pos.y;
        dir.y = -dir.y.abs();
        crossed = true;
    }
    crossed
}

pub struct ProjectileSystem;

impl ProjectileSystem {
    fn advance(world: &mut World, id: EntityId, dt_ms: f64) {
        let Some(entity) = world.alive(id) else {
            return;
        };
        let EntityData::Projectile(data) = &entity.data else {
            return;
        };
        let team = entity.team;
        let radius = entity.radius;
        let start = entity.pos;
        let delta = data.dir * (data.speed * (dt_ms / 1000.0) as f32);
        let lifetime_left = data.lifetime_ms - dt_ms;

        // Broadphase over the swept segment's bounding circle.
        let mid = start + delta * 0.5;
        let reach = delta.length() * 0.5 + radius;
        let mut hits: Vec<(f32, EntityId)> = world
            .query_near(mid, reach)
            .into_iter()
            .filter(|other| *other != id && Some(*other) != data.shooter && !data.hits.contains(other))
            .filter_map(|other| {
                let target = world.alive(other)?;
                if !target.is_damageable() || target.team == team {
                    return None;
                }
                sweep_hit(start, delta, target.pos, radius + target.radius).map(|t| (t, other))
            })
            .collect();
        hits.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        let shooter = data.shooter;
        let damage = data.damage;
        let on_hit = data.on_hit;
        let allowed = (data.pierce as usize + 1).saturating_sub(data.hits.len());

        let mut spent_at = None;
        let mut landed = Vec::new();
        for (t, target) in hits.into_iter().take(allowed) {
            landed.push(target);
            if landed.len() == allowed {
                spent_at = Some(t);
            }
        }
        for target in &landed {
            world.queue_damage(DamageRequest {
                target: *target,
                source: shooter,
                amount: damage,
                status: on_hit,
            });
        }

        let (width, height) = (world.width, world.height);
        let Some(entity) = world.entity_mut(id) else {
            return;
        };
        let EntityData::Projectile(data) = &mut entity.data else {
            return;
        };
        data.hits.extend(landed);
        data.lifetime_ms = lifetime_left;

        if let Some(t) = spent_at {
            world.set_position(id, start + delta * t);
            world.kill(id);
            return;
        }

        let mut pos = start + delta;
        let mut dir = data.dir;
        let out = pos.x < radius || pos.y < radius || pos.x > width - radius || pos.y > height - radius;
        let mut expired = lifetime_left <= 0.0;
        if out {
            if data.bounces > 0 {
                reflect(&mut pos, &mut dir, radius, width, height);
                data.bounces -= 1;
                data.dir = dir;
                entity.vel = dir * data.speed;
                entity.facing = dir.angle();
            } else {
                expired = true;
            }
        }
        world.set_position(id, pos);
        if expired {
            world.kill(id);
        }
    }
}

impl System for ProjectileSystem {
    fn name(&self) -> &'static str {
        "projectile"
    }

    fn update(&mut self, world: &mut World, dt_ms: f64) {
        for id in world.ids_of(EntityKind::Projectile) {
            Self::advance(world, id, dt_ms);
        }
    }
}
