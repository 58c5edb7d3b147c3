//! The only place hit points go down.

use super::status::apply_status;
use super::System;
use crate::entity::{Entity, PickupContents};
use crate::inventory::ItemStack;
use crate::math::Vec2;
use crate::world::{DamageRequest, World};
use log::debug;
use shared::{EntityKind, EventKind, ItemId};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DamageOutcome {
    /// Target gone, dead, not damageable, or amount unusable.
    Ignored,
    /// Target was invulnerable; nothing changed.
    Absorbed,
    Damaged { remaining: f32 },
    Killed,
}

/// Applies one hit. Emits `Damage`, and `Death` exactly once on the
/// transition to zero.
pub fn apply_damage(world: &mut World, request: &DamageRequest) -> DamageOutcome {
    if !request.amount.is_finite() || request.amount <= 0.0 {
        return DamageOutcome::Ignored;
    }
    let Some(entity) = world.entity_mut(request.target).filter(|e| e.alive) else {
        return DamageOutcome::Ignored;
    };
    let Some(health) = entity.health_mut() else {
        return DamageOutcome::Ignored;
    };
    if health.is_invulnerable() {
        return DamageOutcome::Absorbed;
    }
    health.set(health.current - request.amount);
    health.invuln_ms = health.hit_invuln_ms;
    let remaining = health.current;
    let depleted = health.is_depleted();

    world.emit(EventKind::Damage {
        target: request.target,
        source: request.source,
        amount: request.amount,
        remaining,
    });

    if !depleted {
        if let Some(status) = request.status {
            apply_status(world, request.target, status, request.source);
        }
        return DamageOutcome::Damaged { remaining };
    }

    let Some((kind, pos)) = world.entity(request.target).map(|e| (e.kind(), e.pos)) else {
        return DamageOutcome::Killed;
    };
    world.emit(EventKind::Death {
        entity: request.target,
        kind,
        x: pos.x,
        y: pos.y,
        killer: request.source,
    });
    world.kill(request.target);
    debug!("{} ({:?}) killed by {:?}", request.target, kind, request.source);

    if kind == EntityKind::Enemy {
        drop_loot(world, request.target, pos);
        credit_kill(world, request);
    }
    DamageOutcome::Killed
}

fn credit_kill(world: &mut World, request: &DamageRequest) {
    let Some(source) = request.source else {
        return;
    };
    if let Some(player) = world.entity_mut(source).and_then(|e| e.as_player_mut()) {
        player.kills += 1;
    }
}

/// Gold always; a boss adds a medkit; regular enemies sometimes drop ammo.
fn drop_loot(world: &mut World, dead: shared::EntityId, pos: Vec2) {
    let Some(enemy) = world.entity(dead).and_then(|e| e.as_enemy()) else {
        return;
    };
    let (gold, boss) = (enemy.gold_drop, enemy.boss);
    if gold > 0 {
        world.spawn(Entity::pickup(pos, PickupContents::Gold(gold)));
    }
    let scatter = world.rng.unit_vector() * 12.0;
    if boss {
        world.spawn(Entity::pickup(pos + scatter, PickupContents::Item(ItemStack::new(ItemId::Medkit, 1))));
    } else if world.rng.chance(0.2) {
        world.spawn(Entity::pickup(pos + scatter, PickupContents::Item(ItemStack::new(ItemId::Ammo, 10))));
    }
}

pub struct CombatSystem;

impl System for CombatSystem {
    fn name(&self) -> &'static str {
        "combat"
    }

    fn update(&mut self, world: &mut World, dt_ms: f64) {
        for kind in [EntityKind::Player, EntityKind::Enemy, EntityKind::Building] {
            for id in world.ids_of(kind) {
                if let Some(health) = world.entity_mut(id).and_then(|e| e.health_mut()) {
                    health.invuln_ms = (health.invuln_ms - dt_ms).max(0.0);
                }
            }
        }
        let queue = std::mem::take(&mut world.damage_queue);
        for request in &queue {
            apply_damage(world, request);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::defs::{enemy_def, EnemyKind};
    use shared::{EntityId, StatusId};

    fn test_world() -> World {
        World::new(&SimConfig::default())
    }

    fn hit(target: EntityId, amount: f32) -> DamageRequest {
        DamageRequest {
            target,
            source: None,
            amount,
            status: None,
        }
    }

    fn deaths(world: &World) -> usize {
        world
            .events
            .pending()
            .iter()
            .filter(|e| matches!(e.kind, EventKind::Death { .. }))
            .count()
    }

    #[test]
    fn test_lethal_damage_emits_one_death() {
        let mut world = test_world();
        let player = world.spawn(Entity::player(Vec2::new(100.0, 100.0)));
        assert_eq!(apply_damage(&mut world, &hit(player, 500.0)), DamageOutcome::Killed);
        assert_eq!(apply_damage(&mut world, &hit(player, 500.0)), DamageOutcome::Ignored);
        assert!(!world.is_alive(player));
        assert_eq!(deaths(&world), 1);
        assert_eq!(world.entity(player).unwrap().health().unwrap().current, 0.0);
    }

    #[test]
    fn test_invulnerability_absorbs_hits() {
        let mut world = test_world();
        let player = world.spawn(Entity::player(Vec2::new(100.0, 100.0)));
        assert_eq!(
            apply_damage(&mut world, &hit(player, 10.0)),
            DamageOutcome::Damaged { remaining: 90.0 }
        );
        let before = world.events.len();
        assert_eq!(apply_damage(&mut world, &hit(player, 10.0)), DamageOutcome::Absorbed);
        assert_eq!(world.events.len(), before);
        assert_eq!(world.entity(player).unwrap().health().unwrap().current, 90.0);
    }

    #[test]
    fn test_invulnerability_wears_off() {
        let mut world = test_world();
        let player = world.spawn(Entity::player(Vec2::new(100.0, 100.0)));
        apply_damage(&mut world, &hit(player, 10.0));
        world.queue_damage(hit(player, 10.0));
        CombatSystem.update(&mut world, 400.0);
        assert_eq!(world.entity(player).unwrap().health().unwrap().current, 80.0);
        assert!(world.damage_queue.is_empty());
    }

    #[test]
    fn test_enemy_death_drops_gold_and_credits_killer() {
        let mut world = test_world();
        let player = world.spawn(Entity::player(Vec2::new(100.0, 100.0)));
        let pos = Vec2::new(300.0, 300.0);
        let grunt = world.spawn(Entity::enemy(&enemy_def(EnemyKind::Grunt), pos, 1.0, pos));
        let request = DamageRequest {
            target: grunt,
            source: Some(player),
            amount: 1000.0,
            status: None,
        };
        assert_eq!(apply_damage(&mut world, &request), DamageOutcome::Killed);
        assert!(world.count_of(EntityKind::Pickup) >= 1);
        assert_eq!(world.entity(player).unwrap().as_player().unwrap().kills, 1);
    }

    #[test]
    fn test_status_rides_on_hit() {
        let mut world = test_world();
        let pos = Vec2::new(300.0, 300.0);
        let grunt = world.spawn(Entity::enemy(&enemy_def(EnemyKind::Grunt), pos, 1.0, pos));
        let request = DamageRequest {
            target: grunt,
            source: None,
            amount: 1.0,
            status: Some(StatusId::Burn),
        };
        apply_damage(&mut world, &request);
        assert!(world.entity(grunt).unwrap().statuses().unwrap().has(StatusId::Burn));
    }

    #[test]
    fn test_non_positive_damage_ignored() {
        let mut world = test_world();
        let player = world.spawn(Entity::player(Vec2::new(100.0, 100.0)));
        assert_eq!(apply_damage(&mut world, &hit(player, 0.0)), DamageOutcome::Ignored);
        assert_eq!(apply_damage(&mut world, &hit(player, f32::NAN)), DamageOutcome::Ignored);
        assert!(world.events.is_empty());
    }
}
