use super::projectile;
use super::System;
use crate::defs::{structure_def, MAX_BUILD_DISTANCE};
use crate::entity::{Entity, EntityData, Team, TowerState};
use crate::math::{circles_overlap, Vec2};
use crate::targeting::{is_hostile_to, nearest_target};
use crate::world::{BuildOrder, World};
use log::debug;
use shared::{EntityId, EntityKind, EventKind, RejectReason, StructureId};

/// Whether a footprint at `pos` would overlap any solid entity other than `ignore`.
fn footprint_blocked(world: &World, pos: Vec2, radius: f32, ignore: Option<EntityId>) -> bool {
    world.query_near(pos, radius).into_iter().any(|other| {
        Some(other) != ignore
            && world
                .alive(other)
                .map_or(false, |e| e.is_solid() && circles_overlap(e.pos, e.radius, pos, radius))
    })
}

/// Validates and places a structure, charging its owner.
pub fn place(world: &mut World, player: EntityId, structure: &str, pos: Vec2) -> Result<EntityId, RejectReason> {
    let id = StructureId::parse(structure).ok_or(RejectReason::UnknownStructure)?;
    let def = structure_def(id);
    let builder = world.alive(player).ok_or(RejectReason::UnknownPlayer)?;
    if builder.pos.distance(pos) > MAX_BUILD_DISTANCE {
        return Err(RejectReason::TooFar);
    }
    if !world.in_bounds(pos, def.radius) {
        return Err(RejectReason::OutOfBounds);
    }
    if footprint_blocked(world, pos, def.radius, None) {
        return Err(RejectReason::Overlapping);
    }
    let data = world
        .entity_mut(player)
        .and_then(|e| e.as_player_mut())
        .ok_or(RejectReason::UnknownPlayer)?;
    def.cost.charge(&mut data.inventory, &mut data.wallet)?;

    let building = world.spawn(Entity::building(&def, pos, player));
    world.emit(EventKind::BuildingPlaced {
        building,
        owner: player,
        structure: id,
    });
    Ok(building)
}

/// Upgrades an owned building to its defined successor.
pub fn upgrade(world: &mut World, player: EntityId, building: EntityId) -> Result<StructureId, RejectReason> {
    let target = world.alive(building).ok_or(RejectReason::UnknownBuilding)?;
    let current = target.as_building().ok_or(RejectReason::UnknownBuilding)?.structure;
    if target.owner != Some(player) {
        return Err(RejectReason::NotOwner);
    }
    let next = structure_def(current).upgrade.ok_or(RejectReason::NoUpgrade)?;
    let next_def = structure_def(next);
    let (pos, radius) = (target.pos, target.radius);
    if next_def.radius > radius {
        if !world.in_bounds(pos, next_def.radius) {
            return Err(RejectReason::OutOfBounds);
        }
        if footprint_blocked(world, pos, next_def.radius, Some(building)) {
            return Err(RejectReason::Overlapping);
        }
    }

    let data = world
        .entity_mut(player)
        .filter(|e| e.alive)
        .and_then(|e| e.as_player_mut())
        .ok_or(RejectReason::UnknownPlayer)?;
    next_def.cost.charge(&mut data.inventory, &mut data.wallet)?;

    if let Some(entity) = world.entity_mut(building) {
        entity.radius = next_def.radius;
        if let EntityData::Building(data) = &mut entity.data {
            data.structure = next;
            data.health.raise_max(next_def.max_health);
            data.tower = match (next_def.tower, data.tower.take()) {
                (Some(_), Some(state)) => Some(state),
                (Some(_), None) => Some(TowerState { cooldown_ms: 0.0 }),
                (None, _) => None,
            };
        }
    }
    world.reindex(building);
    world.emit(EventKind::BuildingUpgraded {
        building,
        structure: next,
    });
    Ok(next)
}

/// Build and upgrade requests, then tower fire.
pub struct BuildingSystem;

impl BuildingSystem {
    fn tower_fire(world: &mut World, id: EntityId, dt_ms: f64) {
        let Some(entity) = world.entity_mut(id).filter(|e| e.alive) else {
            return;
        };
        let (pos, radius) = (entity.pos, entity.radius);
        let EntityData::Building(data) = &mut entity.data else {
            return;
        };
        let Some(tower_def) = structure_def(data.structure).tower else {
            return;
        };
        let Some(state) = data.tower.as_mut() else {
            return;
        };
        state.cooldown_ms -= dt_ms;
        if state.cooldown_ms > 0.0 {
            return;
        }
        state.cooldown_ms = 0.0;

        let Some(target) = nearest_target(world, pos, tower_def.range, |e| is_hostile_to(Team::Players, e)) else {
            return;
        };
        let Some(target_pos) = world.alive(target).map(|e| e.pos) else {
            return;
        };
        let dir = (target_pos - pos).normalize();
        let weapon = tower_def.weapon;
        let origin = pos + dir * (radius + weapon.projectile_radius + 1.0);
        if projectile::fire(world, Some(id), origin, dir, &weapon, Team::Players).is_some() {
            if let Some(state) = world
                .entity_mut(id)
                .and_then(|e| match &mut e.data {
                    EntityData::Building(b) => b.tower.as_mut(),
                    _ => None,
                })
            {
                state.cooldown_ms = weapon.cooldown_ms;
            }
            if let Some(entity) = world.entity_mut(id) {
                entity.facing = dir.angle();
            }
        }
    }
}

impl System for BuildingSystem {
    fn name(&self) -> &'static str {
        "building"
    }

    fn update(&mut self, world: &mut World, dt_ms: f64) {
        let orders = std::mem::take(&mut world.build_queue);
        for order in orders {
            let (player, outcome) = match order {
                BuildOrder::Place { player, structure, pos } => (player, place(world, player, &structure, pos).map(|_| ())),
                BuildOrder::Upgrade { player, building } => (player, upgrade(world, player, building).map(|_| ())),
            };
            if let Err(reason) = outcome {
                debug!("Build request from {} rejected: {}", player, reason);
                world.emit(EventKind::rejected(player, reason));
            }
        }

        for id in world.ids_of(EntityKind::Building) {
            Self::tower_fire(world, id, dt_ms);
        }
    }
}
