//! Resource nodes and pickups.

use super::System;
use crate::defs::{HARVEST_COOLDOWN_MS, HARVEST_REACH, PICKUP_MAGNET_RADIUS, PICKUP_RADIUS, PICKUP_SPEED};
use crate::entity::{Entity, EntityData, PickupContents};
use crate::inventory::ItemStack;
use crate::math::{circles_overlap, Vec2};
use crate::world::World;
use log::debug;
use shared::{EntityId, EntityKind, EventKind, RejectReason};

/// Absorbs rounding in `ticks * dt` for rates whose period is not exact.
const RESPAWN_EPSILON_MS: f64 = 1e-6;

/// Harvests the nearest non-depleted node in reach, dropping the yield as a
/// pickup beside it. Returns the pickup id.
pub fn harvest(world: &mut World, player: EntityId) -> Result<EntityId, RejectReason> {
    let harvester = world.alive(player).ok_or(RejectReason::NothingToHarvest)?;
    let data = harvester.as_player().ok_or(RejectReason::NothingToHarvest)?;
    if data.harvest_cooldown_ms > 0.0 {
        return Err(RejectReason::OnCooldown);
    }
    let (pos, radius) = (harvester.pos, harvester.radius);

    let mut in_reach: Vec<(f32, EntityId, bool)> = world
        .query_near(pos, radius + HARVEST_REACH)
        .into_iter()
        .filter_map(|id| {
            let node = world.alive(id)?;
            let data = node.as_node()?;
            let gap = node.gap_to(pos, radius);
            (gap <= HARVEST_REACH).then_some((gap, id, data.is_depleted()))
        })
        .collect();
    if in_reach.is_empty() {
        return Err(RejectReason::NothingToHarvest);
    }
    in_reach.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
    let (_, node_id, _) = in_reach
        .into_iter()
        .find(|(_, _, depleted)| !depleted)
        .ok_or(RejectReason::NodeDepleted)?;

    let node = world.entity_mut(node_id).ok_or(RejectReason::NothingToHarvest)?;
    let node_pos = node.pos;
    let node_radius = node.radius;
    let EntityData::ResourceNode(data) = &mut node.data else {
        return Err(RejectReason::NothingToHarvest);
    };
    let amount = data.yield_per_harvest.min(data.remaining);
    data.remaining -= amount;
    let item = data.item;
    let depleted = data.is_depleted();
    if depleted {
        data.respawn_ticks = 0;
    }

    if let Some(player_data) = world.entity_mut(player).and_then(|e| e.as_player_mut()) {
        player_data.harvest_cooldown_ms = HARVEST_COOLDOWN_MS;
    }
    let toward = (pos - node_pos).normalize();
    let toward = if toward.length_squared() > 0.0 { toward } else { Vec2::new(1.0, 0.0) };
    let drop_at = node_pos + toward * (node_radius + PICKUP_RADIUS + 2.0);
    let pickup = world.spawn(Entity::pickup(drop_at, PickupContents::Item(ItemStack::new(item, amount))));

    world.emit(EventKind::Harvested {
        player,
        node: node_id,
        item,
        amount,
    });
    if depleted {
        world.emit(EventKind::NodeDepleted { node: node_id });
    }
    Ok(pickup)
}

/// Frees every pickup reserved by `player`.
pub fn release_reservations(world: &mut World, player: EntityId) -> usize {
    let mut released = 0;
    for id in world.ids_of(EntityKind::Pickup) {
        if let Some(entity) = world.entity_mut(id) {
            if let EntityData::Pickup(data) = &mut entity.data {
                if data.reserved_by == Some(player) {
                    data.reserved_by = None;
                    entity.vel = Vec2::ZERO;
                    released += 1;
                }
            }
        }
    }
    released
}

fn can_hold(world: &World, player: EntityId, contents: &PickupContents) -> bool {
    match (world.alive(player).and_then(|e| e.as_player()), contents) {
        (Some(data), PickupContents::Item(stack)) => data.inventory.can_add(stack.item, stack.amount),
        (Some(_), PickupContents::Gold(_)) => true,
        (None, _) => false,
    }
}

pub struct ResourceSystem;

impl ResourceSystem {
    fn tick_respawns(world: &mut World, dt_ms: f64) {
        for id in world.ids_of(EntityKind::ResourceNode) {
            let Some(node) = world.entity_mut(id).and_then(|e| e.as_node_mut()) else {
                continue;
            };
            if !node.is_depleted() {
                continue;
            }
            node.respawn_ticks += 1;
            if node.respawn_ticks as f64 * dt_ms + RESPAWN_EPSILON_MS >= node.respawn_ms {
                node.remaining = node.capacity;
                node.respawn_ticks = 0;
                world.emit(EventKind::NodeRespawned { node: id });
            }
        }
    }

    fn tick_pickup(world: &mut World, id: EntityId, dt_ms: f64) {
        let Some(entity) = world.alive(id) else {
            return;
        };
        let EntityData::Pickup(data) = &entity.data else {
            return;
        };
        let (pos, radius) = (entity.pos, entity.radius);
        if data.lifetime_ms - dt_ms <= 0.0 {
            world.kill(id);
            return;
        }
        let contents = data.contents.clone();

        // Keep the reservation only while the holder is alive, in range and has room.
        let mut holder = data.reserved_by.filter(|p| {
            can_hold(world, *p, &contents)
                && world
                    .alive(*p)
                    .map_or(false, |e| e.pos.distance(pos) <= PICKUP_MAGNET_RADIUS * 1.5)
        });
        if holder.is_none() {
            holder = world
                .query_near(pos, PICKUP_MAGNET_RADIUS)
                .into_iter()
                .filter_map(|p| {
                    let player = world.alive(p).filter(|e| e.as_player().is_some())?;
                    let dist = player.pos.distance(pos);
                    (dist <= PICKUP_MAGNET_RADIUS && can_hold(world, p, &contents)).then_some((dist, p))
                })
                .min_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)))
                .map(|(_, p)| p);
        }

        let touching = holder.and_then(|p| world.alive(p)).map(|e| (e.pos, e.radius));
        if let Some(entity) = world.entity_mut(id) {
            if let EntityData::Pickup(data) = &mut entity.data {
                data.lifetime_ms -= dt_ms;
                data.reserved_by = holder;
            }
            entity.vel = match touching {
                Some((target, _)) => (target - pos).normalize() * PICKUP_SPEED,
                None => Vec2::ZERO,
            };
        }

        let (Some(player), Some((target, target_radius))) = (holder, touching) else {
            return;
        };
        if circles_overlap(pos, radius, target, target_radius) {
            Self::collect(world, id, player, contents);
        }
    }

    fn collect(world: &mut World, pickup: EntityId, player: EntityId, contents: PickupContents) {
        let Some(data) = world.entity_mut(player).and_then(|e| e.as_player_mut()) else {
            return;
        };
        let (item, amount) = match contents {
            PickupContents::Item(stack) => {
                if !data.inventory.add(stack.item, stack.amount) {
                    return;
                }
                (Some(stack.item), stack.amount)
            }
            PickupContents::Gold(gold) => {
                data.wallet.deposit(gold);
                (None, gold)
            }
        };
        world.kill(pickup);
        world.emit(EventKind::PickupCollected {
            player,
            pickup,
            item,
            amount,
        });
    }
}

impl System for ResourceSystem {
    fn name(&self) -> &'static str {
        "resource"
    }

    fn update(&mut self, world: &mut World, dt_ms: f64) {
        Self::tick_respawns(world, dt_ms);

        let mut requests = std::mem::take(&mut world.harvest_queue);
        requests.sort_unstable();
        requests.dedup();
        for player in requests {
            if let Err(reason) = harvest(world, player) {
                debug!("Harvest by {} rejected: {}", player, reason);
                world.emit(EventKind::rejected(player, reason));
            }
        }

        for id in world.ids_of(EntityKind::Pickup) {
            Self::tick_pickup(world, id, dt_ms);
        }
    }
}
