use super::projectile;
use super::status::apply_status;
use super::System;
use crate::defs::{self, PLAYER_WEAPON};
use crate::entity::{accepts_sequence, PlayerData, Team};
use crate::math::Vec2;
use crate::world::{BuildOrder, CraftOrder, World};
use log::trace;
use shared::{EntityId, EntityKind, InputCommand, ItemId, StatusId};

fn sanitize_axis(v: f32) -> f32 {
    if v.is_finite() {
        v.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

/// Movement intent clamped to the unit disc; NaN components become zero.
pub fn sanitize_movement(x: f32, y: f32) -> Vec2 {
    Vec2::new(sanitize_axis(x), sanitize_axis(y)).clamp_length(1.0)
}

/// Unit aim direction, or `None` when the input carries no direction.
pub fn sanitize_aim(x: f32, y: f32) -> Option<Vec2> {
    let aim = Vec2::new(sanitize_axis(x), sanitize_axis(y));
    (aim.length_squared() > 0.0).then(|| aim.normalize())
}

/// Applies buffered commands, then advances every player's held state.
pub struct InputSystem;

impl InputSystem {
    fn apply_command(world: &mut World, id: EntityId, cmd: InputCommand) {
        let Some(entity) = world.entity_mut(id).filter(|e| e.alive) else {
            return;
        };
        let facing = sanitize_aim(cmd.aim_x, cmd.aim_y).map(|aim| aim.angle());
        let Some(player) = entity.as_player_mut() else {
            return;
        };
        if !accepts_sequence(player, &cmd) {
            trace!("Dropping stale input {} for {}", cmd.sequence, id);
            return;
        }
        player.last_sequence = cmd.sequence;
        player.last_target_tick = cmd.target_tick;
        player.held.movement = sanitize_movement(cmd.move_x, cmd.move_y);
        player.held.fire = cmd.fire;

        if let Some(slot) = cmd.active_slot {
            player.inventory.set_active(slot as usize);
        }
        if cmd.reload {
            start_reload(player);
        }

        let mut used_medkit = false;
        let mut harvest = false;
        if cmd.use_action {
            let hurt = player.health.current < player.health.max;
            if player.inventory.active_item() == Some(ItemId::Medkit) && hurt {
                used_medkit = player.inventory.remove(ItemId::Medkit, 1);
            } else {
                harvest = true;
            }
        }
        if let Some(facing) = facing {
            entity.facing = facing;
        }

        if used_medkit {
            apply_status(world, id, StatusId::Regen, Some(id));
        }
        if harvest {
            world.harvest_queue.push(id);
        }
        if let Some(build) = cmd.build {
            world.build_queue.push(BuildOrder::Place {
                player: id,
                structure: build.structure,
                pos: Vec2::new(build.x, build.y),
            });
        }
        if let Some(building) = cmd.upgrade {
            world.build_queue.push(BuildOrder::Upgrade { player: id, building });
        }
        if let Some(craft) = cmd.craft {
            world.craft_queue.push(CraftOrder {
                player: id,
                recipe: craft.recipe,
                count: craft.count,
            });
        }
    }

    fn advance_player(world: &mut World, id: EntityId, dt_ms: f64) {
        let Some(entity) = world.entity_mut(id).filter(|e| e.alive) else {
            return;
        };
        let speed = defs::PLAYER_SPEED * entity.speed_multiplier();
        let (pos, radius, facing) = (entity.pos, entity.radius, entity.facing);
        let Some(player) = entity.as_player_mut() else {
            return;
        };
        player.harvest_cooldown_ms = (player.harvest_cooldown_ms - dt_ms).max(0.0);

        let weapon = &mut player.weapon;
        weapon.cooldown_ms = (weapon.cooldown_ms - dt_ms).max(0.0);
        if let Some(left) = weapon.reload_left_ms {
            let left = left - dt_ms;
            if left <= 0.0 {
                weapon.reload_left_ms = None;
                let wanted = weapon.magazine.saturating_sub(weapon.ammo);
                let taken = wanted.min(player.inventory.count(ItemId::Ammo));
                player.inventory.remove(ItemId::Ammo, taken);
                player.weapon.ammo += taken;
            } else {
                weapon.reload_left_ms = Some(left);
            }
        }

        let movement = player.held.movement;
        let mut shoot = false;
        if player.held.fire {
            if player.weapon.can_fire() {
                player.weapon.ammo -= 1;
                player.weapon.cooldown_ms = PLAYER_WEAPON.cooldown_ms;
                shoot = true;
            } else if player.weapon.ammo == 0 {
                start_reload(player);
            }
        }

        if movement.length_squared() > 0.0 {
            entity.vel = movement * speed;
        }
        if shoot {
            let dir = Vec2::from_angle(facing);
            let origin = pos + dir * (radius + PLAYER_WEAPON.projectile_radius + 1.0);
            projectile::fire(world, Some(id), origin, dir, &PLAYER_WEAPON, Team::Players);
        }
    }
}

/// Begins a reload if the magazine is not full and spare ammo exists.
fn start_reload(player: &mut PlayerData) -> bool {
    let weapon = &mut player.weapon;
    if weapon.is_reloading() || weapon.ammo >= weapon.magazine || !player.inventory.has(ItemId::Ammo, 1) {
        return false;
    }
    weapon.reload_left_ms = Some(defs::PLAYER_RELOAD_MS);
    true
}

impl System for InputSystem {
    fn name(&self) -> &'static str {
        "input"
    }

    fn update(&mut self, world: &mut World, dt_ms: f64) {
        let inbox = std::mem::take(&mut world.inbox);
        for (id, cmd) in inbox {
            Self::apply_command(world, id, cmd);
        }
        for id in world.ids_of(EntityKind::Player) {
            Self::advance_player(world, id, dt_ms);
        }
    }
}
