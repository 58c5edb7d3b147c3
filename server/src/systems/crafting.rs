use super::System;
use crate::defs::recipe_def;
use crate::inventory::Inventory;
use crate::world::World;
use log::debug;
use shared::{EventKind, RecipeId, RejectReason, MAX_CRAFT_COUNT};

/// Crafts `count` batches of `recipe`. Works on a copy of the inventory and
/// commits only on success, so a failure leaves `inventory` untouched.
pub fn craft(inventory: &mut Inventory, recipe: RecipeId, count: u32) -> Result<(), RejectReason> {
    if count == 0 || count > MAX_CRAFT_COUNT {
        return Err(RejectReason::InvalidCount);
    }
    let def = recipe_def(recipe);
    let needed: Vec<_> = def
        .inputs
        .iter()
        .map(|&(item, amount)| (item, amount.saturating_mul(count)))
        .collect();
    if !inventory.has_all(&needed) {
        return Err(RejectReason::MissingIngredients);
    }

    let mut scratch = inventory.clone();
    if !scratch.remove_all(&needed) {
        return Err(RejectReason::MissingIngredients);
    }
    let (output, per_batch) = def.output;
    if !scratch.add(output, per_batch.saturating_mul(count)) {
        return Err(RejectReason::InventoryFull);
    }
    *inventory = scratch;
    Ok(())
}

pub struct CraftingSystem;

impl System for CraftingSystem {
    fn name(&self) -> &'static str {
        "crafting"
    }

    fn update(&mut self, world: &mut World, _dt_ms: f64) {
        let orders = std::mem::take(&mut world.craft_queue);
        for order in orders {
            let outcome = RecipeId::parse(&order.recipe)
                .ok_or(RejectReason::UnknownRecipe)
                .and_then(|recipe| {
                    let data = world
                        .entity_mut(order.player)
                        .filter(|e| e.alive)
                        .and_then(|e| e.as_player_mut())
                        .ok_or(RejectReason::MissingIngredients)?;
                    craft(&mut data.inventory, recipe, order.count).map(|_| recipe)
                });
            match outcome {
                Ok(recipe) => world.emit(EventKind::Crafted {
                    player: order.player,
                    recipe,
                    count: order.count,
                }),
                Err(reason) => {
                    debug!("Craft by {} rejected: {}", order.player, reason);
                    world.emit(EventKind::rejected(order.player, reason));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::entity::Entity;
    use crate::math::Vec2;
    use crate::world::CraftOrder;
    use shared::ItemId;

    #[test]
    fn test_craft_consumes_and_produces() {
        let mut inventory = Inventory::new(4);
        inventory.add(ItemId::Wood, 10);
        craft(&mut inventory, RecipeId::Planks, 3).unwrap();
        assert_eq!(inventory.count(ItemId::Wood), 4);
        assert_eq!(inventory.count(ItemId::Plank), 3);
    }

    #[test]
    fn test_failed_craft_leaves_inventory_unchanged() {
        let mut inventory = Inventory::new(4);
        inventory.add(ItemId::Wood, 3);
        inventory.add(ItemId::Stone, 7);
        let before = inventory.clone();
        assert_eq!(
            craft(&mut inventory, RecipeId::Planks, 2),
            Err(RejectReason::MissingIngredients)
        );
        assert_eq!(inventory, before);
        assert_eq!(craft(&mut inventory, RecipeId::Planks, 0), Err(RejectReason::InvalidCount));
        assert_eq!(
            craft(&mut inventory, RecipeId::Planks, MAX_CRAFT_COUNT + 1),
            Err(RejectReason::InvalidCount)
        );
        assert_eq!(inventory, before);
    }

    #[test]
    fn test_output_must_fit_after_inputs_removed() {
        // Stone frees its slot for the brick.
        let mut freed = Inventory::new(2);
        freed.add(ItemId::Stone, 3);
        freed.add(ItemId::Ammo, 200);
        assert_eq!(craft(&mut freed, RecipeId::Bricks, 1), Ok(()));
        assert_eq!(freed.count(ItemId::Brick), 1);

        // Leftover stone keeps the slot occupied.
        let mut full = Inventory::new(2);
        full.add(ItemId::Stone, 6);
        full.add(ItemId::Ammo, 200);
        let before = full.clone();
        assert_eq!(craft(&mut full, RecipeId::Bricks, 1), Err(RejectReason::InventoryFull));
        assert_eq!(full, before);
    }

    #[test]
    fn test_system_rejects_unknown_recipe() {
        let mut world = World::new(&SimConfig::default());
        let player = world.spawn(Entity::player(Vec2::new(100.0, 100.0)));
        world.craft_queue.push(CraftOrder {
            player,
            recipe: "cake".to_string(),
            count: 1,
        });
        world.craft_queue.push(CraftOrder {
            player,
            recipe: "planks".to_string(),
            count: 2,
        });
        CraftingSystem.update(&mut world, 33.0);
        let tags: Vec<&str> = world.events.pending().iter().map(|e| e.kind.tag()).collect();
        assert_eq!(tags, vec!["rejected", "crafted"]);
        let data = world.entity(player).unwrap().as_player().unwrap();
        assert_eq!(data.inventory.count(ItemId::Plank), 2);
    }
}
