//! Ordered per-tick systems.
//!
//! Every system is a stateless stage over [`World`]. Systems talk to each
//! other only through entity state, the request queues on `World` and the
//! event bus, so the order in [`Pipeline::standard`] is the whole contract.

pub mod ai;
pub mod building;
pub mod collision;
pub mod combat;
pub mod crafting;
pub mod input;
pub mod movement;
pub mod projectile;
pub mod resource;
pub mod status;
pub mod wave;

use crate::world::World;

pub trait System: Send {
    fn name(&self) -> &'static str;

    fn update(&mut self, world: &mut World, dt_ms: f64);
}

/// Stages run in order once per tick.
pub struct Pipeline {
    systems: Vec<Box<dyn System>>,
}

impl Pipeline {
    pub fn new(systems: Vec<Box<dyn System>>) -> Self {
        Self { systems }
    }

    pub fn standard() -> Self {
        Self::new(vec![
            Box::new(input::InputSystem),
            Box::new(ai::AiSystem),
            Box::new(movement::MovementSystem),
            Box::new(collision::CollisionSystem),
            Box::new(projectile::ProjectileSystem),
            Box::new(combat::CombatSystem),
            Box::new(status::StatusSystem),
            Box::new(building::BuildingSystem),
            Box::new(resource::ResourceSystem),
            Box::new(crafting::CraftingSystem),
            Box::new(wave::WaveSystem),
        ])
    }

    /// One full tick: clock, every stage, then removal of the dead.
    pub fn run(&mut self, world: &mut World) {
        world.step();
        let dt_ms = world.fixed_dt_ms();
        for system in self.systems.iter_mut() {
            system.update(world, dt_ms);
        }
        world.flush_dead();
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.systems.iter().map(|s| s.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.systems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline").field("systems", &self.names()).finish()
    }
}
