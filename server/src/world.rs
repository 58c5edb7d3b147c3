//! Root of all simulation state.
//!
//! `World` owns the entity store, spatial index, event bus and RNG, plus the
//! tick clock and the per-tick request queues systems hand work through.
//! Spawning, killing and moving entities go through `World` so the store and
//! the index never disagree.

use crate::config::SimConfig;
use crate::entity::Entity;
use crate::events::EventBus;
use crate::math::Vec2;
use crate::rng::SimRng;
use crate::spatial::SpatialIndex;
use crate::store::EntityStore;
use crate::systems::wave::WaveDirector;
use shared::{EntityId, EntityKind, EventKind, InputCommand, StatusId};
use std::collections::BTreeMap;
use thiserror::Error;

/// One hit waiting for the combat stage.
#[derive(Debug, Clone, PartialEq)]
pub struct DamageRequest {
    pub target: EntityId,
    /// Entity credited with the hit (the shooter, not the projectile).
    pub source: Option<EntityId>,
    pub amount: f32,
    pub status: Option<StatusId>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BuildOrder {
    Place {
        player: EntityId,
        structure: String,
        pos: Vec2,
    },
    Upgrade {
        player: EntityId,
        building: EntityId,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct CraftOrder {
    pub player: EntityId,
    pub recipe: String,
    pub count: u32,
}

#[derive(Debug, Error, PartialEq)]
pub enum IntegrityError {
    #[error("entity {0} is indexed but missing from the store")]
    IndexedButAbsent(EntityId),
    #[error("entity {0} is alive but not indexed")]
    AliveButUnindexed(EntityId),
    #[error("entity {0} is dead but still indexed")]
    DeadButIndexed(EntityId),
}

#[derive(Debug)]
pub struct World {
    pub width: f32,
    pub height: f32,
    pub friction: f32,
    fixed_dt_ms: f64,
    tick: u64,
    next_id: u64,
    store: EntityStore,
    spatial: SpatialIndex,
    pub events: EventBus,
    pub rng: SimRng,
    pub wave: WaveDirector,
    /// Latest command per player, consumed by the input stage.
    pub inbox: BTreeMap<EntityId, InputCommand>,
    pub damage_queue: Vec<DamageRequest>,
    pub build_queue: Vec<BuildOrder>,
    pub craft_queue: Vec<CraftOrder>,
    pub harvest_queue: Vec<EntityId>,
    dying: Vec<EntityId>,
}

impl World {
    pub fn new(config: &SimConfig) -> Self {
        Self {
            width: config.world_width,
            height: config.world_height,
            friction: config.friction,
            fixed_dt_ms: config.dt_ms(),
            tick: 0,
            next_id: 1,
            store: EntityStore::new(),
            spatial: SpatialIndex::new(config.cell_size),
            events: EventBus::new(),
            rng: SimRng::new(config.seed),
            wave: WaveDirector::new(config.first_wave_delay_ms, config.intermission_ms),
            inbox: BTreeMap::new(),
            damage_queue: Vec::new(),
            build_queue: Vec::new(),
            craft_queue: Vec::new(),
            harvest_queue: Vec::new(),
            dying: Vec::new(),
        }
    }

    /// Advances the clock by one fixed tick. Runs before any system.
    pub fn step(&mut self) {
        self.tick += 1;
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn fixed_dt_ms(&self) -> f64 {
        self.fixed_dt_ms
    }

    /// Always `tick * fixed_dt_ms`.
    pub fn time_ms(&self) -> f64 {
        self.tick as f64 * self.fixed_dt_ms
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.width / 2.0, self.height / 2.0)
    }

    /// True when the whole circle lies inside the world.
    pub fn in_bounds(&self, pos: Vec2, radius: f32) -> bool {
        pos.is_finite()
            && pos.x - radius >= 0.0
            && pos.y - radius >= 0.0
            && pos.x + radius <= self.width
            && pos.y + radius <= self.height
    }

    /// Assigns a fresh id and registers the entity in store and index.
    pub fn spawn(&mut self, mut entity: Entity) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        entity.id = id;
        entity.alive = true;
        self.spatial.insert(id, entity.pos, entity.radius);
        self.store.insert(entity);
        id
    }

    /// Removes an entity from store and index immediately.
    pub fn despawn(&mut self, id: EntityId) -> Option<Entity> {
        self.spatial.remove(id);
        self.dying.retain(|dying| *dying != id);
        self.store.remove(id)
    }

    /// Marks an entity dead and drops it from the index now. It stays in the
    /// store, with its final position, until `flush_dead` at end of tick.
    /// Returns true only on the alive → dead transition.
    pub fn kill(&mut self, id: EntityId) -> bool {
        match self.store.get_mut(id) {
            Some(entity) if entity.alive => {
                entity.alive = false;
                entity.vel = Vec2::ZERO;
                self.spatial.remove(id);
                self.dying.push(id);
                true
            }
            _ => false,
        }
    }

    /// Removes everything killed this tick from the store.
    pub fn flush_dead(&mut self) -> usize {
        let dying = std::mem::take(&mut self.dying);
        let mut removed = 0;
        for id in dying {
            if self.store.remove(id).is_some() {
                removed += 1;
            }
        }
        removed
    }

    pub fn set_position(&mut self, id: EntityId, pos: Vec2) {
        if let Some(entity) = self.store.get_mut(id) {
            entity.pos = pos;
            if entity.alive {
                self.spatial.update(id, pos, entity.radius);
            }
        }
    }

    /// Re-registers an entity after its radius changed.
    pub fn reindex(&mut self, id: EntityId) {
        if let Some(entity) = self.store.get(id) {
            if entity.alive {
                self.spatial.update(id, entity.pos, entity.radius);
            }
        }
    }

    /// Broadphase candidates around a point. Callers confirm exact overlap.
    pub fn query_circle(&self, x: f32, y: f32, r: f32) -> Vec<EntityId> {
        self.spatial.query_circle(x, y, r)
    }

    pub fn query_near(&self, pos: Vec2, r: f32) -> Vec<EntityId> {
        self.spatial.query_circle(pos.x, pos.y, r)
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.store.get(id)
    }

    /// Direct mutable access. Position, radius and liveness changes must go
    /// through `set_position`, `reindex` and `kill`.
    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.store.get_mut(id)
    }

    /// Resolves an id to a live entity.
    pub fn alive(&self, id: EntityId) -> Option<&Entity> {
        self.store.get(id).filter(|entity| entity.alive)
    }

    pub fn is_alive(&self, id: EntityId) -> bool {
        self.alive(id).is_some()
    }

    pub fn ids_of(&self, kind: EntityKind) -> Vec<EntityId> {
        self.store.ids_of(kind)
    }

    pub fn count_of(&self, kind: EntityKind) -> usize {
        self.store.count_of(kind)
    }

    pub fn ids(&self) -> Vec<EntityId> {
        self.store.ids()
    }

    pub fn entity_count(&self) -> usize {
        self.store.len()
    }

    pub fn indexed_count(&self) -> usize {
        self.spatial.len()
    }

    pub fn is_indexed(&self, id: EntityId) -> bool {
        self.spatial.contains(id)
    }

    pub fn emit(&mut self, kind: EventKind) {
        self.events.emit(self.tick, kind);
    }

    pub fn queue_damage(&mut self, request: DamageRequest) {
        self.damage_queue.push(request);
    }

    /// Verifies that store and index agree.
    pub fn check_integrity(&self) -> Result<(), IntegrityError> {
        for entity in self.store.iter() {
            let indexed = self.spatial.contains(entity.id);
            if entity.alive && !indexed {
                return Err(IntegrityError::AliveButUnindexed(entity.id));
            }
            if !entity.alive && indexed {
                return Err(IntegrityError::DeadButIndexed(entity.id));
            }
        }
        if let Some(id) = self.spatial.ids().find(|id| !self.store.contains(**id)) {
            return Err(IntegrityError::IndexedButAbsent(*id));
        }
        Ok(())
    }

    /// Releases every entity and index entry.
    pub fn clear(&mut self) {
        self.store.clear();
        self.spatial.clear();
        self.dying.clear();
        self.inbox.clear();
        self.damage_queue.clear();
        self.build_queue.clear();
        self.craft_queue.clear();
        self.harvest_queue.clear();
    }
}
