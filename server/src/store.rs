use crate::entity::Entity;
use shared::{EntityId, EntityKind};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Owns every entity, indexed by id and grouped by kind.
///
/// Kind groups are kept ordered so system iteration is deterministic. They
/// are for coarse passes only; proximity goes through the spatial index.
#[derive(Debug, Default)]
pub struct EntityStore {
    entities: HashMap<EntityId, Entity>,
    by_kind: BTreeMap<EntityKind, BTreeSet<EntityId>>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an entity, replacing any previous one with the same id.
    pub fn insert(&mut self, entity: Entity) -> Option<Entity> {
        let id = entity.id;
        let kind = entity.kind();
        let previous = self.remove(id);
        self.by_kind.entry(kind).or_default().insert(id);
        self.entities.insert(id, entity);
        previous
    }

    pub fn remove(&mut self, id: EntityId) -> Option<Entity> {
        let entity = self.entities.remove(&id)?;
        if let Some(group) = self.by_kind.get_mut(&entity.kind()) {
            group.remove(&id);
        }
        Some(entity)
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Ids of one kind in ascending order.
    pub fn ids_of(&self, kind: EntityKind) -> Vec<EntityId> {
        self.by_kind
            .get(&kind)
            .map(|group| group.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn count_of(&self, kind: EntityKind) -> usize {
        self.by_kind.get(&kind).map_or(0, |group| group.len())
    }

    /// All ids in ascending order.
    pub fn ids(&self) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self.entities.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn clear(&mut self) {
        self.entities.clear();
        self.by_kind.clear();
    }
}
