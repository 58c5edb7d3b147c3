//! Uniform grid hash over entity circles.
//!
//! An entity is registered in every cell its bounding square touches, so a
//! query only needs to look at the cells under its own bounding square. The
//! result is a broadphase candidate list: callers confirm exact overlap.

use crate::math::Vec2;
use shared::EntityId;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CellRange {
    min_x: i32,
    min_y: i32,
    max_x: i32,
    max_y: i32,
}

impl CellRange {
    fn cells(&self) -> impl Iterator<Item = (i32, i32)> {
        let (min_x, max_x, min_y, max_y) = (self.min_x, self.max_x, self.min_y, self.max_y);
        (min_x..=max_x).flat_map(move |x| (min_y..=max_y).map(move |y| (x, y)))
    }

    fn area(&self) -> u64 {
        let w = (self.max_x as i64 - self.min_x as i64 + 1).max(0) as u64;
        let h = (self.max_y as i64 - self.min_y as i64 + 1).max(0) as u64;
        w.saturating_mul(h)
    }

    fn contains(&self, (x, y): (i32, i32)) -> bool {
        (self.min_x..=self.max_x).contains(&x) && (self.min_y..=self.max_y).contains(&y)
    }
}

#[derive(Debug)]
pub struct SpatialIndex {
    cell_size: f32,
    cells: HashMap<(i32, i32), Vec<EntityId>>,
    entries: HashMap<EntityId, CellRange>,
}

impl SpatialIndex {
    pub fn new(cell_size: f32) -> Self {
        Self {
            cell_size: if cell_size.is_finite() && cell_size > 0.0 { cell_size } else { 64.0 },
            cells: HashMap::new(),
            entries: HashMap::new(),
        }
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    fn cell_of(&self, v: f32) -> i32 {
        // Saturating float-to-int cast keeps absurd coordinates bounded.
        (v / self.cell_size).floor() as i32
    }

    fn range_for(&self, pos: Vec2, radius: f32) -> CellRange {
        let r = radius.max(0.0);
        CellRange {
            min_x: self.cell_of(pos.x - r),
            min_y: self.cell_of(pos.y - r),
            max_x: self.cell_of(pos.x + r),
            max_y: self.cell_of(pos.y + r),
        }
    }

    pub fn insert(&mut self, id: EntityId, pos: Vec2, radius: f32) {
        if self.entries.contains_key(&id) {
            self.update(id, pos, radius);
            return;
        }
        let range = self.range_for(pos, radius);
        self.add_to_cells(id, range);
        self.entries.insert(id, range);
    }

    /// Re-buckets only when the covered cells change. Returns true if it did.
    pub fn update(&mut self, id: EntityId, pos: Vec2, radius: f32) -> bool {
        let range = self.range_for(pos, radius);
        match self.entries.get(&id).copied() {
            Some(old) if old == range => false,
            Some(old) => {
                self.remove_from_cells(id, old);
                self.add_to_cells(id, range);
                self.entries.insert(id, range);
                true
            }
            None => {
                self.add_to_cells(id, range);
                self.entries.insert(id, range);
                true
            }
        }
    }

    pub fn remove(&mut self, id: EntityId) -> bool {
        match self.entries.remove(&id) {
            Some(range) => {
                self.remove_from_cells(id, range);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Candidate ids whose cells intersect the circle, sorted and unique.
    /// Walks whichever is smaller: the covered cells or the occupied ones.
    pub fn query_circle(&self, x: f32, y: f32, r: f32) -> Vec<EntityId> {
        let range = self.range_for(Vec2::new(x, y), r);
        let mut found = Vec::new();
        if range.area() > self.cells.len() as u64 {
            for (cell, ids) in &self.cells {
                if range.contains(*cell) {
                    found.extend_from_slice(ids);
                }
            }
        } else {
            for cell in range.cells() {
                if let Some(ids) = self.cells.get(&cell) {
                    found.extend_from_slice(ids);
                }
            }
        }
        found.sort_unstable();
        found.dedup();
        found
    }

    pub fn ids(&self) -> impl Iterator<Item = &EntityId> {
        self.entries.keys()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn occupied_cells(&self) -> usize {
        self.cells.len()
    }

    pub fn clear(&mut self) {
        self.cells.clear();
        self.entries.clear();
    }

    fn add_to_cells(&mut self, id: EntityId, range: CellRange) {
        for cell in range.cells() {
            self.cells.entry(cell).or_default().push(id);
        }
    }

    fn remove_from_cells(&mut self, id: EntityId, range: CellRange) {
        for cell in range.cells() {
            if let Some(ids) = self.cells.get_mut(&cell) {
                ids.retain(|other| *other != id);
                if ids.is_empty() {
                    self.cells.remove(&cell);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::SimRng;

    #[test]
    fn test_self_query_always_hits() {
        let mut index = SpatialIndex::new(50.0);
        let mut rng = SimRng::new(11);
        let mut placed = Vec::new();
        for i in 0..200 {
            let pos = Vec2::new(rng.range_f32(-500.0, 500.0), rng.range_f32(-500.0, 500.0));
            let radius = rng.range_f32(1.0, 80.0);
            index.insert(EntityId(i), pos, radius);
            placed.push((EntityId(i), pos, radius));
        }
        for (id, pos, radius) in placed {
            assert!(index.query_circle(pos.x, pos.y, radius).contains(&id));
        }
    }

    #[test]
    fn test_entity_registered_in_every_overlapped_cell() {
        let mut index = SpatialIndex::new(10.0);
        // Straddles four cells around the origin.
        index.insert(EntityId(1), Vec2::new(0.0, 0.0), 5.0);
        assert_eq!(index.occupied_cells(), 4);
        assert!(index.query_circle(-7.0, -7.0, 1.0).contains(&EntityId(1)));
        assert!(index.query_circle(7.0, 7.0, 1.0).contains(&EntityId(1)));
    }

    #[test]
    fn test_update_rebuckets_only_on_cell_change() {
        let mut index = SpatialIndex::new(100.0);
        index.insert(EntityId(1), Vec2::new(10.0, 10.0), 5.0);
        assert!(!index.update(EntityId(1), Vec2::new(40.0, 40.0), 5.0));
        assert!(index.update(EntityId(1), Vec2::new(150.0, 40.0), 5.0));
        assert!(index.query_circle(10.0, 10.0, 5.0).is_empty());
        assert!(index.query_circle(150.0, 40.0, 5.0).contains(&EntityId(1)));
    }

    #[test]
    fn test_remove_clears_cells() {
        let mut index = SpatialIndex::new(20.0);
        index.insert(EntityId(3), Vec2::new(5.0, 5.0), 30.0);
        assert!(index.remove(EntityId(3)));
        assert!(!index.remove(EntityId(3)));
        assert_eq!(index.occupied_cells(), 0);
        assert!(index.query_circle(5.0, 5.0, 30.0).is_empty());
    }

    #[test]
    fn test_query_results_sorted_and_unique() {
        let mut index = SpatialIndex::new(10.0);
        index.insert(EntityId(5), Vec2::new(0.0, 0.0), 25.0);
        index.insert(EntityId(2), Vec2::new(3.0, 3.0), 25.0);
        let found = index.query_circle(0.0, 0.0, 25.0);
        assert_eq!(found, vec![EntityId(2), EntityId(5)]);
    }

    #[test]
    fn test_far_entities_not_returned() {
        let mut index = SpatialIndex::new(32.0);
        index.insert(EntityId(1), Vec2::new(0.0, 0.0), 4.0);
        index.insert(EntityId(2), Vec2::new(1000.0, 1000.0), 4.0);
        assert_eq!(index.query_circle(0.0, 0.0, 10.0), vec![EntityId(1)]);
    }

    #[test]
    fn test_oversized_query_stays_bounded() {
        let mut index = SpatialIndex::new(16.0);
        index.insert(EntityId(1), Vec2::new(0.0, 0.0), 4.0);
        index.insert(EntityId(2), Vec2::new(5000.0, -5000.0), 4.0);
        assert_eq!(index.query_circle(0.0, 0.0, f32::INFINITY), vec![EntityId(1), EntityId(2)]);
        assert_eq!(index.query_circle(0.0, 0.0, 1.0e30), vec![EntityId(1), EntityId(2)]);
        assert_eq!(index.query_circle(f32::NAN, 0.0, f32::NAN), vec![EntityId(1)]);
    }
}
