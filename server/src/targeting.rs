use crate::entity::{Entity, Team};
use crate::math::Vec2;
use crate::world::World;
use shared::EntityId;

/// Nearest live entity whose circle lies within `radius` of `origin`
/// (edge distance) and that passes `filter`. Ties go to the lower id.
pub fn nearest_target<F>(world: &World, origin: Vec2, radius: f32, filter: F) -> Option<EntityId>
where
    F: Fn(&Entity) -> bool,
{
    let mut best: Option<(f32, EntityId)> = None;
    for id in world.query_near(origin, radius) {
        let Some(entity) = world.alive(id) else {
            continue;
        };
        if !filter(entity) {
            continue;
        }
        let gap = entity.gap_to(origin, 0.0);
        if gap > radius {
            continue;
        }
        // Candidates arrive in ascending id order, so strict < keeps the lower id.
        if best.map_or(true, |(best_gap, _)| gap < best_gap) {
            best = Some((gap, id));
        }
    }
    best.map(|(_, id)| id)
}

/// Damageable entity on a team opposed to `team`.
pub fn is_hostile_to(team: Team, entity: &Entity) -> bool {
    entity.is_damageable() && entity.team != team && entity.team != Team::Neutral
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::defs::{enemy_def, EnemyKind};

    #[test]
    fn test_nearest_target_picks_closest() {
        let mut world = World::new(&SimConfig::default());
        let far = world.spawn(Entity::player(Vec2::new(400.0, 100.0)));
        let near = world.spawn(Entity::player(Vec2::new(200.0, 100.0)));
        let origin = Vec2::new(100.0, 100.0);
        assert_eq!(nearest_target(&world, origin, 500.0, |_| true), Some(near));
        world.kill(near);
        assert_eq!(nearest_target(&world, origin, 500.0, |_| true), Some(far));
        assert_eq!(nearest_target(&world, origin, 100.0, |_| true), None);
    }

    #[test]
    fn test_ties_prefer_lower_id() {
        let mut world = World::new(&SimConfig::default());
        let first = world.spawn(Entity::player(Vec2::new(300.0, 200.0)));
        world.spawn(Entity::player(Vec2::new(100.0, 200.0)));
        let found = nearest_target(&world, Vec2::new(200.0, 200.0), 150.0, |_| true);
        assert_eq!(found, Some(first));
    }

    #[test]
    fn test_hostility() {
        let grunt = Entity::enemy(&enemy_def(EnemyKind::Grunt), Vec2::ZERO, 1.0, Vec2::ZERO);
        let player = Entity::player(Vec2::ZERO);
        assert!(is_hostile_to(Team::Players, &grunt));
        assert!(is_hostile_to(Team::Hostile, &player));
        assert!(!is_hostile_to(Team::Players, &player));
    }
}
