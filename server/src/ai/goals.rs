//! Built-in goals.

use super::{Behavior, Controls, GoalContext};
use crate::defs::WeaponDef;
use crate::math::Vec2;
use crate::systems::projectile;
use crate::targeting::{is_hostile_to, nearest_target};
use crate::world::{DamageRequest, World};
use shared::EntityId;

/// Closed set of goals an entity can run. `Custom` admits external
/// behaviors without widening the engine.
pub enum Goal {
    TargetNearest(TargetNearest),
    GoToTarget(GoToTarget),
    GoToPosition(GoToPosition),
    Wander(Wander),
    MeleeAttack(MeleeAttack),
    ShootAt(ShootAt),
    Custom(Box<dyn Behavior + Send>),
}

macro_rules! dispatch {
    ($self:ident, $goal:ident => $body:expr) => {
        match $self {
            Goal::TargetNearest($goal) => $body,
            Goal::GoToTarget($goal) => $body,
            Goal::GoToPosition($goal) => $body,
            Goal::Wander($goal) => $body,
            Goal::MeleeAttack($goal) => $body,
            Goal::ShootAt($goal) => $body,
            Goal::Custom($goal) => $body,
        }
    };
}

impl Behavior for Goal {
    fn name(&self) -> &'static str {
        dispatch!(self, g => g.name())
    }

    fn controls(&self) -> Controls {
        dispatch!(self, g => g.controls())
    }

    fn can_start(&mut self, ctx: &mut GoalContext) -> bool {
        dispatch!(self, g => g.can_start(ctx))
    }

    fn start(&mut self, ctx: &mut GoalContext) {
        dispatch!(self, g => g.start(ctx))
    }

    fn should_continue(&mut self, ctx: &mut GoalContext) -> bool {
        dispatch!(self, g => g.should_continue(ctx))
    }

    fn tick(&mut self, ctx: &mut GoalContext) {
        dispatch!(self, g => g.tick(ctx))
    }

    fn stop(&mut self, ctx: &mut GoalContext) {
        dispatch!(self, g => g.stop(ctx))
    }
}

fn current_target(world: &World, me: EntityId) -> Option<EntityId> {
    world
        .alive(me)
        .and_then(|e| e.as_enemy())
        .and_then(|e| e.target)
        .filter(|t| world.is_alive(*t))
}

fn set_target(world: &mut World, me: EntityId, target: Option<EntityId>) {
    if let Some(enemy) = world.entity_mut(me).and_then(|e| e.as_enemy_mut()) {
        enemy.target = target;
    }
}

/// Edge gap and unit direction from `me` to its current target.
fn target_geometry(world: &World, me: EntityId) -> Option<(EntityId, f32, Vec2)> {
    let target = current_target(world, me)?;
    let mine = world.alive(me)?;
    let other = world.alive(target)?;
    let gap = mine.gap_to(other.pos, other.radius);
    Some((target, gap, (other.pos - mine.pos).normalize()))
}

fn steer(world: &mut World, me: EntityId, dir: Vec2, speed: f32) {
    if let Some(entity) = world.entity_mut(me) {
        let speed = speed * entity.speed_multiplier();
        entity.vel = dir.normalize() * speed;
    }
}

fn halt(world: &mut World, me: EntityId) {
    if let Some(entity) = world.entity_mut(me) {
        entity.vel = Vec2::ZERO;
    }
}

fn face(world: &mut World, me: EntityId, dir: Vec2) {
    if dir.length_squared() > 0.0 {
        if let Some(entity) = world.entity_mut(me) {
            entity.facing = dir.angle();
        }
    }
}

/// Acquires the nearest opposing entity within the aggro radius and keeps
/// facing it. Drops the target once it leaves the leash radius.
pub struct TargetNearest {
    pub aggro_radius: f32,
    pub rescan_ms: f64,
    pub leash_factor: f32,
    rescan_left_ms: f64,
    found: Option<EntityId>,
}

impl TargetNearest {
    pub fn new(aggro_radius: f32, rescan_ms: f64) -> Self {
        Self {
            aggro_radius,
            rescan_ms,
            leash_factor: 1.5,
            rescan_left_ms: 0.0,
            found: None,
        }
    }

    fn scan(&self, world: &World, me: EntityId) -> Option<EntityId> {
        let mine = world.alive(me)?;
        let team = mine.team;
        nearest_target(world, mine.pos, self.aggro_radius, |e| e.id != me && is_hostile_to(team, e))
    }
}

impl Behavior for TargetNearest {
    fn name(&self) -> &'static str {
        "target_nearest"
    }

    fn controls(&self) -> Controls {
        Controls::LOOK
    }

    fn can_start(&mut self, ctx: &mut GoalContext) -> bool {
        self.found = self.scan(ctx.world, ctx.me);
        self.found.is_some()
    }

    fn start(&mut self, ctx: &mut GoalContext) {
        set_target(ctx.world, ctx.me, self.found);
        self.rescan_left_ms = self.rescan_ms;
    }

    fn should_continue(&mut self, ctx: &mut GoalContext) -> bool {
        match target_geometry(ctx.world, ctx.me) {
            Some((_, gap, _)) => gap <= self.aggro_radius * self.leash_factor,
            None => false,
        }
    }

    fn tick(&mut self, ctx: &mut GoalContext) {
        self.rescan_left_ms -= ctx.dt_ms;
        if self.rescan_left_ms <= 0.0 {
            self.rescan_left_ms = self.rescan_ms;
            if let Some(nearer) = self.scan(ctx.world, ctx.me) {
                set_target(ctx.world, ctx.me, Some(nearer));
            }
        }
        if let Some((_, _, dir)) = target_geometry(ctx.world, ctx.me) {
            face(ctx.world, ctx.me, dir);
        }
    }

    fn stop(&mut self, ctx: &mut GoalContext) {
        set_target(ctx.world, ctx.me, None);
        self.found = None;
    }
}

/// Steers straight at the current target until within `stop_distance`.
pub struct GoToTarget {
    pub speed: f32,
    pub stop_distance: f32,
}

impl GoToTarget {
    pub fn new(speed: f32, stop_distance: f32) -> Self {
        Self { speed, stop_distance }
    }
}

impl Behavior for GoToTarget {
    fn name(&self) -> &'static str {
        "go_to_target"
    }

    fn controls(&self) -> Controls {
        Controls::MOVE
    }

    fn can_start(&mut self, ctx: &mut GoalContext) -> bool {
        matches!(target_geometry(ctx.world, ctx.me), Some((_, gap, _)) if gap > self.stop_distance)
    }

    fn tick(&mut self, ctx: &mut GoalContext) {
        if let Some((_, _, dir)) = target_geometry(ctx.world, ctx.me) {
            steer(ctx.world, ctx.me, dir, self.speed);
        }
    }

    fn stop(&mut self, ctx: &mut GoalContext) {
        halt(ctx.world, ctx.me);
    }
}

/// Steers toward a fixed point while there is nothing to fight.
pub struct GoToPosition {
    pub point: Vec2,
    pub speed: f32,
    pub stop_distance: f32,
}

impl GoToPosition {
    pub fn new(point: Vec2, speed: f32, stop_distance: f32) -> Self {
        Self {
            point,
            speed,
            stop_distance,
        }
    }

    fn offset(&self, world: &World, me: EntityId) -> Option<Vec2> {
        world.alive(me).map(|e| self.point - e.pos)
    }
}

impl Behavior for GoToPosition {
    fn name(&self) -> &'static str {
        "go_to_position"
    }

    fn controls(&self) -> Controls {
        Controls::MOVE
    }

    fn can_start(&mut self, ctx: &mut GoalContext) -> bool {
        current_target(ctx.world, ctx.me).is_none()
            && self
                .offset(ctx.world, ctx.me)
                .map_or(false, |offset| offset.length() > self.stop_distance)
    }

    fn tick(&mut self, ctx: &mut GoalContext) {
        if let Some(offset) = self.offset(ctx.world, ctx.me) {
            steer(ctx.world, ctx.me, offset, self.speed);
        }
    }

    fn stop(&mut self, ctx: &mut GoalContext) {
        halt(ctx.world, ctx.me);
    }
}

/// Idles without a target, picking a new random heading every `interval_ms`. With an anchor, headings
/// point back toward it once the entity drifts past `leash`.
pub struct Wander {
    pub speed: f32,
    pub interval_ms: f64,
    anchor: Option<(Vec2, f32)>,
    heading: Vec2,
    left_ms: f64,
}

impl Wander {
    pub fn new(speed: f32, interval_ms: f64) -> Self {
        Self {
            speed,
            interval_ms,
            anchor: None,
            heading: Vec2::ZERO,
            left_ms: 0.0,
        }
    }

    pub fn anchored(mut self, point: Vec2, leash: f32) -> Self {
        self.anchor = Some((point, leash));
        self
    }

    fn pick_heading(&mut self, world: &mut World, me: EntityId) {
        let random = world.rng.unit_vector();
        let home = match (self.anchor, world.alive(me)) {
            (Some((point, leash)), Some(entity)) if entity.pos.distance(point) > leash => {
                Some((point - entity.pos).normalize())
            }
            _ => None,
        };
        self.heading = match home {
            Some(home) => (home * 2.0 + random).normalize(),
            None => random,
        };
        self.left_ms = self.interval_ms;
    }
}

impl Behavior for Wander {
    fn name(&self) -> &'static str {
        "wander"
    }

    fn controls(&self) -> Controls {
        Controls::MOVE
    }

    fn can_start(&mut self, ctx: &mut GoalContext) -> bool {
        ctx.world.is_alive(ctx.me) && current_target(ctx.world, ctx.me).is_none()
    }

    fn start(&mut self, ctx: &mut GoalContext) {
        self.pick_heading(ctx.world, ctx.me);
    }

    fn tick(&mut self, ctx: &mut GoalContext) {
        self.left_ms -= ctx.dt_ms;
        if self.left_ms <= 0.0 {
            self.pick_heading(ctx.world, ctx.me);
        }
        steer(ctx.world, ctx.me, self.heading, self.speed);
        face(ctx.world, ctx.me, self.heading);
    }

    fn stop(&mut self, ctx: &mut GoalContext) {
        halt(ctx.world, ctx.me);
    }
}

/// Hits the current target through the combat queue while within reach.
pub struct MeleeAttack {
    /// Edge-to-edge reach.
    pub range: f32,
    pub damage: f32,
    pub cooldown_ms: f64,
    /// Simulation time of the next allowed swing.
    ready_at_ms: f64,
}

impl MeleeAttack {
    pub fn new(range: f32, damage: f32, cooldown_ms: f64) -> Self {
        Self {
            range,
            damage,
            cooldown_ms,
            ready_at_ms: 0.0,
        }
    }
}

impl Behavior for MeleeAttack {
    fn name(&self) -> &'static str {
        "melee_attack"
    }

    fn controls(&self) -> Controls {
        Controls::ATTACK
    }

    fn can_start(&mut self, ctx: &mut GoalContext) -> bool {
        matches!(target_geometry(ctx.world, ctx.me), Some((_, gap, _)) if gap <= self.range)
    }

    fn tick(&mut self, ctx: &mut GoalContext) {
        let now = ctx.world.time_ms();
        if now < self.ready_at_ms {
            return;
        }
        if let Some((target, gap, _)) = target_geometry(ctx.world, ctx.me) {
            if gap <= self.range {
                ctx.world.queue_damage(DamageRequest {
                    target,
                    source: Some(ctx.me),
                    amount: self.damage,
                    status: None,
                });
                self.ready_at_ms = now + self.cooldown_ms;
            }
        }
    }
}

/// Fires projectiles at the current target while within range.
pub struct ShootAt {
    /// Centre-to-centre range.
    pub range: f32,
    pub weapon: WeaponDef,
    ready_at_ms: f64,
}

impl ShootAt {
    pub fn new(range: f32, weapon: WeaponDef) -> Self {
        Self {
            range,
            weapon,
            ready_at_ms: 0.0,
        }
    }

    fn in_range(&self, world: &World, me: EntityId) -> bool {
        let Some(target) = current_target(world, me) else {
            return false;
        };
        match (world.alive(me), world.alive(target)) {
            (Some(a), Some(b)) => a.pos.distance(b.pos) <= self.range,
            _ => false,
        }
    }
}

impl Behavior for ShootAt {
    fn name(&self) -> &'static str {
        "shoot_at"
    }

    fn controls(&self) -> Controls {
        Controls::ATTACK
    }

    fn can_start(&mut self, ctx: &mut GoalContext) -> bool {
        self.in_range(ctx.world, ctx.me)
    }

    fn tick(&mut self, ctx: &mut GoalContext) {
        let now = ctx.world.time_ms();
        if now < self.ready_at_ms || !self.in_range(ctx.world, ctx.me) {
            return;
        }
        let Some((_, _, dir)) = target_geometry(ctx.world, ctx.me) else {
            return;
        };
        let Some((origin, team)) = ctx
            .world
            .alive(ctx.me)
            .map(|e| (e.pos + dir * (e.radius + self.weapon.projectile_radius + 1.0), e.team))
        else {
            return;
        };
        if projectile::fire(ctx.world, Some(ctx.me), origin, dir, &self.weapon, team).is_some() {
            self.ready_at_ms = now + self.weapon.cooldown_ms;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{standard_goals, Control};
    use crate::config::SimConfig;
    use crate::defs::{enemy_def, EnemyKind};
    use crate::entity::Entity;
    use shared::EntityKind;

    fn test_world() -> World {
        World::new(&SimConfig {
            spawn_resources: false,
            ..Default::default()
        })
    }

    fn spawn_grunt(world: &mut World, pos: Vec2) -> EntityId {
        let def = enemy_def(EnemyKind::Grunt);
        world.spawn(Entity::enemy(&def, pos, 1.0, pos))
    }

    fn tick_enemy(world: &mut World, me: EntityId) {
        let mut goals = std::mem::take(&mut world.entity_mut(me).unwrap().as_enemy_mut().unwrap().goals);
        goals.tick(world, me, 33.0);
        world.entity_mut(me).unwrap().as_enemy_mut().unwrap().goals = goals;
    }

    fn goals_of(world: &World, me: EntityId) -> &crate::ai::GoalSelector {
        &world.entity(me).unwrap().as_enemy().unwrap().goals
    }

    #[test]
    fn test_acquires_player_in_aggro_and_approaches() {
        let mut world = test_world();
        let grunt = spawn_grunt(&mut world, Vec2::new(500.0, 500.0));
        let player = world.spawn(Entity::player(Vec2::new(750.0, 500.0)));

        tick_enemy(&mut world, grunt);

        let enemy = world.entity(grunt).unwrap();
        assert_eq!(enemy.as_enemy().unwrap().target, Some(player));
        let goals = goals_of(&world, grunt);
        assert_eq!(goals.holders(Control::Look), vec!["target_nearest"]);
        assert_eq!(goals.holders(Control::Move), vec!["go_to_target"]);
        assert!(enemy.vel.x > 0.0);
    }

    #[test]
    fn test_ignores_player_outside_aggro() {
        let mut world = test_world();
        let grunt = spawn_grunt(&mut world, Vec2::new(500.0, 500.0));
        world.spawn(Entity::player(Vec2::new(1200.0, 500.0)));
        tick_enemy(&mut world, grunt);
        assert_eq!(world.entity(grunt).unwrap().as_enemy().unwrap().target, None);
        assert_eq!(goals_of(&world, grunt).holders(Control::Move), vec!["wander"]);
    }

    #[test]
    fn test_melee_queues_damage_in_reach() {
        let mut world = test_world();
        let grunt = spawn_grunt(&mut world, Vec2::new(500.0, 500.0));
        let player = world.spawn(Entity::player(Vec2::new(534.0, 500.0)));
        tick_enemy(&mut world, grunt);
        assert!(goals_of(&world, grunt).is_active("melee_attack"));
        assert_eq!(world.damage_queue.len(), 1);
        assert_eq!(world.damage_queue[0].target, player);
        assert_eq!(world.damage_queue[0].source, Some(grunt));

        // Cooldown holds the next swing back.
        tick_enemy(&mut world, grunt);
        assert_eq!(world.damage_queue.len(), 1);
    }

    #[test]
    fn test_melee_cooldown_runs_while_out_of_reach() {
        let mut world = test_world();
        let grunt = spawn_grunt(&mut world, Vec2::new(500.0, 500.0));
        let player = world.spawn(Entity::player(Vec2::new(534.0, 500.0)));
        tick_enemy(&mut world, grunt);
        assert_eq!(world.damage_queue.len(), 1);
        world.damage_queue.clear();

        world.set_position(player, Vec2::new(600.0, 500.0));
        tick_enemy(&mut world, grunt);
        assert!(!goals_of(&world, grunt).is_active("melee_attack"));
        for _ in 0..30 {
            world.step();
            tick_enemy(&mut world, grunt);
        }
        assert!(world.damage_queue.is_empty());

        // The cooldown elapsed while the goal was inactive.
        world.set_position(player, Vec2::new(534.0, 500.0));
        tick_enemy(&mut world, grunt);
        assert!(goals_of(&world, grunt).is_active("melee_attack"));
        assert_eq!(world.damage_queue.len(), 1);
    }

    #[test]
    fn test_target_dropped_when_dead() {
        let mut world = test_world();
        let grunt = spawn_grunt(&mut world, Vec2::new(500.0, 500.0));
        let player = world.spawn(Entity::player(Vec2::new(700.0, 500.0)));
        tick_enemy(&mut world, grunt);
        world.kill(player);
        tick_enemy(&mut world, grunt);
        assert_eq!(world.entity(grunt).unwrap().as_enemy().unwrap().target, None);
        assert!(!goals_of(&world, grunt).is_active("go_to_target"));
    }

    #[test]
    fn test_archer_fires_projectile() {
        let mut world = test_world();
        let def = enemy_def(EnemyKind::Archer);
        let pos = Vec2::new(500.0, 500.0);
        let archer = world.spawn(Entity::enemy(&def, pos, 1.0, pos));
        world.spawn(Entity::player(Vec2::new(700.0, 500.0)));
        tick_enemy(&mut world, archer);
        assert!(goals_of(&world, archer).is_active("shoot_at"));
        assert_eq!(world.count_of(EntityKind::Projectile), 1);
    }

    #[test]
    fn test_siege_unit_marches_on_rally_point() {
        let mut world = test_world();
        let def = enemy_def(EnemyKind::Brute);
        let mut brute = Entity::enemy(&def, Vec2::new(100.0, 1000.0), 1.0, Vec2::ZERO);
        if let Some(enemy) = brute.as_enemy_mut() {
            enemy.goals = standard_goals(&def, Vec2::new(1000.0, 1000.0));
        }
        let id = world.spawn(brute);
        tick_enemy(&mut world, id);
        assert_eq!(goals_of(&world, id).holders(Control::Move), vec!["go_to_position"]);
        assert!(world.entity(id).unwrap().vel.x > 0.0);
    }
}
