use super::{Behavior, Control, Controls, Goal, GoalContext};
use crate::world::World;
use shared::EntityId;
use std::fmt;

pub struct GoalEntry {
    pub priority: i32,
    pub goal: Goal,
    active: bool,
}

impl GoalEntry {
    pub fn is_active(&self) -> bool {
        self.active
    }
}

/// Prioritized goals of one entity, kept sorted by descending priority.
/// Goals of equal priority keep insertion order.
#[derive(Default)]
pub struct GoalSelector {
    entries: Vec<GoalEntry>,
}

impl fmt::Debug for GoalSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(
                self.entries
                    .iter()
                    .map(|e| (e.priority, e.goal.name(), e.active)),
            )
            .finish()
    }
}

impl GoalSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, priority: i32, goal: Goal) {
        let at = self
            .entries
            .iter()
            .position(|e| e.priority < priority)
            .unwrap_or(self.entries.len());
        self.entries.insert(
            at,
            GoalEntry {
                priority,
                goal,
                active: false,
            },
        );
    }

    /// Runs one selection round followed by one tick of every active goal.
    pub fn tick(&mut self, world: &mut World, me: EntityId, dt_ms: f64) {
        let mut ctx = GoalContext { world, me, dt_ms };

        for entry in self.entries.iter_mut().filter(|e| e.active) {
            if !entry.goal.should_continue(&mut ctx) {
                entry.goal.stop(&mut ctx);
                entry.active = false;
            }
        }

        for i in 0..self.entries.len() {
            if self.entries[i].active {
                continue;
            }
            let priority = self.entries[i].priority;
            let wanted = self.entries[i].goal.controls();
            let blocked = self
                .entries
                .iter()
                .any(|e| e.active && e.priority >= priority && e.goal.controls().intersects(wanted));
            if blocked || !self.entries[i].goal.can_start(&mut ctx) {
                continue;
            }
            for other in self.entries.iter_mut() {
                if other.active && other.goal.controls().intersects(wanted) {
                    other.goal.stop(&mut ctx);
                    other.active = false;
                }
            }
            let entry = &mut self.entries[i];
            entry.goal.start(&mut ctx);
            entry.active = true;
        }

        for entry in self.entries.iter_mut().filter(|e| e.active) {
            entry.goal.tick(&mut ctx);
        }
    }

    /// Stops every active goal, e.g. when the owner dies.
    pub fn stop_all(&mut self, world: &mut World, me: EntityId) {
        let mut ctx = GoalContext { world, me, dt_ms: 0.0 };
        for entry in self.entries.iter_mut().filter(|e| e.active) {
            entry.goal.stop(&mut ctx);
            entry.active = false;
        }
    }

    /// Union of the channels held by active goals.
    pub fn active_controls(&self) -> Controls {
        self.entries
            .iter()
            .filter(|e| e.active)
            .fold(Controls::NONE, |acc, e| acc | e.goal.controls())
    }

    /// Names of the active goals holding `control`. Never more than one.
    pub fn holders(&self, control: Control) -> Vec<&'static str> {
        self.entries
            .iter()
            .filter(|e| e.active && e.goal.controls().contains(control))
            .map(|e| e.goal.name())
            .collect()
    }

    pub fn active_names(&self) -> Vec<&'static str> {
        self.entries
            .iter()
            .filter(|e| e.active)
            .map(|e| e.goal.name())
            .collect()
    }

    pub fn is_active(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.active && e.goal.name() == name)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.entries.iter().map(|e| e.goal.name()).collect()
    }

    pub fn entries(&self) -> &[GoalEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::entity::Entity;
    use crate::math::Vec2;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct Tally {
        starts: AtomicU32,
        stops: AtomicU32,
    }

    impl Tally {
        fn get(&self) -> (u32, u32) {
            (self.starts.load(Ordering::SeqCst), self.stops.load(Ordering::SeqCst))
        }
    }

    /// Test goal whose startability is flipped from outside.
    struct Switch {
        name: &'static str,
        controls: Controls,
        enabled: Arc<AtomicBool>,
        tally: Arc<Tally>,
    }

    impl Switch {
        fn boxed(name: &'static str, controls: Controls, enabled: &Arc<AtomicBool>) -> Goal {
            Self::tallied(name, controls, enabled).0
        }

        fn tallied(name: &'static str, controls: Controls, enabled: &Arc<AtomicBool>) -> (Goal, Arc<Tally>) {
            let tally = Arc::new(Tally::default());
            let goal = Goal::Custom(Box::new(Switch {
                name,
                controls,
                enabled: enabled.clone(),
                tally: tally.clone(),
            }));
            (goal, tally)
        }
    }

    impl Behavior for Switch {
        fn name(&self) -> &'static str {
            self.name
        }

        fn controls(&self) -> Controls {
            self.controls
        }

        fn can_start(&mut self, _ctx: &mut GoalContext) -> bool {
            self.enabled.load(Ordering::SeqCst)
        }

        fn start(&mut self, _ctx: &mut GoalContext) {
            self.tally.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn stop(&mut self, _ctx: &mut GoalContext) {
            self.tally.stops.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn test_world() -> (World, EntityId) {
        let mut world = World::new(&SimConfig::default());
        let me = world.spawn(Entity::player(Vec2::new(100.0, 100.0)));
        (world, me)
    }

    fn assert_exclusive(selector: &GoalSelector) {
        for control in Control::ALL {
            assert!(selector.holders(control).len() <= 1, "{:?} held twice", control);
        }
    }

    #[test]
    fn test_higher_priority_preempts_lower() {
        let (mut world, me) = test_world();
        let always = Arc::new(AtomicBool::new(true));
        let chase = Arc::new(AtomicBool::new(false));
        let mut selector = GoalSelector::new();
        selector.add(1, Switch::boxed("idle", Controls::MOVE, &always));
        selector.add(5, Switch::boxed("chase", Controls::MOVE | Controls::LOOK, &chase));

        selector.tick(&mut world, me, 33.0);
        assert_eq!(selector.active_names(), vec!["idle"]);

        chase.store(true, Ordering::SeqCst);
        selector.tick(&mut world, me, 33.0);
        assert_eq!(selector.active_names(), vec!["chase"]);
        assert_exclusive(&selector);

        chase.store(false, Ordering::SeqCst);
        selector.tick(&mut world, me, 33.0);
        assert_eq!(selector.active_names(), vec!["idle"]);
    }

    #[test]
    fn test_equal_priority_does_not_preempt() {
        let (mut world, me) = test_world();
        let on = Arc::new(AtomicBool::new(true));
        let mut selector = GoalSelector::new();
        selector.add(2, Switch::boxed("first", Controls::ATTACK, &on));
        selector.add(2, Switch::boxed("second", Controls::ATTACK, &on));
        for _ in 0..5 {
            selector.tick(&mut world, me, 33.0);
            assert_eq!(selector.active_names(), vec!["first"]);
            assert_exclusive(&selector);
        }
    }

    #[test]
    fn test_disjoint_channels_run_together() {
        let (mut world, me) = test_world();
        let on = Arc::new(AtomicBool::new(true));
        let mut selector = GoalSelector::new();
        selector.add(3, Switch::boxed("look", Controls::LOOK, &on));
        selector.add(1, Switch::boxed("walk", Controls::MOVE, &on));
        selector.tick(&mut world, me, 33.0);
        assert_eq!(selector.active_names(), vec!["look", "walk"]);
        assert_eq!(selector.active_controls(), Controls::LOOK | Controls::MOVE);
    }

    #[test]
    fn test_stop_all_is_idempotent() {
        let (mut world, me) = test_world();
        let on = Arc::new(AtomicBool::new(true));
        let mut selector = GoalSelector::new();
        selector.add(1, Switch::boxed("walk", Controls::MOVE, &on));
        selector.tick(&mut world, me, 33.0);
        selector.stop_all(&mut world, me);
        selector.stop_all(&mut world, me);
        assert!(selector.active_names().is_empty());
        assert_eq!(selector.active_controls(), Controls::NONE);
    }

    #[test]
    fn test_start_and_stop_run_once_per_transition() {
        let (mut world, me) = test_world();
        let always = Arc::new(AtomicBool::new(true));
        let chase = Arc::new(AtomicBool::new(false));
        let (idle, idle_tally) = Switch::tallied("idle", Controls::MOVE, &always);
        let (hunt, hunt_tally) = Switch::tallied("chase", Controls::MOVE, &chase);
        let mut selector = GoalSelector::new();
        selector.add(1, idle);
        selector.add(5, hunt);

        for _ in 0..4 {
            selector.tick(&mut world, me, 33.0);
        }
        assert_eq!(idle_tally.get(), (1, 0));
        assert_eq!(hunt_tally.get(), (0, 0));

        // Preempted: the lower goal stops exactly once.
        chase.store(true, Ordering::SeqCst);
        for _ in 0..4 {
            selector.tick(&mut world, me, 33.0);
        }
        assert_eq!(idle_tally.get(), (1, 1));
        assert_eq!(hunt_tally.get(), (1, 0));

        // Failing should_continue stops the holder once and frees the channel.
        chase.store(false, Ordering::SeqCst);
        for _ in 0..4 {
            selector.tick(&mut world, me, 33.0);
        }
        assert_eq!(hunt_tally.get(), (1, 1));
        assert_eq!(idle_tally.get(), (2, 1));
        assert_eq!(selector.holders(Control::Move), vec!["idle"]);
    }

    #[test]
    fn test_stop_all_stops_each_active_goal_once() {
        let (mut world, me) = test_world();
        let on = Arc::new(AtomicBool::new(true));
        let (walk, tally) = Switch::tallied("walk", Controls::MOVE, &on);
        let mut selector = GoalSelector::new();
        selector.add(1, walk);
        selector.tick(&mut world, me, 33.0);
        selector.stop_all(&mut world, me);
        selector.stop_all(&mut world, me);
        assert_eq!(tally.get(), (1, 1));
    }
}
