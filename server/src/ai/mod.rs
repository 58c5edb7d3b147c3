//! Goal-based enemy AI.
//!
//! Each enemy owns a [`GoalSelector`] holding prioritized goals. A goal
//! claims one or more control channels while active; the selector makes
//! sure no two active goals ever hold the same channel, preempting lower
//! priorities when a higher one becomes startable.

mod goals;
mod selector;

pub use goals::{GoToPosition, GoToTarget, Goal, MeleeAttack, ShootAt, TargetNearest, Wander};
pub use selector::{GoalEntry, GoalSelector};

use crate::defs::EnemyDef;
use crate::math::Vec2;
use crate::world::World;
use shared::EntityId;
use std::ops::BitOr;

/// A channel of actuation an active goal holds exclusively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Control {
    Move,
    Look,
    Attack,
}

impl Control {
    pub const ALL: [Control; 3] = [Control::Move, Control::Look, Control::Attack];

    fn bit(self) -> u8 {
        match self {
            Control::Move => 1,
            Control::Look => 2,
            Control::Attack => 4,
        }
    }
}

/// Bit set of control channels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Controls(u8);

impl Controls {
    pub const NONE: Controls = Controls(0);
    pub const MOVE: Controls = Controls(1);
    pub const LOOK: Controls = Controls(2);
    pub const ATTACK: Controls = Controls(4);

    pub fn contains(self, control: Control) -> bool {
        self.0 & control.bit() != 0
    }

    pub fn intersects(self, other: Controls) -> bool {
        self.0 & other.0 != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = Control> {
        Control::ALL.into_iter().filter(move |c| self.contains(*c))
    }
}

impl From<Control> for Controls {
    fn from(control: Control) -> Self {
        Controls(control.bit())
    }
}

impl BitOr for Controls {
    type Output = Controls;

    fn bitor(self, rhs: Controls) -> Controls {
        Controls(self.0 | rhs.0)
    }
}

/// What a goal sees while it runs: the whole world and its own id.
pub struct GoalContext<'a> {
    pub world: &'a mut World,
    pub me: EntityId,
    pub dt_ms: f64,
}

/// Lifecycle hooks of one goal.
///
/// `start` and `stop` are only called by the selector on an actual
/// transition, so implementations may assume they alternate.
pub trait Behavior {
    fn name(&self) -> &'static str;

    fn controls(&self) -> Controls;

    fn can_start(&mut self, ctx: &mut GoalContext) -> bool;

    fn start(&mut self, _ctx: &mut GoalContext) {}

    fn should_continue(&mut self, ctx: &mut GoalContext) -> bool {
        self.can_start(ctx)
    }

    fn tick(&mut self, _ctx: &mut GoalContext) {}

    fn stop(&mut self, _ctx: &mut GoalContext) {}
}

pub const PRIORITY_TARGET: i32 = 4;
pub const PRIORITY_ATTACK: i32 = 3;
pub const PRIORITY_APPROACH: i32 = 2;
pub const PRIORITY_WANDER: i32 = 1;

/// Goal set for an enemy archetype. Siege units march on `rally_point`
/// when idle; everything else wanders around it.
pub fn standard_goals(def: &EnemyDef, rally_point: Vec2) -> GoalSelector {
    let mut selector = GoalSelector::default();
    selector.add(PRIORITY_TARGET, Goal::TargetNearest(TargetNearest::new(def.aggro_radius, 500.0)));

    let mut stop_distance = 0.0;
    if let Some(melee) = def.melee {
        selector.add(
            PRIORITY_ATTACK,
            Goal::MeleeAttack(MeleeAttack::new(melee.range, melee.damage, melee.cooldown_ms)),
        );
        stop_distance = melee.range * 0.5;
    }
    if let Some(ranged) = def.ranged {
        selector.add(PRIORITY_ATTACK, Goal::ShootAt(ShootAt::new(ranged.range, ranged.weapon)));
        stop_distance = ranged.range * 0.8;
    }
    selector.add(PRIORITY_APPROACH, Goal::GoToTarget(GoToTarget::new(def.speed, stop_distance)));

    if def.siege {
        selector.add(
            PRIORITY_WANDER,
            Goal::GoToPosition(GoToPosition::new(rally_point, def.speed, 40.0)),
        );
    } else {
        selector.add(
            PRIORITY_WANDER,
            Goal::Wander(Wander::new(def.speed * 0.5, 2000.0).anchored(rally_point, 350.0)),
        );
    }
    selector
}
