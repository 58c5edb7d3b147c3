//! Wave lifecycle.
//!
//! `Idle` counts down the intermission, `Spawning` releases regulars on an
//! interval, `BossPending` waits for the boss time, and `Complete` waits
//! for everything the wave spawned to be gone. Every transition is
//! announced with `WavePhaseChanged`.

use super::System;
use crate::defs::{enemy_def, BossDef, EnemyKind, WAVES};
use crate::entity::Entity;
use crate::math::Vec2;
use crate::world::World;
use log::info;
use shared::{EntityId, EventKind, WavePhase};
use std::collections::BTreeSet;

/// Counts and scaling for one wave.
#[derive(Debug, Clone, PartialEq)]
pub struct WavePlan {
    pub grunts: u32,
    pub archers: u32,
    pub spawn_interval_ms: f64,
    pub health_scale: f32,
    pub boss: Option<BossDef>,
}

impl WavePlan {
    /// Plan for 1-based wave `number`. Waves past the table repeat the last
    /// entry with more and tougher enemies.
    pub fn for_wave(number: u32) -> Self {
        let index = number.saturating_sub(1) as usize;
        let last = WAVES.len() - 1;
        let def = WAVES[index.min(last)];
        let extra = index.saturating_sub(last) as f32;
        let count_scale = 1.0 + 0.25 * extra;
        Self {
            grunts: (def.grunts as f32 * count_scale).ceil() as u32,
            archers: (def.archers as f32 * count_scale).ceil() as u32,
            spawn_interval_ms: def.spawn_interval_ms,
            health_scale: 1.0 + 0.15 * extra,
            boss: def.boss,
        }
    }

    pub fn total(&self) -> u32 {
        self.grunts + self.archers + u32::from(self.boss.is_some())
    }
}

#[derive(Debug, Clone, Default)]
pub struct WaveDirector {
    phase: Option<WavePhase>,
    wave: u32,
    first_delay_ms: f64,
    intermission_ms: f64,
    timer_ms: f64,
    wave_elapsed_ms: f64,
    plan: Option<WavePlan>,
    spawned: BTreeSet<EntityId>,
}

impl WaveDirector {
    pub fn new(first_delay_ms: f64, intermission_ms: f64) -> Self {
        Self {
            phase: Some(WavePhase::Idle),
            first_delay_ms,
            intermission_ms,
            timer_ms: first_delay_ms,
            ..Default::default()
        }
    }

    pub fn phase(&self) -> WavePhase {
        self.phase.unwrap_or(WavePhase::Idle)
    }

    /// Current wave number; 0 before the first wave starts.
    pub fn wave(&self) -> u32 {
        self.wave
    }

    pub fn alive(&self) -> usize {
        self.spawned.len()
    }

    pub fn plan(&self) -> Option<&WavePlan> {
        self.plan.as_ref()
    }

    /// Milliseconds left on the current phase timer.
    pub fn timer_ms(&self) -> f64 {
        self.timer_ms
    }

    pub fn first_delay_ms(&self) -> f64 {
        self.first_delay_ms
    }

    fn enter(&mut self, world: &mut World, phase: WavePhase) {
        self.phase = Some(phase);
        world.emit(EventKind::WavePhaseChanged { wave: self.wave, phase });
    }

    fn spawn_enemy(&mut self, world: &mut World, kind: EnemyKind, health_scale: f32, boss: bool) -> EntityId {
        let def = enemy_def(kind);
        let pos = edge_point(world, def.radius);
        let mut enemy = Entity::enemy(&def, pos, health_scale, world.center());
        if let Some(data) = enemy.as_enemy_mut() {
            data.boss = boss;
        }
        let id = world.spawn(enemy);
        self.spawned.insert(id);
        id
    }

    /// Advances the state machine by one tick.
    pub fn update(&mut self, world: &mut World, dt_ms: f64) {
        self.spawned.retain(|id| world.is_alive(*id));

        match self.phase() {
            WavePhase::Idle => {
                self.timer_ms -= dt_ms;
                if self.timer_ms > 0.0 {
                    return;
                }
                self.wave += 1;
                let plan = WavePlan::for_wave(self.wave);
                info!(
                    "Wave {} starting: {} grunts, {} archers{}",
                    self.wave,
                    plan.grunts,
                    plan.archers,
                    if plan.boss.is_some() { ", boss" } else { "" }
                );
                world.emit(EventKind::WaveStarted {
                    wave: self.wave,
                    enemies: plan.total(),
                });
                self.plan = Some(plan);
                self.timer_ms = 0.0;
                self.wave_elapsed_ms = 0.0;
                self.enter(world, WavePhase::Spawning);
            }
            WavePhase::Spawning => {
                self.wave_elapsed_ms += dt_ms;
                self.timer_ms -= dt_ms;
                let Some(mut plan) = self.plan.take() else {
                    self.enter(world, WavePhase::Complete);
                    return;
                };
                while self.timer_ms <= 0.0 && plan.grunts + plan.archers > 0 {
                    let pick_archer = plan.archers > 0
                        && (plan.grunts == 0
                            || world.rng.below(plan.grunts + plan.archers) < plan.archers);
                    let kind = if pick_archer {
                        plan.archers -= 1;
                        EnemyKind::Archer
                    } else {
                        plan.grunts -= 1;
                        EnemyKind::Grunt
                    };
                    self.spawn_enemy(world, kind, plan.health_scale, false);
                    self.timer_ms += plan.spawn_interval_ms;
                }
                let done = plan.grunts + plan.archers == 0;
                let has_boss = plan.boss.is_some();
                self.plan = Some(plan);
                if done {
                    self.enter(world, if has_boss { WavePhase::BossPending } else { WavePhase::Complete });
                }
            }
            WavePhase::BossPending => {
                self.wave_elapsed_ms += dt_ms;
                let Some((boss, scale)) = self.plan.as_ref().and_then(|p| p.boss.map(|b| (b, p.health_scale))) else {
                    self.enter(world, WavePhase::Complete);
                    return;
                };
                if self.wave_elapsed_ms < boss.at_ms {
                    return;
                }
                let id = self.spawn_enemy(world, boss.kind, scale, true);
                info!("Boss {} spawned in wave {}", id, self.wave);
                world.emit(EventKind::BossSpawned { wave: self.wave, boss: id });
                self.enter(world, WavePhase::Complete);
            }
            WavePhase::Complete => {
                if !self.spawned.is_empty() {
                    return;
                }
                info!("Wave {} cleared", self.wave);
                world.emit(EventKind::WaveCompleted { wave: self.wave });
                self.plan = None;
                self.timer_ms = self.intermission_ms;
                self.enter(world, WavePhase::Idle);
            }
        }
    }
}

/// Random point just inside one of the four world edges.
fn edge_point(world: &mut World, radius: f32) -> Vec2 {
    let (width, height) = (world.width, world.height);
    let inset = radius + 1.0;
    let side = world.rng.below(4);
    let along_x = world.rng.range_f32(inset, width - inset);
    let along_y = world.rng.range_f32(inset, height - inset);
    match side {
        0 => Vec2::new(along_x, inset),
        1 => Vec2::new(width - inset, along_y),
        2 => Vec2::new(along_x, height - inset),
        _ => Vec2::new(inset, along_y),
    }
}

pub struct WaveSystem;

impl System for WaveSystem {
    fn name(&self) -> &'static str {
        "wave"
    }

    fn update(&mut self, world: &mut World, dt_ms: f64) {
        let mut director = std::mem::take(&mut world.wave);
        director.update(world, dt_ms);
        world.wave = director;
    }
}
