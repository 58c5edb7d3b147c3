//! The simulation context: one [`World`], the system pipeline and the
//! outbound event buffer. Everything the network layer does to the
//! simulation goes through here, between ticks.

use crate::config::{ConfigError, SimConfig};
use crate::defs::{resource_def, RESOURCE_LAYOUT};
use crate::entity::Entity;
use crate::math::{circles_overlap, Vec2};
use crate::systems::resource::release_reservations;
use crate::systems::Pipeline;
use crate::world::{BuildOrder, IntegrityError, World};
use log::{debug, info};
use shared::{EntityId, EntityKind, EntitySnapshot, EventKind, GameEvent, InputCommand, Snapshot};
use thiserror::Error;

/// Nodes keep this far from the centre so players spawn in the open.
const SPAWN_CLEARING: f32 = 180.0;
const PLACEMENT_ATTEMPTS: usize = 40;
const SUMMARY_EVERY: u64 = 60;

#[derive(Debug, Error, PartialEq)]
pub enum TickError {
    #[error("world inconsistent after tick {tick}: {source}")]
    Inconsistent {
        tick: u64,
        #[source]
        source: IntegrityError,
    },
}

pub struct Game {
    world: World,
    pipeline: Pipeline,
    config: SimConfig,
    outbound: Vec<GameEvent>,
}

impl Game {
    pub fn new(config: SimConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut game = Self {
            world: World::new(&config),
            pipeline: Pipeline::standard(),
            config,
            outbound: Vec::new(),
        };
        if game.config.spawn_resources {
            game.spawn_resources();
        }
        Ok(game)
    }

    fn spawn_resources(&mut self) {
        let center = self.world.center();
        let mut placed = 0;
        for &(kind, count) in RESOURCE_LAYOUT {
            let def = resource_def(kind);
            for _ in 0..count {
                let margin = def.radius + 10.0;
                let spot = (0..PLACEMENT_ATTEMPTS).find_map(|_| {
                    let pos = Vec2::new(
                        self.world.rng.range_f32(margin, self.world.width - margin),
                        self.world.rng.range_f32(margin, self.world.height - margin),
                    );
                    (pos.distance(center) > SPAWN_CLEARING && self.is_clear(pos, def.radius + 8.0)).then_some(pos)
                });
                if let Some(pos) = spot {
                    self.world.spawn(Entity::resource_node(&def, pos));
                    placed += 1;
                }
            }
        }
        info!("Placed {} resource nodes", placed);
    }

    fn is_clear(&self, pos: Vec2, radius: f32) -> bool {
        self.world.query_near(pos, radius).into_iter().all(|id| {
            self.world
                .alive(id)
                .map_or(true, |e| !circles_overlap(e.pos, e.radius, pos, radius))
        })
    }

    /// Spawns a player near the centre and returns its id.
    pub fn connect(&mut self) -> EntityId {
        let center = self.world.center();
        let probe = Entity::player(center);
        let radius = probe.radius;
        let pos = (0..PLACEMENT_ATTEMPTS)
            .find_map(|attempt| {
                let spread = 20.0 + attempt as f32 * 6.0;
                let pos = center + self.world.rng.unit_vector() * self.world.rng.range_f32(0.0, spread);
                self.is_clear(pos, radius).then_some(pos)
            })
            .unwrap_or(center);

        let id = self.world.spawn(Entity::player(pos));
        self.world.emit(EventKind::PlayerJoined { player: id });
        info!("Player {} joined at ({:.0}, {:.0})", id, pos.x, pos.y);
        id
    }

    /// Removes a player together with anything it still had queued.
    /// Returns false for ids that are not players.
    pub fn disconnect(&mut self, player: EntityId) -> bool {
        if self.world.entity(player).and_then(|e| e.as_player()).is_none() {
            return false;
        }
        let released = release_reservations(&mut self.world, player);
        self.world.inbox.remove(&player);
        self.world.harvest_queue.retain(|id| *id != player);
        self.world.craft_queue.retain(|order| order.player != player);
        self.world.build_queue.retain(|order| match order {
            BuildOrder::Place { player: p, .. } | BuildOrder::Upgrade { player: p, .. } => *p != player,
        });
        self.world.despawn(player);
        self.world.emit(EventKind::PlayerLeft { player });
        info!("Player {} left ({} pickups released)", player, released);
        true
    }

    /// Buffers the latest command for `player`, replacing any earlier one.
    pub fn submit_input(&mut self, player: EntityId, cmd: InputCommand) -> bool {
        if self.world.alive(player).and_then(|e| e.as_player()).is_none() {
            return false;
        }
        self.world.inbox.insert(player, cmd);
        true
    }

    /// Runs one fixed tick. Returns a snapshot on send ticks.
    pub fn tick(&mut self) -> Result<Option<Snapshot>, TickError> {
        self.pipeline.run(&mut self.world);
        let tick = self.world.tick();
        self.world
            .check_integrity()
            .map_err(|source| TickError::Inconsistent { tick, source })?;
        self.outbound.extend(self.world.events.drain());

        if tick % SUMMARY_EVERY == 0 {
            debug!("{}", self.summary());
        }
        if tick % self.config.send_every() == 0 {
            Ok(Some(self.snapshot()))
        } else {
            Ok(None)
        }
    }

    /// Full state of every alive entity plus the events buffered since the
    /// last snapshot.
    pub fn snapshot(&mut self) -> Snapshot {
        let entities = self
            .world
            .ids()
            .into_iter()
            .filter_map(|id| self.world.alive(id))
            .map(entity_snapshot)
            .collect();
        Snapshot {
            tick: self.world.tick(),
            time_ms: self.world.time_ms(),
            entities,
            events: std::mem::take(&mut self.outbound),
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "Tick {} ({:.0}ms): {} players, {} enemies, {} projectiles, {} pickups, {} buildings, wave {} {:?}",
            self.world.tick(),
            self.world.time_ms(),
            self.world.count_of(EntityKind::Player),
            self.world.count_of(EntityKind::Enemy),
            self.world.count_of(EntityKind::Projectile),
            self.world.count_of(EntityKind::Pickup),
            self.world.count_of(EntityKind::Building),
            self.world.wave.wave(),
            self.world.wave.phase(),
        )
    }

    pub fn pending_events(&self) -> &[GameEvent] {
        &self.outbound
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }
}

pub fn entity_snapshot(entity: &Entity) -> EntitySnapshot {
    let health = entity.health();
    EntitySnapshot {
        id: entity.id,
        kind: entity.kind(),
        x: entity.pos.x,
        y: entity.pos.y,
        vx: entity.vel.x,
        vy: entity.vel.y,
        rotation: entity.facing,
        radius: entity.radius,
        health: health.map(|h| h.current),
        max_health: health.map(|h| h.max),
        owner: entity.owner,
        flags: entity.flags(),
    }
}
