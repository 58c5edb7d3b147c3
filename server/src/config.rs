use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tunables for one server instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    /// Simulation ticks per second.
    pub tick_rate: u32,
    /// Snapshots per second; at most `tick_rate`.
    pub send_rate: u32,
    pub world_width: f32,
    pub world_height: f32,
    /// Spatial grid cell edge in world units.
    pub cell_size: f32,
    pub seed: u64,
    /// Per-tick velocity decay factor in `[0, 1]`.
    pub friction: f32,
    pub max_players: usize,
    pub first_wave_delay_ms: f64,
    pub intermission_ms: f64,
    /// Populate the map with resource nodes on start.
    pub spawn_resources: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tick_rate: shared::DEFAULT_TICK_RATE,
            send_rate: shared::DEFAULT_SEND_RATE,
            world_width: shared::WORLD_WIDTH,
            world_height: shared::WORLD_HEIGHT,
            cell_size: 64.0,
            seed: 42,
            friction: 0.8,
            max_players: 16,
            first_wave_delay_ms: 10_000.0,
            intermission_ms: 20_000.0,
            spawn_resources: true,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("tick rate must be positive")]
    ZeroTickRate,
    #[error("send rate must be between 1 and the tick rate ({tick_rate}), got {send_rate}")]
    BadSendRate { send_rate: u32, tick_rate: u32 },
    #[error("world dimensions must be positive and finite")]
    BadWorldSize,
    #[error("cell size must be positive and finite")]
    BadCellSize,
    #[error("friction must be within [0, 1]")]
    BadFriction,
}

impl SimConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_rate == 0 {
            return Err(ConfigError::ZeroTickRate);
        }
        if self.send_rate == 0 || self.send_rate > self.tick_rate {
            return Err(ConfigError::BadSendRate {
                send_rate: self.send_rate,
                tick_rate: self.tick_rate,
            });
        }
        let positive = |v: f32| v.is_finite() && v > 0.0;
        if !positive(self.world_width) || !positive(self.world_height) {
            return Err(ConfigError::BadWorldSize);
        }
        if !positive(self.cell_size) {
            return Err(ConfigError::BadCellSize);
        }
        if !(0.0..=1.0).contains(&self.friction) {
            return Err(ConfigError::BadFriction);
        }
        Ok(())
    }

    /// Fixed logical tick length.
    pub fn dt_ms(&self) -> f64 {
        1000.0 / self.tick_rate as f64
    }

    /// Ticks between snapshot hand-offs.
    pub fn send_every(&self) -> u64 {
        ((self.tick_rate as f64 / self.send_rate.max(1) as f64).round() as u64).max(1)
    }
}
