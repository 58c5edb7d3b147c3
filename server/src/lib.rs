//! # Holdout Server Library
//!
//! Authoritative simulation core for a real-time multiplayer survival and
//! defense game. Players gather resources, craft, and build walls and
//! towers while waves of hostile enemies march on the centre of the map.
//!
//! ## Core Responsibilities
//!
//! ### Fixed-Tick Simulation
//! The world advances in fixed steps. `World::step` is the only place the
//! tick counter moves, and simulation time is always `tick * dt_ms`, so the
//! clock never drifts regardless of how late the host wakes up.
//!
//! ### Ordered System Pipeline
//! Each tick runs the same stages in the same order: input, AI, movement,
//! collision, projectiles, combat, status effects, building, resources,
//! crafting and waves. Dead entities are flushed from the store at the end
//! of the tick in which they died.
//!
//! ### Goal-Based AI
//! Enemies own a `GoalSelector` with prioritized goals competing for the
//! `Move`, `Look` and `Attack` control channels. At most one active goal
//! holds a channel at any time.
//!
//! ## Module Organization
//!
//! ### World (`world`, `store`, `spatial`, `events`)
//! Entity store grouped by kind, a uniform-grid spatial index, the per-tick
//! event bus and the request queues systems use to hand work to each other.
//!
//! ### Systems (`systems`)
//! Stateless stages over the world, assembled by `Pipeline::standard`.
//!
//! ### AI (`ai`, `targeting`)
//! The goal selector, built-in goals and the target queries shared by
//! enemies and towers.
//!
//! ### Definitions (`defs`, `components`, `inventory`, `entity`)
//! Static tuning tables and the data carried by each entity kind.
//!
//! ### Driving the simulation (`game`, `scheduler`)
//! `Game` owns one world and its pipeline and exposes the connection hooks.
//! `TickScheduler` fires ticks on an absolute schedule.
//!
//! ### Transport (`network`, `client_manager`)
//! A thin UDP front-end that maps addresses to player entities and forwards
//! packets into the simulation task between ticks.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::SimConfig;
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut server = Server::new("127.0.0.1:8080", SimConfig::default()).await?;
//!
//!     // Stop the tick loop on Ctrl+C; `run` returns once it has stopped.
//!     let handle = server.scheduler_handle();
//!     tokio::spawn(async move {
//!         let _ = tokio::signal::ctrl_c().await;
//!         handle.stop();
//!     });
//!
//!     server.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! The simulation can also be driven without any networking:
//!
//! ```rust
//! use server::config::SimConfig;
//! use server::game::Game;
//!
//! let mut game = Game::new(SimConfig::default()).unwrap();
//! let player = game.connect();
//! for _ in 0..30 {
//!     game.tick().unwrap();
//! }
//! assert!(game.world().is_alive(player));
//! ```

pub mod ai;
pub mod client_manager;
pub mod components;
pub mod config;
pub mod defs;
pub mod entity;
pub mod events;
pub mod game;
pub mod inventory;
pub mod math;
pub mod network;
pub mod rng;
pub mod scheduler;
pub mod spatial;
pub mod store;
pub mod systems;
pub mod targeting;
pub mod world;
