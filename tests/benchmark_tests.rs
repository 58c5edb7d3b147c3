//! Performance benchmarks for critical simulation paths

use server::config::SimConfig;
use server::defs::{enemy_def, EnemyKind};
use server::entity::Entity;
use server::game::Game;
use server::math::Vec2;
use server::spatial::SpatialIndex;
use server::systems::Pipeline;
use server::world::World;
use shared::{decode, encode, EntityId, InputCommand, Packet};
use std::time::Instant;

fn grid_positions(count: usize, spacing: f32) -> Vec<Vec2> {
    let per_row = (count as f32).sqrt().ceil() as usize;
    (0..count)
        .map(|i| Vec2::new(40.0 + (i % per_row) as f32 * spacing, 40.0 + (i / per_row) as f32 * spacing))
        .collect()
}

/// Benchmarks spatial index updates and circle queries
#[test]
fn benchmark_spatial_index() {
    let mut index = SpatialIndex::new(64.0);
    let positions = grid_positions(1000, 50.0);
    for (i, pos) in positions.iter().enumerate() {
        index.insert(EntityId(i as u64 + 1), *pos, 12.0);
    }

    let iterations = 10_000;
    let start = Instant::now();
    let mut found = 0;
    for i in 0..iterations {
        let pos = positions[i % positions.len()];
        let id = EntityId((i % positions.len()) as u64 + 1);
        index.update(id, pos + Vec2::new(1.0, 0.0), 12.0);
        let hits = index.query_circle(pos.x, pos.y, 100.0);
        assert!(hits.contains(&id));
        found += hits.len();
        index.update(id, pos, 12.0);
    }

    let duration = start.elapsed();
    println!(
        "Spatial index: {} update/query pairs in {:?} ({:.2} μs/iter, {} hits)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64,
        found
    );

    // Should complete in under 2 seconds
    assert!(duration.as_millis() < 2000);
}

/// Benchmarks full pipeline ticks with a crowded field
#[test]
fn benchmark_full_tick() {
    let mut world = World::new(&SimConfig {
        spawn_resources: false,
        first_wave_delay_ms: 1_000_000.0,
        ..Default::default()
    });
    let mut pipeline = Pipeline::standard();
    let center = world.center();
    for pos in grid_positions(16, 60.0) {
        world.spawn(Entity::player(center + pos - Vec2::new(120.0, 120.0)));
    }
    for (i, pos) in grid_positions(200, 45.0).into_iter().enumerate() {
        let kind = if i % 3 == 0 { EnemyKind::Archer } else { EnemyKind::Grunt };
        world.spawn(Entity::enemy(&enemy_def(kind), pos, 1.0, center));
    }

    let iterations = 300;
    let start = Instant::now();
    for _ in 0..iterations {
        pipeline.run(&mut world);
        world.events.drain();
    }

    let duration = start.elapsed();
    println!(
        "Full tick: {} entities × {} ticks in {:?} ({:.2} ms/tick)",
        world.entity_count(),
        iterations,
        duration,
        duration.as_secs_f64() * 1000.0 / iterations as f64
    );
    assert!(world.check_integrity().is_ok());

    // Should complete in under 20 seconds even in debug builds
    assert!(duration.as_secs() < 20);
}

/// Benchmarks snapshot building and encoding
#[test]
fn benchmark_snapshot_encoding() {
    let mut game = Game::new(SimConfig::default()).unwrap();
    let players: Vec<EntityId> = (0..16).map(|_| game.connect()).collect();
    for (i, player) in players.iter().enumerate() {
        game.submit_input(
            *player,
            InputCommand {
                sequence: 1,
                move_x: if i % 2 == 0 { 1.0 } else { -1.0 },
                ..Default::default()
            },
        );
    }
    game.tick().unwrap();

    let iterations = 1_000;
    let start = Instant::now();
    let mut bytes = 0;
    for _ in 0..iterations {
        let packet = Packet::Snapshot(game.snapshot());
        let data = encode(&packet).unwrap();
        bytes = data.len();
        let _decoded = decode(&data).unwrap();
    }

    let duration = start.elapsed();
    println!(
        "Snapshot encoding: {} iterations in {:?} ({:.2} μs/iter, {} bytes)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64,
        bytes
    );

    // Should complete in under 5 seconds
    assert!(duration.as_millis() < 5000);
}
