//! Storage-engine benchmarks using criterion for historical comparison.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use lattice_ecs::{Entity, World};

#[derive(Clone, Copy)]
struct Position {
    x: f32,
    y: f32,
    z: f32,
}

#[derive(Clone, Copy)]
struct Velocity {
    x: f32,
    y: f32,
    z: f32,
}

fn create_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("create");

    for count in [100u64, 1000, 10000] {
        group.throughput(Throughput::Elements(count));

        group.bench_with_input(BenchmarkId::new("empty", count), &count, |b, &count| {
            b.iter(|| {
                let mut world = World::new();
                for _ in 0..count {
                    black_box(world.create().unwrap());
                }
            });
        });

        group.bench_with_input(
            BenchmarkId::new("with_position", count),
            &count,
            |b, &count| {
                b.iter(|| {
                    let mut world = World::new();
                    for i in 0..count {
                        black_box(
                            world
                                .create_with((Position {
                                    x: i as f32,
                                    y: 0.0,
                                    z: 0.0,
                                },))
                                .unwrap(),
                        );
                    }
                });
            },
        );
    }

    group.finish();
}

fn component_access_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("component_access");

    for count in [100u64, 1000, 10000] {
        group.throughput(Throughput::Elements(count));

        group.bench_with_input(BenchmarkId::new("get", count), &count, |b, &count| {
            let mut world = World::new();
            let entities: Vec<Entity> = (0..count)
                .map(|i| {
                    world
                        .create_with((Position {
                            x: i as f32,
                            y: 0.0,
                            z: 0.0,
                        },))
                        .unwrap()
                })
                .collect();

            b.iter(|| {
                for &entity in &entities {
                    black_box(world.get::<(Position,)>(entity));
                }
            });
        });
    }

    group.finish();
}

fn view_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("view");

    for count in [100u64, 1000, 10000] {
        group.throughput(Throughput::Elements(count));

        group.bench_with_input(BenchmarkId::new("iterate", count), &count, |b, &count| {
            let mut world = World::new();
            for i in 0..count {
                world
                    .create_with((
                        Position {
                            x: i as f32,
                            y: 0.0,
                            z: 0.0,
                        },
                        Velocity {
                            x: 1.0,
                            y: 1.0,
                            z: 1.0,
                        },
                    ))
                    .unwrap();
            }
            // Group construction happens once, outside the measurement.
            let _ = world.view::<(Position, Velocity)>();

            b.iter(|| {
                let view = world.view::<(Position, Velocity)>();
                for entity in &view {
                    let (position, velocity) = view.get(entity);
                    black_box((position.x + velocity.x, position.y, velocity.z));
                }
            });
        });

        group.bench_with_input(
            BenchmarkId::new("iterate_mut", count),
            &count,
            |b, &count| {
                let mut world = World::new();
                for i in 0..count {
                    world
                        .create_with((
                            Position {
                                x: i as f32,
                                y: 0.0,
                                z: 0.0,
                            },
                            Velocity {
                                x: 1.0,
                                y: 1.0,
                                z: 1.0,
                            },
                        ))
                        .unwrap();
                }
                let _ = world.view::<(Position, Velocity)>();

                b.iter(|| {
                    let mut view = world.view_mut::<(Position, Velocity)>();
                    view.for_each(|_, (position, velocity)| {
                        position.x += velocity.x;
                        position.y += velocity.y;
                        position.z += velocity.z;
                    });
                });
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    create_benchmarks,
    component_access_benchmarks,
    view_benchmarks
);
criterion_main!(benches);
