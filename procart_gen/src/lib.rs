// procart_gen: procedural terrain meshes and branching trees.
//
// This crate holds all generation logic: the noise-driven heightmap mesh
// builder with gradient coloring, the recursive branching tree with runtime
// growth and pruning, the sway animation, and the `Studio` that schedules
// all of it on a single-threaded tick loop. It has no renderer dependency;
// visuals are reached through the `VisualHost` trait.
//
// Module overview:
// - `studio.rs`:      Studio state, tick loop, command/event processing.
// - `terrain.rs`:     TerrainMesh, HeightRange, resumable TerrainJob, triangulation, colorization.
// - `noise_field.rs`: Noise2D trait + PerlinField (noise crate, remapped to [0, 1]).
// - `gradient.rs`:    ColorRamp trait, keyed Gradient, ColorVariant presets.
// - `tree.rs`:        BranchTree arena: subdivide, grow, cull, teardown, handle lookup.
// - `tree_gen.rs`:    TreeGrowthJob, the breadth-first initial pass.
// - `sway.rs`:        Per-tick sway of trunk and terminal visuals.
// - `visual.rs`:      VisualHost trait + in-memory SceneHost.
// - `command.rs`:     StudioCommand / StudioAction, all external mutations.
// - `event.rs`:       EventQueue (priority queue) + output StudioEvents.
// - `config.rs`:      StudioConfig and nested parameter blocks, with presets.
// - `error.rs`:       GenError.
// - `prng`:           Re-exported from `procart_prng`, xoshiro256++ with SplitMix64 seeding.
// - `types.rs`:       NodeId, VisualHandle, Transform, Rgba, look_rotation.
//
// **Critical constraint: determinism.** All randomness comes from a seeded
// `ArtRng`. Registries are `BTreeMap`s so iteration order is stable; the
// only hash map is the handle index, which is never iterated.

pub mod command;
pub mod config;
pub mod error;
pub mod event;
pub mod gradient;
pub mod noise_field;
pub use procart_prng as prng;
pub mod studio;
pub mod sway;
pub mod terrain;
pub mod tree;
pub mod tree_gen;
pub mod types;
pub mod visual;
