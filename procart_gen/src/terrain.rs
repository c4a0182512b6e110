// Noise-driven heightmap terrain meshes.
//
// Builds a regular grid mesh of `(width + 1) * (depth + 1)` vertices whose
// heights come from a `Noise2D` sample, then colors every vertex through a
// `ColorRamp` by its normalized height. Output is a `TerrainMesh`: vertex
// positions, triangle indices and per-vertex colors, ready for a renderer
// (normals are the renderer's job).
//
// Generation is split into three passes, each resumable one row at a time by
// `TerrainJob::step()`:
//
//   1. Sampling:      vertex row `z` (z-outer, x-inner). Vertex `(x, h, z)`
//                      with `h = noise(x * scale + offset_x,
//                      z * scale + offset_y) * amplitude - 1`. Each height is
//                      folded into a `HeightRange` accumulator.
//   2. Triangulating: cell row `z`. Cell with lower-left vertex `v` emits
//                      `{v, v+w+1, v+1}` and `{v+1, v+w+1, v+w+2}` where
//                      `w = width`. This winding must not change.
//   3. Colorizing:    vertex row `z`, using the *final* range from pass 1:
//                      `t = (h - min) / (max - min)` clamped to [0, 1].
//
// Colorizing never starts before sampling has visited every vertex, so every
// color is computed against the same completed range.
//
// `generate_terrain()` runs a job to completion in one call.
// `reroll_for_variant()` draws the fresh offsets and amplitude a color
// variant uses when regenerating.
//
// See also: `config.rs` for `TerrainParams`, `gradient.rs` for ramps and
// variants, `studio.rs` which drives jobs one row per work tick.

use crate::config::TerrainParams;
use crate::error::GenResult;
use crate::gradient::{ColorRamp, ColorVariant};
use crate::noise_field::Noise2D;
use crate::types::{Progress, Rgba};
use glam::Vec3;
use procart_prng::RandomSource;
use serde::{Deserialize, Serialize};

/// Upper (exclusive) bound of the noise offsets drawn on regeneration.
pub const OFFSET_MAX: f32 = 99_999.0;

// ---------------------------------------------------------------------------
// Height range accumulator
// ---------------------------------------------------------------------------

/// Running `[min, max]` of heights seen so far.
///
/// Starts empty (`min = +inf`, `max = -inf`) so, once anything has been
/// included, both bounds are values that were actually seen.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HeightRange {
    pub min: f32,
    pub max: f32,
}

impl HeightRange {
    pub const EMPTY: Self = Self {
        min: f32::INFINITY,
        max: f32::NEG_INFINITY,
    };

    pub fn is_empty(&self) -> bool {
        self.min > self.max
    }

    pub fn include(&mut self, h: f32) {
        self.min = self.min.min(h);
        self.max = self.max.max(h);
    }

    pub fn contains(&self, h: f32) -> bool {
        self.min <= h && h <= self.max
    }

    /// Position of `h` within the range, clamped to [0, 1]. A flat or empty
    /// range maps everything to 0.
    pub fn normalize(&self, h: f32) -> f32 {
        let span = self.max - self.min;
        if !(span.is_finite() && span > 0.0) {
            return 0.0;
        }
        ((h - self.min) / span).clamp(0.0, 1.0)
    }
}

impl Default for HeightRange {
    fn default() -> Self {
        Self::EMPTY
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Finished terrain geometry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TerrainMesh {
    pub width: u32,
    pub depth: u32,
    /// One vertex per grid intersection, index `z * (width + 1) + x`.
    pub vertices: Vec<Vec3>,
    /// Vertex-index triples, two triangles per cell.
    pub triangles: Vec<u32>,
    /// One color per vertex, parallel to `vertices`.
    pub colors: Vec<Rgba>,
    pub height_range: HeightRange,
}

impl TerrainMesh {
    /// Linear index of the vertex at grid column `x`, row `z`.
    pub fn vertex_index(&self, x: u32, z: u32) -> usize {
        z as usize * (self.width as usize + 1) + x as usize
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len() / 3
    }

    /// Vertex positions as flat `[x, y, z, x, y, z, ...]`.
    pub fn positions_flat(&self) -> Vec<f32> {
        self.vertices.iter().flat_map(|v| v.to_array()).collect()
    }

    /// Vertex colors as flat `[r, g, b, a, ...]`.
    pub fn colors_flat(&self) -> Vec<f32> {
        self.colors.iter().flat_map(|c| [c.r, c.g, c.b, c.a]).collect()
    }
}

// ---------------------------------------------------------------------------
// Passes
// ---------------------------------------------------------------------------

/// Sample one row of vertices into `vertices`, folding heights into `range`.
pub fn sample_row<N: Noise2D + ?Sized>(
    params: &TerrainParams,
    noise: &N,
    z: u32,
    vertices: &mut Vec<Vec3>,
    range: &mut HeightRange,
) {
    let sample_y = z as f32 * params.scale + params.offset_y;
    for x in 0..=params.width {
        let sample_x = x as f32 * params.scale + params.offset_x;
        let h = noise.sample(sample_x, sample_y) * params.height_amplitude - 1.0;
        range.include(h);
        vertices.push(Vec3::new(x as f32, h, z as f32));
    }
}

/// Append the two triangles of every cell in cell row `z`.
pub fn triangulate_row(width: u32, z: u32, triangles: &mut Vec<u32>) {
    let stride = width + 1;
    for x in 0..width {
        let v = z * stride + x;
        triangles.extend_from_slice(&[v, v + stride, v + 1, v + 1, v + stride, v + stride + 1]);
    }
}

/// Index buffer for a `width` x `depth` cell grid.
pub fn triangulate(width: u32, depth: u32) -> Vec<u32> {
    let mut triangles = Vec::with_capacity(width as usize * depth as usize * 6);
    for z in 0..depth {
        triangulate_row(width, z, &mut triangles);
    }
    triangles
}

/// Color every vertex by its height within the completed `range`.
pub fn colorize<C: ColorRamp + ?Sized>(
    vertices: &[Vec3],
    range: &HeightRange,
    ramp: &C,
) -> Vec<Rgba> {
    vertices
        .iter()
        .map(|v| ramp.evaluate(range.normalize(v.y)))
        .collect()
}

/// Fresh terrain parameters for a color variant: new random noise offsets
/// in `[0, OFFSET_MAX)` and a new integer amplitude from the variant's range.
///
/// Draw order is `offset_x`, `offset_y`, amplitude.
pub fn reroll_for_variant<R: RandomSource + ?Sized>(
    base: &TerrainParams,
    variant: ColorVariant,
    rng: &mut R,
) -> TerrainParams {
    let offset_x = rng.range_f32(0.0, OFFSET_MAX);
    let offset_y = rng.range_f32(0.0, OFFSET_MAX);
    let (lo, hi) = variant.amplitude_range();
    let amplitude = rng.range_i32(lo, hi);
    TerrainParams {
        offset_x,
        offset_y,
        height_amplitude: amplitude as f32,
        ..base.clone()
    }
}

// ---------------------------------------------------------------------------
// Resumable job
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Sampling { row: u32 },
    Triangulating { row: u32 },
    Colorizing { row: u32 },
    Done,
}

/// Terrain generation that advances one row per `step()`.
///
/// A job owns its buffers outright. Abandoning a job (dropping it, or
/// replacing it with a new one) discards them; nothing is shared between
/// generations.
#[derive(Clone, Debug)]
pub struct TerrainJob {
    params: TerrainParams,
    phase: Phase,
    vertices: Vec<Vec3>,
    triangles: Vec<u32>,
    colors: Vec<Rgba>,
    range: HeightRange,
}

impl TerrainJob {
    /// Start a job. Fails on invalid parameters.
    pub fn new(params: TerrainParams) -> GenResult<Self> {
        params.validate()?;
        let vertex_count = params.vertex_count();
        let index_count = params.width as usize * params.depth as usize * 6;
        Ok(Self {
            params,
            phase: Phase::Sampling { row: 0 },
            vertices: Vec::with_capacity(vertex_count),
            triangles: Vec::with_capacity(index_count),
            colors: Vec::with_capacity(vertex_count),
            range: HeightRange::EMPTY,
        })
    }

    pub fn params(&self) -> &TerrainParams {
        &self.params
    }

    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Done
    }

    /// Height range accumulated so far. Partial until sampling completes.
    pub fn height_range(&self) -> HeightRange {
        self.range
    }

    /// Perform one row of work.
    pub fn step<N, C>(&mut self, noise: &N, ramp: &C) -> Progress
    where
        N: Noise2D + ?Sized,
        C: ColorRamp + ?Sized,
    {
        let p = &self.params;
        self.phase = match self.phase {
            Phase::Sampling { row } => {
                sample_row(p, noise, row, &mut self.vertices, &mut self.range);
                if row < p.depth {
                    Phase::Sampling { row: row + 1 }
                } else if p.depth > 0 {
                    Phase::Triangulating { row: 0 }
                } else {
                    Phase::Colorizing { row: 0 }
                }
            }
            Phase::Triangulating { row } => {
                triangulate_row(p.width, row, &mut self.triangles);
                if row + 1 < p.depth {
                    Phase::Triangulating { row: row + 1 }
                } else {
                    Phase::Colorizing { row: 0 }
                }
            }
            Phase::Colorizing { row } => {
                let stride = p.width as usize + 1;
                let start = row as usize * stride;
                let row_vertices = &self.vertices[start..start + stride];
                self.colors.extend(colorize(row_vertices, &self.range, ramp));
                if row < p.depth {
                    Phase::Colorizing { row: row + 1 }
                } else {
                    tracing::debug!(
                        width = p.width,
                        depth = p.depth,
                        min = self.range.min,
                        max = self.range.max,
                        "terrain mesh complete"
                    );
                    Phase::Done
                }
            }
            Phase::Done => Phase::Done,
        };
        if self.is_finished() {
            Progress::Finished
        } else {
            Progress::Working
        }
    }

    /// Take the finished mesh. Returns `None` (dropping the partial buffers)
    /// if the job has not finished.
    pub fn finish(self) -> Option<TerrainMesh> {
        if !self.is_finished() {
            return None;
        }
        Some(self.into_mesh())
    }

    fn into_mesh(self) -> TerrainMesh {
        TerrainMesh {
            width: self.params.width,
            depth: self.params.depth,
            vertices: self.vertices,
            triangles: self.triangles,
            colors: self.colors,
            height_range: self.range,
        }
    }

    /// Number of `step()` calls a job with these dimensions takes.
    pub fn total_steps(params: &TerrainParams) -> u64 {
        let rows = params.depth as u64 + 1;
        rows + params.depth as u64 + rows
    }
}

/// Generate a complete terrain mesh in one call.
pub fn generate_terrain<N, C>(params: &TerrainParams, noise: &N, ramp: &C) -> GenResult<TerrainMesh>
where
    N: Noise2D + ?Sized,
    C: ColorRamp + ?Sized,
{
    let mut job = TerrainJob::new(params.clone())?;
    while job.step(noise, ramp) == Progress::Working {}
    Ok(job.into_mesh())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GenError;
    use crate::noise_field::PerlinField;
    use procart_prng::ArtRng;

    /// Ramp that stores its input in the red channel.
    struct Probe;

    impl ColorRamp for Probe {
        fn evaluate(&self, t: f32) -> Rgba {
            Rgba::new(t, 0.0, 0.0, 1.0)
        }
    }

    struct Constant(f32);

    impl Noise2D for Constant {
        fn sample(&self, _x: f32, _y: f32) -> f32 {
            self.0
        }
    }

    /// Noise that rises along the sampled x coordinate.
    struct RampX;

    impl Noise2D for RampX {
        fn sample(&self, x: f32, _y: f32) -> f32 {
            (x / 10.0).clamp(0.0, 1.0)
        }
    }

    fn params(width: u32, depth: u32) -> TerrainParams {
        TerrainParams {
            width,
            depth,
            scale: 0.3,
            offset_x: 12.5,
            offset_y: 40.25,
            height_amplitude: 7.0,
        }
    }

    #[test]
    fn two_by_one_grid_matches_reference_layout() {
        let mesh = generate_terrain(&params(2, 1), &PerlinField::new(1), &Probe).unwrap();
        assert_eq!(mesh.vertices.len(), 6);
        assert_eq!(mesh.triangles, vec![0, 3, 1, 1, 3, 4, 1, 4, 2, 2, 4, 5]);
    }

    #[test]
    fn triangle_count_and_index_bounds() {
        for (w, d) in [(1, 1), (3, 2), (7, 5), (16, 1)] {
            let tris = triangulate(w, d);
            assert_eq!(tris.len(), (w * d * 6) as usize);
            let vcount = (w + 1) * (d + 1);
            assert!(tris.iter().all(|&i| i < vcount), "index out of range for {w}x{d}");
        }
    }

    #[test]
    fn vertices_are_laid_out_row_major() {
        let mesh = generate_terrain(&params(4, 3), &PerlinField::new(2), &Probe).unwrap();
        for z in 0..=3 {
            for x in 0..=4 {
                let v = mesh.vertices[mesh.vertex_index(x, z)];
                assert_eq!((v.x, v.z), (x as f32, z as f32));
            }
        }
    }

    #[test]
    fn heights_apply_amplitude_and_bias() {
        let p = params(2, 2);
        let mesh = generate_terrain(&p, &Constant(0.5), &Probe).unwrap();
        for v in &mesh.vertices {
            assert!((v.y - (0.5 * 7.0 - 1.0)).abs() < 1e-6);
        }
    }

    #[test]
    fn height_range_is_closed_over_vertices() {
        let mesh = generate_terrain(&params(20, 15), &PerlinField::new(9), &Probe).unwrap();
        let range = mesh.height_range;
        assert!(mesh.vertices.iter().all(|v| range.contains(v.y)));
        assert!(mesh.vertices.iter().any(|v| v.y == range.min));
        assert!(mesh.vertices.iter().any(|v| v.y == range.max));
    }

    #[test]
    fn extreme_vertices_map_to_ramp_ends() {
        let mesh = generate_terrain(&params(20, 15), &PerlinField::new(4), &Probe).unwrap();
        let range = mesh.height_range;
        assert!(range.max > range.min);
        for (v, c) in mesh.vertices.iter().zip(&mesh.colors) {
            if v.y == range.min {
                assert_eq!(c.r, 0.0);
            }
            if v.y == range.max {
                assert_eq!(c.r, 1.0);
            }
            assert!((0.0..=1.0).contains(&c.r));
        }
    }

    #[test]
    fn colors_use_the_final_range_not_a_partial_one() {
        // With heights rising along x, the first vertex sampled is the lowest
        // and the last is the highest. Colors computed during sampling would
        // give every vertex t = 1 (each is the max seen so far).
        let p = TerrainParams {
            scale: 1.0,
            offset_x: 0.0,
            offset_y: 0.0,
            ..params(10, 0)
        };
        let mesh = generate_terrain(&p, &RampX, &Probe).unwrap();
        let reds: Vec<f32> = mesh.colors.iter().map(|c| c.r).collect();
        assert_eq!(reds[0], 0.0);
        assert_eq!(reds[10], 1.0);
        assert!((reds[5] - 0.5).abs() < 1e-5);
    }

    #[test]
    fn flat_noise_yields_finite_colors() {
        let mesh = generate_terrain(&params(3, 3), &Constant(0.2), &Probe).unwrap();
        assert_eq!(mesh.height_range.min, mesh.height_range.max);
        assert!(mesh.colors.iter().all(|c| c.r == 0.0));
    }

    #[test]
    fn zero_width_mesh_is_degenerate_but_valid() {
        let mesh = generate_terrain(&params(0, 4), &PerlinField::new(3), &Probe).unwrap();
        assert_eq!(mesh.vertices.len(), 5);
        assert!(mesh.triangles.is_empty());
        assert_eq!(mesh.colors.len(), 5);

        let mesh = generate_terrain(&params(0, 0), &PerlinField::new(3), &Probe).unwrap();
        assert_eq!(mesh.vertices.len(), 1);
        assert_eq!(mesh.colors.len(), 1);
    }

    #[test]
    fn invalid_amplitude_fails_fast() {
        let p = TerrainParams {
            height_amplitude: f32::NAN,
            ..params(4, 4)
        };
        assert!(matches!(
            TerrainJob::new(p),
            Err(GenError::InvalidArgument(_))
        ));
    }

    #[test]
    fn job_advances_one_row_per_step() {
        let p = params(5, 4);
        let noise = PerlinField::new(5);
        let mut job = TerrainJob::new(p.clone()).unwrap();
        let mut steps = 0;
        loop {
            steps += 1;
            if job.step(&noise, &Probe) == Progress::Finished {
                break;
            }
            assert!(job.clone().finish().is_none());
        }
        assert_eq!(steps, TerrainJob::total_steps(&p));
        let stepped = job.finish().unwrap();
        let direct = generate_terrain(&p, &noise, &Probe).unwrap();
        assert_eq!(stepped, direct);
    }

    #[test]
    fn sampling_finishes_before_any_color() {
        let p = params(3, 2);
        let noise = PerlinField::new(6);
        let mut job = TerrainJob::new(p.clone()).unwrap();
        for _ in 0..=p.depth {
            job.step(&noise, &Probe);
            assert!(job.colors.is_empty());
        }
        assert_eq!(job.vertices.len(), p.vertex_count());
    }

    /// Records the bounds it was asked for and replays fixed values.
    struct Scripted {
        floats: Vec<f32>,
        ints: Vec<i32>,
        calls: Vec<(f32, f32)>,
        int_calls: Vec<(i32, i32)>,
    }

    impl RandomSource for Scripted {
        fn range_f32(&mut self, low: f32, high: f32) -> f32 {
            self.calls.push((low, high));
            self.floats.remove(0)
        }

        fn range_i32(&mut self, low: i32, high: i32) -> i32 {
            self.int_calls.push((low, high));
            self.ints.remove(0)
        }
    }

    #[test]
    fn reroll_draws_offsets_then_amplitude_in_variant_bounds() {
        let mut rng = Scripted {
            floats: vec![11.0, 22.0],
            ints: vec![6],
            calls: vec![],
            int_calls: vec![],
        };
        let base = params(8, 8);
        let p = reroll_for_variant(&base, ColorVariant::B, &mut rng);
        assert_eq!((p.offset_x, p.offset_y, p.height_amplitude), (11.0, 22.0, 6.0));
        assert_eq!(rng.calls, vec![(0.0, OFFSET_MAX), (0.0, OFFSET_MAX)]);
        assert_eq!(rng.int_calls, vec![(5, 10)]);
        assert_eq!((p.width, p.depth, p.scale), (8, 8, 0.3));
    }

    #[test]
    fn reroll_with_real_rng_respects_variant_a_range() {
        let mut rng = ArtRng::new(31);
        for _ in 0..200 {
            let p = reroll_for_variant(&params(2, 2), ColorVariant::A, &mut rng);
            assert!((4.0..11.0).contains(&p.height_amplitude));
            assert_eq!(p.height_amplitude.fract(), 0.0);
            assert!((0.0..OFFSET_MAX).contains(&p.offset_x));
        }
    }
}
