// 2D coherent noise source for the terrain heightmap.
//
// The terrain builder only needs "a deterministic function from (x, y) to a
// value in [0, 1]", so that is the whole `Noise2D` contract. `PerlinField`
// is the production source: `noise::Perlin`, whose output is roughly
// [-1, 1], remapped to [0, 1] and clamped. Tests substitute tiny analytic
// sources (constants, ramps) to make height ranges predictable.

use ::noise::{NoiseFn, Perlin};

/// Deterministic 2D coherent noise with output in [0, 1].
pub trait Noise2D {
    fn sample(&self, x: f32, y: f32) -> f32;
}

/// Seeded Perlin noise remapped to [0, 1].
#[derive(Clone, Debug)]
pub struct PerlinField {
    perlin: Perlin,
    seed: u32,
}

impl PerlinField {
    pub fn new(seed: u32) -> Self {
        Self {
            perlin: Perlin::new(seed),
            seed,
        }
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }
}

impl Noise2D for PerlinField {
    fn sample(&self, x: f32, y: f32) -> f32 {
        let raw = self.perlin.get([x as f64, y as f64]);
        (raw * 0.5 + 0.5).clamp(0.0, 1.0) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perlin_stays_in_unit_range() {
        let field = PerlinField::new(7);
        for i in 0..2000 {
            let x = i as f32 * 0.37 + 100.0;
            let y = i as f32 * 0.91 - 50.0;
            let v = field.sample(x, y);
            assert!((0.0..=1.0).contains(&v), "sample out of range: {v}");
        }
    }

    #[test]
    fn perlin_is_deterministic_per_seed() {
        let a = PerlinField::new(3);
        let b = PerlinField::new(3);
        for i in 0..100 {
            let p = (i as f32 * 1.3 + 0.25, i as f32 * 0.7 + 0.5);
            assert_eq!(a.sample(p.0, p.1), b.sample(p.0, p.1));
        }
    }

    #[test]
    fn perlin_varies_between_nearby_samples() {
        let field = PerlinField::new(11);
        let samples: Vec<f32> = (0..50)
            .map(|i| field.sample(i as f32 * 0.13 + 0.5, 3.3))
            .collect();
        let min = samples.iter().cloned().fold(f32::INFINITY, f32::min);
        let max = samples.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        assert!(max - min > 0.01, "noise looks constant: [{min}, {max}]");
    }
}
