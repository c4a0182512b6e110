// Color ramps for terrain vertex coloring.
//
// `ColorRamp` is the lookup the colorization pass calls with a normalized
// height in [0, 1]. `Gradient` implements it as a list of color keys sorted
// by position with linear blending between neighbors; positions outside the
// first/last key take that key's color.
//
// `ColorVariant` names the two built-in terrain looks. A variant selects
// both a gradient preset and the integer range its height amplitude is drawn
// from when terrain is regenerated:
//   A ("dusk pink"):    amplitude in [4, 11)
//   B ("glacier blue"): amplitude in [5, 10)

use crate::error::{GenError, GenResult};
use crate::types::Rgba;
use serde::{Deserialize, Serialize};

/// Maps a normalized height to a vertex color.
pub trait ColorRamp {
    fn evaluate(&self, t: f32) -> Rgba;
}

/// One color stop of a `Gradient`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GradientKey {
    /// Position of the stop in [0, 1].
    pub time: f32,
    pub color: Rgba,
}

/// Piecewise-linear color ramp.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Gradient {
    keys: Vec<GradientKey>,
}

impl Gradient {
    /// Build a gradient from keys in any order.
    ///
    /// Fails if there are no keys or any key time is outside [0, 1].
    pub fn new(mut keys: Vec<GradientKey>) -> GenResult<Self> {
        if keys.is_empty() {
            return Err(GenError::invalid("gradient needs at least one key"));
        }
        if let Some(bad) = keys.iter().find(|k| !(0.0..=1.0).contains(&k.time)) {
            return Err(GenError::invalid(format!(
                "gradient key time {} is outside [0, 1]",
                bad.time
            )));
        }
        keys.sort_by(|a, b| a.time.total_cmp(&b.time));
        Ok(Self { keys })
    }

    /// Built-in presets are known-good, so they skip validation.
    fn preset(stops: &[(f32, Rgba)]) -> Self {
        Self {
            keys: stops
                .iter()
                .map(|&(time, color)| GradientKey { time, color })
                .collect(),
        }
    }

    pub fn keys(&self) -> &[GradientKey] {
        &self.keys
    }
}

impl ColorRamp for Gradient {
    fn evaluate(&self, t: f32) -> Rgba {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        let first = self.keys[0];
        if t <= first.time {
            return first.color;
        }
        for pair in self.keys.windows(2) {
            let (lo, hi) = (pair[0], pair[1]);
            if t <= hi.time {
                let span = hi.time - lo.time;
                if span <= f32::EPSILON {
                    return hi.color;
                }
                return lo.color.lerp(hi.color, (t - lo.time) / span);
            }
        }
        self.keys[self.keys.len() - 1].color
    }
}

// ---------------------------------------------------------------------------
// Variants
// ---------------------------------------------------------------------------

/// The two built-in terrain colorings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColorVariant {
    A,
    B,
}

impl ColorVariant {
    /// Half-open integer range the height amplitude is drawn from when this
    /// variant regenerates terrain.
    pub const fn amplitude_range(self) -> (i32, i32) {
        match self {
            ColorVariant::A => (4, 11),
            ColorVariant::B => (5, 10),
        }
    }

    pub fn gradient(self) -> Gradient {
        match self {
            ColorVariant::A => Gradient::preset(&[
                (0.0, Rgba::from_rgb8(46, 16, 64)),
                (0.35, Rgba::from_rgb8(148, 42, 120)),
                (0.7, Rgba::from_rgb8(240, 120, 170)),
                (1.0, Rgba::from_rgb8(255, 222, 200)),
            ]),
            ColorVariant::B => Gradient::preset(&[
                (0.0, Rgba::from_rgb8(8, 24, 68)),
                (0.4, Rgba::from_rgb8(24, 110, 140)),
                (0.75, Rgba::from_rgb8(130, 200, 230)),
                (1.0, Rgba::WHITE),
            ]),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ColorVariant::A => "dusk pink",
            ColorVariant::B => "glacier blue",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_key() -> Gradient {
        Gradient::new(vec![
            GradientKey {
                time: 1.0,
                color: Rgba::WHITE,
            },
            GradientKey {
                time: 0.0,
                color: Rgba::BLACK,
            },
        ])
        .unwrap()
    }

    #[test]
    fn keys_are_sorted() {
        let g = two_key();
        assert_eq!(g.keys()[0].time, 0.0);
        assert_eq!(g.keys()[1].time, 1.0);
    }

    #[test]
    fn evaluates_endpoints_and_midpoint() {
        let g = two_key();
        assert_eq!(g.evaluate(0.0), Rgba::BLACK);
        assert_eq!(g.evaluate(1.0), Rgba::WHITE);
        let mid = g.evaluate(0.25);
        assert!((mid.r - 0.25).abs() < 1e-6);
        assert_eq!(mid.a, 1.0);
    }

    #[test]
    fn out_of_range_inputs_clamp() {
        let g = two_key();
        assert_eq!(g.evaluate(-3.0), Rgba::BLACK);
        assert_eq!(g.evaluate(7.0), Rgba::WHITE);
        assert_eq!(g.evaluate(f32::NAN), Rgba::BLACK);
    }

    #[test]
    fn single_key_is_constant() {
        let red = Rgba::new(1.0, 0.0, 0.0, 1.0);
        let g = Gradient::new(vec![GradientKey {
            time: 0.5,
            color: red,
        }])
        .unwrap();
        assert_eq!(g.evaluate(0.0), red);
        assert_eq!(g.evaluate(1.0), red);
    }

    #[test]
    fn rejects_empty_and_out_of_range_keys() {
        assert!(Gradient::new(vec![]).is_err());
        assert!(
            Gradient::new(vec![GradientKey {
                time: 1.5,
                color: Rgba::WHITE
            }])
            .is_err()
        );
    }

    #[test]
    fn variant_amplitude_ranges() {
        assert_eq!(ColorVariant::A.amplitude_range(), (4, 11));
        assert_eq!(ColorVariant::B.amplitude_range(), (5, 10));
    }

    #[test]
    fn variant_gradients_differ_and_span_unit_range() {
        let a = ColorVariant::A.gradient();
        let b = ColorVariant::B.gradient();
        assert_ne!(a.evaluate(0.5), b.evaluate(0.5));
        for g in [&a, &b] {
            assert_eq!(g.keys().first().unwrap().time, 0.0);
            assert_eq!(g.keys().last().unwrap().time, 1.0);
        }
    }
}
