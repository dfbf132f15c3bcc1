//! Height response curve
//!
//! Maps a normalized noise value to a height factor by interpolating between
//! keyframes. The curve itself is plain data and can be shared freely; the
//! evaluator that walks it keeps a segment cursor, so every concurrent
//! height-map build takes its own [`CurveEvaluator`] copy.

use serde::{Deserialize, Serialize};

/// A keyframe on the height curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurveKey {
    /// Input value (normalized noise, usually 0 to 1)
    pub time: f32,
    /// Output factor
    pub value: f32,
}

impl CurveKey {
    pub const fn new(time: f32, value: f32) -> Self {
        CurveKey { time, value }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CurveInterpolation {
    Linear,
    #[default]
    CatmullRom,
}

/// Piecewise interpolated curve over sorted keyframes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeightCurve {
    keys: Vec<CurveKey>,
    #[serde(default)]
    interpolation: CurveInterpolation,
}

impl HeightCurve {
    /// Build a curve from keyframes; keys are sorted by time
    pub fn new(keys: &[CurveKey], interpolation: CurveInterpolation) -> Self {
        let mut keys = keys.to_vec();
        keys.sort_by(|a, b| a.time.total_cmp(&b.time));
        Self {
            keys,
            interpolation,
        }
    }

    pub fn from_pairs(pairs: &[(f32, f32)]) -> Self {
        let keys: Vec<CurveKey> = pairs.iter().map(|&(t, v)| CurveKey::new(t, v)).collect();
        Self::new(&keys, CurveInterpolation::CatmullRom)
    }

    /// Identity response: output equals input on [0, 1]
    pub fn linear() -> Self {
        Self::new(
            &[CurveKey::new(0.0, 0.0), CurveKey::new(1.0, 1.0)],
            CurveInterpolation::Linear,
        )
    }

    /// Constant response of 1, leaving noise values untouched
    pub fn flat() -> Self {
        Self::new(&[CurveKey::new(0.0, 1.0)], CurveInterpolation::Linear)
    }

    /// Flattens low ground into water and exaggerates peaks
    pub fn terrain() -> Self {
        Self::from_pairs(&[
            (0.0, 0.0),  // Sea floor
            (0.3, 0.0),  // Water level
            (0.4, 0.08), // Shore
            (0.6, 0.3),  // Lowlands
            (0.8, 0.65), // Hills
            (1.0, 1.0),  // Peaks
        ])
    }

    pub fn keys(&self) -> &[CurveKey] {
        &self.keys
    }

    pub fn interpolation(&self) -> CurveInterpolation {
        self.interpolation
    }

    /// Private evaluator with its own copy of the keyframes
    pub fn evaluator(&self) -> CurveEvaluator {
        CurveEvaluator {
            curve: self.clone(),
            cursor: 0,
        }
    }

    /// One-off evaluation; use an evaluator when sampling a whole grid
    pub fn evaluate(&self, t: f32) -> f32 {
        self.evaluator().evaluate(t)
    }
}

impl Default for HeightCurve {
    fn default() -> Self {
        Self::linear()
    }
}

/// Stateful curve sampler; caches the last segment to speed up coherent lookups
pub struct CurveEvaluator {
    curve: HeightCurve,
    cursor: usize,
}

impl CurveEvaluator {
    pub fn evaluate(&mut self, t: f32) -> f32 {
        let keys = &self.curve.keys;
        match keys.len() {
            0 => return 0.0,
            1 => return keys[0].value,
            _ => {}
        }

        let first = keys[0];
        let last = keys[keys.len() - 1];
        if t <= first.time {
            return first.value;
        }
        if t >= last.time {
            return last.value;
        }

        let i = self.find_segment(t);
        let keys = &self.curve.keys;
        let p1 = keys[i];
        let p2 = keys[i + 1];
        let span = p2.time - p1.time;
        if span <= f32::EPSILON {
            return p2.value;
        }
        let segment_t = (t - p1.time) / span;

        match self.curve.interpolation {
            CurveInterpolation::Linear => p1.value + (p2.value - p1.value) * segment_t,
            CurveInterpolation::CatmullRom => {
                // Duplicate endpoints at the ends of the curve
                let p0 = if i > 0 { keys[i - 1] } else { p1 };
                let p3 = if i + 2 < keys.len() { keys[i + 2] } else { p2 };
                catmull_rom(p0.value, p1.value, p2.value, p3.value, segment_t)
            }
        }
    }

    /// Index `i` such that `keys[i].time <= t < keys[i + 1].time`
    fn find_segment(&mut self, t: f32) -> usize {
        let keys = &self.curve.keys;
        let last_segment = keys.len() - 2;
        let mut i = self.cursor.min(last_segment);

        if keys[i].time > t {
            i = 0;
        }
        while i < last_segment && keys[i + 1].time <= t {
            i += 1;
        }

        self.cursor = i;
        i
    }
}

/// Catmull-Rom spline interpolation
fn catmull_rom(p0: f32, p1: f32, p2: f32, p3: f32, t: f32) -> f32 {
    let t2 = t * t;
    let t3 = t2 * t;

    0.5 * ((2.0 * p1)
        + (-p0 + p2) * t
        + (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3) * t2
        + (-p0 + 3.0 * p1 - 3.0 * p2 + p3) * t3)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluator_matches_shared_curve_across_segments() {
        let curve = HeightCurve::terrain();
        let mut evaluator = curve.evaluator();
        for step in 0..=40 {
            let t = step as f32 / 40.0;
            assert_eq!(evaluator.evaluate(t), curve.evaluate(t));
        }
    }

    #[test]
    fn clamps_outside_key_range() {
        let curve = HeightCurve::terrain();
        assert_eq!(curve.evaluate(-1.0), 0.0);
        assert_eq!(curve.evaluate(2.5), 1.0);
    }

    #[test]
    fn passes_through_keyframes() {
        let curve = HeightCurve::terrain();
        let mut eval = curve.evaluator();
        for key in curve.keys() {
            assert!((eval.evaluate(key.time) - key.value).abs() < 1e-6);
        }
    }

    #[test]
    fn linear_curve_is_identity_on_unit_range() {
        let curve = HeightCurve::linear();
        let mut eval = curve.evaluator();
        for i in 0..=10 {
            let t = i as f32 / 10.0;
            assert!((eval.evaluate(t) - t).abs() < 1e-6);
        }
    }

    #[test]
    fn cursor_handles_backwards_lookups() {
        let curve = HeightCurve::new(
            &[
                CurveKey::new(0.0, 0.0),
                CurveKey::new(0.5, 1.0),
                CurveKey::new(1.0, 0.0),
            ],
            CurveInterpolation::Linear,
        );
        let mut eval = curve.evaluator();
        assert!((eval.evaluate(0.75) - 0.5).abs() < 1e-6);
        assert!((eval.evaluate(0.25) - 0.5).abs() < 1e-6);
        assert!((eval.evaluate(0.9) - 0.2).abs() < 1e-6);
    }

    #[test]
    fn unsorted_keys_are_sorted() {
        let curve = HeightCurve::new(
            &[CurveKey::new(1.0, 2.0), CurveKey::new(0.0, 0.0)],
            CurveInterpolation::Linear,
        );
        assert_eq!(curve.keys()[0].time, 0.0);
        assert!((curve.evaluate(0.5) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn flat_curve_is_constant() {
        let curve = HeightCurve::flat();
        assert_eq!(curve.evaluate(0.2), 1.0);
        assert_eq!(curve.evaluate(7.0), 1.0);
    }
}
