//! Dense 2D float grids produced by the noise and height-map stages.

/// Row-major `width x height` grid indexed as `[x, y]`
#[derive(Debug, Clone, PartialEq)]
pub struct NoiseMap {
    width: usize,
    height: usize,
    values: Vec<f32>,
}

impl NoiseMap {
    pub fn new(width: usize, height: usize) -> Self {
        NoiseMap {
            width,
            height,
            values: vec![0.0; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    fn index(&self, x: usize, y: usize) -> usize {
        debug_assert!(x < self.width && y < self.height);
        y * self.width + x
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.values[self.index(x, y)]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: f32) {
        let idx = self.index(x, y);
        self.values[idx] = value;
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut [f32] {
        &mut self.values
    }

    /// Smallest and largest value in the grid, `None` when empty
    pub fn range(&self) -> Option<(f32, f32)> {
        self.values.iter().fold(None, |acc, &v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
    }
}

/// Final terrain heights for one chunk, with the observed range
#[derive(Debug, Clone, PartialEq)]
pub struct HeightMap {
    pub values: NoiseMap,
    pub min_value: f32,
    pub max_value: f32,
}

impl HeightMap {
    pub fn new(values: NoiseMap, min_value: f32, max_value: f32) -> Self {
        HeightMap {
            values,
            min_value,
            max_value,
        }
    }

    pub fn width(&self) -> usize {
        self.values.width()
    }

    pub fn height(&self) -> usize {
        self.values.height()
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.values.get(x, y)
    }
}

/// `t` such that `lerp(a, b, t) == value`, clamped to [0, 1]; 0 when `a == b`
pub fn inverse_lerp(a: f32, b: f32, value: f32) -> f32 {
    if a == b {
        return 0.0;
    }
    ((value - a) / (b - a)).clamp(0.0, 1.0)
}
