use glam::Vec2;

/// Axis-aligned square footprint of a chunk on the ground plane
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Vec2,
    pub max: Vec2,
}

impl Bounds {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Bounds { min, max }
    }

    pub fn from_center_size(center: Vec2, size: Vec2) -> Self {
        let half = size * 0.5;
        Bounds {
            min: center - half,
            max: center + half,
        }
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    pub fn half_size(&self) -> Vec2 {
        (self.max - self.min) * 0.5
    }

    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.min.x && point.x <= self.max.x && point.y >= self.min.y && point.y <= self.max.y
    }

    /// Squared distance from `point` to the nearest point of the box (zero inside)
    pub fn sqr_distance(&self, point: Vec2) -> f32 {
        let nearest = point.clamp(self.min, self.max);
        point.distance_squared(nearest)
    }

    pub fn distance(&self, point: Vec2) -> f32 {
        self.sqr_distance(point).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_is_measured_to_nearest_edge() {
        let bounds = Bounds::from_center_size(Vec2::ZERO, Vec2::splat(10.0));
        assert_eq!(bounds.distance(Vec2::new(2.0, -3.0)), 0.0);
        assert_eq!(bounds.distance(Vec2::new(8.0, 0.0)), 3.0);
        assert_eq!(bounds.sqr_distance(Vec2::new(8.0, 9.0)), 9.0 + 16.0);
    }

    #[test]
    fn center_and_half_size_round_trip() {
        let bounds = Bounds::from_center_size(Vec2::new(100.0, -50.0), Vec2::splat(40.0));
        assert_eq!(bounds.center(), Vec2::new(100.0, -50.0));
        assert_eq!(bounds.half_size(), Vec2::splat(20.0));
        assert!(bounds.contains(Vec2::new(120.0, -70.0)));
        assert!(!bounds.contains(Vec2::new(121.0, -70.0)));
    }
}
