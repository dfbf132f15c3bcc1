//! Thread-safe height map generation
//!
//! Turns a noise map into terrain heights by pushing every sample through the
//! height curve and the height multiplier. Safe to call from any worker
//! thread: each call owns its curve evaluator.

use glam::Vec2;

use crate::core::height_map::HeightMap;
use crate::utils::settings::HeightMapSettings;
use crate::world::noise::generate_noise_map;

pub fn generate_height_map(
    width: usize,
    height: usize,
    settings: &HeightMapSettings,
    sample_centre: Vec2,
) -> HeightMap {
    let mut values = generate_noise_map(width, height, &settings.noise_settings, sample_centre);

    // Curve evaluators carry a cursor, never share one between builds
    let mut height_curve = settings.height_curve.evaluator();

    let mut min_value = f32::MAX;
    let mut max_value = f32::MIN;

    for value in values.values_mut() {
        *value *= height_curve.evaluate(*value) * settings.height_multiplier;

        max_value = max_value.max(*value);
        min_value = min_value.min(*value);
    }

    HeightMap::new(values, min_value, max_value)
}
