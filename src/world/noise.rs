//! Fractal noise maps using FastNoiseLite Perlin
//!
//! Every octave samples the same infinite Perlin field through its own
//! seeded offset. Offsets are shifted by the caller's sample centre, so two
//! maps generated for neighbouring windows read exactly the same field and
//! tile without seams once globally normalized.

use fastnoise_lite::{FastNoiseLite, NoiseType};
use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::constants::{GLOBAL_NORMALIZE_ESTIMATE, OCTAVE_OFFSET_RANGE};
use crate::core::height_map::{NoiseMap, inverse_lerp};
use crate::utils::settings::{NoiseSettings, NormalizeMode};

/// Per-octave sample offsets, a pure function of the seed and sample window
fn octave_offsets(settings: &NoiseSettings, sample_centre: Vec2) -> Vec<Vec2> {
    let mut prng = ChaCha8Rng::seed_from_u64(settings.seed as u32 as u64);

    (0..settings.octaves)
        .map(|_| {
            let offset_x = prng.gen_range(-OCTAVE_OFFSET_RANGE..OCTAVE_OFFSET_RANGE) as f32
                + settings.offset.x
                + sample_centre.x;
            let offset_y = prng.gen_range(-OCTAVE_OFFSET_RANGE..OCTAVE_OFFSET_RANGE) as f32
                - settings.offset.y
                - sample_centre.y;
            Vec2::new(offset_x, offset_y)
        })
        .collect()
}

/// Sum of every octave's amplitude, the largest value fBm can reach
pub fn max_possible_height(settings: &NoiseSettings) -> f32 {
    let mut amplitude = 1.0;
    let mut total = 0.0;
    for _ in 0..settings.octaves {
        total += amplitude;
        amplitude *= settings.persistance;
    }
    total
}

fn create_perlin(seed: i32) -> FastNoiseLite {
    let mut noise = FastNoiseLite::with_seed(seed);
    noise.set_noise_type(Some(NoiseType::Perlin));
    // Coordinates are pre-scaled by the caller
    noise.set_frequency(Some(1.0));
    noise
}

/// Generate a `width x height` fBm noise map. `settings` must already be
/// validated (see [`NoiseSettings::validate_values`]).
pub fn generate_noise_map(
    width: usize,
    height: usize,
    settings: &NoiseSettings,
    sample_centre: Vec2,
) -> NoiseMap {
    debug_assert!(settings.is_valid(), "noise settings must be validated first");

    let mut noise_map = NoiseMap::new(width, height);
    let perlin = create_perlin(settings.seed);
    let offsets = octave_offsets(settings, sample_centre);
    let max_possible_height = max_possible_height(settings);

    let mut max_local_noise_height = f32::MIN;
    let mut min_local_noise_height = f32::MAX;

    let half_width = width as f32 / 2.0;
    let half_height = height as f32 / 2.0;

    for y in 0..height {
        for x in 0..width {
            let mut amplitude = 1.0;
            let mut frequency = 1.0;
            let mut noise_height = 0.0;

            for offset in &offsets {
                let sample_x = (x as f32 - half_width + offset.x) / settings.scale * frequency;
                let sample_y = (y as f32 - half_height + offset.y) / settings.scale * frequency;

                let perlin_value = perlin.get_noise_2d(sample_x, sample_y);
                noise_height += perlin_value * amplitude;

                amplitude *= settings.persistance;
                frequency *= settings.lacunarity;
            }

            max_local_noise_height = max_local_noise_height.max(noise_height);
            min_local_noise_height = min_local_noise_height.min(noise_height);

            let value = match settings.normalize_mode {
                NormalizeMode::Global => {
                    let normalized =
                        (noise_height + 1.0) / (max_possible_height / GLOBAL_NORMALIZE_ESTIMATE);
                    // Upper bound is deliberately not 1.0
                    normalized.clamp(0.0, i32::MAX as f32)
                }
                NormalizeMode::Local => noise_height,
            };
            noise_map.set(x, y, value);
        }
    }

    if settings.normalize_mode == NormalizeMode::Local {
        for value in noise_map.values_mut() {
            *value = inverse_lerp(min_local_noise_height, max_local_noise_height, *value);
        }
    }

    noise_map
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(mode: NormalizeMode) -> NoiseSettings {
        NoiseSettings {
            normalize_mode: mode,
            scale: 50.0,
            octaves: 4,
            persistance: 0.5,
            lacunarity: 2.0,
            seed: 42,
            offset: Vec2::ZERO,
        }
    }

    #[test]
    fn same_inputs_give_bit_identical_maps() {
        let s = settings(NormalizeMode::Global);
        let a = generate_noise_map(24, 24, &s, Vec2::new(13.0, -7.0));
        let b = generate_noise_map(24, 24, &s, Vec2::new(13.0, -7.0));
        let bits_a: Vec<u32> = a.values().iter().map(|v| v.to_bits()).collect();
        let bits_b: Vec<u32> = b.values().iter().map(|v| v.to_bits()).collect();
        assert_eq!(bits_a, bits_b);
    }

    #[test]
    fn different_seeds_give_different_maps() {
        let a = generate_noise_map(16, 16, &settings(NormalizeMode::Global), Vec2::ZERO);
        let mut other = settings(NormalizeMode::Global);
        other.seed = 43;
        let b = generate_noise_map(16, 16, &other, Vec2::ZERO);
        assert_ne!(a, b);
    }

    #[test]
    fn global_windows_abut_without_seams() {
        let s = settings(NormalizeMode::Global);
        // A 501-wide window centred on x=0 ends where one centred on x=500 begins
        let width = 501;
        let left = generate_noise_map(width, 10, &s, Vec2::new(0.0, 0.0));
        let right = generate_noise_map(width, 10, &s, Vec2::new(500.0, 0.0));
        for y in 0..10 {
            let a = left.get(width - 1, y);
            let b = right.get(0, y);
            assert!((a - b).abs() < 1e-4, "row {}: {} vs {}", y, a, b);
        }
    }

    #[test]
    fn global_windows_overlap_consistently_in_y() {
        let s = settings(NormalizeMode::Global);
        let top = generate_noise_map(10, 21, &s, Vec2::new(0.0, 0.0));
        let bottom = generate_noise_map(10, 21, &s, Vec2::new(0.0, -20.0));
        for x in 0..10 {
            assert!((top.get(x, 20) - bottom.get(x, 0)).abs() < 1e-4);
        }
    }

    #[test]
    fn global_values_are_never_negative() {
        let s = settings(NormalizeMode::Global);
        let map = generate_noise_map(64, 64, &s, Vec2::new(-300.0, 120.0));
        assert!(map.values().iter().all(|v| *v >= 0.0));
    }

    #[test]
    fn global_values_may_exceed_one() {
        let s = NoiseSettings {
            octaves: 1,
            scale: 30.0,
            seed: 3,
            ..settings(NormalizeMode::Global)
        };
        let map = generate_noise_map(100, 100, &s, Vec2::ZERO);
        assert!(map.values().iter().any(|v| *v > 1.0));
        assert!(map.values().iter().all(|v| *v >= 0.0));
    }

    #[test]
    fn local_mode_spans_exact_unit_range() {
        let s = settings(NormalizeMode::Local);
        let map = generate_noise_map(32, 32, &s, Vec2::ZERO);
        assert!(map.values().iter().all(|v| (0.0..=1.0).contains(v)));
        assert!(map.values().iter().any(|v| *v == 0.0));
        assert!(map.values().iter().any(|v| *v == 1.0));
    }

    #[test]
    fn max_possible_height_sums_amplitudes() {
        let s = settings(NormalizeMode::Global);
        assert!((max_possible_height(&s) - 1.875).abs() < 1e-6);
    }

    #[test]
    fn octave_offsets_follow_sample_centre() {
        let s = settings(NormalizeMode::Global);
        let base = octave_offsets(&s, Vec2::ZERO);
        let shifted = octave_offsets(&s, Vec2::new(10.0, 4.0));
        assert_eq!(base.len(), 4);
        for (a, b) in base.iter().zip(&shifted) {
            assert_eq!(b.x - a.x, 10.0);
            assert_eq!(b.y - a.y, -4.0);
        }
    }
}
