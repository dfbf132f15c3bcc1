use std::io;
use std::path::Path;

use image::{GrayImage, Luma, Rgb, RgbImage};

use crate::core::height_map::{HeightMap, NoiseMap, inverse_lerp};

fn to_byte(t: f32) -> u8 {
    (t.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Black at the lowest value, white at the highest. Row `y` of the map becomes image row `y`.
pub fn texture_from_noise_map(map: &NoiseMap, min: f32, max: f32) -> GrayImage {
    GrayImage::from_fn(map.width() as u32, map.height() as u32, |x, y| {
        Luma([to_byte(inverse_lerp(min, max, map.get(x as usize, y as usize)))])
    })
}

pub fn texture_from_height_map(height_map: &HeightMap) -> GrayImage {
    texture_from_noise_map(
        &height_map.values,
        height_map.min_value,
        height_map.max_value,
    )
}

/// Colour band for a normalized height
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerrainBand {
    pub start_height: f32,
    pub colour: [u8; 3],
}

pub fn default_bands() -> Vec<TerrainBand> {
    vec![
        TerrainBand { start_height: 0.0, colour: [38, 70, 140] },
        TerrainBand { start_height: 0.3, colour: [62, 104, 186] },
        TerrainBand { start_height: 0.4, colour: [210, 208, 125] },
        TerrainBand { start_height: 0.45, colour: [86, 152, 23] },
        TerrainBand { start_height: 0.55, colour: [62, 107, 18] },
        TerrainBand { start_height: 0.6, colour: [90, 69, 60] },
        TerrainBand { start_height: 0.7, colour: [75, 60, 53] },
        TerrainBand { start_height: 0.9, colour: [255, 255, 255] },
    ]
}

/// Flat colour map: each pixel takes the last band whose start it reaches.
/// `bands` must be sorted by `start_height`.
pub fn colour_map_from_height_map(height_map: &HeightMap, bands: &[TerrainBand]) -> RgbImage {
    let width = height_map.width() as u32;
    let height = height_map.height() as u32;
    RgbImage::from_fn(width, height, |x, y| {
        let t = inverse_lerp(
            height_map.min_value,
            height_map.max_value,
            height_map.get(x as usize, y as usize),
        );
        let colour = bands
            .iter()
            .take_while(|band| t >= band.start_height)
            .last()
            .map(|band| band.colour)
            .unwrap_or([0, 0, 0]);
        Rgb(colour)
    })
}

/// Write a greyscale height texture; the format follows the file extension
pub fn save_texture<P: AsRef<Path>>(path: P, image: &GrayImage) -> io::Result<()> {
    let path = path.as_ref();
    image
        .save(path)
        .map_err(|e| io::Error::other(format!("Failed to save {}: {}", path.display(), e)))?;
    tracing::info!(
        "Saved {}x{} texture to {}",
        image.width(),
        image.height(),
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(width: usize, height: usize) -> HeightMap {
        let mut values = NoiseMap::new(width, height);
        for y in 0..height {
            for x in 0..width {
                values.set(x, y, x as f32);
            }
        }
        HeightMap::new(values, 0.0, (width - 1) as f32)
    }

    #[test]
    fn extremes_map_to_black_and_white() {
        let map = ramp(5, 3);
        let image = texture_from_height_map(&map);
        assert_eq!(image.dimensions(), (5, 3));
        assert_eq!(image.get_pixel(0, 1)[0], 0);
        assert_eq!(image.get_pixel(4, 2)[0], 255);
        assert_eq!(image.get_pixel(2, 0)[0], 128);
    }

    #[test]
    fn flat_map_is_black() {
        let values = NoiseMap::new(4, 4);
        let image = texture_from_height_map(&HeightMap::new(values, 2.0, 2.0));
        assert!(image.pixels().all(|p| p[0] == 0));
    }

    #[test]
    fn colour_map_picks_highest_reached_band() {
        let map = ramp(11, 1);
        let bands = default_bands();
        let image = colour_map_from_height_map(&map, &bands);
        assert_eq!(image.get_pixel(0, 0).0, bands[0].colour);
        assert_eq!(image.get_pixel(10, 0).0, [255, 255, 255]);
        assert_eq!(image.get_pixel(5, 0).0, bands[3].colour);
    }

    #[test]
    fn saved_png_reloads_with_same_pixels() {
        let image = texture_from_height_map(&ramp(8, 8));
        let path = std::env::temp_dir().join(format!("terrain-gen-texture-{}.png", std::process::id()));
        save_texture(&path, &image).unwrap();
        let reloaded = image::open(&path).unwrap().to_luma8();
        std::fs::remove_file(&path).ok();
        assert_eq!(reloaded, image);
    }
}
