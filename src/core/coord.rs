use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Integer lattice coordinate of a terrain chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkCoord {
    pub x: i32,
    pub y: i32,
}

impl ChunkCoord {
    pub const ORIGIN: ChunkCoord = ChunkCoord { x: 0, y: 0 };

    pub fn new(x: i32, y: i32) -> Self {
        ChunkCoord { x, y }
    }

    /// Chunk whose centre is closest to a world position; exact halfway
    /// positions go to the even chunk index
    pub fn containing(position: Vec2, chunk_world_size: f32) -> Self {
        ChunkCoord {
            x: (position.x / chunk_world_size).round_ties_even() as i32,
            y: (position.y / chunk_world_size).round_ties_even() as i32,
        }
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        ChunkCoord {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    pub fn as_vec2(self) -> Vec2 {
        Vec2::new(self.x as f32, self.y as f32)
    }
}

impl From<(i32, i32)> for ChunkCoord {
    fn from((x, y): (i32, i32)) -> Self {
        ChunkCoord { x, y }
    }
}

impl std::fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHashSet;

    #[test]
    fn equal_components_hash_to_same_key() {
        let mut set = FxHashSet::default();
        set.insert(ChunkCoord::new(3, -2));
        assert!(set.contains(&ChunkCoord::from((3, -2))));
        assert!(!set.contains(&ChunkCoord::new(-2, 3)));
    }

    #[test]
    fn containing_rounds_to_nearest_chunk_centre() {
        assert_eq!(ChunkCoord::containing(Vec2::new(0.0, 0.0), 100.0), ChunkCoord::ORIGIN);
        assert_eq!(ChunkCoord::containing(Vec2::new(49.0, -49.0), 100.0), ChunkCoord::ORIGIN);
        assert_eq!(ChunkCoord::containing(Vec2::new(151.0, -260.0), 100.0), ChunkCoord::new(2, -3));
    }

    #[test]
    fn halfway_positions_round_to_even_chunk() {
        assert_eq!(ChunkCoord::containing(Vec2::new(57.5, -57.5), 115.0), ChunkCoord::ORIGIN);
        assert_eq!(ChunkCoord::containing(Vec2::new(172.5, 287.5), 115.0), ChunkCoord::new(2, 2));
        assert_eq!(ChunkCoord::containing(Vec2::new(-172.5, 0.0), 115.0), ChunkCoord::new(-2, 0));
    }
}
