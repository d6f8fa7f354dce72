//! The draw pile. Normal draws come from the head, bonus and kong
//! replacements come from the tail, matching the distinction real Mahjong
//! tables make between the live wall and the dead wall.

use crate::{
    error::WallError,
    tile::{generate_tileset, TileInstance},
};
use rand::{seq::SliceRandom, Rng};
use std::collections::VecDeque;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wall {
    tiles: VecDeque<TileInstance>,
}

impl Wall {
    /// Builds a freshly shuffled wall from the full 144-tile set.
    pub fn shuffled(rng: &mut impl Rng) -> Self {
        let mut tiles = generate_tileset();
        tiles.shuffle(rng);
        Self {
            tiles: tiles.into(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Draws one tile from the head of the wall, for a normal turn draw.
    pub fn draw_head(&mut self) -> Result<TileInstance, WallError> {
        self.tiles.pop_front().ok_or(WallError::Insufficient {
            remaining: 0,
            needed: 1,
        })
    }

    /// Draws one tile from the tail of the wall, for bonus or kong replacement.
    pub fn draw_tail(&mut self) -> Result<TileInstance, WallError> {
        self.tiles.pop_back().ok_or(WallError::Insufficient {
            remaining: 0,
            needed: 1,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg64Mcg;

    #[test]
    fn shuffled_wall_has_144_tiles() {
        let mut rng = Pcg64Mcg::seed_from_u64(1);
        let wall = Wall::shuffled(&mut rng);
        assert_eq!(144, wall.remaining());
    }

    #[test]
    fn head_and_tail_draw_from_opposite_ends_without_overlap() {
        let mut rng = Pcg64Mcg::seed_from_u64(7);
        let mut wall = Wall::shuffled(&mut rng);

        let head = wall.draw_head().unwrap();
        let tail = wall.draw_tail().unwrap();
        assert_ne!(head.id, tail.id);
        assert_eq!(142, wall.remaining());
    }

    #[test]
    fn exhausted_wall_errors_instead_of_panicking() {
        let mut rng = Pcg64Mcg::seed_from_u64(3);
        let mut wall = Wall::shuffled(&mut rng);
        for _ in 0..144 {
            wall.draw_head().unwrap();
        }
        assert!(wall.draw_head().is_err());
        assert!(wall.draw_tail().is_err());
    }
}
