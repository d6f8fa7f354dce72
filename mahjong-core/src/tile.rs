//! Tile definitions and the 144-tile multiset used to build a wall.

use serde::{Deserialize, Serialize};
use strum::EnumIter;

/// One of the three numbered suits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, Serialize, Deserialize)]
pub enum Suit {
    Bamboo,
    Character,
    Dot,
}

/// A seat wind. Also doubles as the round wind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, Serialize, Deserialize)]
pub enum Wind {
    East,
    South,
    West,
    North,
}

impl Wind {
    /// The next wind in seat-rotation order: East -> South -> West -> North -> East.
    pub fn next(self) -> Self {
        match self {
            Wind::East => Wind::South,
            Wind::South => Wind::West,
            Wind::West => Wind::North,
            Wind::North => Wind::East,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, Serialize, Deserialize)]
pub enum Dragon {
    Red,
    Green,
    White,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, Serialize, Deserialize)]
pub enum BonusKind {
    Flower,
    Animal,
}

/// The definition of a tile: everything about it except its identity.
///
/// Two `TileInstance`s with equal `def` are interchangeable for scoring and
/// claim purposes but remain distinct tiles (different `TileId`s).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TileDef {
    Suit { suit: Suit, value: u8 },
    Wind(Wind),
    Dragon(Dragon),
    Bonus { kind: BonusKind, value: u8 },
}

impl TileDef {
    pub fn is_suit(self) -> bool {
        matches!(self, TileDef::Suit { .. })
    }

    pub fn is_honor(self) -> bool {
        matches!(self, TileDef::Wind(..) | TileDef::Dragon(..))
    }

    pub fn is_bonus(self) -> bool {
        matches!(self, TileDef::Bonus { .. })
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, TileDef::Suit { value: 1 | 9, .. })
    }

    /// A total order over tile definitions used to display hands deterministically.
    ///
    /// Characters, then bamboo, then dots (1..9 each), then winds E/S/W/N, then
    /// dragons red/green/white, then flowers, then animals.
    pub fn order_key(self) -> u32 {
        match self {
            TileDef::Suit { suit, value } => {
                let suit_rank = match suit {
                    Suit::Character => 0,
                    Suit::Bamboo => 1,
                    Suit::Dot => 2,
                };
                suit_rank * 9 + (value as u32 - 1)
            }
            TileDef::Wind(wind) => {
                27 + match wind {
                    Wind::East => 0,
                    Wind::South => 1,
                    Wind::West => 2,
                    Wind::North => 3,
                }
            }
            TileDef::Dragon(dragon) => {
                31 + match dragon {
                    Dragon::Red => 0,
                    Dragon::Green => 1,
                    Dragon::White => 2,
                }
            }
            TileDef::Bonus { kind, value } => {
                let kind_rank = match kind {
                    BonusKind::Flower => 0,
                    BonusKind::Animal => 1,
                };
                34 + kind_rank * 4 + (value as u32 - 1)
            }
        }
    }
}

/// Stable identity for a tile within a single game.
///
/// Ids are assigned once when the 144-tile multiset is generated and never
/// change, letting clients track a tile's identity across draws, melds, and
/// discards for animation purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TileId(pub u16);

/// A tile instance: a definition plus the identity that makes it distinct
/// from its three copies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileInstance {
    pub id: TileId,
    pub def: TileDef,
    pub face_up: bool,
}

impl TileInstance {
    pub fn new(id: TileId, def: TileDef) -> Self {
        Self {
            id,
            def,
            face_up: false,
        }
    }
}

/// Builds the full, unshuffled 144-tile multiset.
///
/// * 108 suit tiles (3 suits x 9 values x 4 copies)
/// * 16 wind tiles (4 winds x 4 copies)
/// * 12 dragon tiles (3 dragons x 4 copies)
/// * 8 bonus tiles (2 kinds x 4 values, 1 copy each)
pub fn generate_tileset() -> Vec<TileInstance> {
    use strum::IntoEnumIterator;

    let mut tiles = Vec::with_capacity(144);
    let mut next_id: u16 = 0;
    let mut push = |def: TileDef, tiles: &mut Vec<TileInstance>| {
        tiles.push(TileInstance::new(TileId(next_id), def));
        next_id += 1;
    };

    for suit in Suit::iter() {
        for value in 1..=9u8 {
            for _ in 0..4 {
                push(TileDef::Suit { suit, value }, &mut tiles);
            }
        }
    }

    for wind in Wind::iter() {
        for _ in 0..4 {
            push(TileDef::Wind(wind), &mut tiles);
        }
    }

    for dragon in Dragon::iter() {
        for _ in 0..4 {
            push(TileDef::Dragon(dragon), &mut tiles);
        }
    }

    for kind in [BonusKind::Flower, BonusKind::Animal] {
        for value in 1..=4u8 {
            push(TileDef::Bonus { kind, value }, &mut tiles);
        }
    }

    debug_assert_eq!(tiles.len(), 144);
    tiles
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_144_unique_ids() {
        let tiles = generate_tileset();
        assert_eq!(144, tiles.len());

        let mut ids: Vec<_> = tiles.iter().map(|t| t.id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(144, ids.len());
    }

    #[test]
    fn four_copies_of_each_suit_tile() {
        let tiles = generate_tileset();
        let count = tiles
            .iter()
            .filter(|t| {
                t.def
                    == (TileDef::Suit {
                        suit: Suit::Dot,
                        value: 5,
                    })
            })
            .count();
        assert_eq!(4, count);
    }

    #[test]
    fn one_copy_of_each_bonus_tile() {
        let tiles = generate_tileset();
        let count = tiles
            .iter()
            .filter(|t| {
                t.def
                    == (TileDef::Bonus {
                        kind: BonusKind::Flower,
                        value: 2,
                    })
            })
            .count();
        assert_eq!(1, count);
    }

    #[test]
    fn order_key_groups_suits_before_honors_before_bonuses() {
        let last_suit = TileDef::Suit {
            suit: Suit::Dot,
            value: 9,
        }
        .order_key();
        let first_wind = TileDef::Wind(Wind::East).order_key();
        let last_dragon = TileDef::Dragon(Dragon::White).order_key();
        let first_bonus = TileDef::Bonus {
            kind: BonusKind::Flower,
            value: 1,
        }
        .order_key();

        assert!(last_suit < first_wind);
        assert!(last_dragon < first_bonus);
    }
}
