//! Win detection and claim eligibility.
//!
//! Every function here is a pure query over a hand (and, for win checks, the
//! melds already set aside): nothing mutates, nothing does I/O. The move
//! applicator (`crate::moves`) is the only place that acts on what these
//! functions report.

use crate::{
    meld::Meld,
    tile::{TileDef, TileInstance},
};
use std::{cmp::Ordering, collections::BTreeMap};

/// Wraps a `TileDef` so it can be used as a `BTreeMap` key in the canonical
/// display order from `TileDef::order_key`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OrderedDef(TileDef);

impl PartialOrd for OrderedDef {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrderedDef {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.order_key().cmp(&other.0.order_key())
    }
}

fn group_by_def(tiles: &[TileInstance]) -> BTreeMap<OrderedDef, u8> {
    let mut counts = BTreeMap::new();
    for tile in tiles {
        *counts.entry(OrderedDef(tile.def)).or_insert(0) += 1;
    }
    counts
}

/// Returns `true` iff `counts` can be fully decomposed into triplets and
/// runs. Recurses on the leading (canonically-first) nonzero group; that
/// group must be consumed by some set in any valid decomposition, so failing
/// to place it is a correct, linear-depth cutoff rather than a heuristic.
fn can_decompose(counts: &BTreeMap<OrderedDef, u8>) -> bool {
    let leading = match counts.iter().find(|&(_, &count)| count > 0) {
        Some((&key, &count)) => (key, count),
        None => return true,
    };
    let (key, count) = leading;

    if count >= 3 {
        let mut next = counts.clone();
        *next.get_mut(&key).unwrap() -= 3;
        if can_decompose(&next) {
            return true;
        }
    }

    if let TileDef::Suit { suit, value } = key.0 {
        if value <= 7 {
            let k2 = OrderedDef(TileDef::Suit {
                suit,
                value: value + 1,
            });
            let k3 = OrderedDef(TileDef::Suit {
                suit,
                value: value + 2,
            });
            let c2 = counts.get(&k2).copied().unwrap_or(0);
            let c3 = counts.get(&k3).copied().unwrap_or(0);

            if c2 >= 1 && c3 >= 1 {
                let mut next = counts.clone();
                *next.get_mut(&key).unwrap() -= 1;
                *next.get_mut(&k2).unwrap() -= 1;
                *next.get_mut(&k3).unwrap() -= 1;
                if can_decompose(&next) {
                    return true;
                }
            }
        }
    }

    false
}

/// Returns `true` iff `hand`, together with the already-declared `melds`,
/// forms exactly 4 sets plus 1 pair.
pub fn check_win(hand: &[TileInstance], _melds: &[Meld]) -> bool {
    let counts = group_by_def(hand);

    for (&key, &count) in counts.iter() {
        if count >= 2 {
            let mut remaining = counts.clone();
            *remaining.get_mut(&key).unwrap() -= 2;
            if can_decompose(&remaining) {
                return true;
            }
        }
    }

    false
}

/// Equivalent to `check_win(hand + tile, melds)` without mutating `hand`.
pub fn check_win_with_tile(hand: &[TileInstance], melds: &[Meld], tile: TileInstance) -> bool {
    let mut extended = hand.to_vec();
    extended.push(tile);
    check_win(&extended, melds)
}

/// Returns two tiles of `def` from `hand`, if at least two copies are held.
pub fn can_pong(hand: &[TileInstance], def: TileDef) -> Option<[TileInstance; 2]> {
    let matches: Vec<_> = hand.iter().filter(|t| t.def == def).copied().collect();
    if matches.len() >= 2 {
        Some([matches[0], matches[1]])
    } else {
        None
    }
}

/// Returns three tiles of `def` from `hand`, if at least three copies are held.
pub fn can_kong(hand: &[TileInstance], def: TileDef) -> Option<[TileInstance; 3]> {
    let matches: Vec<_> = hand.iter().filter(|t| t.def == def).copied().collect();
    if matches.len() >= 3 {
        Some([matches[0], matches[1], matches[2]])
    } else {
        None
    }
}

/// A chi completion: the two tiles from the claimer's hand that combine with
/// the discard to form a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChiOption {
    pub tiles: [TileInstance; 2],
}

/// Enumerates the legal chi completions for `discard_def`, claimed by
/// `claimer_idx` from `discarder_idx`.
///
/// Chi is only legal when the claimer is the next player in turn order and
/// the discard is a suit tile. Up to three combinations are checked, bounded
/// to the 1..9 value range.
pub fn can_all_chi(
    hand: &[TileInstance],
    discard_def: TileDef,
    claimer_idx: usize,
    discarder_idx: usize,
) -> Vec<ChiOption> {
    if (discarder_idx + 1) % 4 != claimer_idx {
        return Vec::new();
    }

    let (suit, value) = match discard_def {
        TileDef::Suit { suit, value } => (suit, value),
        _ => return Vec::new(),
    };

    let mut options = Vec::new();
    let candidate_pairs: [(i16, i16); 3] = [
        (value as i16 - 2, value as i16 - 1),
        (value as i16 - 1, value as i16 + 1),
        (value as i16 + 1, value as i16 + 2),
    ];

    for (a, b) in candidate_pairs {
        if !(1..=9).contains(&a) || !(1..=9).contains(&b) {
            continue;
        }
        let def_a = TileDef::Suit {
            suit,
            value: a as u8,
        };
        let def_b = TileDef::Suit {
            suit,
            value: b as u8,
        };

        let tile_a = hand.iter().find(|t| t.def == def_a);
        // Ensure we pick a distinct tile instance for `b`, in case `def_a == def_b`
        // was somehow reachable (it never is for consecutive values, but the
        // lookup below still guards against double-counting a single tile).
        let tile_b = hand
            .iter()
            .find(|t| t.def == def_b && tile_a.map(|a| a.id) != Some(t.id));

        if let (Some(&a), Some(&b)) = (tile_a, tile_b) {
            options.push(ChiOption { tiles: [a, b] });
        }
    }

    options
}

/// A legal self-kong: either promoting an existing pong, or a concealed kong
/// formed entirely from the hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelfKongOption {
    Concealed { tiles: [TileInstance; 4] },
    Promote { meld_index: usize, tile: TileInstance },
}

/// Enumerates every self-kong available to a player right now: one concealed
/// option per definition held four-deep in hand, and one promotion option
/// per existing pong meld whose definition the hand can still supply.
pub fn can_self_kong(hand: &[TileInstance], melds: &[Meld]) -> Vec<SelfKongOption> {
    let mut options = Vec::new();

    let counts = group_by_def(hand);
    for (&key, &count) in counts.iter() {
        if count >= 4 {
            let matches: Vec<_> = hand.iter().filter(|t| t.def == key.0).copied().collect();
            options.push(SelfKongOption::Concealed {
                tiles: [matches[0], matches[1], matches[2], matches[3]],
            });
        }
    }

    for (meld_index, meld) in melds.iter().enumerate() {
        if meld.kind != crate::meld::MeldKind::Pong {
            continue;
        }
        let def = meld.tiles[0].def;
        if let Some(tile) = hand.iter().find(|t| t.def == def) {
            options.push(SelfKongOption::Promote {
                meld_index,
                tile: *tile,
            });
        }
    }

    options
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::{Dragon, Suit, TileId, Wind};

    fn suit(suit: Suit, value: u8, id: u16) -> TileInstance {
        TileInstance::new(TileId(id), TileDef::Suit { suit, value })
    }

    fn dragon(dragon: Dragon, id: u16) -> TileInstance {
        TileInstance::new(TileId(id), TileDef::Dragon(dragon))
    }

    #[test]
    fn detects_four_sets_and_a_pair() {
        let hand = vec![
            suit(Suit::Bamboo, 1, 0),
            suit(Suit::Bamboo, 2, 1),
            suit(Suit::Bamboo, 3, 2),
            suit(Suit::Bamboo, 1, 3),
            suit(Suit::Bamboo, 2, 4),
            suit(Suit::Bamboo, 3, 5),
            suit(Suit::Dot, 4, 6),
            suit(Suit::Dot, 4, 7),
            suit(Suit::Dot, 4, 8),
            suit(Suit::Character, 5, 9),
            suit(Suit::Character, 5, 10),
            dragon(Dragon::Red, 11),
            dragon(Dragon::Red, 12),
            dragon(Dragon::Red, 13),
        ];

        assert!(check_win(&hand, &[]));
    }

    #[test]
    fn rejects_incomplete_hand() {
        let hand = vec![
            suit(Suit::Bamboo, 1, 0),
            suit(Suit::Bamboo, 2, 1),
            suit(Suit::Bamboo, 3, 2),
            suit(Suit::Dot, 4, 6),
            suit(Suit::Dot, 4, 7),
            suit(Suit::Dot, 4, 8),
            suit(Suit::Character, 5, 9),
            suit(Suit::Character, 5, 10),
        ];

        assert!(!check_win(&hand, &[]));
    }

    #[test]
    fn check_win_with_tile_matches_mutated_check_win() {
        let mut hand = vec![
            suit(Suit::Bamboo, 1, 0),
            suit(Suit::Bamboo, 2, 1),
            suit(Suit::Bamboo, 3, 2),
            suit(Suit::Dot, 4, 6),
            suit(Suit::Dot, 4, 7),
            suit(Suit::Dot, 4, 8),
            suit(Suit::Character, 5, 9),
        ];
        let winning_tile = suit(Suit::Character, 5, 10);

        assert!(check_win_with_tile(&hand, &[], winning_tile));

        hand.push(winning_tile);
        assert!(check_win(&hand, &[]));
    }

    #[test]
    fn chi_requires_claimer_to_be_next_player() {
        let hand = vec![suit(Suit::Bamboo, 4, 0), suit(Suit::Bamboo, 6, 1)];
        let discard = TileDef::Suit {
            suit: Suit::Bamboo,
            value: 5,
        };

        // Discarder 1 -> only seat 2 may chi.
        assert!(!can_all_chi(&hand, discard, 2, 1).is_empty());
        assert!(can_all_chi(&hand, discard, 3, 1).is_empty());
    }

    #[test]
    fn chi_enumerates_all_bounded_combinations() {
        let hand = vec![
            suit(Suit::Dot, 1, 0),
            suit(Suit::Dot, 2, 1),
            suit(Suit::Dot, 3, 2),
        ];
        let discard = TileDef::Suit {
            suit: Suit::Dot,
            value: 2,
        };

        // Discard is 2-dot; claimer next to discarder 0 is seat 1.
        let options = can_all_chi(&hand, discard, 1, 0);
        // (0,1) is out of range, (1,3) and (3,4) -> only (1,3) possible since no 4-dot.
        assert_eq!(1, options.len());
    }

    #[test]
    fn self_kong_prefers_promote_when_both_legal() {
        use crate::meld::{Meld, MeldKind};

        let pong = Meld::new(
            MeldKind::Pong,
            vec![dragon(Dragon::Green, 20), dragon(Dragon::Green, 21), dragon(Dragon::Green, 22)],
        );
        let hand = vec![dragon(Dragon::Green, 23)];

        let options = can_self_kong(&hand, std::slice::from_ref(&pong));
        assert!(matches!(options[0], SelfKongOption::Promote { .. }));
    }
}
