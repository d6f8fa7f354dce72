//! The discard and claim heuristics used to play a bot-controlled seat.
//!
//! Nothing here is required to be deterministic — the random draws are part
//! of the behavior itself — but every function takes its randomness as an
//! explicit `Rng` so tests (and anything else that wants reproducible bot
//! play) can inject a seeded source instead of reaching for a global one.

use crate::{
    analysis::{ChiOption, SelfKongOption},
    tile::{TileDef, TileId, TileInstance, Wind},
};
use rand::Rng;

/// What the bot decides to do about a pending claim window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimChoice {
    Win,
    Kong,
    Pong,
    Chi(usize),
    Pass,
}

/// The claims available to a bot at a given claim window, mirroring what
/// the room state machine computed for this seat.
#[derive(Debug, Clone)]
pub struct AvailableClaims<'a> {
    pub win: bool,
    pub kong: bool,
    pub pong: bool,
    pub chi: &'a [ChiOption],
}

/// Scores a tile for how worth discarding it is; the highest-scoring tile
/// in the hand is chosen. Higher means "more willing to throw this away".
fn discard_score(tile: &TileInstance, hand: &[TileInstance]) -> i32 {
    let mut score = 0;

    // A tile that already shares its definition with others in hand is
    // part of a kept pair or triplet — the more copies, the less willing
    // we are to break it up.
    let duplicate_count = hand.iter().filter(|t| t.def == tile.def).count();
    score -= (duplicate_count as i32 - 1) * 10;

    if let TileDef::Suit { suit, value } = tile.def {
        let has = |v: i16| {
            (1..=9).contains(&v)
                && hand.iter().any(|t| {
                    t.def
                        == TileDef::Suit {
                            suit,
                            value: v as u8,
                        }
                })
        };
        // Sitting next to a neighbor means this tile is part of a
        // potential chi; keep it.
        if has(value as i16 - 1) {
            score -= 5;
        }
        if has(value as i16 + 1) {
            score -= 5;
        }
        if value == 1 || value == 9 {
            score += 2;
        }
    }

    if tile.def.is_bonus() {
        score += 1000;
    }

    score
}

/// Chooses which tile to discard from `hand`.
///
/// # Panics
///
/// Panics if `hand` is empty; the room state machine never asks a bot to
/// discard from an empty hand.
pub fn choose_discard(hand: &[TileInstance]) -> TileId {
    hand.iter()
        .max_by_key(|tile| discard_score(tile, hand))
        .expect("a player about to discard always has at least one tile")
        .id
}

/// Decides how to respond to a claim window.
///
/// Win is always taken when available (the caller is responsible for only
/// offering `win: true` once the minimum-tai rule has been satisfied). Kong
/// always beats pong, since it comes with a free replacement draw. Dragon
/// and seat-wind pongs are always taken; other pongs and any chi are taken
/// with fixed probabilities so bot play isn't perfectly predictable.
pub fn decide_claim(
    available: &AvailableClaims<'_>,
    seat_wind: Wind,
    discard_def: TileDef,
    rng: &mut impl Rng,
) -> ClaimChoice {
    if available.win {
        return ClaimChoice::Win;
    }
    if available.kong {
        return ClaimChoice::Kong;
    }
    if available.pong {
        let is_dragon = matches!(discard_def, TileDef::Dragon(_));
        let is_seat_wind = discard_def == TileDef::Wind(seat_wind);
        if is_dragon || is_seat_wind || rng.gen_bool(0.3) {
            return ClaimChoice::Pong;
        }
    }
    if !available.chi.is_empty() && rng.gen_bool(0.4) {
        let index = rng.gen_range(0..available.chi.len());
        return ClaimChoice::Chi(index);
    }

    ClaimChoice::Pass
}

/// A self-kong is always declared when legal. When multiple options exist,
/// prefer the first one reported by `crate::analysis::can_self_kong`, which
/// already orders promotions ahead of concealed kongs.
pub fn choose_self_kong(options: &[SelfKongOption]) -> Option<SelfKongOption> {
    options.first().copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::{Dragon, Suit};
    use rand::SeedableRng;
    use rand_pcg::Pcg64Mcg;

    fn suit(suit: Suit, value: u8, id: u16) -> TileInstance {
        TileInstance::new(TileId(id), TileDef::Suit { suit, value })
    }

    #[test]
    fn prefers_discarding_isolated_terminal_over_paired_middle_tile() {
        let hand = vec![
            suit(Suit::Bamboo, 5, 0),
            suit(Suit::Bamboo, 5, 1),
            suit(Suit::Dot, 9, 2),
        ];
        let discard = choose_discard(&hand);
        assert_eq!(TileId(2), discard);
    }

    #[test]
    fn always_wins_when_available() {
        let mut rng = Pcg64Mcg::seed_from_u64(1);
        let available = AvailableClaims {
            win: true,
            kong: true,
            pong: true,
            chi: &[],
        };
        let choice = decide_claim(
            &available,
            Wind::East,
            TileDef::Dragon(Dragon::Red),
            &mut rng,
        );
        assert_eq!(ClaimChoice::Win, choice);
    }

    #[test]
    fn always_pongs_dragons() {
        let mut rng = Pcg64Mcg::seed_from_u64(2);
        let available = AvailableClaims {
            win: false,
            kong: false,
            pong: true,
            chi: &[],
        };
        let choice = decide_claim(
            &available,
            Wind::South,
            TileDef::Dragon(Dragon::White),
            &mut rng,
        );
        assert_eq!(ClaimChoice::Pong, choice);
    }
}
