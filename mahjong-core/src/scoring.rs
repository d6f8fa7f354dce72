//! Singapore *tai* scoring and payment resolution.
//!
//! Every pattern here reads only from a player's declared melds, hand (which
//! must already include the winning tile by the time the caller reaches
//! here), and revealed bonuses — the same three views the room state
//! machine already maintains, so the scorer never needs its own copy of the
//! hand-decomposition search in `crate::analysis`.

use crate::{
    meld::MeldKind,
    state::Player,
    tile::{BonusKind, Dragon, TileDef, Wind},
};

/// One scored pattern and its tai contribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaiEntry {
    pub pattern: &'static str,
    pub tai: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaiResult {
    pub patterns: Vec<TaiEntry>,
    pub total_tai: u8,
    pub base_points: u64,
}

/// Counts declared melds matching `def` whose kind is a triplet-or-quad
/// (pong, kong, or concealed kong) — i.e. excludes chi.
fn meld_count_of(player: &Player, def: TileDef) -> usize {
    player
        .melds
        .iter()
        .filter(|m| m.kind != MeldKind::Chi && m.tiles[0].def == def)
        .count()
}

fn hand_count_of(player: &Player, def: TileDef) -> usize {
    player.hand.iter().filter(|t| t.def == def).count()
}

/// Computes the tai breakdown for `winner`'s completed hand.
///
/// `self_draw` marks whether the winning tile was drawn rather than
/// claimed from a discard. `round_wind` is the current hand's prevailing
/// wind. The winning tile must already be present in `winner.hand`.
pub fn calculate_tai(winner: &Player, self_draw: bool, round_wind: Wind) -> TaiResult {
    let mut patterns = Vec::new();

    let flowers = winner
        .revealed_bonuses
        .iter()
        .filter(|t| matches!(t.def, TileDef::Bonus { kind: BonusKind::Flower, .. }))
        .count();
    if flowers > 0 {
        patterns.push(TaiEntry {
            pattern: "Flowers",
            tai: flowers as u8,
        });
    }

    let animal_values: Vec<u8> = winner
        .revealed_bonuses
        .iter()
        .filter_map(|t| match t.def {
            TileDef::Bonus { kind: BonusKind::Animal, value } => Some(value),
            _ => None,
        })
        .collect();
    if !animal_values.is_empty() {
        patterns.push(TaiEntry {
            pattern: "Animals",
            tai: animal_values.len() as u8,
        });
    }

    if flowers == 4 {
        patterns.push(TaiEntry { pattern: "All-flowers", tai: 1 });
    }
    if animal_values.len() == 4 {
        patterns.push(TaiEntry { pattern: "All-animals", tai: 1 });
    }
    if animal_values.contains(&1) && animal_values.contains(&2) {
        patterns.push(TaiEntry { pattern: "Cat-and-mouse", tai: 1 });
    }
    if animal_values.contains(&3) && animal_values.contains(&4) {
        patterns.push(TaiEntry { pattern: "Rooster-and-centipede", tai: 1 });
    }

    if self_draw {
        patterns.push(TaiEntry { pattern: "Self-draw", tai: 1 });
    }

    if winner.revealed_bonuses.is_empty() {
        patterns.push(TaiEntry { pattern: "No bonus tiles", tai: 1 });
    }

    if !winner.is_open_handed() {
        patterns.push(TaiEntry { pattern: "Concealed hand", tai: 1 });
    }

    if !winner.melds.is_empty() && winner.melds.iter().all(|m| m.kind != MeldKind::Chi) {
        patterns.push(TaiEntry { pattern: "All pongs", tai: 2 });
    }

    let dragon_melds: Vec<Dragon> = [Dragon::Red, Dragon::Green, Dragon::White]
        .into_iter()
        .filter(|&d| meld_count_of(winner, TileDef::Dragon(d)) > 0)
        .collect();
    if !dragon_melds.is_empty() {
        patterns.push(TaiEntry {
            pattern: "Dragon pong",
            tai: dragon_melds.len() as u8,
        });
    }

    if meld_count_of(winner, TileDef::Wind(winner.seat_wind)) > 0 {
        patterns.push(TaiEntry { pattern: "Seat-wind pong", tai: 1 });
    }
    if meld_count_of(winner, TileDef::Wind(round_wind)) > 0 {
        patterns.push(TaiEntry { pattern: "Round-wind pong", tai: 1 });
    }

    let all_tiles: Vec<TileDef> = winner
        .hand
        .iter()
        .chain(winner.melds.iter().flat_map(|m| m.tiles.iter()))
        .map(|t| t.def)
        .collect();

    let suits_present: std::collections::HashSet<_> = all_tiles
        .iter()
        .filter_map(|d| match d {
            TileDef::Suit { suit, .. } => Some(*suit),
            _ => None,
        })
        .collect();
    let any_honor = all_tiles.iter().any(|d| d.is_honor());
    let any_suit = !suits_present.is_empty();

    if any_suit && !any_honor && suits_present.len() == 1 {
        patterns.push(TaiEntry { pattern: "Full flush", tai: 4 });
    } else if any_suit && any_honor && suits_present.len() == 1 {
        patterns.push(TaiEntry { pattern: "Half flush", tai: 2 });
    }

    if all_tiles.iter().all(|d| d.is_honor()) {
        patterns.push(TaiEntry { pattern: "All honors", tai: 10 });
    }
    if all_tiles.iter().all(|d| d.is_terminal()) {
        patterns.push(TaiEntry { pattern: "All terminals", tai: 10 });
    }

    if dragon_melds.len() == 2 {
        let third = [Dragon::Red, Dragon::Green, Dragon::White]
            .into_iter()
            .find(|d| !dragon_melds.contains(d));
        if let Some(third) = third {
            if hand_count_of(winner, TileDef::Dragon(third)) >= 2 {
                patterns.push(TaiEntry { pattern: "Small three dragons", tai: 4 });
            }
        }
    }
    if dragon_melds.len() == 3 {
        patterns.push(TaiEntry { pattern: "Big three dragons", tai: 8 });
    }

    let wind_pong_melds: Vec<Wind> = [Wind::East, Wind::South, Wind::West, Wind::North]
        .into_iter()
        .filter(|&w| meld_count_of(winner, TileDef::Wind(w)) > 0)
        .collect();
    if wind_pong_melds.len() == 3 {
        let fourth = [Wind::East, Wind::South, Wind::West, Wind::North]
            .into_iter()
            .find(|w| !wind_pong_melds.contains(w));
        if let Some(fourth) = fourth {
            if hand_count_of(winner, TileDef::Wind(fourth)) >= 2 {
                patterns.push(TaiEntry { pattern: "Small four winds", tai: 8 });
            }
        }
    }
    if wind_pong_melds.len() == 4 {
        patterns.push(TaiEntry { pattern: "Big four winds", tai: 10 });
    }

    let raw_total: u32 = patterns.iter().map(|p| p.tai as u32).sum();
    let total_tai = raw_total.clamp(1, 10) as u8;
    let base_points = 2u64.pow(total_tai as u32);

    TaiResult {
        patterns,
        total_tai,
        base_points,
    }
}

/// Per-player signed payment amounts for a round, in seat order. The
/// winner's entry is the sum of everyone else's absolute payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentResult {
    pub payments: [i64; 4],
    pub winner_index: usize,
}

/// Computes payments for a `base_points`-value win by `winner_index`.
///
/// On a self-draw, every other player pays `base_points`. Otherwise the
/// discarder (`shooter_index`) pays double and everyone else pays
/// `base_points` once.
pub fn calculate_payments(
    winner_index: usize,
    self_draw: bool,
    shooter_index: Option<usize>,
    base_points: u64,
) -> PaymentResult {
    let mut payments = [0i64; 4];
    let mut collected = 0i64;

    for i in 0..4 {
        if i == winner_index {
            continue;
        }
        let pays_double = !self_draw && shooter_index == Some(i);
        let amount = if pays_double {
            2 * base_points as i64
        } else {
            base_points as i64
        };
        payments[i] = -amount;
        collected += amount;
    }
    payments[winner_index] = collected;

    PaymentResult {
        payments,
        winner_index,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::{Suit, TileId, TileInstance};

    fn tile(def: TileDef, id: u16) -> TileInstance {
        TileInstance::new(TileId(id), def)
    }

    fn base_player() -> Player {
        Player::new("Winner".into(), ":)".into(), Wind::East)
    }

    #[test]
    fn concealed_self_draw_scores_three_tai() {
        let mut winner = base_player();
        winner.hand = vec![
            tile(TileDef::Suit { suit: Suit::Bamboo, value: 1 }, 0),
            tile(TileDef::Suit { suit: Suit::Bamboo, value: 2 }, 1),
            tile(TileDef::Suit { suit: Suit::Bamboo, value: 3 }, 2),
            tile(TileDef::Suit { suit: Suit::Dot, value: 4 }, 3),
            tile(TileDef::Suit { suit: Suit::Dot, value: 4 }, 4),
            tile(TileDef::Suit { suit: Suit::Dot, value: 4 }, 5),
            tile(TileDef::Suit { suit: Suit::Character, value: 5 }, 6),
            tile(TileDef::Suit { suit: Suit::Character, value: 5 }, 7),
        ];

        // Self-draw + no revealed bonuses + fully concealed: three independent
        // +1 patterns, not two — see the "No bonus tiles" note in DESIGN.md.
        let result = calculate_tai(&winner, true, Wind::East);
        assert_eq!(3, result.total_tai);
        assert_eq!(8, result.base_points);
        assert!(result.patterns.iter().any(|p| p.pattern == "Self-draw"));
        assert!(result.patterns.iter().any(|p| p.pattern == "No bonus tiles"));
        assert!(result.patterns.iter().any(|p| p.pattern == "Concealed hand"));
    }

    #[test]
    fn payments_are_zero_sum_and_discarder_pays_double() {
        let result = calculate_payments(0, false, Some(2), 4);
        let sum: i64 = result.payments.iter().sum();
        assert_eq!(0, sum);
        assert_eq!(-8, result.payments[2]);
        assert_eq!(-4, result.payments[1]);
        assert_eq!(-4, result.payments[3]);
        assert_eq!(16, result.payments[0]);
    }

    #[test]
    fn self_draw_payments_are_uniform() {
        let result = calculate_payments(1, true, None, 4);
        assert_eq!(-4, result.payments[0]);
        assert_eq!(-4, result.payments[2]);
        assert_eq!(-4, result.payments[3]);
        assert_eq!(12, result.payments[1]);
    }

    #[test]
    fn tai_clamped_to_ten() {
        let mut winner = base_player();
        winner.hand = vec![
            tile(TileDef::Wind(Wind::East), 0),
            tile(TileDef::Wind(Wind::East), 1),
        ];
        winner.melds = vec![
            crate::meld::Meld::new(
                crate::meld::MeldKind::Pong,
                vec![
                    tile(TileDef::Dragon(Dragon::Red), 2),
                    tile(TileDef::Dragon(Dragon::Red), 3),
                    tile(TileDef::Dragon(Dragon::Red), 4),
                ],
            ),
            crate::meld::Meld::new(
                crate::meld::MeldKind::Pong,
                vec![
                    tile(TileDef::Dragon(Dragon::Green), 5),
                    tile(TileDef::Dragon(Dragon::Green), 6),
                    tile(TileDef::Dragon(Dragon::Green), 7),
                ],
            ),
            crate::meld::Meld::new(
                crate::meld::MeldKind::Pong,
                vec![
                    tile(TileDef::Dragon(Dragon::White), 8),
                    tile(TileDef::Dragon(Dragon::White), 9),
                    tile(TileDef::Dragon(Dragon::White), 10),
                ],
            ),
        ];

        let result = calculate_tai(&winner, false, Wind::East);
        assert_eq!(10, result.total_tai);
        assert_eq!(1024, result.base_points);
    }
}
