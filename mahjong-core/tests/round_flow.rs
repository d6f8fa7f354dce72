//! End-to-end scenarios driving a full hand through the public `mahjong_core`
//! API: dealing, the draw/discard cycle, claims, and scoring. These exercise
//! the same surface the room state machine calls into, without any network
//! or actor plumbing.

use mahjong_core::{
    analysis::{can_all_chi, can_pong, check_win},
    meld::MeldKind,
    moves::{claim_chi, claim_pong, deal_round, discard, draw},
    scoring::calculate_tai,
    state::{GameState, Phase, Player},
    tile::{TileDef, Wind},
    wall::Wall,
};
use pretty_assertions::assert_eq;
use rand::SeedableRng;
use rand_pcg::Pcg64Mcg;

fn fresh_state(seed: u64) -> GameState {
    let mut rng = Pcg64Mcg::seed_from_u64(seed);
    GameState {
        players: [
            Player::new("East".into(), ":)".into(), Wind::East),
            Player::new("South".into(), ":)".into(), Wind::South),
            Player::new("West".into(), ":)".into(), Wind::West),
            Player::new("North".into(), ":)".into(), Wind::North),
        ],
        wall: Wall::shuffled(&mut rng),
        current_player: 0,
        round_wind: Wind::East,
        round_number: 1,
        turn_counter: 0,
        last_discard: None,
        last_discarder: None,
        phase: Phase::Waiting,
    }
}

fn total_tiles(state: &GameState) -> usize {
    let in_players: usize = state
        .players
        .iter()
        .map(|p| p.hand.len() + p.discards.len() + p.revealed_bonuses.len() + p.melds.iter().map(|m| m.tiles.len()).sum::<usize>())
        .sum();
    in_players + state.wall.remaining()
}

// §8: the 144-tile multiset is conserved across every move, no matter how
// many turns pass, since tiles only ever move between zones.
#[test]
fn tile_count_is_conserved_across_many_turns() {
    let mut state = fresh_state(1);
    deal_round(&mut state).unwrap();
    assert_eq!(144, total_tiles(&state));

    for _ in 0..40 {
        if state.phase != Phase::Playing {
            break;
        }
        let seat = state.current_player;
        if draw(&mut state, seat).unwrap().is_none() {
            break;
        }
        assert_eq!(144, total_tiles(&state));

        let tile_id = state.players[seat].hand[0].id;
        discard(&mut state, seat, tile_id).unwrap();
        assert_eq!(144, total_tiles(&state));

        state.last_discard = None;
        state.last_discarder = None;
        state.current_player = state.next_index(seat);
    }
}

// §3: a claimed pong removes exactly two tiles from the claimer's hand and
// attaches the discard as the meld's third tile, handing the claimer the
// turn regardless of whose turn it was.
#[test]
fn pong_claim_moves_discard_into_an_open_meld_and_hands_over_the_turn() {
    let mut state = fresh_state(2);
    deal_round(&mut state).unwrap();

    let target_def = TileDef::Suit {
        suit: mahjong_core::tile::Suit::Dot,
        value: 7,
    };

    // Stack the discarder's and claimer's hands by hand so the scenario is
    // deterministic regardless of shuffle.
    state.players[0].hand[0].def = target_def;
    state.players[0].hand[0].id = mahjong_core::tile::TileId(9000);
    state.players[2].hand[0].def = target_def;
    state.players[2].hand[0].id = mahjong_core::tile::TileId(9001);
    state.players[2].hand[1].def = target_def;
    state.players[2].hand[1].id = mahjong_core::tile::TileId(9002);

    let discarding_tile = state.players[0].hand[0].id;
    discard(&mut state, 0, discarding_tile).unwrap();

    let held = can_pong(&state.players[2].hand, target_def).expect("claimer holds a pair");
    claim_pong(&mut state, 2, held).unwrap();

    assert_eq!(2, state.current_player);
    assert_eq!(1, state.players[2].melds.len());
    assert_eq!(MeldKind::Pong, state.players[2].melds[0].kind);
    assert!(state.players[2].melds[0]
        .tiles
        .iter()
        .all(|t| t.def == target_def));
    assert_eq!(144, total_tiles(&state));
}

// §3: chi is only legal for the player seated immediately after the
// discarder; everyone else must be refused even if they hold a completing
// pair of tiles.
#[test]
fn chi_is_restricted_to_the_next_seat() {
    let mut state = fresh_state(3);
    deal_round(&mut state).unwrap();

    let suit = mahjong_core::tile::Suit::Character;
    state.players[2].hand[0].def = TileDef::Suit { suit, value: 5 };
    state.players[2].hand[1].def = TileDef::Suit { suit, value: 6 };

    let discard_def = TileDef::Suit { suit, value: 4 };
    let next_seat_options = can_all_chi(&state.players[2].hand, discard_def, 3, 2);
    let far_seat_options = can_all_chi(&state.players[2].hand, discard_def, 0, 2);

    assert!(!next_seat_options.is_empty());
    assert!(far_seat_options.is_empty());
}

// §3/§6: claiming a chi leaves the claimer's hand size consistent with one
// extra declared meld and removes the two contributed tiles from the hand.
#[test]
fn chi_claim_reduces_hand_by_two_and_opens_a_meld() {
    let mut state = fresh_state(4);
    deal_round(&mut state).unwrap();

    let suit = mahjong_core::tile::Suit::Bamboo;
    state.players[1].hand[0].def = TileDef::Suit { suit, value: 2 };
    state.players[1].hand[1].def = TileDef::Suit { suit, value: 3 };

    let before_len = state.players[1].hand.len();
    let discard_def = TileDef::Suit { suit, value: 1 };
    state.players[0].hand[0].def = discard_def;
    let discarding_tile = state.players[0].hand[0].id;
    discard(&mut state, 0, discarding_tile).unwrap();

    let options = can_all_chi(&state.players[1].hand, discard_def, 1, 0);
    assert!(!options.is_empty());
    claim_chi(&mut state, 1, options[0]).unwrap();

    assert_eq!(before_len - 2, state.players[1].hand.len());
    assert_eq!(1, state.players[1].melds.len());
    assert_eq!(MeldKind::Chi, state.players[1].melds[0].kind);
}

// §5: a concealed, self-drawn hand of three dragon pongs plus a run scores
// at least dragon pong, concealed-hand, and self-draw tai.
#[test]
fn big_three_dragons_scores_heavily() {
    use mahjong_core::meld::Meld;
    use mahjong_core::tile::{Dragon, TileId, TileInstance};

    let mut winner = Player::new("Winner".into(), ":)".into(), Wind::East);
    let tile = |def, id| TileInstance::new(TileId(id), def);

    winner.melds = vec![
        Meld::new(
            MeldKind::Pong,
            vec![
                tile(TileDef::Dragon(Dragon::Red), 0),
                tile(TileDef::Dragon(Dragon::Red), 1),
                tile(TileDef::Dragon(Dragon::Red), 2),
            ],
        ),
        Meld::new(
            MeldKind::Pong,
            vec![
                tile(TileDef::Dragon(Dragon::Green), 3),
                tile(TileDef::Dragon(Dragon::Green), 4),
                tile(TileDef::Dragon(Dragon::Green), 5),
            ],
        ),
        Meld::new(
            MeldKind::Pong,
            vec![
                tile(TileDef::Dragon(Dragon::White), 6),
                tile(TileDef::Dragon(Dragon::White), 7),
                tile(TileDef::Dragon(Dragon::White), 8),
            ],
        ),
    ];
    winner.hand = vec![
        tile(TileDef::Suit { suit: mahjong_core::tile::Suit::Dot, value: 3 }, 9),
        tile(TileDef::Suit { suit: mahjong_core::tile::Suit::Dot, value: 3 }, 10),
    ];

    let result = calculate_tai(&winner, true, Wind::East);
    assert!(result.patterns.iter().any(|p| p.pattern == "Big three dragons"));
    assert_eq!(10, result.total_tai, "big three dragons alone clamps near the ceiling");
}

// §4: a hand that is missing its pair must never be reported as a win, even
// when every other group is a legal triplet or run.
#[test]
fn pairless_hand_never_wins() {
    let suit = mahjong_core::tile::Suit::Bamboo;
    let tile = |value, id| {
        mahjong_core::tile::TileInstance::new(
            mahjong_core::tile::TileId(id),
            TileDef::Suit { suit, value },
        )
    };
    let hand = vec![
        tile(1, 0), tile(2, 1), tile(3, 2),
        tile(4, 3), tile(5, 4), tile(6, 5),
        tile(7, 6), tile(8, 7), tile(9, 8),
        tile(1, 9), tile(2, 10), tile(3, 11),
        tile(4, 12),
    ];
    assert!(!check_win(&hand, &[]));
}
