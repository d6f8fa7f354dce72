//! Pure state transitions. Every function here validates its preconditions
//! before touching `GameState`, so a rejected move never leaves a partial
//! mutation behind — the caller can tell a no-op happened because it gets an
//! `Err` back, never by comparing state snapshots.

use crate::{
    analysis::{self, ChiOption, SelfKongOption},
    error::MoveError,
    meld::{Meld, MeldKind},
    state::{GameState, Phase, Player},
    tile::{TileDef, TileId, TileInstance},
    wall::Wall,
};

/// Draws from the head of the wall, following the bonus-replacement chain
/// (replacements after the first come from the tail). Returns `None` if the
/// wall runs out mid-chain.
fn draw_for_turn(wall: &mut Wall, revealed_bonuses: &mut Vec<TileInstance>) -> Option<TileInstance> {
    let mut tile = wall.draw_head().ok()?;
    while tile.def.is_bonus() {
        let mut revealed = tile;
        revealed.face_up = true;
        revealed_bonuses.push(revealed);
        tile = wall.draw_tail().ok()?;
    }
    Some(tile)
}

/// Draws a single replacement tile from the tail, following the same bonus
/// chain. Used after kong and self-kong.
fn draw_replacement(wall: &mut Wall, revealed_bonuses: &mut Vec<TileInstance>) -> Option<TileInstance> {
    let mut tile = wall.draw_tail().ok()?;
    while tile.def.is_bonus() {
        let mut revealed = tile;
        revealed.face_up = true;
        revealed_bonuses.push(revealed);
        tile = wall.draw_tail().ok()?;
    }
    Some(tile)
}

/// Repeatedly moves bonus tiles out of every hand into `revealed_bonuses`,
/// drawing a tail replacement for each one, until no hand holds a bonus
/// tile. Returns `false` if the wall runs out before reaching a fixed point.
fn resolve_bonus_tiles(players: &mut [Player; 4], wall: &mut Wall) -> bool {
    loop {
        let mut replaced_any = false;

        for player in players.iter_mut() {
            let mut index = 0;
            while index < player.hand.len() {
                if player.hand[index].def.is_bonus() {
                    let mut bonus = player.hand.remove(index);
                    bonus.face_up = true;
                    player.revealed_bonuses.push(bonus);
                    replaced_any = true;

                    match wall.draw_tail() {
                        Ok(replacement) => player.hand.push(replacement),
                        Err(_) => return false,
                    }
                } else {
                    index += 1;
                }
            }
        }

        if !replaced_any {
            return true;
        }
    }
}

/// Deals 13 tiles to each player (14 to the dealer) from the head of the
/// wall, then resolves the initial bonus-replacement chain.
///
/// If the wall empties during either step, the round ends immediately in a
/// draw (`state.phase` becomes `Finished`) rather than returning an error:
/// an empty wall is an expected outcome, not invalid input.
pub fn deal_round(state: &mut GameState) -> Result<(), MoveError> {
    for seat in 0..4 {
        for _ in 0..13 {
            let tile = match state.wall.draw_head() {
                Ok(tile) => tile,
                Err(_) => {
                    state.phase = Phase::Finished;
                    return Ok(());
                }
            };
            state.players[seat].hand.push(tile);
        }
    }

    let dealer = state.dealer_index();
    match state.wall.draw_head() {
        Ok(tile) => state.players[dealer].hand.push(tile),
        Err(_) => {
            state.phase = Phase::Finished;
            return Ok(());
        }
    }

    if !resolve_bonus_tiles(&mut state.players, &mut state.wall) {
        state.phase = Phase::Finished;
        return Ok(());
    }

    state.phase = Phase::Playing;
    state.current_player = dealer;
    Ok(())
}

/// Draws a tile for `seat`'s turn. Returns `Ok(None)` if the wall is
/// exhausted mid-draw (round ends in a draw); the caller is responsible for
/// noticing `state.phase` became `Finished` and broadcasting accordingly.
pub fn draw(state: &mut GameState, seat: usize) -> Result<Option<TileId>, MoveError> {
    if state.phase != Phase::Playing {
        return Err(MoveError::WrongPhase);
    }
    if seat != state.current_player {
        return Err(MoveError::NotCurrentPlayer(seat));
    }

    let expected = state.players[seat].expected_hand_size(false);
    if state.players[seat].hand.len() != expected {
        return Err(MoveError::DrawAlreadyPending);
    }

    match draw_for_turn(&mut state.wall, &mut state.players[seat].revealed_bonuses) {
        Some(tile) => {
            state.players[seat].hand.push(tile);
            Ok(Some(tile.id))
        }
        None => {
            state.phase = Phase::Finished;
            Ok(None)
        }
    }
}

/// Discards `tile_id` from the current player's hand. Fails with
/// `NoPendingDraw` if the seat isn't currently holding the extra tile a draw
/// or claim leaves behind. Clears whoever held the turn so the claim window
/// (tracked by the room layer, not here) can decide who moves next.
pub fn discard(state: &mut GameState, seat: usize, tile_id: TileId) -> Result<(), MoveError> {
    if state.phase != Phase::Playing {
        return Err(MoveError::WrongPhase);
    }
    if seat != state.current_player {
        return Err(MoveError::NotCurrentPlayer(seat));
    }

    let player = &mut state.players[seat];
    if player.hand.len() != player.expected_hand_size(true) {
        return Err(MoveError::NoPendingDraw);
    }
    let pos = player
        .hand
        .iter()
        .position(|t| t.id == tile_id)
        .ok_or(MoveError::TileNotInHand(tile_id))?;

    let mut tile = player.hand.remove(pos);
    tile.face_up = true;
    player.discards.push(tile);

    state.last_discard = Some(tile);
    state.last_discarder = Some(seat);
    state.turn_counter += 1;

    Ok(())
}

/// Pulls the pending `last_discard` out of the discarder's pile so a claim
/// can attach it to a new meld. Clears the pending-discard slots.
fn take_claimed_discard(state: &mut GameState) -> Result<TileInstance, MoveError> {
    let discard = state.last_discard.take().ok_or(MoveError::WrongPhase)?;
    let discarder = state.last_discarder.take().ok_or(MoveError::WrongPhase)?;

    let discards = &mut state.players[discarder].discards;
    let pos = discards
        .iter()
        .position(|t| t.id == discard.id)
        .ok_or(MoveError::WrongPhase)?;
    discards.remove(pos);

    Ok(discard)
}

fn remove_from_hand(hand: &mut Vec<TileInstance>, tile: TileInstance) -> Result<(), MoveError> {
    let pos = hand
        .iter()
        .position(|t| t.id == tile.id)
        .ok_or(MoveError::TileNotInHand(tile.id))?;
    hand.remove(pos);
    Ok(())
}

/// Returns `true` iff `a`, `b`, `c` are three suit tiles of the same suit
/// with consecutive values, in any order.
fn forms_chi_run(a: TileDef, b: TileDef, c: TileDef) -> bool {
    let (TileDef::Suit { suit: s1, value: v1 }, TileDef::Suit { suit: s2, value: v2 }, TileDef::Suit { suit: s3, value: v3 }) =
        (a, b, c)
    else {
        return false;
    };
    if s1 != s2 || s2 != s3 {
        return false;
    }
    let mut values = [v1, v2, v3];
    values.sort_unstable();
    values[1] == values[0] + 1 && values[2] == values[1] + 1
}

/// Claims the pending discard as a chi, using the two hand tiles in `option`.
pub fn claim_chi(state: &mut GameState, claimer: usize, option: ChiOption) -> Result<(), MoveError> {
    let discarder = state.last_discarder.ok_or(MoveError::WrongPhase)?;
    if (discarder + 1) % 4 != claimer {
        return Err(MoveError::NotNextPlayer {
            claimer,
            discarder,
        });
    }
    let discard_def = state.last_discard.ok_or(MoveError::WrongPhase)?.def;
    if !forms_chi_run(option.tiles[0].def, option.tiles[1].def, discard_def) {
        return Err(MoveError::IllegalChi);
    }

    let discard = take_claimed_discard(state)?;
    let hand = &mut state.players[claimer].hand;
    remove_from_hand(hand, option.tiles[0])?;
    remove_from_hand(hand, option.tiles[1])?;

    let mut tiles = vec![option.tiles[0], option.tiles[1], discard];
    for tile in tiles.iter_mut() {
        tile.face_up = true;
    }
    state.players[claimer]
        .melds
        .push(Meld::new(MeldKind::Chi, tiles.drain(..).collect()));

    state.current_player = claimer;
    Ok(())
}

/// Claims the pending discard as a pong, using the two hand tiles given.
pub fn claim_pong(
    state: &mut GameState,
    claimer: usize,
    held: [TileInstance; 2],
) -> Result<(), MoveError> {
    let discard_def = state.last_discard.ok_or(MoveError::WrongPhase)?.def;
    if held[0].def != discard_def || held[1].def != discard_def {
        return Err(MoveError::IllegalPong);
    }

    let discard = take_claimed_discard(state)?;
    let hand = &mut state.players[claimer].hand;
    remove_from_hand(hand, held[0])?;
    remove_from_hand(hand, held[1])?;

    let mut tiles = vec![held[0], held[1], discard];
    for tile in tiles.iter_mut() {
        tile.face_up = true;
    }
    state.players[claimer]
        .melds
        .push(Meld::new(MeldKind::Pong, tiles));

    state.current_player = claimer;
    Ok(())
}

/// Claims the pending discard as a kong, using the three hand tiles given.
/// Also draws a replacement tile (with the bonus-replacement chain applied).
/// Returns `Ok(None)` if the wall is exhausted by the replacement draw.
pub fn claim_kong(
    state: &mut GameState,
    claimer: usize,
    held: [TileInstance; 3],
) -> Result<Option<TileId>, MoveError> {
    let discard_def = state.last_discard.ok_or(MoveError::WrongPhase)?.def;
    if held.iter().any(|tile| tile.def != discard_def) {
        return Err(MoveError::IllegalKong);
    }

    let discard = take_claimed_discard(state)?;
    let hand = &mut state.players[claimer].hand;
    for tile in held {
        remove_from_hand(hand, tile)?;
    }

    let mut tiles = vec![held[0], held[1], held[2], discard];
    for tile in tiles.iter_mut() {
        tile.face_up = true;
    }
    state.players[claimer]
        .melds
        .push(Meld::new(MeldKind::Kong, tiles));

    state.current_player = claimer;

    match draw_replacement(&mut state.wall, &mut state.players[claimer].revealed_bonuses) {
        Some(tile) => {
            state.players[claimer].hand.push(tile);
            Ok(Some(tile.id))
        }
        None => {
            state.phase = Phase::Finished;
            Ok(None)
        }
    }
}

/// Applies a self-kong (concealed, or promoting an existing pong) and draws
/// a replacement tile. Returns `Ok(None)` if the wall is exhausted.
pub fn self_kong(
    state: &mut GameState,
    seat: usize,
    option: SelfKongOption,
) -> Result<Option<TileId>, MoveError> {
    if seat != state.current_player || state.phase != Phase::Playing {
        return Err(MoveError::NotCurrentPlayer(seat));
    }

    match option {
        SelfKongOption::Concealed { tiles } => {
            let hand = &mut state.players[seat].hand;
            for tile in tiles {
                remove_from_hand(hand, tile)?;
            }
            state.players[seat]
                .melds
                .push(Meld::new(MeldKind::ConcealedKong, tiles.to_vec()));
        }

        SelfKongOption::Promote { meld_index, tile } => {
            let hand = &mut state.players[seat].hand;
            remove_from_hand(hand, tile)?;

            let meld = state.players[seat]
                .melds
                .get_mut(meld_index)
                .ok_or(MoveError::IllegalSelfKong)?;
            if meld.kind != MeldKind::Pong {
                return Err(MoveError::IllegalSelfKong);
            }
            meld.kind = MeldKind::Kong;
            let mut promoted = tile;
            promoted.face_up = true;
            meld.tiles.push(promoted);
        }
    }

    match draw_replacement(&mut state.wall, &mut state.players[seat].revealed_bonuses) {
        Some(tile) => {
            state.players[seat].hand.push(tile);
            Ok(Some(tile.id))
        }
        None => {
            state.phase = Phase::Finished;
            Ok(None)
        }
    }
}

/// Ends the round now that `winner`'s hand is known to be a complete
/// winning hand. Private: every public entry point below validates first.
fn finish_win(state: &mut GameState) {
    state.phase = Phase::Finished;
}

/// Ends the round with `winner` as the winning player. Used for a
/// self-drawn win, where the winning tile is already part of `winner.hand`.
/// Fails with `NotAWin` if the hand doesn't actually decompose into 4 sets
/// and a pair.
pub fn declare_win(state: &mut GameState, winner: usize) -> Result<(), MoveError> {
    let player = &state.players[winner];
    if !analysis::check_win(&player.hand, &player.melds) {
        return Err(MoveError::NotAWin);
    }
    finish_win(state);
    Ok(())
}

/// Ends the round with `winner` winning off the pending discard: moves the
/// discard into `winner.hand` (so the scorer sees a complete hand) before
/// transitioning. Fails with `NotAWin` if the hand plus the discard doesn't
/// decompose into 4 sets and a pair.
pub fn claim_win(state: &mut GameState, winner: usize) -> Result<(), MoveError> {
    let discard = state.last_discard.ok_or(MoveError::WrongPhase)?;
    let player = &state.players[winner];
    if !analysis::check_win_with_tile(&player.hand, &player.melds, discard) {
        return Err(MoveError::NotAWin);
    }

    let discard = take_claimed_discard(state)?;
    state.players[winner].hand.push(discard);
    finish_win(state);
    Ok(())
}

/// Robs a promoted self-kong: pulls `tile` out of `kong_owner`'s hand
/// before it can join their kong meld, and into `winner`'s hand instead.
/// Fails with `NotAWin` if `winner`'s hand plus `tile` doesn't decompose
/// into 4 sets and a pair.
pub fn rob_kong(
    state: &mut GameState,
    kong_owner: usize,
    winner: usize,
    tile: TileInstance,
) -> Result<(), MoveError> {
    let player = &state.players[winner];
    if !analysis::check_win_with_tile(&player.hand, &player.melds, tile) {
        return Err(MoveError::NotAWin);
    }

    remove_from_hand(&mut state.players[kong_owner].hand, tile)?;
    state.players[winner].hand.push(tile);
    finish_win(state);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::Wind;
    use rand::SeedableRng;
    use rand_pcg::Pcg64Mcg;

    fn fresh_state(seed: u64) -> GameState {
        let mut rng = Pcg64Mcg::seed_from_u64(seed);
        GameState {
            players: [
                Player::new("P0".into(), ":)".into(), Wind::East),
                Player::new("P1".into(), ":)".into(), Wind::South),
                Player::new("P2".into(), ":)".into(), Wind::West),
                Player::new("P3".into(), ":)".into(), Wind::North),
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

    #[test]
    fn deal_round_gives_dealer_fourteen_tiles() {
        let mut state = fresh_state(42);
        deal_round(&mut state).unwrap();

        assert_eq!(Phase::Playing, state.phase);
        let dealer = state.dealer_index();
        assert_eq!(14, state.players[dealer].hand.len());
        for (i, player) in state.players.iter().enumerate() {
            if i != dealer {
                assert_eq!(13, player.hand.len());
            }
            assert!(player.hand.iter().all(|t| !t.def.is_bonus()));
        }
    }

    #[test]
    fn deal_round_conserves_144_tiles() {
        let mut state = fresh_state(7);
        deal_round(&mut state).unwrap();

        let in_hands: usize = state.players.iter().map(|p| p.hand.len()).sum();
        let in_bonuses: usize = state.players.iter().map(|p| p.revealed_bonuses.len()).sum();
        assert_eq!(144, in_hands + in_bonuses + state.wall.remaining());
    }

    #[test]
    fn discard_then_draw_cycles_turn_ownership() {
        let mut state = fresh_state(99);
        deal_round(&mut state).unwrap();

        let dealer = state.current_player;
        let tile_id = state.players[dealer].hand[0].id;
        discard(&mut state, dealer, tile_id).unwrap();

        assert_eq!(Some(dealer), state.last_discarder);
        assert!(state.players[dealer].discards.iter().any(|t| t.id == tile_id));
    }

    #[test]
    fn draw_rejects_wrong_seat() {
        let mut state = fresh_state(5);
        deal_round(&mut state).unwrap();
        let not_current = (state.current_player + 1) % 4;
        assert!(draw(&mut state, not_current).is_err());
    }

    #[test]
    fn discard_rejects_seat_with_no_pending_draw() {
        let mut state = fresh_state(5);
        deal_round(&mut state).unwrap();

        let dealer = state.current_player;
        let waiting_seat = (dealer + 1) % 4;
        state.current_player = waiting_seat;
        let tile_id = state.players[waiting_seat].hand[0].id;

        assert_eq!(
            Err(MoveError::NoPendingDraw),
            discard(&mut state, waiting_seat, tile_id)
        );
    }

    use crate::tile::Suit;

    fn tile(def: TileDef, id: u16) -> TileInstance {
        TileInstance::new(TileId(id), def)
    }

    fn waiting_on_pair(winner: usize) -> GameState {
        let mut state = fresh_state(1);
        state.phase = Phase::Playing;
        state.players[winner].hand = vec![
            tile(TileDef::Suit { suit: Suit::Bamboo, value: 1 }, 0),
            tile(TileDef::Suit { suit: Suit::Bamboo, value: 2 }, 1),
            tile(TileDef::Suit { suit: Suit::Bamboo, value: 3 }, 2),
            tile(TileDef::Suit { suit: Suit::Dot, value: 4 }, 3),
            tile(TileDef::Suit { suit: Suit::Dot, value: 4 }, 4),
            tile(TileDef::Suit { suit: Suit::Dot, value: 4 }, 5),
            tile(TileDef::Suit { suit: Suit::Character, value: 5 }, 6),
        ];
        state
    }

    #[test]
    fn claim_win_completes_hand_with_the_discard() {
        let mut state = waiting_on_pair(0);
        let winning_tile = tile(TileDef::Suit { suit: Suit::Character, value: 5 }, 7);
        state.players[1].discards.push(winning_tile);
        state.last_discard = Some(winning_tile);
        state.last_discarder = Some(1);

        claim_win(&mut state, 0).unwrap();

        assert_eq!(Phase::Finished, state.phase);
        assert!(state.players[0].hand.iter().any(|t| t.id == winning_tile.id));
        assert!(state.players[1].discards.is_empty());
    }

    #[test]
    fn claim_win_rejects_a_discard_that_does_not_complete_the_hand() {
        let mut state = waiting_on_pair(0);
        let stray_tile = tile(TileDef::Suit { suit: Suit::Dot, value: 9 }, 7);
        state.players[1].discards.push(stray_tile);
        state.last_discard = Some(stray_tile);
        state.last_discarder = Some(1);

        assert_eq!(Err(MoveError::NotAWin), claim_win(&mut state, 0));
    }

    #[test]
    fn rob_kong_pulls_the_promoted_tile_out_of_the_owners_hand() {
        let mut state = waiting_on_pair(0);
        let robbed_tile = tile(TileDef::Suit { suit: Suit::Character, value: 5 }, 7);
        state.players[1].hand.push(robbed_tile);

        rob_kong(&mut state, 1, 0, robbed_tile).unwrap();

        assert_eq!(Phase::Finished, state.phase);
        assert!(!state.players[1].hand.iter().any(|t| t.id == robbed_tile.id));
        assert!(state.players[0].hand.iter().any(|t| t.id == robbed_tile.id));
    }

    #[test]
    fn claim_pong_rejects_held_tiles_not_matching_the_discard() {
        let mut state = fresh_state(2);
        state.phase = Phase::Playing;
        let mismatched = tile(TileDef::Suit { suit: Suit::Dot, value: 1 }, 0);
        state.players[0].hand = vec![mismatched, mismatched];
        let discard = tile(TileDef::Suit { suit: Suit::Bamboo, value: 1 }, 1);
        state.players[1].discards.push(discard);
        state.last_discard = Some(discard);
        state.last_discarder = Some(1);

        assert_eq!(
            Err(MoveError::IllegalPong),
            claim_pong(&mut state, 0, [mismatched, mismatched])
        );
    }

    #[test]
    fn claim_kong_rejects_held_tiles_not_matching_the_discard() {
        let mut state = fresh_state(3);
        state.phase = Phase::Playing;
        let mismatched = tile(TileDef::Suit { suit: Suit::Dot, value: 1 }, 0);
        let discard = tile(TileDef::Suit { suit: Suit::Bamboo, value: 1 }, 1);
        state.players[1].discards.push(discard);
        state.last_discard = Some(discard);
        state.last_discarder = Some(1);

        assert_eq!(
            Err(MoveError::IllegalKong),
            claim_kong(&mut state, 0, [mismatched, mismatched, mismatched])
        );
    }

    #[test]
    fn claim_chi_rejects_tiles_that_do_not_form_a_run_with_the_discard() {
        let mut state = fresh_state(4);
        state.phase = Phase::Playing;
        state.last_discarder = Some(3);
        state.current_player = 3;

        let a = tile(TileDef::Suit { suit: Suit::Dot, value: 1 }, 0);
        let b = tile(TileDef::Suit { suit: Suit::Bamboo, value: 5 }, 1);
        let discard = tile(TileDef::Suit { suit: Suit::Bamboo, value: 9 }, 2);
        state.players[0].hand = vec![a, b];
        state.players[3].discards.push(discard);
        state.last_discard = Some(discard);

        assert_eq!(
            Err(MoveError::IllegalChi),
            claim_chi(&mut state, 0, ChiOption { tiles: [a, b] })
        );
    }
}
