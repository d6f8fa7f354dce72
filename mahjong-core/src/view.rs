//! Projects the authoritative `GameState` down to what a single seat is
//! allowed to see: their own hand face-up, everyone else's reduced to a
//! tile count, and the wall reduced to a remaining-tile count.

use crate::{
    meld::Meld,
    state::{ConnectionStatus, GameState, Phase},
    tile::{TileInstance, Wind},
};
use serde::{Deserialize, Serialize};

/// A player's hand as seen by some viewer: fully revealed for the viewer's
/// own seat, collapsed to a count for every other seat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ClientHand {
    Revealed { tiles: Vec<TileInstance> },
    Hidden { count: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientPlayerView {
    pub name: String,
    pub avatar: String,
    pub seat_wind: Wind,
    pub hand: ClientHand,
    pub discards: Vec<TileInstance>,
    pub melds: Vec<Meld>,
    pub revealed_bonuses: Vec<TileInstance>,
    pub score: i64,
    pub connection: ConnectionStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientGameState {
    pub your_seat: usize,
    pub players: [ClientPlayerView; 4],
    pub round_wind: Wind,
    pub round_number: u8,
    pub current_player: usize,
    pub wall_remaining: usize,
    pub phase: Phase,
    pub last_discard: Option<TileInstance>,
    pub last_discarder: Option<usize>,
}

/// Projects `state` for the player sitting at `your_seat`.
pub fn project_for_seat(state: &GameState, your_seat: usize) -> ClientGameState {
    let players = std::array::from_fn(|index| {
        let player = &state.players[index];
        let hand = if index == your_seat {
            ClientHand::Revealed {
                tiles: player.hand.clone(),
            }
        } else {
            ClientHand::Hidden {
                count: player.hand.len(),
            }
        };

        ClientPlayerView {
            name: player.name.clone(),
            avatar: player.avatar.clone(),
            seat_wind: player.seat_wind,
            hand,
            discards: player.discards.clone(),
            melds: player.melds.clone(),
            revealed_bonuses: player.revealed_bonuses.clone(),
            score: player.score,
            connection: player.connection,
        }
    });

    ClientGameState {
        your_seat,
        players,
        round_wind: state.round_wind,
        round_number: state.round_number,
        current_player: state.current_player,
        wall_remaining: state.wall.remaining(),
        phase: state.phase,
        last_discard: state.last_discard,
        last_discarder: state.last_discarder,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        state::Player,
        tile::{TileDef, TileId, Suit},
        wall::Wall,
    };
    use rand::SeedableRng;
    use rand_pcg::Pcg64Mcg;

    fn fresh_state() -> GameState {
        let mut rng = Pcg64Mcg::seed_from_u64(7);
        let mut players: [Player; 4] = std::array::from_fn(|i| {
            Player::new(format!("p{i}"), ":)".into(), Wind::East)
        });
        for (i, wind) in [Wind::East, Wind::South, Wind::West, Wind::North]
            .into_iter()
            .enumerate()
        {
            players[i].seat_wind = wind;
            players[i].hand.push(TileInstance::new(
                TileId(i as u16),
                TileDef::Suit { suit: Suit::Bamboo, value: 1 },
            ));
        }
        GameState {
            players,
            wall: Wall::shuffled(&mut rng),
            current_player: 0,
            round_wind: Wind::East,
            round_number: 1,
            turn_counter: 0,
            last_discard: None,
            last_discarder: None,
            phase: Phase::Playing,
        }
    }

    #[test]
    fn own_hand_is_revealed_others_are_hidden() {
        let state = fresh_state();
        let view = project_for_seat(&state, 0);

        assert!(matches!(view.players[0].hand, ClientHand::Revealed { .. }));
        assert!(matches!(view.players[1].hand, ClientHand::Hidden { count: 1 }));
        assert!(matches!(view.players[2].hand, ClientHand::Hidden { count: 1 }));
        assert!(matches!(view.players[3].hand, ClientHand::Hidden { count: 1 }));
    }

    #[test]
    fn wall_is_reduced_to_a_count() {
        let state = fresh_state();
        let view = project_for_seat(&state, 2);
        assert_eq!(state.wall.remaining(), view.wall_remaining);
    }
}
