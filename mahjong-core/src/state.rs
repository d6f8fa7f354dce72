//! The authoritative game state for a single hand of Mahjong.

use crate::{
    meld::Meld,
    tile::{TileInstance, Wind},
    wall::Wall,
};
use serde::{Deserialize, Serialize};

/// How a seat is currently being controlled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConnectionStatus {
    HumanConnected,
    HumanDisconnected,
    Bot,
}

impl ConnectionStatus {
    pub fn is_bot(self) -> bool {
        matches!(self, ConnectionStatus::Bot)
    }

    pub fn is_human(self) -> bool {
        !self.is_bot()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub name: String,
    pub avatar: String,
    pub seat_wind: Wind,
    pub hand: Vec<TileInstance>,
    pub discards: Vec<TileInstance>,
    pub melds: Vec<Meld>,
    pub revealed_bonuses: Vec<TileInstance>,
    pub score: i64,
    pub connection: ConnectionStatus,
}

impl Player {
    pub fn new(name: String, avatar: String, seat_wind: Wind) -> Self {
        Self {
            name,
            avatar,
            seat_wind,
            hand: Vec::new(),
            discards: Vec::new(),
            melds: Vec::new(),
            revealed_bonuses: Vec::new(),
            score: 0,
            connection: ConnectionStatus::HumanConnected,
        }
    }

    /// Number of melds (chi/pong/kong/concealed-kong), each counted as a
    /// single "3-tile-equivalent" set for the hand-size arithmetic in §3.
    pub fn meld_count(&self) -> usize {
        self.melds.len()
    }

    /// The hand size expected right now: `13 - 3*meldCount` once the player
    /// has discarded, or one more while holding an undischarged draw.
    pub fn expected_hand_size(&self, holding_draw: bool) -> usize {
        let base = 13usize.saturating_sub(3 * self.meld_count());
        if holding_draw {
            base + 1
        } else {
            base
        }
    }

    pub fn is_open_handed(&self) -> bool {
        self.melds.iter().any(|m| m.is_open())
    }

    pub fn all_tiles(&self) -> impl Iterator<Item = &TileInstance> {
        self.hand
            .iter()
            .chain(self.melds.iter().flat_map(|m| m.tiles.iter()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    Waiting,
    Playing,
    Finished,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameState {
    pub players: [Player; 4],
    pub wall: Wall,
    pub current_player: usize,
    pub round_wind: Wind,
    pub round_number: u8,
    pub turn_counter: u64,
    pub last_discard: Option<TileInstance>,
    pub last_discarder: Option<usize>,
    pub phase: Phase,
}

impl GameState {
    pub fn dealer_index(&self) -> usize {
        self.players
            .iter()
            .position(|p| p.seat_wind == Wind::East)
            .expect("exactly one player holds the east seat wind")
    }

    pub fn next_index(&self, index: usize) -> usize {
        (index + 1) % 4
    }

    pub fn advance_turn(&mut self) {
        self.current_player = self.next_index(self.current_player);
        self.turn_counter += 1;
    }
}
