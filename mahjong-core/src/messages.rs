//! The wire protocol between a connected client and the room.
//!
//! Frames are JSON objects discriminated by a `type` field, matching the
//! message tables in the specification. Everything here is pure data: the
//! room state machine decides when to send what.

use crate::{
    analysis::ChiOption,
    scoring::{PaymentResult, TaiResult},
    tile::{TileId, TileInstance, Wind},
    view::ClientGameState,
};
use serde::{Deserialize, Serialize};

/// The kind of action a player is attempting, either on their turn or
/// during a claim window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionType {
    Draw,
    Discard,
    Chi,
    Pong,
    Kong,
    Win,
    Pass,
}

/// A message sent by a connected client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientMessage {
    Ready { is_ready: bool },
    StartGame,
    Action {
        action: ActionType,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        tile_id: Option<TileId>,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        chi_index: Option<usize>,
    },
    NextRound,
    Leave,
}

/// Whether a human's turn requires a draw or a discard right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TurnPhase {
    HumanNeedsDraw,
    HumanNeedsDiscard,
}

/// One seat in the lobby roster, before a game has started.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LobbySeat {
    pub name: String,
    pub avatar: String,
    pub is_ready: bool,
    pub is_bot: bool,
}

/// The lobby roster projected to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRoom {
    pub seats: [Option<LobbySeat>; 4],
    pub host_index: Option<usize>,
}

/// A message sent by the room to a connected client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    RoomState {
        room: ClientRoom,
    },
    GameStart {
        state: ClientGameState,
    },
    GameState {
        state: ClientGameState,
    },
    YourTurn {
        phase: TurnPhase,
        available_actions: Vec<ActionType>,
    },
    ClaimWindow {
        timeout_ms: u64,
        available_actions: Vec<ActionType>,
    },
    ChiOptions {
        options: Vec<ChiOptionWire>,
    },
    RoundOver {
        #[serde(skip_serializing_if = "Option::is_none")]
        winner_index: Option<usize>,
        #[serde(skip_serializing_if = "Option::is_none")]
        tai_result: Option<TaiResultWire>,
        #[serde(skip_serializing_if = "Option::is_none")]
        payment_result: Option<PaymentResultWire>,
        message: String,
    },
    PlayerDisconnected {
        player_index: usize,
    },
    PlayerReconnected {
        player_index: usize,
    },
    Error {
        message: String,
    },
}

/// Wire-friendly rendering of a `ChiOption`: the pair of tiles the claimer
/// already holds that would combine with the discard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChiOptionWire {
    pub tiles: [TileInstance; 2],
}

impl From<ChiOption> for ChiOptionWire {
    fn from(option: ChiOption) -> Self {
        Self {
            tiles: option.tiles,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaiEntryWire {
    pub pattern: String,
    pub tai: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaiResultWire {
    pub patterns: Vec<TaiEntryWire>,
    pub total_tai: u8,
    pub base_points: u64,
}

impl From<&TaiResult> for TaiResultWire {
    fn from(result: &TaiResult) -> Self {
        Self {
            patterns: result
                .patterns
                .iter()
                .map(|p| TaiEntryWire {
                    pattern: p.pattern.to_string(),
                    tai: p.tai,
                })
                .collect(),
            total_tai: result.total_tai,
            base_points: result.base_points,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentResultWire {
    pub payments: [i64; 4],
    pub winner_index: usize,
}

impl From<&PaymentResult> for PaymentResultWire {
    fn from(result: &PaymentResult) -> Self {
        Self {
            payments: result.payments,
            winner_index: result.winner_index,
        }
    }
}

/// Connection-time query parameters, parsed by the server from the initial
/// request URL (e.g. `?name=...&avatar=...&reconnectToken=...`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ConnectParams {
    pub name: String,
    pub avatar: String,
    #[serde(default, rename = "reconnectToken")]
    pub reconnect_token: Option<String>,
}

/// Re-exported so server code doesn't need to depend on `crate::tile`
/// directly just to name a seat.
pub type SeatWind = Wind;
