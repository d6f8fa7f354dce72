//! Error types for the pure engine layer.
//!
//! These are never panics: every fallible engine operation returns one of
//! these instead, and the caller (the room state machine) decides whether to
//! silently ignore the attempt or answer with an `error` frame, per the
//! error-handling design in the specification.

use crate::tile::TileId;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WallError {
    #[error("not enough tiles remain in the wall: needed {needed}, had {remaining}")]
    Insufficient { remaining: usize, needed: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MoveError {
    #[error("player {0} is not the current player")]
    NotCurrentPlayer(usize),

    #[error("tile {0:?} is not in the player's hand")]
    TileNotInHand(TileId),

    #[error("no current draw is pending for this player")]
    NoPendingDraw,

    #[error("a draw is already pending; discard first")]
    DrawAlreadyPending,

    #[error(transparent)]
    Wall(#[from] WallError),

    #[error("the requested chi is not a legal combination for this hand")]
    IllegalChi,

    #[error("the requested pong is not legal: fewer than two matching tiles in hand")]
    IllegalPong,

    #[error("the requested kong is not legal: fewer than three matching tiles in hand")]
    IllegalKong,

    #[error("no self-kong is available")]
    IllegalSelfKong,

    #[error("claimer {claimer} cannot claim from discarder {discarder}: not adjacent for chi")]
    NotNextPlayer { claimer: usize, discarder: usize },

    #[error("the hand does not form a complete winning hand")]
    NotAWin,

    #[error("the game is not in a phase that allows this action")]
    WrongPhase,
}
