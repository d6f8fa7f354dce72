//! Completed sets of tiles taken out of a hand.

use crate::tile::TileInstance;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MeldKind {
    Chi,
    Pong,
    Kong,
    ConcealedKong,
}

impl MeldKind {
    /// A concealed kong is closed; every other meld kind is open, since it
    /// was built from a claimed discard or (for a promoted kong) started
    /// life as an open pong.
    pub fn is_open(self) -> bool {
        !matches!(self, MeldKind::ConcealedKong)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meld {
    pub kind: MeldKind,
    pub tiles: Vec<TileInstance>,
}

impl Meld {
    pub fn new(kind: MeldKind, tiles: Vec<TileInstance>) -> Self {
        debug_assert_eq!(
            tiles.len(),
            match kind {
                MeldKind::Chi | MeldKind::Pong => 3,
                MeldKind::Kong | MeldKind::ConcealedKong => 4,
            }
        );
        Self { kind, tiles }
    }

    pub fn is_open(&self) -> bool {
        self.kind.is_open()
    }
}
