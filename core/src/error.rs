use thiserror::Error;

use crate::CellCount;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error("Invalid coordinates")]
    InvalidCoords,
    #[error("Too many mines: requested {requested}, board only fits {capacity} with a safe start")]
    TooManyMines {
        requested: CellCount,
        capacity: CellCount,
    },
    #[error("Unknown difficulty {0:?}")]
    UnknownDifficulty(String),
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),
}

pub type Result<T> = core::result::Result<T, GameError>;
