use serde::{Deserialize, Serialize};

/// State of a single board position.
///
/// Fields are only writable from within the crate; presentation layers read
/// them through the accessors.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub(crate) is_mine: bool,
    pub(crate) is_revealed: bool,
    pub(crate) is_flagged: bool,
    pub(crate) neighbor_mines: u8,
}

impl Cell {
    pub const fn is_mine(&self) -> bool {
        self.is_mine
    }

    pub const fn is_revealed(&self) -> bool {
        self.is_revealed
    }

    pub const fn is_flagged(&self) -> bool {
        self.is_flagged
    }

    /// Mines among the surrounding cells, only meaningful when this cell is not a mine.
    pub const fn neighbor_mines(&self) -> u8 {
        self.neighbor_mines
    }

    /// Whether a reveal would act on this cell.
    pub const fn is_revealable(&self) -> bool {
        !self.is_revealed && !self.is_flagged
    }
}
