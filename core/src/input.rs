use serde::{Deserialize, Serialize};

use crate::*;

/// Maps pointer positions to board positions.
///
/// Implemented by the presentation layer, which knows where the board is drawn.
pub trait ScreenMapper {
    /// Board `(col, row)` under the screen point, `None` when the point misses the board area.
    ///
    /// The result is not checked against the board dimensions, that is left to the caller.
    fn screen_to_board(&self, x: i32, y: i32) -> Option<(Coord, Coord)>;
}

/// Fixed pixel layout of a board drawn as a grid of square cells.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardGeometry {
    pub offset_x: i32,
    pub offset_y: i32,
    pub padding: i32,
    pub cell_size: i32,
    /// Space between adjacent cells.
    pub gap: i32,
}

impl Default for BoardGeometry {
    fn default() -> Self {
        Self {
            offset_x: 50,
            offset_y: 150,
            padding: 10,
            cell_size: 30,
            gap: 2,
        }
    }
}

impl BoardGeometry {
    const fn pitch(&self) -> i32 {
        self.cell_size + self.gap
    }

    /// Top-left pixel of the cell at `(row, col)`.
    pub const fn board_to_screen(&self, coords: Coord2) -> (i32, i32) {
        let (row, col) = (coords.0 as i32, coords.1 as i32);
        let x = self.offset_x + self.padding + col * self.pitch();
        let y = self.offset_y + self.padding + row * self.pitch();
        (x, y)
    }

    /// Pixel width and height of a board with `size` cells including padding.
    pub const fn board_extent(&self, size: Coord2) -> (i32, i32) {
        (
            self.pitch() * size.1 as i32 + self.padding * 2,
            self.pitch() * size.0 as i32 + self.padding * 2,
        )
    }
}

impl ScreenMapper for BoardGeometry {
    fn screen_to_board(&self, x: i32, y: i32) -> Option<(Coord, Coord)> {
        let board_x = x.saturating_sub(self.offset_x + self.padding);
        let board_y = y.saturating_sub(self.offset_y + self.padding);

        if board_x < 0 || board_y < 0 || self.pitch() <= 0 {
            return None;
        }

        let col = Coord::try_from(board_x / self.pitch()).ok()?;
        let row = Coord::try_from(board_y / self.pitch()).ok()?;
        Some((col, row))
    }
}
