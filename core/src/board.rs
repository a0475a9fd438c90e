use ndarray::Array2;
use rand::Rng;
use rand::prelude::*;
use serde::{Deserialize, Serialize};

use crate::*;

/// Grid of cells plus the mine layout bookkeeping.
///
/// The board knows nothing about turns or rules, it only stores state and answers
/// aggregate queries. Dimensions are fixed at construction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Board {
    cells: Array2<Cell>,
    total_mines: CellCount,
}

impl Board {
    pub fn new(rows: Coord, cols: Coord) -> Self {
        Self {
            cells: Array2::default((rows, cols).to_nd_index()),
            total_mines: 0,
        }
    }

    /// Builds a board with mines at exactly the given positions and neighbor counts filled in.
    pub fn from_mine_coords(size: Coord2, mine_coords: &[Coord2]) -> Result<Self> {
        let mut board = Self::new(size.0, size.1);

        for &coords in mine_coords {
            let cell = board.cell_mut(coords).ok_or(GameError::InvalidCoords)?;
            cell.is_mine = true;
        }

        board.total_mines = board.cells.iter().filter(|cell| cell.is_mine).count() as CellCount;
        board.calculate_neighbor_mines();
        Ok(board)
    }

    pub fn rows(&self) -> Coord {
        self.cells.dim().0 as Coord
    }

    pub fn cols(&self) -> Coord {
        self.cells.dim().1 as Coord
    }

    pub fn size(&self) -> Coord2 {
        (self.rows(), self.cols())
    }

    pub fn total_mines(&self) -> CellCount {
        self.total_mines
    }

    pub fn is_valid_position(&self, (row, col): Coord2) -> bool {
        row < self.rows() && col < self.cols()
    }

    /// Cell at `coords`, `None` when out of bounds.
    pub fn cell(&self, coords: Coord2) -> Option<&Cell> {
        self.cells.get(coords.to_nd_index())
    }

    pub(crate) fn cell_mut(&mut self, coords: Coord2) -> Option<&mut Cell> {
        self.cells.get_mut(coords.to_nd_index())
    }

    /// All cells in row-major order together with their positions.
    pub fn iter(&self) -> impl Iterator<Item = (Coord2, &Cell)> {
        self.cells
            .indexed_iter()
            .map(|((row, col), cell)| ((row as Coord, col as Coord), cell))
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (Coord2, &mut Cell)> {
        self.cells
            .indexed_iter_mut()
            .map(|((row, col), cell)| ((row as Coord, col as Coord), cell))
    }

    /// In-bounds positions around `coords`, row delta first then column delta.
    pub fn neighbors(&self, coords: Coord2) -> NeighborIter {
        self.cells.iter_neighbors(coords)
    }

    /// Lays out `count` mines uniformly at random, never on `exclude`.
    ///
    /// Any previous layout is discarded. Sparse boards use rejection sampling; once the
    /// mines would fill more than half of the free cells a partial Fisher-Yates shuffle over
    /// the free positions is used instead, so a nearly full board does not spin on
    /// collisions.
    pub fn place_mines<R: Rng + ?Sized>(
        &mut self,
        count: CellCount,
        exclude: Coord2,
        rng: &mut R,
    ) -> Result<()> {
        let total_cells = self.total_cells();
        let capacity = if self.is_valid_position(exclude) {
            total_cells.saturating_sub(1)
        } else {
            total_cells
        };

        if count > capacity {
            log::warn!(
                "Cannot place mines, requested {} but only {} fit",
                count,
                capacity
            );
            return Err(GameError::TooManyMines {
                requested: count,
                capacity,
            });
        }

        for cell in self.cells.iter_mut() {
            cell.is_mine = false;
        }

        if count <= capacity / 2 {
            self.place_mines_rejection(count, exclude, rng);
        } else {
            self.place_mines_shuffled(count, exclude, rng);
        }

        self.total_mines = count;
        self.calculate_neighbor_mines();
        log::debug!(
            "Placed {} mines on {}x{} board, excluding {:?}",
            count,
            self.rows(),
            self.cols(),
            exclude
        );
        Ok(())
    }

    fn place_mines_rejection<R: Rng + ?Sized>(
        &mut self,
        count: CellCount,
        exclude: Coord2,
        rng: &mut R,
    ) {
        let (rows, cols) = self.size();
        let mut mines_placed = 0;

        while mines_placed < count {
            let coords = (rng.random_range(0..rows), rng.random_range(0..cols));
            if coords == exclude {
                continue;
            }

            let cell = &mut self.cells[coords.to_nd_index()];
            if !cell.is_mine {
                cell.is_mine = true;
                mines_placed += 1;
            }
        }
    }

    fn place_mines_shuffled<R: Rng + ?Sized>(
        &mut self,
        count: CellCount,
        exclude: Coord2,
        rng: &mut R,
    ) {
        let mut free: Vec<Coord2> = self
            .iter()
            .map(|(coords, _)| coords)
            .filter(|&coords| coords != exclude)
            .collect();

        for i in 0..usize::from(count) {
            let j = rng.random_range(i..free.len());
            free.swap(i, j);
            self.cells[free[i].to_nd_index()].is_mine = true;
        }
    }

    /// Recomputes `neighbor_mines` for every cell, mines themselves carry 0.
    pub(crate) fn calculate_neighbor_mines(&mut self) {
        let counts: Vec<u8> = self
            .iter()
            .map(|(coords, cell)| {
                if cell.is_mine {
                    0
                } else {
                    self.count_neighbor_mines(coords)
                }
            })
            .collect();

        for (cell, count) in self.cells.iter_mut().zip(counts) {
            cell.neighbor_mines = count;
        }
    }

    fn count_neighbor_mines(&self, coords: Coord2) -> u8 {
        self.neighbors(coords)
            .filter(|&pos| self.cells[pos.to_nd_index()].is_mine)
            .count() as u8
    }

    /// Replaces every cell with a fresh hidden, unflagged, mine-free one.
    pub fn reset(&mut self) {
        self.cells.fill(Cell::default());
        self.total_mines = 0;
    }

    pub fn revealed_count(&self) -> CellCount {
        self.cells.iter().filter(|cell| cell.is_revealed).count() as CellCount
    }

    pub fn flagged_count(&self) -> CellCount {
        self.cells.iter().filter(|cell| cell.is_flagged).count() as CellCount
    }

    pub fn total_cells(&self) -> CellCount {
        mult(self.rows(), self.cols())
    }

    /// Non-mine cells still hidden, the game is won once this reaches zero.
    pub fn safe_cells_left(&self) -> CellCount {
        self.total_cells()
            .saturating_sub(self.total_mines)
            .saturating_sub(self.revealed_count())
    }
}
