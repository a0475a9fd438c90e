use core::fmt;
use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::*;

/// Board shape, mine count and time limit of a preset.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DifficultyConfig {
    pub rows: Coord,
    pub cols: Coord,
    pub mines: CellCount,
    pub time_limit_secs: u32,
}

impl DifficultyConfig {
    pub const fn size(&self) -> Coord2 {
        (self.rows, self.cols)
    }

    pub const fn total_cells(&self) -> CellCount {
        mult(self.rows, self.cols)
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Easy,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 2] = [Difficulty::Easy, Difficulty::Hard];

    pub const fn config(self) -> DifficultyConfig {
        match self {
            Self::Easy => DifficultyConfig {
                rows: 10,
                cols: 10,
                mines: 10,
                time_limit_secs: 900,
            },
            Self::Hard => DifficultyConfig {
                rows: 16,
                cols: 16,
                mines: 40,
                time_limit_secs: 600,
            },
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Difficulty {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|difficulty| difficulty.name() == s)
            .ok_or_else(|| GameError::UnknownDifficulty(s.to_owned()))
    }
}
