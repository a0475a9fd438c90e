use core::fmt;
use serde::{Deserialize, Serialize};

/// Audio cue emitted by [`GameLogic`](crate::GameLogic) while playing.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameEvent {
    Click,
    Flag,
    Mine,
    Win,
    GameOver,
}

impl GameEvent {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Click => "click",
            Self::Flag => "flag",
            Self::Mine => "mine",
            Self::Win => "win",
            Self::GameOver => "game_over",
        }
    }
}

impl fmt::Display for GameEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
