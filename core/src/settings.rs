use serde::{Deserialize, Serialize};

use crate::*;

/// Start-up configuration of a [`GameLogic`].
///
/// Missing fields fall back to the defaults, so `{}` is a valid settings document.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameSettings {
    pub difficulty: Difficulty,
    /// Fixes the mine placement sequence, random when absent.
    pub seed: Option<u64>,
}

impl GameSettings {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|err| GameError::InvalidSettings(err.to_string()))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|err| GameError::InvalidSettings(err.to_string()))
    }
}
