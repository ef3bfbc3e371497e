use serde::{Deserialize, Serialize};

use crate::player::PlayerId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DuelStatus {
    Countdown,
    Playing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuelSide {
    #[default]
    Attacker,
    Defender,
}

/// A 1v1 duel over a crop tile, opened when a player stops on someone
/// else's crop. The client plays the duel and reports the winner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvaderDuel {
    pub tile: usize,
    pub attacker: PlayerId,
    pub defender: PlayerId,
    pub status: DuelStatus,
    pub created_turn: u32,
}

impl InvaderDuel {
    pub fn new(tile: usize, attacker: PlayerId, defender: PlayerId, created_turn: u32) -> Self {
        Self {
            tile,
            attacker,
            defender,
            status: DuelStatus::Countdown,
            created_turn,
        }
    }

    pub fn winner(&self, side: DuelSide) -> &PlayerId {
        match side {
            DuelSide::Attacker => &self.attacker,
            DuelSide::Defender => &self.defender,
        }
    }

    pub fn countdown_events() -> Vec<String> {
        ["3", "2", "1", "start!"]
            .into_iter()
            .map(|beat| format!("Invader: {beat}"))
            .collect()
    }
}
