//! The job world: a short secondary track a player can detour onto from a
//! job tile. While away, the player's main-board position is frozen.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    Farmhand,
    Courier,
    Miner,
}

impl JobKind {
    pub fn pay_per_step(self) -> u64 {
        match self {
            JobKind::Farmhand => 4,
            JobKind::Courier => 6,
            JobKind::Miner => 8,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobKind::Farmhand => "farmhand",
            JobKind::Courier => "courier",
            JobKind::Miner => "miner",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobState {
    pub kind: JobKind,
    pub position: usize,
    pub earned: u64,
}

impl JobState {
    pub fn new(kind: JobKind) -> Self {
        Self {
            kind,
            position: 0,
            earned: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStep {
    Worked { position: usize, wage: u64 },
    Returned { wage: u64, bonus: u64 },
}

/// Moves along the job track. Running past its end ends the detour.
pub fn advance(state: &mut JobState, dice: u8, track_length: usize, return_bonus: u64) -> JobStep {
    let wage = state.kind.pay_per_step() * u64::from(dice);
    state.earned += wage;
    let next = state.position + usize::from(dice);
    if next >= track_length {
        JobStep::Returned {
            wage,
            bonus: return_bonus,
        }
    } else {
        state.position = next;
        JobStep::Worked {
            position: next,
            wage,
        }
    }
}
