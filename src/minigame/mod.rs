//! Nested state machines entered from special landings. At most one is live
//! per game; every endpoint dispatches on [`MinigameKind`].

mod hybrid;
mod invader;
mod mining;
mod rpg;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use hybrid::{HybridBattle, HybridCommand, HybridStatus};
pub use invader::{DuelSide, DuelStatus, InvaderDuel};
pub use mining::{cosmetic_score, Block, MiningDig, Ore};
pub use rpg::{auto_battle, BattleStatus, Enemy, RpgAction, RpgBattle, PLAYER_HP};

use crate::player::PlayerId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MinigameKind {
    Invader,
    Rpg,
    Hybrid,
    Mining,
}

impl fmt::Display for MinigameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MinigameKind::Invader => "invader",
            MinigameKind::Rpg => "rpg",
            MinigameKind::Hybrid => "hybrid",
            MinigameKind::Mining => "mining",
        })
    }
}

/// How a combat exchange left the fight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombatOutcome {
    Ongoing,
    Victory,
    Defeat,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Minigame {
    Invader(InvaderDuel),
    Rpg(RpgBattle),
    Hybrid(HybridBattle),
    Mining(MiningDig),
}

impl Minigame {
    pub fn kind(&self) -> MinigameKind {
        match self {
            Minigame::Invader(_) => MinigameKind::Invader,
            Minigame::Rpg(_) => MinigameKind::Rpg,
            Minigame::Hybrid(_) => MinigameKind::Hybrid,
            Minigame::Mining(_) => MinigameKind::Mining,
        }
    }

    /// Players allowed to drive this minigame.
    pub fn participants(&self) -> Vec<&PlayerId> {
        match self {
            Minigame::Invader(duel) => vec![&duel.attacker, &duel.defender],
            Minigame::Rpg(battle) => vec![&battle.player],
            Minigame::Hybrid(battle) => vec![&battle.player],
            Minigame::Mining(dig) => vec![&dig.player],
        }
    }

    /// Moves out of the countdown/approach phase. Mining starts live.
    pub fn ready(&mut self) {
        match self {
            Minigame::Invader(duel) => duel.status = DuelStatus::Playing,
            Minigame::Rpg(battle) => battle.status = BattleStatus::Playing,
            Minigame::Hybrid(battle) => battle.status = HybridStatus::Engaged,
            Minigame::Mining(_) => {}
        }
    }
}
