use rand::{seq::SliceRandom, Rng};
use serde::{Deserialize, Serialize};

use super::CombatOutcome;
use crate::player::PlayerId;

pub const PLAYER_HP: u32 = 12;
const PLAYER_HIT: std::ops::RangeInclusive<u32> = 3..=6;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Enemy {
    pub name: String,
    pub hp: u32,
    pub max_hp: u32,
    pub atk_min: u32,
    pub atk_max: u32,
}

struct Species {
    name: &'static str,
    hp_min: u32,
    hp_max: u32,
    atk_min: u32,
    atk_max: u32,
}

static BESTIARY: [Species; 3] = [
    Species {
        name: "Slime",
        hp_min: 8,
        hp_max: 12,
        atk_min: 1,
        atk_max: 3,
    },
    Species {
        name: "Goblin",
        hp_min: 10,
        hp_max: 14,
        atk_min: 2,
        atk_max: 4,
    },
    Species {
        name: "Wolf",
        hp_min: 9,
        hp_max: 13,
        atk_min: 1,
        atk_max: 4,
    },
];

impl Enemy {
    pub fn spawn<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let species = BESTIARY.choose(rng).unwrap_or(&BESTIARY[0]);
        let hp = rng.gen_range(species.hp_min..=species.hp_max);
        Self {
            name: species.name.to_string(),
            hp,
            max_hp: hp,
            atk_min: species.atk_min,
            atk_max: species.atk_max,
        }
    }

    pub(crate) fn strike<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        rng.gen_range(self.atk_min..=self.atk_max)
    }

    pub(crate) fn take_hit(&mut self, damage: u32) {
        self.hp = self.hp.saturating_sub(damage);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BattleStatus {
    Countdown,
    Playing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RpgAction {
    #[default]
    Attack,
}

/// Turn-based encounter on a battle tile: trade blows until one side drops.
#[derive(Debug, Clone, Serialize)]
pub struct RpgBattle {
    pub player: PlayerId,
    pub status: BattleStatus,
    pub player_hp: u32,
    pub enemy: Enemy,
    pub created_turn: u32,
    pub log: Vec<String>,
}

impl RpgBattle {
    pub fn new<R: Rng + ?Sized>(player: PlayerId, created_turn: u32, rng: &mut R) -> Self {
        let enemy = Enemy::spawn(rng);
        let log = vec![format!("A wild {} appears!", enemy.name)];
        Self {
            player,
            status: BattleStatus::Countdown,
            player_hp: PLAYER_HP,
            enemy,
            created_turn,
            log,
        }
    }

    /// One exchange. Returns the outcome and the log lines it produced.
    pub fn act<R: Rng + ?Sized>(&mut self, action: RpgAction, rng: &mut R) -> (CombatOutcome, Vec<String>) {
        self.status = BattleStatus::Playing;
        let mut lines = Vec::new();
        match action {
            RpgAction::Attack => {
                let damage = rng.gen_range(PLAYER_HIT);
                self.enemy.take_hit(damage);
                lines.push(format!("You attack! {damage} damage"));
            }
        }
        let outcome = if self.enemy.hp == 0 {
            lines.push(format!("{} is defeated!", self.enemy.name));
            CombatOutcome::Victory
        } else {
            let damage = self.enemy.strike(rng);
            self.player_hp = self.player_hp.saturating_sub(damage);
            lines.push(format!("{} attacks! {damage} damage", self.enemy.name));
            if self.player_hp == 0 {
                CombatOutcome::Defeat
            } else {
                CombatOutcome::Ongoing
            }
        };
        self.log.extend(lines.iter().cloned());
        (outcome, lines)
    }
}

/// Abbreviated fight for bots: true when the bot wins.
pub fn auto_battle<R: Rng + ?Sized>(rng: &mut R) -> bool {
    let mut enemy_hp: u32 = rng.gen_range(8..=12);
    let mut player_hp = PLAYER_HP;
    loop {
        enemy_hp = enemy_hp.saturating_sub(rng.gen_range(PLAYER_HIT));
        if enemy_hp == 0 {
            return true;
        }
        player_hp = player_hp.saturating_sub(rng.gen_range(1..=4));
        if player_hp == 0 {
            return false;
        }
    }
}
