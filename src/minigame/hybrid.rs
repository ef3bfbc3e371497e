use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{rpg::Enemy, CombatOutcome, PLAYER_HP};
use crate::player::PlayerId;

const ATTACK_HIT_CHANCE: f64 = 0.85;
const HEAVY_HIT_CHANCE: f64 = 0.55;
const EVADE_CHANCE: f64 = 0.6;
const ENEMY_HEAVY_VS_GUARD: f64 = 0.6;
const ENEMY_HEAVY_BASE: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HybridCommand {
    Attack,
    Heavy,
    Defend,
    Dodge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HybridStatus {
    /// Closing the distance; the client animates the approach.
    Moving,
    Engaged,
}

/// Command-driven battle with one-turn guard/evade buffs.
#[derive(Debug, Clone, Serialize)]
pub struct HybridBattle {
    pub player: PlayerId,
    pub status: HybridStatus,
    pub player_hp: u32,
    pub enemy: Enemy,
    pub guard: bool,
    pub evade: bool,
    pub created_turn: u32,
    pub log: Vec<String>,
}

impl HybridBattle {
    pub fn new<R: Rng + ?Sized>(player: PlayerId, created_turn: u32, rng: &mut R) -> Self {
        let enemy = Enemy::spawn(rng);
        let log = vec![format!("{} blocks the road!", enemy.name)];
        Self {
            player,
            status: HybridStatus::Moving,
            player_hp: PLAYER_HP,
            enemy,
            guard: false,
            evade: false,
            created_turn,
            log,
        }
    }

    pub fn command<R: Rng + ?Sized>(
        &mut self,
        command: HybridCommand,
        rng: &mut R,
    ) -> (CombatOutcome, Vec<String>) {
        self.status = HybridStatus::Engaged;
        let mut lines = Vec::new();
        match command {
            HybridCommand::Attack => self.swing(ATTACK_HIT_CHANCE, 3..=6, "Attack", rng, &mut lines),
            HybridCommand::Heavy => self.swing(HEAVY_HIT_CHANCE, 6..=10, "Heavy blow", rng, &mut lines),
            HybridCommand::Defend => {
                self.guard = true;
                lines.push("You raise your guard.".to_string());
            }
            HybridCommand::Dodge => {
                self.evade = true;
                lines.push("You get ready to dodge.".to_string());
            }
        }

        let outcome = if self.enemy.hp == 0 {
            lines.push(format!("{} is defeated!", self.enemy.name));
            CombatOutcome::Victory
        } else {
            self.enemy_turn(rng, &mut lines);
            if self.player_hp == 0 {
                CombatOutcome::Defeat
            } else {
                CombatOutcome::Ongoing
            }
        };
        self.log.extend(lines.iter().cloned());
        (outcome, lines)
    }

    fn swing<R: Rng + ?Sized>(
        &mut self,
        chance: f64,
        damage: std::ops::RangeInclusive<u32>,
        label: &str,
        rng: &mut R,
        lines: &mut Vec<String>,
    ) {
        if rng.gen_bool(chance) {
            let damage = rng.gen_range(damage);
            self.enemy.take_hit(damage);
            lines.push(format!("{label}! {damage} damage"));
        } else {
            lines.push(format!("{label} missed!"));
        }
    }

    /// The enemy answers; buffs are spent whether or not they mattered.
    fn enemy_turn<R: Rng + ?Sized>(&mut self, rng: &mut R, lines: &mut Vec<String>) {
        let heavy_chance = if self.guard {
            ENEMY_HEAVY_VS_GUARD
        } else {
            ENEMY_HEAVY_BASE
        };
        let heavy = rng.gen_bool(heavy_chance);
        let mut damage = if heavy {
            rng.gen_range(self.enemy.atk_max + 1..=self.enemy.atk_max + 3)
        } else {
            self.enemy.strike(rng)
        };
        let verb = if heavy { "smashes" } else { "attacks" };

        if self.evade && rng.gen_bool(EVADE_CHANCE) {
            lines.push(format!("{} {verb}, but you dodge it!", self.enemy.name));
            damage = 0;
        } else {
            if self.guard {
                damage /= 2;
            }
            lines.push(format!("{} {verb}! {damage} damage", self.enemy.name));
        }
        self.player_hp = self.player_hp.saturating_sub(damage);
        self.guard = false;
        self.evade = false;
    }
}
