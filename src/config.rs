use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{
    board,
    error::{GameError, GameResult},
};

fn default_name() -> String {
    "standard".to_string()
}

fn default_board_size() -> usize {
    20
}

fn default_max_stage() -> u32 {
    3
}

fn default_final_turn() -> u32 {
    30
}

fn default_starting_coins() -> u64 {
    100
}

fn default_bot_count() -> usize {
    1
}

fn default_payout_cadence() -> u32 {
    3
}

/// Which combat minigame a human gets when landing on a battle tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BattleStyle {
    #[default]
    Rpg,
    Hybrid,
}

/// When a buyer shows up at the farm bazaar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BazaarPolicy {
    /// Every roll that ends on a farm tile.
    #[default]
    EveryLanding,
    /// Only on farm landings that fall on the mover's payout cadence.
    OnCadence,
}

/// Every tunable number of a game. Missing YAML keys fall back to the
/// standard ruleset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rules {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_board_size")]
    pub board_size: usize,
    #[serde(default = "default_max_stage")]
    pub max_stage: u32,
    #[serde(default = "default_final_turn")]
    pub final_turn: u32,
    #[serde(default = "default_starting_coins")]
    pub starting_coins: u64,
    #[serde(default = "default_bot_count")]
    pub bot_count: usize,
    /// Every n-th roll of a player pays building income (and, under
    /// [`BazaarPolicy::OnCadence`], opens the bazaar).
    #[serde(default = "default_payout_cadence")]
    pub payout_cadence: u32,
    #[serde(default)]
    pub battle_style: BattleStyle,
    #[serde(default)]
    pub crops: CropRules,
    #[serde(default)]
    pub market: MarketRules,
    #[serde(default)]
    pub estate: EstateRules,
    #[serde(default)]
    pub bazaar: BazaarRules,
    #[serde(default)]
    pub story: StoryRules,
    #[serde(default)]
    pub combat: CombatRules,
    #[serde(default)]
    pub jobs: JobRules,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CropRules {
    pub planting_cost: u64,
    pub yield_min: u32,
    pub yield_max: u32,
}

impl Default for CropRules {
    fn default() -> Self {
        Self {
            planting_cost: 20,
            yield_min: 1,
            yield_max: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketRules {
    pub stock_initial: u64,
    pub stock_min: u64,
    pub stock_max: u64,
    pub stock_max_delta: i64,
    pub crop_price_min: u64,
    pub crop_price_max: u64,
    /// Ceiling applied when story boosts push crop prices up.
    pub crop_price_cap: u64,
}

impl Default for MarketRules {
    fn default() -> Self {
        Self {
            stock_initial: 80,
            stock_min: 10,
            stock_max: 300,
            stock_max_delta: 30,
            crop_price_min: 30,
            crop_price_max: 100,
            crop_price_cap: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EstateRules {
    pub build_cost: u64,
    pub income_per_building: u64,
}

impl Default for EstateRules {
    fn default() -> Self {
        Self {
            build_cost: 500,
            income_per_building: 50,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BazaarRules {
    pub policy: BazaarPolicy,
    pub offer_min: u64,
    pub offer_max: u64,
}

impl Default for BazaarRules {
    fn default() -> Self {
        Self {
            policy: BazaarPolicy::EveryLanding,
            offer_min: 10,
            offer_max: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoryRules {
    pub chance: f64,
    pub min_turns: u32,
    pub max_turns: u32,
    pub gift_min: u64,
    pub gift_max: u64,
    pub tax_min: u64,
    pub tax_max: u64,
    pub boost_factor: f64,
}

impl Default for StoryRules {
    fn default() -> Self {
        Self {
            chance: 0.25,
            min_turns: 2,
            max_turns: 4,
            gift_min: 30,
            gift_max: 80,
            tax_min: 20,
            tax_max: 60,
            boost_factor: 1.1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatRules {
    pub victory_reward: u64,
    pub defeat_loss_cap: u64,
    pub bot_victory_reward: u64,
    pub bot_defeat_loss_cap: u64,
    pub invader_defense_bonus: u64,
}

impl Default for CombatRules {
    fn default() -> Self {
        Self {
            victory_reward: 50,
            defeat_loss_cap: 30,
            bot_victory_reward: 40,
            bot_defeat_loss_cap: 20,
            invader_defense_bonus: 50,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JobRules {
    pub track_length: usize,
    pub return_bonus: u64,
}

impl Default for JobRules {
    fn default() -> Self {
        Self {
            track_length: 20,
            return_bonus: 30,
        }
    }
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            name: default_name(),
            board_size: default_board_size(),
            max_stage: default_max_stage(),
            final_turn: default_final_turn(),
            starting_coins: default_starting_coins(),
            bot_count: default_bot_count(),
            payout_cadence: default_payout_cadence(),
            battle_style: BattleStyle::default(),
            crops: CropRules::default(),
            market: MarketRules::default(),
            estate: EstateRules::default(),
            bazaar: BazaarRules::default(),
            story: StoryRules::default(),
            combat: CombatRules::default(),
            jobs: JobRules::default(),
        }
    }
}

impl Rules {
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let rules: Rules = serde_yaml::from_str(text).context("Failed to parse rules")?;
        rules.validate()?;
        Ok(rules)
    }

    pub fn validate(&self) -> GameResult<()> {
        if self.board_size < board::min_board_size() {
            return Err(GameError::invalid(format!(
                "board_size {} cannot hold every special tile (minimum {})",
                self.board_size,
                board::min_board_size()
            )));
        }
        if self.max_stage == 0 {
            return Err(GameError::invalid("max_stage must be at least 1"));
        }
        if self.final_turn < 2 {
            return Err(GameError::invalid("final_turn must be at least 2"));
        }
        if self.bot_count == 0 {
            return Err(GameError::invalid("at least one bot is required"));
        }
        if self.payout_cadence == 0 {
            return Err(GameError::invalid("payout_cadence must be positive"));
        }
        check_range("crops.yield", self.crops.yield_min, self.crops.yield_max)?;
        check_range(
            "market.stock",
            self.market.stock_min,
            self.market.stock_max,
        )?;
        if !(self.market.stock_min..=self.market.stock_max).contains(&self.market.stock_initial) {
            return Err(GameError::invalid(
                "market.stock_initial must lie within the stock band",
            ));
        }
        if self.market.stock_max_delta < 0 {
            return Err(GameError::invalid("market.stock_max_delta must not be negative"));
        }
        check_range(
            "market.crop_price",
            self.market.crop_price_min,
            self.market.crop_price_max,
        )?;
        check_range("bazaar.offer", self.bazaar.offer_min, self.bazaar.offer_max)?;
        check_range("story.turns", self.story.min_turns, self.story.max_turns)?;
        if self.story.min_turns == 0 {
            return Err(GameError::invalid("story.min_turns must be positive"));
        }
        check_range("story.gift", self.story.gift_min, self.story.gift_max)?;
        check_range("story.tax", self.story.tax_min, self.story.tax_max)?;
        if !(0.0..=1.0).contains(&self.story.chance) {
            return Err(GameError::invalid("story.chance must be a probability"));
        }
        if self.jobs.track_length == 0 {
            return Err(GameError::invalid("jobs.track_length must be positive"));
        }
        Ok(())
    }
}

fn check_range<T: PartialOrd + std::fmt::Display>(label: &str, min: T, max: T) -> GameResult<()> {
    if min > max {
        return Err(GameError::invalid(format!(
            "{label}: minimum {min} exceeds maximum {max}"
        )));
    }
    Ok(())
}

pub struct RulesLoader {
    base_dir: PathBuf,
}

impl RulesLoader {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn load(&self, file: impl AsRef<Path>) -> Result<Rules> {
        let path = self.base_dir.join(file);
        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read rules file {}", path.display()))?;
        let rules: Rules = serde_yaml::from_str(&data)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        rules
            .validate()
            .with_context(|| format!("Invalid rules in {}", path.display()))?;
        Ok(rules)
    }
}
