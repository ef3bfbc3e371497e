use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};

use crate::{
    crops::CropKind,
    error::{GameError, GameResult},
    job::JobState,
};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Controller {
    Human,
    Bot,
}

#[derive(Debug, Clone, Serialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub controller: Controller,
    pub position: usize,
    pub coins: u64,
    pub crops_harvested: u32,
    pub stock_shares: u32,
    pub inventory: BTreeMap<CropKind, u32>,
    pub job: Option<JobState>,
    /// Completed rolls by this player; drives building income and the
    /// bazaar cadence independently of the global turn.
    pub turns_taken: u32,
}

impl Player {
    pub fn new(id: PlayerId, name: impl Into<String>, controller: Controller, coins: u64) -> Self {
        Self {
            id,
            name: name.into(),
            controller,
            position: 0,
            coins,
            crops_harvested: 0,
            stock_shares: 0,
            inventory: BTreeMap::new(),
            job: None,
            turns_taken: 0,
        }
    }

    pub fn is_bot(&self) -> bool {
        self.controller == Controller::Bot
    }

    pub fn in_job_world(&self) -> bool {
        self.job.is_some()
    }

    pub fn ensure_funds(&self, amount: u64) -> GameResult<()> {
        if self.coins < amount {
            return Err(GameError::InsufficientFunds {
                needed: amount,
                available: self.coins,
            });
        }
        Ok(())
    }

    pub fn spend(&mut self, amount: u64) -> GameResult<()> {
        self.ensure_funds(amount)?;
        self.coins -= amount;
        Ok(())
    }

    /// Takes up to `amount`, never more than the player holds. Returns what
    /// was actually taken.
    pub fn pay_capped(&mut self, amount: u64) -> u64 {
        let paid = amount.min(self.coins);
        self.coins -= paid;
        paid
    }

    pub fn earn(&mut self, amount: u64) {
        self.coins = self.coins.saturating_add(amount);
    }

    pub fn held(&self, kind: CropKind) -> u32 {
        self.inventory.get(&kind).copied().unwrap_or(0)
    }

    pub fn stash(&mut self, kind: CropKind, quantity: u32) {
        *self.inventory.entry(kind).or_insert(0) += quantity;
    }

    /// Removes up to `quantity` of `kind`, returning how many were removed.
    pub fn take(&mut self, kind: CropKind, quantity: u32) -> u32 {
        let held = self.held(kind);
        let taken = held.min(quantity);
        if taken > 0 {
            self.inventory.insert(kind, held - taken);
        }
        taken
    }
}
