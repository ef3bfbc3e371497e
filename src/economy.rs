use std::collections::BTreeMap;

use rand::Rng;
use serde::Serialize;

use crate::{
    board::{Board, TileKind},
    config::{BazaarPolicy, BazaarRules, EstateRules, MarketRules},
    crops::CropKind,
    error::{GameError, GameResult},
    player::Player,
};

#[derive(Debug, Clone, Serialize)]
pub struct Market {
    pub stock_price: u64,
    pub stock_change_pct: i64,
    pub crop_prices: BTreeMap<CropKind, u64>,
    pub crop_changes: BTreeMap<CropKind, i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockMove {
    pub old: u64,
    pub new: u64,
    pub pct: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Sale {
    pub kind: CropKind,
    pub quantity: u32,
    pub unit_price: u64,
    pub proceeds: u64,
}

/// Rounded percent change; zero when there is no prior price.
pub fn percent_change(old: u64, new: u64) -> i64 {
    if old == 0 {
        return 0;
    }
    ((new as f64 - old as f64) / old as f64 * 100.0).round() as i64
}

impl Market {
    pub fn new<R: Rng + ?Sized>(rules: &MarketRules, rng: &mut R) -> Self {
        let mut market = Self {
            stock_price: rules.stock_initial,
            stock_change_pct: 0,
            crop_prices: BTreeMap::new(),
            crop_changes: BTreeMap::new(),
        };
        market.seed_crop_prices(rules, rng);
        market
    }

    fn seed_crop_prices<R: Rng + ?Sized>(&mut self, rules: &MarketRules, rng: &mut R) {
        for kind in CropKind::ALL {
            self.crop_prices
                .insert(kind, rng.gen_range(rules.crop_price_min..=rules.crop_price_max));
            self.crop_changes.insert(kind, 0);
        }
    }

    pub fn update_stock<R: Rng + ?Sized>(&mut self, rules: &MarketRules, rng: &mut R) -> StockMove {
        let old = self.stock_price;
        let delta = rng.gen_range(-rules.stock_max_delta..=rules.stock_max_delta);
        let new = old
            .saturating_add_signed(delta)
            .clamp(rules.stock_min, rules.stock_max);
        let pct = percent_change(old, new);
        self.stock_price = new;
        self.stock_change_pct = pct;
        StockMove { old, new, pct }
    }

    pub fn update_crop_prices<R: Rng + ?Sized>(&mut self, rules: &MarketRules, rng: &mut R) {
        if self.crop_prices.is_empty() {
            self.seed_crop_prices(rules, rng);
            return;
        }
        for (kind, price) in self.crop_prices.iter_mut() {
            let new = rng.gen_range(rules.crop_price_min..=rules.crop_price_max);
            self.crop_changes.insert(*kind, percent_change(*price, new));
            *price = new;
        }
    }

    /// Scales every crop price by `factor`, rounding and capping at `cap`.
    /// Returns false when there were no prices to boost.
    pub fn boost_crop_prices(&mut self, factor: f64, cap: u64) -> bool {
        if self.crop_prices.is_empty() {
            return false;
        }
        for price in self.crop_prices.values_mut() {
            *price = ((*price as f64 * factor).min(cap as f64)).round() as u64;
        }
        true
    }

    pub fn crop_price(&self, kind: CropKind) -> u64 {
        self.crop_prices.get(&kind).copied().unwrap_or(0)
    }

    /// Coins plus shares and inventory marked to the current market.
    pub fn valuation(&self, player: &Player) -> u64 {
        let shares = u64::from(player.stock_shares) * self.stock_price;
        let goods: u64 = player
            .inventory
            .iter()
            .map(|(kind, qty)| u64::from(*qty) * self.crop_price(*kind))
            .sum();
        player.coins + shares + goods
    }

    pub fn buy_stock(&self, player: &mut Player, shares: u32) -> GameResult<u64> {
        if shares == 0 {
            return Err(GameError::invalid("share count must be positive"));
        }
        let cost = self.stock_price * u64::from(shares);
        player.spend(cost)?;
        player.stock_shares += shares;
        Ok(cost)
    }

    pub fn sell_stock(&self, player: &mut Player, shares: u32) -> GameResult<u64> {
        if shares == 0 {
            return Err(GameError::invalid("share count must be positive"));
        }
        if player.stock_shares < shares {
            return Err(GameError::InsufficientShares {
                needed: shares,
                available: player.stock_shares,
            });
        }
        let proceeds = self.stock_price * u64::from(shares);
        player.stock_shares -= shares;
        player.earn(proceeds);
        Ok(proceeds)
    }
}

/// Income due to `player` on this roll, if its own turn count hits the
/// cadence and it owns any buildings.
pub fn building_income(
    board: &Board,
    player: &Player,
    rules: &EstateRules,
    cadence: u32,
) -> Option<(usize, u64)> {
    if player.turns_taken == 0 || player.turns_taken % cadence != 0 {
        return None;
    }
    let buildings = board.buildings_owned_by(&player.id);
    if buildings == 0 {
        return None;
    }
    Some((buildings, rules.income_per_building * buildings as u64))
}

pub fn bazaar_offer<R: Rng + ?Sized>(
    landed_on: Option<TileKind>,
    turns_taken: u32,
    cadence: u32,
    rules: &BazaarRules,
    rng: &mut R,
) -> Option<u64> {
    if landed_on != Some(TileKind::Farm) {
        return None;
    }
    let on_cadence = turns_taken > 0 && turns_taken % cadence == 0;
    match rules.policy {
        BazaarPolicy::OnCadence if !on_cadence => None,
        _ => Some(rng.gen_range(rules.offer_min..=rules.offer_max)),
    }
}

pub fn sell_inventory(
    player: &mut Player,
    kind: CropKind,
    quantity: u32,
    offer: u64,
) -> GameResult<Sale> {
    if quantity == 0 {
        return Err(GameError::invalid("quantity must be positive"));
    }
    if player.held(kind) == 0 {
        return Err(GameError::NoInventory(kind));
    }
    let sold = player.take(kind, quantity);
    let proceeds = offer * u64::from(sold);
    player.earn(proceeds);
    Ok(Sale {
        kind,
        quantity: sold,
        unit_price: offer,
        proceeds,
    })
}
