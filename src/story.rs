use rand::{seq::SliceRandom, Rng};

use crate::{
    board::{Board, StoryEffect, StoryOverlay},
    config::{MarketRules, StoryRules},
    economy::Market,
    player::Player,
};

/// Runs one story beat for a main-board roll: ages existing overlays, may
/// paint a new one on a plain tile, then fires the overlay (if any) under
/// the mover.
pub fn tick<R: Rng + ?Sized>(
    board: &mut Board,
    mover: &mut Player,
    market: &mut Market,
    rules: &StoryRules,
    market_rules: &MarketRules,
    rng: &mut R,
) -> Vec<String> {
    let mut events = Vec::new();
    decay(board);

    if rng.gen_bool(rules.chance) {
        if let Some(event) = spawn(board, rules, rng) {
            events.push(event);
        }
    }

    let Some(tile) = board.tile_mut(mover.position) else {
        return events;
    };
    let Some(overlay) = tile.story.take() else {
        return events;
    };
    match overlay.effect {
        StoryEffect::Gift => {
            let amount = rng.gen_range(rules.gift_min..=rules.gift_max);
            mover.earn(amount);
            events.push(format!("{}: a mysterious blessing grants +{amount} coins!", mover.name));
        }
        StoryEffect::Tax => {
            let amount = rng.gen_range(rules.tax_min..=rules.tax_max);
            let paid = mover.pay_capped(amount);
            events.push(format!("{}: struck by misfortune, -{paid} coins...", mover.name));
        }
        StoryEffect::Boost => {
            if market.boost_crop_prices(rules.boost_factor, market_rules.crop_price_cap) {
                events.push("A fair wind lifts crop prices a little!".to_string());
            } else {
                events.push("The wind blew, but nothing came of it.".to_string());
            }
        }
    }
    events
}

fn decay(board: &mut Board) {
    for tile in board.tiles_mut() {
        if let Some(overlay) = tile.story.as_mut() {
            overlay.remaining_turns = overlay.remaining_turns.saturating_sub(1);
            if overlay.remaining_turns == 0 {
                tile.story = None;
            }
        }
    }
}

fn spawn<R: Rng + ?Sized>(board: &mut Board, rules: &StoryRules, rng: &mut R) -> Option<String> {
    let candidates: Vec<usize> = board
        .tiles()
        .iter()
        .filter(|tile| !tile.kind().is_special() && tile.story.is_none())
        .map(|tile| tile.id)
        .collect();
    let index = *candidates.choose(rng)?;
    let effect = *StoryEffect::ALL.choose(rng)?;
    let turns = rng.gen_range(rules.min_turns..=rules.max_turns);
    let overlay = StoryOverlay::new(effect, turns);
    let event = format!(
        "Story: a sign of '{}' hangs over tile {index} ({turns} turns)",
        overlay.label
    );
    board.tile_mut(index)?.story = Some(overlay);
    Some(event)
}
