use std::fmt;

use rand::{seq::SliceRandom, Rng};
use serde::Serialize;

use crate::{
    error::{GameError, GameResult},
    player::PlayerId,
};

/// Advisory limit for clients; the server never ends a dig on its own.
pub const TIME_LIMIT_SECS: u32 = 60;
const BOT_DIGS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Ore {
    Diamond,
    Emerald,
    Sapphire,
    Topaz,
    Iron,
    Stone,
}

impl Ore {
    const ALL: [Ore; 6] = [
        Ore::Diamond,
        Ore::Emerald,
        Ore::Sapphire,
        Ore::Topaz,
        Ore::Iron,
        Ore::Stone,
    ];

    pub fn value(self) -> u32 {
        match self {
            Ore::Diamond => 100,
            Ore::Emerald => 60,
            Ore::Sapphire => 40,
            Ore::Topaz => 25,
            Ore::Iron => 10,
            Ore::Stone => 0,
        }
    }

    /// Blocks of this ore in every field.
    pub fn count(self) -> usize {
        match self {
            Ore::Diamond => 2,
            Ore::Emerald => 3,
            Ore::Sapphire => 4,
            Ore::Topaz => 5,
            Ore::Iron => 8,
            Ore::Stone => 8,
        }
    }
}

impl fmt::Display for Ore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Ore::Diamond => "diamond",
            Ore::Emerald => "emerald",
            Ore::Sapphire => "sapphire",
            Ore::Topaz => "topaz",
            Ore::Iron => "iron",
            Ore::Stone => "stone",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Block {
    pub id: usize,
    #[serde(rename = "kind")]
    pub ore: Ore,
    pub value: u32,
    pub mined: bool,
}

fn shuffled_field<R: Rng + ?Sized>(rng: &mut R) -> Vec<Block> {
    let mut ores: Vec<Ore> = Ore::ALL
        .into_iter()
        .flat_map(|ore| std::iter::repeat(ore).take(ore.count()))
        .collect();
    ores.shuffle(rng);
    ores.into_iter()
        .enumerate()
        .map(|(id, ore)| Block {
            id,
            ore,
            value: ore.value(),
            mined: false,
        })
        .collect()
}

/// Free-form digging: the score is the minigame's own and never touches
/// the player's coins.
#[derive(Debug, Clone, Serialize)]
pub struct MiningDig {
    pub player: PlayerId,
    pub field: Vec<Block>,
    pub score: u32,
    pub time_limit: u32,
    pub created_turn: u32,
}

impl MiningDig {
    pub fn new<R: Rng + ?Sized>(player: PlayerId, created_turn: u32, rng: &mut R) -> Self {
        Self {
            player,
            field: shuffled_field(rng),
            score: 0,
            time_limit: TIME_LIMIT_SECS,
            created_turn,
        }
    }

    /// Mines a block. Digging an already-mined block changes nothing and
    /// returns `None`.
    pub fn dig(&mut self, block_id: usize) -> GameResult<Option<&Block>> {
        let block = self
            .field
            .get_mut(block_id)
            .ok_or_else(|| GameError::invalid(format!("no block {block_id} in this mine")))?;
        if block.mined {
            return Ok(None);
        }
        block.mined = true;
        self.score += block.value;
        Ok(Some(block))
    }
}

/// A bot's quick dig: a handful of random blocks, reported for show only.
pub fn cosmetic_score<R: Rng + ?Sized>(rng: &mut R) -> u32 {
    shuffled_field(rng)
        .iter()
        .take(BOT_DIGS)
        .map(|block| block.value)
        .sum()
}
