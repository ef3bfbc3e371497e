use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    crops::Crop,
    error::{GameError, GameResult},
    player::PlayerId,
};

/// Special tiles repeat with this period on boards larger than one lap.
pub const LAYOUT_PERIOD: usize = 20;
pub const START_TILE: usize = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TileKind {
    Plain,
    Market,
    Farm,
    Estate,
    Battle,
    Mine,
    Job,
}

impl TileKind {
    pub const SPECIAL: [TileKind; 6] = [
        TileKind::Job,
        TileKind::Market,
        TileKind::Mine,
        TileKind::Farm,
        TileKind::Battle,
        TileKind::Estate,
    ];

    pub fn is_special(self) -> bool {
        self != TileKind::Plain
    }

    /// Position of this tag within one layout period.
    pub fn layout_offset(self) -> Option<usize> {
        match self {
            TileKind::Plain => None,
            TileKind::Job => Some(3),
            TileKind::Market => Some(5),
            TileKind::Mine => Some(8),
            TileKind::Farm => Some(10),
            TileKind::Battle => Some(14),
            TileKind::Estate => Some(15),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TileKind::Plain => "plain",
            TileKind::Market => "market",
            TileKind::Farm => "farm",
            TileKind::Estate => "estate",
            TileKind::Battle => "battle",
            TileKind::Mine => "mine",
            TileKind::Job => "job",
        }
    }

    fn at(index: usize) -> TileKind {
        let offset = index % LAYOUT_PERIOD;
        TileKind::SPECIAL
            .into_iter()
            .find(|kind| kind.layout_offset() == Some(offset))
            .unwrap_or(TileKind::Plain)
    }
}

impl fmt::Display for TileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Smallest board that still holds one of every special tile.
pub fn min_board_size() -> usize {
    TileKind::SPECIAL
        .into_iter()
        .filter_map(TileKind::layout_offset)
        .max()
        .map_or(1, |offset| offset + 1)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoryEffect {
    Gift,
    Tax,
    Boost,
}

impl StoryEffect {
    pub const ALL: [StoryEffect; 3] = [StoryEffect::Gift, StoryEffect::Tax, StoryEffect::Boost];

    pub fn label(self) -> &'static str {
        match self {
            StoryEffect::Gift => "Fortune",
            StoryEffect::Tax => "Misfortune",
            StoryEffect::Boost => "Wind",
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            StoryEffect::Gift => "emerald",
            StoryEffect::Tax => "rose",
            StoryEffect::Boost => "sky",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoryOverlay {
    pub label: String,
    pub color: String,
    pub remaining_turns: u32,
    pub effect: StoryEffect,
}

impl StoryOverlay {
    pub fn new(effect: StoryEffect, turns: u32) -> Self {
        Self {
            label: effect.label().to_string(),
            color: effect.color().to_string(),
            remaining_turns: turns,
            effect,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Tile {
    pub id: usize,
    kind: TileKind,
    pub crop: Option<Crop>,
    pub crop_owner: Option<PlayerId>,
    pub building_owner: Option<PlayerId>,
    pub story: Option<StoryOverlay>,
}

impl Tile {
    fn new(id: usize, kind: TileKind) -> Self {
        Self {
            id,
            kind,
            crop: None,
            crop_owner: None,
            building_owner: None,
            story: None,
        }
    }

    pub fn kind(&self) -> TileKind {
        self.kind
    }

    pub fn is_plantable(&self) -> bool {
        !self.kind.is_special() && self.id != START_TILE && self.crop.is_none()
    }

    pub fn is_buildable(&self) -> bool {
        !self.kind.is_special() && self.building_owner.is_none()
    }

    pub fn clear_crop(&mut self) {
        self.crop = None;
        self.crop_owner = None;
    }
}

/// The circular track. Its length and tile tags are fixed once created.
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct Board {
    tiles: Vec<Tile>,
}

impl Board {
    pub fn create(size: usize) -> GameResult<Self> {
        if size == 0 {
            return Err(GameError::invalid("board size must be positive"));
        }
        if size < min_board_size() {
            return Err(GameError::invalid(format!(
                "a board of {size} tiles cannot hold every special tile"
            )));
        }
        let tiles = (0..size).map(|id| Tile::new(id, TileKind::at(id))).collect();
        Ok(Self { tiles })
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn tiles_mut(&mut self) -> impl Iterator<Item = &mut Tile> {
        self.tiles.iter_mut()
    }

    pub fn tile(&self, index: usize) -> Option<&Tile> {
        self.tiles.get(index)
    }

    pub fn tile_mut(&mut self, index: usize) -> Option<&mut Tile> {
        self.tiles.get_mut(index)
    }

    pub fn checked_tile(&self, index: usize) -> GameResult<&Tile> {
        self.tiles
            .get(index)
            .ok_or_else(|| GameError::invalid(format!("tile {index} is off the board")))
    }

    pub fn checked_tile_mut(&mut self, index: usize) -> GameResult<&mut Tile> {
        self.tiles
            .get_mut(index)
            .ok_or_else(|| GameError::invalid(format!("tile {index} is off the board")))
    }

    pub fn step(&self, from: usize, steps: usize) -> usize {
        (from + steps) % self.tiles.len()
    }

    pub fn positions_of(&self, kind: TileKind) -> impl Iterator<Item = usize> + '_ {
        self.tiles
            .iter()
            .filter(move |tile| tile.kind == kind)
            .map(|tile| tile.id)
    }

    pub fn buildings_owned_by(&self, owner: &PlayerId) -> usize {
        self.tiles
            .iter()
            .filter(|tile| tile.building_owner.as_ref() == Some(owner))
            .count()
    }
}
