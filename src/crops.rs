use std::{fmt, ops::RangeInclusive};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{
    board::Board,
    error::{GameError, GameResult},
    player::Player,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CropKind {
    Carrot,
    Tomato,
    Corn,
    Wheat,
}

impl CropKind {
    pub const ALL: [CropKind; 4] = [
        CropKind::Carrot,
        CropKind::Tomato,
        CropKind::Corn,
        CropKind::Wheat,
    ];

    /// Turns from planting until the crop is ready.
    pub fn growth_turns(self) -> u32 {
        match self {
            CropKind::Carrot => 2,
            CropKind::Tomato => 3,
            CropKind::Corn => 4,
            CropKind::Wheat => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CropKind::Carrot => "carrot",
            CropKind::Tomato => "tomato",
            CropKind::Corn => "corn",
            CropKind::Wheat => "wheat",
        }
    }
}

impl fmt::Display for CropKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CropStage {
    Planted,
    Growing,
    Ready,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Crop {
    pub kind: CropKind,
    pub stage: CropStage,
    pub planted_turn: u32,
    pub growth_turns: u32,
}

impl Crop {
    pub fn new(kind: CropKind, planted_turn: u32) -> Self {
        Self {
            kind,
            stage: CropStage::Planted,
            planted_turn,
            growth_turns: kind.growth_turns(),
        }
    }

    pub fn stage_at(&self, turn: u32) -> CropStage {
        let elapsed = turn.saturating_sub(self.planted_turn);
        if elapsed >= self.growth_turns {
            CropStage::Ready
        } else if elapsed >= self.growth_turns.div_ceil(2) {
            CropStage::Growing
        } else {
            CropStage::Planted
        }
    }

    pub fn is_ready(&self) -> bool {
        self.stage == CropStage::Ready
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Harvest {
    pub kind: CropKind,
    pub quantity: u32,
}

/// Brings every crop on the board up to date with `turn`. Stages never move
/// backwards, so repeated calls for one turn change nothing.
pub fn advance(board: &mut Board, turn: u32) {
    for tile in board.tiles_mut() {
        if let Some(crop) = tile.crop.as_mut() {
            if !crop.is_ready() {
                crop.stage = crop.stage.max(crop.stage_at(turn));
            }
        }
    }
}

pub fn plant(
    board: &mut Board,
    index: usize,
    kind: CropKind,
    owner: &mut Player,
    turn: u32,
    cost: u64,
) -> GameResult<()> {
    let tile = board.checked_tile_mut(index)?;
    if !tile.is_plantable() {
        return Err(GameError::InvalidTile(index));
    }
    owner.spend(cost)?;
    tile.crop = Some(Crop::new(kind, turn));
    tile.crop_owner = Some(owner.id.clone());
    Ok(())
}

pub fn harvest<R: Rng + ?Sized>(
    board: &mut Board,
    index: usize,
    requester: &mut Player,
    yield_range: RangeInclusive<u32>,
    rng: &mut R,
) -> GameResult<Harvest> {
    let tile = board.checked_tile_mut(index)?;
    let kind = match (&tile.crop, &tile.crop_owner) {
        (Some(crop), Some(owner)) if crop.is_ready() && *owner == requester.id => crop.kind,
        _ => return Err(GameError::NothingToHarvest),
    };
    let quantity = rng.gen_range(yield_range);
    requester.stash(kind, quantity);
    requester.crops_harvested += quantity;
    tile.clear_crop();
    Ok(Harvest { kind, quantity })
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::player::{Controller, PlayerId};

    fn farmer(coins: u64) -> Player {
        Player::new(PlayerId::new("p1"), "Alice", Controller::Human, coins)
    }

    #[test]
    fn stage_thresholds_follow_growth_duration() {
        let carrot = Crop::new(CropKind::Carrot, 10);
        assert_eq!(carrot.stage_at(10), CropStage::Planted);
        assert_eq!(carrot.stage_at(11), CropStage::Growing);
        assert_eq!(carrot.stage_at(12), CropStage::Ready);

        let corn = Crop::new(CropKind::Corn, 1);
        assert_eq!(corn.stage_at(2), CropStage::Planted);
        assert_eq!(corn.stage_at(3), CropStage::Growing);
        assert_eq!(corn.stage_at(4), CropStage::Growing);
        assert_eq!(corn.stage_at(5), CropStage::Ready);

        let tomato = Crop::new(CropKind::Tomato, 0);
        assert_eq!(tomato.stage_at(1), CropStage::Planted);
        assert_eq!(tomato.stage_at(2), CropStage::Growing);
    }

    #[test]
    fn advance_is_idempotent_per_turn() {
        let mut board = Board::create(20).unwrap();
        let mut player = farmer(100);
        plant(&mut board, 2, CropKind::Corn, &mut player, 1, 20).unwrap();
        plant(&mut board, 4, CropKind::Carrot, &mut player, 1, 20).unwrap();

        advance(&mut board, 3);
        let once: Vec<_> = board.tiles().iter().map(|t| t.crop.clone()).collect();
        advance(&mut board, 3);
        let twice: Vec<_> = board.tiles().iter().map(|t| t.crop.clone()).collect();
        assert_eq!(once, twice);
        assert_eq!(board.tile(2).unwrap().crop.as_ref().unwrap().stage, CropStage::Growing);
        assert_eq!(board.tile(4).unwrap().crop.as_ref().unwrap().stage, CropStage::Ready);
    }

    #[test]
    fn advance_never_regresses() {
        let mut board = Board::create(20).unwrap();
        let mut player = farmer(100);
        plant(&mut board, 2, CropKind::Wheat, &mut player, 1, 20).unwrap();
        advance(&mut board, 3);
        advance(&mut board, 1);
        assert_eq!(board.tile(2).unwrap().crop.as_ref().unwrap().stage, CropStage::Growing);
    }

    #[test]
    fn plant_rejects_special_start_and_occupied_tiles() {
        let mut board = Board::create(20).unwrap();
        let mut player = farmer(100);
        assert_eq!(
            plant(&mut board, 0, CropKind::Carrot, &mut player, 1, 20),
            Err(GameError::InvalidTile(0))
        );
        assert_eq!(
            plant(&mut board, 5, CropKind::Carrot, &mut player, 1, 20),
            Err(GameError::InvalidTile(5))
        );
        plant(&mut board, 1, CropKind::Carrot, &mut player, 1, 20).unwrap();
        assert_eq!(
            plant(&mut board, 1, CropKind::Corn, &mut player, 1, 20),
            Err(GameError::InvalidTile(1))
        );
        assert_eq!(player.coins, 80);
    }

    #[test]
    fn plant_requires_the_fee() {
        let mut board = Board::create(20).unwrap();
        let mut player = farmer(19);
        assert_eq!(
            plant(&mut board, 1, CropKind::Carrot, &mut player, 1, 20),
            Err(GameError::InsufficientFunds {
                needed: 20,
                available: 19
            })
        );
        assert!(board.tile(1).unwrap().crop.is_none());
    }

    #[test]
    fn plant_then_harvest_round_trip() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut board = Board::create(20).unwrap();
        let mut player = farmer(100);
        plant(&mut board, 6, CropKind::Carrot, &mut player, 4, 20).unwrap();

        assert_eq!(
            harvest(&mut board, 6, &mut player, 1..=5, &mut rng),
            Err(GameError::NothingToHarvest)
        );

        advance(&mut board, 6);
        let harvest = harvest(&mut board, 6, &mut player, 1..=5, &mut rng).unwrap();
        assert_eq!(harvest.kind, CropKind::Carrot);
        assert!((1..=5).contains(&harvest.quantity));
        assert_eq!(player.held(CropKind::Carrot), harvest.quantity);
        assert_eq!(player.crops_harvested, harvest.quantity);
        let tile = board.tile(6).unwrap();
        assert!(tile.crop.is_none());
        assert!(tile.crop_owner.is_none());

        assert_eq!(
            super::harvest(&mut board, 6, &mut player, 1..=5, &mut rng),
            Err(GameError::NothingToHarvest)
        );
    }

    #[test]
    fn only_the_owner_can_harvest() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut board = Board::create(20).unwrap();
        let mut owner = farmer(100);
        let mut other = Player::new(PlayerId::new("bot"), "Bot", Controller::Bot, 100);
        plant(&mut board, 6, CropKind::Carrot, &mut owner, 1, 20).unwrap();
        advance(&mut board, 5);
        assert_eq!(
            harvest(&mut board, 6, &mut other, 1..=5, &mut rng),
            Err(GameError::NothingToHarvest)
        );
        assert!(board.tile(6).unwrap().crop.is_some());
    }
}
