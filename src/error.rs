use thiserror::Error;

use crate::{board::TileKind, crops::CropKind, minigame::MinigameKind};

/// Broad category of a [`GameError`], used to pick a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    NotFound,
    Precondition,
    InvalidInput,
}

/// Every way a request against a game can be rejected.
///
/// A rejected request never leaves the game partially modified.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    #[error("game not found: {0}")]
    SessionNotFound(String),
    #[error("the game is over")]
    GameOver,
    #[error("not your action phase")]
    NotAwaitingAction,
    #[error("an action is still pending for this turn")]
    ActionPending,
    #[error("a minigame must be resolved first")]
    MinigamePending,
    #[error("no minigame in progress")]
    NoMinigame,
    #[error("the active minigame is {active}, not {requested}")]
    MinigameMismatch {
        active: MinigameKind,
        requested: MinigameKind,
    },
    #[error("not your turn for this minigame")]
    NotParticipant,
    #[error("you must be standing on a {0} tile")]
    WrongTile(TileKind),
    #[error("cannot plant on tile {0}")]
    InvalidTile(usize),
    #[error("tile {0} cannot hold a building")]
    InvalidBuildTarget(usize),
    #[error("tile {0} already has a building")]
    TileOccupied(usize),
    #[error("not enough coins: need {needed}, have {available}")]
    InsufficientFunds { needed: u64, available: u64 },
    #[error("not enough shares: need {needed}, have {available}")]
    InsufficientShares { needed: u32, available: u32 },
    #[error("no {0} in inventory")]
    NoInventory(CropKind),
    #[error("no buyer at the bazaar right now")]
    NoBazaarOffer,
    #[error("nothing to harvest here")]
    NothingToHarvest,
    #[error("player is away in the job world")]
    InJobWorld,
    #[error("the board is already at its final stage")]
    FinalStage,
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl GameError {
    pub fn class(&self) -> ErrorClass {
        match self {
            GameError::SessionNotFound(_) => ErrorClass::NotFound,
            GameError::InvalidInput(_) => ErrorClass::InvalidInput,
            _ => ErrorClass::Precondition,
        }
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        GameError::InvalidInput(reason.into())
    }
}

pub type GameResult<T> = Result<T, GameError>;
