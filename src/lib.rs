pub mod board;
pub mod config;
pub mod crops;
pub mod economy;
pub mod error;
pub mod game;
pub mod job;
pub mod minigame;
pub mod player;
pub mod rng;
pub mod session;
pub mod story;
pub mod web;

pub use config::{Rules, RulesLoader};
pub use error::{GameError, GameResult};
pub use game::{Game, RollReport, TurnPhase, Winner};
pub use session::SessionRegistry;
