use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::info;

use crate::{
    error::{GameError, GameResult},
    game::Game,
};

const EVENT_BUFFER: usize = 256;

/// A live game plus the feed its events are published on.
pub struct Session {
    pub game: Game,
    pub created_at: DateTime<Utc>,
    events: broadcast::Sender<String>,
}

impl Session {
    pub fn new(game: Game) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            game,
            created_at: Utc::now(),
            events,
        }
    }

    /// Sends events to every subscriber. Having no subscribers is fine.
    pub fn publish<I>(&self, events: I)
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        for event in events {
            let _ = self.events.send(event.into());
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.events.subscribe()
    }
}

pub type SharedSession = Arc<Mutex<Session>>;

/// All games of this process. The map lock only guards lookup and insert;
/// each game has its own mutex so one game's requests run one at a time.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<String, SharedSession>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `game` under a fresh id and returns that id.
    pub async fn register(&self, game: Game) -> String {
        let mut sessions = self.sessions.write().await;
        let id = loop {
            let candidate = format!("game_{:08x}", rand::random::<u32>());
            if !sessions.contains_key(&candidate) {
                break candidate;
            }
        };
        info!(game_id = %id, seed = game.seed(), "game created");
        sessions.insert(id.clone(), Arc::new(Mutex::new(Session::new(game))));
        id
    }

    /// Stores `game` under a caller-chosen id, replacing any previous game.
    pub async fn insert(&self, id: impl Into<String>, game: Game) -> SharedSession {
        let session = Arc::new(Mutex::new(Session::new(game)));
        self.sessions
            .write()
            .await
            .insert(id.into(), Arc::clone(&session));
        session
    }

    pub async fn get(&self, id: &str) -> GameResult<SharedSession> {
        self.sessions
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| GameError::SessionNotFound(id.to_string()))
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
