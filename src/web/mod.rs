use std::{
    convert::Infallible,
    net::SocketAddr,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use anyhow::{Context, Result};
use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::net::TcpListener;
use tokio_stream::{wrappers::BroadcastStream, Stream, StreamExt};
use tracing::{info, warn};

use crate::{
    config::Rules,
    crops::CropKind,
    error::{ErrorClass, GameError, GameResult},
    game::{Game, MinigameReport, Verdict},
    job::JobKind,
    minigame::{DuelSide, HybridCommand, RpgAction},
    session::{Session, SessionRegistry},
};

const DEFAULT_PLAYER_NAME: &str = "Player";

pub struct AppState {
    registry: SessionRegistry,
    rules: Rules,
    base_seed: Option<u64>,
    games_created: AtomicU64,
}

impl AppState {
    pub fn new(rules: Rules, base_seed: Option<u64>) -> Self {
        Self {
            registry: SessionRegistry::new(),
            rules,
            base_seed,
            games_created: AtomicU64::new(0),
        }
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// With a base seed every game of the run is reproducible in creation
    /// order; without one each game gets fresh entropy.
    fn next_seed(&self) -> u64 {
        let n = self.games_created.fetch_add(1, Ordering::SeqCst);
        match self.base_seed {
            Some(seed) => seed.wrapping_add(n),
            None => rand::random(),
        }
    }
}

pub struct WebServerConfig {
    pub rules: Rules,
    pub host: String,
    pub port: u16,
    pub seed: Option<u64>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/game/create", post(create_game))
        .route("/game/:id", get(game_state))
        .route("/game/:id/events", get(stream_events))
        .route("/game/:id/roll-dice", post(roll_dice))
        .route("/game/:id/end-turn", post(end_turn))
        .route("/game/:id/plant-crop", post(plant_crop))
        .route("/game/:id/harvest-crop", post(harvest_crop))
        .route("/game/:id/buy-stock", post(buy_stock))
        .route("/game/:id/sell-stock", post(sell_stock))
        .route("/game/:id/sell-inventory", post(sell_inventory))
        .route("/game/:id/build-estate", post(build_estate))
        .route("/game/:id/enter-job", post(enter_job))
        .route("/game/:id/advance-stage", post(advance_stage))
        .route("/game/:id/minigame", get(minigame_state))
        .route("/game/:id/minigame/ready", post(minigame_ready))
        .route("/game/:id/minigame/resolve", post(resolve_invader))
        .route("/game/:id/minigame/rpg/act", post(rpg_act))
        .route("/game/:id/minigame/hybrid/command", post(hybrid_command))
        .route("/game/:id/minigame/mining/dig", post(mining_dig))
        .route("/game/:id/minigame/mining/finish", post(mining_finish))
        .with_state(state)
}

pub async fn run(config: WebServerConfig) -> Result<()> {
    let WebServerConfig {
        rules,
        host,
        port,
        seed,
    } = config;

    let ruleset = rules.name.clone();
    let state = Arc::new(AppState::new(rules, seed));
    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .with_context(|| format!("Invalid listen address {host}:{port}"))?;

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(%addr, rules = %ruleset, "game server listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutting down game server");
}

/// A rejected request, rendered as `{"detail": reason}`.
#[derive(Debug)]
pub struct ApiError(GameError);

impl From<GameError> for ApiError {
    fn from(err: GameError) -> Self {
        Self(err)
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self(GameError::invalid(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0.class() {
            ErrorClass::NotFound => StatusCode::NOT_FOUND,
            ErrorClass::Precondition | ErrorClass::InvalidInput => StatusCode::BAD_REQUEST,
        };
        (status, Json(json!({ "detail": self.0.to_string() }))).into_response()
    }
}

type ApiResult = std::result::Result<Response, ApiError>;

/// What a successful game operation reports besides the new state.
#[derive(Debug, Default)]
struct Outcome {
    message: String,
    events: Vec<String>,
    dice_value: Option<u8>,
    harvested_qty: Option<u32>,
    sold_qty: Option<u32>,
    unit_price: Option<u64>,
    score: Option<u32>,
}

impl Outcome {
    fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    fn with_events(mut self, events: Vec<String>) -> Self {
        self.events = events;
        self
    }
}

/// The game as clients see it: its serialized state plus the session
/// bookkeeping every endpoint reports the same way.
#[derive(Serialize)]
struct GameView<'a> {
    #[serde(flatten)]
    game: &'a Game,
    awaiting_action: bool,
    created_at: DateTime<Utc>,
}

impl<'a> GameView<'a> {
    fn new(session: &'a Session) -> Self {
        Self {
            game: &session.game,
            awaiting_action: session.game.awaiting_action(),
            created_at: session.created_at,
        }
    }
}

#[derive(Serialize)]
struct ActionResponse<'a> {
    message: String,
    events: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dice_value: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    harvested_qty: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sold_qty: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    unit_price: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    score: Option<u32>,
    awaiting_action: bool,
    game_state: GameView<'a>,
}

impl<'a> ActionResponse<'a> {
    fn new(outcome: Outcome, session: &'a Session) -> Self {
        Self {
            message: outcome.message,
            events: outcome.events,
            dice_value: outcome.dice_value,
            harvested_qty: outcome.harvested_qty,
            sold_qty: outcome.sold_qty,
            unit_price: outcome.unit_price,
            score: outcome.score,
            awaiting_action: session.game.awaiting_action(),
            game_state: GameView::new(session),
        }
    }
}

/// Runs `op` against one game while holding that game's lock for the whole
/// read-modify-write.
async fn act<F>(state: &AppState, id: &str, op: F) -> ApiResult
where
    F: FnOnce(&mut Game) -> GameResult<Outcome>,
{
    let session = state.registry.get(id).await?;
    let mut session = session.lock().await;
    let outcome = op(&mut session.game).map_err(|err| {
        warn!(game_id = id, error = %err, "request rejected");
        err
    })?;
    session.publish(outcome.events.iter().cloned());
    Ok(Json(ActionResponse::new(outcome, &session)).into_response())
}

fn positive(value: i64, what: &str) -> GameResult<u32> {
    if value <= 0 {
        return Err(GameError::invalid(format!("{what} must be positive")));
    }
    u32::try_from(value).map_err(|_| GameError::invalid(format!("{what} is too large")))
}

fn combat_outcome(report: MinigameReport) -> Outcome {
    let message = match report.verdict {
        Verdict::Continue => "The fight goes on",
        Verdict::Victory => "Victory!",
        Verdict::Defeat => "Defeated...",
        Verdict::Finished { .. } => "Done",
    };
    let score = match report.verdict {
        Verdict::Finished { score } => Some(score),
        _ => None,
    };
    Outcome {
        score,
        ..Outcome::message(message).with_events(report.events)
    }
}

async fn healthz() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

#[derive(Debug, Deserialize)]
pub struct CreateQuery {
    pub player_name: Option<String>,
}

async fn create_game(
    State(state): State<Arc<AppState>>,
    query: std::result::Result<Query<CreateQuery>, QueryRejection>,
) -> ApiResult {
    let Query(query) = query?;
    let name = query
        .player_name
        .unwrap_or_else(|| DEFAULT_PLAYER_NAME.to_string());
    let game = Game::new(state.rules.clone(), &name, state.next_seed())?;
    let id = state.registry.register(game).await;
    let session = state.registry.get(&id).await?;
    let session = session.lock().await;
    Ok(Json(json!({
        "game_id": id,
        "message": format!("Welcome, {name}!"),
        "awaiting_action": session.game.awaiting_action(),
        "created_at": session.created_at,
        "game_state": GameView::new(&session),
    }))
    .into_response())
}

async fn game_state(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> ApiResult {
    let session = state.registry.get(&id).await?;
    let session = session.lock().await;
    Ok(Json(GameView::new(&session)).into_response())
}

async fn stream_events(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> std::result::Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>, ApiError> {
    let rx = state.registry.get(&id).await?.lock().await.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|msg| match msg {
        Ok(payload) => Some(Ok(Event::default().data(payload))),
        Err(_) => None,
    });
    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    ))
}

async fn roll_dice(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> ApiResult {
    act(&state, &id, |game| {
        let report = game.roll_dice()?;
        Ok(Outcome {
            dice_value: Some(report.dice),
            ..Outcome::message(format!("Rolled a {}", report.dice)).with_events(report.events)
        })
    })
    .await
}

async fn end_turn(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> ApiResult {
    act(&state, &id, |game| {
        game.end_turn()?;
        Ok(Outcome::message("Turn ended"))
    })
    .await
}

#[derive(Debug, Deserialize)]
pub struct PlantQuery {
    pub crop_type: CropKind,
}

async fn plant_crop(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    query: std::result::Result<Query<PlantQuery>, QueryRejection>,
) -> ApiResult {
    let Query(query) = query?;
    act(&state, &id, |game| {
        let tile = game.plant_crop(query.crop_type)?;
        Ok(Outcome::message(format!("Planted {} on tile {tile}", query.crop_type)))
    })
    .await
}

async fn harvest_crop(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> ApiResult {
    act(&state, &id, |game| {
        let harvest = game.harvest_crop()?;
        Ok(Outcome {
            harvested_qty: Some(harvest.quantity),
            ..Outcome::message(format!("Harvested {} {}", harvest.quantity, harvest.kind))
        })
    })
    .await
}

#[derive(Debug, Deserialize)]
pub struct SharesQuery {
    pub shares: i64,
}

async fn buy_stock(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    query: std::result::Result<Query<SharesQuery>, QueryRejection>,
) -> ApiResult {
    let Query(query) = query?;
    let shares = positive(query.shares, "shares")?;
    act(&state, &id, |game| {
        let cost = game.buy_stock(shares)?;
        Ok(Outcome::message(format!("Bought {shares} share(s) for {cost} coins")))
    })
    .await
}

async fn sell_stock(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    query: std::result::Result<Query<SharesQuery>, QueryRejection>,
) -> ApiResult {
    let Query(query) = query?;
    let shares = positive(query.shares, "shares")?;
    act(&state, &id, |game| {
        let proceeds = game.sell_stock(shares)?;
        Ok(Outcome::message(format!("Sold {shares} share(s) for {proceeds} coins")))
    })
    .await
}

#[derive(Debug, Deserialize)]
pub struct SellInventoryQuery {
    pub crop_type: CropKind,
    pub qty: i64,
}

async fn sell_inventory(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    query: std::result::Result<Query<SellInventoryQuery>, QueryRejection>,
) -> ApiResult {
    let Query(query) = query?;
    let qty = positive(query.qty, "qty")?;
    act(&state, &id, |game| {
        let sale = game.sell_inventory(query.crop_type, qty)?;
        Ok(Outcome {
            sold_qty: Some(sale.quantity),
            unit_price: Some(sale.unit_price),
            ..Outcome::message(format!(
                "Sold {} {} for {} coins",
                sale.quantity, sale.kind, sale.proceeds
            ))
        })
    })
    .await
}

#[derive(Debug, Deserialize)]
pub struct BuildQuery {
    pub target_square_id: usize,
}

async fn build_estate(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    query: std::result::Result<Query<BuildQuery>, QueryRejection>,
) -> ApiResult {
    let Query(query) = query?;
    act(&state, &id, |game| {
        game.build_estate(query.target_square_id)?;
        Ok(Outcome::message(format!(
            "Built on tile {}",
            query.target_square_id
        )))
    })
    .await
}

#[derive(Debug, Deserialize)]
pub struct JobQuery {
    pub job: JobKind,
}

async fn enter_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    query: std::result::Result<Query<JobQuery>, QueryRejection>,
) -> ApiResult {
    let Query(query) = query?;
    act(&state, &id, |game| {
        game.enter_job(query.job)?;
        Ok(Outcome::message(format!("Started work as a {}", query.job)))
    })
    .await
}

async fn advance_stage(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> ApiResult {
    act(&state, &id, |game| {
        let size = game.advance_stage()?;
        Ok(Outcome::message(format!(
            "Stage {}: the board now has {size} tiles",
            game.stage
        )))
    })
    .await
}

async fn minigame_state(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> ApiResult {
    let session = state.registry.get(&id).await?;
    let session = session.lock().await;
    Ok(Json(json!({ "minigame": &session.game.minigame })).into_response())
}

async fn minigame_ready(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> ApiResult {
    act(&state, &id, |game| {
        let events = game.minigame_ready()?;
        Ok(Outcome::message("Minigame started").with_events(events))
    })
    .await
}

#[derive(Debug, Deserialize)]
pub struct ResolveQuery {
    #[serde(default)]
    pub winner: DuelSide,
}

async fn resolve_invader(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    query: std::result::Result<Query<ResolveQuery>, QueryRejection>,
) -> ApiResult {
    let Query(query) = query?;
    act(&state, &id, |game| {
        let events = game.resolve_invader(query.winner)?;
        Ok(Outcome::message("Duel resolved").with_events(events))
    })
    .await
}

#[derive(Debug, Deserialize)]
pub struct RpgQuery {
    #[serde(default)]
    pub action: RpgAction,
}

async fn rpg_act(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    query: std::result::Result<Query<RpgQuery>, QueryRejection>,
) -> ApiResult {
    let Query(query) = query?;
    act(&state, &id, |game| Ok(combat_outcome(game.rpg_act(query.action)?))).await
}

#[derive(Debug, Deserialize)]
pub struct HybridQuery {
    pub action: HybridCommand,
}

async fn hybrid_command(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    query: std::result::Result<Query<HybridQuery>, QueryRejection>,
) -> ApiResult {
    let Query(query) = query?;
    act(&state, &id, |game| {
        Ok(combat_outcome(game.hybrid_command(query.action)?))
    })
    .await
}

#[derive(Debug, Deserialize)]
pub struct DigQuery {
    pub block_id: usize,
}

async fn mining_dig(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    query: std::result::Result<Query<DigQuery>, QueryRejection>,
) -> ApiResult {
    let Query(query) = query?;
    act(&state, &id, |game| {
        let dig = game.mining_dig(query.block_id)?;
        let message = match &dig.block {
            Some(block) => format!("Dug up {} worth {}", block.ore, block.value),
            None => "Already mined".to_string(),
        };
        Ok(Outcome {
            score: Some(dig.score),
            ..Outcome::message(message)
        })
    })
    .await
}

async fn mining_finish(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> ApiResult {
    act(&state, &id, |game| Ok(combat_outcome(game.mining_finish()?))).await
}
