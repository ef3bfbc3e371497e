use std::collections::BTreeMap;

use rand::{seq::SliceRandom, Rng};
use serde::Serialize;
use tracing::{debug, info};

use crate::{
    board::{Board, TileKind},
    config::{BattleStyle, Rules},
    crops::{self, CropKind, Harvest},
    economy::{self, Market, Sale},
    error::{GameError, GameResult},
    job::{self, JobKind, JobState, JobStep},
    minigame::{
        auto_battle, cosmetic_score, Block, CombatOutcome, DuelSide, HybridBattle, HybridCommand,
        InvaderDuel, MiningDig, Minigame, MinigameKind, RpgAction, RpgBattle,
    },
    player::{Controller, Player, PlayerId},
    rng::{self, RngManager},
    story,
};

pub const HUMAN_ID: &str = "player1";
const HUMAN_INDEX: usize = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnPhase {
    /// Waiting for the current player to roll.
    Idle,
    /// The human rolled and may take exactly one action.
    AwaitingAction,
    /// The human's roll opened a minigame; its conclusion passes the turn.
    Minigame,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Winner {
    Player(String),
    Tie,
}

#[derive(Debug, Clone, Serialize)]
pub struct RollReport {
    pub dice: u8,
    pub events: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Verdict {
    Continue,
    Victory,
    Defeat,
    Finished { score: u32 },
}

#[derive(Debug, Clone, Serialize)]
pub struct MinigameReport {
    pub verdict: Verdict,
    pub events: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DigReport {
    pub block: Option<Block>,
    pub score: u32,
}

/// One game: the board, its players and every piece of turn state. All
/// mutation goes through methods that either fully apply or reject.
#[derive(Debug, Serialize)]
pub struct Game {
    pub players: Vec<Player>,
    pub current_player: usize,
    pub board: Board,
    pub stage: u32,
    pub turn: u32,
    /// Last die rolled by the human. Bot rolls are not echoed here.
    pub dice_value: Option<u8>,
    pub phase: TurnPhase,
    pub market: Market,
    pub minigame: Option<Minigame>,
    pub bazaar_offer: Option<u64>,
    pub game_over: bool,
    pub final_assets: BTreeMap<PlayerId, u64>,
    pub winner: Option<Winner>,
    #[serde(skip)]
    rules: Rules,
    #[serde(skip)]
    rng: RngManager,
}

impl Game {
    pub fn new(rules: Rules, player_name: &str, seed: u64) -> GameResult<Self> {
        rules.validate()?;
        let name = player_name.trim();
        if name.is_empty() {
            return Err(GameError::invalid("player name must not be empty"));
        }
        let board = Board::create(rules.board_size)?;
        let mut streams = RngManager::new(seed);
        let market = Market::new(&rules.market, &mut streams.stream(rng::MARKET));

        let mut players = vec![Player::new(
            PlayerId::new(HUMAN_ID),
            name,
            Controller::Human,
            rules.starting_coins,
        )];
        for n in 1..=rules.bot_count {
            let (id, label) = if n == 1 {
                ("bot".to_string(), "Bot".to_string())
            } else {
                (format!("bot{n}"), format!("Bot {n}"))
            };
            players.push(Player::new(
                PlayerId::new(id),
                label,
                Controller::Bot,
                rules.starting_coins,
            ));
        }

        Ok(Self {
            players,
            current_player: 0,
            board,
            stage: 1,
            turn: 1,
            dice_value: None,
            phase: TurnPhase::Idle,
            market,
            minigame: None,
            bazaar_offer: None,
            game_over: false,
            final_assets: BTreeMap::new(),
            winner: None,
            rules,
            rng: streams,
        })
    }

    pub fn rules(&self) -> &Rules {
        &self.rules
    }

    pub fn seed(&self) -> u64 {
        self.rng.seed()
    }

    /// Queues die faces to be rolled before any random ones.
    pub fn force_dice(&mut self, faces: impl IntoIterator<Item = u8>) {
        self.rng.force_dice(faces);
    }

    pub fn current(&self) -> &Player {
        &self.players[self.current_player]
    }

    pub fn human(&self) -> &Player {
        &self.players[HUMAN_INDEX]
    }

    pub fn player(&self, id: &PlayerId) -> Option<&Player> {
        self.players.iter().find(|player| player.id == *id)
    }

    fn player_index(&self, id: &PlayerId) -> Option<usize> {
        self.players.iter().position(|player| player.id == *id)
    }

    pub fn awaiting_action(&self) -> bool {
        self.phase == TurnPhase::AwaitingAction
    }

    pub fn roll_dice(&mut self) -> GameResult<RollReport> {
        if self.game_over {
            return Err(GameError::GameOver);
        }
        if self.minigame.is_some() {
            return Err(GameError::MinigamePending);
        }
        if self.phase == TurnPhase::AwaitingAction {
            return Err(GameError::ActionPending);
        }

        let idx = self.current_player;
        let dice = self.rng.roll_die();
        let is_bot = self.players[idx].is_bot();
        if !is_bot {
            self.dice_value = Some(dice);
        }
        let mut events = vec![format!("{} rolled a {dice}", self.players[idx].name)];

        let on_main_board = self.move_player(idx, dice, &mut events);
        crops::advance(&mut self.board, self.turn);

        let mut deferred = false;
        if on_main_board {
            deferred = self.resolve_landing(idx, &mut events);
        }

        self.update_market(&mut events);

        let mover = &mut self.players[idx];
        mover.turns_taken += 1;
        if let Some((buildings, income)) = economy::building_income(
            &self.board,
            mover,
            &self.rules.estate,
            self.rules.payout_cadence,
        ) {
            mover.earn(income);
            events.push(format!(
                "{} collects {income} coins from {buildings} building(s)",
                mover.name
            ));
        }
        let landed_on = (on_main_board && !is_bot)
            .then(|| self.board.tile(mover.position).map(|tile| tile.kind()))
            .flatten();
        self.bazaar_offer = economy::bazaar_offer(
            landed_on,
            mover.turns_taken,
            self.rules.payout_cadence,
            &self.rules.bazaar,
            &mut self.rng.stream(rng::MARKET),
        );
        if let Some(offer) = self.bazaar_offer {
            events.push(format!("Bazaar: a merchant offers {offer} coins per crop"));
        }

        if on_main_board {
            events.extend(story::tick(
                &mut self.board,
                &mut self.players[idx],
                &mut self.market,
                &self.rules.story,
                &self.rules.market,
                &mut self.rng.stream(rng::STORY),
            ));
        }

        // Bot crops share the human's stamp: planted after the increment.
        self.turn += 1;
        if is_bot {
            if on_main_board {
                self.bot_plant(idx, &mut events);
                self.bot_build(idx, &mut events);
            }
            self.pass_turn();
        } else if deferred {
            self.phase = TurnPhase::Minigame;
        } else {
            self.phase = TurnPhase::AwaitingAction;
        }

        debug!(turn = self.turn, player = %self.players[idx].id, dice, "roll resolved");
        if self.turn >= self.rules.final_turn {
            self.settle(&mut events);
        }
        Ok(RollReport { dice, events })
    }

    /// Moves the player and reports whether the move happened on the main
    /// board.
    fn move_player(&mut self, idx: usize, dice: u8, events: &mut Vec<String>) -> bool {
        let track_length = self.rules.jobs.track_length;
        let return_bonus = self.rules.jobs.return_bonus;
        let player = &mut self.players[idx];
        let Some(state) = player.job.as_mut() else {
            player.position = self.board.step(player.position, usize::from(dice));
            return true;
        };
        let kind = state.kind;
        match job::advance(state, dice, track_length, return_bonus) {
            JobStep::Worked { position, wage } => {
                player.earn(wage);
                events.push(format!(
                    "{} works as a {kind} and earns {wage} coins (step {position})",
                    player.name
                ));
            }
            JobStep::Returned { wage, bonus } => {
                let earned = state.earned;
                player.job = None;
                player.earn(wage + bonus);
                events.push(format!(
                    "{} finishes the job ({earned} coins earned) and returns with a {bonus} coin bonus",
                    player.name
                ));
            }
        }
        false
    }

    /// Applies the tile the mover stopped on. Returns true when a minigame
    /// was opened that the human must play before the turn can pass.
    fn resolve_landing(&mut self, idx: usize, events: &mut Vec<String>) -> bool {
        let position = self.players[idx].position;
        let mover_id = self.players[idx].id.clone();
        let Some(tile) = self.board.tile(position) else {
            return false;
        };
        let kind = tile.kind();
        let ready_own = tile.crop.as_ref().is_some_and(|crop| crop.is_ready())
            && tile.crop_owner.as_ref() == Some(&mover_id);
        let rival = tile
            .crop
            .as_ref()
            .and(tile.crop_owner.clone())
            .filter(|owner| *owner != mover_id);

        if ready_own {
            let range = self.rules.crops.yield_min..=self.rules.crops.yield_max;
            if let Ok(harvest) = crops::harvest(
                &mut self.board,
                position,
                &mut self.players[idx],
                range,
                &mut self.rng.stream(rng::CROPS),
            ) {
                events.push(format!(
                    "{} harvests {} {}",
                    self.players[idx].name, harvest.quantity, harvest.kind
                ));
            }
            return false;
        }

        if let Some(defender) = rival.filter(|_| !matches!(kind, TileKind::Battle | TileKind::Mine)) {
            return self.open_invader(position, idx, defender, events);
        }

        let is_bot = self.players[idx].is_bot();
        match kind {
            TileKind::Battle if is_bot => {
                let combat = &self.rules.combat;
                let bot = &mut self.players[idx];
                if auto_battle(&mut self.rng.stream(rng::MINIGAME)) {
                    bot.earn(combat.bot_victory_reward);
                    events.push(format!(
                        "{} wins a skirmish and loots {} coins",
                        bot.name, combat.bot_victory_reward
                    ));
                } else {
                    let lost = bot.pay_capped(combat.bot_defeat_loss_cap);
                    events.push(format!("{} is beaten back and drops {lost} coins", bot.name));
                }
                false
            }
            TileKind::Battle => {
                let mut stream = self.rng.stream(rng::MINIGAME);
                let minigame = match self.rules.battle_style {
                    BattleStyle::Rpg => {
                        let battle = RpgBattle::new(mover_id, self.turn, &mut stream);
                        events.push(format!("Battle! A wild {} appears", battle.enemy.name));
                        Minigame::Rpg(battle)
                    }
                    BattleStyle::Hybrid => {
                        let battle = HybridBattle::new(mover_id, self.turn, &mut stream);
                        events.push(format!("Battle! {} blocks the road", battle.enemy.name));
                        Minigame::Hybrid(battle)
                    }
                };
                self.minigame = Some(minigame);
                true
            }
            TileKind::Mine if is_bot => {
                let score = cosmetic_score(&mut self.rng.stream(rng::MINIGAME));
                events.push(format!("{} digs in the mine and scores {score}", self.players[idx].name));
                false
            }
            TileKind::Mine => {
                let dig = MiningDig::new(mover_id, self.turn, &mut self.rng.stream(rng::MINIGAME));
                events.push(format!(
                    "Mine! {} has {} seconds to dig",
                    self.players[idx].name, dig.time_limit
                ));
                self.minigame = Some(Minigame::Mining(dig));
                true
            }
            _ => false,
        }
    }

    fn open_invader(
        &mut self,
        tile: usize,
        attacker_idx: usize,
        defender: PlayerId,
        events: &mut Vec<String>,
    ) -> bool {
        let attacker = self.players[attacker_idx].id.clone();
        let defender_is_bot = self
            .player(&defender)
            .map_or(true, |player| player.is_bot());
        let attacker_is_bot = self.players[attacker_idx].is_bot();
        events.push(format!("Invader! {attacker} raids {defender}'s crop on tile {tile}"));

        if attacker_is_bot && defender_is_bot {
            let side = if self.rng.stream(rng::MINIGAME).gen_bool(0.5) {
                DuelSide::Attacker
            } else {
                DuelSide::Defender
            };
            let duel = InvaderDuel::new(tile, attacker, defender, self.turn);
            events.extend(self.apply_duel(&duel, side));
            return false;
        }

        self.minigame = Some(Minigame::Invader(InvaderDuel::new(
            tile, attacker, defender, self.turn,
        )));
        !attacker_is_bot
    }

    fn apply_duel(&mut self, duel: &InvaderDuel, side: DuelSide) -> Vec<String> {
        let winner = duel.winner(side).clone();
        match side {
            DuelSide::Attacker => {
                if let Some(tile) = self.board.tile_mut(duel.tile) {
                    if tile.crop.is_some() {
                        tile.crop_owner = Some(winner.clone());
                    }
                }
                vec![format!("{winner} wins the duel and seizes tile {}", duel.tile)]
            }
            DuelSide::Defender => {
                let bonus = self.rules.combat.invader_defense_bonus;
                if let Some(idx) = self.player_index(&winner) {
                    self.players[idx].earn(bonus);
                }
                vec![format!("{winner} repels the raid and earns {bonus} coins")]
            }
        }
    }

    fn update_market(&mut self, events: &mut Vec<String>) {
        let step = self
            .market
            .update_stock(&self.rules.market, &mut self.rng.stream(rng::MARKET));
        self.market
            .update_crop_prices(&self.rules.market, &mut self.rng.stream(rng::MARKET));
        events.push(format!(
            "Stock moves {} -> {} ({:+}%)",
            step.old, step.new, step.pct
        ));
    }

    fn bot_plant(&mut self, idx: usize, events: &mut Vec<String>) {
        let position = self.players[idx].position;
        let cost = self.rules.crops.planting_cost;
        let plantable = self
            .board
            .tile(position)
            .is_some_and(|tile| tile.is_plantable());
        if !plantable || self.players[idx].coins < cost {
            return;
        }
        let Some(kind) = CropKind::ALL.choose(&mut self.rng.stream(rng::BOT)).copied() else {
            return;
        };
        if crops::plant(&mut self.board, position, kind, &mut self.players[idx], self.turn, cost)
            .is_ok()
        {
            events.push(format!("{} plants {kind} on tile {position}", self.players[idx].name));
        }
    }

    fn bot_build(&mut self, idx: usize, events: &mut Vec<String>) {
        let position = self.players[idx].position;
        let cost = self.rules.estate.build_cost;
        let on_estate = self
            .board
            .tile(position)
            .is_some_and(|tile| tile.kind() == TileKind::Estate);
        if !on_estate || self.players[idx].coins < cost {
            return;
        }
        let candidates: Vec<usize> = self
            .board
            .tiles()
            .iter()
            .filter(|tile| tile.is_buildable())
            .map(|tile| tile.id)
            .collect();
        let Some(&target) = candidates.choose(&mut self.rng.stream(rng::BOT)) else {
            return;
        };
        let bot = &mut self.players[idx];
        if bot.spend(cost).is_err() {
            return;
        }
        if let Some(tile) = self.board.tile_mut(target) {
            tile.building_owner = Some(bot.id.clone());
        }
        events.push(format!("{} builds on tile {target}", bot.name));
    }

    fn pass_turn(&mut self) {
        self.current_player = (self.current_player + 1) % self.players.len();
        self.phase = TurnPhase::Idle;
        self.bazaar_offer = None;
    }

    fn settle(&mut self, events: &mut Vec<String>) {
        self.final_assets = self
            .players
            .iter()
            .map(|player| (player.id.clone(), self.market.valuation(player)))
            .collect();

        let mut ranking: Vec<(&Player, u64)> = self
            .players
            .iter()
            .map(|player| (player, self.market.valuation(player)))
            .collect();
        ranking.sort_by(|a, b| b.1.cmp(&a.1));
        let winner = match ranking.as_slice() {
            [(_, top), (_, second), ..] if top == second => Winner::Tie,
            [(player, _), ..] => Winner::Player(player.name.clone()),
            [] => Winner::Tie,
        };
        match &winner {
            Winner::Player(name) => events.push(format!("Game over! {name} wins")),
            Winner::Tie => events.push("Game over! It's a tie".to_string()),
        }
        info!(turn = self.turn, ?winner, "game settled");

        self.winner = Some(winner);
        self.game_over = true;
        self.minigame = None;
        self.bazaar_offer = None;
        self.phase = TurnPhase::Idle;
    }

    /// Checks the shared action preconditions and returns the actor's index.
    fn begin_action(&self, required: Option<TileKind>) -> GameResult<usize> {
        if self.game_over {
            return Err(GameError::GameOver);
        }
        if self.phase != TurnPhase::AwaitingAction {
            return Err(GameError::NotAwaitingAction);
        }
        let idx = self.current_player;
        let player = &self.players[idx];
        if player.in_job_world() {
            return Err(GameError::InJobWorld);
        }
        if let Some(kind) = required {
            let here = self.board.checked_tile(player.position)?.kind();
            if here != kind {
                return Err(GameError::WrongTile(kind));
            }
        }
        Ok(idx)
    }

    pub fn end_turn(&mut self) -> GameResult<()> {
        if self.game_over {
            return Err(GameError::GameOver);
        }
        if self.phase != TurnPhase::AwaitingAction {
            return Err(GameError::NotAwaitingAction);
        }
        self.pass_turn();
        Ok(())
    }

    pub fn plant_crop(&mut self, kind: CropKind) -> GameResult<usize> {
        let idx = self.begin_action(None)?;
        let position = self.players[idx].position;
        crops::plant(
            &mut self.board,
            position,
            kind,
            &mut self.players[idx],
            self.turn,
            self.rules.crops.planting_cost,
        )?;
        self.pass_turn();
        Ok(position)
    }

    pub fn harvest_crop(&mut self) -> GameResult<Harvest> {
        let idx = self.begin_action(None)?;
        let position = self.players[idx].position;
        let harvest = crops::harvest(
            &mut self.board,
            position,
            &mut self.players[idx],
            self.rules.crops.yield_min..=self.rules.crops.yield_max,
            &mut self.rng.stream(rng::CROPS),
        )?;
        self.pass_turn();
        Ok(harvest)
    }

    pub fn buy_stock(&mut self, shares: u32) -> GameResult<u64> {
        let idx = self.begin_action(Some(TileKind::Market))?;
        let cost = self.market.buy_stock(&mut self.players[idx], shares)?;
        self.pass_turn();
        Ok(cost)
    }

    pub fn sell_stock(&mut self, shares: u32) -> GameResult<u64> {
        let idx = self.begin_action(Some(TileKind::Market))?;
        let proceeds = self.market.sell_stock(&mut self.players[idx], shares)?;
        self.pass_turn();
        Ok(proceeds)
    }

    pub fn sell_inventory(&mut self, kind: CropKind, quantity: u32) -> GameResult<Sale> {
        let idx = self.begin_action(Some(TileKind::Farm))?;
        let offer = self.bazaar_offer.ok_or(GameError::NoBazaarOffer)?;
        let sale = economy::sell_inventory(&mut self.players[idx], kind, quantity, offer)?;
        self.pass_turn();
        Ok(sale)
    }

    pub fn build_estate(&mut self, target: usize) -> GameResult<()> {
        let idx = self.begin_action(Some(TileKind::Estate))?;
        let cost = self.rules.estate.build_cost;
        let tile = self.board.checked_tile(target)?;
        if tile.kind().is_special() {
            return Err(GameError::InvalidBuildTarget(target));
        }
        if tile.building_owner.is_some() {
            return Err(GameError::TileOccupied(target));
        }
        let player = &mut self.players[idx];
        player.spend(cost)?;
        let owner = player.id.clone();
        self.board.checked_tile_mut(target)?.building_owner = Some(owner);
        self.pass_turn();
        Ok(())
    }

    pub fn enter_job(&mut self, kind: JobKind) -> GameResult<()> {
        let idx = self.begin_action(Some(TileKind::Job))?;
        self.players[idx].job = Some(JobState::new(kind));
        self.pass_turn();
        Ok(())
    }

    /// Grows the board by one stage. Player economics, positions and job
    /// state carry over; everything painted on the old board is lost.
    pub fn advance_stage(&mut self) -> GameResult<usize> {
        if self.game_over {
            return Err(GameError::GameOver);
        }
        if self.minigame.is_some() {
            return Err(GameError::MinigamePending);
        }
        if self.stage >= self.rules.max_stage {
            return Err(GameError::FinalStage);
        }
        let size = self.rules.board_size * (self.stage as usize + 1);
        self.board = Board::create(size)?;
        self.stage += 1;
        self.bazaar_offer = None;
        info!(stage = self.stage, size, "board extended");
        Ok(size)
    }

    /// Resolves which player may drive the live minigame of `requested`
    /// kind. Only the human ever does.
    fn minigame_actor(&self, requested: MinigameKind) -> GameResult<usize> {
        if self.game_over {
            return Err(GameError::GameOver);
        }
        let active = self.minigame.as_ref().ok_or(GameError::NoMinigame)?;
        if active.kind() != requested {
            return Err(GameError::MinigameMismatch {
                active: active.kind(),
                requested,
            });
        }
        let human = &self.players[HUMAN_INDEX].id;
        if !active.participants().contains(&human) {
            return Err(GameError::NotParticipant);
        }
        if self.phase == TurnPhase::Minigame && self.current_player != HUMAN_INDEX {
            return Err(GameError::NotParticipant);
        }
        Ok(HUMAN_INDEX)
    }

    fn conclude_minigame(&mut self) {
        self.minigame = None;
        if self.phase == TurnPhase::Minigame {
            self.pass_turn();
        }
    }

    pub fn minigame_ready(&mut self) -> GameResult<Vec<String>> {
        let kind = self
            .minigame
            .as_ref()
            .map(Minigame::kind)
            .ok_or(GameError::NoMinigame)?;
        self.minigame_actor(kind)?;
        let Some(minigame) = self.minigame.as_mut() else {
            return Err(GameError::NoMinigame);
        };
        minigame.ready();
        Ok(match kind {
            MinigameKind::Invader => InvaderDuel::countdown_events(),
            MinigameKind::Mining => vec!["Dig!".to_string()],
            MinigameKind::Rpg | MinigameKind::Hybrid => vec!["Fight!".to_string()],
        })
    }

    pub fn resolve_invader(&mut self, side: DuelSide) -> GameResult<Vec<String>> {
        self.minigame_actor(MinigameKind::Invader)?;
        let Some(Minigame::Invader(duel)) = self.minigame.take() else {
            return Err(GameError::NoMinigame);
        };
        let events = self.apply_duel(&duel, side);
        self.conclude_minigame();
        Ok(events)
    }

    pub fn rpg_act(&mut self, action: RpgAction) -> GameResult<MinigameReport> {
        let idx = self.minigame_actor(MinigameKind::Rpg)?;
        let Some(Minigame::Rpg(battle)) = self.minigame.as_mut() else {
            return Err(GameError::NoMinigame);
        };
        let (outcome, events) = battle.act(action, &mut self.rng.stream(rng::MINIGAME));
        Ok(self.settle_combat(idx, outcome, events))
    }

    pub fn hybrid_command(&mut self, command: HybridCommand) -> GameResult<MinigameReport> {
        let idx = self.minigame_actor(MinigameKind::Hybrid)?;
        let Some(Minigame::Hybrid(battle)) = self.minigame.as_mut() else {
            return Err(GameError::NoMinigame);
        };
        let (outcome, events) = battle.command(command, &mut self.rng.stream(rng::MINIGAME));
        Ok(self.settle_combat(idx, outcome, events))
    }

    fn settle_combat(
        &mut self,
        idx: usize,
        outcome: CombatOutcome,
        mut events: Vec<String>,
    ) -> MinigameReport {
        let combat = &self.rules.combat;
        let player = &mut self.players[idx];
        let verdict = match outcome {
            CombatOutcome::Ongoing => return MinigameReport {
                verdict: Verdict::Continue,
                events,
            },
            CombatOutcome::Victory => {
                player.earn(combat.victory_reward);
                events.push(format!("Victory! +{} coins", combat.victory_reward));
                Verdict::Victory
            }
            CombatOutcome::Defeat => {
                let lost = player.pay_capped(combat.defeat_loss_cap);
                events.push(format!("Defeated... -{lost} coins"));
                Verdict::Defeat
            }
        };
        self.conclude_minigame();
        MinigameReport { verdict, events }
    }

    pub fn mining_dig(&mut self, block_id: usize) -> GameResult<DigReport> {
        self.minigame_actor(MinigameKind::Mining)?;
        let Some(Minigame::Mining(dig)) = self.minigame.as_mut() else {
            return Err(GameError::NoMinigame);
        };
        let block = dig.dig(block_id)?.cloned();
        Ok(DigReport {
            block,
            score: dig.score,
        })
    }

    pub fn mining_finish(&mut self) -> GameResult<MinigameReport> {
        self.minigame_actor(MinigameKind::Mining)?;
        let Some(Minigame::Mining(dig)) = self.minigame.take() else {
            return Err(GameError::NoMinigame);
        };
        let score = dig.score;
        self.conclude_minigame();
        Ok(MinigameReport {
            verdict: Verdict::Finished { score },
            events: vec![format!("Mining finished with a score of {score}")],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoryRules;

    fn quiet_rules() -> Rules {
        Rules {
            story: StoryRules {
                chance: 0.0,
                ..StoryRules::default()
            },
            ..Rules::default()
        }
    }

    fn game() -> Game {
        Game::new(quiet_rules(), "Alice", 7).expect("game")
    }

    #[test]
    fn new_game_seats_one_human_then_bots() {
        let rules = Rules {
            bot_count: 2,
            ..quiet_rules()
        };
        let game = Game::new(rules, "Alice", 1).unwrap();
        let ids: Vec<_> = game.players.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["player1", "bot", "bot2"]);
        assert_eq!(game.turn, 1);
        assert_eq!(game.stage, 1);
        assert_eq!(game.phase, TurnPhase::Idle);
        assert!(game.players.iter().all(|p| p.coins == 100 && p.position == 0));
        assert!(matches!(
            Game::new(quiet_rules(), "  ", 1),
            Err(GameError::InvalidInput(_))
        ));
    }

    #[test]
    fn human_roll_waits_for_an_action() {
        let mut game = game();
        game.force_dice([2]);
        let report = game.roll_dice().unwrap();
        assert_eq!(report.dice, 2);
        assert_eq!(game.dice_value, Some(2));
        assert!(game.awaiting_action());
        assert_eq!(game.turn, 2);
        assert_eq!(game.human().turns_taken, 1);
        assert_eq!(game.roll_dice().unwrap_err(), GameError::ActionPending);

        game.end_turn().unwrap();
        assert!(!game.awaiting_action());
        assert_eq!(game.current_player, 1);
        assert_eq!(game.end_turn().unwrap_err(), GameError::NotAwaitingAction);
    }

    #[test]
    fn bot_roll_passes_and_hides_its_dice() {
        let mut game = game();
        game.force_dice([2, 1]);
        game.roll_dice().unwrap();
        game.end_turn().unwrap();
        let report = game.roll_dice().unwrap();
        assert_eq!(report.dice, 1);
        assert_eq!(game.dice_value, Some(2));
        assert_eq!(game.current_player, 0);
        assert_eq!(game.phase, TurnPhase::Idle);
    }

    #[test]
    fn failed_actions_keep_the_turn() {
        let mut game = game();
        game.force_dice([2]);
        game.roll_dice().unwrap();
        assert_eq!(
            game.buy_stock(1).unwrap_err(),
            GameError::WrongTile(TileKind::Market)
        );
        assert_eq!(game.harvest_crop().unwrap_err(), GameError::NothingToHarvest);
        assert!(game.awaiting_action());

        assert_eq!(game.plant_crop(CropKind::Carrot).unwrap(), 2);
        assert_eq!(game.human().coins, 80);
        assert_eq!(game.current_player, 1);
    }

    #[test]
    fn build_validates_the_target() {
        let mut game = Game::new(
            Rules {
                starting_coins: 1200,
                ..quiet_rules()
            },
            "Alice",
            3,
        )
        .unwrap();
        game.force_dice([5, 5, 5]);
        game.roll_dice().unwrap();
        game.end_turn().unwrap();
        game.roll_dice().unwrap();
        game.roll_dice().unwrap();
        assert_eq!(game.human().position, 10);
        game.end_turn().unwrap();

        game.force_dice([5, 5]);
        game.roll_dice().unwrap();
        game.roll_dice().unwrap();
        assert_eq!(game.human().position, 15);
        assert_eq!(game.build_estate(20).unwrap_err().class(), crate::error::ErrorClass::InvalidInput);
        assert_eq!(game.build_estate(5).unwrap_err(), GameError::InvalidBuildTarget(5));
        game.board.tile_mut(7).unwrap().building_owner = Some(PlayerId::new("bot"));
        assert_eq!(game.build_estate(7).unwrap_err(), GameError::TileOccupied(7));
        let coins = game.human().coins;
        game.build_estate(6).unwrap();
        assert_eq!(game.human().coins, coins - 500);
        assert_eq!(
            game.board.tile(6).unwrap().building_owner,
            Some(PlayerId::new(HUMAN_ID))
        );
    }

    #[test]
    fn job_world_pays_and_returns() {
        let mut game = game();
        game.force_dice([3]);
        game.roll_dice().unwrap();
        game.enter_job(JobKind::Miner).unwrap();
        assert!(game.human().in_job_world());

        game.force_dice([1, 6]);
        game.roll_dice().unwrap();
        let before = game.human().coins;
        game.roll_dice().unwrap();
        assert_eq!(game.human().coins, before + 48);
        assert_eq!(game.human().position, 3);
        assert_eq!(
            game.plant_crop(CropKind::Corn).unwrap_err(),
            GameError::InJobWorld
        );
        game.end_turn().unwrap();
    }

    #[test]
    fn stage_advance_keeps_economics() {
        let mut game = game();
        game.players[0].coins = 777;
        game.players[0].stock_shares = 4;
        game.players[0].position = 12;
        game.board.tile_mut(2).unwrap().building_owner = Some(PlayerId::new(HUMAN_ID));

        assert_eq!(game.advance_stage().unwrap(), 40);
        assert_eq!(game.stage, 2);
        assert_eq!(game.board.len(), 40);
        assert_eq!(game.board.buildings_owned_by(&PlayerId::new(HUMAN_ID)), 0);
        assert_eq!(
            (game.human().coins, game.human().stock_shares, game.human().position),
            (777, 4, 12)
        );
        assert_eq!(game.advance_stage().unwrap(), 60);
        assert_eq!(game.advance_stage().unwrap_err(), GameError::FinalStage);
    }

    #[test]
    fn minigame_requests_are_dispatched_by_kind() {
        let mut game = game();
        assert_eq!(game.mining_finish().unwrap_err(), GameError::NoMinigame);
        game.force_dice([6, 2]);
        game.roll_dice().unwrap();
        game.end_turn().unwrap();
        game.roll_dice().unwrap();

        game.players[0].position = 6;
        game.force_dice([2]);
        game.roll_dice().unwrap();
        assert_eq!(game.phase, TurnPhase::Minigame);
        assert_eq!(game.minigame.as_ref().map(Minigame::kind), Some(MinigameKind::Mining));
        assert_eq!(
            game.rpg_act(RpgAction::Attack).unwrap_err(),
            GameError::MinigameMismatch {
                active: MinigameKind::Mining,
                requested: MinigameKind::Rpg,
            }
        );
        assert_eq!(game.roll_dice().unwrap_err(), GameError::MinigamePending);
        assert_eq!(game.advance_stage().unwrap_err(), GameError::MinigamePending);

        let coins = game.human().coins;
        game.minigame_ready().unwrap();
        let first = game.mining_dig(0).unwrap();
        let again = game.mining_dig(0).unwrap();
        assert!(first.block.is_some());
        assert!(again.block.is_none());
        assert_eq!(first.score, again.score);
        let report = game.mining_finish().unwrap();
        assert_eq!(report.verdict, Verdict::Finished { score: first.score });
        assert_eq!(game.human().coins, coins);
        assert!(game.minigame.is_none());
        assert_eq!(game.current_player, 1);
        assert_eq!(game.phase, TurnPhase::Idle);
    }
}
