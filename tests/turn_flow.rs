use cropboard::{
    board::TileKind,
    config::{BazaarPolicy, BazaarRules, Rules, StoryRules},
    crops::{CropKind, CropStage},
    job::JobKind,
    minigame::{DuelSide, DuelStatus, Minigame},
    player::PlayerId,
    Game, GameError, TurnPhase,
};

fn rules() -> Rules {
    Rules {
        story: StoryRules {
            chance: 0.0,
            ..StoryRules::default()
        },
        ..Rules::default()
    }
}

fn new_game(rules: Rules) -> Game {
    Game::new(rules, "Alice", 2024).expect("game")
}

fn stage_at(game: &Game, tile: usize) -> Option<CropStage> {
    game.board.tile(tile)?.crop.as_ref().map(|crop| crop.stage)
}

#[test]
fn market_landing_allows_one_stock_purchase() {
    let mut game = new_game(Rules {
        starting_coins: 1000,
        ..rules()
    });
    game.force_dice([5]);
    let report = game.roll_dice().unwrap();
    assert_eq!(report.dice, 5);
    assert_eq!(game.human().position, 5);
    assert!(game.awaiting_action());

    let price = game.market.stock_price;
    let cost = game.buy_stock(2).unwrap();
    assert_eq!(cost, price * 2);
    assert_eq!(game.human().coins, 1000 - price * 2);
    assert_eq!(game.human().stock_shares, 2);
    assert!(!game.awaiting_action());
    assert_eq!(game.current_player, 1);
    assert_eq!(game.buy_stock(1), Err(GameError::NotAwaitingAction));
}

#[test]
fn bot_rolls_are_not_echoed_into_state() {
    let mut game = new_game(rules());
    game.force_dice([4, 3]);
    game.roll_dice().unwrap();
    game.end_turn().unwrap();
    let report = game.roll_dice().unwrap();
    assert_eq!(report.dice, 3);
    assert_eq!(game.dice_value, Some(4));
    assert_eq!(game.players[1].position, 3);
    assert_eq!(game.players[1].turns_taken, 1);
    assert_eq!(game.current_player, 0);
    assert_eq!(game.turn, 3);
}

#[test]
fn carrot_ripens_and_is_auto_harvested() {
    let mut game = new_game(rules());
    game.force_dice([2]);
    game.roll_dice().unwrap();
    game.plant_crop(CropKind::Carrot).unwrap();
    assert_eq!(game.human().coins, 80);
    assert_eq!(stage_at(&game, 2), Some(CropStage::Planted));

    game.force_dice([1, 2, 2]);
    game.roll_dice().unwrap();
    assert_eq!(stage_at(&game, 2), Some(CropStage::Planted));
    game.roll_dice().unwrap();
    assert_eq!(stage_at(&game, 2), Some(CropStage::Growing));
    game.end_turn().unwrap();
    game.roll_dice().unwrap();
    assert_eq!(stage_at(&game, 2), Some(CropStage::Ready));

    game.players[0].position = 0;
    game.force_dice([2]);
    let report = game.roll_dice().unwrap();
    let harvested = game.human().held(CropKind::Carrot);
    assert!((1..=5).contains(&harvested));
    assert_eq!(game.human().crops_harvested, harvested);
    assert!(game.board.tile(2).unwrap().crop.is_none());
    assert!(game.board.tile(2).unwrap().crop_owner.is_none());
    assert!(report.events.iter().any(|event| event.contains("harvests")));
    assert_eq!(game.harvest_crop(), Err(GameError::NothingToHarvest));
}

#[test]
fn bot_raiding_a_human_crop_opens_a_duel() {
    let mut game = new_game(rules());
    game.force_dice([2]);
    game.roll_dice().unwrap();
    game.plant_crop(CropKind::Corn).unwrap();

    game.force_dice([2]);
    game.roll_dice().unwrap();
    match &game.minigame {
        Some(Minigame::Invader(duel)) => {
            assert_eq!(duel.status, DuelStatus::Countdown);
            assert_eq!(duel.attacker, PlayerId::new("bot"));
            assert_eq!(duel.defender, PlayerId::new("player1"));
            assert_eq!(duel.tile, 2);
        }
        other => panic!("expected an invader duel, got {other:?}"),
    }
    assert_eq!(game.current_player, 0);
    assert_eq!(game.phase, TurnPhase::Idle);
    assert!(!game.awaiting_action());
    assert_eq!(game.roll_dice().unwrap_err(), GameError::MinigamePending);

    let coins = game.human().coins;
    game.minigame_ready().unwrap();
    game.resolve_invader(DuelSide::Defender).unwrap();
    assert_eq!(game.human().coins, coins + 50);
    assert!(game.minigame.is_none());
    assert_eq!(
        game.board.tile(2).unwrap().crop_owner,
        Some(PlayerId::new("player1"))
    );
    assert_eq!(game.current_player, 0);
    game.roll_dice().unwrap();
}

#[test]
fn awaiting_flag_tracks_the_humans_open_action() {
    let mut game = new_game(rules());
    for _ in 0..20 {
        if game.game_over {
            break;
        }
        let awaiting = game.awaiting_action();
        assert_eq!(
            awaiting,
            game.current_player == 0 && game.phase == TurnPhase::AwaitingAction
        );
        if awaiting {
            assert!(game.minigame.is_none());
            game.end_turn().unwrap();
            continue;
        }
        if let Some(minigame) = &game.minigame {
            let kind = minigame.kind();
            match kind {
                cropboard::minigame::MinigameKind::Invader => {
                    game.resolve_invader(DuelSide::Attacker).unwrap();
                }
                cropboard::minigame::MinigameKind::Mining => {
                    game.mining_finish().unwrap();
                }
                cropboard::minigame::MinigameKind::Rpg => {
                    while game.minigame.is_some() {
                        game.rpg_act(Default::default()).unwrap();
                    }
                }
                cropboard::minigame::MinigameKind::Hybrid => unreachable!("rpg rules"),
            }
            continue;
        }
        let mover_is_bot = game.current().is_bot();
        game.roll_dice().unwrap();
        if mover_is_bot {
            assert!(!game.awaiting_action());
        } else {
            assert!(game.awaiting_action() || game.phase == TurnPhase::Minigame);
        }
    }
}

#[test]
fn job_detour_pays_per_step_and_returns_with_a_bonus() {
    let mut game = new_game(rules());
    game.force_dice([3]);
    game.roll_dice().unwrap();
    game.enter_job(JobKind::Courier).unwrap();
    assert!(game.human().in_job_world());
    assert_eq!(game.human().job.as_ref().map(|job| job.position), Some(0));

    for _ in 0..4 {
        game.force_dice([1, 6]);
        game.roll_dice().unwrap();
        game.roll_dice().unwrap();
        assert!(game.awaiting_action());
        game.end_turn().unwrap();
    }

    let human = game.human();
    assert!(!human.in_job_world());
    assert_eq!(human.position, 3);
    assert_eq!(human.coins, 100 + 4 * 36 + 30);
}

#[test]
fn stage_advance_keeps_play_going_on_a_larger_board() {
    let mut game = new_game(rules());
    game.force_dice([6]);
    game.roll_dice().unwrap();
    game.end_turn().unwrap();

    let size = game.advance_stage().unwrap();
    assert_eq!(size, 40);
    assert_eq!(game.stage, 2);
    assert_eq!(game.human().position, 6);

    game.players[1].position = 38;
    game.force_dice([4]);
    game.roll_dice().unwrap();
    assert_eq!(game.players[1].position, 2);
}

#[test]
fn bot_and_human_crops_ripen_on_the_same_schedule() {
    let mut game = new_game(rules());
    game.force_dice([2, 1]);
    game.roll_dice().unwrap();
    game.plant_crop(CropKind::Carrot).unwrap();
    game.roll_dice().unwrap();

    let human_crop = game.board.tile(2).unwrap().crop.clone().unwrap();
    let bot_crop = game.board.tile(1).unwrap().crop.clone().unwrap();
    assert_eq!(human_crop.planted_turn, 2);
    assert_eq!(bot_crop.planted_turn, game.turn);

    // Rolls since each crop was planted; the bot's roll counts for the human.
    let mut human_rolls = 1;
    let mut bot_rolls = 0;
    let mut human_ready = None;
    let mut bot_ready = None;
    while human_ready.is_none() || bot_ready.is_none() {
        if game.current().is_bot() {
            game.players[1].position = 5;
        } else {
            game.players[0].position = 6;
        }
        game.force_dice([1]);
        game.roll_dice().unwrap();
        if game.awaiting_action() {
            game.end_turn().unwrap();
        }
        human_rolls += 1;
        bot_rolls += 1;
        if human_ready.is_none() && stage_at(&game, 2) == Some(CropStage::Ready) {
            human_ready = Some(human_rolls);
        }
        if bot_ready.is_none() && stage_at(&game, 1) == Some(CropStage::Ready) {
            bot_ready = Some(bot_rolls);
        }
        assert!(human_rolls < 20, "crops never ripened");
    }

    assert_eq!(
        human_ready.unwrap() - human_crop.growth_turns,
        bot_ready.unwrap() - bot_crop.growth_turns
    );
}

#[test]
fn farm_landing_opens_a_bazaar_sale() {
    let mut game = new_game(rules());
    game.players[0].stash(CropKind::Tomato, 3);
    game.players[0].position = 9;
    game.force_dice([1]);
    let report = game.roll_dice().unwrap();

    let offer = game.bazaar_offer.expect("farm landing should bring an offer");
    assert!((10..=300).contains(&offer));
    assert!(report.events.iter().any(|event| event.starts_with("Bazaar")));
    assert!(game.awaiting_action());

    assert_eq!(
        game.sell_inventory(CropKind::Carrot, 1),
        Err(GameError::NoInventory(CropKind::Carrot))
    );
    assert_eq!(
        game.sell_stock(1),
        Err(GameError::WrongTile(TileKind::Market))
    );
    assert!(game.awaiting_action());

    let sale = game.sell_inventory(CropKind::Tomato, 10).unwrap();
    assert_eq!(sale.quantity, 3);
    assert_eq!(sale.unit_price, offer);
    assert_eq!(sale.proceeds, offer * 3);
    assert_eq!(game.human().coins, 100 + offer * 3);
    assert_eq!(game.human().held(CropKind::Tomato), 0);
    assert!(game.bazaar_offer.is_none());
    assert_eq!(game.current_player, 1);
}

#[test]
fn ending_the_turn_withdraws_the_offer() {
    let mut game = new_game(rules());
    game.players[0].position = 8;
    game.force_dice([2]);
    game.roll_dice().unwrap();
    assert!(game.bazaar_offer.is_some());
    game.end_turn().unwrap();
    assert!(game.bazaar_offer.is_none());
}

#[test]
fn inventory_sales_need_the_farm_and_a_live_offer() {
    let mut game = new_game(Rules {
        bazaar: BazaarRules {
            policy: BazaarPolicy::OnCadence,
            ..BazaarRules::default()
        },
        ..rules()
    });
    game.players[0].stash(CropKind::Corn, 2);
    assert_eq!(
        game.sell_inventory(CropKind::Corn, 1),
        Err(GameError::NotAwaitingAction)
    );

    game.players[0].position = 6;
    game.force_dice([1]);
    game.roll_dice().unwrap();
    assert_eq!(
        game.sell_inventory(CropKind::Corn, 1),
        Err(GameError::WrongTile(TileKind::Farm))
    );
    game.end_turn().unwrap();
    game.players[1].coins = 0;
    game.force_dice([1]);
    game.roll_dice().unwrap();

    // Second turn on the farm is off the every-third-turn cadence.
    game.players[0].position = 9;
    game.force_dice([1]);
    game.roll_dice().unwrap();
    assert!(game.bazaar_offer.is_none());
    assert_eq!(
        game.sell_inventory(CropKind::Corn, 1),
        Err(GameError::NoBazaarOffer)
    );
    assert_eq!(game.human().held(CropKind::Corn), 2);
    assert!(game.awaiting_action());
}

#[test]
fn bots_landing_on_the_farm_get_no_offer() {
    let mut game = new_game(rules());
    game.force_dice([1]);
    game.roll_dice().unwrap();
    game.end_turn().unwrap();

    game.players[1].position = 9;
    game.force_dice([1]);
    let report = game.roll_dice().unwrap();
    assert_eq!(game.players[1].position, 10);
    assert!(game.bazaar_offer.is_none());
    assert!(!report.events.iter().any(|event| event.starts_with("Bazaar")));
}

#[test]
fn stock_sale_at_the_market() {
    let mut game = new_game(rules());
    game.players[0].stock_shares = 3;
    game.players[0].position = 4;
    game.force_dice([1]);
    game.roll_dice().unwrap();

    assert_eq!(
        game.sell_stock(5),
        Err(GameError::InsufficientShares {
            needed: 5,
            available: 3
        })
    );
    let price = game.market.stock_price;
    let proceeds = game.sell_stock(2).unwrap();
    assert_eq!(proceeds, price * 2);
    assert_eq!(game.human().coins, 100 + price * 2);
    assert_eq!(game.human().stock_shares, 1);
    assert_eq!(game.current_player, 1);
    assert_eq!(game.sell_stock(1), Err(GameError::NotAwaitingAction));
}

#[test]
fn buildings_pay_out_on_every_third_turn() {
    let mut game = new_game(rules());
    game.board.tile_mut(7).unwrap().building_owner = Some(PlayerId::new("player1"));
    game.players[1].coins = 0;

    for round in 1..=3 {
        game.force_dice([1, 1]);
        let report = game.roll_dice().unwrap();
        let paid = report.events.iter().any(|event| event.contains("collects"));
        if round < 3 {
            assert!(!paid);
            assert_eq!(game.human().coins, 100);
        } else {
            assert!(paid);
            assert_eq!(game.human().coins, 150);
        }
        game.end_turn().unwrap();
        game.roll_dice().unwrap();
    }
    assert_eq!(game.human().turns_taken, 3);
}
