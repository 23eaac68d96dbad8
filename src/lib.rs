pub mod ai;
pub mod classic;
pub mod game;
pub mod router;
pub mod utils;

use std::cell::RefCell;
use std::rc::Rc;
use std::str::FromStr;

use gloo_timers::future::TimeoutFuture;
use log::{debug, warn};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::Serialize;
use serde_wasm_bindgen::to_value;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{future_to_promise, spawn_local};
use web_sys::js_sys::{Function, Promise};

pub use ai::{JsMoveOracle, MoveOracle, MoveRequestError, OpponentChoice};
pub use classic::{Mark, Move, RockPaperScissors, RoundOutcome, RoundReport, TicTacToe};
pub use game::{
    Card, ConfigError, Deck, GameEvent, GameMode, GamePhase, MemoryConfig, MemoryGame,
    MemoryState, Outcome, PlayerId, Power, PowerKind, Resolution,
};
pub use router::{Arcade, GameCard, Session, View};

#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

#[wasm_bindgen(start)]
pub fn start() {
    utils::set_panic_hook();
    utils::init_logging();
}

fn to_js_error(error: ConfigError) -> JsValue {
    to_value(&error).unwrap_or_else(|serialize_err| JsValue::from_str(&serialize_err.to_string()))
}

fn serde_to_js_error<E: std::fmt::Display>(error: E) -> JsValue {
    JsValue::from_str(&error.to_string())
}

fn to_json<T: Serialize>(value: &T) -> Result<String, JsValue> {
    serde_json::to_string(value).map_err(serde_to_js_error)
}

fn parse_config(config_json: Option<String>) -> Result<MemoryConfig, JsValue> {
    match config_json {
        Some(json) => serde_json::from_str(&json).map_err(serde_to_js_error),
        None => Ok(MemoryConfig::default()),
    }
}

struct MemorySession {
    game: MemoryGame,
    on_change: Option<Function>,
}

type SharedSession = Rc<RefCell<MemorySession>>;

/// 定时器触发的状态变化通过 `on_change` 推给前端。
fn notify(session: &SharedSession, events: Vec<GameEvent>) {
    if events.is_empty() {
        return;
    }
    let (callback, payload) = {
        let session = session.borrow();
        (
            session.on_change.clone(),
            to_json(&Resolution::new(&session.game, events)),
        )
    };
    let Some(callback) = callback else {
        return;
    };
    match payload {
        Ok(json) => {
            if let Err(error) = callback.call1(&JsValue::NULL, &JsValue::from_str(&json)) {
                warn!("on_change callback failed: {error:?}");
            }
        }
        Err(error) => warn!("failed to serialise memory state: {error:?}"),
    }
}

/// 延时回调只持有弱引用；会话被释放后直接退出，重开局后旧纪元的回调在核心中被忽略。
fn schedule_once<F>(session: &SharedSession, delay_ms: u32, epoch: u64, callback: F)
where
    F: FnOnce(&mut MemoryGame, u64) -> Vec<GameEvent> + 'static,
{
    let weak = Rc::downgrade(session);
    spawn_local(async move {
        TimeoutFuture::new(delay_ms).await;
        let Some(session) = weak.upgrade() else {
            return;
        };
        let events = callback(&mut session.borrow_mut().game, epoch);
        notify(&session, events);
    });
}

fn start_clock(session: &SharedSession, interval_ms: u32, epoch: u64) {
    let weak = Rc::downgrade(session);
    spawn_local(async move {
        loop {
            TimeoutFuture::new(interval_ms).await;
            let Some(session) = weak.upgrade() else {
                break;
            };
            let events = session.borrow_mut().game.tick(epoch);
            if events.is_empty() {
                debug!("clock for epoch {epoch} stopped");
                break;
            }
            notify(&session, events);
        }
    });
}

fn schedule_followups(session: &SharedSession, events: &[GameEvent]) {
    let epoch = session.borrow().game.epoch();
    for event in events {
        match event {
            GameEvent::MismatchPending { delay_ms, .. } => {
                schedule_once(session, *delay_ms, epoch, MemoryGame::resolve_mismatch)
            }
            GameEvent::PeekStarted { window_ms, .. } => {
                schedule_once(session, *window_ms, epoch, MemoryGame::clear_peek)
            }
            GameEvent::TimerStarted { interval_ms } => start_clock(session, *interval_ms, epoch),
            _ => {}
        }
    }
}

#[wasm_bindgen]
pub struct MemoryGameHandle {
    session: SharedSession,
}

impl MemoryGameHandle {
    fn from_game(game: MemoryGame) -> Self {
        Self {
            session: Rc::new(RefCell::new(MemorySession {
                game,
                on_change: None,
            })),
        }
    }

    fn apply<F>(&self, action: F) -> Result<String, JsValue>
    where
        F: FnOnce(&mut MemoryGame) -> Vec<GameEvent>,
    {
        let events = action(&mut self.session.borrow_mut().game);
        schedule_followups(&self.session, &events);
        let session = self.session.borrow();
        to_json(&Resolution::new(&session.game, events))
    }
}

#[wasm_bindgen]
impl MemoryGameHandle {
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<MemoryGameHandle, JsValue> {
        let config = parse_config(config_json)?;
        let game = MemoryGame::new(config).map_err(to_js_error)?;
        Ok(Self::from_game(game))
    }

    /// 注册定时器驱动的状态更新回调，参数为 Resolution JSON。
    pub fn set_on_change(&mut self, callback: Option<Function>) {
        self.session.borrow_mut().on_change = callback;
    }

    pub fn state_json(&self) -> Result<String, JsValue> {
        to_json(self.session.borrow().game.state())
    }

    pub fn status(&self) -> String {
        self.session.borrow().game.status()
    }

    pub fn select_mode(&mut self, mode: &str) -> Result<String, JsValue> {
        match GameMode::from_str(mode) {
            Ok(mode) => self.apply(|game| game.select_mode(mode)),
            Err(()) => {
                debug!("unknown memory mode {mode:?}");
                self.apply(|_| Vec::new())
            }
        }
    }

    pub fn change_mode(&mut self) -> Result<String, JsValue> {
        self.apply(MemoryGame::change_mode)
    }

    pub fn reset(&mut self) -> Result<String, JsValue> {
        self.apply(MemoryGame::reset)
    }

    pub fn select_card(&mut self, index: usize) -> Result<String, JsValue> {
        self.apply(|game| game.select_card(index))
    }

    pub fn use_power(&mut self, player_id: u8, power: &str) -> Result<String, JsValue> {
        match PowerKind::from_str(power) {
            Ok(kind) => self.apply(|game| game.use_power(player_id, kind)),
            Err(()) => {
                debug!("unknown power {power:?}");
                self.apply(|_| Vec::new())
            }
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TicTacToeSnapshot<'a> {
    #[serde(flatten)]
    game: &'a TicTacToe,
    winner: Option<Mark>,
    draw: bool,
    status: String,
}

impl<'a> TicTacToeSnapshot<'a> {
    fn new(game: &'a TicTacToe) -> Self {
        Self {
            game,
            winner: game.winner(),
            draw: game.is_draw(),
            status: game.status(),
        }
    }
}

#[wasm_bindgen]
pub struct TicTacToeHandle {
    game: TicTacToe,
}

#[wasm_bindgen]
impl TicTacToeHandle {
    #[wasm_bindgen(constructor)]
    pub fn new() -> TicTacToeHandle {
        Self {
            game: TicTacToe::new(),
        }
    }

    pub fn state_json(&self) -> Result<String, JsValue> {
        to_json(&TicTacToeSnapshot::new(&self.game))
    }

    pub fn play(&mut self, index: usize) -> Result<String, JsValue> {
        self.game.play(index);
        self.state_json()
    }

    pub fn reset(&mut self) -> Result<String, JsValue> {
        self.game.reset();
        self.state_json()
    }
}

impl Default for TicTacToeHandle {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RpsSnapshot<'a> {
    #[serde(flatten)]
    session: &'a RockPaperScissors,
    player_emoji: Option<&'static str>,
    opponent_emoji: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<&'a RoundReport>,
}

impl<'a> RpsSnapshot<'a> {
    fn new(session: &'a RockPaperScissors, report: Option<&'a RoundReport>) -> Self {
        Self {
            session,
            player_emoji: session.player_choice.map(Move::emoji),
            opponent_emoji: session.opponent_choice.map(Move::emoji),
            report,
        }
    }
}

#[wasm_bindgen]
pub struct RockPaperScissorsHandle {
    session: Rc<RefCell<RockPaperScissors>>,
}

#[wasm_bindgen]
impl RockPaperScissorsHandle {
    #[wasm_bindgen(constructor)]
    pub fn new() -> RockPaperScissorsHandle {
        Self {
            session: Rc::new(RefCell::new(RockPaperScissors::new())),
        }
    }

    pub fn state_json(&self) -> Result<String, JsValue> {
        to_json(&RpsSnapshot::new(&self.session.borrow(), None))
    }

    /// 出招并等待对手；`oracle` 为 `(instruction) => Promise<string>`。
    ///
    /// 上一轮未结束时立即返回当前状态。
    pub fn play(&mut self, choice: &str, oracle: Function) -> Result<Promise, JsValue> {
        let choice = Move::from_str(choice)
            .map_err(|_| JsValue::from_str(&format!("unknown move {choice:?}")))?;
        if !self.session.borrow_mut().begin_round(choice) {
            let json = self.state_json()?;
            return Ok(Promise::resolve(&JsValue::from_str(&json)));
        }

        let session = Rc::clone(&self.session);
        let oracle = JsMoveOracle::new(oracle);
        Ok(future_to_promise(async move {
            let mut rng = SmallRng::from_entropy();
            let report = classic::play_round(choice, &oracle, &mut rng).await;
            session.borrow_mut().finish_round(&report);
            let json = to_json(&RpsSnapshot::new(&session.borrow(), Some(&report)))?;
            Ok(JsValue::from_str(&json))
        }))
    }
}

impl Default for RockPaperScissorsHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// 视图路由；`navigate` 返回新视图对应的会话句柄（主页为 `null`）。
#[wasm_bindgen]
pub struct ArcadeHandle {
    arcade: Arcade,
}

#[wasm_bindgen]
impl ArcadeHandle {
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<ArcadeHandle, JsValue> {
        let config = parse_config(config_json)?;
        let arcade = Arcade::new(config).map_err(to_js_error)?;
        Ok(Self { arcade })
    }

    pub fn view(&self) -> String {
        self.arcade.view().slug().to_string()
    }

    pub fn menu_json(&self) -> Result<String, JsValue> {
        to_json(&router::menu())
    }

    pub fn navigate(&mut self, view: &str) -> Result<JsValue, JsValue> {
        let view = View::from_str(view)
            .map_err(|_| JsValue::from_str(&format!("unknown view {view:?}")))?;
        let session = self.arcade.navigate(view).map_err(to_js_error)?;
        Ok(match session {
            Session::Home => JsValue::NULL,
            Session::TicTacToe(game) => TicTacToeHandle { game }.into(),
            Session::RockPaperScissors(state) => RockPaperScissorsHandle {
                session: Rc::new(RefCell::new(state)),
            }
            .into(),
            Session::MemoryGame(game) => MemoryGameHandle::from_game(*game).into(),
        })
    }

    pub fn back(&mut self) -> JsValue {
        self.arcade.back();
        JsValue::NULL
    }
}

/// 校验记忆游戏配置 JSON，错误以带 `type` 字段的对象返回。
#[wasm_bindgen(js_name = "validateMemoryConfig")]
pub fn validate_memory_config(config_json: &str) -> Result<(), JsValue> {
    let config: MemoryConfig = serde_json::from_str(config_json).map_err(serde_to_js_error)?;
    config.validate().map_err(to_js_error)
}

/// 井字棋胜负判定，`board` 为 9 个 "X"/"O"/null 组成的数组。
#[wasm_bindgen(js_name = "ticTacToeWinner")]
pub fn tic_tac_toe_winner(board: JsValue) -> Result<Option<String>, JsValue> {
    let board: [Option<Mark>; 9] = serde_wasm_bindgen::from_value(board).map_err(JsValue::from)?;
    let game = TicTacToe {
        board,
        next: Mark::X,
    };
    Ok(game.winner().map(|mark| mark.as_str().to_string()))
}

#[wasm_bindgen(js_name = "judgeRound")]
pub fn judge_round(player: &str, opponent: &str) -> Result<String, JsValue> {
    let parse = |name: &str| {
        Move::from_str(name).map_err(|_| JsValue::from_str(&format!("unknown move {name:?}")))
    };
    let outcome = RoundOutcome::judge(parse(player)?, parse(opponent)?);
    Ok(outcome.message().to_string())
}
