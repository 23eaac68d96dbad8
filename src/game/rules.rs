use log::debug;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use super::{
    config::{ConfigError, GameMode, MemoryConfig},
    effects::PowerResolver,
    state::{
        opponent_of, Deck, GameEvent, GamePhase, MemoryState, Outcome, PendingMismatch, PlayerId,
        Power, PowerKind, PLAYER_ONE, PLAYER_TWO,
    },
};

/// 一次操作后的状态快照与事件，序列化后交给前端。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resolution {
    pub state: MemoryState,
    pub events: Vec<GameEvent>,
    pub status: String,
}

impl Resolution {
    pub fn new(game: &MemoryGame, events: Vec<GameEvent>) -> Self {
        Self {
            state: game.state().clone(),
            events,
            status: game.status(),
        }
    }
}

/// 记忆游戏会话：持有配置、随机源与当前状态。
///
/// 所有输入操作都是全函数，前置条件不满足时返回空事件列表。
pub struct MemoryGame {
    config: MemoryConfig,
    rng: SmallRng,
    state: MemoryState,
    resolver: PowerResolver,
}

impl MemoryGame {
    pub fn new(config: MemoryConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut rng = match config.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };
        let deck = Deck::shuffled(&config.alphabet, &mut rng);
        Ok(Self {
            config,
            rng,
            state: MemoryState::new(GameMode::None, deck, 0),
            resolver: PowerResolver::default(),
        })
    }

    pub fn with_mode(config: MemoryConfig, mode: GameMode) -> Result<Self, ConfigError> {
        let mut game = Self::new(config)?;
        game.select_mode(mode);
        Ok(game)
    }

    /// 从已有快照恢复会话，例如前端保存的 JSON。
    pub fn restore(config: MemoryConfig, state: MemoryState) -> Result<Self, ConfigError> {
        let mut game = Self::new(config)?;
        game.state = state;
        Ok(game)
    }

    pub fn state(&self) -> &MemoryState {
        &self.state
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    pub fn epoch(&self) -> u64 {
        self.state.epoch
    }

    pub fn select_mode(&mut self, mode: GameMode) -> Vec<GameEvent> {
        if mode == GameMode::None {
            return self.change_mode();
        }
        self.deal(mode)
    }

    pub fn change_mode(&mut self) -> Vec<GameEvent> {
        if self.state.phase == GamePhase::ModeSelect {
            debug!("change_mode ignored: already selecting a mode");
            return Vec::new();
        }
        let epoch = self.state.epoch + 1;
        let deck = Deck::shuffled(&self.config.alphabet, &mut self.rng);
        self.state = MemoryState::new(GameMode::None, deck, epoch);
        debug!("memory game returned to mode select (epoch {epoch})");
        vec![GameEvent::ModeCleared]
    }

    pub fn reset(&mut self) -> Vec<GameEvent> {
        if self.state.mode == GameMode::None {
            debug!("reset ignored: no mode selected");
            return Vec::new();
        }
        self.deal(self.state.mode)
    }

    fn deal(&mut self, mode: GameMode) -> Vec<GameEvent> {
        let epoch = self.state.epoch + 1;
        let deck = Deck::shuffled(&self.config.alphabet, &mut self.rng);
        let cards = deck.len();
        self.state = MemoryState::new(mode, deck, epoch);

        let mut events = vec![GameEvent::ModeSelected { mode }, GameEvent::DeckDealt { cards }];
        if mode.deals_powers() {
            events.extend(self.deal_powers());
        }
        debug!("dealt {cards} cards for {mode:?} (epoch {epoch})");
        events
    }

    fn deal_powers(&mut self) -> Vec<GameEvent> {
        let mut pool = PowerKind::ALL.to_vec();
        pool.shuffle(&mut self.rng);

        let per_player = self.config.powers_per_player;
        let mut events = Vec::new();
        for (slot, player_id) in [PLAYER_ONE, PLAYER_TWO].into_iter().enumerate() {
            let hand: Vec<PowerKind> = pool
                .iter()
                .skip(slot * per_player)
                .take(per_player)
                .copied()
                .collect();
            if let Some(player) = self.state.get_player_mut(player_id) {
                player.powers = hand.iter().copied().map(Power::new).collect();
            }
            events.push(GameEvent::PowersDealt {
                player_id,
                powers: hand,
            });
        }
        events
    }

    fn selection_blocker(&self, index: usize) -> Option<&'static str> {
        let state = &self.state;
        if !state.is_playing() {
            return Some("game is not in progress");
        }
        if state.is_checking() {
            return Some("a pair is being checked");
        }
        if state.face_up.len() >= 2 {
            return Some("two cards are already face up");
        }
        match state.deck.get(index) {
            None => Some("index out of range"),
            Some(card) if card.revealed || card.matched => Some("card already face up"),
            Some(_) => None,
        }
    }

    pub fn select_card(&mut self, index: usize) -> Vec<GameEvent> {
        if let Some(reason) = self.selection_blocker(index) {
            debug!("select_card({index}) ignored: {reason}");
            return Vec::new();
        }

        let mut events = Vec::new();
        if self.state.mode.uses_timer() && !self.state.timer_running {
            self.state.timer_running = true;
            events.push(GameEvent::TimerStarted {
                interval_ms: self.config.tick_interval_ms,
            });
        }

        if let Some(card) = self.state.deck.get_mut(index) {
            card.revealed = true;
        }
        self.state.face_up.push(index);
        events.push(GameEvent::CardRevealed { index });

        if self.state.face_up.len() == 2 {
            events.extend(self.evaluate_face_up());
        }
        events
    }

    fn evaluate_face_up(&mut self) -> Vec<GameEvent> {
        let (first, second) = (self.state.face_up[0], self.state.face_up[1]);
        self.state.moves += 1;

        if !self.state.deck.values_equal(first, second) {
            self.state.pending = Some(PendingMismatch { first, second });
            debug!("mismatch on cards {first} and {second}");
            return vec![GameEvent::MismatchPending {
                first,
                second,
                delay_ms: self.config.mismatch_delay_ms,
            }];
        }

        let Some(value) = self.state.deck.get(first).map(|card| card.value.clone()) else {
            return Vec::new();
        };
        self.state.deck.mark_matched(&value);
        self.state.matched_pairs += 1;
        self.state.face_up.clear();

        let scorer = if self.state.mode.is_scored() {
            let current = self.state.current_player;
            if let Some(player) = self.state.get_player_mut(current) {
                player.score += 1;
            }
            Some(current)
        } else {
            None
        };
        debug!(
            "pair matched ({}/{})",
            self.state.matched_pairs,
            self.state.deck.pair_count()
        );

        let mut events = vec![GameEvent::PairMatched {
            value,
            player_id: scorer,
        }];
        if self.state.all_pairs_matched() {
            events.push(self.finish());
        }
        events
    }

    /// 配对失败的延时结束：盖回两张牌并决定是否换人。
    pub fn resolve_mismatch(&mut self, epoch: u64) -> Vec<GameEvent> {
        if epoch != self.state.epoch {
            debug!("stale mismatch callback from epoch {epoch}");
            return Vec::new();
        }
        let Some(PendingMismatch { first, second }) = self.state.pending.take() else {
            return Vec::new();
        };

        self.state.deck.conceal(first);
        self.state.deck.conceal(second);
        self.state.face_up.clear();
        let mut events = vec![GameEvent::CardsConcealed { first, second }];

        if self.state.mode.is_scored() {
            if self.state.extra_turn {
                events.push(GameEvent::ExtraTurnConsumed {
                    player_id: self.state.current_player,
                });
            } else {
                let next = opponent_of(self.state.current_player);
                events.extend(self.hand_turn_to(next));
            }
        }
        self.state.extra_turn = false;
        events
    }

    /// 切换回合归属；被封锁的玩家在轮到自己时解除封锁。
    fn hand_turn_to(&mut self, next: PlayerId) -> Vec<GameEvent> {
        let from = self.state.current_player;
        self.state.current_player = next;
        let mut events = vec![GameEvent::TurnPassed { from, to: next }];
        if self.state.blocked_player == Some(next) {
            self.state.blocked_player = None;
            events.push(GameEvent::BlockCleared { player_id: next });
        }
        events
    }

    pub fn tick(&mut self, epoch: u64) -> Vec<GameEvent> {
        if epoch != self.state.epoch || !self.state.timer_running || !self.state.is_playing() {
            return Vec::new();
        }
        self.state.elapsed_seconds += 1;
        vec![GameEvent::TimerTicked {
            elapsed_seconds: self.state.elapsed_seconds,
        }]
    }

    pub fn use_power(&mut self, player_id: PlayerId, kind: PowerKind) -> Vec<GameEvent> {
        self.resolver
            .use_power(&mut self.state, &self.config, &mut self.rng, player_id, kind)
    }

    pub fn clear_peek(&mut self, epoch: u64) -> Vec<GameEvent> {
        self.resolver.clear_peek(&mut self.state, epoch)
    }

    fn finish(&mut self) -> GameEvent {
        self.state.phase = GamePhase::GameOver;
        self.state.timer_running = false;
        let outcome = self.outcome();
        debug!("memory game over: {outcome:?}");
        self.state.outcome = Some(outcome.clone());
        GameEvent::GameOver { outcome }
    }

    fn outcome(&self) -> Outcome {
        if !self.state.mode.is_scored() {
            return Outcome::Timed {
                moves: self.state.moves,
                seconds: self.state.elapsed_seconds,
            };
        }
        let one = self.state.score(PLAYER_ONE);
        let two = self.state.score(PLAYER_TWO);
        match one.cmp(&two) {
            std::cmp::Ordering::Greater => Outcome::Winner {
                player_id: PLAYER_ONE,
            },
            std::cmp::Ordering::Less => Outcome::Winner {
                player_id: PLAYER_TWO,
            },
            std::cmp::Ordering::Equal => Outcome::Tie,
        }
    }

    pub fn status(&self) -> String {
        if let Some(outcome) = &self.state.outcome {
            return outcome.headline();
        }
        match self.state.mode {
            GameMode::None => "Select a game mode to start.".to_string(),
            GameMode::Timer => format!(
                "Moves: {} | Time: {}s",
                self.state.moves, self.state.elapsed_seconds
            ),
            GameMode::TwoPlayer | GameMode::Power => {
                format!("Player {}'s Turn", self.state.current_player)
            }
        }
    }
}
