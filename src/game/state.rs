use std::str::FromStr;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::config::GameMode;

/// 卡牌在牌组中的位置，洗牌后固定不变。
pub type CardId = u32;
/// 玩家标识，取值 1 或 2。
pub type PlayerId = u8;

pub const PLAYER_ONE: PlayerId = 1;
pub const PLAYER_TWO: PlayerId = 2;

pub fn opponent_of(player_id: PlayerId) -> PlayerId {
    if player_id == PLAYER_ONE {
        PLAYER_TWO
    } else {
        PLAYER_ONE
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: CardId,
    pub value: String,
    #[serde(default)]
    pub revealed: bool,
    #[serde(default)]
    pub matched: bool,
}

impl Card {
    pub fn new(id: CardId, value: impl Into<String>) -> Self {
        Self {
            id,
            value: value.into(),
            revealed: false,
            matched: false,
        }
    }

    /// 仍可被翻开或偷看的牌。
    pub fn is_hidden(&self) -> bool {
        !self.revealed && !self.matched
    }
}

/// 一副记忆牌：字母表中每个符号恰好出现两次。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(transparent)]
pub struct Deck {
    cards: Vec<Card>,
}

impl Deck {
    /// Fisher–Yates 均匀洗牌后按位置重新编号。
    pub fn shuffled<R: Rng + ?Sized>(alphabet: &[String], rng: &mut R) -> Self {
        let mut values: Vec<&String> = alphabet.iter().chain(alphabet.iter()).collect();
        values.shuffle(rng);
        let cards = values
            .into_iter()
            .enumerate()
            .map(|(index, value)| Card::new(index as CardId, value.clone()))
            .collect();
        Self { cards }
    }

    pub fn from_cards(cards: Vec<Card>) -> Self {
        Self { cards }
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn pair_count(&self) -> usize {
        self.cards.len() / 2
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn get(&self, index: usize) -> Option<&Card> {
        self.cards.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Card> {
        self.cards.get_mut(index)
    }

    pub fn unmatched_indices(&self) -> Vec<usize> {
        self.cards
            .iter()
            .enumerate()
            .filter(|(_, card)| !card.matched)
            .map(|(index, _)| index)
            .collect()
    }

    pub fn hidden_indices(&self) -> Vec<usize> {
        self.cards
            .iter()
            .enumerate()
            .filter(|(_, card)| card.is_hidden())
            .map(|(index, _)| index)
            .collect()
    }

    /// 将所有同值的牌标记为已配对，返回受影响的数量。
    pub fn mark_matched(&mut self, value: &str) -> usize {
        let mut count = 0;
        for card in self.cards.iter_mut().filter(|card| card.value == value) {
            card.matched = true;
            count += 1;
        }
        count
    }

    pub fn conceal(&mut self, index: usize) {
        if let Some(card) = self.cards.get_mut(index) {
            card.revealed = false;
        }
    }

    pub fn values_equal(&self, first: usize, second: usize) -> bool {
        match (self.cards.get(first), self.cards.get(second)) {
            (Some(a), Some(b)) => a.value == b.value,
            _ => false,
        }
    }

    /// 只在未配对的牌之间重新分配牌面，位置与翻开状态保持不变。
    pub fn shuffle_unmatched_values<R: Rng + ?Sized>(&mut self, rng: &mut R) -> usize {
        let positions = self.unmatched_indices();
        let mut values: Vec<String> = positions
            .iter()
            .map(|&index| self.cards[index].value.clone())
            .collect();
        values.shuffle(rng);
        for (index, value) in positions.iter().zip(values) {
            self.cards[*index].value = value;
        }
        positions.len()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum PowerKind {
    Peek,
    ExtraTurn,
    Shuffle,
    Steal,
    Block,
}

impl PowerKind {
    pub const ALL: [PowerKind; 5] = [
        PowerKind::Peek,
        PowerKind::ExtraTurn,
        PowerKind::Shuffle,
        PowerKind::Steal,
        PowerKind::Block,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PowerKind::Peek => "Peek",
            PowerKind::ExtraTurn => "Extra Turn",
            PowerKind::Shuffle => "Shuffle",
            PowerKind::Steal => "Steal Point",
            PowerKind::Block => "Block",
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            PowerKind::Peek => "👀",
            PowerKind::ExtraTurn => "🔄",
            PowerKind::Shuffle => "🔀",
            PowerKind::Steal => "💸",
            PowerKind::Block => "🛡️",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            PowerKind::Peek => "Briefly reveal 3 random cards.",
            PowerKind::ExtraTurn => "Take an extra turn.",
            PowerKind::Shuffle => "Shuffle all unmatched cards.",
            PowerKind::Steal => "Steal 1 point from your opponent.",
            PowerKind::Block => "Block opponent's next power use.",
        }
    }
}

impl FromStr for PowerKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "peek" => Ok(PowerKind::Peek),
            "extraturn" | "extra_turn" | "extra-turn" => Ok(PowerKind::ExtraTurn),
            "shuffle" => Ok(PowerKind::Shuffle),
            "steal" => Ok(PowerKind::Steal),
            "block" => Ok(PowerKind::Block),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Power {
    pub kind: PowerKind,
    pub name: String,
    pub emoji: String,
    pub description: String,
    #[serde(default)]
    pub used: bool,
}

impl Power {
    pub fn new(kind: PowerKind) -> Self {
        Self {
            kind,
            name: kind.name().to_string(),
            emoji: kind.emoji().to_string(),
            description: kind.description().to_string(),
            used: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: PlayerId,
    #[serde(default)]
    pub score: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub powers: Vec<Power>,
}

impl Player {
    pub fn new(id: PlayerId) -> Self {
        Self {
            id,
            score: 0,
            powers: Vec::new(),
        }
    }

    pub fn unused_power_mut(&mut self, kind: PowerKind) -> Option<&mut Power> {
        self.powers
            .iter_mut()
            .find(|power| power.kind == kind && !power.used)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum GamePhase {
    #[default]
    ModeSelect,
    Playing,
    GameOver,
}

/// 两张不同的牌已翻开，等待延时后盖回。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PendingMismatch {
    pub first: usize,
    pub second: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Outcome {
    Timed { moves: u32, seconds: u32 },
    Winner { player_id: PlayerId },
    Tie,
}

impl Outcome {
    pub fn headline(&self) -> String {
        match self {
            Outcome::Timed { moves, seconds } => {
                format!("Game Over! You won in {moves} moves and {seconds} seconds.")
            }
            Outcome::Winner { player_id } => format!("Game Over! Player {player_id} wins!"),
            Outcome::Tie => "Game Over! It's a Tie!".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum GameEvent {
    ModeSelected {
        mode: GameMode,
    },
    ModeCleared,
    DeckDealt {
        cards: usize,
    },
    PowersDealt {
        player_id: PlayerId,
        powers: Vec<PowerKind>,
    },
    CardRevealed {
        index: usize,
    },
    TimerStarted {
        interval_ms: u32,
    },
    TimerTicked {
        elapsed_seconds: u32,
    },
    PairMatched {
        value: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        player_id: Option<PlayerId>,
    },
    MismatchPending {
        first: usize,
        second: usize,
        delay_ms: u32,
    },
    CardsConcealed {
        first: usize,
        second: usize,
    },
    TurnPassed {
        from: PlayerId,
        to: PlayerId,
    },
    ExtraTurnConsumed {
        player_id: PlayerId,
    },
    BlockCleared {
        player_id: PlayerId,
    },
    PowerUsed {
        player_id: PlayerId,
        kind: PowerKind,
    },
    PeekStarted {
        cards: Vec<usize>,
        window_ms: u32,
    },
    PeekCleared,
    ExtraTurnGranted {
        player_id: PlayerId,
    },
    ValuesShuffled {
        cards: usize,
    },
    PointStolen {
        from: PlayerId,
        to: PlayerId,
    },
    PlayerBlocked {
        player_id: PlayerId,
    },
    GameOver {
        outcome: Outcome,
    },
}

/// 单局记忆游戏的全部可观察状态，由会话独占。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MemoryState {
    pub mode: GameMode,
    pub phase: GamePhase,
    pub deck: Deck,
    #[serde(default)]
    pub face_up: Vec<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending: Option<PendingMismatch>,
    pub current_player: PlayerId,
    pub players: Vec<Player>,
    #[serde(default)]
    pub matched_pairs: u32,
    #[serde(default)]
    pub moves: u32,
    #[serde(default)]
    pub elapsed_seconds: u32,
    #[serde(default)]
    pub timer_running: bool,
    #[serde(default)]
    pub extra_turn: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocked_player: Option<PlayerId>,
    #[serde(default)]
    pub peeked: Vec<usize>,
    #[serde(default)]
    pub epoch: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
}

impl MemoryState {
    pub fn new(mode: GameMode, deck: Deck, epoch: u64) -> Self {
        let phase = if mode == GameMode::None {
            GamePhase::ModeSelect
        } else {
            GamePhase::Playing
        };
        Self {
            mode,
            phase,
            deck,
            face_up: Vec::new(),
            pending: None,
            current_player: PLAYER_ONE,
            players: vec![Player::new(PLAYER_ONE), Player::new(PLAYER_TWO)],
            matched_pairs: 0,
            moves: 0,
            elapsed_seconds: 0,
            timer_running: false,
            extra_turn: false,
            blocked_player: None,
            peeked: Vec::new(),
            epoch,
            outcome: None,
        }
    }

    pub fn get_player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|player| player.id == id)
    }

    pub fn get_player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|player| player.id == id)
    }

    pub fn score(&self, id: PlayerId) -> u32 {
        self.get_player(id).map(|player| player.score).unwrap_or(0)
    }

    pub fn is_playing(&self) -> bool {
        self.phase == GamePhase::Playing
    }

    /// 配对判定进行中，输入被锁定。
    pub fn is_checking(&self) -> bool {
        self.pending.is_some()
    }

    pub fn all_pairs_matched(&self) -> bool {
        !self.deck.is_empty() && self.matched_pairs as usize == self.deck.pair_count()
    }
}
