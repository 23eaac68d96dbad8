use std::collections::HashSet;
use std::str::FromStr;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::state::PowerKind;

const DEFAULT_MISMATCH_DELAY_MS: u32 = 1_000;
const DEFAULT_PEEK_WINDOW_MS: u32 = 2_000;
const DEFAULT_TICK_INTERVAL_MS: u32 = 1_000;
const DEFAULT_PEEK_COUNT: usize = 3;
const DEFAULT_POWERS_PER_PLAYER: usize = 2;

/// 默认卡面符号，每个符号在牌组中出现两次。
pub static DEFAULT_ALPHABET: Lazy<Vec<String>> = Lazy::new(|| {
    ["🧠", "🕹️", "👾", "🚀", "🤖", "🎲", "🧩", "🏆"]
        .iter()
        .map(|symbol| symbol.to_string())
        .collect()
});

/// 记忆游戏模式。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum GameMode {
    #[default]
    None,
    Timer,
    TwoPlayer,
    Power,
}

impl GameMode {
    pub fn uses_timer(self) -> bool {
        matches!(self, GameMode::Timer)
    }

    /// 双人模式与能力模式按玩家计分，并在配对失败时轮换。
    pub fn is_scored(self) -> bool {
        matches!(self, GameMode::TwoPlayer | GameMode::Power)
    }

    pub fn deals_powers(self) -> bool {
        matches!(self, GameMode::Power)
    }
}

impl FromStr for GameMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "" => Ok(GameMode::None),
            "timer" | "timed" => Ok(GameMode::Timer),
            "2player" | "twoplayer" | "two-player" | "two_player" => Ok(GameMode::TwoPlayer),
            "power" | "powers" => Ok(GameMode::Power),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Error)]
#[serde(tag = "type")]
pub enum ConfigError {
    #[error("alphabet must contain at least one symbol")]
    EmptyAlphabet,
    #[error("symbol {symbol:?} appears more than once in the alphabet")]
    DuplicateSymbol { symbol: String },
    #[error("{requested} powers per player exceeds the pool of {available}")]
    PowerPoolExhausted { requested: usize, available: usize },
    #[error("{field} must be greater than zero")]
    ZeroDuration { field: String },
}

/// 记忆游戏的可调参数，前端以 camelCase JSON 传入，缺省字段取默认值。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct MemoryConfig {
    pub alphabet: Vec<String>,
    pub mismatch_delay_ms: u32,
    pub peek_window_ms: u32,
    pub peek_count: usize,
    pub powers_per_player: usize,
    pub tick_interval_ms: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            alphabet: DEFAULT_ALPHABET.clone(),
            mismatch_delay_ms: DEFAULT_MISMATCH_DELAY_MS,
            peek_window_ms: DEFAULT_PEEK_WINDOW_MS,
            peek_count: DEFAULT_PEEK_COUNT,
            powers_per_player: DEFAULT_POWERS_PER_PLAYER,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            seed: None,
        }
    }
}

impl MemoryConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_alphabet<I, S>(mut self, symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.alphabet = symbols.into_iter().map(Into::into).collect();
        self
    }

    pub fn pair_count(&self) -> usize {
        self.alphabet.len()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.alphabet.is_empty() {
            return Err(ConfigError::EmptyAlphabet);
        }

        let mut seen = HashSet::new();
        for symbol in &self.alphabet {
            if !seen.insert(symbol.as_str()) {
                return Err(ConfigError::DuplicateSymbol {
                    symbol: symbol.clone(),
                });
            }
        }

        // 两名玩家的能力牌从同一牌池发出，互不重复。
        let available = PowerKind::ALL.len();
        if self.powers_per_player * 2 > available {
            return Err(ConfigError::PowerPoolExhausted {
                requested: self.powers_per_player,
                available,
            });
        }

        for (field, value) in [
            ("mismatchDelayMs", self.mismatch_delay_ms),
            ("peekWindowMs", self.peek_window_ms),
            ("tickIntervalMs", self.tick_interval_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::ZeroDuration {
                    field: field.to_string(),
                });
            }
        }

        Ok(())
    }
}
