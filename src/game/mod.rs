//! 记忆翻牌游戏核心（牌组、回合状态机、能力结算）。

pub mod config;
pub mod effects;
pub mod rules;
pub mod state;

pub use config::{ConfigError, GameMode, MemoryConfig, DEFAULT_ALPHABET};
pub use effects::{PowerContext, PowerResolution, PowerResolver};
pub use rules::{MemoryGame, Resolution};
pub use state::{
    opponent_of,
    Card,
    CardId,
    Deck,
    GameEvent,
    GamePhase,
    MemoryState,
    Outcome,
    PendingMismatch,
    Player,
    PlayerId,
    Power,
    PowerKind,
    PLAYER_ONE,
    PLAYER_TWO,
};
