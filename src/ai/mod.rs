//! 对手出招（外部文本生成服务及随机兜底）。

pub mod js;
pub mod oracle;

pub use js::JsMoveOracle;
pub use oracle::{
    choose_opponent_move, interpret_reply, random_move, MoveOracle, MoveRequestError,
    OpponentChoice, MOVE_INSTRUCTION,
};
