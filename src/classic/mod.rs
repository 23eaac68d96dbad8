//! 外围小游戏：井字棋与石头剪刀布。

pub mod rps;
pub mod tictactoe;

pub use rps::{play_round, Move, RockPaperScissors, RoundOutcome, RoundReport};
pub use tictactoe::{Mark, TicTacToe};
