use std::str::FromStr;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::classic::{RockPaperScissors, TicTacToe};
use crate::game::{ConfigError, MemoryConfig, MemoryGame};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum View {
    #[default]
    Home,
    TicTacToe,
    RockPaperScissors,
    MemoryGame,
}

impl View {
    pub fn slug(self) -> &'static str {
        match self {
            View::Home => "home",
            View::TicTacToe => "tic-tac-toe",
            View::RockPaperScissors => "rock-paper-scissors",
            View::MemoryGame => "memory-game",
        }
    }
}

impl FromStr for View {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "home" | "" => Ok(View::Home),
            "tic-tac-toe" | "tictactoe" => Ok(View::TicTacToe),
            "rock-paper-scissors" | "rps" => Ok(View::RockPaperScissors),
            "memory-game" | "memory" => Ok(View::MemoryGame),
            _ => Err(()),
        }
    }
}

/// 主菜单上的游戏卡片。
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct GameCard {
    pub view: View,
    pub title: &'static str,
    pub description: &'static str,
}

pub fn menu() -> Vec<GameCard> {
    vec![
        GameCard {
            view: View::TicTacToe,
            title: "Tic-Tac-Toe",
            description: "The classic challenge of Xs and Os.",
        },
        GameCard {
            view: View::RockPaperScissors,
            title: "Rock, Paper, Scissors",
            description: "Can you beat the AI?",
        },
        GameCard {
            view: View::MemoryGame,
            title: "Memory Game",
            description: "Flip cards to match pairs. Play with timers or powers!",
        },
    ]
}

/// 某个视图的新会话；由调用方持有，丢弃即结束该局。
pub enum Session {
    Home,
    TicTacToe(TicTacToe),
    RockPaperScissors(RockPaperScissors),
    MemoryGame(Box<MemoryGame>),
}

impl Session {
    pub fn open(view: View, memory_config: &MemoryConfig) -> Result<Self, ConfigError> {
        Ok(match view {
            View::Home => Session::Home,
            View::TicTacToe => Session::TicTacToe(TicTacToe::new()),
            View::RockPaperScissors => Session::RockPaperScissors(RockPaperScissors::new()),
            View::MemoryGame => {
                Session::MemoryGame(Box::new(MemoryGame::new(memory_config.clone())?))
            }
        })
    }

    pub fn view(&self) -> View {
        match self {
            Session::Home => View::Home,
            Session::TicTacToe(_) => View::TicTacToe,
            Session::RockPaperScissors(_) => View::RockPaperScissors,
            Session::MemoryGame(_) => View::MemoryGame,
        }
    }
}

/// 视图路由：记录当前视图，并为目标视图开启全新会话。
pub struct Arcade {
    memory_config: MemoryConfig,
    view: View,
}

impl Arcade {
    pub fn new(memory_config: MemoryConfig) -> Result<Self, ConfigError> {
        memory_config.validate()?;
        Ok(Self {
            memory_config,
            view: View::Home,
        })
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn navigate(&mut self, view: View) -> Result<Session, ConfigError> {
        let session = Session::open(view, &self.memory_config)?;
        self.view = view;
        debug!("navigated to {}", view.slug());
        Ok(session)
    }

    pub fn back(&mut self) -> Session {
        self.view = View::Home;
        Session::Home
    }
}
