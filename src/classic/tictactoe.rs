use serde::{Deserialize, Serialize};

const LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Mark {
    X,
    O,
}

impl Mark {
    pub fn other(self) -> Self {
        match self {
            Mark::X => Mark::O,
            Mark::O => Mark::X,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Mark::X => "X",
            Mark::O => "O",
        }
    }
}

/// 井字棋局面，X 先手。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TicTacToe {
    pub board: [Option<Mark>; 9],
    pub next: Mark,
}

impl Default for TicTacToe {
    fn default() -> Self {
        Self {
            board: [None; 9],
            next: Mark::X,
        }
    }
}

impl TicTacToe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn winner(&self) -> Option<Mark> {
        LINES.iter().find_map(|&[a, b, c]| match self.board[a] {
            Some(mark) if self.board[b] == Some(mark) && self.board[c] == Some(mark) => Some(mark),
            _ => None,
        })
    }

    pub fn is_draw(&self) -> bool {
        self.winner().is_none() && self.board.iter().all(Option::is_some)
    }

    /// 落子；已分胜负、格子已占或越界时忽略并返回 false。
    pub fn play(&mut self, index: usize) -> bool {
        if self.winner().is_some() {
            return false;
        }
        match self.board.get_mut(index) {
            Some(cell) if cell.is_none() => {
                *cell = Some(self.next);
                self.next = self.next.other();
                true
            }
            _ => false,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn status(&self) -> String {
        if let Some(mark) = self.winner() {
            format!("Winner: {}", mark.as_str())
        } else if self.is_draw() {
            "It's a Draw!".to_string()
        } else {
            format!("Next player: {}", self.next.as_str())
        }
    }
}
