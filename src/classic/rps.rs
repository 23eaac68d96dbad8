use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::ai::{choose_opponent_move, MoveOracle, MoveRequestError, OpponentChoice};

const ADVISORY: &str = "Oops! Something went wrong.";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Move {
    Rock,
    Paper,
    Scissors,
}

impl Move {
    pub const ALL: [Move; 3] = [Move::Rock, Move::Paper, Move::Scissors];

    pub fn beats(self, other: Move) -> bool {
        matches!(
            (self, other),
            (Move::Rock, Move::Scissors) | (Move::Scissors, Move::Paper) | (Move::Paper, Move::Rock)
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            Move::Rock => "Rock",
            Move::Paper => "Paper",
            Move::Scissors => "Scissors",
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            Move::Rock => "✊",
            Move::Paper => "✋",
            Move::Scissors => "✌️",
        }
    }
}

/// 只接受与招式名完全一致的文本。
impl FromStr for Move {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Move::ALL
            .iter()
            .copied()
            .find(|candidate| candidate.name() == s)
            .ok_or(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RoundOutcome {
    Win,
    Lose,
    Tie,
}

impl RoundOutcome {
    pub fn judge(player: Move, opponent: Move) -> Self {
        if player == opponent {
            RoundOutcome::Tie
        } else if player.beats(opponent) {
            RoundOutcome::Win
        } else {
            RoundOutcome::Lose
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            RoundOutcome::Win => "You win!",
            RoundOutcome::Lose => "You lose!",
            RoundOutcome::Tie => "It's a tie!",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RoundReport {
    pub player: Move,
    pub opponent: Move,
    pub outcome: RoundOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<MoveRequestError>,
}

impl RoundReport {
    pub fn new(player: Move, opponent: OpponentChoice) -> Self {
        Self {
            player,
            opponent: opponent.choice,
            outcome: RoundOutcome::judge(player, opponent.choice),
            fallback: opponent.fallback,
        }
    }

    /// 兜底时附带的提示，不影响胜负判定。
    pub fn advisory(&self) -> Option<&'static str> {
        self.fallback.as_ref().map(|_| ADVISORY)
    }
}

pub async fn play_round<R: Rng + ?Sized>(
    player: Move,
    oracle: &dyn MoveOracle,
    rng: &mut R,
) -> RoundReport {
    let opponent = choose_opponent_move(oracle, rng).await;
    RoundReport::new(player, opponent)
}

/// 石头剪刀布会话状态。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RockPaperScissors {
    pub player_choice: Option<Move>,
    pub opponent_choice: Option<Move>,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advisory: Option<String>,
    pub thinking: bool,
}

impl Default for RockPaperScissors {
    fn default() -> Self {
        Self {
            player_choice: None,
            opponent_choice: None,
            status: "Choose your move!".to_string(),
            advisory: None,
            thinking: false,
        }
    }
}

impl RockPaperScissors {
    pub fn new() -> Self {
        Self::default()
    }

    /// 开始一轮；上一轮还在等待对手时忽略。
    pub fn begin_round(&mut self, choice: Move) -> bool {
        if self.thinking {
            return false;
        }
        self.player_choice = Some(choice);
        self.opponent_choice = None;
        self.advisory = None;
        self.status = "Thinking...".to_string();
        self.thinking = true;
        true
    }

    pub fn finish_round(&mut self, report: &RoundReport) {
        self.player_choice = Some(report.player);
        self.opponent_choice = Some(report.opponent);
        self.status = report.outcome.message().to_string();
        self.advisory = report.advisory().map(str::to_string);
        self.thinking = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::oracle::tests::ScriptedOracle;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn beats_relation_is_cyclic() {
        for player in Move::ALL {
            let wins = Move::ALL.iter().filter(|&&other| player.beats(other)).count();
            assert_eq!(wins, 1);
            assert!(!player.beats(player));
        }
        assert_eq!(RoundOutcome::judge(Move::Paper, Move::Rock), RoundOutcome::Win);
        assert_eq!(RoundOutcome::judge(Move::Paper, Move::Scissors), RoundOutcome::Lose);
        assert_eq!(RoundOutcome::judge(Move::Paper, Move::Paper), RoundOutcome::Tie);
    }

    #[test]
    fn rock_beats_scissors_reply() {
        let mut rng = SmallRng::seed_from_u64(1);
        let oracle = ScriptedOracle(Ok("Scissors".into()));
        let report = pollster::block_on(play_round(Move::Rock, &oracle, &mut rng));
        assert_eq!(report.opponent, Move::Scissors);
        assert_eq!(report.outcome.message(), "You win!");
        assert_eq!(report.advisory(), None);
    }

    #[test]
    fn invalid_reply_is_judged_against_substitute() {
        for seed in 0..12 {
            let mut rng = SmallRng::seed_from_u64(seed);
            let oracle = ScriptedOracle(Ok("Lizard".into()));
            let report = pollster::block_on(play_round(Move::Rock, &oracle, &mut rng));
            assert!(Move::ALL.contains(&report.opponent));
            assert_eq!(report.outcome, RoundOutcome::judge(Move::Rock, report.opponent));
            assert_eq!(report.advisory(), Some("Oops! Something went wrong."));
        }
    }

    #[test]
    fn session_tracks_round_lifecycle() {
        let mut session = RockPaperScissors::new();
        assert!(session.begin_round(Move::Paper));
        assert!(session.thinking);
        assert_eq!(session.status, "Thinking...");
        assert!(!session.begin_round(Move::Rock));
        assert_eq!(session.player_choice, Some(Move::Paper));

        let mut rng = SmallRng::seed_from_u64(2);
        let oracle = ScriptedOracle(Err(MoveRequestError::Transport {
            message: "timeout".into(),
        }));
        let report = pollster::block_on(play_round(Move::Paper, &oracle, &mut rng));
        session.finish_round(&report);

        assert!(!session.thinking);
        assert_eq!(session.opponent_choice, Some(report.opponent));
        assert_eq!(session.status, report.outcome.message());
        assert_eq!(session.advisory.as_deref(), Some("Oops! Something went wrong."));
        assert!(session.begin_round(Move::Rock));
    }

    #[test]
    fn parses_only_exact_names() {
        assert_eq!("Scissors".parse::<Move>(), Ok(Move::Scissors));
        assert!("scissors".parse::<Move>().is_err());
    }
}
