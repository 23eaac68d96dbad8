use async_trait::async_trait;
use log::warn;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::classic::rps::Move;

/// 发给文本生成服务的固定指令。
pub const MOVE_INSTRUCTION: &str =
    "Choose Rock, Paper, or Scissors. Your answer must be one word only.";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Error)]
#[serde(tag = "type")]
pub enum MoveRequestError {
    #[error("move request failed: {message}")]
    Transport { message: String },
    #[error("reply {reply:?} is not a legal move")]
    InvalidResponse { reply: String },
}

/// 对手出招的外部协作方，例如前端注入的文本生成调用。
///
/// 浏览器环境单线程，因此不要求 `Send`。
#[async_trait(?Send)]
pub trait MoveOracle {
    async fn choose_move(&self, instruction: &str) -> Result<String, MoveRequestError>;
}

/// 对手选择的结果；`fallback` 记录为何改用随机招式。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OpponentChoice {
    pub choice: Move,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<MoveRequestError>,
}

pub fn random_move<R: Rng + ?Sized>(rng: &mut R) -> Move {
    Move::ALL.choose(rng).copied().unwrap_or(Move::Rock)
}

/// 解析回复；失败或词汇表外的回复一律换成均匀随机招式，不重试。
pub fn interpret_reply<R: Rng + ?Sized>(
    reply: Result<String, MoveRequestError>,
    rng: &mut R,
) -> OpponentChoice {
    let error = match reply {
        Ok(text) => match text.trim().parse::<Move>() {
            Ok(choice) => {
                return OpponentChoice {
                    choice,
                    fallback: None,
                }
            }
            Err(()) => MoveRequestError::InvalidResponse { reply: text },
        },
        Err(error) => error,
    };

    let choice = random_move(rng);
    warn!("opponent move fell back to {choice:?}: {error}");
    OpponentChoice {
        choice,
        fallback: Some(error),
    }
}

pub async fn choose_opponent_move<R: Rng + ?Sized>(
    oracle: &dyn MoveOracle,
    rng: &mut R,
) -> OpponentChoice {
    let reply = oracle.choose_move(MOVE_INSTRUCTION).await;
    interpret_reply(reply, rng)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    /// 返回固定回复的测试替身。
    pub(crate) struct ScriptedOracle(pub Result<String, MoveRequestError>);

    #[async_trait(?Send)]
    impl MoveOracle for ScriptedOracle {
        async fn choose_move(&self, instruction: &str) -> Result<String, MoveRequestError> {
            assert_eq!(instruction, MOVE_INSTRUCTION);
            self.0.clone()
        }
    }

    #[test]
    fn exact_reply_is_used() {
        let mut rng = SmallRng::seed_from_u64(5);
        let choice = interpret_reply(Ok(" Paper\n".into()), &mut rng);
        assert_eq!(choice.choice, Move::Paper);
        assert!(choice.fallback.is_none());
    }

    #[test]
    fn out_of_vocabulary_reply_falls_back() {
        let mut rng = SmallRng::seed_from_u64(5);
        for reply in ["Lizard", "rock", "Rock!", ""] {
            let choice = interpret_reply(Ok(reply.into()), &mut rng);
            assert_eq!(
                choice.fallback,
                Some(MoveRequestError::InvalidResponse {
                    reply: reply.into()
                })
            );
            assert!(Move::ALL.contains(&choice.choice));
        }
    }

    #[test]
    fn fallback_is_roughly_uniform() {
        let mut rng = SmallRng::seed_from_u64(99);
        let mut counts = [0usize; 3];
        for _ in 0..3_000 {
            let choice = random_move(&mut rng);
            counts[choice as usize] += 1;
        }
        assert!(counts.iter().all(|&count| (800..1_200).contains(&count)));
    }

    #[test]
    fn transport_failure_falls_back() {
        let mut rng = SmallRng::seed_from_u64(8);
        let oracle = ScriptedOracle(Err(MoveRequestError::Transport {
            message: "offline".into(),
        }));
        let choice = pollster::block_on(choose_opponent_move(&oracle, &mut rng));
        assert!(matches!(
            choice.fallback,
            Some(MoveRequestError::Transport { .. })
        ));
    }
}
