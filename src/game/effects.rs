use log::debug;
use rand::seq::SliceRandom;
use rand::Rng;

use super::{
    config::MemoryConfig,
    state::{opponent_of, GameEvent, MemoryState, PlayerId, PowerKind},
};

/// 能力结算时的上下文。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerContext {
    pub source_player: PlayerId,
    pub opponent: PlayerId,
    pub peek_count: usize,
    pub peek_window_ms: u32,
}

impl PowerContext {
    pub fn new(source_player: PlayerId, config: &MemoryConfig) -> Self {
        Self {
            source_player,
            opponent: opponent_of(source_player),
            peek_count: config.peek_count,
            peek_window_ms: config.peek_window_ms,
        }
    }
}

#[derive(Default, Debug, Clone)]
pub struct PowerResolution {
    pub events: Vec<GameEvent>,
}

impl PowerKind {
    pub fn apply<R: Rng + ?Sized>(
        self,
        ctx: &PowerContext,
        state: &mut MemoryState,
        rng: &mut R,
    ) -> PowerResolution {
        let events = match self {
            PowerKind::Peek => {
                let hidden = state.deck.hidden_indices();
                let mut cards: Vec<usize> = hidden
                    .choose_multiple(rng, ctx.peek_count)
                    .copied()
                    .collect();
                cards.sort_unstable();
                state.peeked = cards.clone();
                vec![GameEvent::PeekStarted {
                    cards,
                    window_ms: ctx.peek_window_ms,
                }]
            }
            PowerKind::ExtraTurn => {
                state.extra_turn = true;
                vec![GameEvent::ExtraTurnGranted {
                    player_id: ctx.source_player,
                }]
            }
            PowerKind::Shuffle => {
                let cards = state.deck.shuffle_unmatched_values(rng);
                vec![GameEvent::ValuesShuffled { cards }]
            }
            PowerKind::Steal => {
                if state.score(ctx.opponent) == 0 {
                    Vec::new()
                } else {
                    if let Some(opponent) = state.get_player_mut(ctx.opponent) {
                        opponent.score -= 1;
                    }
                    if let Some(source) = state.get_player_mut(ctx.source_player) {
                        source.score += 1;
                    }
                    vec![GameEvent::PointStolen {
                        from: ctx.opponent,
                        to: ctx.source_player,
                    }]
                }
            }
            PowerKind::Block => {
                state.blocked_player = Some(ctx.opponent);
                vec![GameEvent::PlayerBlocked {
                    player_id: ctx.opponent,
                }]
            }
        };
        PowerResolution { events }
    }
}

/// 校验能力使用条件，先标记已用再结算效果。
#[derive(Default, Debug, Clone, Copy)]
pub struct PowerResolver;

impl PowerResolver {
    fn rejection(
        state: &MemoryState,
        player_id: PlayerId,
        kind: PowerKind,
    ) -> Option<&'static str> {
        if !state.mode.deals_powers() {
            return Some("powers are only available in power mode");
        }
        if !state.is_playing() {
            return Some("game is not in progress");
        }
        if state.is_checking() {
            return Some("a pair is being checked");
        }
        if state.current_player != player_id {
            return Some("not this player's turn");
        }
        if state.blocked_player == Some(player_id) {
            return Some("player is blocked");
        }
        let owns_unused = state
            .get_player(player_id)
            .map(|player| {
                player
                    .powers
                    .iter()
                    .any(|power| power.kind == kind && !power.used)
            })
            .unwrap_or(false);
        if !owns_unused {
            return Some("power not held or already used");
        }
        None
    }

    pub fn use_power<R: Rng + ?Sized>(
        &mut self,
        state: &mut MemoryState,
        config: &MemoryConfig,
        rng: &mut R,
        player_id: PlayerId,
        kind: PowerKind,
    ) -> Vec<GameEvent> {
        if let Some(reason) = Self::rejection(state, player_id, kind) {
            debug!("use_power({player_id}, {kind:?}) ignored: {reason}");
            return Vec::new();
        }

        if let Some(power) = state
            .get_player_mut(player_id)
            .and_then(|player| player.unused_power_mut(kind))
        {
            power.used = true;
        }

        let ctx = PowerContext::new(player_id, config);
        let mut events = vec![GameEvent::PowerUsed { player_id, kind }];
        events.extend(kind.apply(&ctx, state, rng).events);
        debug!("player {player_id} used {}", kind.name());
        events
    }

    /// 偷看窗口结束；只清除偷看标记，不改动翻开或配对状态。
    pub fn clear_peek(&mut self, state: &mut MemoryState, epoch: u64) -> Vec<GameEvent> {
        if epoch != state.epoch || state.peeked.is_empty() {
            return Vec::new();
        }
        state.peeked.clear();
        vec![GameEvent::PeekCleared]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::config::GameMode;
    use crate::game::rules::{tests::ordered_game, MemoryGame};
    use crate::game::state::{Power, PLAYER_ONE, PLAYER_TWO};

    fn power_game(one: &[PowerKind], two: &[PowerKind]) -> MemoryGame {
        let game = ordered_game(GameMode::Power);
        let mut state = game.state().clone();
        for (player_id, kinds) in [(PLAYER_ONE, one), (PLAYER_TWO, two)] {
            if let Some(player) = state.get_player_mut(player_id) {
                player.powers = kinds.iter().copied().map(Power::new).collect();
            }
        }
        MemoryGame::restore(game.config().clone(), state).expect("valid config")
    }

    fn power_used(game: &MemoryGame, player_id: PlayerId, kind: PowerKind) -> bool {
        game.state()
            .get_player(player_id)
            .and_then(|player| player.powers.iter().find(|power| power.kind == kind))
            .map(|power| power.used)
            .unwrap_or(false)
    }

    fn mismatch(game: &mut MemoryGame, first: usize, second: usize) {
        game.select_card(first);
        game.select_card(second);
        game.resolve_mismatch(game.epoch());
    }

    #[test]
    fn steal_from_scoreless_opponent_only_consumes_power() {
        let mut game = power_game(&[PowerKind::Steal, PowerKind::Peek], &[PowerKind::Block]);
        let events = game.use_power(PLAYER_ONE, PowerKind::Steal);

        assert_eq!(
            events,
            vec![GameEvent::PowerUsed {
                player_id: PLAYER_ONE,
                kind: PowerKind::Steal
            }]
        );
        assert!(power_used(&game, PLAYER_ONE, PowerKind::Steal));
        assert_eq!(game.state().score(PLAYER_ONE), 0);
        assert_eq!(game.state().score(PLAYER_TWO), 0);
    }

    #[test]
    fn steal_moves_one_point() {
        let mut game = power_game(&[PowerKind::Block], &[PowerKind::Steal]);
        mismatch(&mut game, 0, 2);
        game.select_card(4);
        game.select_card(5);
        game.select_card(6);
        game.select_card(7);
        assert_eq!(game.state().score(PLAYER_TWO), 2);
        assert_eq!(game.state().current_player, PLAYER_TWO);

        // 让一号玩家拿到一分。
        mismatch(&mut game, 0, 2);
        game.select_card(8);
        game.select_card(9);
        mismatch(&mut game, 0, 2);
        assert_eq!(game.state().current_player, PLAYER_TWO);

        let events = game.use_power(PLAYER_TWO, PowerKind::Steal);
        assert!(events.contains(&GameEvent::PointStolen {
            from: PLAYER_ONE,
            to: PLAYER_TWO
        }));
        assert_eq!(game.state().score(PLAYER_ONE), 0);
        assert_eq!(game.state().score(PLAYER_TWO), 3);
    }

    #[test]
    fn powers_are_single_use() {
        let mut game = power_game(&[PowerKind::ExtraTurn], &[]);
        assert!(!game.use_power(PLAYER_ONE, PowerKind::ExtraTurn).is_empty());
        assert!(game.use_power(PLAYER_ONE, PowerKind::ExtraTurn).is_empty());
    }

    #[test]
    fn unheld_or_out_of_turn_powers_are_ignored() {
        let mut game = power_game(&[PowerKind::Peek], &[PowerKind::Shuffle]);
        let before = game.state().clone();
        assert!(game.use_power(PLAYER_ONE, PowerKind::Shuffle).is_empty());
        assert!(game.use_power(PLAYER_TWO, PowerKind::Shuffle).is_empty());
        assert_eq!(game.state(), &before);
    }

    #[test]
    fn powers_wait_for_pending_check() {
        let mut game = power_game(&[PowerKind::Peek], &[]);
        game.select_card(0);
        game.select_card(2);
        assert!(game.use_power(PLAYER_ONE, PowerKind::Peek).is_empty());
        assert!(!power_used(&game, PLAYER_ONE, PowerKind::Peek));
    }

    #[test]
    fn powers_require_power_mode() {
        let mut game = ordered_game(GameMode::TwoPlayer);
        let mut state = game.state().clone();
        if let Some(player) = state.get_player_mut(PLAYER_ONE) {
            player.powers = vec![Power::new(PowerKind::Block)];
        }
        game = MemoryGame::restore(game.config().clone(), state).expect("valid config");
        assert!(game.use_power(PLAYER_ONE, PowerKind::Block).is_empty());
    }

    #[test]
    fn extra_turn_survives_one_mismatch() {
        let mut game = power_game(&[PowerKind::ExtraTurn], &[]);
        game.use_power(PLAYER_ONE, PowerKind::ExtraTurn);
        assert!(game.state().extra_turn);

        mismatch(&mut game, 0, 2);
        assert_eq!(game.state().current_player, PLAYER_ONE);
        assert!(!game.state().extra_turn);

        mismatch(&mut game, 0, 2);
        assert_eq!(game.state().current_player, PLAYER_TWO);
    }

    #[test]
    fn block_holds_until_blocked_player_turn() {
        let mut game = power_game(&[PowerKind::Block], &[PowerKind::Peek]);
        let events = game.use_power(PLAYER_ONE, PowerKind::Block);
        assert!(events.contains(&GameEvent::PlayerBlocked {
            player_id: PLAYER_TWO
        }));
        assert_eq!(game.state().blocked_player, Some(PLAYER_TWO));
        assert!(game.use_power(PLAYER_TWO, PowerKind::Peek).is_empty());

        game.select_card(0);
        game.select_card(2);
        let events = game.resolve_mismatch(game.epoch());
        assert!(events.contains(&GameEvent::BlockCleared {
            player_id: PLAYER_TWO
        }));
        assert_eq!(game.state().blocked_player, None);
        assert!(!game.use_power(PLAYER_TWO, PowerKind::Peek).is_empty());
    }

    #[test]
    fn blocked_player_cannot_use_powers_on_own_turn() {
        let game = power_game(&[], &[PowerKind::Shuffle]);
        let mut state = game.state().clone();
        state.current_player = PLAYER_TWO;
        state.blocked_player = Some(PLAYER_TWO);
        let mut game = MemoryGame::restore(game.config().clone(), state).expect("valid config");

        assert!(game.use_power(PLAYER_TWO, PowerKind::Shuffle).is_empty());
        assert!(!power_used(&game, PLAYER_TWO, PowerKind::Shuffle));
    }

    #[test]
    fn shuffle_only_moves_unmatched_values() {
        let mut game = power_game(&[PowerKind::Shuffle], &[]);
        game.select_card(0);
        game.select_card(1);
        game.select_card(5);
        let before = game.state().clone();

        let events = game.use_power(PLAYER_ONE, PowerKind::Shuffle);
        assert!(events.contains(&GameEvent::ValuesShuffled { cards: 14 }));

        let after = game.state();
        let mut old_values: Vec<&str> = before
            .deck
            .cards()
            .iter()
            .map(|c| c.value.as_str())
            .collect();
        let mut new_values: Vec<&str> = after
            .deck
            .cards()
            .iter()
            .map(|c| c.value.as_str())
            .collect();
        old_values.sort_unstable();
        new_values.sort_unstable();
        assert_eq!(old_values, new_values);

        for (old, new) in before.deck.cards().iter().zip(after.deck.cards()) {
            assert_eq!(old.revealed, new.revealed);
            assert_eq!(old.matched, new.matched);
            if old.matched {
                assert_eq!(old.value, new.value);
            }
        }
    }

    #[test]
    fn peek_marks_hidden_cards_and_clears_on_schedule() {
        let mut game = power_game(&[PowerKind::Peek], &[]);
        game.select_card(0);
        game.select_card(1);
        game.select_card(4);
        let before = game.state().deck.clone();

        let events = game.use_power(PLAYER_ONE, PowerKind::Peek);
        assert!(events.iter().any(|event| matches!(
            event,
            GameEvent::PeekStarted { window_ms: 2_000, .. }
        )));

        let peeked = game.state().peeked.clone();
        assert_eq!(peeked.len(), 3);
        for index in &peeked {
            assert!(before.cards()[*index].is_hidden());
        }
        assert_eq!(game.state().deck, before);

        assert!(game.clear_peek(game.epoch() + 7).is_empty());
        assert_eq!(game.clear_peek(game.epoch()), vec![GameEvent::PeekCleared]);
        assert!(game.state().peeked.is_empty());
        assert_eq!(game.state().deck, before);
    }

    #[test]
    fn peek_takes_fewer_cards_when_few_remain() {
        let mut game = power_game(&[PowerKind::Peek], &[]);
        for pair in 0..7 {
            game.select_card(pair * 2);
            game.select_card(pair * 2 + 1);
        }
        game.select_card(14);
        game.use_power(PLAYER_ONE, PowerKind::Peek);
        assert_eq!(game.state().peeked, vec![15]);
    }
}
