use chrono::{DateTime, Utc};
use proptest::prelude::*;

use common::Candle;
use strategy::indicators::consecutive_candles;
use strategy::{TrendAction, TrendDirection, TrendState, TrendTracker};

fn tracker(persistence: u32) -> TrendTracker {
    TrendTracker::new(30.0, 70.0, persistence)
}

fn any_trend_state() -> impl Strategy<Value = TrendState> {
    (0u8..3, 0u32..50, any::<bool>(), any::<bool>()).prop_map(|(d, duration, persisted, advised)| {
        TrendState {
            direction: match d {
                0 => TrendDirection::None,
                1 => TrendDirection::High,
                _ => TrendDirection::Low,
            },
            duration,
            persisted,
            advised,
        }
    })
}

proptest! {
    /// Holding above `high` fires exactly once, on the tick duration reaches persistence.
    #[test]
    fn persisted_high_fires_exactly_once(
        persistence in 1u32..20,
        extra in 0usize..20,
        value in 70.001f64..100.0,
    ) {
        let t = tracker(persistence);
        let mut state = TrendState::default();
        let ticks = persistence as usize + extra;
        let mut fired = Vec::new();
        for _ in 0..ticks {
            if t.advance(&mut state, value).action == TrendAction::EnterHigh {
                fired.push(state.duration);
            }
        }
        prop_assert_eq!(fired, vec![persistence]);
    }

    /// A flip resets duration and advice, whatever the previous run looked like.
    #[test]
    fn direction_flip_resets(
        prior in any_trend_state(),
        high_value in 70.001f64..100.0,
        low_value in 0.0f64..29.999,
        persistence in 2u32..10,
    ) {
        let t = tracker(persistence);
        let mut state = prior;
        state.direction = TrendDirection::High;

        t.advance(&mut state, low_value);
        prop_assert_eq!(state.direction, TrendDirection::Low);
        prop_assert_eq!(state.duration, 1);
        prop_assert!(!state.advised);
        prop_assert!(!state.persisted);

        t.advance(&mut state, high_value);
        prop_assert_eq!(state.direction, TrendDirection::High);
        prop_assert_eq!(state.duration, 1);
        prop_assert!(!state.advised);
    }

    /// Readings inside [low, high] never act and never move the state.
    #[test]
    fn neutral_readings_never_act(
        prior in any_trend_state(),
        value in 30.0f64..=70.0,
        persistence in 1u32..10,
    ) {
        let t = tracker(persistence);
        let mut state = prior;
        let reading = t.advance(&mut state, value);
        prop_assert_eq!(reading.action, TrendAction::None);
        prop_assert_eq!(reading.direction, TrendDirection::None);
        prop_assert_eq!(state, prior);
    }

    /// Actions never outnumber the trend runs in any reading sequence.
    #[test]
    fn at_most_one_action_per_run(
        values in prop::collection::vec(0.0f64..100.0, 1..200),
        persistence in 1u32..5,
    ) {
        let t = tracker(persistence);
        let mut state = TrendState::default();
        let mut runs = 0usize;
        let mut actions = 0usize;
        let mut last = TrendDirection::None;
        for v in values {
            let reading = t.advance(&mut state, v);
            if reading.direction != TrendDirection::None && reading.direction != last {
                runs += 1;
                last = reading.direction;
            }
            if reading.action != TrendAction::None {
                actions += 1;
            }
        }
        prop_assert!(actions <= runs);
    }

    /// Both flags are never set together, and short histories are neutral.
    #[test]
    fn run_flags_are_exclusive(
        pairs in prop::collection::vec((1.0f64..100.0, 1.0f64..100.0), 0..30),
        n in 0usize..10,
    ) {
        let candles: Vec<Candle> = pairs
            .iter()
            .map(|&(open, close)| Candle {
                open,
                high: open.max(close),
                low: open.min(close),
                close,
                timestamp: DateTime::<Utc>::UNIX_EPOCH,
            })
            .collect();
        let run = consecutive_candles(&candles, n);
        prop_assert!(!(run.bullish && run.bearish));
        if n == 0 || candles.len() < n {
            prop_assert!(run.is_neutral());
        }
    }
}
