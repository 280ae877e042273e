//! Randomised invariants for the indicator, broker and drawdown components.

mod common;

use common::*;
use macross::domain::backtest::{run_backtest, BacktestConfig};
use macross::domain::broker::Broker;
use macross::domain::drawdown::DrawdownTracker;
use macross::domain::indicator::sma::calculate_sma;
use macross::domain::indicator::{compute_snapshots, Cross, IndicatorParams};
use macross::domain::order::Order;
use proptest::prelude::*;

fn closes_strategy(len: std::ops::Range<usize>) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(1.0f64..500.0, len)
}

proptest! {
    #[test]
    fn fast_average_absent_before_period(closes in closes_strategy(1..80), pfast in 1usize..10) {
        let params = IndicatorParams { pfast, pslow: pfast + 5, slope_period: 3, lookback_period: 20 };
        let snapshots = compute_snapshots(&bars_from_closes(&closes), params);
        for (i, snap) in snapshots.iter().enumerate() {
            prop_assert_eq!(snap.fast_ma.is_some(), i + 1 >= pfast);
            prop_assert_eq!(snap.slow_ma.is_some(), i + 1 >= pfast + 5);
        }
    }

    #[test]
    fn crossovers_alternate(closes in closes_strategy(10..200)) {
        let params = IndicatorParams { pfast: 3, pslow: 7, slope_period: 2, lookback_period: 10 };
        let snapshots = compute_snapshots(&bars_from_closes(&closes), params);
        let signals: Vec<Cross> = snapshots
            .iter()
            .map(|s| s.crossover)
            .filter(|c| *c != Cross::None)
            .collect();
        for pair in signals.windows(2) {
            prop_assert_ne!(pair[0], pair[1]);
        }
    }

    #[test]
    fn incremental_sma_matches_batch(closes in closes_strategy(1..100), period in 1usize..20) {
        let bars = bars_from_closes(&closes);
        let params = IndicatorParams { pfast: period, pslow: period + 1, slope_period: 1, lookback_period: 5 };
        let snapshots = compute_snapshots(&bars, params);
        let batch = calculate_sma(&bars, period);

        prop_assert_eq!(batch.values.len(), snapshots.len());
        for (point, snap) in batch.values.iter().zip(&snapshots) {
            match (point.value.simple().filter(|_| point.valid), snap.fast_ma) {
                (Some(a), Some(b)) => prop_assert!((a - b).abs() < 1e-6 * a.abs().max(1.0)),
                (None, None) => {}
                (a, b) => prop_assert!(false, "mismatch {:?} vs {:?}", a, b),
            }
        }
    }

    #[test]
    fn broker_never_goes_negative(
        ops in prop::collection::vec((any::<bool>(), 0i64..200, 1.0f64..200.0), 1..60),
        commission in 0.0f64..0.01,
    ) {
        let day = date(2024, 1, 1);
        let mut broker = Broker::new(10_000.0, commission);
        for (is_buy, size, price) in ops {
            let order = if is_buy { Order::buy(size, day) } else { Order::sell(size, day) };
            let _ = broker.execute(&order, price);
            prop_assert!(broker.cash() >= 0.0);
            prop_assert!(broker.position().size >= 0);
        }
    }

    #[test]
    fn round_trip_at_same_price_costs_two_commissions(
        size in 1i64..100,
        price in 1.0f64..100.0,
        rate in 0.0f64..0.01,
    ) {
        let day = date(2024, 1, 1);
        let mut broker = Broker::new(100_000.0, rate);
        broker.execute(&Order::buy(size, day), price).unwrap();
        broker.execute(&Order::sell(size, day), price).unwrap();

        let expected = 100_000.0 - 2.0 * size as f64 * price * rate;
        prop_assert!((broker.cash() - expected).abs() < 1e-6);
    }

    #[test]
    fn drawdown_episodes_are_bounded_and_ordered(equity in prop::collection::vec(1.0f64..1000.0, 1..120)) {
        let mut tracker = DrawdownTracker::new();
        for (i, v) in equity.iter().enumerate() {
            tracker.update(date(2024, 1, 1) + chrono::Duration::days(i as i64), *v);
        }

        let episodes = tracker.episodes();
        let mut total_days = 0;
        for ep in episodes {
            prop_assert!(ep.magnitude_pct <= tracker.max_drawdown_pct() + 1e-12);
            prop_assert!(ep.start_date < ep.end_date);
            total_days += ep.duration_days;
        }
        for pair in episodes.windows(2) {
            prop_assert!(pair[0].end_date <= pair[1].start_date);
        }
        prop_assert!(total_days <= equity.len() as i64);
    }

    #[test]
    fn backtests_are_deterministic(closes in closes_strategy(20..120)) {
        let series = series_from_closes("PROP", &closes);
        let config = BacktestConfig::default();
        let a = run_backtest(&series, &config).unwrap();
        let b = run_backtest(&series, &config).unwrap();
        prop_assert_eq!(&a, &b);
        prop_assert!(a.final_cash >= 0.0);
    }
}
