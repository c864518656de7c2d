//! Property-based tests for analyzer invariants using proptest
//!
//! These tests verify that certain properties hold true for all inputs:
//! - No conditions are triggered while readings sit under their limits
//! - Thermal alerts always carry both the observed and the limit values
//! - An unknown bitcoin price can never trigger the market rule
//! - The deduplicator only ever dispatches a changed body

use cryptostation::analyzer::{AlertDeduplicator, evaluate};
use cryptostation::config::Thresholds;
use cryptostation::{HostMetrics, PriceSnapshot};
use proptest::prelude::*;

fn gpu_metrics(gpu_temp: i32) -> HostMetrics {
    HostMetrics {
        cpu_usage: 10.0,
        ram_usage: 30.0,
        gpu_name: Some("GeForce RTX 3080".to_string()),
        gpu_temp,
        gpu_load: 50.0,
    }
}

// Property: readings under both limits never produce conditions
proptest! {
    #[test]
    fn prop_under_limits_is_quiet(
        limit in 0i32..120i32,
        below in 1i32..200i32,
        price in 1.0f64..100_000.0f64,
        margin in 0.0f64..10_000.0f64,
    ) {
        let metrics = gpu_metrics(limit - below);
        let prices = PriceSnapshot::from([("bitcoin".to_string(), price + margin)]);
        let thresholds = Thresholds { gpu_max_temp: limit, btc_min_price: price };

        let alerts = evaluate(&metrics, &prices, &thresholds);

        prop_assert!(alerts.is_empty());
    }
}

// Property: a zero market threshold disables the rule for any price
proptest! {
    #[test]
    fn prop_zero_threshold_never_triggers_market_rule(
        price in 0.0f64..1_000_000.0f64,
    ) {
        let metrics = gpu_metrics(40);
        let prices = PriceSnapshot::from([("bitcoin".to_string(), price)]);
        let thresholds = Thresholds { gpu_max_temp: 80, btc_min_price: 0.0 };

        let alerts = evaluate(&metrics, &prices, &thresholds);

        prop_assert!(alerts.is_empty());
    }
}

// Property: an exceeded thermal limit always reports observed and limit
proptest! {
    #[test]
    fn prop_thermal_alert_contains_observed_and_limit(
        limit in 0i32..120i32,
        above in 1i32..100i32,
    ) {
        let observed = limit + above;
        let metrics = gpu_metrics(observed);
        let thresholds = Thresholds { gpu_max_temp: limit, btc_min_price: 0.0 };

        let alerts = evaluate(&metrics, &PriceSnapshot::new(), &thresholds);

        prop_assert_eq!(alerts.len(), 1);
        let observed_label = format!("{observed}°C");
        let limit_label = format!("{limit}°C");
        prop_assert!(alerts[0].contains(&observed_label));
        prop_assert!(alerts[0].contains(&limit_label));
    }
}

// Property: a missing bitcoin price never triggers the market rule,
// regardless of how aggressive the threshold is
proptest! {
    #[test]
    fn prop_missing_price_never_triggers_market_rule(
        btc_min_price in 0.0f64..10_000_000.0f64,
        eth_price in 1.0f64..10_000.0f64,
    ) {
        let metrics = gpu_metrics(40);
        // Ethereum alone; bitcoin is unknown this cycle.
        let prices = PriceSnapshot::from([("ethereum".to_string(), eth_price)]);
        let thresholds = Thresholds { gpu_max_temp: 80, btc_min_price };

        let alerts = evaluate(&metrics, &prices, &thresholds);

        prop_assert!(alerts.is_empty());
    }
}

// Property: identical bodies are dispatched exactly once until a reset
proptest! {
    #[test]
    fn prop_dedup_suppresses_identical_bodies(
        body in "[a-zA-Z0-9 ]{1,64}",
        repeats in 1usize..10usize,
    ) {
        let mut dedup = AlertDeduplicator::default();

        prop_assert!(dedup.should_dispatch(&body));
        dedup.record_dispatch(&body);

        for _ in 0..repeats {
            prop_assert!(!dedup.should_dispatch(&body));
        }

        dedup.reset();
        prop_assert!(dedup.should_dispatch(&body));
    }
}
