mod common;

use common::*;
use volbreak::execution::OutcomeStatus;
use volbreak::strategy::TradingMode;
use volbreak::*;

fn liquidation_leftover() -> MemoryExchange {
    // Fiat below the nominal amount keeps buying out of these scenarios
    MemoryExchange::new()
        .with_fiat(5_000.0)
        .with_balance("BTC", 0.0, 1.0, 120.0)
        .with_bars("KRW-BTC", breakout_bars(108.0))
        .with_order(order("a1", "KRW-BTC", OrderSide::Ask, at(0, 1)))
}

#[tokio::test]
async fn test_exit_edge_force_liquidates_once() {
    let reporter = MemoryReporter::new();
    let mut engine = Engine::new(liquidation_leftover(), &reporter, fixed_k_config(&["KRW-BTC"]));

    // Inside the window: ask is young, nothing to do
    let report = engine.run_tick(at(0, 2)).await.unwrap();
    assert_eq!(report.mode.mode, TradingMode::Liquidation);
    assert!(engine.exchange().log().is_empty());

    // First trading tick: cancel then sell at market
    let report = engine.run_tick(at(0, 6)).await.unwrap();
    assert!(report.mode.just_exited_liquidation);
    assert_eq!(
        engine.exchange().log(),
        vec!["cancel a1", "place KRW-BTC ask Market"]
    );
    assert!(matches!(report.outcomes[0].status, OutcomeStatus::Replaced { .. }));
    engine.exchange().clear_log();

    // A later ask must survive the following trading ticks
    engine
        .exchange()
        .orders
        .borrow_mut()
        .push(order("a2", "KRW-BTC", OrderSide::Ask, at(0, 6)));

    for minute in 7..10 {
        let report = engine.run_tick(at(0, minute)).await.unwrap();
        assert!(!report.mode.just_exited_liquidation);
    }
    assert!(engine.exchange().log().is_empty());
    assert_eq!(engine.exchange().open_orders().len(), 1);
}

#[tokio::test]
async fn test_failed_fetch_keeps_exit_edge() {
    let mut engine = Engine::new(
        liquidation_leftover(),
        TracingReporter,
        fixed_k_config(&["KRW-BTC"]),
    );

    engine.run_tick(at(0, 3)).await.unwrap();

    *engine.exchange().fail_orders.borrow_mut() = true;
    let err = engine.run_tick(at(0, 6)).await.unwrap_err();
    assert!(matches!(err, EngineError::DataFetch { .. }));
    assert!(engine.exchange().log().is_empty());
    assert_eq!(engine.mode().current(), TradingMode::Liquidation);

    *engine.exchange().fail_orders.borrow_mut() = false;
    let report = engine.run_tick(at(0, 7)).await.unwrap();
    assert!(report.mode.just_exited_liquidation);
    assert_eq!(engine.exchange().log()[0], "cancel a1");
}

#[tokio::test]
async fn test_failed_cancel_is_never_reissued() {
    let exchange = liquidation_leftover();
    exchange.fail_cancel.borrow_mut().insert("a1".to_string());
    let reporter = MemoryReporter::new();
    let mut engine = Engine::new(exchange, &reporter, fixed_k_config(&["KRW-BTC"]));

    engine.run_tick(at(0, 4)).await.unwrap();
    let report = engine.run_tick(at(0, 6)).await.unwrap();

    assert_eq!(engine.exchange().log(), vec!["cancel a1"]);
    assert_eq!(report.failures(), 1);
    assert_eq!(engine.exchange().open_orders()[0].id, "a1");
    assert!(reporter.events().iter().any(|e| matches!(
        e,
        ReportEvent::Order { success: false, market, .. } if market == "KRW-BTC"
    )));
}

#[tokio::test]
async fn test_stale_ask_ratchet() {
    let now = at(0, 4);
    let exchange = MemoryExchange::new()
        .with_fiat(5_000.0)
        .with_balance("BTC", 0.0, 1.0, 120.0)
        .with_balance("ETH", 0.0, 1.0, 120.0)
        .with_bars("KRW-BTC", breakout_bars(108.0))
        .with_bars("KRW-ETH", breakout_bars(108.0))
        .with_order(order("stale", "KRW-BTC", OrderSide::Ask, secs_before(now, 700)))
        .with_order(order("young", "KRW-ETH", OrderSide::Ask, secs_before(now, 500)));
    *exchange.clock.borrow_mut() = Some(now);

    let mut engine = Engine::new(
        exchange,
        TracingReporter,
        fixed_k_config(&["KRW-BTC", "KRW-ETH"]),
    );
    engine.run_tick(now).await.unwrap();

    assert_eq!(
        engine.exchange().log(),
        vec!["cancel stale", "place KRW-BTC ask Limit"]
    );

    let book = engine.exchange().open_orders();
    assert!(book.iter().any(|o| o.id == "young"));
    let reask = book.iter().find(|o| o.market == "KRW-BTC").unwrap();
    assert_eq!(reask.price, Some(108.0));
    assert_eq!(reask.remaining_volume, 1.0);
}

#[tokio::test]
async fn test_liquidation_window_cancels_bids_and_sells() {
    let exchange = MemoryExchange::new()
        .with_fiat(1_000_000.0)
        .with_balance("BTC", 0.4, 0.0, 100.0)
        .with_bars("KRW-BTC", breakout_bars(112.0))
        .with_bars("KRW-ETH", breakout_bars(112.0))
        .with_order(order("old-bid", "KRW-ETH", OrderSide::Bid, at(0, 0)));

    let mut engine = Engine::new(
        exchange,
        TracingReporter,
        fixed_k_config(&["KRW-BTC", "KRW-ETH"]),
    );
    let report = engine.run_tick(at(0, 1)).await.unwrap();

    // Breakout is ignored in the window
    assert_eq!(report.plan.buy_count(), 0);
    assert_eq!(
        engine.exchange().log(),
        vec!["cancel old-bid", "place KRW-BTC ask Limit"]
    );
}

#[tokio::test]
async fn test_breakout_buy_is_not_repeated() {
    let exchange = MemoryExchange::new()
        .with_fiat(100_000.0)
        .with_bars("KRW-BTC", breakout_bars(112.0));
    *exchange.clock.borrow_mut() = Some(at(12, 0));

    let mut engine = Engine::new(exchange, TracingReporter, fixed_k_config(&["KRW-BTC"]));

    let report = engine.run_tick(at(12, 0)).await.unwrap();
    assert_eq!(report.plan.buy_count(), 1);

    let bid = &engine.exchange().open_orders()[0];
    assert_eq!(bid.side, OrderSide::Bid);
    assert_eq!(bid.price, Some(110.0));
    assert!((bid.volume - 10_000.0 / 110.0).abs() < 1e-9);

    // Open bid excludes the asset from the next evaluation
    let report = engine.run_tick(at(12, 1)).await.unwrap();
    assert_eq!(report.plan.buy_count(), 0);
    assert_eq!(engine.exchange().log().len(), 1);
}

#[tokio::test]
async fn test_below_threshold_no_buy() {
    let exchange = MemoryExchange::new()
        .with_fiat(100_000.0)
        .with_bars("KRW-BTC", breakout_bars(108.0));

    let mut engine = Engine::new(exchange, TracingReporter, fixed_k_config(&["KRW-BTC"]));
    let report = engine.run_tick(at(12, 0)).await.unwrap();

    assert!(report.plan.is_empty());
    assert!(engine.exchange().log().is_empty());
}

#[tokio::test]
async fn test_max_coin_halts_buying() {
    let exchange = MemoryExchange::new()
        .with_fiat(100_000.0)
        .with_balance("XRP", 10.0, 0.0, 500.0)
        .with_balance("ADA", 10.0, 0.0, 500.0)
        .with_balance("SOL", 1.0, 0.0, 500.0)
        .with_bars("KRW-BTC", breakout_bars(112.0));

    let reporter = MemoryReporter::new();
    let mut engine = Engine::new(exchange, &reporter, fixed_k_config(&["KRW-BTC"]));
    let report = engine.run_tick(at(12, 0)).await.unwrap();

    assert!(report.plan.is_empty());
    assert!(report.plan.halted.is_some());
    assert!(reporter
        .events()
        .iter()
        .any(|e| matches!(e, ReportEvent::BuyingHalted { .. })));
}

#[tokio::test]
async fn test_placement_failure_does_not_stop_pass() {
    let exchange = MemoryExchange::new()
        .with_fiat(100_000.0)
        .with_bars("KRW-BTC", breakout_bars(112.0))
        .with_bars("KRW-ETH", breakout_bars(112.0));
    exchange.fail_place.borrow_mut().insert("KRW-BTC".to_string());

    let mut engine = Engine::new(
        exchange,
        TracingReporter,
        fixed_k_config(&["KRW-BTC", "KRW-ETH"]),
    );
    let report = engine.run_tick(at(12, 0)).await.unwrap();

    assert_eq!(report.outcomes.len(), 2);
    assert_eq!(report.failures(), 1);
    assert_eq!(engine.exchange().open_orders()[0].market, "KRW-ETH");
}
