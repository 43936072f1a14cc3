use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use super::mode::{ModeDecision, TradingMode};
use super::sizing::PositionSizer;
use super::AssetSignal;
use crate::config::StrategyConfig;
use crate::execution::quantize::quantize_price;
use crate::models::{MarketSnapshot, OpenOrder, OrderRequest, OrderSide};

/// Inputs for planning one tick
pub struct TickContext<'a> {
    pub now: DateTime<Utc>,
    pub mode: ModeDecision,
    pub snapshot: &'a MarketSnapshot,
    pub signals: &'a HashMap<String, AssetSignal>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OrderAction {
    Cancel(OpenOrder),
    Place(OrderRequest),
    /// Cancel `order`, then submit `replacement` only if the cancel succeeded
    CancelAndReplace {
        order: OpenOrder,
        replacement: OrderRequest,
    },
}

impl OrderAction {
    pub fn market(&self) -> &str {
        match self {
            OrderAction::Cancel(order) => &order.market,
            OrderAction::Place(request) => &request.market,
            OrderAction::CancelAndReplace { order, .. } => &order.market,
        }
    }

    /// True for any action that submits a new bid
    pub fn is_buy(&self) -> bool {
        match self {
            OrderAction::Place(request) => request.side == OrderSide::Bid,
            OrderAction::CancelAndReplace { replacement, .. } => {
                replacement.side == OrderSide::Bid
            }
            OrderAction::Cancel(_) => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedAction {
    pub action: OrderAction,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedAsset {
    pub market: String,
    pub reason: String,
}

/// Actions for one tick, in execution order
#[derive(Debug, Clone)]
pub struct Plan {
    pub mode: TradingMode,
    pub actions: Vec<PlannedAction>,
    pub skipped: Vec<SkippedAsset>,
    /// Set when the buy gate stopped planning for this tick
    pub halted: Option<String>,
}

impl Plan {
    fn new(mode: TradingMode) -> Self {
        Self {
            mode,
            actions: Vec::new(),
            skipped: Vec::new(),
            halted: None,
        }
    }

    fn push(&mut self, action: OrderAction, reason: impl Into<String>) {
        self.actions.push(PlannedAction {
            action,
            reason: reason.into(),
        });
    }

    fn skip(&mut self, market: &str, reason: impl Into<String>) {
        self.skipped.push(SkippedAsset {
            market: market.to_string(),
            reason: reason.into(),
        });
    }

    pub fn buy_count(&self) -> usize {
        self.actions.iter().filter(|a| a.action.is_buy()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

/// Turns a tick's mode, signals and account state into order actions
pub struct OrderPlanner {
    config: StrategyConfig,
    sizer: PositionSizer,
    /// Markets owned by something other than the strategy (health probe)
    reserved_markets: Vec<String>,
}

impl OrderPlanner {
    pub fn new(config: StrategyConfig) -> Self {
        let sizer = PositionSizer::new(config.order_amount);
        Self {
            config,
            sizer,
            reserved_markets: Vec::new(),
        }
    }

    pub fn with_reserved_market(mut self, market: impl Into<String>) -> Self {
        self.reserved_markets.push(market.into());
        self
    }

    fn is_reserved(&self, market: &str) -> bool {
        self.reserved_markets
            .iter()
            .any(|m| m.eq_ignore_ascii_case(market))
    }

    pub fn plan(&self, ctx: &TickContext<'_>) -> Plan {
        let mut plan = Plan::new(ctx.mode.mode);

        match ctx.mode.mode {
            TradingMode::Liquidation => self.plan_liquidation(ctx, &mut plan),
            TradingMode::Trading => self.plan_trading(ctx, &mut plan),
        }

        plan
    }

    fn plan_liquidation(&self, ctx: &TickContext<'_>, plan: &mut Plan) {
        let snapshot = ctx.snapshot;
        let fiat = self.config.fiat_currency.as_str();

        // Bids still open at the window are left over from the previous day
        for bid in &snapshot.orders.bids {
            if self.is_reserved(&bid.market) {
                continue;
            }
            plan.push(
                OrderAction::Cancel(bid.clone()),
                "previous-day bid cancelled in liquidation window",
            );
        }

        let direct_sell: Vec<_> = snapshot
            .balances
            .iter()
            .filter(|b| !b.is_fiat(fiat) && b.balance > 0.0)
            .filter(|b| self.config.is_target(&b.market()))
            .collect();

        if !direct_sell.is_empty() {
            for balance in direct_sell {
                let market = balance.market();
                let Some(current) = snapshot.current_price(&market) else {
                    plan.skip(&market, "no price data for liquidation ask");
                    continue;
                };
                let Some(price) = quantize_price(current + self.config.ask_markup) else {
                    plan.skip(&market, format!("unusable ask price {}", current));
                    continue;
                };

                plan.push(
                    OrderAction::Place(OrderRequest::limit(
                        &market,
                        OrderSide::Ask,
                        price,
                        balance.balance,
                    )),
                    format!("liquidate free balance at {}", price),
                );
            }
            return;
        }

        // Nothing left to list: re-price asks that have sat too long
        for ask in &snapshot.orders.asks {
            if !self.config.is_target(&ask.market) {
                continue;
            }

            let age = ask.age_secs(ctx.now);
            if age <= self.config.ask_order_gap_secs {
                plan.skip(
                    &ask.market,
                    format!(
                        "ask {} is {}s old (re-price after {}s)",
                        ask.id, age, self.config.ask_order_gap_secs
                    ),
                );
                continue;
            }

            let Some(price) = snapshot.current_price(&ask.market).and_then(quantize_price) else {
                plan.skip(&ask.market, "no price data to re-price stale ask");
                continue;
            };

            plan.push(
                OrderAction::CancelAndReplace {
                    order: ask.clone(),
                    replacement: OrderRequest::limit(
                        &ask.market,
                        OrderSide::Ask,
                        price,
                        ask.remaining_volume,
                    ),
                },
                format!("stale ask ({}s) re-priced to {}", age, price),
            );
        }
    }

    fn plan_trading(&self, ctx: &TickContext<'_>, plan: &mut Plan) {
        let snapshot = ctx.snapshot;
        let fiat = self.config.fiat_currency.as_str();
        let mut liquidated = HashSet::new();

        if ctx.mode.just_exited_liquidation {
            for ask in &snapshot.orders.asks {
                plan.push(
                    OrderAction::CancelAndReplace {
                        order: ask.clone(),
                        replacement: OrderRequest::market_ask(&ask.market, ask.remaining_volume),
                    },
                    "unfilled liquidation ask sold at market",
                );
                liquidated.insert(ask.market.to_ascii_uppercase());
            }
        }

        if self.config.stop_loss_enabled {
            self.plan_stop_losses(ctx, &liquidated, plan);
        }

        let free_fiat = snapshot.free_fiat(fiat);
        if free_fiat < self.config.order_amount {
            plan.halted = Some(format!(
                "free {} balance {:.0} below order amount {:.0}",
                fiat, free_fiat, self.config.order_amount
            ));
            return;
        }

        let held = snapshot.holdings(fiat).count();
        if held >= self.config.max_coin {
            plan.halted = Some(format!(
                "holding {} assets, max_coin is {}",
                held, self.config.max_coin
            ));
            return;
        }

        let mut remaining_fiat = free_fiat;
        let mut open_slots = self.config.max_coin - held;

        for market in &self.config.targets {
            if snapshot.is_held(market, fiat) {
                plan.skip(market, "already held");
                continue;
            }
            if snapshot.orders.has_order(market, OrderSide::Bid) {
                plan.skip(market, "bid already open");
                continue;
            }

            let Some(signal) = ctx.signals.get(market) else {
                plan.skip(market, "insufficient bar history");
                continue;
            };

            if !signal.is_breakout() {
                plan.skip(
                    market,
                    format!(
                        "price {} below breakout threshold {:.4}",
                        signal.current_price, signal.threshold
                    ),
                );
                continue;
            }

            if open_slots == 0 {
                plan.skip(market, "breakout ignored, max_coin slots used this tick");
                continue;
            }

            let amount = self.sizer.order_amount(signal.momentum_score);
            if amount <= 0.0 {
                plan.skip(
                    market,
                    format!(
                        "breakout at {} but momentum score {:?} sizes to zero",
                        signal.current_price, signal.momentum_score
                    ),
                );
                continue;
            }

            if amount > remaining_fiat {
                plan.skip(
                    market,
                    format!(
                        "order amount {:.0} exceeds remaining {} {:.0}",
                        amount, fiat, remaining_fiat
                    ),
                );
                continue;
            }

            let Some(price) = quantize_price(signal.threshold) else {
                plan.skip(market, format!("unusable bid price {}", signal.threshold));
                continue;
            };
            let volume = amount / signal.threshold;

            plan.push(
                OrderAction::Place(OrderRequest::limit(market, OrderSide::Bid, price, volume)),
                format!(
                    "breakout {} >= {:.4} (k {:.3}, score {:?})",
                    signal.current_price, signal.threshold, signal.k, signal.momentum_score
                ),
            );

            remaining_fiat -= amount;
            open_slots -= 1;
        }
    }

    fn plan_stop_losses(
        &self,
        ctx: &TickContext<'_>,
        liquidated: &HashSet<String>,
        plan: &mut Plan,
    ) {
        let snapshot = ctx.snapshot;

        for balance in snapshot.holdings(&self.config.fiat_currency) {
            let market = balance.market();
            if !self.config.is_target(&market)
                || liquidated.contains(&market.to_ascii_uppercase())
                || balance.avg_buy_price <= 0.0
            {
                continue;
            }

            let Some(current) = snapshot.current_price(&market) else {
                continue;
            };
            let profit_pct = (current - balance.avg_buy_price) / balance.avg_buy_price * 100.0;
            if profit_pct >= self.config.stop_loss {
                continue;
            }

            let reason = format!(
                "stop-loss: {:.2}% below {:.2}% threshold",
                profit_pct, self.config.stop_loss
            );

            match snapshot.orders.find(&market, OrderSide::Ask) {
                Some(ask) => plan.push(
                    OrderAction::CancelAndReplace {
                        order: ask.clone(),
                        replacement: OrderRequest::market_ask(&market, balance.total()),
                    },
                    reason,
                ),
                None if balance.balance > 0.0 => plan.push(
                    OrderAction::Place(OrderRequest::market_ask(&market, balance.balance)),
                    reason,
                ),
                None => {}
            }
        }
    }
}
