use crate::config::HealthCheckSettings;
use crate::models::{MarketSnapshot, OrderRequest, OrderSide};
use crate::strategy::{OrderAction, PlannedAction};

/// Liveness probe that toggles a far-below-market bid every tick
///
/// Cancelling and re-placing a bid that can never fill proves both order
/// paths and the API keys are still working.
#[derive(Debug, Clone)]
pub struct HealthProbe {
    market: String,
    price: f64,
    volume: f64,
}

impl HealthProbe {
    pub fn new(settings: &HealthCheckSettings) -> Self {
        Self {
            market: settings.market.clone(),
            price: settings.price,
            volume: settings.volume,
        }
    }

    pub fn market(&self) -> &str {
        &self.market
    }

    pub fn plan(&self, snapshot: &MarketSnapshot) -> PlannedAction {
        match snapshot.orders.find(&self.market, OrderSide::Bid) {
            Some(bid) => PlannedAction {
                action: OrderAction::Cancel(bid.clone()),
                reason: "health check: cancel probe bid".to_string(),
            },
            None => PlannedAction {
                action: OrderAction::Place(OrderRequest::limit(
                    &self.market,
                    OrderSide::Bid,
                    self.price,
                    self.volume,
                )),
                reason: "health check: place probe bid".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OpenOrder, OpenOrders, OrderType};
    use chrono::Utc;

    fn probe() -> HealthProbe {
        HealthProbe::new(&HealthCheckSettings {
            market: "KRW-ETC".to_string(),
            price: 100.0,
            volume: 100.0,
        })
    }

    #[test]
    fn test_places_when_no_probe_bid() {
        let planned = probe().plan(&MarketSnapshot::default());
        match planned.action {
            OrderAction::Place(request) => {
                assert_eq!(request.market, "KRW-ETC");
                assert_eq!(request.side, OrderSide::Bid);
                assert_eq!(request.price, 100.0);
                assert_eq!(request.volume, 100.0);
            }
            other => panic!("unexpected action {:?}", other),
        }
    }

    #[test]
    fn test_cancels_existing_probe_bid() {
        let snapshot = MarketSnapshot {
            orders: OpenOrders::from_orders(vec![OpenOrder {
                id: "probe-1".to_string(),
                market: "KRW-ETC".to_string(),
                side: OrderSide::Bid,
                order_type: OrderType::Limit,
                price: Some(100.0),
                volume: 100.0,
                remaining_volume: 100.0,
                created_at: Utc::now(),
            }]),
            ..Default::default()
        };

        let planned = probe().plan(&snapshot);
        assert!(matches!(planned.action, OrderAction::Cancel(ref o) if o.id == "probe-1"));
    }
}
