use crate::api::Exchange;
use crate::error::EngineError;
use crate::models::{OrderReceipt, OrderRequest};
use crate::strategy::{OrderAction, PlannedAction};

#[derive(Debug)]
pub enum OutcomeStatus {
    Placed { order_id: String },
    Cancelled { order_id: String },
    Replaced { cancelled_id: String, order_id: String },
    /// Cancel went through, the reissue did not
    ReplacementFailed { cancelled_id: String, error: EngineError },
    /// Planned only, nothing sent
    DryRun,
    Failed(EngineError),
}

impl std::fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutcomeStatus::Placed { order_id } => write!(f, "placed {}", order_id),
            OutcomeStatus::Cancelled { order_id } => write!(f, "cancelled {}", order_id),
            OutcomeStatus::Replaced {
                cancelled_id,
                order_id,
            } => write!(f, "replaced {} with {}", cancelled_id, order_id),
            OutcomeStatus::ReplacementFailed {
                cancelled_id,
                error,
            } => write!(f, "cancelled {}, reissue failed: {}", cancelled_id, error),
            OutcomeStatus::DryRun => f.write_str("dry run"),
            OutcomeStatus::Failed(error) => write!(f, "failed: {}", error),
        }
    }
}

/// Result of applying one planned action
#[derive(Debug)]
pub struct ActionOutcome {
    pub market: String,
    pub reason: String,
    pub status: OutcomeStatus,
}

impl ActionOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(
            self.status,
            OutcomeStatus::Failed(_) | OutcomeStatus::ReplacementFailed { .. }
        )
    }
}

/// Applies planned actions to an exchange, one call at a time
///
/// A failed action is reported and the rest of the plan still runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct Executor {
    dry_run: bool,
}

impl Executor {
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }

    pub async fn execute<E: Exchange>(
        &self,
        exchange: &E,
        actions: &[PlannedAction],
    ) -> Vec<ActionOutcome> {
        let mut outcomes = Vec::with_capacity(actions.len());

        for planned in actions {
            let status = if self.dry_run {
                OutcomeStatus::DryRun
            } else {
                self.apply(exchange, &planned.action).await
            };

            outcomes.push(ActionOutcome {
                market: planned.action.market().to_string(),
                reason: planned.reason.clone(),
                status,
            });
        }

        outcomes
    }

    async fn apply<E: Exchange>(&self, exchange: &E, action: &OrderAction) -> OutcomeStatus {
        match action {
            OrderAction::Cancel(order) => match cancel(exchange, &order.id).await {
                Ok(receipt) => OutcomeStatus::Cancelled {
                    order_id: receipt.id,
                },
                Err(err) => OutcomeStatus::Failed(err),
            },

            OrderAction::Place(request) => match place(exchange, request).await {
                Ok(receipt) => OutcomeStatus::Placed {
                    order_id: receipt.id,
                },
                Err(err) => OutcomeStatus::Failed(err),
            },

            OrderAction::CancelAndReplace { order, replacement } => {
                // A failed cancel leaves the order open and must not be reissued
                let cancelled = match cancel(exchange, &order.id).await {
                    Ok(receipt) => receipt,
                    Err(err) => return OutcomeStatus::Failed(err),
                };

                match place(exchange, replacement).await {
                    Ok(receipt) => OutcomeStatus::Replaced {
                        cancelled_id: cancelled.id,
                        order_id: receipt.id,
                    },
                    Err(error) => OutcomeStatus::ReplacementFailed {
                        cancelled_id: cancelled.id,
                        error,
                    },
                }
            }
        }
    }
}

async fn cancel<E: Exchange>(exchange: &E, order_id: &str) -> Result<OrderReceipt, EngineError> {
    exchange
        .cancel_order(order_id)
        .await
        .map_err(|source| EngineError::OrderCancellation {
            order_id: order_id.to_string(),
            source,
        })
}

async fn place<E: Exchange>(
    exchange: &E,
    request: &OrderRequest,
) -> Result<OrderReceipt, EngineError> {
    exchange
        .place_order(request)
        .await
        .map_err(|source| EngineError::OrderPlacement {
            market: request.market.clone(),
            source,
        })
}
