/// Converts a momentum score into the fiat amount committed to a buy
#[derive(Debug, Clone, Copy)]
pub struct PositionSizer {
    nominal_amount: f64,
}

impl PositionSizer {
    pub fn new(nominal_amount: f64) -> Self {
        Self { nominal_amount }
    }

    /// `nominal * score`, score clamped to [0, 1]. A missing score sizes to 0.
    pub fn order_amount(&self, momentum_score: Option<f64>) -> f64 {
        match momentum_score {
            Some(score) if score.is_finite() => self.nominal_amount * score.clamp(0.0, 1.0),
            _ => 0.0,
        }
    }
}
