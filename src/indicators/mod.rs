// Technical indicators module
// Moving averages and the daily noise ratio used by the breakout signal

pub mod moving_average;
pub mod noise;

pub use moving_average::{calculate_sma, sma_ladder};
pub use noise::{average_noise, noise_ratio};
