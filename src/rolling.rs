use crate::error::{DashboardError, Result};

pub const DEFAULT_WINDOW: usize = 3;

/// Trailing moving average; the window shrinks near the start of the series.
pub fn rolling_average(series: &[f64], window: usize) -> Result<Vec<f64>> {
    if window == 0 {
        return Err(DashboardError::InvalidArgument(
            "rolling average window must be positive".to_string(),
        ));
    }
    Ok((0..series.len())
        .map(|i| {
            let slice = &series[(i + 1).saturating_sub(window)..=i];
            slice.iter().sum::<f64>() / slice.len() as f64
        })
        .collect())
}
