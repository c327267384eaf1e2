use std::sync::Arc;

use crate::data::aggregate::SupportSummary;
use crate::data::model::SurveyDataset;

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// State shared by every request handler. Cloning is cheap; the dataset is
/// behind an `Arc` and never mutated.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Respondents loaded at startup.
    pub dataset: Arc<SurveyDataset>,

    /// Decimal places support rates are rounded to in responses.
    pub rate_decimals: u32,
}

impl AppState {
    pub fn new(dataset: SurveyDataset, rate_decimals: u32) -> Self {
        Self {
            dataset: Arc::new(dataset),
            rate_decimals,
        }
    }

    /// Round a full-precision rate for presentation.
    pub fn present_rate(&self, rate: Option<f64>) -> Option<f64> {
        let scale = 10f64.powi(self.rate_decimals as i32);
        rate.map(|r| (r * scale).round() / scale)
    }

    pub fn present(&self, summary: SupportSummary) -> SupportSummary {
        SupportSummary {
            count: summary.count,
            support_rate: self.present_rate(summary.support_rate),
        }
    }
}
