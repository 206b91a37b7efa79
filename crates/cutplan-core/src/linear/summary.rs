use crate::types::{BarSummary, ProfilePlan, StockCount};

/// Aggregates how many bars of each profile were consumed.
pub(super) fn count_bars(profiles: &[ProfilePlan]) -> Vec<StockCount> {
    profiles
        .iter()
        .map(|p| StockCount {
            key: p.profile_code.clone(),
            count: p.bars.len() as u32,
        })
        .collect()
}

/// Computes stock usage and waste over every bar of the plan.
pub(super) fn calculate_summary(profiles: &[ProfilePlan]) -> BarSummary {
    let bars = profiles.iter().flat_map(|p| &p.bars);

    let total_bars = bars.clone().count() as u32;
    let total_stock_length: f64 = bars.clone().map(|b| b.stock_length).sum();
    let used_length: f64 = bars.map(|b| b.used_length).sum();
    let waste_length = total_stock_length - used_length;
    let waste_percentage = if total_stock_length > 0.0 {
        (waste_length / total_stock_length) * 100.0
    } else {
        0.0
    };

    BarSummary {
        total_bars,
        total_stock_length,
        used_length,
        waste_length,
        waste_percentage,
    }
}
