use crate::types::{MaterialPlan, SheetSummary, StockCount};

/// Aggregates how many sheets of each material key were consumed.
pub(super) fn count_sheets(materials: &[MaterialPlan]) -> Vec<StockCount> {
    materials
        .iter()
        .map(|m| StockCount {
            key: m.key.clone(),
            count: m.sheets.len() as u32,
        })
        .collect()
}

/// Computes utilization and waste over every sheet of the plan.
pub(super) fn calculate_summary(materials: &[MaterialPlan]) -> SheetSummary {
    let sheets = materials.iter().flat_map(|m| &m.sheets);

    let total_sheets = sheets.clone().count() as u32;
    let total_area: f64 = sheets.clone().map(|s| s.width * s.height).sum();
    let used_area: f64 = sheets.map(|s| s.used_area).sum();
    let waste_area = total_area - used_area;
    let waste_percentage = if total_area > 0.0 {
        (waste_area / total_area) * 100.0
    } else {
        0.0
    };

    SheetSummary {
        total_sheets,
        total_area,
        used_area,
        waste_area,
        waste_percentage,
    }
}
