use crate::types::*;
use std::cmp::Ordering;
use tracing::{debug, info, warn};

mod summary;

/// A single panel after expanding a request by its quantity.
///
/// `id` is the panel's position in the expanded list of its material group
/// and only serves bookkeeping within one run.
#[derive(Debug, Clone, Copy)]
struct PanelPiece {
    id: usize,
    request_index: usize,
    width: f64,
    height: f64,
    can_rotate: bool,
}

impl PanelPiece {
    fn long_side(&self) -> f64 {
        self.width.max(self.height)
    }

    /// Placed size (width, height, rotated) inside a `max_width` x `max_height`
    /// box, preferring the requested orientation.
    fn orient_within(&self, max_width: f64, max_height: f64) -> Option<(f64, f64, bool)> {
        if self.width <= max_width + EPSILON && self.height <= max_height + EPSILON {
            Some((self.width, self.height, false))
        } else if self.can_rotate
            && self.height <= max_width + EPSILON
            && self.width <= max_height + EPSILON
        {
            Some((self.height, self.width, true))
        } else {
            None
        }
    }
}

/// Outcome of checking a single request.
type Admission = std::result::Result<(), (RejectionKind, String)>;

/// Panels sharing one material and thickness.
struct MaterialGroup {
    key: String,
    material: String,
    thickness: String,
    pieces: Vec<PanelPiece>,
}

/// Nests rectangular panels on stock sheets in left-to-right columns.
pub struct PanelOptimizer {
    request: PanelOptimizationRequest,
}

impl PanelOptimizer {
    /// Validates the sheet settings and builds a new optimizer instance.
    pub fn new(request: PanelOptimizationRequest) -> Result<Self> {
        if request.panels.is_empty() {
            return Err(OptimizerError::InvalidInput(
                "At least one panel must be provided".to_string(),
            ));
        }

        for (name, value) in [
            ("width", request.sheet_width),
            ("height", request.sheet_height),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(OptimizerError::InvalidSheet(format!(
                    "sheet {} must be positive, got {}",
                    name, value
                )));
            }
        }

        if !request.gap.is_finite() || request.gap < 0.0 {
            return Err(OptimizerError::InvalidInput(format!(
                "gap must not be negative, got {}",
                request.gap
            )));
        }

        Ok(Self { request })
    }

    /// Executes the nesting and returns one plan per material key.
    pub fn optimize(&self) -> PanelOptimizationResult {
        info!(
            requests = self.request.panels.len(),
            sheet_width = self.request.sheet_width,
            sheet_height = self.request.sheet_height,
            "Starting panel nesting"
        );

        let mut rejected = Vec::new();
        let groups = self.admit_and_group(&mut rejected);

        let mut materials = Vec::with_capacity(groups.len());
        for mut group in groups {
            // Stable: equal long sides keep their request order.
            group.pieces.sort_by(|a, b| {
                b.long_side()
                    .partial_cmp(&a.long_side())
                    .unwrap_or(Ordering::Equal)
            });

            let sheets = self.pack_group(&group.key, group.pieces, &mut rejected);

            materials.push(MaterialPlan {
                key: group.key,
                material: group.material,
                thickness: group.thickness,
                sheets,
            });
        }

        let sheets_required = summary::count_sheets(&materials);
        let summary = summary::calculate_summary(&materials);

        info!(
            sheets = summary.total_sheets,
            rejected = rejected.len(),
            "Panel nesting complete: {:.2}% waste",
            summary.waste_percentage
        );

        PanelOptimizationResult {
            materials,
            sheets_required,
            summary,
            rejected,
        }
    }

    /// Validates every request, expands the admitted ones by quantity and
    /// groups them by material key in order of first appearance.
    fn admit_and_group(&self, rejected: &mut Vec<Rejection>) -> Vec<MaterialGroup> {
        let mut groups: Vec<MaterialGroup> = Vec::new();
        let mut expanded = 0usize;

        for (index, panel) in self.request.panels.iter().enumerate() {
            let admission = self
                .admit(panel)
                .and_then(|()| within_budget(expanded, panel.quantity));
            if let Err((kind, reason)) = admission {
                warn!(request = index, %reason, "Rejected panel request");
                rejected.push(Rejection {
                    request_index: index,
                    item: describe(panel),
                    pieces: panel.quantity,
                    kind,
                    reason,
                });
                continue;
            }

            let key = material_key(&panel.material, &panel.thickness);
            let group_idx = match groups.iter().position(|g| g.key == key) {
                Some(idx) => idx,
                None => {
                    groups.push(MaterialGroup {
                        key,
                        material: panel.material.clone(),
                        thickness: panel.thickness.clone(),
                        pieces: Vec::new(),
                    });
                    groups.len() - 1
                }
            };

            expanded += panel.quantity as usize;
            let pieces = &mut groups[group_idx].pieces;
            for _ in 0..panel.quantity {
                let id = pieces.len();
                pieces.push(PanelPiece {
                    id,
                    request_index: index,
                    width: panel.width,
                    height: panel.height,
                    can_rotate: panel.can_rotate,
                });
            }
        }

        groups
    }

    /// Checks a request against the sheet in every allowed orientation.
    fn admit(&self, panel: &PanelCutRequest) -> Admission {
        for (name, value) in [("width", panel.width), ("height", panel.height)] {
            if !value.is_finite() || value <= 0.0 {
                return Err((
                    RejectionKind::Invalid,
                    format!("{} must be positive, got {}", name, value),
                ));
            }
        }
        if panel.quantity == 0 {
            return Err((
                RejectionKind::Invalid,
                "quantity must be at least 1".to_string(),
            ));
        }

        let candidate = PanelPiece {
            id: 0,
            request_index: 0,
            width: panel.width,
            height: panel.height,
            can_rotate: panel.can_rotate,
        };
        if candidate
            .orient_within(self.request.sheet_width, self.request.sheet_height)
            .is_none()
        {
            let orientations = if panel.can_rotate {
                "in either orientation"
            } else {
                "without rotation"
            };
            return Err((
                RejectionKind::Unplaceable,
                format!(
                    "panel does not fit a {}x{} sheet {}",
                    self.request.sheet_width, self.request.sheet_height, orientations
                ),
            ));
        }

        Ok(())
    }

    /// Fills sheets until every panel of the group is placed.
    fn pack_group(
        &self,
        key: &str,
        mut pending: Vec<PanelPiece>,
        rejected: &mut Vec<Rejection>,
    ) -> Vec<OptimizedSheet> {
        let mut sheets = Vec::new();

        while !pending.is_empty() {
            let sheet = self.fill_sheet(&mut pending, sheets.len() as u32 + 1);

            // Admission makes this unreachable; it still guards the loop.
            if sheet.placements.is_empty() {
                warn!(key, remaining = pending.len(), "No panel fits an empty sheet");
                for piece in pending.drain(..) {
                    rejected.push(Rejection {
                        request_index: piece.request_index,
                        item: describe(&self.request.panels[piece.request_index]),
                        pieces: 1,
                        kind: RejectionKind::Unplaceable,
                        reason: "panel could not be placed on an empty sheet".to_string(),
                    });
                }
                break;
            }

            debug!(
                key,
                sheet = sheet.sheet_number,
                panels = sheet.placements.len(),
                residual_area = sheet.residual_area,
                "Closed sheet"
            );
            sheets.push(sheet);
        }

        sheets
    }

    /// Packs one sheet column by column, left to right.
    ///
    /// Each column is opened by the pending panel with the widest fitting
    /// orientation, which is placed at the top. The remaining height is then
    /// filled by scanning the pending panels in order.
    fn fill_sheet(&self, pending: &mut Vec<PanelPiece>, sheet_number: u32) -> OptimizedSheet {
        let sheet_width = self.request.sheet_width;
        let sheet_height = self.request.sheet_height;
        let gap = self.request.gap;

        let mut placements = Vec::new();
        let mut x = 0.0;

        while !pending.is_empty() {
            let remaining_width = sheet_width - x;
            if remaining_width <= EPSILON {
                break;
            }

            let Some((head_idx, (column_width, head_height, rotated))) =
                column_candidate(pending, remaining_width, sheet_height)
            else {
                break;
            };

            let head = pending.remove(head_idx);
            placements.push(self.place(&head, x, 0.0, column_width, head_height, rotated));

            let mut y = head_height + gap;
            pending.retain(|piece| {
                let remaining_height = sheet_height - y;
                if remaining_height <= EPSILON {
                    return true;
                }
                match piece.orient_within(column_width, remaining_height) {
                    Some((width, height, rotated)) => {
                        placements.push(self.place(piece, x, y, width, height, rotated));
                        y += height + gap;
                        false
                    }
                    None => true,
                }
            });

            x += column_width + gap;
        }

        let used_area: f64 = placements.iter().map(PlacedPanel::area).sum();
        OptimizedSheet {
            sheet_number,
            width: sheet_width,
            height: sheet_height,
            placements,
            used_area,
            residual_area: sheet_width * sheet_height - used_area,
        }
    }

    fn place(
        &self,
        piece: &PanelPiece,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        rotated: bool,
    ) -> PlacedPanel {
        let request = &self.request.panels[piece.request_index];
        PlacedPanel {
            request_index: piece.request_index,
            material: request.material.clone(),
            thickness: request.thickness.clone(),
            color: request.color.clone(),
            x,
            y,
            width,
            height,
            rotated,
        }
    }
}

/// Picks the panel that opens the next column.
///
/// Each panel's column width is its own width when it fits the remaining
/// width and the full sheet height, otherwise its height if rotation is
/// allowed. The widest column wins; ties go to the earliest panel in sort
/// order.
fn column_candidate(
    pending: &[PanelPiece],
    remaining_width: f64,
    sheet_height: f64,
) -> Option<(usize, (f64, f64, bool))> {
    let mut best: Option<(usize, (f64, f64, bool))> = None;

    for (idx, piece) in pending.iter().enumerate() {
        let Some(orientation) = piece.orient_within(remaining_width, sheet_height) else {
            continue;
        };
        match best {
            Some((_, (best_width, _, _))) if orientation.0 <= best_width + EPSILON => {}
            _ => best = Some((idx, orientation)),
        }
    }

    if let Some((idx, _)) = best {
        debug!(panel = pending[idx].id, remaining_width, "Opening column");
    }
    best
}

/// Rejects a request whose panels would push the call past `MAX_EXPANDED_PIECES`.
fn within_budget(expanded: usize, quantity: u32) -> Admission {
    if expanded.saturating_add(quantity as usize) > MAX_EXPANDED_PIECES {
        return Err((
            RejectionKind::Invalid,
            format!(
                "quantity {} exceeds the limit of {} panels per optimization ({} already admitted)",
                quantity, MAX_EXPANDED_PIECES, expanded
            ),
        ));
    }
    Ok(())
}

fn describe(panel: &PanelCutRequest) -> String {
    format!(
        "{} {} {}x{}",
        panel.material, panel.thickness, panel.width, panel.height
    )
}
