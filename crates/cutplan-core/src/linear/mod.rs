use crate::catalog::{ProfileCatalog, StaticCatalog};
use crate::types::*;
use std::cmp::Ordering;
use tracing::{debug, info, warn};

mod summary;
mod tally;

/// Stock parameters shared by every piece cut from the same bar.
#[derive(Debug, Clone, Copy, PartialEq)]
struct StockParams {
    stock_length: f64,
    kerf: f64,
    head_trim: f64,
    tail_trim: f64,
}

impl StockParams {
    /// Length available for cuts once both trims are removed.
    fn usable_length(&self) -> f64 {
        self.stock_length - self.head_trim - self.tail_trim
    }

    fn approx_eq(&self, other: &StockParams) -> bool {
        approx_eq(self.stock_length, other.stock_length)
            && approx_eq(self.kerf, other.kerf)
            && approx_eq(self.head_trim, other.head_trim)
            && approx_eq(self.tail_trim, other.tail_trim)
    }
}

/// A single piece after expanding a request by its quantity.
#[derive(Debug, Clone, Copy)]
struct Piece {
    request_index: usize,
    length: f64,
    angles: CutAngles,
}

/// Outcome of checking a single request.
type Admission = std::result::Result<StockParams, (RejectionKind, String)>;

/// Pieces of one profile sharing the same stock parameters.
struct Batch {
    params: StockParams,
    pieces: Vec<Piece>,
}

/// Pieces of one profile, split into parameter batches.
struct ProfileGroup {
    profile_code: String,
    batches: Vec<Batch>,
}

/// Packs linear cuts onto stock bars using first-fit decreasing, one bar at a time.
pub struct LinearOptimizer<C = StaticCatalog> {
    cuts: Vec<CutRequest>,
    catalog: C,
}

impl LinearOptimizer<StaticCatalog> {
    /// Builds an optimizer from a request document, using its embedded catalog.
    pub fn new(request: BarOptimizationRequest) -> Result<Self> {
        Self::with_catalog(request.cuts, request.catalog)
    }
}

impl<C: ProfileCatalog> LinearOptimizer<C> {
    /// Builds an optimizer that resolves profiles through `catalog`.
    pub fn with_catalog(cuts: Vec<CutRequest>, catalog: C) -> Result<Self> {
        if cuts.is_empty() {
            return Err(OptimizerError::InvalidInput(
                "At least one cut must be provided".to_string(),
            ));
        }

        Ok(Self { cuts, catalog })
    }

    /// Runs the optimization and returns one plan per profile.
    ///
    /// Requests that are malformed or cannot fit on their stock bar are
    /// reported in `rejected`; everything else is planned.
    pub fn optimize(&self) -> BarOptimizationResult {
        info!(requests = self.cuts.len(), "Starting bar optimization");

        let mut rejected = Vec::new();
        let groups = self.admit_and_group(&mut rejected);

        let mut profiles = Vec::with_capacity(groups.len());
        for group in groups {
            let mut bars = Vec::new();
            for mut batch in group.batches {
                // Stable: equal lengths keep their request order.
                batch.pieces.sort_by(|a, b| {
                    b.length.partial_cmp(&a.length).unwrap_or(Ordering::Equal)
                });
                debug!(
                    profile = %group.profile_code,
                    stock_length = batch.params.stock_length,
                    pieces = batch.pieces.len(),
                    "Packing batch"
                );
                bars.extend(pack_batch(batch.params, batch.pieces));
            }

            let description = self
                .catalog
                .lookup(&group.profile_code)
                .map(|p| p.description)
                .unwrap_or_default();

            profiles.push(ProfilePlan {
                profile_code: group.profile_code,
                description,
                bars,
            });
        }

        let bars_required = summary::count_bars(&profiles);
        let summary = summary::calculate_summary(&profiles);

        info!(
            bars = summary.total_bars,
            rejected = rejected.len(),
            "Bar optimization complete: {:.2}% waste",
            summary.waste_percentage
        );

        BarOptimizationResult {
            profiles,
            bars_required,
            summary,
            rejected,
        }
    }

    /// Validates every request, expands the admitted ones by quantity and
    /// groups the pieces by profile and stock parameters, preserving the
    /// order in which profiles and parameter sets first appear.
    fn admit_and_group(&self, rejected: &mut Vec<Rejection>) -> Vec<ProfileGroup> {
        let mut groups: Vec<ProfileGroup> = Vec::new();
        let mut expanded = 0usize;

        for (index, cut) in self.cuts.iter().enumerate() {
            let admission = self.admit(cut).and_then(|params| {
                within_budget(expanded, cut.quantity)?;
                Ok(params)
            });
            let params = match admission {
                Ok(params) => params,
                Err((kind, reason)) => {
                    warn!(request = index, %reason, "Rejected cut request");
                    rejected.push(Rejection {
                        request_index: index,
                        item: format!("{} {}mm", cut.profile_code, cut.length),
                        pieces: cut.quantity,
                        kind,
                        reason,
                    });
                    continue;
                }
            };

            let group_idx = match groups
                .iter()
                .position(|g| g.profile_code == cut.profile_code)
            {
                Some(idx) => idx,
                None => {
                    groups.push(ProfileGroup {
                        profile_code: cut.profile_code.clone(),
                        batches: Vec::new(),
                    });
                    groups.len() - 1
                }
            };
            let batches = &mut groups[group_idx].batches;

            let batch_idx = match batches.iter().position(|b| b.params.approx_eq(&params)) {
                Some(idx) => idx,
                None => {
                    if !batches.is_empty() {
                        debug!(
                            profile = %cut.profile_code,
                            request = index,
                            "Stock parameters differ from earlier requests, opening a new batch"
                        );
                    }
                    batches.push(Batch {
                        params,
                        pieces: Vec::new(),
                    });
                    batches.len() - 1
                }
            };

            expanded += cut.quantity as usize;
            let piece = Piece {
                request_index: index,
                length: cut.length,
                angles: cut.angles,
            };
            batches[batch_idx]
                .pieces
                .extend(std::iter::repeat(piece).take(cut.quantity as usize));
        }

        groups
    }

    /// Checks a request and resolves its stock parameters.
    fn admit(&self, cut: &CutRequest) -> Admission {
        let invalid = |reason: String| -> Admission { Err((RejectionKind::Invalid, reason)) };

        if cut.profile_code.trim().is_empty() {
            return invalid("profile code is empty".to_string());
        }
        if !cut.length.is_finite() || cut.length <= 0.0 {
            return invalid(format!("length must be positive, got {}", cut.length));
        }
        if cut.quantity == 0 {
            return invalid("quantity must be at least 1".to_string());
        }
        for angle in [cut.angles.head, cut.angles.tail] {
            if !angle.is_finite() || angle <= 0.0 || angle >= 180.0 {
                return invalid(format!("cut angle must be between 0 and 180, got {}", angle));
            }
        }
        for (name, value) in [
            ("kerf", cut.kerf),
            ("head trim", cut.head_trim),
            ("tail trim", cut.tail_trim),
        ] {
            if !value.is_finite() || value < 0.0 {
                return invalid(format!("{} must not be negative, got {}", name, value));
            }
        }

        let stock_length = match cut.stock_length {
            Some(length) => length,
            None => match self.catalog.lookup(&cut.profile_code) {
                Some(info) => info.max_length,
                None => {
                    return invalid(format!(
                        "no stock length given and profile '{}' is not in the catalog",
                        cut.profile_code
                    ))
                }
            },
        };
        if !stock_length.is_finite() || stock_length <= 0.0 {
            return invalid(format!("stock length must be positive, got {}", stock_length));
        }

        let params = StockParams {
            stock_length,
            kerf: cut.kerf,
            head_trim: cut.head_trim,
            tail_trim: cut.tail_trim,
        };

        let needed = cut.length + cut.kerf;
        let usable = params.usable_length();
        if needed > usable + EPSILON {
            return Err((
                RejectionKind::Unplaceable,
                format!(
                    "piece needs {}mm with kerf but only {}mm of the {}mm bar is usable after trims",
                    needed, usable, stock_length
                ),
            ));
        }

        Ok(params)
    }
}

/// Rejects a request whose pieces would push the call past `MAX_EXPANDED_PIECES`.
fn within_budget(
    expanded: usize,
    quantity: u32,
) -> std::result::Result<(), (RejectionKind, String)> {
    if expanded.saturating_add(quantity as usize) > MAX_EXPANDED_PIECES {
        return Err((
            RejectionKind::Invalid,
            format!(
                "quantity {} exceeds the limit of {} pieces per optimization ({} already admitted)",
                quantity, MAX_EXPANDED_PIECES, expanded
            ),
        ));
    }
    Ok(())
}

/// Fills bars from a sorted list of pieces until none remain.
///
/// Each bar takes a single pass over the pending pieces in order, accepting
/// every piece that still fits. A skipped piece is not revisited for the
/// same bar.
fn pack_batch(params: StockParams, mut pending: Vec<Piece>) -> Vec<OptimizedBar> {
    let mut bars = Vec::new();

    while !pending.is_empty() {
        let mut available = params.usable_length();
        let mut accepted = Vec::new();

        pending.retain(|piece| {
            let needed = piece.length + params.kerf;
            if needed <= available + EPSILON {
                available -= needed;
                accepted.push(*piece);
                false
            } else {
                true
            }
        });

        // Admission guarantees the first pending piece always fits an empty bar.
        if accepted.is_empty() {
            warn!(remaining = pending.len(), "Pieces left that fit no empty bar");
            break;
        }

        let bar = close_bar(params, &accepted, available);
        debug!(
            cuts = bar.cuts.len(),
            residual = bar.residual,
            tally = %bar.tally,
            "Closed bar"
        );
        bars.push(bar);
    }

    bars
}

fn close_bar(params: StockParams, accepted: &[Piece], residual: f64) -> OptimizedBar {
    let cuts: Vec<PlacedCut> = accepted
        .iter()
        .map(|p| PlacedCut {
            request_index: p.request_index,
            length: p.length,
            angles: p.angles,
            kerf: params.kerf,
        })
        .collect();

    OptimizedBar {
        stock_length: params.stock_length,
        kerf: params.kerf,
        head_trim: params.head_trim,
        tail_trim: params.tail_trim,
        used_length: cuts.iter().map(|c| c.length).sum(),
        residual,
        tally: tally::build_tally(&cuts),
        cuts,
    }
}
