use crate::catalog::StaticCatalog;
use serde::{Deserialize, Serialize};

/// Tolerance (mm) applied to every fit test and invariant check.
pub const EPSILON: f64 = 1e-6;

/// Square end cut.
pub const DEFAULT_ANGLE: f64 = 90.0;

/// Gap left between neighbouring panels when the request does not set one.
pub const DEFAULT_GAP: f64 = 5.0;

/// Upper bound on pieces (or panels) one call expands its requests into.
pub const MAX_EXPANDED_PIECES: usize = 100_000;

fn default_gap() -> f64 {
    DEFAULT_GAP
}

/// Pair of end-cut angles in degrees (head, tail).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CutAngles {
    pub head: f64,
    pub tail: f64,
}

impl Default for CutAngles {
    fn default() -> Self {
        Self {
            head: DEFAULT_ANGLE,
            tail: DEFAULT_ANGLE,
        }
    }
}

impl CutAngles {
    pub fn new(head: f64, tail: f64) -> Self {
        Self { head, tail }
    }

    /// True when both ends are plain 90° cuts.
    pub fn is_square(&self) -> bool {
        approx_eq(self.head, DEFAULT_ANGLE) && approx_eq(self.tail, DEFAULT_ANGLE)
    }

    pub(crate) fn approx_eq(&self, other: &CutAngles) -> bool {
        approx_eq(self.head, other.head) && approx_eq(self.tail, other.tail)
    }
}

pub(crate) fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() <= EPSILON
}

// ---------------------------------------------------------------------------
// Linear stock (bars)
// ---------------------------------------------------------------------------

/// One line of a bar cutting list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CutRequest {
    pub profile_code: String,
    pub length: f64,
    pub quantity: u32,
    #[serde(default)]
    pub angles: CutAngles,
    /// Material lost to the blade at each cut
    #[serde(default)]
    pub kerf: f64,
    #[serde(default)]
    pub head_trim: f64,
    #[serde(default)]
    pub tail_trim: f64,
    /// Nominal bar length. When omitted the profile catalog's max length is used.
    #[serde(default)]
    pub stock_length: Option<f64>,
}

/// Input: bar cutting list plus the catalog used to resolve missing stock lengths
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BarOptimizationRequest {
    pub cuts: Vec<CutRequest>,
    #[serde(default)]
    pub catalog: StaticCatalog,
}

/// A cut placed on a bar
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlacedCut {
    pub request_index: usize,
    pub length: f64,
    pub angles: CutAngles,
    pub kerf: f64,
}

/// Layout of a single stock bar
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizedBar {
    pub stock_length: f64,
    pub kerf: f64,
    pub head_trim: f64,
    pub tail_trim: f64,
    /// Cuts in the order they were accepted onto the bar
    pub cuts: Vec<PlacedCut>,
    /// Sum of the placed cut lengths
    pub used_length: f64,
    /// Length left over after trims, kerfs and cuts
    pub residual: f64,
    /// Human readable tally, e.g. `n°2 2000 - n°1 990 (45/90)`
    pub tally: String,
}

impl OptimizedBar {
    /// Total blade loss on this bar.
    pub fn kerf_loss(&self) -> f64 {
        self.cuts.iter().map(|c| c.kerf).sum()
    }
}

/// All bars cut from one profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfilePlan {
    pub profile_code: String,
    pub description: String,
    pub bars: Vec<OptimizedBar>,
}

/// Summary statistics for a bar plan
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BarSummary {
    pub total_bars: u32,
    pub total_stock_length: f64,
    pub used_length: f64,
    /// Everything not ending up in a cut: trims, kerfs and residuals
    pub waste_length: f64,
    pub waste_percentage: f64,
}

/// Output of the linear stock optimizer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BarOptimizationResult {
    /// One entry per profile, in order of first appearance in the request
    pub profiles: Vec<ProfilePlan>,
    /// How many bars of each profile are needed, in the same order as `profiles`
    pub bars_required: Vec<StockCount>,
    pub summary: BarSummary,
    /// Requests (or parts of them) that could not be planned
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub rejected: Vec<Rejection>,
}

impl BarOptimizationResult {
    pub fn profile(&self, profile_code: &str) -> Option<&ProfilePlan> {
        self.profiles.iter().find(|p| p.profile_code == profile_code)
    }

    /// Bars needed for `profile_code`, if the profile appears in the plan.
    pub fn bars_for(&self, profile_code: &str) -> Option<u32> {
        find_count(&self.bars_required, profile_code)
    }

    /// Number of individual pieces that made it onto a bar.
    pub fn placed_pieces(&self) -> usize {
        self.profiles
            .iter()
            .flat_map(|p| &p.bars)
            .map(|b| b.cuts.len())
            .sum()
    }
}

/// A bar layout together with how many times it repeats
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupedBar {
    pub bar: OptimizedBar,
    pub count: u32,
}

/// Stock consumed under one profile code or material key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockCount {
    pub key: String,
    pub count: u32,
}

fn find_count(counts: &[StockCount], key: &str) -> Option<u32> {
    counts.iter().find(|c| c.key == key).map(|c| c.count)
}

// ---------------------------------------------------------------------------
// Panels (sheets)
// ---------------------------------------------------------------------------

/// One line of a panel cutting list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelCutRequest {
    pub material: String,
    pub thickness: String,
    #[serde(default)]
    pub color: String,
    pub width: f64,
    pub height: f64,
    pub quantity: u32,
    #[serde(default)]
    pub can_rotate: bool,
}

/// Input: panel cutting list and the stock sheet it is nested on
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelOptimizationRequest {
    pub sheet_width: f64,
    pub sheet_height: f64,
    /// Spacing kept between panels on the same sheet
    #[serde(default = "default_gap")]
    pub gap: f64,
    pub panels: Vec<PanelCutRequest>,
}

/// Placement of a panel on a sheet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacedPanel {
    pub request_index: usize,
    pub material: String,
    pub thickness: String,
    pub color: String,
    pub x: f64,
    pub y: f64,
    /// Width as placed (after rotation)
    pub width: f64,
    /// Height as placed (after rotation)
    pub height: f64,
    pub rotated: bool,
}

impl PlacedPanel {
    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// True when the two rectangles share interior area.
    pub fn overlaps(&self, other: &PlacedPanel) -> bool {
        self.x + EPSILON < other.x + other.width
            && other.x + EPSILON < self.x + self.width
            && self.y + EPSILON < other.y + other.height
            && other.y + EPSILON < self.y + self.height
    }
}

/// Layout of a single stock sheet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizedSheet {
    pub sheet_number: u32,
    pub width: f64,
    pub height: f64,
    pub placements: Vec<PlacedPanel>,
    pub used_area: f64,
    pub residual_area: f64,
}

/// All sheets cut from one material + thickness
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialPlan {
    pub key: String,
    pub material: String,
    pub thickness: String,
    pub sheets: Vec<OptimizedSheet>,
}

/// Summary statistics for a panel plan
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SheetSummary {
    pub total_sheets: u32,
    pub total_area: f64,
    pub used_area: f64,
    pub waste_area: f64,
    pub waste_percentage: f64,
}

/// Output of the panel nesting optimizer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelOptimizationResult {
    /// One entry per material key, in order of first appearance in the request
    pub materials: Vec<MaterialPlan>,
    /// How many sheets of each material key are needed, in the same order as `materials`
    pub sheets_required: Vec<StockCount>,
    pub summary: SheetSummary,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub rejected: Vec<Rejection>,
}

impl PanelOptimizationResult {
    pub fn material(&self, material: &str, thickness: &str) -> Option<&MaterialPlan> {
        let key = material_key(material, thickness);
        self.materials.iter().find(|m| m.key == key)
    }

    /// Sheets needed for a material key such as `ALU___3mm`.
    pub fn sheets_for(&self, key: &str) -> Option<u32> {
        find_count(&self.sheets_required, key)
    }

    /// Number of individual panels that made it onto a sheet.
    pub fn placed_panels(&self) -> usize {
        self.materials
            .iter()
            .flat_map(|m| &m.sheets)
            .map(|s| s.placements.len())
            .sum()
    }
}

/// Grouping key for panels sharing stock sheets.
pub fn material_key(material: &str, thickness: &str) -> String {
    format!("{}___{}", material, thickness)
}

// ---------------------------------------------------------------------------
// Rejections and errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionKind {
    /// The request itself is malformed (non-positive size, zero quantity, ...)
    Invalid,
    /// The request is valid but a piece cannot fit on any stock in any orientation
    Unplaceable,
}

/// A request, or part of one, left out of the plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rejection {
    pub request_index: usize,
    /// Short description of the item, e.g. `X 6000mm` or `ALU 3mm 400x300`
    pub item: String,
    /// Pieces affected by this rejection
    pub pieces: u32,
    pub kind: RejectionKind,
    pub reason: String,
}

/// Error type for optimization
#[derive(Debug, thiserror::Error)]
pub enum OptimizerError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid sheet: {0}")]
    InvalidSheet(String),
}

pub type Result<T> = std::result::Result<T, OptimizerError>;
