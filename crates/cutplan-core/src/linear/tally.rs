use crate::types::{CutAngles, PlacedCut, EPSILON};
use std::cmp::Ordering;

const SEPARATOR: &str = " - ";

/// Builds the cut tally for a bar, e.g. `n°2 2000 - n°1 990 (45/90)`.
///
/// Identical (length, angles) pairs are counted together, groups are listed
/// longest first and the angle suffix is omitted for square cuts.
pub(super) fn build_tally(cuts: &[PlacedCut]) -> String {
    let mut groups: Vec<(f64, CutAngles, u32)> = Vec::new();

    for cut in cuts {
        match groups.iter_mut().find(|(length, angles, _)| {
            (length - cut.length).abs() <= EPSILON && angles.approx_eq(&cut.angles)
        }) {
            Some(group) => group.2 += 1,
            None => groups.push((cut.length, cut.angles, 1)),
        }
    }

    groups.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));

    groups
        .iter()
        .map(|(length, angles, count)| {
            if angles.is_square() {
                format!("n°{} {}", count, length)
            } else {
                format!("n°{} {} ({}/{})", count, length, angles.head, angles.tail)
            }
        })
        .collect::<Vec<_>>()
        .join(SEPARATOR)
}
