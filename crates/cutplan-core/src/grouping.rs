//! Collapses identical bars into counted groups for reporting.
//!
//! Two bars are identical when they come from the same stock and carry the
//! same cuts in the same order. Bars holding the same pieces in a different
//! order stay separate, since the operator cuts them differently.

use crate::types::{approx_eq, GroupedBar, OptimizedBar, ProfilePlan};
use std::fmt::Write;

/// Text key describing a bar's stock and its ordered (length, angles) sequence.
///
/// Values are written exactly, so two bars whose lengths differ below
/// `EPSILON` get different keys. `group_bars` compares within tolerance.
pub fn fingerprint(bar: &OptimizedBar) -> String {
    let mut key = format!(
        "{}/{}/{}/{}|",
        bar.stock_length, bar.kerf, bar.head_trim, bar.tail_trim
    );
    for cut in &bar.cuts {
        // Writing to a String cannot fail.
        let _ = write!(key, "{}@{}/{};", cut.length, cut.angles.head, cut.angles.tail);
    }
    key
}

/// True when both bars share stock parameters and carry the same cuts in the
/// same order, every value compared within `EPSILON`.
pub fn same_layout(a: &OptimizedBar, b: &OptimizedBar) -> bool {
    approx_eq(a.stock_length, b.stock_length)
        && approx_eq(a.kerf, b.kerf)
        && approx_eq(a.head_trim, b.head_trim)
        && approx_eq(a.tail_trim, b.tail_trim)
        && a.cuts.len() == b.cuts.len()
        && a.cuts
            .iter()
            .zip(&b.cuts)
            .all(|(x, y)| approx_eq(x.length, y.length) && x.angles.approx_eq(&y.angles))
}

/// Folds bars with the same layout together, keeping first-seen order.
///
/// Each bar joins the first earlier group it matches.
pub fn group_bars(bars: &[OptimizedBar]) -> Vec<GroupedBar> {
    let mut groups: Vec<GroupedBar> = Vec::new();

    for bar in bars {
        match groups.iter_mut().find(|g| same_layout(&g.bar, bar)) {
            Some(group) => group.count += 1,
            None => groups.push(GroupedBar {
                bar: bar.clone(),
                count: 1,
            }),
        }
    }

    groups
}

/// Turns groups back into one bar per repetition.
pub fn expand_groups(groups: &[GroupedBar]) -> Vec<OptimizedBar> {
    groups
        .iter()
        .flat_map(|g| std::iter::repeat(&g.bar).take(g.count as usize))
        .cloned()
        .collect()
}

impl ProfilePlan {
    pub fn grouped(&self) -> Vec<GroupedBar> {
        group_bars(&self.bars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CutAngles, PlacedCut};

    fn bar(cuts: &[(f64, f64)]) -> OptimizedBar {
        let cuts: Vec<PlacedCut> = cuts
            .iter()
            .map(|&(length, angle)| PlacedCut {
                request_index: 0,
                length,
                angles: CutAngles::new(angle, 90.0),
                kerf: 4.0,
            })
            .collect();
        let used_length: f64 = cuts.iter().map(|c| c.length).sum();
        OptimizedBar {
            stock_length: 6000.0,
            kerf: 4.0,
            head_trim: 10.0,
            tail_trim: 10.0,
            residual: 5980.0 - used_length - 4.0 * cuts.len() as f64,
            used_length,
            tally: String::new(),
            cuts,
        }
    }

    #[test]
    fn identical_bars_collapse() {
        let a = bar(&[(2000.0, 90.0), (990.0, 45.0)]);
        let b = bar(&[(2000.0, 90.0), (990.0, 45.0)]);
        let reordered = bar(&[(990.0, 45.0), (2000.0, 90.0)]);

        let groups = group_bars(&[a, b, reordered]);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].count, 2);
        assert_eq!(groups[1].count, 1);
        assert_eq!(groups[1].bar.cuts[0].length, 990.0);
    }

    #[test]
    fn angles_distinguish_bars() {
        let groups = group_bars(&[bar(&[(1000.0, 90.0)]), bar(&[(1000.0, 45.0)])]);
        assert_eq!(groups.len(), 2);
    }

    #[test]
    fn different_stock_never_merges() {
        let a = bar(&[(1000.0, 90.0)]);
        let mut b = a.clone();
        b.stock_length = 7000.0;

        assert_ne!(fingerprint(&a), fingerprint(&b));
        assert_eq!(group_bars(&[a, b]).len(), 2);
    }

    #[test]
    fn regrouping_expanded_groups_is_stable() {
        let bars = vec![
            bar(&[(1500.0, 90.0)]),
            bar(&[(700.0, 90.0), (700.0, 90.0)]),
            bar(&[(1500.0, 90.0)]),
            bar(&[(1500.0, 90.0)]),
        ];

        let groups = group_bars(&bars);
        let regrouped = group_bars(&expand_groups(&groups));

        assert_eq!(expand_groups(&groups).len(), bars.len());
        assert_eq!(regrouped.len(), groups.len());
        for (a, b) in groups.iter().zip(&regrouped) {
            assert_eq!(a.count, b.count);
            assert_eq!(fingerprint(&a.bar), fingerprint(&b.bar));
        }
    }

    #[test]
    fn lengths_within_tolerance_merge() {
        let a = bar(&[(2000.0, 90.0), (990.0, 45.0)]);
        let b = bar(&[(2000.0 + 1e-9, 90.0), (990.0, 45.0 - 1e-9)]);
        let apart = bar(&[(2000.0 + 1e-3, 90.0), (990.0, 45.0)]);

        assert_ne!(fingerprint(&a), fingerprint(&b));
        let groups = group_bars(&[a, b, apart]);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].count, 2);
        assert_eq!(groups[0].bar.cuts[0].length, 2000.0);
        assert_eq!(groups[1].count, 1);
    }

    #[test]
    fn empty_input_gives_no_groups() {
        assert!(group_bars(&[]).is_empty());
    }
}
