use cutplan_core::{
    expand_groups, fingerprint, group_bars, CutAngles, CutRequest, LinearOptimizer,
    PanelCutRequest, PanelOptimizationRequest, PanelOptimizer, StaticCatalog,
};
use proptest::prelude::*;

const ANGLES: [f64; 3] = [90.0, 45.0, 60.0];

fn cut_requests() -> impl Strategy<Value = Vec<CutRequest>> {
    prop::collection::vec((0usize..3, 50u32..3000, 1u32..6, 0usize..3), 1..12).prop_map(|rows| {
        rows.into_iter()
            .map(|(profile, length, quantity, angle)| CutRequest {
                profile_code: format!("P{}", profile),
                length: length as f64,
                quantity,
                angles: CutAngles::new(ANGLES[angle], 90.0),
                kerf: 3.5,
                head_trim: 15.0,
                tail_trim: 15.0,
                stock_length: Some(6000.0),
            })
            .collect()
    })
}

fn panel_requests() -> impl Strategy<Value = Vec<PanelCutRequest>> {
    prop::collection::vec(
        (0usize..2, 20u32..1200, 20u32..1200, 1u32..5, any::<bool>()),
        1..10,
    )
    .prop_map(|rows| {
        rows.into_iter()
            .map(|(material, width, height, quantity, can_rotate)| PanelCutRequest {
                material: format!("M{}", material),
                thickness: "2mm".to_string(),
                color: String::new(),
                width: width as f64,
                height: height as f64,
                quantity,
                can_rotate,
            })
            .collect()
    })
}

fn sorted_pieces(mut pieces: Vec<(u64, u64)>) -> Vec<(u64, u64)> {
    pieces.sort_unstable();
    pieces
}

proptest! {
    #[test]
    fn bar_pieces_are_conserved(cuts in cut_requests()) {
        let result = LinearOptimizer::with_catalog(cuts.clone(), StaticCatalog::default())
            .unwrap()
            .optimize();
        prop_assert!(result.rejected.is_empty());

        for plan in &result.profiles {
            let expected = sorted_pieces(
                cuts.iter()
                    .filter(|c| c.profile_code == plan.profile_code)
                    .flat_map(|c| {
                        std::iter::repeat((c.length.to_bits(), c.angles.head.to_bits()))
                            .take(c.quantity as usize)
                    })
                    .collect(),
            );
            let placed = sorted_pieces(
                plan.bars
                    .iter()
                    .flat_map(|b| &b.cuts)
                    .map(|c| (c.length.to_bits(), c.angles.head.to_bits()))
                    .collect(),
            );
            prop_assert_eq!(expected, placed);
        }
    }

    #[test]
    fn every_bar_accounts_for_its_stock(cuts in cut_requests()) {
        let result = LinearOptimizer::with_catalog(cuts, StaticCatalog::default())
            .unwrap()
            .optimize();

        for bar in result.profiles.iter().flat_map(|p| &p.bars) {
            let total = bar.used_length
                + bar.residual
                + bar.head_trim
                + bar.tail_trim
                + bar.kerf * bar.cuts.len() as f64;
            prop_assert!((total - bar.stock_length).abs() < 1e-6);
            prop_assert!(bar.residual >= -1e-6);
            prop_assert!(!bar.cuts.is_empty());
        }
    }

    #[test]
    fn grouping_survives_expansion(cuts in cut_requests()) {
        let result = LinearOptimizer::with_catalog(cuts, StaticCatalog::default())
            .unwrap()
            .optimize();

        for plan in &result.profiles {
            let groups = plan.grouped();
            let total: u32 = groups.iter().map(|g| g.count).sum();
            prop_assert_eq!(total as usize, plan.bars.len());

            let regrouped = group_bars(&expand_groups(&groups));
            prop_assert_eq!(regrouped.len(), groups.len());
            for (a, b) in groups.iter().zip(&regrouped) {
                prop_assert_eq!(a.count, b.count);
                prop_assert_eq!(fingerprint(&a.bar), fingerprint(&b.bar));
            }
        }
    }

    #[test]
    fn panels_stay_inside_and_apart(panels in panel_requests(), gap in 0u32..10) {
        let request = PanelOptimizationRequest {
            sheet_width: 2000.0,
            sheet_height: 1000.0,
            gap: gap as f64,
            panels: panels.clone(),
        };
        let result = PanelOptimizer::new(request).unwrap().optimize();

        for sheet in result.materials.iter().flat_map(|m| &m.sheets) {
            prop_assert!(!sheet.placements.is_empty());
            for (i, a) in sheet.placements.iter().enumerate() {
                prop_assert!(a.x >= 0.0 && a.y >= 0.0);
                prop_assert!(a.x + a.width <= sheet.width + 1e-6);
                prop_assert!(a.y + a.height <= sheet.height + 1e-6);
                for b in &sheet.placements[i + 1..] {
                    prop_assert!(!a.overlaps(b));
                }
            }
            let used: f64 = sheet.placements.iter().map(|p| p.area()).sum();
            let sheet_area = sheet.width * sheet.height;
            prop_assert!((sheet.used_area + sheet.residual_area - sheet_area).abs() < 1e-6);
            prop_assert!((sheet.used_area - used).abs() < 1e-6);
        }

        // Every requested panel is either placed or reported.
        let requested: u32 = panels.iter().map(|p| p.quantity).sum();
        let rejected: u32 = result.rejected.iter().map(|r| r.pieces).sum();
        prop_assert_eq!(result.placed_panels() as u32 + rejected, requested);
    }
}
