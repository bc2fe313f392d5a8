use buildreplay_core::{
    ActionMatrix, ActionRow, Advance, CellCoord, CellStateMap, Discipline, EngineConfig,
    PlacementCatalog, RawPlacement, ReplayEngine, DISCIPLINE_COUNT,
};
use proptest::prelude::*;

fn quiet_engine() -> ReplayEngine {
    ReplayEngine::new(EngineConfig {
        log_anomalies: false,
        ..Default::default()
    })
}

fn coord() -> impl Strategy<Value = CellCoord> {
    (0..4i32, 0..4i32, 0..3i32).prop_map(|(x, y, z)| CellCoord::new(x, y, z))
}

fn placement() -> impl Strategy<Value = RawPlacement> {
    prop_oneof![
        coord().prop_map(RawPlacement::Bare),
        (coord(), 0..5u32).prop_map(|(c, req)| RawPlacement::WithRequirement(c, req)),
    ]
}

/// Catalog plus rows whose indices range one past the sentinel.
fn episode() -> impl Strategy<Value = (PlacementCatalog, ActionMatrix)> {
    prop::collection::vec(prop::collection::vec(placement(), 0..5), DISCIPLINE_COUNT)
        .prop_flat_map(|lists| {
            let bounds: Vec<i64> = lists.iter().map(|l| l.len() as i64 + 2).collect();
            let row = bounds.into_iter().map(|b| 0..b).collect::<Vec<_>>();
            (Just(lists), prop::collection::vec(row, 1..12))
        })
        .prop_map(|(lists, rows)| {
            let catalog = PlacementCatalog::from_raw(lists).unwrap();
            let rows = rows
                .into_iter()
                .map(|r| {
                    let mut row = [0i64; DISCIPLINE_COUNT];
                    row.copy_from_slice(&r);
                    ActionRow(row)
                })
                .collect();
            (catalog, ActionMatrix::from_rows(rows))
        })
}

proptest! {
    #[test]
    fn final_state_equals_full_rebuild((catalog, actions) in episode()) {
        let final_state = CellStateMap::compute_final_state(&catalog, &actions);
        let mut rebuilt = CellStateMap::new();
        rebuilt.rebuild_through(&catalog, &actions, actions.len() - 1);
        prop_assert_eq!(final_state.count_table(), rebuilt.count_table());
    }

    #[test]
    fn counts_never_decrease((catalog, actions) in episode()) {
        let mut state = CellStateMap::new();
        let mut previous = state.count_table();
        for step in 0..actions.len() {
            state.apply_step(&catalog, &actions, step);
            let current = state.count_table();
            for (coord, counts) in &previous {
                for (discipline, n) in counts {
                    let now = current[coord].get(discipline).copied().unwrap_or(0);
                    prop_assert!(now >= *n);
                }
            }
            previous = current;
        }
    }

    #[test]
    fn completion_stays_in_unit_range((catalog, actions) in episode()) {
        let state = CellStateMap::compute_final_state(&catalog, &actions);
        for cell in state.iter() {
            let c = cell.completion();
            prop_assert!((0.0..=1.0).contains(&c), "completion {} at {}", c, cell.coord);
        }
    }

    #[test]
    fn noop_row_changes_nothing((catalog, actions) in episode()) {
        let mut sentinels = [0i64; DISCIPLINE_COUNT];
        for d in Discipline::ALL {
            sentinels[d.index()] = catalog.discipline(d).noop_index() as i64;
        }
        let mut rows = actions.rows().to_vec();
        rows.push(ActionRow(sentinels));
        let extended = ActionMatrix::from_rows(rows);

        let mut state = CellStateMap::new();
        state.rebuild_through(&catalog, &extended, extended.len() - 2);
        let before = state.count_table();
        let applied = state.apply_step(&catalog, &extended, extended.len() - 1);
        prop_assert!(applied.touched.is_empty());
        prop_assert!(applied.anomalies.is_empty());
        prop_assert_eq!(before, state.count_table());
    }

    #[test]
    fn playback_matches_seek((catalog, actions) in episode(), target in 0usize..12) {
        let mut played = quiet_engine();
        played.install(catalog.clone(), actions.clone());
        played.play();
        while played.current_step() < target.min(actions.len() - 1) {
            prop_assert!(matches!(played.advance(), Advance::Moved(_)));
        }

        let mut sought = quiet_engine();
        sought.install(catalog, actions);
        sought.seek(target as i64);

        prop_assert_eq!(played.current_step(), sought.current_step());
        prop_assert_eq!(played.cells().count_table(), sought.cells().count_table());
        prop_assert_eq!(played.anomalies(), sought.anomalies());
    }
}
