use buildreplay_core::{EngineConfig, ReplayEngine};
use buildreplay_sim::{generate, PlaybackConfig, PlaybackRunner, SynthConfig};
use proptest::prelude::*;

fn quiet_engine() -> ReplayEngine {
    ReplayEngine::new(EngineConfig {
        log_anomalies: false,
        ..Default::default()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn played_episode_matches_final_state(seed in any::<u64>(), steps in 1usize..60) {
        let episode = generate(&SynthConfig { seed, steps, ..Default::default() });
        let mut engine = quiet_engine();
        engine.load_episode(&episode.actions_text, &episode.valid_text).unwrap();

        let runner = PlaybackRunner::new(PlaybackConfig { cadence: 60, ..Default::default() });
        let result = runner.run(&mut engine);
        prop_assert_eq!(result.final_step, steps - 1);
        prop_assert!(result.reached_end);

        let live = engine.state().cells;
        let final_cells = engine.final_state().unwrap().cells;
        prop_assert_eq!(live, final_cells);
    }
}

#[test]
fn synthetic_episode_slices_by_layer() {
    let episode = generate(&SynthConfig { seed: 3, steps: 80, ..Default::default() });
    let mut engine = quiet_engine();
    engine.load_episode(&episode.actions_text, &episode.valid_text).unwrap();
    engine.seek(i64::MAX);
    engine.set_slice_filter("z == 0").unwrap();

    for cell in engine.state().cells {
        assert_eq!(cell.visible, cell.coord.z == 0);
    }
}
