//! Seeded synthetic episodes.
//!
//! Produces catalog and action text in the same Python/numpy repr a recorder
//! writes, so a synthetic run goes through the full text ingestion path.
//! Same seed, same text.

use buildreplay_core::{Discipline, DISCIPLINE_COUNT};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Synthetic episode parameters.
#[derive(Debug, Clone)]
pub struct SynthConfig {
    pub seed: u64,
    pub steps: usize,
    /// Grid extent per axis, exclusive
    pub extent: [i32; 3],
    /// Upper bound on catalog entries per discipline
    pub max_entries: usize,
    /// Chance a slot idles with the sentinel
    pub noop_probability: f64,
    /// Chance a slot holds an index past the sentinel
    pub invalid_probability: f64,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            steps: 120,
            extent: [8, 8, 6],
            max_entries: 12,
            noop_probability: 0.4,
            invalid_probability: 0.01,
        }
    }
}

/// Generated episode text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntheticEpisode {
    pub actions_text: String,
    pub valid_text: String,
}

struct Entry {
    coord: [i32; 3],
    requirement: Option<u32>,
}

/// Generates an episode deterministically from `config.seed`.
pub fn generate(config: &SynthConfig) -> SyntheticEpisode {
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let [ex, ey, ez] = config.extent.map(|e| e.max(1));

    let catalog: Vec<Vec<Entry>> = Discipline::ALL
        .iter()
        .map(|discipline| {
            let count = rng.gen_range(0..=config.max_entries);
            (0..count)
                .map(|_| {
                    // piling stays on the ground plane
                    let z = if *discipline == Discipline::Piling {
                        0
                    } else {
                        rng.gen_range(0..ez)
                    };
                    let coord = [rng.gen_range(0..ex), rng.gen_range(0..ey), z];
                    let requirement = rng.gen_bool(0.8).then(|| rng.gen_range(1..=4));
                    Entry { coord, requirement }
                })
                .collect()
        })
        .collect();

    let rows: Vec<[i64; DISCIPLINE_COUNT]> = (0..config.steps)
        .map(|_| {
            let mut row = [0i64; DISCIPLINE_COUNT];
            for (slot, entries) in row.iter_mut().zip(&catalog) {
                let sentinel = entries.len() as i64;
                let roll: f64 = rng.gen();
                *slot = if roll < config.invalid_probability {
                    sentinel + 1
                } else if entries.is_empty()
                    || roll < config.invalid_probability + config.noop_probability
                {
                    sentinel
                } else {
                    rng.gen_range(0..sentinel)
                };
            }
            row
        })
        .collect();

    SyntheticEpisode {
        actions_text: actions_repr(&rows),
        valid_text: catalog_repr(&catalog),
    }
}

fn catalog_repr(catalog: &[Vec<Entry>]) -> String {
    let lists: Vec<String> = catalog
        .iter()
        .map(|entries| {
            let items: Vec<String> = entries
                .iter()
                .map(|e| {
                    let [x, y, z] = e.coord;
                    match e.requirement {
                        Some(req) => format!("(({}, {}, {}), {})", x, y, z, req),
                        None => format!("({}, {}, {})", x, y, z),
                    }
                })
                .collect();
            format!("[{}]", items.join(", "))
        })
        .collect();
    format!("[{}]", lists.join(",\n "))
}

/// numpy `repr` of an int64 matrix.
fn actions_repr(rows: &[[i64; DISCIPLINE_COUNT]]) -> String {
    let rows: Vec<String> = rows
        .iter()
        .map(|row| {
            let cells: Vec<String> = row.iter().map(i64::to_string).collect();
            format!("[{}]", cells.join(", "))
        })
        .collect();
    format!("array([{}], dtype=int64)", rows.join(",\n       "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use buildreplay_core::text::{parse_actions_text, parse_catalog_text};

    #[test]
    fn test_same_seed_same_text() {
        let config = SynthConfig::default();
        assert_eq!(generate(&config), generate(&config));

        let other = SynthConfig { seed: 7, ..config.clone() };
        assert_ne!(generate(&config), generate(&other));
    }

    #[test]
    fn test_generated_text_parses() {
        let config = SynthConfig {
            steps: 30,
            ..Default::default()
        };
        let episode = generate(&config);
        let actions = parse_actions_text(&episode.actions_text).unwrap();
        let catalog = parse_catalog_text(&episode.valid_text).unwrap();
        assert_eq!(actions.len(), 30);
        assert!(episode.actions_text.starts_with("array([["));
        assert!(episode.actions_text.ends_with("]], dtype=int64)"));
        assert_eq!(episode.actions_text.matches(",\n       [").count(), 29);

        for row in actions.rows() {
            for d in Discipline::ALL {
                let sentinel = catalog.discipline(d).noop_index() as i64;
                assert!((0..=sentinel + 1).contains(&row.get(d)));
            }
        }
    }
}
