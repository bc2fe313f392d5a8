//! Completion ratio for a cell.

use crate::discipline::Discipline;
use std::collections::BTreeMap;

/// Fraction of tracked required units completed, in `[0, 1]`.
///
/// Only disciplines with a requirement contribute; each contributes
/// `min(count, requirement)` done out of `requirement` needed. Work from
/// untracked disciplines counts neither for nor against. No tracked
/// requirement at all gives 0.
pub fn completion_ratio(
    counts: &BTreeMap<Discipline, u32>,
    requirements: &BTreeMap<Discipline, u32>,
) -> f64 {
    let mut done: u64 = 0;
    let mut need: u64 = 0;
    for (discipline, count) in counts {
        if let Some(&req) = requirements.get(discipline) {
            need += u64::from(req);
            done += u64::from((*count).min(req));
        }
    }
    if need == 0 {
        0.0
    } else {
        done as f64 / need as f64
    }
}

/// Shading factor for render sinks: darker means more complete.
pub fn brightness_for_completion(completion: f64) -> f64 {
    1.0 - 0.55 * completion.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn map(pairs: &[(Discipline, u32)]) -> BTreeMap<Discipline, u32> {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_no_requirements_is_zero() {
        let counts = map(&[(Discipline::Piping, 4)]);
        assert_eq!(completion_ratio(&counts, &BTreeMap::new()), 0.0);
        assert_eq!(completion_ratio(&BTreeMap::new(), &BTreeMap::new()), 0.0);
    }

    #[test]
    fn test_count_clamps_at_requirement() {
        let reqs = map(&[(Discipline::Equipment, 3)]);
        for (placed, expected) in [(1, 1.0 / 3.0), (2, 2.0 / 3.0), (3, 1.0), (4, 1.0)] {
            let counts = map(&[(Discipline::Equipment, placed)]);
            assert_relative_eq!(completion_ratio(&counts, &reqs), expected);
        }
    }

    #[test]
    fn test_untracked_discipline_excluded() {
        let counts = map(&[(Discipline::Piling, 1), (Discipline::Electrical, 10)]);
        let reqs = map(&[(Discipline::Piling, 2)]);
        assert_relative_eq!(completion_ratio(&counts, &reqs), 0.5);
    }

    #[test]
    fn test_mixed_requirements() {
        let counts = map(&[(Discipline::Piling, 5), (Discipline::Piping, 1)]);
        let reqs = map(&[(Discipline::Piling, 2), (Discipline::Piping, 2)]);
        // (2 + 1) / (2 + 2)
        assert_relative_eq!(completion_ratio(&counts, &reqs), 0.75);
    }

    #[test]
    fn test_brightness() {
        assert_relative_eq!(brightness_for_completion(0.0), 1.0);
        assert_relative_eq!(brightness_for_completion(1.0), 0.45);
        assert_relative_eq!(brightness_for_completion(2.0), 0.45);
    }
}
