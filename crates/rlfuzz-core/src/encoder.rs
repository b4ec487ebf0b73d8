//! Observation → feature vector.
//!
//! A pure, deterministic map into `[0, 1]^FEATURE_COUNT`. Enumeration
//! indices are divided by `COUNT - 1` so the largest valid index maps to
//! exactly 1.0. Status codes are bucketed by leading digit, never passed raw.
//!
//! Layout (`FEATURE_SCHEMA_VERSION` 1):
//!
//! | idx | feature                                   |
//! |-----|-------------------------------------------|
//! | 0-3 | identifier ready: items, prices, discounts, points |
//! | 4   | primary resource exists                   |
//! | 5   | last status bucket                        |
//! | 6   | last verb bucket                          |
//! | 7   | pending verb                              |
//! | 8   | pending resource                          |
//! | 9   | pending field focus                       |
//! | 10  | pending mutation strategy                 |
//! | 11  | pending intensity                         |
//! | 12  | steps since execute (capped)              |
//! | 13  | ready to execute                          |

use rlfuzz_contracts::{
    dial::{FieldFocus, HttpVerb, Intensity, MutationStrategy, Resource},
    observation::{Observation, FEATURE_COUNT},
};

/// Encode `obs` with the step counter capped at `step_cap`.
///
/// `step_cap` must be > 0; `TrainingConfig::validate` guarantees it for
/// configured runs.
pub fn encode(obs: &Observation, step_cap: u32) -> [f64; FEATURE_COUNT] {
    let mut f = [0.0; FEATURE_COUNT];

    for (slot, ready) in obs.id_ready.iter().enumerate() {
        f[slot] = flag(*ready);
    }
    f[4] = flag(obs.primary_exists);
    f[5] = status_bucket(obs.last_status);
    f[6] = ratio(obs.last_verb.bucket(), HttpVerb::BUCKETS);
    f[7] = ratio(obs.verb.index(), HttpVerb::COUNT);
    f[8] = ratio(obs.resource.index(), Resource::COUNT);
    f[9] = ratio(obs.field.index(), FieldFocus::COUNT);
    f[10] = ratio(obs.strategy.index(), MutationStrategy::COUNT);
    f[11] = ratio(obs.intensity.index(), Intensity::COUNT);
    let cap = step_cap.max(1);
    f[12] = f64::from(obs.steps_since_execute.min(cap)) / f64::from(cap);
    f[13] = flag(obs.ready);

    f
}

/// 2xx → 0.25, 3xx → 0.50, 4xx → 0.75, 5xx → 1.00, none/other → 0.0.
pub fn status_bucket(status: u16) -> f64 {
    match status / 100 {
        2 => 0.25,
        3 => 0.50,
        4 => 0.75,
        5 => 1.00,
        _ => 0.0,
    }
}

fn flag(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

fn ratio(index: usize, count: usize) -> f64 {
    index as f64 / (count - 1) as f64
}

#[cfg(test)]
mod tests {
    use rlfuzz_contracts::observation::STEP_COUNTER_CAP;

    use super::*;

    fn in_unit_range(features: &[f64]) -> bool {
        features.iter().all(|v| (0.0..=1.0).contains(v))
    }

    #[test]
    fn default_observation_encodes_to_zeros() {
        let f = encode(&Observation::default(), STEP_COUNTER_CAP);
        assert!(f.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn maximum_indices_map_to_one() {
        let obs = Observation {
            id_ready: [true; Resource::TRACKED],
            primary_exists: true,
            last_status: 599,
            last_verb: HttpVerb::Delete,
            verb: HttpVerb::Delete,
            resource: Resource::Points,
            field: FieldFocus::Unknown,
            strategy: MutationStrategy::Encoding,
            intensity: Intensity::Aggressive,
            steps_since_execute: STEP_COUNTER_CAP,
            ready: true,
        };
        let f = encode(&obs, STEP_COUNTER_CAP);
        assert!(f.iter().all(|v| *v == 1.0), "got {:?}", f);
    }

    #[test]
    fn status_codes_are_bucketed() {
        assert_eq!(status_bucket(0), 0.0);
        assert_eq!(status_bucket(201), 0.25);
        assert_eq!(status_bucket(302), 0.50);
        assert_eq!(status_bucket(404), 0.75);
        assert_eq!(status_bucket(500), 1.00);
        assert_eq!(status_bucket(999), 0.0);
    }

    #[test]
    fn step_counter_saturates() {
        let obs = Observation {
            steps_since_execute: 1_000,
            ..Observation::default()
        };
        assert_eq!(encode(&obs, STEP_COUNTER_CAP)[12], 1.0);
    }

    /// Sweep every dial index and boundary value; no component may leave [0, 1].
    #[test]
    fn every_reachable_observation_stays_in_unit_cube() {
        let statuses = [0u16, 100, 200, 201, 204, 301, 400, 404, 500, 503];
        for v in 0..HttpVerb::COUNT {
            for r in 0..Resource::COUNT {
                for fi in 0..FieldFocus::COUNT {
                    for s in 0..MutationStrategy::COUNT {
                        for i in 0..Intensity::COUNT {
                            for (n, status) in statuses.iter().enumerate() {
                                let obs = Observation {
                                    id_ready: [n % 2 == 0, r % 2 == 0, s % 2 == 0, i % 2 == 0],
                                    primary_exists: fi % 2 == 0,
                                    last_status: *status,
                                    last_verb: HttpVerb::from_index(v).unwrap(),
                                    verb: HttpVerb::from_index(v).unwrap(),
                                    resource: Resource::from_index(r).unwrap(),
                                    field: FieldFocus::from_index(fi).unwrap(),
                                    strategy: MutationStrategy::from_index(s).unwrap(),
                                    intensity: Intensity::from_index(i).unwrap(),
                                    steps_since_execute: n as u32 * 3,
                                    ready: v != 0,
                                };
                                let f = encode(&obs, STEP_COUNTER_CAP);
                                assert!(in_unit_range(&f), "out of range: {:?}", f);
                            }
                        }
                    }
                }
            }
        }
    }
}
