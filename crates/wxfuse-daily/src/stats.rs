//! Daily statistic records and extremum updates

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A statistic tracked per field per day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Statistic {
    Min,
    Max,
}

impl Statistic {
    /// Whether `candidate` should replace `current` for this statistic
    pub fn is_more_extreme(self, candidate: f64, current: f64) -> bool {
        match self {
            Statistic::Min => candidate < current,
            Statistic::Max => candidate > current,
        }
    }
}

/// Statistics recorded by default for scalar fields
pub const MIN_MAX: [Statistic; 2] = [Statistic::Min, Statistic::Max];

/// Stored value of one statistic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatRecord {
    pub value: f64,
    pub units: String,
    pub timestamp: DateTime<Utc>,
}

/// All statistics for one `(location, date, field)`
pub type StatBundle = BTreeMap<Statistic, StatRecord>;

/// Fold one observation into `bundle`; true when anything changed
pub fn update_bundle(bundle: &mut StatBundle, stats: &[Statistic], observation: &StatRecord) -> bool {
    let mut changed = false;
    for stat in stats {
        let replace = match bundle.get(stat) {
            Some(current) => stat.is_more_extreme(observation.value, current.value),
            None => true,
        };
        if replace {
            bundle.insert(*stat, observation.clone());
            changed = true;
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn obs(value: f64, minute: u32) -> StatRecord {
        StatRecord {
            value,
            units: "°C".into(),
            timestamp: Utc.with_ymd_and_hms(2024, 3, 15, 12, minute, 0).unwrap(),
        }
    }

    #[test]
    fn test_first_observation_sets_both() {
        let mut bundle = StatBundle::new();
        assert!(update_bundle(&mut bundle, &MIN_MAX, &obs(20.0, 0)));
        assert_eq!(bundle[&Statistic::Min].value, 20.0);
        assert_eq!(bundle[&Statistic::Max].value, 20.0);
    }

    #[test]
    fn test_sequence_tracks_extremes() {
        let mut bundle = StatBundle::new();
        for (i, v) in [20.0, 25.0, 18.0, 30.0, 22.0].iter().enumerate() {
            update_bundle(&mut bundle, &MIN_MAX, &obs(*v, i as u32));
        }
        assert_eq!(bundle[&Statistic::Min].value, 18.0);
        assert_eq!(bundle[&Statistic::Min].timestamp.format("%M").to_string(), "02");
        assert_eq!(bundle[&Statistic::Max].value, 30.0);
    }

    #[test]
    fn test_value_between_extremes_changes_nothing() {
        let mut bundle = StatBundle::new();
        update_bundle(&mut bundle, &MIN_MAX, &obs(10.0, 0));
        update_bundle(&mut bundle, &MIN_MAX, &obs(30.0, 1));
        let before = bundle.clone();
        assert!(!update_bundle(&mut bundle, &MIN_MAX, &obs(20.0, 2)));
        assert_eq!(bundle, before);
    }

    #[test]
    fn test_equal_value_keeps_earlier_record() {
        let mut bundle = StatBundle::new();
        update_bundle(&mut bundle, &[Statistic::Max], &obs(30.0, 0));
        assert!(!update_bundle(&mut bundle, &[Statistic::Max], &obs(30.0, 5)));
        assert_eq!(bundle[&Statistic::Max].timestamp.format("%M").to_string(), "00");
        assert!(!bundle.contains_key(&Statistic::Min));
    }

    #[test]
    fn test_bundle_serializes_compactly() {
        let mut bundle = StatBundle::new();
        update_bundle(&mut bundle, &MIN_MAX, &obs(18.5, 0));
        insta::assert_snapshot!(
            serde_json::to_string(&bundle).unwrap(),
            @r#"{"min":{"value":18.5,"units":"°C","timestamp":"2024-03-15T12:00:00Z"},"max":{"value":18.5,"units":"°C","timestamp":"2024-03-15T12:00:00Z"}}"#
        );
    }
}
