//! Data models for the gap-fill pipeline.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

// ---

/// Placeholder written into a parameter that has no reading.
pub const SENTINEL: f64 = 0.0;

/// Parameter name -> value. `None` marks an explicitly missing cell.
pub type Values = BTreeMap<String, Option<f64>>;

/// Where a reading came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Primary,
    Synthetic,
    Patched,
}

impl Origin {
    pub fn as_str(self) -> &'static str {
        // ---
        match self {
            Origin::Primary => "primary",
            Origin::Synthetic => "synthetic",
            Origin::Patched => "patched",
        }
    }
}

/// One parsed source row, before it is tagged with provenance.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    // ---
    pub timestamp: DateTime<Utc>,
    pub values: Values,
    /// Pass-through text columns (device id, boot counter, ...).
    pub carried: BTreeMap<String, String>,
}

/// One sensor observation in the series being cleaned.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    // ---
    pub timestamp: DateTime<Utc>,
    pub values: Values,
    pub carried: BTreeMap<String, String>,
    pub origin: Origin,
}

/// SIM-relayed observation used only as a patch source.
#[derive(Debug, Clone, PartialEq)]
pub struct SecondaryObservation {
    // ---
    pub timestamp: DateTime<Utc>,
    pub values: Values,
}

/// True when a value is missing or holds the sentinel.
pub fn is_unfilled(value: Option<f64>) -> bool {
    // ---
    match value {
        None => true,
        Some(v) => v.is_nan() || v == SENTINEL,
    }
}

/// Canonical timestamp text: microsecond precision with a `Z` suffix.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    // ---
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

impl From<Record> for Reading {
    fn from(record: Record) -> Self {
        // ---
        Reading {
            timestamp: record.timestamp,
            values: record.values,
            carried: record.carried,
            origin: Origin::Primary,
        }
    }
}

impl From<Record> for SecondaryObservation {
    fn from(record: Record) -> Self {
        // ---
        SecondaryObservation {
            timestamp: record.timestamp,
            values: record.values,
        }
    }
}

impl Reading {
    // ---
    /// Placeholder for a missing grid slot: every tracked parameter at the sentinel.
    pub fn synthetic(
        timestamp: DateTime<Utc>,
        params: &[String],
        carried: BTreeMap<String, String>,
    ) -> Self {
        // ---
        Reading {
            timestamp,
            values: params.iter().map(|p| (p.clone(), Some(SENTINEL))).collect(),
            carried,
            origin: Origin::Synthetic,
        }
    }

    /// Current value of `param`; an absent key counts as missing.
    pub fn value(&self, param: &str) -> Option<f64> {
        // ---
        self.values.get(param).copied().flatten()
    }

    /// Parameters (out of `params`) that still need a value.
    pub fn unfilled_params<'a>(&self, params: &'a [String]) -> Vec<&'a str> {
        // ---
        params
            .iter()
            .filter(|p| is_unfilled(self.value(p)))
            .map(String::as_str)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use chrono::TimeZone;

    fn params() -> Vec<String> {
        ["p", "rh", "temp", "temp_soil"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn create_test_record(p: Option<f64>, temp: Option<f64>) -> Record {
        // ---
        let mut values = Values::new();
        values.insert("p".to_string(), p);
        values.insert("temp".to_string(), temp);
        Record {
            timestamp: Utc.with_ymd_and_hms(2024, 2, 10, 21, 0, 0).unwrap(),
            values,
            carried: BTreeMap::new(),
        }
    }

    #[test]
    fn test_timestamp_format_has_micros_and_z() {
        // ---
        let ts = Utc.with_ymd_and_hms(2024, 2, 10, 21, 5, 26).unwrap()
            + chrono::Duration::microseconds(648_216);
        assert_eq!(format_timestamp(&ts), "2024-02-10T21:05:26.648216Z");

        let whole = Utc.with_ymd_and_hms(2024, 2, 10, 21, 6, 0).unwrap();
        assert_eq!(format_timestamp(&whole), "2024-02-10T21:06:00.000000Z");
    }

    #[test]
    fn test_unfilled_detection() {
        // ---
        assert!(is_unfilled(None));
        assert!(is_unfilled(Some(0.0)));
        assert!(is_unfilled(Some(-0.0)));
        assert!(is_unfilled(Some(f64::NAN)));
        assert!(!is_unfilled(Some(0.1)));
        assert!(!is_unfilled(Some(-3.5)));
    }

    #[test]
    fn test_primary_conversion_keeps_values() {
        // ---
        let reading: Reading = create_test_record(Some(1013.2), None).into();

        assert_eq!(reading.origin, Origin::Primary);
        assert_eq!(reading.value("p"), Some(1013.2));
        assert_eq!(reading.value("temp"), None);
        // Not present in the source row at all
        assert_eq!(reading.value("rh"), None);
    }

    #[test]
    fn test_synthetic_reading_is_all_sentinel() {
        // ---
        let ts = Utc.with_ymd_and_hms(2024, 2, 10, 21, 12, 0).unwrap();
        let reading = Reading::synthetic(ts, &params(), BTreeMap::new());

        assert_eq!(reading.origin, Origin::Synthetic);
        for p in params() {
            assert_eq!(reading.value(&p), Some(SENTINEL));
        }
        assert_eq!(reading.unfilled_params(&params()).len(), 4);
    }

    #[test]
    fn test_unfilled_params_skips_real_readings() {
        // ---
        let reading: Reading = create_test_record(Some(0.0), Some(21.5)).into();
        assert_eq!(reading.unfilled_params(&params()), vec!["p", "rh", "temp_soil"]);
    }

    #[test]
    fn test_origin_labels() {
        // ---
        assert_eq!(Origin::Primary.as_str(), "primary");
        assert_eq!(Origin::Synthetic.as_str(), "synthetic");
        assert_eq!(Origin::Patched.as_str(), "patched");
        assert_eq!(serde_json::to_string(&Origin::Patched).unwrap(), "\"patched\"");
    }
}
