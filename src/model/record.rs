// src/model/record.rs
// =============================================================================
// The result document for one polling unit (TPS).
//
// The source is loose with empty values: an unreported unit may send
// `"chart": null`, `"images": null` or `"administrasi": null`, and single
// counters or tally entries can be null too. All of those decode to zero or
// empty defaults instead of failing the whole record.
//
// `id` is NOT part of the payload we trust. Whatever the source sends there is
// read leniently, and the crawler overwrites it with the polling unit's code
// before the record is sent to the store.
// =============================================================================

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    /// Idempotency key, patched in from the unit code
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: i64,

    /// Reporting mode tag
    #[serde(default, deserialize_with = "null_as_default")]
    pub mode: String,

    /// Candidate label -> vote count
    #[serde(rename = "chart", default, deserialize_with = "null_tolerant_tally")]
    pub tally: BTreeMap<String, i64>,

    /// Scanned form image URIs, in source order
    #[serde(rename = "images", default, deserialize_with = "null_as_default")]
    pub attachments: Vec<String>,

    #[serde(rename = "administrasi", default, deserialize_with = "null_as_default")]
    pub stats: BallotStats,

    /// Passthrough payload, schema unknown
    #[serde(rename = "psu", default)]
    pub auxiliary: Value,

    /// Source timestamp, kept as-is
    #[serde(rename = "ts", default, deserialize_with = "null_as_default")]
    pub timestamp: String,

    /// Vote tally finalized
    #[serde(rename = "status_suara", default, deserialize_with = "null_as_default")]
    pub suara_confirmed: bool,

    /// Administrative data finalized
    #[serde(rename = "status_adm", default, deserialize_with = "null_as_default")]
    pub adm_confirmed: bool,

    /// Any field the source adds later
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// Ballot and voter counters from the `administrasi` block
//
// Suffixes: _j = total, _l = male, _p = female
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BallotStats {
    #[serde(deserialize_with = "null_as_default")]
    pub suara_sah: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub suara_total: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub suara_tidak_sah: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub pemilih_dpt_j: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub pemilih_dpt_l: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub pemilih_dpt_p: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub pengguna_dpt_j: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub pengguna_dpt_l: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub pengguna_dpt_p: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub pengguna_dptb_j: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub pengguna_dptb_l: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub pengguna_dptb_p: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub pengguna_total_j: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub pengguna_total_l: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub pengguna_total_p: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub pengguna_non_dpt_j: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub pengguna_non_dpt_l: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub pengguna_non_dpt_p: i64,
}

impl ResultRecord {
    /// The acceptance predicate: only confirmed tallies are stored
    pub fn is_accepted(&self) -> bool {
        self.suara_confirmed
    }

    /// Total votes across all candidates in the tally
    pub fn tally_total(&self) -> i64 {
        self.tally.values().sum()
    }
}

// Treats an explicit JSON null like a missing field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// Tally with null vote counts read as 0
fn null_tolerant_tally<'de, D>(deserializer: D) -> Result<BTreeMap<String, i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<BTreeMap<String, Option<i64>>>::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|(label, votes)| (label, votes.unwrap_or_default()))
        .collect())
}

// The payload id is overwritten later, so anything that is not an integer is 0
fn lenient_id<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Value::deserialize(deserializer)?.as_i64().unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_full_record() {
        let json = r#"{
            "mode": "hhcw",
            "chart": {"100025": 120, "100026": 80, "100027": 33},
            "images": ["https://img/1.jpg", "https://img/3.jpg"],
            "administrasi": {"suara_sah": 233, "suara_total": 240, "suara_tidak_sah": 7,
                             "pemilih_dpt_j": 280, "pemilih_dpt_l": 140, "pemilih_dpt_p": 140},
            "psu": null,
            "ts": "2024-02-20 10:00:00",
            "status_suara": true,
            "status_adm": false,
            "new_field": 5
        }"#;
        let record: ResultRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.id, 0);
        assert_eq!(record.mode, "hhcw");
        assert_eq!(record.tally_total(), 233);
        assert_eq!(record.attachments.len(), 2);
        assert_eq!(record.stats.suara_sah, 233);
        assert_eq!(record.stats.pemilih_dpt_p, 140);
        assert_eq!(record.stats.pengguna_total_j, 0);
        assert!(record.auxiliary.is_null());
        assert!(record.is_accepted());
        assert!(!record.adm_confirmed);
        assert_eq!(record.extra.get("new_field"), Some(&Value::from(5)));
    }

    #[test]
    fn test_nulls_decode_to_defaults() {
        let json = r#"{"mode": null, "chart": null, "images": null, "administrasi": null,
                       "psu": null, "ts": null, "status_suara": false, "status_adm": null}"#;
        let record: ResultRecord = serde_json::from_str(json).unwrap();
        assert!(record.tally.is_empty());
        assert!(record.attachments.is_empty());
        assert_eq!(record.stats, BallotStats::default());
        assert!(record.timestamp.is_empty());
        assert!(!record.is_accepted());
    }

    #[test]
    fn test_untrusted_id_does_not_fail_decode() {
        for id in ["null", "\"TPS-1\"", "1.5", "{}"] {
            let json = format!(r#"{{"id": {}, "chart": {{"A": 1}}, "status_suara": true}}"#, id);
            let record: ResultRecord = serde_json::from_str(&json).unwrap();
            assert_eq!(record.id, 0, "id {}", id);
            assert!(record.is_accepted());
        }

        let record: ResultRecord = serde_json::from_str(r#"{"id": 77}"#).unwrap();
        assert_eq!(record.id, 77);
    }

    #[test]
    fn test_null_counters_and_votes_read_as_zero() {
        let json = r#"{
            "chart": {"A": 12, "B": null},
            "administrasi": {"suara_sah": null, "suara_total": 12, "pengguna_dpt_j": null},
            "status_suara": true
        }"#;
        let record: ResultRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.tally.len(), 2);
        assert_eq!(record.tally["B"], 0);
        assert_eq!(record.tally_total(), 12);
        assert_eq!(record.stats.suara_sah, 0);
        assert_eq!(record.stats.suara_total, 12);
        assert_eq!(record.stats.pengguna_dpt_j, 0);
        assert!(record.is_accepted());
    }

    #[test]
    fn test_decode_rejects_wrong_shape() {
        let result = serde_json::from_str::<ResultRecord>(r#"{"chart": [1, 2]}"#);
        assert!(result.is_err());
    }
}
