//! Monitoring receipts: immutable, hash-addressed evidence of one cycle.
//!
//! The content hash is lower-hex SHA-256 over the canonical JSON payload.
//! Evidence (mirror URL and proof) is attached after hashing and is not
//! part of the payload.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::drift::DriftReading;
use super::id::{ModelId, ReceiptId};
use crate::error::{Error, Result};

/// Where a durable copy of the receipt lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptEvidence {
    pub url: String,
    pub proof: Option<String>,
    /// False when `url` is the locally derived fallback.
    pub mirrored: bool,
}

/// Raw response from a monitoring endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub metrics: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_quality: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_drift: Option<serde_json::Value>,
}

/// One monitoring cycle's measurement of a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitoringReceipt {
    pub id: ReceiptId,
    pub model_id: ModelId,
    pub metrics: BTreeMap<String, f64>,
    pub drift_percentage: f64,
    pub drift_detected: bool,
    pub threshold_percent: f64,
    pub comparable_metrics: u32,
    pub low_confidence: bool,
    pub data_quality: Option<serde_json::Value>,
    pub feature_drift: Option<serde_json::Value>,
    pub recorded_at: DateTime<Utc>,
    pub content_hash: String,
    pub evidence: Option<ReceiptEvidence>,
}

/// Hashed fields, in a fixed order.
#[derive(Serialize)]
struct Payload<'a> {
    id: &'a str,
    model_id: &'a str,
    metrics: &'a BTreeMap<String, f64>,
    drift_percentage: f64,
    drift_detected: bool,
    threshold_percent: f64,
    comparable_metrics: u32,
    low_confidence: bool,
    data_quality: &'a Option<serde_json::Value>,
    feature_drift: &'a Option<serde_json::Value>,
    recorded_at: String,
}

impl MonitoringReceipt {
    /// Build and hash a receipt for a fresh reading.
    pub fn record(
        model_id: ModelId,
        snapshot: MetricsSnapshot,
        reading: DriftReading,
        threshold_percent: f64,
        recorded_at: DateTime<Utc>,
    ) -> Result<Self> {
        let mut receipt = Self {
            id: ReceiptId::generate(),
            model_id,
            metrics: snapshot.metrics,
            drift_percentage: reading.drift_percentage,
            drift_detected: reading.exceeds(threshold_percent),
            threshold_percent,
            comparable_metrics: reading.comparable_metrics,
            low_confidence: reading.is_low_confidence(),
            data_quality: snapshot.data_quality,
            feature_drift: snapshot.feature_drift,
            recorded_at,
            content_hash: String::new(),
            evidence: None,
        };
        receipt.content_hash = receipt.compute_hash()?;
        Ok(receipt)
    }

    /// Canonical bytes that the content hash covers.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>> {
        let payload = Payload {
            id: self.id.as_str(),
            model_id: self.model_id.as_str(),
            metrics: &self.metrics,
            drift_percentage: self.drift_percentage,
            drift_detected: self.drift_detected,
            threshold_percent: self.threshold_percent,
            comparable_metrics: self.comparable_metrics,
            low_confidence: self.low_confidence,
            data_quality: &self.data_quality,
            feature_drift: &self.feature_drift,
            recorded_at: self
                .recorded_at
                .to_rfc3339_opts(SecondsFormat::Nanos, true),
        };
        Ok(serde_json::to_vec(&payload)?)
    }

    /// Recompute the content hash from the current fields.
    pub fn compute_hash(&self) -> Result<String> {
        Ok(sha256_hex(&self.canonical_bytes()?))
    }

    /// Check that the stored hash still matches the fields.
    ///
    /// # Errors
    ///
    /// `DataIntegrity` on mismatch.
    pub fn verify(&self) -> Result<()> {
        let actual = self.compute_hash()?;
        if actual != self.content_hash {
            return Err(Error::DataIntegrity(format!(
                "receipt {} hash mismatch: stored {}, computed {}",
                self.id, self.content_hash, actual
            )));
        }
        Ok(())
    }

    /// Check a downstream copy of the canonical bytes against this receipt.
    ///
    /// # Errors
    ///
    /// `DataIntegrity` when the copy hashes differently.
    pub fn verify_copy(&self, bytes: &[u8]) -> Result<()> {
        let actual = sha256_hex(bytes);
        if actual != self.content_hash {
            return Err(Error::DataIntegrity(format!(
                "copy of receipt {} hashes to {}, expected {}",
                self.id, actual, self.content_hash
            )));
        }
        Ok(())
    }

    /// Hash-addressed reference used when the mirror is unavailable.
    #[must_use]
    pub fn fallback_url(&self, base_url: &str) -> String {
        format!("{}/{}.json", base_url.trim_end_matches('/'), self.content_hash)
    }
}

/// Lower-hex SHA-256 digest.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::drift::compute_drift;

    fn receipt() -> MonitoringReceipt {
        let baseline: BTreeMap<String, f64> = [("accuracy".to_string(), 0.9)].into();
        let snapshot = MetricsSnapshot {
            metrics: [("accuracy".to_string(), 0.8)].into(),
            data_quality: Some(serde_json::json!({"missing_rate": 0.01})),
            feature_drift: None,
        };
        let reading = compute_drift(&baseline, &snapshot.metrics);
        MonitoringReceipt::record(ModelId::from("model"), snapshot, reading, 5.0, Utc::now())
            .unwrap()
    }

    #[test]
    fn records_detection_and_valid_hash() {
        let r = receipt();
        assert!(r.drift_detected);
        assert!(!r.low_confidence);
        assert_eq!(r.content_hash.len(), 64);
        r.verify().unwrap();
    }

    #[test]
    fn tampering_is_detected() {
        let mut r = receipt();
        r.drift_percentage = 0.0;
        assert!(matches!(r.verify(), Err(Error::DataIntegrity(_))));
    }

    #[test]
    fn evidence_is_outside_the_hash() {
        let mut r = receipt();
        r.evidence = Some(ReceiptEvidence {
            url: "https://mirror.example/x".into(),
            proof: None,
            mirrored: true,
        });
        r.verify().unwrap();
    }

    #[test]
    fn verify_copy_checks_bytes() {
        let r = receipt();
        let bytes = r.canonical_bytes().unwrap();
        r.verify_copy(&bytes).unwrap();
        let mut tampered = bytes.clone();
        tampered.push(b' ');
        assert!(matches!(
            r.verify_copy(&tampered),
            Err(Error::DataIntegrity(_))
        ));
    }

    #[test]
    fn fallback_url_is_hash_addressed() {
        let r = receipt();
        assert_eq!(
            r.fallback_url("https://shdw-drive.genesysgo.net/receipts/"),
            format!("https://shdw-drive.genesysgo.net/receipts/{}.json", r.content_hash)
        );
    }

    #[test]
    fn snapshot_parses_camel_case_extras() {
        let json = r#"{"metrics":{"auc":0.7},"dataQuality":{"rows":10},"featureDrift":{"age":0.2}}"#;
        let snapshot: MetricsSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.metrics["auc"], 0.7);
        assert!(snapshot.data_quality.is_some());
        assert!(snapshot.feature_drift.is_some());
    }
}
