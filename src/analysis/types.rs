//! Verdict types returned by the analysis capability
//!
//! These mirror the remote capability's JSON schema (camelCase fields, enum
//! values with their human-readable spellings). Validation happens once at
//! this trust boundary; the risk tier and confidence label are preserved as
//! given, never recomputed locally.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Acoustic-feature tags the capability may detect (fixed vocabulary)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Indicator {
    #[serde(rename = "Vocal Tremor")]
    VocalTremor,
    #[serde(rename = "Hypophonia (Softness)")]
    Hypophonia,
    #[serde(rename = "Monotone Pitch")]
    MonotonePitch,
    #[serde(rename = "Dysarthria (Slurred Speech)")]
    Dysarthria,
    #[serde(rename = "Bradykinesia in Speech (Slow Rate)")]
    Bradykinesia,
}

/// Ordinal risk tier derived by the analyzer from the indicator count
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskLevel {
    #[serde(rename = "Level 0")]
    None,
    #[serde(rename = "Level 1")]
    Few,
    #[serde(rename = "Level 2")]
    Multiple,
}

impl RiskLevel {
    /// The tier the analyzer is expected to assign for a given indicator count
    /// (0 / 1-2 / 3+)
    pub fn expected_for(indicator_count: usize) -> Self {
        match indicator_count {
            0 => RiskLevel::None,
            1 | 2 => RiskLevel::Few,
            _ => RiskLevel::Multiple,
        }
    }
}

/// Advisory confidence label, authoritative as given by the analyzer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

/// Structured verdict from the analysis capability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub indicators: Vec<Indicator>,
    pub risk_level: RiskLevel,
    pub summary: String,
    pub confidence_score: u8,
    pub confidence_level: ConfidenceLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comparison_with_history: Option<String>,
}

/// Structural violations detected when ingesting a verdict
#[derive(Debug, Error)]
pub enum VerdictError {
    #[error("confidenceScore {0} is outside [0,100]")]
    ScoreOutOfRange(u8),

    #[error("duplicate indicator: {0:?}")]
    DuplicateIndicator(Indicator),

    #[error("riskLevel {given:?} inconsistent with {indicator_count} indicator(s)")]
    RiskLevelMismatch {
        given: RiskLevel,
        indicator_count: usize,
    },
}

impl AnalysisResult {
    /// Cross-field validation performed once when a verdict enters the system
    pub fn validate(&self) -> Result<(), VerdictError> {
        if self.confidence_score > 100 {
            return Err(VerdictError::ScoreOutOfRange(self.confidence_score));
        }

        for (i, indicator) in self.indicators.iter().enumerate() {
            if self.indicators[..i].contains(indicator) {
                return Err(VerdictError::DuplicateIndicator(*indicator));
            }
        }

        let expected = RiskLevel::expected_for(self.indicators.len());
        if self.risk_level != expected {
            return Err(VerdictError::RiskLevelMismatch {
                given: self.risk_level,
                indicator_count: self.indicators.len(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verdict(indicators: Vec<Indicator>, risk_level: RiskLevel, score: u8) -> AnalysisResult {
        AnalysisResult {
            indicators,
            risk_level,
            summary: "test".to_string(),
            confidence_score: score,
            confidence_level: ConfidenceLevel::Low,
            comparison_with_history: None,
        }
    }

    #[test]
    fn test_expected_risk_tiers() {
        assert_eq!(RiskLevel::expected_for(0), RiskLevel::None);
        assert_eq!(RiskLevel::expected_for(1), RiskLevel::Few);
        assert_eq!(RiskLevel::expected_for(2), RiskLevel::Few);
        assert_eq!(RiskLevel::expected_for(3), RiskLevel::Multiple);
        assert_eq!(RiskLevel::expected_for(5), RiskLevel::Multiple);
    }

    #[test]
    fn test_validate_accepts_consistent_verdict() {
        let v = verdict(vec![Indicator::VocalTremor], RiskLevel::Few, 55);
        assert!(v.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_score_out_of_range() {
        let v = verdict(vec![], RiskLevel::None, 150);
        assert!(matches!(
            v.validate().unwrap_err(),
            VerdictError::ScoreOutOfRange(150)
        ));
    }

    #[test]
    fn test_validate_rejects_risk_mismatch() {
        let v = verdict(vec![], RiskLevel::Multiple, 20);
        assert!(matches!(
            v.validate().unwrap_err(),
            VerdictError::RiskLevelMismatch { .. }
        ));
    }

    #[test]
    fn test_validate_rejects_duplicate_indicators() {
        let v = verdict(
            vec![Indicator::Hypophonia, Indicator::Hypophonia],
            RiskLevel::Few,
            40,
        );
        assert!(matches!(
            v.validate().unwrap_err(),
            VerdictError::DuplicateIndicator(Indicator::Hypophonia)
        ));
    }

    #[test]
    fn test_wire_format_field_names() {
        let v = verdict(vec![Indicator::MonotonePitch], RiskLevel::Few, 42);
        let json = serde_json::to_value(&v).unwrap();

        assert_eq!(json["riskLevel"], "Level 1");
        assert_eq!(json["confidenceScore"], 42);
        assert_eq!(json["confidenceLevel"], "Low");
        assert_eq!(json["indicators"][0], "Monotone Pitch");
        assert!(json.get("comparisonWithHistory").is_none());
    }

    #[test]
    fn test_unknown_enum_values_fail_deserialization() {
        let json = r#"{
            "indicators": ["Coughing"],
            "riskLevel": "Level 1",
            "summary": "x",
            "confidenceScore": 10,
            "confidenceLevel": "Low"
        }"#;

        assert!(serde_json::from_str::<AnalysisResult>(json).is_err());
    }
}
