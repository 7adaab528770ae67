use std::fmt;
use serde::Serialize;

/// Quality tier shown next to a prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConfidenceTier {
    High,
    Medium,
    Low,
}

impl ConfidenceTier {
    /// Maps a confidence in `[0, 1]` to its tier: at least 80% is High, at least 60% Medium.
    ///
    /// Values outside `[0, 1]` are a caller error and get whatever tier the thresholds give.
    pub fn from_confidence(confidence: f32) -> Self {
        let percent = confidence * 100.0;
        if percent >= 80.0 {
            Self::High
        } else if percent >= 60.0 {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn status(&self) -> &'static str {
        match self {
            Self::High => "High Confidence",
            Self::Medium => "Medium Confidence",
            Self::Low => "Low Confidence, review manually",
        }
    }

    /// Low-confidence predictions should be checked by a person before routing.
    pub fn needs_review(&self) -> bool {
        *self == Self::Low
    }
}

impl fmt::Display for ConfidenceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.status())
    }
}

/// Tier for `confidence`. See [`ConfidenceTier::from_confidence`].
pub fn tier_for(confidence: f32) -> ConfidenceTier {
    ConfidenceTier::from_confidence(confidence)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thresholds() {
        assert_eq!(tier_for(0.95), ConfidenceTier::High);
        assert_eq!(tier_for(0.80), ConfidenceTier::High);
        assert_eq!(tier_for(0.79), ConfidenceTier::Medium);
        assert_eq!(tier_for(0.60), ConfidenceTier::Medium);
        assert_eq!(tier_for(0.10), ConfidenceTier::Low);
    }

    #[test]
    fn test_bounds() {
        assert_eq!(tier_for(1.0), ConfidenceTier::High);
        assert_eq!(tier_for(0.0), ConfidenceTier::Low);
        assert_eq!(tier_for(0.599), ConfidenceTier::Low);
    }

    #[test]
    fn test_status_text() {
        assert_eq!(ConfidenceTier::High.to_string(), "High Confidence");
        assert!(ConfidenceTier::Low.needs_review());
        assert!(!ConfidenceTier::Medium.needs_review());
    }
}
