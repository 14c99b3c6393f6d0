//! Confidence arithmetic shared by the normaliser, synthesis and scoring.

/// Confidence assigned to a claim whose extractor gave none.
pub const DEFAULT_CONFIDENCE: f64 = 0.3;

/// Clamp a confidence into [0.0, 1.0]. Missing or non-finite values
/// become `default`.
pub fn clamp_confidence(value: Option<f64>, default: f64) -> f64 {
    match value {
        Some(v) if v.is_finite() => v.clamp(0.0, 1.0),
        _ => default.clamp(0.0, 1.0),
    }
}

/// Arithmetic mean, 0.0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Handle contradictory evidence: compute net confidence
/// and apply contradiction penalty (×0.70).
/// signed_confidences: positive = supporting, negative = contradicting
pub fn contradictory_confidence(signed_confidences: &[f64]) -> f64 {
    let net: f64 = signed_confidences.iter().sum::<f64>().abs();
    (net * 0.70).min(1.0)
}

/// Round to 4 decimal places for reporting.
pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_out_of_range() {
        assert_eq!(clamp_confidence(Some(1.7), DEFAULT_CONFIDENCE), 1.0);
        assert_eq!(clamp_confidence(Some(-0.2), DEFAULT_CONFIDENCE), 0.0);
        assert_eq!(clamp_confidence(Some(0.42), DEFAULT_CONFIDENCE), 0.42);
    }

    #[test]
    fn test_missing_and_nan_use_default() {
        assert_eq!(clamp_confidence(None, DEFAULT_CONFIDENCE), 0.3);
        assert_eq!(clamp_confidence(Some(f64::NAN), DEFAULT_CONFIDENCE), 0.3);
        assert_eq!(clamp_confidence(Some(f64::INFINITY), DEFAULT_CONFIDENCE), 0.3);
    }

    #[test]
    fn test_mean_empty_is_zero() {
        assert_eq!(mean(&[]), 0.0);
        assert!((mean(&[0.9, 0.85]) - 0.875).abs() < 1e-9);
    }

    #[test]
    fn test_contradiction_penalty() {
        let net = contradictory_confidence(&[0.9, -0.5]);
        assert!((net - 0.28).abs() < 1e-9);
    }

    #[test]
    fn test_round4() {
        assert_eq!(round4(0.123456), 0.1235);
    }
}
