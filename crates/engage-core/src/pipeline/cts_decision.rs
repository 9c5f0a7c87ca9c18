//! Stage 5: combine the upstream scores into a single commitment-to-send
//! decision. Pure arithmetic — no LLM call, no I/O.

use crate::model::{Cts, CtsBreakdown, RiskLevel};

const SIGNAL_WEIGHT: f64 = 0.4;
const RISK_WEIGHT: f64 = 0.3;
const CTA_WEIGHT: f64 = 0.3;

const CTS_AUTO_POST_THRESHOLD: f64 = 0.7;
const MAX_CTA_LEVEL_FOR_AUTO_POST: i32 = 1;

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Compute the CTS score and auto-post decision from the three upstream
/// pipeline outputs.
///
/// `breakdown`'s components are kept at full precision (so they still sum
/// to the pre-rounding score for audit purposes); only the externally
/// visible `cts_score` is rounded to 2 decimals, per spec §4.5/§8-P2.
pub fn run(signal_confidence: f64, risk_level: RiskLevel, risk_score: f64, cta_level: i32) -> Cts {
    let signal_component = signal_confidence.clamp(0.0, 1.0) * SIGNAL_WEIGHT;
    let risk_component = (1.0 - risk_score.clamp(0.0, 1.0)) * RISK_WEIGHT;
    let cta_component = (1.0 - (f64::from(cta_level.clamp(0, 3)) / 3.0)) * CTA_WEIGHT;

    let raw_score = signal_component + risk_component + cta_component;
    let cts_score = round2(raw_score);

    let mut reasons_against = Vec::new();
    if cts_score < CTS_AUTO_POST_THRESHOLD {
        reasons_against.push(format!(
            "CTS score ({cts_score:.2}) below {CTS_AUTO_POST_THRESHOLD} threshold"
        ));
    }
    if risk_level != RiskLevel::Low {
        reasons_against.push(format!("Risk level is '{risk_level}' (must be 'low')"));
    }
    if cta_level > MAX_CTA_LEVEL_FOR_AUTO_POST {
        reasons_against.push(format!(
            "CTA level ({cta_level}) exceeds maximum ({MAX_CTA_LEVEL_FOR_AUTO_POST})"
        ));
    }

    let can_auto_post = reasons_against.is_empty();
    let auto_post_reason = if can_auto_post {
        format!(
            "CTS score ({cts_score:.2}) meets threshold, risk is low, and CTA level ({cta_level}) is acceptable."
        )
    } else {
        format!("{}.", reasons_against.join("; "))
    };

    let recommended_action = if can_auto_post {
        "Eligible for automatic posting.".to_string()
    } else {
        "Route to review queue; auto-post criteria not met.".to_string()
    };

    Cts {
        cts_score,
        can_auto_post,
        auto_post_reason,
        breakdown: CtsBreakdown {
            signal_component,
            risk_component,
            cta_component,
        },
        decision_factors: reasons_against,
        recommended_action,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn high_confidence_low_risk_low_cta_is_eligible() {
        let cts = run(0.85, RiskLevel::Low, 0.2, 1);
        assert!(cts.can_auto_post);
        assert!(cts.cts_score >= 0.7);
    }

    #[test]
    fn breakdown_sums_to_unrounded_score() {
        let cts = run(0.85, RiskLevel::Low, 0.2, 1);
        let sum = cts.breakdown.signal_component + cts.breakdown.risk_component + cts.breakdown.cta_component;
        assert!((sum - (cts.cts_score as f64)).abs() < 0.01);
    }

    #[test]
    fn medium_risk_blocks_auto_post() {
        let cts = run(0.9, RiskLevel::Medium, 0.4, 0);
        assert!(!cts.can_auto_post);
        assert!(cts
            .decision_factors
            .iter()
            .any(|f| f.contains("Risk level")));
    }

    #[test]
    fn direct_cta_blocks_auto_post_even_with_high_score() {
        let cts = run(1.0, RiskLevel::Low, 0.0, 3);
        assert!(!cts.can_auto_post);
        assert!(cts.decision_factors.iter().any(|f| f.contains("CTA level")));
    }

    #[test]
    fn low_cts_score_blocks_auto_post() {
        let cts = run(0.1, RiskLevel::Low, 0.5, 0);
        assert!(!cts.can_auto_post);
        assert!(cts.decision_factors.iter().any(|f| f.contains("below")));
    }

    #[test]
    fn score_matches_reference_example() {
        let cts = run(0.85, RiskLevel::Low, 0.2, 1);
        assert_eq!(cts.cts_score, 0.78);
    }
}
