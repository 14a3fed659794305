use riskmon::detector::{classify, risk_score, score, Bottleneck, RecommendationTier};

#[test]
fn test_risk_score_weights() {
    // 0.6 * 50 + 0.3 * (200 / 100) + 0.1 * (30 / 10)
    let expected = 30.0 + 0.6 + 0.3;
    assert!((risk_score(50.0, 200.0, 30) - expected).abs() < 1e-9);
    assert_eq!(risk_score(0.0, 0.0, 0), 0.0);
}

#[test]
fn test_risk_score_is_clamped() {
    assert_eq!(risk_score(100.0, 1_000_000.0, 10_000), 100.0);
    assert_eq!(risk_score(-50.0, 0.0, 0), 0.0);
    assert_eq!(risk_score(f64::NAN, 0.0, 0), 0.0);
}

#[test]
fn test_risk_score_monotonic_in_cpu_and_memory() {
    let mut previous = risk_score(0.0, 64.0, 8);
    for cpu in 1..=100 {
        let current = risk_score(cpu as f64, 64.0, 8);
        assert!(current >= previous);
        previous = current;
    }
    let mut previous = risk_score(40.0, 0.0, 8);
    for mb in (0..50_000).step_by(250) {
        let current = risk_score(40.0, mb as f64, 8);
        assert!(current >= previous);
        previous = current;
    }
}

#[test]
fn test_bottleneck_rule_order() {
    assert_eq!(classify(60.0, 200.0, 50), Bottleneck::Cpu);
    assert_eq!(classify(50.0, 200.0, 50), Bottleneck::Memory);
    assert_eq!(classify(10.0, 100.0, 21), Bottleneck::Threads);
    assert_eq!(classify(10.0, 100.0, 20), Bottleneck::None);
}

#[test]
fn test_tier_thresholds() {
    assert_eq!(RecommendationTier::from_score(70.0), RecommendationTier::Medium);
    assert_eq!(RecommendationTier::from_score(70.1), RecommendationTier::High);
    assert_eq!(RecommendationTier::from_score(40.0), RecommendationTier::Normal);
    assert_eq!(RecommendationTier::from_score(40.5), RecommendationTier::Medium);
}

#[test]
fn test_score_builds_assessment() {
    let assessment = score(99, "stress", 100.0, 512.0, 4);
    assert_eq!(assessment.pid, 99);
    assert_eq!(assessment.name, "stress");
    assert_eq!(assessment.bottleneck, Bottleneck::Cpu);
    assert!(assessment.risk_score > 60.0 && assessment.risk_score <= 100.0);
    assert_eq!(assessment.tier, RecommendationTier::Medium);

    let idle = score(1, "init", 0.0, 12.0, 1);
    assert_eq!(idle.bottleneck, Bottleneck::None);
    assert_eq!(idle.tier, RecommendationTier::Normal);
}
