//! Risk scoring and bottleneck classification

use std::fmt;

const CPU_WEIGHT: f64 = 0.6;
const MEMORY_WEIGHT: f64 = 0.3;
const THREAD_WEIGHT: f64 = 0.1;

const CPU_BOTTLENECK_PERCENT: f64 = 50.0;
const MEMORY_BOTTLENECK_MB: f64 = 100.0;
const THREAD_BOTTLENECK_COUNT: u32 = 20;

pub const HIGH_RISK_THRESHOLD: f64 = 70.0;
pub const MEDIUM_RISK_THRESHOLD: f64 = 40.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bottleneck {
    Cpu,
    Memory,
    Threads,
    None,
}

impl Bottleneck {
    pub fn as_str(&self) -> &'static str {
        match self {
            Bottleneck::Cpu => "CPU",
            Bottleneck::Memory => "Memory",
            Bottleneck::Threads => "Threads",
            Bottleneck::None => "None",
        }
    }
}

impl fmt::Display for Bottleneck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RecommendationTier {
    Normal,
    Medium,
    High,
}

impl RecommendationTier {
    pub fn from_score(risk_score: f64) -> Self {
        if risk_score > HIGH_RISK_THRESHOLD {
            RecommendationTier::High
        } else if risk_score > MEDIUM_RISK_THRESHOLD {
            RecommendationTier::Medium
        } else {
            RecommendationTier::Normal
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendationTier::Normal => "normal",
            RecommendationTier::Medium => "medium",
            RecommendationTier::High => "high",
        }
    }
}

impl fmt::Display for RecommendationTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RiskAssessment {
    pub pid: u32,
    pub name: String,
    /// In [0, 100].
    pub risk_score: f64,
    pub bottleneck: Bottleneck,
    pub tier: RecommendationTier,
}

/// Weighted sum of CPU percent (60%), memory in hundreds of MB (30%) and
/// thread count in tens (10%), clamped to [0, 100].
pub fn risk_score(cpu_percent: f64, memory_mb: f64, thread_count: u32) -> f64 {
    let score = cpu_percent * CPU_WEIGHT
        + (memory_mb / 100.0) * MEMORY_WEIGHT
        + (thread_count as f64 / 10.0) * THREAD_WEIGHT;
    if score.is_nan() {
        return 0.0;
    }
    score.clamp(0.0, 100.0)
}

/// First matching rule wins: CPU, then memory, then threads.
pub fn classify(cpu_percent: f64, memory_mb: f64, thread_count: u32) -> Bottleneck {
    if cpu_percent > CPU_BOTTLENECK_PERCENT {
        Bottleneck::Cpu
    } else if memory_mb > MEMORY_BOTTLENECK_MB {
        Bottleneck::Memory
    } else if thread_count > THREAD_BOTTLENECK_COUNT {
        Bottleneck::Threads
    } else {
        Bottleneck::None
    }
}

pub fn score(pid: u32, name: &str, cpu_percent: f64, memory_mb: f64, thread_count: u32) -> RiskAssessment {
    let risk_score = risk_score(cpu_percent, memory_mb, thread_count);
    RiskAssessment {
        pid,
        name: name.to_string(),
        risk_score,
        bottleneck: classify(cpu_percent, memory_mb, thread_count),
        tier: RecommendationTier::from_score(risk_score),
    }
}
