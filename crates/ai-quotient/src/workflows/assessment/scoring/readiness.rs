use serde::{Deserialize, Serialize};

/// Coarse readiness classification derived from the overall percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadinessLevel {
    Low,
    Medium,
    High,
}

impl ReadinessLevel {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "Low readiness",
            Self::Medium => "Medium readiness",
            Self::High => "High readiness",
        }
    }

    pub const fn slug(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    pub const fn summary(self) -> &'static str {
        match self {
            Self::Low => "Foundational gaps in data and process will limit AI initiatives.",
            Self::Medium => "Solid groundwork with clear opportunities to scale AI use cases.",
            Self::High => "Well positioned to operationalize AI across the revenue engine.",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ThresholdError {
    #[error("readiness thresholds must satisfy 0 < medium ({medium}) < high ({high}) <= 100")]
    NotMonotonic { medium: u32, high: u32 },
}

/// Cut points (inclusive lower bounds, in percent) for each readiness level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadinessThresholds {
    medium_from: u32,
    high_from: u32,
}

impl ReadinessThresholds {
    pub const DEFAULT_MEDIUM_FROM: u32 = 40;
    pub const DEFAULT_HIGH_FROM: u32 = 70;

    pub fn new(medium_from: u32, high_from: u32) -> Result<Self, ThresholdError> {
        if medium_from == 0 || medium_from >= high_from || high_from > 100 {
            return Err(ThresholdError::NotMonotonic {
                medium: medium_from,
                high: high_from,
            });
        }

        Ok(Self {
            medium_from,
            high_from,
        })
    }

    pub fn medium_from(&self) -> u32 {
        self.medium_from
    }

    pub fn high_from(&self) -> u32 {
        self.high_from
    }

    pub fn classify(&self, percentage: u32) -> ReadinessLevel {
        if percentage >= self.high_from {
            ReadinessLevel::High
        } else if percentage >= self.medium_from {
            ReadinessLevel::Medium
        } else {
            ReadinessLevel::Low
        }
    }
}

impl Default for ReadinessThresholds {
    fn default() -> Self {
        Self {
            medium_from: Self::DEFAULT_MEDIUM_FROM,
            high_from: Self::DEFAULT_HIGH_FROM,
        }
    }
}
