//! Pipeline stages and their execution records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Stages in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Prepare,
    Train,
    Predict,
    Report,
    Export,
}

impl Stage {
    pub const ALL: [Self; 5] = [Self::Prepare, Self::Train, Self::Predict, Self::Report, Self::Export];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Prepare => "prepare",
            Self::Train => "train",
            Self::Predict => "predict",
            Self::Report => "report",
            Self::Export => "export",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    Completed,
    Skipped,
}

/// Record of one stage of a finished run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageRecord {
    pub stage: Stage,
    pub status: StageStatus,
    pub started_at: DateTime<Utc>,
    #[serde(with = "duration_millis")]
    pub elapsed: Duration,
    /// Reason a stage was skipped.
    pub note: Option<String>,
}

impl StageRecord {
    #[must_use]
    pub fn completed(stage: Stage, started_at: DateTime<Utc>, elapsed: Duration) -> Self {
        Self { stage, status: StageStatus::Completed, started_at, elapsed, note: None }
    }

    #[must_use]
    pub fn skipped(stage: Stage, reason: impl Into<String>) -> Self {
        Self {
            stage,
            status: StageStatus::Skipped,
            started_at: Utc::now(),
            elapsed: Duration::ZERO,
            note: Some(reason.into()),
        }
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status == StageStatus::Completed
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
