//! Error types for the onboarding flow.

use crate::onboarding::Stage;
use crate::onboarding::forms::FormField;

fn join<T: std::fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, thiserror::Error)]
pub enum OnboardingError {
    /// The form is missing required fields (or they did not parse).
    #[error("{stage} cannot continue: missing or invalid {}", join(.missing))]
    Invalid {
        stage: Stage,
        missing: Vec<FormField>,
    },

    #[error("{stage} is locked until {missing_stage} is finished")]
    StageLocked { stage: Stage, missing_stage: Stage },

    #[error("expected a submission for {current}, got {submitted}")]
    WrongStage { current: Stage, submitted: Stage },

    #[error("{0} cannot be skipped")]
    NotSkippable(Stage),

    #[error("onboarding is incomplete: {} still required", join(.missing))]
    Incomplete { missing: Vec<Stage> },

    /// The stored profile could not be turned into targets (e.g. a fragment was
    /// edited outside the flow and no longer parses).
    #[error("stored profile is not computable")]
    NotComputable,

    /// The profile store failed. Nothing after the failed write was applied; the
    /// caller may retry or abort.
    #[error("profile store failed")]
    Store(#[from] anyhow::Error),

    #[error("failed to encode stage record")]
    Encode(#[from] serde_json::Error),
}

impl OnboardingError {
    /// Whether retrying the same operation could succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Store(_))
    }
}
