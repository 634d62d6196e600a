use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::domain::AttemptId;
use super::scoring::{AssessmentResult, ReadinessLevel};
use crate::telemetry::{attributes, TelemetrySink};

/// Flattened record handed to the CRM boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionPayload {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub job_title: String,
    pub company: String,
    pub company_size: String,
    pub accept_terms: bool,
    pub score: u32,
    pub max_score: u32,
    pub percentage: u32,
    pub readiness_level: ReadinessLevel,
    /// Keyed by pillar slug.
    pub pillar_scores: BTreeMap<String, u32>,
    pub submitted_at: DateTime<Utc>,
}

impl SubmissionPayload {
    pub fn from_result(
        result: &AssessmentResult,
        submitted_at: DateTime<Utc>,
    ) -> Result<Self, SubmissionFailure> {
        let company = result
            .user_info
            .company
            .as_ref()
            .ok_or(SubmissionFailure::MissingContact)?;
        let contact = result
            .user_info
            .contact
            .as_ref()
            .ok_or(SubmissionFailure::MissingContact)?;

        Ok(Self {
            first_name: contact.first_name.clone(),
            last_name: contact.last_name.clone(),
            email: contact.email.clone(),
            job_title: contact.job_title.clone(),
            company: company.company.clone(),
            company_size: company.company_size.label().to_string(),
            accept_terms: contact.accept_terms,
            score: result.score,
            max_score: result.max_score,
            percentage: result.percentage,
            readiness_level: result.readiness_level,
            pillar_scores: result
                .pillar_scores
                .iter()
                .map(|(pillar, score)| (pillar.slug().to_string(), *score))
                .collect(),
            submitted_at,
        })
    }
}

/// CRM acknowledgement. `ok == false` is a rejection, not a transport error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitAck {
    pub ok: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("crm transport failed: {0}")]
    Transport(String),
    #[error("crm responded with status {0}")]
    Status(u16),
}

/// Outbound contact-capture boundary (HubSpot forms or equivalent).
#[async_trait]
pub trait ResultsSubmitter: Send + Sync {
    async fn submit(&self, payload: &SubmissionPayload) -> Result<SubmitAck, SubmitError>;
}

/// Every way an attempt can fail; all of them land in `SubmitFailed`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmissionFailure {
    #[error("submission rejected by the crm")]
    Rejected,
    #[error("submission transport failed: {0}")]
    Transport(String),
    #[error("submission timed out after {0:?}")]
    TimedOut(Duration),
    #[error("result is missing contact details")]
    MissingContact,
}

impl SubmissionFailure {
    /// Stable failure class for telemetry.
    pub fn class(&self) -> &'static str {
        match self {
            SubmissionFailure::Rejected => "rejected",
            SubmissionFailure::Transport(_) => "transport",
            SubmissionFailure::TimedOut(_) => "timeout",
            SubmissionFailure::MissingContact => "missing_contact",
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            SubmissionFailure::Rejected => {
                "We couldn't save your results. Please check your details and try again."
                    .to_string()
            }
            SubmissionFailure::Transport(_) | SubmissionFailure::TimedOut(_) => {
                "We couldn't reach our servers. Your answers are safe, please try again."
                    .to_string()
            }
            SubmissionFailure::MissingContact => {
                "Your contact details are incomplete. Please fill in every field.".to_string()
            }
        }
    }
}

pub const DEFAULT_SUBMISSION_TIMEOUT: Duration = Duration::from_secs(10);

/// Sends a finalized result to the CRM boundary with a client-side timeout and
/// reports every attempt to telemetry without contact details.
pub struct SubmissionPipeline<S, T> {
    submitter: Arc<S>,
    telemetry: Arc<T>,
    timeout: Duration,
}

impl<S, T> SubmissionPipeline<S, T>
where
    S: ResultsSubmitter + 'static,
    T: TelemetrySink + 'static,
{
    pub fn new(submitter: Arc<S>, telemetry: Arc<T>, timeout: Duration) -> Self {
        Self {
            submitter,
            telemetry,
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn submit(
        &self,
        attempt_id: &AttemptId,
        attempt: u32,
        result: &AssessmentResult,
    ) -> Result<(), SubmissionFailure> {
        let started = Instant::now();
        let outcome = self.dispatch(result).await;
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let mut attrs = attributes([
            ("attempt_id", attempt_id.to_string()),
            ("attempt", attempt.to_string()),
            ("percentage", result.percentage.to_string()),
            ("readiness_level", result.readiness_level.slug().to_string()),
            ("elapsed_ms", elapsed_ms.to_string()),
        ]);
        if let Some(company) = &result.user_info.company {
            attrs.insert(
                "company_size".to_string(),
                company.company_size.label().to_string(),
            );
        }

        match &outcome {
            Ok(()) => {
                info!(%attempt_id, attempt, elapsed_ms, "assessment results submitted");
                attrs.insert("outcome".to_string(), "accepted".to_string());
                self.telemetry
                    .record("assessment.submission.accepted", attrs);
            }
            Err(failure) => {
                warn!(
                    %attempt_id,
                    attempt,
                    elapsed_ms,
                    error_class = failure.class(),
                    "assessment results submission failed"
                );
                attrs.insert("outcome".to_string(), "failed".to_string());
                attrs.insert("error_class".to_string(), failure.class().to_string());
                self.telemetry.record("assessment.submission.failed", attrs);
            }
        }

        outcome
    }

    async fn dispatch(&self, result: &AssessmentResult) -> Result<(), SubmissionFailure> {
        let payload = SubmissionPayload::from_result(result, Utc::now())?;

        match tokio::time::timeout(self.timeout, self.submitter.submit(&payload)).await {
            Ok(Ok(SubmitAck { ok: true })) => Ok(()),
            Ok(Ok(SubmitAck { ok: false })) => Err(SubmissionFailure::Rejected),
            Ok(Err(error)) => Err(SubmissionFailure::Transport(error.to_string())),
            Err(_) => Err(SubmissionFailure::TimedOut(self.timeout)),
        }
    }
}
