use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info, warn};

use super::domain::{AnswerInput, AssessmentPhase, AttemptId};
use super::engine::{
    AssessmentEngine, EngineError, EngineSnapshot, InvalidStepError, SubmissionStart,
};
use super::scoring::AssessmentResult;
use super::service::SUBMITTED_RETENTION;
use super::submission::{ResultsSubmitter, SubmissionPipeline};
use super::validation::{CompanyForm, ContactForm};
use super::views::AssessmentView;
use crate::telemetry::{attributes, TelemetrySink};

/// Terminal status of a `submit_results` intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubmitStatus {
    Submitted,
    Failed { message: String },
    /// Another submission was already in flight; nothing was sent.
    AlreadyInFlight,
}

/// One assessment attempt: the engine behind a lock plus its submission pipeline.
///
/// Intents are applied synchronously under the lock. The lock is released while
/// the CRM call is outstanding so the attempt stays readable.
pub struct AssessmentSession<S, T> {
    id: AttemptId,
    engine: Mutex<AssessmentEngine>,
    last_active: Mutex<Instant>,
    pipeline: SubmissionPipeline<S, T>,
    telemetry: Arc<T>,
}

impl<S, T> AssessmentSession<S, T>
where
    S: ResultsSubmitter + 'static,
    T: TelemetrySink + 'static,
{
    pub fn new(
        id: AttemptId,
        engine: AssessmentEngine,
        pipeline: SubmissionPipeline<S, T>,
        telemetry: Arc<T>,
    ) -> Self {
        Self {
            id,
            engine: Mutex::new(engine),
            last_active: Mutex::new(Instant::now()),
            pipeline,
            telemetry,
        }
    }

    pub fn id(&self) -> &AttemptId {
        &self.id
    }

    /// Lock the engine and mark the attempt as active.
    fn engine(&self) -> MutexGuard<'_, AssessmentEngine> {
        *self
            .last_active
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Instant::now();
        self.lock_engine()
    }

    fn lock_engine(&self) -> MutexGuard<'_, AssessmentEngine> {
        self.engine.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn last_active(&self) -> Instant {
        *self
            .last_active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn is_submitting(&self) -> bool {
        self.lock_engine().phase() == AssessmentPhase::Submitting
    }

    /// Whether the attempt is abandoned or has been submitted long enough ago.
    pub(crate) fn is_expired(&self, now: Instant, idle_ttl: Duration) -> bool {
        let idle = now.saturating_duration_since(self.last_active());
        match self.lock_engine().phase() {
            AssessmentPhase::Submitting => false,
            AssessmentPhase::Submitted => idle >= SUBMITTED_RETENTION.min(idle_ttl),
            _ => idle >= idle_ttl,
        }
    }

    pub fn view(&self) -> AssessmentView {
        AssessmentView::from_engine(&self.id, &self.engine())
    }

    pub fn phase(&self) -> AssessmentPhase {
        self.engine().phase()
    }

    pub fn result(&self) -> Option<AssessmentResult> {
        self.engine().result().cloned()
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        self.engine().snapshot()
    }

    pub fn inspect<R>(&self, read: impl FnOnce(&AssessmentEngine) -> R) -> R {
        read(&*self.engine())
    }

    fn apply(
        &self,
        intent: &'static str,
        update: impl FnOnce(&mut AssessmentEngine) -> Result<(), EngineError>,
    ) -> Result<AssessmentView, EngineError> {
        let mut engine = self.engine();
        let before = engine.phase();
        let outcome = update(&mut *engine);
        let after = engine.phase();

        match &outcome {
            Ok(()) if before != after => {
                debug!(attempt_id = %self.id, intent, from = %before, to = %after, "phase transition");
                self.telemetry.record(
                    "assessment.phase_changed",
                    attributes([
                        ("attempt_id", self.id.to_string()),
                        ("from", before.label().to_string()),
                        ("to", after.label().to_string()),
                    ]),
                );
            }
            Err(EngineError::InvalidStep(anomaly)) => self.report_anomaly(anomaly),
            Err(error) if error.is_validation() => {
                debug!(attempt_id = %self.id, intent, %error, "intent rejected by validation");
            }
            _ => {}
        }

        outcome.map(|()| AssessmentView::from_engine(&self.id, &engine))
    }

    pub(crate) fn report_anomaly(&self, anomaly: &InvalidStepError) {
        warn!(attempt_id = %self.id, %anomaly, "assessment state reset after invalid step");
        self.telemetry.record(
            "assessment.state.invalid_step",
            attributes([
                ("attempt_id", self.id.to_string()),
                ("phase", anomaly.phase.label().to_string()),
                ("step", anomaly.step.to_string()),
                ("question_count", anomaly.question_count.to_string()),
            ]),
        );
    }

    pub fn submit_user_info(&self, form: &CompanyForm) -> Result<AssessmentView, EngineError> {
        self.apply("submit_user_info", |engine| engine.submit_user_info(form))
    }

    pub fn submit_answer(&self, input: &AnswerInput) -> Result<AssessmentView, EngineError> {
        self.apply("submit_answer", |engine| engine.submit_answer(input))
    }

    pub fn go_previous(&self) -> Result<AssessmentView, EngineError> {
        self.apply("go_previous", AssessmentEngine::go_previous)
    }

    pub fn set_test_mode(&self, enabled: bool) -> Result<AssessmentView, EngineError> {
        self.apply("set_test_mode", |engine| engine.set_test_mode(enabled))
    }

    pub fn apply_test_shortcut(&self) -> Result<AssessmentView, EngineError> {
        self.apply("apply_test_shortcut", AssessmentEngine::apply_test_shortcut)
    }

    pub fn reset(&self) -> Result<AssessmentView, EngineError> {
        self.apply("reset", AssessmentEngine::reset)
    }

    /// Validate contact details and send the result to the CRM.
    ///
    /// Validation errors return `Err` without a transition. Submission failures
    /// never surface as errors: they resolve to [`SubmitStatus::Failed`].
    pub async fn submit_results(&self, form: &ContactForm) -> Result<SubmitStatus, EngineError> {
        let ticket = {
            let mut engine = self.engine();
            match engine.begin_submission(form) {
                Ok(SubmissionStart::Ready(ticket)) => ticket,
                Ok(SubmissionStart::AlreadyInFlight) => {
                    debug!(attempt_id = %self.id, "duplicate submission ignored");
                    return Ok(SubmitStatus::AlreadyInFlight);
                }
                Err(error) => return Err(error),
            }
        };

        info!(attempt_id = %self.id, attempt = ticket.attempt, "submitting assessment results");
        let outcome = self
            .pipeline
            .submit(&self.id, ticket.attempt, &ticket.result)
            .await;

        let status = match &outcome {
            Ok(()) => SubmitStatus::Submitted,
            Err(failure) => SubmitStatus::Failed {
                message: failure.user_message(),
            },
        };

        let applied = self.engine().complete_submission(ticket.attempt, outcome);
        if !applied {
            warn!(attempt_id = %self.id, attempt = ticket.attempt, "stale submission outcome discarded");
        }

        Ok(status)
    }
}
