use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::{info, warn};

use super::catalog::QuestionCatalog;
use super::domain::AttemptId;
use super::engine::{AssessmentEngine, EngineSnapshot};
use super::scoring::{ReadinessThresholds, ScoringEngine};
use super::session::AssessmentSession;
use super::submission::{ResultsSubmitter, SubmissionPipeline, DEFAULT_SUBMISSION_TIMEOUT};
use crate::telemetry::{attributes, TelemetrySink};

pub const DEFAULT_IDLE_TTL: Duration = Duration::from_secs(30 * 60);
pub const DEFAULT_MAX_ATTEMPTS: usize = 10_000;
/// How long a submitted attempt stays readable before it is evicted.
pub const SUBMITTED_RETENTION: Duration = Duration::from_secs(60);

/// Tunables applied to every attempt the service starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssessmentSettings {
    pub thresholds: ReadinessThresholds,
    pub submission_timeout: Duration,
    /// Attempts without activity for this long count as abandoned.
    pub idle_ttl: Duration,
    pub max_attempts: usize,
}

impl Default for AssessmentSettings {
    fn default() -> Self {
        Self {
            thresholds: ReadinessThresholds::default(),
            submission_timeout: DEFAULT_SUBMISSION_TIMEOUT,
            idle_ttl: DEFAULT_IDLE_TTL,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AssessmentServiceError {
    #[error("assessment attempt `{0}` not found")]
    NotFound(AttemptId),
}

static ATTEMPT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_attempt_id() -> AttemptId {
    let id = ATTEMPT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    AttemptId(format!("aiq-{id:06}"))
}

type SessionMap<S, T> = HashMap<AttemptId, Arc<AssessmentSession<S, T>>>;

/// Registry of live attempts sharing one catalog, CRM submitter and telemetry sink.
pub struct AssessmentService<S, T> {
    catalog: Arc<QuestionCatalog>,
    scoring: ScoringEngine,
    submitter: Arc<S>,
    telemetry: Arc<T>,
    settings: AssessmentSettings,
    sessions: Mutex<SessionMap<S, T>>,
}

impl<S, T> AssessmentService<S, T>
where
    S: ResultsSubmitter + 'static,
    T: TelemetrySink + 'static,
{
    pub fn new(
        catalog: Arc<QuestionCatalog>,
        submitter: Arc<S>,
        telemetry: Arc<T>,
        settings: AssessmentSettings,
    ) -> Self {
        Self {
            catalog,
            scoring: ScoringEngine::new(settings.thresholds),
            submitter,
            telemetry,
            settings,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn catalog(&self) -> &QuestionCatalog {
        &self.catalog
    }

    pub fn settings(&self) -> &AssessmentSettings {
        &self.settings
    }

    fn sessions(&self) -> MutexGuard<'_, SessionMap<S, T>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn session_for(&self, id: AttemptId, engine: AssessmentEngine) -> Arc<AssessmentSession<S, T>> {
        let pipeline = SubmissionPipeline::new(
            self.submitter.clone(),
            self.telemetry.clone(),
            self.settings.submission_timeout,
        );
        let session = Arc::new(AssessmentSession::new(
            id.clone(),
            engine,
            pipeline,
            self.telemetry.clone(),
        ));

        let mut sessions = self.sessions();
        while sessions.len() >= self.settings.max_attempts.max(1) {
            if !evict_least_recent(&mut sessions) {
                break;
            }
        }
        sessions.insert(id, session.clone());
        session
    }

    /// Drop abandoned attempts and submitted attempts past their retention.
    /// Attempts with a submission in flight are never evicted.
    pub fn sweep(&self, now: Instant) -> usize {
        let idle_ttl = self.settings.idle_ttl;
        let mut sessions = self.sessions();
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired(now, idle_ttl));
        let evicted = before - sessions.len();

        if evicted > 0 {
            info!(evicted, remaining = sessions.len(), "expired assessment attempts evicted");
            self.telemetry.record(
                "assessment.evicted",
                attributes([
                    ("reason", "expired".to_string()),
                    ("count", evicted.to_string()),
                ]),
            );
        }
        evicted
    }

    /// Begin a new attempt in `CollectingUserInfo`.
    pub fn start(&self) -> Arc<AssessmentSession<S, T>> {
        self.sweep(Instant::now());
        let id = next_attempt_id();
        let engine = AssessmentEngine::new(self.catalog.clone(), self.scoring.clone());
        info!(attempt_id = %id, "assessment attempt started");
        self.telemetry.record(
            "assessment.started",
            attributes([("attempt_id", id.to_string())]),
        );
        self.session_for(id, engine)
    }

    /// Register an attempt rebuilt from a persisted snapshot.
    pub fn resume(&self, snapshot: EngineSnapshot) -> Arc<AssessmentSession<S, T>> {
        self.sweep(Instant::now());
        let id = next_attempt_id();
        let restored =
            AssessmentEngine::restore(self.catalog.clone(), self.scoring.clone(), snapshot);
        let phase = restored.engine.phase();
        let session = self.session_for(id.clone(), restored.engine);

        if let Some(anomaly) = &restored.anomaly {
            session.report_anomaly(anomaly);
        }
        info!(attempt_id = %id, %phase, "assessment attempt resumed");
        session
    }

    pub fn get(&self, id: &AttemptId) -> Result<Arc<AssessmentSession<S, T>>, AssessmentServiceError> {
        self.sessions()
            .get(id)
            .cloned()
            .ok_or_else(|| AssessmentServiceError::NotFound(id.clone()))
    }

    /// Drop an attempt, e.g. after it was submitted or abandoned.
    pub fn discard(&self, id: &AttemptId) -> Result<(), AssessmentServiceError> {
        let removed = self.sessions().remove(id);
        match removed {
            Some(session) => {
                info!(attempt_id = %id, phase = %session.phase(), "assessment attempt discarded");
                Ok(())
            }
            None => Err(AssessmentServiceError::NotFound(id.clone())),
        }
    }

    pub fn active_attempts(&self) -> usize {
        self.sessions().len()
    }
}

/// Remove the attempt idle the longest, skipping in-flight submissions.
fn evict_least_recent<S, T>(sessions: &mut SessionMap<S, T>) -> bool
where
    S: ResultsSubmitter + 'static,
    T: TelemetrySink + 'static,
{
    let oldest = sessions
        .iter()
        .filter(|(_, session)| !session.is_submitting())
        .min_by_key(|(_, session)| session.last_active())
        .map(|(id, _)| id.clone());

    match oldest {
        Some(id) => {
            warn!(attempt_id = %id, "attempt limit reached, evicting least recent attempt");
            sessions.remove(&id);
            true
        }
        None => false,
    }
}
