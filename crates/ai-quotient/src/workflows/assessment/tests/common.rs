use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::response::Response;
use serde_json::Value;
use tokio::sync::Notify;

use crate::telemetry::{Attributes, TelemetrySink};
use crate::workflows::assessment::catalog::{
    AnswerOption, PillarSection, PillarType, Question, QuestionCatalog,
};
use crate::workflows::assessment::domain::AnswerInput;
use crate::workflows::assessment::engine::AssessmentEngine;
use crate::workflows::assessment::scoring::ScoringEngine;
use crate::workflows::assessment::service::{AssessmentService, AssessmentSettings};
use crate::workflows::assessment::submission::{
    ResultsSubmitter, SubmissionPayload, SubmitAck, SubmitError,
};
use crate::workflows::assessment::validation::{CompanyForm, ContactForm};

fn question(pillar: PillarType, id: &str) -> Question {
    Question {
        id: id.to_string(),
        pillar,
        prompt: format!("How mature is {id}?"),
        options: (1..=4)
            .map(|value| AnswerOption {
                id: format!("{id}-{value}"),
                text: format!("Level {value}"),
                value,
            })
            .collect(),
    }
}

/// Two pillars of two questions each, option values 1..=4.
pub(super) fn small_catalog() -> Arc<QuestionCatalog> {
    let sections = vec![
        PillarSection {
            pillar: PillarType::DataSpineHealth,
            questions: vec![
                question(PillarType::DataSpineHealth, "data-1"),
                question(PillarType::DataSpineHealth, "data-2"),
            ],
        },
        PillarSection {
            pillar: PillarType::FunnelIntelligence,
            questions: vec![
                question(PillarType::FunnelIntelligence, "funnel-1"),
                question(PillarType::FunnelIntelligence, "funnel-2"),
            ],
        },
    ];
    Arc::new(QuestionCatalog::new(sections).expect("fixture catalog is valid"))
}

pub(super) fn engine() -> AssessmentEngine {
    AssessmentEngine::new(small_catalog(), ScoringEngine::default())
}

pub(super) fn answer(question_id: &str, value: u32) -> AnswerInput {
    AnswerInput {
        question_id: question_id.to_string(),
        option_id: format!("{question_id}-{value}"),
    }
}

pub(super) fn company_form() -> CompanyForm {
    CompanyForm {
        company: "Northwind Analytics".to_string(),
        company_size: "51-200".to_string(),
    }
}

pub(super) fn contact_form() -> ContactForm {
    ContactForm {
        first_name: "Avery".to_string(),
        last_name: "Quinn".to_string(),
        email: "Avery.Quinn@Northwind.example".to_string(),
        job_title: "Head of Revenue Operations".to_string(),
        accept_terms: true,
    }
}

/// Engine sitting in `ShowingResults` after answering 4,2 / 1,3.
pub(super) fn engine_with_results() -> AssessmentEngine {
    let mut engine = engine();
    engine
        .submit_user_info(&company_form())
        .expect("user info accepted");
    for (question_id, value) in [("data-1", 4), ("data-2", 2), ("funnel-1", 1), ("funnel-2", 3)] {
        engine
            .submit_answer(&answer(question_id, value))
            .expect("answer accepted");
    }
    engine
}

#[derive(Default)]
pub(super) struct MemoryTelemetry {
    events: Mutex<Vec<(String, Attributes)>>,
}

impl MemoryTelemetry {
    pub(super) fn events(&self) -> Vec<(String, Attributes)> {
        self.events.lock().expect("telemetry mutex poisoned").clone()
    }

    pub(super) fn named(&self, event: &str) -> Vec<Attributes> {
        self.events()
            .into_iter()
            .filter(|(name, _)| name == event)
            .map(|(_, attributes)| attributes)
            .collect()
    }
}

impl TelemetrySink for MemoryTelemetry {
    fn record(&self, event: &str, attributes: Attributes) {
        self.events
            .lock()
            .expect("telemetry mutex poisoned")
            .push((event.to_string(), attributes));
    }
}

#[derive(Debug, Clone, Copy)]
pub(super) enum Reply {
    Accept,
    Reject,
    Fail,
}

/// Replies from a script, then accepts once the script runs out.
#[derive(Default)]
pub(super) struct ScriptedSubmitter {
    script: Mutex<VecDeque<Reply>>,
    payloads: Mutex<Vec<SubmissionPayload>>,
}

impl ScriptedSubmitter {
    pub(super) fn with_script(replies: impl IntoIterator<Item = Reply>) -> Self {
        Self {
            script: Mutex::new(replies.into_iter().collect()),
            payloads: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn payloads(&self) -> Vec<SubmissionPayload> {
        self.payloads.lock().expect("payload mutex poisoned").clone()
    }

    pub(super) fn calls(&self) -> usize {
        self.payloads.lock().expect("payload mutex poisoned").len()
    }
}

#[async_trait]
impl ResultsSubmitter for ScriptedSubmitter {
    async fn submit(&self, payload: &SubmissionPayload) -> Result<SubmitAck, SubmitError> {
        self.payloads
            .lock()
            .expect("payload mutex poisoned")
            .push(payload.clone());
        let reply = self
            .script
            .lock()
            .expect("script mutex poisoned")
            .pop_front()
            .unwrap_or(Reply::Accept);

        match reply {
            Reply::Accept => Ok(SubmitAck { ok: true }),
            Reply::Reject => Ok(SubmitAck { ok: false }),
            Reply::Fail => Err(SubmitError::Transport("connection reset".to_string())),
        }
    }
}

/// Holds every call open until the test releases it.
#[derive(Default)]
pub(super) struct GatedSubmitter {
    calls: AtomicUsize,
    entered: Notify,
    release: Notify,
}

impl GatedSubmitter {
    pub(super) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(super) async fn wait_until_entered(&self) {
        self.entered.notified().await;
    }

    pub(super) fn release(&self) {
        self.release.notify_one();
    }
}

#[async_trait]
impl ResultsSubmitter for GatedSubmitter {
    async fn submit(&self, _payload: &SubmissionPayload) -> Result<SubmitAck, SubmitError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.entered.notify_one();
        self.release.notified().await;
        Ok(SubmitAck { ok: true })
    }
}

/// Answers after a fixed delay; pair with paused time.
pub(super) struct SlowSubmitter {
    pub(super) delay: Duration,
}

#[async_trait]
impl ResultsSubmitter for SlowSubmitter {
    async fn submit(&self, _payload: &SubmissionPayload) -> Result<SubmitAck, SubmitError> {
        tokio::time::sleep(self.delay).await;
        Ok(SubmitAck { ok: true })
    }
}

pub(super) fn build_service<S>(
    submitter: Arc<S>,
) -> (AssessmentService<S, MemoryTelemetry>, Arc<MemoryTelemetry>)
where
    S: ResultsSubmitter + 'static,
{
    build_service_with(submitter, AssessmentSettings::default())
}

pub(super) fn build_service_with<S>(
    submitter: Arc<S>,
    settings: AssessmentSettings,
) -> (AssessmentService<S, MemoryTelemetry>, Arc<MemoryTelemetry>)
where
    S: ResultsSubmitter + 'static,
{
    let telemetry = Arc::new(MemoryTelemetry::default());
    let service = AssessmentService::new(small_catalog(), submitter, telemetry.clone(), settings);
    (service, telemetry)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
