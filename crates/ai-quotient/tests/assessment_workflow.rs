use std::sync::{Arc, Mutex};

use ai_quotient::telemetry::NoopTelemetry;
use ai_quotient::workflows::assessment::{
    AnswerInput, AnswerSheet, AssessmentPhase, AssessmentService, AssessmentSettings,
    CompanyForm, ContactForm, QuestionCatalog, ReadinessLevel, ReadinessThresholds, ResultsSubmitter,
    SubmissionPayload, SubmitAck, SubmitError, SubmitStatus,
};
use async_trait::async_trait;

#[derive(Default)]
struct CapturingSubmitter {
    payloads: Mutex<Vec<SubmissionPayload>>,
}

#[async_trait]
impl ResultsSubmitter for CapturingSubmitter {
    async fn submit(&self, payload: &SubmissionPayload) -> Result<SubmitAck, SubmitError> {
        self.payloads
            .lock()
            .expect("payload mutex poisoned")
            .push(payload.clone());
        Ok(SubmitAck { ok: true })
    }
}

fn service(
    settings: AssessmentSettings,
) -> (
    AssessmentService<CapturingSubmitter, NoopTelemetry>,
    Arc<CapturingSubmitter>,
) {
    let submitter = Arc::new(CapturingSubmitter::default());
    let service = AssessmentService::new(
        Arc::new(QuestionCatalog::ai_quotient()),
        submitter.clone(),
        Arc::new(NoopTelemetry),
        settings,
    );
    (service, submitter)
}

fn company() -> CompanyForm {
    CompanyForm {
        company: "Fabrikam".to_string(),
        company_size: "201-1000".to_string(),
    }
}

fn contact() -> ContactForm {
    ContactForm {
        first_name: "Jordan".to_string(),
        last_name: "Lee".to_string(),
        email: "jordan.lee@fabrikam.example".to_string(),
        job_title: "VP Marketing".to_string(),
        accept_terms: true,
    }
}

#[tokio::test]
async fn scripted_attempt_scores_and_submits() {
    let (service, submitter) = service(AssessmentSettings::default());
    let sheet = AnswerSheet::from_reader(&include_bytes!("../fixtures/sample_answers.csv")[..])
        .expect("sample sheet parses");

    let session = service.start();
    session.submit_user_info(&company()).expect("user info accepted");
    while session.phase() == AssessmentPhase::Answering {
        let question_id = session
            .inspect(|engine| engine.current_question().map(|question| question.id.clone()))
            .expect("question while answering");
        let entry = sheet.answer_for(&question_id).expect("scripted answer");
        session.submit_answer(entry).expect("answer accepted");
    }

    let result = session.result().expect("results shown");
    assert_eq!(result.score, 44);
    assert_eq!(result.max_score, 60);
    assert_eq!(result.percentage, 73);
    assert_eq!(result.readiness_level, ReadinessLevel::High);

    let status = session
        .submit_results(&contact())
        .await
        .expect("submission resolves");
    assert_eq!(status, SubmitStatus::Submitted);
    assert_eq!(session.phase(), AssessmentPhase::Submitted);

    let payloads = submitter.payloads.lock().expect("payload mutex poisoned");
    assert_eq!(payloads.len(), 1);
    let payload = &payloads[0];
    assert_eq!(payload.company_size, "201-1000");
    assert_eq!(payload.pillar_scores.len(), 5);
    assert_eq!(payload.pillar_scores["data_spine_health"], 10);
    assert_eq!(payload.pillar_scores["governance"], 11);
}

#[tokio::test]
async fn thresholds_from_settings_drive_readiness() {
    let settings = AssessmentSettings {
        thresholds: ReadinessThresholds::new(65, 80).expect("valid thresholds"),
        ..AssessmentSettings::default()
    };
    let (service, _) = service(settings);

    let session = service.start();
    session.submit_user_info(&company()).expect("user info accepted");
    session.set_test_mode(true).expect("test mode on");
    session.apply_test_shortcut().expect("shortcut applied");

    let result = session.result().expect("results shown");
    assert_eq!(session.phase(), AssessmentPhase::ShowingResults);
    assert_eq!(result.score, 36);
    assert_eq!(result.percentage, 60);
    assert_eq!(result.readiness_level, ReadinessLevel::Low);
}

#[test]
fn snapshot_survives_json_persistence() {
    let (service, _) = service(AssessmentSettings::default());
    let session = service.start();
    session.submit_user_info(&company()).expect("user info accepted");
    let first = session
        .inspect(|engine| engine.current_question().map(|question| question.id.clone()))
        .expect("first question");
    session
        .submit_answer(&AnswerInput {
            option_id: format!("{first}-3"),
            question_id: first,
        })
        .expect("answer accepted");

    let persisted = serde_json::to_string(&session.snapshot()).expect("snapshot serializes");
    let snapshot = serde_json::from_str(&persisted).expect("snapshot parses");
    let resumed = service.resume(snapshot);

    assert_eq!(resumed.phase(), AssessmentPhase::Answering);
    assert_eq!(resumed.snapshot().step, 1);
    assert_eq!(resumed.snapshot().answers, session.snapshot().answers);
}
