use super::common::*;

use crate::workflows::assessment::domain::{AssessmentPhase, CompanySize};
use crate::workflows::assessment::engine::{
    AssessmentEngine, EngineError, SubmissionStart, INTERRUPTED_SUBMISSION,
};
use crate::workflows::assessment::scoring::ScoringEngine;
use crate::workflows::assessment::submission::SubmissionFailure;
use crate::workflows::assessment::validation::CompanyForm;

fn answering_engine() -> AssessmentEngine {
    let mut engine = engine();
    engine
        .submit_user_info(&company_form())
        .expect("user info accepted");
    engine
}

#[test]
fn user_info_is_required_before_answering() {
    let mut engine = engine();
    let err = engine
        .submit_user_info(&CompanyForm {
            company: "   ".to_string(),
            company_size: "12".to_string(),
        })
        .expect_err("blank company rejected");

    match err {
        EngineError::Validation(errors) => {
            assert!(errors.has_field("company"));
            assert!(errors.has_field("company_size"));
        }
        other => panic!("expected validation error, got {other:?}"),
    }
    assert_eq!(engine.phase(), AssessmentPhase::CollectingUserInfo);
    assert_eq!(engine.state().step_index(), -1);

    engine
        .submit_user_info(&company_form())
        .expect("valid user info accepted");
    assert_eq!(engine.phase(), AssessmentPhase::Answering);
    assert_eq!(engine.state().step, Some(0));
    let company = engine.state().user_info.company.as_ref().expect("company kept");
    assert_eq!(company.company_size, CompanySize::Medium);
}

#[test]
fn latest_answer_wins_for_a_question() {
    let mut engine = answering_engine();
    engine
        .submit_answer(&answer("data-1", 4))
        .expect("first answer");
    engine.go_previous().expect("back to first question");
    engine
        .submit_answer(&answer("data-1", 2))
        .expect("revised answer");

    let answers = &engine.state().answers;
    assert_eq!(answers.len(), 1);
    assert_eq!(answers["data-1"].value, 2);
    assert_eq!(answers["data-1"].option_id, "data-1-2");
    assert_eq!(engine.state().step, Some(1));
}

#[test]
fn answers_must_target_the_current_question() {
    let mut engine = answering_engine();

    let err = engine
        .submit_answer(&answer("data-2", 3))
        .expect_err("out of order answer");
    assert!(matches!(err, EngineError::QuestionMismatch { .. }));
    assert!(err.is_validation());

    let err = engine
        .submit_answer(&answer("data-1", 9))
        .expect_err("foreign option");
    assert!(matches!(err, EngineError::UnknownOption { .. }));
    assert!(engine.state().answers.is_empty());
    assert_eq!(engine.state().step, Some(0));
}

#[test]
fn going_back_from_first_question_keeps_company_profile() {
    let mut engine = answering_engine();
    engine.go_previous().expect("back to user info");

    assert_eq!(engine.phase(), AssessmentPhase::CollectingUserInfo);
    assert_eq!(engine.state().step, None);
    let company = engine.state().user_info.company.as_ref().expect("company kept");
    assert_eq!(company.company, "Northwind Analytics");

    let err = engine.go_previous().expect_err("nothing before user info");
    assert!(matches!(err, EngineError::InvalidPhase { .. }));
}

#[test]
fn last_question_moves_straight_to_results() {
    let engine = engine_with_results();

    assert_eq!(engine.phase(), AssessmentPhase::ShowingResults);
    assert_eq!(engine.state().step, None);
    assert!(engine.current_question().is_none());
    let result = engine.result().expect("result held");
    assert_eq!(result.score, 10);
    assert_eq!(result.percentage, 63);
}

#[test]
fn revising_a_completed_pillar_skips_to_the_next_open_one() {
    let mut engine = answering_engine();
    engine.submit_answer(&answer("data-1", 1)).expect("answer");
    engine.submit_answer(&answer("data-2", 1)).expect("answer");
    assert_eq!(engine.state().step, Some(2));

    engine.go_previous().expect("back into first pillar");
    assert_eq!(engine.state().step, Some(1));
    engine.submit_answer(&answer("data-2", 3)).expect("revise");
    assert_eq!(engine.state().step, Some(2));

    engine.submit_answer(&answer("funnel-1", 2)).expect("answer");
    engine.submit_answer(&answer("funnel-2", 2)).expect("answer");
    assert_eq!(engine.phase(), AssessmentPhase::ShowingResults);

    engine.go_previous().expect("results back to last question");
    assert_eq!(engine.phase(), AssessmentPhase::Answering);
    assert_eq!(engine.state().step, Some(3));
    assert!(engine.result().is_none());

    engine.go_previous().expect("step back");
    engine.go_previous().expect("step back");
    engine.submit_answer(&answer("data-2", 4)).expect("revise");
    assert_eq!(engine.phase(), AssessmentPhase::ShowingResults);
    assert_eq!(engine.result().expect("rescored").score, 1 + 4 + 2 + 2);
}

#[test]
fn test_mode_only_toggles_while_answering() {
    let mut engine = engine();
    let err = engine.set_test_mode(true).expect_err("no test mode yet");
    assert!(matches!(err, EngineError::InvalidPhase { .. }));

    engine
        .submit_user_info(&company_form())
        .expect("user info accepted");
    let err = engine
        .apply_test_shortcut()
        .expect_err("shortcut needs test mode");
    assert_eq!(err, EngineError::TestModeDisabled);

    engine.set_test_mode(true).expect("toggle on");
    assert!(engine.state().is_test_mode);
    engine.set_test_mode(false).expect("toggle off");
    assert!(!engine.state().is_test_mode);
}

#[test]
fn test_shortcut_answers_the_rest_through_the_normal_path() {
    let mut engine = answering_engine();
    engine.submit_answer(&answer("data-1", 4)).expect("answer");
    engine.set_test_mode(true).expect("toggle on");
    engine.apply_test_shortcut().expect("shortcut applied");

    assert_eq!(engine.phase(), AssessmentPhase::ShowingResults);
    assert!(!engine.state().is_test_mode);
    let answers = &engine.state().answers;
    assert_eq!(answers.len(), 4);
    assert_eq!(answers["data-1"].value, 4);
    assert_eq!(answers["data-2"].option_id, "data-2-2");
    assert_eq!(answers["funnel-1"].option_id, "funnel-1-3");
    assert_eq!(answers["funnel-2"].option_id, "funnel-2-4");
}

#[test]
fn submission_requires_results_and_valid_contact() {
    let mut early = answering_engine();
    let err = early
        .begin_submission(&contact_form())
        .expect_err("no results yet");
    assert!(matches!(err, EngineError::InvalidPhase { .. }));

    let mut engine = engine_with_results();
    let mut contact = contact_form();
    contact.email = "not-an-email".to_string();
    contact.accept_terms = false;
    let err = engine
        .begin_submission(&contact)
        .expect_err("invalid contact rejected");
    match err {
        EngineError::Validation(errors) => {
            assert_eq!(errors.fields(), vec!["email", "accept_terms"]);
        }
        other => panic!("expected validation error, got {other:?}"),
    }
    assert_eq!(engine.phase(), AssessmentPhase::ShowingResults);
    assert!(engine.state().user_info.contact.is_none());
}

#[test]
fn only_one_submission_is_in_flight() {
    let mut engine = engine_with_results();

    let ticket = match engine.begin_submission(&contact_form()).expect("start") {
        SubmissionStart::Ready(ticket) => ticket,
        SubmissionStart::AlreadyInFlight => panic!("first attempt must start"),
    };
    assert_eq!(ticket.attempt, 1);
    assert_eq!(engine.phase(), AssessmentPhase::Submitting);
    let contact = ticket.result.user_info.contact.as_ref().expect("contact attached");
    assert_eq!(contact.email, "avery.quinn@northwind.example");

    let again = engine.begin_submission(&contact_form()).expect("ignored");
    assert_eq!(again, SubmissionStart::AlreadyInFlight);
    assert_eq!(engine.state().attempts, 1);
}

#[test]
fn failed_submission_can_be_retried_with_the_same_result() {
    let mut engine = engine_with_results();
    let first = match engine.begin_submission(&contact_form()).expect("start") {
        SubmissionStart::Ready(ticket) => ticket,
        SubmissionStart::AlreadyInFlight => panic!("first attempt must start"),
    };

    assert!(!engine.complete_submission(first.attempt + 1, Ok(())));
    assert!(engine.complete_submission(first.attempt, Err(SubmissionFailure::Rejected)));
    assert_eq!(engine.phase(), AssessmentPhase::SubmitFailed);
    assert!(engine.state().last_failure.is_some());
    assert!(engine.result().is_some());

    let second = match engine.begin_submission(&contact_form()).expect("retry") {
        SubmissionStart::Ready(ticket) => ticket,
        SubmissionStart::AlreadyInFlight => panic!("retry must start"),
    };
    assert_eq!(second.attempt, 2);
    assert_eq!(second.result, first.result);

    assert!(engine.complete_submission(second.attempt, Ok(())));
    assert_eq!(engine.phase(), AssessmentPhase::Submitted);
    assert_eq!(engine.state().last_failure, None);

    let err = engine.go_previous().expect_err("submitted is terminal");
    assert!(matches!(err, EngineError::InvalidPhase { .. }));
}

#[test]
fn snapshot_round_trips_mid_questionnaire() {
    let mut engine = answering_engine();
    engine.submit_answer(&answer("data-1", 3)).expect("answer");
    engine.set_test_mode(true).expect("toggle on");

    let snapshot = engine.snapshot();
    assert_eq!(snapshot.step, 1);
    let restored = AssessmentEngine::restore(small_catalog(), ScoringEngine::default(), snapshot);

    assert!(restored.anomaly.is_none());
    assert_eq!(restored.engine.state(), engine.state());
}

#[test]
fn out_of_range_step_resets_to_user_info() {
    let mut engine = answering_engine();
    engine.submit_answer(&answer("data-1", 3)).expect("answer");
    let mut snapshot = engine.snapshot();
    snapshot.step = 42;

    let restored = AssessmentEngine::restore(small_catalog(), ScoringEngine::default(), snapshot);
    let anomaly = restored.anomaly.expect("anomaly reported");
    assert_eq!(anomaly.step, 42);
    assert_eq!(anomaly.question_count, 4);

    let state = restored.engine.state();
    assert_eq!(state.phase, AssessmentPhase::CollectingUserInfo);
    assert_eq!(state.step, None);
    assert!(state.user_info.company.is_some());
    assert_eq!(state.answers.len(), 1);
}

#[test]
fn interrupted_submission_resumes_as_failed() {
    let mut engine = engine_with_results();
    engine.begin_submission(&contact_form()).expect("start");
    let snapshot = engine.snapshot();
    assert_eq!(snapshot.phase, AssessmentPhase::Submitting);

    let restored = AssessmentEngine::restore(small_catalog(), ScoringEngine::default(), snapshot);
    assert!(restored.anomaly.is_none());
    let resumed = restored.engine;
    assert_eq!(resumed.phase(), AssessmentPhase::SubmitFailed);
    assert_eq!(
        resumed.state().last_failure.as_deref(),
        Some(INTERRUPTED_SUBMISSION)
    );
    assert_eq!(
        resumed.result().map(|result| result.score),
        engine.result().map(|result| result.score)
    );
}

#[test]
fn completed_pillars_are_rebuilt_from_answers_on_restore() {
    let engine = engine_with_results();
    let mut snapshot = engine.snapshot();
    snapshot.completed_pillars.clear();

    let restored = AssessmentEngine::restore(small_catalog(), ScoringEngine::default(), snapshot);
    assert!(restored.anomaly.is_none());
    let mut resumed = restored.engine;
    assert_eq!(resumed.state().completed_pillars.len(), 2);

    resumed.go_previous().expect("results back to last question");
    assert_eq!(resumed.state().step, Some(3));
    resumed
        .submit_answer(&answer("funnel-2", 1))
        .expect("revise last answer");
    assert_eq!(resumed.phase(), AssessmentPhase::ShowingResults);
    assert_eq!(resumed.result().expect("rescored").score, 4 + 2 + 1 + 1);
}

#[test]
fn results_snapshot_without_contact_is_inconsistent() {
    let engine = engine_with_results();
    let mut snapshot = engine.snapshot();
    snapshot.phase = AssessmentPhase::Submitted;

    let restored = AssessmentEngine::restore(small_catalog(), ScoringEngine::default(), snapshot);
    assert!(restored.anomaly.is_some());
    assert_eq!(restored.engine.phase(), AssessmentPhase::CollectingUserInfo);
}

#[test]
fn reset_discards_everything() {
    let mut engine = engine_with_results();
    engine.reset().expect("reset allowed while showing results");

    assert_eq!(engine.phase(), AssessmentPhase::CollectingUserInfo);
    assert!(engine.state().answers.is_empty());
    assert!(engine.state().user_info.company.is_none());
    assert!(engine.result().is_none());
}

#[test]
fn reset_is_refused_while_submitting() {
    let mut engine = engine_with_results();
    let ticket = match engine
        .begin_submission(&contact_form())
        .expect("submission starts")
    {
        SubmissionStart::Ready(ticket) => ticket,
        SubmissionStart::AlreadyInFlight => panic!("nothing in flight yet"),
    };

    let err = engine.reset().expect_err("in-flight attempt is kept");
    assert!(matches!(
        err,
        EngineError::InvalidPhase {
            intent: "reset",
            phase: AssessmentPhase::Submitting
        }
    ));
    assert_eq!(engine.state().attempts, 1);

    assert!(engine.complete_submission(ticket.attempt, Ok(())));
    assert_eq!(engine.phase(), AssessmentPhase::Submitted);
    engine.reset().expect("reset allowed once resolved");
    assert_eq!(engine.phase(), AssessmentPhase::CollectingUserInfo);
}
