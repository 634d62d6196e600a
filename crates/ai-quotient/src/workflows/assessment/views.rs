use serde::Serialize;

use super::catalog::{PillarType, Question, QuestionCatalog};
use super::domain::{AssessmentPhase, AttemptId, CompanySize};
use super::engine::AssessmentEngine;
use super::scoring::{AssessmentResult, ReadinessLevel};

#[derive(Debug, Clone, Serialize)]
pub struct OptionView {
    pub id: String,
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionView {
    pub id: String,
    pub prompt: String,
    pub options: Vec<OptionView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_option_id: Option<String>,
}

impl QuestionView {
    pub(crate) fn new(question: &Question, selected_option_id: Option<String>) -> Self {
        Self {
            id: question.id.clone(),
            prompt: question.prompt.clone(),
            options: question
                .options
                .iter()
                .map(|option| OptionView {
                    id: option.id.clone(),
                    text: option.text.clone(),
                })
                .collect(),
            selected_option_id,
        }
    }
}

/// "Section X of Y" position plus answer progress.
#[derive(Debug, Clone, Serialize)]
pub struct SectionProgress {
    pub pillar: PillarType,
    pub pillar_label: &'static str,
    pub section_number: usize,
    pub section_count: usize,
    pub question_number: usize,
    pub questions_in_section: usize,
    pub pillar_progress: f64,
    pub overall_progress: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PillarScoreView {
    pub pillar: PillarType,
    pub label: &'static str,
    pub score: u32,
    pub max_score: u32,
    pub percentage: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResultView {
    pub score: u32,
    pub max_score: u32,
    pub percentage: u32,
    pub readiness_level: ReadinessLevel,
    pub readiness_label: &'static str,
    pub readiness_summary: &'static str,
    pub pillars: Vec<PillarScoreView>,
}

impl ResultView {
    pub fn new(catalog: &QuestionCatalog, result: &AssessmentResult) -> Self {
        let pillars = catalog
            .pillars()
            .map(|pillar| {
                let score = result.pillar_scores.get(&pillar).copied().unwrap_or(0);
                let max_score = result.max_pillar_scores.get(&pillar).copied().unwrap_or(0);
                PillarScoreView {
                    pillar,
                    label: pillar.label(),
                    score,
                    max_score,
                    percentage: super::scoring::percentage(score, max_score),
                }
            })
            .collect();

        Self {
            score: result.score,
            max_score: result.max_score,
            percentage: result.percentage,
            readiness_level: result.readiness_level,
            readiness_label: result.readiness_level.label(),
            readiness_summary: result.readiness_level.summary(),
            pillars,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionState {
    NotSubmitted,
    InFlight,
    Failed,
    Submitted,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmissionStatusView {
    pub state: SubmissionState,
    pub attempts: u32,
    pub can_submit: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// The form the presentation layer should render for the current phase.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "form", rename_all = "snake_case")]
pub enum FormView {
    UserInfo {
        company: String,
        company_size: Option<CompanySize>,
        company_size_options: &'static [&'static str],
    },
    Questions {
        question: QuestionView,
        progress: SectionProgress,
        can_go_back: bool,
    },
    SubmitResults {
        result: ResultView,
        submission: SubmissionStatusView,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct AssessmentView {
    pub attempt_id: AttemptId,
    pub phase: AssessmentPhase,
    pub step: i64,
    pub is_test_mode: bool,
    #[serde(flatten)]
    pub form: FormView,
}

impl AssessmentView {
    pub fn from_engine(attempt_id: &AttemptId, engine: &AssessmentEngine) -> Self {
        let state = engine.state();
        let form = match (engine.current_question(), engine.result()) {
            (Some(question), _) => {
                let selected = state
                    .answers
                    .get(&question.id)
                    .map(|answer| answer.option_id.clone());
                FormView::Questions {
                    question: QuestionView::new(question, selected),
                    progress: section_progress(engine, question),
                    can_go_back: true,
                }
            }
            (None, Some(result)) if state.phase.has_result() => FormView::SubmitResults {
                result: ResultView::new(engine.catalog(), result),
                submission: submission_status(engine),
            },
            _ => {
                let company = state.user_info.company.as_ref();
                FormView::UserInfo {
                    company: company
                        .map(|profile| profile.company.clone())
                        .unwrap_or_default(),
                    company_size: company.map(|profile| profile.company_size),
                    company_size_options: CompanySize::LABELS,
                }
            }
        };

        Self {
            attempt_id: attempt_id.clone(),
            phase: state.phase,
            step: state.step_index(),
            is_test_mode: state.is_test_mode,
            form,
        }
    }
}

fn section_progress(engine: &AssessmentEngine, question: &Question) -> SectionProgress {
    let catalog = engine.catalog();
    let state = engine.state();
    let section = catalog.section_index(question.pillar).unwrap_or(0);
    let questions = catalog.questions_in(question.pillar);
    let position = questions
        .iter()
        .position(|candidate| candidate.id == question.id)
        .unwrap_or(0);
    let overall_progress = if catalog.question_count() == 0 {
        0.0
    } else {
        state.answers.len() as f64 / catalog.question_count() as f64
    };

    SectionProgress {
        pillar: question.pillar,
        pillar_label: question.pillar.label(),
        section_number: section + 1,
        section_count: catalog.pillar_count(),
        question_number: position + 1,
        questions_in_section: questions.len(),
        pillar_progress: engine.pillar_progress(question.pillar),
        overall_progress,
    }
}

fn submission_status(engine: &AssessmentEngine) -> SubmissionStatusView {
    let state = engine.state();
    let (submission_state, can_submit) = match state.phase {
        AssessmentPhase::Submitting => (SubmissionState::InFlight, false),
        AssessmentPhase::SubmitFailed => (SubmissionState::Failed, true),
        AssessmentPhase::Submitted => (SubmissionState::Submitted, false),
        _ => (SubmissionState::NotSubmitted, true),
    };

    SubmissionStatusView {
        state: submission_state,
        attempts: state.attempts,
        can_submit,
        message: state.last_failure.clone(),
    }
}
