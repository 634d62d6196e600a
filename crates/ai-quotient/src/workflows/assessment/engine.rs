use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::catalog::{PillarType, Question, QuestionCatalog};
use super::domain::{Answer, AnswerInput, AssessmentPhase, UserInfo};
use super::scoring::{self, AnswerSet, AssessmentResult, ScoringEngine};
use super::submission::SubmissionFailure;
use super::validation::{CompanyForm, ContactForm, ValidationErrors};

/// Single source of truth for one assessment attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineState {
    pub phase: AssessmentPhase,
    /// `None` outside of [`AssessmentPhase::Answering`].
    pub step: Option<usize>,
    pub user_info: UserInfo,
    pub answers: AnswerSet,
    pub is_test_mode: bool,
    pub completed_pillars: BTreeSet<PillarType>,
    pub attempts: u32,
    pub last_failure: Option<String>,
}

impl EngineState {
    pub fn initial() -> Self {
        Self {
            phase: AssessmentPhase::CollectingUserInfo,
            step: None,
            user_info: UserInfo::default(),
            answers: BTreeMap::new(),
            is_test_mode: false,
            completed_pillars: BTreeSet::new(),
            attempts: 0,
            last_failure: None,
        }
    }

    /// Wire representation of the step (`-1` when no question is active).
    pub fn step_index(&self) -> i64 {
        self.step.map(|step| step as i64).unwrap_or(-1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("step {step} is not valid while {phase} ({question_count} questions)")]
pub struct InvalidStepError {
    pub phase: AssessmentPhase,
    pub step: i64,
    pub question_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    #[error("question `{found}` is not the current question `{expected}`")]
    QuestionMismatch { expected: String, found: String },
    #[error("option `{option_id}` does not belong to question `{question_id}`")]
    UnknownOption {
        question_id: String,
        option_id: String,
    },
    #[error("cannot {intent} while {phase}")]
    InvalidPhase {
        intent: &'static str,
        phase: AssessmentPhase,
    },
    #[error("test mode is not enabled")]
    TestModeDisabled,
    #[error("assessment state was reset: {0}")]
    InvalidStep(InvalidStepError),
}

impl EngineError {
    /// Recoverable input problems surfaced next to the offending field.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            EngineError::Validation(_)
                | EngineError::QuestionMismatch { .. }
                | EngineError::UnknownOption { .. }
        )
    }
}

/// Work order handed to the submission pipeline when an attempt begins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionTicket {
    pub attempt: u32,
    pub result: AssessmentResult,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionStart {
    Ready(SubmissionTicket),
    /// A submission is already in flight; the request is ignored.
    AlreadyInFlight,
}

/// Serializable form of [`EngineState`] for hosts that persist attempts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub phase: AssessmentPhase,
    pub step: i64,
    pub user_info: UserInfo,
    #[serde(default)]
    pub answers: BTreeMap<String, Answer>,
    #[serde(default)]
    pub is_test_mode: bool,
    #[serde(default)]
    pub completed_pillars: Vec<PillarType>,
    #[serde(default)]
    pub attempts: u32,
    #[serde(default)]
    pub last_failure: Option<String>,
}

/// Engine rebuilt from a snapshot, with the anomaly that forced a reset if any.
#[derive(Debug)]
pub struct RestoredEngine {
    pub engine: AssessmentEngine,
    pub anomaly: Option<InvalidStepError>,
}

pub(crate) const INTERRUPTED_SUBMISSION: &str =
    "Your previous submission was interrupted. Please submit again.";

/// Reducer-style state machine driving the questionnaire.
#[derive(Debug, Clone)]
pub struct AssessmentEngine {
    catalog: Arc<QuestionCatalog>,
    scoring: ScoringEngine,
    state: EngineState,
    result: Option<AssessmentResult>,
}

impl AssessmentEngine {
    pub fn new(catalog: Arc<QuestionCatalog>, scoring: ScoringEngine) -> Self {
        Self {
            catalog,
            scoring,
            state: EngineState::initial(),
            result: None,
        }
    }

    pub fn catalog(&self) -> &QuestionCatalog {
        &self.catalog
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn phase(&self) -> AssessmentPhase {
        self.state.phase
    }

    /// Result held since results were first shown; `None` before that.
    pub fn result(&self) -> Option<&AssessmentResult> {
        self.result.as_ref()
    }

    pub fn current_question(&self) -> Option<&Question> {
        match self.state.phase {
            AssessmentPhase::Answering => self
                .state
                .step
                .and_then(|step| self.catalog.question_at(step)),
            _ => None,
        }
    }

    pub fn pillar_progress(&self, pillar: PillarType) -> f64 {
        scoring::pillar_progress(&self.catalog, &self.state.answers, pillar)
    }

    pub fn submit_user_info(&mut self, form: &CompanyForm) -> Result<(), EngineError> {
        self.require_phase("submit user info", &[AssessmentPhase::CollectingUserInfo])?;

        let profile = form.validate()?;
        self.state.user_info.company = Some(profile);
        self.state.phase = AssessmentPhase::Answering;
        self.state.step = Some(0);
        debug!(step = 0, "user info accepted, questionnaire started");
        Ok(())
    }

    /// Upsert an answer for the current question and advance.
    pub fn submit_answer(&mut self, input: &AnswerInput) -> Result<(), EngineError> {
        self.require_phase("submit an answer", &[AssessmentPhase::Answering])?;
        let step = self.active_step()?;
        let question = self
            .catalog
            .question_at(step)
            .ok_or_else(|| self.step_anomaly())?;

        if question.id != input.question_id {
            return Err(EngineError::QuestionMismatch {
                expected: question.id.clone(),
                found: input.question_id.clone(),
            });
        }
        let option = question
            .option(&input.option_id)
            .ok_or_else(|| EngineError::UnknownOption {
                question_id: question.id.clone(),
                option_id: input.option_id.clone(),
            })?;

        let answer = Answer {
            question_id: question.id.clone(),
            option_id: option.id.clone(),
            value: option.value,
            pillar: question.pillar,
        };
        let pillar = question.pillar;
        self.state.answers.insert(answer.question_id.clone(), answer);
        self.advance_from(step, pillar);
        Ok(())
    }

    fn advance_from(&mut self, step: usize, pillar: PillarType) {
        if !self.catalog.is_last_in_pillar(step) {
            self.state.step = Some(step + 1);
            return;
        }

        self.state.completed_pillars.insert(pillar);
        let next = self
            .catalog
            .pillars()
            .find(|candidate| !self.state.completed_pillars.contains(candidate))
            .and_then(|candidate| self.catalog.first_step_of(candidate));

        match next {
            Some(next_step) => {
                debug!(completed = ?pillar, next_step, "pillar completed");
                self.state.step = Some(next_step);
            }
            None => self.enter_results(),
        }
    }

    fn enter_results(&mut self) {
        self.state.phase = AssessmentPhase::ShowingResults;
        self.state.step = None;
        self.state.is_test_mode = false;
        self.result = Some(self.score());
        debug!("all pillars completed, showing results");
    }

    fn score(&self) -> AssessmentResult {
        self.scoring
            .score(&self.catalog, &self.state.answers, &self.state.user_info)
    }

    /// Step back one question; from the first question, return to user info.
    pub fn go_previous(&mut self) -> Result<(), EngineError> {
        match self.state.phase {
            AssessmentPhase::Answering => {
                let step = self.active_step()?;
                if step == 0 {
                    self.state.phase = AssessmentPhase::CollectingUserInfo;
                    self.state.step = None;
                    self.state.is_test_mode = false;
                } else {
                    self.state.step = Some(step - 1);
                }
                Ok(())
            }
            AssessmentPhase::ShowingResults => {
                let last = self.catalog.question_count().saturating_sub(1);
                self.state.phase = AssessmentPhase::Answering;
                self.state.step = Some(last);
                self.result = None;
                Ok(())
            }
            phase => Err(EngineError::InvalidPhase {
                intent: "go back",
                phase,
            }),
        }
    }

    pub fn set_test_mode(&mut self, enabled: bool) -> Result<(), EngineError> {
        self.require_phase("toggle test mode", &[AssessmentPhase::Answering])?;
        self.state.is_test_mode = enabled;
        Ok(())
    }

    /// Answer every remaining question through the regular answer path.
    ///
    /// Previously chosen options are kept; unanswered questions rotate through
    /// their options so the result lands mid-range.
    pub fn apply_test_shortcut(&mut self) -> Result<(), EngineError> {
        self.require_phase("apply the test shortcut", &[AssessmentPhase::Answering])?;
        if !self.state.is_test_mode {
            return Err(EngineError::TestModeDisabled);
        }

        for _ in 0..=self.catalog.question_count() {
            if self.state.phase != AssessmentPhase::Answering {
                break;
            }
            let step = self.active_step()?;
            let question = self
                .catalog
                .question_at(step)
                .ok_or_else(|| self.step_anomaly())?;
            let option_id = match self.state.answers.get(&question.id) {
                Some(existing) => existing.option_id.clone(),
                None => question.options[step % question.options.len()].id.clone(),
            };
            let input = AnswerInput {
                question_id: question.id.clone(),
                option_id,
            };
            self.submit_answer(&input)?;
        }

        Ok(())
    }

    /// Validate the full tier and move into `Submitting`.
    pub fn begin_submission(&mut self, form: &ContactForm) -> Result<SubmissionStart, EngineError> {
        match self.state.phase {
            AssessmentPhase::Submitting => return Ok(SubmissionStart::AlreadyInFlight),
            AssessmentPhase::ShowingResults | AssessmentPhase::SubmitFailed => {}
            phase => {
                return Err(EngineError::InvalidPhase {
                    intent: "submit results",
                    phase,
                })
            }
        }

        let contact = form.validate()?;
        self.state.user_info.contact = Some(contact);

        let mut result = match self.result.take() {
            Some(result) => result,
            None => self.score(),
        };
        result.user_info = self.state.user_info.clone();
        self.result = Some(result.clone());

        self.state.attempts += 1;
        self.state.phase = AssessmentPhase::Submitting;
        self.state.last_failure = None;

        Ok(SubmissionStart::Ready(SubmissionTicket {
            attempt: self.state.attempts,
            result,
        }))
    }

    /// Resolve an in-flight attempt. Returns `false` when the outcome is stale.
    pub fn complete_submission(
        &mut self,
        attempt: u32,
        outcome: Result<(), SubmissionFailure>,
    ) -> bool {
        if self.state.phase != AssessmentPhase::Submitting || self.state.attempts != attempt {
            return false;
        }

        match outcome {
            Ok(()) => {
                self.state.phase = AssessmentPhase::Submitted;
                self.state.last_failure = None;
            }
            Err(failure) => {
                self.state.phase = AssessmentPhase::SubmitFailed;
                self.state.last_failure = Some(failure.user_message());
            }
        }
        true
    }

    /// Discard the attempt and start over with empty state.
    ///
    /// Refused while a submission is in flight so its outcome can never land on
    /// a later attempt.
    pub fn reset(&mut self) -> Result<(), EngineError> {
        if self.state.phase == AssessmentPhase::Submitting {
            return Err(EngineError::InvalidPhase {
                intent: "reset",
                phase: self.state.phase,
            });
        }
        self.state = EngineState::initial();
        self.result = None;
        Ok(())
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            phase: self.state.phase,
            step: self.state.step_index(),
            user_info: self.state.user_info.clone(),
            answers: self.state.answers.clone(),
            is_test_mode: self.state.is_test_mode,
            completed_pillars: self.state.completed_pillars.iter().copied().collect(),
            attempts: self.state.attempts,
            last_failure: self.state.last_failure.clone(),
        }
    }

    /// Rebuild an engine from a persisted snapshot.
    ///
    /// Answer values are re-derived from the catalog. A snapshot whose step or
    /// phase is inconsistent is reset to `CollectingUserInfo`, keeping user
    /// info and recognised answers, and the anomaly is returned to the caller.
    pub fn restore(
        catalog: Arc<QuestionCatalog>,
        scoring: ScoringEngine,
        snapshot: EngineSnapshot,
    ) -> RestoredEngine {
        let mut engine = Self::new(catalog, scoring);

        let answers: AnswerSet = snapshot
            .answers
            .values()
            .filter_map(|answer| {
                let question = engine.catalog.find_question(&answer.question_id)?;
                let option = question.option(&answer.option_id)?;
                Some((
                    question.id.clone(),
                    Answer {
                        question_id: question.id.clone(),
                        option_id: option.id.clone(),
                        value: option.value,
                        pillar: question.pillar,
                    },
                ))
            })
            .collect();

        engine.state = EngineState {
            phase: snapshot.phase,
            step: usize::try_from(snapshot.step).ok(),
            user_info: snapshot.user_info,
            answers,
            is_test_mode: snapshot.is_test_mode,
            completed_pillars: snapshot.completed_pillars.into_iter().collect(),
            attempts: snapshot.attempts,
            last_failure: snapshot.last_failure,
        };

        if let Err(anomaly) = engine.check_consistency(snapshot.step) {
            engine.recover();
            return RestoredEngine {
                engine,
                anomaly: Some(anomaly),
            };
        }

        engine.state.completed_pillars = engine
            .catalog
            .pillars()
            .filter(|pillar| engine.pillar_progress(*pillar) >= 1.0)
            .collect();

        match engine.state.phase {
            AssessmentPhase::Answering | AssessmentPhase::CollectingUserInfo => {}
            AssessmentPhase::Submitting => {
                engine.state.phase = AssessmentPhase::SubmitFailed;
                engine.state.last_failure = Some(INTERRUPTED_SUBMISSION.to_string());
                engine.result = Some(engine.score());
            }
            _ => engine.result = Some(engine.score()),
        }
        if engine.state.phase != AssessmentPhase::Answering {
            engine.state.is_test_mode = false;
        }

        RestoredEngine {
            engine,
            anomaly: None,
        }
    }

    fn check_consistency(&self, raw_step: i64) -> Result<(), InvalidStepError> {
        let anomaly = || InvalidStepError {
            phase: self.state.phase,
            step: raw_step,
            question_count: self.catalog.question_count(),
        };
        let all_answered = self.catalog.question_count() == self.state.answers.len();

        let consistent = match self.state.phase {
            AssessmentPhase::CollectingUserInfo => raw_step == -1,
            AssessmentPhase::Answering => {
                self.state.user_info.has_minimal_tier()
                    && self
                        .state
                        .step
                        .map(|step| step < self.catalog.question_count())
                        .unwrap_or(false)
            }
            AssessmentPhase::ShowingResults => {
                raw_step == -1 && all_answered && self.state.user_info.has_minimal_tier()
            }
            AssessmentPhase::Submitting
            | AssessmentPhase::SubmitFailed
            | AssessmentPhase::Submitted => {
                raw_step == -1 && all_answered && self.state.user_info.has_full_tier()
            }
        };

        if consistent {
            Ok(())
        } else {
            Err(anomaly())
        }
    }

    fn recover(&mut self) {
        self.state.phase = AssessmentPhase::CollectingUserInfo;
        self.state.step = None;
        self.state.is_test_mode = false;
        self.state.completed_pillars.clear();
        self.state.last_failure = None;
        self.result = None;
    }

    fn step_anomaly(&self) -> EngineError {
        EngineError::InvalidStep(InvalidStepError {
            phase: self.state.phase,
            step: self.state.step_index(),
            question_count: self.catalog.question_count(),
        })
    }

    fn active_step(&mut self) -> Result<usize, EngineError> {
        match self.state.step {
            Some(step) if step < self.catalog.question_count() => Ok(step),
            _ => {
                let error = self.step_anomaly();
                self.recover();
                Err(error)
            }
        }
    }

    fn require_phase(
        &self,
        intent: &'static str,
        allowed: &[AssessmentPhase],
    ) -> Result<(), EngineError> {
        if allowed.contains(&self.state.phase) {
            Ok(())
        } else {
            Err(EngineError::InvalidPhase {
                intent,
                phase: self.state.phase,
            })
        }
    }
}
