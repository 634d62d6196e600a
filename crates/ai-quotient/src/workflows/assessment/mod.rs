//! AI Quotient questionnaire: catalog, state machine, scoring, and results submission.
//!
//! The [`engine`] module is a synchronous reducer over one attempt's state. The
//! [`session`] and [`service`] layers add locking, the async CRM call, and a
//! registry of live attempts; [`router`] exposes the same intents over HTTP.

pub mod answer_sheet;
pub mod catalog;
pub mod domain;
pub mod engine;
pub mod hubspot;
pub mod router;
pub mod scoring;
pub mod service;
pub mod session;
pub mod submission;
pub mod validation;
pub mod views;

#[cfg(test)]
mod tests;

pub use answer_sheet::{AnswerSheet, AnswerSheetError};
pub use catalog::{AnswerOption, CatalogError, PillarSection, PillarType, Question, QuestionCatalog};
pub use domain::{
    Answer, AnswerInput, AssessmentPhase, AttemptId, CompanyProfile, CompanySize, ContactDetails,
    UserInfo,
};
pub use engine::{
    AssessmentEngine, EngineError, EngineSnapshot, EngineState, InvalidStepError, RestoredEngine,
    SubmissionStart, SubmissionTicket,
};
pub use hubspot::{HubSpotFormTarget, HubSpotFormsSubmitter, DEFAULT_FORMS_ENDPOINT};
pub use router::assessment_router;
pub use scoring::{
    AnswerSet, AssessmentResult, ReadinessLevel, ReadinessThresholds, ScoringEngine,
    ThresholdError,
};
pub use service::{
    AssessmentService, AssessmentServiceError, AssessmentSettings, DEFAULT_IDLE_TTL,
    DEFAULT_MAX_ATTEMPTS,
};
pub use session::{AssessmentSession, SubmitStatus};
pub use submission::{
    ResultsSubmitter, SubmissionFailure, SubmissionPayload, SubmissionPipeline, SubmitAck,
    SubmitError, DEFAULT_SUBMISSION_TIMEOUT,
};
pub use validation::{CompanyForm, ContactForm, FieldError, ValidationErrors};
pub use views::AssessmentView;
