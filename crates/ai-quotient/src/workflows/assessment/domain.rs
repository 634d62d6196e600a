use serde::{Deserialize, Serialize};
use std::fmt;

use super::catalog::PillarType;

/// Identifier for a single assessment attempt.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AttemptId(pub String);

impl fmt::Display for AttemptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A recorded response. `value` and `pillar` are copied from the catalog at
/// answer time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub question_id: String,
    pub option_id: String,
    pub value: u32,
    pub pillar: PillarType,
}

/// Intent payload for answering the current question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerInput {
    pub question_id: String,
    pub option_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompanySize {
    #[serde(rename = "1-10")]
    Micro,
    #[serde(rename = "11-50")]
    Small,
    #[serde(rename = "51-200")]
    Medium,
    #[serde(rename = "201-1000")]
    Large,
    #[serde(rename = "1000+")]
    Enterprise,
}

impl CompanySize {
    pub const LABELS: &'static [&'static str] = &["1-10", "11-50", "51-200", "201-1000", "1000+"];

    pub const fn ordered() -> [Self; 5] {
        [
            Self::Micro,
            Self::Small,
            Self::Medium,
            Self::Large,
            Self::Enterprise,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Micro => "1-10",
            Self::Small => "11-50",
            Self::Medium => "51-200",
            Self::Large => "201-1000",
            Self::Enterprise => "1000+",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        Self::ordered()
            .into_iter()
            .find(|size| size.label() == trimmed)
    }
}

/// Minimal tier: required to begin the questionnaire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyProfile {
    pub company: String,
    pub company_size: CompanySize,
}

/// Full tier: required to submit results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactDetails {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub job_title: String,
    pub accept_terms: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub company: Option<CompanyProfile>,
    pub contact: Option<ContactDetails>,
}

impl UserInfo {
    pub fn has_minimal_tier(&self) -> bool {
        self.company.is_some()
    }

    pub fn has_full_tier(&self) -> bool {
        self.company.is_some()
            && self
                .contact
                .as_ref()
                .map(|contact| contact.accept_terms)
                .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentPhase {
    CollectingUserInfo,
    Answering,
    ShowingResults,
    Submitting,
    SubmitFailed,
    Submitted,
}

impl AssessmentPhase {
    pub const fn label(self) -> &'static str {
        match self {
            Self::CollectingUserInfo => "collecting user info",
            Self::Answering => "answering",
            Self::ShowingResults => "showing results",
            Self::Submitting => "submitting",
            Self::SubmitFailed => "submit failed",
            Self::Submitted => "submitted",
        }
    }

    /// Phases in which a scored result exists.
    pub const fn has_result(self) -> bool {
        matches!(
            self,
            Self::ShowingResults | Self::Submitting | Self::SubmitFailed | Self::Submitted
        )
    }
}

impl fmt::Display for AssessmentPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
