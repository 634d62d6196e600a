use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Dimensions the AI Quotient assessment measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PillarType {
    DataSpineHealth,
    FunnelIntelligence,
    AutomationMaturity,
    ContentOperations,
    Governance,
}

impl PillarType {
    pub const fn ordered() -> [Self; 5] {
        [
            Self::DataSpineHealth,
            Self::FunnelIntelligence,
            Self::AutomationMaturity,
            Self::ContentOperations,
            Self::Governance,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::DataSpineHealth => "Data Spine Health",
            Self::FunnelIntelligence => "Funnel Intelligence",
            Self::AutomationMaturity => "Automation Maturity",
            Self::ContentOperations => "Content Operations",
            Self::Governance => "Governance",
        }
    }

    pub const fn slug(self) -> &'static str {
        match self {
            Self::DataSpineHealth => "data_spine_health",
            Self::FunnelIntelligence => "funnel_intelligence",
            Self::AutomationMaturity => "automation_maturity",
            Self::ContentOperations => "content_operations",
            Self::Governance => "governance",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOption {
    pub id: String,
    pub text: String,
    pub value: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub pillar: PillarType,
    pub prompt: String,
    pub options: Vec<AnswerOption>,
}

impl Question {
    pub fn option(&self, option_id: &str) -> Option<&AnswerOption> {
        self.options.iter().find(|option| option.id == option_id)
    }

    pub fn max_value(&self) -> u32 {
        self.options
            .iter()
            .map(|option| option.value)
            .max()
            .unwrap_or(0)
    }
}

/// Questions belonging to one pillar, in presentation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PillarSection {
    pub pillar: PillarType,
    pub questions: Vec<Question>,
}

/// Position of a question inside the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuestionSlot {
    pub section: usize,
    pub position: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("catalog has no pillars")]
    Empty,
    #[error("pillar {0:?} is declared more than once")]
    DuplicatePillar(PillarType),
    #[error("pillar {0:?} has no questions")]
    EmptyPillar(PillarType),
    #[error("question id `{0}` is not unique")]
    DuplicateQuestion(String),
    #[error("question `{question_id}` is filed under {section:?} but declares {declared:?}")]
    PillarMismatch {
        question_id: String,
        section: PillarType,
        declared: PillarType,
    },
    #[error("question `{0}` has no options")]
    NoOptions(String),
    #[error("option id `{option_id}` repeats within question `{question_id}`")]
    DuplicateOption {
        question_id: String,
        option_id: String,
    },
    #[error("question `{question_id}` tops out at {found} points, catalog maximum is {expected}")]
    InconsistentMaxValue {
        question_id: String,
        expected: u32,
        found: u32,
    },
}

/// Read-only question catalog shared by every assessment attempt.
///
/// Pillars keep their declared order and questions keep their order within a
/// pillar. Step indexes used by the state machine refer to the flattened
/// sequence produced by walking the sections in that order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionCatalog {
    sections: Vec<PillarSection>,
    slots: Vec<QuestionSlot>,
    max_option_value: u32,
}

impl QuestionCatalog {
    /// Validate and index a catalog.
    pub fn new(sections: Vec<PillarSection>) -> Result<Self, CatalogError> {
        validate_sections(&sections)?;
        Ok(Self::assemble(sections))
    }

    fn assemble(sections: Vec<PillarSection>) -> Self {
        let slots = sections
            .iter()
            .enumerate()
            .flat_map(|(section, entry)| {
                (0..entry.questions.len()).map(move |position| QuestionSlot { section, position })
            })
            .collect();

        let max_option_value = sections
            .iter()
            .flat_map(|section| section.questions.iter())
            .map(Question::max_value)
            .max()
            .unwrap_or(0);

        Self {
            sections,
            slots,
            max_option_value,
        }
    }

    pub fn sections(&self) -> &[PillarSection] {
        &self.sections
    }

    pub fn pillars(&self) -> impl Iterator<Item = PillarType> + '_ {
        self.sections.iter().map(|section| section.pillar)
    }

    pub fn pillar_count(&self) -> usize {
        self.sections.len()
    }

    pub fn section_index(&self, pillar: PillarType) -> Option<usize> {
        self.sections
            .iter()
            .position(|section| section.pillar == pillar)
    }

    pub fn questions_in(&self, pillar: PillarType) -> &[Question] {
        self.section_index(pillar)
            .map(|index| self.sections[index].questions.as_slice())
            .unwrap_or(&[])
    }

    pub fn question_count(&self) -> usize {
        self.slots.len()
    }

    /// Highest option value any question offers (`V_max`).
    pub fn max_option_value(&self) -> u32 {
        self.max_option_value
    }

    pub fn slot(&self, step: usize) -> Option<QuestionSlot> {
        self.slots.get(step).copied()
    }

    pub fn question_at(&self, step: usize) -> Option<&Question> {
        let slot = self.slot(step)?;
        self.sections
            .get(slot.section)
            .and_then(|section| section.questions.get(slot.position))
    }

    pub fn find_question(&self, question_id: &str) -> Option<&Question> {
        self.sections
            .iter()
            .flat_map(|section| section.questions.iter())
            .find(|question| question.id == question_id)
    }

    pub fn step_of(&self, question_id: &str) -> Option<usize> {
        (0..self.slots.len()).find(|step| {
            self.question_at(*step)
                .map(|question| question.id == question_id)
                .unwrap_or(false)
        })
    }

    pub fn first_step_of(&self, pillar: PillarType) -> Option<usize> {
        let section = self.section_index(pillar)?;
        self.slots.iter().position(|slot| slot.section == section)
    }

    pub fn is_last_in_pillar(&self, step: usize) -> bool {
        match self.slot(step) {
            Some(slot) => slot.position + 1 == self.sections[slot.section].questions.len(),
            None => false,
        }
    }

    /// Built-in AI Quotient questionnaire.
    pub fn ai_quotient() -> Self {
        Self::assemble(ai_quotient_sections())
    }
}

fn validate_sections(sections: &[PillarSection]) -> Result<(), CatalogError> {
    if sections.is_empty() {
        return Err(CatalogError::Empty);
    }

    let mut pillars = HashSet::new();
    let mut question_ids = HashSet::new();
    let mut expected_max = None;

    for section in sections {
        if !pillars.insert(section.pillar) {
            return Err(CatalogError::DuplicatePillar(section.pillar));
        }
        if section.questions.is_empty() {
            return Err(CatalogError::EmptyPillar(section.pillar));
        }

        for question in &section.questions {
            if !question_ids.insert(question.id.as_str()) {
                return Err(CatalogError::DuplicateQuestion(question.id.clone()));
            }
            if question.pillar != section.pillar {
                return Err(CatalogError::PillarMismatch {
                    question_id: question.id.clone(),
                    section: section.pillar,
                    declared: question.pillar,
                });
            }
            if question.options.is_empty() {
                return Err(CatalogError::NoOptions(question.id.clone()));
            }

            let mut option_ids = HashSet::new();
            for option in &question.options {
                if !option_ids.insert(option.id.as_str()) {
                    return Err(CatalogError::DuplicateOption {
                        question_id: question.id.clone(),
                        option_id: option.id.clone(),
                    });
                }
            }

            let found = question.max_value();
            match expected_max {
                None => expected_max = Some(found),
                Some(expected) if expected != found => {
                    return Err(CatalogError::InconsistentMaxValue {
                        question_id: question.id.clone(),
                        expected,
                        found,
                    });
                }
                Some(_) => {}
            }
        }
    }

    Ok(())
}

fn question(id: &str, pillar: PillarType, prompt: &str, options: [&str; 4]) -> Question {
    Question {
        id: id.to_string(),
        pillar,
        prompt: prompt.to_string(),
        options: options
            .iter()
            .zip(1u32..)
            .map(|(text, value)| AnswerOption {
                id: format!("{id}-{value}"),
                text: (*text).to_string(),
                value,
            })
            .collect(),
    }
}

fn ai_quotient_sections() -> Vec<PillarSection> {
    use PillarType::*;

    vec![
        PillarSection {
            pillar: DataSpineHealth,
            questions: vec![
                question(
                    "data-unified-profile",
                    DataSpineHealth,
                    "How unified is your customer data across CRM, marketing, and product systems?",
                    [
                        "Siloed spreadsheets and disconnected tools",
                        "Some integrations, frequent manual reconciliation",
                        "Core systems synced with occasional gaps",
                        "Single trusted customer record across systems",
                    ],
                ),
                question(
                    "data-quality",
                    DataSpineHealth,
                    "How would you rate the quality of your CRM records?",
                    [
                        "Duplicates and missing fields are common",
                        "Periodic clean-ups, quality drifts between them",
                        "Validation rules catch most issues at entry",
                        "Continuously monitored with automated enrichment",
                    ],
                ),
                question(
                    "data-access",
                    DataSpineHealth,
                    "How easily can teams access the data they need to make decisions?",
                    [
                        "Requests go through one overloaded analyst",
                        "Static reports shared on a schedule",
                        "Self-serve dashboards for most teams",
                        "Governed self-serve access including AI tooling",
                    ],
                ),
            ],
        },
        PillarSection {
            pillar: FunnelIntelligence,
            questions: vec![
                question(
                    "funnel-attribution",
                    FunnelIntelligence,
                    "How do you attribute pipeline to marketing and sales activity?",
                    [
                        "We don't track attribution",
                        "First- or last-touch only",
                        "Multi-touch model reviewed quarterly",
                        "Data-driven attribution informing budget in real time",
                    ],
                ),
                question(
                    "funnel-scoring",
                    FunnelIntelligence,
                    "How are leads prioritized for follow-up?",
                    [
                        "First come, first served",
                        "Manual qualification by reps",
                        "Rule-based lead scoring",
                        "Predictive scoring retrained on outcomes",
                    ],
                ),
                question(
                    "funnel-forecasting",
                    FunnelIntelligence,
                    "How accurate is your revenue forecasting?",
                    [
                        "Gut feel each quarter",
                        "Spreadsheet roll-ups from reps",
                        "CRM-based forecast within 20%",
                        "Model-assisted forecast within 10%",
                    ],
                ),
            ],
        },
        PillarSection {
            pillar: AutomationMaturity,
            questions: vec![
                question(
                    "automation-workflows",
                    AutomationMaturity,
                    "How much of your lead routing and nurturing is automated?",
                    [
                        "Almost entirely manual",
                        "A few email sequences",
                        "Most routing and nurture flows automated",
                        "End-to-end orchestration with AI-driven next steps",
                    ],
                ),
                question(
                    "automation-handoffs",
                    AutomationMaturity,
                    "How do handoffs between marketing, sales, and success work?",
                    [
                        "Ad hoc messages and meetings",
                        "Documented process, manually executed",
                        "Automated handoffs with SLAs",
                        "Automated handoffs with context summaries and alerts",
                    ],
                ),
                question(
                    "automation-monitoring",
                    AutomationMaturity,
                    "How are broken automations detected?",
                    [
                        "When a customer complains",
                        "Spot checks when someone remembers",
                        "Error alerts on critical workflows",
                        "Monitored workflows with owners and runbooks",
                    ],
                ),
            ],
        },
        PillarSection {
            pillar: ContentOperations,
            questions: vec![
                question(
                    "content-production",
                    ContentOperations,
                    "How do you produce marketing and sales content today?",
                    [
                        "One-off pieces with no process",
                        "Editorial calendar, fully manual drafting",
                        "AI-assisted drafting for some formats",
                        "Templated AI-assisted pipeline with human review",
                    ],
                ),
                question(
                    "content-personalization",
                    ContentOperations,
                    "How personalized is the content prospects receive?",
                    [
                        "Same content for everyone",
                        "Segmented by a few broad personas",
                        "Dynamic content by segment and stage",
                        "Individually tailored content driven by behavior",
                    ],
                ),
                question(
                    "content-performance",
                    ContentOperations,
                    "How do you measure content performance?",
                    [
                        "We don't",
                        "Traffic and opens only",
                        "Engagement tied to pipeline stages",
                        "Content influence on revenue feeds planning",
                    ],
                ),
            ],
        },
        PillarSection {
            pillar: Governance,
            questions: vec![
                question(
                    "governance-policy",
                    Governance,
                    "Do you have a policy for how teams may use AI tools?",
                    [
                        "No policy",
                        "Informal guidance",
                        "Written policy shared with teams",
                        "Enforced policy with approved tooling and training",
                    ],
                ),
                question(
                    "governance-privacy",
                    Governance,
                    "How is customer consent and privacy handled in your data flows?",
                    [
                        "Not actively managed",
                        "Handled case by case",
                        "Consent tracked in the CRM",
                        "Consent enforced automatically across every system",
                    ],
                ),
                question(
                    "governance-ownership",
                    Governance,
                    "Who owns your revenue technology and AI roadmap?",
                    [
                        "Nobody in particular",
                        "Whoever has spare time",
                        "A dedicated operations owner",
                        "A cross-functional council with an executive sponsor",
                    ],
                ),
            ],
        },
    ]
}
