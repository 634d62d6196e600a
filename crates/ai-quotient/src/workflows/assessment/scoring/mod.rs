mod readiness;

pub use readiness::{ReadinessLevel, ReadinessThresholds, ThresholdError};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::catalog::{PillarType, QuestionCatalog};
use super::domain::{Answer, UserInfo};

/// Answers keyed by question id.
pub type AnswerSet = BTreeMap<String, Answer>;

pub fn pillar_score(answers: &AnswerSet, pillar: PillarType) -> u32 {
    answers
        .values()
        .filter(|answer| answer.pillar == pillar)
        .map(|answer| answer.value)
        .sum()
}

pub fn max_pillar_score(catalog: &QuestionCatalog, pillar: PillarType) -> u32 {
    catalog.questions_in(pillar).len() as u32 * catalog.max_option_value()
}

/// Fraction of the pillar's questions that have an answer, in `0.0..=1.0`.
pub fn pillar_progress(catalog: &QuestionCatalog, answers: &AnswerSet, pillar: PillarType) -> f64 {
    let questions = catalog.questions_in(pillar);
    if questions.is_empty() {
        return 0.0;
    }

    let answered = questions
        .iter()
        .filter(|question| answers.contains_key(&question.id))
        .count();
    answered as f64 / questions.len() as f64
}

pub fn overall_score(catalog: &QuestionCatalog, answers: &AnswerSet) -> u32 {
    catalog
        .pillars()
        .map(|pillar| pillar_score(answers, pillar))
        .sum()
}

pub fn overall_max(catalog: &QuestionCatalog) -> u32 {
    catalog.question_count() as u32 * catalog.max_option_value()
}

/// `round(score / max * 100)`, halves rounding up.
pub fn percentage(score: u32, max: u32) -> u32 {
    if max == 0 {
        return 0;
    }
    let (score, max) = (u64::from(score), u64::from(max));
    ((score * 200 + max) / (2 * max)) as u32
}

/// Scored snapshot of an attempt. Always recomputed, never edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentResult {
    pub score: u32,
    pub max_score: u32,
    pub percentage: u32,
    pub readiness_level: ReadinessLevel,
    pub pillar_scores: BTreeMap<PillarType, u32>,
    pub max_pillar_scores: BTreeMap<PillarType, u32>,
    pub user_info: UserInfo,
}

/// Stateless scorer applying the readiness table to an answer set.
#[derive(Debug, Clone, Default)]
pub struct ScoringEngine {
    thresholds: ReadinessThresholds,
}

impl ScoringEngine {
    pub fn new(thresholds: ReadinessThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &ReadinessThresholds {
        &self.thresholds
    }

    pub fn score(
        &self,
        catalog: &QuestionCatalog,
        answers: &AnswerSet,
        user_info: &UserInfo,
    ) -> AssessmentResult {
        let pillar_scores: BTreeMap<PillarType, u32> = catalog
            .pillars()
            .map(|pillar| (pillar, pillar_score(answers, pillar)))
            .collect();
        let max_pillar_scores: BTreeMap<PillarType, u32> = catalog
            .pillars()
            .map(|pillar| (pillar, max_pillar_score(catalog, pillar)))
            .collect();

        let score = pillar_scores.values().sum();
        let max_score = overall_max(catalog);
        let percentage = percentage(score, max_score);

        AssessmentResult {
            score,
            max_score,
            percentage,
            readiness_level: self.thresholds.classify(percentage),
            pillar_scores,
            max_pillar_scores,
            user_info: user_info.clone(),
        }
    }
}
