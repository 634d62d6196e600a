use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Deserializer};

use super::domain::AnswerInput;

#[derive(Debug, thiserror::Error)]
pub enum AnswerSheetError {
    #[error("failed to read answer sheet: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid answer sheet CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("answer sheet row {row} is missing a {column}")]
    MissingValue { row: usize, column: &'static str },
}

#[derive(Debug, Deserialize)]
struct AnswerRow {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    question_id: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    option_id: Option<String>,
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

/// Scripted answers (`question_id,option_id`) used to replay an attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnswerSheet {
    entries: Vec<AnswerInput>,
}

impl AnswerSheet {
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, AnswerSheetError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut entries = Vec::new();

        for (index, record) in csv_reader.deserialize::<AnswerRow>().enumerate() {
            let row = record?;
            let row_number = index + 2;
            let question_id = row.question_id.ok_or(AnswerSheetError::MissingValue {
                row: row_number,
                column: "question_id",
            })?;
            let option_id = row.option_id.ok_or(AnswerSheetError::MissingValue {
                row: row_number,
                column: "option_id",
            })?;
            entries.push(AnswerInput {
                question_id,
                option_id,
            });
        }

        Ok(Self { entries })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, AnswerSheetError> {
        let file = File::open(path)?;
        Self::from_reader(file)
    }

    /// Latest entry for a question; later rows override earlier ones.
    pub fn answer_for(&self, question_id: &str) -> Option<&AnswerInput> {
        self.entries
            .iter()
            .rev()
            .find(|entry| entry.question_id == question_id)
    }

    pub fn entries(&self) -> &[AnswerInput] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
