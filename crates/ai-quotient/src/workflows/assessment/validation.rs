//! Declarative field validation for the two user-info tiers.
//!
//! Each form is described by a [`FormSchema`]; the state machine only sees the
//! typed profile produced after the schema passes, so rules can change here
//! without touching navigation or scoring.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::domain::{CompanyProfile, CompanySize, ContactDetails};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRule {
    Required,
    MaxLength(usize),
    Email,
    OneOf(&'static [&'static str]),
    Accepted,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldDefinition {
    pub field: &'static str,
    pub label: &'static str,
    pub rules: &'static [FieldRule],
}

#[derive(Debug, Clone, Copy)]
pub struct FormSchema {
    pub name: &'static str,
    pub fields: &'static [FieldDefinition],
}

pub const COMPANY_SCHEMA: FormSchema = FormSchema {
    name: "company",
    fields: &[
        FieldDefinition {
            field: "company",
            label: "Company",
            rules: &[FieldRule::Required, FieldRule::MaxLength(120)],
        },
        FieldDefinition {
            field: "company_size",
            label: "Company size",
            rules: &[FieldRule::Required, FieldRule::OneOf(CompanySize::LABELS)],
        },
    ],
};

pub const CONTACT_SCHEMA: FormSchema = FormSchema {
    name: "contact",
    fields: &[
        FieldDefinition {
            field: "first_name",
            label: "First name",
            rules: &[FieldRule::Required, FieldRule::MaxLength(80)],
        },
        FieldDefinition {
            field: "last_name",
            label: "Last name",
            rules: &[FieldRule::Required, FieldRule::MaxLength(80)],
        },
        FieldDefinition {
            field: "email",
            label: "Work email",
            rules: &[
                FieldRule::Required,
                FieldRule::Email,
                FieldRule::MaxLength(254),
            ],
        },
        FieldDefinition {
            field: "job_title",
            label: "Job title",
            rules: &[FieldRule::Required, FieldRule::MaxLength(120)],
        },
        FieldDefinition {
            field: "accept_terms",
            label: "Terms",
            rules: &[FieldRule::Accepted],
        },
    ],
};

pub enum FieldValue<'a> {
    Text(&'a str),
    Flag(bool),
}

/// Lookup of raw form values by field name.
pub trait FormValues {
    fn value(&self, field: &str) -> Option<FieldValue<'_>>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationErrors {
    pub form: &'static str,
    pub errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn single(form: &'static str, field: &str, message: impl Into<String>) -> Self {
        Self {
            form,
            errors: vec![FieldError {
                field: field.to_string(),
                message: message.into(),
            }],
        }
    }

    pub fn fields(&self) -> Vec<&str> {
        self.errors.iter().map(|error| error.field.as_str()).collect()
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.errors.iter().any(|error| error.field == field)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {} form: ", self.form)?;
        let messages: Vec<&str> = self
            .errors
            .iter()
            .map(|error| error.message.as_str())
            .collect();
        f.write_str(&messages.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles")
    })
}

fn check_rule(
    rule: FieldRule,
    field: &FieldDefinition,
    value: Option<&FieldValue<'_>>,
) -> Option<String> {
    let text = match value {
        Some(FieldValue::Text(text)) => Some(text.trim()),
        _ => None,
    };

    match rule {
        FieldRule::Required => match text {
            Some(text) if !text.is_empty() => None,
            _ => Some(format!("{} is required", field.label)),
        },
        FieldRule::MaxLength(limit) => text
            .filter(|text| text.chars().count() > limit)
            .map(|_| format!("{} must be at most {limit} characters", field.label)),
        FieldRule::Email => text
            .filter(|text| !text.is_empty() && !email_pattern().is_match(text))
            .map(|_| format!("{} must be a valid email address", field.label)),
        FieldRule::OneOf(allowed) => text
            .filter(|text| !text.is_empty() && !allowed.iter().any(|choice| *choice == *text))
            .map(|_| format!("{} must be one of: {}", field.label, allowed.join(", "))),
        FieldRule::Accepted => match value {
            Some(FieldValue::Flag(true)) => None,
            _ => Some(format!("{} must be accepted to continue", field.label)),
        },
    }
}

/// Apply a schema, reporting the first failing rule of every field.
pub fn validate<F: FormValues>(schema: &FormSchema, form: &F) -> Result<(), ValidationErrors> {
    let errors: Vec<FieldError> = schema
        .fields
        .iter()
        .filter_map(|definition| {
            let value = form.value(definition.field);
            definition
                .rules
                .iter()
                .find_map(|rule| check_rule(*rule, definition, value.as_ref()))
                .map(|message| FieldError {
                    field: definition.field.to_string(),
                    message,
                })
        })
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationErrors {
            form: schema.name,
            errors,
        })
    }
}

/// Raw minimal-tier input as captured by the user info form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyForm {
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub company_size: String,
}

impl FormValues for CompanyForm {
    fn value(&self, field: &str) -> Option<FieldValue<'_>> {
        match field {
            "company" => Some(FieldValue::Text(&self.company)),
            "company_size" => Some(FieldValue::Text(&self.company_size)),
            _ => None,
        }
    }
}

impl CompanyForm {
    pub fn validate(&self) -> Result<CompanyProfile, ValidationErrors> {
        validate(&COMPANY_SCHEMA, self)?;
        let company_size = CompanySize::parse(&self.company_size).ok_or_else(|| {
            ValidationErrors::single(COMPANY_SCHEMA.name, "company_size", "Unknown company size")
        })?;

        Ok(CompanyProfile {
            company: self.company.trim().to_string(),
            company_size,
        })
    }
}

impl From<&CompanyProfile> for CompanyForm {
    fn from(profile: &CompanyProfile) -> Self {
        Self {
            company: profile.company.clone(),
            company_size: profile.company_size.label().to_string(),
        }
    }
}

/// Raw full-tier input as captured by the submit results form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactForm {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub job_title: String,
    #[serde(default)]
    pub accept_terms: bool,
}

impl FormValues for ContactForm {
    fn value(&self, field: &str) -> Option<FieldValue<'_>> {
        match field {
            "first_name" => Some(FieldValue::Text(&self.first_name)),
            "last_name" => Some(FieldValue::Text(&self.last_name)),
            "email" => Some(FieldValue::Text(&self.email)),
            "job_title" => Some(FieldValue::Text(&self.job_title)),
            "accept_terms" => Some(FieldValue::Flag(self.accept_terms)),
            _ => None,
        }
    }
}

impl ContactForm {
    pub fn validate(&self) -> Result<ContactDetails, ValidationErrors> {
        validate(&CONTACT_SCHEMA, self)?;

        Ok(ContactDetails {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            email: self.email.trim().to_ascii_lowercase(),
            job_title: self.job_title.trim().to_string(),
            accept_terms: self.accept_terms,
        })
    }
}
