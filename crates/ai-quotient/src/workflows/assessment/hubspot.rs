use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use super::submission::{ResultsSubmitter, SubmissionPayload, SubmitAck, SubmitError};

pub const DEFAULT_FORMS_ENDPOINT: &str =
    "https://api.hsforms.com/submissions/v3/integration/submit";

/// Target form for HubSpot's Forms v3 submission API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubSpotFormTarget {
    pub endpoint: String,
    pub portal_id: String,
    pub form_id: String,
}

impl HubSpotFormTarget {
    pub fn submit_url(&self) -> String {
        format!(
            "{}/{}/{}",
            self.endpoint.trim_end_matches('/'),
            self.portal_id,
            self.form_id
        )
    }
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct HubSpotSubmission {
    pub(crate) submitted_at: String,
    pub(crate) fields: Vec<HubSpotField>,
    pub(crate) context: HubSpotContext,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct HubSpotField {
    pub(crate) object_type_id: &'static str,
    pub(crate) name: String,
    pub(crate) value: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct HubSpotContext {
    pub(crate) page_name: &'static str,
}

const CONTACT_OBJECT: &str = "0-1";

fn field(name: impl Into<String>, value: impl ToString) -> HubSpotField {
    HubSpotField {
        object_type_id: CONTACT_OBJECT,
        name: name.into(),
        value: value.to_string(),
    }
}

pub(crate) fn to_hubspot(payload: &SubmissionPayload) -> HubSpotSubmission {
    let mut fields = vec![
        field("firstname", &payload.first_name),
        field("lastname", &payload.last_name),
        field("email", &payload.email),
        field("jobtitle", &payload.job_title),
        field("company", &payload.company),
        field("company_size", &payload.company_size),
        field("ai_quotient_score", payload.score),
        field("ai_quotient_percentage", payload.percentage),
        field("ai_quotient_readiness", payload.readiness_level.slug()),
    ];
    fields.extend(
        payload
            .pillar_scores
            .iter()
            .map(|(pillar, score)| field(format!("ai_quotient_{pillar}"), score)),
    );

    HubSpotSubmission {
        submitted_at: payload.submitted_at.timestamp_millis().to_string(),
        fields,
        context: HubSpotContext {
            page_name: "AI Quotient Assessment",
        },
    }
}

/// Posts results to a HubSpot form. 2xx is accepted, 4xx is a rejection, and
/// anything else is a transport failure.
#[derive(Debug, Clone)]
pub struct HubSpotFormsSubmitter {
    client: reqwest::Client,
    target: HubSpotFormTarget,
}

impl HubSpotFormsSubmitter {
    pub fn new(client: reqwest::Client, target: HubSpotFormTarget) -> Self {
        Self { client, target }
    }

    pub fn target(&self) -> &HubSpotFormTarget {
        &self.target
    }
}

#[async_trait]
impl ResultsSubmitter for HubSpotFormsSubmitter {
    async fn submit(&self, payload: &SubmissionPayload) -> Result<SubmitAck, SubmitError> {
        let body = to_hubspot(payload);
        let response = self
            .client
            .post(self.target.submit_url())
            .json(&body)
            .send()
            .await
            .map_err(|err| SubmitError::Transport(err.to_string()))?;

        let status = response.status();
        debug!(status = status.as_u16(), "hubspot form responded");
        if status.is_success() {
            Ok(SubmitAck { ok: true })
        } else if status.is_client_error() {
            Ok(SubmitAck { ok: false })
        } else {
            Err(SubmitError::Status(status.as_u16()))
        }
    }
}
