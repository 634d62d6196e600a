use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use ai_quotient::workflows::assessment::{
    HubSpotFormsSubmitter, ResultsSubmitter, SubmissionPayload, SubmitAck, SubmitError,
};
use async_trait::async_trait;
use metrics_exporter_prometheus::PrometheusHandle;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Accepts every submission and logs the non-identifying parts of it.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct LoggingSubmitter;

#[async_trait]
impl ResultsSubmitter for LoggingSubmitter {
    async fn submit(&self, payload: &SubmissionPayload) -> Result<SubmitAck, SubmitError> {
        info!(
            percentage = payload.percentage,
            readiness = payload.readiness_level.slug(),
            company_size = %payload.company_size,
            "results accepted by logging submitter"
        );
        Ok(SubmitAck { ok: true })
    }
}

/// Fails the first `failures` calls with a transport error, then accepts.
#[derive(Debug, Default)]
pub(crate) struct FlakySubmitter {
    failures: u32,
    calls: AtomicU32,
}

impl FlakySubmitter {
    pub(crate) fn failing_first(failures: u32) -> Self {
        Self {
            failures,
            calls: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl ResultsSubmitter for FlakySubmitter {
    async fn submit(&self, _payload: &SubmissionPayload) -> Result<SubmitAck, SubmitError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            return Err(SubmitError::Transport(
                "simulated network outage".to_string(),
            ));
        }
        Ok(SubmitAck { ok: true })
    }
}

/// CRM destination chosen at startup.
#[derive(Debug, Clone)]
pub(crate) enum CrmSubmitter {
    HubSpot(HubSpotFormsSubmitter),
    Logging(LoggingSubmitter),
}

impl CrmSubmitter {
    pub(crate) fn label(&self) -> &'static str {
        match self {
            CrmSubmitter::HubSpot(_) => "hubspot",
            CrmSubmitter::Logging(_) => "logging",
        }
    }
}

#[async_trait]
impl ResultsSubmitter for CrmSubmitter {
    async fn submit(&self, payload: &SubmissionPayload) -> Result<SubmitAck, SubmitError> {
        match self {
            CrmSubmitter::HubSpot(submitter) => submitter.submit(payload).await,
            CrmSubmitter::Logging(submitter) => submitter.submit(payload).await,
        }
    }
}
