use crate::infra::FlakySubmitter;
use ai_quotient::error::AppError;
use ai_quotient::telemetry::NoopTelemetry;
use ai_quotient::workflows::assessment::{
    AnswerSheet, AssessmentPhase, AssessmentResult, AssessmentService, AssessmentSettings,
    CompanyForm, ContactForm, EngineError, QuestionCatalog, SubmitStatus,
};
use chrono::Utc;
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct CatalogArgs {
    /// Emit the catalog as JSON instead of a readable listing
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// CSV answer sheet with `question_id,option_id` rows. Unlisted questions use the test shortcut.
    #[arg(long)]
    pub(crate) answers: Option<PathBuf>,
    /// Company name entered on the user info form
    #[arg(long, default_value = "Northwind Analytics")]
    pub(crate) company: String,
    /// Company size bucket (1-10, 11-50, 51-200, 201-1000, 1000+)
    #[arg(long, default_value = "51-200")]
    pub(crate) company_size: String,
    /// Simulate a CRM outage on the first submission to show the retry path
    #[arg(long)]
    pub(crate) fail_first: bool,
}

pub(crate) fn run_catalog(args: CatalogArgs) -> Result<(), AppError> {
    let catalog = QuestionCatalog::ai_quotient();

    if args.json {
        match serde_json::to_string_pretty(catalog.sections()) {
            Ok(json) => println!("{json}"),
            Err(err) => println!("Catalog JSON unavailable: {err}"),
        }
        return Ok(());
    }

    println!(
        "AI Quotient catalog: {} pillars, {} questions, options scored 1-{}",
        catalog.pillar_count(),
        catalog.question_count(),
        catalog.max_option_value()
    );
    for (index, section) in catalog.sections().iter().enumerate() {
        println!("\nSection {} of {}: {}", index + 1, catalog.pillar_count(), section.pillar.label());
        for question in &section.questions {
            println!("- [{}] {}", question.id, question.prompt);
            for option in &question.options {
                println!("    {} ({}) {}", option.value, option.id, option.text);
            }
        }
    }

    Ok(())
}

/// What a scripted attempt ended with.
#[derive(Debug)]
pub(crate) struct DemoSummary {
    pub(crate) result: AssessmentResult,
    pub(crate) scripted_answers: usize,
    pub(crate) used_shortcut: bool,
    pub(crate) statuses: Vec<SubmitStatus>,
    pub(crate) final_phase: AssessmentPhase,
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    println!(
        "AI Quotient assessment demo ({})",
        Utc::now().format("%Y-%m-%d %H:%M UTC")
    );
    match execute_demo(args).await? {
        Ok(summary) => render_summary(&summary),
        Err(err) => println!("  Demo stopped: {err}"),
    }
    Ok(())
}

pub(crate) async fn execute_demo(
    args: DemoArgs,
) -> Result<Result<DemoSummary, EngineError>, AppError> {
    let sheet = match &args.answers {
        Some(path) => Some(AnswerSheet::from_path(path)?),
        None => None,
    };
    Ok(drive_attempt(args, sheet).await)
}

async fn drive_attempt(
    args: DemoArgs,
    sheet: Option<AnswerSheet>,
) -> Result<DemoSummary, EngineError> {
    let catalog = Arc::new(QuestionCatalog::ai_quotient());
    let submitter = Arc::new(FlakySubmitter::failing_first(u32::from(args.fail_first)));
    let service = AssessmentService::new(
        catalog,
        submitter,
        Arc::new(NoopTelemetry),
        AssessmentSettings::default(),
    );

    let session = service.start();
    println!("- Started attempt {}", session.id());
    session.submit_user_info(&CompanyForm {
        company: args.company,
        company_size: args.company_size,
    })?;

    let mut scripted_answers = 0;
    while session.phase() == AssessmentPhase::Answering {
        let question_id = session
            .inspect(|engine| engine.current_question().map(|question| question.id.clone()));
        let scripted = match (&sheet, question_id) {
            (Some(sheet), Some(question_id)) => sheet.answer_for(&question_id).cloned(),
            _ => None,
        };

        match scripted {
            Some(input) => {
                session.submit_answer(&input)?;
                scripted_answers += 1;
            }
            None => break,
        }
    }

    let used_shortcut = session.phase() == AssessmentPhase::Answering;
    if used_shortcut {
        println!("- Answering remaining questions with the test shortcut");
        session.set_test_mode(true)?;
        session.apply_test_shortcut()?;
    }

    let result = session.result().ok_or(EngineError::InvalidPhase {
        intent: "show results",
        phase: session.phase(),
    })?;

    let contact = ContactForm {
        first_name: "Demo".to_string(),
        last_name: "Respondent".to_string(),
        email: "demo@example.com".to_string(),
        job_title: "Marketing Operations".to_string(),
        accept_terms: true,
    };

    let mut statuses = Vec::new();
    loop {
        let status = session.submit_results(&contact).await?;
        let failed = matches!(status, SubmitStatus::Failed { .. });
        if let SubmitStatus::Failed { message } = &status {
            println!("- Submission failed: {message}");
            println!("  Retrying on request");
        }
        statuses.push(status);
        if !failed || statuses.len() > 1 {
            break;
        }
    }

    Ok(DemoSummary {
        result,
        scripted_answers,
        used_shortcut,
        statuses,
        final_phase: session.phase(),
    })
}

fn render_summary(summary: &DemoSummary) {
    let catalog = QuestionCatalog::ai_quotient();
    let result = &summary.result;

    println!(
        "- {} scripted answers{}",
        summary.scripted_answers,
        if summary.used_shortcut {
            ", rest filled by test shortcut"
        } else {
            ""
        }
    );
    println!(
        "\nOverall: {}/{} ({}%) -> {}",
        result.score,
        result.max_score,
        result.percentage,
        result.readiness_level.label()
    );
    println!("  {}", result.readiness_level.summary());
    println!("Pillar breakdown:");
    for pillar in catalog.pillars() {
        let score = result.pillar_scores.get(&pillar).copied().unwrap_or(0);
        let max = result.max_pillar_scores.get(&pillar).copied().unwrap_or(0);
        println!("  - {}: {}/{}", pillar.label(), score, max);
    }

    println!(
        "\nSubmission attempts: {} -> final phase {}",
        summary.statuses.len(),
        summary.final_phase
    );
}
