mod telemetry;

use std::process::ExitCode;

use ai_llm_service::OpenAiService;
use git_context_engine::GitLabClient;
use mr_reviewer::config::AppConfig;
use mr_reviewer::errors::Error;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

const EXIT_RUN_FAILED: u8 = 1;
const EXIT_CONFIG: u8 = 2;
const EXIT_CANCELLED: u8 = 130;

#[tokio::main]
async fn main() -> ExitCode {
    // .env is optional; real environment variables win.
    let dotenv = dotenvy::dotenv();

    if let Err(e) = telemetry::init() {
        eprintln!("failed to initialise logging: {e}");
    }
    if let Err(e) = dotenv {
        if !e.not_found() {
            warn!(error = %e, "could not read .env file");
        }
    }

    // Nothing touches the network until configuration is complete.
    let cfg = match AppConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(error = %e, "configuration error");
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    let host = match GitLabClient::new(&cfg.gitlab) {
        Ok(host) => host,
        Err(e) => {
            error!(error = %e, "failed to build GitLab client");
            return ExitCode::from(EXIT_RUN_FAILED);
        }
    };
    let model = match OpenAiService::new(cfg.llm.clone()) {
        Ok(model) => model,
        Err(e) => {
            error!(error = %e, "failed to build OpenAI client");
            return ExitCode::from(EXIT_RUN_FAILED);
        }
    };

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Ctrl+C received, cancelling review run");
            on_ctrl_c.cancel();
        }
    });

    info!(
        project = %cfg.review.project,
        model = model.model(),
        dry_run = cfg.review.dry_run,
        "starting review run"
    );

    match mr_reviewer::run_review(&host, &model, &cfg.review, &cancel).await {
        Ok(report) => {
            info!(?report, "done");
            ExitCode::SUCCESS
        }
        Err(Error::Cancelled) => {
            warn!("review run cancelled");
            ExitCode::from(EXIT_CANCELLED)
        }
        Err(e) => {
            error!(error = %e, "review run failed");
            ExitCode::from(EXIT_RUN_FAILED)
        }
    }
}
