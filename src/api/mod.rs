use axum::{
    Router,
    extract::{Json, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{error, info, info_span};

use crate::config::{AppConfig, resolve_config_path};
use crate::core::{
    InvestmentMemoInput, RoiEngine, RoiError, SimulationRequest, SimulationResult,
    format_currency, format_percent,
};

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(
    name = "talent-roi",
    about = "Monte Carlo ROI estimator for cloud engineering hires",
    after_help = "Run `talent-roi serve [port]` to expose the same engine over HTTP."
)]
pub struct Cli {
    #[arg(long, env = "TALENT_ROI_CONFIG", help = "YAML configuration file")]
    config: Option<PathBuf>,
    #[arg(long, required_unless_present_any = ["list_roles", "memo_input"])]
    role: Option<String>,
    #[arg(long, required_unless_present_any = ["list_roles", "memo_input"])]
    team_size: Option<u32>,
    #[arg(
        long,
        allow_negative_numbers = true,
        required_unless_present_any = ["list_roles", "memo_input"],
        help = "Annual cloud spend in USD"
    )]
    cloud_spend: Option<f64>,
    #[arg(long, help = "Number of Monte Carlo trials; defaults to the configured value")]
    trials: Option<u32>,
    #[arg(long, help = "Random seed; defaults to the configured value")]
    seed: Option<u64>,
    #[arg(long, help = "Compensation band used for cost; defaults to the configured value")]
    seniority: Option<String>,
    #[arg(long, help = "Also render the investment memo")]
    report: bool,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
    #[arg(long, help = "Memo analysis id; derived from date and seed when omitted")]
    analysis_id: Option<String>,
    #[arg(long, help = "Memo date (YYYY-MM-DD); defaults to today")]
    as_of: Option<String>,
    #[arg(long, help = "Render a memo from a JSON record instead of simulating")]
    memo_input: Option<PathBuf>,
    #[arg(long, help = "List the configured roles and exit")]
    list_roles: bool,
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Roi(#[from] RoiError),
    #[error("{0}")]
    Usage(String),
}

impl CliError {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            CliError::Roi(RoiError::ConfigurationLoad { .. }) => ExitCode::from(1),
            CliError::Roi(RoiError::UnknownRole { .. }) => ExitCode::from(3),
            CliError::Roi(_) | CliError::Usage(_) => ExitCode::from(2),
        }
    }
}

/// Loads configuration and wraps the engine in the process-level span.
/// Failure here is fatal for every surface.
pub fn load_engine(explicit: Option<PathBuf>) -> Result<RoiEngine, RoiError> {
    let path = resolve_config_path(explicit);
    let engine = AppConfig::load(&path)?
        .into_engine()
        .with_span(info_span!("roi_engine", config = %path.display()));
    info!(
        path = %path.display(),
        roles = engine.roles().role_ids().count(),
        "loaded configuration"
    );
    Ok(engine)
}

pub fn run_cli(cli: Cli) -> ExitCode {
    let engine = match load_engine(cli.config.clone()) {
        Ok(engine) => engine,
        Err(e) => {
            error!("{e}");
            eprintln!("Configuration error: {e}");
            return ExitCode::from(1);
        }
    };

    match execute(&cli, &engine) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e}");
            e.exit_code()
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SimulateResponse {
    result: SimulationResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    memo_input: Option<InvestmentMemoInput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    memo: Option<String>,
}

#[derive(Debug, Clone, Default)]
struct MemoOptions {
    enabled: bool,
    analysis_id: Option<String>,
    as_of: Option<String>,
}

fn execute(cli: &Cli, engine: &RoiEngine) -> Result<String, CliError> {
    if cli.list_roles {
        return Ok(engine.roles().role_ids().collect::<Vec<_>>().join("\n"));
    }

    if let Some(path) = &cli.memo_input {
        let raw = fs::read_to_string(path)
            .map_err(|e| CliError::Usage(format!("failed to read {}: {e}", path.display())))?;
        let input: InvestmentMemoInput = serde_json::from_str(&raw)
            .map_err(|e| CliError::Usage(format!("invalid memo record {}: {e}", path.display())))?;
        return Ok(engine.render_memo(&input)?);
    }

    let request = request_from_cli(cli)?;
    let memo = MemoOptions {
        enabled: cli.report,
        analysis_id: cli.analysis_id.clone(),
        as_of: cli.as_of.clone(),
    };
    let response = run_simulation(engine, &request, &memo)?;

    match cli.format {
        OutputFormat::Json => serde_json::to_string_pretty(&response)
            .map_err(|e| CliError::Usage(format!("failed to encode result: {e}"))),
        OutputFormat::Text => Ok(render_text(&response)),
    }
}

fn request_from_cli(cli: &Cli) -> Result<SimulationRequest, CliError> {
    let missing = |flag: &str| CliError::Usage(format!("{flag} is required"));
    Ok(SimulationRequest {
        role: cli.role.clone().ok_or_else(|| missing("--role"))?,
        team_size: cli.team_size.ok_or_else(|| missing("--team-size"))?,
        cloud_spend: cli.cloud_spend.ok_or_else(|| missing("--cloud-spend"))?,
        trials: cli.trials,
        seed: cli.seed,
        seniority: cli.seniority.clone(),
    })
}

fn run_simulation(
    engine: &RoiEngine,
    request: &SimulationRequest,
    memo: &MemoOptions,
) -> Result<SimulateResponse, RoiError> {
    let result = engine.run(request)?;
    if !memo.enabled {
        return Ok(SimulateResponse {
            result,
            memo_input: None,
            memo: None,
        });
    }

    let as_of = memo.as_of.clone().unwrap_or_else(today);
    let analysis_id = memo
        .analysis_id
        .clone()
        .unwrap_or_else(|| default_analysis_id(&as_of, result.seed));
    let memo_input = engine.memo_input(&analysis_id, &as_of, &result)?;
    let rendered = engine.render_memo(&memo_input)?;

    Ok(SimulateResponse {
        result,
        memo_input: Some(memo_input),
        memo: Some(rendered),
    })
}

fn today() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}

fn default_analysis_id(as_of: &str, seed: u64) -> String {
    format!("CTIS-{as_of}-{:03}", seed % 1000)
}

fn render_text(response: &SimulateResponse) -> String {
    let r = &response.result;
    let risk_adjusted = r
        .risk_adjusted_return
        .map(|v| format!("{v:.4}"))
        .unwrap_or_else(|| "undefined (zero volatility)".to_string());
    let mut lines = vec![
        format!(
            "Analysis results for {} x {} ({} band, {} trials, seed {}):",
            r.team_size, r.role, r.seniority, r.trials, r.seed
        ),
        format!("annual_cost: {}", format_currency(r.annual_cost)),
        format!("mean_annual_value: {}", format_currency(r.mean_annual_value)),
        format!("mean_roi: {:.4} ({})", r.mean_roi, format_percent(r.mean_roi)),
        format!("std_dev_roi: {:.4}", r.std_dev_roi),
        format!("median_roi: {:.4}", r.median_roi),
        format!("percentile_90: {:.4}", r.percentile_90),
        format!("percentile_95: {:.4}", r.percentile_95),
        format!("value_at_risk_95: {:.4}", r.value_at_risk_95),
        format!("expected_shortfall_95: {:.4}", r.expected_shortfall_95),
        format!("risk_adjusted_return: {risk_adjusted}"),
    ];
    if let Some(memo) = &response.memo {
        lines.push(String::new());
        lines.push(memo.trim_end().to_string());
    }
    lines.join("\n")
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SimulatePayload {
    role: Option<String>,
    team_size: Option<u32>,
    cloud_spend: Option<f64>,
    trials: Option<u32>,
    seed: Option<u64>,
    seniority: Option<String>,
    memo: Option<bool>,
    analysis_id: Option<String>,
    as_of: Option<String>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<&'static str>,
}

#[derive(Debug, Serialize)]
struct MemoResponse {
    memo: String,
}

#[derive(Debug, Serialize)]
struct RolesResponse {
    roles: Vec<String>,
}

fn request_from_payload(payload: &SimulatePayload) -> Result<SimulationRequest, RoiError> {
    Ok(SimulationRequest {
        role: payload
            .role
            .clone()
            .ok_or(RoiError::MissingField { field: "role" })?,
        team_size: payload
            .team_size
            .ok_or(RoiError::MissingField { field: "team_size" })?,
        cloud_spend: payload
            .cloud_spend
            .ok_or(RoiError::MissingField { field: "cloud_spend" })?,
        trials: payload.trials,
        seed: payload.seed,
        seniority: payload.seniority.clone(),
    })
}

fn memo_options_from_payload(payload: &SimulatePayload) -> MemoOptions {
    MemoOptions {
        enabled: payload.memo.unwrap_or(false),
        analysis_id: payload.analysis_id.clone(),
        as_of: payload.as_of.clone(),
    }
}

pub async fn run_http_server(engine: RoiEngine, port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = router(Arc::new(engine));

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "ROI HTTP API listening");

    axum::serve(listener, app).await
}

fn router(engine: Arc<RoiEngine>) -> Router {
    Router::new()
        .route(
            "/api/simulate",
            get(simulate_get_handler).post(simulate_post_handler),
        )
        .route("/api/memo", post(memo_handler))
        .route("/api/roles", get(roles_handler))
        .fallback(not_found_handler)
        .with_state(engine)
}

async fn not_found_handler() -> Response {
    json_response(
        StatusCode::NOT_FOUND,
        ErrorResponse {
            error: "Not found".to_string(),
            kind: "not_found",
            field: None,
        },
    )
}

async fn roles_handler(State(engine): State<Arc<RoiEngine>>) -> Response {
    let roles = engine.roles().role_ids().map(str::to_string).collect();
    json_response(StatusCode::OK, RolesResponse { roles })
}

async fn simulate_get_handler(
    State(engine): State<Arc<RoiEngine>>,
    Query(payload): Query<SimulatePayload>,
) -> Response {
    simulate_handler_impl(engine, payload).await
}

async fn simulate_post_handler(
    State(engine): State<Arc<RoiEngine>>,
    Json(payload): Json<SimulatePayload>,
) -> Response {
    simulate_handler_impl(engine, payload).await
}

async fn simulate_handler_impl(engine: Arc<RoiEngine>, payload: SimulatePayload) -> Response {
    let request = match request_from_payload(&payload) {
        Ok(request) => request,
        Err(e) => return error_response(&e),
    };
    let memo = memo_options_from_payload(&payload);

    let outcome =
        tokio::task::spawn_blocking(move || run_simulation(&engine, &request, &memo)).await;
    match outcome {
        Ok(Ok(response)) => json_response(StatusCode::OK, response),
        Ok(Err(e)) => error_response(&e),
        Err(join_err) => {
            error!("simulation task failed: {join_err}");
            json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse {
                    error: "simulation task failed".to_string(),
                    kind: "internal",
                    field: None,
                },
            )
        }
    }
}

async fn memo_handler(
    State(engine): State<Arc<RoiEngine>>,
    Json(input): Json<InvestmentMemoInput>,
) -> Response {
    match engine.render_memo(&input) {
        Ok(memo) => json_response(StatusCode::OK, MemoResponse { memo }),
        Err(e) => error_response(&e),
    }
}

fn status_for(err: &RoiError) -> StatusCode {
    match err {
        RoiError::UnknownRole { .. } => StatusCode::NOT_FOUND,
        RoiError::ConfigurationLoad { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::BAD_REQUEST,
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn error_response(err: &RoiError) -> Response {
    json_response(
        status_for(err),
        ErrorResponse {
            error: err.to_string(),
            kind: err.kind(),
            field: err.field(),
        },
    )
}
