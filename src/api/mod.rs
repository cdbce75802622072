use axum::{
    Router,
    extract::{Json, State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use clap::{Args, ValueEnum};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::config::ServerConfig;
use crate::core::{
    Allocation, DEFAULT_ITERATIONS, ProjectionInputs, STRESS_SCENARIOS, SimulationError,
    SimulationRequest, SimulationSettings, SimulationType, run_simulation,
};

const MAX_YEARS: i64 = 100;
const MAX_EXPECTED_RETURN: f64 = 10.0;
const MAX_VOLATILITY: f64 = 10.0;
const ALLOCATION_TOLERANCE: f64 = 0.01;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliSimulationType {
    MonteCarlo,
    StressTest,
    GoalProbability,
}

impl From<CliSimulationType> for SimulationType {
    fn from(value: CliSimulationType) -> Self {
        match value {
            CliSimulationType::MonteCarlo => SimulationType::MonteCarlo,
            CliSimulationType::StressTest => SimulationType::StressTest,
            CliSimulationType::GoalProbability => SimulationType::GoalProbability,
        }
    }
}

#[derive(Copy, Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiSimulationType {
    #[serde(alias = "monteCarlo")]
    MonteCarlo,
    #[serde(alias = "stressTest")]
    StressTest,
    #[serde(alias = "goalProbability")]
    GoalProbability,
}

impl From<ApiSimulationType> for CliSimulationType {
    fn from(value: ApiSimulationType) -> Self {
        match value {
            ApiSimulationType::MonteCarlo => CliSimulationType::MonteCarlo,
            ApiSimulationType::StressTest => CliSimulationType::StressTest,
            ApiSimulationType::GoalProbability => CliSimulationType::GoalProbability,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SimulatePayload {
    simulation_type: Option<ApiSimulationType>,
    initial_amount: Option<f64>,
    monthly_contribution: Option<f64>,
    years: Option<i64>,
    expected_return: Option<f64>,
    volatility: Option<f64>,
    allocation: Option<AllocationPayload>,
    target_amount: Option<f64>,
    seed: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct AllocationPayload {
    stocks: f64,
    bonds: f64,
    alternatives: f64,
}

/// Inputs for one simulation, shared by the `simulate` subcommand and the
/// HTTP API (which starts from these defaults and overlays the JSON body).
#[derive(Args, Debug, Clone)]
pub struct SimulateArgs {
    #[arg(long, value_enum)]
    simulation_type: Option<CliSimulationType>,
    #[arg(long, help = "Starting portfolio value")]
    initial_amount: Option<f64>,
    #[arg(long, default_value_t = 0.0)]
    monthly_contribution: f64,
    #[arg(long, default_value_t = 30, allow_negative_numbers = true)]
    years: i64,
    #[arg(
        long,
        default_value_t = 0.07,
        allow_negative_numbers = true,
        help = "Annualized expected return as a fraction, e.g. 0.07"
    )]
    expected_return: f64,
    #[arg(
        long,
        default_value_t = 0.15,
        help = "Annualized volatility as a fraction, e.g. 0.15"
    )]
    volatility: f64,
    #[arg(long, default_value_t = 60.0, help = "Stock weight in percent")]
    stocks: f64,
    #[arg(long, default_value_t = 30.0, help = "Bond weight in percent")]
    bonds: f64,
    #[arg(long, default_value_t = 10.0, help = "Alternatives weight in percent")]
    alternatives: f64,
    #[arg(long, help = "Goal amount, required for goal-probability")]
    target_amount: Option<f64>,
    #[arg(long, help = "Base seed for reproducible trajectories")]
    seed: Option<u64>,
    #[arg(long, default_value_t = DEFAULT_ITERATIONS)]
    iterations: u32,
}

#[derive(Debug)]
struct ApiRequest {
    request: SimulationRequest,
    settings: SimulationSettings,
}

#[derive(Clone, Copy)]
struct AppState {
    iterations: u32,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

fn build_request(args: &SimulateArgs) -> Result<ApiRequest, SimulationError> {
    let simulation_type: SimulationType = args
        .simulation_type
        .ok_or(SimulationError::MissingField("simulationType"))?
        .into();

    let initial_amount = args
        .initial_amount
        .ok_or(SimulationError::MissingField("initialAmount"))?;

    for (name, value) in [
        ("initialAmount", initial_amount),
        ("monthlyContribution", args.monthly_contribution),
        ("expectedReturn", args.expected_return),
        ("volatility", args.volatility),
        ("allocation.stocks", args.stocks),
        ("allocation.bonds", args.bonds),
        ("allocation.alternatives", args.alternatives),
    ] {
        if !value.is_finite() {
            return Err(SimulationError::invalid(name, "must be a finite number"));
        }
    }

    if initial_amount < 0.0 {
        return Err(SimulationError::invalid("initialAmount", "must be >= 0"));
    }

    if args.monthly_contribution < 0.0 {
        return Err(SimulationError::invalid("monthlyContribution", "must be >= 0"));
    }

    if !(1..=MAX_YEARS).contains(&args.years) {
        return Err(SimulationError::invalid(
            "years",
            format!("must be between 1 and {MAX_YEARS}"),
        ));
    }

    if args.expected_return <= -1.0 || args.expected_return > MAX_EXPECTED_RETURN {
        return Err(SimulationError::invalid(
            "expectedReturn",
            format!("must be > -1 and <= {MAX_EXPECTED_RETURN}"),
        ));
    }

    if !(0.0..=MAX_VOLATILITY).contains(&args.volatility) {
        return Err(SimulationError::invalid(
            "volatility",
            format!("must be between 0 and {MAX_VOLATILITY}"),
        ));
    }

    if args.iterations == 0 {
        return Err(SimulationError::invalid("iterations", "must be > 0"));
    }

    let projection = ProjectionInputs {
        initial_amount,
        monthly_contribution: args.monthly_contribution,
        years: args.years as u32,
        expected_return: args.expected_return,
        volatility: args.volatility,
    };

    let request = match simulation_type {
        SimulationType::MonteCarlo => SimulationRequest::MonteCarlo(projection),
        SimulationType::StressTest => SimulationRequest::StressTest {
            portfolio_value: initial_amount,
            allocation: build_allocation(args)?,
        },
        SimulationType::GoalProbability => {
            let target_amount = args
                .target_amount
                .ok_or(SimulationError::MissingField("targetAmount"))?;
            if !target_amount.is_finite() || target_amount < 0.0 {
                return Err(SimulationError::invalid(
                    "targetAmount",
                    "must be a finite number >= 0",
                ));
            }
            SimulationRequest::GoalProbability {
                projection,
                target_amount,
            }
        }
    };

    Ok(ApiRequest {
        request,
        settings: SimulationSettings {
            iterations: args.iterations,
            seed: args.seed,
        },
    })
}

fn build_allocation(args: &SimulateArgs) -> Result<Allocation, SimulationError> {
    let allocation = Allocation {
        stocks: args.stocks,
        bonds: args.bonds,
        alternatives: args.alternatives,
    };

    if allocation.stocks < 0.0 || allocation.bonds < 0.0 || allocation.alternatives < 0.0 {
        return Err(SimulationError::invalid("allocation", "weights must be >= 0"));
    }

    if (allocation.total() - 100.0).abs() > ALLOCATION_TOLERANCE {
        return Err(SimulationError::invalid(
            "allocation",
            format!("weights must sum to 100, got {}", allocation.total()),
        ));
    }

    Ok(allocation)
}

/// Runs one simulation from command-line arguments and renders it as JSON.
pub fn run_cli_simulation(args: &SimulateArgs) -> Result<String, SimulationError> {
    let request = build_request(args)?;
    let outcome = run_simulation(&request.request, request.settings)?;
    Ok(serde_json::to_string_pretty(&outcome)?)
}

pub fn scenarios_json() -> Result<String, SimulationError> {
    Ok(serde_json::to_string_pretty(&STRESS_SCENARIOS)?)
}

pub fn router(config: &ServerConfig) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/api/scenarios", get(scenarios_handler))
        .route("/api/simulate", post(simulate_handler))
        .fallback(not_found_handler)
        .with_state(AppState {
            iterations: config.iterations,
        })
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

pub async fn run_http_server(config: ServerConfig) -> std::io::Result<()> {
    let ip = config
        .host
        .parse()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
    let addr = SocketAddr::new(ip, config.port);
    let app = router(&config);

    let listener = TcpListener::bind(addr).await?;
    info!(
        iterations = config.iterations,
        "scenario engine listening on http://{addr}"
    );

    axum::serve(listener, app).await
}

async fn health_handler() -> Response {
    json_response(
        StatusCode::OK,
        HealthResponse {
            status: "ok",
            version: env!("CARGO_PKG_VERSION"),
        },
    )
}

async fn scenarios_handler() -> Response {
    json_response(StatusCode::OK, STRESS_SCENARIOS)
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn simulate_handler(
    State(state): State<AppState>,
    payload: Result<Json<SimulatePayload>, JsonRejection>,
) -> Response {
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            // Syntax, data and content-type rejections all map to 400.
            warn!(error = %rejection, "rejected simulation payload");
            return error_response(
                StatusCode::BAD_REQUEST,
                &format!("Invalid JSON payload: {}", rejection.body_text()),
            );
        }
    };

    let request = match api_request_from_payload(payload, state.iterations) {
        Ok(request) => request,
        Err(e) => {
            warn!(error = %e, "rejected simulation request");
            return error_response(StatusCode::BAD_REQUEST, &e.to_string());
        }
    };

    info!(
        simulation_type = %request.request.simulation_type(),
        seeded = request.settings.seed.is_some(),
        "running simulation"
    );
    let computed = tokio::task::spawn_blocking(move || {
        run_simulation(&request.request, request.settings)
    })
    .await;

    match computed {
        Ok(Ok(outcome)) => json_response(StatusCode::OK, outcome),
        Ok(Err(e)) => {
            warn!(error = %e, "simulation result rejected");
            error_response(StatusCode::BAD_REQUEST, &e.to_string())
        }
        Err(e) => {
            error!(error = %e, "simulation task failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Simulation failed")
        }
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

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
fn api_request_from_json(json: &str) -> Result<ApiRequest, SimulationError> {
    let payload = serde_json::from_str::<SimulatePayload>(json)?;
    api_request_from_payload(payload, DEFAULT_ITERATIONS)
}

fn api_request_from_payload(
    payload: SimulatePayload,
    iterations: u32,
) -> Result<ApiRequest, SimulationError> {
    let mut args = default_args_for_api();
    args.iterations = iterations;

    args.simulation_type = payload.simulation_type.map(Into::into);
    args.initial_amount = payload.initial_amount;
    args.target_amount = payload.target_amount;
    args.seed = payload.seed;

    if let Some(v) = payload.monthly_contribution {
        args.monthly_contribution = v;
    }
    if let Some(v) = payload.years {
        args.years = v;
    }
    if let Some(v) = payload.expected_return {
        args.expected_return = v;
    }
    if let Some(v) = payload.volatility {
        args.volatility = v;
    }
    if let Some(allocation) = payload.allocation {
        args.stocks = allocation.stocks;
        args.bonds = allocation.bonds;
        args.alternatives = allocation.alternatives;
    }

    build_request(&args)
}

fn default_args_for_api() -> SimulateArgs {
    let allocation = Allocation::default();
    SimulateArgs {
        simulation_type: None,
        initial_amount: None,
        monthly_contribution: 0.0,
        years: 30,
        expected_return: 0.07,
        volatility: 0.15,
        stocks: allocation.stocks,
        bonds: allocation.bonds,
        alternatives: allocation.alternatives,
        target_amount: None,
        seed: None,
        iterations: DEFAULT_ITERATIONS,
    }
}
