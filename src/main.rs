use std::{str::FromStr, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use thiserror::Error;
use tokio::signal;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use solong_lottery::{
    app_state::{AppBillboard, AppInstruction, AppPool, AppState},
    config::Settings,
    instruction::{self, parse_amount, InstructionKind},
    rpc::{self, update_data_system, WatchTargets},
    LotteryError,
};

#[derive(Clone)]
struct ServerState {
    app_state: AppState,
    settings: Arc<Settings>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("No .env loaded: {e}");
    }

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(env_filter)
        .init();

    let settings = Settings::from_env()?;
    if settings.variant.is_deprecated() {
        tracing::warn!("Decoding with deprecated layout {}", settings.variant);
    }

    let connection = rpc::connect(&settings.rpc_url);
    let targets = WatchTargets {
        pool: settings.pool,
        billboard: settings.billboard,
        variant: settings.variant,
        poll_interval: settings.poll_interval,
    };

    let app_state = AppState::default();
    rpc::refresh(&connection, &app_state, &targets).await?;
    update_data_system(connection, app_state.clone(), targets).await;

    let bind_addr = settings.bind_addr.clone();
    let state = ServerState {
        app_state,
        settings: Arc::new(settings),
    };

    let app = Router::new()
        .route("/", get(root))
        .route("/pool", get(get_pool))
        .route("/billboard", get(get_billboard))
        .route("/instructions/{kind}", get(get_instruction))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    tracing::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    Ok(())
}

async fn root() -> &'static str {
    "SOLONG LOTTERY"
}

async fn get_pool(State(state): State<ServerState>) -> Result<Json<AppPool>, AppError> {
    let lock = state.app_state.pool.read().await;
    let data = lock.clone().ok_or(AppError::NotFound)?;
    Ok(Json(data))
}

async fn get_billboard(State(state): State<ServerState>) -> Result<Json<AppBillboard>, AppError> {
    let lock = state.app_state.billboard.read().await;
    let data = lock.clone().ok_or(AppError::NotFound)?;
    Ok(Json(data))
}

#[derive(Debug, Deserialize)]
struct InstructionQuery {
    player: Option<String>,
    admin: Option<String>,
    /// Defaults to `admin` for initialize.
    owner: Option<String>,
    fund: Option<String>,
    price: Option<String>,
}

async fn get_instruction(
    State(state): State<ServerState>,
    Path(kind): Path<String>,
    Query(q): Query<InstructionQuery>,
) -> Result<Json<AppInstruction>, AppError> {
    let kind = InstructionKind::from_str(&kind)?;
    let s = &state.settings;

    let ix = match kind {
        InstructionKind::Initialize => {
            let owner = pubkey_param("owner", q.owner.as_ref().or(q.admin.as_ref()))?;
            instruction::initialize(
                owner,
                s.fee,
                s.billboard,
                s.pool,
                s.program_id,
                amount_param("fund", q.fund.as_deref())?,
                amount_param("price", q.price.as_deref())?,
            )
        }
        InstructionKind::Sign => instruction::sign(pubkey_param("player", q.player.as_ref())?, s.pool, s.program_id),
        InstructionKind::Buy => {
            instruction::buy(pubkey_param("player", q.player.as_ref())?, s.fee, s.pool, s.program_id)
        }
        InstructionKind::Roll => {
            instruction::roll(pubkey_param("admin", q.admin.as_ref())?, s.pool, s.billboard, s.program_id)
        }
        InstructionKind::Reward => instruction::reward(
            pubkey_param("admin", q.admin.as_ref())?,
            pubkey_param("player", q.player.as_ref())?,
            s.billboard,
            s.program_id,
        ),
        InstructionKind::Gm => instruction::gm(
            pubkey_param("admin", q.admin.as_ref())?,
            s.pool,
            s.program_id,
            amount_param("fund", q.fund.as_deref())?,
            amount_param("price", q.price.as_deref())?,
        ),
    };

    tracing::debug!("Built {} instruction", kind.name());
    Ok(Json(AppInstruction::new(kind, &ix)))
}

fn pubkey_param(name: &str, value: Option<&String>) -> Result<Pubkey, AppError> {
    let value = value.ok_or_else(|| AppError::BadRequest(format!("missing {name}")))?;
    Pubkey::from_str(value).map_err(|_| AppError::BadRequest(format!("invalid {name}")))
}

fn amount_param(name: &str, value: Option<&str>) -> Result<u64, AppError> {
    let value = value.ok_or_else(|| AppError::BadRequest(format!("missing {name}")))?;
    Ok(parse_amount(value)?)
}

#[derive(Error, Debug)]
enum AppError {
    #[error("not found")]
    NotFound,
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Codec(#[from] LotteryError),
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        use axum::{http::StatusCode, Json};
        #[derive(Serialize)]
        struct ErrBody {
            error: String,
        }
        match self {
            AppError::NotFound => {
                (StatusCode::NOT_FOUND, Json(ErrBody { error: "not found".into() })).into_response()
            }
            AppError::BadRequest(_) | AppError::Codec(_) => {
                (StatusCode::BAD_REQUEST, Json(ErrBody { error: self.to_string() })).into_response()
            }
            other => {
                tracing::error!("internal error: {other:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrBody {
                        error: "internal server error".into(),
                    }),
                )
                    .into_response()
            }
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        signal(SignalKind::terminate())
            .expect("install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutting down");
}
