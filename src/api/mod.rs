/*
 * REST API module for the swap quoting service
 */

use rocket::http::{ContentType, Status};
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use rocket::{get, routes, State};
use std::sync::Arc;
use tracing::{error, warn};
use crate::config::Config;
use crate::models::{QuoteSummary, SwapError};
use crate::service::SwapService;
use crate::utils::parse_slippage;

pub struct ApiState {
    pub config: Config,
    pub swap_service: Arc<SwapService>,
}

type ApiResult<T> = std::result::Result<T, Custom<String>>;

fn status_for(e: &SwapError) -> Status {
    match e {
        SwapError::Validation { .. } => Status::BadRequest,
        SwapError::NoRouteFound { .. } => Status::NotFound,
        _ => Status::InternalServerError,
    }
}

fn reject(e: &SwapError) -> Custom<String> {
    let status = status_for(e);
    if status == Status::InternalServerError {
        error!("Quote request failed: {e}");
    } else {
        warn!("Quote request rejected: {e}");
    }
    Custom(status, e.to_string())
}

#[get("/api/v1/quote?<sell>&<buy>&<amount>&<slippage>")]
pub async fn get_quote(
    sell: &str,
    buy: &str,
    amount: &str,
    slippage: Option<&str>,
    state: &State<ApiState>,
) -> ApiResult<Json<QuoteSummary>> {
    let slippage = match slippage {
        Some(raw) => Some(parse_slippage(raw).map_err(|e| reject(&e))?),
        None => None,
    };

    let summary = state
        .swap_service
        .quote(sell, buy, amount, slippage)
        .await
        .map_err(|e| reject(&e))?;

    Ok(Json(summary))
}

#[get("/metrics")]
pub async fn metrics(state: &State<ApiState>) -> ApiResult<(ContentType, String)> {
    let body = state.swap_service.metrics_text().map_err(|e| reject(&e))?;
    Ok((ContentType::Plain, body))
}

#[must_use]
pub fn create_rocket(state: ApiState) -> rocket::Rocket<rocket::Build> {
    let figment = rocket::Config::figment()
        .merge(("address", state.config.server.host.clone()))
        .merge(("port", state.config.server.port));
    rocket::custom(figment)
        .manage(state)
        .mount("/", routes![get_quote, metrics, health_check])
}

#[get("/health")]
pub async fn health_check() -> &'static str {
    "OK"
}
