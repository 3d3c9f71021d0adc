// DANS : src/server.rs

use std::{collections::HashMap, convert::Infallible, net::SocketAddr, sync::Arc};

use serde_json::json;
use tracing::info;
use warp::http::header::{HeaderValue, CACHE_CONTROL, CONTENT_TYPE};
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

use crate::monitoring::metrics::{metrics_route, HTTP_RESPONSES};
use crate::service::{PoolResponse, PoolService, ServiceError};

pub const POOL_ADDRESS_PARAM: &str = "poolAddress";
const CACHE_CONTROL_VALUE: &str = "public, max-age=60";

/// Toutes les routes : `GET /` et `GET /pool` (`?poolAddress=`), `/health`, `/metrics`.
pub fn routes(
    service: Arc<PoolService>,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let pool = warp::get()
        .and(warp::path::end().or(warp::path!("pool")).unify())
        .and(warp::query::<HashMap<String, String>>())
        .and(with_service(service))
        .and_then(handle_pool_request);

    let health = warp::path!("health")
        .and(warp::get())
        .map(|| warp::reply::json(&json!({ "status": "ok" })));

    pool.or(health).or(metrics_route()).recover(handle_rejection)
}

fn with_service(
    service: Arc<PoolService>,
) -> impl Filter<Extract = (Arc<PoolService>,), Error = Infallible> + Clone {
    warp::any().map(move || Arc::clone(&service))
}

async fn handle_pool_request(
    query: HashMap<String, String>,
    service: Arc<PoolService>,
) -> Result<warp::reply::Response, Rejection> {
    let address = query.get(POOL_ADDRESS_PARAM).map(String::as_str);
    let outcome = match service.handle(address).await {
        Ok(response) => response.to_json().map(|body| (response, body)),
        Err(e) => Err(e),
    };

    Ok(match outcome {
        Ok((response, body)) => {
            HTTP_RESPONSES
                .with_label_values(&["200", response.cache_status.as_str()])
                .inc();
            success_reply(&response, body)
        }
        Err(error) => error_reply(&error),
    })
}

fn success_reply(response: &PoolResponse, body: Vec<u8>) -> warp::reply::Response {
    let mut reply = warp::reply::Response::new(body.into());
    let headers = reply.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static(CACHE_CONTROL_VALUE));
    headers.insert(
        "x-cache-status",
        HeaderValue::from_static(response.cache_status.as_str()),
    );
    if let Ok(generated_at) = HeaderValue::from_str(&response.generated_at()) {
        headers.insert("x-generated-at", generated_at);
    }
    reply
}

fn error_reply(error: &ServiceError) -> warp::reply::Response {
    let status =
        StatusCode::from_u16(error.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    HTTP_RESPONSES
        .with_label_values(&[status.as_str(), "none"])
        .inc();
    if status.is_server_error() {
        tracing::warn!(status = status.as_u16(), error = %error, "[Server] Requête en échec");
    }
    warp::reply::with_status(
        warp::reply::json(&json!({ "error": error.to_string() })),
        status,
    )
    .into_response()
}

async fn handle_rejection(rejection: Rejection) -> Result<impl Reply, Infallible> {
    let (status, message) = if rejection.is_not_found() {
        (StatusCode::NOT_FOUND, "Route inconnue")
    } else if rejection.find::<warp::reject::InvalidQuery>().is_some() {
        (StatusCode::BAD_REQUEST, "Paramètres de requête invalides")
    } else if rejection.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Méthode non autorisée")
    } else {
        (StatusCode::INTERNAL_SERVER_ERROR, "Erreur interne")
    };
    Ok(warp::reply::with_status(
        warp::reply::json(&json!({ "error": message })),
        status,
    ))
}

pub async fn serve(service: Arc<PoolService>, addr: SocketAddr) {
    info!(%addr, "[Server] API pool exposée (/, /pool, /health, /metrics)");
    warp::serve(routes(service)).run(addr).await;
}
