// DANS : src/monitoring/metrics.rs

use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, Encoder, HistogramVec,
    IntCounter, IntCounterVec, TextEncoder,
};
use warp::Filter;

lazy_static! {
    // --- Cache ---
    pub static ref CACHE_EVENTS: IntCounterVec = register_int_counter_vec!(
        "pool_snapshot_cache_events_total",
        "Événements du cache fichier (hit, miss, expired, schema_mismatch, write, write_failure...)",
        &["event"]
    ).unwrap();

    // --- RPC ---
    pub static ref RPC_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "pool_snapshot_rpc_requests_total",
        "Compteur total des requêtes getAccountInfo, segmenté par endpoint et statut",
        &["endpoint", "status"] // Labels: "primary" / "fallback_1", "success" / "failure"
    ).unwrap();
    pub static ref RPC_REQUEST_LATENCY: HistogramVec = register_histogram_vec!(
        "pool_snapshot_rpc_request_latency_seconds",
        "Latence de chaque tentative vers un nœud RPC",
        &["endpoint"]
    ).unwrap();

    // --- Décodage ---
    pub static ref DECODE_FAILURES: IntCounter = register_int_counter!(
        "pool_snapshot_decode_failures_total", "Nombre de comptes qui n'ont pas pu être décodés (réponse brute servie)"
    ).unwrap();

    // --- HTTP ---
    pub static ref HTTP_RESPONSES: IntCounterVec = register_int_counter_vec!(
        "pool_snapshot_http_responses_total",
        "Réponses HTTP par code de statut et statut de cache",
        &["status", "cache"]
    ).unwrap();
}

/// Encode le registre global au format texte Prometheus.
pub fn render_metrics() -> Vec<u8> {
    let encoder = TextEncoder::new();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
        tracing::warn!(error = %e, "[Monitoring] Échec de l'encodage des métriques");
    }
    buffer
}

/// La route `/metrics`, montée sur le même serveur que l'API.
pub fn metrics_route() -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    warp::path!("metrics").and(warp::get()).map(|| {
        warp::reply::with_header(render_metrics(), "content-type", "text/plain; version=0.0.4")
    })
}
