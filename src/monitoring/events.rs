// DANS : src/monitoring/events.rs

use std::{
    fs::{File, OpenOptions, TryLockError},
    io::Write,
    path::{Path, PathBuf},
    time::Duration,
};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use super::metrics::{CACHE_EVENTS, DECODE_FAILURES, RPC_REQUESTS_TOTAL, RPC_REQUEST_LATENCY};
use crate::address::short_address;

/// Nom du journal d'événements, à la racine du cache.
pub const METRICS_LOG_FILE_NAME: &str = "metrics.jsonl";

const LOCK_ATTEMPTS: u32 = 3;
const LOCK_RETRY_DELAY: Duration = Duration::from_millis(5);

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MetricEvent {
    CacheHit,
    CacheMiss,
    CacheExpired { age_secs: u64 },
    CacheSchemaMismatch { found: String },
    CacheCorrupt { error: String },
    CacheWrite,
    CacheWriteFailure { error: String },
    CacheEnriched,
    RpcAttempt {
        endpoint: String,
        success: bool,
        latency_ms: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    DecodeFailure { error: String },
}

impl MetricEvent {
    pub fn name(&self) -> &'static str {
        match self {
            MetricEvent::CacheHit => "hit",
            MetricEvent::CacheMiss => "miss",
            MetricEvent::CacheExpired { .. } => "expired",
            MetricEvent::CacheSchemaMismatch { .. } => "schema_mismatch",
            MetricEvent::CacheCorrupt { .. } => "corrupt",
            MetricEvent::CacheWrite => "write",
            MetricEvent::CacheWriteFailure { .. } => "write_failure",
            MetricEvent::CacheEnriched => "enriched",
            MetricEvent::RpcAttempt { .. } => "rpc_attempt",
            MetricEvent::DecodeFailure { .. } => "decode_failure",
        }
    }
}

#[derive(Serialize)]
struct MetricLine<'a> {
    ts: DateTime<Utc>,
    address: String,
    #[serde(flatten)]
    event: &'a MetricEvent,
}

/// Journal d'événements append-only, partagé par tous les composants.
/// Une écriture ratée est loggée puis ignorée : elle ne doit jamais faire échouer une requête.
#[derive(Debug, Clone)]
pub struct MetricsLog {
    path: Option<PathBuf>,
}

impl MetricsLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: Some(path.into()) }
    }

    /// Le journal standard `<cache_dir>/metrics.jsonl`.
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(METRICS_LOG_FILE_NAME))
    }

    /// Un sink qui ne met à jour que les compteurs Prometheus.
    pub fn disabled() -> Self {
        Self { path: None }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn record(&self, address: &str, event: MetricEvent) {
        match &event {
            MetricEvent::RpcAttempt { endpoint, success, latency_ms, .. } => {
                let status = if *success { "success" } else { "failure" };
                RPC_REQUESTS_TOTAL.with_label_values(&[endpoint.as_str(), status]).inc();
                RPC_REQUEST_LATENCY
                    .with_label_values(&[endpoint.as_str()])
                    .observe(*latency_ms as f64 / 1000.0);
            }
            MetricEvent::DecodeFailure { .. } => DECODE_FAILURES.inc(),
            other => CACHE_EVENTS.with_label_values(&[other.name()]).inc(),
        }

        let Some(path) = &self.path else {
            return;
        };
        let line = MetricLine {
            ts: Utc::now(),
            address: short_address(address),
            event: &event,
        };
        if let Err(e) = append_line(path, &line) {
            warn!(error = %e, event = event.name(), "[Metrics] Échec d'écriture dans le journal");
        } else {
            debug!(event = event.name(), "[Metrics] Événement enregistré");
        }
    }
}

fn append_line(path: &Path, line: &MetricLine<'_>) -> std::io::Result<()> {
    let mut encoded = serde_json::to_vec(line)?;
    encoded.push(b'\n');

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    // Verrou exclusif (consultatif) : pas de lignes entrelacées entre processus.
    // Jamais d'attente illimitée : si le verrou reste pris, la ligne est perdue.
    try_lock_bounded(&file)?;
    let result = file.write_all(&encoded);
    file.unlock()?;
    result
}

fn try_lock_bounded(file: &File) -> std::io::Result<()> {
    for attempt in 0..LOCK_ATTEMPTS {
        match file.try_lock() {
            Ok(()) => return Ok(()),
            Err(TryLockError::WouldBlock) if attempt + 1 < LOCK_ATTEMPTS => {
                std::thread::sleep(LOCK_RETRY_DELAY);
            }
            Err(TryLockError::WouldBlock) => break,
            Err(TryLockError::Error(e)) => return Err(e),
        }
    }
    Err(std::io::Error::new(
        std::io::ErrorKind::WouldBlock,
        "journal de métriques verrouillé par un autre processus",
    ))
}
