// DANS : src/cache/store.rs

use std::{
    fs::{self, File},
    io::{self, BufReader, Write},
    path::{Path, PathBuf},
    sync::atomic::{AtomicU64, Ordering},
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::{PoolSnapshot, SCHEMA_VERSION};
use crate::address::{sanitize_cache_key, short_address};
use crate::config::Config;
use crate::monitoring::{MetricEvent, MetricsLog};

const CACHE_FILE_EXTENSION: &str = "json";

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Clé de cache vide après nettoyage de l'adresse")]
    InvalidKey,
    #[error("Erreur d'E/S sur '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Erreur de sérialisation de l'entrée: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl CacheError {
    fn io(path: &Path, source: io::Error) -> Self {
        CacheError::Io { path: path.to_path_buf(), source }
    }
}

/// Pourquoi une lecture n'a rien donné. Pour l'appelant, tous les cas veulent dire "refetch".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MissReason {
    Absent,
    Unreadable(String),
    Corrupt(String),
    SchemaMismatch { found: String },
    Expired { age: Duration },
}

#[derive(Debug, Clone, PartialEq)]
pub struct CachedSnapshot {
    pub snapshot: PoolSnapshot,
    /// mtime du fichier au moment de la lecture (base du TTL).
    pub modified_at: SystemTime,
}

impl CachedSnapshot {
    pub fn age(&self) -> Duration {
        SystemTime::now()
            .duration_since(self.modified_at)
            .unwrap_or(Duration::ZERO)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup {
    Hit(CachedSnapshot),
    Miss(MissReason),
}

/// On lit d'abord uniquement la version : une entrée d'un ancien schéma
/// peut ne plus se désérialiser du tout, ce n'est pas pour autant un fichier corrompu.
#[derive(Deserialize)]
struct SchemaProbe {
    #[serde(default)]
    schema_version: Option<String>,
}

/// Un document JSON par adresse sous `root`, remplacé uniquement par rename atomique.
#[derive(Debug, Clone)]
pub struct CacheStore {
    root: PathBuf,
    ttl: Duration,
    metrics: MetricsLog,
}

impl CacheStore {
    pub fn new(root: impl Into<PathBuf>, ttl: Duration, metrics: MetricsLog) -> Self {
        Self {
            root: root.into(),
            ttl,
            metrics,
        }
    }

    pub fn from_config(config: &Config, metrics: MetricsLog) -> Self {
        Self::new(config.cache_dir.clone(), config.cache_ttl(), metrics)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Crée la racine du cache si besoin (appelé au démarrage).
    pub fn ensure_root(&self) -> Result<(), CacheError> {
        fs::create_dir_all(&self.root).map_err(|e| CacheError::io(&self.root, e))
    }

    /// `<root>/<adresse nettoyée>.json`, ou `None` si la clé nettoyée est vide.
    pub fn path_for(&self, address: &str) -> Option<PathBuf> {
        let key = sanitize_cache_key(address);
        if key.is_empty() {
            return None;
        }
        Some(self.root.join(format!("{key}.{CACHE_FILE_EXTENSION}")))
    }

    /// Lecture pure : ne modifie jamais le fichier ni son mtime.
    pub fn load(&self, address: &str) -> CacheLookup {
        let lookup = self.read_entry(address);
        let event = match &lookup {
            CacheLookup::Hit(_) => MetricEvent::CacheHit,
            CacheLookup::Miss(MissReason::Absent) => MetricEvent::CacheMiss,
            CacheLookup::Miss(MissReason::Unreadable(e)) | CacheLookup::Miss(MissReason::Corrupt(e)) => {
                MetricEvent::CacheCorrupt { error: e.clone() }
            }
            CacheLookup::Miss(MissReason::SchemaMismatch { found }) => {
                MetricEvent::CacheSchemaMismatch { found: found.clone() }
            }
            CacheLookup::Miss(MissReason::Expired { age }) => MetricEvent::CacheExpired {
                age_secs: age.as_secs(),
            },
        };
        debug!(address = %short_address(address), event = event.name(), "[Cache] Lecture");
        self.metrics.record(address, event);
        lookup
    }

    fn read_entry(&self, address: &str) -> CacheLookup {
        let Some(path) = self.path_for(address) else {
            return CacheLookup::Miss(MissReason::Absent);
        };

        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return CacheLookup::Miss(MissReason::Absent),
            Err(e) => return CacheLookup::Miss(MissReason::Unreadable(e.to_string())),
        };
        let modified_at = match file.metadata().and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(e) => return CacheLookup::Miss(MissReason::Unreadable(e.to_string())),
        };

        let age = SystemTime::now()
            .duration_since(modified_at)
            .unwrap_or(Duration::ZERO);
        if age > self.ttl {
            return CacheLookup::Miss(MissReason::Expired { age });
        }

        let mut bytes = Vec::new();
        if let Err(e) = io::Read::read_to_end(&mut BufReader::new(file), &mut bytes) {
            return CacheLookup::Miss(MissReason::Unreadable(e.to_string()));
        }

        let probe: SchemaProbe = match serde_json::from_slice(&bytes) {
            Ok(probe) => probe,
            Err(e) => return CacheLookup::Miss(MissReason::Corrupt(e.to_string())),
        };
        match probe.schema_version.as_deref() {
            Some(SCHEMA_VERSION) => {}
            other => {
                return CacheLookup::Miss(MissReason::SchemaMismatch {
                    found: other.unwrap_or("<absente>").to_string(),
                })
            }
        }

        match serde_json::from_slice::<PoolSnapshot>(&bytes) {
            Ok(snapshot) => CacheLookup::Hit(CachedSnapshot { snapshot, modified_at }),
            Err(e) => CacheLookup::Miss(MissReason::Corrupt(e.to_string())),
        }
    }

    /// Sauvegarde l'entrée : fichier temporaire voisin, fsync, puis rename atomique.
    pub fn save(&self, address: &str, snapshot: &PoolSnapshot) -> Result<(), CacheError> {
        self.save_inner(address, snapshot, None)
    }

    /// Comme `save`, mais le nouveau fichier garde le mtime donné :
    /// un enrichissement ne doit pas prolonger la fraîcheur de l'entrée.
    pub fn save_preserving_mtime(
        &self,
        address: &str,
        snapshot: &PoolSnapshot,
        modified_at: SystemTime,
    ) -> Result<(), CacheError> {
        self.save_inner(address, snapshot, Some(modified_at))
    }

    fn save_inner(
        &self,
        address: &str,
        snapshot: &PoolSnapshot,
        modified_at: Option<SystemTime>,
    ) -> Result<(), CacheError> {
        let result = self.write_atomically(address, snapshot, modified_at);
        match &result {
            Ok(()) => {
                info!(address = %short_address(address), "[Cache] Entrée sauvegardée");
                self.metrics.record(address, MetricEvent::CacheWrite);
            }
            Err(e) => {
                warn!(address = %short_address(address), error = %e, "[Cache] Échec de sauvegarde");
                self.metrics.record(
                    address,
                    MetricEvent::CacheWriteFailure { error: e.to_string() },
                );
            }
        }
        result
    }

    fn write_atomically(
        &self,
        address: &str,
        snapshot: &PoolSnapshot,
        modified_at: Option<SystemTime>,
    ) -> Result<(), CacheError> {
        let final_path = self.path_for(address).ok_or(CacheError::InvalidKey)?;
        self.ensure_root()?;

        let encoded = serde_json::to_vec_pretty(snapshot)?;
        let temp_path = temp_path_for(&final_path);

        let written = (|| -> io::Result<()> {
            let mut file = File::create(&temp_path)?;
            file.write_all(&encoded)?;
            file.sync_all()?;
            if let Some(modified_at) = modified_at {
                file.set_modified(modified_at)?;
            }
            Ok(())
        })();
        if let Err(e) = written {
            let _ = fs::remove_file(&temp_path);
            return Err(CacheError::io(&temp_path, e));
        }

        if let Err(e) = fs::rename(&temp_path, &final_path) {
            let _ = fs::remove_file(&temp_path);
            return Err(CacheError::io(&final_path, e));
        }
        Ok(())
    }
}

/// `.<fichier>.<pid>.<nanos>.<n>.tmp` dans le même répertoire (même système de fichiers pour le rename).
fn temp_path_for(final_path: &Path) -> PathBuf {
    let file_name = final_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let counter = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    final_path.with_file_name(format!(
        ".{file_name}.{}.{nanos}.{counter}.tmp",
        std::process::id()
    ))
}
