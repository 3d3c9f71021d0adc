#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use std::{net::SocketAddr, sync::Arc};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pool_snapshot::{
    address::validate_address,
    cache::{CacheLookup, CacheStore, MissReason},
    config::Config,
    monitoring::{logging, MetricsLog},
    server,
    service::PoolService,
};
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "Cache et décodage des comptes pool Solana", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Lance l'API HTTP.
    Serve,
    /// Traite une requête pour une adresse et affiche le document JSON.
    Fetch { address: String },
    /// Affiche l'entrée en cache d'une adresse, sans appel réseau.
    Inspect { address: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::setup_logging();
    let cli = Cli::parse();
    let config = Config::load()?;

    match cli.command {
        Commands::Serve => {
            let addr: SocketAddr = config
                .listen_addr
                .parse()
                .with_context(|| format!("LISTEN_ADDR invalide: {}", config.listen_addr))?;
            info!(
                endpoints = config.endpoints().len(),
                cache_dir = %config.cache_dir.display(),
                ttl_secs = config.cache_ttl_secs,
                "[Main] Démarrage du service"
            );
            let service = Arc::new(PoolService::from_config(&config)?);
            server::serve(service, addr).await;
        }
        Commands::Fetch { address } => {
            let service = PoolService::from_config(&config)?;
            let response = service.handle(Some(&address)).await?;
            info!(cache = response.cache_status.as_str(), "[Main] Requête terminée");
            println!("{}", serde_json::to_string_pretty(&response.body)?);
        }
        Commands::Inspect { address } => {
            let address = validate_address(&address)?;
            let store = CacheStore::from_config(&config, MetricsLog::disabled());
            match store.load(address) {
                CacheLookup::Hit(cached) => {
                    println!(
                        "Entrée fraîche ({}s), décodée: {}",
                        cached.age().as_secs(),
                        cached.snapshot.parsed_pool_data.is_some()
                    );
                    println!("{}", serde_json::to_string_pretty(&cached.snapshot)?);
                }
                CacheLookup::Miss(MissReason::Absent) => println!("Aucune entrée pour cette adresse."),
                CacheLookup::Miss(MissReason::Expired { age }) => {
                    println!("Entrée expirée (âge {}s, TTL {}s).", age.as_secs(), store.ttl().as_secs())
                }
                CacheLookup::Miss(MissReason::SchemaMismatch { found }) => {
                    println!("Entrée d'un autre schéma ({found}), elle sera ignorée.")
                }
                CacheLookup::Miss(reason) => println!("Entrée inutilisable: {reason:?}"),
            }
        }
    }

    Ok(())
}
