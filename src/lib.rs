// src/lib.rs

// Les modules du service de snapshots de pools, utilisés par le binaire `pool_server`.
pub mod address;
pub mod cache;
pub mod config;
pub mod decoders;
pub mod metadata;
pub mod monitoring;
pub mod rpc;
pub mod server;
pub mod service;
