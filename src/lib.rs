pub mod aggregate;
pub mod collectors;
pub mod config;
pub mod database_ops;
pub mod fetch;
pub mod ingest;
pub mod normalization;
pub mod tracing;
pub mod work;

pub mod util {
    pub mod env;
}
