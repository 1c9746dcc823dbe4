pub mod app_config;
pub mod config;
pub mod fallback_table;
pub mod format;
pub mod offers;
pub mod products;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use fallback_table::{load_fallback_file, FallbackFile, FallbackProductConfig, SeedOfferConfig};
pub use offers::{is_usable_amount, MalformedOffer, Offer, PriceOut};
pub use products::{CompareOut, Product, UnitKind};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read fallback table {path}: {source}")]
    FallbackFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse fallback table: {0}")]
    FallbackFileParse(#[from] serde_yaml::Error),

    #[error("fallback table validation failed: {0}")]
    Validation(String),
}
