//! Importer services

pub mod batch_upserter;
pub mod category_resolver;
pub mod hevy_client;
pub mod normalizer;
pub mod placeholder_policy;
pub mod record_cache;
pub mod seed_data;
pub mod translator;
pub mod url_validator;

pub use batch_upserter::{BatchUpserter, FlushReport, PendingRow};
pub use category_resolver::CategoryResolver;
pub use hevy_client::{HevyClient, HevyClientSettings};
pub use placeholder_policy::{PlaceholderPolicy, PlaceholderRule};
pub use record_cache::RecordCache;
pub use translator::Translator;
pub use url_validator::{UrlValidationReport, UrlValidator};
