//! Chronomark Client - Annotation Service Access
//!
//! Configuration, the REST client for the annotation service and the async
//! effects that keep the store in step with it.

pub mod api_client;
pub mod config;
pub mod effects;
pub mod error;
pub mod wire;

pub use api_client::{AnnotationClient, ApiClientError};
pub use config::{AnnotationsConfig, AuthConfig, ClientConfig, ConfigError, TagQueryConfig};
pub use effects::AnnotationEffects;
pub use error::{ClientError, ClientResult};

use chronomark_store::Dispatch;

/// Loads the configuration from `--config`/`CHRONOMARK_CONFIG` and builds
/// effects dispatching into `dispatcher`.
pub fn connect<D: Dispatch>(dispatcher: D) -> ClientResult<(ClientConfig, AnnotationEffects<D>)> {
    let config = ClientConfig::load()?;
    let client = AnnotationClient::new(&config)?;
    Ok((config, AnnotationEffects::new(client, dispatcher)))
}
