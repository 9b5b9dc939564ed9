//! directai-core: shared data model for the DirectAI tools
//!
//! Model configurations and deploy request bodies, client configuration,
//! input media typing and the core error type.

pub mod config;
pub mod deploy;
pub mod error;
pub mod media;

pub use config::{ClientConfig, Credentials, DetectorDefaults};
pub use deploy::{
    resolve_config, ClassifierRequest, DeployRequest, DeploymentKind, DetectorRequest, ModelConfig,
};
pub use error::{Error, Result};
pub use media::MediaType;
