//! Error definitions for the mapper module.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MapperError {
    #[error("Unsupported device capability: {0}")]
    UnsupportedCapability(String),
}
