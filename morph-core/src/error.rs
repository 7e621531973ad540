//! Error types for Morph core structures

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Graph node ID overflow: maximum number of nodes reached")]
    GraphNodeIdOverflow,

    #[error("Invalid graph: {0}")]
    InvalidGraph(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
