//! Error handling and exit codes.

use std::path::PathBuf;

use xalloc_core::constants::exit_codes;
use xalloc_core::AllocError;

/// Errors raised by the benchmark driver itself.
#[derive(Debug, thiserror::Error)]
pub enum BenchError {
    /// `--workload` named something other than list, map, string, or all.
    #[error("unknown workload '{0}' (expected list, map, string, or all)")]
    UnknownWorkload(String),

    /// `--mode` named something other than heap or static.
    #[error("unknown mode '{0}' (expected heap or static)")]
    UnknownMode(String),

    /// `--sizes` could not be parsed.
    #[error("invalid block size list '{0}'")]
    InvalidSizes(String),

    /// The JSON configuration file could not be read.
    #[error("cannot read config file {path}: {source}")]
    ConfigFile {
        /// Path given on the command line.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Map an error to the process exit code.
#[must_use]
pub fn exit_code(err: &anyhow::Error) -> i32 {
    if let Some(alloc) = err.downcast_ref::<AllocError>() {
        return alloc_exit_code(alloc);
    }
    match err.downcast_ref::<BenchError>() {
        Some(_) => exit_codes::ERROR_CONFIG,
        None => exit_codes::ERROR_GENERIC,
    }
}

fn alloc_exit_code(err: &AllocError) -> i32 {
    if err.is_out_of_memory() {
        exit_codes::ERROR_OUT_OF_MEMORY
    } else if let AllocError::Config(_) = err {
        exit_codes::ERROR_CONFIG
    } else {
        exit_codes::ERROR_GENERIC
    }
}
