//! Error taxonomy.
//!
//! Four classes:
//! - [`Error::Config`] is fatal and only surfaces at construction or
//!   registration time; a running loop never produces it for a tick step.
//! - [`Error::Lookup`] means an operation referenced a destroyed or
//!   unknown widget; callers treat it as a no-op / empty result.
//! - [`Error::Overflow`] reports a bounded queue at capacity. The tick
//!   pipeline's queues recover by dropping the oldest pending item;
//!   the non-evicting insertion variants (`try_insert`) surface this
//!   instead.
//! - [`Error::Backend`] wraps I/O failures from display backends; the
//!   scheduler logs these and retries on the next tick.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Invalid buffer, resolution, or registration at setup time.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Operation referenced a destroyed or unknown widget.
    #[error("unknown or destroyed widget")]
    Lookup,

    /// A bounded queue reached its configured capacity.
    #[error("{queue} queue full (capacity {capacity})")]
    Overflow {
        queue: &'static str,
        capacity: usize,
    },

    /// Display backend I/O failure.
    #[error("backend i/o: {0}")]
    Backend(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
