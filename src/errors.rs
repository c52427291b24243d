//! Error Types
//!
//! This module defines the error type used throughout the rendering core.
//!
//! # Overview
//!
//! Every fallible operation returns [`Result<T>`], an alias for
//! `std::result::Result<T, Error>`. A non-success status short-circuits the
//! enclosing operation unchanged: there is no local recovery and no retrying
//! inside the core. The taxonomy is deliberately small:
//!
//! - [`Error::InvalidArgument`]: programmer error caught at an entry point;
//!   the payload is the 0-based position of the offending argument.
//! - [`Error::InvalidArgumentCombination`]: a set of arguments that are
//!   individually valid but mutually inconsistent.
//! - [`Error::InvalidResult`]: a callback returned an out-of-contract value
//!   (a non-finite normal, an infinite diffuse pdf, a specular sample from a
//!   diffuse-only sampler).
//! - [`Error::NoIntersection`]: control-flow signal from geometry traversal;
//!   never surfaced to users.
//! - [`Error::AllocationFailed`]: resource exhaustion, recoverable by the
//!   caller.

use thiserror::Error;

/// The error type for the rendering core.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// An argument failed validation. The payload is the 0-based position of
    /// the argument at the operation that rejected it (the receiver counts
    /// as position 0).
    #[error("invalid argument at position {0}")]
    InvalidArgument(u8),

    /// A combination of arguments is inconsistent. The payload is the
    /// 0-based index of the violated combination rule.
    #[error("invalid argument combination {0}")]
    InvalidArgumentCombination(u8),

    /// A callback produced a value outside its contract.
    #[error("a callback returned an out-of-contract value")]
    InvalidResult,

    /// Geometry traversal found no intersection. Internal control flow only.
    #[error("no intersection")]
    NoIntersection,

    /// Memory could not be obtained from the system.
    #[error("allocation failed")]
    AllocationFailed,
}

impl Error {
    /// Stable numeric code for external integrations.
    ///
    /// Success is `0` by convention (a missing error). Invalid-argument codes
    /// occupy `0x10 + n`, combination codes `0x30 + n`, and the remaining
    /// kinds are fixed points. Integrations speaking an older numbering
    /// remap at their boundary.
    #[must_use]
    pub fn code(&self) -> u32 {
        match self {
            Error::InvalidArgument(n) => 0x10 + u32::from(*n),
            Error::InvalidArgumentCombination(n) => 0x30 + u32::from(*n),
            Error::InvalidResult => 0x50,
            Error::NoIntersection => 0x51,
            Error::AllocationFailed => 0x52,
        }
    }
}

/// Alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
