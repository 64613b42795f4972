// -*- mode: rust; -*-
//
// This file is part of daga.
// Copyright (c) 2019 Web 3 Foundation
// See LICENSE for licensing information.
//
// Authors:
// - Jeff Burdges <jeff@web3.foundation>

//! Errors which may occur while running the authentication protocol,
//! sharing secrets, or parsing any of their wire formats.

// rustc seems to think the typenames in match statements (e.g. in
// Display) should be snake cased, for some reason.
#![allow(non_snake_case)]

use core::fmt;
use core::fmt::Display;

/// `Result` specialized to this crate for convenience.
pub type DagaResult<T> = Result<T, DagaError>;

/// Errors which may occur while processing keys, signatures, proofs,
/// shares, and protocol messages.
///
/// Verification primitives return the precise kind.  `Misbehavior`
/// is recoverable: a peer demonstrably violated the protocol and the
/// caller is expected to react, not abort.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum DagaError {
    /// Malformed sizes, out of range indices, or absent required values.
    InvalidInput(&'static str),
    /// An error in the length of bytes handed to a constructor.
    ///
    /// To use this, pass a string specifying the `name` of the type which is
    /// returning the error, and the `length` in bytes which its constructor
    /// expects.
    BytesLength {
        /// Identifies the type returning the error
        name: &'static str,
        /// Length expected by the constructor in bytes
        length: usize,
    },
    /// Bytes that do not decode to a canonical Ristretto point or scalar.
    InvalidEncoding(&'static str),
    /// A Schnorr signature failed verification.
    BadSignature,
    /// A sigma protocol, DLEQ, or share check failed verification.
    BadProof,
    /// A signer index appears twice where uniqueness is required.
    DuplicateSignature(u32),
    /// Fewer than the threshold of valid shares reached recovery.
    InsufficientShares {
        /// Threshold required for recovery
        needed: usize,
        /// Valid distinct shares actually supplied
        got: usize,
    },
    /// Polynomial operands disagree on threshold or base.
    MismatchedThreshold,
    /// A deal or message belongs to a different session or context.
    SessionMismatch,
    /// The peer at this index demonstrably violated the protocol.
    Misbehavior(u32),
    /// The interactive proof was cancelled.
    Aborted,
}

impl Display for DagaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use self::DagaError::*;
        match *self {
            InvalidInput(what) => write!(f, "Invalid input: {}", what),
            BytesLength { name, length } => write!(f, "{} must be {} bytes in length", name, length),
            InvalidEncoding(what) => write!(f, "Cannot decode {}", what),
            BadSignature => write!(f, "Signature verification equation was not satisfied"),
            BadProof => write!(f, "Proof verification equation was not satisfied"),
            DuplicateSignature(index) => write!(f, "Signer {} appears more than once", index),
            InsufficientShares { needed, got } => {
                write!(f, "Recovery needs {} valid shares but only {} were supplied", needed, got)
            },
            MismatchedThreshold => write!(f, "Polynomials disagree on threshold or base"),
            SessionMismatch => write!(f, "Message belongs to another session"),
            Misbehavior(index) => write!(f, "Peer {} violated the protocol", index),
            Aborted => write!(f, "Proof was aborted"),
        }
    }
}

#[cfg(feature = "std")]
impl ::std::error::Error for DagaError {}

/// Convert `DagaError` into `::serde::de::Error` aka `SerdeError`
///
/// We should do this with `From` but right now the orphan rules prohibit
/// `impl From<DagaError> for E where E: serde::de::Error`.
#[cfg(feature = "serde")]
pub fn serde_error_from_daga_error<E>(err: DagaError) -> E
where
    E: serde_crate::de::Error,
{
    E::custom(err)
}
