// -*- mode: rust; -*-
//
// This file is part of daga.
// Copyright (c) 2019 Web 3 Foundation
// See LICENSE for licensing information.
//
// Authors:
// - Jeff Burdges <jeff@web3.foundation>

//! Deniable anonymous group authentication over the Ristretto group
//!
//! DAGA lets any member of a group of clients authenticate to a quorum of
//! servers while revealing only a linkage tag.  Authentications by the
//! same client within one context yield the same tag, so servers may rate
//! limit or ban, yet no one learns which member authenticated, and the
//! transcripts stay deniable.
//!
//! # Example
//!
//! Servers publish round commitments, which together with everyone's
//! long-term keys form an `AuthenticationContext`.  We build a toy one
//! in process:
//!
//! ```
//! # #[cfg(feature = "getrandom")] {
//! use daga::daga::{generate_context, LocalQuorum};
//!
//! let (clients, servers, context) = generate_context(4, 3, rand_core::OsRng).unwrap();
//! let mut quorum = LocalQuorum::new(&servers);
//!
//! let tag = clients[2].authenticate(&context, &mut quorum).unwrap();
//! assert_eq!(tag, clients[2].authenticate(&context, &mut quorum).unwrap());
//! assert_ne!(tag, clients[3].authenticate(&context, &mut quorum).unwrap());
//! # }
//! ```
//!
//! Authentication builds upon several layers, all usable on their own:
//!
//! - Schnorr signatures on merlin transcripts, see `sign`:
//!
//! ```
//! # #[cfg(feature = "getrandom")] {
//! use daga::{signing_context, Keypair};
//!
//! let keypair = Keypair::generate();
//! let context = signing_context(b"this signature does this thing");
//! let message: &[u8] = "This is a test of the tsunami alert system.".as_bytes();
//! let signature = keypair.sign(context.bytes(message));
//! assert!(keypair.public.verify(context.bytes(message), &signature).is_ok());
//! # }
//! ```
//!
//! - discrete log equality proofs, see `dleq`,
//! - sigma protocols for AND/OR compositions of representations, see `sigma`,
//! - Shamir, publicly verifiable, and Pedersen verifiable secret sharing,
//!   see `share`.
//!
//! We do no logging.  Outcomes a caller may want to record, like a VSS
//! complaint or a misbehaving client, are returned as values.

#![no_std]
#![warn(future_incompatible)]
#![warn(rust_2018_compatibility)]
#![warn(rust_2018_idioms)]
#![deny(missing_docs)] // refuse to compile if documentation is missing

#[cfg(any(feature = "std", test))]
#[macro_use]
extern crate std;

extern crate alloc;

#[macro_use]
mod serdey;

pub mod errors;
pub mod group;
pub mod transcript;
pub mod keys;
pub mod sign;
pub mod dleq;
pub mod sigma;
pub mod share;
pub mod daga;

pub use crate::errors::{DagaError, DagaResult};
pub use crate::keys::*; // {SecretKey,PublicKey,Keypair} + *_LENGTH
pub use crate::sign::{Signature, SIGNATURE_LENGTH};
#[cfg(feature = "getrandom")]
pub use crate::sign::verify_batch;
pub use crate::transcript::{signing_context, SigningContext, SigningTranscript};
pub use crate::dleq::DleqProof;
