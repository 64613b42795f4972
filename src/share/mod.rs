//! Secret sharing: Shamir polynomials, publicly verifiable sharing, and
//! Pedersen verifiable sharing with complaints.
//!
//! Servers use these to set up and back up their per-round secrets.

pub mod poly;
pub mod pvss;
pub mod vss;

pub use self::poly::{PriPoly, PriShare, PubPoly, PubShare};
