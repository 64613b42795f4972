//! Deniable Anonymous Group Authentication.
//!
//! A client holding one of the `n` keys `X` convinces a quorum of `m`
//! servers `Y` that it belongs to the group without revealing which
//! member it is.  What the quorum learns is a linkage tag which is the
//! same for every authentication by one client within one
//! `AuthenticationContext`, and unrelated across contexts.
//!
//! ```
//! # #[cfg(feature = "getrandom")] {
//! use daga::daga::{generate_context, LocalQuorum};
//!
//! let (clients, servers, context) = generate_context(3, 2, rand_core::OsRng).unwrap();
//! let mut quorum = LocalQuorum::new(&servers);
//! let tag = clients[1].authenticate(&context, &mut quorum).unwrap();
//! assert_eq!(tag, clients[1].authenticate(&context, &mut quorum).unwrap());
//! # }
//! ```
//!
//! A round proceeds as follows:
//!
//! 1. The client derives `s_j = Hash(z Y_j)` with every server from an
//!    ephemeral `Z = z B`, and publishes `S_k = (∏_{j ≤ k} s_j) B` along
//!    with its initial tag `T0 = (∏ s_j) H_i`.
//! 2. It proves in zero knowledge that `T0` and `S_m` share a discrete
//!    log, and that it knows the secret key behind some `X_k` whose
//!    generator `H_k` underlies `T0`.  The servers produce the master
//!    challenge collectively and sign it, see `challenge`.
//! 3. Each server in turn strips its `s_j` from the tag and multiplies in
//!    its round secret `r_j`, proving it did so and signing the chain.
//!    The final tag is `(∏ r_j) H_i`.  A client whose commitments are
//!    inconsistent gets the identity tag instead.

use alloc::vec::Vec;

use rand_core::{CryptoRng, RngCore};

pub mod challenge;
pub mod client;
pub mod context;
pub mod messages;
pub mod quorum;
pub mod server;

#[cfg(test)]
mod tests;

pub use self::challenge::{ChallengeBundle, ChallengeCommitment, ChallengeGen, ChallengeOpening, ServerSignature};
pub use self::client::{Client, Opening};
pub use self::context::{AuthenticationContext, ContextId, RoundSecret};
pub use self::messages::{AuthenticationMessage, ClientProof, InitialTagAndCommitments, ServerMessage, ServerTagProof};
pub use self::quorum::{LocalQuorum, Quorum};
pub use self::server::{finalize_tag, verify_authentication_message, verify_server_message, Server};

use crate::errors::DagaResult;
use crate::keys::Keypair;

/// Fresh clients, servers with round secrets, and their context.
pub fn generate_context<R>(n: usize, m: usize, mut rng: R) -> DagaResult<(Vec<Client>, Vec<Server>, AuthenticationContext)>
where
    R: RngCore + CryptoRng,
{
    let clients: Vec<Client> = (0..n).map(|i| Client::new(i, Keypair::generate_with(&mut rng))).collect();
    let servers: Vec<Server> = (0..m as u32)
        .map(|j| Server::new(j, Keypair::generate_with(&mut rng), RoundSecret::generate_with(&mut rng)))
        .collect();
    let context = AuthenticationContext::new(
        clients.iter().map(|c| *c.public()).collect(),
        servers.iter().map(|s| *s.public()).collect(),
        servers.iter().map(Server::round_commitment).collect(),
    )?;
    Ok((clients, servers, context))
}
