//! The client's view of the server quorum.

use alloc::vec::Vec;

use rand_core::{CryptoRng, RngCore};

use super::challenge::{ChallengeBundle, ChallengeGen};
use super::context::AuthenticationContext;
use super::messages::{AuthenticationMessage, ServerMessage};
use super::server::Server;
use crate::errors::{DagaError, DagaResult};
use crate::sigma::Commitments;

/// Default bound on leader elections per challenge.
pub const DEFAULT_MAX_ATTEMPTS: usize = 3;

/// Channel through which a client reaches the servers.
///
/// Implementations carry messages over whatever transport connects the
/// quorum.  The client verifies everything it receives, so a quorum need
/// not be trusted.
pub trait Quorum {
    /// Collectively generate and sign a master challenge for `commitments`.
    fn challenge(&mut self, context: &AuthenticationContext, commitments: &Commitments) -> DagaResult<ChallengeBundle>;

    /// Pass `request` through every server and return the completed message.
    fn authenticate(&mut self, context: &AuthenticationContext, request: AuthenticationMessage) -> DagaResult<ServerMessage>;
}

/// Quorum of in-process servers.
///
/// Elects a random leader for each challenge, electing again when a
/// signature fails, and sends each request to a random entry server from
/// which it travels round-robin.
pub struct LocalQuorum<'a, R> {
    servers: &'a [Server],
    rng: R,
    max_attempts: usize,
}

impl<'a, R: RngCore + CryptoRng> LocalQuorum<'a, R> {
    /// Quorum over `servers`, ordered by index.
    pub fn new_rng(servers: &'a [Server], rng: R) -> LocalQuorum<'a, R> {
        LocalQuorum { servers, rng, max_attempts: DEFAULT_MAX_ATTEMPTS }
    }

    /// Bound the number of leader elections per challenge.
    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    fn pick(&mut self) -> usize {
        (self.rng.next_u64() % self.servers.len() as u64) as usize
    }

    fn check(&self, context: &AuthenticationContext) -> DagaResult<()> {
        if self.servers.len() != context.server_count() {
            return Err(DagaError::InvalidInput("quorum size differs from the context"));
        }
        if self.servers.iter().enumerate().any(|(j, s)| s.index() as usize != j) {
            return Err(DagaError::InvalidInput("quorum servers out of index order"));
        }
        Ok(())
    }

    fn challenge_once(
        &mut self,
        context: &AuthenticationContext,
        commitments: &Commitments,
        leader: usize,
    ) -> DagaResult<ChallengeBundle> {
        let m = self.servers.len();
        let mut gens: Vec<ChallengeGen<'_>> = Vec::with_capacity(m);
        let mut published = Vec::with_capacity(m);
        for server in self.servers {
            let (gen, commitment) = server.start_challenge_rng(context, commitments, &mut self.rng)?;
            gens.push(gen);
            published.push(commitment);
        }
        for gen in gens.iter_mut() {
            let me = gen.index();
            for commitment in published.iter().filter(|c| c.index != me) {
                gen.receive_commitment(commitment)?;
            }
        }

        let first = gens[leader].open(leader as u32)?;
        let mut openings = alloc::vec![first];
        for (j, gen) in gens.iter_mut().enumerate() {
            if j != leader {
                gen.receive_opening(&first)?;
                openings.push(gen.open(leader as u32)?);
            }
        }
        for gen in gens.iter_mut() {
            let me = gen.index();
            for opening in openings.iter().filter(|o| o.index != me && o.index != leader as u32) {
                gen.receive_opening(opening)?;
            }
        }

        let mut bundle = ChallengeBundle::new(gens[leader].challenge()?);
        for k in 0..m {
            let j = (leader + k) % m;
            bundle = self.servers[j].cosign(&gens[j], bundle)?;
        }
        Ok(bundle)
    }
}

#[cfg(feature = "getrandom")]
impl<'a> LocalQuorum<'a, rand_core::OsRng> {
    /// Quorum over `servers` using the operating system's randomness.
    pub fn new(servers: &'a [Server]) -> Self {
        LocalQuorum::new_rng(servers, rand_core::OsRng)
    }
}

impl<R: RngCore + CryptoRng> Quorum for LocalQuorum<'_, R> {
    fn challenge(&mut self, context: &AuthenticationContext, commitments: &Commitments) -> DagaResult<ChallengeBundle> {
        self.check(context)?;
        for _ in 0..self.max_attempts {
            let leader = self.pick();
            match self.challenge_once(context, commitments, leader) {
                Err(DagaError::BadSignature) => continue,
                other => return other,
            }
        }
        Err(DagaError::BadSignature)
    }

    fn authenticate(&mut self, context: &AuthenticationContext, request: AuthenticationMessage) -> DagaResult<ServerMessage> {
        self.check(context)?;
        let m = self.servers.len();
        let entry = self.pick();
        let mut msg = ServerMessage::new(request);
        for k in 0..m {
            msg = self.servers[(entry + k) % m].process_server_message_rng(context, msg, &mut self.rng)?;
        }
        Ok(msg)
    }
}
