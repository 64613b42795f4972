//! Client side of an authentication.

use alloc::vec::Vec;

use curve25519_dalek::ristretto::RistrettoPoint;
use curve25519_dalek::scalar::Scalar;
use rand_core::{CryptoRng, RngCore};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::context::AuthenticationContext;
use super::messages::{AuthenticationMessage, ClientProof, InitialTagAndCommitments};
use super::quorum::Quorum;
use super::server::finalize_tag;
use crate::errors::{DagaError, DagaResult};
use crate::group;
use crate::keys::{Keypair, PublicKey};
use crate::sigma::{Predicate, Prover, ScalarVar, Statement, Witness};

/// `Hash(k)` for the Diffie-Hellman key `k` a client shares with one server.
pub(crate) fn shared_secret(dh: &RistrettoPoint) -> Scalar {
    group::hash_to_nonzero_scalar(group::SHARED_SECRET_DOMAIN, &[&group::encode_point(dh)])
}

/// Statement and predicate of `PKclient`:
/// `OR_k ( T0 = s H_k ∧ S_m = s B ∧ X_k = x_k B )`.
pub(crate) struct ClientStatement {
    pub(crate) statement: Statement,
    pub(crate) predicate: Predicate,
    pub(crate) s: ScalarVar,
    pub(crate) xs: Vec<ScalarVar>,
}

impl ClientStatement {
    pub(crate) fn new(
        context: &AuthenticationContext,
        initial: &InitialTagAndCommitments,
    ) -> DagaResult<ClientStatement> {
        let s_m = *initial
            .s_commits
            .last()
            .ok_or(DagaError::InvalidInput("missing server commitments"))?;

        let mut statement = Statement::new();
        let s = statement.allocate_scalar("s");
        let b = statement.allocate_point("B", group::base());
        let t0 = statement.allocate_point("T0", initial.t0);
        let s_m = statement.allocate_point("S_m", s_m);

        let mut xs = Vec::with_capacity(context.client_count());
        let mut branches = Vec::with_capacity(context.client_count());
        for (x, h) in context.clients().iter().zip(context.generators()) {
            let x_k = statement.allocate_scalar("x_k");
            let x = statement.allocate_point("X_k", *x.as_point());
            let h = statement.allocate_point("H_k", *h);
            branches.push(Predicate::and(alloc::vec![
                Predicate::rep(t0, s, h),
                Predicate::rep(s_m, s, b),
                Predicate::rep(x, x_k, b),
            ]));
            xs.push(x_k);
        }
        Ok(ClientStatement { statement, predicate: Predicate::or(branches), s, xs })
    }
}

/// Opening `s = ∏ s_j` of a client's initial tag.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct Opening {
    pub(crate) s: Scalar,
}

impl core::fmt::Debug for Opening {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Opening(..)")
    }
}

/// Member of the client group `X`.
#[derive(Debug, Clone)]
pub struct Client {
    index: usize,
    keypair: Keypair,
}

impl Client {
    /// Client holding `X[index]`.
    pub fn new(index: usize, keypair: Keypair) -> Client {
        Client { index, keypair }
    }

    /// Position in `X`.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Long-term public key `X_i`.
    pub fn public(&self) -> &PublicKey {
        &self.keypair.public
    }

    fn check_membership(&self, context: &AuthenticationContext) -> DagaResult<()> {
        if context.client_count() < 2 {
            return Err(DagaError::InvalidInput("authentication needs at least two clients"));
        }
        match context.clients().get(self.index) {
            Some(x) if *x == self.keypair.public => Ok(()),
            _ => Err(DagaError::InvalidInput("client key is not at its index in the context")),
        }
    }

    /// Fresh ephemeral commitments and initial tag, with the opening of `T0`.
    ///
    /// `Z = z B`, `s_j = Hash(z Y_j)`, `S_k = s_k S_{k-1}` from `S_0 = B`,
    /// and `T0 = (∏ s_j) H_i`.
    pub fn initial_tag_rng<R>(
        &self,
        context: &AuthenticationContext,
        mut rng: R,
    ) -> DagaResult<(InitialTagAndCommitments, Opening)>
    where
        R: RngCore + CryptoRng,
    {
        let h = context
            .generators()
            .get(self.index)
            .ok_or(DagaError::InvalidInput("client index out of range"))?;

        let mut z = group::random_nonzero_scalar(&mut rng);
        let mut s_commits = Vec::with_capacity(context.server_count() + 2);
        s_commits.push(group::base() * z);
        s_commits.push(group::base());
        let mut s = Scalar::ONE;
        for y in context.servers() {
            let mut s_j = shared_secret(&(y.as_point() * z));
            s *= s_j;
            s_commits.push(group::base() * s);
            s_j.zeroize();
        }
        z.zeroize();

        let t0 = h * s;
        Ok((InitialTagAndCommitments { s_commits, t0 }, Opening { s }))
    }

    /// Authenticate through `quorum` from an explicit initial tag.
    ///
    /// Proves `PKclient`, lets the quorum produce and sign the master
    /// challenge, hands the request to the quorum, and returns the final
    /// linkage tag after checking every server's proof and signature.
    /// The tag is the identity when the servers flagged misbehavior.
    pub fn authenticate_with<Q, R>(
        &self,
        context: &AuthenticationContext,
        quorum: &mut Q,
        initial: InitialTagAndCommitments,
        opening: &Opening,
        mut rng: R,
    ) -> DagaResult<RistrettoPoint>
    where
        Q: Quorum + ?Sized,
        R: RngCore + CryptoRng,
    {
        self.check_membership(context)?;
        let cs = ClientStatement::new(context, &initial)?;
        let mut witness = Witness::new(&cs.statement);
        witness.set(cs.s, opening.s);
        witness.set(cs.xs[self.index], *self.keypair.secret.scalar());

        let mut prover = Prover::new(&cs.statement, &cs.predicate, &witness, &[self.index])?;
        let commitments = prover.commit(&mut rng)?;
        let bundle = match quorum.challenge(context, &commitments) {
            Ok(bundle) => bundle,
            Err(e) => {
                prover.abort();
                return Err(e);
            }
        };
        if let Err(e) = bundle.verify(context, &commitments) {
            prover.abort();
            return Err(e);
        }
        let responses = prover.respond(&bundle.cs)?;

        let request = AuthenticationMessage {
            context_id: *context.id(),
            initial,
            proof: ClientProof {
                bundle,
                commitments: commitments.0,
                sub_challenges: responses.challenges,
                responses: responses.responses,
            },
        };
        let reply = quorum.authenticate(context, request.clone())?;
        if reply.request != request {
            return Err(DagaError::InvalidInput("quorum answered a different request"));
        }
        finalize_tag(context, &reply)
    }

    /// Authenticate through `quorum` with fresh ephemeral commitments.
    pub fn authenticate_rng<Q, R>(
        &self,
        context: &AuthenticationContext,
        quorum: &mut Q,
        mut rng: R,
    ) -> DagaResult<RistrettoPoint>
    where
        Q: Quorum + ?Sized,
        R: RngCore + CryptoRng,
    {
        self.check_membership(context)?;
        let (initial, opening) = self.initial_tag_rng(context, &mut rng)?;
        self.authenticate_with(context, quorum, initial, &opening, &mut rng)
    }

    /// Authenticate through `quorum` with the default randomness source.
    #[cfg(feature = "getrandom")]
    pub fn authenticate<Q: Quorum + ?Sized>(
        &self,
        context: &AuthenticationContext,
        quorum: &mut Q,
    ) -> DagaResult<RistrettoPoint> {
        self.authenticate_rng(context, quorum, getrandom_or_panic::getrandom_or_panic())
    }
}
