//! Server side: challenge generation, tag rewriting, and verification of
//! everything a client or an earlier server sent.

use alloc::vec::Vec;

use curve25519_dalek::ristretto::RistrettoPoint;
use curve25519_dalek::scalar::Scalar;
use merlin::Transcript;
use rand_core::{CryptoRng, RngCore};
use zeroize::Zeroize;

use super::challenge::{ensure_distinct, verify_signatures, ChallengeBundle, ChallengeCommitment, ChallengeGen, ServerSignature};
use super::client::{shared_secret, ClientStatement};
use super::context::{AuthenticationContext, ContextId, RoundSecret};
use super::messages::{AuthenticationMessage, ServerMessage, ServerTagProof};
use crate::dleq::DleqProof;
use crate::errors::{DagaError, DagaResult};
use crate::group;
use crate::keys::{Keypair, PublicKey};
use crate::sigma::{Commitments, Verifier};
use crate::sign::Signature;
use crate::transcript::SigningTranscript;

/// Transcript of an honest tag proof, up to its commitments.
#[allow(clippy::too_many_arguments)]
fn honest_transcript(
    context: &ContextId,
    index: u32,
    t_prev: &RistrettoPoint,
    t_new: &RistrettoPoint,
    r_j: &RistrettoPoint,
    s_next: &RistrettoPoint,
    s_prev: &RistrettoPoint,
) -> Transcript {
    let mut t = Transcript::new(b"daga-server-proof");
    t.proto_name(b"honest-tag");
    t.append_message(b"context", context);
    t.commit_index(b"index", index);
    t.commit_point(b"T_prev", &t_prev.compress());
    t.commit_point(b"T_new", &t_new.compress());
    t.commit_point(b"R_j", &r_j.compress());
    t.commit_point(b"B", &group::base().compress());
    t.commit_point(b"S_next", &s_next.compress());
    t.commit_point(b"S_prev", &s_prev.compress());
    t
}

fn honest_challenge(mut t: Transcript, t1: &RistrettoPoint, t2: &RistrettoPoint, t3: &RistrettoPoint) -> Scalar {
    t.commit_point(b"t1", &t1.compress());
    t.commit_point(b"t2", &t2.compress());
    t.commit_point(b"t3", &t3.compress());
    t.challenge_scalar(b"c")
}

fn misbehavior_transcript(context: &ContextId, index: u32) -> Transcript {
    let mut t = Transcript::new(b"daga-server-proof");
    t.proto_name(b"misbehavior");
    t.append_message(b"context", context);
    t.commit_index(b"index", index);
    t
}

/// Whether server `j` must flag the client, given the tag it would rewrite.
fn client_misbehaves(
    s_commits: &[RistrettoPoint],
    j: usize,
    s_j: &Scalar,
    t_prev: &RistrettoPoint,
) -> bool {
    s_commits[j + 2] != s_commits[j + 1] * s_j || *t_prev == group::identity()
}

fn verify_tag_proof(
    context: &AuthenticationContext,
    request: &AuthenticationMessage,
    index: u32,
    t_prev: &RistrettoPoint,
    t_new: &RistrettoPoint,
    proof: &ServerTagProof,
) -> DagaResult<()> {
    let j = index as usize;
    let s_commits = &request.initial.s_commits;
    match *proof {
        ServerTagProof::Honest { t1, t2, t3, c, r1, r2 } => {
            let r_j = &context.commitments()[j];
            let (s_prev, s_next) = (&s_commits[j + 1], &s_commits[j + 2]);
            let t = honest_transcript(context.id(), index, t_prev, t_new, r_j, s_next, s_prev);
            if honest_challenge(t, &t1, &t2, &t3) != c {
                return Err(DagaError::BadProof);
            }
            let ok = t1 == t_prev * r1 - t_new * r2
                && t2 == RistrettoPoint::vartime_double_scalar_mul_basepoint(&c, r_j, &r1)
                && t3 == s_prev * r2 + s_next * c;
            if !ok {
                return Err(DagaError::BadProof);
            }
        }
        ServerTagProof::Misbehavior { t1, t2, t3, c, r1 } => {
            let dleq = DleqProof { c, r: r1, vg: t1, vh: t2 };
            let y = context.servers()[j].as_point();
            dleq.verify(misbehavior_transcript(context.id(), index), &s_commits[0], &group::base(), &t3, y)?;
            if !client_misbehaves(s_commits, j, &shared_secret(&t3), t_prev) || *t_new != group::identity() {
                return Err(DagaError::BadProof);
            }
        }
    }
    Ok(())
}

/// Structural checks on a client's request and verification of its proof.
///
/// The request must name `context`, carry `m + 2` server commitments
/// starting from a non-identity `Z` and `S_0 = B`, and answer a challenge
/// signed by every server.  Only a wrong number of commitments is
/// `InvalidInput`; a well sized request with bad contents is `BadProof`.
pub fn verify_authentication_message(context: &AuthenticationContext, msg: &AuthenticationMessage) -> DagaResult<()> {
    context.check_id(&msg.context_id)?;
    let s_commits = &msg.initial.s_commits;
    if s_commits.len() != context.server_count() + 2 {
        return Err(DagaError::InvalidInput("one commitment per server required"));
    }
    if s_commits[0] == group::identity() || s_commits[1] != group::base() {
        return Err(DagaError::BadProof);
    }

    let commitments = msg.proof.client_commitments();
    msg.proof.bundle.verify(context, &commitments)?;

    let cs = ClientStatement::new(context, &msg.initial)?;
    let mut verifier = Verifier::new(&cs.statement, &cs.predicate)?;
    verifier.receive_commitments(commitments)?;
    verifier.set_challenge(msg.proof.bundle.cs)?;
    verifier.verify_responses(msg.proof.client_responses())?;
    Ok(())
}

/// Check a partially or fully processed `ServerMessage`.
///
/// Besides the request, every hop must come from a distinct server, carry
/// a signature by that server over the cumulative chain, and a valid tag
/// proof.  Hops naming a server other than their signer fail as
/// `BadSignature`.
pub fn verify_server_message(context: &AuthenticationContext, msg: &ServerMessage) -> DagaResult<()> {
    verify_authentication_message(context, &msg.request)?;
    msg.check_lengths()?;
    let m = context.server_count();
    if msg.hops() > m {
        return Err(DagaError::InvalidInput("more hops than servers"));
    }

    let request = msg.request.to_bytes();
    let mut transcripts = Vec::with_capacity(msg.hops());
    let mut signatures: Vec<Signature> = Vec::with_capacity(msg.hops());
    let mut signers: Vec<PublicKey> = Vec::with_capacity(msg.hops());
    for (k, (index, sig)) in msg.indexes.iter().zip(&msg.sigs).enumerate() {
        let signer = match context.servers().get(*index as usize) {
            Some(signer) if sig.index == *index => signer,
            _ => return Err(DagaError::BadSignature),
        };
        transcripts.push(msg.hop_transcript(&request, k));
        signatures.push(sig.signature);
        signers.push(*signer);
    }
    verify_signatures(&transcripts, &signatures, &signers)?;
    ensure_distinct(msg.indexes.iter().copied())?;

    let mut t_prev = &msg.request.initial.t0;
    for ((index, t_new), proof) in msg.indexes.iter().zip(&msg.tags).zip(&msg.proofs) {
        verify_tag_proof(context, &msg.request, *index, t_prev, t_new, proof)?;
        t_prev = t_new;
    }
    Ok(())
}

/// Verify a message every server processed and return the final linkage tag.
///
/// The identity tag means some server flagged the client.
pub fn finalize_tag(context: &AuthenticationContext, msg: &ServerMessage) -> DagaResult<RistrettoPoint> {
    if msg.hops() != context.server_count() {
        return Err(DagaError::InvalidInput("not every server processed the request"));
    }
    verify_server_message(context, msg)?;
    Ok(*msg.current_tag())
}

/// Member of the server quorum `Y`, holding its secret for one round.
#[derive(Debug)]
pub struct Server {
    index: u32,
    keypair: Keypair,
    round: RoundSecret,
}

impl Server {
    /// Server holding `Y[index]` and the secret behind `R[index]`.
    pub fn new(index: u32, keypair: Keypair, round: RoundSecret) -> Server {
        Server { index, keypair, round }
    }

    /// Position in `Y`.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Long-term public key `Y_j`.
    pub fn public(&self) -> &PublicKey {
        &self.keypair.public
    }

    /// Round commitment `R_j`.
    pub fn round_commitment(&self) -> RistrettoPoint {
        self.round.commitment()
    }

    /// Join a collective challenge generation for a client's commitments.
    pub fn start_challenge_rng<'a, R>(
        &self,
        context: &'a AuthenticationContext,
        commitments: &Commitments,
        rng: R,
    ) -> DagaResult<(ChallengeGen<'a>, ChallengeCommitment)>
    where
        R: RngCore + CryptoRng,
    {
        ChallengeGen::start(context, &self.keypair, self.index, commitments.clone(), rng)
    }

    /// Verify the signatures on `bundle` so far and append ours.
    pub fn cosign(&self, gen: &ChallengeGen<'_>, bundle: ChallengeBundle) -> DagaResult<ChallengeBundle> {
        if gen.index() != self.index {
            return Err(DagaError::InvalidInput("challenge state belongs to another server"));
        }
        gen.cosign(&self.keypair, bundle)
    }

    fn check_context(&self, context: &AuthenticationContext) -> DagaResult<()> {
        let j = self.index as usize;
        if context.servers().get(j) != Some(&self.keypair.public)
            || context.commitments().get(j) != Some(&self.round.commitment())
        {
            return Err(DagaError::InvalidInput("server key or round commitment not at its index"));
        }
        Ok(())
    }

    /// Verify `msg`, rewrite the current tag, and append our hop.
    ///
    /// A client whose commitments do not match our shared secret, or whose
    /// tag an earlier server already nulled, gets the identity tag and a
    /// misbehavior proof instead of an error.
    pub fn process_server_message_rng<R>(
        &self,
        context: &AuthenticationContext,
        mut msg: ServerMessage,
        mut rng: R,
    ) -> DagaResult<ServerMessage>
    where
        R: RngCore + CryptoRng,
    {
        self.check_context(context)?;
        verify_server_message(context, &msg)?;
        if msg.hops() >= context.server_count() {
            return Err(DagaError::InvalidInput("every server already processed the request"));
        }
        if msg.indexes.contains(&self.index) {
            return Err(DagaError::DuplicateSignature(self.index));
        }

        let j = self.index as usize;
        let s_commits = &msg.request.initial.s_commits;
        let z = s_commits[0];
        let y = self.keypair.secret.scalar();
        let zs = z * y;
        let mut s = shared_secret(&zs);
        let t_prev = *msg.current_tag();

        let (t_new, proof) = if client_misbehaves(s_commits, j, &s, &t_prev) {
            let t = misbehavior_transcript(context.id(), self.index);
            let (dleq, _, _) = DleqProof::prove_rng(t, y, &z, &group::base(), &mut rng);
            let proof = ServerTagProof::Misbehavior { t1: dleq.vg, t2: dleq.vh, t3: zs, c: dleq.c, r1: dleq.r };
            (group::identity(), proof)
        } else {
            let r = self.round.scalar();
            let (s_prev, s_next) = (s_commits[j + 1], s_commits[j + 2]);
            let t_new = t_prev * (r * s.invert());
            let t = honest_transcript(context.id(), self.index, &t_prev, &t_new, &context.commitments()[j], &s_next, &s_prev);

            let mut nonce = |label: &'static [u8], secret: &Scalar| {
                let mut bytes = [0u8; 64];
                t.witness_bytes_rng(label, &mut bytes, &[&secret.as_bytes()[..]], &mut rng);
                Scalar::from_bytes_mod_order_wide(&bytes)
            };
            let mut v1 = nonce(b"v1", r);
            let mut v2 = nonce(b"v2", &s);
            let t1 = t_prev * v1 - t_new * v2;
            let t2 = group::base() * v1;
            let t3 = s_prev * v2;
            let c = honest_challenge(t, &t1, &t2, &t3);
            let proof = ServerTagProof::Honest { t1, t2, t3, c, r1: v1 - c * r, r2: v2 - c * s };
            v1.zeroize();
            v2.zeroize();
            (t_new, proof)
        };
        s.zeroize();

        msg.tags.push(t_new);
        msg.proofs.push(proof);
        msg.indexes.push(self.index);
        let request = msg.request.to_bytes();
        let signature = self.keypair.sign(msg.hop_transcript(&request, msg.hops() - 1));
        msg.sigs.push(ServerSignature { index: self.index, signature });
        Ok(msg)
    }

    /// Process `msg` with the default randomness source.
    #[cfg(feature = "getrandom")]
    pub fn process_server_message(&self, context: &AuthenticationContext, msg: ServerMessage) -> DagaResult<ServerMessage> {
        self.process_server_message_rng(context, msg, getrandom_or_panic::getrandom_or_panic())
    }

    /// Erase the round secret once the context expires.
    pub fn retire(self) {
        self.round.retire();
    }
}
