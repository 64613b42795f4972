//! Sigma protocols for AND/OR compositions of representation claims.
//!
//! We implement the Cramer-Damgård-Schoenmakers OR-proof, composed with
//! AND, over a `Predicate` tree.  The prover and verifier are explicit
//! state machines, each suspended at one of three message boundaries:
//!
//! 1. the prover emits `Commitments`,
//! 2. the verifier emits the master challenge `cs`,
//! 3. the prover emits `Responses`, i.e. the sub-challenges `c_k` with
//!    `Σ c_k = cs` plus one response per secret per branch.
//!
//! `run` steps both roles in one place and carries the encoded bytes
//! between them, while `prove_rng` and `verify` replace the verifier
//! by a Fiat-Shamir transcript.  Either side may `abort` at any
//! boundary, after which every step fails with `DagaError::Aborted`.

use alloc::vec::Vec;

use curve25519_dalek::ristretto::RistrettoPoint;
use curve25519_dalek::scalar::Scalar;
use rand_core::{CryptoRng, RngCore};

use crate::errors::{DagaError, DagaResult};
use crate::group::{self, ByteReader, POINT_LENGTH, SCALAR_LENGTH};
use crate::transcript::SigningTranscript;

mod predicate;
mod prover;
mod verifier;

#[cfg(test)]
mod tests;

pub use self::predicate::{PointVar, Predicate, ScalarVar, Shape, Statement, Witness};
pub use self::prover::Prover;
pub use self::verifier::Verifier;

use self::predicate::Layout;

/// Message boundary at which a role is suspended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// The prover still has to send commitments.
    AwaitCommitments,
    /// Commitments were sent, the master challenge is outstanding.
    AwaitMasterChallenge,
    /// The challenge was sent, responses are outstanding.
    AwaitResponses,
    /// The transcript is complete.
    Complete,
    /// The proof was cancelled.
    Aborted,
}

/// Prover's first message: one commitment per `Rep`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commitments(pub Vec<RistrettoPoint>);

impl Commitments {
    /// Fixed-length concatenation of the commitments.
    pub fn to_bytes(&self) -> Vec<u8> {
        group::encode_points(&self.0)
    }

    /// Decode exactly `count` commitments.
    pub fn from_bytes(bytes: &[u8], count: usize) -> DagaResult<Commitments> {
        let mut reader = ByteReader::new(bytes);
        let points = reader.points(count)?;
        reader.finish("Commitments")?;
        Ok(Commitments(points))
    }
}

/// Prover's final message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Responses {
    /// One sub-challenge per child of every `Or`.
    pub challenges: Vec<Scalar>,
    /// One response per secret per scope.
    pub responses: Vec<Scalar>,
}

impl Responses {
    /// `c ‖ r`
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity((self.challenges.len() + self.responses.len()) * SCALAR_LENGTH);
        for s in self.challenges.iter().chain(self.responses.iter()) {
            bytes.extend_from_slice(s.as_bytes());
        }
        bytes
    }

    /// Decode responses sized for `shape`.
    pub fn from_bytes(bytes: &[u8], shape: Shape) -> DagaResult<Responses> {
        let mut reader = ByteReader::new(bytes);
        let challenges = reader.scalars(shape.sub_challenges)?;
        let responses = reader.scalars(shape.responses)?;
        reader.finish("Responses")?;
        Ok(Responses { challenges, responses })
    }
}

/// Complete sigma protocol transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proof {
    /// Master challenge `cs`
    pub challenge: Scalar,
    /// Commitments `t`
    pub commitments: Vec<RistrettoPoint>,
    /// Sub-challenges `c`
    pub sub_challenges: Vec<Scalar>,
    /// Responses `r`
    pub responses: Vec<Scalar>,
}

impl Proof {
    /// Byte length of a proof with this shape.
    pub fn encoded_length(shape: Shape) -> usize {
        SCALAR_LENGTH + shape.commitments * POINT_LENGTH + (shape.sub_challenges + shape.responses) * SCALAR_LENGTH
    }

    /// `cs ‖ t ‖ c ‖ r`
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(
            SCALAR_LENGTH
                + self.commitments.len() * POINT_LENGTH
                + (self.sub_challenges.len() + self.responses.len()) * SCALAR_LENGTH,
        );
        bytes.extend_from_slice(self.challenge.as_bytes());
        bytes.extend_from_slice(&group::encode_points(&self.commitments));
        for s in self.sub_challenges.iter().chain(self.responses.iter()) {
            bytes.extend_from_slice(s.as_bytes());
        }
        bytes
    }

    pub(crate) fn read(reader: &mut ByteReader<'_>, shape: Shape) -> DagaResult<Proof> {
        let challenge = reader.scalar()?;
        let commitments = reader.points(shape.commitments)?;
        let sub_challenges = reader.scalars(shape.sub_challenges)?;
        let responses = reader.scalars(shape.responses)?;
        Ok(Proof { challenge, commitments, sub_challenges, responses })
    }

    /// Decode a proof sized for `shape`.
    pub fn from_bytes(bytes: &[u8], shape: Shape) -> DagaResult<Proof> {
        let mut reader = ByteReader::new(bytes);
        let proof = Proof::read(&mut reader, shape)?;
        reader.finish("Proof")?;
        Ok(proof)
    }

    /// Check the verification equations under the proof's own master challenge.
    ///
    /// Callers must separately establish that `challenge` is legitimate.
    pub fn check(&self, statement: &Statement, predicate: &Predicate) -> DagaResult<()> {
        Layout::new(predicate)?.check(
            statement,
            &self.challenge,
            &self.commitments,
            &self.sub_challenges,
            &self.responses,
        )
    }
}

fn abort_both(prover: &mut Prover<'_>, verifier: &mut Verifier<'_>) -> DagaError {
    prover.abort();
    verifier.abort();
    DagaError::Aborted
}

/// Drive one interactive proof, carrying encoded messages between the roles.
///
/// `keep_going` gets consulted at each suspension point with the phase
/// about to be entered.  Returning `false` aborts both roles.
pub fn run<R, F>(
    prover: &mut Prover<'_>,
    verifier: &mut Verifier<'_>,
    mut rng: R,
    mut keep_going: F,
) -> DagaResult<Proof>
where
    R: RngCore + CryptoRng,
    F: FnMut(Phase) -> bool,
{
    let shape = verifier.shape();

    let commitments = prover.commit(&mut rng)?.to_bytes();
    if !keep_going(Phase::AwaitMasterChallenge) {
        return Err(abort_both(prover, verifier));
    }
    verifier.receive_commitments(Commitments::from_bytes(&commitments, shape.commitments)?)?;

    let cs = verifier.challenge_rng(&mut rng)?.to_bytes();
    if !keep_going(Phase::AwaitResponses) {
        return Err(abort_both(prover, verifier));
    }
    let responses = prover.respond(&group::decode_scalar(&cs)?)?.to_bytes();

    if !keep_going(Phase::Complete) {
        return Err(abort_both(prover, verifier));
    }
    verifier.verify_responses(Responses::from_bytes(&responses, shape)?)
}

fn fiat_shamir_challenge<T: SigningTranscript>(
    t: &mut T,
    statement: &Statement,
    commitments: &[RistrettoPoint],
) -> Scalar {
    t.proto_name(b"sigma-proof");
    statement.commit(t);
    for c in commitments {
        t.commit_point(b"sigma:t", &c.compress());
    }
    t.challenge_scalar(b"sigma:cs")
}

/// Non-interactive proof of `predicate`, the master challenge taken from `t`.
pub fn prove_rng<T, R>(
    mut t: T,
    statement: &Statement,
    predicate: &Predicate,
    witness: &Witness,
    choices: &[usize],
    mut rng: R,
) -> DagaResult<Proof>
where
    T: SigningTranscript,
    R: RngCore + CryptoRng,
{
    let mut prover = Prover::new(statement, predicate, witness, choices)?;
    let commitments = prover.commit(&mut rng)?;
    let challenge = fiat_shamir_challenge(&mut t, statement, &commitments.0);
    let responses = prover.respond(&challenge)?;
    Ok(Proof {
        challenge,
        commitments: commitments.0,
        sub_challenges: responses.challenges,
        responses: responses.responses,
    })
}

/// Verify a non-interactive proof produced by `prove_rng` on the same transcript.
pub fn verify<T: SigningTranscript>(
    mut t: T,
    statement: &Statement,
    predicate: &Predicate,
    proof: &Proof,
) -> DagaResult<()> {
    let challenge = fiat_shamir_challenge(&mut t, statement, &proof.commitments);
    if challenge != proof.challenge {
        return Err(DagaError::BadProof);
    }
    proof.check(statement, predicate)
}
