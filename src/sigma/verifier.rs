//! Verifier role of the interactive sigma protocol.

use alloc::vec::Vec;

use curve25519_dalek::ristretto::RistrettoPoint;
use curve25519_dalek::scalar::Scalar;
use rand_core::{CryptoRng, RngCore};

use super::predicate::{Layout, Predicate, Shape, Statement};
use super::{Commitments, Phase, Proof, Responses};
use crate::errors::{DagaError, DagaResult};
use crate::group;

/// Verifier state machine.
pub struct Verifier<'a> {
    statement: &'a Statement,
    layout: Layout<'a>,
    commitments: Vec<RistrettoPoint>,
    challenge: Option<Scalar>,
    phase: Phase,
}

impl<'a> Verifier<'a> {
    /// Prepare to verify a proof of `predicate`.
    pub fn new(statement: &'a Statement, predicate: &'a Predicate) -> DagaResult<Verifier<'a>> {
        let layout = Layout::new(predicate)?;
        layout.validate(statement)?;
        Ok(Verifier { statement, layout, commitments: Vec::new(), challenge: None, phase: Phase::AwaitCommitments })
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Expected message sizes.
    pub fn shape(&self) -> Shape {
        self.layout.shape()
    }

    fn expect(&self, phase: Phase) -> DagaResult<()> {
        match self.phase {
            Phase::Aborted => Err(DagaError::Aborted),
            p if p == phase => Ok(()),
            _ => Err(DagaError::InvalidInput("verifier stepped out of order")),
        }
    }

    /// Accept the prover's commitments.
    pub fn receive_commitments(&mut self, commitments: Commitments) -> DagaResult<()> {
        self.expect(Phase::AwaitCommitments)?;
        if commitments.0.len() != self.layout.reps.len() {
            return Err(DagaError::InvalidInput("commitment count does not match predicate"));
        }
        self.commitments = commitments.0;
        self.phase = Phase::AwaitMasterChallenge;
        Ok(())
    }

    /// Pick a fresh random master challenge.
    pub fn challenge_rng<R: RngCore + CryptoRng>(&mut self, mut rng: R) -> DagaResult<Scalar> {
        let cs = group::random_scalar(&mut rng);
        self.set_challenge(cs)?;
        Ok(cs)
    }

    /// Use a master challenge produced elsewhere, e.g. collectively by a quorum.
    pub fn set_challenge(&mut self, cs: Scalar) -> DagaResult<()> {
        self.expect(Phase::AwaitMasterChallenge)?;
        self.challenge = Some(cs);
        self.phase = Phase::AwaitResponses;
        Ok(())
    }

    /// Check the prover's sub-challenges and responses, returning the full transcript.
    pub fn verify_responses(&mut self, responses: Responses) -> DagaResult<Proof> {
        self.expect(Phase::AwaitResponses)?;
        let challenge = self.challenge.ok_or(DagaError::InvalidInput("missing master challenge"))?;
        self.layout.check(
            self.statement,
            &challenge,
            &self.commitments,
            &responses.challenges,
            &responses.responses,
        )?;
        self.phase = Phase::Complete;
        Ok(Proof {
            challenge,
            commitments: core::mem::take(&mut self.commitments),
            sub_challenges: responses.challenges,
            responses: responses.responses,
        })
    }

    /// Cancel verification and drop the transcript so far.
    pub fn abort(&mut self) {
        self.commitments.clear();
        self.challenge = None;
        self.phase = Phase::Aborted;
    }
}
