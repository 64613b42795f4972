//! Prover role of the interactive sigma protocol.

use alloc::vec::Vec;

use curve25519_dalek::ristretto::RistrettoPoint;
use curve25519_dalek::scalar::Scalar;
use curve25519_dalek::traits::VartimeMultiscalarMul;
use rand_core::{CryptoRng, RngCore};
use zeroize::Zeroize;

use super::predicate::{Layout, Predicate, Statement, Witness};
use super::{Commitments, Phase, Responses};
use crate::errors::{DagaError, DagaResult};
use crate::group;

/// Prover state machine.
///
/// Honest scopes commit to fresh nonces `v` and later answer
/// `r = v - c w`.  Scopes the prover cannot open are simulated: their
/// challenge and responses get picked first and the commitments solved
/// for, so both kinds of branch look alike to the verifier.
pub struct Prover<'a> {
    statement: &'a Statement,
    witness: &'a Witness,
    layout: Layout<'a>,
    choices: Vec<usize>,
    honest: Vec<bool>,
    /// Nonces in honest scopes, final responses in simulated scopes.
    secrets: Vec<Scalar>,
    /// Sub-challenges of scopes whose challenge is fixed at commit time.
    subs: Vec<Option<Scalar>>,
    phase: Phase,
}

impl<'a> Prover<'a> {
    /// Prepare a proof of `predicate`.
    ///
    /// `choices` names the true branch of every `Or`, in the depth first
    /// order the `Or`s appear in `predicate`.  Entries for `Or`s inside
    /// simulated branches are ignored.
    pub fn new(
        statement: &'a Statement,
        predicate: &'a Predicate,
        witness: &'a Witness,
        choices: &[usize],
    ) -> DagaResult<Prover<'a>> {
        let layout = Layout::new(predicate)?;
        layout.validate(statement)?;
        if choices.len() != layout.ors.len() {
            return Err(DagaError::InvalidInput("one choice per disjunction required"));
        }

        // The root is honest.  An honest Or has exactly one honest child.
        let mut honest = alloc::vec![false; layout.scopes.len()];
        honest[0] = true;
        for (or, choice) in layout.ors.iter().zip(choices) {
            if !honest[or.scope] {
                continue;
            }
            if *choice >= or.len {
                return Err(DagaError::InvalidInput("choice outside disjunction"));
            }
            honest[or.first_scope + choice] = true;
        }

        // Fail early rather than after the verifier's challenge.
        for rep in layout.reps.iter() {
            if honest[rep.scope] && rep.terms.iter().any(|(s, _)| witness.get(*s).is_none()) {
                return Err(DagaError::InvalidInput("missing witness on the true branch"));
            }
        }

        let subs = alloc::vec![None; layout.subs];
        Ok(Prover {
            statement,
            witness,
            layout,
            choices: choices.to_vec(),
            honest,
            secrets: Vec::new(),
            subs,
            phase: Phase::AwaitCommitments,
        })
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    fn expect(&self, phase: Phase) -> DagaResult<()> {
        match self.phase {
            Phase::Aborted => Err(DagaError::Aborted),
            p if p == phase => Ok(()),
            _ => Err(DagaError::InvalidInput("prover stepped out of order")),
        }
    }

    /// First move: commitments for every representation.
    pub fn commit<R: RngCore + CryptoRng>(&mut self, mut rng: R) -> DagaResult<Commitments> {
        self.expect(Phase::AwaitCommitments)?;
        let layout = &self.layout;

        // Scope challenges known before the master challenge arrives.
        let mut fixed: Vec<Option<Scalar>> = alloc::vec![None; layout.scopes.len()];
        for (or, choice) in layout.ors.iter().zip(self.choices.iter()) {
            if self.honest[or.scope] {
                for k in 0..or.len {
                    if k != *choice {
                        let c = group::random_scalar(&mut rng);
                        fixed[or.first_scope + k] = Some(c);
                        self.subs[or.first_sub + k] = Some(c);
                    }
                }
            } else {
                // Fully simulated: split the enclosing challenge at random.
                let total = fixed[or.scope].unwrap_or(Scalar::ZERO);
                let mut sum = Scalar::ZERO;
                for k in 0..or.len {
                    let c = if k + 1 == or.len { total - sum } else { group::random_scalar(&mut rng) };
                    sum += c;
                    fixed[or.first_scope + k] = Some(c);
                    self.subs[or.first_sub + k] = Some(c);
                }
            }
        }

        self.secrets = (0..layout.responses).map(|_| group::random_scalar(&mut rng)).collect();

        let mut ts = Vec::with_capacity(layout.reps.len());
        for rep in layout.reps.iter() {
            let scope = &layout.scopes[rep.scope];
            let t = if self.honest[rep.scope] {
                RistrettoPoint::vartime_multiscalar_mul(
                    rep.terms.iter().map(|(s, _)| self.secrets[scope.response_index(*s)]),
                    rep.terms.iter().map(|(_, b)| *self.statement.point(*b)),
                )
            } else {
                let c = fixed[rep.scope].unwrap_or(Scalar::ZERO);
                layout.recompute(rep, self.statement, &c, &self.secrets)
            };
            ts.push(t);
        }

        self.phase = Phase::AwaitMasterChallenge;
        Ok(Commitments(ts))
    }

    /// Second move: sub-challenges and responses for master challenge `cs`.
    pub fn respond(&mut self, cs: &Scalar) -> DagaResult<Responses> {
        self.expect(Phase::AwaitMasterChallenge)?;
        let layout = &self.layout;

        let mut scope_cs: Vec<Option<Scalar>> = alloc::vec![None; layout.scopes.len()];
        scope_cs[0] = Some(*cs);
        for (or, choice) in layout.ors.iter().zip(self.choices.iter()) {
            if self.honest[or.scope] {
                let total = scope_cs[or.scope].unwrap_or(Scalar::ZERO);
                let others: Scalar = (0..or.len)
                    .filter(|k| k != choice)
                    .map(|k| self.subs[or.first_sub + k].unwrap_or(Scalar::ZERO))
                    .sum();
                self.subs[or.first_sub + choice] = Some(total - others);
            }
            for k in 0..or.len {
                scope_cs[or.first_scope + k] = self.subs[or.first_sub + k];
            }
        }

        let mut responses = self.secrets.clone();
        for (id, scope) in layout.scopes.iter().enumerate() {
            if !self.honest[id] {
                continue;
            }
            let c = scope_cs[id].unwrap_or(Scalar::ZERO);
            for (k, var) in scope.vars.iter().enumerate() {
                let w = self.witness.get(*var).ok_or(DagaError::InvalidInput("missing witness"))?;
                responses[scope.offset + k] -= c * w;
            }
        }

        let challenges = self.subs.iter().map(|c| c.unwrap_or(Scalar::ZERO)).collect();
        self.secrets.zeroize();
        self.phase = Phase::Complete;
        Ok(Responses { challenges, responses })
    }

    /// Cancel the proof, erasing every nonce.
    pub fn abort(&mut self) {
        self.secrets.zeroize();
        self.phase = Phase::Aborted;
    }
}

impl<'a> Drop for Prover<'a> {
    fn drop(&mut self) {
        self.secrets.zeroize();
    }
}
