//! Bookkeeping of responses and justifications, shared by dealer and verifiers.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use curve25519_dalek::ristretto::RistrettoPoint;

use super::{pedersen_base, Justification, Parameters, Response, SessionId, Status};
use crate::errors::{DagaError, DagaResult};
use crate::keys::PublicKey;

/// Collects the verdicts on one dealer's deals and decides certification.
#[derive(Debug, Clone)]
pub struct Aggregator {
    dealer: PublicKey,
    verifiers: Vec<PublicKey>,
    h: RistrettoPoint,
    parameters: Parameters,
    session_id: Option<SessionId>,
    commitments: Vec<RistrettoPoint>,
    statuses: BTreeMap<u32, Status>,
    bad_dealer: bool,
    timeout: bool,
}

impl Aggregator {
    /// Aggregator for `dealer` sharing among `verifiers` with `threshold`.
    ///
    /// Responses are refused until the session is known, either from the
    /// dealer's own commitments or from the first deal received.
    pub fn new(dealer: PublicKey, verifiers: Vec<PublicKey>, threshold: usize) -> DagaResult<Aggregator> {
        let parameters = Parameters::new(verifiers.len(), threshold);
        parameters.validate()?;
        let h = pedersen_base(&verifiers);
        Ok(Aggregator {
            dealer,
            verifiers,
            h,
            parameters,
            session_id: None,
            commitments: Vec::new(),
            statuses: BTreeMap::new(),
            bad_dealer: false,
            timeout: false,
        })
    }

    /// Fix the session from its id and the dealer's commitments.
    pub fn bind(&mut self, session_id: SessionId, commitments: Vec<RistrettoPoint>) -> DagaResult<()> {
        if commitments.len() != self.parameters.threshold {
            return Err(DagaError::MismatchedThreshold);
        }
        let expected = super::session_id(&self.dealer, &self.verifiers, &commitments, self.parameters.threshold);
        if expected != session_id {
            return Err(DagaError::SessionMismatch);
        }
        match self.session_id {
            Some(sid) if sid != session_id => Err(DagaError::SessionMismatch),
            _ => {
                self.session_id = Some(session_id);
                self.commitments = commitments;
                Ok(())
            }
        }
    }

    /// Session id, once bound.
    pub fn session_id(&self) -> Option<&SessionId> {
        self.session_id.as_ref()
    }

    /// Commitments `C_k`, empty until bound.
    pub fn commitments(&self) -> &[RistrettoPoint] {
        &self.commitments
    }

    /// Participants and threshold.
    pub fn parameters(&self) -> Parameters {
        self.parameters
    }

    /// Dealer's long term key.
    pub fn dealer(&self) -> &PublicKey {
        &self.dealer
    }

    /// Verifier keys in index order.
    pub fn verifiers(&self) -> &[PublicKey] {
        &self.verifiers
    }

    pub(crate) fn h(&self) -> &RistrettoPoint {
        &self.h
    }

    fn check_session(&self, session_id: &SessionId, index: u32) -> DagaResult<()> {
        let sid = self.session_id.as_ref().ok_or(DagaError::InvalidInput("session not yet bound"))?;
        if sid != session_id {
            return Err(DagaError::SessionMismatch);
        }
        if index as usize >= self.verifiers.len() {
            return Err(DagaError::InvalidInput("verifier index out of range"));
        }
        Ok(())
    }

    /// Record a verifier's signed verdict.
    pub fn process_response(&mut self, response: &Response) -> DagaResult<()> {
        self.check_session(&response.session_id, response.index)?;
        self.verifiers[response.index as usize].verify(response.transcript(), &response.signature)?;
        if self.statuses.contains_key(&response.index) {
            return Err(DagaError::DuplicateSignature(response.index));
        }
        self.statuses.insert(response.index, response.status);
        Ok(())
    }

    /// Settle a complaint with the dealer's published deal.
    ///
    /// A deal that checks out turns the complaint into an approval.
    /// Otherwise the dealer is marked bad and `Misbehavior` names the
    /// verifier it cheated.
    pub fn process_justification(&mut self, justification: &Justification) -> DagaResult<()> {
        self.check_session(&justification.session_id, justification.index)?;
        self.dealer.verify(justification.transcript(), &justification.signature)?;
        match self.statuses.get(&justification.index) {
            None => return Err(DagaError::InvalidInput("no response to justify")),
            Some(Status::Approval) => return Err(DagaError::InvalidInput("justification without complaint")),
            Some(Status::Complaint) => {}
        }
        let sid = self.session_id.ok_or(DagaError::InvalidInput("session not yet bound"))?;
        let checked = justification.deal.verify(&self.h, justification.index, self.parameters.threshold, &sid);
        if checked.is_err() || justification.deal.commitments != self.commitments {
            self.bad_dealer = true;
            return Err(DagaError::Misbehavior(justification.index));
        }
        self.statuses.insert(justification.index, Status::Approval);
        Ok(())
    }

    /// Count verifiers that never answered as complaining from now on.
    pub fn set_timeout(&mut self) {
        self.timeout = true;
    }

    /// Whether a justification proved the dealer faulty.
    pub fn is_bad_dealer(&self) -> bool {
        self.bad_dealer
    }

    /// Verdict recorded for verifier `index`.
    pub fn status(&self, index: u32) -> Option<Status> {
        self.statuses.get(&index).copied()
    }

    fn count(&self, status: Status) -> usize {
        self.statuses.values().filter(|s| **s == status).count()
    }

    /// At least `t` approvals.
    pub fn enough_approvals(&self) -> bool {
        self.count(Status::Approval) >= self.parameters.threshold
    }

    /// Whether the deal is certified.
    ///
    /// Requires an honest dealer, at least `t` approvals and fewer than
    /// `t - 1` outstanding complaints.  Before the timeout every verifier
    /// must have answered; afterwards silent verifiers count as complaints.
    pub fn deal_certified(&self) -> bool {
        if self.bad_dealer || self.session_id.is_none() {
            return false;
        }
        let absent = self.verifiers.len() - self.statuses.len();
        if absent > 0 && !self.timeout {
            return false;
        }
        let complaints = self.count(Status::Complaint) + absent;
        self.enough_approvals() && complaints < self.parameters.threshold - 1
    }
}
