//! Verifier side of Pedersen VSS.

use alloc::vec::Vec;

use zeroize::Zeroize;

use super::{
    decrypt, dh_key_transcript, encryption_key, response_transcript, session_id, Aggregator, Deal,
    EncryptedDeal, Justification, Response, SessionId, Status,
};
use crate::errors::{DagaError, DagaResult};
use crate::keys::{Keypair, PublicKey};

/// Receives one share of a dealer's secret and votes on it.
pub struct Verifier {
    keypair: Keypair,
    index: u32,
    aggregator: Aggregator,
    received: bool,
    deal: Option<Deal>,
}

impl Verifier {
    /// Verifier for `dealer`'s session; our key must appear in `verifiers`.
    pub fn new(keypair: Keypair, dealer: PublicKey, verifiers: Vec<PublicKey>, threshold: usize) -> DagaResult<Verifier> {
        let index = verifiers
            .iter()
            .position(|v| *v == keypair.public)
            .ok_or(DagaError::InvalidInput("our key is not among the verifiers"))? as u32;
        let aggregator = Aggregator::new(dealer, verifiers, threshold)?;
        Ok(Verifier { keypair, index, aggregator, received: false, deal: None })
    }

    /// Our position among the verifiers.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Session id, once a deal arrived.
    pub fn session_id(&self) -> Option<&SessionId> {
        self.aggregator.session_id()
    }

    /// Decrypt and check our deal, answering with a signed `Response`.
    ///
    /// A deal inconsistent with its commitments yields a complaint, while
    /// undecryptable or unsigned deals are rejected without a response.
    pub fn process_encrypted_deal(&mut self, encrypted: &EncryptedDeal) -> DagaResult<Response> {
        if self.received {
            return Err(DagaError::InvalidInput("deal already processed"));
        }
        let dealer = *self.aggregator.dealer();
        dealer.verify(dh_key_transcript(&encrypted.dh_key, &encrypted.nonce), &encrypted.signature)?;

        let shared = encrypted.dh_key.as_point() * self.keypair.secret.scalar();
        let mut key = encryption_key(&dealer, &self.keypair.public, &encrypted.dh_key, &shared);
        let plaintext = decrypt(&key, &encrypted.nonce, &encrypted.cipher);
        key.zeroize();
        let mut plaintext = plaintext?;
        let deal = Deal::from_bytes(&plaintext);
        plaintext.zeroize();
        let deal = deal?;

        let t = self.aggregator.parameters().threshold;
        if deal.threshold as usize != t || deal.commitments.len() != t {
            return Err(DagaError::MismatchedThreshold);
        }
        let sid = session_id(&dealer, self.aggregator.verifiers(), &deal.commitments, t);
        self.aggregator.bind(sid, deal.commitments.clone())?;
        self.received = true;

        let status = match deal.verify(self.aggregator.h(), self.index, t, &sid) {
            Ok(()) => {
                self.deal = Some(deal);
                Status::Approval
            }
            Err(_) => Status::Complaint,
        };
        let signature = self.keypair.sign(response_transcript(&sid, self.index, status));
        let response = Response { session_id: sid, index: self.index, status, signature };
        self.aggregator.process_response(&response)?;
        Ok(response)
    }

    /// Record another verifier's response.
    pub fn process_response(&mut self, response: &Response) -> DagaResult<()> {
        self.aggregator.process_response(response)
    }

    /// Settle a complaint, see `Aggregator::process_justification`.
    ///
    /// A valid justification of our own complaint hands us the deal.
    pub fn process_justification(&mut self, justification: &Justification) -> DagaResult<()> {
        self.aggregator.process_justification(justification)?;
        if justification.index == self.index {
            self.deal = Some(justification.deal.clone());
        }
        Ok(())
    }

    /// Treat verifiers that have not answered yet as complaining.
    pub fn set_timeout(&mut self) {
        self.aggregator.set_timeout();
    }

    /// At least `t` approvals.
    pub fn enough_approvals(&self) -> bool {
        self.aggregator.enough_approvals()
    }

    /// Whether the deal is certified, see `Aggregator::deal_certified`.
    pub fn deal_certified(&self) -> bool {
        self.aggregator.deal_certified()
    }

    /// Whether a justification proved the dealer faulty.
    pub fn is_bad_dealer(&self) -> bool {
        self.aggregator.is_bad_dealer()
    }

    /// Our deal, available only once the deal is certified.
    pub fn deal(&self) -> Option<&Deal> {
        if self.aggregator.deal_certified() {
            self.deal.as_ref()
        } else {
            None
        }
    }

    /// The underlying aggregator.
    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }
}
