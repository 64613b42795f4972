//! Dealer side of Pedersen VSS.

use alloc::vec::Vec;

use curve25519_dalek::ristretto::RistrettoPoint;
use curve25519_dalek::scalar::Scalar;
use rand_core::{CryptoRng, RngCore};
use zeroize::Zeroize;

use super::{
    dh_key_transcript, encrypt, encryption_key, justification_transcript, session_id, Aggregator, Deal,
    EncryptedDeal, Justification, Response, SessionId, Status, ENCRYPTION_NONCE_LENGTH,
};
use crate::errors::{DagaError, DagaResult};
use crate::group;
use crate::keys::{Keypair, PublicKey};
use crate::share::poly::PriPoly;

/// Shares one secret among a fixed list of verifiers.
pub struct Dealer {
    keypair: Keypair,
    secret: PriPoly,
    pub(crate) deals: Vec<Deal>,
    aggregator: Aggregator,
}

impl Dealer {
    /// Deal `secret` to `verifiers` so that any `threshold` of them recover it.
    pub fn new_rng<R>(
        keypair: Keypair,
        secret: Scalar,
        verifiers: Vec<PublicKey>,
        threshold: usize,
        mut rng: R,
    ) -> DagaResult<Dealer>
    where
        R: RngCore + CryptoRng,
    {
        let mut aggregator = Aggregator::new(keypair.public, verifiers, threshold)?;
        let secret = PriPoly::new_rng(threshold, Some(secret), &mut rng)?;
        let hiding = PriPoly::new_rng(threshold, None, &mut rng)?;

        let h = *aggregator.h();
        let commitments: Vec<RistrettoPoint> = secret
            .coefficients()
            .iter()
            .zip(hiding.coefficients())
            .map(|(f, g)| group::base() * f + h * g)
            .collect();
        let sid = session_id(&keypair.public, aggregator.verifiers(), &commitments, threshold);
        aggregator.bind(sid, commitments.clone())?;

        let deals = (0..aggregator.verifiers().len() as u32)
            .map(|i| Deal {
                session_id: sid,
                sec_share: secret.eval(i),
                rnd_share: hiding.eval(i),
                threshold: threshold as u32,
                commitments: commitments.clone(),
            })
            .collect();
        Ok(Dealer { keypair, secret, deals, aggregator })
    }

    /// Deal `secret` with the default randomness source.
    #[cfg(feature = "getrandom")]
    pub fn new(keypair: Keypair, secret: Scalar, verifiers: Vec<PublicKey>, threshold: usize) -> DagaResult<Dealer> {
        Self::new_rng(keypair, secret, verifiers, threshold, getrandom_or_panic::getrandom_or_panic())
    }

    /// Dealer's long term key.
    pub fn key(&self) -> &PublicKey {
        &self.keypair.public
    }

    /// Id binding this sharing session.
    pub fn session_id(&self) -> SessionId {
        // Bound in the constructor.
        self.deals[0].session_id
    }

    /// Commitments `C_k = F_k B + G_k H`.
    pub fn commitments(&self) -> &[RistrettoPoint] {
        self.aggregator.commitments()
    }

    /// Plaintext deal for verifier `index`.
    pub fn plaintext_deal(&self, index: u32) -> DagaResult<&Deal> {
        self.deals.get(index as usize).ok_or(DagaError::InvalidInput("verifier index out of range"))
    }

    /// Deal for verifier `index`, encrypted under an ephemeral Diffie-Hellman key.
    pub fn encrypted_deal_rng<R>(&self, index: u32, mut rng: R) -> DagaResult<EncryptedDeal>
    where
        R: RngCore + CryptoRng,
    {
        let deal = self.plaintext_deal(index)?;
        let verifier = &self.aggregator.verifiers()[index as usize];

        let ephemeral = Keypair::generate_with(&mut rng);
        let shared = verifier.as_point() * ephemeral.secret.scalar();
        let mut key = encryption_key(&self.keypair.public, verifier, &ephemeral.public, &shared);

        let mut nonce = [0u8; ENCRYPTION_NONCE_LENGTH];
        rng.fill_bytes(&mut nonce);

        let mut plaintext = deal.to_bytes();
        let cipher = encrypt(&key, &nonce, &plaintext);
        plaintext.zeroize();
        key.zeroize();
        let cipher = cipher?;

        let signature = self.keypair.sign(dh_key_transcript(&ephemeral.public, &nonce));
        Ok(EncryptedDeal { dh_key: ephemeral.public, signature, nonce, cipher })
    }

    /// Encrypted deal for verifier `index` with the default randomness source.
    #[cfg(feature = "getrandom")]
    pub fn encrypted_deal(&self, index: u32) -> DagaResult<EncryptedDeal> {
        self.encrypted_deal_rng(index, getrandom_or_panic::getrandom_or_panic())
    }

    /// Encrypted deals for every verifier, in index order.
    pub fn encrypted_deals_rng<R>(&self, mut rng: R) -> DagaResult<Vec<EncryptedDeal>>
    where
        R: RngCore + CryptoRng,
    {
        (0..self.deals.len() as u32).map(|i| self.encrypted_deal_rng(i, &mut rng)).collect()
    }

    /// Encrypted deals for every verifier with the default randomness source.
    #[cfg(feature = "getrandom")]
    pub fn encrypted_deals(&self) -> DagaResult<Vec<EncryptedDeal>> {
        self.encrypted_deals_rng(getrandom_or_panic::getrandom_or_panic())
    }

    /// Record a verifier's response, answering a complaint with a `Justification`.
    pub fn process_response(&mut self, response: &Response) -> DagaResult<Option<Justification>> {
        self.aggregator.process_response(response)?;
        if response.status == Status::Approval {
            return Ok(None);
        }
        let deal = self.plaintext_deal(response.index)?.clone();
        let session_id = self.session_id();
        let signature = self.keypair.sign(justification_transcript(&session_id, response.index, &deal));
        Ok(Some(Justification { session_id, index: response.index, deal, signature }))
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

    /// `s B` for the shared secret `s`, released only once certified.
    pub fn secret_commit(&self) -> Option<RistrettoPoint> {
        if self.deal_certified() {
            Some(group::base() * self.secret.secret())
        } else {
            None
        }
    }
}
