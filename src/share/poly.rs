//! Shamir secret sharing over the Ristretto scalar field.
//!
//! Share `i` of a polynomial `p` is `p(i+1)`, so indices stay zero-based
//! while `x = 0` remains reserved for the secret.

use alloc::collections::BTreeSet;
use alloc::vec::Vec;

use curve25519_dalek::ristretto::RistrettoPoint;
use curve25519_dalek::scalar::Scalar;
use curve25519_dalek::traits::VartimeMultiscalarMul;
use rand_core::{CryptoRng, RngCore};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::errors::{DagaError, DagaResult};
use crate::group;

/// x-coordinate of share `index`.
#[inline]
pub fn x_of(index: u32) -> Scalar {
    Scalar::from(index as u64 + 1)
}

/// Secret share `(i, p(i+1))`.
#[derive(Debug, Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct PriShare {
    /// Zero-based share index
    pub index: u32,
    /// Evaluation of the secret polynomial
    pub value: Scalar,
}

/// Public share `(i, p(i+1) base)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PubShare {
    /// Zero-based share index
    pub index: u32,
    /// Evaluation of the public polynomial
    pub value: RistrettoPoint,
}

/// Secret polynomial with `threshold` coefficients, the constant one being the secret.
#[derive(Debug, Clone, Zeroize, ZeroizeOnDrop)]
pub struct PriPoly {
    coefficients: Vec<Scalar>,
}

impl PriPoly {
    /// Random polynomial of `threshold` coefficients, with `secret` as
    /// constant term when given.
    pub fn new_rng<R>(threshold: usize, secret: Option<Scalar>, mut rng: R) -> DagaResult<PriPoly>
    where
        R: RngCore + CryptoRng,
    {
        if threshold == 0 {
            return Err(DagaError::InvalidInput("threshold must be positive"));
        }
        let mut coefficients: Vec<Scalar> = (0..threshold).map(|_| group::random_scalar(&mut rng)).collect();
        if let Some(s) = secret {
            coefficients[0] = s;
        }
        Ok(PriPoly { coefficients })
    }

    /// Random polynomial with the default randomness source.
    #[cfg(feature = "getrandom")]
    pub fn new(threshold: usize, secret: Option<Scalar>) -> DagaResult<PriPoly> {
        Self::new_rng(threshold, secret, getrandom_or_panic::getrandom_or_panic())
    }

    /// Polynomial from explicit coefficients, constant term first.
    pub fn from_coefficients(coefficients: Vec<Scalar>) -> DagaResult<PriPoly> {
        if coefficients.is_empty() {
            return Err(DagaError::InvalidInput("threshold must be positive"));
        }
        Ok(PriPoly { coefficients })
    }

    /// Number of shares needed to recover the secret.
    pub fn threshold(&self) -> usize {
        self.coefficients.len()
    }

    /// The shared secret `p(0)`.
    pub fn secret(&self) -> Scalar {
        self.coefficients[0]
    }

    pub(crate) fn coefficients(&self) -> &[Scalar] {
        &self.coefficients
    }

    /// Share `index`, i.e. `p(index + 1)` by Horner's rule.
    pub fn eval(&self, index: u32) -> PriShare {
        let x = x_of(index);
        let mut value = Scalar::ZERO;
        for coeff in self.coefficients.iter().rev() {
            value = value * x + coeff;
        }
        PriShare { index, value }
    }

    /// The first `n` shares.
    pub fn shares(&self, n: usize) -> Vec<PriShare> {
        (0..n as u32).map(|i| self.eval(i)).collect()
    }

    /// Coefficient-wise sum, sharing the sum of both secrets.
    pub fn add(&self, other: &PriPoly) -> DagaResult<PriPoly> {
        if self.threshold() != other.threshold() {
            return Err(DagaError::MismatchedThreshold);
        }
        let coefficients = self.coefficients.iter().zip(other.coefficients.iter()).map(|(a, b)| a + b).collect();
        Ok(PriPoly { coefficients })
    }

    /// Commit to every coefficient under `base`.
    pub fn commit(&self, base: &RistrettoPoint) -> PubPoly {
        PubPoly::commit_of(self, base)
    }
}

/// Public commitment `a_k base` to every coefficient of a `PriPoly`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PubPoly {
    base: RistrettoPoint,
    commits: Vec<RistrettoPoint>,
}

impl PubPoly {
    /// Commitment from its parts.
    pub fn new(base: RistrettoPoint, commits: Vec<RistrettoPoint>) -> DagaResult<PubPoly> {
        if commits.is_empty() {
            return Err(DagaError::InvalidInput("threshold must be positive"));
        }
        Ok(PubPoly { base, commits })
    }

    /// Map each coefficient `a_k` of `poly` to `a_k base`.
    pub fn commit_of(poly: &PriPoly, base: &RistrettoPoint) -> PubPoly {
        let commits = poly.coefficients.iter().map(|a| base * a).collect();
        PubPoly { base: *base, commits }
    }

    /// Base of the commitments.
    pub fn base(&self) -> &RistrettoPoint {
        &self.base
    }

    /// Coefficient commitments, constant term first.
    pub fn commits(&self) -> &[RistrettoPoint] {
        &self.commits
    }

    /// Number of shares needed to recover the committed secret.
    pub fn threshold(&self) -> usize {
        self.commits.len()
    }

    /// Commitment to the secret, `p(0) base`.
    pub fn commit(&self) -> RistrettoPoint {
        self.commits[0]
    }

    /// Public share `index`, i.e. `Σ_k (index+1)^k C_k`.
    pub fn eval(&self, index: u32) -> PubShare {
        let x = x_of(index);
        let mut powers = Vec::with_capacity(self.commits.len());
        let mut xk = Scalar::ONE;
        for _ in 0..self.commits.len() {
            powers.push(xk);
            xk *= x;
        }
        let value = RistrettoPoint::vartime_multiscalar_mul(powers.iter(), self.commits.iter());
        PubShare { index, value }
    }

    /// The first `n` public shares.
    pub fn shares(&self, n: usize) -> Vec<PubShare> {
        (0..n as u32).map(|i| self.eval(i)).collect()
    }

    /// Commitment to the sum of both committed polynomials.
    ///
    /// Both sides must agree on threshold and base.
    pub fn add(&self, other: &PubPoly) -> DagaResult<PubPoly> {
        if self.threshold() != other.threshold() || self.base != other.base {
            return Err(DagaError::MismatchedThreshold);
        }
        let commits = self.commits.iter().zip(other.commits.iter()).map(|(a, b)| a + b).collect();
        Ok(PubPoly { base: self.base, commits })
    }

    /// Whether `share` is the evaluation of the committed polynomial.
    pub fn check(&self, share: &PriShare) -> bool {
        self.base * share.value == self.eval(share.index).value
    }

    /// Fixed-length concatenation of the commitments, base excluded.
    pub fn to_bytes(&self) -> Vec<u8> {
        group::encode_points(&self.commits)
    }
}

/// Lagrange basis polynomial for `xs[i]`, evaluated at zero.
fn lagrange_at_zero(xs: &[Scalar], i: usize) -> Scalar {
    let mut num = Scalar::ONE;
    let mut den = Scalar::ONE;
    for (j, xj) in xs.iter().enumerate() {
        if j == i {
            continue;
        }
        num *= xj;
        den *= xj - xs[i];
    }
    num * den.invert()
}

/// First `t` present shares with distinct indices.
fn select<'a, S, F>(shares: &'a [Option<S>], t: usize, index: F) -> DagaResult<Vec<&'a S>>
where
    F: Fn(&S) -> u32,
{
    if t == 0 {
        return Err(DagaError::InvalidInput("threshold must be positive"));
    }
    let mut seen = BTreeSet::new();
    let mut chosen = Vec::with_capacity(t);
    for share in shares.iter().flatten() {
        if seen.insert(index(share)) {
            chosen.push(share);
            if chosen.len() == t {
                return Ok(chosen);
            }
        }
    }
    Err(DagaError::InsufficientShares { needed: t, got: chosen.len() })
}

/// Recover `p(0)` from any `t` shares by Lagrange interpolation.
///
/// Missing shares are `None`.  Fails with `InsufficientShares` when
/// fewer than `t` distinct shares are present.
pub fn recover_secret(shares: &[Option<PriShare>], t: usize) -> DagaResult<Scalar> {
    let chosen = select(shares, t, |s| s.index)?;
    let xs: Vec<Scalar> = chosen.iter().map(|s| x_of(s.index)).collect();
    Ok(chosen.iter().enumerate().map(|(i, s)| s.value * lagrange_at_zero(&xs, i)).sum())
}

/// Recover `p(0) base` from any `t` public shares by Lagrange interpolation in the exponent.
pub fn recover_commit(shares: &[Option<PubShare>], t: usize) -> DagaResult<RistrettoPoint> {
    let chosen = select(shares, t, |s| s.index)?;
    let xs: Vec<Scalar> = chosen.iter().map(|s| x_of(s.index)).collect();
    let coefficients: Vec<Scalar> = (0..chosen.len()).map(|i| lagrange_at_zero(&xs, i)).collect();
    Ok(RistrettoPoint::vartime_multiscalar_mul(coefficients.iter(), chosen.iter().map(|s| s.value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_chacha::ChaCha20Rng;
    use rand_core::{OsRng, SeedableRng};

    #[test]
    fn eval_uses_shifted_x() {
        // 3 + 2x + x^2 at x = 5, i.e. share index 4
        let poly = PriPoly::from_coefficients(alloc::vec![
            Scalar::from(3u64),
            Scalar::from(2u64),
            Scalar::from(1u64),
        ])
        .unwrap();
        let share = poly.eval(4);
        assert_eq!(share.index, 4);
        assert_eq!(share.value, Scalar::from(38u64));
        assert_eq!(poly.secret(), Scalar::from(3u64));
    }

    #[test]
    fn recover_from_any_threshold_subset() {
        let mut rng = ChaCha20Rng::from_seed([1u8; 32]);
        let secret = group::random_scalar(&mut rng);
        let (n, t) = (9usize, 5usize);
        let poly = PriPoly::new_rng(t, Some(secret), &mut rng).unwrap();
        let shares: Vec<Option<PriShare>> = poly.shares(n).into_iter().map(Some).collect();

        assert_eq!(recover_secret(&shares, t).unwrap(), secret);

        // Keep a sliding window of exactly t shares.
        for start in 0..=(n - t) {
            let window: Vec<Option<PriShare>> = shares
                .iter()
                .enumerate()
                .map(|(i, s)| if i >= start && i < start + t { s.clone() } else { None })
                .collect();
            assert_eq!(recover_secret(&window, t).unwrap(), secret);
        }

        let few: Vec<Option<PriShare>> = shares.iter().take(t - 1).cloned().collect();
        assert_eq!(
            recover_secret(&few, t),
            Err(DagaError::InsufficientShares { needed: t, got: t - 1 }),
        );
    }

    #[test]
    fn recover_after_deleting_ten_of_twenty() {
        let secret = group::random_scalar(&mut OsRng);
        let (n, t) = (20usize, 10usize);
        let poly = PriPoly::new_rng(t, Some(secret), OsRng).unwrap();
        let mut shares: Vec<Option<PriShare>> = poly.shares(n).into_iter().map(Some).collect();

        for i in [1usize, 2, 5, 7, 8, 10, 15, 16, 17, 19] {
            shares[i] = None;
        }
        assert_eq!(recover_secret(&shares, t).unwrap(), secret);

        shares[0] = None;
        assert_eq!(
            recover_secret(&shares, t),
            Err(DagaError::InsufficientShares { needed: t, got: t - 1 }),
        );
    }

    #[test]
    fn duplicate_shares_count_once() {
        let poly = PriPoly::new_rng(3, None, OsRng).unwrap();
        let s0 = poly.eval(0);
        let s1 = poly.eval(1);
        let shares = alloc::vec![Some(s0.clone()), Some(s0), Some(s1.clone()), Some(s1)];
        assert_eq!(recover_secret(&shares, 3), Err(DagaError::InsufficientShares { needed: 3, got: 2 }));
    }

    #[test]
    fn public_polynomial_checks_private_shares() {
        let base = group::base();
        let poly = PriPoly::new_rng(4, None, OsRng).unwrap();
        let other = PriPoly::new_rng(4, None, OsRng).unwrap();
        let commitment = PubPoly::commit_of(&poly, &base);

        for share in poly.shares(7) {
            assert!(commitment.check(&share));
        }
        assert!(!commitment.check(&other.eval(2)));

        // Commitments under one base do not vouch for shares under another.
        let doubled = base * Scalar::from(2u64);
        assert!(poly.commit(&doubled).check(&poly.eval(2)));
        let mismatched = PubPoly::new(doubled, commitment.commits().to_vec()).unwrap();
        assert!(!mismatched.check(&poly.eval(2)));

        let pub_shares: Vec<Option<PubShare>> = commitment.shares(7).into_iter().map(Some).collect();
        assert_eq!(recover_commit(&pub_shares, 4).unwrap(), base * poly.secret());
        assert_eq!(commitment.commit(), base * poly.secret());
    }

    #[test]
    fn sums_of_polynomials() {
        let base = group::base();
        let a = PriPoly::new_rng(3, None, OsRng).unwrap();
        let b = PriPoly::new_rng(3, None, OsRng).unwrap();
        let sum = a.add(&b).unwrap();
        assert_eq!(sum.secret(), a.secret() + b.secret());

        let pub_sum = a.commit(&base).add(&b.commit(&base)).unwrap();
        assert_eq!(pub_sum, sum.commit(&base));
        assert!(pub_sum.check(&sum.eval(5)));

        let c = PriPoly::new_rng(4, None, OsRng).unwrap();
        assert_eq!(a.add(&c).unwrap_err(), DagaError::MismatchedThreshold);
        assert_eq!(a.commit(&base).add(&c.commit(&base)).unwrap_err(), DagaError::MismatchedThreshold);
        let h = base * Scalar::from(3u64);
        assert_eq!(a.commit(&base).add(&b.commit(&h)).unwrap_err(), DagaError::MismatchedThreshold);

        assert!(PriPoly::new_rng(0, None, OsRng).is_err());
    }
}
