//! Predicates over discrete logarithm representations.

use alloc::vec::Vec;

use curve25519_dalek::ristretto::RistrettoPoint;
use curve25519_dalek::scalar::Scalar;
use curve25519_dalek::traits::VartimeMultiscalarMul;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::errors::{DagaError, DagaResult};
use crate::transcript::SigningTranscript;

/// Handle to a secret scalar allocated in a `Statement`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScalarVar(pub(crate) usize);

/// Handle to a public point allocated in a `Statement`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PointVar(pub(crate) usize);

/// Public side of a proof: named secret variables and named public points.
#[derive(Debug, Clone, Default)]
pub struct Statement {
    scalars: Vec<&'static str>,
    points: Vec<(&'static str, RistrettoPoint)>,
}

impl Statement {
    /// Empty statement.
    pub fn new() -> Statement {
        Statement::default()
    }

    /// Allocate a secret variable.
    pub fn allocate_scalar(&mut self, name: &'static str) -> ScalarVar {
        self.scalars.push(name);
        ScalarVar(self.scalars.len() - 1)
    }

    /// Allocate a public point with its value.
    pub fn allocate_point(&mut self, name: &'static str, value: RistrettoPoint) -> PointVar {
        self.points.push((name, value));
        PointVar(self.points.len() - 1)
    }

    /// Value of a public point.
    pub fn point(&self, var: PointVar) -> &RistrettoPoint {
        &self.points[var.0].1
    }

    /// Number of secret variables.
    pub fn scalar_count(&self) -> usize {
        self.scalars.len()
    }

    /// Bind every public point to a Fiat-Shamir transcript.
    pub fn commit<T: SigningTranscript>(&self, t: &mut T) {
        t.commit_index(b"sigma:scalars", self.scalars.len() as u32);
        t.commit_index(b"sigma:points", self.points.len() as u32);
        for (name, point) in self.points.iter() {
            t.commit_bytes(b"sigma:point-name", name.as_bytes());
            t.commit_point(b"sigma:point", &point.compress());
        }
    }
}

/// Secret side of a proof: values for some of the statement's variables.
///
/// Provers for an OR only know the witnesses of their true branch,
/// so unknown variables simply stay `None`.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Witness {
    values: Vec<Option<Scalar>>,
}

impl Witness {
    /// Witness with every variable of `statement` unknown.
    pub fn new(statement: &Statement) -> Witness {
        Witness { values: alloc::vec![None; statement.scalar_count()] }
    }

    /// Assign a variable.
    pub fn set(&mut self, var: ScalarVar, value: Scalar) {
        self.values[var.0] = Some(value);
    }

    pub(crate) fn get(&self, var: ScalarVar) -> Option<&Scalar> {
        self.values.get(var.0).and_then(|v| v.as_ref())
    }
}

/// Tagged tree of representation claims.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// `out = Σ secret_k · base_k`
    Rep {
        /// Public point being represented
        out: PointVar,
        /// `(secret, base)` terms of the representation
        terms: Vec<(ScalarVar, PointVar)>,
    },
    /// All sub-predicates hold.
    And(Vec<Predicate>),
    /// At least one sub-predicate holds.
    Or(Vec<Predicate>),
}

impl Predicate {
    /// `out = secret · base`
    pub fn rep(out: PointVar, secret: ScalarVar, base: PointVar) -> Predicate {
        Predicate::Rep { out, terms: alloc::vec![(secret, base)] }
    }

    /// Conjunction
    pub fn and(ps: Vec<Predicate>) -> Predicate {
        Predicate::And(ps)
    }

    /// Disjunction
    pub fn or(ps: Vec<Predicate>) -> Predicate {
        Predicate::Or(ps)
    }

    /// Message sizes of any proof of this predicate.
    pub fn shape(&self) -> DagaResult<Shape> {
        Ok(Layout::new(self)?.shape())
    }
}

/// Number of commitments, sub-challenges, and responses in a proof.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shape {
    /// One per `Rep`
    pub commitments: usize,
    /// One per child of every `Or`
    pub sub_challenges: usize,
    /// One per distinct secret in every scope
    pub responses: usize,
}

pub(crate) struct RepSlot<'a> {
    pub(crate) scope: usize,
    pub(crate) out: PointVar,
    pub(crate) terms: &'a [(ScalarVar, PointVar)],
}

/// Challenge scope: the root, or one child of an `Or`.
#[derive(Default)]
pub(crate) struct ScopeSlot {
    pub(crate) vars: Vec<ScalarVar>,
    pub(crate) offset: usize,
}

impl ScopeSlot {
    pub(crate) fn response_index(&self, var: ScalarVar) -> usize {
        // Every var of a Rep was registered in its scope during layout.
        self.offset + self.vars.iter().position(|v| *v == var).unwrap_or(0)
    }
}

pub(crate) struct OrSlot {
    /// Enclosing scope
    pub(crate) scope: usize,
    pub(crate) first_scope: usize,
    pub(crate) first_sub: usize,
    pub(crate) len: usize,
}

/// Flattened walk of a predicate.
///
/// Scopes, sub-challenges, and commitments get allocated in the same
/// depth first order on every pass, so provers and verifiers agree on
/// every index.  `Or` children are allocated contiguously on entry.
pub(crate) struct Layout<'a> {
    pub(crate) reps: Vec<RepSlot<'a>>,
    pub(crate) scopes: Vec<ScopeSlot>,
    pub(crate) ors: Vec<OrSlot>,
    pub(crate) subs: usize,
    pub(crate) responses: usize,
}

impl<'a> Layout<'a> {
    pub(crate) fn new(predicate: &'a Predicate) -> DagaResult<Layout<'a>> {
        let mut layout = Layout {
            reps: Vec::new(),
            scopes: alloc::vec![ScopeSlot::default()],
            ors: Vec::new(),
            subs: 0,
            responses: 0,
        };
        layout.build(predicate, 0)?;
        let mut offset = 0;
        for scope in layout.scopes.iter_mut() {
            scope.offset = offset;
            offset += scope.vars.len();
        }
        layout.responses = offset;
        Ok(layout)
    }

    fn build(&mut self, p: &'a Predicate, scope: usize) -> DagaResult<()> {
        match p {
            Predicate::Rep { out, terms } => {
                if terms.is_empty() {
                    return Err(DagaError::InvalidInput("representation without terms"));
                }
                for (s, _) in terms.iter() {
                    if !self.scopes[scope].vars.contains(s) {
                        self.scopes[scope].vars.push(*s);
                    }
                }
                self.reps.push(RepSlot { scope, out: *out, terms });
            },
            Predicate::And(ps) => {
                for q in ps.iter() {
                    self.build(q, scope)?;
                }
            },
            Predicate::Or(ps) => {
                if ps.is_empty() {
                    return Err(DagaError::InvalidInput("disjunction without branches"));
                }
                let first_scope = self.scopes.len();
                let first_sub = self.subs;
                self.subs += ps.len();
                self.scopes.extend(ps.iter().map(|_| ScopeSlot::default()));
                self.ors.push(OrSlot { scope, first_scope, first_sub, len: ps.len() });
                for (k, q) in ps.iter().enumerate() {
                    self.build(q, first_scope + k)?;
                }
            },
        }
        Ok(())
    }

    pub(crate) fn shape(&self) -> Shape {
        Shape { commitments: self.reps.len(), sub_challenges: self.subs, responses: self.responses }
    }

    /// Check every handle refers into `statement`.
    pub(crate) fn validate(&self, statement: &Statement) -> DagaResult<()> {
        let points = statement.points.len();
        let scalars = statement.scalars.len();
        for rep in self.reps.iter() {
            if rep.out.0 >= points {
                return Err(DagaError::InvalidInput("unknown public point"));
            }
            for (s, b) in rep.terms.iter() {
                if s.0 >= scalars || b.0 >= points {
                    return Err(DagaError::InvalidInput("unknown variable"));
                }
            }
        }
        Ok(())
    }

    /// Challenge of every scope, checking each `Or` splits its scope's challenge.
    pub(crate) fn scope_challenges(&self, challenge: &Scalar, subs: &[Scalar]) -> DagaResult<Vec<Scalar>> {
        let mut cs = alloc::vec![Scalar::ZERO; self.scopes.len()];
        cs[0] = *challenge;
        for or in self.ors.iter() {
            let split = &subs[or.first_sub..or.first_sub + or.len];
            let sum: Scalar = split.iter().sum();
            if sum != cs[or.scope] {
                return Err(DagaError::BadProof);
            }
            cs[or.first_scope..or.first_scope + or.len].copy_from_slice(split);
        }
        Ok(cs)
    }

    /// `Σ r·base + c·out` for one representation.
    pub(crate) fn recompute(
        &self,
        rep: &RepSlot<'a>,
        statement: &Statement,
        c: &Scalar,
        responses: &[Scalar],
    ) -> RistrettoPoint {
        let scope = &self.scopes[rep.scope];
        let scalars = rep
            .terms
            .iter()
            .map(|(s, _)| responses[scope.response_index(*s)])
            .chain(core::iter::once(*c));
        let points = rep
            .terms
            .iter()
            .map(|(_, b)| *statement.point(*b))
            .chain(core::iter::once(*statement.point(rep.out)));
        RistrettoPoint::vartime_multiscalar_mul(scalars, points)
    }

    /// Verify a complete transcript.
    pub(crate) fn check(
        &self,
        statement: &Statement,
        challenge: &Scalar,
        commitments: &[RistrettoPoint],
        subs: &[Scalar],
        responses: &[Scalar],
    ) -> DagaResult<()> {
        let shape = self.shape();
        if commitments.len() != shape.commitments
            || subs.len() != shape.sub_challenges
            || responses.len() != shape.responses
        {
            return Err(DagaError::InvalidInput("proof shape does not match predicate"));
        }
        self.validate(statement)?;
        let cs = self.scope_challenges(challenge, subs)?;
        for (rep, t) in self.reps.iter().zip(commitments) {
            if self.recompute(rep, statement, &cs[rep.scope], responses) != *t {
                return Err(DagaError::BadProof);
            }
        }
        Ok(())
    }
}
