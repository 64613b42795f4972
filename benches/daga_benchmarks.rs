// -*- mode: rust; -*-
//
// This file is part of daga.
// Copyright (c) 2019 Web 3 Foundation
// See LICENSE for licensing information.
//
// Authors:
// - Jeff Burdges <jeff@web3.foundation>

#[macro_use]
extern crate criterion;

use criterion::{BenchmarkId, Criterion};

mod schnorr_benches {
    use super::*;
    use daga::{signing_context, verify_batch, Keypair, PublicKey, Signature};

    fn sign(c: &mut Criterion) {
        let keypair: Keypair = Keypair::generate();
        let msg: &[u8] = b"";
        let ctx = signing_context(b"this signature does this thing");
        c.bench_function("Schnorr signing", move |b| b.iter(|| keypair.sign(ctx.bytes(msg))));
    }

    fn verify_batch_signatures(c: &mut Criterion) {
        static BATCH_SIZES: [usize; 4] = [4, 16, 64, 256];

        let mut group = c.benchmark_group("Schnorr batch signature verification");
        for size in BATCH_SIZES.iter() {
            let keypairs: Vec<Keypair> = (0..*size).map(|_| Keypair::generate()).collect();
            let msg: &[u8] = b"aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
            let ctx = signing_context(b"this signature does this thing");
            let signatures: Vec<Signature> = keypairs.iter().map(|key| key.sign(ctx.bytes(msg))).collect();
            let public_keys: Vec<PublicKey> = keypairs.iter().map(|key| key.public).collect();

            group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
                b.iter(|| {
                    let transcripts = ::std::iter::once(ctx.bytes(msg)).cycle().take(size);
                    verify_batch(transcripts, &signatures[..], &public_keys[..])
                });
            });
        }
        group.finish();
    }

    criterion_group! {
        name = schnorr_benches;
        config = Criterion::default();
        targets = sign, verify_batch_signatures,
    }
}

mod pvss_benches {
    use super::*;
    use curve25519_dalek::scalar::Scalar;
    use daga::group;
    use daga::share::pvss;
    use daga::{Keypair, PublicKey};

    fn share_and_recover(c: &mut Criterion) {
        static SIZES: [usize; 3] = [4, 10, 32];

        let mut group = c.benchmark_group("PVSS share, decrypt, and recover");
        for n in SIZES.iter() {
            let keypairs: Vec<Keypair> = (0..*n).map(|_| Keypair::generate()).collect();
            let keys: Vec<PublicKey> = keypairs.iter().map(|k| k.public).collect();
            let h = group::hash_to_point(b"pvss-bench", &[&b"H"[..]]);
            let secret = Scalar::from(42u64);
            let t = n / 2 + 1;

            group.bench_with_input(BenchmarkId::from_parameter(n), n, |b, _| {
                b.iter(|| {
                    let (enc, pub_poly) = pvss::enc_shares(&h, &keys, &secret, t).unwrap();
                    let dec: Vec<_> = keypairs
                        .iter()
                        .zip(enc.iter())
                        .map(|(kp, e)| pvss::dec_share(&h, &keys, &pub_poly, kp, e).unwrap())
                        .collect();
                    pvss::recover_secret(&h, &keys, &pub_poly, &enc, &dec, t).unwrap()
                });
            });
        }
        group.finish();
    }

    criterion_group! {
        name = pvss_benches;
        config = Criterion::default().sample_size(10);
        targets = share_and_recover,
    }
}

mod daga_benches {
    use super::*;
    use daga::daga::{generate_context, LocalQuorum};

    fn authenticate(c: &mut Criterion) {
        static SIZES: [(usize, usize); 3] = [(4, 2), (16, 3), (64, 5)];

        let mut group = c.benchmark_group("DAGA authentication");
        for (n, m) in SIZES.iter() {
            let (clients, servers, context) = generate_context(*n, *m, rand_core::OsRng).unwrap();
            group.bench_with_input(BenchmarkId::new("clients/servers", format!("{}/{}", n, m)), n, |b, _| {
                let mut quorum = LocalQuorum::new(&servers);
                b.iter(|| clients[0].authenticate(&context, &mut quorum).unwrap());
            });
        }
        group.finish();
    }

    criterion_group! {
        name = daga_benches;
        config = Criterion::default().sample_size(10);
        targets = authenticate,
    }
}

criterion_main!(
    schnorr_benches::schnorr_benches,
    pvss_benches::pvss_benches,
    daga_benches::daga_benches,
);
