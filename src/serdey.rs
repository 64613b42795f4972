// -*- mode: rust; -*-
//
// This file is part of daga.
// Copyright (c) 2019 Web 3 Foundation
// See LICENSE for licensing information.
//
// Authors:
// - Jeff Burdges <jeff@web3.foundation>

//! ### Various and tooling for serde serialization of fixed length types.

#[cfg(feature = "serde")]
macro_rules! serde_boilerplate { ($t:ty) => {
impl serde_crate::Serialize for $t {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error> where S: serde_crate::Serializer {
        let bytes = &self.to_bytes()[..];
        serde_crate::Serialize::serialize(serde_bytes::Bytes::new(bytes), serializer)
    }
}

impl<'d> serde_crate::Deserialize<'d> for $t {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error> where D: serde_crate::Deserializer<'d> {
        cfg_if::cfg_if!{
            if #[cfg(feature = "std")] {
                let bytes = <serde_bytes::ByteBuf as serde_crate::Deserialize>::deserialize(deserializer)?;
            } else {
                let bytes = <&serde_bytes::Bytes as serde_crate::Deserialize>::deserialize(deserializer)?;
            }
        }

        Self::from_bytes(bytes.as_ref())
        .map_err(crate::errors::serde_error_from_daga_error)
    }
}
} } // macro_rules! serde_boilerplate

#[cfg(not(feature = "serde"))]
macro_rules! serde_boilerplate { ($t:ty) => { } }

#[cfg(all(test, feature = "serde"))]
mod test {
    use alloc::vec::Vec;

    use curve25519_dalek::scalar::Scalar;

    use crate::daga::{ServerSignature, ServerTagProof};
    use crate::*;

    #[test]
    fn serialize_deserialize_signature() {
        let keypair = Keypair::generate_with(rand_core::OsRng);
        let signature = keypair.sign_simple(b"serde", b"round trip");
        let encoded: Vec<u8> = bincode::serialize(&signature).unwrap();
        let decoded: Signature = bincode::deserialize(&encoded).unwrap();
        assert_eq!(signature, decoded);
        keypair.public.verify_simple(b"serde", b"round trip", &decoded).unwrap();
    }

    #[test]
    fn serialize_deserialize_protocol_messages() {
        let keypair = Keypair::generate_with(rand_core::OsRng);
        let sig = ServerSignature { index: 3, signature: keypair.sign_simple(b"serde", b"hop") };
        let json = serde_json::to_string(&sig).unwrap();
        assert_eq!(serde_json::from_str::<ServerSignature>(&json).unwrap(), sig);

        let b = group::base();
        let proof = ServerTagProof::Misbehavior { t1: b, t2: b + b, t3: b, c: Scalar::ONE, r1: Scalar::ZERO };
        let encoded: Vec<u8> = bincode::serialize(&proof).unwrap();
        assert_eq!(bincode::deserialize::<ServerTagProof>(&encoded).unwrap(), proof);
    }
}
