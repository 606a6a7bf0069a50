//! ECDSA over secp256k1
//!
//! Signing uses RFC 6979 deterministic nonces by default and always emits
//! low-s signatures. Verification accepts either s form.

use std::fmt;

use rand::{CryptoRng, RngCore};
use thiserror::Error;

use super::curve::GENERATOR;
use super::field::Scalar;
use super::hash::hmac_sha256;
use super::keys::{generate_secret_key, PublicKey, SecretKey};
use super::uint::U256;

/// Signature errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignatureError {
    #[error("Signature component r or s is zero")]
    ZeroComponent,
    #[error("Invalid DER signature encoding")]
    InvalidDer,
}

/// An ECDSA signature `(r, s)` with both components in `[1, n)`
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    r: Scalar,
    s: Scalar,
}

impl Signature {
    pub fn new(r: Scalar, s: Scalar) -> Result<Self, SignatureError> {
        if r.is_zero() || s.is_zero() {
            return Err(SignatureError::ZeroComponent);
        }
        Ok(Signature { r, s })
    }

    pub fn r(&self) -> &Scalar {
        &self.r
    }

    pub fn s(&self) -> &Scalar {
        &self.s
    }

    pub fn is_low_s(&self) -> bool {
        !self.s.is_high()
    }

    /// Replace s with n - s when s > n/2
    pub fn normalize_s(&self) -> Self {
        if self.s.is_high() {
            Signature {
                r: self.r,
                s: -self.s,
            }
        } else {
            *self
        }
    }

    /// 64-byte `r || s` big-endian encoding
    pub fn to_compact(&self) -> [u8; 64] {
        let mut out = [0u8; 64];
        out[..32].copy_from_slice(&self.r.to_be_bytes());
        out[32..].copy_from_slice(&self.s.to_be_bytes());
        out
    }

    /// Strict DER: `30 len 02 len r 02 len s`
    pub fn to_der(&self) -> Vec<u8> {
        let mut body = Vec::with_capacity(70);
        encode_der_integer(&self.r.value(), &mut body);
        encode_der_integer(&self.s.value(), &mut body);

        let mut out = Vec::with_capacity(body.len() + 2);
        out.push(0x30);
        out.push(body.len() as u8);
        out.extend_from_slice(&body);
        out
    }

    pub fn from_der(bytes: &[u8]) -> Result<Self, SignatureError> {
        if bytes.len() < 8 || bytes[0] != 0x30 || bytes[1] as usize != bytes.len() - 2 {
            return Err(SignatureError::InvalidDer);
        }
        let (r, rest) = parse_der_integer(&bytes[2..])?;
        let (s, rest) = parse_der_integer(rest)?;
        if !rest.is_empty() {
            return Err(SignatureError::InvalidDer);
        }
        Signature::new(r, s).map_err(|_| SignatureError::InvalidDer)
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signature")
            .field("r", &self.r.value().to_hex())
            .field("s", &self.s.value().to_hex())
            .finish()
    }
}

fn encode_der_integer(value: &U256, out: &mut Vec<u8>) {
    let bytes = value.to_be_bytes();
    let start = bytes.iter().position(|&b| b != 0).unwrap_or(31);
    let digits = &bytes[start..];
    // A set high bit would read as negative
    let pad = digits[0] & 0x80 != 0;

    out.push(0x02);
    out.push((digits.len() + pad as usize) as u8);
    if pad {
        out.push(0x00);
    }
    out.extend_from_slice(digits);
}

fn parse_der_integer(input: &[u8]) -> Result<(Scalar, &[u8]), SignatureError> {
    if input.len() < 2 || input[0] != 0x02 {
        return Err(SignatureError::InvalidDer);
    }
    let len = input[1] as usize;
    if len == 0 || len > 33 || input.len() < 2 + len {
        return Err(SignatureError::InvalidDer);
    }
    let digits = &input[2..2 + len];
    if digits[0] & 0x80 != 0 {
        return Err(SignatureError::InvalidDer);
    }
    if len > 1 && digits[0] == 0 && digits[1] & 0x80 == 0 {
        return Err(SignatureError::InvalidDer);
    }
    let value = U256::from_be_slice(digits).ok_or(SignatureError::InvalidDer)?;
    let scalar = Scalar::from_canonical(value).ok_or(SignatureError::InvalidDer)?;
    Ok((scalar, &input[2 + len..]))
}

/// RFC 6979 nonce (HMAC-SHA256, qlen = 256)
fn deterministic_nonce(secret_key: &SecretKey, digest: &[u8; 32]) -> Scalar {
    let x = secret_key.to_be_bytes();
    let h1 = Scalar::from_be_bytes(digest).to_be_bytes();

    let mut v = [0x01u8; 32];
    let mut k = [0x00u8; 32];
    k = hmac_sha256(&k, &[&v[..], &[0x00u8][..], &x[..], &h1[..]].concat());
    v = hmac_sha256(&k, &v);
    k = hmac_sha256(&k, &[&v[..], &[0x01u8][..], &x[..], &h1[..]].concat());
    v = hmac_sha256(&k, &v);

    loop {
        v = hmac_sha256(&k, &v);
        if let Some(candidate) = Scalar::from_canonical(U256::from_be_bytes(&v)) {
            if !candidate.is_zero() {
                return candidate;
            }
        }
        k = hmac_sha256(&k, &[&v[..], &[0x00u8][..]].concat());
        v = hmac_sha256(&k, &v);
    }
}

/// Sign a 32-byte digest with an RFC 6979 nonce
pub fn sign(digest: &[u8; 32], secret_key: &SecretKey) -> Result<Signature, SignatureError> {
    let nonce = deterministic_nonce(secret_key, digest);
    sign_with_nonce(digest, secret_key, &nonce)
}

/// Sign a 32-byte digest with a nonce drawn from `rng`
pub fn sign_with_rng<R: RngCore + CryptoRng>(
    digest: &[u8; 32],
    secret_key: &SecretKey,
    rng: &mut R,
) -> Result<Signature, SignatureError> {
    let nonce = generate_secret_key(rng);
    sign_with_nonce(digest, secret_key, nonce.scalar())
}

fn sign_with_nonce(
    digest: &[u8; 32],
    secret_key: &SecretKey,
    nonce: &Scalar,
) -> Result<Signature, SignatureError> {
    let z = Scalar::from_be_bytes(digest);
    let r = GENERATOR
        .mul_scalar(nonce)
        .x()
        .map(|x| Scalar::new(x.value()))
        .ok_or(SignatureError::ZeroComponent)?;
    let nonce_inv = nonce
        .inverse()
        .map_err(|_| SignatureError::ZeroComponent)?;
    let s = nonce_inv * (z + r * *secret_key.scalar());

    Ok(Signature::new(r, s)?.normalize_s())
}

/// Verify a signature over a 32-byte digest
pub fn verify(digest: &[u8; 32], signature: &Signature, public_key: &PublicKey) -> bool {
    let w = match signature.s.inverse() {
        Ok(w) => w,
        Err(_) => return false,
    };
    let z = Scalar::from_be_bytes(digest);
    let u1 = z * w;
    let u2 = signature.r * w;

    let point = GENERATOR.mul_scalar(&u1) + public_key.point().mul_scalar(&u2);
    match point.x() {
        Some(x) => Scalar::new(x.value()) == signature.r,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::{secret_key_from_entropy, KeyPair};
    use crate::crypto::sha256;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn key(entropy: &[u8]) -> SecretKey {
        secret_key_from_entropy(entropy).unwrap()
    }

    #[test]
    fn test_rfc6979_known_vector() {
        let secret = key(&[1]);
        let digest = sha256(b"Satoshi Nakamoto");

        assert_eq!(
            deterministic_nonce(&secret, &digest).value().to_hex(),
            "8f8a276c19f4149656b280621e358cce24f5f52542772691ee69063b74f15d15"
        );

        let signature = sign(&digest, &secret).unwrap();
        assert_eq!(
            hex::encode(signature.to_der()),
            "3045022100934b1ea10a4b3c1757e2b0c017d0b6143ce3c9a7e6a4a49860d7a6ab210ee3d8\
             02202442ce9d2b916064108014783e923ec36b49743e2ffa1c4496f01a512aafd9e5"
        );
    }

    #[test]
    fn test_signing_is_deterministic() {
        let n_minus_one =
            hex::decode("fffffffffffffffffffffffffffffffebaaedce6af48a03bbfd25e8cd0364140")
                .unwrap();
        let secret = key(&n_minus_one);
        let digest = sha256(b"Alan Turing");
        let first = sign(&digest, &secret).unwrap();
        assert_eq!(first, sign(&digest, &secret).unwrap());
        assert_eq!(
            hex::encode(first.to_der()),
            "304402201c1db509545dba958fb2a50e119c51380cce152ac41fbda5f70a456906b50a96\
             02205d99abb57b69da8b2abdca085d17ebdb6c5597a5b1a74bd1d96ba6d51e42e061"
        );
    }

    #[test]
    fn test_sign_and_verify() {
        let kp = KeyPair::generate();
        for message in [&b"one"[..], b"two", b""] {
            let digest = sha256(message);
            let signature = kp.sign(&digest).unwrap();
            assert!(signature.is_low_s());
            assert!(verify(&digest, &signature, kp.public_key()));
        }
    }

    #[test]
    fn test_verify_rejects_wrong_key_and_digest() {
        let kp = KeyPair::generate();
        let other = KeyPair::generate();
        let digest = sha256(b"payload");
        let signature = kp.sign(&digest).unwrap();

        assert!(!verify(&digest, &signature, other.public_key()));
        assert!(!verify(&sha256(b"payload!"), &signature, kp.public_key()));
    }

    #[test]
    fn test_flipped_bits_fail_verification() {
        let kp = KeyPair::from_entropy(b"bit flips").unwrap();
        let digest = sha256(b"flip me");
        let compact = kp.sign(&digest).unwrap().to_compact();

        for bit in [0usize, 7, 100, 255, 256, 300, 511] {
            let mut tampered = compact;
            tampered[bit / 8] ^= 1 << (bit % 8);
            let r = Scalar::from_be_bytes(tampered[..32].try_into().unwrap());
            let s = Scalar::from_be_bytes(tampered[32..].try_into().unwrap());
            let signature = Signature::new(r, s).unwrap();
            assert!(!verify(&digest, &signature, kp.public_key()), "bit {}", bit);
        }

        for bit in [0usize, 128, 255] {
            let mut flipped = digest;
            flipped[bit / 8] ^= 1 << (bit % 8);
            let signature = kp.sign(&digest).unwrap();
            assert!(!verify(&flipped, &signature, kp.public_key()));
        }
    }

    #[test]
    fn test_high_s_still_verifies_but_is_normalized() {
        let kp = KeyPair::generate();
        let digest = sha256(b"malleable");
        let low = kp.sign(&digest).unwrap();
        let high = Signature::new(low.r, -low.s).unwrap();

        assert!(!high.is_low_s());
        assert!(verify(&digest, &high, kp.public_key()));
        assert_eq!(high.normalize_s(), low);
    }

    #[test]
    fn test_zero_components_are_rejected() {
        assert_eq!(
            Signature::new(Scalar::zero(), Scalar::one()).unwrap_err(),
            SignatureError::ZeroComponent
        );

        // With d = 1 and k = 2 this digest makes z + r·d ≡ 0, so s = 0
        let digest: [u8; 32] =
            hex::decode("39fb806bbe128292cfbabf916a3f83265e374e9b22596394142654d373c5a25c")
                .unwrap()
                .try_into()
                .unwrap();
        let result = sign_with_nonce(&digest, &key(&[1]), &Scalar::from_u64(2));
        assert_eq!(result.unwrap_err(), SignatureError::ZeroComponent);
    }

    #[test]
    fn test_sign_with_rng() {
        let kp = KeyPair::generate();
        let digest = sha256(b"random nonce");
        let mut rng = StdRng::seed_from_u64(99);
        let a = sign_with_rng(&digest, kp.secret_key(), &mut rng).unwrap();
        let b = sign_with_rng(&digest, kp.secret_key(), &mut rng).unwrap();

        assert_ne!(a, b);
        assert!(verify(&digest, &a, kp.public_key()));
        assert!(verify(&digest, &b, kp.public_key()));
    }

    #[test]
    fn test_der_round_trip_and_strictness() {
        let kp = KeyPair::generate();
        let signature = kp.sign(&sha256(b"der")).unwrap();
        let der = signature.to_der();
        assert!(der.len() <= 72);
        assert_eq!(Signature::from_der(&der).unwrap(), signature);

        let mut trailing = der.clone();
        trailing.push(0);
        assert_eq!(
            Signature::from_der(&trailing).unwrap_err(),
            SignatureError::InvalidDer
        );

        let mut wrong_tag = der.clone();
        wrong_tag[0] = 0x31;
        assert!(Signature::from_der(&wrong_tag).is_err());

        // Padding a positive integer with an extra zero byte is non-minimal
        let padded = hex::decode("300702020001020101").unwrap();
        assert!(Signature::from_der(&padded).is_err());

        assert!(Signature::from_der(&[]).is_err());
    }

    #[test]
    fn test_small_components_encode_minimally() {
        let signature = Signature::new(Scalar::from_u64(1), Scalar::from_u64(0x80)).unwrap();
        assert_eq!(hex::encode(signature.to_der()), "300702010102020080");
        assert_eq!(
            Signature::from_der(&signature.to_der()).unwrap(),
            signature
        );
    }

    #[test]
    fn test_matches_libsecp256k1() {
        let secp = secp256k1::Secp256k1::new();
        let mut rng = StdRng::seed_from_u64(2024);
        for i in 0u32..4 {
            let kp = KeyPair::generate_with(&mut rng);
            let digest = sha256(&i.to_le_bytes());
            let ours = kp.sign(&digest).unwrap();

            let sk = secp256k1::SecretKey::from_slice(&kp.secret_key().to_be_bytes()).unwrap();
            let pk = secp256k1::PublicKey::from_secret_key(&secp, &sk);
            let msg = secp256k1::Message::from_digest_slice(&digest).unwrap();

            // Both use RFC 6979 with low-s, so the signatures coincide
            let theirs = secp.sign_ecdsa(&msg, &sk);
            assert_eq!(ours.to_compact(), theirs.serialize_compact());

            let parsed = secp256k1::ecdsa::Signature::from_der(&ours.to_der()).unwrap();
            assert!(secp.verify_ecdsa(&msg, &parsed, &pk).is_ok());
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(6))]

        #[test]
        fn prop_sign_verify_round_trip(seed in any::<u64>(), digest in any::<[u8; 32]>()) {
            let kp = KeyPair::generate_with(&mut StdRng::seed_from_u64(seed));
            let signature = sign(&digest, kp.secret_key()).unwrap();
            prop_assert!(signature.is_low_s());
            prop_assert!(verify(&digest, &signature, kp.public_key()));
        }
    }
}
