//! Key management for secp256k1
//!
//! Provides secret key generation, public key derivation, SEC encoding,
//! and the [`KeyPair`] type used to sign transaction inputs.

use std::fmt;

use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use thiserror::Error;

use super::address::{public_key_to_address, Network};
use super::curve::{Point, CURVE_B, GENERATOR};
use super::ecdsa::{self, Signature, SignatureError};
use super::field::{FieldElement, Scalar};
use super::hash::hash160;
use super::uint::U256;

/// Errors that can occur during key operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("Secret key is outside the valid range [1, n)")]
    OutOfRange,
    #[error("Invalid private key")]
    InvalidPrivateKey,
    #[error("Invalid public key")]
    InvalidPublicKey,
}

/// A secret scalar in `[1, n)`
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct SecretKey(Scalar);

impl SecretKey {
    pub fn from_scalar(scalar: Scalar) -> Result<Self, KeyError> {
        if scalar.is_zero() {
            return Err(KeyError::OutOfRange);
        }
        Ok(SecretKey(scalar))
    }

    /// Parse a 32-byte big-endian secret, rejecting values outside `[1, n)`
    pub fn from_be_bytes(bytes: &[u8; 32]) -> Result<Self, KeyError> {
        let scalar =
            Scalar::from_canonical(U256::from_be_bytes(bytes)).ok_or(KeyError::OutOfRange)?;
        Self::from_scalar(scalar)
    }

    pub fn scalar(&self) -> &Scalar {
        &self.0
    }

    pub fn to_be_bytes(&self) -> [u8; 32] {
        self.0.to_be_bytes()
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(<redacted>)")
    }
}

/// Draw a secret key from `rng`, redrawing until the value lies in `[1, n)`
pub fn generate_secret_key<R: RngCore + CryptoRng>(rng: &mut R) -> SecretKey {
    loop {
        let mut bytes = [0u8; 32];
        rng.fill_bytes(&mut bytes);
        if let Ok(key) = SecretKey::from_be_bytes(&bytes) {
            return key;
        }
    }
}

/// Derive a secret key from caller-supplied bytes read as a big-endian
/// integer.
///
/// Meant for reproducible tests; never use it for keys that hold funds.
/// Fails instead of retrying when the value is outside `[1, n)`.
pub fn secret_key_from_entropy(entropy: &[u8]) -> Result<SecretKey, KeyError> {
    let value = U256::from_be_slice(entropy).ok_or(KeyError::OutOfRange)?;
    let scalar = Scalar::from_canonical(value).ok_or(KeyError::OutOfRange)?;
    SecretKey::from_scalar(scalar)
}

/// A public key: a curve point other than the identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey {
    x: FieldElement,
    y: FieldElement,
}

impl PublicKey {
    pub fn from_secret_key(secret_key: &SecretKey) -> Self {
        match GENERATOR.mul_scalar(secret_key.scalar()) {
            Point::Affine { x, y } => PublicKey { x, y },
            // d·G is never the identity for 0 < d < n
            Point::Infinity => unreachable!("secret key outside [1, n)"),
        }
    }

    pub fn from_point(point: Point) -> Result<Self, KeyError> {
        match point {
            Point::Affine { x, y } if point.is_on_curve() => Ok(PublicKey { x, y }),
            _ => Err(KeyError::InvalidPublicKey),
        }
    }

    pub fn point(&self) -> Point {
        Point::Affine {
            x: self.x,
            y: self.y,
        }
    }

    /// SEC encoding: 33 bytes compressed or 65 bytes uncompressed
    pub fn to_sec(&self, compressed: bool) -> Vec<u8> {
        if compressed {
            // y is recoverable from x up to sign; the prefix records its parity
            let prefix = if self.y.is_odd() { 0x03 } else { 0x02 };
            let mut out = Vec::with_capacity(33);
            out.push(prefix);
            out.extend_from_slice(&self.x.to_be_bytes());
            out
        } else {
            let mut out = Vec::with_capacity(65);
            out.push(0x04);
            out.extend_from_slice(&self.x.to_be_bytes());
            out.extend_from_slice(&self.y.to_be_bytes());
            out
        }
    }

    /// Parse a SEC-encoded public key (compressed or uncompressed)
    pub fn from_sec(bytes: &[u8]) -> Result<Self, KeyError> {
        match (bytes.first(), bytes.len()) {
            (Some(0x04), 65) => {
                let x = field_from_slice(&bytes[1..33])?;
                let y = field_from_slice(&bytes[33..65])?;
                let point = Point::new(x, y).map_err(|_| KeyError::InvalidPublicKey)?;
                Self::from_point(point)
            }
            (Some(&prefix @ (0x02 | 0x03)), 33) => {
                let x = field_from_slice(&bytes[1..33])?;
                let rhs = x.square() * x + FieldElement::from_u64(CURVE_B);
                let mut y = rhs.sqrt().ok_or(KeyError::InvalidPublicKey)?;
                if y.is_odd() != (prefix == 0x03) {
                    y = -y;
                }
                Ok(PublicKey { x, y })
            }
            _ => Err(KeyError::InvalidPublicKey),
        }
    }

    pub fn to_hex(&self, compressed: bool) -> String {
        hex::encode(self.to_sec(compressed))
    }

    /// HASH160 of the SEC encoding
    pub fn hash160(&self, compressed: bool) -> [u8; 20] {
        hash160(&self.to_sec(compressed))
    }

    /// Base58Check pay-to-public-key-hash address
    pub fn address(&self, network: Network, compressed: bool) -> String {
        public_key_to_address(self, network, compressed)
    }

    pub fn verify(&self, digest: &[u8; 32], signature: &Signature) -> bool {
        ecdsa::verify(digest, signature, self)
    }
}

fn field_from_slice(bytes: &[u8]) -> Result<FieldElement, KeyError> {
    let mut word = [0u8; 32];
    word.copy_from_slice(bytes);
    FieldElement::from_canonical(U256::from_be_bytes(&word)).ok_or(KeyError::InvalidPublicKey)
}

/// Parse a public key from a hex string
pub fn public_key_from_hex(hex_key: &str) -> Result<PublicKey, KeyError> {
    let bytes = hex::decode(hex_key).map_err(|_| KeyError::InvalidPublicKey)?;
    PublicKey::from_sec(&bytes)
}

/// A key pair consisting of a secret key and its corresponding public key
#[derive(Debug, Clone)]
pub struct KeyPair {
    secret_key: SecretKey,
    public_key: PublicKey,
}

impl KeyPair {
    /// Generate a new random key pair from the operating system RNG
    pub fn generate() -> Self {
        Self::generate_with(&mut OsRng)
    }

    /// Generate a key pair from the supplied randomness source
    pub fn generate_with<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        Self::from_secret_key(generate_secret_key(rng))
    }

    /// Deterministic key pair from caller-supplied entropy (tests only)
    pub fn from_entropy(entropy: &[u8]) -> Result<Self, KeyError> {
        Ok(Self::from_secret_key(secret_key_from_entropy(entropy)?))
    }

    /// Create a key pair from an existing secret key
    pub fn from_secret_key(secret_key: SecretKey) -> Self {
        let public_key = PublicKey::from_secret_key(&secret_key);
        Self {
            secret_key,
            public_key,
        }
    }

    /// Create a key pair from a hex-encoded private key
    pub fn from_private_key_hex(hex_key: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(hex_key).map_err(|_| KeyError::InvalidPrivateKey)?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| KeyError::InvalidPrivateKey)?;
        Ok(Self::from_secret_key(SecretKey::from_be_bytes(&bytes)?))
    }

    pub fn secret_key(&self) -> &SecretKey {
        &self.secret_key
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    /// Get the private key as a hex string
    pub fn private_key_hex(&self) -> String {
        hex::encode(self.secret_key.to_be_bytes())
    }

    /// Get the public key as a hex string (compressed format)
    pub fn public_key_hex(&self) -> String {
        self.public_key.to_hex(true)
    }

    /// Generate a Base58Check address for the public key
    pub fn address(&self, network: Network, compressed: bool) -> String {
        self.public_key.address(network, compressed)
    }

    /// Sign a 32-byte message digest with a deterministic nonce
    pub fn sign(&self, digest: &[u8; 32]) -> Result<Signature, SignatureError> {
        ecdsa::sign(digest, &self.secret_key)
    }

    /// Verify a signature against this key pair's public key
    pub fn verify(&self, digest: &[u8; 32], signature: &Signature) -> bool {
        self.public_key.verify(digest, signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::sha256;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// Yields all-0xff blocks (above n) a few times before real bytes
    struct StubbornRng {
        rejects_left: usize,
        draws: usize,
    }

    impl RngCore for StubbornRng {
        fn next_u32(&mut self) -> u32 {
            self.next_u64() as u32
        }

        fn next_u64(&mut self) -> u64 {
            let mut bytes = [0u8; 8];
            self.fill_bytes(&mut bytes);
            u64::from_le_bytes(bytes)
        }

        fn fill_bytes(&mut self, dest: &mut [u8]) {
            self.draws += 1;
            let byte = if self.rejects_left > 0 {
                self.rejects_left -= 1;
                0xff
            } else {
                0x42
            };
            dest.iter_mut().for_each(|b| *b = byte);
        }

        fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
            self.fill_bytes(dest);
            Ok(())
        }
    }

    impl CryptoRng for StubbornRng {}

    #[test]
    fn test_key_pair_generation() {
        let kp = KeyPair::generate();
        assert_eq!(kp.private_key_hex().len(), 64);
        assert_eq!(kp.public_key_hex().len(), 66);
        assert!(kp.public_key().point().is_on_curve());
    }

    #[test]
    fn test_generate_with_seeded_rng_is_reproducible() {
        let a = KeyPair::generate_with(&mut StdRng::seed_from_u64(7));
        let b = KeyPair::generate_with(&mut StdRng::seed_from_u64(7));
        let c = KeyPair::generate_with(&mut StdRng::seed_from_u64(8));
        assert_eq!(a.public_key(), b.public_key());
        assert_ne!(a.public_key(), c.public_key());
    }

    #[test]
    fn test_generation_redraws_out_of_range_values() {
        let mut rng = StubbornRng {
            rejects_left: 3,
            draws: 0,
        };
        let key = generate_secret_key(&mut rng);
        assert_eq!(rng.draws, 4);
        assert_eq!(key.to_be_bytes(), [0x42; 32]);
    }

    #[test]
    fn test_entropy_derivation() {
        let key = secret_key_from_entropy(b"mini-bitcoin test key").unwrap();
        let public_key = PublicKey::from_secret_key(&key);
        assert_eq!(
            public_key.to_hex(true),
            "034bfacf13412e365155e1f84815782abc08e36707b279011a9acb7f4fd5dee467"
        );
    }

    #[test]
    fn test_entropy_out_of_range_is_an_error() {
        assert_eq!(
            secret_key_from_entropy(&[0u8; 32]).unwrap_err(),
            KeyError::OutOfRange
        );
        assert_eq!(
            secret_key_from_entropy(&[0xffu8; 32]).unwrap_err(),
            KeyError::OutOfRange
        );
        assert_eq!(
            secret_key_from_entropy(&[0x01u8; 33]).unwrap_err(),
            KeyError::OutOfRange
        );
        assert!(KeyPair::from_entropy(&[0u8; 4]).is_err());
    }

    #[test]
    fn test_sign_and_verify() {
        let kp = KeyPair::generate();
        let digest = sha256(b"Hello, blockchain!");

        let signature = kp.sign(&digest).unwrap();
        assert!(kp.verify(&digest, &signature));

        let other = sha256(b"Hello, blockchain?");
        assert!(!kp.verify(&other, &signature));
    }

    #[test]
    fn test_key_pair_from_hex() {
        let kp1 = KeyPair::generate();
        let private_hex = kp1.private_key_hex();

        let kp2 = KeyPair::from_private_key_hex(&private_hex).unwrap();
        assert_eq!(kp1.public_key_hex(), kp2.public_key_hex());
        assert_eq!(
            kp1.address(Network::Main, true),
            kp2.address(Network::Main, true)
        );

        assert_eq!(
            KeyPair::from_private_key_hex("abcd").unwrap_err(),
            KeyError::InvalidPrivateKey
        );
        assert_eq!(
            KeyPair::from_private_key_hex(&"00".repeat(32)).unwrap_err(),
            KeyError::OutOfRange
        );
    }

    #[test]
    fn test_address_format() {
        let kp = KeyPair::generate();
        // Mainnet P2PKH addresses start with 1, testnet with m or n
        assert!(kp.address(Network::Main, true).starts_with('1'));
        let testnet = kp.address(Network::Test, false);
        assert!(testnet.starts_with('m') || testnet.starts_with('n'));
    }

    #[test]
    fn test_sec_encoding_of_generator() {
        let one = KeyPair::from_entropy(&[1]).unwrap();
        assert_eq!(
            one.public_key().to_hex(true),
            "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798"
        );
        assert_eq!(
            one.public_key().to_hex(false),
            "0479be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798\
             483ada7726a3c4655da4fbfc0e1108a8fd17b448a68554199c47d08ffb10d4b8"
        );
    }

    #[test]
    fn test_sec_round_trip() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..4 {
            let kp = KeyPair::generate_with(&mut rng);
            for compressed in [true, false] {
                let sec = kp.public_key().to_sec(compressed);
                assert_eq!(sec.len(), if compressed { 33 } else { 65 });
                assert_eq!(&PublicKey::from_sec(&sec).unwrap(), kp.public_key());
            }
        }
    }

    #[test]
    fn test_from_sec_rejects_malformed_keys() {
        let good = KeyPair::generate().public_key().to_sec(false);

        let mut bad_prefix = good.clone();
        bad_prefix[0] = 0x05;
        assert!(PublicKey::from_sec(&bad_prefix).is_err());

        let mut off_curve = good.clone();
        off_curve[64] ^= 0x01;
        assert!(PublicKey::from_sec(&off_curve).is_err());

        assert!(PublicKey::from_sec(&good[..33]).is_err());
        assert!(PublicKey::from_sec(&[]).is_err());
        assert!(public_key_from_hex("zz").is_err());
    }

    #[test]
    fn test_matches_libsecp256k1_public_keys() {
        let secp = secp256k1::Secp256k1::new();
        let mut rng = StdRng::seed_from_u64(1234);
        for _ in 0..4 {
            let kp = KeyPair::generate_with(&mut rng);
            let sk = secp256k1::SecretKey::from_slice(&kp.secret_key().to_be_bytes()).unwrap();
            let pk = secp256k1::PublicKey::from_secret_key(&secp, &sk);
            assert_eq!(kp.public_key().to_sec(true), pk.serialize().to_vec());
            assert_eq!(
                kp.public_key().to_sec(false),
                pk.serialize_uncompressed().to_vec()
            );
        }
    }

    #[test]
    fn test_secret_key_debug_is_redacted() {
        let kp = KeyPair::generate();
        let debug = format!("{:?}", kp);
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains(&kp.private_key_hex()));
    }
}
