//! Modular arithmetic over the two secp256k1 primes
//!
//! - [`FieldElement`]: integers mod the field prime `p` (point coordinates)
//! - [`Scalar`]: integers mod the group order `n` (keys, nonces, signatures)
//!
//! Both moduli have the form `2^256 - c` with a small `c`, so a 512-bit
//! product is reduced by repeatedly folding the high half: `hi·2^256 + lo ≡
//! hi·c + lo`.

use std::ops::{Add, Mul, Neg, Sub};

use thiserror::Error;

use super::uint::U256;

/// Field arithmetic errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    #[error("Zero has no modular inverse")]
    NotInvertible,
}

/// A prime modulus `m = 2^256 - c` with `c < 2^192`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Modulus {
    value: U256,
    complement: U256,
}

/// secp256k1 field prime `p = 2^256 - 2^32 - 977`
pub const FIELD_PRIME: Modulus = Modulus {
    value: U256::from_limbs([
        0xFFFFFFFEFFFFFC2F,
        0xFFFFFFFFFFFFFFFF,
        0xFFFFFFFFFFFFFFFF,
        0xFFFFFFFFFFFFFFFF,
    ]),
    complement: U256::from_limbs([0x00000001000003D1, 0, 0, 0]),
};

/// secp256k1 group order `n`
pub const GROUP_ORDER: Modulus = Modulus {
    value: U256::from_limbs([
        0xBFD25E8CD0364141,
        0xBAAEDCE6AF48A03B,
        0xFFFFFFFFFFFFFFFE,
        0xFFFFFFFFFFFFFFFF,
    ]),
    complement: U256::from_limbs([0x402DA1732FC9BEBF, 0x4551231950B75FC4, 0x1, 0]),
};

/// `(p + 1) / 4`, the square-root exponent for `p ≡ 3 (mod 4)`
const SQRT_EXPONENT: U256 = U256::from_limbs([
    0xFFFFFFFFBFFFFF0C,
    0xFFFFFFFFFFFFFFFF,
    0xFFFFFFFFFFFFFFFF,
    0x3FFFFFFFFFFFFFFF,
]);

impl Modulus {
    pub fn value(&self) -> U256 {
        self.value
    }

    /// Reduce a value below `2^256` into `[0, m)`
    pub fn reduce(&self, value: U256) -> U256 {
        // m > 2^255, so a single subtraction is always enough
        if value >= self.value {
            value.wrapping_sub(&self.value)
        } else {
            value
        }
    }

    /// Reduce a 512-bit value given as `(low, high)` halves
    pub fn reduce_wide(&self, low: U256, high: U256) -> U256 {
        let (mut low, mut high) = (low, high);
        while !high.is_zero() {
            let (fold_low, fold_high) = high.widening_mul(&self.complement);
            let (sum, carry) = low.overflowing_add(&fold_low);
            low = sum;
            high = if carry {
                fold_high.wrapping_add(&U256::ONE)
            } else {
                fold_high
            };
        }
        self.reduce(low)
    }

    pub fn add(&self, a: &U256, b: &U256) -> U256 {
        let (sum, carry) = a.overflowing_add(b);
        if carry || sum >= self.value {
            sum.wrapping_sub(&self.value)
        } else {
            sum
        }
    }

    pub fn sub(&self, a: &U256, b: &U256) -> U256 {
        let (diff, borrow) = a.overflowing_sub(b);
        if borrow {
            diff.wrapping_add(&self.value)
        } else {
            diff
        }
    }

    pub fn mul(&self, a: &U256, b: &U256) -> U256 {
        let (low, high) = a.widening_mul(b);
        self.reduce_wide(low, high)
    }

    /// Exponentiation by squaring, most significant bit first
    pub fn pow(&self, base: &U256, exponent: &U256) -> U256 {
        let mut result = U256::ONE;
        for i in (0..exponent.bits()).rev() {
            result = self.mul(&result, &result);
            if exponent.bit(i) {
                result = self.mul(&result, base);
            }
        }
        result
    }

    /// Inverse by Fermat's little theorem: `a^(m-2)`.
    ///
    /// Zero maps to zero; callers that need to detect it use
    /// [`Modulus::inverse`].
    pub fn inv0(&self, a: &U256) -> U256 {
        let exponent = self.value.wrapping_sub(&U256::from_u64(2));
        self.pow(a, &exponent)
    }

    pub fn inverse(&self, a: &U256) -> Result<U256, FieldError> {
        if a.is_zero() {
            return Err(FieldError::NotInvertible);
        }
        Ok(self.inv0(a))
    }
}

macro_rules! residue_type {
    ($(#[$meta:meta])* $name:ident, $modulus:expr) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
        pub struct $name(U256);

        impl $name {
            pub const MODULUS: Modulus = $modulus;

            /// Reduce an arbitrary 256-bit value into range
            pub fn new(value: U256) -> Self {
                $name(Self::MODULUS.reduce(value))
            }

            /// Build from a value already known to be reduced
            #[allow(dead_code)]
            pub(crate) const fn from_reduced(value: U256) -> Self {
                $name(value)
            }

            /// Accept `value` only if it is already below the modulus
            pub fn from_canonical(value: U256) -> Option<Self> {
                if value < Self::MODULUS.value() {
                    Some($name(value))
                } else {
                    None
                }
            }

            pub fn from_u64(value: u64) -> Self {
                Self::new(U256::from_u64(value))
            }

            /// Big-endian bytes, reduced into range
            pub fn from_be_bytes(bytes: &[u8; 32]) -> Self {
                Self::new(U256::from_be_bytes(bytes))
            }

            pub fn zero() -> Self {
                $name(U256::ZERO)
            }

            pub fn one() -> Self {
                $name(U256::ONE)
            }

            pub fn value(&self) -> U256 {
                self.0
            }

            pub fn to_be_bytes(&self) -> [u8; 32] {
                self.0.to_be_bytes()
            }

            pub fn is_zero(&self) -> bool {
                self.0.is_zero()
            }

            pub fn square(&self) -> Self {
                *self * *self
            }

            pub fn pow(&self, exponent: &U256) -> Self {
                $name(Self::MODULUS.pow(&self.0, exponent))
            }

            pub fn inverse(&self) -> Result<Self, FieldError> {
                Self::MODULUS.inverse(&self.0).map($name)
            }

            /// Inverse with `0⁻¹ = 0`, for denominators proven non-zero
            #[allow(dead_code)]
            pub(crate) fn inv0(&self) -> Self {
                $name(Self::MODULUS.inv0(&self.0))
            }
        }

        impl Add for $name {
            type Output = $name;

            fn add(self, rhs: $name) -> $name {
                $name(Self::MODULUS.add(&self.0, &rhs.0))
            }
        }

        impl Sub for $name {
            type Output = $name;

            fn sub(self, rhs: $name) -> $name {
                $name(Self::MODULUS.sub(&self.0, &rhs.0))
            }
        }

        impl Mul for $name {
            type Output = $name;

            fn mul(self, rhs: $name) -> $name {
                $name(Self::MODULUS.mul(&self.0, &rhs.0))
            }
        }

        impl Neg for $name {
            type Output = $name;

            fn neg(self) -> $name {
                $name(Self::MODULUS.sub(&U256::ZERO, &self.0))
            }
        }
    };
}

residue_type!(
    /// Element of the secp256k1 base field (mod `p`)
    FieldElement,
    FIELD_PRIME
);

residue_type!(
    /// Integer modulo the secp256k1 group order `n`
    Scalar,
    GROUP_ORDER
);

impl FieldElement {
    /// Square root, if one exists
    pub fn sqrt(&self) -> Option<FieldElement> {
        let root = self.pow(&SQRT_EXPONENT);
        if root.square() == *self {
            Some(root)
        } else {
            None
        }
    }

    pub fn is_odd(&self) -> bool {
        self.0.is_odd()
    }
}

impl Scalar {
    /// True if the value lies in the upper half of the group order
    pub fn is_high(&self) -> bool {
        self.0 > GROUP_ORDER.value().shr1()
    }
}

impl std::fmt::Debug for FieldElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FieldElement({:x})", self.0)
    }
}

// Scalars may hold secrets; keep them out of debug output
impl std::fmt::Debug for Scalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Scalar(..)")
    }
}
