//! secp256k1 curve points and group law
//!
//! Curve: `y² = x³ + 7` over the field prime `p`. Points use affine
//! coordinates; the identity is its own variant rather than a sentinel
//! coordinate pair.

use std::ops::{Add, Neg};

use thiserror::Error;

use super::field::{FieldElement, Scalar, GROUP_ORDER};
use super::uint::U256;

/// Curve coefficient `a` in `y² = x³ + ax + b`
pub const CURVE_A: u64 = 0;

/// Curve coefficient `b` in `y² = x³ + ax + b`
pub const CURVE_B: u64 = 7;

/// The standard base point `G`
pub const GENERATOR: Point = Point::Affine {
    x: FieldElement::from_reduced(U256::from_limbs([
        0x59F2815B16F81798,
        0x029BFCDB2DCE28D9,
        0x55A06295CE870B07,
        0x79BE667EF9DCBBAC,
    ])),
    y: FieldElement::from_reduced(U256::from_limbs([
        0x9C47D08FFB10D4B8,
        0xFD17B448A6855419,
        0x5DA4FBFC0E1108A8,
        0x483ADA7726A3C465,
    ])),
};

/// Curve errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CurveError {
    #[error("Point is not on the curve")]
    NotOnCurve,
}

/// A point on secp256k1
///
/// The group law assumes every `Affine` value satisfies the curve equation.
/// `Point::new` checks it; building `Point::Affine` directly does not, so
/// coordinates from untrusted input must go through `new` or `is_on_curve`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Point {
    /// The identity element
    Infinity,
    Affine { x: FieldElement, y: FieldElement },
}

impl Point {
    /// Create an affine point, checking the curve equation
    pub fn new(x: FieldElement, y: FieldElement) -> Result<Self, CurveError> {
        let point = Point::Affine { x, y };
        if point.is_on_curve() {
            Ok(point)
        } else {
            Err(CurveError::NotOnCurve)
        }
    }

    /// The group order `n`
    pub fn order() -> U256 {
        GROUP_ORDER.value()
    }

    pub fn is_infinity(&self) -> bool {
        matches!(self, Point::Infinity)
    }

    pub fn x(&self) -> Option<FieldElement> {
        match self {
            Point::Infinity => None,
            Point::Affine { x, .. } => Some(*x),
        }
    }

    pub fn y(&self) -> Option<FieldElement> {
        match self {
            Point::Infinity => None,
            Point::Affine { y, .. } => Some(*y),
        }
    }

    pub fn is_on_curve(&self) -> bool {
        match self {
            Point::Infinity => true,
            Point::Affine { x, y } => {
                y.square() == x.square() * *x + FieldElement::from_u64(CURVE_B)
            }
        }
    }

    /// Group addition
    pub fn add_point(&self, other: &Point) -> Point {
        let (x1, y1, x2, y2) = match (self, other) {
            (Point::Infinity, _) => return *other,
            (_, Point::Infinity) => return *self,
            (Point::Affine { x: x1, y: y1 }, Point::Affine { x: x2, y: y2 }) => {
                (*x1, *y1, *x2, *y2)
            }
        };

        // Vertical line: P + (-P), which also covers doubling a point with y = 0
        if x1 == x2 && (y1 + y2).is_zero() {
            return Point::Infinity;
        }

        let slope = if x1 == x2 {
            // P == Q: tangent slope (3x² + a) / 2y, with a = 0 and y ≠ 0 here
            let numerator = FieldElement::from_u64(3) * x1.square();
            numerator * (y1 + y1).inv0()
        } else {
            (y2 - y1) * (x2 - x1).inv0()
        };

        let x3 = slope.square() - x1 - x2;
        let y3 = slope * (x1 - x3) - y1;
        Point::Affine { x: x3, y: y3 }
    }

    pub fn double(&self) -> Point {
        self.add_point(self)
    }

    pub fn negate(&self) -> Point {
        match self {
            Point::Infinity => Point::Infinity,
            Point::Affine { x, y } => Point::Affine { x: *x, y: -*y },
        }
    }

    /// Scalar multiplication by double-and-add.
    ///
    /// Bits of `k` are consumed from least to most significant. `k` is used
    /// as given; it is not reduced modulo the group order.
    pub fn multiply(&self, k: &U256) -> Point {
        let mut result = Point::Infinity;
        let mut addend = *self;
        for i in 0..k.bits() {
            if k.bit(i) {
                result = result.add_point(&addend);
            }
            addend = addend.double();
        }
        result
    }

    pub fn mul_scalar(&self, k: &Scalar) -> Point {
        self.multiply(&k.value())
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        self.add_point(&rhs)
    }
}

impl Neg for Point {
    type Output = Point;

    fn neg(self) -> Point {
        self.negate()
    }
}
