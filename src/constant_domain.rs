// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

use crate::expression::ExpressionType;

use num_bigint::{BigInt, BigUint};
use num_traits::{One, ToPrimitive, Zero};
use serde::{Deserialize, Serialize};

/// Abstracts over the constant values of the interpreted language. Packet
/// payloads routinely exceed machine word sizes, so bit vector values are
/// kept as arbitrary precision bit patterns together with their declared
/// width. Signed values store their two's complement pattern.
#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialOrd, PartialEq, Hash, Ord)]
pub enum ConstantDomain {
    /// The impossible constant. Use this as the result of a partial transfer
    /// function.
    Bottom,
    /// The Boolean value false.
    False,
    /// The Boolean value true.
    True,
    /// A bit vector value of the given width.
    Bits {
        /// The two's complement bit pattern of the value.
        value: BigUint,
        /// The declared width in bits. The pattern always fits the width.
        width: u32,
        /// True if the pattern is interpreted in two's complement.
        signed: bool,
    },
}

/// Returns the all-ones pattern of the given width.
fn ones(width: u32) -> BigUint {
    (BigUint::one() << width as usize) - BigUint::one()
}

/// Truncates a pattern to the given width.
fn truncated(value: BigUint, width: u32) -> BigUint {
    value & ones(width)
}

/// Interprets a pattern of the given width as a (possibly negative) integer.
fn interpreted(value: &BigUint, width: u32, signed: bool) -> BigInt {
    if signed && width > 0 && value.bit(u64::from(width) - 1) {
        BigInt::from(value.clone()) - (BigInt::one() << width as usize)
    } else {
        BigInt::from(value.clone())
    }
}

/// Reduces an integer into the two's complement pattern of the given width.
fn reduced(value: BigInt, width: u32, signed: bool) -> ConstantDomain {
    let modulus = BigInt::one() << width as usize;
    let remainder = ((value % &modulus) + &modulus) % &modulus;
    ConstantDomain::Bits {
        // The remainder is non negative, so its magnitude is its value.
        value: remainder.magnitude().clone(),
        width,
        signed,
    }
}

impl From<bool> for ConstantDomain {
    fn from(b: bool) -> ConstantDomain {
        if b {
            ConstantDomain::True
        } else {
            ConstantDomain::False
        }
    }
}

/// Constructors
impl ConstantDomain {
    /// Returns the bit vector constant with the given pattern, truncated to
    /// the width of the given type. Returns Bottom for non vector types.
    pub fn for_type(ty: &ExpressionType, value: BigUint) -> ConstantDomain {
        match ty {
            ExpressionType::Bits { width, signed } => ConstantDomain::Bits {
                value: truncated(value, *width),
                width: *width,
                signed: *signed,
            },
            ExpressionType::VarBits { max_width } => ConstantDomain::Bits {
                value: truncated(value, *max_width),
                width: *max_width,
                signed: false,
            },
            ExpressionType::Bool => (!value.is_zero()).into(),
            ExpressionType::NonPrimitive => ConstantDomain::Bottom,
        }
    }

    /// Returns the maximum representable constant of the given type: the
    /// all-ones pattern for bit vector types and true for Booleans.
    pub fn max_for_type(ty: &ExpressionType) -> ConstantDomain {
        match ty {
            ExpressionType::Bool => ConstantDomain::True,
            ExpressionType::Bits { width, signed } => ConstantDomain::Bits {
                value: ones(*width),
                width: *width,
                signed: *signed,
            },
            ExpressionType::VarBits { max_width } => ConstantDomain::Bits {
                value: ones(*max_width),
                width: *max_width,
                signed: false,
            },
            ExpressionType::NonPrimitive => ConstantDomain::Bottom,
        }
    }

    /// Returns the default constant of the given type: the all-zeros pattern
    /// for bit vector types and false for Booleans.
    pub fn default_for_type(ty: &ExpressionType) -> ConstantDomain {
        match ty {
            ExpressionType::Bool => ConstantDomain::False,
            ExpressionType::Bits { width, signed } => ConstantDomain::Bits {
                value: BigUint::zero(),
                width: *width,
                signed: *signed,
            },
            ExpressionType::VarBits { max_width } => ConstantDomain::Bits {
                value: BigUint::zero(),
                width: *max_width,
                signed: false,
            },
            ExpressionType::NonPrimitive => ConstantDomain::Bottom,
        }
    }
}

/// Queries
impl ConstantDomain {
    /// Returns the width in bits of a bit vector constant.
    pub fn width(&self) -> Option<u32> {
        match self {
            ConstantDomain::Bits { width, .. } => Some(*width),
            ConstantDomain::True | ConstantDomain::False => Some(1),
            ConstantDomain::Bottom => None,
        }
    }

    /// Returns true if this constant is the maximum representable value of
    /// its own type, i.e. all ones for a bit vector and true for a Boolean.
    pub fn is_max_value(&self) -> bool {
        match self {
            ConstantDomain::True => true,
            ConstantDomain::Bits { value, width, .. } => *value == ones(*width),
            _ => false,
        }
    }

    /// Returns the value as a bit index, if it is a small enough constant.
    pub fn as_bit_index(&self) -> Option<u32> {
        match self {
            ConstantDomain::Bits { value, .. } => value.to_u32(),
            _ => None,
        }
    }
}

/// Transfer functions
impl ConstantDomain {
    /// Returns a constant that is "self + other".
    pub fn add(&self, other: &Self) -> Self {
        match (self, other) {
            (
                ConstantDomain::Bits {
                    value: val1,
                    width,
                    signed,
                },
                ConstantDomain::Bits { value: val2, .. },
            ) => ConstantDomain::Bits {
                value: truncated(val1 + val2, *width),
                width: *width,
                signed: *signed,
            },
            _ => ConstantDomain::Bottom,
        }
    }

    /// Returns a constant that is "self - other".
    pub fn sub(&self, other: &Self) -> Self {
        match (self, other) {
            (
                ConstantDomain::Bits {
                    value: val1,
                    width,
                    signed,
                },
                ConstantDomain::Bits { value: val2, .. },
            ) => {
                let modulus = BigUint::one() << *width as usize;
                ConstantDomain::Bits {
                    value: truncated(val1 + (modulus - truncated(val2.clone(), *width)), *width),
                    width: *width,
                    signed: *signed,
                }
            }
            _ => ConstantDomain::Bottom,
        }
    }

    /// Returns a constant that is "self * other".
    pub fn mul(&self, other: &Self) -> Self {
        match (self, other) {
            (
                ConstantDomain::Bits {
                    value: val1,
                    width,
                    signed,
                },
                ConstantDomain::Bits { value: val2, .. },
            ) => ConstantDomain::Bits {
                value: truncated(val1 * val2, *width),
                width: *width,
                signed: *signed,
            },
            _ => ConstantDomain::Bottom,
        }
    }

    /// Returns a constant that is "self / other".
    pub fn div(&self, other: &Self) -> Self {
        match (self, other) {
            (
                ConstantDomain::Bits {
                    value: val1,
                    width,
                    signed,
                },
                ConstantDomain::Bits {
                    value: val2,
                    width: width2,
                    signed: signed2,
                },
            ) => {
                if val2.is_zero() {
                    ConstantDomain::Bottom
                } else {
                    reduced(
                        interpreted(val1, *width, *signed)
                            / interpreted(val2, *width2, *signed2),
                        *width,
                        *signed,
                    )
                }
            }
            _ => ConstantDomain::Bottom,
        }
    }

    /// Returns a constant that is "self % other".
    pub fn rem(&self, other: &Self) -> Self {
        match (self, other) {
            (
                ConstantDomain::Bits {
                    value: val1,
                    width,
                    signed,
                },
                ConstantDomain::Bits {
                    value: val2,
                    width: width2,
                    signed: signed2,
                },
            ) => {
                if val2.is_zero() {
                    ConstantDomain::Bottom
                } else {
                    reduced(
                        interpreted(val1, *width, *signed)
                            % interpreted(val2, *width2, *signed2),
                        *width,
                        *signed,
                    )
                }
            }
            _ => ConstantDomain::Bottom,
        }
    }

    /// Returns a constant that is "-self".
    pub fn neg(&self) -> Self {
        match self {
            ConstantDomain::Bits {
                value,
                width,
                signed,
            } => {
                let modulus = BigUint::one() << *width as usize;
                ConstantDomain::Bits {
                    value: truncated(modulus - value, *width),
                    width: *width,
                    signed: *signed,
                }
            }
            _ => ConstantDomain::Bottom,
        }
    }

    /// Returns a constant that is "!self" for Booleans and "~self" for bit
    /// vectors.
    pub fn not(&self) -> Self {
        match self {
            ConstantDomain::False => ConstantDomain::True,
            ConstantDomain::True => ConstantDomain::False,
            ConstantDomain::Bits {
                value,
                width,
                signed,
            } => ConstantDomain::Bits {
                value: value ^ ones(*width),
                width: *width,
                signed: *signed,
            },
            ConstantDomain::Bottom => ConstantDomain::Bottom,
        }
    }

    /// Returns a constant that is "self & other".
    pub fn bit_and(&self, other: &Self) -> Self {
        match (self, other) {
            (
                ConstantDomain::Bits {
                    value: val1,
                    width,
                    signed,
                },
                ConstantDomain::Bits { value: val2, .. },
            ) => ConstantDomain::Bits {
                value: val1 & val2,
                width: *width,
                signed: *signed,
            },
            (ConstantDomain::True, ConstantDomain::True) => ConstantDomain::True,
            (ConstantDomain::False, _) | (_, ConstantDomain::False) => ConstantDomain::False,
            _ => ConstantDomain::Bottom,
        }
    }

    /// Returns a constant that is "self | other".
    pub fn bit_or(&self, other: &Self) -> Self {
        match (self, other) {
            (
                ConstantDomain::Bits {
                    value: val1,
                    width,
                    signed,
                },
                ConstantDomain::Bits { value: val2, .. },
            ) => ConstantDomain::Bits {
                value: truncated(val1 | val2, *width),
                width: *width,
                signed: *signed,
            },
            (ConstantDomain::False, ConstantDomain::False) => ConstantDomain::False,
            (ConstantDomain::True, _) | (_, ConstantDomain::True) => ConstantDomain::True,
            _ => ConstantDomain::Bottom,
        }
    }

    /// Returns a constant that is "self ^ other".
    pub fn bit_xor(&self, other: &Self) -> Self {
        match (self, other) {
            (
                ConstantDomain::Bits {
                    value: val1,
                    width,
                    signed,
                },
                ConstantDomain::Bits { value: val2, .. },
            ) => ConstantDomain::Bits {
                value: truncated(val1 ^ val2, *width),
                width: *width,
                signed: *signed,
            },
            (ConstantDomain::False, ConstantDomain::False)
            | (ConstantDomain::True, ConstantDomain::True) => ConstantDomain::False,
            (ConstantDomain::True, ConstantDomain::False)
            | (ConstantDomain::False, ConstantDomain::True) => ConstantDomain::True,
            _ => ConstantDomain::Bottom,
        }
    }

    /// Returns a constant that is "self << other". Bits shifted past the
    /// width of self vanish.
    pub fn shl(&self, other: &Self) -> Self {
        match (self, other.as_bit_index()) {
            (
                ConstantDomain::Bits {
                    value,
                    width,
                    signed,
                },
                Some(shift),
            ) => ConstantDomain::Bits {
                value: truncated(value << shift as usize, *width),
                width: *width,
                signed: *signed,
            },
            _ => ConstantDomain::Bottom,
        }
    }

    /// Returns a constant that is "self >> other"; arithmetic for signed
    /// values, logical otherwise.
    pub fn shr(&self, other: &Self) -> Self {
        match (self, other.as_bit_index()) {
            (
                ConstantDomain::Bits {
                    value,
                    width,
                    signed,
                },
                Some(shift),
            ) => {
                if *signed {
                    reduced(
                        interpreted(value, *width, true) >> shift as usize,
                        *width,
                        true,
                    )
                } else {
                    ConstantDomain::Bits {
                        value: value >> shift as usize,
                        width: *width,
                        signed: false,
                    }
                }
            }
            _ => ConstantDomain::Bottom,
        }
    }

    /// Returns a constant that is "self ++ other": self occupies the high
    /// bits of the result, whose width is the sum of the operand widths.
    pub fn concat(&self, other: &Self) -> Self {
        match (self, other) {
            (
                ConstantDomain::Bits {
                    value: val1,
                    width: width1,
                    signed,
                },
                ConstantDomain::Bits {
                    value: val2,
                    width: width2,
                    ..
                },
            ) => ConstantDomain::Bits {
                value: (val1 << *width2 as usize) | val2,
                width: width1 + width2,
                signed: *signed,
            },
            _ => ConstantDomain::Bottom,
        }
    }

    /// Returns a constant that is "self[high:low]", an unsigned vector of
    /// width high - low + 1.
    pub fn slice(&self, high: u32, low: u32) -> Self {
        match self {
            ConstantDomain::Bits { value, .. } if high >= low => {
                let width = high - low + 1;
                ConstantDomain::Bits {
                    value: truncated(value >> low as usize, width),
                    width,
                    signed: false,
                }
            }
            _ => ConstantDomain::Bottom,
        }
    }

    /// Returns a constant that is "self as target_type".
    pub fn cast(&self, target_type: &ExpressionType) -> Self {
        match (self, target_type) {
            (ConstantDomain::Bottom, _) => ConstantDomain::Bottom,
            (ConstantDomain::True, ExpressionType::Bool)
            | (ConstantDomain::False, ExpressionType::Bool) => self.clone(),
            (ConstantDomain::True, _) => {
                ConstantDomain::for_type(target_type, BigUint::one())
            }
            (ConstantDomain::False, _) => {
                ConstantDomain::for_type(target_type, BigUint::zero())
            }
            (ConstantDomain::Bits { value, .. }, ExpressionType::Bool) => {
                (!value.is_zero()).into()
            }
            (
                ConstantDomain::Bits {
                    value,
                    width,
                    signed,
                },
                ExpressionType::Bits {
                    width: target_width,
                    signed: target_signed,
                },
            ) => reduced(
                interpreted(value, *width, *signed),
                *target_width,
                *target_signed,
            ),
            (
                ConstantDomain::Bits { value, .. },
                ExpressionType::VarBits { max_width },
            ) => ConstantDomain::Bits {
                value: truncated(value.clone(), *max_width),
                width: *max_width,
                signed: false,
            },
            (_, ExpressionType::NonPrimitive) => ConstantDomain::Bottom,
        }
    }

    /// Returns a constant that is "self == other".
    pub fn equals(&self, other: &Self) -> Self {
        match (self, other) {
            (ConstantDomain::Bottom, _) | (_, ConstantDomain::Bottom) => ConstantDomain::Bottom,
            _ => (*self == *other).into(),
        }
    }

    /// Returns a constant that is "self != other".
    pub fn not_equals(&self, other: &Self) -> Self {
        match (self, other) {
            (ConstantDomain::Bottom, _) | (_, ConstantDomain::Bottom) => ConstantDomain::Bottom,
            _ => (*self != *other).into(),
        }
    }

    /// Returns a constant that is "self < other".
    pub fn less_than(&self, other: &Self) -> Self {
        self.compare(other, |ordering| ordering == std::cmp::Ordering::Less)
    }

    /// Returns a constant that is "self <= other".
    pub fn less_or_equal(&self, other: &Self) -> Self {
        self.compare(other, |ordering| ordering != std::cmp::Ordering::Greater)
    }

    /// Returns a constant that is "self > other".
    pub fn greater_than(&self, other: &Self) -> Self {
        self.compare(other, |ordering| ordering == std::cmp::Ordering::Greater)
    }

    /// Returns a constant that is "self >= other".
    pub fn greater_or_equal(&self, other: &Self) -> Self {
        self.compare(other, |ordering| ordering != std::cmp::Ordering::Less)
    }

    /// Returns a constant that is "self && other".
    pub fn and(&self, other: &Self) -> Self {
        match (self, other) {
            (ConstantDomain::True, ConstantDomain::True) => ConstantDomain::True,
            (ConstantDomain::False, ConstantDomain::False)
            | (ConstantDomain::False, ConstantDomain::True)
            | (ConstantDomain::True, ConstantDomain::False) => ConstantDomain::False,
            _ => ConstantDomain::Bottom,
        }
    }

    /// Returns a constant that is "self || other".
    pub fn or(&self, other: &Self) -> Self {
        match (self, other) {
            (ConstantDomain::False, ConstantDomain::False) => ConstantDomain::False,
            (ConstantDomain::True, ConstantDomain::True)
            | (ConstantDomain::True, ConstantDomain::False)
            | (ConstantDomain::False, ConstantDomain::True) => ConstantDomain::True,
            _ => ConstantDomain::Bottom,
        }
    }

    /// Compares the integer interpretations of two bit vector constants.
    fn compare(&self, other: &Self, ordering_holds: fn(std::cmp::Ordering) -> bool) -> Self {
        match (self, other) {
            (
                ConstantDomain::Bits {
                    value: val1,
                    width: width1,
                    signed: signed1,
                },
                ConstantDomain::Bits {
                    value: val2,
                    width: width2,
                    signed: signed2,
                },
            ) => ordering_holds(
                interpreted(val1, *width1, *signed1).cmp(&interpreted(val2, *width2, *signed2)),
            )
            .into(),
            _ => ConstantDomain::Bottom,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bits(value: u128, width: u32) -> ConstantDomain {
        ConstantDomain::for_type(&ExpressionType::bits(width), BigUint::from(value))
    }

    #[test]
    fn test_concat_places_left_operand_high() {
        let result = bits(0xAB, 8).concat(&bits(0xCD, 8));
        assert_eq!(result, bits(0xABCD, 16));
    }

    #[test]
    fn test_shl_drops_bits_past_the_width() {
        assert_eq!(bits(0xFF, 8).shl(&bits(4, 8)), bits(0xF0, 8));
        assert_eq!(bits(0xFF, 8).shl(&bits(8, 8)), bits(0, 8));
    }

    #[test]
    fn test_shr_is_arithmetic_for_signed_values() {
        let value = ConstantDomain::for_type(&ExpressionType::signed_bits(8), BigUint::from(0x80u32));
        let shifted = value.shr(&bits(4, 8));
        // -128 >> 4 == -8, i.e. 0xF8 in two's complement.
        assert_eq!(
            shifted,
            ConstantDomain::for_type(&ExpressionType::signed_bits(8), BigUint::from(0xF8u32))
        );
        assert_eq!(bits(0x80, 8).shr(&bits(4, 8)), bits(0x08, 8));
    }

    #[test]
    fn test_slice_extracts_the_inclusive_bit_range() {
        assert_eq!(bits(0xABCD, 16).slice(15, 8), bits(0xAB, 8));
        assert_eq!(bits(0xABCD, 16).slice(3, 0), bits(0xD, 4));
        assert_eq!(bits(0xABCD, 16).slice(0, 3), ConstantDomain::Bottom);
    }

    #[test]
    fn test_cast_sign_extends_signed_sources() {
        let narrow = ConstantDomain::for_type(&ExpressionType::signed_bits(8), BigUint::from(0xF0u32));
        assert_eq!(
            narrow.cast(&ExpressionType::signed_bits(16)),
            ConstantDomain::for_type(&ExpressionType::signed_bits(16), BigUint::from(0xFFF0u32))
        );
        assert_eq!(
            bits(0xF0, 8).cast(&ExpressionType::bits(16)),
            bits(0xF0, 16)
        );
        assert_eq!(bits(0xABCD, 16).cast(&ExpressionType::bits(8)), bits(0xCD, 8));
    }

    #[test]
    fn test_sub_wraps_in_twos_complement() {
        assert_eq!(bits(0, 8).sub(&bits(1, 8)), bits(0xFF, 8));
        assert_eq!(bits(5, 8).sub(&bits(3, 8)), bits(2, 8));
    }

    #[test]
    fn test_max_and_default_values() {
        assert_eq!(
            ConstantDomain::max_for_type(&ExpressionType::bits(8)),
            bits(0xFF, 8)
        );
        assert!(ConstantDomain::max_for_type(&ExpressionType::bits(8)).is_max_value());
        assert_eq!(
            ConstantDomain::max_for_type(&ExpressionType::Bool),
            ConstantDomain::True
        );
        assert_eq!(
            ConstantDomain::default_for_type(&ExpressionType::bits(8)),
            bits(0, 8)
        );
        assert!(!ConstantDomain::default_for_type(&ExpressionType::bits(8)).is_max_value());
    }

    #[test]
    fn test_signed_comparison_uses_integer_interpretation() {
        let minus_one = ConstantDomain::for_type(&ExpressionType::signed_bits(8), BigUint::from(0xFFu32));
        let one = ConstantDomain::for_type(&ExpressionType::signed_bits(8), BigUint::from(1u32));
        assert_eq!(minus_one.less_than(&one), ConstantDomain::True);
        // The same patterns compare unsigned the other way around.
        assert_eq!(bits(0xFF, 8).less_than(&bits(1, 8)), ConstantDomain::False);
    }

    #[test]
    fn test_division_by_zero_is_bottom() {
        assert_eq!(bits(4, 8).div(&bits(0, 8)), ConstantDomain::Bottom);
        assert_eq!(bits(4, 8).rem(&bits(0, 8)), ConstantDomain::Bottom);
    }
}
