// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

use crate::constant_domain::ConstantDomain;
use crate::expression::{Expression, ExpressionType};

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Formatter, Result};
use std::rc::Rc;

/// A symbolic value is an expression together with the type its concrete
/// values would have. Values are immutable and persistently shared: a
/// subtree may be referenced from any number of parents, the tree is acyclic
/// by construction, and every pass produces new values rather than mutating
/// old ones.
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct SymbolicValue {
    pub expression: Expression,
    pub ty: ExpressionType,
}

impl Debug for SymbolicValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        self.expression.fmt(f)
    }
}

/// Constructors. These compute the conventional result type of each
/// operation; a caller whose typing rules differ can always use make_from
/// directly.
impl SymbolicValue {
    /// Creates a value from the given expression and type.
    pub fn make_from(expression: Expression, ty: ExpressionType) -> Rc<SymbolicValue> {
        Rc::new(SymbolicValue { expression, ty })
    }

    /// Creates a compile time constant of the given type, truncating the
    /// pattern to the type width.
    pub fn make_constant(ty: ExpressionType, value: BigUint) -> Rc<SymbolicValue> {
        let constant = ConstantDomain::for_type(&ty, value);
        Self::make_from(Expression::CompileTimeConstant(constant), ty)
    }

    /// Creates a compile time constant of the given type from a machine
    /// integer.
    pub fn make_u128(ty: ExpressionType, value: u128) -> Rc<SymbolicValue> {
        Self::make_constant(ty, BigUint::from(value))
    }

    /// Creates a Boolean compile time constant.
    pub fn make_bool(value: bool) -> Rc<SymbolicValue> {
        Self::make_from(
            Expression::CompileTimeConstant(value.into()),
            ExpressionType::Bool,
        )
    }

    /// Creates the maximum representable constant of the given type: the
    /// all-ones pattern for bit vector types and true for Booleans.
    pub fn make_max_value(ty: &ExpressionType) -> Rc<SymbolicValue> {
        Self::make_from(
            Expression::CompileTimeConstant(ConstantDomain::max_for_type(ty)),
            ty.clone(),
        )
    }

    /// Creates the default constant of the given type: the all-zeros pattern
    /// for bit vector types and false for Booleans.
    pub fn make_default_value(ty: &ExpressionType) -> Rc<SymbolicValue> {
        Self::make_from(
            Expression::CompileTimeConstant(ConstantDomain::default_for_type(ty)),
            ty.clone(),
        )
    }

    /// Creates "left ++ right". The left operand occupies the high bits; the
    /// result is an unsigned vector as wide as both operands together.
    pub fn make_concat(left: Rc<SymbolicValue>, right: Rc<SymbolicValue>) -> Rc<SymbolicValue> {
        let width = left.width() + right.width();
        Self::make_from(
            Expression::Concat { left, right },
            ExpressionType::bits(width),
        )
    }

    /// Creates "base[high:low]" with constant bounds. The result is an
    /// unsigned vector of width high - low + 1.
    pub fn make_slice(base: Rc<SymbolicValue>, high: u32, low: u32) -> Rc<SymbolicValue> {
        let index_type = ExpressionType::bits(32);
        Self::make_from(
            Expression::Slice {
                base,
                high: Self::make_u128(index_type.clone(), u128::from(high)),
                low: Self::make_u128(index_type, u128::from(low)),
            },
            ExpressionType::bits(high - low + 1),
        )
    }

    /// Creates "left + right".
    pub fn make_add(left: Rc<SymbolicValue>, right: Rc<SymbolicValue>) -> Rc<SymbolicValue> {
        Self::make_binary(left, right, |left, right| Expression::Add { left, right })
    }

    /// Creates "left - right".
    pub fn make_sub(left: Rc<SymbolicValue>, right: Rc<SymbolicValue>) -> Rc<SymbolicValue> {
        Self::make_binary(left, right, |left, right| Expression::Sub { left, right })
    }

    /// Creates "left * right".
    pub fn make_mul(left: Rc<SymbolicValue>, right: Rc<SymbolicValue>) -> Rc<SymbolicValue> {
        Self::make_binary(left, right, |left, right| Expression::Mul { left, right })
    }

    /// Creates "left / right".
    pub fn make_div(left: Rc<SymbolicValue>, right: Rc<SymbolicValue>) -> Rc<SymbolicValue> {
        Self::make_binary(left, right, |left, right| Expression::Div { left, right })
    }

    /// Creates "left % right".
    pub fn make_rem(left: Rc<SymbolicValue>, right: Rc<SymbolicValue>) -> Rc<SymbolicValue> {
        Self::make_binary(left, right, |left, right| Expression::Rem { left, right })
    }

    /// Creates "left & right".
    pub fn make_bit_and(left: Rc<SymbolicValue>, right: Rc<SymbolicValue>) -> Rc<SymbolicValue> {
        Self::make_binary(left, right, |left, right| Expression::BitAnd { left, right })
    }

    /// Creates "left | right".
    pub fn make_bit_or(left: Rc<SymbolicValue>, right: Rc<SymbolicValue>) -> Rc<SymbolicValue> {
        Self::make_binary(left, right, |left, right| Expression::BitOr { left, right })
    }

    /// Creates "left ^ right".
    pub fn make_bit_xor(left: Rc<SymbolicValue>, right: Rc<SymbolicValue>) -> Rc<SymbolicValue> {
        Self::make_binary(left, right, |left, right| Expression::BitXor { left, right })
    }

    /// Creates "left << right".
    pub fn make_shl(left: Rc<SymbolicValue>, right: Rc<SymbolicValue>) -> Rc<SymbolicValue> {
        Self::make_binary(left, right, |left, right| Expression::Shl { left, right })
    }

    /// Creates "left >> right".
    pub fn make_shr(left: Rc<SymbolicValue>, right: Rc<SymbolicValue>) -> Rc<SymbolicValue> {
        Self::make_binary(left, right, |left, right| Expression::Shr { left, right })
    }

    /// Creates "left && right".
    pub fn make_and(left: Rc<SymbolicValue>, right: Rc<SymbolicValue>) -> Rc<SymbolicValue> {
        Self::make_boolean_binary(left, right, |left, right| Expression::And { left, right })
    }

    /// Creates "left || right".
    pub fn make_or(left: Rc<SymbolicValue>, right: Rc<SymbolicValue>) -> Rc<SymbolicValue> {
        Self::make_boolean_binary(left, right, |left, right| Expression::Or { left, right })
    }

    /// Creates "left == right".
    pub fn make_equals(left: Rc<SymbolicValue>, right: Rc<SymbolicValue>) -> Rc<SymbolicValue> {
        Self::make_boolean_binary(left, right, |left, right| Expression::Equals { left, right })
    }

    /// Creates "left != right".
    pub fn make_not_equals(left: Rc<SymbolicValue>, right: Rc<SymbolicValue>) -> Rc<SymbolicValue> {
        Self::make_boolean_binary(left, right, |left, right| Expression::NotEquals {
            left,
            right,
        })
    }

    /// Creates "left < right".
    pub fn make_less_than(left: Rc<SymbolicValue>, right: Rc<SymbolicValue>) -> Rc<SymbolicValue> {
        Self::make_boolean_binary(left, right, |left, right| Expression::LessThan {
            left,
            right,
        })
    }

    /// Creates "left <= right".
    pub fn make_less_or_equal(
        left: Rc<SymbolicValue>,
        right: Rc<SymbolicValue>,
    ) -> Rc<SymbolicValue> {
        Self::make_boolean_binary(left, right, |left, right| Expression::LessOrEqual {
            left,
            right,
        })
    }

    /// Creates "left > right".
    pub fn make_greater_than(
        left: Rc<SymbolicValue>,
        right: Rc<SymbolicValue>,
    ) -> Rc<SymbolicValue> {
        Self::make_boolean_binary(left, right, |left, right| Expression::GreaterThan {
            left,
            right,
        })
    }

    /// Creates "left >= right".
    pub fn make_greater_or_equal(
        left: Rc<SymbolicValue>,
        right: Rc<SymbolicValue>,
    ) -> Rc<SymbolicValue> {
        Self::make_boolean_binary(left, right, |left, right| Expression::GreaterOrEqual {
            left,
            right,
        })
    }

    /// Creates "-operand".
    pub fn make_neg(operand: Rc<SymbolicValue>) -> Rc<SymbolicValue> {
        let ty = operand.ty.clone();
        Self::make_from(Expression::Neg { operand }, ty)
    }

    /// Creates the complement of the operand.
    pub fn make_not(operand: Rc<SymbolicValue>) -> Rc<SymbolicValue> {
        let ty = operand.ty.clone();
        Self::make_from(Expression::Not { operand }, ty)
    }

    /// Creates "operand as target_type".
    pub fn make_cast(
        operand: Rc<SymbolicValue>,
        target_type: ExpressionType,
    ) -> Rc<SymbolicValue> {
        Self::make_from(Expression::Cast { operand }, target_type)
    }

    /// Creates a structure aggregate from its flattened component values.
    pub fn make_struct(components: Vec<Rc<SymbolicValue>>) -> Rc<SymbolicValue> {
        Self::make_from(
            Expression::StructAggregate { components },
            ExpressionType::NonPrimitive,
        )
    }

    /// Creates a list aggregate from its component values.
    pub fn make_list(components: Vec<Rc<SymbolicValue>>) -> Rc<SymbolicValue> {
        Self::make_from(
            Expression::ListAggregate { components },
            ExpressionType::NonPrimitive,
        )
    }

    /// Creates "condition ? consequent : alternate".
    pub fn make_conditional(
        condition: Rc<SymbolicValue>,
        consequent: Rc<SymbolicValue>,
        alternate: Rc<SymbolicValue>,
    ) -> Rc<SymbolicValue> {
        let ty = consequent.ty.clone();
        Self::make_from(
            Expression::ConditionalExpression {
                condition,
                consequent,
                alternate,
            },
            ty,
        )
    }

    /// Creates a binary expression typed like its left operand.
    fn make_binary(
        left: Rc<SymbolicValue>,
        right: Rc<SymbolicValue>,
        operation: fn(Rc<SymbolicValue>, Rc<SymbolicValue>) -> Expression,
    ) -> Rc<SymbolicValue> {
        let ty = left.ty.clone();
        Self::make_from(operation(left, right), ty)
    }

    /// Creates a Boolean-typed binary expression.
    fn make_boolean_binary(
        left: Rc<SymbolicValue>,
        right: Rc<SymbolicValue>,
        operation: fn(Rc<SymbolicValue>, Rc<SymbolicValue>) -> Expression,
    ) -> Rc<SymbolicValue> {
        Self::make_from(operation(left, right), ExpressionType::Bool)
    }
}

/// Queries
impl SymbolicValue {
    /// The width in bits of this value's type.
    pub fn width(&self) -> u32 {
        self.ty.bit_length()
    }

    /// Returns the value as a bit index if it is a small enough compile time
    /// constant, and None otherwise.
    pub fn as_bit_index(&self) -> Option<u32> {
        match &self.expression {
            Expression::CompileTimeConstant(constant) => constant.as_bit_index(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants_truncate_to_their_type_width() {
        let value = SymbolicValue::make_u128(ExpressionType::bits(8), 0x1FF);
        assert_eq!(*value, *SymbolicValue::make_u128(ExpressionType::bits(8), 0xFF));
    }

    #[test]
    fn test_concat_is_typed_with_the_summed_width() {
        let left = SymbolicValue::make_u128(ExpressionType::bits(8), 1);
        let right = SymbolicValue::make_u128(ExpressionType::bits(4), 2);
        let concat = SymbolicValue::make_concat(left, right);
        assert_eq!(concat.width(), 12);
    }

    #[test]
    fn test_slice_bounds_are_constant_indices() {
        let base = SymbolicValue::make_u128(ExpressionType::bits(16), 0xABCD);
        let slice = SymbolicValue::make_slice(base, 7, 4);
        assert_eq!(slice.width(), 4);
        if let Expression::Slice { high, low, .. } = &slice.expression {
            assert_eq!(high.as_bit_index(), Some(7));
            assert_eq!(low.as_bit_index(), Some(4));
        } else {
            panic!("expected a slice expression");
        }
    }

    #[test]
    fn test_comparisons_are_boolean_typed() {
        let left = SymbolicValue::make_u128(ExpressionType::bits(8), 1);
        let right = SymbolicValue::make_u128(ExpressionType::bits(8), 2);
        assert_eq!(SymbolicValue::make_less_than(left, right).ty, ExpressionType::Bool);
    }

    #[test]
    fn test_values_round_trip_through_serde() {
        let value = SymbolicValue::make_concat(
            SymbolicValue::make_from(Expression::TaintMarker, ExpressionType::bits(8)),
            SymbolicValue::make_u128(ExpressionType::bits(8), 0xAB),
        );
        let serialized = serde_json::to_string(&value).expect("values serialize");
        let deserialized: SymbolicValue =
            serde_json::from_str(&serialized).expect("values deserialize");
        assert_eq!(deserialized, *value);
    }
}
