// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

use crate::expression::Expression;
use crate::symbolic_value::SymbolicValue;

use log_derive::logfn_inputs;
use std::rc::Rc;

/// Rewrites a taint-propagated expression into a pure literal-valued mask
/// expression. In the result a one bit means the position must match the
/// expected output exactly and a zero bit means the position is a
/// don't-care. The rewrite cannot fail: it only swaps leaves and rebuilds
/// interior nodes around the rewritten children.
#[derive(Debug, Default)]
pub struct MaskBuilder;

impl MaskBuilder {
    pub fn new() -> MaskBuilder {
        MaskBuilder
    }

    #[logfn_inputs(TRACE)]
    pub fn visit(&self, value: &Rc<SymbolicValue>) -> Rc<SymbolicValue> {
        match &value.expression {
            // A resolved reference denotes a concrete, fully known value, so
            // every one of its bits must match.
            Expression::StateVariable { .. } => SymbolicValue::make_max_value(&value.ty),

            // A marker stands for a wholly unconstrained value: all of its
            // bits are don't-cares.
            Expression::TaintMarker => SymbolicValue::make_default_value(&value.ty),

            // Literals are never taint sources; once masked they contribute
            // only known bits.
            Expression::CompileTimeConstant(constant) => {
                if constant.is_max_value() {
                    value.clone()
                } else {
                    SymbolicValue::make_max_value(&value.ty)
                }
            }

            Expression::DefaultValue | Expression::SymbolicVariable { .. } => value.clone(),

            Expression::Concat { left, right } => {
                SymbolicValue::make_concat(self.visit(left), self.visit(right))
            }

            // The bounds are indices rather than maskable values, so they
            // are carried over verbatim.
            Expression::Slice { base, high, low } => SymbolicValue::make_from(
                Expression::Slice {
                    base: self.visit(base),
                    high: high.clone(),
                    low: low.clone(),
                },
                value.ty.clone(),
            ),

            Expression::Add { left, right } => self.rebuild(value, left, right, |left, right| {
                Expression::Add { left, right }
            }),
            Expression::Sub { left, right } => self.rebuild(value, left, right, |left, right| {
                Expression::Sub { left, right }
            }),
            Expression::Mul { left, right } => self.rebuild(value, left, right, |left, right| {
                Expression::Mul { left, right }
            }),
            Expression::Div { left, right } => self.rebuild(value, left, right, |left, right| {
                Expression::Div { left, right }
            }),
            Expression::Rem { left, right } => self.rebuild(value, left, right, |left, right| {
                Expression::Rem { left, right }
            }),
            Expression::And { left, right } => self.rebuild(value, left, right, |left, right| {
                Expression::And { left, right }
            }),
            Expression::Or { left, right } => self.rebuild(value, left, right, |left, right| {
                Expression::Or { left, right }
            }),
            Expression::BitAnd { left, right } => self
                .rebuild(value, left, right, |left, right| Expression::BitAnd {
                    left,
                    right,
                }),
            Expression::BitOr { left, right } => self
                .rebuild(value, left, right, |left, right| Expression::BitOr {
                    left,
                    right,
                }),
            Expression::BitXor { left, right } => self
                .rebuild(value, left, right, |left, right| Expression::BitXor {
                    left,
                    right,
                }),
            Expression::Shl { left, right } => self.rebuild(value, left, right, |left, right| {
                Expression::Shl { left, right }
            }),
            Expression::Shr { left, right } => self.rebuild(value, left, right, |left, right| {
                Expression::Shr { left, right }
            }),
            Expression::Equals { left, right } => self
                .rebuild(value, left, right, |left, right| Expression::Equals {
                    left,
                    right,
                }),
            Expression::NotEquals { left, right } => self
                .rebuild(value, left, right, |left, right| Expression::NotEquals {
                    left,
                    right,
                }),
            Expression::LessThan { left, right } => self
                .rebuild(value, left, right, |left, right| Expression::LessThan {
                    left,
                    right,
                }),
            Expression::LessOrEqual { left, right } => self
                .rebuild(value, left, right, |left, right| Expression::LessOrEqual {
                    left,
                    right,
                }),
            Expression::GreaterThan { left, right } => self
                .rebuild(value, left, right, |left, right| Expression::GreaterThan {
                    left,
                    right,
                }),
            Expression::GreaterOrEqual { left, right } => {
                self.rebuild(value, left, right, |left, right| {
                    Expression::GreaterOrEqual { left, right }
                })
            }

            Expression::Neg { operand } => SymbolicValue::make_from(
                Expression::Neg {
                    operand: self.visit(operand),
                },
                value.ty.clone(),
            ),
            Expression::Not { operand } => SymbolicValue::make_from(
                Expression::Not {
                    operand: self.visit(operand),
                },
                value.ty.clone(),
            ),
            Expression::Cast { operand } => SymbolicValue::make_from(
                Expression::Cast {
                    operand: self.visit(operand),
                },
                value.ty.clone(),
            ),

            Expression::StructAggregate { components } => SymbolicValue::make_from(
                Expression::StructAggregate {
                    components: components.iter().map(|c| self.visit(c)).collect(),
                },
                value.ty.clone(),
            ),
            Expression::ListAggregate { components } => SymbolicValue::make_from(
                Expression::ListAggregate {
                    components: components.iter().map(|c| self.visit(c)).collect(),
                },
                value.ty.clone(),
            ),

            Expression::ConditionalExpression {
                condition,
                consequent,
                alternate,
            } => SymbolicValue::make_from(
                Expression::ConditionalExpression {
                    condition: self.visit(condition),
                    consequent: self.visit(consequent),
                    alternate: self.visit(alternate),
                },
                value.ty.clone(),
            ),
        }
    }

    /// Rebuilds a binary node around its rewritten operands, keeping the
    /// node's own type.
    fn rebuild(
        &self,
        value: &Rc<SymbolicValue>,
        left: &Rc<SymbolicValue>,
        right: &Rc<SymbolicValue>,
        operation: fn(Rc<SymbolicValue>, Rc<SymbolicValue>) -> Expression,
    ) -> Rc<SymbolicValue> {
        SymbolicValue::make_from(
            operation(self.visit(left), self.visit(right)),
            value.ty.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::ExpressionType;
    use crate::path::Path;
    use crate::variables::make_state_variable;

    fn marker(width: u32) -> Rc<SymbolicValue> {
        SymbolicValue::make_from(Expression::TaintMarker, ExpressionType::bits(width))
    }

    fn constant(width: u32, value: u128) -> Rc<SymbolicValue> {
        SymbolicValue::make_u128(ExpressionType::bits(width), value)
    }

    #[test]
    fn test_markers_mask_to_all_zeros() {
        let mask = MaskBuilder::new().visit(&marker(8));
        assert_eq!(
            *mask,
            *SymbolicValue::make_default_value(&ExpressionType::bits(8))
        );
    }

    #[test]
    fn test_state_variables_mask_to_all_ones() {
        let reference = make_state_variable(
            Path::new_field(Path::new_root("hdr"), "dst"),
            ExpressionType::bits(48),
        );
        let mask = MaskBuilder::new().visit(&reference);
        assert_eq!(
            *mask,
            *SymbolicValue::make_max_value(&ExpressionType::bits(48))
        );
    }

    #[test]
    fn test_literals_mask_to_all_ones_and_maximal_literals_survive() {
        let builder = MaskBuilder::new();
        assert_eq!(
            *builder.visit(&constant(8, 0xAB)),
            *SymbolicValue::make_max_value(&ExpressionType::bits(8))
        );
        let max = SymbolicValue::make_max_value(&ExpressionType::bits(8));
        assert!(Rc::ptr_eq(&builder.visit(&max), &max));
    }

    #[test]
    fn test_interior_nodes_are_rebuilt_around_masked_leaves() {
        let concat = SymbolicValue::make_concat(marker(8), constant(8, 0xAB));
        let mask = MaskBuilder::new().visit(&concat);
        match &mask.expression {
            Expression::Concat { left, right } => {
                assert_eq!(
                    **left,
                    *SymbolicValue::make_default_value(&ExpressionType::bits(8))
                );
                assert_eq!(
                    **right,
                    *SymbolicValue::make_max_value(&ExpressionType::bits(8))
                );
            }
            _ => panic!("expected the concat structure to survive"),
        }
    }

    #[test]
    fn test_slice_bounds_are_not_masked() {
        let slice = SymbolicValue::make_slice(constant(16, 0xABCD), 7, 4);
        let mask = MaskBuilder::new().visit(&slice);
        match &mask.expression {
            Expression::Slice { high, low, .. } => {
                assert_eq!(high.as_bit_index(), Some(7));
                assert_eq!(low.as_bit_index(), Some(4));
            }
            _ => panic!("expected the slice structure to survive"),
        }
    }
}
