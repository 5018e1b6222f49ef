// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

use crate::constant_domain::ConstantDomain;
use crate::environment::Environment;
use crate::expression::Expression;
use crate::mask_builder::MaskBuilder;
use crate::model::Model;
use crate::path::Path;
use crate::symbolic_value::SymbolicValue;
use crate::taint_domain::TaintDomain;
use crate::taint_propagator::TaintPropagator;
use crate::variables::TaintMarkerCache;

use log_derive::logfn_inputs;
use std::rc::Rc;
use thiserror::Error;

/// The ways a taint pass can fail. All of these are internal invariant
/// violations: an earlier desugaring or typing stage failed to uphold its
/// contract, so the current test-generation attempt is aborted with a
/// diagnostic and there is no retry or degraded result.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum TaintError {
    /// A reference that should be bound at this program point is not.
    #[error("unresolved reference `{reference}` in the symbolic environment")]
    UnresolvedReference { reference: String },

    /// An expression kind outside the closed grammar of the pass reached it.
    #[error("{pass} is unsupported for {kind} expression `{expression}`")]
    UnsupportedNode {
        pass: &'static str,
        kind: &'static str,
        expression: String,
    },

    /// A slice or shift bound that must be a compile time constant is not.
    #[error("slice or shift bound `{expression}` is not a usable compile time constant")]
    NonConstantBound { expression: String },
}

impl TaintError {
    fn unresolved(path: &Rc<Path>) -> TaintError {
        TaintError::UnresolvedReference {
            reference: format!("{:?}", path),
        }
    }

    pub(crate) fn unresolved_variable(name: &str) -> TaintError {
        TaintError::UnresolvedReference {
            reference: String::from(name),
        }
    }

    pub(crate) fn unsupported(pass: &'static str, value: &SymbolicValue) -> TaintError {
        TaintError::UnsupportedNode {
            pass,
            kind: value.expression.kind_name(),
            expression: format!("{:?}", value),
        }
    }

    fn non_constant_bound(value: &SymbolicValue) -> TaintError {
        TaintError::NonConstantBound {
            expression: format!("{:?}", value),
        }
    }
}

/// Looks the path up in the environment. Every reference reachable from a
/// live program point has a binding, so a miss is fatal.
pub(crate) fn resolve(
    environment: &Environment,
    path: &Rc<Path>,
) -> Result<Rc<SymbolicValue>, TaintError> {
    environment
        .value_at(path)
        .cloned()
        .ok_or_else(|| TaintError::unresolved(path))
}

/// Extracts the constant bounds of a slice, checking that they describe a
/// non-empty bit range.
pub(crate) fn constant_slice_bounds(
    high: &Rc<SymbolicValue>,
    low: &Rc<SymbolicValue>,
) -> Result<(u32, u32), TaintError> {
    let high_index = high
        .as_bit_index()
        .ok_or_else(|| TaintError::non_constant_bound(high))?;
    let low_index = low
        .as_bit_index()
        .ok_or_else(|| TaintError::non_constant_bound(low))?;
    if high_index < low_index {
        return Err(TaintError::NonConstantBound {
            expression: format!("{:?}:{:?}", high, low),
        });
    }
    Ok((high_index, low_index))
}

/// Returns the set of bit positions of the expression value that are
/// unconstrained by the path condition.
#[logfn_inputs(TRACE)]
pub fn tainted_bits(
    environment: &Environment,
    expr: &Rc<SymbolicValue>,
) -> Result<TaintDomain, TaintError> {
    match &expr.expression {
        Expression::StateVariable { path } => {
            tainted_bits(environment, &resolve(environment, path)?)
        }
        // A solver-bound value is not taint: the model pins it down.
        Expression::SymbolicVariable { .. } => Ok(TaintDomain::empty()),
        Expression::TaintMarker => Ok(TaintDomain::for_width(expr.width())),
        Expression::Concat { left, right } => {
            let left_taint = tainted_bits(environment, left)?;
            let right_taint = tainted_bits(environment, right)?;
            Ok(left_taint.shift_left(right.width()).union(&right_taint))
        }
        Expression::Slice { base, high, low } => {
            let (high, low) = constant_slice_bounds(high, low)?;
            Ok(tainted_bits(environment, base)?.slice(low, high - low + 1))
        }
        Expression::Shl { left, right } => match right.as_bit_index() {
            Some(shift) => Ok(tainted_bits(environment, left)?
                .shift_left(shift)
                .truncated_to(expr.width())),
            // Unknown shift amounts can move any tainted bit anywhere.
            None => Ok(TaintDomain::for_width(expr.width())),
        },
        Expression::Shr { left, right } => match right.as_bit_index() {
            Some(shift) => Ok(tainted_bits(environment, left)?.shift_right(shift)),
            None => Ok(TaintDomain::for_width(expr.width())),
        },
        Expression::BitAnd { left, right }
        | Expression::BitOr { left, right }
        | Expression::BitXor { left, right } => {
            // Bitwise operations cannot taint other bits than those tainted
            // in either operand.
            Ok(tainted_bits(environment, left)?.union(&tainted_bits(environment, right)?))
        }
        Expression::Add { left, right }
        | Expression::Sub { left, right }
        | Expression::Mul { left, right }
        | Expression::Div { left, right }
        | Expression::Rem { left, right }
        | Expression::And { left, right }
        | Expression::Or { left, right }
        | Expression::Equals { left, right }
        | Expression::NotEquals { left, right }
        | Expression::LessThan { left, right }
        | Expression::LessOrEqual { left, right }
        | Expression::GreaterThan { left, right }
        | Expression::GreaterOrEqual { left, right } => {
            // A single tainted bit can overflow or underflow the operation
            // and so reach any bit of the result.
            let left_taint = tainted_bits(environment, left)?;
            let right_taint = tainted_bits(environment, right)?;
            if left_taint.is_empty() && right_taint.is_empty() {
                Ok(TaintDomain::empty())
            } else {
                Ok(TaintDomain::for_width(expr.width()))
            }
        }
        Expression::Neg { operand } | Expression::Not { operand } => {
            tainted_bits(environment, operand)
        }
        Expression::Cast { operand } => tainted_bits(environment, operand),
        Expression::CompileTimeConstant(..) | Expression::DefaultValue => Ok(TaintDomain::empty()),
        Expression::StructAggregate { .. }
        | Expression::ListAggregate { .. }
        | Expression::ConditionalExpression { .. } => {
            Err(TaintError::unsupported("taint classification", expr))
        }
    }
}

/// Returns true if any bit of the expression value is unconstrained by the
/// path condition.
#[logfn_inputs(TRACE)]
pub fn has_taint(environment: &Environment, expr: &Rc<SymbolicValue>) -> Result<bool, TaintError> {
    match &expr.expression {
        Expression::TaintMarker => Ok(true),
        Expression::SymbolicVariable { .. } => Ok(false),
        Expression::StateVariable { path } => {
            has_taint(environment, &resolve(environment, path)?)
        }
        Expression::StructAggregate { components }
        | Expression::ListAggregate { components } => {
            for component in components {
                if has_taint(environment, component)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        Expression::Concat { left, right }
        | Expression::Add { left, right }
        | Expression::Sub { left, right }
        | Expression::Mul { left, right }
        | Expression::Div { left, right }
        | Expression::Rem { left, right }
        | Expression::And { left, right }
        | Expression::Or { left, right }
        | Expression::BitAnd { left, right }
        | Expression::BitOr { left, right }
        | Expression::BitXor { left, right }
        | Expression::Shl { left, right }
        | Expression::Shr { left, right }
        | Expression::Equals { left, right }
        | Expression::NotEquals { left, right }
        | Expression::LessThan { left, right }
        | Expression::LessOrEqual { left, right }
        | Expression::GreaterThan { left, right }
        | Expression::GreaterOrEqual { left, right } => {
            Ok(has_taint(environment, left)? || has_taint(environment, right)?)
        }
        Expression::Neg { operand } | Expression::Not { operand } | Expression::Cast { operand } => {
            has_taint(environment, operand)
        }
        Expression::CompileTimeConstant(..) | Expression::DefaultValue => Ok(false),
        Expression::Slice { base, high, low } => {
            // The one arm defined in terms of the bit-level classifier; the
            // remaining arms recurse independently of it.
            let (high, low) = constant_slice_bounds(high, low)?;
            let taint = tainted_bits(environment, base)?;
            Ok(!taint
                .intersection(&TaintDomain::for_range(low, high - low + 1))
                .is_empty())
        }
        Expression::ConditionalExpression { .. } => {
            Err(TaintError::unsupported("taint checking", expr))
        }
    }
}

/// Rewrites the expression into the deterministically evaluable form that
/// preserves taint markers, using the environment for taint queries and the
/// cache for marker allocation.
#[logfn_inputs(TRACE)]
pub fn propagate_taint(
    environment: &Environment,
    markers: &TaintMarkerCache,
    expr: &Rc<SymbolicValue>,
) -> Result<Rc<SymbolicValue>, TaintError> {
    TaintPropagator::new(environment, markers).visit(expr)
}

/// Rewrites an expression into a pure literal-valued mask expression: ones
/// where the value is exact, zeros where it is a don't-care.
#[logfn_inputs(TRACE)]
pub fn build_mask(expr: &Rc<SymbolicValue>) -> Rc<SymbolicValue> {
    MaskBuilder::new().visit(expr)
}

/// Computes the concrete mask literal for the given expression, typically an
/// egress packet payload: taint is propagated, the propagated form is turned
/// into a mask expression, and the completed model reduces that to a single
/// literal whose zero bits mark don't-care positions.
#[logfn_inputs(TRACE)]
pub fn build_taint_mask(
    environment: &Environment,
    markers: &TaintMarkerCache,
    model: &Model,
    expr: &Rc<SymbolicValue>,
) -> Result<ConstantDomain, TaintError> {
    let propagated = propagate_taint(environment, markers, expr)?;
    debug!("propagated form of {:?} is {:?}", expr, propagated);
    let mask = build_mask(&propagated);
    model.evaluate(&mask)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::ExpressionType;
    use crate::variables::{make_state_variable, make_symbolic_variable};

    fn marker(width: u32) -> Rc<SymbolicValue> {
        SymbolicValue::make_from(Expression::TaintMarker, ExpressionType::bits(width))
    }

    fn constant(width: u32, value: u128) -> Rc<SymbolicValue> {
        SymbolicValue::make_u128(ExpressionType::bits(width), value)
    }

    #[test]
    fn test_literals_and_defaults_are_untainted() {
        let environment = Environment::new();
        let literal = constant(8, 0xAB);
        assert!(tainted_bits(&environment, &literal).unwrap().is_empty());
        assert!(!has_taint(&environment, &literal).unwrap());
        let default =
            SymbolicValue::make_from(Expression::DefaultValue, ExpressionType::bits(8));
        assert!(tainted_bits(&environment, &default).unwrap().is_empty());
        assert!(!has_taint(&environment, &default).unwrap());
    }

    #[test]
    fn test_symbolic_variables_are_untainted() {
        let environment = Environment::new();
        let variable = make_symbolic_variable("ingress_port", 0, ExpressionType::bits(9));
        assert!(tainted_bits(&environment, &variable).unwrap().is_empty());
        assert!(!has_taint(&environment, &variable).unwrap());
    }

    #[test]
    fn test_markers_taint_their_full_width() {
        let environment = Environment::new();
        let taint = tainted_bits(&environment, &marker(8)).unwrap();
        assert_eq!(taint, TaintDomain::for_width(8));
        assert!(has_taint(&environment, &marker(8)).unwrap());
    }

    #[test]
    fn test_concat_shifts_left_operand_taint_into_the_high_bits() {
        let environment = Environment::new();
        // Bit 0 of the left operand is tainted; the right operand is clean.
        let left = SymbolicValue::make_concat(constant(3, 0), marker(1));
        let concat = SymbolicValue::make_concat(left, constant(4, 0));
        let taint = tainted_bits(&environment, &concat).unwrap();
        assert_eq!(taint, TaintDomain::for_range(4, 1));
    }

    #[test]
    fn test_bitwise_operators_take_the_union() {
        let environment = Environment::new();
        let left = SymbolicValue::make_concat(marker(4), constant(4, 0));
        let right = SymbolicValue::make_concat(constant(4, 0), marker(4));
        let anded = SymbolicValue::make_bit_and(left, right);
        let taint = tainted_bits(&environment, &anded).unwrap();
        assert_eq!(taint, TaintDomain::for_width(8));
    }

    #[test]
    fn test_constant_shifts_move_the_taint_set() {
        let environment = Environment::new();
        // An 8-bit value whose bit 0 is tainted.
        let low_bit_tainted = SymbolicValue::make_concat(constant(7, 0), marker(1));
        let shifted =
            SymbolicValue::make_shl(low_bit_tainted.clone(), constant(8, 4));
        assert_eq!(
            tainted_bits(&environment, &shifted).unwrap(),
            TaintDomain::for_range(4, 1)
        );
        let shifted_out = SymbolicValue::make_shl(low_bit_tainted, constant(8, 8));
        assert!(tainted_bits(&environment, &shifted_out).unwrap().is_empty());
    }

    #[test]
    fn test_marker_shifted_left_truncates_at_the_result_width() {
        let environment = Environment::new();
        let shifted = SymbolicValue::make_shl(marker(8), constant(8, 4));
        assert_eq!(
            tainted_bits(&environment, &shifted).unwrap(),
            TaintDomain::for_range(4, 4)
        );
    }

    #[test]
    fn test_non_constant_shift_amounts_taint_the_full_width() {
        let environment = Environment::new();
        let amount = make_symbolic_variable("shift", 0, ExpressionType::bits(8));
        let shifted = SymbolicValue::make_shl(constant(8, 1), amount);
        assert_eq!(
            tainted_bits(&environment, &shifted).unwrap(),
            TaintDomain::for_width(8)
        );
    }

    #[test]
    fn test_arithmetic_is_all_or_nothing() {
        let environment = Environment::new();
        let clean = SymbolicValue::make_add(constant(8, 1), constant(8, 2));
        assert!(tainted_bits(&environment, &clean).unwrap().is_empty());
        let tainted = SymbolicValue::make_add(
            constant(8, 1),
            SymbolicValue::make_concat(constant(7, 0), marker(1)),
        );
        assert_eq!(
            tainted_bits(&environment, &tainted).unwrap(),
            TaintDomain::for_width(8)
        );
    }

    #[test]
    fn test_slice_taint_is_rebased_to_the_slice() {
        let environment = Environment::new();
        // Bits [7:4] tainted, bits [3:0] clean.
        let value = SymbolicValue::make_concat(marker(4), constant(4, 0));
        let high_nibble = SymbolicValue::make_slice(value.clone(), 7, 4);
        assert_eq!(
            tainted_bits(&environment, &high_nibble).unwrap(),
            TaintDomain::for_width(4)
        );
        assert!(has_taint(&environment, &high_nibble).unwrap());
        let low_nibble = SymbolicValue::make_slice(value, 3, 0);
        assert!(tainted_bits(&environment, &low_nibble).unwrap().is_empty());
        assert!(!has_taint(&environment, &low_nibble).unwrap());
    }

    #[test]
    fn test_state_variables_resolve_through_the_environment() {
        let mut environment = Environment::new();
        let path = Path::new_field(Path::new_root("hdr"), "payload");
        environment.update_value_at(path.clone(), marker(8));
        let reference = make_state_variable(path, ExpressionType::bits(8));
        assert_eq!(
            tainted_bits(&environment, &reference).unwrap(),
            TaintDomain::for_width(8)
        );
        assert!(has_taint(&environment, &reference).unwrap());
    }

    #[test]
    fn test_unresolved_references_are_fatal() {
        let environment = Environment::new();
        let reference = make_state_variable(
            Path::new_field(Path::new_root("hdr"), "missing"),
            ExpressionType::bits(8),
        );
        let result = tainted_bits(&environment, &reference);
        assert!(matches!(
            result,
            Err(TaintError::UnresolvedReference { .. })
        ));
        let rendered = result.unwrap_err().to_string();
        assert!(rendered.contains("hdr.missing"));
    }

    #[test]
    fn test_non_constant_slice_bounds_are_fatal() {
        let environment = Environment::new();
        let bound = make_symbolic_variable("bound", 0, ExpressionType::bits(8));
        let slice = SymbolicValue::make_from(
            Expression::Slice {
                base: constant(8, 0xAB),
                high: bound.clone(),
                low: constant(32, 0),
            },
            ExpressionType::bits(8),
        );
        assert!(matches!(
            has_taint(&environment, &slice),
            Err(TaintError::NonConstantBound { .. })
        ));
        assert!(matches!(
            tainted_bits(&environment, &slice),
            Err(TaintError::NonConstantBound { .. })
        ));
    }

    #[test]
    fn test_aggregates_are_tainted_iff_any_component_is() {
        let environment = Environment::new();
        let clean = SymbolicValue::make_struct(vec![constant(8, 1), constant(8, 2)]);
        assert!(!has_taint(&environment, &clean).unwrap());
        let dirty = SymbolicValue::make_list(vec![constant(8, 1), marker(8)]);
        assert!(has_taint(&environment, &dirty).unwrap());
        // The bit-level classifier has no aggregate layout to work with.
        assert!(matches!(
            tainted_bits(&environment, &dirty),
            Err(TaintError::UnsupportedNode { .. })
        ));
    }

    #[test]
    fn test_conditionals_are_outside_the_closed_grammar() {
        let environment = Environment::new();
        let conditional = SymbolicValue::make_conditional(
            SymbolicValue::make_bool(true),
            constant(8, 1),
            constant(8, 2),
        );
        let result = has_taint(&environment, &conditional);
        assert!(matches!(result, Err(TaintError::UnsupportedNode { .. })));
        let rendered = result.unwrap_err().to_string();
        assert!(rendered.contains("ConditionalExpression"));
    }
}
