// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

use crate::environment::Environment;
use crate::expression::{Expression, ExpressionType};
use crate::symbolic_value::SymbolicValue;
use crate::taint::{self, TaintError};
use crate::variables::TaintMarkerCache;

use log_derive::logfn_inputs;
use std::rc::Rc;

/// Rewrites an expression bottom-up into a form the model can evaluate
/// deterministically while preserving taint markers as the payload for the
/// mask builder. The rewrite only has to keep track of which side of every
/// operation carries a marker, not of arithmetic meaning: wherever a value
/// is fully constrained its exact content no longer matters downstream.
#[derive(Debug)]
pub struct TaintPropagator<'a> {
    environment: &'a Environment,
    markers: &'a TaintMarkerCache,
}

impl<'a> TaintPropagator<'a> {
    pub fn new(environment: &'a Environment, markers: &'a TaintMarkerCache) -> TaintPropagator<'a> {
        TaintPropagator {
            environment,
            markers,
        }
    }

    #[logfn_inputs(TRACE)]
    pub fn visit(&self, value: &Rc<SymbolicValue>) -> Result<Rc<SymbolicValue>, TaintError> {
        match &value.expression {
            // Literals cannot carry taint.
            Expression::CompileTimeConstant(..) => Ok(value.clone()),

            // Markers are the payload this rewrite exists to preserve.
            Expression::TaintMarker => Ok(value.clone()),

            // A solver-bound variable is fully constrained once the model is
            // complete; any representable value works, so take the maximum.
            Expression::SymbolicVariable { .. } => Ok(SymbolicValue::make_max_value(&value.ty)),

            Expression::StateVariable { path } => {
                self.visit(&taint::resolve(self.environment, path)?)
            }

            // The operator is erased: only marker presence matters below.
            Expression::Neg { operand } | Expression::Not { operand } => self.visit(operand),

            Expression::Cast { operand } => {
                if taint::has_taint(self.environment, operand)? {
                    // Carry the marker-bearing operand over to the cast type.
                    let transformed = self.visit(operand)?;
                    Ok(SymbolicValue::make_from(
                        transformed.expression.clone(),
                        value.ty.clone(),
                    ))
                } else {
                    Ok(SymbolicValue::make_default_value(&value.ty))
                }
            }

            // Both sides are kept so the mask builder can size them
            // independently.
            Expression::Concat { left, right } => Ok(SymbolicValue::make_concat(
                self.visit(left)?,
                self.visit(right)?,
            )),

            // Evaluated before descending into the base: a tainted slice
            // collapses to a marker of the sliced width, an untainted one to
            // the zero literal of that width.
            Expression::Slice { high, low, .. } => {
                let (high, low) = taint::constant_slice_bounds(high, low)?;
                let sliced_type = ExpressionType::bits(high - low + 1);
                if taint::has_taint(self.environment, value)? {
                    Ok(self.markers.marker_for(&sliced_type))
                } else {
                    Ok(SymbolicValue::make_default_value(&sliced_type))
                }
            }

            // One operand suffices; prefer the right one whenever it carries
            // a marker so the choice is deterministic.
            Expression::Add { left, right }
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
                if taint::has_taint(self.environment, right)? {
                    self.visit(right)
                } else {
                    self.visit(left)
                }
            }

            // Conditionals must have been eliminated by the caller before
            // this pass runs.
            Expression::DefaultValue
            | Expression::StructAggregate { .. }
            | Expression::ListAggregate { .. }
            | Expression::ConditionalExpression { .. } => {
                Err(TaintError::unsupported("taint propagation", value))
            }
        }
    }
}
