// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

use crate::constant_domain::ConstantDomain;
use crate::expression::Expression;
use crate::symbolic_value::SymbolicValue;
use crate::taint::{self, TaintError};

use log_derive::logfn_inputs;
use std::collections::HashMap;
use std::rc::Rc;

/// A completed model: the assignment the constraint solver chose for every
/// symbolic variable of an explored path, together with an evaluator that
/// reduces a closed expression to a single literal. Evaluation is total and
/// deterministic over the marker-free grammar the mask builder produces;
/// anything else is an internal invariant violation.
#[derive(Clone, Debug, Default)]
pub struct Model {
    assignment: HashMap<String, ConstantDomain>,
}

impl Model {
    pub fn new() -> Model {
        Model::default()
    }

    /// Records the solver's value for the named symbolic variable.
    pub fn bind(&mut self, name: &str, value: ConstantDomain) {
        self.assignment.insert(String::from(name), value);
    }

    /// Returns the solver's value for the named symbolic variable, if any.
    pub fn value_for(&self, name: &str) -> Option<&ConstantDomain> {
        self.assignment.get(name)
    }

    /// Reduces a closed expression to a concrete literal.
    #[logfn_inputs(TRACE)]
    pub fn evaluate(&self, value: &Rc<SymbolicValue>) -> Result<ConstantDomain, TaintError> {
        let result = match &value.expression {
            Expression::CompileTimeConstant(constant) => constant.clone(),
            Expression::DefaultValue => ConstantDomain::default_for_type(&value.ty),
            Expression::SymbolicVariable { name } => self
                .assignment
                .get(name.as_str())
                .cloned()
                .ok_or_else(|| TaintError::unresolved_variable(name))?,
            Expression::Concat { left, right } => {
                self.evaluate(left)?.concat(&self.evaluate(right)?)
            }
            Expression::Slice { base, high, low } => {
                let (high, low) = taint::constant_slice_bounds(high, low)?;
                self.evaluate(base)?.slice(high, low)
            }
            Expression::Add { left, right } => self.evaluate(left)?.add(&self.evaluate(right)?),
            Expression::Sub { left, right } => self.evaluate(left)?.sub(&self.evaluate(right)?),
            Expression::Mul { left, right } => self.evaluate(left)?.mul(&self.evaluate(right)?),
            Expression::Div { left, right } => self.evaluate(left)?.div(&self.evaluate(right)?),
            Expression::Rem { left, right } => self.evaluate(left)?.rem(&self.evaluate(right)?),
            Expression::And { left, right } => self.evaluate(left)?.and(&self.evaluate(right)?),
            Expression::Or { left, right } => self.evaluate(left)?.or(&self.evaluate(right)?),
            Expression::BitAnd { left, right } => {
                self.evaluate(left)?.bit_and(&self.evaluate(right)?)
            }
            Expression::BitOr { left, right } => {
                self.evaluate(left)?.bit_or(&self.evaluate(right)?)
            }
            Expression::BitXor { left, right } => {
                self.evaluate(left)?.bit_xor(&self.evaluate(right)?)
            }
            Expression::Shl { left, right } => self.evaluate(left)?.shl(&self.evaluate(right)?),
            Expression::Shr { left, right } => self.evaluate(left)?.shr(&self.evaluate(right)?),
            Expression::Equals { left, right } => {
                self.evaluate(left)?.equals(&self.evaluate(right)?)
            }
            Expression::NotEquals { left, right } => {
                self.evaluate(left)?.not_equals(&self.evaluate(right)?)
            }
            Expression::LessThan { left, right } => {
                self.evaluate(left)?.less_than(&self.evaluate(right)?)
            }
            Expression::LessOrEqual { left, right } => {
                self.evaluate(left)?.less_or_equal(&self.evaluate(right)?)
            }
            Expression::GreaterThan { left, right } => {
                self.evaluate(left)?.greater_than(&self.evaluate(right)?)
            }
            Expression::GreaterOrEqual { left, right } => {
                self.evaluate(left)?.greater_or_equal(&self.evaluate(right)?)
            }
            Expression::Neg { operand } => self.evaluate(operand)?.neg(),
            Expression::Not { operand } => self.evaluate(operand)?.not(),
            Expression::Cast { operand } => self.evaluate(operand)?.cast(&value.ty),
            Expression::ConditionalExpression {
                condition,
                consequent,
                alternate,
            } => match self.evaluate(condition)? {
                ConstantDomain::True => self.evaluate(consequent)?,
                ConstantDomain::False => self.evaluate(alternate)?,
                _ => ConstantDomain::Bottom,
            },
            Expression::TaintMarker
            | Expression::StateVariable { .. }
            | Expression::StructAggregate { .. }
            | Expression::ListAggregate { .. } => {
                return Err(TaintError::unsupported("model evaluation", value))
            }
        };
        if let ConstantDomain::Bottom = result {
            // A partial transfer function fired; the expression is outside
            // the evaluable grammar after all.
            Err(TaintError::unsupported("model evaluation", value))
        } else {
            Ok(result)
        }
    }
}
