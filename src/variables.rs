// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

use crate::expression::{Expression, ExpressionType};
use crate::path::Path;
use crate::symbolic_value::SymbolicValue;

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// The field name under which the validity bit of a header is tracked. The
/// leading character keeps it disjoint from any field name the interpreted
/// program can declare.
pub const VALIDITY_FIELD: &str = "*valid";

/// Returns a fresh solver variable of the given type. Each rebinding of the
/// same source-level name gets a new incarnation, so the solver sees one
/// immutable variable per assignment.
pub fn make_symbolic_variable(
    name: &str,
    incarnation: usize,
    ty: ExpressionType,
) -> Rc<SymbolicValue> {
    SymbolicValue::make_from(
        Expression::SymbolicVariable {
            name: Rc::new(format!("{}_{}", name, incarnation)),
        },
        ty,
    )
}

/// Returns a reference to the machine-state location the path denotes. The
/// reference resolves through the symbolic environment at analysis time.
pub fn make_state_variable(path: Rc<Path>, ty: ExpressionType) -> Rc<SymbolicValue> {
    SymbolicValue::make_from(Expression::StateVariable { path }, ty)
}

/// Returns a reference to the validity bit of the header the path denotes.
pub fn make_header_validity(header: &Rc<Path>) -> Rc<SymbolicValue> {
    make_state_variable(
        Path::new_field(header.clone(), VALIDITY_FIELD),
        ExpressionType::Bool,
    )
}

/// Interns taint markers for one test-generation session. Markers for
/// fixed-width types of at most 16 bits are shared by (width, signedness) to
/// bound allocation; wider markers and markers for variable-width types are
/// freshly allocated on every request, since their identity is not
/// meaningfully shared. The cache only grows, so scoping it to a session
/// rather than the process keeps long-lived hosts bounded. Interior
/// mutability keeps it single-threaded; give each worker its own cache.
#[derive(Debug, Default)]
pub struct TaintMarkerCache {
    markers: RefCell<HashMap<(u32, bool), Rc<SymbolicValue>>>,
}

impl TaintMarkerCache {
    pub fn new() -> TaintMarkerCache {
        TaintMarkerCache::default()
    }

    /// Returns a taint marker of the given type, interned when the type is a
    /// fixed-width vector of at most 16 bits.
    pub fn marker_for(&self, ty: &ExpressionType) -> Rc<SymbolicValue> {
        match ty {
            ExpressionType::Bits { width, signed } if *width <= 16 => self
                .markers
                .borrow_mut()
                .entry((*width, *signed))
                .or_insert_with(|| SymbolicValue::make_from(Expression::TaintMarker, ty.clone()))
                .clone(),
            _ => SymbolicValue::make_from(Expression::TaintMarker, ty.clone()),
        }
    }
}
