// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

use crate::path::Path;
use crate::symbolic_value::SymbolicValue;

use rpds::HashTrieMap;
use std::fmt::{Debug, Formatter, Result};
use std::rc::Rc;

/// The symbolic environment of one explored program path: a persistent map
/// from state locations to the symbolic values currently bound to them. The
/// interpreter updates it as it steps through the program; the taint passes
/// only read it. Cloning is cheap, so each path explored from a branch point
/// can carry its own environment.
#[derive(Clone, Default, Eq, PartialEq)]
pub struct Environment {
    value_map: HashTrieMap<Rc<Path>, Rc<SymbolicValue>>,
}

impl Debug for Environment {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        f.debug_map()
            .entries(self.value_map.iter().map(|(k, v)| (k, v)))
            .finish()
    }
}

/// Methods
impl Environment {
    pub fn new() -> Environment {
        Environment::default()
    }

    /// Returns a reference to the value associated with the given path, if
    /// there is one. Every path reachable from a live program point has a
    /// binding; callers turn a miss into a fatal diagnostic.
    pub fn value_at(&self, path: &Rc<Path>) -> Option<&Rc<SymbolicValue>> {
        self.value_map.get(path)
    }

    /// Updates the path to value map so that the given path now points to
    /// the given value.
    pub fn update_value_at(&mut self, path: Rc<Path>, value: Rc<SymbolicValue>) {
        self.value_map.insert_mut(path, value);
    }
}
