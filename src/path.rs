// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::fmt::{Debug, Formatter, Result};
use std::hash::{Hash, Hasher};
use std::rc::Rc;

/// A path denotes a machine-state location, such as a header field of the
/// packet being processed. Paths are the keys of the symbolic environment
/// and get hashed on every lookup, so the hash is computed once at
/// construction and cached.
#[derive(Serialize, Deserialize, Clone, Eq, Ord, PartialOrd)]
pub struct Path {
    pub value: PathEnum,
    hash: u64,
}

impl Debug for Path {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        self.value.fmt(f)
    }
}

impl Hash for Path {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

impl PartialEq for Path {
    fn eq(&self, other: &Path) -> bool {
        self.hash == other.hash && self.value == other.value
    }
}

impl From<PathEnum> for Path {
    fn from(value: PathEnum) -> Self {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        Path {
            value,
            hash: hasher.finish(),
        }
    }
}

/// Constructors
impl Path {
    /// Returns a path to the named state root, such as a header instance or
    /// a metadata block.
    pub fn new_root(name: &str) -> Rc<Path> {
        Rc::new(
            PathEnum::Root {
                name: Rc::new(String::from(name)),
            }
            .into(),
        )
    }

    /// Returns a path to the named field of the location the qualifier
    /// denotes.
    pub fn new_field(qualifier: Rc<Path>, name: &str) -> Rc<Path> {
        Path::new_qualified(
            qualifier,
            Rc::new(PathSelector::Field(Rc::new(String::from(name)))),
        )
    }

    /// Returns a path to the element at the given ordinal of the location
    /// the qualifier denotes.
    pub fn new_index(qualifier: Rc<Path>, ordinal: u32) -> Rc<Path> {
        Path::new_qualified(qualifier, Rc::new(PathSelector::Index(ordinal)))
    }

    /// Returns a qualified path of the form qualifier.selector.
    pub fn new_qualified(qualifier: Rc<Path>, selector: Rc<PathSelector>) -> Rc<Path> {
        Rc::new(
            PathEnum::QualifiedPath {
                qualifier,
                selector,
            }
            .into(),
        )
    }
}

/// A path is a state root or a chain of selectors applied to one.
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum PathEnum {
    /// A named state root.
    Root { name: Rc<String> },

    /// The qualifier is a path to some location and the selector selects a
    /// member of that location.
    QualifiedPath {
        qualifier: Rc<Path>,
        selector: Rc<PathSelector>,
    },
}

impl Debug for PathEnum {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            PathEnum::Root { name } => write!(f, "{}", name),
            PathEnum::QualifiedPath {
                qualifier,
                selector,
            } => match selector.as_ref() {
                PathSelector::Field(name) => write!(f, "{:?}.{}", qualifier, name),
                PathSelector::Index(ordinal) => write!(f, "{:?}[{}]", qualifier, ordinal),
            },
        }
    }
}

/// Selects a member of the location denoted by a qualifying path.
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum PathSelector {
    /// Select the named field of a structured location.
    Field(Rc<String>),

    /// Select the element at the given ordinal of an indexed location, such
    /// as a header stack.
    Index(u32),
}
