// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

use num_bigint::BigUint;
use num_traits::{One, Zero};
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Formatter, Result};

/// An element of the taint domain is an ordered set of bit positions: the
/// positions of an expression value whose bits are unconstrained by the path
/// condition. The set is kept as an arbitrary precision bit pattern, so
/// indices are unbounded on construction and only interpreted against a type
/// width by the operations that are given one. Elements are immutable
/// values; every transfer function returns a new element.
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct TaintDomain {
    bits: BigUint,
}

impl Debug for TaintDomain {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        let mut set = f.debug_set();
        for index in 0..self.bits.bits() {
            if self.bits.bit(index) {
                set.entry(&index);
            }
        }
        set.finish()
    }
}

/// Constructors
impl TaintDomain {
    /// Constructs the empty taint set.
    pub fn empty() -> TaintDomain {
        TaintDomain {
            bits: BigUint::zero(),
        }
    }

    /// Constructs the taint set covering every position of a value of the
    /// given width, i.e. [0, width).
    pub fn for_width(width: u32) -> TaintDomain {
        TaintDomain::for_range(0, width)
    }

    /// Constructs the taint set covering len positions starting at low,
    /// i.e. [low, low + len).
    pub fn for_range(low: u32, len: u32) -> TaintDomain {
        TaintDomain {
            bits: ((BigUint::one() << len as usize) - BigUint::one()) << low as usize,
        }
    }
}

/// Queries
impl TaintDomain {
    /// Returns true if no position is tainted.
    pub fn is_empty(&self) -> bool {
        self.bits.is_zero()
    }

    /// Returns true if the given position is tainted.
    pub fn contains(&self, index: u32) -> bool {
        self.bits.bit(u64::from(index))
    }
}

/// Transfer functions
impl TaintDomain {
    /// Returns the set of positions tainted in either operand.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        TaintDomain {
            bits: &self.bits | &other.bits,
        }
    }

    /// Returns the set of positions tainted in both operands.
    #[must_use]
    pub fn intersection(&self, other: &Self) -> Self {
        TaintDomain {
            bits: &self.bits & &other.bits,
        }
    }

    /// Returns the set with every position moved up by the given amount.
    /// Vacated low positions are untainted.
    #[must_use]
    pub fn shift_left(&self, amount: u32) -> Self {
        TaintDomain {
            bits: &self.bits << amount as usize,
        }
    }

    /// Returns the set with every position moved down by the given amount.
    /// Positions moved below zero vanish; vacated high positions are
    /// untainted.
    #[must_use]
    pub fn shift_right(&self, amount: u32) -> Self {
        TaintDomain {
            bits: &self.bits >> amount as usize,
        }
    }

    /// Returns the sub-range [low, low + len) of the set, rebased so that
    /// position low becomes position 0.
    #[must_use]
    pub fn slice(&self, low: u32, len: u32) -> Self {
        self.shift_right(low).truncated_to(len)
    }

    /// Returns the set with every position at or above the given width
    /// removed.
    #[must_use]
    pub fn truncated_to(&self, width: u32) -> Self {
        self.intersection(&TaintDomain::for_width(width))
    }
}
