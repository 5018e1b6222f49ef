// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.
//
// Taint tracking and mask derivation for test generation by symbolic
// execution of packet-processing programs. When the interpreter explores a
// program path, some bits of an output value are left unconstrained by the
// path condition; the passes in this crate compute exactly which bits those
// are and package the answer as a bitmask literal a test oracle can use to
// ignore them when asserting expected output.

#[macro_use]
extern crate log;

pub mod constant_domain;
pub mod environment;
pub mod expression;
pub mod mask_builder;
pub mod model;
pub mod path;
pub mod symbolic_value;
pub mod taint;
pub mod taint_domain;
pub mod taint_propagator;
pub mod variables;
