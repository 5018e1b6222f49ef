// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

// End-to-end mask derivation: interpreter-shaped expression trees go in,
// concrete mask literals come out.

use num_bigint::BigUint;
use taintmask::constant_domain::ConstantDomain;
use taintmask::environment::Environment;
use taintmask::expression::{Expression, ExpressionType};
use taintmask::model::Model;
use taintmask::path::Path;
use taintmask::symbolic_value::SymbolicValue;
use taintmask::taint;
use taintmask::variables::{make_state_variable, make_symbolic_variable, TaintMarkerCache};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn bits(value: u128, width: u32) -> ConstantDomain {
    ConstantDomain::for_type(&ExpressionType::bits(width), BigUint::from(value))
}

fn marker(width: u32) -> std::rc::Rc<SymbolicValue> {
    SymbolicValue::make_from(Expression::TaintMarker, ExpressionType::bits(width))
}

#[test]
fn tainted_high_byte_masks_to_00ff() {
    init_logging();
    let packet = SymbolicValue::make_concat(
        marker(8),
        SymbolicValue::make_u128(ExpressionType::bits(8), 0xAB),
    );
    let mask = taint::build_taint_mask(
        &Environment::new(),
        &TaintMarkerCache::new(),
        &Model::new(),
        &packet,
    )
    .expect("mask derivation succeeds");
    // High byte don't-care, low byte exact: rendered as hex nibbles with a
    // wildcard for non-exact positions this reads **AB.
    assert_eq!(mask, bits(0x00FF, 16));
}

#[test]
fn mask_derivation_is_deterministic() {
    init_logging();
    let environment = Environment::new();
    let markers = TaintMarkerCache::new();
    let model = Model::new();
    let packet = SymbolicValue::make_concat(
        marker(8),
        SymbolicValue::make_u128(ExpressionType::bits(8), 0xAB),
    );
    let first = taint::build_taint_mask(&environment, &markers, &model, &packet)
        .expect("mask derivation succeeds");
    let second = taint::build_taint_mask(&environment, &markers, &model, &packet)
        .expect("mask derivation succeeds");
    assert_eq!(first, second);
}

#[test]
fn resolved_header_fields_keep_taint_precise() {
    init_logging();
    let mut environment = Environment::new();
    let markers = TaintMarkerCache::new();

    // hdr.tunnel carries an 8-bit field whose low nibble was never assigned.
    let field = Path::new_field(Path::new_root("hdr"), "tunnel");
    environment.update_value_at(
        field.clone(),
        SymbolicValue::make_concat(
            SymbolicValue::make_u128(ExpressionType::bits(4), 0x9),
            marker(4),
        ),
    );
    let reference = make_state_variable(field, ExpressionType::bits(8));

    // The egress packet is that field behind a 16-bit known prefix.
    let packet = SymbolicValue::make_concat(
        SymbolicValue::make_u128(ExpressionType::bits(16), 0x0800),
        reference,
    );

    let mask = taint::build_taint_mask(&environment, &markers, &Model::new(), &packet)
        .expect("mask derivation succeeds");
    assert_eq!(mask, bits(0xFF_FFF0, 24));
}

#[test]
fn solved_variables_count_as_known_bits() {
    init_logging();
    let packet = SymbolicValue::make_concat(
        make_symbolic_variable("egress_spec", 1, ExpressionType::bits(8)),
        marker(8),
    );
    let mask = taint::build_taint_mask(
        &Environment::new(),
        &TaintMarkerCache::new(),
        &Model::new(),
        &packet,
    )
    .expect("mask derivation succeeds");
    assert_eq!(mask, bits(0xFF00, 16));
}

#[test]
fn arithmetic_on_tainted_operands_widens_to_the_full_result() {
    init_logging();
    let environment = Environment::new();
    // A checksum-like sum over a clean and a tainted field.
    let sum = SymbolicValue::make_add(
        SymbolicValue::make_u128(ExpressionType::bits(16), 0x1234),
        SymbolicValue::make_cast(marker(8), ExpressionType::bits(16)),
    );
    let taint = taint::tainted_bits(&environment, &sum).expect("classification succeeds");
    assert_eq!(taint, taintmask::taint_domain::TaintDomain::for_width(16));

    let mask = taint::build_taint_mask(
        &environment,
        &TaintMarkerCache::new(),
        &Model::new(),
        &sum,
    )
    .expect("mask derivation succeeds");
    assert_eq!(mask, bits(0x0000, 16));
}

#[test]
fn shifted_markers_taint_only_the_surviving_positions() {
    init_logging();
    let environment = Environment::new();
    let shifted = SymbolicValue::make_shl(
        marker(8),
        SymbolicValue::make_u128(ExpressionType::bits(8), 4),
    );
    let taint = taint::tainted_bits(&environment, &shifted).expect("classification succeeds");
    assert_eq!(
        taint,
        taintmask::taint_domain::TaintDomain::for_range(4, 4)
    );
}
