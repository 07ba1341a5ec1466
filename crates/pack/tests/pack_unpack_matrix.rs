//! Pack/unpack matrix: shortfall handling, nested scopes, packing into views
//! and round-trips across widths and byte orders.

use indexmap::IndexMap;
use packbuf_buffers::ViewState;
use packbuf_pack::{
    pack, pack_into, unpack, unpack_with, ArgRef, ByteStore, Endian, FormatError, PackOptions,
    PackValue,
};
use proptest::prelude::*;
use serde_json::json;

fn obj(fields: &[(&str, PackValue<'static>)]) -> PackValue<'static> {
    PackValue::Object(
        fields
            .iter()
            .map(|(k, v)| ((*k).to_owned(), v.clone()))
            .collect::<IndexMap<_, _>>(),
    )
}

fn big() -> PackOptions {
    PackOptions::default().with_endian(Endian::Big)
}

// ---------------------------------------------------------------------------
// Shortfall
// ---------------------------------------------------------------------------

#[test]
fn two_ints_over_five_bytes() {
    let data = [0, 0, 0, 7, 1];
    let values = unpack_with(&data, &big(), "i4i4").unwrap();
    assert_eq!(values, vec![PackValue::Integer(7), PackValue::Null]);
}

#[test]
fn shortfall_skips_rest_of_format() {
    let data = [1, 2];
    let values = unpack(&data, "u1 u4 u1 u1").unwrap();
    assert_eq!(values, vec![PackValue::UInteger(1), PackValue::Null]);
}

#[test]
fn shortfall_inside_scope_drops_partial_scope() {
    let data = [1, 2, 3];
    let values = unpack(&data, "u1 {u1 {u4}} #").unwrap();
    assert_eq!(
        values,
        vec![PackValue::UInteger(1), PackValue::Null, PackValue::UInteger(3)]
    );
}

#[test]
fn shortfall_with_position_report() {
    let values = unpack(&[9], "!u1 u1").unwrap();
    assert_eq!(
        values,
        vec![PackValue::UInteger(2), PackValue::UInteger(9), PackValue::Null]
    );
}

#[test]
fn empty_input() {
    assert_eq!(unpack(&[], "i4").unwrap(), vec![PackValue::Null]);
    assert_eq!(unpack(&[], "u1$ #").unwrap(), vec![PackValue::UInteger(1)]);
    assert_eq!(unpack(&[], "s").unwrap(), vec![PackValue::from("")]);
}

// ---------------------------------------------------------------------------
// Nested scopes
// ---------------------------------------------------------------------------

#[test]
fn keyed_scope_round_trip() {
    let point = obj(&[("x", 7.into()), ("y", (-3).into())]);
    let (store, packed) = pack("{x=i4,y=i4}", &[point]).unwrap();
    assert_eq!(store.len(), 8);
    assert_eq!(packed.position, 9);

    let values = unpack(store.as_slice(), "{x=i4,y=i4}").unwrap();
    assert_eq!(
        values,
        vec![obj(&[
            ("x", PackValue::Integer(7)),
            ("y", PackValue::Integer(-3))
        ])]
    );
}

#[test]
fn mapping_field_order_comes_from_format() {
    let point = obj(&[("y", 2.into()), ("x", 1.into())]);
    let (store, _) = pack("{x=u1 y=u1}", &[point]).unwrap();
    assert_eq!(store.as_slice(), [1, 2]);
}

#[test]
fn nested_mixed_scopes() {
    let record = obj(&[
        ("id", 5.into()),
        ("tags", PackValue::Array(vec!["a".into(), "bc".into()])),
        ("pos", obj(&[("x", 1.into()), ("y", 2.into())])),
    ]);
    let format = "{ id=u2 tags={z z} pos={x=i1 y=i1} }";
    let (store, _) = pack_into_fresh(format, &[record]);
    let back = unpack_with(store.as_slice(), &big(), format).unwrap();
    assert_eq!(back.len(), 1);
    assert_eq!(
        back[0].to_json(),
        json!({"id": 5, "tags": ["a", "bc"], "pos": {"x": 1, "y": 2}})
    );
}

fn pack_into_fresh(format: &str, args: &[PackValue<'_>]) -> (ByteStore, usize) {
    let mut store = ByteStore::new();
    let packed = pack_into(&mut store, &big(), format, args).unwrap();
    (store, packed.position)
}

#[test]
fn sequence_of_sequences() {
    let rows = PackValue::from_json(&json!([[1, 2], [3, 4]]));
    let (store, _) = pack_into_fresh("{{u1 u1} {u1 u1}}", &[rows]);
    assert_eq!(store.as_slice(), [1, 2, 3, 4]);
    let back = unpack(store.as_slice(), "{{u1$}}").unwrap();
    assert_eq!(back[0].to_json(), json!([[1, 2, 3, 4]]));
}

#[test]
fn scope_argument_type_is_checked() {
    assert_eq!(
        pack("{u1}", &[7.into()]).err(),
        Some(FormatError::ArgumentType {
            arg: ArgRef::Arg(0),
            expected: "array",
            found: "integer"
        })
    );
}

// ---------------------------------------------------------------------------
// Targets
// ---------------------------------------------------------------------------

#[test]
fn pack_into_view_shifts_parent_tail() {
    let mut store = ByteStore::from_slice(b"<>tail").unwrap();
    let view = store.view(1, 1);
    let tail = store.view(2, 6);
    {
        let mut window = store.view_mut(view).unwrap();
        let packed = pack_into(&mut window, &big(), "z c3", &["ab".into(), "x".into()]).unwrap();
        assert_eq!(packed.position, 7);
    }
    assert_eq!(store.as_slice(), b"<ab\0x\0\0>tail");
    assert_eq!(store.view_bytes(view).unwrap(), b"ab\0x\0\0");
    // The tail view keeps its offsets; it now sees shifted content.
    assert_eq!(store.view_state(tail), ViewState::Valid);
}

#[test]
fn pack_into_trait_object() {
    let mut store = ByteStore::new();
    let target: &mut dyn packbuf_pack::ByteBuf = &mut store;
    pack_into(target, &big(), "u2", &[0x0102.into()]).unwrap();
    assert_eq!(store.as_slice(), [1, 2]);
}

#[test]
fn unpack_from_start_offset() {
    let data = b"xxhello\0";
    let options = PackOptions::default().with_start(2);
    let values = unpack_with(data, &options, "z #").unwrap();
    assert_eq!(values, vec!["hello".into(), PackValue::UInteger(9)]);
}

// ---------------------------------------------------------------------------
// Round-trips
// ---------------------------------------------------------------------------

fn arb_endian() -> impl Strategy<Value = Endian> {
    prop_oneof![Just(Endian::Little), Just(Endian::Big), Just(Endian::Native)]
}

proptest! {
    #[test]
    fn signed_round_trip(value in any::<i64>(), width in 1usize..=8, endian in arb_endian()) {
        let bits = width * 8;
        let value = if bits == 64 { value } else { (value << (64 - bits)) >> (64 - bits) };
        let options = PackOptions::default().with_endian(endian);
        let format = format!("i{width}");
        let mut store = ByteStore::new();
        pack_into(&mut store, &options, &format, &[value.into()]).unwrap();
        prop_assert_eq!(store.len(), width);
        let back = unpack_with(store.as_slice(), &options, &format).unwrap();
        prop_assert_eq!(back, vec![PackValue::Integer(value)]);
    }

    #[test]
    fn unsigned_round_trip(value in any::<u64>(), width in 1usize..=8, endian in arb_endian()) {
        let value = if width == 8 { value } else { value & ((1u64 << (width * 8)) - 1) };
        let options = PackOptions::default().with_endian(endian);
        let format = format!("u{width}");
        let mut store = ByteStore::new();
        pack_into(&mut store, &options, &format, &[value.into()]).unwrap();
        let back = unpack_with(store.as_slice(), &options, &format).unwrap();
        prop_assert_eq!(back, vec![PackValue::UInteger(value)]);
    }

    #[test]
    fn length_prefixed_round_trip(bytes in proptest::collection::vec(any::<u8>(), 0..300)) {
        let (store, _) = pack("d2 P", &[bytes.clone().into(), bytes.clone().into()]).unwrap();
        let back = unpack(store.as_slice(), "d2 P").unwrap();
        prop_assert_eq!(back, vec![PackValue::from(bytes.clone()), PackValue::from(bytes)]);
    }
}
