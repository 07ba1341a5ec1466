//! Integer and float codec matrix across widths and byte orders.

use packbuf_buffers::codec::{
    expand_sign, read_float, read_int, read_uint, write_float, write_int, write_uint,
    MAX_INT_WIDTH,
};
use packbuf_buffers::{BufferError, ByteStore, Endian, Reader};
use proptest::prelude::*;

fn mask(width: usize) -> u64 {
    if width == 8 {
        u64::MAX
    } else {
        (1u64 << (width * 8)) - 1
    }
}

fn arb_endian() -> impl Strategy<Value = Endian> {
    prop_oneof![Just(Endian::Little), Just(Endian::Big), Just(Endian::Native)]
}

#[test]
fn every_width_matches_std_layout() {
    let value = 0x0102_0304_0506_0708u64;
    for width in 1..=MAX_INT_WIDTH {
        let mut out = [0u8; 8];
        write_uint(&mut out, width, Endian::Big, value).unwrap();
        assert_eq!(&out[..width], &value.to_be_bytes()[8 - width..], "big {width}");
        write_uint(&mut out, width, Endian::Little, value).unwrap();
        assert_eq!(&out[..width], &value.to_le_bytes()[..width], "little {width}");
    }
}

#[test]
fn native_matches_host_order() {
    let mut out = [0u8; 4];
    write_uint(&mut out, 4, Endian::Native, 0xAABB_CCDD).unwrap();
    assert_eq!(out, 0xAABB_CCDDu32.to_ne_bytes());
}

#[test]
fn negative_values_per_width() {
    let cases: &[(usize, i64)] = &[
        (1, -1),
        (1, -128),
        (2, -300),
        (3, -70_000),
        (4, i64::from(i32::MIN)),
        (5, -(1i64 << 38)),
        (6, -1),
        (7, -(1i64 << 54)),
        (8, i64::MIN),
    ];
    for &(width, value) in cases {
        let mut out = [0u8; 8];
        write_int(&mut out, width, Endian::Little, value).unwrap();
        assert_eq!(read_int(&out, width, Endian::Little).unwrap(), value, "width {width}");
    }
}

#[test]
fn narrowing_keeps_low_bytes() {
    let mut out = [0u8; 2];
    write_int(&mut out, 2, Endian::Big, 0x1_2345).unwrap();
    assert_eq!(out, [0x23, 0x45]);
    assert_eq!(read_uint(&out, 2, Endian::Big).unwrap(), 0x2345);
}

#[test]
fn float_narrowing_to_single() {
    let mut out = [0u8; 4];
    write_float(&mut out, 4, Endian::Little, 0.1).unwrap();
    assert_eq!(read_float(&out, 4, Endian::Little).unwrap(), f64::from(0.1f32));
}

#[test]
fn widths_outside_range_are_rejected() {
    let mut out = [0u8; 16];
    for width in [0usize, 9, 16] {
        assert_eq!(
            write_uint(&mut out, width, Endian::Big, 0),
            Err(BufferError::InvalidWidth(width))
        );
    }
    for width in [1usize, 2, 3, 5, 6, 7] {
        assert_eq!(
            write_float(&mut out, width, Endian::Big, 0.0),
            Err(BufferError::InvalidWidth(width))
        );
    }
}

#[test]
fn reader_walks_mixed_fields() {
    let mut store = ByteStore::new();
    store.set_int(0, 1, Endian::Big, 7).unwrap();
    store.set_int(1, 3, Endian::Big, -5).unwrap();
    store.set_int(4, 6, Endian::Big, 1 << 40).unwrap();
    let mut reader = Reader::new(store.as_slice()).with_endian(Endian::Big);
    assert_eq!(reader.uint(1).unwrap(), Some(7));
    assert_eq!(reader.int(3).unwrap(), Some(-5));
    assert_eq!(reader.int(6).unwrap(), Some(1 << 40));
    assert_eq!(reader.int(1).unwrap(), None);
    assert_eq!(reader.x, 10);
}

proptest! {
    #[test]
    fn uint_roundtrip(value in any::<u64>(), width in 1usize..=8, endian in arb_endian()) {
        let mut out = [0u8; 8];
        write_uint(&mut out, width, endian, value).unwrap();
        prop_assert_eq!(read_uint(&out, width, endian).unwrap(), value & mask(width));
    }

    #[test]
    fn int_roundtrip_in_range(value in any::<i64>(), width in 1usize..=8, endian in arb_endian()) {
        let bits = width * 8;
        let narrowed = if bits == 64 { value } else { (value << (64 - bits)) >> (64 - bits) };
        let mut out = [0u8; 8];
        write_int(&mut out, width, endian, narrowed).unwrap();
        prop_assert_eq!(read_int(&out, width, endian).unwrap(), narrowed);
    }

    #[test]
    fn sign_extension_matches_shift(raw in any::<u64>(), width in 1usize..=8) {
        let bits = width * 8;
        let raw = raw & mask(width);
        let expected = if bits == 64 { raw as i64 } else { ((raw << (64 - bits)) as i64) >> (64 - bits) };
        prop_assert_eq!(expand_sign(raw, width), expected);
    }

    #[test]
    fn double_roundtrip(value in any::<f64>(), endian in arb_endian()) {
        let mut out = [0u8; 8];
        write_float(&mut out, 8, endian, value).unwrap();
        let back = read_float(&out, 8, endian).unwrap();
        prop_assert_eq!(back.to_bits(), value.to_bits());
    }
}
