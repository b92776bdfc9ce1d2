// Tests for string.pack, string.unpack and string.packsize
use crate::*;

fn pack_error(msg: &str) -> LuaError {
    LuaError::Pack(msg.to_string())
}

#[test]
fn test_pack_integers() {
    let state = LuaState::new();
    assert_eq!(state.pack(b"<i4", &[PackValue::from(-1i64)]), Ok(vec![0xff; 4]));
    assert_eq!(state.pack(b">i4", &[PackValue::from(1i64)]), Ok(vec![0, 0, 0, 1]));
    assert_eq!(state.pack(b">I2", &[PackValue::from(258i64)]), Ok(vec![1, 2]));
    assert_eq!(state.pack(b"<h", &[PackValue::from(-2i64)]), Ok(vec![0xfe, 0xff]));
    // integers are truncated to the field width
    assert_eq!(
        state.pack(b"<i2", &[PackValue::from(70000i64)]),
        Ok(vec![0x70, 0x11])
    );
    // widths above 8 sign extend
    assert_eq!(state.pack(b"<i9", &[PackValue::from(-1i64)]), Ok(vec![0xff; 9]));

    let native = state.pack(b"=i4", &[PackValue::from(1i64)]).unwrap();
    let expected = if cfg!(target_endian = "little") {
        state.pack(b"<i4", &[PackValue::from(1i64)]).unwrap()
    } else {
        state.pack(b">i4", &[PackValue::from(1i64)]).unwrap()
    };
    assert_eq!(native, expected);
}

#[test]
fn test_unpack_integers() {
    let state = LuaState::new();
    let data = state.pack(b"<i4", &[PackValue::from(-1i64)]).unwrap();
    assert_eq!(
        state.unpack(b"<i4", &data, None),
        Ok((vec![PackValue::from(-1i64)], 5))
    );
    assert_eq!(
        state.unpack(b"<I4", &data, None),
        Ok((vec![PackValue::from(4294967295i64)], 5))
    );
    assert_eq!(
        state.unpack(b"<i9", &[0xff; 9], None),
        Ok((vec![PackValue::from(-1i64)], 10))
    );

    let two = [1u8, 0, 0, 0, 2, 0, 0, 0];
    assert_eq!(
        state.unpack(b"<i4", &two, Some(5)),
        Ok((vec![PackValue::from(2i64)], 9))
    );
    assert_eq!(
        state.unpack(b"b", &[1, 2, 3], Some(-1)),
        Ok((vec![PackValue::from(3i64)], 4))
    );
}

#[test]
fn test_wide_integers() {
    let state = LuaState::new();
    let big = 1i128 << 100;
    let data = state.pack(b"<i16", &[PackValue::from(big)]).unwrap();
    assert_eq!(data.len(), 16);
    assert_eq!(
        state.unpack(b"<i16", &data, None),
        Ok((vec![PackValue::Wide(big)], 17))
    );

    let data = state.pack(b">j", &[PackValue::from(i64::MIN)]).unwrap();
    assert_eq!(
        state.unpack(b">j", &data, None),
        Ok((vec![PackValue::from(i64::MIN)], 9))
    );
}

#[test]
fn test_pack_floats() {
    let state = LuaState::new();
    let data = state.pack(b"<d", &[PackValue::from(1.5)]).unwrap();
    assert_eq!(data, 1.5f64.to_le_bytes().to_vec());
    assert_eq!(
        state.unpack(b"<d", &data, None),
        Ok((vec![PackValue::from(1.5)], 9))
    );

    let data = state.pack(b">f", &[PackValue::from(0.1)]).unwrap();
    assert_eq!(data, 0.1f32.to_be_bytes().to_vec());
    assert_eq!(
        state.unpack(b">f", &data, None),
        Ok((vec![PackValue::from(0.1f32 as f64)], 5))
    );

    // integers pack as floats too
    let data = state.pack(b"<n", &[PackValue::from(3i64)]).unwrap();
    assert_eq!(
        state.unpack(b"<n", &data, None),
        Ok((vec![PackValue::from(3.0)], 9))
    );
}

#[test]
fn test_pack_strings() {
    let state = LuaState::new();
    assert_eq!(
        state.pack(b"<s4", &[PackValue::from("hello")]),
        Ok(b"\x05\x00\x00\x00hello".to_vec())
    );
    assert_eq!(
        state.unpack(b"<s4", b"\x05\x00\x00\x00hello", None),
        Ok((vec![PackValue::from("hello")], 10))
    );
    assert_eq!(state.pack(b"s1", &[PackValue::from("hi")]), Ok(b"\x02hi".to_vec()));
    assert_eq!(state.pack(b"z", &[PackValue::from("hi")]), Ok(b"hi\0".to_vec()));
    assert_eq!(state.pack(b"c5", &[PackValue::from("abc")]), Ok(b"abc\0\0".to_vec()));
    // numbers are converted to their string form
    assert_eq!(state.pack(b"z", &[PackValue::from(12i64)]), Ok(b"12\0".to_vec()));

    assert_eq!(
        state.unpack(b"z", b"hello\0rest", None),
        Ok((vec![PackValue::from("hello")], 7))
    );
    assert_eq!(
        state.unpack(b"c3", b"abcdef", Some(2)),
        Ok((vec![PackValue::from("bcd")], 5))
    );
}

#[test]
fn test_pack_mixed_sequence() {
    let state = LuaState::new();
    let args = [
        PackValue::from(1i64),
        PackValue::from(2i64),
        PackValue::from("x"),
    ];
    let data = state.pack(b"<bhz", &args).unwrap();
    assert_eq!(data, vec![1, 2, 0, b'x', 0]);
    assert_eq!(state.unpack(b"<bhz", &data, None), Ok((args.to_vec(), 6)));
}

#[test]
fn test_alignment() {
    let state = LuaState::new();
    // no alignment unless '!' is given
    assert_eq!(state.packsize(b"i4i8"), Ok(12));
    assert_eq!(state.packsize(b"!i4i8"), Ok(16));
    assert_eq!(state.packsize(b"!8 b d"), Ok(16));
    assert_eq!(state.packsize(b"!2 b i8"), Ok(10));
    // 'c' is never aligned
    assert_eq!(state.packsize(b"!8 b c3"), Ok(4));

    let data = state
        .pack(b"!4 b Xi4 b", &[PackValue::from(1i64), PackValue::from(2i64)])
        .unwrap();
    assert_eq!(data, vec![1, 0, 0, 0, 2]);
    assert_eq!(state.packsize(b"!4 b Xi4 b"), Ok(5));
}

#[test]
fn test_unpack_position_matches_packsize() {
    let state = LuaState::new();
    let fmt = b"<!4 b i4 h d";
    let args = [
        PackValue::from(1i64),
        PackValue::from(2i64),
        PackValue::from(3i64),
        PackValue::from(4.0),
    ];
    let data = state.pack(fmt, &args).unwrap();
    let size = state.packsize(fmt).unwrap();
    assert_eq!(size, 20);
    assert_eq!(data.len(), size);

    let (values, next) = state.unpack(fmt, &data, None).unwrap();
    assert_eq!(next, size + 1);
    assert_eq!(values, args.to_vec());
}

#[test]
fn test_packsize_errors() {
    let state = LuaState::new();
    assert_eq!(state.packsize(b"s"), Err(pack_error("variable-length format")));
    assert_eq!(state.packsize(b"z"), Err(pack_error("variable-length format")));
    assert_eq!(
        state.packsize(b"i17"),
        Err(pack_error("integral size (17) out of limits [1,16]"))
    );
    assert_eq!(
        state.packsize(b"i0"),
        Err(pack_error("integral size (0) out of limits [1,16]"))
    );
    assert_eq!(
        state.packsize(b"c"),
        Err(pack_error("missing size for format option 'c'"))
    );
    assert_eq!(state.packsize(b"y"), Err(pack_error("invalid format option 'y'")));
    assert_eq!(
        state.packsize(b"!3i4"),
        Err(pack_error("format asks for alignment not power of 2"))
    );
    assert_eq!(
        state.packsize(b"X"),
        Err(pack_error("invalid next option for option 'X'"))
    );
    assert_eq!(
        state.packsize(b"Xc1"),
        Err(pack_error("invalid next option for option 'X'"))
    );
}

#[test]
fn test_pack_argument_errors() {
    let state = LuaState::new();
    assert_eq!(
        state.pack(b"i4", &[]),
        Err(pack_error("bad argument #2 to 'pack' (no value)"))
    );
    assert_eq!(
        state.pack(b"i4", &[PackValue::from("abc")]),
        Err(pack_error("bad argument #2 to 'pack' (number expected, got string)"))
    );
    assert_eq!(
        state.pack(b"i4", &[PackValue::from(1.5)]),
        Err(pack_error(
            "bad argument #2 to 'pack' (number has no integer representation)"
        ))
    );
    assert_eq!(
        state.pack(b"i4", &[PackValue::from("12")]),
        state.pack(b"i4", &[PackValue::from(12i64)])
    );
    assert_eq!(
        state.pack(b"bz", &[PackValue::from(1i64), PackValue::from("a\0b")]),
        Err(pack_error("bad argument #3 to 'pack' (string contains zeros)"))
    );
    assert_eq!(
        state.pack(b"c2", &[PackValue::from("abc")]),
        Err(pack_error("bad argument #2 to 'pack' (string longer than given size)"))
    );
    assert_eq!(
        state.pack(b"s1", &[PackValue::from(vec![b'a'; 300])]),
        Err(pack_error(
            "bad argument #2 to 'pack' (string length does not fit in given size)"
        ))
    );

    let small = LuaState::with_option(SafeOption {
        max_string_size: 4,
        ..SafeOption::default()
    });
    assert_eq!(
        small.pack(b"i8", &[PackValue::from(1i64)]),
        Err(pack_error("format result too large"))
    );
}

#[test]
fn test_unpack_errors() {
    let state = LuaState::new();
    assert_eq!(
        state.unpack(b"i4", &[1, 2], None),
        Err(pack_error("data string too short"))
    );
    assert_eq!(
        state.unpack(b"z", b"abc", None),
        Err(pack_error("unfinished string for format 'z'"))
    );
    assert_eq!(
        state.unpack(b"b", b"abc", Some(5)),
        Err(pack_error("initial position out of string"))
    );
    assert_eq!(
        state.unpack(b"s1", b"\x05ab", None),
        Err(pack_error("data string too short"))
    );
    // a position right after the end is valid for empty formats
    assert_eq!(state.unpack(b"", b"abc", Some(4)), Ok((vec![], 4)));
}
