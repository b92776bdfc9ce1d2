// string.pack, string.unpack, string.packsize
// Binary layouts with explicit endianness, alignment and integer widths up to 16 bytes.

use crate::lua_value::LuaNumber;
use crate::lua_vm::lua_limits::{DEFAULT_INT_SIZE, MAXALIGN, MAXINTSIZE, SZINT};
use crate::lua_vm::{LuaError, LuaResult};
use crate::stdlib::basic::parse_number::parse_lua_number;
use crate::stdlib::string::posrelat_start;

/// A value crossing the pack boundary.
/// `Wide` carries integers of 9 to 16 bytes that do not fit an `i64`.
#[derive(Debug, Clone, PartialEq)]
pub enum PackValue {
    Number(LuaNumber),
    Wide(i128),
    String(Vec<u8>),
}

impl From<LuaNumber> for PackValue {
    fn from(n: LuaNumber) -> Self {
        PackValue::Number(n)
    }
}

impl From<i64> for PackValue {
    fn from(i: i64) -> Self {
        PackValue::Number(LuaNumber::Int(i))
    }
}

impl From<f64> for PackValue {
    fn from(f: f64) -> Self {
        PackValue::Number(LuaNumber::Float(f))
    }
}

impl From<i128> for PackValue {
    fn from(i: i128) -> Self {
        PackValue::Wide(i)
    }
}

impl From<&str> for PackValue {
    fn from(s: &str) -> Self {
        PackValue::String(s.as_bytes().to_vec())
    }
}

impl From<&[u8]> for PackValue {
    fn from(s: &[u8]) -> Self {
        PackValue::String(s.to_vec())
    }
}

impl From<Vec<u8>> for PackValue {
    fn from(s: Vec<u8>) -> Self {
        PackValue::String(s)
    }
}

impl PackValue {
    fn type_name(&self) -> &'static str {
        match self {
            PackValue::Number(_) | PackValue::Wide(_) => "number",
            PackValue::String(_) => "string",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KOption {
    Int,       // signed integers
    Uint,      // unsigned integers
    Float,     // 4-byte float
    Double,    // 8-byte float ('d' and 'n')
    Char,      // fixed-size string
    String,    // length-prefixed string
    Zstr,      // zero-terminated string
    Padding,   // 'x'
    PaddAlign, // 'X'
    Nop,       // no-op (configuration or spaces)
}

#[derive(Debug, Clone, Copy)]
struct Header {
    is_little: bool,
    max_align: usize,
}

impl Default for Header {
    fn default() -> Self {
        Self {
            is_little: cfg!(target_endian = "little"),
            max_align: 1,
        }
    }
}

/// One parsed option with the padding that precedes it
#[derive(Debug, Clone, Copy)]
struct Details {
    opt: KOption,
    size: usize,
    ntoalign: usize,
}

/// Walks a format string, tracking the header state
struct FormatReader<'a> {
    fmt: &'a [u8],
    pos: usize,
    header: Header,
}

impl<'a> FormatReader<'a> {
    fn new(fmt: &'a [u8]) -> Self {
        Self {
            fmt,
            pos: 0,
            header: Header::default(),
        }
    }

    #[inline]
    fn has_more(&self) -> bool {
        self.pos < self.fmt.len()
    }

    fn get_num(&mut self) -> Option<usize> {
        if !self.has_more() || !self.fmt[self.pos].is_ascii_digit() {
            return None;
        }
        let mut a: usize = 0;
        while self.has_more()
            && self.fmt[self.pos].is_ascii_digit()
            && a <= (i32::MAX as usize - 9) / 10
        {
            a = a * 10 + (self.fmt[self.pos] - b'0') as usize;
            self.pos += 1;
        }
        Some(a)
    }

    fn get_num_limit(&mut self, default: usize) -> LuaResult<usize> {
        let sz = self.get_num().unwrap_or(default);
        if sz == 0 || sz > MAXINTSIZE {
            return Err(LuaError::Pack(format!(
                "integral size ({}) out of limits [1,{}]",
                sz, MAXINTSIZE
            )));
        }
        Ok(sz)
    }

    /// Read one option and its size; header options update `self.header`
    fn get_option(&mut self) -> LuaResult<(KOption, usize)> {
        let c = self.fmt[self.pos];
        self.pos += 1;
        let opt = match c {
            b'b' => (KOption::Int, 1),
            b'B' => (KOption::Uint, 1),
            b'h' => (KOption::Int, 2),
            b'H' => (KOption::Uint, 2),
            b'l' | b'j' => (KOption::Int, SZINT),
            b'L' | b'J' | b'T' => (KOption::Uint, SZINT),
            b'f' => (KOption::Float, 4),
            b'd' | b'n' => (KOption::Double, 8),
            b'i' => (KOption::Int, self.get_num_limit(DEFAULT_INT_SIZE)?),
            b'I' => (KOption::Uint, self.get_num_limit(DEFAULT_INT_SIZE)?),
            b's' => (KOption::String, self.get_num_limit(SZINT)?),
            b'c' => match self.get_num() {
                Some(sz) => (KOption::Char, sz),
                None => {
                    return Err(LuaError::Pack(
                        "missing size for format option 'c'".to_string(),
                    ));
                }
            },
            b'z' => (KOption::Zstr, 0),
            b'x' => (KOption::Padding, 1),
            b'X' => (KOption::PaddAlign, 0),
            b' ' => (KOption::Nop, 0),
            b'<' => {
                self.header.is_little = true;
                (KOption::Nop, 0)
            }
            b'>' => {
                self.header.is_little = false;
                (KOption::Nop, 0)
            }
            b'=' => {
                self.header.is_little = cfg!(target_endian = "little");
                (KOption::Nop, 0)
            }
            b'!' => {
                self.header.max_align = self.get_num_limit(MAXALIGN)?;
                (KOption::Nop, 0)
            }
            other => {
                return Err(LuaError::Pack(format!(
                    "invalid format option '{}'",
                    other as char
                )));
            }
        };
        Ok(opt)
    }

    /// Read the next option and compute its alignment padding at `total`.
    /// `X` takes its alignment from the following option, which it consumes.
    fn get_details(&mut self, total: usize) -> LuaResult<Details> {
        let (opt, size) = self.get_option()?;
        let mut align = size;
        if opt == KOption::PaddAlign {
            let invalid =
                || LuaError::Pack("invalid next option for option 'X'".to_string());
            if !self.has_more() {
                return Err(invalid());
            }
            let (next, next_size) = self.get_option()?;
            if next == KOption::Char || next_size == 0 {
                return Err(invalid());
            }
            align = next_size;
        }

        let ntoalign = if align <= 1 || opt == KOption::Char {
            0
        } else {
            let align = align.min(self.header.max_align);
            if !align.is_power_of_two() {
                return Err(LuaError::Pack(
                    "format asks for alignment not power of 2".to_string(),
                ));
            }
            (align - (total & (align - 1))) & (align - 1)
        };

        Ok(Details {
            opt,
            size,
            ntoalign,
        })
    }
}

fn bad_argument(n: usize, fname: &str, extra: &str) -> LuaError {
    LuaError::Pack(format!("bad argument #{} to '{}' ({})", n, fname, extra))
}

// ======================== Integers ========================

/// Two's complement truncation of `v` to `size` bytes
fn pack_int(out: &mut Vec<u8>, v: i128, size: usize, is_little: bool) {
    let bytes = v.to_le_bytes();
    if is_little {
        out.extend_from_slice(&bytes[..size]);
    } else {
        out.extend(bytes[..size].iter().rev());
    }
}

fn unpack_int(data: &[u8], size: usize, is_little: bool, signed: bool) -> PackValue {
    let mut v: u128 = 0;
    for i in 0..size {
        let byte = if is_little { data[i] } else { data[size - 1 - i] };
        v |= (byte as u128) << (8 * i);
    }
    if signed {
        if size < 16 {
            let shift = 128 - size * 8;
            v = (((v << shift) as i128) >> shift) as u128;
        }
        let iv = v as i128;
        i64::try_from(iv).map_or(PackValue::Wide(iv), |i| PackValue::Number(LuaNumber::Int(i)))
    } else {
        // unsigned values up to 64 bits wrap into Lua integers
        u64::try_from(v).map_or(PackValue::Wide(v as i128), |u| {
            PackValue::Number(LuaNumber::Int(u as i64))
        })
    }
}

// ======================== Arguments ========================

struct PackArgs<'a> {
    args: &'a [PackValue],
    next: usize,
}

impl<'a> PackArgs<'a> {
    fn next_arg(&mut self) -> LuaResult<(usize, &'a PackValue)> {
        let n = self.next + 2;
        let v = self
            .args
            .get(self.next)
            .ok_or_else(|| bad_argument(n, "pack", "no value"))?;
        self.next += 1;
        Ok((n, v))
    }

    fn integer(&mut self) -> LuaResult<i128> {
        let (n, v) = self.next_arg()?;
        let num = match v {
            PackValue::Wide(i) => return Ok(*i),
            PackValue::Number(num) => *num,
            PackValue::String(s) => parse_lua_number(s)
                .ok_or_else(|| bad_argument(n, "pack", "number expected, got string"))?,
        };
        num.as_integer()
            .map(i128::from)
            .ok_or_else(|| bad_argument(n, "pack", "number has no integer representation"))
    }

    fn number(&mut self) -> LuaResult<f64> {
        let (n, v) = self.next_arg()?;
        match v {
            PackValue::Wide(i) => Ok(*i as f64),
            PackValue::Number(num) => Ok(num.as_f64()),
            PackValue::String(s) => parse_lua_number(s)
                .map(|num| num.as_f64())
                .ok_or_else(|| bad_argument(n, "pack", "number expected, got string")),
        }
    }

    fn bytes(&mut self) -> LuaResult<(usize, std::borrow::Cow<'a, [u8]>)> {
        let (n, v) = self.next_arg()?;
        match v {
            PackValue::String(s) => Ok((n, std::borrow::Cow::Borrowed(s.as_slice()))),
            PackValue::Number(num) => Ok((n, num.to_lua_string().into_bytes().into())),
            PackValue::Wide(_) => Err(bad_argument(
                n,
                "pack",
                &format!("string expected, got {}", v.type_name()),
            )),
        }
    }
}

// ======================== Public API ========================

/// `string.pack(fmt, v1, v2, ...)`
pub fn pack(fmt: &[u8], args: &[PackValue], max_size: usize) -> LuaResult<Vec<u8>> {
    let mut reader = FormatReader::new(fmt);
    let mut args = PackArgs { args, next: 0 };
    let mut out = Vec::new();

    while reader.has_more() {
        let d = reader.get_details(out.len())?;
        out.resize(out.len() + d.ntoalign, 0);
        let is_little = reader.header.is_little;

        match d.opt {
            KOption::Int | KOption::Uint => {
                let v = args.integer()?;
                pack_int(&mut out, v, d.size, is_little);
            }
            KOption::Float => {
                let bits = (args.number()? as f32).to_bits();
                pack_int(&mut out, bits as i128, 4, is_little);
            }
            KOption::Double => {
                let bits = args.number()?.to_bits();
                pack_int(&mut out, bits as i128, 8, is_little);
            }
            KOption::Char => {
                let (n, s) = args.bytes()?;
                if s.len() > d.size {
                    return Err(bad_argument(n, "pack", "string longer than given size"));
                }
                out.extend_from_slice(&s);
                out.resize(out.len() + (d.size - s.len()), 0);
            }
            KOption::String => {
                let (n, s) = args.bytes()?;
                if d.size < 8 && (s.len() as u64) >= (1u64 << (d.size * 8)) {
                    return Err(bad_argument(
                        n,
                        "pack",
                        "string length does not fit in given size",
                    ));
                }
                pack_int(&mut out, s.len() as i128, d.size, is_little);
                out.extend_from_slice(&s);
            }
            KOption::Zstr => {
                let (n, s) = args.bytes()?;
                if s.contains(&0) {
                    return Err(bad_argument(n, "pack", "string contains zeros"));
                }
                out.extend_from_slice(&s);
                out.push(0);
            }
            KOption::Padding => out.push(0),
            KOption::PaddAlign | KOption::Nop => {}
        }

        if out.len() > max_size {
            return Err(LuaError::Pack("format result too large".to_string()));
        }
    }

    Ok(out)
}

/// `string.packsize(fmt)`; fails for variable-length formats
pub fn packsize(fmt: &[u8]) -> LuaResult<usize> {
    let mut reader = FormatReader::new(fmt);
    let mut total: usize = 0;
    while reader.has_more() {
        let d = reader.get_details(total)?;
        if matches!(d.opt, KOption::String | KOption::Zstr) {
            return Err(LuaError::Pack("variable-length format".to_string()));
        }
        total = total
            .checked_add(d.ntoalign + d.size)
            .filter(|&t| t <= i32::MAX as usize)
            .ok_or_else(|| LuaError::Pack("format result too large".to_string()))?;
    }
    Ok(total)
}

/// `string.unpack(fmt, s, init)`: the decoded values and the 1-based position
/// after the last byte read.
pub fn unpack(fmt: &[u8], data: &[u8], init: i64) -> LuaResult<(Vec<PackValue>, usize)> {
    let ld = data.len();
    let mut pos = posrelat_start(init, ld) - 1;
    if pos > ld {
        return Err(LuaError::Pack("initial position out of string".to_string()));
    }

    let mut reader = FormatReader::new(fmt);
    let mut values = Vec::new();
    while reader.has_more() {
        let d = reader.get_details(pos)?;
        if d.ntoalign + d.size > ld - pos {
            return Err(LuaError::Pack("data string too short".to_string()));
        }
        pos += d.ntoalign;
        let is_little = reader.header.is_little;
        let field = &data[pos..];

        match d.opt {
            KOption::Int | KOption::Uint => {
                values.push(unpack_int(field, d.size, is_little, d.opt == KOption::Int));
            }
            KOption::Float => {
                let mut raw = [0u8; 4];
                raw.copy_from_slice(&field[..4]);
                let f = if is_little {
                    f32::from_le_bytes(raw)
                } else {
                    f32::from_be_bytes(raw)
                };
                values.push(PackValue::Number(LuaNumber::Float(f as f64)));
            }
            KOption::Double => {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(&field[..8]);
                let f = if is_little {
                    f64::from_le_bytes(raw)
                } else {
                    f64::from_be_bytes(raw)
                };
                values.push(PackValue::Number(LuaNumber::Float(f)));
            }
            KOption::Char => values.push(PackValue::String(field[..d.size].to_vec())),
            KOption::String => {
                let len = match unpack_int(field, d.size, is_little, false) {
                    PackValue::Number(LuaNumber::Int(l)) => l as u64 as u128,
                    PackValue::Wide(l) => l as u128,
                    _ => 0,
                };
                if len > (ld - pos - d.size) as u128 {
                    return Err(LuaError::Pack("data string too short".to_string()));
                }
                let len = len as usize;
                values.push(PackValue::String(field[d.size..d.size + len].to_vec()));
                pos += len;
            }
            KOption::Zstr => {
                let len = field
                    .iter()
                    .position(|&b| b == 0)
                    .ok_or_else(|| {
                        LuaError::Pack("unfinished string for format 'z'".to_string())
                    })?;
                values.push(PackValue::String(field[..len].to_vec()));
                pos += len + 1;
            }
            KOption::Padding | KOption::PaddAlign | KOption::Nop => {}
        }
        pos += d.size;
    }

    Ok((values, pos + 1))
}
