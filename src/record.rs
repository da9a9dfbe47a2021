use std::error;
use std::fmt;
use std::hash;
use std::ops;
use std::str::{self, FromStr};

use bstr::BStr;
use dialect_csv_core::{quote, should_quote};

use crate::error::{FieldError, FieldErrorKind};

/// A position in CSV data.
///
/// A position is used to report errors in CSV data. All positions include
/// the byte offset, line number and record index at which the error
/// occurred.
///
/// Byte offsets and record indices start at `0`. Line numbers start at `1`.
///
/// A reader reports the position of the first byte of each record.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Position {
    byte: u64,
    line: u64,
    record: u64,
}

impl Default for Position {
    fn default() -> Position {
        Position::new()
    }
}

impl Position {
    /// Returns a new position initialized to the start value.
    pub fn new() -> Position {
        Position { byte: 0, line: 1, record: 0 }
    }

    /// The byte offset, starting at `0`, of this position.
    pub fn byte(&self) -> u64 {
        self.byte
    }

    /// The line number, starting at `1`, of this position.
    pub fn line(&self) -> u64 {
        self.line
    }

    /// The record index, starting with the first record at `0`.
    pub fn record(&self) -> u64 {
        self.record
    }

    /// Set the byte offset of this position.
    pub fn set_byte(&mut self, byte: u64) -> &mut Position {
        self.byte = byte;
        self
    }

    /// Set the line number of this position.
    ///
    /// If the line number is less than `1`, then this method panics.
    pub fn set_line(&mut self, line: u64) -> &mut Position {
        assert!(line > 0);
        self.line = line;
        self
    }

    /// Set the record index of this position.
    pub fn set_record(&mut self, record: u64) -> &mut Position {
        self.record = record;
        self
    }
}

/// A single CSV record.
///
/// A record is an ordered list of fields. Each field is a byte string that
/// is either *present* (possibly empty) or *absent*. When reading, a field
/// is absent exactly when it is empty and was not quoted, so `a,,b` has an
/// absent second field while `a,"",b` has an empty one.
///
/// A reader recycles one `Record` for every record it reads, so the record
/// returned by `Reader::next_record` is only valid until the reader moves
/// on. Use [`freeze`](#method.freeze) to keep a copy.
///
/// `Record` is also a builder: `push_field`, `push_absent` and `push_opt`
/// append fields, for example to hand a record to `Writer::write_row`.
///
/// # Typed accessors
///
/// The `get_*` methods parse a field on demand. They return `Ok(None)` for
/// a zero length field, `Ok(Some(value))` when parsing succeeds, and a
/// `FieldError` carrying the field index and raw bytes otherwise. Asking
/// for a field that does not exist is also a `FieldError`.
///
/// ```
/// use dialect_csv::Record;
///
/// let mut rec = Record::new();
/// rec.push_field(b"42").push_absent().push_field(b"TRUE");
///
/// assert_eq!(rec.get_i32(0).unwrap(), Some(42));
/// assert_eq!(rec.get_i32(1).unwrap(), None);
/// assert_eq!(rec.get_bool(2).unwrap(), Some(true));
/// assert!(rec.get_i32(3).is_err());
/// ```
#[derive(Clone, Default)]
pub struct Record {
    /// All fields in this record, stored contiguously. Bytes past the end
    /// of the last field belong to a field still being read.
    fields: Vec<u8>,
    /// The location and presence of each field in this record.
    bounds: Bounds,
    /// The position of this record in its input, if it was read.
    pos: Option<Position>,
}

/// The bounds of fields in a single record.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
struct Bounds {
    /// The ending index of each field.
    ends: Vec<usize>,
    /// Whether each field is absent.
    absent: Vec<bool>,
}

impl Bounds {
    /// Returns the bounds of field `i`.
    fn get(&self, i: usize) -> Option<ops::Range<usize>> {
        let end = *self.ends.get(i)?;
        let start = match i.checked_sub(1) {
            None => 0,
            Some(i) => self.ends[i],
        };
        Some(start..end)
    }

    /// Return the last position of the last field.
    ///
    /// If there are no fields, this returns `0`.
    #[inline(always)]
    fn end(&self) -> usize {
        self.ends.last().cloned().unwrap_or(0)
    }

    fn add(&mut self, end: usize, absent: bool) {
        self.ends.push(end);
        self.absent.push(absent);
    }

    fn clear(&mut self) {
        self.ends.clear();
        self.absent.clear();
    }
}

impl Record {
    /// Create a new empty `Record`.
    pub fn new() -> Record {
        Record::with_capacity(0, 0)
    }

    /// Create a new empty `Record` with room for `buffer` bytes of field
    /// data and `fields` fields.
    pub fn with_capacity(buffer: usize, fields: usize) -> Record {
        Record {
            fields: Vec::with_capacity(buffer),
            bounds: Bounds {
                ends: Vec::with_capacity(fields),
                absent: Vec::with_capacity(fields),
            },
            pos: None,
        }
    }

    /// Returns the number of fields in this record.
    pub fn len(&self) -> usize {
        self.bounds.ends.len()
    }

    /// Returns true if and only if this record has no fields.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return the field at index `i`.
    ///
    /// An absent field is returned as an empty slice. If no field at index
    /// `i` exists, then this returns `None`.
    pub fn get(&self, i: usize) -> Option<&[u8]> {
        self.bounds.get(i).map(|range| &self.fields[range])
    }

    /// Returns the field at index `i`, or `None` if it is absent or does
    /// not exist.
    pub fn get_opt(&self, i: usize) -> Option<&[u8]> {
        if self.is_absent(i) {
            None
        } else {
            self.get(i)
        }
    }

    /// Returns true if the field at index `i` exists and is absent.
    pub fn is_absent(&self, i: usize) -> bool {
        self.bounds.absent.get(i).cloned().unwrap_or(false)
    }

    /// Returns an iterator over all fields in this record. Absent fields
    /// are yielded as empty slices.
    pub fn iter(&self) -> RecordIter<'_> {
        RecordIter { rec: self, i: 0 }
    }

    /// Returns an iterator over all fields in this record, yielding `None`
    /// for absent fields.
    pub fn iter_opt(&self) -> impl Iterator<Item = Option<&[u8]>> + '_ {
        self.iter()
            .zip(self.bounds.absent.iter())
            .map(|(field, &absent)| if absent { None } else { Some(field) })
    }

    /// Return the position of this record, if available.
    ///
    /// Records filled by a reader always have a position.
    pub fn position(&self) -> Option<&Position> {
        self.pos.as_ref()
    }

    /// Set the position of this record.
    pub fn set_position(&mut self, pos: Option<Position>) {
        self.pos = pos;
    }

    /// Clear this record so that it has zero fields.
    ///
    /// This keeps the allocated memory for reuse.
    pub fn clear(&mut self) {
        self.fields.clear();
        self.bounds.clear();
        self.pos = None;
    }

    /// Append a present field.
    ///
    /// An empty `field` is present but empty, not absent.
    pub fn push_field<T: AsRef<[u8]>>(&mut self, field: T) -> &mut Record {
        self.truncate_field();
        self.fields.extend_from_slice(field.as_ref());
        self.bounds.add(self.fields.len(), false);
        self
    }

    /// Append an absent field.
    pub fn push_absent(&mut self) -> &mut Record {
        self.truncate_field();
        self.bounds.add(self.fields.len(), true);
        self
    }

    /// Append a field that is present if `field` is `Some`.
    pub fn push_opt<T: AsRef<[u8]>>(
        &mut self,
        field: Option<T>,
    ) -> &mut Record {
        match field {
            None => self.push_absent(),
            Some(field) => self.push_field(field),
        }
    }

    /// Deep-copies this record into an immutable snapshot.
    ///
    /// The snapshot stays valid after the reader that filled this record
    /// moves on.
    pub fn freeze(&self) -> FrozenRecord {
        let mut rec = Record {
            fields: self.fields[..self.bounds.end()].to_vec(),
            bounds: self.bounds.clone(),
            pos: self.pos.clone(),
        };
        rec.bounds.ends.shrink_to_fit();
        rec.bounds.absent.shrink_to_fit();
        FrozenRecord(rec)
    }

    /// The bytes of all complete fields plus the field being read.
    pub(crate) fn buffered_len(&self) -> usize {
        self.fields.len()
    }

    /// Appends bytes to the field being read.
    pub(crate) fn extend_field(&mut self, bytes: &[u8]) {
        self.fields.extend_from_slice(bytes);
    }

    /// Appends the last bytes of the field being read and completes it.
    ///
    /// A zero length field is absent unless it was quoted.
    pub(crate) fn end_field(&mut self, bytes: &[u8], quoted: bool) {
        self.fields.extend_from_slice(bytes);
        let start = self.bounds.end();
        let absent = !quoted && self.fields.len() == start;
        self.bounds.add(self.fields.len(), absent);
    }

    /// Drops the bytes of the field being read.
    pub(crate) fn truncate_field(&mut self) {
        let end = self.bounds.end();
        self.fields.truncate(end);
    }

    /// Runs a parser over the text of field `i`.
    ///
    /// A zero length field yields `Ok(None)` without running the parser.
    fn scalar<T, F>(&self, i: usize, parse: F) -> Result<Option<T>, FieldError>
    where
        F: FnOnce(&str) -> Result<T, FieldErrorKind>,
    {
        let raw = self.field(i)?;
        if raw.is_empty() {
            return Ok(None);
        }
        let text = str::from_utf8(raw)
            .map_err(|err| FieldError::new(i, raw, FieldErrorKind::Utf8(err)))?;
        parse(text).map(Some).map_err(|kind| FieldError::new(i, raw, kind))
    }

    fn field(&self, i: usize) -> Result<&[u8], FieldError> {
        self.get(i)
            .ok_or_else(|| FieldError::new(i, b"", FieldErrorKind::NoSuchField))
    }

    /// Returns field `i` as a string slice.
    ///
    /// Unlike the other accessors, this distinguishes an absent field
    /// (`Ok(None)`) from a present but empty one (`Ok(Some(""))`).
    pub fn get_str(&self, i: usize) -> Result<Option<&str>, FieldError> {
        let raw = self.field(i)?;
        if self.is_absent(i) {
            return Ok(None);
        }
        str::from_utf8(raw)
            .map(Some)
            .map_err(|err| FieldError::new(i, raw, FieldErrorKind::Utf8(err)))
    }

    /// Returns field `i` as a boolean.
    ///
    /// `true` and `false` are accepted in any ASCII case.
    pub fn get_bool(&self, i: usize) -> Result<Option<bool>, FieldError> {
        self.scalar(i, |s| {
            if s.eq_ignore_ascii_case("true") {
                Ok(true)
            } else if s.eq_ignore_ascii_case("false") {
                Ok(false)
            } else {
                Err(FieldErrorKind::ParseBool)
            }
        })
    }

    /// Returns field `i` as a 32-bit float.
    pub fn get_f32(&self, i: usize) -> Result<Option<f32>, FieldError> {
        self.scalar(i, |s| s.parse().map_err(FieldErrorKind::ParseFloat))
    }

    /// Returns field `i` as a 64-bit float.
    pub fn get_f64(&self, i: usize) -> Result<Option<f64>, FieldError> {
        self.scalar(i, |s| s.parse().map_err(FieldErrorKind::ParseFloat))
    }

    /// Parses field `i` with its `FromStr` implementation.
    ///
    /// ```
    /// use std::net::Ipv4Addr;
    /// use dialect_csv::Record;
    ///
    /// let mut rec = Record::new();
    /// rec.push_field("127.0.0.1");
    /// let ip: Option<Ipv4Addr> = rec.parse(0).unwrap();
    /// assert_eq!(ip, Some(Ipv4Addr::LOCALHOST));
    /// ```
    pub fn parse<T>(&self, i: usize) -> Result<Option<T>, FieldError>
    where
        T: FromStr,
        T::Err: error::Error + Send + Sync + 'static,
    {
        self.scalar(i, |s| {
            s.parse().map_err(|err| FieldErrorKind::Other(Box::new(err)))
        })
    }
}

macro_rules! get_int {
    ($name:ident, $name_radix:ident, $ty:ty) => {
        #[doc = concat!("Returns field `i` as an `", stringify!($ty), "`.")]
        pub fn $name(&self, i: usize) -> Result<Option<$ty>, FieldError> {
            self.$name_radix(i, 10)
        }

        #[doc = concat!(
            "Returns field `i` as an `", stringify!($ty),
            "` written in the given radix, which must be in `2..=36`."
        )]
        pub fn $name_radix(
            &self,
            i: usize,
            radix: u32,
        ) -> Result<Option<$ty>, FieldError> {
            if radix < 2 || radix > 36 {
                let raw = self.field(i)?;
                return Err(FieldError::new(
                    i,
                    raw,
                    FieldErrorKind::InvalidRadix(radix),
                ));
            }
            self.scalar(i, |s| {
                <$ty>::from_str_radix(s, radix)
                    .map_err(FieldErrorKind::ParseInt)
            })
        }
    };
}

impl Record {
    get_int!(get_i16, get_i16_radix, i16);
    get_int!(get_i32, get_i32_radix, i32);
    get_int!(get_i64, get_i64_radix, i64);
}

#[cfg(feature = "bignum")]
impl Record {
    /// Returns field `i` as an arbitrary precision integer.
    pub fn get_big_int(
        &self,
        i: usize,
    ) -> Result<Option<num_bigint::BigInt>, FieldError> {
        self.get_big_int_radix(i, 10)
    }

    /// Returns field `i` as an arbitrary precision integer written in the
    /// given radix, which must be in `2..=36`.
    pub fn get_big_int_radix(
        &self,
        i: usize,
        radix: u32,
    ) -> Result<Option<num_bigint::BigInt>, FieldError> {
        if radix < 2 || radix > 36 {
            let raw = self.field(i)?;
            return Err(FieldError::new(
                i,
                raw,
                FieldErrorKind::InvalidRadix(radix),
            ));
        }
        self.scalar(i, |s| {
            num_bigint::BigInt::parse_bytes(s.as_bytes(), radix)
                .ok_or(FieldErrorKind::ParseBigInt)
        })
    }

    /// Returns field `i` as an arbitrary precision decimal.
    pub fn get_decimal(
        &self,
        i: usize,
    ) -> Result<Option<bigdecimal::BigDecimal>, FieldError> {
        self.scalar(i, |s| s.parse().map_err(FieldErrorKind::ParseDecimal))
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Record) -> bool {
        self.bounds == other.bounds
            && self.fields[..self.bounds.end()]
                == other.fields[..other.bounds.end()]
    }
}

impl Eq for Record {}

impl hash::Hash for Record {
    fn hash<H: hash::Hasher>(&self, state: &mut H) {
        self.bounds.hash(state);
        self.fields[..self.bounds.end()].hash(state);
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Record(")?;
        f.debug_list()
            .entries(self.iter_opt().map(|field| field.map(BStr::new)))
            .finish()?;
        write!(f, ")")
    }
}

/// Renders the record as one CSV line with `,` and `"`, without a line
/// terminator. Invalid UTF-8 is replaced.
impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut line = Vec::with_capacity(self.bounds.end() + self.len());
        for (i, field) in self.iter_opt().enumerate() {
            if i > 0 {
                line.push(b',');
            }
            let field = match field {
                None => continue,
                Some(field) => field,
            };
            if !should_quote(field, b',', b'"') {
                line.extend_from_slice(field);
                continue;
            }
            let start = line.len();
            line.resize(start + 2 * field.len() + 2, 0);
            line[start] = b'"';
            let (_, _, n) = quote(field, &mut line[start + 1..], b'"');
            line.truncate(start + 1 + n);
            line.push(b'"');
        }
        fmt::Display::fmt(BStr::new(&line), f)
    }
}

impl ops::Index<usize> for Record {
    type Output = [u8];

    fn index(&self, i: usize) -> &[u8] {
        match self.get(i) {
            Some(field) => field,
            None => panic!("index out of bounds: no field at index {}", i),
        }
    }
}

impl<'a> IntoIterator for &'a Record {
    type IntoIter = RecordIter<'a>;
    type Item = &'a [u8];

    fn into_iter(self) -> RecordIter<'a> {
        self.iter()
    }
}

impl<T: AsRef<[u8]>> Extend<Option<T>> for Record {
    fn extend<I: IntoIterator<Item = Option<T>>>(&mut self, iter: I) {
        for field in iter {
            self.push_opt(field);
        }
    }
}

impl<T: AsRef<[u8]>> From<Vec<T>> for Record {
    fn from(fields: Vec<T>) -> Record {
        let mut rec = Record::new();
        for field in fields {
            rec.push_field(field);
        }
        rec
    }
}

/// An iterator over the fields in a record.
pub struct RecordIter<'r> {
    rec: &'r Record,
    i: usize,
}

impl<'r> Iterator for RecordIter<'r> {
    type Item = &'r [u8];

    fn next(&mut self) -> Option<&'r [u8]> {
        let field = self.rec.get(self.i)?;
        self.i += 1;
        Some(field)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.rec.len() - self.i;
        (n, Some(n))
    }
}

impl<'r> ExactSizeIterator for RecordIter<'r> {}

/// An immutable copy of a `Record`.
///
/// A frozen record is produced by `Record::freeze` or by a reader's
/// `records` iterator. It offers every read-only method of `Record`
/// through `Deref`, but none of the methods that modify a record.
///
/// ```
/// use dialect_csv::FrozenRecord;
///
/// let rec = FrozenRecord::from(vec!["a", "b,c"]);
/// assert_eq!(rec.len(), 2);
/// assert_eq!(rec.to_string(), "a,\"b,c\"");
/// ```
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct FrozenRecord(Record);

impl FrozenRecord {
    /// Turns this snapshot back into a mutable record.
    pub fn into_record(self) -> Record {
        self.0
    }
}

impl ops::Deref for FrozenRecord {
    type Target = Record;

    fn deref(&self) -> &Record {
        &self.0
    }
}

impl AsRef<Record> for FrozenRecord {
    fn as_ref(&self) -> &Record {
        &self.0
    }
}

impl fmt::Display for FrozenRecord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl<T: AsRef<[u8]>> From<Vec<T>> for FrozenRecord {
    fn from(fields: Vec<T>) -> FrozenRecord {
        Record::from(fields).freeze()
    }
}

impl<'a> IntoIterator for &'a FrozenRecord {
    type IntoIter = RecordIter<'a>;
    type Item = &'a [u8];

    fn into_iter(self) -> RecordIter<'a> {
        self.0.iter()
    }
}
