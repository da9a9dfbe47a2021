use std::error;
use std::fmt;
use std::io;
use std::num;
use std::result;
use std::str;

use bstr::{BString, ByteSlice};
use dialect_csv_core::{Malformation, Printable};

use crate::mapping::BoxError;
use crate::record::{Position, Record};

/// A type alias for `Result<T, dialect_csv::Error>`.
pub type Result<T> = result::Result<T, Error>;

/// An error that can occur when processing CSV data.
///
/// This error can happen when writing or reading CSV data.
///
/// Note that there are some important scenarios where an error is
/// impossible. For example, the relaxed and Excel dialects never report
/// malformed input, so a flexible reader over an in-memory buffer with
/// either of them can only fail with `RecordTooLong`.
#[derive(Debug)]
pub enum Error {
    /// An I/O error that occurred while reading or writing CSV data.
    Io(io::Error),
    /// The dialect rejected its input.
    Malformed {
        /// The position of the offending byte. The record index is that of
        /// the record being read.
        pos: Position,
        /// The offending byte, or `None` if input ended too early.
        byte: Option<u8>,
        /// Why the byte was rejected.
        kind: Malformation,
    },
    /// A record grew beyond the configured maximum length.
    RecordTooLong {
        /// The position at which the record started.
        pos: Position,
        /// The configured maximum, in bytes.
        limit: usize,
    },
    /// A record has fewer fields than the first record. This only occurs
    /// when the `flexible` option is disabled.
    TooFewFields {
        /// The position of the short record.
        pos: Position,
        /// The number of fields in the first record.
        expected: u64,
        /// The number of fields in the short record.
        found: u64,
    },
    /// A record has more fields than the first record. This only occurs
    /// when the `flexible` option is disabled.
    TooManyFields {
        /// The position of the long record.
        pos: Position,
        /// The number of fields in the first record.
        expected: u64,
        /// The number of fields in the long record.
        found: u64,
    },
    /// A field could not be converted to the requested type.
    Field(FieldError),
    /// A record could not be mapped to or from a value.
    Conversion(ConversionError),
    /// The reader or writer was used after it was closed.
    Closed,
}

impl Error {
    /// The position this error refers to, if any.
    pub fn position(&self) -> Option<&Position> {
        match *self {
            Error::Malformed { ref pos, .. }
            | Error::RecordTooLong { ref pos, .. }
            | Error::TooFewFields { ref pos, .. }
            | Error::TooManyFields { ref pos, .. } => Some(pos),
            _ => None,
        }
    }

    /// Returns true if this is an I/O error.
    pub fn is_io_error(&self) -> bool {
        match *self {
            Error::Io(_) => true,
            _ => false,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<FieldError> for Error {
    fn from(err: FieldError) -> Error {
        Error::Field(err)
    }
}

impl From<ConversionError> for Error {
    fn from(err: ConversionError) -> Error {
        Error::Conversion(err)
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> io::Error {
        match err {
            Error::Io(err) => err,
            err => io::Error::new(io::ErrorKind::Other, err),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            Error::Io(ref err) => Some(err),
            Error::Field(ref err) => Some(err),
            Error::Conversion(ref err) => Some(err),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Io(ref err) => err.fmt(f),
            Error::Malformed { ref pos, byte, kind } => write!(
                f,
                "CSV parse error: record {} (line {}, byte {}): {} '{}'",
                pos.record(),
                pos.line(),
                pos.byte(),
                kind,
                Printable(byte)
            ),
            Error::RecordTooLong { ref pos, limit } => write!(
                f,
                "CSV parse error: record {} (line {}, byte {}): \
                 record is longer than {} bytes",
                pos.record(),
                pos.line(),
                pos.byte(),
                limit
            ),
            Error::TooFewFields { ref pos, expected, found } => write!(
                f,
                "CSV error: record {} (line {}, byte {}): \
                 found record with {} fields, but the first record \
                 has {} fields",
                pos.record(),
                pos.line(),
                pos.byte(),
                found,
                expected
            ),
            Error::TooManyFields { ref pos, expected, found } => write!(
                f,
                "CSV error: record {} (line {}, byte {}): \
                 found record with {} fields, but the first record \
                 has {} fields",
                pos.record(),
                pos.line(),
                pos.byte(),
                found,
                expected
            ),
            Error::Field(ref err) => write!(f, "CSV conversion error: {}", err),
            Error::Conversion(ref err) => err.fmt(f),
            Error::Closed => {
                write!(f, "CSV error: the reader or writer is closed")
            }
        }
    }
}

/// An error that occurs when a typed accessor of a `Record` fails.
///
/// The error includes the index of the field and its raw bytes.
#[derive(Debug)]
pub struct FieldError {
    field: usize,
    raw: BString,
    kind: FieldErrorKind,
}

/// The specific kind of a `FieldError`.
#[derive(Debug)]
pub enum FieldErrorKind {
    /// The record has no field at the requested index.
    NoSuchField,
    /// A radix outside `2..=36` was requested.
    InvalidRadix(u32),
    /// The field is not valid UTF-8.
    Utf8(str::Utf8Error),
    /// The field is neither `true` nor `false`.
    ParseBool,
    /// The field is not an integer of the requested type.
    ParseInt(num::ParseIntError),
    /// The field is not a floating point number.
    ParseFloat(num::ParseFloatError),
    /// The field is not an integer in the requested radix.
    #[cfg(feature = "bignum")]
    ParseBigInt,
    /// The field is not a decimal number.
    #[cfg(feature = "bignum")]
    ParseDecimal(bigdecimal::ParseBigDecimalError),
    /// Any other conversion failure, e.g. from `Record::parse`.
    Other(BoxError),
}

impl FieldError {
    pub(crate) fn new(
        field: usize,
        raw: &[u8],
        kind: FieldErrorKind,
    ) -> FieldError {
        FieldError { field, raw: BString::from(raw), kind }
    }

    /// The index of the field (starting at 0) that failed to convert.
    pub fn field(&self) -> usize {
        self.field
    }

    /// The raw contents of the field.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// The specific kind of this error.
    pub fn kind(&self) -> &FieldErrorKind {
        &self.kind
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "field {} ({:?}): {}", self.field, self.raw, self.kind)
    }
}

impl fmt::Display for FieldErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use self::FieldErrorKind::*;

        match *self {
            NoSuchField => write!(f, "no such field"),
            InvalidRadix(radix) => write!(f, "invalid radix {}", radix),
            Utf8(ref err) => write!(f, "invalid UTF-8: {}", err),
            ParseBool => write!(f, "expected 'true' or 'false'"),
            ParseInt(ref err) => err.fmt(f),
            ParseFloat(ref err) => err.fmt(f),
            #[cfg(feature = "bignum")]
            ParseBigInt => write!(f, "invalid big integer literal"),
            #[cfg(feature = "bignum")]
            ParseDecimal(ref err) => err.fmt(f),
            Other(ref err) => err.fmt(f),
        }
    }
}

impl error::Error for FieldError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self.kind {
            FieldErrorKind::Utf8(ref err) => Some(err),
            FieldErrorKind::ParseInt(ref err) => Some(err),
            FieldErrorKind::ParseFloat(ref err) => Some(err),
            #[cfg(feature = "bignum")]
            FieldErrorKind::ParseDecimal(ref err) => Some(err),
            FieldErrorKind::Other(ref err) => Some(&**err),
            _ => None,
        }
    }
}

/// An error raised while mapping a record to a value, or a value to a
/// record.
///
/// It carries the fields of the offending record, decoded lossily as UTF-8
/// with `None` for absent fields, and the error of the mapping function.
#[derive(Debug)]
pub struct ConversionError {
    fields: Vec<Option<String>>,
    pos: Option<Position>,
    err: BoxError,
}

impl ConversionError {
    pub(crate) fn new(record: &Record, err: BoxError) -> ConversionError {
        let fields = record
            .iter_opt()
            .map(|field| field.map(|f| f.to_str_lossy().into_owned()))
            .collect();
        ConversionError { fields, pos: record.position().cloned(), err }
    }

    /// The fields of the record that failed to convert.
    pub fn fields(&self) -> &[Option<String>] {
        &self.fields
    }

    /// The position of the record, if it was read from a reader.
    pub fn position(&self) -> Option<&Position> {
        self.pos.as_ref()
    }

    /// The error returned by the mapping function.
    pub fn error(&self) -> &(dyn error::Error + Send + Sync + 'static) {
        &*self.err
    }

    /// Unwraps the error returned by the mapping function.
    pub fn into_error(self) -> BoxError {
        self.err
    }
}

impl fmt::Display for ConversionError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.pos {
            None => write!(f, "CSV conversion error: {}", self.err)?,
            Some(ref pos) => write!(
                f,
                "CSV conversion error: record {} (line {}, byte {}): {}",
                pos.record(),
                pos.line(),
                pos.byte(),
                self.err
            )?,
        }
        write!(f, " in {:?}", self.fields)
    }
}

impl error::Error for ConversionError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        Some(&*self.err)
    }
}

/// `IntoInnerError` occurs when consuming a `Writer` fails.
///
/// Consuming the `Writer` causes a flush to happen. If the flush fails,
/// then this error is returned, which contains both the original `Writer`
/// and the error that occurred.
///
/// The type parameter `W` is the unconsumed writer.
pub struct IntoInnerError<W> {
    wtr: W,
    err: io::Error,
}

impl<W> IntoInnerError<W> {
    pub(crate) fn new(wtr: W, err: io::Error) -> IntoInnerError<W> {
        IntoInnerError { wtr, err }
    }

    /// Returns the error which caused the call to `into_inner` to fail.
    ///
    /// This error was returned when attempting to flush the internal
    /// buffer.
    pub fn error(&self) -> &io::Error {
        &self.err
    }

    /// Returns the underlying writer which generated the error.
    ///
    /// The returned value can be used for error recovery, such as
    /// re-inspecting the buffer.
    pub fn into_inner(self) -> W {
        self.wtr
    }
}

impl<W: std::any::Any> error::Error for IntoInnerError<W> {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        Some(&self.err)
    }
}

impl<W> fmt::Display for IntoInnerError<W> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.err.fmt(f)
    }
}

impl<W> fmt::Debug for IntoInnerError<W> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.err.fmt(f)
    }
}
