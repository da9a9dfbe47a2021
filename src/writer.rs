use std::cmp;
use std::fs::File;
use std::io;
use std::mem;
use std::path::Path;
use std::result;

use dialect_csv_core::{
    Dialect, WriteResult, Writer as CoreWriter,
    WriterBuilder as CoreWriterBuilder,
};
use log::debug;

use crate::error::{ConversionError, Error, IntoInnerError, Result};
use crate::mapping::RecordEncoder;
use crate::record::{Position, Record};

/// Builds a CSV writer with various configuration knobs.
///
/// ```
/// use dialect_csv::{DecimalSeparator, DialectProvider, ExcelProvider};
/// use dialect_csv::WriterBuilder;
///
/// let excel = ExcelProvider::new(DecimalSeparator::Comma).provide();
/// let mut wtr = WriterBuilder::new().dialect(&excel).from_writer(vec![]);
/// wtr.write_record(vec![Some("1,5"), Some("a;b")]).unwrap();
///
/// let data = wtr.into_inner().unwrap();
/// assert_eq!(data, b"1,5;\"a;b\"\r\n");
/// ```
#[derive(Debug)]
pub struct WriterBuilder {
    builder: CoreWriterBuilder,
    capacity: usize,
    flexible: bool,
}

impl Default for WriterBuilder {
    fn default() -> WriterBuilder {
        WriterBuilder {
            builder: CoreWriterBuilder::default(),
            capacity: 8 * (1 << 10),
            flexible: true,
        }
    }
}

impl WriterBuilder {
    /// Create a new builder for configuring CSV writing.
    pub fn new() -> WriterBuilder {
        WriterBuilder::default()
    }

    /// Build a CSV writer from this configuration that writes data to
    /// `wtr`.
    ///
    /// The writer does its own buffering, so `wtr` does not need to be
    /// wrapped in an `io::BufWriter`.
    pub fn from_writer<W: io::Write>(&self, wtr: W) -> Writer<W> {
        Writer::new(self, wtr)
    }

    /// Build a CSV writer from this configuration that writes data to the
    /// file at `path`. The file is created if it does not exist and is
    /// truncated otherwise.
    pub fn from_path<P: AsRef<Path>>(&self, path: P) -> Result<Writer<File>> {
        Ok(Writer::new(self, File::create(path)?))
    }

    /// The field delimiter to use when writing CSV.
    ///
    /// The default is `b','`.
    pub fn delimiter(&mut self, delimiter: u8) -> &mut WriterBuilder {
        self.builder.delimiter(delimiter);
        self
    }

    /// The quote character to use when writing CSV.
    ///
    /// The default is `b'"'`.
    pub fn quote(&mut self, quote: u8) -> &mut WriterBuilder {
        self.builder.quote(quote);
        self
    }

    /// Use the delimiter and quote of `dialect`.
    ///
    /// Pass a dialect that has already read its input to write with a
    /// delimiter it detected.
    pub fn dialect<D: Dialect>(&mut self, dialect: &D) -> &mut WriterBuilder {
        self.builder.delimiter(dialect.delimiter()).quote(dialect.quote());
        self
    }

    /// Whether a field containing `\r` or `\n` is quoted. The default is
    /// `false`.
    ///
    /// Enable this to write data that the strict dialects can read back.
    pub fn quote_line_breaks(&mut self, yes: bool) -> &mut WriterBuilder {
        self.builder.quote_line_breaks(yes);
        self
    }

    /// The size of the internal output buffer, in bytes. The default is
    /// 8 KiB.
    pub fn buffer_capacity(&mut self, capacity: usize) -> &mut WriterBuilder {
        self.capacity = capacity;
        self
    }

    /// Whether records may have differing numbers of fields. The default
    /// is `true`.
    ///
    /// When disabled, a record with a different number of fields than the
    /// first record written fails with `Error::TooFewFields` or
    /// `Error::TooManyFields`, and nothing of it is written.
    pub fn flexible(&mut self, yes: bool) -> &mut WriterBuilder {
        self.flexible = yes;
        self
    }
}

/// A buffered CSV writer.
///
/// Every record ends with `\r\n`. A field is quoted only when it has to
/// be: when it is empty or contains the delimiter or the quote. Absent
/// fields are written as nothing at all, so they read back as absent.
///
/// The buffer is flushed when the writer is dropped, but errors are then
/// ignored. Call [`flush`](#method.flush), [`close`](#method.close) or
/// [`into_inner`](#method.into_inner) to see them.
///
/// ```
/// use dialect_csv::Writer;
///
/// let mut wtr = Writer::from_writer(vec![]);
/// wtr.write_record(vec![Some("a"), Some("b,c"), Some(""), None]).unwrap();
/// wtr.write_record(vec![Some("d\"e")]).unwrap();
///
/// let data = wtr.into_inner().unwrap();
/// assert_eq!(data, b"a,\"b,c\",\"\",\r\n\"d\"\"e\"\r\n");
/// ```
pub struct Writer<W: io::Write> {
    core: CoreWriter,
    wtr: Option<W>,
    buf: Buffer,
    state: WriterState,
    /// Reused for records built by encoders.
    scratch: Record,
}

#[derive(Debug)]
struct WriterState {
    flexible: bool,
    first_len: Option<u64>,
    /// Records written so far.
    records: u64,
    /// Bytes handed to the underlying writer so far.
    flushed: u64,
    /// Line feeds handed to the underlying writer so far.
    lines: u64,
    /// Set while the underlying writer runs, so a panic in it does not
    /// lead to a second write when dropping.
    panicked: bool,
}

/// A simple internal buffer for output.
#[derive(Debug)]
struct Buffer {
    buf: Vec<u8>,
    len: usize,
}

impl<W: io::Write> Drop for Writer<W> {
    fn drop(&mut self) {
        if self.wtr.is_some() && !self.state.panicked {
            let _ = self.flush();
        }
    }
}

impl Writer<File> {
    /// Create a writer with a default configuration for the file at
    /// `path`. The file is created if it does not exist and is truncated
    /// otherwise.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Writer<File>> {
        WriterBuilder::new().from_path(path)
    }
}

impl<W: io::Write> Writer<W> {
    fn new(builder: &WriterBuilder, wtr: W) -> Writer<W> {
        Writer {
            core: builder.builder.build(),
            wtr: Some(wtr),
            // The largest piece the core writer emits at once is a closing
            // quote followed by `\r\n`.
            buf: Buffer { buf: vec![0; cmp::max(3, builder.capacity)], len: 0 },
            state: WriterState {
                flexible: builder.flexible,
                first_len: None,
                records: 0,
                flushed: 0,
                lines: 0,
                panicked: false,
            },
            scratch: Record::new(),
        }
    }

    /// Create a writer with a default configuration that writes to `wtr`.
    pub fn from_writer(wtr: W) -> Writer<W> {
        WriterBuilder::new().from_writer(wtr)
    }

    /// Write a single record.
    ///
    /// `None` is written as an absent field and `Some("")` as `""`. An
    /// empty iterator writes an empty line, which reads back as a record
    /// with one absent field.
    pub fn write_record<I, T>(&mut self, record: I) -> Result<()>
    where
        I: IntoIterator<Item = Option<T>>,
        T: AsRef<[u8]>,
    {
        let mut rec = mem::take(&mut self.scratch);
        rec.clear();
        rec.extend(record);
        let res = self.write_row(&rec);
        self.scratch = rec;
        res
    }

    /// Write a record built with `Record`'s builder methods or read by a
    /// `Reader`.
    pub fn write_row(&mut self, record: &Record) -> Result<()> {
        if self.wtr.is_none() {
            return Err(Error::Closed);
        }
        self.check_field_count(record.len() as u64)?;
        for (i, field) in record.iter_opt().enumerate() {
            if i > 0 {
                self.write_delimiter()?;
            }
            if let Some(field) = field {
                self.write_field(field)?;
            }
        }
        self.write_terminator()
    }

    /// Maps `value` to a record with `encoder` and writes it.
    ///
    /// If the encoder fails, nothing is written and the error carries the
    /// fields the encoder produced before failing.
    pub fn encode<T, C>(&mut self, value: &T, encoder: &C) -> Result<()>
    where
        T: ?Sized,
        C: RecordEncoder<T>,
    {
        if self.wtr.is_none() {
            return Err(Error::Closed);
        }
        let mut rec = mem::take(&mut self.scratch);
        rec.clear();
        let res = match encoder.encode(value, &mut rec) {
            Ok(()) => self.write_row(&rec),
            Err(err) => Err(Error::Conversion(ConversionError::new(&rec, err))),
        };
        self.scratch = rec;
        res
    }

    /// Serializes `value` with serde and writes it as one record.
    ///
    /// See [`mapping::Serde`](mapping/struct.Serde.html) for how values map
    /// to fields.
    #[cfg(feature = "serde")]
    pub fn serialize<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + serde::Serialize,
    {
        self.encode(value, &crate::mapping::Serde)
    }

    /// Flush the contents of the internal buffer to the underlying writer
    /// and flush the underlying writer.
    pub fn flush(&mut self) -> Result<()> {
        self.flush_buf()?;
        match self.wtr.as_mut() {
            None => Err(Error::Closed),
            Some(wtr) => {
                self.state.panicked = true;
                let res = wtr.flush();
                self.state.panicked = false;
                Ok(res?)
            }
        }
    }

    /// Flushes this writer and drops the underlying writer.
    ///
    /// The underlying writer is dropped even if flushing fails. Closing a
    /// closed writer does nothing. Writing afterwards fails with
    /// `Error::Closed`.
    pub fn close(&mut self) -> Result<()> {
        if self.wtr.is_none() {
            return Ok(());
        }
        let res = self.flush();
        self.wtr = None;
        debug!("closed CSV writer after {} records", self.state.records);
        res
    }

    /// Flush the internal buffer and return the underlying writer.
    pub fn into_inner(
        mut self,
    ) -> result::Result<W, IntoInnerError<Writer<W>>> {
        if let Err(err) = self.flush() {
            return Err(IntoInnerError::new(self, err.into()));
        }
        match self.wtr.take() {
            Some(wtr) => Ok(wtr),
            None => Err(IntoInnerError::new(self, Error::Closed.into())),
        }
    }

    /// The position at which the next record will start.
    pub fn position(&self) -> Position {
        let buffered = self.buf.readable();
        let lines = buffered.iter().filter(|&&b| b == b'\n').count() as u64;
        let mut pos = Position::new();
        pos.set_byte(self.state.flushed + buffered.len() as u64)
            .set_line(1 + self.state.lines + lines)
            .set_record(self.state.records);
        pos
    }

    fn check_field_count(&mut self, found: u64) -> Result<()> {
        if self.state.flexible {
            return Ok(());
        }
        let expected = match self.state.first_len {
            None => {
                self.state.first_len = Some(found);
                return Ok(());
            }
            Some(expected) => expected,
        };
        if found < expected {
            let pos = self.position();
            return Err(Error::TooFewFields { pos, expected, found });
        }
        if found > expected {
            let pos = self.position();
            return Err(Error::TooManyFields { pos, expected, found });
        }
        Ok(())
    }

    fn write_field(&mut self, mut field: &[u8]) -> Result<()> {
        loop {
            let (res, nin, nout) = self.core.field(field, self.buf.writable());
            field = &field[nin..];
            self.buf.written(nout);
            match res {
                WriteResult::InputEmpty => return Ok(()),
                WriteResult::OutputFull => self.flush_buf()?,
            }
        }
    }

    fn write_delimiter(&mut self) -> Result<()> {
        loop {
            let (res, nout) = self.core.delimiter(self.buf.writable());
            self.buf.written(nout);
            match res {
                WriteResult::InputEmpty => return Ok(()),
                WriteResult::OutputFull => self.flush_buf()?,
            }
        }
    }

    fn write_terminator(&mut self) -> Result<()> {
        loop {
            let (res, nout) = self.core.terminator(self.buf.writable());
            self.buf.written(nout);
            match res {
                WriteResult::InputEmpty => {
                    self.state.records += 1;
                    return Ok(());
                }
                WriteResult::OutputFull => self.flush_buf()?,
            }
        }
    }

    fn flush_buf(&mut self) -> Result<()> {
        let wtr = match self.wtr.as_mut() {
            None => return Err(Error::Closed),
            Some(wtr) => wtr,
        };
        let data = self.buf.readable();
        self.state.panicked = true;
        let res = wtr.write_all(data);
        self.state.panicked = false;
        res?;
        self.state.flushed += data.len() as u64;
        self.state.lines += data.iter().filter(|&&b| b == b'\n').count() as u64;
        self.buf.clear();
        Ok(())
    }
}

impl Buffer {
    /// Returns a slice of the buffer's current contents.
    #[inline]
    fn readable(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    /// Returns a mutable slice of the remaining space in this buffer.
    #[inline]
    fn writable(&mut self) -> &mut [u8] {
        &mut self.buf[self.len..]
    }

    /// Indicates that `n` bytes have been written to this buffer.
    #[inline]
    fn written(&mut self, n: usize) {
        self.len += n;
    }

    /// Clear the buffer.
    #[inline]
    fn clear(&mut self) {
        self.len = 0;
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use dialect_csv_core::{DialectProvider, StrictProvider};

    use super::{Writer, WriterBuilder};
    use crate::error::Error;
    use crate::mapping::BoxError;
    use crate::reader::ReaderBuilder;
    use crate::record::Record;

    fn wtr_as_string(wtr: Writer<Vec<u8>>) -> String {
        String::from_utf8(wtr.into_inner().unwrap()).unwrap()
    }

    #[test]
    fn minimal_quoting() {
        let mut wtr = Writer::from_writer(vec![]);
        wtr.write_record(vec![Some("a"), Some("b,c"), Some(""), Some("d\"e")])
            .unwrap();
        assert_eq!(wtr_as_string(wtr), "a,\"b,c\",\"\",\"d\"\"e\"\r\n");
    }

    #[test]
    fn absent_fields() {
        let mut wtr = Writer::from_writer(vec![]);
        wtr.write_record(vec![None, Some("a"), None]).unwrap();
        wtr.write_record(Vec::<Option<&str>>::new()).unwrap();
        assert_eq!(wtr_as_string(wtr), ",a,\r\n\r\n");
    }

    #[test]
    fn tiny_buffer() {
        let fields = vec![Some("abcdef"), Some(""), Some("\"\"\""), None];
        let mut big = Writer::from_writer(vec![]);
        let mut small = WriterBuilder::new().buffer_capacity(1).from_writer(vec![]);
        for _ in 0..3 {
            big.write_record(fields.clone()).unwrap();
            small.write_record(fields.clone()).unwrap();
        }
        assert_eq!(wtr_as_string(small), wtr_as_string(big));
    }

    #[test]
    fn custom_delimiter_and_quote() {
        let mut wtr = WriterBuilder::new()
            .delimiter(b'\t')
            .quote(b'\'')
            .from_writer(vec![]);
        wtr.write_record(vec![Some("a,b"), Some("it's"), Some("c\td")])
            .unwrap();
        assert_eq!(wtr_as_string(wtr), "a,b\t'it''s'\t'c\td'\r\n");
    }

    #[test]
    fn field_count_checked() {
        let mut wtr = WriterBuilder::new().flexible(false).from_writer(vec![]);
        wtr.write_record(vec![Some("a"), Some("b")]).unwrap();
        match wtr.write_record(vec![Some("c"), Some("d"), Some("e")]) {
            Err(Error::TooManyFields { pos, expected: 2, found: 3 }) => {
                assert_eq!(pos.record(), 1);
                assert_eq!(pos.line(), 2);
                assert_eq!(pos.byte(), 5);
            }
            res => panic!("unexpected result: {:?}", res),
        }
        match wtr.write_record(vec![Some("f")]) {
            Err(Error::TooFewFields { expected: 2, found: 1, .. }) => {}
            res => panic!("unexpected result: {:?}", res),
        }
        wtr.write_record(vec![Some("g"), None]).unwrap();
        assert_eq!(wtr_as_string(wtr), "a,b\r\ng,\r\n");
    }

    #[test]
    fn closed_writer() {
        let mut wtr = Writer::from_writer(vec![]);
        wtr.write_record(vec![Some("a")]).unwrap();
        wtr.close().unwrap();
        wtr.close().unwrap();
        assert!(matches!(
            wtr.write_record(vec![Some("b")]),
            Err(Error::Closed)
        ));
        assert!(matches!(wtr.flush(), Err(Error::Closed)));
        assert!(wtr.into_inner().is_err());
    }

    #[test]
    fn close_flushes() {
        let mut out = vec![];
        {
            let mut wtr = Writer::from_writer(&mut out);
            wtr.write_record(vec![Some("a")]).unwrap();
            wtr.close().unwrap();
        }
        assert_eq!(out, b"a\r\n");
    }

    #[test]
    fn drop_flushes() {
        let mut out = vec![];
        {
            let mut wtr = Writer::from_writer(&mut out);
            wtr.write_record(vec![Some("a")]).unwrap();
        }
        assert_eq!(out, b"a\r\n");
    }

    struct Broken;

    impl io::Write for Broken {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "broken"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn into_inner_error() {
        let mut wtr = Writer::from_writer(Broken);
        wtr.write_record(vec![Some("a")]).unwrap();
        let err = match wtr.into_inner() {
            Err(err) => err,
            Ok(_) => panic!("expected an error"),
        };
        assert_eq!(err.error().to_string(), "broken");
    }

    #[test]
    fn encode_with_closure() {
        let encoder = |v: &(i32, Option<&str>), out: &mut Record| {
            out.push_field(v.0.to_string()).push_opt(v.1);
            Ok::<(), BoxError>(())
        };
        let mut wtr = Writer::from_writer(vec![]);
        wtr.encode(&(1, Some("")), &encoder).unwrap();
        wtr.encode(&(2, None), &encoder).unwrap();
        assert_eq!(wtr_as_string(wtr), "1,\"\"\r\n2,\r\n");
    }

    #[test]
    fn failed_encode_writes_nothing() {
        let encoder = |v: &i32, out: &mut Record| -> Result<(), BoxError> {
            out.push_field(v.to_string());
            if *v < 0 {
                return Err("negative".into());
            }
            Ok(())
        };
        let mut wtr = Writer::from_writer(vec![]);
        match wtr.encode(&-1, &encoder) {
            Err(Error::Conversion(err)) => {
                assert_eq!(err.fields(), &[Some("-1".to_string())]);
                assert_eq!(err.error().to_string(), "negative");
            }
            res => panic!("unexpected result: {:?}", res),
        }
        wtr.encode(&1, &encoder).unwrap();
        assert_eq!(wtr_as_string(wtr), "1\r\n");
    }

    #[test]
    fn round_trip_strict() {
        let records = vec![
            vec![Some("a"), None, Some("")],
            vec![Some("x\r\ny"), Some("\""), Some(",")],
            vec![None, None, None],
        ];
        let mut wtr = WriterBuilder::new()
            .quote_line_breaks(true)
            .from_writer(vec![]);
        for rec in &records {
            wtr.write_record(rec.clone()).unwrap();
        }
        let data = wtr.into_inner().unwrap();

        let mut rdr = ReaderBuilder::new(StrictProvider::new())
            .from_reader(&data[..]);
        for expected in &records {
            let rec = rdr.next_record().unwrap().unwrap();
            let got: Vec<Option<&[u8]>> = rec.iter_opt().collect();
            let want: Vec<Option<&[u8]>> =
                expected.iter().map(|f| f.map(|f| f.as_bytes())).collect();
            assert_eq!(got, want);
        }
        assert!(rdr.next_record().unwrap().is_none());
    }

    #[test]
    fn dialect_sets_delimiter() {
        let strict = StrictProvider::new().delimiter(b'|').provide();
        let mut wtr = WriterBuilder::new().dialect(&strict).from_writer(vec![]);
        wtr.write_record(vec![Some("a|b"), Some("c")]).unwrap();
        assert_eq!(wtr_as_string(wtr), "\"a|b\"|c\r\n");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serialize_struct() {
        #[derive(serde::Serialize)]
        struct Row<'a> {
            name: &'a str,
            score: Option<f64>,
            ok: bool,
        }

        let mut wtr = Writer::from_writer(vec![]);
        wtr.serialize(&Row { name: "a,b", score: Some(1.5), ok: true })
            .unwrap();
        wtr.serialize(&Row { name: "c", score: None, ok: false }).unwrap();
        assert_eq!(wtr_as_string(wtr), "\"a,b\",1.5,true\r\nc,,false\r\n");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serde_keeps_empty_apart_from_absent() {
        let mut wtr = Writer::from_writer(vec![]);
        wtr.serialize(&(Some(String::new()), None::<String>)).unwrap();
        let data = wtr.into_inner().unwrap();
        assert_eq!(data, b"\"\",\r\n");

        let mut rdr = ReaderBuilder::new(StrictProvider::new())
            .from_reader(&data[..]);
        let rows: Vec<(Option<String>, Option<String>)> =
            rdr.deserialize().collect::<crate::Result<_>>().unwrap();
        assert_eq!(rows, vec![(Some(String::new()), None)]);
    }
}
