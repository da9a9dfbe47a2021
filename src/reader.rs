use std::cmp;
use std::fs::File;
use std::io;
use std::iter::FusedIterator;
use std::marker::PhantomData;
use std::mem;
use std::path::Path;

use dialect_csv_core::{
    Actions, Dialect, DialectProvider, Printable, Relaxed, RelaxedProvider,
    State,
};
use log::{debug, trace};

use crate::error::{ConversionError, Error, Result};
use crate::mapping::RecordDecoder;
use crate::record::{FrozenRecord, Position, Record};

/// Builds a CSV reader with various configuration knobs.
///
/// The dialect is given as a provider, so every reader built gets a dialect
/// value of its own.
///
/// ```
/// use dialect_csv::{ReaderBuilder, StrictProvider};
///
/// let data = "a;b\r\nc;d\r\n";
/// let mut rdr = ReaderBuilder::new(StrictProvider::new().delimiter(b';'))
///     .flexible(false)
///     .from_reader(data.as_bytes());
/// let rec = rdr.next_record().unwrap().unwrap();
/// assert_eq!(rec.get(1), Some(&b"b"[..]));
/// ```
#[derive(Debug)]
pub struct ReaderBuilder<P> {
    provider: P,
    capacity: usize,
    max_record_length: usize,
    flexible: bool,
}

impl Default for ReaderBuilder<RelaxedProvider> {
    fn default() -> ReaderBuilder<RelaxedProvider> {
        ReaderBuilder::new(RelaxedProvider::new())
    }
}

impl<P: DialectProvider> ReaderBuilder<P> {
    /// Create a new builder for readers of the dialects `provider` makes.
    pub fn new(provider: P) -> ReaderBuilder<P> {
        ReaderBuilder {
            provider,
            capacity: 8 * (1 << 10),
            max_record_length: 1 << 20,
            flexible: true,
        }
    }

    /// Build a CSV reader from this configuration that reads data from
    /// `rdr`.
    ///
    /// The reader does its own buffering, so `rdr` does not need to be
    /// wrapped in an `io::BufReader`.
    pub fn from_reader<R: io::Read>(&self, rdr: R) -> Reader<R, P::Dialect> {
        Reader::new(self, rdr)
    }

    /// Build a CSV reader from this configuration that reads data from the
    /// file at `path`.
    pub fn from_path<Q: AsRef<Path>>(
        &self,
        path: Q,
    ) -> Result<Reader<File, P::Dialect>> {
        Ok(Reader::new(self, File::open(path)?))
    }

    /// The initial size of the input window, in bytes. The default is
    /// 8 KiB.
    ///
    /// Fields longer than the window are fine: they are carried over into
    /// the record whenever the window is refilled.
    pub fn buffer_capacity(&mut self, capacity: usize) -> &mut ReaderBuilder<P> {
        self.capacity = capacity;
        self
    }

    /// The maximum number of field bytes a single record may hold. The
    /// default is 1 MiB.
    ///
    /// A longer record fails with `Error::RecordTooLong`. The limit also
    /// applies to a quoted field left open at the end of input.
    pub fn max_record_length(&mut self, limit: usize) -> &mut ReaderBuilder<P> {
        self.max_record_length = limit;
        self
    }

    /// Whether records may have differing numbers of fields. The default
    /// is `true`.
    ///
    /// When disabled, every record is compared with the first one and a
    /// mismatch fails with `Error::TooFewFields` or `Error::TooManyFields`.
    /// The record is consumed either way.
    pub fn flexible(&mut self, yes: bool) -> &mut ReaderBuilder<P> {
        self.flexible = yes;
        self
    }
}

/// Where the reader is with respect to the next record.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Element {
    /// The next record has not been parsed yet.
    NotPrepared,
    /// The next record is parsed and waiting in the reader's record.
    Prepared,
    /// The dialect stopped. No record follows.
    NoSuchElement,
    /// `close` was called.
    Closed,
}

/// A streaming CSV reader.
///
/// A reader runs a dialect automaton over its input one byte at a time and
/// builds one record per line. It reuses a single `Record` for every
/// record, so [`next_record`](#method.next_record) hands out a borrow that
/// is only valid until the next call.
///
/// ```
/// use dialect_csv::Reader;
///
/// let data = "city,pop\nBoston,4628910\n\"Concord, NH\",\n";
/// let mut rdr = Reader::from_reader(data.as_bytes());
/// let mut names = vec![];
/// while let Some(rec) = rdr.next_record().unwrap() {
///     names.push(rec.get_str(0).unwrap().unwrap().to_string());
///     assert!(rec.get(1).is_some());
/// }
/// assert_eq!(names, vec!["city", "Boston", "Concord, NH"]);
/// ```
pub struct Reader<R, D> {
    dialect: D,
    rdr: Option<R>,
    /// The input window. Only `buf[..end]` holds data.
    buf: Vec<u8>,
    /// The next byte to feed to the dialect.
    pos: usize,
    end: usize,
    /// The first byte of the field being read that is not yet in the
    /// record. `None` outside of a field.
    mark: Option<usize>,
    /// Whether the field being read started with a quote.
    quoted: bool,
    eof: bool,
    /// Whether the dialect has stopped.
    done: bool,
    state: State,
    /// The absolute offset of `buf[0]`.
    base: u64,
    line: u64,
    record: u64,
    /// Whether the last byte read ended a line.
    line_start: bool,
    /// Where the record being read started.
    start: Position,
    rec: Record,
    element: Element,
    first_len: Option<u64>,
    max_record_length: usize,
    flexible: bool,
}

impl<R: io::Read> Reader<R, Relaxed> {
    /// Create a reader of the relaxed dialect with a default
    /// configuration.
    pub fn from_reader(rdr: R) -> Reader<R, Relaxed> {
        ReaderBuilder::default().from_reader(rdr)
    }
}

impl Reader<File, Relaxed> {
    /// Create a reader of the relaxed dialect over the file at `path`.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Reader<File, Relaxed>> {
        ReaderBuilder::default().from_path(path)
    }
}

impl<R: io::Read, D: Dialect> Reader<R, D> {
    fn new<P>(builder: &ReaderBuilder<P>, rdr: R) -> Reader<R, D>
    where
        P: DialectProvider<Dialect = D>,
    {
        let dialect = builder.provider.provide();
        let state = dialect.start();
        Reader {
            dialect,
            rdr: Some(rdr),
            // Room for at least one carried byte plus one new byte.
            buf: vec![0; cmp::max(2, builder.capacity)],
            pos: 0,
            end: 0,
            mark: None,
            quoted: false,
            eof: false,
            done: false,
            state,
            base: 0,
            line: 1,
            record: 0,
            line_start: true,
            start: Position::new(),
            rec: Record::new(),
            element: Element::NotPrepared,
            first_len: None,
            max_record_length: builder.max_record_length,
            flexible: builder.flexible,
        }
    }

    /// Returns true if another record follows.
    ///
    /// This parses the next record if needed. Calling it again without
    /// consuming the record in between does not read any further.
    pub fn has_next(&mut self) -> Result<bool> {
        match self.element {
            Element::Prepared => Ok(true),
            Element::NoSuchElement => Ok(false),
            Element::Closed => Err(Error::Closed),
            Element::NotPrepared => {
                let mut rec = mem::take(&mut self.rec);
                let res = self.parse(&mut rec, true);
                self.rec = rec;
                if res? {
                    self.element = Element::Prepared;
                    Ok(true)
                } else {
                    self.element = Element::NoSuchElement;
                    Ok(false)
                }
            }
        }
    }

    /// Reads the next record, or returns `None` at the end of input.
    ///
    /// The record is owned by the reader and is overwritten by the next
    /// call. Use `Record::freeze` to keep it.
    ///
    /// After an error, reading may continue. A malformed byte is never
    /// read twice, but the next record may start in the middle of a line.
    /// Call [`resync`](#method.resync) to continue at the next line
    /// instead.
    pub fn next_record(&mut self) -> Result<Option<&Record>> {
        if !self.has_next()? {
            return Ok(None);
        }
        self.element = Element::NotPrepared;
        Ok(Some(&self.rec))
    }

    /// Reads the next record into a record owned by the caller.
    ///
    /// Returns false at the end of input, in which case `rec` is left
    /// empty.
    pub fn read_record(&mut self, rec: &mut Record) -> Result<bool> {
        match self.element {
            Element::Closed => Err(Error::Closed),
            Element::NoSuchElement => {
                rec.clear();
                Ok(false)
            }
            Element::Prepared => {
                rec.clone_from(&self.rec);
                self.element = Element::NotPrepared;
                Ok(true)
            }
            Element::NotPrepared => {
                let more = self.parse(rec, true)?;
                if !more {
                    self.element = Element::NoSuchElement;
                }
                Ok(more)
            }
        }
    }

    /// Skips up to `n` records without building them, and returns how many
    /// were skipped.
    ///
    /// Fewer than `n` records are skipped only at the end of input.
    /// Malformed input is still reported.
    pub fn skip(&mut self, n: u64) -> Result<u64> {
        let mut skipped = 0;
        while skipped < n {
            match self.element {
                Element::Closed => return Err(Error::Closed),
                Element::NoSuchElement => break,
                Element::Prepared => {
                    self.element = Element::NotPrepared;
                }
                Element::NotPrepared => {
                    let mut rec = mem::take(&mut self.rec);
                    let res = self.parse(&mut rec, false);
                    self.rec = rec;
                    if !res? {
                        self.element = Element::NoSuchElement;
                        break;
                    }
                }
            }
            skipped += 1;
        }
        Ok(skipped)
    }

    /// Discards the rest of the current line and restarts the automaton.
    ///
    /// Everything up to and including the next line feed is dropped,
    /// unless the last byte read ended a line. A record that was
    /// already parsed by `has_next` is dropped too.
    ///
    /// This is meant for recovering from an error: the next record then
    /// starts at the beginning of a line.
    pub fn resync(&mut self) -> Result<()> {
        if self.element == Element::Closed {
            return Err(Error::Closed);
        }
        if self.element == Element::Prepared {
            self.element = Element::NotPrepared;
        }
        self.mark = None;
        while !self.line_start {
            if self.pos == self.end {
                if self.eof {
                    self.done = true;
                    break;
                }
                let mut rec = mem::take(&mut self.rec);
                let res = self.fill(&mut rec, false);
                self.rec = rec;
                res?;
                continue;
            }
            let window = &self.buf[self.pos..self.end];
            match window.iter().position(|&b| b == b'\n') {
                None => self.pos = self.end,
                Some(i) => {
                    self.pos += i;
                    self.advance(Some(b'\n'));
                }
            }
        }
        self.state = State::BeforeLine;
        Ok(())
    }

    /// Closes this reader and drops the underlying source.
    ///
    /// Closing twice is fine. Every other operation fails with
    /// `Error::Closed` afterwards.
    pub fn close(&mut self) {
        if self.rdr.take().is_some() {
            debug!("closing CSV reader at line {}", self.line);
        }
        self.element = Element::Closed;
    }

    /// Reads the next record and maps it to a value.
    ///
    /// A record that fails to map is consumed: the next call continues
    /// with the record after it.
    pub fn decode<T, C>(&mut self, decoder: &C) -> Result<Option<T>>
    where
        C: RecordDecoder<T>,
    {
        let rec = match self.next_record()? {
            None => return Ok(None),
            Some(rec) => rec,
        };
        match decoder.decode(rec) {
            Ok(value) => Ok(Some(value)),
            Err(err) => Err(Error::Conversion(ConversionError::new(rec, err))),
        }
    }

    /// Returns an iterator over frozen copies of the remaining records.
    ///
    /// The iterator stops after yielding its first error.
    pub fn records(&mut self) -> RecordsIter<'_, R, D> {
        RecordsIter { rdr: self, done: false }
    }

    /// Returns an iterator that maps the remaining records with `decoder`.
    ///
    /// The iterator stops after yielding its first error.
    pub fn decode_iter<'r, T, C>(
        &'r mut self,
        decoder: &'r C,
    ) -> DecodeIter<'r, R, D, T, C>
    where
        C: RecordDecoder<T>,
    {
        DecodeIter { rdr: self, decoder, done: false, _value: PhantomData }
    }

    /// Returns an iterator that deserializes the remaining records with
    /// serde.
    ///
    /// ```
    /// use dialect_csv::Reader;
    ///
    /// let mut rdr = Reader::from_reader("1,2\n3,\n".as_bytes());
    /// let rows: Vec<(u8, Option<u8>)> =
    ///     rdr.deserialize().collect::<Result<_, _>>().unwrap();
    /// assert_eq!(rows, vec![(1, Some(2)), (3, None)]);
    /// ```
    #[cfg(feature = "serde")]
    pub fn deserialize<T>(
        &mut self,
    ) -> DecodeIter<'_, R, D, T, crate::mapping::Serde>
    where
        T: serde::de::DeserializeOwned,
    {
        self.decode_iter(&crate::mapping::Serde)
    }

    /// The position of the next byte to be read.
    pub fn position(&self) -> Position {
        let mut pos = Position::new();
        pos.set_byte(self.base + self.pos as u64)
            .set_line(self.line)
            .set_record(self.record);
        pos
    }

    /// The current field delimiter.
    ///
    /// For the `Excel` dialect this reflects a `sep=` directive once it has
    /// been read.
    pub fn delimiter(&self) -> u8 {
        self.dialect.delimiter()
    }

    /// The dialect this reader runs.
    pub fn dialect(&self) -> &D {
        &self.dialect
    }

    /// Returns true once the underlying source is exhausted and every
    /// record has been read.
    pub fn is_done(&self) -> bool {
        self.element == Element::NoSuchElement
    }

    /// Runs the automaton until a record ends.
    ///
    /// Field bytes are copied into `rec` only when `copy` is set. Returns
    /// false if input ended before any field.
    fn parse(&mut self, rec: &mut Record, copy: bool) -> Result<bool> {
        rec.clear();
        if self.done {
            return Ok(false);
        }
        self.mark = None;
        self.quoted = false;
        self.start = self.position();
        let mut nfields: u64 = 0;
        loop {
            if self.pos == self.end && !self.eof {
                self.fill(rec, copy)?;
                continue;
            }
            let input = self.buf[self.pos..self.end].first().cloned();
            let prev = self.state;
            let trans = self.dialect.transition(prev, input);
            let acts = trans.actions;
            if acts.contains(Actions::ERROR) {
                return Err(self.malformed(prev, input));
            }
            if copy {
                if acts.contains(Actions::REMOVE_CHAR_BEFORE) {
                    let end = self.pos.saturating_sub(1);
                    rec.extend_field(self.pending(end));
                    self.mark = Some(self.pos);
                }
                if acts.contains(Actions::END_FIELD_BEFORE) {
                    self.end_field(rec, self.pos.saturating_sub(1))?;
                }
                if acts.contains(Actions::START_FIELD) {
                    rec.truncate_field();
                    self.mark = Some(self.pos);
                    self.quoted = prev.opens_quoted_field();
                }
                if acts.contains(Actions::END_FIELD_HERE) {
                    self.end_field(rec, self.pos)?;
                }
            }
            if acts.contains(Actions::END_FIELD_BEFORE) {
                nfields += 1;
            }
            if acts.contains(Actions::END_FIELD_HERE) {
                nfields += 1;
            }
            self.state = trans.state;
            if !acts.contains(Actions::REPEAT) {
                self.advance(input);
            }
            if prev == State::CarriageReturn
                && input != Some(b'\n')
                && (acts.contains(Actions::END_LINE) || input.is_none())
            {
                // A lone `\r` ended the line.
                self.line += 1;
                self.line_start = true;
            }
            if prev.is_sniffing()
                && trans.state == State::BeforeLine
                && !acts.contains(Actions::END_LINE)
            {
                // A `sep=` line was consumed. The first record starts after
                // it.
                if !self.line_start {
                    self.line += 1;
                    self.line_start = true;
                }
                rec.clear();
                self.mark = None;
                self.start = self.position();
                debug!(
                    "sep= directive sets the delimiter to '{}'",
                    Printable(Some(self.dialect.delimiter()))
                );
            }
            if acts.contains(Actions::END_LINE) {
                self.finish(rec, nfields)?;
                return Ok(true);
            }
            if acts.contains(Actions::STOP) || input.is_none() {
                self.done = true;
                if nfields == 0 {
                    return Ok(false);
                }
                self.finish(rec, nfields)?;
                return Ok(true);
            }
        }
    }

    /// Moves past `input`.
    #[inline(always)]
    fn advance(&mut self, input: Option<u8>) {
        if let Some(b) = input {
            self.pos += 1;
            self.line_start = b == b'\n';
            if self.line_start {
                self.line += 1;
            }
        }
    }

    /// The bytes of the current field up to `end` that are not yet in the
    /// record.
    fn pending(&self, end: usize) -> &[u8] {
        let start = self.mark.map_or(end, |mark| cmp::min(mark, end));
        &self.buf[start..end]
    }

    fn end_field(&mut self, rec: &mut Record, end: usize) -> Result<()> {
        rec.end_field(self.pending(end), self.quoted);
        self.mark = None;
        self.quoted = false;
        self.check_length(rec)
    }

    fn check_length(&self, rec: &Record) -> Result<()> {
        if rec.buffered_len() > self.max_record_length {
            return Err(Error::RecordTooLong {
                pos: self.start.clone(),
                limit: self.max_record_length,
            });
        }
        Ok(())
    }

    fn finish(&mut self, rec: &mut Record, nfields: u64) -> Result<()> {
        let pos = self.start.clone();
        rec.set_position(Some(pos.clone()));
        self.record += 1;
        if self.flexible {
            return Ok(());
        }
        match self.first_len {
            None => {
                self.first_len = Some(nfields);
                Ok(())
            }
            Some(expected) if nfields < expected => {
                Err(Error::TooFewFields { pos, expected, found: nfields })
            }
            Some(expected) if nfields > expected => {
                Err(Error::TooManyFields { pos, expected, found: nfields })
            }
            Some(_) => Ok(()),
        }
    }

    /// Builds the error for a rejected byte and steps past it.
    fn malformed(&mut self, prev: State, input: Option<u8>) -> Error {
        let kind = self.dialect.malformation(prev, input);
        let pos = self.position();
        self.state = State::BeforeLine;
        self.mark = None;
        self.quoted = false;
        match input {
            None => self.done = true,
            Some(_) => self.advance(input),
        }
        Error::Malformed { pos, byte: input, kind }
    }

    /// Refills the window after everything in it has been read.
    ///
    /// When copying, the bytes of the current field are moved into `rec`
    /// first. The last byte read always stays in the window since a
    /// closing or escaping quote is only recognized one byte later.
    fn fill(&mut self, rec: &mut Record, copy: bool) -> Result<()> {
        let keep = match self.mark {
            Some(mark) if copy => {
                let split = cmp::max(mark, self.pos.saturating_sub(1));
                if split > mark {
                    rec.extend_field(&self.buf[mark..split]);
                    self.check_length(rec)?;
                    self.mark = Some(split);
                }
                split
            }
            _ => self.pos,
        };
        if keep > 0 {
            trace!("refilling CSV window, {} bytes consumed", keep);
            self.buf.copy_within(keep..self.end, 0);
            self.base += keep as u64;
            self.pos -= keep;
            self.end -= keep;
            if let Some(mark) = self.mark.as_mut() {
                *mark -= keep;
            }
        }
        let rdr = match self.rdr.as_mut() {
            None => return Err(Error::Closed),
            Some(rdr) => rdr,
        };
        loop {
            match rdr.read(&mut self.buf[self.end..]) {
                Ok(0) => self.eof = true,
                Ok(n) => self.end += n,
                Err(ref err) if err.kind() == io::ErrorKind::Interrupted => {
                    continue
                }
                Err(err) => return Err(Error::Io(err)),
            }
            return Ok(());
        }
    }
}

impl<R: io::Read + io::Seek, D: Dialect> Reader<R, D> {
    /// Seeks the underlying source to `pos` and reads on from there.
    ///
    /// `pos` must be the position of the start of a record, such as one
    /// returned by `Record::position`. Line and record numbering continue
    /// from `pos`. The dialect restarts at the beginning of a line: an
    /// `Excel` dialect no longer looks for a `sep=` directive.
    pub fn seek(&mut self, pos: Position) -> Result<()> {
        let rdr = match self.rdr.as_mut() {
            None => return Err(Error::Closed),
            Some(rdr) => rdr,
        };
        rdr.seek(io::SeekFrom::Start(pos.byte()))?;
        debug!("seeking CSV reader to byte {}", pos.byte());
        self.dialect.restart_line();
        self.pos = 0;
        self.end = 0;
        self.mark = None;
        self.quoted = false;
        self.eof = false;
        self.done = false;
        self.state = State::BeforeLine;
        self.base = pos.byte();
        self.line = pos.line();
        self.record = pos.record();
        self.line_start = true;
        self.element = Element::NotPrepared;
        Ok(())
    }
}

/// An iterator over frozen records, created by `Reader::records`.
pub struct RecordsIter<'r, R, D> {
    rdr: &'r mut Reader<R, D>,
    done: bool,
}

impl<'r, R: io::Read, D: Dialect> Iterator for RecordsIter<'r, R, D> {
    type Item = Result<FrozenRecord>;

    fn next(&mut self) -> Option<Result<FrozenRecord>> {
        if self.done {
            return None;
        }
        match self.rdr.next_record() {
            Ok(Some(rec)) => Some(Ok(rec.freeze())),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

impl<'r, R: io::Read, D: Dialect> FusedIterator for RecordsIter<'r, R, D> {}

/// An iterator over mapped records, created by `Reader::decode_iter` or
/// `Reader::deserialize`.
pub struct DecodeIter<'r, R, D, T, C> {
    rdr: &'r mut Reader<R, D>,
    decoder: &'r C,
    done: bool,
    _value: PhantomData<fn() -> T>,
}

impl<'r, R, D, T, C> Iterator for DecodeIter<'r, R, D, T, C>
where
    R: io::Read,
    D: Dialect,
    C: RecordDecoder<T>,
{
    type Item = Result<T>;

    fn next(&mut self) -> Option<Result<T>> {
        if self.done {
            return None;
        }
        match self.rdr.decode(self.decoder) {
            Ok(Some(value)) => Some(Ok(value)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

impl<'r, R, D, T, C> FusedIterator for DecodeIter<'r, R, D, T, C>
where
    R: io::Read,
    D: Dialect,
    C: RecordDecoder<T>,
{
}
