use memchr::{memchr, memchr2};

/// A builder for configuring a CSV writer.
///
/// This builder permits specifying the delimiter and quote bytes, and
/// whether line breaks inside fields force quoting.
#[derive(Debug)]
pub struct WriterBuilder {
    wtr: Writer,
}

impl Default for WriterBuilder {
    fn default() -> WriterBuilder {
        WriterBuilder::new()
    }
}

impl WriterBuilder {
    /// Create a new builder for configuring a CSV writer.
    pub fn new() -> WriterBuilder {
        WriterBuilder { wtr: Writer::default() }
    }

    /// Build a CSV writer from this configuration.
    pub fn build(&self) -> Writer {
        self.wtr.clone()
    }

    /// The field delimiter to use when writing CSV.
    ///
    /// The default is `b','`.
    pub fn delimiter(&mut self, delimiter: u8) -> &mut WriterBuilder {
        self.wtr.delimiter = delimiter;
        self
    }

    /// The quote character to use when writing CSV.
    ///
    /// The default value is `b'"'`.
    pub fn quote(&mut self, quote: u8) -> &mut WriterBuilder {
        self.wtr.quote = quote;
        self
    }

    /// Whether a field containing `\r` or `\n` is quoted.
    ///
    /// By default a field is quoted only when it is empty or contains the
    /// delimiter or the quote. Such a writer cannot round trip fields with
    /// line breaks through a reader. Enabling this quotes them as well.
    pub fn quote_line_breaks(&mut self, yes: bool) -> &mut WriterBuilder {
        self.wtr.quote_line_breaks = yes;
        self
    }
}

/// The result of writing CSV data.
///
/// A value of this type is returned from every write operation. It
/// indicates whether the caller must provide more space in the output
/// buffer before writing again.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WriteResult {
    /// All of the input given was consumed.
    InputEmpty,
    /// The output buffer is full. The caller should drain it and call the
    /// same method again with the rest of the input.
    OutputFull,
}

/// A push writer for CSV data.
///
/// The writer never allocates. The caller hands it output buffers and
/// is told how much was written to each. A record is written as a
/// sequence of `field` calls separated by `delimiter` calls and ended by
/// `terminator`, which always writes `\r\n`.
///
/// An absent field is written by calling `delimiter` (or `terminator`)
/// without a preceding `field` call. A present but empty field is written
/// as `""`, so the two can be told apart when reading.
#[derive(Clone, Debug)]
pub struct Writer {
    state: WriterState,
    delimiter: u8,
    quote: u8,
    quote_line_breaks: bool,
}

#[derive(Clone, Debug)]
struct WriterState {
    /// Whether `field` has been called since the last delimiter or
    /// terminator.
    in_field: bool,
    /// Whether the current field is quoted. Only valid when `in_field`.
    quoting: bool,
}

impl Default for Writer {
    fn default() -> Writer {
        Writer {
            state: WriterState { in_field: false, quoting: false },
            delimiter: b',',
            quote: b'"',
            quote_line_breaks: false,
        }
    }
}

impl Writer {
    /// Creates a new CSV writer with the default configuration.
    pub fn new() -> Writer {
        Writer::default()
    }

    /// Returns true if `input` must be quoted by this writer.
    pub fn should_quote(&self, input: &[u8]) -> bool {
        if should_quote(input, self.delimiter, self.quote) {
            return true;
        }
        self.quote_line_breaks && memchr2(b'\r', b'\n', input).is_some()
    }

    /// Writes (part of) a field.
    ///
    /// Whether the field is quoted is decided on the first call for a
    /// field, so the first call must see all of the bytes that could make
    /// quoting necessary. Passing the whole field at once is always safe.
    ///
    /// This returns the result of writing, the number of bytes consumed
    /// from `input` and the number of bytes written to `output`.
    pub fn field(
        &mut self,
        input: &[u8],
        output: &mut [u8],
    ) -> (WriteResult, usize, usize) {
        let mut nout = 0;
        if !self.state.in_field {
            let quoting = self.should_quote(input);
            if quoting {
                if output.is_empty() {
                    return (WriteResult::OutputFull, 0, 0);
                }
                output[0] = self.quote;
                nout += 1;
            }
            self.state.in_field = true;
            self.state.quoting = quoting;
        }
        let (res, nin, o) = if self.state.quoting {
            quote(input, &mut output[nout..], self.quote)
        } else {
            write_optimistic(input, &mut output[nout..])
        };
        (res, nin, nout + o)
    }

    /// Ends the current field and writes a delimiter.
    ///
    /// Either all of the bytes needed are written or none are.
    pub fn delimiter(&mut self, output: &mut [u8]) -> (WriteResult, usize) {
        let delimiter = self.delimiter;
        self.end_field(&[delimiter], output)
    }

    /// Ends the current field and the current record with `\r\n`.
    ///
    /// Either all of the bytes needed are written or none are.
    pub fn terminator(&mut self, output: &mut [u8]) -> (WriteResult, usize) {
        self.end_field(b"\r\n", output)
    }

    /// Closes a quoted field left open at the end of the output.
    ///
    /// This does not write a record terminator. Calling it is only needed
    /// when the last record of the output is not terminated.
    pub fn finish(&mut self, output: &mut [u8]) -> (WriteResult, usize) {
        self.end_field(b"", output)
    }

    fn end_field(
        &mut self,
        trailer: &[u8],
        output: &mut [u8],
    ) -> (WriteResult, usize) {
        let close = self.state.in_field && self.state.quoting;
        let needed = close as usize + trailer.len();
        if output.len() < needed {
            return (WriteResult::OutputFull, 0);
        }
        let mut nout = 0;
        if close {
            output[0] = self.quote;
            nout += 1;
        }
        output[nout..needed].copy_from_slice(trailer);
        self.state.in_field = false;
        self.state.quoting = false;
        (WriteResult::InputEmpty, needed)
    }
}

/// Returns true if a field must be quoted.
///
/// A field is quoted exactly when it is empty or contains `delimiter` or
/// `quote`.
pub fn should_quote(input: &[u8], delimiter: u8, quote: u8) -> bool {
    input.is_empty() || memchr2(delimiter, quote, input).is_some()
}

/// Copies `input` to `output`, doubling every `quote` byte.
///
/// No surrounding quotes are written. A doubled quote is written
/// completely or not at all.
///
/// This returns the result of writing, the number of bytes consumed from
/// `input` and the number of bytes written to `output`.
pub fn quote(
    input: &[u8],
    output: &mut [u8],
    quote: u8,
) -> (WriteResult, usize, usize) {
    let (mut nin, mut nout) = (0, 0);
    loop {
        let rest = &input[nin..];
        let next = match memchr(quote, rest) {
            None => {
                let (res, i, o) = write_optimistic(rest, &mut output[nout..]);
                return (res, nin + i, nout + o);
            }
            Some(next) => next,
        };
        let (res, i, o) =
            write_optimistic(&rest[..next], &mut output[nout..]);
        nin += i;
        nout += o;
        if res == WriteResult::OutputFull {
            return (res, nin, nout);
        }
        let (res, o) = write_pessimistic(&[quote, quote], &mut output[nout..]);
        if res == WriteResult::OutputFull {
            return (res, nin, nout);
        }
        nin += 1;
        nout += o;
    }
}

/// Writes as much of `data` as fits into `output`.
fn write_optimistic(
    data: &[u8],
    output: &mut [u8],
) -> (WriteResult, usize, usize) {
    if data.len() > output.len() {
        let n = output.len();
        output.copy_from_slice(&data[..n]);
        (WriteResult::OutputFull, n, n)
    } else {
        output[..data.len()].copy_from_slice(data);
        (WriteResult::InputEmpty, data.len(), data.len())
    }
}

/// Writes all of `data` into `output` or nothing at all.
fn write_pessimistic(data: &[u8], output: &mut [u8]) -> (WriteResult, usize) {
    if data.len() > output.len() {
        (WriteResult::OutputFull, 0)
    } else {
        output[..data.len()].copy_from_slice(data);
        (WriteResult::InputEmpty, data.len())
    }
}

#[cfg(test)]
mod tests {
    use arrayvec::ArrayVec;

    use super::{quote, should_quote, WriteResult, Writer, WriterBuilder};

    /// Writes a whole record of optional fields through `wtr`, draining the
    /// output buffer every `chunk` bytes.
    fn write_record(
        wtr: &mut Writer,
        fields: &[Option<&str>],
        chunk: usize,
    ) -> ArrayVec<u8, 256> {
        let mut out = ArrayVec::new();
        let mut buf = [0u8; 256];
        for (i, field) in fields.iter().enumerate() {
            if let Some(field) = *field {
                let mut input = field.as_bytes();
                let mut first = true;
                while first || !input.is_empty() {
                    first = false;
                    let (_, nin, nout) = wtr.field(input, &mut buf[..chunk]);
                    out.try_extend_from_slice(&buf[..nout]).unwrap();
                    input = &input[nin..];
                }
            }
            let (res, nout) = if i + 1 < fields.len() {
                wtr.delimiter(&mut buf[..chunk])
            } else {
                wtr.terminator(&mut buf[..chunk])
            };
            assert_eq!(res, WriteResult::InputEmpty);
            out.try_extend_from_slice(&buf[..nout]).unwrap();
        }
        out
    }

    fn written(fields: &[Option<&str>]) -> ArrayVec<u8, 256> {
        write_record(&mut Writer::new(), fields, 256)
    }

    #[test]
    fn minimal_quoting() {
        let got =
            written(&[Some("a"), Some("b,c"), Some(""), Some("d\"e")]);
        assert_eq!(&got[..], &b"a,\"b,c\",\"\",\"d\"\"e\"\r\n"[..]);
    }

    #[test]
    fn absent_fields() {
        let got = written(&[Some("a"), None, Some(""), None]);
        assert_eq!(&got[..], &b"a,,\"\",\r\n"[..]);
    }

    #[test]
    fn single_absent_field() {
        assert_eq!(&written(&[None])[..], &b"\r\n"[..]);
    }

    #[test]
    fn line_breaks_not_quoted_by_default() {
        assert_eq!(&written(&[Some("a\nb")])[..], &b"a\nb\r\n"[..]);
    }

    #[test]
    fn line_breaks_quoted_when_asked() {
        let mut wtr = WriterBuilder::new().quote_line_breaks(true).build();
        let got = write_record(&mut wtr, &[Some("a\r\nb"), Some("c")], 256);
        assert_eq!(&got[..], &b"\"a\r\nb\",c\r\n"[..]);
    }

    #[test]
    fn custom_delimiter_and_quote() {
        let mut wtr = WriterBuilder::new().delimiter(b';').quote(b'\'').build();
        let got = write_record(
            &mut wtr,
            &[Some("a,b"), Some("c;d"), Some("it's")],
            256,
        );
        assert_eq!(&got[..], &b"a,b;'c;d';'it''s'\r\n"[..]);
    }

    #[test]
    fn small_output() {
        let mut wtr = Writer::new();
        let got = write_record(&mut wtr, &[Some("ab\"\"cd"), Some("e")], 3);
        assert_eq!(&got[..], &b"\"ab\"\"\"\"cd\",e\r\n"[..]);
    }

    #[test]
    fn quote_pending_output_full() {
        let mut buf = [0u8; 2];
        let (res, nin, nout) = quote(b"a\"b", &mut buf, b'"');
        assert_eq!(res, WriteResult::OutputFull);
        assert_eq!((nin, nout), (1, 1));
        assert_eq!(buf[0], b'a');
    }

    #[test]
    fn terminator_is_atomic() {
        let mut wtr = Writer::new();
        let mut buf = [0u8; 4];
        wtr.field(b"", &mut buf);
        let (res, nout) = wtr.terminator(&mut buf[..2]);
        assert_eq!((res, nout), (WriteResult::OutputFull, 0));
        let (res, nout) = wtr.terminator(&mut buf[..3]);
        assert_eq!((res, nout), (WriteResult::InputEmpty, 3));
        assert_eq!(&buf[..3], b"\"\r\n");
    }

    #[test]
    fn should_quote_cases() {
        assert!(should_quote(b"", b',', b'"'));
        assert!(should_quote(b"a,b", b',', b'"'));
        assert!(should_quote(b"a\"b", b',', b'"'));
        assert!(!should_quote(b"a;b", b',', b'"'));
        assert!(!should_quote(b"a\nb", b',', b'"'));
        assert!(should_quote(b"a;b", b';', b'"'));
    }
}
