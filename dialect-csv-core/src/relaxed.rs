use crate::classes::ByteClasses;
use crate::dialect::bits::*;
use crate::dialect::State::*;
use crate::dialect::{
    go, row, Dialect, DialectProvider, State, Table, Transition, CLASSES,
};

const STOP_ROW: [Transition; CLASSES] = [go(Eof, STP); CLASSES];

/// Transitions of RFC 4180 with every deviation accepted.
///
/// Columns: other, quote, delimiter, `\r`, `\n`, end of input.
pub(crate) const TABLE: Table = [
    // BeforeLine
    row(
        go(Field, SFH),
        go(QuoteOpened, 0),
        go(BeforeField, SFH | EFH),
        go(CarriageReturn, SFH | EFH),
        go(BeforeLine, SFH | EFH | ELH),
        go(Eof, STP),
    ),
    // BeforeField
    row(
        go(Field, SFH),
        go(QuoteOpened, 0),
        go(BeforeField, SFH | EFH),
        go(CarriageReturn, SFH | EFH),
        go(BeforeLine, SFH | EFH | ELH),
        go(Eof, SFH | EFH | STP),
    ),
    // QuoteOpened
    row(
        go(Quoted, SFH),
        go(QuoteOpenedEscape, 0),
        go(Quoted, SFH),
        go(Quoted, SFH),
        go(Quoted, SFH),
        go(Eof, SFH | EFH | STP),
    ),
    // QuoteOpenedEscape
    row(
        go(Field, SFH),
        go(Quoted, SFH),
        go(BeforeField, SFH | EFH),
        go(CarriageReturn, SFH | EFH),
        go(BeforeLine, SFH | EFH | ELH),
        go(Eof, SFH | EFH | STP),
    ),
    // Quoted
    row(
        go(Quoted, 0),
        go(Escape, 0),
        go(Quoted, 0),
        go(Quoted, 0),
        go(Quoted, 0),
        go(Eof, EFH | STP),
    ),
    // Escape
    row(
        go(Field, RCB),
        go(Quoted, RCB),
        go(BeforeField, EFB),
        go(CarriageReturn, EFB),
        go(BeforeLine, EFB | ELH),
        go(Eof, EFB | STP),
    ),
    // Field
    row(
        go(Field, 0),
        go(Field, 0),
        go(BeforeField, EFH),
        go(CarriageReturn, EFH),
        go(BeforeLine, EFH | ELH),
        go(Eof, EFH | STP),
    ),
    // CarriageReturn
    row(
        go(BeforeLine, ELH | RLR),
        go(BeforeLine, ELH | RLR),
        go(BeforeLine, ELH | RLR),
        go(BeforeLine, ELH | RLR),
        go(BeforeLine, ELH),
        go(Eof, STP),
    ),
    // Eof
    STOP_ROW,
    // Error
    STOP_ROW,
    // The preamble states never occur in this dialect.
    STOP_ROW,
    STOP_ROW,
    STOP_ROW,
    STOP_ROW,
    STOP_ROW,
    STOP_ROW,
    STOP_ROW,
];

/// A lenient RFC 4180 dialect that never reports an error.
///
/// Compared to `Strict`:
///
/// * `\r\n`, `\r` and `\n` each end a line.
/// * A quote inside an unquoted field is a literal quote.
/// * Text after a closing quote is appended to the field, so `"ab"c` reads
///   as `abc`.
/// * An unterminated quoted field runs to the end of input.
#[derive(Clone, Debug)]
pub struct Relaxed {
    classes: ByteClasses,
    delimiter: u8,
    quote: u8,
}

impl Relaxed {
    pub(crate) fn new(delimiter: u8, quote: u8) -> Relaxed {
        Relaxed {
            classes: ByteClasses::new(delimiter, quote),
            delimiter,
            quote,
        }
    }
}

impl Dialect for Relaxed {
    fn start(&self) -> State {
        BeforeLine
    }

    #[inline(always)]
    fn transition(&mut self, state: State, input: Option<u8>) -> Transition {
        TABLE[state as usize][self.classes.get(input) as usize]
    }

    fn delimiter(&self) -> u8 {
        self.delimiter
    }

    fn quote(&self) -> u8 {
        self.quote
    }
}

/// Provides `Relaxed` dialects.
///
/// The default delimiter is `,` and the default quote is `"`.
#[derive(Clone, Copy, Debug)]
pub struct RelaxedProvider {
    delimiter: u8,
    quote: u8,
}

impl Default for RelaxedProvider {
    fn default() -> RelaxedProvider {
        RelaxedProvider { delimiter: b',', quote: b'"' }
    }
}

impl RelaxedProvider {
    /// A provider with the default delimiter and quote.
    pub fn new() -> RelaxedProvider {
        RelaxedProvider::default()
    }

    /// The field delimiter to use.
    pub fn delimiter(mut self, delimiter: u8) -> RelaxedProvider {
        self.delimiter = delimiter;
        self
    }

    /// The quote byte to use.
    pub fn quote(mut self, quote: u8) -> RelaxedProvider {
        self.quote = quote;
        self
    }
}

impl DialectProvider for RelaxedProvider {
    type Dialect = Relaxed;

    fn provide(&self) -> Relaxed {
        Relaxed::new(self.delimiter, self.quote)
    }
}
