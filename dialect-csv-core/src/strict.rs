use crate::classes::ByteClasses;
use crate::dialect::bits::*;
use crate::dialect::State::*;
use crate::dialect::{
    go, row, Dialect, DialectProvider, State, Table, Transition, CLASSES,
};

const ERR: Transition = go(Error, ERH);
const ERR_ROW: [Transition; CLASSES] = [ERR; CLASSES];

/// Transitions of RFC 4180 with no tolerance for deviations.
///
/// Columns: other, quote, delimiter, `\r`, `\n`, end of input.
pub(crate) const TABLE: Table = [
    // BeforeLine
    row(
        go(Field, SFH),
        go(QuoteOpened, 0),
        go(BeforeField, SFH | EFH),
        go(CarriageReturn, SFH | EFH),
        ERR,
        go(Eof, STP),
    ),
    // BeforeField
    row(
        go(Field, SFH),
        go(QuoteOpened, 0),
        go(BeforeField, SFH | EFH),
        go(CarriageReturn, SFH | EFH),
        ERR,
        go(Eof, SFH | EFH | STP),
    ),
    // QuoteOpened
    row(
        go(Quoted, SFH),
        go(QuoteOpenedEscape, 0),
        go(Quoted, SFH),
        go(Quoted, SFH),
        go(Quoted, SFH),
        ERR,
    ),
    // QuoteOpenedEscape
    row(
        ERR,
        go(Quoted, SFH),
        go(BeforeField, SFH | EFH),
        go(CarriageReturn, SFH | EFH),
        ERR,
        go(Eof, SFH | EFH | STP),
    ),
    // Quoted
    row(
        go(Quoted, 0),
        go(Escape, 0),
        go(Quoted, 0),
        go(Quoted, 0),
        go(Quoted, 0),
        ERR,
    ),
    // Escape
    row(
        ERR,
        go(Quoted, RCB),
        go(BeforeField, EFB),
        go(CarriageReturn, EFB),
        ERR,
        go(Eof, EFB | STP),
    ),
    // Field
    row(
        go(Field, 0),
        ERR,
        go(BeforeField, EFH),
        go(CarriageReturn, EFH),
        ERR,
        go(Eof, EFH | STP),
    ),
    // CarriageReturn
    row(ERR, ERR, ERR, ERR, go(BeforeLine, ELH), ERR),
    // Eof
    ERR_ROW,
    // Error
    ERR_ROW,
    // The preamble states never occur in this dialect.
    ERR_ROW,
    ERR_ROW,
    ERR_ROW,
    ERR_ROW,
    ERR_ROW,
    ERR_ROW,
    ERR_ROW,
];

/// The strict RFC 4180 dialect.
///
/// Records end with `\r\n` only. A quote inside an unquoted field, anything
/// but a delimiter or line break after a closing quote, a bare `\n`, a lone
/// `\r` and an unterminated quoted field are all errors. Records may still
/// have differing numbers of fields.
#[derive(Clone, Debug)]
pub struct Strict {
    classes: ByteClasses,
    delimiter: u8,
    quote: u8,
}

impl Strict {
    pub(crate) fn new(delimiter: u8, quote: u8) -> Strict {
        Strict { classes: ByteClasses::new(delimiter, quote), delimiter, quote }
    }
}

impl Dialect for Strict {
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

/// Provides `Strict` dialects.
///
/// The default delimiter is `,` and the default quote is `"`.
#[derive(Clone, Copy, Debug)]
pub struct StrictProvider {
    delimiter: u8,
    quote: u8,
}

impl Default for StrictProvider {
    fn default() -> StrictProvider {
        StrictProvider { delimiter: b',', quote: b'"' }
    }
}

impl StrictProvider {
    /// A provider with the default delimiter and quote.
    pub fn new() -> StrictProvider {
        StrictProvider::default()
    }

    /// The field delimiter to use.
    pub fn delimiter(mut self, delimiter: u8) -> StrictProvider {
        self.delimiter = delimiter;
        self
    }

    /// The quote byte to use.
    pub fn quote(mut self, quote: u8) -> StrictProvider {
        self.quote = quote;
        self
    }
}

impl DialectProvider for StrictProvider {
    type Dialect = Strict;

    fn provide(&self) -> Strict {
        Strict::new(self.delimiter, self.quote)
    }
}
