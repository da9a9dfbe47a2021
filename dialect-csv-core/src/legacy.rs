use crate::dialect::{
    Dialect, DialectProvider, Malformation, State, Transition,
};
use crate::strict::Strict;

/// The strict dialect as older producers of this format expected it.
///
/// It accepts exactly what `Strict` accepts. The difference is in how it
/// reports a `\n` that is not preceded by `\r` after unquoted content:
/// `Strict` reports an unexpected character, while this dialect reports
/// `Malformation::BareLineFeed` so callers can tell Unix line endings apart
/// from other damage.
#[derive(Clone, Debug)]
pub struct LegacyStrict {
    strict: Strict,
}

impl Dialect for LegacyStrict {
    fn start(&self) -> State {
        self.strict.start()
    }

    #[inline(always)]
    fn transition(&mut self, state: State, input: Option<u8>) -> Transition {
        self.strict.transition(state, input)
    }

    fn delimiter(&self) -> u8 {
        self.strict.delimiter()
    }

    fn quote(&self) -> u8 {
        self.strict.quote()
    }

    fn malformation(&self, state: State, input: Option<u8>) -> Malformation {
        match (state, input) {
            (State::BeforeLine, Some(b'\n'))
            | (State::BeforeField, Some(b'\n'))
            | (State::Field, Some(b'\n')) => Malformation::BareLineFeed,
            _ => self.strict.malformation(state, input),
        }
    }
}

/// Provides `LegacyStrict` dialects.
///
/// The default delimiter is `,` and the default quote is `"`.
#[derive(Clone, Copy, Debug)]
pub struct LegacyStrictProvider {
    delimiter: u8,
    quote: u8,
}

impl Default for LegacyStrictProvider {
    fn default() -> LegacyStrictProvider {
        LegacyStrictProvider { delimiter: b',', quote: b'"' }
    }
}

impl LegacyStrictProvider {
    /// A provider with the default delimiter and quote.
    pub fn new() -> LegacyStrictProvider {
        LegacyStrictProvider::default()
    }

    /// The field delimiter to use.
    pub fn delimiter(mut self, delimiter: u8) -> LegacyStrictProvider {
        self.delimiter = delimiter;
        self
    }

    /// The quote byte to use.
    pub fn quote(mut self, quote: u8) -> LegacyStrictProvider {
        self.quote = quote;
        self
    }
}

impl DialectProvider for LegacyStrictProvider {
    type Dialect = LegacyStrict;

    fn provide(&self) -> LegacyStrict {
        LegacyStrict { strict: Strict::new(self.delimiter, self.quote) }
    }
}
