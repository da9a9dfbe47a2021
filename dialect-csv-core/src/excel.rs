use crate::classes::ByteClasses;
use crate::dialect::bits::*;
use crate::dialect::State::*;
use crate::dialect::{
    go, Actions, Dialect, DialectProvider, State, Transition,
};
use crate::locale::DecimalSeparator;
use crate::relaxed;

/// Builds a preamble row.
///
/// `base` holds the transitions for other, quote, delimiter, `\r`, `\n` and
/// end of input, followed by those for `s`, `e`, `p` and `=`.
const fn sniff_row(
    base: [Transition; 6],
    s: Transition,
    e: Transition,
    p: Transition,
    equals: Transition,
) -> [Transition; 10] {
    [base[0], base[1], base[2], base[3], base[4], base[5], s, e, p, equals]
}

/// What every preamble state after the first does on bytes that end the
/// directive candidate without a line break of its own.
const PREFIX: [Transition; 6] = [
    go(Field, EDS),
    go(Field, EDS),
    go(BeforeField, EFH | EDS),
    go(CarriageReturn, EFH | EDS),
    go(BeforeLine, EFH | ELH | EDS),
    go(Eof, EFH | STP | EDS),
];

const GIVE_UP: Transition = go(Field, EDS);
const HOLD: Transition = go(SniffHeld, HLD);
const COMMIT: Transition = go(BeforeLine, RLR | STR | EDS);

/// Transitions of the `sep=` preamble, indexed by `state - SniffStart`.
///
/// Leaving the preamble always sets `EDS`. From then on the dialect follows
/// the relaxed table.
const SNIFF: [[Transition; 10]; 7] = [
    // SniffStart
    sniff_row(
        [
            go(Field, SFH | EDS),
            go(QuoteOpened, EDS),
            go(BeforeField, SFH | EFH | EDS),
            go(CarriageReturn, SFH | EFH | EDS),
            go(BeforeLine, SFH | EFH | ELH | EDS),
            go(Eof, STP | EDS),
        ],
        go(SniffS, SFH),
        go(Field, SFH | EDS),
        go(Field, SFH | EDS),
        go(Field, SFH | EDS),
    ),
    // SniffS
    sniff_row(PREFIX, GIVE_UP, go(SniffSe, 0), GIVE_UP, GIVE_UP),
    // SniffSe
    sniff_row(PREFIX, GIVE_UP, GIVE_UP, go(SniffSep, 0), GIVE_UP),
    // SniffSep
    sniff_row(PREFIX, GIVE_UP, GIVE_UP, GIVE_UP, go(SniffSepEquals, 0)),
    // SniffSepEquals
    sniff_row(
        [
            HOLD,
            go(Field, EDS),
            HOLD,
            go(CarriageReturn, EFH | EDS),
            go(BeforeLine, EFH | ELH | EDS),
            go(Eof, EFH | STP | EDS),
        ],
        HOLD,
        HOLD,
        HOLD,
        HOLD,
    ),
    // SniffHeld
    sniff_row(
        [
            GIVE_UP,
            GIVE_UP,
            go(BeforeField, EFH | EDS),
            go(SniffHeldCr, 0),
            go(BeforeLine, STR | EDS),
            go(Eof, EFH | STP | EDS),
        ],
        GIVE_UP,
        GIVE_UP,
        GIVE_UP,
        GIVE_UP,
    ),
    // SniffHeldCr
    sniff_row(
        [
            COMMIT,
            COMMIT,
            COMMIT,
            COMMIT,
            go(BeforeLine, STR | EDS),
            go(Eof, STP | STR | EDS),
        ],
        COMMIT,
        COMMIT,
        COMMIT,
        COMMIT,
    ),
];

/// A dialect compatible with the CSV files Microsoft Excel reads and
/// writes.
///
/// Parsing follows `Relaxed`. The delimiter defaults to `;` in locales that
/// use a decimal comma and to `,` elsewhere. If the very first line of the
/// stream is exactly `sep=X` followed by a line break, that line is consumed
/// and `X` becomes the delimiter. Any other first line is read as data.
///
/// This dialect changes while it reads, so each stream needs its own value.
#[derive(Clone, Debug)]
pub struct Excel {
    classes: ByteClasses,
    preamble: ByteClasses,
    delimiter: u8,
    quote: u8,
    held: Option<u8>,
    sniffing: bool,
}

impl Excel {
    pub(crate) fn new(delimiter: u8, quote: u8) -> Excel {
        Excel {
            classes: ByteClasses::new(delimiter, quote),
            preamble: ByteClasses::preamble(delimiter, quote),
            delimiter,
            quote,
            held: None,
            sniffing: true,
        }
    }

    /// Returns true until the first line has been ruled out as, or
    /// committed as, a `sep=` directive.
    pub fn is_sniffing(&self) -> bool {
        self.sniffing
    }

    /// Stops looking for a `sep=` directive.
    ///
    /// Useful when reading starts somewhere other than the beginning of a
    /// stream.
    pub fn skip_preamble(&mut self) {
        self.sniffing = false;
        self.held = None;
    }

    fn sniff(&mut self, state: State, input: Option<u8>) -> Transition {
        let class = self.preamble.get(input) as usize;
        let trans = SNIFF[state as usize - SniffStart as usize][class];
        let acts = trans.actions;
        if acts.contains(Actions::HOLD) {
            self.held = input;
        }
        if acts.contains(Actions::STORE) {
            if let Some(delimiter) = self.held.take() {
                self.classes.set_delimiter(self.delimiter, delimiter);
                self.delimiter = delimiter;
            }
        }
        if acts.contains(Actions::END_SNIFF) {
            self.skip_preamble();
        }
        Transition { state: trans.state, actions: acts.public() }
    }
}

impl Dialect for Excel {
    fn start(&self) -> State {
        if self.sniffing {
            SniffStart
        } else {
            BeforeLine
        }
    }

    #[inline(always)]
    fn transition(&mut self, state: State, input: Option<u8>) -> Transition {
        if state.is_sniffing() {
            return self.sniff(state, input);
        }
        relaxed::TABLE[state as usize][self.classes.get(input) as usize]
    }

    fn delimiter(&self) -> u8 {
        self.delimiter
    }

    fn quote(&self) -> u8 {
        self.quote
    }

    fn restart_line(&mut self) {
        self.skip_preamble();
    }
}

/// Provides `Excel` dialects for a locale's decimal separator.
#[derive(Clone, Copy, Debug)]
pub struct ExcelProvider {
    separator: DecimalSeparator,
    delimiter: Option<u8>,
    quote: u8,
}

impl Default for ExcelProvider {
    fn default() -> ExcelProvider {
        ExcelProvider::new(DecimalSeparator::default())
    }
}

impl ExcelProvider {
    /// A provider for locales with the given decimal separator.
    pub fn new(separator: DecimalSeparator) -> ExcelProvider {
        ExcelProvider { separator, delimiter: None, quote: b'"' }
    }

    /// Overrides the default delimiter chosen from the decimal separator.
    ///
    /// A `sep=` directive still takes precedence.
    pub fn delimiter(mut self, delimiter: u8) -> ExcelProvider {
        self.delimiter = Some(delimiter);
        self
    }

    /// The quote byte. The default is `"`.
    pub fn quote(mut self, quote: u8) -> ExcelProvider {
        self.quote = quote;
        self
    }

    /// A provider for the given locale tag, such as `fr_FR.UTF-8` or
    /// `en-US`.
    pub fn for_locale(tag: &str) -> ExcelProvider {
        ExcelProvider::new(DecimalSeparator::for_locale(tag))
    }

    /// The decimal separator this provider was built for.
    pub fn decimal_separator(&self) -> DecimalSeparator {
        self.separator
    }
}

impl DialectProvider for ExcelProvider {
    type Dialect = Excel;

    fn provide(&self) -> Excel {
        let delimiter =
            self.delimiter.unwrap_or_else(|| self.separator.list_delimiter());
        Excel::new(delimiter, self.quote)
    }
}

#[cfg(test)]
mod tests {
    use super::ExcelProvider;
    use crate::dialect::{Dialect, DialectProvider};
    use crate::locale::DecimalSeparator;
    use crate::testing::tokenize;

    fn point() -> ExcelProvider {
        ExcelProvider::new(DecimalSeparator::Point)
    }

    fn comma() -> ExcelProvider {
        ExcelProvider::new(DecimalSeparator::Comma)
    }

    parses_to!(empty, point(), "", csv![]);
    parses_to!(plain, point(), "a,b\r\nc,d", csv![["a", "b"], ["c", "d"]]);
    parses_to!(plain_comma_locale, comma(), "a;b\r\n1,5;2", csv![
        ["a", "b"],
        ["1,5", "2"]
    ]);
    parses_to!(directive_crlf, point(), "sep=;\r\na;b;c\r\n", csv![[
        "a", "b", "c"
    ]]);
    parses_to!(directive_lf, point(), "sep=;\na;b", csv![["a", "b"]]);
    parses_to!(directive_cr, point(), "sep=|\ra|b", csv![["a", "b"]]);
    parses_to!(directive_only, point(), "sep=|\r\n", csv![]);
    parses_to!(directive_cr_eof, point(), "sep=|\r", csv![]);
    parses_to!(directive_same, point(), "sep=,\r\na,b", csv![["a", "b"]]);
    parses_to!(directive_comma_locale, comma(), "sep=,\r\na,b;c", csv![[
        "a", "b;c"
    ]]);
    parses_to!(directive_quote_next, point(), "sep=;\r\n\"a;b\";c", csv![[
        "a;b", "c"
    ]]);

    parses_to!(not_directive_eof, point(), "sep=;", csv![["sep=;"]]);
    parses_to!(not_directive_longer, point(), "sep=;x,y\r\n", csv![[
        "sep=;x", "y"
    ]]);
    parses_to!(not_directive_prefix, point(), "sex,1\n", csv![["sex", "1"]]);
    parses_to!(not_directive_short, point(), "se,x\n", csv![["se", "x"]]);
    parses_to!(not_directive_bare, point(), "sep=\r\nx", csv![["sep="], [
        "x"
    ]]);
    parses_to!(not_directive_s, point(), "s", csv![["s"]]);
    parses_to!(not_directive_upper, point(), "SEP=;\na;b", csv![["SEP=;"], [
        "a;b"
    ]]);
    parses_to!(not_directive_quoted, point(), "\"sep=;\"\r\na;b", csv![
        ["sep=;"],
        ["a;b"]
    ]);
    parses_to!(not_directive_second_line, point(), "a\nsep=;\nb;c", csv![
        ["a"],
        ["sep=;"],
        ["b;c"]
    ]);
    parses_to!(leading_delimiter, point(), ",a", csv![["", "a"]]);
    parses_to!(leading_lf, point(), "\nsep=;", csv![[""], ["sep=;"]]);

    #[test]
    fn directive_changes_delimiter() {
        let mut dialect = point().provide();
        assert_eq!(dialect.delimiter(), b',');
        assert!(dialect.is_sniffing());
        tokenize(&mut dialect, b"sep=\t\r\na\tb").unwrap();
        assert_eq!(dialect.delimiter(), b'\t');
        assert!(!dialect.is_sniffing());
    }

    #[test]
    fn no_directive_keeps_delimiter() {
        let mut dialect = comma().provide();
        assert_eq!(dialect.delimiter(), b';');
        tokenize(&mut dialect, b"a;b\r\n").unwrap();
        assert_eq!(dialect.delimiter(), b';');
        assert!(!dialect.is_sniffing());
    }

    parses_to!(
        overridden_delimiter,
        point().delimiter(b'\t').quote(b'\''),
        "a\t'b\tc'\r\n",
        csv![["a", "b\tc"]]
    );
    parses_to!(
        directive_beats_override,
        point().delimiter(b'\t'),
        "sep=;\na;b\tc",
        csv![["a", "b\tc"]]
    );

    #[test]
    fn fresh_dialect_per_stream() {
        let provider = point();
        let mut first = provider.provide();
        tokenize(&mut first, b"sep=;\r\na;b").unwrap();
        let second = provider.provide();
        assert_eq!(first.delimiter(), b';');
        assert_eq!(second.delimiter(), b',');
        assert!(second.is_sniffing());
    }
}
