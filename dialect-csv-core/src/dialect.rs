use core::fmt;
use core::ops;

/// The number of states shared by every dialect's automaton.
pub(crate) const STATES: usize = 17;

/// The number of byte classes seen by the main (non-preamble) tables.
pub(crate) const CLASSES: usize = 6;

/// A transition table over the main byte classes.
///
/// Rows are indexed by `State as usize` and columns by `Class as usize`.
pub(crate) type Table = [[Transition; CLASSES]; STATES];

/// A state of a dialect automaton.
///
/// All dialects share this state set, although not every dialect can reach
/// every state. The preamble states (`Sniff*`) are only ever produced by the
/// `Excel` dialect while it looks for a `sep=` directive on the first line.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[repr(u8)]
pub enum State {
    /// At the start of a line, before the first field.
    BeforeLine = 0,
    /// After a delimiter, before the next field.
    BeforeField = 1,
    /// Just after the quote that opens a quoted field.
    QuoteOpened = 2,
    /// A quote seen right after an opening quote. This is either an empty
    /// quoted field or the first half of an escaped quote.
    QuoteOpenedEscape = 3,
    /// Inside a quoted field.
    Quoted = 4,
    /// A quote seen inside a quoted field. This is either the closing quote
    /// or the first half of an escaped quote.
    Escape = 5,
    /// Inside an unquoted field.
    Field = 6,
    /// A carriage return seen at the end of a field.
    CarriageReturn = 7,
    /// End of input.
    Eof = 8,
    /// Malformed input was seen.
    Error = 9,
    /// First byte of the stream, directive not yet ruled out.
    SniffStart = 10,
    /// Seen `s`.
    SniffS = 11,
    /// Seen `se`.
    SniffSe = 12,
    /// Seen `sep`.
    SniffSep = 13,
    /// Seen `sep=`.
    SniffSepEquals = 14,
    /// Seen `sep=` and a candidate delimiter.
    SniffHeld = 15,
    /// Seen `sep=`, a candidate delimiter and a carriage return.
    SniffHeldCr = 16,
}

impl State {
    /// Returns true if this is one of the states of the `sep=` preamble.
    #[inline]
    pub fn is_sniffing(self) -> bool {
        self as u8 >= State::SniffStart as u8
    }

    /// Returns true if a field started from this state is a quoted field.
    ///
    /// A zero length field started from one of these states was written as
    /// `""` and is therefore present but empty rather than absent.
    #[inline]
    pub fn opens_quoted_field(self) -> bool {
        match self {
            State::QuoteOpened | State::QuoteOpenedEscape => true,
            _ => false,
        }
    }
}

/// The class of an input byte, as seen by a dialect's transition table.
///
/// Every byte that is not the delimiter, the quote, `\r` or `\n` is
/// `Other`. `Eof` stands for the end of input. The last four classes only
/// exist while the `Excel` dialect is reading its preamble.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[repr(u8)]
pub enum Class {
    /// Any byte without a special meaning.
    Other = 0,
    /// The quote byte.
    Quote = 1,
    /// The field delimiter.
    Delimiter = 2,
    /// `\r`
    CarriageReturn = 3,
    /// `\n`
    LineFeed = 4,
    /// End of input.
    Eof = 5,
    /// `s`, preamble only.
    S = 6,
    /// `e`, preamble only.
    E = 7,
    /// `p`, preamble only.
    P = 8,
    /// `=`, preamble only.
    Equals = 9,
}

pub(crate) mod bits {
    pub const SFH: u16 = 1 << 0;
    pub const EFH: u16 = 1 << 1;
    pub const EFB: u16 = 1 << 2;
    pub const ELH: u16 = 1 << 3;
    pub const RLR: u16 = 1 << 4;
    pub const RCB: u16 = 1 << 5;
    pub const STP: u16 = 1 << 6;
    pub const ERH: u16 = 1 << 7;
    // Preamble bookkeeping. Never visible outside the dialect.
    pub const HLD: u16 = 1 << 8;
    pub const STR: u16 = 1 << 9;
    pub const EDS: u16 = 1 << 10;

    pub const PUBLIC: u16 = 0xFF;
}

/// The set of actions attached to a transition.
///
/// A tokenizer interprets these after every byte. They are applied in this
/// order: `REMOVE_CHAR_BEFORE`, `END_FIELD_BEFORE`, `START_FIELD`,
/// `END_FIELD_HERE`, then the cursor moves forward unless `REPEAT` is set,
/// and finally `END_LINE` or `STOP` end the record.
#[derive(Clone, Copy, Default, Eq, Hash, PartialEq)]
pub struct Actions(u16);

impl Actions {
    /// No action.
    pub const NONE: Actions = Actions(0);
    /// The current byte is the first byte of a field.
    pub const START_FIELD: Actions = Actions(bits::SFH);
    /// The current field ends just before the current byte.
    pub const END_FIELD_HERE: Actions = Actions(bits::EFH);
    /// The current field ends two bytes before the current byte. The byte
    /// in between (a closing quote) is not part of the field.
    pub const END_FIELD_BEFORE: Actions = Actions(bits::EFB);
    /// The current record is complete.
    pub const END_LINE: Actions = Actions(bits::ELH);
    /// Present the current byte again on the next step.
    pub const REPEAT: Actions = Actions(bits::RLR);
    /// The byte before the current one is an escaping quote and must be
    /// removed from the field.
    pub const REMOVE_CHAR_BEFORE: Actions = Actions(bits::RCB);
    /// End of input. No further record follows.
    pub const STOP: Actions = Actions(bits::STP);
    /// The input is malformed at the current byte.
    pub const ERROR: Actions = Actions(bits::ERH);

    pub(crate) const HOLD: Actions = Actions(bits::HLD);
    pub(crate) const STORE: Actions = Actions(bits::STR);
    pub(crate) const END_SNIFF: Actions = Actions(bits::EDS);

    /// Returns true if every action in `other` is also in `self`.
    #[inline]
    pub fn contains(self, other: Actions) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns true if no action is set.
    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// The raw bits of this action set.
    #[inline]
    pub fn bits(self) -> u16 {
        self.0
    }

    /// Drops the dialect-private bits.
    #[inline]
    pub(crate) fn public(self) -> Actions {
        Actions(self.0 & bits::PUBLIC)
    }
}

impl ops::BitOr for Actions {
    type Output = Actions;

    #[inline]
    fn bitor(self, other: Actions) -> Actions {
        Actions(self.0 | other.0)
    }
}

impl ops::BitOrAssign for Actions {
    #[inline]
    fn bitor_assign(&mut self, other: Actions) {
        self.0 |= other.0;
    }
}

impl fmt::Debug for Actions {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        const NAMES: &[(Actions, &str)] = &[
            (Actions::START_FIELD, "START_FIELD"),
            (Actions::END_FIELD_HERE, "END_FIELD_HERE"),
            (Actions::END_FIELD_BEFORE, "END_FIELD_BEFORE"),
            (Actions::END_LINE, "END_LINE"),
            (Actions::REPEAT, "REPEAT"),
            (Actions::REMOVE_CHAR_BEFORE, "REMOVE_CHAR_BEFORE"),
            (Actions::STOP, "STOP"),
            (Actions::ERROR, "ERROR"),
        ];
        if self.is_empty() {
            return write!(f, "NONE");
        }
        let mut first = true;
        for &(action, name) in NAMES {
            if self.contains(action) {
                if !first {
                    write!(f, " | ")?;
                }
                write!(f, "{}", name)?;
                first = false;
            }
        }
        Ok(())
    }
}

/// The result of feeding one input byte to a dialect.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Transition {
    /// The state to move to.
    pub state: State,
    /// The actions the tokenizer must perform.
    pub actions: Actions,
}

/// Builds a transition in a `const` table.
pub(crate) const fn go(state: State, bits: u16) -> Transition {
    Transition { state, actions: Actions(bits) }
}

/// Builds a table row for the main byte classes.
pub(crate) const fn row(
    other: Transition,
    quote: Transition,
    delimiter: Transition,
    cr: Transition,
    lf: Transition,
    eof: Transition,
) -> [Transition; CLASSES] {
    [other, quote, delimiter, cr, lf, eof]
}

/// A CSV dialect: a total transition function over the automaton states and
/// byte classes.
///
/// Dialects are obtained from a `DialectProvider` and are owned by exactly
/// one tokenizer for the lifetime of a stream. Some dialects (`Excel`) keep
/// per-stream state, so a dialect value must never be shared between two
/// streams.
pub trait Dialect {
    /// The state every record starts in.
    fn start(&self) -> State;

    /// Feeds one input byte, or `None` at the end of input, to the
    /// automaton.
    ///
    /// This must be defined for every state and every input.
    fn transition(&mut self, state: State, input: Option<u8>) -> Transition;

    /// The current field delimiter.
    fn delimiter(&self) -> u8;

    /// The quote byte.
    fn quote(&self) -> u8;

    /// Called when a tokenizer jumps to the start of a line somewhere in
    /// the middle of the stream. The next record starts in `BeforeLine`.
    ///
    /// The default does nothing.
    fn restart_line(&mut self) {}

    /// Describes why the transition from `state` on `input` was an error.
    ///
    /// This is only consulted after `transition` returned `ERROR`.
    fn malformation(&self, _state: State, input: Option<u8>) -> Malformation {
        match input {
            None => Malformation::UnexpectedEof,
            Some(_) => Malformation::UnexpectedByte,
        }
    }
}

/// A factory of fresh dialect values, one per stream.
///
/// Every call to `provide` must return a value that shares no mutable state
/// with any value returned before.
///
/// Any closure returning a dialect is a provider:
///
/// ```
/// use dialect_csv_core::{Dialect, DialectProvider, StrictProvider};
///
/// let semicolons = StrictProvider::new().delimiter(b';');
/// let provider = move || semicolons.provide();
/// assert_eq!(provider.provide().delimiter(), b';');
/// ```
pub trait DialectProvider {
    /// The dialect this provider produces.
    type Dialect: Dialect;

    /// Returns a new dialect value.
    fn provide(&self) -> Self::Dialect;
}

impl<D: Dialect, F: Fn() -> D> DialectProvider for F {
    type Dialect = D;

    fn provide(&self) -> D {
        self()
    }
}

/// The reason a dialect rejected its input.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Malformation {
    /// A byte that is not allowed in the current context.
    UnexpectedByte,
    /// Input ended inside a quoted field or after a lone carriage return.
    UnexpectedEof,
    /// A line feed not preceded by a carriage return, after unquoted field
    /// content.
    BareLineFeed,
}

impl fmt::Display for Malformation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Malformation::UnexpectedByte => write!(f, "unexpected character"),
            Malformation::UnexpectedEof => write!(f, "unexpected end of input"),
            Malformation::BareLineFeed => {
                write!(f, "line feed without carriage return")
            }
        }
    }
}

/// Displays an input byte (or the end of input) for error messages.
///
/// Control characters are written by name, e.g. `{LF}`, and the end of
/// input is written as `{EOF}`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Printable(pub Option<u8>);

impl fmt::Display for Printable {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        const CONTROL: [&str; 32] = [
            "NUL", "SOH", "STX", "ETX", "EOT", "ENQ", "ACK", "BEL", "BS",
            "TAB", "LF", "VT", "FF", "CR", "SO", "SI", "DLE", "DC1", "DC2",
            "DC3", "DC4", "NAK", "SYN", "ETB", "CAN", "EM", "SUB", "ESC",
            "FS", "GS", "RS", "US",
        ];
        match self.0 {
            None => write!(f, "{{EOF}}"),
            Some(b) if b < 0x20 => write!(f, "{{{}}}", CONTROL[b as usize]),
            Some(0x7F) => write!(f, "{{DEL}}"),
            Some(b) if b >= 0x80 => write!(f, "\\x{:02X}", b),
            Some(b) => write!(f, "{}", b as char),
        }
    }
}

#[cfg(test)]
mod tests {
    use core::fmt::Write;

    use arrayvec::ArrayString;

    use super::{Actions, Printable, State};

    fn show<T: core::fmt::Display>(x: T) -> ArrayString<32> {
        let mut s = ArrayString::new();
        write!(s, "{}", x).unwrap();
        s
    }

    #[test]
    fn printable() {
        assert_eq!(show(Printable(Some(b'a'))).as_str(), "a");
        assert_eq!(show(Printable(Some(b'\n'))).as_str(), "{LF}");
        assert_eq!(show(Printable(Some(b'\r'))).as_str(), "{CR}");
        assert_eq!(show(Printable(Some(b'\t'))).as_str(), "{TAB}");
        assert_eq!(show(Printable(Some(0))).as_str(), "{NUL}");
        assert_eq!(show(Printable(Some(0x1F))).as_str(), "{US}");
        assert_eq!(show(Printable(Some(0xFF))).as_str(), "\\xFF");
        assert_eq!(show(Printable(None)).as_str(), "{EOF}");
    }

    #[test]
    fn actions_contains() {
        let a = Actions::START_FIELD | Actions::END_FIELD_HERE;
        assert!(a.contains(Actions::START_FIELD));
        assert!(a.contains(Actions::END_FIELD_HERE));
        assert!(!a.contains(Actions::END_LINE));
        assert!(a.contains(Actions::NONE));
        assert!(Actions::NONE.is_empty());
    }

    #[test]
    fn private_bits_are_dropped() {
        let a = Actions::HOLD | Actions::STOP | Actions::END_SNIFF;
        assert_eq!(a.public(), Actions::STOP);
    }

    #[test]
    fn sniff_states() {
        assert!(!State::Error.is_sniffing());
        assert!(State::SniffStart.is_sniffing());
        assert!(State::SniffHeldCr.is_sniffing());
        assert!(State::QuoteOpened.opens_quoted_field());
        assert!(!State::Field.opens_quoted_field());
    }
}
