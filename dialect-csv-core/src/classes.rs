use core::fmt;

use crate::dialect::Class;

/// A map from every byte to its class.
///
/// Bytes that a dialect never discriminates between share the class
/// `Other`, which keeps transition tables small: one column per class
/// instead of one per byte.
#[derive(Clone)]
pub struct ByteClasses {
    classes: [Class; 256],
}

impl ByteClasses {
    /// Classes for the given delimiter and quote.
    ///
    /// `\r` and `\n` always keep their own classes. If the quote and the
    /// delimiter are the same byte, it is classified as the quote.
    pub fn new(delimiter: u8, quote: u8) -> ByteClasses {
        let mut classes = [Class::Other; 256];
        classes[delimiter as usize] = Class::Delimiter;
        classes[quote as usize] = Class::Quote;
        classes[b'\r' as usize] = Class::CarriageReturn;
        classes[b'\n' as usize] = Class::LineFeed;
        ByteClasses { classes }
    }

    /// Classes for reading a `sep=` preamble.
    ///
    /// These are the same as `new`, with `s`, `e`, `p` and `=` given their
    /// own classes unless one of them is already special.
    pub fn preamble(delimiter: u8, quote: u8) -> ByteClasses {
        let mut classes = ByteClasses::new(delimiter, quote);
        let extra = [
            (b's', Class::S),
            (b'e', Class::E),
            (b'p', Class::P),
            (b'=', Class::Equals),
        ];
        for &(b, class) in extra.iter() {
            if classes.classes[b as usize] == Class::Other {
                classes.classes[b as usize] = class;
            }
        }
        classes
    }

    /// Returns the class of the given input. `None` is the end of input.
    #[inline(always)]
    pub fn get(&self, input: Option<u8>) -> Class {
        match input {
            None => Class::Eof,
            Some(b) => self.classes[b as usize],
        }
    }

    /// Moves the delimiter class from `old` to `new`.
    ///
    /// Bytes with a class other than `Delimiter` or `Other` are left alone.
    pub fn set_delimiter(&mut self, old: u8, new: u8) {
        if self.classes[old as usize] == Class::Delimiter {
            self.classes[old as usize] = Class::Other;
        }
        if self.classes[new as usize] == Class::Other {
            self.classes[new as usize] = Class::Delimiter;
        }
    }
}

impl fmt::Debug for ByteClasses {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ByteClasses(N/A)")
    }
}
