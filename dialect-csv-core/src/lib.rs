/*!
`dialect-csv-core` provides table-driven CSV dialect automata and a push
writer that never allocate and do not depend on the standard library.

Most users want the [`dialect-csv`](https://docs.rs/dialect-csv) crate,
which drives these automata over any `io::Read` and exposes records with
typed field accessors.

# Overview

A [`Dialect`](trait.Dialect.html) is a total transition function over a
small set of [`State`](enum.State.html)s and byte
[`Class`](enum.Class.html)es. Feeding it one byte at a time yields a
[`Transition`](struct.Transition.html): the next state and a set of
[`Actions`](struct.Actions.html) that tell a tokenizer where fields start
and end, which bytes to drop and when a record is complete.

Four dialects are provided:

* [`Strict`](struct.Strict.html): RFC 4180 with every deviation reported
  as an error.
* [`Relaxed`](struct.Relaxed.html): RFC 4180 with every deviation
  accepted. It never reports an error.
* [`Excel`](struct.Excel.html): `Relaxed` with a locale dependent default
  delimiter and support for the `sep=` directive on the first line.
* [`LegacyStrict`](struct.LegacyStrict.html): `Strict`, reporting bare
  line feeds separately.

Dialects are never constructed directly. Each comes from a
[`DialectProvider`](trait.DialectProvider.html), which returns a fresh
value for every stream, since `Excel` changes its delimiter while reading.

# Example: running a dialect by hand

```
use dialect_csv_core::{Actions, Dialect, DialectProvider, StrictProvider};

let mut dialect = StrictProvider::new().provide();
let data = b"a,b\r\n";

let mut state = dialect.start();
let mut ends = vec![];
let mut pos = 0;
loop {
    let input = data.get(pos).cloned();
    let trans = dialect.transition(state, input);
    if trans.actions.contains(Actions::END_FIELD_HERE) {
        ends.push(pos);
    }
    if trans.actions.contains(Actions::STOP) {
        break;
    }
    state = trans.state;
    pos += 1;
}
assert_eq!(ends, vec![1, 3]);
```

# Example: writing

```
use dialect_csv_core::{Writer, WriteResult};

let mut wtr = Writer::new();
let mut out = [0; 64];
let mut n = 0;

let (res, _, nout) = wtr.field(b"a", &mut out[n..]);
assert_eq!(res, WriteResult::InputEmpty);
n += nout;
n += wtr.delimiter(&mut out[n..]).1;
n += wtr.field(b"b,c", &mut out[n..]).2;
n += wtr.terminator(&mut out[n..]).1;

assert_eq!(&out[..n], b"a,\"b,c\"\r\n");
```
*/

#![deny(missing_docs)]
#![cfg_attr(not(test), no_std)]

#[cfg(test)]
#[macro_use]
mod testing;

pub use crate::classes::ByteClasses;
pub use crate::dialect::{
    Actions, Class, Dialect, DialectProvider, Malformation, Printable, State,
    Transition,
};
pub use crate::excel::{Excel, ExcelProvider};
pub use crate::legacy::{LegacyStrict, LegacyStrictProvider};
pub use crate::locale::DecimalSeparator;
pub use crate::relaxed::{Relaxed, RelaxedProvider};
pub use crate::strict::{Strict, StrictProvider};
pub use crate::writer::{
    quote, should_quote, WriteResult, Writer, WriterBuilder,
};

mod classes;
mod dialect;
mod excel;
mod legacy;
mod locale;
mod relaxed;
mod strict;
mod writer;
