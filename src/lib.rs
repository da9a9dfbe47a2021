/*!
The `dialect-csv` crate provides a streaming CSV reader and writer whose
parsing rules come from table-driven dialects.

# Overview

A [`Reader`](struct.Reader.html) feeds its input one byte at a time to a
[`Dialect`](trait.Dialect.html): a total transition function that says
where fields start and end and when a record is complete. Four dialects
are provided by
[`dialect-csv-core`](https://docs.rs/dialect-csv-core):

* [`StrictProvider`](struct.StrictProvider.html): RFC 4180. Anything else
  is reported as `Error::Malformed`.
* [`RelaxedProvider`](struct.RelaxedProvider.html): RFC 4180 with every
  deviation accepted. Any of `\r\n`, `\r` and `\n` ends a line. This is
  the default.
* [`ExcelProvider`](struct.ExcelProvider.html): relaxed parsing with a
  delimiter chosen from the locale's decimal separator, overridden by a
  `sep=X` directive on the first line.
* [`LegacyStrictProvider`](struct.LegacyStrictProvider.html): strict
  parsing that reports a bare line feed after a field separately.

Readers are built from a *provider* rather than a dialect, so no two
streams ever share the state of an `Excel` dialect.

Every record is a [`Record`](struct.Record.html): an ordered list of fields
that are either present (possibly empty) or absent. Reading `a,,""` yields
`a`, an absent field and an empty field. The
[`Writer`](struct.Writer.html) keeps the distinction when writing, so
records round trip.

# Example: reading

```
use dialect_csv::{Error, ReaderBuilder, StrictProvider};

# fn main() -> Result<(), Error> {
let data = "\
city,population\r
Boston,4628910\r
\"Concord, NH\",\r
";
let mut rdr = ReaderBuilder::new(StrictProvider::new()).from_reader(data.as_bytes());
rdr.skip(1)?;
while let Some(rec) = rdr.next_record()? {
    let city = rec.get_str(0)?.unwrap_or("");
    match rec.get_i64(1)? {
        Some(pop) => println!("{}: {}", city, pop),
        None => println!("{}: unknown", city),
    }
}
# Ok(())
# }
```

# Example: mapping records to values

Records map to values through the
[`RecordDecoder`](mapping/trait.RecordDecoder.html) and
[`RecordEncoder`](mapping/trait.RecordEncoder.html) traits. Closures
implement both, and with the default `serde` feature so does
[`mapping::Serde`](mapping/struct.Serde.html):

```
use dialect_csv::{Reader, Writer};

# fn main() -> Result<(), Box<dyn std::error::Error>> {
let mut wtr = Writer::from_writer(vec![]);
wtr.serialize(&("Boston", Some(4628910u64)))?;
wtr.serialize(&("Nowhere", None::<u64>))?;
let data = wtr.into_inner()?;

let mut rdr = Reader::from_reader(&data[..]);
let rows: Vec<(String, Option<u64>)> =
    rdr.deserialize().collect::<Result<_, _>>()?;
assert_eq!(rows[1], ("Nowhere".to_string(), None));
# Ok(())
# }
```

# Features

* `serde` (default): positional serde support through `mapping::Serde`,
  `Reader::deserialize` and `Writer::serialize`.
* `bignum` (default): `Record::get_big_int` and `Record::get_decimal`.
*/

#![deny(missing_docs)]

pub use dialect_csv_core::{
    DecimalSeparator, Dialect, DialectProvider, Excel, ExcelProvider,
    LegacyStrict, LegacyStrictProvider, Malformation, Relaxed,
    RelaxedProvider, State, Strict, StrictProvider,
};

#[cfg(feature = "serde")]
pub use crate::deserializer::{DeserializeError, DeserializeErrorKind};
pub use crate::error::{
    ConversionError, Error, FieldError, FieldErrorKind, IntoInnerError,
    Result,
};
pub use crate::locale::decimal_separator_from_env;
pub use crate::reader::{DecodeIter, Reader, ReaderBuilder, RecordsIter};
pub use crate::record::{FrozenRecord, Position, Record, RecordIter};
#[cfg(feature = "serde")]
pub use crate::serializer::SerializeError;
pub use crate::writer::{Writer, WriterBuilder};

#[cfg(feature = "serde")]
mod deserializer;
mod error;
mod locale;
pub mod mapping;
mod reader;
mod record;
#[cfg(feature = "serde")]
mod serializer;
mod writer;
