//! Mapping between records and values.
//!
//! Readers and writers depend on two narrow traits: a
//! [`RecordDecoder`](trait.RecordDecoder.html) builds a value from a record
//! and a [`RecordEncoder`](trait.RecordEncoder.html) appends the fields of a
//! value to a record. Their failures are reported as
//! `Error::Conversion`.

use std::error;

use crate::record::Record;

/// The error type of mapping functions.
pub type BoxError = Box<dyn error::Error + Send + Sync + 'static>;

/// Maps a record to a value.
///
/// Any closure `Fn(&Record) -> Result<T, BoxError>` is a decoder. With the
/// `serde` feature enabled, [`Serde`](struct.Serde.html) decodes any
/// `DeserializeOwned` type.
///
/// A failed decoding is reported by the reader as `Error::Conversion`,
/// which carries the fields of the record that failed.
///
/// ```
/// use dialect_csv::{mapping::BoxError, Reader, Record};
///
/// let decoder = |rec: &Record| -> Result<(String, i64), BoxError> {
///     let name = rec.get_str(0)?.unwrap_or("").to_string();
///     let age = rec.get_i64(1)?.ok_or("missing age")?;
///     Ok((name, age))
/// };
///
/// let mut rdr = Reader::from_reader("ann,42\nbob,7\n".as_bytes());
/// assert_eq!(rdr.decode(&decoder).unwrap(), Some(("ann".to_string(), 42)));
/// assert_eq!(rdr.decode(&decoder).unwrap(), Some(("bob".to_string(), 7)));
/// assert_eq!(rdr.decode(&decoder).unwrap(), None);
/// ```
pub trait RecordDecoder<T> {
    /// Builds a value from the fields of `record`.
    fn decode(&self, record: &Record) -> Result<T, BoxError>;
}

impl<T, F> RecordDecoder<T> for F
where
    F: Fn(&Record) -> Result<T, BoxError>,
{
    fn decode(&self, record: &Record) -> Result<T, BoxError> {
        self(record)
    }
}

/// Maps a value to a record.
///
/// `out` is cleared before `encode` is called. Fields pushed with
/// `Record::push_absent` are written as nothing at all, while empty fields
/// pushed with `Record::push_field` are written as `""`.
///
/// Any closure `Fn(&T, &mut Record) -> Result<(), BoxError>` is an encoder.
/// With the `serde` feature enabled, [`Serde`](struct.Serde.html) encodes
/// any `Serialize` type.
pub trait RecordEncoder<T: ?Sized> {
    /// Appends the fields of `value` to `out`.
    fn encode(&self, value: &T, out: &mut Record) -> Result<(), BoxError>;
}

impl<T: ?Sized, F> RecordEncoder<T> for F
where
    F: Fn(&T, &mut Record) -> Result<(), BoxError>,
{
    fn encode(&self, value: &T, out: &mut Record) -> Result<(), BoxError> {
        self(value, out)
    }
}

/// A codec that maps records with serde.
///
/// Records map to values positionally: the fields of a struct, the
/// elements of a tuple and the items of a sequence correspond to fields of
/// the record in order. An absent field reads as `None` for an `Option`,
/// while a quoted empty field reads as `Some` of an empty value. `None` is
/// written as an absent field. Unit enum variants are read from and
/// written as their names. Enum variants with data are rejected both
/// ways.
///
/// ```
/// use serde::{Deserialize, Serialize};
/// use dialect_csv::{mapping::Serde, Reader, Writer};
///
/// #[derive(Debug, Deserialize, PartialEq, Serialize)]
/// struct City {
///     name: String,
///     population: Option<u64>,
/// }
///
/// let mut wtr = Writer::from_writer(vec![]);
/// wtr.encode(&City { name: "Boston".into(), population: Some(4628910) }, &Serde)
///     .unwrap();
/// wtr.encode(&City { name: "Nowhere".into(), population: None }, &Serde)
///     .unwrap();
/// let data = wtr.into_inner().unwrap();
/// assert_eq!(data, b"Boston,4628910\r\nNowhere,\r\n");
///
/// let mut rdr = Reader::from_reader(&data[..]);
/// let first: Option<City> = rdr.decode(&Serde).unwrap();
/// assert_eq!(first.unwrap().population, Some(4628910));
/// let second: Option<City> = rdr.decode(&Serde).unwrap();
/// assert_eq!(second.unwrap().population, None);
/// ```
#[cfg(feature = "serde")]
#[derive(Clone, Copy, Debug, Default)]
pub struct Serde;

#[cfg(feature = "serde")]
impl<T: serde::de::DeserializeOwned> RecordDecoder<T> for Serde {
    fn decode(&self, record: &Record) -> Result<T, BoxError> {
        crate::deserializer::deserialize_record(record)
            .map_err(|err| Box::new(err) as BoxError)
    }
}

#[cfg(feature = "serde")]
impl<T: ?Sized + serde::Serialize> RecordEncoder<T> for Serde {
    fn encode(&self, value: &T, out: &mut Record) -> Result<(), BoxError> {
        crate::serializer::serialize_record(value, out)
            .map_err(|err| Box::new(err) as BoxError)
    }
}
