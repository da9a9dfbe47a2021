use std::error::Error as StdError;
use std::fmt;
use std::iter;
use std::num;
use std::str;

use serde::de::value::BorrowedStrDeserializer;
use serde::de::{
    DeserializeOwned, DeserializeSeed, Deserializer, EnumAccess,
    Error as SerdeError, SeqAccess, Unexpected, VariantAccess, Visitor,
};

use crate::record::{Record, RecordIter};

use self::DeserializeErrorKind as DEK;

/// Deserializes a record positionally.
pub fn deserialize_record<D: DeserializeOwned>(
    record: &Record,
) -> Result<D, DeserializeError> {
    let mut de = DeRecord::new(record);
    D::deserialize(&mut de)
}

struct DeRecord<'r> {
    rec: &'r Record,
    it: iter::Peekable<RecordIter<'r>>,
    /// The index of the next field.
    field: u64,
}

impl<'r> DeRecord<'r> {
    fn new(rec: &'r Record) -> DeRecord<'r> {
        DeRecord { rec, it: rec.iter().peekable(), field: 0 }
    }

    /// Returns an error corresponding to the most recently extracted field.
    fn error(&self, kind: DeserializeErrorKind) -> DeserializeError {
        DeserializeError { field: Some(self.field.saturating_sub(1)), kind }
    }

    /// Extracts the next field from the underlying record.
    #[inline(always)]
    fn next_bytes(&mut self) -> Result<&'r [u8], DeserializeError> {
        match self.it.next() {
            Some(field) => {
                self.field += 1;
                Ok(field)
            }
            None => Err(DeserializeError {
                field: None,
                kind: DEK::UnexpectedEndOfRow,
            }),
        }
    }

    /// Extracts the next field as text.
    fn next_field(&mut self) -> Result<&'r str, DeserializeError> {
        let bytes = self.next_bytes()?;
        str::from_utf8(bytes).map_err(|err| self.error(DEK::Utf8(err)))
    }

    /// Peeks at the next field from the underlying record.
    fn peek_field(&mut self) -> Option<&'r [u8]> {
        self.it.peek().cloned()
    }

    /// Returns true if the next field exists and is absent.
    fn peek_absent(&self) -> bool {
        self.rec.is_absent(self.field as usize)
    }
}

macro_rules! deserialize_int {
    ($method:ident, $visit:ident) => {
        fn $method<V: Visitor<'de>>(
            self,
            visitor: V,
        ) -> Result<V::Value, Self::Error> {
            let field = self.next_field()?;
            visitor.$visit(
                field.parse().map_err(|err| self.error(DEK::ParseInt(err)))?,
            )
        }
    };
}

impl<'a, 'de: 'a> Deserializer<'de> for &'a mut DeRecord<'de> {
    type Error = DeserializeError;

    fn deserialize_any<V: Visitor<'de>>(
        self,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        let x = self.next_field()?;
        if x == "true" {
            visitor.visit_bool(true)
        } else if x == "false" {
            visitor.visit_bool(false)
        } else if is_positive_integer(x.as_bytes()) {
            match x.parse() {
                Ok(n) => visitor.visit_u64(n),
                Err(_) => visitor.visit_borrowed_str(x),
            }
        } else if is_negative_integer(x.as_bytes()) {
            match x.parse() {
                Ok(n) => visitor.visit_i64(n),
                Err(_) => visitor.visit_borrowed_str(x),
            }
        } else if let Some(n) = try_float(x) {
            visitor.visit_f64(n)
        } else {
            visitor.visit_borrowed_str(x)
        }
    }

    fn deserialize_bool<V: Visitor<'de>>(
        self,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        let field = self.next_field()?;
        if field.eq_ignore_ascii_case("true") {
            visitor.visit_bool(true)
        } else if field.eq_ignore_ascii_case("false") {
            visitor.visit_bool(false)
        } else {
            Err(self.error(DEK::ParseBool(field.to_string())))
        }
    }

    deserialize_int!(deserialize_u8, visit_u8);
    deserialize_int!(deserialize_u16, visit_u16);
    deserialize_int!(deserialize_u32, visit_u32);
    deserialize_int!(deserialize_u64, visit_u64);
    deserialize_int!(deserialize_i8, visit_i8);
    deserialize_int!(deserialize_i16, visit_i16);
    deserialize_int!(deserialize_i32, visit_i32);
    deserialize_int!(deserialize_i64, visit_i64);

    fn deserialize_f32<V: Visitor<'de>>(
        self,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        let field = self.next_field()?;
        visitor.visit_f32(
            field.parse().map_err(|err| self.error(DEK::ParseFloat(err)))?,
        )
    }

    fn deserialize_f64<V: Visitor<'de>>(
        self,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        let field = self.next_field()?;
        visitor.visit_f64(
            field.parse().map_err(|err| self.error(DEK::ParseFloat(err)))?,
        )
    }

    fn deserialize_char<V: Visitor<'de>>(
        self,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        let field = self.next_field()?;
        let mut chars = field.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => visitor.visit_char(c),
            _ => Err(self.error(DEK::Message(format!(
                "expected single character but got {} characters in '{}'",
                field.chars().count(),
                field
            )))),
        }
    }

    fn deserialize_str<V: Visitor<'de>>(
        self,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.next_field().and_then(|f| visitor.visit_borrowed_str(f))
    }

    fn deserialize_string<V: Visitor<'de>>(
        self,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.next_field().and_then(|f| visitor.visit_str(f))
    }

    fn deserialize_bytes<V: Visitor<'de>>(
        self,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.next_bytes().and_then(|f| visitor.visit_borrowed_bytes(f))
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(
        self,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.next_bytes().and_then(|f| visitor.visit_byte_buf(f.to_vec()))
    }

    fn deserialize_option<V: Visitor<'de>>(
        self,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        match self.peek_field() {
            None => visitor.visit_none(),
            Some(_) if self.peek_absent() => {
                self.next_bytes()?;
                visitor.visit_none()
            }
            Some(_) => visitor.visit_some(self),
        }
    }

    fn deserialize_unit<V: Visitor<'de>>(
        self,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        visitor.visit_unit()
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        visitor.visit_unit()
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(
        self,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        visitor.visit_seq(self)
    }

    fn deserialize_tuple<V: Visitor<'de>>(
        self,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        visitor.visit_seq(self)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        visitor.visit_seq(self)
    }

    fn deserialize_map<V: Visitor<'de>>(
        self,
        _visitor: V,
    ) -> Result<V::Value, Self::Error> {
        Err(self.error(DEK::Unsupported("deserialize_map".into())))
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        visitor.visit_seq(self)
    }

    fn deserialize_identifier<V: Visitor<'de>>(
        self,
        _visitor: V,
    ) -> Result<V::Value, Self::Error> {
        Err(self.error(DEK::Unsupported("deserialize_identifier".into())))
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        visitor.visit_enum(self)
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(
        self,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        // Read and drop the next field.
        let _ = self.next_bytes()?;
        visitor.visit_unit()
    }
}

impl<'a, 'de: 'a> EnumAccess<'de> for &'a mut DeRecord<'de> {
    type Error = DeserializeError;
    type Variant = Self;

    fn variant_seed<V: DeserializeSeed<'de>>(
        self,
        seed: V,
    ) -> Result<(V::Value, Self::Variant), Self::Error> {
        let variant_name = self.next_field()?;
        seed.deserialize(BorrowedStrDeserializer::new(variant_name))
            .map(|v| (v, self))
    }
}

impl<'a, 'de: 'a> VariantAccess<'de> for &'a mut DeRecord<'de> {
    type Error = DeserializeError;

    fn unit_variant(self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn newtype_variant_seed<T: DeserializeSeed<'de>>(
        self,
        _seed: T,
    ) -> Result<T::Value, Self::Error> {
        let unexp = Unexpected::UnitVariant;
        Err(DeserializeError::invalid_type(unexp, &"newtype variant"))
    }

    fn tuple_variant<V: Visitor<'de>>(
        self,
        _len: usize,
        _visitor: V,
    ) -> Result<V::Value, Self::Error> {
        let unexp = Unexpected::UnitVariant;
        Err(DeserializeError::invalid_type(unexp, &"tuple variant"))
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        _fields: &'static [&'static str],
        _visitor: V,
    ) -> Result<V::Value, Self::Error> {
        let unexp = Unexpected::UnitVariant;
        Err(DeserializeError::invalid_type(unexp, &"struct variant"))
    }
}

impl<'a, 'de: 'a> SeqAccess<'de> for &'a mut DeRecord<'de> {
    type Error = DeserializeError;

    fn next_element_seed<T: DeserializeSeed<'de>>(
        &mut self,
        seed: T,
    ) -> Result<Option<T::Value>, Self::Error> {
        if self.peek_field().is_none() {
            Ok(None)
        } else {
            seed.deserialize(&mut **self).map(Some)
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.it.size_hint().0)
    }
}

/// An error that occurs when deserializing a record with serde.
///
/// The `Serde` codec reports this error, wrapped in `Error::Conversion`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DeserializeError {
    field: Option<u64>,
    kind: DeserializeErrorKind,
}

/// The type of a serde deserialization error.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DeserializeErrorKind {
    /// A generic serde deserialization error.
    Message(String),
    /// A generic serde deserialization error from an unsupported
    /// deserialization method.
    Unsupported(String),
    /// This error occurs when a value is expected but the record has no
    /// more fields.
    UnexpectedEndOfRow,
    /// An error that occurs when a field is not valid UTF-8.
    Utf8(str::Utf8Error),
    /// An error that occurs when a field is not `true` or `false`.
    ParseBool(String),
    /// An error that occurs when a field is not an integer.
    ParseInt(num::ParseIntError),
    /// An error that occurs when a field is not a float.
    ParseFloat(num::ParseFloatError),
}

impl SerdeError for DeserializeError {
    fn custom<T: fmt::Display>(msg: T) -> DeserializeError {
        DeserializeError {
            field: None,
            kind: DeserializeErrorKind::Message(msg.to_string()),
        }
    }
}

impl StdError for DeserializeError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self.kind {
            DEK::Utf8(ref err) => Some(err),
            DEK::ParseInt(ref err) => Some(err),
            DEK::ParseFloat(ref err) => Some(err),
            _ => None,
        }
    }
}

impl fmt::Display for DeserializeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(field) = self.field {
            write!(f, "field {}: {}", field, self.kind)
        } else {
            write!(f, "{}", self.kind)
        }
    }
}

impl fmt::Display for DeserializeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use self::DeserializeErrorKind::*;

        match *self {
            Message(ref msg) => write!(f, "{}", msg),
            Unsupported(ref which) => {
                write!(f, "unsupported deserializer method: {}", which)
            }
            UnexpectedEndOfRow => {
                write!(f, "expected field, but got end of row")
            }
            Utf8(ref err) => write!(f, "invalid UTF-8: {}", err),
            ParseBool(ref field) => {
                write!(f, "expected 'true' or 'false', got '{}'", field)
            }
            ParseInt(ref err) => err.fmt(f),
            ParseFloat(ref err) => err.fmt(f),
        }
    }
}

impl DeserializeError {
    /// Return the field index (starting at 0) of this error, if available.
    pub fn field(&self) -> Option<u64> {
        self.field
    }

    /// Return the underlying error kind.
    pub fn kind(&self) -> &DeserializeErrorKind {
        &self.kind
    }
}

fn is_positive_integer(bs: &[u8]) -> bool {
    !bs.is_empty() && bs.iter().all(|&b| b'0' <= b && b <= b'9')
}

fn is_negative_integer(bs: &[u8]) -> bool {
    !bs.is_empty() && bs[0] == b'-' && is_positive_integer(&bs[1..])
}

fn try_float(s: &str) -> Option<f64> {
    s.parse().ok()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde::de::DeserializeOwned;
    use serde::Deserialize;

    use super::{deserialize_record, DeserializeError, DeserializeErrorKind};
    use crate::record::Record;

    fn de<D: DeserializeOwned>(
        fields: &[Option<&str>],
    ) -> Result<D, DeserializeError> {
        let mut rec = Record::new();
        rec.extend(fields.iter().cloned());
        deserialize_record(&rec)
    }

    #[test]
    fn with_struct() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Foo {
            x: String,
            y: i32,
            z: Option<f64>,
        }

        let got: Foo = de(&[Some("hi"), Some("42"), Some("1.5")]).unwrap();
        assert_eq!(got, Foo { x: "hi".into(), y: 42, z: Some(1.5) });

        let got: Foo = de(&[Some("hi"), Some("42"), None]).unwrap();
        assert_eq!(got, Foo { x: "hi".into(), y: 42, z: None });
    }

    #[test]
    fn with_tuple() {
        let got: (bool, u8, char) =
            de(&[Some("TRUE"), Some("7"), Some("x")]).unwrap();
        assert_eq!(got, (true, 7, 'x'));
    }

    #[test]
    fn with_seq() {
        let got: Vec<Option<u32>> = de(&[Some("1"), None, Some("4")]).unwrap();
        assert_eq!(got, vec![Some(1), None, Some(4)]);
    }

    #[test]
    fn absent_and_empty_options() {
        let got: (Option<String>, Option<String>, Option<String>) =
            de(&[Some(""), None, Some("x")]).unwrap();
        assert_eq!(got, (Some(String::new()), None, Some("x".to_string())));

        // Only an absent field is `None`. An empty number is still text
        // that fails to parse.
        let err = de::<(Option<u32>,)>(&[Some("")]).unwrap_err();
        assert_eq!(err.field(), Some(0));
    }

    #[test]
    fn with_enum() {
        #[derive(Debug, Deserialize, PartialEq)]
        enum Color {
            Red,
            Green,
        }

        let got: (Color, Color) = de(&[Some("Green"), Some("Red")]).unwrap();
        assert_eq!(got, (Color::Green, Color::Red));
        assert!(de::<(Color,)>(&[Some("Blue")]).is_err());
    }

    #[test]
    fn untyped_values() {
        #[derive(Debug, Deserialize, PartialEq)]
        #[serde(untagged)]
        enum Value {
            Bool(bool),
            Int(i64),
            Float(f64),
            Text(String),
        }

        let got: Vec<Value> =
            de(&[Some("true"), Some("-5"), Some("2.5"), Some("abc")]).unwrap();
        assert_eq!(
            got,
            vec![
                Value::Bool(true),
                Value::Int(-5),
                Value::Float(2.5),
                Value::Text("abc".into()),
            ]
        );
    }

    #[test]
    fn end_of_row() {
        let err = de::<(i32, i32)>(&[Some("1")]).unwrap_err();
        assert_eq!(*err.kind(), DeserializeErrorKind::UnexpectedEndOfRow);
    }

    #[test]
    fn bad_int_names_field() {
        let err = de::<(i32, i32)>(&[Some("1"), Some("x")]).unwrap_err();
        assert_eq!(err.field(), Some(1));
        match *err.kind() {
            DeserializeErrorKind::ParseInt(_) => {}
            ref kind => panic!("unexpected error kind: {:?}", kind),
        }
    }

    #[test]
    fn maps_are_unsupported() {
        assert!(de::<HashMap<String, String>>(&[Some("a")]).is_err());
    }
}
