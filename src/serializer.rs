use std::error::Error as StdError;
use std::fmt;

use serde::ser::{
    Error as SerdeError, Impossible, Serialize, SerializeSeq,
    SerializeStruct, SerializeTuple, SerializeTupleStruct, Serializer,
};

use crate::record::Record;

/// Serialize the given value into `out`, one field per scalar.
pub fn serialize_record<S: ?Sized + Serialize>(
    value: &S,
    out: &mut Record,
) -> Result<(), SerializeError> {
    let mut ser = SeRecord { out, depth: 0 };
    value.serialize(&mut ser)
}

/// An error that occurs when serializing a value with serde.
///
/// The `Serde` codec reports this error, wrapped in `Error::Conversion`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SerializeError(String);

impl SerdeError for SerializeError {
    fn custom<T: fmt::Display>(msg: T) -> SerializeError {
        SerializeError(msg.to_string())
    }
}

impl fmt::Display for SerializeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl StdError for SerializeError {}

struct SeRecord<'w> {
    out: &'w mut Record,
    /// How many containers deep the current value is. Only the outermost
    /// container may hold more than one field.
    depth: usize,
}

impl<'w> SeRecord<'w> {
    fn field<T: AsRef<[u8]>>(&mut self, field: T) -> Result<(), SerializeError> {
        self.out.push_field(field);
        Ok(())
    }

    fn nested(&self, what: &str) -> Result<(), SerializeError> {
        if self.depth > 0 {
            return Err(SerializeError::custom(format!(
                "cannot serialize nested {} as a CSV field",
                what
            )));
        }
        Ok(())
    }
}

impl<'a, 'w> Serializer for &'a mut SeRecord<'w> {
    type Ok = ();
    type Error = SerializeError;
    type SerializeSeq = Self;
    type SerializeTuple = Self;
    type SerializeTupleStruct = Self;
    type SerializeTupleVariant = Impossible<(), SerializeError>;
    type SerializeMap = Impossible<(), SerializeError>;
    type SerializeStruct = Self;
    type SerializeStructVariant = Impossible<(), SerializeError>;

    fn serialize_bool(self, v: bool) -> Result<Self::Ok, Self::Error> {
        if v {
            self.field("true")
        } else {
            self.field("false")
        }
    }

    fn serialize_i8(self, v: i8) -> Result<Self::Ok, Self::Error> {
        let mut buffer = itoa::Buffer::new();
        self.field(buffer.format(v))
    }

    fn serialize_i16(self, v: i16) -> Result<Self::Ok, Self::Error> {
        let mut buffer = itoa::Buffer::new();
        self.field(buffer.format(v))
    }

    fn serialize_i32(self, v: i32) -> Result<Self::Ok, Self::Error> {
        let mut buffer = itoa::Buffer::new();
        self.field(buffer.format(v))
    }

    fn serialize_i64(self, v: i64) -> Result<Self::Ok, Self::Error> {
        let mut buffer = itoa::Buffer::new();
        self.field(buffer.format(v))
    }

    fn serialize_u8(self, v: u8) -> Result<Self::Ok, Self::Error> {
        let mut buffer = itoa::Buffer::new();
        self.field(buffer.format(v))
    }

    fn serialize_u16(self, v: u16) -> Result<Self::Ok, Self::Error> {
        let mut buffer = itoa::Buffer::new();
        self.field(buffer.format(v))
    }

    fn serialize_u32(self, v: u32) -> Result<Self::Ok, Self::Error> {
        let mut buffer = itoa::Buffer::new();
        self.field(buffer.format(v))
    }

    fn serialize_u64(self, v: u64) -> Result<Self::Ok, Self::Error> {
        let mut buffer = itoa::Buffer::new();
        self.field(buffer.format(v))
    }

    fn serialize_f32(self, v: f32) -> Result<Self::Ok, Self::Error> {
        let mut buffer = ryu::Buffer::new();
        self.field(buffer.format(v))
    }

    fn serialize_f64(self, v: f64) -> Result<Self::Ok, Self::Error> {
        let mut buffer = ryu::Buffer::new();
        self.field(buffer.format(v))
    }

    fn serialize_char(self, v: char) -> Result<Self::Ok, Self::Error> {
        let mut buf = [0; 4];
        self.field(v.encode_utf8(&mut buf))
    }

    fn serialize_str(self, value: &str) -> Result<Self::Ok, Self::Error> {
        self.field(value)
    }

    fn serialize_bytes(self, value: &[u8]) -> Result<Self::Ok, Self::Error> {
        self.field(value)
    }

    fn serialize_none(self) -> Result<Self::Ok, Self::Error> {
        self.out.push_absent();
        Ok(())
    }

    fn serialize_some<T: ?Sized + Serialize>(
        self,
        value: &T,
    ) -> Result<Self::Ok, Self::Error> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Self::Ok, Self::Error> {
        self.serialize_none()
    }

    fn serialize_unit_struct(
        self,
        name: &'static str,
    ) -> Result<Self::Ok, Self::Error> {
        self.field(name)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<Self::Ok, Self::Error> {
        self.field(variant)
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<Self::Ok, Self::Error> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<Self::Ok, Self::Error> {
        Err(SerializeError::custom("cannot serialize enum newtype variants"))
    }

    fn serialize_seq(
        self,
        _len: Option<usize>,
    ) -> Result<Self::SerializeSeq, Self::Error> {
        self.nested("sequence")?;
        self.depth += 1;
        Ok(self)
    }

    fn serialize_tuple(
        self,
        _len: usize,
    ) -> Result<Self::SerializeTuple, Self::Error> {
        self.nested("tuple")?;
        self.depth += 1;
        Ok(self)
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct, Self::Error> {
        self.nested("tuple struct")?;
        self.depth += 1;
        Ok(self)
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant, Self::Error> {
        Err(SerializeError::custom("cannot serialize enum tuple variants"))
    }

    fn serialize_map(
        self,
        _len: Option<usize>,
    ) -> Result<Self::SerializeMap, Self::Error> {
        Err(SerializeError::custom("cannot serialize maps"))
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStruct, Self::Error> {
        self.nested("struct")?;
        self.depth += 1;
        Ok(self)
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant, Self::Error> {
        Err(SerializeError::custom("cannot serialize enum struct variants"))
    }
}

impl<'a, 'w> SerializeSeq for &'a mut SeRecord<'w> {
    type Ok = ();
    type Error = SerializeError;

    fn serialize_element<T: ?Sized + Serialize>(
        &mut self,
        value: &T,
    ) -> Result<(), Self::Error> {
        value.serialize(&mut **self)
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        self.depth -= 1;
        Ok(())
    }
}

impl<'a, 'w> SerializeTuple for &'a mut SeRecord<'w> {
    type Ok = ();
    type Error = SerializeError;

    fn serialize_element<T: ?Sized + Serialize>(
        &mut self,
        value: &T,
    ) -> Result<(), Self::Error> {
        value.serialize(&mut **self)
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        self.depth -= 1;
        Ok(())
    }
}

impl<'a, 'w> SerializeTupleStruct for &'a mut SeRecord<'w> {
    type Ok = ();
    type Error = SerializeError;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        value: &T,
    ) -> Result<(), Self::Error> {
        value.serialize(&mut **self)
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        self.depth -= 1;
        Ok(())
    }
}

impl<'a, 'w> SerializeStruct for &'a mut SeRecord<'w> {
    type Ok = ();
    type Error = SerializeError;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        _key: &'static str,
        value: &T,
    ) -> Result<(), Self::Error> {
        value.serialize(&mut **self)
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        self.depth -= 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde::Serialize;

    use super::{serialize_record, SerializeError};
    use crate::record::Record;

    fn ser<S: Serialize>(value: S) -> Result<Record, SerializeError> {
        let mut rec = Record::new();
        serialize_record(&value, &mut rec)?;
        Ok(rec)
    }

    #[test]
    fn scalars() {
        let rec = ser((1u8, -2i64, 1.5f64, true, 'x', "hi")).unwrap();
        let got: Vec<&[u8]> = rec.iter().collect();
        assert_eq!(
            got,
            vec![&b"1"[..], b"-2", b"1.5", b"true", b"x", b"hi"]
        );
    }

    #[test]
    fn struct_with_options() {
        #[derive(Serialize)]
        struct Row {
            name: &'static str,
            note: Option<&'static str>,
            count: Option<u32>,
        }

        let rec = ser(Row { name: "a", note: Some(""), count: None }).unwrap();
        assert_eq!(rec.len(), 3);
        assert!(!rec.is_absent(1));
        assert_eq!(rec.get(1), Some(&b""[..]));
        assert!(rec.is_absent(2));
    }

    #[test]
    fn unit_variants() {
        #[derive(Serialize)]
        enum Color {
            Red,
        }

        let rec = ser(vec![Color::Red]).unwrap();
        assert_eq!(rec.get(0), Some(&b"Red"[..]));
    }

    #[test]
    fn data_variants_fail() {
        #[derive(Serialize)]
        enum Shape {
            Circle(f64),
            Rect(f64, f64),
        }

        assert!(ser(Shape::Circle(1.0)).is_err());
        assert!(ser((Shape::Rect(1.0, 2.0),)).is_err());
    }

    #[test]
    fn nested_containers_fail() {
        assert!(ser(vec![vec![1]]).is_err());
        assert!(ser(((1, 2), 3)).is_err());
    }

    #[test]
    fn maps_fail() {
        let mut map = std::collections::BTreeMap::new();
        map.insert("a", 1);
        assert!(ser(map).is_err());
    }
}
