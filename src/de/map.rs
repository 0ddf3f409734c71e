use std::sync::Arc;

use log::debug;
use serde::de::value::{BorrowedStrDeserializer, StrDeserializer};
use serde::de::{self, IgnoredAny, Visitor};

use crate::de::{Deserializer, Reference};
use crate::error::{Error, Result};
use crate::schema::{Member, Schema};

/// Moves past the separator in front of the next entry and peeks at the
/// entry's first byte. `None` means the object is closed.
fn next_entry(de: &mut Deserializer<'_, '_>, first: &mut bool) -> Result<Option<u8>> {
    let peek = match de.parse_whitespace().ok_or(Error::EofWhileParsingObject)? {
        b'}' => return Ok(None),
        b',' if !*first => {
            de.eat_char();
            de.parse_whitespace().ok_or(Error::EofWhileParsingObject)?
        }
        c => {
            if *first {
                *first = false;
                c
            } else {
                return Err(Error::ExpectedObjectCommaOrEnd);
            }
        }
    };

    match peek {
        b'"' => Ok(Some(peek)),
        b'}' if de.options.is_lenient() => Ok(None),
        b'}' => Err(Error::TrailingComma),
        _ => Err(Error::ExpectedString),
    }
}

pub(crate) struct MapAccess<'a, 'de, 's> {
    de: &'a mut Deserializer<'de, 's>,
    first: bool,
}

impl<'a, 'de, 's> MapAccess<'a, 'de, 's> {
    pub(crate) fn new(de: &'a mut Deserializer<'de, 's>) -> Self {
        MapAccess { de, first: true }
    }
}

impl<'a, 'de, 's> de::MapAccess<'de> for MapAccess<'a, 'de, 's> {
    type Error = Error;

    fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>>
    where
        K: de::DeserializeSeed<'de>,
    {
        match next_entry(self.de, &mut self.first)? {
            Some(_) => seed.deserialize(MapKey { de: &mut *self.de }).map(Some),
            None => Ok(None),
        }
    }

    fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value>
    where
        V: de::DeserializeSeed<'de>,
    {
        self.de.parse_object_colon()?;

        seed.deserialize(&mut *self.de)
    }
}

/// Walks the members of a record. Keys are matched against the record's
/// schema; members the schema does not know are skipped or rejected
/// depending on the policy.
pub(crate) struct StructAccess<'a, 'de, 's> {
    de: &'a mut Deserializer<'de, 's>,
    schema: Arc<Schema>,
    first: bool,
}

impl<'a, 'de, 's> StructAccess<'a, 'de, 's> {
    pub(crate) fn new(de: &'a mut Deserializer<'de, 's>, schema: Arc<Schema>) -> Self {
        StructAccess {
            de,
            schema,
            first: true,
        }
    }
}

impl<'a, 'de, 's> de::MapAccess<'de> for StructAccess<'a, 'de, 's> {
    type Error = Error;

    fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>>
    where
        K: de::DeserializeSeed<'de>,
    {
        let lenient = self.de.options.is_lenient();

        loop {
            if next_entry(self.de, &mut self.first)?.is_none() {
                return Ok(None);
            }
            self.de.eat_char();

            let known = {
                let key = self.de.parse_str()?;
                let known = self.schema.member(&key).map(Member::name);
                if known.is_none() {
                    if !lenient {
                        return Err(Error::UnknownField(String::from(&*key)));
                    }
                    debug!(
                        "skipping unknown member `{}` of `{}`",
                        &*key,
                        self.schema.name()
                    );
                }
                known
            };

            match known {
                Some(name) => {
                    return seed
                        .deserialize(BorrowedStrDeserializer::<Error>::new(name))
                        .map(Some)
                }
                None => {
                    self.de.parse_object_colon()?;
                    <IgnoredAny as de::Deserialize>::deserialize(&mut *self.de)?;
                }
            }
        }
    }

    fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value>
    where
        V: de::DeserializeSeed<'de>,
    {
        self.de.parse_object_colon()?;

        seed.deserialize(&mut *self.de)
    }
}

/// Reads an object key. Keys are always strings; numeric targets are parsed
/// from the key's text.
struct MapKey<'a, 'de, 's> {
    de: &'a mut Deserializer<'de, 's>,
}

macro_rules! deserialize_numeric_key {
    ($method:ident, $ty:ty, $visit:ident) => {
        fn $method<V>(self, visitor: V) -> Result<V::Value>
        where
            V: Visitor<'de>,
        {
            self.de.eat_char();
            let number: $ty = self
                .de
                .parse_str()?
                .parse()
                .map_err(|_| Error::InvalidNumber)?;
            visitor.$visit(number)
        }
    };
}

impl<'a, 'de, 's> de::Deserializer<'de> for MapKey<'a, 'de, 's> {
    type Error = Error;

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        self.de.eat_char();
        match self.de.parse_str()? {
            Reference::Borrowed(s) => visitor.visit_borrowed_str(s),
            Reference::Copied(s) => visitor.visit_str(s),
        }
    }

    deserialize_numeric_key!(deserialize_i8, i8, visit_i8);
    deserialize_numeric_key!(deserialize_i16, i16, visit_i16);
    deserialize_numeric_key!(deserialize_i32, i32, visit_i32);
    deserialize_numeric_key!(deserialize_i64, i64, visit_i64);
    deserialize_numeric_key!(deserialize_i128, i128, visit_i128);
    deserialize_numeric_key!(deserialize_u8, u8, visit_u8);
    deserialize_numeric_key!(deserialize_u16, u16, visit_u16);
    deserialize_numeric_key!(deserialize_u32, u32, visit_u32);
    deserialize_numeric_key!(deserialize_u64, u64, visit_u64);
    deserialize_numeric_key!(deserialize_u128, u128, visit_u128);
    deserialize_numeric_key!(deserialize_f32, f32, visit_f32);
    deserialize_numeric_key!(deserialize_f64, f64, visit_f64);

    fn deserialize_option<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        visitor.visit_some(self)
    }

    fn deserialize_newtype_struct<V>(self, _name: &'static str, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        self.de.eat_char();
        match self.de.parse_str()? {
            Reference::Borrowed(s) => visitor.visit_enum(BorrowedStrDeserializer::<Error>::new(s)),
            Reference::Copied(s) => visitor.visit_enum(StrDeserializer::<Error>::new(s)),
        }
    }

    serde::forward_to_deserialize_any! {
        bool char str string bytes byte_buf unit unit_struct seq tuple
        tuple_struct map struct identifier ignored_any
    }
}
