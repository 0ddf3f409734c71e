use serde::de;

use crate::de::Deserializer;
use crate::error::{Error, Result};

/// A variant written as a bare string: `"Variant"`.
pub(crate) struct UnitVariantAccess<'a, 'de, 's> {
    de: &'a mut Deserializer<'de, 's>,
}

impl<'a, 'de, 's> UnitVariantAccess<'a, 'de, 's> {
    pub(crate) fn new(de: &'a mut Deserializer<'de, 's>) -> Self {
        UnitVariantAccess { de }
    }
}

impl<'a, 'de, 's> de::EnumAccess<'de> for UnitVariantAccess<'a, 'de, 's> {
    type Error = Error;
    type Variant = Self;

    fn variant_seed<V>(self, seed: V) -> Result<(V::Value, Self)>
    where
        V: de::DeserializeSeed<'de>,
    {
        let variant = seed.deserialize(&mut *self.de)?;
        Ok((variant, self))
    }
}

impl<'a, 'de, 's> de::VariantAccess<'de> for UnitVariantAccess<'a, 'de, 's> {
    type Error = Error;

    fn unit_variant(self) -> Result<()> {
        Ok(())
    }

    fn newtype_variant_seed<T>(self, _seed: T) -> Result<T::Value>
    where
        T: de::DeserializeSeed<'de>,
    {
        Err(Error::InvalidType)
    }

    fn tuple_variant<V>(self, _len: usize, _visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        Err(Error::InvalidType)
    }

    fn struct_variant<V>(self, _fields: &'static [&'static str], _visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        Err(Error::InvalidType)
    }
}

/// A variant with a payload: `{"Variant": payload}`. The opening brace has
/// been consumed; the caller consumes the closing one.
pub(crate) struct VariantAccess<'a, 'de, 's> {
    de: &'a mut Deserializer<'de, 's>,
}

impl<'a, 'de, 's> VariantAccess<'a, 'de, 's> {
    pub(crate) fn new(de: &'a mut Deserializer<'de, 's>) -> Self {
        VariantAccess { de }
    }
}

impl<'a, 'de, 's> de::EnumAccess<'de> for VariantAccess<'a, 'de, 's> {
    type Error = Error;
    type Variant = Self;

    fn variant_seed<V>(self, seed: V) -> Result<(V::Value, Self)>
    where
        V: de::DeserializeSeed<'de>,
    {
        let val = seed.deserialize(&mut *self.de)?;
        self.de.parse_object_colon()?;
        Ok((val, self))
    }
}

impl<'a, 'de, 's> de::VariantAccess<'de> for VariantAccess<'a, 'de, 's> {
    type Error = Error;

    fn unit_variant(self) -> Result<()> {
        de::Deserialize::deserialize(self.de)
    }

    fn newtype_variant_seed<T>(self, seed: T) -> Result<T::Value>
    where
        T: de::DeserializeSeed<'de>,
    {
        seed.deserialize(self.de)
    }

    fn tuple_variant<V>(self, _len: usize, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        de::Deserializer::deserialize_seq(self.de, visitor)
    }

    fn struct_variant<V>(self, fields: &'static [&'static str], visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        de::Deserializer::deserialize_struct(self.de, "", fields, visitor)
    }
}
