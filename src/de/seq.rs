use serde::de;

use crate::de::Deserializer;
use crate::error::{Error, Result};

pub(crate) struct SeqAccess<'a, 'de, 's> {
    first: bool,
    de: &'a mut Deserializer<'de, 's>,
}

impl<'a, 'de, 's> SeqAccess<'a, 'de, 's> {
    pub(crate) fn new(de: &'a mut Deserializer<'de, 's>) -> Self {
        SeqAccess { de, first: true }
    }
}

impl<'a, 'de, 's> de::SeqAccess<'de> for SeqAccess<'a, 'de, 's> {
    type Error = Error;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>>
    where
        T: de::DeserializeSeed<'de>,
    {
        let peek = match self
            .de
            .parse_whitespace()
            .ok_or(Error::EofWhileParsingList)?
        {
            b']' => return Ok(None),
            b',' if !self.first => {
                self.de.eat_char();
                self.de
                    .parse_whitespace()
                    .ok_or(Error::EofWhileParsingList)?
            }
            c => {
                if self.first {
                    self.first = false;
                    c
                } else {
                    return Err(Error::ExpectedListCommaOrEnd);
                }
            }
        };

        if peek != b']' {
            Ok(Some(seed.deserialize(&mut *self.de)?))
        } else if self.de.options.is_lenient() {
            Ok(None)
        } else {
            Err(Error::TrailingComma)
        }
    }
}
