//! Deserialize JSON data to a Rust data structure

use core::ops::Deref;

use serde::de::{self, Visitor};

use crate::codec::{Codec, Options};
use crate::error::{Error, Result};
use crate::schema::SchemaCache;
use crate::str::unescape_into;

use self::enum_::{UnitVariantAccess, VariantAccess};
use self::map::{MapAccess, StructAccess};
use self::seq::SeqAccess;

mod enum_;
mod map;
mod seq;

/// A string read from the input: borrowed when it had no escapes, decoded
/// into the scratch buffer otherwise.
pub(crate) enum Reference<'b, 'c> {
    Borrowed(&'b str),
    Copied(&'c str),
}

impl Deref for Reference<'_, '_> {
    type Target = str;

    fn deref(&self) -> &str {
        match *self {
            Reference::Borrowed(s) | Reference::Copied(s) => s,
        }
    }
}

pub(crate) struct Deserializer<'de, 's> {
    input: &'de str,
    index: usize,
    scratch: String,
    options: Options,
    schemas: &'s SchemaCache,
    depth: usize,
}

impl<'de, 's> Deserializer<'de, 's> {
    pub(crate) fn new(input: &'de str, options: Options, schemas: &'s SchemaCache) -> Self {
        Deserializer {
            input,
            index: 0,
            scratch: String::new(),
            options,
            schemas,
            depth: 0,
        }
    }

    fn eat_char(&mut self) {
        self.index += 1;
    }

    pub(crate) fn end(&mut self) -> Result<()> {
        match self.parse_whitespace() {
            Some(_) => Err(Error::TrailingCharacters),
            None => Ok(()),
        }
    }

    fn enter(&mut self) -> Result<()> {
        if self.depth >= self.options.max_depth {
            return Err(Error::RecursionLimitExceeded);
        }
        self.depth += 1;
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    // Input holding nothing but whitespace reads as the absent value for
    // targets that have one.
    fn is_blank_document(&self) -> bool {
        self.depth == 0 && self.input.trim().is_empty()
    }

    // Called once the visitor of a sequence is done: the next token must
    // close the list.
    fn end_seq(&mut self) -> Result<()> {
        match self.parse_whitespace().ok_or(Error::EofWhileParsingList)? {
            b']' => {
                self.eat_char();
                Ok(())
            }
            b',' => {
                self.eat_char();
                match self.parse_whitespace() {
                    Some(b']') if self.options.is_lenient() => {
                        self.eat_char();
                        Ok(())
                    }
                    Some(b']') => Err(Error::TrailingComma),
                    // the target holds fewer elements than the input
                    Some(_) => Err(Error::InvalidType),
                    None => Err(Error::EofWhileParsingList),
                }
            }
            _ => Err(Error::ExpectedListCommaOrEnd),
        }
    }

    fn end_map(&mut self) -> Result<()> {
        match self
            .parse_whitespace()
            .ok_or(Error::EofWhileParsingObject)?
        {
            b'}' => {
                self.eat_char();
                Ok(())
            }
            b',' => {
                self.eat_char();
                match self.parse_whitespace() {
                    Some(b'}') if self.options.is_lenient() => {
                        self.eat_char();
                        Ok(())
                    }
                    Some(b'}') => Err(Error::TrailingComma),
                    Some(_) => Err(Error::ExpectedObjectCommaOrEnd),
                    None => Err(Error::EofWhileParsingObject),
                }
            }
            _ => Err(Error::ExpectedObjectCommaOrEnd),
        }
    }

    fn next_char(&mut self) -> Option<u8> {
        let ch = self.input.as_bytes().get(self.index);

        if ch.is_some() {
            self.index += 1;
        }

        ch.cloned()
    }

    fn parse_ident(&mut self, ident: &[u8]) -> Result<()> {
        for c in ident {
            if Some(*c) != self.next_char() {
                return Err(Error::ExpectedSomeIdent);
            }
        }

        Ok(())
    }

    fn parse_object_colon(&mut self) -> Result<()> {
        match self
            .parse_whitespace()
            .ok_or(Error::EofWhileParsingObject)?
        {
            b':' => {
                self.eat_char();
                Ok(())
            }
            _ => Err(Error::ExpectedColon),
        }
    }

    /// Reads the body of a string whose opening quote was already consumed,
    /// and the closing quote.
    fn parse_str<'c>(&'c mut self) -> Result<Reference<'de, 'c>> {
        let input = self.input;
        let bytes = input.as_bytes();
        let start = self.index;
        let mut escaped = false;

        loop {
            match bytes.get(self.index) {
                None => return Err(Error::EofWhileParsingString),
                Some(b'"') => break,
                Some(b'\\') => {
                    escaped = true;
                    self.index += 2;
                }
                Some(0x00..=0x1F) if !self.options.is_lenient() => {
                    return Err(Error::ControlCharacterInString)
                }
                Some(_) => self.eat_char(),
            }
        }

        let body = &input[start..self.index];
        self.eat_char();

        if !escaped {
            return Ok(Reference::Borrowed(body));
        }
        self.scratch.clear();
        unescape_into(body, &mut self.scratch)?;
        Ok(Reference::Copied(&self.scratch))
    }

    /// Reads the maximal run of `[-+0-9.eE]` at the cursor.
    fn parse_number(&mut self) -> Result<&'de str> {
        let peek = self
            .parse_whitespace()
            .ok_or(Error::EofWhileParsingValue)?;
        if !is_number_char(peek) {
            return Err(peek_error(peek));
        }

        let input = self.input;
        let start = self.index;
        while self.peek().is_some_and(is_number_char) {
            self.eat_char();
        }
        Ok(&input[start..self.index])
    }

    fn deserialize_number_any<V>(&mut self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        let text = self.parse_number()?;
        let integral = !text.bytes().any(|b| matches!(b, b'.' | b'e' | b'E'));

        if integral {
            if text.starts_with('-') {
                if let Ok(n) = text.parse::<i64>() {
                    return visitor.visit_i64(n);
                }
            } else if let Ok(n) = text.parse::<u64>() {
                return visitor.visit_u64(n);
            }
        }

        match text.parse::<f64>() {
            Ok(n) if n.is_finite() => visitor.visit_f64(n),
            _ => Err(Error::InvalidNumber),
        }
    }

    /// Consumes all the whitespace characters and returns a peek into the next character
    fn parse_whitespace(&mut self) -> Option<u8> {
        loop {
            match self.peek() {
                Some(b' ') | Some(b'\n') | Some(b'\t') | Some(b'\r') | Some(0x0B) | Some(0x0C) => {
                    self.eat_char();
                }
                Some(b) if b >= 0x80 => {
                    match self.input.get(self.index..).and_then(|rest| rest.chars().next()) {
                        Some(c) if c.is_whitespace() => self.index += c.len_utf8(),
                        _ => return Some(b),
                    }
                }
                other => {
                    return other;
                }
            }
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.as_bytes().get(self.index).cloned()
    }
}

fn is_number_char(c: u8) -> bool {
    matches!(c, b'-' | b'+' | b'.' | b'e' | b'E' | b'0'..=b'9')
}

// A token that starts some JSON value, just not the one the target wants, is
// a type mismatch; anything else is malformed text.
fn peek_error(c: u8) -> Error {
    match c {
        b'"' | b'[' | b'{' | b't' | b'f' | b'n' | b'-' | b'0'..=b'9' => Error::InvalidType,
        _ => Error::ExpectedSomeValue,
    }
}

macro_rules! deserialize_parsed {
    ($self:ident, $visitor:ident, $ty:ty, $visit:ident) => {{
        let text = $self.parse_number()?;
        let number: $ty = text.parse().map_err(|_| Error::InvalidNumber)?;
        $visitor.$visit(number)
    }};
}

macro_rules! deserialize_float {
    ($self:ident, $visitor:ident, $ty:ty, $visit:ident) => {{
        let text = $self.parse_number()?;
        match text.parse::<$ty>() {
            Ok(number) if number.is_finite() => $visitor.$visit(number),
            _ => Err(Error::InvalidNumber),
        }
    }};
}

impl<'a, 'de, 's> de::Deserializer<'de> for &'a mut Deserializer<'de, 's> {
    type Error = Error;

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        let peek = match self.parse_whitespace() {
            Some(peek) => peek,
            None if self.is_blank_document() => return visitor.visit_unit(),
            None => return Err(Error::EofWhileParsingValue),
        };

        match peek {
            b'n' => {
                self.eat_char();
                self.parse_ident(b"ull")?;
                visitor.visit_unit()
            }
            b't' => {
                self.eat_char();
                self.parse_ident(b"rue")?;
                visitor.visit_bool(true)
            }
            b'f' => {
                self.eat_char();
                self.parse_ident(b"alse")?;
                visitor.visit_bool(false)
            }
            b'"' => {
                self.eat_char();
                match self.parse_str()? {
                    Reference::Borrowed(s) => visitor.visit_borrowed_str(s),
                    Reference::Copied(s) => visitor.visit_str(s),
                }
            }
            b'-' | b'0'..=b'9' => self.deserialize_number_any(visitor),
            b'[' => self.deserialize_seq(visitor),
            b'{' => self.deserialize_map(visitor),
            _ => Err(Error::ExpectedSomeValue),
        }
    }

    fn deserialize_bool<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        let peek = self.parse_whitespace().ok_or(Error::EofWhileParsingValue)?;

        match peek {
            b't' => {
                self.eat_char();
                self.parse_ident(b"rue")?;
                visitor.visit_bool(true)
            }
            b'f' => {
                self.eat_char();
                self.parse_ident(b"alse")?;
                visitor.visit_bool(false)
            }
            c => Err(peek_error(c)),
        }
    }

    fn deserialize_i8<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        deserialize_parsed!(self, visitor, i8, visit_i8)
    }

    fn deserialize_i16<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        deserialize_parsed!(self, visitor, i16, visit_i16)
    }

    fn deserialize_i32<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        deserialize_parsed!(self, visitor, i32, visit_i32)
    }

    fn deserialize_i64<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        deserialize_parsed!(self, visitor, i64, visit_i64)
    }

    fn deserialize_i128<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        deserialize_parsed!(self, visitor, i128, visit_i128)
    }

    fn deserialize_u8<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        deserialize_parsed!(self, visitor, u8, visit_u8)
    }

    fn deserialize_u16<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        deserialize_parsed!(self, visitor, u16, visit_u16)
    }

    fn deserialize_u32<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        deserialize_parsed!(self, visitor, u32, visit_u32)
    }

    fn deserialize_u64<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        deserialize_parsed!(self, visitor, u64, visit_u64)
    }

    fn deserialize_u128<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        deserialize_parsed!(self, visitor, u128, visit_u128)
    }

    fn deserialize_f32<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        deserialize_float!(self, visitor, f32, visit_f32)
    }

    fn deserialize_f64<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        deserialize_float!(self, visitor, f64, visit_f64)
    }

    fn deserialize_char<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        let peek = self.parse_whitespace().ok_or(Error::EofWhileParsingValue)?;

        match peek {
            b'"' => {
                self.eat_char();
                let s = self.parse_str()?;
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => visitor.visit_char(c),
                    _ => Err(Error::InvalidType),
                }
            }
            c => Err(peek_error(c)),
        }
    }

    fn deserialize_str<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        let peek = self.parse_whitespace().ok_or(Error::EofWhileParsingValue)?;

        match peek {
            b'"' => {
                self.eat_char();
                match self.parse_str()? {
                    Reference::Borrowed(s) => visitor.visit_borrowed_str(s),
                    Reference::Copied(s) => visitor.visit_str(s),
                }
            }
            c => Err(peek_error(c)),
        }
    }

    fn deserialize_string<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        self.deserialize_str(visitor)
    }

    fn deserialize_bytes<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        self.deserialize_seq(visitor)
    }

    fn deserialize_byte_buf<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        self.deserialize_seq(visitor)
    }

    fn deserialize_option<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        match self.parse_whitespace() {
            Some(b'n') => {
                self.eat_char();
                self.parse_ident(b"ull")?;
                visitor.visit_none()
            }
            Some(_) => visitor.visit_some(self),
            None if self.is_blank_document() => visitor.visit_none(),
            None => Err(Error::EofWhileParsingValue),
        }
    }

    fn deserialize_unit<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        match self.parse_whitespace() {
            Some(b'n') => {
                self.eat_char();
                self.parse_ident(b"ull")?;
                visitor.visit_unit()
            }
            Some(c) => Err(peek_error(c)),
            None if self.is_blank_document() => visitor.visit_unit(),
            None => Err(Error::EofWhileParsingValue),
        }
    }

    fn deserialize_unit_struct<V>(self, _name: &'static str, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        self.deserialize_unit(visitor)
    }

    fn deserialize_newtype_struct<V>(self, _name: &'static str, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        self.enter()?;
        let ret = visitor.visit_newtype_struct(&mut *self)?;
        self.leave();

        Ok(ret)
    }

    fn deserialize_seq<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        match self.parse_whitespace().ok_or(Error::EofWhileParsingValue)? {
            b'[' => {
                self.enter()?;
                self.eat_char();
                let ret = visitor.visit_seq(SeqAccess::new(self))?;

                self.end_seq()?;
                self.leave();

                Ok(ret)
            }
            c => Err(peek_error(c)),
        }
    }

    fn deserialize_tuple<V>(self, _len: usize, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        match self.parse_whitespace().ok_or(Error::EofWhileParsingValue)? {
            b'{' => {
                self.enter()?;
                self.eat_char();
                let ret = visitor.visit_map(MapAccess::new(self))?;

                self.end_map()?;
                self.leave();

                Ok(ret)
            }
            c => Err(peek_error(c)),
        }
    }

    fn deserialize_struct<V>(
        self,
        name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        match self.parse_whitespace().ok_or(Error::EofWhileParsingValue)? {
            b'{' => {
                let schema = self.schemas.resolve(name, fields);
                self.enter()?;
                self.eat_char();
                let ret = visitor.visit_map(StructAccess::new(self, schema))?;

                self.end_map()?;
                self.leave();

                Ok(ret)
            }
            b'[' => self.deserialize_seq(visitor),
            c => Err(peek_error(c)),
        }
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
        match self.parse_whitespace().ok_or(Error::EofWhileParsingValue)? {
            b'"' => visitor.visit_enum(UnitVariantAccess::new(self)),
            b'{' => {
                self.enter()?;
                self.eat_char();
                let ret = visitor.visit_enum(VariantAccess::new(self))?;
                self.end_map()?;
                self.leave();

                Ok(ret)
            }
            c => Err(peek_error(c)),
        }
    }

    fn deserialize_identifier<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        self.deserialize_str(visitor)
    }

    fn deserialize_ignored_any<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        self.deserialize_any(visitor)
    }
}

/// Deserializes an instance of type `T` from bytes of JSON text
pub fn from_slice<'a, T>(v: &'a [u8]) -> Result<T>
where
    T: de::Deserialize<'a>,
{
    Codec::global().from_slice(v)
}

/// Deserializes an instance of type T from a string of JSON text
pub fn from_str<'a, T>(s: &'a str) -> Result<T>
where
    T: de::Deserialize<'a>,
{
    Codec::global().from_str(s)
}
