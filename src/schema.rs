//! The type schema cache
//!
//! A record type's members are discovered once, from the member table its
//! `Deserialize` implementation declares, and shared afterwards. The parser
//! consults the cache to tell declared members from unknown ones.
//!
//! That table lists every name a record accepts, so a member with
//! `#[serde(alias = ...)]` shows up once per name. [`Schema::of_value`]
//! reads the members a value actually writes instead, one per data member.

use core::any::TypeId;
use core::fmt;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use log::trace;
use serde::de::{self, DeserializeOwned, Visitor};
use serde::ser::{self, Impossible, Serialize};

/// One data-carrying member of a record type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Member {
    name: &'static str,
    position: usize,
}

impl Member {
    /// The member's name as it appears in JSON.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Zero-based position in the schema's member list.
    pub fn position(&self) -> usize {
        self.position
    }
}

/// The ordered members of one record type.
///
/// A schema discovered from a `Deserialize` table (see
/// [`SchemaCache::fields_of`]) holds the names the record accepts, aliases
/// included. One built with [`Schema::of_value`] holds its data members.
#[derive(Debug)]
pub struct Schema {
    name: &'static str,
    members: Vec<Member>,
    by_name: HashMap<&'static str, usize>,
}

impl Schema {
    fn discover<I>(name: &'static str, fields: I) -> Schema
    where
        I: IntoIterator<Item = &'static str>,
    {
        let members: Vec<Member> = fields
            .into_iter()
            .enumerate()
            .map(|(position, name)| Member { name, position })
            .collect();
        let by_name = members.iter().map(|m| (m.name, m.position)).collect();

        Schema {
            name,
            members,
            by_name,
        }
    }

    /// The data members of the record `value` serializes as, in the order
    /// it writes them, or `None` if it does not serialize as a record.
    ///
    /// Aliases are not members and are left out. Members skipped with
    /// `skip_serializing_if` still count. Members marked `skip` or
    /// `skip_serializing` do not.
    ///
    /// ```
    /// use serde_derive::Serialize;
    ///
    /// #[derive(Serialize)]
    /// struct Reading {
    ///     #[serde(alias = "temp")]
    ///     celsius: f32,
    ///     sensor: u16,
    /// }
    ///
    /// let schema = jsongeek::Schema::of_value(&Reading { celsius: 21.5, sensor: 3 }).unwrap();
    /// let names: Vec<_> = schema.members().iter().map(|m| m.name()).collect();
    /// assert_eq!(names, ["celsius", "sensor"]);
    /// ```
    pub fn of_value<T>(value: &T) -> Option<Schema>
    where
        T: Serialize + ?Sized,
    {
        let (name, fields) = value.serialize(MemberCapture).ok()?;
        Some(Schema::discover(name, fields))
    }

    /// The record's type name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Members in the order they were discovered.
    ///
    /// For a schema read from a `Deserialize` table this is table order,
    /// with each alias listed as an entry of its own next to its member.
    pub fn members(&self) -> &[Member] {
        &self.members
    }

    /// Look a member up by its JSON name.
    pub fn member(&self, name: &str) -> Option<&Member> {
        self.by_name.get(name).map(|&position| &self.members[position])
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the record declares no members.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

// The member table is a `'static` slice emitted once per record type, so its
// address identifies the type without hashing every name on each lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct ShapeKey {
    name: &'static str,
    fields: usize,
    len: usize,
}

impl ShapeKey {
    fn new(name: &'static str, fields: &'static [&'static str]) -> Self {
        ShapeKey {
            name,
            fields: fields.as_ptr() as usize,
            len: fields.len(),
        }
    }
}

/// Maps record types to their [`Schema`].
///
/// Entries are created on first use and never replaced. Concurrent callers
/// racing on a new type may both compute it; the first one published wins
/// and everybody receives that entry.
#[derive(Default)]
pub struct SchemaCache {
    by_shape: RwLock<HashMap<ShapeKey, Arc<Schema>>>,
    by_type: RwLock<HashMap<TypeId, Arc<Schema>>>,
}

impl SchemaCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// The member names record type `T` accepts, or `None` if `T` does not
    /// deserialize from a JSON object with declared members.
    ///
    /// Names come from `T`'s `Deserialize` table, which lists aliases
    /// alongside member names. Use [`Schema::of_value`] for data members
    /// only.
    pub fn fields_of<T>(&self) -> Option<Arc<Schema>>
    where
        T: DeserializeOwned + 'static,
    {
        let id = TypeId::of::<T>();
        if let Some(schema) = self
            .by_type
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
        {
            return Some(schema.clone());
        }

        let (name, fields) = match T::deserialize(Probe) {
            Err(ProbeOutcome::Record { name, fields }) => (name, fields),
            _ => return None,
        };
        let schema = self.resolve(name, fields);

        let mut by_type = self.by_type.write().unwrap_or_else(PoisonError::into_inner);
        Some(by_type.entry(id).or_insert(schema).clone())
    }

    /// The schema for the record described by `name` and `fields`.
    pub(crate) fn resolve(&self, name: &'static str, fields: &'static [&'static str]) -> Arc<Schema> {
        let key = ShapeKey::new(name, fields);
        if let Some(schema) = self
            .by_shape
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return schema.clone();
        }

        trace!("discovering schema of `{}` ({} members)", name, fields.len());
        let schema = Arc::new(Schema::discover(name, fields.iter().copied()));

        let mut by_shape = self.by_shape.write().unwrap_or_else(PoisonError::into_inner);
        by_shape.entry(key).or_insert(schema).clone()
    }

    /// Number of record types discovered so far.
    pub fn len(&self) -> usize {
        self.by_shape
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether nothing has been discovered yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for SchemaCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaCache").field("len", &self.len()).finish()
    }
}

/// Why a probe stopped. It always stops; that is how it reports.
#[derive(Debug)]
enum ProbeOutcome {
    Record {
        name: &'static str,
        fields: &'static [&'static str],
    },
    NotARecord,
}

impl fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeOutcome::Record { name, .. } => write!(f, "record `{}`", name),
            ProbeOutcome::NotARecord => f.write_str("not a record"),
        }
    }
}

impl std::error::Error for ProbeOutcome {}

impl de::Error for ProbeOutcome {
    fn custom<T>(_msg: T) -> Self
    where
        T: fmt::Display,
    {
        ProbeOutcome::NotARecord
    }
}

/// A deserializer that reads no input and only captures the member table a
/// type asks for.
struct Probe;

impl<'de> de::Deserializer<'de> for Probe {
    type Error = ProbeOutcome;

    fn deserialize_any<V>(self, _visitor: V) -> Result<V::Value, ProbeOutcome>
    where
        V: Visitor<'de>,
    {
        Err(ProbeOutcome::NotARecord)
    }

    fn deserialize_struct<V>(
        self,
        name: &'static str,
        fields: &'static [&'static str],
        _visitor: V,
    ) -> Result<V::Value, ProbeOutcome>
    where
        V: Visitor<'de>,
    {
        Err(ProbeOutcome::Record { name, fields })
    }

    serde::forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf option unit unit_struct newtype_struct seq tuple
        tuple_struct map enum identifier ignored_any
    }
}

impl ser::Error for ProbeOutcome {
    fn custom<T>(_msg: T) -> Self
    where
        T: fmt::Display,
    {
        ProbeOutcome::NotARecord
    }
}

type Captured = (&'static str, Vec<&'static str>);

macro_rules! not_a_record {
    ($($method:ident($($arg:ty),*) -> $ret:ty;)*) => {
        $(
            fn $method(self, $(_: $arg),*) -> Result<$ret, ProbeOutcome> {
                Err(ProbeOutcome::NotARecord)
            }
        )*
    };
}

/// A serializer that writes nothing and only records the member names a
/// record hands to `serialize_field`.
struct MemberCapture;

impl ser::Serializer for MemberCapture {
    type Ok = Captured;
    type Error = ProbeOutcome;
    type SerializeSeq = Impossible<Captured, ProbeOutcome>;
    type SerializeTuple = Impossible<Captured, ProbeOutcome>;
    type SerializeTupleStruct = Impossible<Captured, ProbeOutcome>;
    type SerializeTupleVariant = Impossible<Captured, ProbeOutcome>;
    type SerializeMap = Impossible<Captured, ProbeOutcome>;
    type SerializeStruct = FieldCapture;
    type SerializeStructVariant = Impossible<Captured, ProbeOutcome>;

    not_a_record! {
        serialize_bool(bool) -> Captured;
        serialize_i8(i8) -> Captured;
        serialize_i16(i16) -> Captured;
        serialize_i32(i32) -> Captured;
        serialize_i64(i64) -> Captured;
        serialize_u8(u8) -> Captured;
        serialize_u16(u16) -> Captured;
        serialize_u32(u32) -> Captured;
        serialize_u64(u64) -> Captured;
        serialize_f32(f32) -> Captured;
        serialize_f64(f64) -> Captured;
        serialize_char(char) -> Captured;
        serialize_str(&str) -> Captured;
        serialize_bytes(&[u8]) -> Captured;
        serialize_none() -> Captured;
        serialize_unit() -> Captured;
        serialize_unit_struct(&'static str) -> Captured;
        serialize_unit_variant(&'static str, u32, &'static str) -> Captured;
        serialize_seq(Option<usize>) -> Self::SerializeSeq;
        serialize_tuple(usize) -> Self::SerializeTuple;
        serialize_tuple_struct(&'static str, usize) -> Self::SerializeTupleStruct;
        serialize_tuple_variant(&'static str, u32, &'static str, usize) -> Self::SerializeTupleVariant;
        serialize_map(Option<usize>) -> Self::SerializeMap;
        serialize_struct_variant(&'static str, u32, &'static str, usize) -> Self::SerializeStructVariant;
    }

    fn serialize_some<T>(self, _value: &T) -> Result<Captured, ProbeOutcome>
    where
        T: Serialize + ?Sized,
    {
        Err(ProbeOutcome::NotARecord)
    }

    fn serialize_newtype_struct<T>(
        self,
        _name: &'static str,
        _value: &T,
    ) -> Result<Captured, ProbeOutcome>
    where
        T: Serialize + ?Sized,
    {
        Err(ProbeOutcome::NotARecord)
    }

    fn serialize_newtype_variant<T>(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<Captured, ProbeOutcome>
    where
        T: Serialize + ?Sized,
    {
        Err(ProbeOutcome::NotARecord)
    }

    fn serialize_struct(
        self,
        name: &'static str,
        len: usize,
    ) -> Result<FieldCapture, ProbeOutcome> {
        Ok(FieldCapture {
            name,
            fields: Vec::with_capacity(len),
        })
    }
}

struct FieldCapture {
    name: &'static str,
    fields: Vec<&'static str>,
}

impl ser::SerializeStruct for FieldCapture {
    type Ok = Captured;
    type Error = ProbeOutcome;

    fn serialize_field<T>(&mut self, key: &'static str, _value: &T) -> Result<(), ProbeOutcome>
    where
        T: Serialize + ?Sized,
    {
        self.fields.push(key);
        Ok(())
    }

    fn skip_field(&mut self, key: &'static str) -> Result<(), ProbeOutcome> {
        self.fields.push(key);
        Ok(())
    }

    fn end(self) -> Result<Captured, ProbeOutcome> {
        Ok((self.name, self.fields))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::thread;

    use serde_derive::{Deserialize, Serialize};

    use super::{Schema, SchemaCache};

    #[allow(dead_code)]
    #[derive(Default, Serialize, Deserialize)]
    struct Order {
        id: u64,
        #[serde(rename = "customerName")]
        customer_name: String,
        #[serde(skip)]
        cached_total: u32,
        items: Vec<String>,
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Aliased {
        #[serde(alias = "legacy")]
        value: u8,
    }

    fn names(schema: &Schema) -> Vec<&'static str> {
        schema.members().iter().map(|m| m.name()).collect()
    }

    #[test]
    fn members_in_declaration_order() {
        let cache = SchemaCache::new();
        let schema = cache.fields_of::<Order>().unwrap();

        assert_eq!(names(&schema), ["id", "customerName", "items"]);
        assert_eq!(schema.name(), "Order");
        assert_eq!(schema.member("items").unwrap().position(), 2);
        assert!(schema.member("cached_total").is_none());
    }

    #[test]
    fn aliases_are_accepted_but_are_not_members() {
        let cache = SchemaCache::new();
        let accepted = cache.fields_of::<Aliased>().unwrap();
        assert!(accepted.member("legacy").is_some());
        assert!(accepted.member("value").is_some());

        let schema = Schema::of_value(&Aliased { value: 5 }).unwrap();
        assert_eq!(names(&schema), ["value"]);
        assert_eq!(schema.name(), "Aliased");
        assert_eq!(schema.len(), 1);
        assert!(schema.member("legacy").is_none());

        assert_eq!(crate::from_str(r#"{"legacy":5}"#), Ok(Aliased { value: 5 }));
        assert_eq!(crate::to_string(&Aliased { value: 5 }).unwrap(), r#"{"value":5}"#);
    }

    #[test]
    fn members_of_a_value() {
        #[allow(dead_code)]
        #[derive(Serialize)]
        struct Sparse {
            id: u8,
            #[serde(skip_serializing_if = "Option::is_none")]
            note: Option<String>,
            #[serde(skip_serializing)]
            secret: u8,
        }

        let schema = Schema::of_value(&Order::default()).unwrap();
        assert_eq!(names(&schema), ["id", "customerName", "items"]);
        assert_eq!(schema.member("items").unwrap().position(), 2);

        let sparse = Sparse {
            id: 1,
            note: None,
            secret: 9,
        };
        assert_eq!(names(&Schema::of_value(&sparse).unwrap()), ["id", "note"]);

        assert!(Schema::of_value(&7u32).is_none());
        assert!(Schema::of_value(&Some(Order::default())).is_none());
        assert!(Schema::of_value(&vec![Order::default()]).is_none());
    }

    #[test]
    fn non_records_have_no_schema() {
        let cache = SchemaCache::new();
        assert!(cache.fields_of::<u32>().is_none());
        assert!(cache.fields_of::<Vec<String>>().is_none());
        assert!(cache.fields_of::<HashMap<String, u8>>().is_none());
        assert!(cache.fields_of::<Option<Order>>().is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn repeated_lookups_share_the_entry() {
        let cache = SchemaCache::new();
        let first = cache.fields_of::<Order>().unwrap();
        let second = cache.fields_of::<Order>().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn concurrent_lookups_converge() {
        let cache = SchemaCache::new();
        let schemas: Vec<_> = thread::scope(|scope| {
            let workers: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| cache.fields_of::<Order>().unwrap()))
                .collect();
            workers.into_iter().map(|w| w.join().unwrap()).collect()
        });

        for schema in &schemas {
            assert!(Arc::ptr_eq(schema, &schemas[0]));
            assert_eq!(names(schema), ["id", "customerName", "items"]);
        }
        assert_eq!(cache.len(), 1);
    }
}
