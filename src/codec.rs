//! The codec object: options, schema cache and string pool in one place

use std::cell::RefCell;
use std::sync::{Arc, LazyLock};

use serde::de::{Deserialize, DeserializeOwned};
use serde::ser::Serialize;

use crate::buffer::{OutputBuffer, DEFAULT_CAPACITY};
use crate::de::Deserializer;
use crate::error::{Error, Result};
use crate::pool::{ActivePool, Interned, StringPool};
use crate::schema::{Schema, SchemaCache};
use crate::ser::Serializer;

/// Nesting allowed by default, in arrays, objects and newtypes combined.
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// How forgiving a codec is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Policy {
    /// Skip unknown object members, accept trailing commas and raw control
    /// characters in strings, drop members that cannot be read, and write
    /// non-finite floats as `null`.
    #[default]
    Lenient,
    /// Reject all of the above.
    ///
    /// A member is unknown when the target's `Deserialize` table does not
    /// list it. That includes members marked `#[serde(skip_deserializing)]`,
    /// so a record with such a member does not read back its own output
    /// under this policy.
    Strict,
}

/// Codec configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
    /// Lenient or strict handling of questionable input.
    pub policy: Policy,
    /// Deepest nesting accepted before failing with
    /// [`Error::RecursionLimitExceeded`]. This is also what stops a cyclic
    /// value graph from serializing forever.
    pub max_depth: usize,
}

impl Options {
    /// The default, forgiving configuration.
    pub const fn lenient() -> Self {
        Options {
            policy: Policy::Lenient,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Reject anything that is not plain, well-formed JSON for the target.
    pub const fn strict() -> Self {
        Options {
            policy: Policy::Strict,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Replace the nesting limit.
    pub const fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub(crate) fn is_lenient(&self) -> bool {
        self.policy == Policy::Lenient
    }
}

impl Default for Options {
    fn default() -> Self {
        Options::lenient()
    }
}

static GLOBAL: LazyLock<Codec> = LazyLock::new(Codec::new);

// Capacity the per-thread scratch buffer may keep between conversions.
// A document that grows it further gives the memory back afterwards.
const SCRATCH_RETAIN_LIMIT: usize = 64 * DEFAULT_CAPACITY;

thread_local! {
    static SCRATCH: RefCell<OutputBuffer> = RefCell::new(OutputBuffer::new());
}

/// Converts values to JSON text and back.
///
/// A codec owns the schema cache and the string pool its conversions
/// share. It is `Send + Sync`; one instance can serve any number of threads.
/// The crate-level functions use [`Codec::global`].
#[derive(Debug, Default)]
pub struct Codec {
    options: Options,
    schemas: SchemaCache,
    strings: Arc<StringPool>,
}

impl Codec {
    /// A lenient codec with empty caches.
    pub fn new() -> Self {
        Self::with_options(Options::default())
    }

    /// A codec with empty caches and the given options.
    pub fn with_options(options: Options) -> Self {
        Codec {
            options,
            schemas: SchemaCache::new(),
            strings: Arc::new(StringPool::new()),
        }
    }

    /// The process-wide lenient codec.
    pub fn global() -> &'static Codec {
        &GLOBAL
    }

    /// This codec's options.
    pub fn options(&self) -> Options {
        self.options
    }

    /// The schema cache shared by this codec's conversions.
    pub fn schemas(&self) -> &SchemaCache {
        &self.schemas
    }

    /// The string pool shared by this codec's conversions.
    pub fn strings(&self) -> &StringPool {
        &self.strings
    }

    /// Intern `s` into this codec's pool.
    pub fn intern(&self, s: &str) -> Interned {
        self.strings.intern(s)
    }

    /// The member names record type `T` accepts; see
    /// [`SchemaCache::fields_of`].
    pub fn fields_of<T>(&self) -> Option<Arc<Schema>>
    where
        T: DeserializeOwned + 'static,
    {
        self.schemas.fields_of::<T>()
    }

    /// Serialize `value` as JSON text, appending to `buf`.
    ///
    /// On error `buf` may hold a partial document.
    pub fn to_buffer<T>(&self, value: &T, buf: &mut OutputBuffer) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        let mut ser = Serializer::new(buf, self.options);
        value.serialize(&mut ser)
    }

    /// Serialize `value` as a string of JSON text.
    pub fn to_string<T>(&self, value: &T) -> Result<String>
    where
        T: Serialize + ?Sized,
    {
        SCRATCH.with(|scratch| match scratch.try_borrow_mut() {
            Ok(mut buf) => {
                buf.clear();
                let text = self
                    .to_buffer(value, &mut buf)
                    .map(|()| buf.as_str().to_owned());
                if buf.capacity() > SCRATCH_RETAIN_LIMIT {
                    buf.clear();
                    buf.shrink_to(DEFAULT_CAPACITY);
                }
                text
            }
            // a `Serialize` impl calling back into the codec on this thread
            Err(_) => {
                let mut buf = OutputBuffer::new();
                self.to_buffer(value, &mut buf)?;
                Ok(buf.into_string())
            }
        })
    }

    /// Serialize `value` as a JSON byte vector.
    pub fn to_vec<T>(&self, value: &T) -> Result<Vec<u8>>
    where
        T: Serialize + ?Sized,
    {
        self.to_string(value).map(String::into_bytes)
    }

    /// Deserialize an instance of type `T` from a string of JSON text.
    pub fn from_str<'a, T>(&self, s: &'a str) -> Result<T>
    where
        T: Deserialize<'a>,
    {
        let _active = ActivePool::enter(&self.strings);
        let mut de = Deserializer::new(s, self.options, &self.schemas);
        let value = T::deserialize(&mut de)?;
        de.end()?;

        Ok(value)
    }

    /// Deserialize an instance of type `T` from bytes of JSON text.
    pub fn from_slice<'a, T>(&self, v: &'a [u8]) -> Result<T>
    where
        T: Deserialize<'a>,
    {
        let s = core::str::from_utf8(v).map_err(|_| Error::InvalidUnicodeCodePoint)?;
        self.from_str(s)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use quickcheck::TestResult;
    use quickcheck_macros::quickcheck;
    use serde_derive::{Deserialize, Serialize};

    use super::{Codec, Options, Policy, SCRATCH, SCRATCH_RETAIN_LIMIT};
    use crate::buffer::OutputBuffer;
    use crate::Interned;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Tag {
        label: Interned,
    }

    #[test]
    fn options() {
        assert_eq!(Options::default().policy, Policy::Lenient);
        assert_eq!(Options::strict().policy, Policy::Strict);
        assert_eq!(Options::strict().with_max_depth(4).max_depth, 4);
    }

    #[test]
    fn codecs_do_not_share_caches() {
        let a = Codec::new();
        let b = Codec::new();

        let _: Tag = a.from_str(r#"{"label":"only-in-a"}"#).unwrap();

        assert!(a.strings().contains("only-in-a"));
        assert!(!b.strings().contains("only-in-a"));
        assert_eq!(a.schemas().len(), 1);
        assert!(b.schemas().is_empty());
    }

    #[test]
    fn buffer_reuse() {
        let codec = Codec::new();
        let mut buf = OutputBuffer::with_capacity(64);

        codec.to_buffer(&[1, 2, 3], &mut buf).unwrap();
        assert_eq!(buf.as_str(), "[1,2,3]");

        buf.clear();
        codec.to_buffer("again", &mut buf).unwrap();
        assert_eq!(buf.as_str(), r#""again""#);
    }

    #[test]
    fn scratch_buffer_gives_back_large_allocations() {
        let codec = Codec::new();
        let scratch_capacity = || SCRATCH.with(|scratch| scratch.borrow().capacity());

        let medium = "m".repeat(10_000);
        assert_eq!(codec.to_string(&medium).unwrap().len(), 10_002);
        assert!(scratch_capacity() >= 10_002);

        let huge = vec!["h".repeat(1024); 2 * SCRATCH_RETAIN_LIMIT / 1024];
        let text = codec.to_string(&huge).unwrap();
        assert!(text.len() > SCRATCH_RETAIN_LIMIT);
        assert!(scratch_capacity() <= SCRATCH_RETAIN_LIMIT);

        assert_eq!(codec.to_string(&[1, 2]).unwrap(), "[1,2]");
    }

    #[test]
    fn nested_to_string_on_one_thread() {
        struct Reentrant;

        impl serde::Serialize for Reentrant {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                let inner = Codec::global()
                    .to_string(&[true])
                    .map_err(serde::ser::Error::custom)?;
                serializer.serialize_str(&inner)
            }
        }

        assert_eq!(
            Codec::new().to_string(&Reentrant).unwrap(),
            r#""[true]""#
        );
    }

    #[test]
    fn from_slice_rejects_invalid_utf8() {
        assert!(Codec::new().from_slice::<String>(b"\"\xff\"").is_err());
    }

    #[test]
    fn codec_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Codec>();
    }

    #[quickcheck]
    fn strings_round_trip(s: String) -> bool {
        let strict = Codec::with_options(Options::strict());
        let text = strict.to_string(&s).unwrap();
        strict.from_str::<String>(&text) == Ok(s)
    }

    #[quickcheck]
    fn unsigned_integers_round_trip(a: u8, b: u16, c: u32, d: u64, e: u128) -> bool {
        let text = crate::to_string(&(a, b, c, d, e)).unwrap();
        crate::from_str(&text) == Ok((a, b, c, d, e))
    }

    #[quickcheck]
    fn signed_integers_round_trip(a: i8, b: i16, c: i32, d: i64, e: i128) -> bool {
        let text = crate::to_string(&(a, b, c, d, e)).unwrap();
        crate::from_str(&text) == Ok((a, b, c, d, e))
    }

    #[quickcheck]
    fn floats_round_trip(x: f64, y: f32) -> TestResult {
        if !x.is_finite() || !y.is_finite() {
            return TestResult::discard();
        }
        let text = crate::to_string(&(x, y)).unwrap();
        TestResult::from_bool(crate::from_str(&text) == Ok((x, y)))
    }

    #[quickcheck]
    fn structures_round_trip(
        rows: Vec<(String, Option<i32>, bool)>,
        index: BTreeMap<String, Vec<u8>>,
    ) -> bool {
        let value = (rows, index);
        let text = crate::to_string(&value).unwrap();
        crate::from_str(&text) == Ok(value)
    }
}
