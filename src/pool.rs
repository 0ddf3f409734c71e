//! String interning
//!
//! A [`StringPool`] maps string content to one shared allocation. Parsing
//! into [`Interned`] (directly, or through [`Value`](crate::Value)) goes
//! through the pool of the codec doing the parse, so a document that repeats
//! the same scalar many times holds a single copy of it.

use core::{borrow::Borrow, fmt, ops::Deref};
use std::cell::RefCell;
use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLock};

use serde::de::{self, Deserialize, Deserializer, Visitor};
use serde::ser::{Serialize, Serializer};

use crate::codec::Codec;

/// A shared, immutable string handed out by a [`StringPool`].
///
/// Two `Interned` values produced by the same pool from equal content point
/// to the same allocation; see [`Interned::ptr_eq`].
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Interned(Arc<str>);

impl Interned {
    /// The string content.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether both handles share one allocation.
    pub fn ptr_eq(&self, other: &Interned) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Interns `s` into the pool of the parse running on this thread, or into
    /// the global pool when there is none.
    pub(crate) fn from_active(s: &str) -> Interned {
        ACTIVE.with(|active| match &*active.borrow() {
            Some(pool) => pool.intern(s),
            None => Codec::global().strings().intern(s),
        })
    }
}

impl Deref for Interned {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Interned {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Interned {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for Interned {
    fn eq(&self, other: &str) -> bool {
        &*self.0 == other
    }
}

impl PartialEq<&str> for Interned {
    fn eq(&self, other: &&str) -> bool {
        &*self.0 == *other
    }
}

impl fmt::Debug for Interned {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl fmt::Display for Interned {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for Interned {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

struct InternedVisitor;

impl<'de> Visitor<'de> for InternedVisitor {
    type Value = Interned;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("a string")
    }

    fn visit_str<E>(self, v: &str) -> Result<Interned, E>
    where
        E: de::Error,
    {
        Ok(Interned::from_active(v))
    }
}

impl<'de> Deserialize<'de> for Interned {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_str(InternedVisitor)
    }
}

/// A content-addressed set of shared strings.
///
/// Entries are never evicted; the pool grows for as long as it lives. Safe
/// to share between threads: the first thread to insert a given content
/// wins and every other caller receives that same allocation.
#[derive(Default)]
pub struct StringPool {
    strings: RwLock<HashSet<Arc<str>>>,
}

impl StringPool {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the canonical instance for `s`, inserting it on first sight.
    pub fn intern(&self, s: &str) -> Interned {
        {
            let strings = self.strings.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(existing) = strings.get(s) {
                return Interned(existing.clone());
            }
        }

        let mut strings = self.strings.write().unwrap_or_else(PoisonError::into_inner);
        // another thread may have won the race between the two locks
        if let Some(existing) = strings.get(s) {
            return Interned(existing.clone());
        }
        let fresh: Arc<str> = Arc::from(s);
        strings.insert(fresh.clone());
        Interned(fresh)
    }

    /// Whether `s` has been interned.
    pub fn contains(&self, s: &str) -> bool {
        self.strings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(s)
    }

    /// Number of distinct strings held.
    pub fn len(&self) -> usize {
        self.strings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the pool holds nothing.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for StringPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StringPool").field("len", &self.len()).finish()
    }
}

thread_local! {
    static ACTIVE: RefCell<Option<Arc<StringPool>>> = const { RefCell::new(None) };
}

/// Makes a pool the interning target of this thread until dropped.
///
/// Guards nest: dropping one restores whichever pool was active before it.
pub(crate) struct ActivePool {
    previous: Option<Arc<StringPool>>,
}

impl ActivePool {
    pub(crate) fn enter(pool: &Arc<StringPool>) -> Self {
        let previous = ACTIVE.with(|active| active.borrow_mut().replace(pool.clone()));
        ActivePool { previous }
    }
}

impl Drop for ActivePool {
    fn drop(&mut self) {
        let previous = self.previous.take();
        ACTIVE.with(|active| *active.borrow_mut() = previous);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::{ActivePool, Interned, StringPool};

    #[test]
    fn equal_content_shares_allocation() {
        let pool = StringPool::new();
        let a = pool.intern("status");
        let b = pool.intern(&String::from("status"));
        let c = pool.intern("other");

        assert!(a.ptr_eq(&b));
        assert!(!a.ptr_eq(&c));
        assert_eq!(a, "status");
        assert_eq!(pool.len(), 2);
        assert!(pool.contains("other"));
        assert!(!pool.contains("missing"));
    }

    #[test]
    fn concurrent_interning_converges() {
        let pool = Arc::new(StringPool::new());
        let handles: Vec<Interned> = thread::scope(|scope| {
            let workers: Vec<_> = (0..8)
                .map(|_| {
                    let pool = pool.clone();
                    scope.spawn(move || pool.intern("shared"))
                })
                .collect();
            workers.into_iter().map(|w| w.join().unwrap()).collect()
        });

        assert!(handles.windows(2).all(|w| w[0].ptr_eq(&w[1])));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn active_pool_nests() {
        let outer = Arc::new(StringPool::new());
        let inner = Arc::new(StringPool::new());

        let _outer_guard = ActivePool::enter(&outer);
        {
            let _inner_guard = ActivePool::enter(&inner);
            Interned::from_active("inner-only");
        }
        Interned::from_active("outer-only");

        assert!(inner.contains("inner-only"));
        assert!(!inner.contains("outer-only"));
        assert!(outer.contains("outer-only"));
        assert!(!outer.contains("inner-only"));
    }
}
