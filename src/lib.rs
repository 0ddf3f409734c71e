//! A general-purpose JSON codec built on [`serde`]
//!
//! Any type that implements `Serialize` can be written as JSON text, and any
//! type that implements `Deserialize` can be rebuilt from it. There is no
//! per-type code to write beyond `#[derive(Serialize, Deserialize)]`.
//!
//! ```
//! use serde_derive::{Deserialize, Serialize};
//!
//! #[derive(Debug, PartialEq, Serialize, Deserialize)]
//! struct Order {
//!     id: u32,
//!     items: Vec<String>,
//!     note: Option<String>,
//! }
//!
//! let order = Order { id: 7, items: vec!["tea".into()], note: None };
//! let text = jsongeek::to_string(&order).unwrap();
//! assert_eq!(text, r#"{"id":7,"items":["tea"],"note":null}"#);
//! assert_eq!(jsongeek::from_str::<Order>(&text).unwrap(), order);
//! ```
//!
//! # Features
//!
//! - Compact output: no whitespace, members in declaration order, floats in
//!   their shortest round-tripping form.
//! - Record layouts are discovered once per type and cached in a
//!   [`SchemaCache`].
//! - Strings parsed into [`Interned`] (or into a [`Value`]) are shared through
//!   a [`StringPool`], so repeated content is held once.
//! - Lenient by default: unknown members are skipped, trailing commas and raw
//!   control characters are accepted, and a member whose `Serialize` fails is
//!   left out of the object. [`Options::strict`] turns all of that into
//!   errors.
//! - Nesting is bounded by [`Options::max_depth`], so reference cycles fail
//!   with [`Error::RecursionLimitExceeded`] instead of overflowing the stack.
//! - With the `datetime` feature (on by default), the [`datetime`] module
//!   maps `time` date-times to ISO-8601 text.
//!
//! The free functions use [`Codec::global`]; build a [`Codec`] of your own for
//! separate options, caches and pools.

#![deny(missing_docs)]

pub mod buffer;
pub mod codec;
#[cfg(feature = "datetime")]
pub mod datetime;
pub mod de;
pub mod error;
pub mod pool;
pub mod schema;
pub mod ser;
mod str;
pub mod value;

#[doc(inline)]
pub use self::buffer::OutputBuffer;
#[doc(inline)]
pub use self::codec::{Codec, Options, Policy};
#[doc(inline)]
pub use self::de::{from_slice, from_str};
#[doc(inline)]
pub use self::error::{Error, ErrorCategory, Result};
#[doc(inline)]
pub use self::pool::{Interned, StringPool};
#[doc(inline)]
pub use self::schema::{Member, Schema, SchemaCache};
#[doc(inline)]
pub use self::ser::{to_buffer, to_string, to_vec};
#[doc(inline)]
pub use self::value::{Map, Number, Value};
