//! Feed data model and RSS 2.0 output.
//!
//! - [`model`] - [`Item`] and [`Channel`], the normalized shape every source produces
//! - [`writer`] - deterministic RSS encoding with `quick-xml` and atomic file replacement
//!
//! # Example
//!
//! ```
//! use chrono::NaiveDate;
//! use rss_builder::feed::{encode, Channel, Item};
//!
//! let date = NaiveDate::from_ymd_opt(2023, 2, 1).unwrap();
//! let item = Item::new("Hello", "https://x.test/a", "", date);
//! let channel = Channel::for_source("Example", "https://x.test/", vec![item]);
//!
//! let xml = String::from_utf8(encode(&channel).unwrap()).unwrap();
//! assert!(xml.contains("<pubDate>Wed, 01 Feb 2023 00:00:00 UTC</pubDate>"));
//! ```

mod model;
mod writer;

pub use model::{Channel, Item};
pub use writer::{encode, write_atomic, EncodeError};
