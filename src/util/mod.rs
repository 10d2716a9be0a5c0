//! Pure helpers shared by the sources and the feed writer.
//!
//! - **Identity**: deterministic item GUIDs derived from links
//! - **Dates**: source calendar patterns and the feed's pubDate convention
//! - **Text**: control-character stripping for scraped text
//! - **Links**: resolving scraped hrefs against a site root
//! - **Filenames**: turning source names into safe output file stems

mod date;
mod filename;
mod guid;
mod link;
mod text;

pub use date::{format_pub_date, DateFormat};
pub use filename::file_stem;
pub use guid::guid_for_link;
pub use link::{resolve_link, site_root};
pub use text::{clean_text, strip_control_chars};
