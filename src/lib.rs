//! Builds RSS 2.0 feeds for sites that do not publish one.
//!
//! Each [`sources::Source`] scrapes a site's listing page into
//! [`feed::Item`]s; [`publish::run`] fetches every source concurrently and
//! writes one feed file per source.

pub mod config;
pub mod feed;
pub mod publish;
pub mod sources;
pub mod util;
