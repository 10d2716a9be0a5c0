use chrono::NaiveDate;

use crate::util::{format_pub_date, guid_for_link};

/// A single feed entry extracted from a source page.
///
/// The GUID and pubDate are derived at construction and cannot be set
/// independently: the GUID is always the digest of the link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    title: String,
    link: String,
    description: String,
    guid: String,
    pub_date: String,
}

impl Item {
    pub fn new(
        title: impl Into<String>,
        link: impl Into<String>,
        description: impl Into<String>,
        published: NaiveDate,
    ) -> Self {
        let link = link.into();
        Self {
            title: title.into(),
            guid: guid_for_link(&link),
            link,
            description: description.into(),
            pub_date: format_pub_date(published),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn link(&self) -> &str {
        &self.link
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn guid(&self) -> &str {
        &self.guid
    }

    pub fn pub_date(&self) -> &str {
        &self.pub_date
    }
}

/// The feed envelope handed to the encoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    pub title: String,
    pub link: String,
    pub description: String,
    /// Entries in page order.
    pub items: Vec<Item>,
}

impl Channel {
    /// Build the envelope for a scraped source.
    pub fn for_source(name: &str, home_url: &str, items: Vec<Item>) -> Self {
        Self {
            title: format!("{name} feed"),
            link: home_url.to_string(),
            description: format!("Scraped feed for {name}"),
            items,
        }
    }
}
