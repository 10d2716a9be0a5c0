use async_trait::async_trait;
use chrono::{Datelike, Local};
use scraper::{ElementRef, Html};
use url::Url;

use super::extract::{follow_up_text, parse_date_token, required_link, selector};
use super::{DefinitionError, ExtractError, FetchError, Field, HttpSettings, Source};
use crate::feed::Item;
use crate::util::{clean_text, site_root, DateFormat};

/// How to find an entry's date on its own page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FollowUpDate {
    pub selector: String,
    /// Stripped from the start of the text when present
    pub prefix: String,
    /// Stripped from the end of the text when present
    pub suffix: String,
    pub format: DateFormat,
}

impl FollowUpDate {
    fn token<'a>(&self, text: &'a str) -> &'a str {
        let text = text.strip_prefix(self.prefix.as_str()).unwrap_or(text);
        text.strip_suffix(self.suffix.as_str()).unwrap_or(text)
    }
}

/// An archive page grouped by year, where the posts of a year are the
/// element siblings of an anchor with id `{year}-ref`.
///
/// Listing pages carry no dates here, so each entry's date is read from
/// the entry's own page.
#[derive(Debug, Clone)]
pub struct YearIndexSource {
    name: String,
    home_url: String,
    origin: Url,
    year: i32,
    date: FollowUpDate,
    http: HttpSettings,
}

/// Entries read before the listing scan stopped, and why it stopped.
struct YearScan {
    entries: Vec<(String, String)>,
    pending: Option<ExtractError>,
}

impl YearIndexSource {
    pub fn new(
        name: impl Into<String>,
        home_url: impl Into<String>,
        year: i32,
        date: FollowUpDate,
        http: HttpSettings,
    ) -> Result<Self, DefinitionError> {
        selector(&date.selector)?;
        let home_url = home_url.into();
        let origin = site_root(&home_url).map_err(|source| DefinitionError::Url {
            url: home_url.clone(),
            source,
        })?;
        Ok(Self {
            name: name.into(),
            home_url,
            origin,
            year,
            date,
            http,
        })
    }

    /// Posts of the current calendar year on kirshatrov.com.
    pub fn kir_shatrov(http: HttpSettings) -> Result<Self, DefinitionError> {
        Self::new(
            "Kir Shatrov",
            "https://kirshatrov.com/posts/",
            Local::now().year(),
            FollowUpDate {
                selector: ".text-base".into(),
                prefix: "Written in ".into(),
                suffix: ".".into(),
                format: DateFormat::MonthNameYear,
            },
            http,
        )
    }

    pub fn with_year(mut self, year: i32) -> Self {
        self.year = year;
        self
    }

    /// Point the source at another page; links resolve against its root.
    pub fn with_home_url(mut self, home_url: impl Into<String>) -> Result<Self, DefinitionError> {
        let home_url = home_url.into();
        self.origin = site_root(&home_url).map_err(|source| DefinitionError::Url {
            url: home_url.clone(),
            source,
        })?;
        self.home_url = home_url;
        Ok(self)
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    fn scan(&self, body: &str) -> Result<YearScan, FetchError> {
        let anchor_sel = selector(&format!("[id=\"{}-ref\"]", self.year))?;
        let link_sel = selector("a")?;
        let document = Html::parse_document(body);

        let Some(anchor) = document.select(&anchor_sel).next() else {
            return Ok(YearScan {
                entries: Vec::new(),
                pending: None,
            });
        };

        let mut siblings: Vec<ElementRef<'_>> =
            anchor.prev_siblings().filter_map(ElementRef::wrap).collect();
        siblings.reverse();
        siblings.extend(anchor.next_siblings().filter_map(ElementRef::wrap));

        let mut entries = Vec::new();
        for (index, entry) in siblings.into_iter().enumerate() {
            let title = clean_text(&entry.text().collect::<String>());
            if title.is_empty() {
                return Ok(YearScan {
                    entries,
                    pending: Some(ExtractError::Empty {
                        field: Field::Title,
                        index,
                    }),
                });
            }
            match required_link(entry, &link_sel, &self.origin, index) {
                Ok(link) => entries.push((title, link)),
                Err(e) => {
                    return Ok(YearScan {
                        entries,
                        pending: Some(e),
                    })
                }
            }
        }

        Ok(YearScan {
            entries,
            pending: None,
        })
    }
}

#[async_trait]
impl Source for YearIndexSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn home_url(&self) -> &str {
        &self.home_url
    }

    async fn fetch(&self) -> Result<Vec<Item>, FetchError> {
        let client = self.http.client()?;
        let body = super::http::get_page(&client, &self.home_url, self.http.max_page_bytes).await?;
        let YearScan { entries, pending } = self.scan(&body)?;
        tracing::debug!(
            source = %self.name,
            year = self.year,
            entries = entries.len(),
            "Scanned year index"
        );

        let mut items = Vec::with_capacity(entries.len());
        for (index, (title, link)) in entries.into_iter().enumerate() {
            let text =
                follow_up_text(&client, &link, &self.date.selector, self.http.max_page_bytes).await;
            let published = parse_date_token(self.date.token(&text), self.date.format, index)?;
            items.push(Item::new(title, link, "", published));
        }

        match pending {
            Some(e) => Err(e.into()),
            None => Ok(items),
        }
    }
}
