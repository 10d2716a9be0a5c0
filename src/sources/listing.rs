use async_trait::async_trait;
use chrono::NaiveDate;
use scraper::{Html, Selector};
use url::Url;

use super::extract::{
    follow_up_text, required_date, required_link, required_text, select_text, selector,
};
use super::{DefinitionError, ExtractError, FetchError, Field, HttpSettings, Source};
use crate::feed::Item;
use crate::util::{site_root, DateFormat};

/// Where an item's description comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DescriptionRule {
    /// Items carry an empty description.
    None,
    /// Read from the entry on the listing page. The element must exist, its
    /// text may be empty.
    Listing(String),
    /// Read from the entry's own page with one extra request. Best effort.
    Page(String),
}

/// CSS selectors describing a listing page. Field selectors are scoped to
/// each entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingRules {
    pub entry: String,
    pub title: String,
    pub date: String,
    pub date_format: DateFormat,
    pub link: String,
    pub description: DescriptionRule,
}

struct CompiledRules {
    entry: Selector,
    title: Selector,
    date: Selector,
    link: Selector,
    description: Option<Selector>,
}

impl ListingRules {
    fn compile(&self) -> Result<CompiledRules, DefinitionError> {
        let description = match &self.description {
            DescriptionRule::Listing(css) => Some(selector(css)?),
            DescriptionRule::Page(css) => {
                selector(css)?;
                None
            }
            DescriptionRule::None => None,
        };
        Ok(CompiledRules {
            entry: selector(&self.entry)?,
            title: selector(&self.title)?,
            date: selector(&self.date)?,
            link: selector(&self.link)?,
            description,
        })
    }
}

/// One entry read off the listing page.
struct ListingEntry {
    title: String,
    link: String,
    date: NaiveDate,
    description: String,
}

/// A site whose listing page repeats one element per article, with every
/// required field reachable by a CSS selector inside it.
#[derive(Debug, Clone)]
pub struct ListingSource {
    name: String,
    home_url: String,
    origin: Url,
    rules: ListingRules,
    http: HttpSettings,
}

impl ListingSource {
    /// Validates every selector up front; relative links resolve against the
    /// root of `home_url`.
    pub fn new(
        name: impl Into<String>,
        home_url: impl Into<String>,
        rules: ListingRules,
        http: HttpSettings,
    ) -> Result<Self, DefinitionError> {
        rules.compile()?;
        let home_url = home_url.into();
        let origin = root_of(&home_url)?;
        Ok(Self {
            name: name.into(),
            home_url,
            origin,
            rules,
            http,
        })
    }

    /// Point the source at another page; the link origin follows it.
    pub fn with_home_url(mut self, home_url: impl Into<String>) -> Result<Self, DefinitionError> {
        let home_url = home_url.into();
        self.origin = root_of(&home_url)?;
        self.home_url = home_url;
        Ok(self)
    }

    /// Resolve relative links against `origin` instead of the home page root.
    pub fn with_origin(mut self, origin: &str) -> Result<Self, DefinitionError> {
        self.origin = root_of(origin)?;
        Ok(self)
    }

    pub fn gabriel_albiac(http: HttpSettings) -> Result<Self, DefinitionError> {
        Self::new(
            "Gabriel Albiac (El Debate)",
            "https://www.eldebate.com/autor/gabriel-albiac/",
            ListingRules {
                entry: "article.c-article".into(),
                title: ".c-article__title".into(),
                date: "div.date".into(),
                date_format: DateFormat::DayMonthYear,
                link: "a.page-link".into(),
                description: DescriptionRule::Page("h2.c-detail__subtitle".into()),
            },
            http,
        )
    }

    pub fn rory_sutherland(http: HttpSettings) -> Result<Self, DefinitionError> {
        Self::new(
            "Rory Sutherland (Spectator.co.uk)",
            "https://www.spectator.co.uk/writer/rory-sutherland/?filter=article&edition=uk",
            ListingRules {
                entry: "div.mosaic".into(),
                title: ".article__title".into(),
                date: "time.archive-entry__timestamp".into(),
                date_format: DateFormat::DayMonthNameYear,
                link: "a.article__title-link".into(),
                description: DescriptionRule::Listing("p.article__excerpt-text".into()),
            },
            http,
        )
    }

    pub fn rules(&self) -> &ListingRules {
        &self.rules
    }

    /// Reads every entry, stopping at the first one with a broken required
    /// field.
    fn scan(&self, body: &str) -> Result<Vec<ListingEntry>, FetchError> {
        let rules = self.rules.compile()?;
        let document = Html::parse_document(body);

        let mut entries = Vec::new();
        for (index, entry) in document.select(&rules.entry).enumerate() {
            let title = required_text(entry, &rules.title, Field::Title, index)?;
            let date = required_date(entry, &rules.date, self.rules.date_format, index)?;
            let link = required_link(entry, &rules.link, &self.origin, index)?;
            let description = match &rules.description {
                Some(sel) => select_text(entry, sel).ok_or(ExtractError::Missing {
                    field: Field::Description,
                    index,
                })?,
                None => String::new(),
            };

            entries.push(ListingEntry {
                title,
                link,
                date,
                description,
            });
        }
        Ok(entries)
    }
}

fn root_of(url: &str) -> Result<Url, DefinitionError> {
    site_root(url).map_err(|source| DefinitionError::Url {
        url: url.to_string(),
        source,
    })
}

#[async_trait]
impl Source for ListingSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn home_url(&self) -> &str {
        &self.home_url
    }

    async fn fetch(&self) -> Result<Vec<Item>, FetchError> {
        let client = self.http.client()?;
        let body = super::http::get_page(&client, &self.home_url, self.http.max_page_bytes).await?;
        let entries = self.scan(&body)?;
        tracing::debug!(source = %self.name, entries = entries.len(), "Scanned listing page");

        let mut items = Vec::with_capacity(entries.len());
        for entry in entries {
            let description = match &self.rules.description {
                DescriptionRule::Page(css) => {
                    follow_up_text(&client, &entry.link, css, self.http.max_page_bytes).await
                }
                _ => entry.description,
            };
            items.push(Item::new(entry.title, entry.link, description, entry.date));
        }
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn albiac_article(title: &str, date: &str, href: &str) -> String {
        format!(
            r#"<article class="c-article">
                 <h2 class="c-article__title"><a class="page-link" href="{href}">{title}</a></h2>
                 <div class="date">{date}</div>
               </article>"#
        )
    }

    fn page(body: &str) -> String {
        format!("<!doctype html><html><head><title>Listing</title></head><body>{body}</body></html>")
    }

    async fn mount_page(server: &MockServer, at: &str, status: u16, html: String) {
        Mock::given(method("GET"))
            .and(path(at))
            .respond_with(ResponseTemplate::new(status).set_body_string(html))
            .mount(server)
            .await;
    }

    async fn albiac_for(server: &MockServer) -> ListingSource {
        ListingSource::gabriel_albiac(HttpSettings::default())
            .unwrap()
            .with_home_url(format!("{}/autor/gabriel-albiac/", server.uri()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_listing_with_page_descriptions() {
        let server = MockServer::start().await;
        let listing = page(&[
            albiac_article("Primera columna", "01/02/2023", "/opinion/primera.html"),
            albiac_article("Segunda &amp; última", "25/12/2024", "/opinion/segunda.html"),
        ]
        .concat());
        mount_page(&server, "/autor/gabriel-albiac/", 200, listing).await;
        mount_page(
            &server,
            "/opinion/primera.html",
            200,
            page(r#"<h2 class="c-detail__subtitle">  Un subtítulo  </h2>"#),
        )
        .await;
        mount_page(&server, "/opinion/segunda.html", 404, String::new()).await;

        let items = albiac_for(&server).await.fetch().await.unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title(), "Primera columna");
        assert_eq!(items[0].link(), format!("{}/opinion/primera.html", server.uri()));
        assert_eq!(items[0].description(), "Un subtítulo");
        assert_eq!(items[0].pub_date(), "Wed, 01 Feb 2023 00:00:00 UTC");

        // A failed follow-up leaves the item in place with no description
        assert_eq!(items[1].title(), "Segunda & última");
        assert_eq!(items[1].description(), "");
        assert_eq!(items[1].pub_date(), "Wed, 25 Dec 2024 00:00:00 UTC");
    }

    #[tokio::test]
    async fn test_missing_date_aborts_whole_listing() {
        let server = MockServer::start().await;
        let listing = page(&[
            albiac_article("Uno", "01/02/2023", "/opinion/uno.html"),
            r#"<article class="c-article">
                 <h2 class="c-article__title"><a class="page-link" href="/opinion/dos.html">Dos</a></h2>
               </article>"#
                .to_string(),
            albiac_article("Tres", "03/02/2023", "/opinion/tres.html"),
        ]
        .concat());
        mount_page(&server, "/autor/gabriel-albiac/", 200, listing).await;
        Mock::given(method("GET"))
            .and(path("/opinion/uno.html"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = albiac_for(&server).await.fetch().await.unwrap_err();
        match err {
            FetchError::Extract(e) => {
                assert_eq!(
                    e,
                    ExtractError::Missing {
                        field: Field::Date,
                        index: 1
                    }
                );
            }
            e => panic!("Expected Extract error, got {:?}", e),
        }
    }

    #[tokio::test]
    async fn test_unparseable_date_reports_token() {
        let server = MockServer::start().await;
        mount_page(
            &server,
            "/autor/gabriel-albiac/",
            200,
            page(&albiac_article("Uno", "2023-02-01", "/opinion/uno.html")),
        )
        .await;

        let err = albiac_for(&server).await.fetch().await.unwrap_err();
        assert!(matches!(
            err,
            FetchError::Extract(ExtractError::InvalidDate { ref token, index: 0, .. }) if token == "2023-02-01"
        ));
    }

    #[tokio::test]
    async fn test_unpadded_date_is_rejected() {
        let server = MockServer::start().await;
        mount_page(
            &server,
            "/autor/gabriel-albiac/",
            200,
            page(&albiac_article("Uno", "1/2/2023", "/opinion/uno.html")),
        )
        .await;

        let err = albiac_for(&server).await.fetch().await.unwrap_err();
        assert!(matches!(
            err,
            FetchError::Extract(ExtractError::InvalidDate { ref token, index: 0, .. }) if token == "1/2/2023"
        ));
    }

    #[tokio::test]
    async fn test_empty_title_is_structural_error() {
        let server = MockServer::start().await;
        mount_page(
            &server,
            "/autor/gabriel-albiac/",
            200,
            page(&albiac_article("   ", "01/02/2023", "/opinion/uno.html")),
        )
        .await;

        let err = albiac_for(&server).await.fetch().await.unwrap_err();
        assert!(matches!(
            err,
            FetchError::Extract(ExtractError::Empty {
                field: Field::Title,
                index: 0
            })
        ));
    }

    #[tokio::test]
    async fn test_primary_status_error_is_fatal() {
        let server = MockServer::start().await;
        mount_page(&server, "/autor/gabriel-albiac/", 500, String::new()).await;

        let err = albiac_for(&server).await.fetch().await.unwrap_err();
        assert!(matches!(err, FetchError::HttpStatus(500)));
    }

    #[tokio::test]
    async fn test_no_entries_is_empty_feed() {
        let server = MockServer::start().await;
        mount_page(
            &server,
            "/autor/gabriel-albiac/",
            200,
            page("<p>Sin artículos</p>"),
        )
        .await;

        let items = albiac_for(&server).await.fetch().await.unwrap();
        assert!(items.is_empty());
    }

    fn mosaic(title: &str, date: &str, href: &str, excerpt: Option<&str>) -> String {
        let excerpt = excerpt
            .map(|e| format!(r#"<p class="article__excerpt-text">{e}</p>"#))
            .unwrap_or_default();
        format!(
            r#"<div class="mosaic">
                 <a class="article__title-link" href="{href}"><h3 class="article__title">{title}</h3></a>
                 <time class="archive-entry__timestamp">{date}</time>
                 {excerpt}
               </div>"#
        )
    }

    async fn rory_for(server: &MockServer) -> ListingSource {
        ListingSource::rory_sutherland(HttpSettings::default())
            .unwrap()
            .with_home_url(format!("{}/writer/rory-sutherland/", server.uri()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_listing_descriptions_and_absolute_links() {
        let server = MockServer::start().await;
        let listing = page(&[
            mosaic(
                "The wisdom of the irrational",
                "2 January 2006",
                "https://www.spectator.co.uk/article/wisdom/",
                Some("Why logic is overrated"),
            ),
            mosaic(
                "Nudges",
                "15 March 2024",
                "https://www.spectator.co.uk/article/nudges/",
                Some(""),
            ),
        ]
        .concat());
        mount_page(&server, "/writer/rory-sutherland/", 200, listing).await;

        let items = rory_for(&server).await.fetch().await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].link(), "https://www.spectator.co.uk/article/wisdom/");
        assert_eq!(items[0].description(), "Why logic is overrated");
        assert_eq!(items[0].pub_date(), "Mon, 02 Jan 2006 00:00:00 UTC");
        assert_eq!(items[1].description(), "");
    }

    #[tokio::test]
    async fn test_missing_listing_description_is_structural_error() {
        let server = MockServer::start().await;
        let listing = page(&mosaic(
            "No excerpt",
            "2 January 2006",
            "https://www.spectator.co.uk/article/x/",
            None,
        ));
        mount_page(&server, "/writer/rory-sutherland/", 200, listing).await;

        let err = rory_for(&server).await.fetch().await.unwrap_err();
        assert!(matches!(
            err,
            FetchError::Extract(ExtractError::Missing {
                field: Field::Description,
                index: 0
            })
        ));
    }

    #[tokio::test]
    async fn test_link_origin_override() {
        let server = MockServer::start().await;
        let listing = page(
            r#"<ul><li class="entry"><span class="t">Hello</span><span class="d">01/02/2023</span><a href="/a">go</a></li></ul>"#,
        );
        mount_page(&server, "/", 200, listing).await;

        let source = ListingSource::new(
            "Example",
            format!("{}/", server.uri()),
            ListingRules {
                entry: "li.entry".into(),
                title: ".t".into(),
                date: ".d".into(),
                date_format: DateFormat::DayMonthYear,
                link: "a".into(),
                description: DescriptionRule::None,
            },
            HttpSettings::default(),
        )
        .unwrap()
        .with_origin("https://x.test/")
        .unwrap();

        let items = source.fetch().await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].link(), "https://x.test/a");
        assert_eq!(items[0].guid(), "b21677be5fdccfccf804b612ab59a1cb");
        assert_eq!(items[0].pub_date(), "Wed, 01 Feb 2023 00:00:00 UTC");
    }

    #[test]
    fn test_invalid_selector_rejected_at_construction() {
        let rules = ListingRules {
            entry: "div > !".into(),
            title: ".t".into(),
            date: ".d".into(),
            date_format: DateFormat::DayMonthYear,
            link: "a".into(),
            description: DescriptionRule::None,
        };
        let result = ListingSource::new("Bad", "https://x.test/", rules, HttpSettings::default());
        assert!(matches!(result, Err(DefinitionError::Selector { .. })));
    }

    #[test]
    fn test_invalid_home_url_rejected() {
        let result = ListingSource::gabriel_albiac(HttpSettings::default())
            .unwrap()
            .with_home_url("not a url");
        assert!(matches!(result, Err(DefinitionError::Url { .. })));
    }
}
