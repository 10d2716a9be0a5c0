use chrono::NaiveDate;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::http::get_page;
use super::{DefinitionError, ExtractError, Field};
use crate::util::{clean_text, resolve_link, DateFormat};

pub(crate) fn selector(css: &str) -> Result<Selector, DefinitionError> {
    Selector::parse(css).map_err(|e| DefinitionError::Selector {
        selector: css.to_string(),
        reason: e.to_string(),
    })
}

/// Text of every node `sel` matches under `scope`, concatenated and cleaned.
///
/// `None` when nothing matches, so callers can tell a missing element from
/// an empty one.
pub(crate) fn select_text(scope: ElementRef<'_>, sel: &Selector) -> Option<String> {
    let mut matched = false;
    let mut text = String::new();
    for el in scope.select(sel) {
        matched = true;
        text.extend(el.text());
    }
    matched.then(|| clean_text(&text))
}

pub(crate) fn required_text(
    scope: ElementRef<'_>,
    sel: &Selector,
    field: Field,
    index: usize,
) -> Result<String, ExtractError> {
    let text = select_text(scope, sel).ok_or(ExtractError::Missing { field, index })?;
    if text.is_empty() {
        return Err(ExtractError::Empty { field, index });
    }
    Ok(text)
}

pub(crate) fn parse_date_token(
    token: &str,
    format: DateFormat,
    index: usize,
) -> Result<NaiveDate, ExtractError> {
    format
        .parse(token)
        .ok_or_else(|| ExtractError::InvalidDate {
            token: token.to_string(),
            format,
            index,
        })
}

/// The date element must exist and its text must parse; an empty text is a
/// parse failure rather than an empty field.
pub(crate) fn required_date(
    scope: ElementRef<'_>,
    sel: &Selector,
    format: DateFormat,
    index: usize,
) -> Result<NaiveDate, ExtractError> {
    let token = select_text(scope, sel).ok_or(ExtractError::Missing {
        field: Field::Date,
        index,
    })?;
    parse_date_token(&token, format, index)
}

/// `href` of the first node `sel` matches, resolved against `base`.
pub(crate) fn required_link(
    scope: ElementRef<'_>,
    sel: &Selector,
    base: &Url,
    index: usize,
) -> Result<String, ExtractError> {
    let anchor = scope.select(sel).next().ok_or(ExtractError::Missing {
        field: Field::Link,
        index,
    })?;
    anchor
        .value()
        .attr("href")
        .and_then(|href| resolve_link(href, base))
        .ok_or(ExtractError::Empty {
            field: Field::Link,
            index,
        })
}

/// Read `css` from a whole page, empty when the selector is unusable or
/// matches nothing.
fn page_text(body: &str, css: &str) -> String {
    let Ok(sel) = selector(css) else {
        return String::new();
    };
    let document = Html::parse_document(body);
    select_text(document.root_element(), &sel).unwrap_or_default()
}

/// Best-effort read of one field from an entry's own page.
///
/// Every failure (transport, status, body, selector) degrades to an empty
/// string; the listing page already guaranteed the required fields.
pub(crate) async fn follow_up_text(
    client: &reqwest::Client,
    url: &str,
    css: &str,
    limit: usize,
) -> String {
    match get_page(client, url, limit).await {
        Ok(body) => page_text(&body, css),
        Err(e) => {
            tracing::debug!(url = %url, error = %e, "Follow-up request failed, leaving field empty");
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::site_root;

    const ENTRY: &str = r#"
        <article>
          <h2 class="title"> Hello <em>world</em> </h2>
          <h2 class="title">again</h2>
          <div class="blank">   </div>
          <div class="date">01/02/2023</div>
          <a class="go" href="/a">read</a>
          <a class="go" href="/b">second</a>
          <a class="nohref">none</a>
        </article>"#;

    fn with_entry<T>(f: impl FnOnce(ElementRef<'_>) -> T) -> T {
        let doc = Html::parse_fragment(ENTRY);
        let article = doc.select(&selector("article").unwrap()).next().unwrap();
        f(article)
    }

    #[test]
    fn test_text_concatenates_matches() {
        let text = with_entry(|e| select_text(e, &selector(".title").unwrap()));
        assert_eq!(text.as_deref(), Some("Hello world again"));
    }

    #[test]
    fn test_missing_and_empty_are_distinct() {
        let missing = with_entry(|e| required_text(e, &selector(".nope").unwrap(), Field::Title, 3));
        assert_eq!(
            missing,
            Err(ExtractError::Missing {
                field: Field::Title,
                index: 3
            })
        );

        let empty = with_entry(|e| required_text(e, &selector(".blank").unwrap(), Field::Title, 3));
        assert_eq!(
            empty,
            Err(ExtractError::Empty {
                field: Field::Title,
                index: 3
            })
        );
    }

    #[test]
    fn test_date_parsed_or_reported() {
        let date = with_entry(|e| {
            required_date(e, &selector(".date").unwrap(), DateFormat::DayMonthYear, 0)
        });
        assert_eq!(date, Ok(NaiveDate::from_ymd_opt(2023, 2, 1).unwrap()));

        let wrong = with_entry(|e| {
            required_date(e, &selector(".date").unwrap(), DateFormat::MonthNameYear, 1)
        });
        assert!(matches!(wrong, Err(ExtractError::InvalidDate { index: 1, .. })));

        let blank = with_entry(|e| {
            required_date(e, &selector(".blank").unwrap(), DateFormat::DayMonthYear, 2)
        });
        assert!(matches!(blank, Err(ExtractError::InvalidDate { ref token, .. }) if token.is_empty()));
    }

    #[test]
    fn test_link_uses_first_match_and_resolves() {
        let base = site_root("https://x.test/listing").unwrap();
        let link = with_entry(|e| required_link(e, &selector("a.go").unwrap(), &base, 0));
        assert_eq!(link.as_deref(), Ok("https://x.test/a"));

        let no_href = with_entry(|e| required_link(e, &selector("a.nohref").unwrap(), &base, 4));
        assert_eq!(
            no_href,
            Err(ExtractError::Empty {
                field: Field::Link,
                index: 4
            })
        );
    }

    #[test]
    fn test_invalid_selector_reported() {
        let err = selector("div > !").unwrap_err();
        assert!(err.to_string().contains("div > !"));
    }

    #[test]
    fn test_page_text_degrades_to_empty() {
        assert_eq!(page_text("<h2 class='sub'> Sub </h2>", "h2.sub"), "Sub");
        assert_eq!(page_text("<p>nothing</p>", "h2.sub"), "");
        assert_eq!(page_text("<p>nothing</p>", "[[["), "");
    }
}
