use url::Url;

/// Reduce a page URL to its site root (`scheme://host[:port]/`).
pub fn site_root(page_url: &str) -> Result<Url, url::ParseError> {
    Url::parse(page_url)?.join("/")
}

/// Resolve a scraped `href` against a site root.
///
/// Absolute hrefs are kept, root-relative and protocol-relative ones are joined
/// onto `base`. Returns `None` for empty hrefs and for anything that does not
/// end up as an `http`/`https` URL (`javascript:`, `mailto:`, ...).
pub fn resolve_link(href: &str, base: &Url) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }

    let resolved = base.join(href).ok()?;
    match resolved.scheme() {
        "http" | "https" => Some(resolved.to_string()),
        _ => None,
    }
}
