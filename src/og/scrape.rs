use reqwest::Url;
use webpage::HTML;

use crate::og::OgData;

fn non_empty(value: Option<&String>) -> Option<String> {
    value
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(String::from)
}

/// Pulls link-preview fields out of a page, preferring Open Graph tags and
/// falling back to Twitter cards and plain HTML.
pub fn scrape(html: &str, page_url: &str) -> OgData {
    let page = match HTML::from_string(html.to_string(), Some(page_url.to_string())) {
        Ok(page) => page,
        Err(e) => return OgData::failed(page_url, format!("unreadable page: {}", e)),
    };
    let og = &page.opengraph.properties;
    let meta = |key: &str| non_empty(page.meta.get(key));

    let title = non_empty(og.get("title"))
        .or_else(|| meta("twitter:title"))
        .or_else(|| non_empty(page.title.as_ref()));
    let description = non_empty(og.get("description"))
        .or_else(|| meta("twitter:description"))
        .or_else(|| non_empty(page.description.as_ref()));
    let image = page
        .opengraph
        .images
        .iter()
        .find_map(|image| non_empty(Some(&image.url)))
        .or_else(|| meta("twitter:image"))
        .or_else(|| meta("twitter:image:src"))
        .map(|image| resolve_url(page_url, &image));
    let site_name = non_empty(og.get("site_name")).or_else(|| meta("application-name"));
    let url = non_empty(og.get("url")).unwrap_or_else(|| page_url.to_string());

    OgData {
        url,
        title,
        description,
        image,
        site_name,
        error: None,
    }
}

fn resolve_url(base: &str, link: &str) -> String {
    Url::parse(base)
        .and_then(|base| base.join(link))
        .map(|u| u.to_string())
        .unwrap_or_else(|_| link.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_graph_tags() {
        let html = r#"<html><head>
<title>Fallback</title>
<meta property="og:title" content="Rust &amp; You">
<meta content='A &quot;short&quot; intro' property='og:description' />
<meta property="og:image" content="/img/cover.png">
<meta property="og:site_name" content="Example">
</head></html>"#;
        let og = scrape(html, "https://example.com/posts/1");

        assert_eq!(og.url, "https://example.com/posts/1");
        assert_eq!(og.title.as_deref(), Some("Rust & You"));
        assert_eq!(og.description.as_deref(), Some("A \"short\" intro"));
        assert_eq!(og.image.as_deref(), Some("https://example.com/img/cover.png"));
        assert_eq!(og.site_name.as_deref(), Some("Example"));
        assert_eq!(og.error, None);
    }

    #[test]
    fn test_unquoted_and_awkward_attributes() {
        let html = r#"<html><head>
<meta property=og:image content=https://cdn.example.com/a.png>
<meta property="og:title" content="a > b">
<title>Fallback</title>
</head></html>"#;
        let og = scrape(html, "https://example.com/p");

        assert_eq!(og.image.as_deref(), Some("https://cdn.example.com/a.png"));
        assert_eq!(og.title.as_deref(), Some("a > b"));
    }

    #[test]
    fn test_fallbacks() {
        let html = r#"<HTML><HEAD><TITLE> Plain page &#8211; home </TITLE>
<META NAME="description" CONTENT="Just a page">
<meta name="twitter:image" content="https://cdn.example.com/x.jpg">
</HEAD></HTML>"#;
        let og = scrape(html, "https://example.com/");

        assert_eq!(og.title.as_deref(), Some("Plain page \u{2013} home"));
        assert_eq!(og.description.as_deref(), Some("Just a page"));
        assert_eq!(og.image.as_deref(), Some("https://cdn.example.com/x.jpg"));
        assert_eq!(og.site_name, None);
    }

    #[test]
    fn test_empty_page() {
        let og = scrape("", "https://example.com/");
        assert_eq!(og, OgData { url: "https://example.com/".to_string(), ..Default::default() });
    }
}
