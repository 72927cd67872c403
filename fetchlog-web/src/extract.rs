//! HTML extraction: title, first `<h1>` and a capped list of unique links.
//!
//! Entity decoding is done by the HTML parser; [`clean_text`] only deals
//! with whitespace. Output is a pure function of `(html, base, cap)`.
use std::collections::HashSet;

use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use url::Url;

/// One outbound link as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkEntry {
    pub text: String,
    pub href: String,
}

/// Facts pulled out of a single document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extracted {
    pub title: String,
    pub heading: String,
    pub links: Vec<LinkEntry>,
}

/// Collapse every whitespace run (newlines, tabs, NBSP, ...) into one space
/// and trim the ends.
///
/// ```
/// use fetchlog_web::clean_text;
///
/// assert_eq!(clean_text("  Hello\n\t\u{a0} World "), "Hello World");
/// assert_eq!(clean_text(" \n "), "");
/// ```
pub fn clean_text(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Extract title, first heading and at most `link_cap` links from `html`.
///
/// Links are taken from `a[href]` in document order. Blank hrefs are
/// skipped, relative ones are resolved against `base` (an href that does
/// not resolve is kept as written), and duplicates are dropped by
/// case-insensitive comparison of the final href.
///
/// ```
/// use fetchlog_web::extract;
/// use url::Url;
///
/// let base = Url::parse("https://e.co/").unwrap();
/// let html = r#"<title>Hello&nbsp;World</title><a href="/x">  link  </a>"#;
/// let out = extract(html, &base, 10);
/// assert_eq!(out.title, "Hello World");
/// assert_eq!(out.links[0].text, "link");
/// assert_eq!(out.links[0].href, "https://e.co/x");
/// ```
pub fn extract(html: &str, base: &Url, link_cap: usize) -> Extracted {
    let doc = Html::parse_document(html);
    Extracted {
        title: first_text(&doc, "title"),
        heading: first_text(&doc, "h1"),
        links: links(&doc, base, link_cap),
    }
}

fn first_text(doc: &Html, css: &str) -> String {
    let Ok(sel) = Selector::parse(css) else {
        return String::new();
    };
    doc.select(&sel)
        .next()
        .map(|el| inner_text(&el))
        .unwrap_or_default()
}

fn inner_text(el: &ElementRef<'_>) -> String {
    clean_text(&el.text().collect::<String>())
}

fn links(doc: &Html, base: &Url, cap: usize) -> Vec<LinkEntry> {
    let Ok(sel) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let mut out = Vec::new();
    let mut seen = HashSet::new();
    for anchor in doc.select(&sel) {
        if out.len() >= cap {
            break;
        }
        let raw = anchor.value().attr("href").unwrap_or_default().trim();
        if raw.is_empty() {
            continue;
        }
        let href = base
            .join(raw)
            .map(|u| u.to_string())
            .unwrap_or_else(|_| raw.to_string());
        if !seen.insert(href.to_lowercase()) {
            continue;
        }
        let text = inner_text(&anchor);
        out.push(LinkEntry {
            text: if text.is_empty() { href.clone() } else { text },
            href,
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://e.co/docs/index.html").unwrap()
    }

    #[test]
    fn title_and_heading_are_cleaned() {
        let html = "<html><head><title>\n  A &amp; B\t</title></head>\
                    <body><h1> First <em>one</em></h1><h1>Second</h1></body></html>";
        let out = extract(html, &base(), 10);
        assert_eq!(out.title, "A & B");
        assert_eq!(out.heading, "First one");
    }

    #[test]
    fn missing_nodes_yield_empty_strings() {
        let out = extract("<p>nothing here</p>", &base(), 10);
        assert_eq!(out, Extracted::default());
    }

    #[test]
    fn relative_links_resolve_against_the_page() {
        let html = r#"<a href="guide.html">Guide</a><a href="../up">Up</a>
                      <a href="https://other.org/x">Ext</a>"#;
        let hrefs: Vec<String> = extract(html, &base(), 10)
            .links
            .into_iter()
            .map(|l| l.href)
            .collect();
        assert_eq!(
            hrefs,
            vec![
                "https://e.co/docs/guide.html",
                "https://e.co/up",
                "https://other.org/x",
            ]
        );
    }

    #[test]
    fn duplicates_are_case_insensitive_and_do_not_count() {
        let html = r#"
            <a href="/A">one</a>
            <a href="/a">dup</a>
            <a href="HTTPS://E.CO/A">dup again</a>
            <a href="/b">two</a>
            <a href="/c">three</a>
            <a href="/d">four</a>"#;
        let out = extract(html, &base(), 3);
        let texts: Vec<&str> = out.links.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["one", "two", "three"]);
    }

    #[test]
    fn unique_count_is_min_of_distinct_and_cap() {
        // N = 6 anchors, D = 2 duplicates
        let html = r#"<a href="/1">1</a><a href="/2">2</a><a href="/1">1</a>
                      <a href="/3">3</a><a href="/2">2</a><a href="/4">4</a>"#;
        assert_eq!(extract(html, &base(), 10).links.len(), 4);
        assert_eq!(extract(html, &base(), 2).links.len(), 2);
        assert!(extract(html, &base(), 0).links.is_empty());
    }

    #[test]
    fn blank_hrefs_are_skipped_and_blank_text_uses_href() {
        let html = "<a href=\"  \">empty</a><a href=\"/x\"> \n\u{a0} </a><a>no href</a>";
        let out = extract(html, &base(), 10);
        assert_eq!(
            out.links,
            vec![LinkEntry {
                text: "https://e.co/x".into(),
                href: "https://e.co/x".into(),
            }]
        );
    }

    #[test]
    fn unresolvable_href_is_kept_verbatim() {
        let html = r#"<a href="http://[oops">broken</a>"#;
        let out = extract(html, &base(), 10);
        assert_eq!(out.links.len(), 1);
        assert_eq!(out.links[0].href, "http://[oops");
        assert_eq!(out.links[0].text, "broken");
    }

    #[test]
    fn extraction_is_deterministic() {
        let html = r#"<title>t</title><a href="/a">a</a><a href="/b">b</a>"#;
        assert_eq!(extract(html, &base(), 5), extract(html, &base(), 5));
    }
}
