//! Builds a small Atom feed and a matching HTML page, printing both.
//!
//! Run with `RUST_LOG=xmlscribe=debug` to see the builder's log output.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use xmlscribe::{Document, HtmlDocument, Namespace, RenderOptions};

struct Post {
    id: u32,
    title: &'static str,
    summary: &'static str,
    body: &'static str,
}

const POSTS: &[Post] = &[
    Post {
        id: 1,
        title: "Fish & Chips",
        summary: "A review of the best chippy in town &mdash; with photos.",
        body: "<p>Crispy &amp; golden.</p>",
    },
    Post {
        id: 2,
        title: "1 < 2",
        summary: "Notes on ordering &copy; 2024",
        body: "<p>Numbers <em>are</em> fun.</p>",
    },
];

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
        .with(filter)
        .init();
}

fn build_feed() -> xmlscribe::Result<Document> {
    let atom = Namespace::new("http://www.w3.org/2005/Atom");
    let mut doc = Document::new("1.0", "utf-8")?;
    doc.add_document_comment(" generated by the feed demo ")?;

    let feed = doc.add_namespaced_root("feed", "", &atom)?;
    doc.add_element(feed, "title", "Demo Blog")?;
    doc.add_element_with_attributes(feed, "link", "", [("href", "https://example.org/")])?;

    for post in POSTS {
        let entry = doc.add_element(feed, "entry", "")?;
        doc.add_element(entry, "id", &format!("urn:post:{}", post.id))?;
        doc.add_element(entry, "title", post.title)?;
        doc.add_element(entry, "summary", post.summary)?;
        doc.add_cdata(entry, "content", post.body)?;
    }
    Ok(doc)
}

fn build_page(feed: &Document) -> xmlscribe::Result<HtmlDocument> {
    let mut page = HtmlDocument::default();
    let html = page.add_root_with_attributes("html", "", [("lang", "en")])?;
    let body = page.add_element(html, "body", "")?;
    page.add_element(body, "h1", "Demo Blog")?;

    let Some(feed_root) = feed.root() else {
        return Ok(page);
    };
    for entry in feed.children(feed_root)? {
        if feed.name(entry)? != "entry" {
            continue;
        }
        let article = page.add_element(body, "article", "")?;
        for field in feed.children(entry)? {
            if feed.name(field)? == "title" {
                page.add_element(article, "h2", &feed.text_content(field)?)?;
            }
        }
        page.add_raw_subtree(article, "<p class=\"more\"><a href=\"/read more\">Read more</a></p>")?;
    }
    Ok(page)
}

fn main() -> xmlscribe::Result<()> {
    init_logging();

    let feed = build_feed()?;
    println!("{}", feed.render_xml(&RenderOptions::default().pretty(true)));

    let page = build_page(&feed)?;
    print!("{}", page.render(&RenderOptions::default().pretty(true))?);
    Ok(())
}
