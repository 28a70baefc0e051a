//! HTML parser for listing, pagination and detail pages
//!
//! This module handles reading values out of fetched documents:
//! - Draft records from the repeated listing blocks
//! - The total page count from the pagination control
//! - The canonical address from a school's detail page
//!
//! Extraction is per item: a malformed listing block is skipped, never
//! fatal to the page.

use crate::crawler::fetcher::Document;
use crate::record::{split_address, Record};
use crate::{ParseError, ParseResult};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use url::{Position, Url};

static DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("digit pattern is valid"));

const LISTING_BLOCK: &str = "div#search-results > div.row";
const PAGE_ITEM: &str = "li.page-item";
const MAP_ADDRESS: &str = "span.map-address";

fn selector(css: &'static str) -> ParseResult<Selector> {
    Selector::parse(css).map_err(|_| ParseError::Selector(css.to_string()))
}

/// Concatenates the element's text nodes, each trimmed, skipping blanks
fn stripped_text(element: ElementRef<'_>) -> String {
    element.text().map(str::trim).collect()
}

/// Returns every listing block on the page as a draft record
///
/// Blocks missing a title, link, address, state abbreviation or numeric id
/// are skipped and logged at debug level.
pub fn parse_listing(document: &Document) -> ParseResult<Vec<Record>> {
    let html = document.html();
    let block_selector = selector(LISTING_BLOCK)?;
    let fields = BlockSelectors::new()?;

    let mut records = Vec::new();
    for block in html.select(&block_selector) {
        match parse_block(block, &fields, &document.url) {
            Ok(record) => records.push(record),
            Err(e) => tracing::debug!("Skipping listing block on {}: {}", document.url, e),
        }
    }

    Ok(records)
}

struct BlockSelectors {
    title: Selector,
    address: Selector,
    div: Selector,
    label: Selector,
}

impl BlockSelectors {
    fn new() -> ParseResult<Self> {
        Ok(Self {
            title: selector("h5")?,
            address: selector("p.primary-site")?,
            div: selector("div")?,
            label: selector("b")?,
        })
    }
}

fn parse_block(block: ElementRef<'_>, fields: &BlockSelectors, base: &Url) -> ParseResult<Record> {
    let title = block
        .select(&fields.title)
        .next()
        .ok_or(ParseError::MissingElement("h5 title"))?;

    let href = title
        .parent()
        .and_then(ElementRef::wrap)
        .and_then(|link| link.value().attr("href"))
        .ok_or(ParseError::MissingAttribute {
            element: "title link",
            attr: "href",
        })?;
    let url = base.join(href.trim())?;

    let raw_address = block
        .select(&fields.address)
        .next()
        .map(stripped_text)
        .ok_or(ParseError::MissingElement("p.primary-site address"))?;

    let (city, state, address) =
        split_address(&raw_address).ok_or_else(|| ParseError::MissingState(raw_address.clone()))?;

    let id = extract_id(&url).ok_or_else(|| ParseError::MissingId(url.to_string()))?;

    let mut record = Record {
        id,
        url: url.to_string(),
        name: stripped_text(title),
        address,
        city,
        state,
        category: String::new(),
        level_code: String::new(),
    };

    for div in block.select(&fields.div) {
        let Some(label) = div.select(&fields.label).next() else {
            continue;
        };
        let label = label.text().collect::<String>().to_lowercase();

        if label.contains("level") {
            record.level_code = value_after_label(div);
        }
        if label.contains("sector") {
            record.category = value_after_label(div);
        }
    }

    Ok(record)
}

/// Text of a `<div><b>Label</b> value</div>` pair without its first word
fn value_after_label(div: ElementRef<'_>) -> String {
    let text = div.text().collect::<String>();
    text.trim().split(' ').skip(1).collect::<Vec<_>>().join(" ")
}

/// First run of digits in the URL's path and query
fn extract_id(url: &Url) -> Option<String> {
    DIGITS
        .find(&url[Position::BeforePath..])
        .map(|m| m.as_str().to_string())
}

/// Reads the total page count from the pagination control
///
/// The second-to-last page item holds the last page number, possibly with
/// thousands separators (`"1,234"`).
pub fn parse_page_count(document: &Document) -> ParseResult<u32> {
    page_count_from_html(&document.html())
}

fn page_count_from_html(html: &Html) -> ParseResult<u32> {
    let item_selector = selector(PAGE_ITEM)?;
    let link_selector = selector("a")?;

    let items: Vec<ElementRef<'_>> = html.select(&item_selector).collect();
    if items.len() < 2 {
        return Err(ParseError::Pagination(format!(
            "expected at least 2 page items, found {}",
            items.len()
        )));
    }

    let text = items[items.len() - 2]
        .select(&link_selector)
        .next()
        .map(stripped_text)
        .ok_or_else(|| ParseError::Pagination("page item has no link".to_string()))?;

    parse_count(&text)
}

/// Parses a page count, ignoring thousands separators
pub fn parse_count(text: &str) -> ParseResult<u32> {
    text.trim()
        .replace(',', "")
        .parse()
        .map_err(|_| ParseError::Pagination(format!("'{}' is not a page number", text)))
}

/// Reads the canonical address from a school's detail page
pub fn parse_canonical_address(document: &Document) -> ParseResult<String> {
    let html = document.html();
    let span = html
        .select(&selector(MAP_ADDRESS)?)
        .next()
        .ok_or(ParseError::MissingElement("span.map-address"))?;

    span.value()
        .attr("data-address")
        .map(|address| address.trim().to_string())
        .ok_or(ParseError::MissingAttribute {
            element: "span.map-address",
            attr: "data-address",
        })
}
