//! Small helpers for walking a rendered document.

use scraper::{ElementRef, Html, Selector};

/// Compile a selector that is known to be valid at build time
pub(crate) fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid selector `{css}`: {e}"))
}

/// Text of an element with each text node trimmed and joined by `separator`
pub fn joined_text(element: ElementRef<'_>, separator: &str) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|fragment| !fragment.is_empty())
        .collect::<Vec<_>>()
        .join(separator)
}

/// Text of an element, `None` when it has none
pub fn element_text(element: ElementRef<'_>) -> Option<String> {
    Some(joined_text(element, " ")).filter(|text| !text.is_empty())
}

/// Text of the first element matching `selector` that has any
pub fn first_text(document: &Html, selector: &Selector) -> Option<String> {
    document.select(selector).find_map(element_text)
}

/// Text of every match, in document order, skipping empties
pub fn all_texts(document: &Html, selector: &Selector) -> Vec<String> {
    document.select(selector).filter_map(element_text).collect()
}

/// Text held directly by `element`, ignoring descendants
pub fn own_text(element: ElementRef<'_>) -> String {
    element
        .children()
        .filter_map(|node| node.value().as_text())
        .map(|text| text.trim())
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Next sibling element with the given tag name
pub fn next_sibling_named<'a>(element: ElementRef<'a>, name: &str) -> Option<ElementRef<'a>> {
    element
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .find(|sibling| sibling.value().name() == name)
}

/// Lazy-loaded images keep the real URL in `data-src`
pub fn image_source<'a>(element: ElementRef<'a>) -> Option<&'a str> {
    element
        .value()
        .attr("data-src")
        .or_else(|| element.value().attr("src"))
        .filter(|src| !src.trim().is_empty())
}
