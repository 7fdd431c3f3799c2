use scraper::Html;

/// Normalize scraped text: strip HTML tags, unescape entities, collapse
/// whitespace. Feed summaries routinely arrive as HTML fragments.
pub fn clean_text(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let fragment = Html::parse_fragment(text);
    let stripped: String = fragment
        .root_element()
        .text()
        .collect::<Vec<_>>()
        .join(" ");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}
