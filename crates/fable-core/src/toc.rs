//! Table-of-contents extraction from article HTML.
//!
//! Mirrors what the article page does with the rendered DOM: collect the
//! h2/h3 headings in order, give each one a stable `heading-N` anchor id,
//! and hand the list to the TOC renderer. Here the ids are injected into
//! the HTML server-side and the entries returned alongside it.

use fable_types::models::TocEntry;

/// Scan `html` for h2/h3 headings. Returns the HTML with an
/// `id="heading-N"` attribute injected into each heading tag, plus the
/// extracted entries in document order. Content without headings passes
/// through unchanged.
pub fn build(html: &str) -> (String, Vec<TocEntry>) {
    let mut out = String::with_capacity(html.len() + 64);
    let mut entries: Vec<TocEntry> = Vec::new();
    let mut pos = 0;

    while let Some(offset) = html[pos..].find('<') {
        let lt = pos + offset;
        out.push_str(&html[pos..lt]);

        match heading_at(html, lt, entries.len()) {
            Some((rendered, entry, consumed)) => {
                out.push_str(&rendered);
                entries.push(entry);
                pos = lt + consumed;
            }
            None => {
                out.push('<');
                pos = lt + 1;
            }
        }
    }

    out.push_str(&html[pos..]);
    (out, entries)
}

/// If a well-formed h2/h3 element starts at byte `lt`, returns the element
/// rewritten with the anchor id, the TOC entry, and how many input bytes
/// the element spans.
fn heading_at(html: &str, lt: usize, index: usize) -> Option<(String, TocEntry, usize)> {
    let rest = &html[lt..];
    let level = heading_level(rest)?;

    // End of the opening tag; "<h2" may be followed by attributes.
    let open_end = rest.find('>')?;
    let close_tag = if level == 2 { "</h2>" } else { "</h3>" };
    let body_start = open_end + 1;
    let close_rel = find_ci(&rest[body_start..], close_tag)?;

    let inner = &rest[body_start..body_start + close_rel];
    let anchor = format!("heading-{index}");
    let entry = TocEntry {
        level,
        anchor: anchor.clone(),
        text: strip_tags(inner),
    };

    // "<h2" + id attribute + original attributes + ">" + body + close tag
    let mut rendered = String::with_capacity(rest.len().min(open_end + close_rel + 32));
    rendered.push_str(&rest[..3]);
    rendered.push_str(" id=\"");
    rendered.push_str(&anchor);
    rendered.push('"');
    rendered.push_str(&rest[3..body_start]);
    rendered.push_str(inner);
    rendered.push_str(close_tag);

    let consumed = body_start + close_rel + close_tag.len();
    Some((rendered, entry, consumed))
}

fn heading_level(rest: &str) -> Option<u8> {
    let bytes = rest.as_bytes();
    if bytes.len() < 4 || bytes[0] != b'<' || !bytes[1].eq_ignore_ascii_case(&b'h') {
        return None;
    }
    let level = match bytes[2] {
        b'2' => 2,
        b'3' => 3,
        _ => return None,
    };
    // Reject e.g. "<h2x" while accepting "<h2>" and "<h2 class=..>"
    match bytes[3] {
        b'>' | b' ' | b'\t' | b'\n' | b'\r' => Some(level),
        _ => None,
    }
}

/// Case-insensitive substring search (tags may be authored in any case).
fn find_ci(haystack: &str, needle: &str) -> Option<usize> {
    let haystack = haystack.as_bytes();
    let needle = needle.as_bytes();
    haystack
        .windows(needle.len())
        .position(|window| window.eq_ignore_ascii_case(needle))
}

/// Visible text of a heading: inner tags removed, whitespace collapsed.
fn strip_tags(inner: &str) -> String {
    let mut text = String::with_capacity(inner.len());
    let mut in_tag = false;
    for ch in inner.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => text.push(ch),
            _ => {}
        }
    }
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_h2_and_h3_in_order() {
        let html = "<h2>Intro</h2><p>text</p><h3>Detail</h3><h2>Wrap-up</h2>";
        let (rendered, toc) = build(html);

        assert_eq!(toc.len(), 3);
        assert_eq!(toc[0].text, "Intro");
        assert_eq!(toc[0].level, 2);
        assert_eq!(toc[1].text, "Detail");
        assert_eq!(toc[1].level, 3);
        assert_eq!(toc[2].anchor, "heading-2");
        assert!(rendered.contains("<h2 id=\"heading-0\">Intro</h2>"));
        assert!(rendered.contains("<h3 id=\"heading-1\">Detail</h3>"));
    }

    #[test]
    fn preserves_attributes_and_other_markup() {
        let html = "<h2 class=\"fancy\">Title</h2><h4>not toc</h4>";
        let (rendered, toc) = build(html);

        assert_eq!(toc.len(), 1);
        assert!(rendered.contains("<h2 id=\"heading-0\" class=\"fancy\">Title</h2>"));
        assert!(rendered.contains("<h4>not toc</h4>"));
    }

    #[test]
    fn strips_nested_tags_from_entry_text() {
        let html = "<h2>Using <code>serde</code>\n  properly</h2>";
        let (_, toc) = build(html);
        assert_eq!(toc[0].text, "Using serde properly");
    }

    #[test]
    fn content_without_headings_is_unchanged() {
        let html = "<p>1 &lt; 2 is true</p>";
        let (rendered, toc) = build(html);
        assert!(toc.is_empty());
        assert_eq!(rendered, html);
    }

    #[test]
    fn unclosed_heading_is_left_alone() {
        let html = "<h2>never closed";
        let (rendered, toc) = build(html);
        assert!(toc.is_empty());
        assert_eq!(rendered, html);
    }
}
