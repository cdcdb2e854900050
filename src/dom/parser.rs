use crate::dom::dom_model::{Document, NodeId};
use crate::error::AutofillError;

/// Elements deeper than this are rejected instead of overflowing the
/// recursive tree walks downstream.
pub const MAX_DEPTH: usize = 512;

const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

const RAW_TEXT_TAGS: &[&str] = &["script", "style", "textarea", "title"];

// ============================================================================
// Public entry points
// ============================================================================

/// Parse a full page into a fresh `Document`.
pub fn parse_html(html: &str) -> Result<Document, AutofillError> {
    let mut doc = Document::new();
    let root = doc.root();
    parse_into(&mut doc, root, html)?;
    Ok(doc)
}

/// Parse `html` and append the resulting nodes under `parent`, recording a
/// childList mutation for the top-level nodes that were added.
pub fn append_html(
    doc: &mut Document,
    parent: NodeId,
    html: &str,
) -> Result<Vec<NodeId>, AutofillError> {
    let before = doc.children(parent).len();
    parse_into(doc, parent, html)?;
    let added = doc.children(parent)[before..].to_vec();
    doc.record_child_list(parent, added.clone());
    Ok(added)
}

// ============================================================================
// Tokenizer / tree builder
// ============================================================================

fn parse_into(doc: &mut Document, parent: NodeId, html: &str) -> Result<(), AutofillError> {
    let mut stack = vec![parent];
    let bytes = html.as_bytes();
    let mut i = 0usize;

    while i < bytes.len() {
        if starts_with_at(bytes, i, b"<!--") {
            match find_subslice(bytes, i + 4, b"-->") {
                Some(end) => i = end + 3,
                None => return Err(parse_error("unclosed HTML comment")),
            }
            continue;
        }

        // <!DOCTYPE ...> and other declarations
        if starts_with_at(bytes, i, b"<!") || starts_with_at(bytes, i, b"<?") {
            match find_byte(bytes, i, b'>') {
                Some(end) => i = end + 1,
                None => return Err(parse_error("unclosed declaration")),
            }
            continue;
        }

        if bytes[i] == b'<' && bytes.get(i + 1).is_some_and(|b| *b == b'/') {
            let (tag, next) = parse_end_tag(html, i)?;
            i = next;

            // Ignore stray end tags that match nothing open.
            if let Some(pos) = stack
                .iter()
                .skip(1)
                .rposition(|n| doc.tag_name(*n).is_some_and(|t| t == tag))
            {
                stack.truncate(pos + 1);
            }
            continue;
        }

        if bytes[i] == b'<' && bytes.get(i + 1).is_some_and(|b| b.is_ascii_alphabetic()) {
            let (tag, attrs, self_closing, next) = parse_start_tag(html, i)?;
            i = next;

            let current = *stack.last().ok_or_else(|| parse_error("invalid stack state"))?;
            let node = doc.create_element(current, &tag, attrs);

            if RAW_TEXT_TAGS.contains(&tag.as_str()) && !self_closing {
                let close = find_case_insensitive_end_tag(bytes, i, tag.as_bytes())
                    .ok_or_else(|| parse_error(&format!("unclosed <{}>", tag)))?;
                if let Some(body) = html.get(i..close) {
                    if !body.is_empty() {
                        let text = if tag == "script" || tag == "style" {
                            body.to_string()
                        } else {
                            decode_entities(body)
                        };
                        doc.create_text(node, &text);
                    }
                }
                let (_, after_end) = parse_end_tag(html, close)?;
                i = after_end;
                continue;
            }

            if !self_closing && !VOID_TAGS.contains(&tag.as_str()) {
                if stack.len() > MAX_DEPTH {
                    return Err(parse_error("element nesting too deep"));
                }
                stack.push(node);
            }
            continue;
        }

        let text_start = i;
        i += 1;
        while i < bytes.len() && bytes[i] != b'<' {
            i += 1;
        }

        if let Some(text) = html.get(text_start..i) {
            let current = *stack.last().ok_or_else(|| parse_error("invalid stack state"))?;
            doc.create_text(current, &decode_entities(text));
        }
    }

    Ok(())
}

fn parse_start_tag(
    html: &str,
    at: usize,
) -> Result<(String, Vec<(String, String)>, bool, usize), AutofillError> {
    let bytes = html.as_bytes();
    let mut i = at + 1;

    let tag_start = i;
    while i < bytes.len() && is_tag_char(bytes[i]) {
        i += 1;
    }
    let tag = html
        .get(tag_start..i)
        .ok_or_else(|| parse_error("invalid tag name"))?
        .to_ascii_lowercase();

    let mut attrs: Vec<(String, String)> = Vec::new();
    let mut self_closing = false;

    loop {
        skip_ws(bytes, &mut i);
        if i >= bytes.len() {
            return Err(parse_error(&format!("unclosed start tag <{}>", tag)));
        }

        if bytes[i] == b'>' {
            i += 1;
            break;
        }

        if bytes[i] == b'/' {
            if bytes.get(i + 1) == Some(&b'>') {
                self_closing = true;
                i += 2;
                break;
            }
            i += 1;
            continue;
        }

        let name_start = i;
        while i < bytes.len() && is_attr_name_char(bytes[i]) {
            i += 1;
        }
        let name = html
            .get(name_start..i)
            .ok_or_else(|| parse_error("invalid attribute name"))?
            .to_ascii_lowercase();
        if name.is_empty() {
            // Skip a byte we cannot make sense of rather than failing the page.
            i += 1;
            continue;
        }

        skip_ws(bytes, &mut i);
        let value = if i < bytes.len() && bytes[i] == b'=' {
            i += 1;
            skip_ws(bytes, &mut i);
            parse_attr_value(html, &mut i)?
        } else {
            String::new()
        };

        // First occurrence wins, as in browsers.
        if !attrs.iter().any(|(k, _)| *k == name) {
            attrs.push((name, value));
        }
    }

    Ok((tag, attrs, self_closing, i))
}

fn parse_end_tag(html: &str, at: usize) -> Result<(String, usize), AutofillError> {
    let bytes = html.as_bytes();
    let mut i = at + 2;
    skip_ws(bytes, &mut i);

    let tag_start = i;
    while i < bytes.len() && is_tag_char(bytes[i]) {
        i += 1;
    }
    let tag = html
        .get(tag_start..i)
        .ok_or_else(|| parse_error("invalid end tag"))?
        .to_ascii_lowercase();

    match find_byte(bytes, i, b'>') {
        Some(end) => Ok((tag, end + 1)),
        None => Err(parse_error("unclosed end tag")),
    }
}

fn parse_attr_value(html: &str, i: &mut usize) -> Result<String, AutofillError> {
    let bytes = html.as_bytes();
    if *i >= bytes.len() {
        return Err(parse_error("missing attribute value"));
    }

    if bytes[*i] == b'\'' || bytes[*i] == b'"' {
        let quote = bytes[*i];
        *i += 1;
        let start = *i;
        while *i < bytes.len() && bytes[*i] != quote {
            *i += 1;
        }
        if *i >= bytes.len() {
            return Err(parse_error("unclosed quoted attribute value"));
        }
        let value = html
            .get(start..*i)
            .ok_or_else(|| parse_error("invalid attribute value"))?;
        *i += 1;
        return Ok(decode_entities(value));
    }

    let start = *i;
    while *i < bytes.len() && !bytes[*i].is_ascii_whitespace() && bytes[*i] != b'>' {
        *i += 1;
    }
    let value = html
        .get(start..*i)
        .ok_or_else(|| parse_error("invalid attribute value"))?;
    Ok(decode_entities(value))
}

// ============================================================================
// Helpers
// ============================================================================

fn parse_error(msg: &str) -> AutofillError {
    AutofillError::HtmlParse(msg.to_string())
}

fn starts_with_at(bytes: &[u8], at: usize, needle: &[u8]) -> bool {
    bytes.len() >= at + needle.len() && &bytes[at..at + needle.len()] == needle
}

fn find_subslice(bytes: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    if from > bytes.len() {
        return None;
    }
    bytes[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}

fn find_byte(bytes: &[u8], from: usize, needle: u8) -> Option<usize> {
    bytes.get(from..)?.iter().position(|b| *b == needle).map(|p| p + from)
}

fn find_case_insensitive_end_tag(bytes: &[u8], from: usize, tag: &[u8]) -> Option<usize> {
    let mut i = from;
    while i + 2 + tag.len() <= bytes.len() {
        if bytes[i] == b'<'
            && bytes[i + 1] == b'/'
            && bytes[i + 2..i + 2 + tag.len()].eq_ignore_ascii_case(tag)
        {
            return Some(i);
        }
        i += 1;
    }
    None
}

fn skip_ws(bytes: &[u8], i: &mut usize) {
    while *i < bytes.len() && bytes[*i].is_ascii_whitespace() {
        *i += 1;
    }
}

fn is_tag_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b':'
}

fn is_attr_name_char(b: u8) -> bool {
    !b.is_ascii_whitespace() && !matches!(b, b'=' | b'>' | b'/' | b'"' | b'\'' | b'<')
}

/// Decode the character references that matter for attribute values and
/// label text. Unknown references are kept verbatim.
pub fn decode_entities(src: &str) -> String {
    if !src.contains('&') {
        return src.to_string();
    }

    let mut out = String::with_capacity(src.len());
    let mut rest = src;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];

        let Some(semi) = rest.find(';').filter(|s| *s <= 10) else {
            out.push('&');
            rest = &rest[1..];
            continue;
        };

        let entity = &rest[1..semi];
        let decoded = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            "nbsp" => Some('\u{a0}'),
            _ if entity.starts_with("#x") || entity.starts_with("#X") => {
                u32::from_str_radix(&entity[2..], 16).ok().and_then(char::from_u32)
            }
            _ if entity.starts_with('#') => entity[1..].parse().ok().and_then(char::from_u32),
            _ => None,
        };

        match decoded {
            Some(ch) => {
                out.push(ch);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
