//! Route template translation.
//!
//! A template is a page path relative to the site root with its `.html`
//! suffix removed, e.g. `blog/[slug]` or `docs/[...path]`. Two marker forms
//! are recognised:
//!
//! | Marker        | Matches                                         |
//! |---------------|-------------------------------------------------|
//! | `[name]`      | one or more of `A-Z a-z 0-9 _ . = -`            |
//! | `[...name]`   | one or more of the same set plus `/`            |
//!
//! `name` must be one or more word characters (`A-Z a-z 0-9 _`). Anything
//! else, including every regex metacharacter, is matched literally.

/// Character class for a single dynamic segment.
pub const SEGMENT_CLASS: &str = "[a-zA-Z0-9_.=-]+";

/// Character class for a catch-all segment.
pub const CATCH_ALL_CLASS: &str = "[a-zA-Z0-9_.=/-]+";

/// A dynamic marker found in a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    /// `[name]`
    Segment,
    /// `[...name]`
    CatchAll,
}

impl Marker {
    fn class(self) -> &'static str {
        match self {
            Marker::Segment => SEGMENT_CLASS,
            Marker::CatchAll => CATCH_ALL_CLASS,
        }
    }
}

/// Translate a template into an anchored regex source string.
pub fn translate(template: &str) -> String {
    let mut out = String::with_capacity(template.len() + 16);
    out.push('^');

    let mut literal_start = 0;
    let mut pos = 0;
    while let Some(offset) = template[pos..].find('[') {
        let open = pos + offset;
        match parse_marker(&template[open..]) {
            Some((marker, len)) => {
                out.push_str(&regex::escape(&template[literal_start..open]));
                out.push_str(marker.class());
                pos = open + len;
                literal_start = pos;
            }
            None => pos = open + 1,
        }
    }
    out.push_str(&regex::escape(&template[literal_start..]));

    out.push('$');
    out
}

/// Byte index of the first `[` in a template, if any.
///
/// Used as a textual proxy for specificity when ordering routes.
pub fn first_dynamic_index(template: &str) -> Option<usize> {
    template.find('[')
}

/// Parse a marker at the start of `s`; returns it and its byte length.
fn parse_marker(s: &str) -> Option<(Marker, usize)> {
    let inner = s.strip_prefix('[')?;
    let (marker, name) = match inner.strip_prefix("...") {
        Some(rest) => (Marker::CatchAll, rest),
        None => (Marker::Segment, inner),
    };

    let name_len = name
        .bytes()
        .take_while(|b| b.is_ascii_alphanumeric() || *b == b'_')
        .count();
    if name_len == 0 || name.as_bytes().get(name_len) != Some(&b']') {
        return None;
    }

    let prefix_len = s.len() - name.len();
    Some((marker, prefix_len + name_len + 1))
}
