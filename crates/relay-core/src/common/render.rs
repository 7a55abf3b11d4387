//! HTML rendering for pages and fragments.
//!
//! Two renderers coexist: answers pushed over the event stream use a fixed
//! inline format ([`answer_fragment`]), while pages and acknowledgments are
//! rendered from templates ([`Template`]) with `{{ name }}` placeholders. Every
//! interpolated value is HTML-escaped.

use std::borrow::Cow;

/// Renders the fragment pushed for an answer.
pub fn answer_fragment(id: u64, text: &str) -> String {
    format!("<p id='answer-{id}'>{}</p>", escape_html(text))
}

/// Escapes the characters that are significant in HTML text and attributes.
pub fn escape_html(input: &str) -> Cow<'_, str> {
    if !input.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(input);
    }

    let mut out = String::with_capacity(input.len() + 16);
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    Cow::Owned(out)
}

/// A template compiled into the binary.
///
/// Placeholders are written `{{ name }}` (surrounding whitespace optional).
/// Placeholders without a matching variable render as an empty string.
#[derive(Debug, Clone, Copy)]
pub struct Template {
    source: &'static str,
}

impl Template {
    pub const fn new(source: &'static str) -> Self {
        Self { source }
    }

    pub fn render(&self, vars: &[(&str, &str)]) -> String {
        let mut out = String::with_capacity(self.source.len());
        let mut rest = self.source;

        while let Some(start) = rest.find("{{") {
            let Some(len) = rest[start + 2..].find("}}") else {
                break;
            };
            out.push_str(&rest[..start]);

            let name = rest[start + 2..start + 2 + len].trim();
            if let Some((_, value)) = vars.iter().find(|(key, _)| *key == name) {
                out.push_str(&escape_html(value));
            }
            rest = &rest[start + 2 + len + 2..];
        }

        out.push_str(rest);
        out
    }
}
