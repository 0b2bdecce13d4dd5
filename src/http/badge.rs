//! Flat SVG status badges.

/// Badge value background.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadgeColor {
    /// Daily counters.
    Green,
    /// Cumulative counters.
    Blue,
}

impl BadgeColor {
    fn hex(self) -> &'static str {
        match self {
            Self::Green => "#4c1",
            Self::Blue => "#007ec6",
        }
    }
}

/// Content type of a rendered badge.
pub const BADGE_CONTENT_TYPE: &str = "image/svg+xml;charset=utf-8";

const CHAR_WIDTH: usize = 7;
const PADDING: usize = 10;

/// Render a two-part `label | value` badge.
#[must_use]
pub fn render(label: &str, value: &str, color: BadgeColor) -> String {
    let label_width = text_width(label);
    let value_width = text_width(value);
    let width = label_width + value_width;
    let label_x = label_width / 2;
    let value_x = label_width + value_width / 2;
    let fill = color.hex();
    let label = escape(label);
    let value = escape(value);

    format!(
        r##"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="20" role="img" aria-label="{label}: {value}"><title>{label}: {value}</title><linearGradient id="s" x2="0" y2="100%"><stop offset="0" stop-color="#bbb" stop-opacity=".1"/><stop offset="1" stop-opacity=".1"/></linearGradient><clipPath id="r"><rect width="{width}" height="20" rx="3" fill="#fff"/></clipPath><g clip-path="url(#r)"><rect width="{label_width}" height="20" fill="#555"/><rect x="{label_width}" width="{value_width}" height="20" fill="{fill}"/><rect width="{width}" height="20" fill="url(#s)"/></g><g fill="#fff" text-anchor="middle" font-family="Verdana,Geneva,DejaVu Sans,sans-serif" font-size="11"><text x="{label_x}" y="14">{label}</text><text x="{value_x}" y="14">{value}</text></g></svg>"##
    )
}

fn text_width(text: &str) -> usize {
    text.chars().count() * CHAR_WIDTH + PADDING
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}
