//! Reply formatting for Telegram HTML parse mode.

use crate::ports::Quote;

/// Escape HTML special characters for Telegram HTML parse mode.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// `<i>text - author</i>`
pub fn format_quote(quote: &Quote) -> String {
    format!(
        "<i>{} - {}</i>",
        escape_html(quote.text.trim()),
        escape_html(quote.author.trim())
    )
}

/// Render program output for fixed-width display: every line becomes its own
/// `<code>` span so long outputs stay monospaced line by line.
///
/// The raw output is cut to fit `max_len` once markup is added. A line that
/// does not fit is cut mid-line, and the cut is marked with a trailing `…` line.
pub fn format_code_output(output: &str, max_len: usize) -> String {
    let lines: Vec<&str> = output.trim_end_matches('\n').split('\n').collect();

    let mut out = String::new();
    for line in lines {
        let rendered = render_code_line(line);
        // Room for the newline and a possible truncation marker.
        let needed = rendered.len() + 1 + TRUNCATION_MARK.len();
        if out.len() + needed > max_len {
            let room = max_len
                .saturating_sub(out.len() + CODE_MARKUP_LEN + 1 + TRUNCATION_MARK.len());
            let head = escaped_prefix(line.trim_end_matches('\r'), room);
            if !head.is_empty() {
                out.push_str(&render_code_line(head));
                out.push('\n');
            }
            out.push_str(TRUNCATION_MARK);
            return out;
        }
        out.push_str(&rendered);
        out.push('\n');
    }

    out.truncate(out.trim_end_matches('\n').len());
    out
}

const TRUNCATION_MARK: &str = "…";
const CODE_MARKUP_LEN: usize = "<code></code>".len();

fn render_code_line(line: &str) -> String {
    let line = line.trim_end_matches('\r');
    if line.is_empty() {
        // Empty <code></code> spans are rejected by Telegram.
        return String::new();
    }
    format!("<code>{}</code>", escape_html(line))
}

/// Longest prefix of `line` whose escaped form fits in `room` bytes.
fn escaped_prefix(line: &str, room: usize) -> &str {
    let mut used = 0;
    for (idx, ch) in line.char_indices() {
        used += match ch {
            '&' => "&amp;".len(),
            '<' | '>' => "&lt;".len(),
            '"' => "&quot;".len(),
            _ => ch.len_utf8(),
        };
        if used > room {
            return &line[..idx];
        }
    }
    line
}

/// Whether a picture URI should go out as a document (animated GIF) rather
/// than as a plain link.
pub fn is_gif_uri(uri: &str) -> bool {
    let path = uri.split(['?', '#']).next().unwrap_or(uri);
    path.to_ascii_lowercase().ends_with("gif")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_html() {
        assert_eq!(escape_html("a < b && c > \"d\""), "a &lt; b &amp;&amp; c &gt; &quot;d&quot;");
    }

    #[test]
    fn quote_is_italic_and_escaped() {
        let q = Quote {
            text: "Less is <more> ".to_string(),
            author: "Mies".to_string(),
        };
        assert_eq!(format_quote(&q), "<i>Less is &lt;more&gt; - Mies</i>");
    }

    #[test]
    fn code_output_wraps_each_line() {
        assert_eq!(
            format_code_output("hello\n\nx < y\n", 4096),
            "<code>hello</code>\n\n<code>x &lt; y</code>"
        );
    }

    #[test]
    fn code_output_is_cut_to_limit() {
        let output = "line\n".repeat(100);
        let out = format_code_output(&output, 64);
        assert!(out.len() <= 64);
        assert!(out.ends_with(TRUNCATION_MARK));
        assert!(out.starts_with("<code>line</code>\n"));
    }

    #[test]
    fn single_long_line_is_cut_not_dropped() {
        let out = format_code_output(&format!("{}\n", "x".repeat(5000)), 4096);
        assert_eq!(out.len(), 4096);
        assert_eq!(out, format!("<code>{}</code>\n…", "x".repeat(4079)));
    }

    #[test]
    fn long_line_after_short_ones_keeps_its_head() {
        let out = format_code_output(&format!("ok\n{}", "y".repeat(5000)), 64);
        assert_eq!(out, format!("<code>ok</code>\n<code>{}</code>\n…", "y".repeat(31)));
    }

    #[test]
    fn cut_never_splits_an_escape_or_a_char() {
        // 26 = markup (13) + newline + mark (3) + 9 bytes of escaped text.
        assert_eq!(
            format_code_output(&"<".repeat(10), 26),
            "<code>&lt;&lt;</code>\n…"
        );
        let out = format_code_output(&"é".repeat(100), 26);
        assert_eq!(out, format!("<code>{}</code>\n…", "é".repeat(4)));
    }

    #[test]
    fn gif_detection_ignores_query_and_case() {
        assert!(is_gif_uri("http://wx1.sinaimg.cn/large/abc.gif"));
        assert!(is_gif_uri("http://host/a.GIF?x=1"));
        assert!(!is_gif_uri("http://host/a.jpg"));
    }
}
