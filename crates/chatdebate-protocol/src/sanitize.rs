use once_cell::sync::Lazy;
use regex::Regex;

static SCRIPT_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<script[^>]*>.*?</script>").expect("static script-tag pattern")
});

static EVENT_ATTR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)on\w+\s*=\s*("[^"]*"|'[^']*')"#).expect("static event-attr pattern"));

/// Strip `<script…>…</script>` blocks and inline `on*=` event attributes,
/// then HTML-entity-escape the five reserved characters, in that order.
/// Entity-escaping is applied last and `&` is escaped first within it so the
/// escaping of `< > " '` is never itself re-escaped; running this twice on
/// already-sanitized content is a no-op beyond this function's own output.
pub fn sanitize_content(content: &str) -> String {
    let stripped = SCRIPT_TAG.replace_all(content, "");
    let stripped = EVENT_ATTR.replace_all(&stripped, "");
    escape_entities(&stripped)
}

const ENTITIES: [&str; 5] = ["&amp;", "&lt;", "&gt;", "&quot;", "&#x27;"];

/// Escapes `& < > " '`. An `&` that already begins one of the five entities
/// above is left alone, which is what makes this idempotent on input that
/// has already been through this function.
fn escape_entities(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(c) = rest.chars().next() {
        let c_len = c.len_utf8();
        match c {
            '&' if ENTITIES.iter().any(|e| rest.starts_with(e)) => out.push('&'),
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            other => out.push(other),
        }
        rest = &rest[c_len..];
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_script_tag_entirely() {
        let out = sanitize_content("<script>alert(1)</script>hello");
        assert_eq!(out, "hello");
    }

    #[test]
    fn strips_script_tag_case_insensitive_with_attrs() {
        let out = sanitize_content("<SCRIPT type=\"text/javascript\">evil()</SCRIPT>hi");
        assert_eq!(out, "hi");
    }

    #[test]
    fn strips_event_attribute() {
        let out = sanitize_content(r#"<img src="x" onerror="alert(1)">"#);
        assert!(!out.to_lowercase().contains("onerror"));
    }

    #[test]
    fn escapes_remaining_entities() {
        let out = sanitize_content("5 > 3 & 2 < 4 \"quote\" 'apos'");
        assert_eq!(out, "5 &gt; 3 &amp; 2 &lt; 4 &quot;quote&quot; &#x27;apos&#x27;");
    }

    #[test]
    fn never_contains_literal_script_tag_or_event_attr() {
        let samples = [
            "<script src=evil.js>x</script>",
            "plain text",
            "<div onclick='x()'>click</div>",
            "<<script>script>nested</script>",
        ];
        for s in samples {
            let out = sanitize_content(s);
            assert!(!out.to_lowercase().contains("<script"));
            assert!(!Regex::new(r"(?i)on\w+=").unwrap().is_match(&out));
        }
    }

    #[test]
    fn idempotent_on_already_sanitized_input() {
        let once = sanitize_content("<script>x</script>5 > 3");
        let twice = sanitize_content(&once);
        assert_eq!(once, twice);
    }
}
