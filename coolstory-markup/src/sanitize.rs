use {markup5ever::Attribute, markup5ever_arcdom::NodeData, std::cell::Ref};

use crate::document::{push_children, Fragment, Step, OPAQUE};

/// Elements kept as they are, minus attributes.
static ALLOWED: &[&str] = &[
    "a", "b", "blockquote", "br", "code", "em", "h2", "h3", "h4", "hr", "i", "li", "ol", "p",
    "pre", "strong", "u", "ul",
];

static VOID: &[&str] = &["br", "hr"];

static SAFE_SCHEMES: &[&str] = &["http://", "https://", "mailto:"];

/// Re-serializes story markup keeping only the allowed elements.
///
/// Opaque elements are dropped along with their content, any other element is
/// unwrapped so its text survives. Only `href` on links survives as an
/// attribute, and only for web and mail links.
pub fn sanitize(input: &str) -> String {
    let fragment = Fragment::from(input);
    let mut out = String::with_capacity(input.len());

    let mut stack = fragment
        .roots()
        .into_iter()
        .rev()
        .map(Step::Enter)
        .collect::<Vec<_>>();

    while let Some(step) = stack.pop() {
        let handle = match step {
            Step::Enter(handle) => handle,
            Step::Leave(tag) => {
                out.push_str("</");
                out.push_str(&tag);
                out.push('>');

                continue;
            }
        };

        match handle.data {
            NodeData::Text { ref contents } => escape_into(&contents.borrow(), false, &mut out),
            NodeData::Element {
                ref name,
                ref attrs,
                ..
            } => {
                let tag: &str = &name.local;

                if OPAQUE.contains(&tag) {
                    continue;
                }

                if !ALLOWED.contains(&tag) {
                    push_children(&handle, &mut stack);

                    continue;
                }

                out.push('<');
                out.push_str(tag);
                if tag == "a" {
                    if let Some(href) = safe_href(attrs.borrow()) {
                        out.push_str(" href=\"");
                        escape_into(&href, true, &mut out);
                        out.push_str("\" rel=\"nofollow noopener\"");
                    }
                }
                out.push('>');

                if VOID.contains(&tag) {
                    continue;
                }

                stack.push(Step::Leave(name.local.clone()));
                push_children(&handle, &mut stack);
            }
            NodeData::Document => push_children(&handle, &mut stack),
            _ => {}
        }
    }

    out
}

fn safe_href(attrs: Ref<'_, Vec<Attribute>>) -> Option<String> {
    let href = attrs
        .iter()
        .find(|attr| &*attr.name.local == "href")
        .map(|attr| attr.value.trim().to_string())?;

    let lower = href.to_ascii_lowercase();

    SAFE_SCHEMES
        .iter()
        .any(|scheme| lower.starts_with(scheme))
        .then(|| href)
}

/// Escapes text for an HTML body, or for a double quoted attribute.
pub fn escape_into(input: &str, attribute: bool, out: &mut String) {
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            c => out.push(c),
        }
    }
}

pub fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    escape_into(input, false, &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_story_markup() {
        let html = "<p>For <em>twenty</em> years, I carried <strong>words</strong>.</p>";

        assert_eq!(sanitize(html), html);
    }

    #[test]
    fn drops_scripts_and_their_content() {
        assert_eq!(
            sanitize("<p>hi</p><script>alert('x')</script><style>p{}</style>"),
            "<p>hi</p>"
        );
    }

    #[test]
    fn strips_attributes_and_event_handlers() {
        assert_eq!(
            sanitize(r#"<p class="lead" onclick="steal()">text</p>"#),
            "<p>text</p>"
        );
    }

    #[test]
    fn unwraps_unknown_elements() {
        assert_eq!(
            sanitize("<div><span>kept</span> <img src=x onerror=alert(1)></div>"),
            "kept "
        );
    }

    #[test]
    fn links_keep_only_safe_targets() {
        assert_eq!(
            sanitize(r#"<a href="https://example.com/?a=1&b=2">ok</a>"#),
            r#"<a href="https://example.com/?a=1&amp;b=2" rel="nofollow noopener">ok</a>"#
        );
        assert_eq!(sanitize(r#"<a href="javascript:alert(1)">no</a>"#), "<a>no</a>");
        assert_eq!(sanitize(r#"<a href=" JavaScript:alert(1)">no</a>"#), "<a>no</a>");
    }

    #[test]
    fn escapes_text() {
        assert_eq!(sanitize("1 < 2 & 3 > 2"), "1 &lt; 2 &amp; 3 &gt; 2");
        assert_eq!(escape("<b>\"q\"</b>"), "&lt;b&gt;\"q\"&lt;/b&gt;");
    }

    #[test]
    fn deep_nesting_is_closed_in_order() {
        let depth = 2_500;
        let input = format!("{}deep", "<blockquote><span>".repeat(depth));

        let html = std::thread::Builder::new()
            .stack_size(256 * 1024)
            .spawn(move || sanitize(&input))
            .unwrap()
            .join()
            .unwrap();

        assert_eq!(
            html,
            format!(
                "{}deep{}",
                "<blockquote>".repeat(depth),
                "</blockquote>".repeat(depth)
            )
        );
    }

    #[test]
    fn void_elements_have_no_end_tag() {
        assert_eq!(sanitize("line<br>next<hr>"), "line<br>next<hr>");
    }
}
