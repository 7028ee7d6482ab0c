use lazy_static::lazy_static;
use regex::Regex;

use crate::context::Context;
use crate::error::RenderError;
use crate::eval;

lazy_static! {
    static ref DOCTYPE_RE: Regex =
        Regex::new(r"^[dD][oO][cC][tT][yY][pP][eE] ([A-Za-z0-9_]+)$").unwrap();
    static ref TAG_RE: Regex = Regex::new(r"^([#.]?[A-Za-z_-][A-Za-z0-9_-]*)").unwrap();
    static ref ID_RE: Regex = Regex::new(r"^#([A-Za-z_-][A-Za-z0-9_-]*)").unwrap();
    static ref CLASS_RE: Regex = Regex::new(r"^\.([A-Za-z_-][A-Za-z0-9_-]*)").unwrap();
    static ref ATTR_RE: Regex =
        Regex::new(r#"^([A-Za-z_-][A-Za-z0-9_-]*)(=['"][^'"]*['"])?[ ,]*"#).unwrap();
}

/// HTML elements that cannot have children; rendered self-closing.
const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

/// Escape the five HTML-significant characters.
pub(crate) fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Render one element head from the front of `s`.
///
/// Supports the order `tag#id.class.class(attr,attr)` followed by inline
/// content: `": "` same-line nesting, `!=` raw text, `=` escaped text,
/// or a space-led literal. The fragment carries no indentation or
/// newlines; the line assembler adds those.
///
/// Returns the unconsumed remainder (nonempty only for `": "` chains),
/// the emitted fragment, and the tag to close later (absent for void
/// tags and doctype).
pub(crate) fn render_element<'a>(
    context: &Context,
    s: &'a str,
) -> Result<(&'a str, String, Option<&'a str>), RenderError> {
    if let Some(m) = DOCTYPE_RE.captures(s) {
        return Ok(("", format!("<!DOCTYPE {}>", &m[1]), None));
    }

    let m = TAG_RE
        .captures(s)
        .ok_or_else(|| RenderError::syntax(format!("malformed element head '{}'", s)))?;
    let matched = m.get(1).expect("tag capture").as_str();
    // A head starting with '.' or '#' keeps its whole text for the
    // id/class scan and gets the implicit div tag.
    let (tag, mut rest) = if matched.starts_with('.') || matched.starts_with('#') {
        ("div", s)
    } else {
        (matched, &s[matched.len()..])
    };
    let void_tag = VOID_TAGS.contains(&tag);

    let mut out = String::new();
    out.push('<');
    out.push_str(tag);

    if rest.is_empty() || rest.starts_with(": ") {
        let remainder = if rest.is_empty() { "" } else { &rest[2..] };
        out.push_str(if void_tag { " />" } else { ">" });
        return Ok((remainder, out, (!void_tag).then_some(tag)));
    }

    let mut escape = false;
    let mut evaluated = false;
    if let Some(r) = rest.strip_prefix("!=") {
        rest = r;
        evaluated = true;
    } else if let Some(r) = rest.strip_prefix('=') {
        rest = r;
        escape = true;
        evaluated = true;
    }

    if let Some(m) = ID_RE.captures(rest) {
        out.push_str(" id=\"");
        out.push_str(&m[1]);
        out.push('"');
        rest = &rest[m.get(0).expect("id match").end()..];
    }

    if rest.starts_with('.') {
        out.push_str(" class=\"");
        let mut first = true;
        while let Some(m) = CLASS_RE.captures(rest) {
            if !first {
                out.push(' ');
            }
            out.push_str(&m[1]);
            first = false;
            rest = &rest[m.get(0).expect("class match").end()..];
        }
        out.push('"');
    }

    if let Some(r) = rest.strip_prefix('(') {
        rest = r;
        while let Some(m) = ATTR_RE.captures(rest) {
            out.push(' ');
            out.push_str(&m[1]);
            if let Some(param) = m.get(2) {
                let param = param.as_str();
                let bytes = param.as_bytes();
                if bytes[1] != bytes[param.len() - 1] {
                    return Err(RenderError::syntax(format!(
                        "mismatched attribute quotes in '{}'",
                        param
                    )));
                }
                // Attribute values are always re-quoted with double quotes.
                out.push_str("=\"");
                out.push_str(&param[2..param.len() - 1]);
                out.push('"');
            }
            rest = &rest[m.get(0).expect("attr match").end()..];
        }
        rest = rest.strip_prefix(')').ok_or_else(|| {
            RenderError::syntax(format!("unbalanced '(' in element head '{}'", s))
        })?;
    }
    out.push_str(if void_tag { " />" } else { ">" });

    if let Some(r) = rest.strip_prefix(": ") {
        return Ok((r, out, (!void_tag).then_some(tag)));
    }

    let content = rest.strip_prefix(' ').unwrap_or(rest);
    if !content.is_empty() {
        // Buffered content (`=` / `!=`) resolves as a single operand when
        // it can: variables read their value, quoted literals unwrap.
        let text = if evaluated {
            match eval::to_operand(context, content) {
                Ok(op) => op.to_string(),
                Err(_) => content.to_string(),
            }
        } else {
            content.to_string()
        };
        if escape {
            out.push_str(&escape_html(&text));
        } else {
            out.push_str(&text);
        }
    }
    Ok(("", out, (!void_tag).then_some(tag)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(head: &str) -> (String, Option<String>, String) {
        let ctx = Context::new();
        let (rest, html, close) = render_element(&ctx, head).expect("render");
        (html, close.map(str::to_string), rest.to_string())
    }

    #[test]
    fn bare_tag() {
        let (html, close, rest) = render("html");
        assert_eq!(html, "<html>");
        assert_eq!(close.as_deref(), Some("html"));
        assert!(rest.is_empty());
    }

    #[test]
    fn id_and_classes() {
        let (html, _, _) = render("div#main.a.b");
        assert_eq!(html, "<div id=\"main\" class=\"a b\">");
    }

    #[test]
    fn implicit_div() {
        let (html, close, _) = render(".note");
        assert_eq!(html, "<div class=\"note\">");
        assert_eq!(close.as_deref(), Some("div"));
        let (html, _, _) = render("#top");
        assert_eq!(html, "<div id=\"top\">");
    }

    #[test]
    fn attributes_requote_and_separate() {
        let (html, _, _) = render("a(href='x' target=\"_blank\", rel='nofollow')");
        assert_eq!(html, "<a href=\"x\" target=\"_blank\" rel=\"nofollow\">");
    }

    #[test]
    fn bare_attribute() {
        let (html, _, _) = render("input(disabled)");
        assert_eq!(html, "<input disabled />");
    }

    #[test]
    fn unbalanced_attributes_error() {
        let err = render_element(&Context::new(), "a(href='x'").unwrap_err();
        assert!(err.to_string().contains("unbalanced"));
    }

    #[test]
    fn mismatched_attribute_quotes_error() {
        assert!(render_element(&Context::new(), "a(href='x\")").is_err());
    }

    #[test]
    fn void_tag_self_closes() {
        let (html, close, _) = render("br");
        assert_eq!(html, "<br />");
        assert_eq!(close, None);
        let (html, close, _) = render("img(src='a.png')");
        assert_eq!(html, "<img src=\"a.png\" />");
        assert_eq!(close, None);
    }

    #[test]
    fn inline_chain_yields_remainder() {
        let (html, close, rest) = render("p: span hi");
        assert_eq!(html, "<p>");
        assert_eq!(close.as_deref(), Some("p"));
        assert_eq!(rest, "span hi");
    }

    #[test]
    fn space_text_is_literal() {
        let (html, _, _) = render("p 1 < 2");
        assert_eq!(html, "<p>1 < 2");
    }

    #[test]
    fn escaped_text_resolves_operands() {
        let (html, _, _) = render("title= \"x\"");
        assert_eq!(html, "<title>x");
    }

    #[test]
    fn escaped_text_escapes_markup() {
        let (html, _, _) = render("p= '<b>'");
        assert_eq!(html, "<p>&lt;b&gt;");
    }

    #[test]
    fn raw_text_keeps_markup() {
        let (html, _, _) = render("p!= '<b>'");
        assert_eq!(html, "<p><b>");
    }

    #[test]
    fn evaluated_text_reads_variables() {
        let mut ctx = Context::new();
        ctx.set_variable("x", "b").unwrap();
        let (_, html, _) = render_element(&ctx, "li= x").unwrap();
        assert_eq!(html, "<li>b");
    }

    #[test]
    fn unresolvable_buffered_text_stays_literal() {
        let (_, html, _) = render_element(&Context::new(), "p= hello world").unwrap();
        assert_eq!(html, "<p>hello world");
    }

    #[test]
    fn doctype() {
        let (html, close, rest) = render("doctype html");
        assert_eq!(html, "<!DOCTYPE html>");
        assert_eq!(close, None);
        assert!(rest.is_empty());
        let (html, _, _) = render("DOCTYPE HTML");
        assert_eq!(html, "<!DOCTYPE HTML>");
    }

    #[test]
    fn malformed_head_errors() {
        assert!(render_element(&Context::new(), "<b>hi</b>").is_err());
    }

    #[test]
    fn escaping_table() {
        assert_eq!(escape_html("<>&\"'"), "&lt;&gt;&amp;&quot;&#39;");
        assert_eq!(escape_html("plain"), "plain");
    }

    #[test]
    fn escaping_composition_is_stable() {
        let once = escape_html("<>&\"'");
        assert_eq!(escape_html(&once), escape_html(&escape_html("<>&\"'")));
    }
}
