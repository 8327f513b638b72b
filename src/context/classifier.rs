// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Reflection context classifier
//!
//! Decides which syntactic context a reflected probe occupies inside a
//! response body. Rules run in strict specificity order over a window
//! around the occurrence; the first match wins. HTML structure is probed
//! with a lenient hand-rolled tag scan (tolerates truncated and malformed
//! tags) plus the shared quote-parity check, never a DOM parse.

use regex::Regex;

use super::lexer::classify_in_js;
use super::ReflectionContext;

const WINDOW: usize = 500;

/// Classify the context of `probe` inside `body`.
///
/// `known_offset` pins a specific occurrence; when absent the first
/// occurrence is used. Absent probe yields `Unknown`. Malformed HTML
/// around the probe never panics; it degrades to `Unknown`/`Html`.
pub fn classify_reflection(
    body: &str,
    probe: &str,
    known_offset: Option<usize>,
) -> ReflectionContext {
    if probe.is_empty() || body.is_empty() {
        return ReflectionContext::Unknown;
    }

    let offset = match known_offset {
        Some(o) if o <= body.len() && body[clamp_ceil(body, o)..].starts_with(probe) => {
            clamp_ceil(body, o)
        }
        Some(_) => match body.find(probe) {
            Some(o) => o,
            None => return ReflectionContext::Unknown,
        },
        None => match body.find(probe) {
            Some(o) => o,
            None => return ReflectionContext::Unknown,
        },
    };

    let win_start = clamp_floor(body, offset.saturating_sub(WINDOW));
    let win_end = clamp_ceil(body, (offset + probe.len() + WINDOW).min(body.len()));
    let window = &body[win_start..win_end];
    let pos = offset - win_start; // probe position inside window
    let pre = &window[..pos];
    let pre_lower = pre.to_ascii_lowercase();
    let window_lower = window.to_ascii_lowercase();

    let angular_doc = is_angular_document(body);

    // 1. Angular expression / ng-attribute (CSTI beats everything)
    if angular_doc && (in_unbalanced_mustache(pre) || in_ng_attribute(pre)) {
        return ReflectionContext::Angular;
    }

    // 2. HTML comment
    if in_html_comment(&pre_lower) {
        return ReflectionContext::Comment;
    }

    // 3. Meta refresh content value
    if in_meta_refresh(&window_lower, pos) {
        return ReflectionContext::MetaRefresh;
    }

    // 4. data: URI attribute value
    if in_data_uri(&pre_lower) {
        return ReflectionContext::DataUri;
    }

    // 5. SVG subtree
    if in_svg(&pre_lower) {
        return ReflectionContext::Svg;
    }

    // 6 + 7. Script text: template literal / JS string / bare code.
    // Inside <script> or an on* handler value the lexer owns the decision.
    if let Some(script_content) = script_slice(window, &window_lower, pos) {
        let (found, ctx) = classify_in_js(script_content, probe);
        if found {
            return ctx;
        }
    }
    let tag = open_tag_at(pre);
    if let Some(ref t) = tag {
        if let Some(ref attr) = t.attr_at_end {
            if attr.name.starts_with("on") && attr.quote.is_some() {
                let value = attr_value_slice(window, win_offset_of(pre, t, attr), attr.quote);
                let (found, ctx) = classify_in_js(value, probe);
                if found {
                    return ctx;
                }
            }
        }
    }
    // Backtick balance outside any script block (raw template fragment)
    if backtick_parity(pre) {
        return ReflectionContext::TemplateLiteral;
    }

    // 8. CSS: <style> block or style="" attribute
    if in_tag_block(&pre_lower, "style") {
        return ReflectionContext::Css;
    }
    if let Some(ref t) = tag {
        if let Some(ref attr) = t.attr_at_end {
            if attr.name == "style" {
                return ReflectionContext::Css;
            }
        }
    }

    // 9. URL-bearing attribute value
    if let Some(ref t) = tag {
        if let Some(ref attr) = t.attr_at_end {
            if matches!(
                attr.name.as_str(),
                "href" | "src" | "action" | "formaction" | "data"
            ) {
                return ReflectionContext::Url;
            }
        }
    }

    // 10. Probe is itself a tag name
    if is_tag_name(body, offset, probe) {
        return ReflectionContext::TagName;
    }

    // 11. RCDATA elements
    if in_tag_block(&pre_lower, "title") || in_tag_block(&pre_lower, "textarea") {
        return ReflectionContext::Rcdata;
    }

    // 12. Any other quoted attribute value
    if tag.as_ref().is_some_and(|t| t.attr_at_end.is_some()) {
        return ReflectionContext::Attribute;
    }
    if let Some(seg) = open_tag_segment(pre) {
        if quote_parity(seg) {
            return ReflectionContext::Attribute;
        }
    }

    // 13. Default: plain HTML, or Angular CSTI fallback for Angular apps
    if angular_doc {
        ReflectionContext::Angular
    } else {
        ReflectionContext::Html
    }
}

/// Largest char boundary <= i
fn clamp_floor(s: &str, mut i: usize) -> usize {
    if i > s.len() {
        return s.len();
    }
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

/// Smallest char boundary >= i
fn clamp_ceil(s: &str, mut i: usize) -> usize {
    if i >= s.len() {
        return s.len();
    }
    while i < s.len() && !s.is_char_boundary(i) {
        i += 1;
    }
    i
}

fn is_angular_document(body: &str) -> bool {
    const INDICATORS: [&str; 8] = [
        "ng-app",
        "ng-controller",
        "angular.js",
        "angular.min.js",
        "ng-bind",
        "ng-model",
        "ng-init",
        "data-ng-",
    ];
    INDICATORS.iter().any(|i| body.contains(i))
}

/// More `{{` than `}}` before the probe
fn in_unbalanced_mustache(pre: &str) -> bool {
    count_occurrences(pre, "{{") > count_occurrences(pre, "}}")
}

fn in_ng_attribute(pre: &str) -> bool {
    open_tag_at(pre)
        .and_then(|t| t.attr_at_end)
        .map(|a| a.name.starts_with("ng-") || a.name.starts_with("data-ng-"))
        .unwrap_or(false)
}

fn in_html_comment(pre_lower: &str) -> bool {
    match pre_lower.rfind("<!--") {
        Some(open) => !pre_lower[open..].contains("-->"),
        None => false,
    }
}

/// Probe inside the content value of `<meta http-equiv=refresh ...>`
fn in_meta_refresh(window_lower: &str, pos: usize) -> bool {
    let Ok(meta_re) = Regex::new(r#"<meta[^>]*http-equiv\s*=\s*["']?refresh"#) else {
        return false;
    };
    for m in meta_re.find_iter(window_lower) {
        if m.start() >= pos {
            continue;
        }
        let tag_end = window_lower[m.start()..]
            .find('>')
            .map(|i| m.start() + i)
            .unwrap_or(window_lower.len());
        if pos < tag_end {
            // The probe must sit after the content attribute
            let slice = &window_lower[m.start()..pos];
            if slice.contains("content") {
                return true;
            }
        }
    }
    false
}

fn in_data_uri(pre_lower: &str) -> bool {
    let Some(seg) = open_tag_segment(pre_lower) else {
        return false;
    };
    let Ok(re) = Regex::new(r#"(?:href|src|action|formaction|data)\s*=\s*(["']?)\s*data:"#) else {
        return false;
    };
    if let Some(caps) = re.captures(seg) {
        let whole = match caps.get(0) {
            Some(m) => m,
            None => return false,
        };
        let rest = &seg[whole.end()..];
        return match caps.get(1).map(|q| q.as_str()) {
            Some("\"") => !rest.contains('"'),
            Some("'") => !rest.contains('\''),
            _ => !rest.chars().any(|c| c.is_whitespace()),
        };
    }
    false
}

fn in_svg(pre_lower: &str) -> bool {
    let open = pre_lower.rfind("<svg");
    let close = pre_lower.rfind("</svg");
    match (open, close) {
        (Some(o), Some(c)) => o > c,
        (Some(_), None) => true,
        _ => {
            // SVG-specific child tag opened directly in the window
            const SVG_TAGS: [&str; 10] = [
                "animate", "circle", "ellipse", "polygon", "polyline", "tspan", "textpath",
                "marker", "fecolormatrix", "set",
            ];
            open_tag_at(pre_lower)
                .map(|t| SVG_TAGS.contains(&t.name.as_str()))
                .unwrap_or(false)
        }
    }
}

/// Content of the enclosing `<script>` block, when the probe is inside one.
/// Returns the slice from after the opening tag to the following
/// `</script` (or window end), which contains the probe.
fn script_slice<'a>(window: &'a str, window_lower: &str, pos: usize) -> Option<&'a str> {
    let pre = &window_lower[..pos];
    let open = pre.rfind("<script")?;
    if pre[open..].contains("</script") {
        return None;
    }
    let tag_close = pre[open..].find('>').map(|i| open + i + 1)?;
    let end = window_lower[pos..]
        .find("</script")
        .map(|i| pos + i)
        .unwrap_or(window.len());
    // tag_close and end are ASCII-search results over the lowercased copy,
    // which preserves byte offsets
    if tag_close <= end && window.is_char_boundary(tag_close) && window.is_char_boundary(end) {
        Some(&window[tag_close..end])
    } else {
        None
    }
}

/// Open `<title>`/`<textarea>`/`<style>` style block: last opener before the
/// probe without its closer in between.
fn in_tag_block(pre_lower: &str, tag: &str) -> bool {
    let open_pat = format!("<{}", tag);
    let close_pat = format!("</{}", tag);
    match pre_lower.rfind(&open_pat) {
        Some(open) => !pre_lower[open..].contains(&close_pat),
        None => false,
    }
}

/// Substring from the last `<` before the probe, but only when no `>`
/// intervenes (a valid tag boundary per the shared quote-parity rule).
fn open_tag_segment(pre: &str) -> Option<&str> {
    let lt = pre.rfind('<')?;
    let seg = &pre[lt..];
    if seg.contains('>') {
        None
    } else {
        Some(seg)
    }
}

/// Odd number of quotes in the tag segment means the probe is inside a
/// quoted value.
fn quote_parity(seg: &str) -> bool {
    let dq = seg.bytes().filter(|&b| b == b'"').count();
    let sq = seg.bytes().filter(|&b| b == b'\'').count();
    dq % 2 == 1 || sq % 2 == 1
}

fn backtick_parity(pre: &str) -> bool {
    let bytes = pre.as_bytes();
    let mut count = 0usize;
    for (i, &b) in bytes.iter().enumerate() {
        if b == b'`' {
            let mut back = 0usize;
            let mut j = i;
            while j > 0 && bytes[j - 1] == b'\\' {
                back += 1;
                j -= 1;
            }
            if back % 2 == 0 {
                count += 1;
            }
        }
    }
    count % 2 == 1
}

fn count_occurrences(haystack: &str, needle: &str) -> usize {
    haystack.matches(needle).count()
}

/// Lenient parse of the open tag the probe sits in
#[derive(Debug)]
struct LenientTag {
    name: String,
    /// Attribute whose value region is unterminated at the probe
    attr_at_end: Option<AttrAt>,
    /// Byte offset of the tag's `<` inside `pre`
    start: usize,
}

#[derive(Debug)]
struct AttrAt {
    name: String,
    quote: Option<char>,
    /// Offset of the value start, relative to the tag's `<`
    value_start: usize,
}

fn open_tag_at(pre: &str) -> Option<LenientTag> {
    let lt = pre.rfind('<')?;
    let seg = &pre[lt..];
    if seg.contains('>') {
        return None;
    }
    let bytes = seg.as_bytes();
    let mut i = 1usize;

    // Tag name
    let name_start = i;
    while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'-') {
        i += 1;
    }
    if i == name_start {
        return None;
    }
    let name = seg[name_start..i].to_ascii_lowercase();

    // Attribute scan
    let mut attr_at_end = None;
    loop {
        while i < bytes.len() && (bytes[i].is_ascii_whitespace() || bytes[i] == b'/') {
            i += 1;
        }
        if i >= bytes.len() {
            break;
        }
        let attr_start = i;
        while i < bytes.len()
            && !bytes[i].is_ascii_whitespace()
            && bytes[i] != b'='
            && bytes[i] != b'/'
        {
            i += 1;
        }
        let attr_name = seg[attr_start..i].to_ascii_lowercase();
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= bytes.len() || bytes[i] != b'=' {
            continue; // boolean attribute (or truncated here: name position)
        }
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= bytes.len() {
            // `attr=` then probe: unquoted value position
            attr_at_end = Some(AttrAt {
                name: attr_name,
                quote: None,
                value_start: i,
            });
            break;
        }
        match bytes[i] {
            q @ (b'"' | b'\'') => {
                let value_start = i + 1;
                match seg[value_start..].find(q as char) {
                    Some(close) => i = value_start + close + 1,
                    None => {
                        attr_at_end = Some(AttrAt {
                            name: attr_name,
                            quote: Some(q as char),
                            value_start,
                        });
                        break;
                    }
                }
            }
            _ => {
                let value_start = i;
                while i < bytes.len() && !bytes[i].is_ascii_whitespace() {
                    i += 1;
                }
                if i >= bytes.len() {
                    attr_at_end = Some(AttrAt {
                        name: attr_name,
                        quote: None,
                        value_start,
                    });
                    break;
                }
            }
        }
    }

    Some(LenientTag {
        name,
        attr_at_end,
        start: lt,
    })
}

/// Window-absolute offset of an attribute value start
fn win_offset_of(_pre: &str, tag: &LenientTag, attr: &AttrAt) -> usize {
    tag.start + attr.value_start
}

/// Slice of the window from a value start to its closing quote (or end)
fn attr_value_slice(window: &str, value_start: usize, quote: Option<char>) -> &str {
    if value_start >= window.len() {
        return "";
    }
    let start = {
        let mut s = value_start;
        while s < window.len() && !window.is_char_boundary(s) {
            s += 1;
        }
        s
    };
    let rest = &window[start..];
    match quote {
        Some(q) => match rest.find(q) {
            Some(end) => &rest[..end],
            None => rest,
        },
        None => match rest.find(|c: char| c.is_whitespace() || c == '>') {
            Some(end) => &rest[..end],
            None => rest,
        },
    }
}

fn is_tag_name(body: &str, offset: usize, probe: &str) -> bool {
    if offset == 0 || body.as_bytes()[offset - 1] != b'<' {
        return false;
    }
    // The `<` must be unmatched: adjacent by construction
    let after = offset + probe.len();
    match body[after..].chars().next() {
        None => true,
        Some(c) => c.is_whitespace() || c == '>' || c == '/',
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const P: &str = "zz9probe";

    fn classify(body: &str) -> ReflectionContext {
        classify_reflection(body, P, None)
    }

    #[test]
    fn test_html_text() {
        assert_eq!(
            classify("<div>zz9probe</div>"),
            ReflectionContext::Html
        );
    }

    #[test]
    fn test_attribute_value() {
        assert_eq!(
            classify(r#"<div id="zz9probe">"#),
            ReflectionContext::Attribute
        );
    }

    #[test]
    fn test_js_single_quote() {
        assert_eq!(
            classify("<script>var x='zz9probe';</script>"),
            ReflectionContext::JsSingleQuote
        );
    }

    #[test]
    fn test_js_double_quote() {
        assert_eq!(
            classify(r#"<script>var x="zz9probe";</script>"#),
            ReflectionContext::JsDoubleQuote
        );
    }

    #[test]
    fn test_js_raw() {
        assert_eq!(
            classify("<script>var x = zz9probe;</script>"),
            ReflectionContext::JsRaw
        );
    }

    #[test]
    fn test_template_literal_in_script() {
        assert_eq!(
            classify("<script>var x = `hi zz9probe`;</script>"),
            ReflectionContext::TemplateLiteral
        );
    }

    #[test]
    fn test_js_comment_in_script() {
        assert_eq!(
            classify("<script>// zz9probe\n</script>"),
            ReflectionContext::Comment
        );
    }

    #[test]
    fn test_html_comment() {
        assert_eq!(classify("<!-- zz9probe -->"), ReflectionContext::Comment);
    }

    #[test]
    fn test_meta_refresh() {
        assert_eq!(
            classify(r#"<meta http-equiv="refresh" content="0;url=zz9probe">"#),
            ReflectionContext::MetaRefresh
        );
    }

    #[test]
    fn test_data_uri() {
        assert_eq!(
            classify(r#"<a href="data:text/html,zz9probe">x</a>"#),
            ReflectionContext::DataUri
        );
    }

    #[test]
    fn test_svg() {
        assert_eq!(
            classify("<svg><text>zz9probe</text></svg>"),
            ReflectionContext::Svg
        );
    }

    #[test]
    fn test_event_handler_attribute() {
        assert_eq!(
            classify(r#"<img onerror="f('zz9probe')">"#),
            ReflectionContext::JsSingleQuote
        );
    }

    #[test]
    fn test_event_handler_raw() {
        assert_eq!(
            classify(r#"<button onclick="doThing(zz9probe)">"#),
            ReflectionContext::JsRaw
        );
    }

    #[test]
    fn test_css_style_block() {
        assert_eq!(
            classify("<style>.x{color:zz9probe}</style>"),
            ReflectionContext::Css
        );
    }

    #[test]
    fn test_css_style_attribute() {
        assert_eq!(
            classify(r#"<div style="color:zz9probe">"#),
            ReflectionContext::Css
        );
    }

    #[test]
    fn test_url_attribute() {
        assert_eq!(
            classify(r#"<a href="https://x.example/zz9probe">link</a>"#),
            ReflectionContext::Url
        );
    }

    #[test]
    fn test_tag_name() {
        assert_eq!(classify("<zz9probe>"), ReflectionContext::TagName);
    }

    #[test]
    fn test_tag_name_with_attrs() {
        assert_eq!(classify("<zz9probe x=1>"), ReflectionContext::TagName);
    }

    #[test]
    fn test_rcdata_title() {
        assert_eq!(
            classify("<title>zz9probe</title>"),
            ReflectionContext::Rcdata
        );
    }

    #[test]
    fn test_rcdata_textarea() {
        assert_eq!(
            classify("<textarea>zz9probe</textarea>"),
            ReflectionContext::Rcdata
        );
    }

    #[test]
    fn test_angular_mustache() {
        let body = r#"<html ng-app="demo"><div>{{ zz9probe </div></html>"#;
        assert_eq!(classify(body), ReflectionContext::Angular);
    }

    #[test]
    fn test_angular_fallback() {
        let body = r#"<html ng-app="demo"><div>zz9probe</div></html>"#;
        assert_eq!(classify(body), ReflectionContext::Angular);
    }

    #[test]
    fn test_absent_probe() {
        assert_eq!(classify("<div>nothing here</div>"), ReflectionContext::Unknown);
    }

    #[test]
    fn test_no_panic_without_open_tag() {
        // Attribute-looking bodies with no preceding `<` must not panic
        for body in [
            r#"href="zz9probe""#,
            r#"style="zz9probe""#,
            r#"onclick="zz9probe""#,
            r#"attr="zz9probe""#,
        ] {
            let ctx = classify(body);
            assert!(
                ctx == ReflectionContext::Html || ctx == ReflectionContext::Unknown,
                "got {:?} for {:?}",
                ctx,
                body
            );
        }
    }

    #[test]
    fn test_known_offset_selects_occurrence() {
        let body = "<div>zz9probe</div><script>var a='zz9probe';</script>";
        let second = body.rfind(P).unwrap();
        assert_eq!(
            classify_reflection(body, P, Some(second)),
            ReflectionContext::JsSingleQuote
        );
        assert_eq!(
            classify_reflection(body, P, None),
            ReflectionContext::Html
        );
    }

    #[test]
    fn test_idempotent() {
        let body = "<script>var x='zz9probe';</script>";
        assert_eq!(
            classify_reflection(body, P, None),
            classify_reflection(body, P, None)
        );
    }

    #[test]
    fn test_closed_script_block_not_js() {
        let body = "<script>var x = 1;</script><div>zz9probe</div>";
        assert_eq!(classify(body), ReflectionContext::Html);
    }

    #[test]
    fn test_unclosed_quote_attribute() {
        // Truncated tag: probe inside an unterminated quoted value
        assert_eq!(
            classify(r#"<div title="zz9probe"#),
            ReflectionContext::Attribute
        );
    }
}
