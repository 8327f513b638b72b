// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! DOM surface scanner
//!
//! Walks parsed HTML and drives the taint analyzer over every script
//! surface: inline `<script>` bodies, `on*` event-handler attributes and
//! `javascript:` URLs. Framework directives and DOM-clobbering candidates
//! are purely structural checks. A parse failure in one script block
//! never aborts the scan of its siblings.

use std::collections::HashSet;

use html5ever::tendril::TendrilSink;
use html5ever::{parse_document, ParseOpts};
use markup5ever_rcdom::{Handle, NodeData, RcDom};

use super::walker::JsTaintAnalyzer;
use super::{dedup_findings, Confidence, Finding};
use crate::context::ReflectionContext;
use crate::patterns::ScanPatterns;

/// Everything the surface scan extracted from one document
#[derive(Debug, Clone, Default)]
pub struct DomScanResult {
    /// Findings across all script surfaces, de-duplicated
    pub findings: Vec<Finding>,
    /// External script URLs for deep-mode fetching
    pub external_scripts: Vec<String>,
    /// Identifiers read but never declared, across all scripts
    pub global_accesses: HashSet<String>,
}

#[derive(Debug, Default)]
struct Surfaces {
    inline_scripts: Vec<String>,
    event_handlers: Vec<(String, String)>,
    js_urls: Vec<(String, String)>,
    directives: Vec<(String, String)>,
    external_scripts: Vec<String>,
    clobber_candidates: Vec<(String, String)>,
}

/// Scan a full HTML document for DOM-based XSS surfaces
pub fn scan_document(html: &str, patterns: &ScanPatterns) -> DomScanResult {
    let dom = match parse_document(RcDom::default(), ParseOpts::default())
        .from_utf8()
        .read_from(&mut html.as_bytes())
    {
        Ok(dom) => dom,
        Err(_) => return DomScanResult::default(),
    };

    let mut surfaces = Surfaces::default();
    collect(&dom.document, &mut surfaces);

    let analyzer = JsTaintAnalyzer::new(patterns);
    let mut findings = Vec::new();
    let mut globals: HashSet<String> = HashSet::new();

    for code in &surfaces.inline_scripts {
        let analysis = analyzer.analyze(code);
        findings.extend(analysis.findings);
        globals.extend(analysis.global_accesses);
    }

    for (attr, code) in &surfaces.event_handlers {
        let analysis = analyzer.analyze(code);
        for mut finding in analysis.findings {
            finding.description = format!("{} (in {} handler)", finding.description, attr);
            findings.push(finding);
        }
        globals.extend(analysis.global_accesses);
    }

    for (attr, url) in &surfaces.js_urls {
        let body = url.trim_start()[11..].trim(); // past "javascript:"
        if is_noop_js(body) {
            continue;
        }
        findings.push(Finding {
            source: "javascript-url".to_string(),
            sink: attr.clone(),
            line: None,
            confidence: Confidence::Medium,
            description: format!("javascript: URL in {} attribute", attr),
            evidence: truncate(url, 160),
            inferred_context: ReflectionContext::Url,
        });
        let analysis = analyzer.analyze(body);
        findings.extend(analysis.findings);
        globals.extend(analysis.global_accesses);
    }

    for (attr, value) in &surfaces.directives {
        if patterns.source_for(value.trim()).is_some() {
            findings.push(Finding {
                source: value.trim().to_string(),
                sink: attr.clone(),
                line: None,
                confidence: Confidence::High,
                description: format!("Unsanitized HTML binding via {}", attr),
                evidence: truncate(value, 160),
                inferred_context: ReflectionContext::Attribute,
            });
        }
    }

    // DOM clobbering: only ids/names the scripts actually read count
    for (tag, identifier) in &surfaces.clobber_candidates {
        if globals.contains(identifier) {
            findings.push(Finding {
                source: identifier.clone(),
                sink: format!("window.{}", identifier),
                line: None,
                confidence: Confidence::High,
                description: "Global Variable Clobbering".to_string(),
                evidence: format!("<{} id/name=\"{}\">", tag, identifier),
                inferred_context: ReflectionContext::Html,
            });
        }
    }

    DomScanResult {
        findings: dedup_findings(findings),
        external_scripts: surfaces.external_scripts,
        global_accesses: globals,
    }
}

fn collect(handle: &Handle, surfaces: &mut Surfaces) {
    if let NodeData::Element { name, attrs, .. } = &handle.data {
        let tag = name.local.as_ref().to_ascii_lowercase();
        let attrs = attrs.borrow();

        if tag == "script" {
            let src = attrs
                .iter()
                .find(|a| a.name.local.as_ref().eq_ignore_ascii_case("src"))
                .map(|a| a.value.to_string());
            let script_type = attrs
                .iter()
                .find(|a| a.name.local.as_ref().eq_ignore_ascii_case("type"))
                .map(|a| a.value.to_string())
                .unwrap_or_default();
            let is_js = matches!(
                script_type.to_ascii_lowercase().as_str(),
                "" | "text/javascript" | "application/javascript" | "module"
            );
            if is_js {
                match src {
                    Some(url) if !url.trim().is_empty() => {
                        surfaces.external_scripts.push(url.trim().to_string());
                    }
                    _ => {
                        let body = text_content(handle);
                        if !body.trim().is_empty() {
                            surfaces.inline_scripts.push(body);
                        }
                    }
                }
            }
        }

        for attr in attrs.iter() {
            let attr_name = attr.name.local.as_ref().to_ascii_lowercase();
            let value = attr.value.to_string();

            if attr_name.starts_with("on") && attr_name.len() > 2 && !value.trim().is_empty() {
                surfaces.event_handlers.push((attr_name.clone(), value.clone()));
            }

            if matches!(attr_name.as_str(), "href" | "src" | "action" | "formaction")
                && value.trim_start().to_ascii_lowercase().starts_with("javascript:")
            {
                surfaces.js_urls.push((attr_name.clone(), value.clone()));
            }

            if matches!(attr_name.as_str(), "v-html" | "ng-bind-html" | "data-ng-bind-html") {
                surfaces.directives.push((attr_name.clone(), value.clone()));
            }

            if matches!(attr_name.as_str(), "id" | "name") && is_js_identifier(value.trim()) {
                surfaces
                    .clobber_candidates
                    .push((tag.clone(), value.trim().to_string()));
            }
        }
    }

    for child in handle.children.borrow().iter() {
        collect(child, surfaces);
    }
}

fn text_content(handle: &Handle) -> String {
    let mut out = String::new();
    for child in handle.children.borrow().iter() {
        if let NodeData::Text { contents } = &child.data {
            out.push_str(&contents.borrow());
        }
    }
    out
}

/// `javascript:` bodies that do nothing and are not worth reporting
fn is_noop_js(body: &str) -> bool {
    let b = body.trim().trim_end_matches(';').trim();
    matches!(
        b.to_ascii_lowercase().as_str(),
        "" | "void(0)" | "void 0" | "false" | "true" | "undefined" | "null" | "//"
    )
}

fn is_js_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        let mut end = max;
        while end > 0 && !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &s[..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(html: &str) -> DomScanResult {
        let patterns = ScanPatterns::new().expect("tables compile");
        scan_document(html, &patterns)
    }

    #[test]
    fn test_inline_script_flow() {
        let html = r#"<html><body>
            <script>var q = location.search; document.write(q);</script>
        </body></html>"#;
        let result = scan(html);
        assert_eq!(result.findings.len(), 1);
        assert_eq!(result.findings[0].sink, "document.write");
    }

    #[test]
    fn test_parse_failure_is_isolated() {
        let html = r#"<html><body>
            <script>this is {{{ not js</script>
            <script>el.innerHTML = location.hash;</script>
        </body></html>"#;
        let result = scan(html);
        assert_eq!(result.findings.len(), 1);
        assert_eq!(result.findings[0].sink, "innerHTML");
    }

    #[test]
    fn test_event_handler_analyzed() {
        let html = r#"<img src=x onerror="document.write(location.hash)">"#;
        let result = scan(html);
        assert_eq!(result.findings.len(), 1);
        assert!(result.findings[0].description.contains("onerror"));
    }

    #[test]
    fn test_javascript_url_flagged() {
        let html = r#"<a href="javascript:doEvil(window.name)">x</a>"#;
        let result = scan(html);
        assert!(result
            .findings
            .iter()
            .any(|f| f.description.contains("javascript: URL")));
    }

    #[test]
    fn test_javascript_url_noop_suppressed() {
        let html = r#"<a href="javascript:void(0)">x</a><a href="javascript:;">y</a>"#;
        let result = scan(html);
        assert!(result.findings.is_empty());
    }

    #[test]
    fn test_vue_directive_with_source() {
        let html = r#"<div v-html="location.hash"></div>"#;
        let result = scan(html);
        assert_eq!(result.findings.len(), 1);
        assert_eq!(result.findings[0].confidence, Confidence::High);
        assert_eq!(
            result.findings[0].inferred_context,
            ReflectionContext::Attribute
        );
    }

    #[test]
    fn test_vue_directive_clean_value() {
        let html = r#"<div v-html="renderedMarkdown"></div>"#;
        let result = scan(html);
        assert!(result.findings.is_empty());
    }

    #[test]
    fn test_clobbering_requires_actual_read() {
        let html = r#"<html><body>
            <div id="config"></div>
            <div id="unusedThing"></div>
            <script>boot(config);</script>
        </body></html>"#;
        let result = scan(html);
        let clobber: Vec<_> = result
            .findings
            .iter()
            .filter(|f| f.description == "Global Variable Clobbering")
            .collect();
        assert_eq!(clobber.len(), 1);
        assert_eq!(clobber[0].sink, "window.config");
    }

    #[test]
    fn test_external_scripts_collected() {
        let html = r#"<script src="https://cdn.example/app.js"></script>
            <script src="/local.js"></script>"#;
        let result = scan(html);
        assert_eq!(result.external_scripts.len(), 2);
    }

    #[test]
    fn test_non_js_script_type_skipped() {
        let html = r#"<script type="application/json">{"a": "location.search"}</script>"#;
        let result = scan(html);
        assert!(result.findings.is_empty());
    }

    #[test]
    fn test_empty_document() {
        let result = scan("");
        assert!(result.findings.is_empty());
        assert!(result.external_scripts.is_empty());
    }
}
