// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Exploitability judgment
//!
//! Takes a reflection context, the response's security posture (CSP, WAF,
//! content type) and the characters that survived filtering, and decides
//! whether the reflection is worth a payload. Comment contexts and
//! non-HTML content types are never exploitable; a CSP that blocks inline
//! script kills markup/script contexts unless the policy itself is
//! judged bypassable.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::csp::CspAnalyzer;
use super::waf::WafVendor;
use crate::context::ReflectionContext;

/// Security posture of one HTTP response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SecurityPosture {
    /// Raw Content-Security-Policy value, when present
    pub csp: Option<String>,
    /// Policy came from the report-only header
    pub csp_report_only: bool,
    /// Detected WAF, when any
    pub waf: Option<WafVendor>,
    /// Response content type
    pub content_type: Option<String>,
}

impl SecurityPosture {
    /// Build a posture from response headers (name, value pairs)
    pub fn from_headers(headers: &[(String, String)]) -> Self {
        let mut csp = None;
        let mut csp_report_only = false;
        let mut content_type = None;

        for (name, value) in headers {
            if name.eq_ignore_ascii_case("content-security-policy") {
                csp = Some(value.clone());
                csp_report_only = false;
            } else if name.eq_ignore_ascii_case("content-security-policy-report-only")
                && csp.is_none()
            {
                csp = Some(value.clone());
                csp_report_only = true;
            } else if name.eq_ignore_ascii_case("content-type") {
                content_type = Some(value.clone());
            }
        }

        Self {
            csp,
            csp_report_only,
            waf: WafVendor::from_headers(headers),
            content_type,
        }
    }
}

/// Decides whether a classified reflection is exploitable
#[derive(Debug, Default)]
pub struct ExploitabilityJudge {
    csp_analyzer: CspAnalyzer,
}

impl ExploitabilityJudge {
    pub fn new() -> Self {
        Self {
            csp_analyzer: CspAnalyzer::new(),
        }
    }

    /// Judge one reflection site
    pub fn judge(
        &self,
        context: ReflectionContext,
        posture: &SecurityPosture,
        unfiltered: &BTreeSet<char>,
    ) -> bool {
        // Comments never execute; an unplaceable probe is not actionable
        if matches!(context, ReflectionContext::Comment | ReflectionContext::Unknown) {
            return false;
        }

        // Non-markup content types do not render
        if let Some(ct) = posture.content_type.as_deref() {
            let ct = ct.to_ascii_lowercase();
            if !(ct.contains("html") || ct.contains("xml") || ct.contains("svg")) {
                return false;
            }
        }

        if !self.required_chars_survive(context, unfiltered) {
            return false;
        }

        // An enforced CSP without a usable bypass kills script execution
        if let Some(policy) = posture.csp.as_deref() {
            let mut analysis = self.csp_analyzer.parse(policy);
            if posture.csp_report_only {
                analysis.bypasses.push(super::csp::CspBypass::ReportOnly);
            }
            if analysis.blocks_inline && !analysis.is_bypassable() && needs_script_execution(context)
            {
                return false;
            }
        }

        // Strict WAFs reliably stop raw markup payloads
        if let Some(waf) = posture.waf {
            if waf.is_strict() && context.is_markup() {
                return false;
            }
        }

        true
    }

    /// Per-context character requirements against the surviving set.
    /// An empty set means the caller had no filtering information.
    fn required_chars_survive(&self, context: ReflectionContext, unfiltered: &BTreeSet<char>) -> bool {
        if unfiltered.is_empty() {
            return true;
        }
        let has = |c: char| unfiltered.contains(&c);
        let any = |cs: &str| cs.chars().any(|c| has(c));
        let all = |cs: &str| cs.chars().all(|c| has(c));

        match context {
            ReflectionContext::Html
            | ReflectionContext::Svg
            | ReflectionContext::Rcdata
            | ReflectionContext::TagName
            | ReflectionContext::Comment => all("<>"),
            ReflectionContext::Attribute => any("\"'") || all("<>"),
            ReflectionContext::JsSingleQuote => has('\'') || all("<>/"),
            ReflectionContext::JsDoubleQuote => has('"') || all("<>/"),
            ReflectionContext::JsRaw => all("()"),
            ReflectionContext::TemplateLiteral => all("{}") || has('`'),
            ReflectionContext::Css => has('(') || all("<>"),
            ReflectionContext::Url
            | ReflectionContext::DataUri
            | ReflectionContext::MetaRefresh => has(':'),
            ReflectionContext::Angular => all("{}"),
            ReflectionContext::Unknown => false,
        }
    }
}

/// Contexts whose payloads run as inline script and are therefore
/// subject to script-src. URL/meta-refresh navigation and Angular CSTI
/// (which executes through the framework) are not.
fn needs_script_execution(context: ReflectionContext) -> bool {
    context.is_markup()
        || context.is_script()
        || matches!(
            context,
            ReflectionContext::Attribute | ReflectionContext::Css | ReflectionContext::DataUri
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(s: &str) -> BTreeSet<char> {
        s.chars().collect()
    }

    fn html_posture() -> SecurityPosture {
        SecurityPosture {
            content_type: Some("text/html; charset=utf-8".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_comment_never_exploitable() {
        let judge = ExploitabilityJudge::new();
        assert!(!judge.judge(ReflectionContext::Comment, &html_posture(), &chars("<>")));
    }

    #[test]
    fn test_json_content_type_never_exploitable() {
        let judge = ExploitabilityJudge::new();
        let posture = SecurityPosture {
            content_type: Some("application/json".to_string()),
            ..Default::default()
        };
        assert!(!judge.judge(ReflectionContext::Html, &posture, &chars("<>()")));
    }

    #[test]
    fn test_html_needs_angle_brackets() {
        let judge = ExploitabilityJudge::new();
        assert!(judge.judge(ReflectionContext::Html, &html_posture(), &chars("<>()")));
        assert!(!judge.judge(ReflectionContext::Html, &html_posture(), &chars("'\"()")));
    }

    #[test]
    fn test_js_single_quote_needs_quote() {
        let judge = ExploitabilityJudge::new();
        assert!(judge.judge(
            ReflectionContext::JsSingleQuote,
            &html_posture(),
            &chars("';()")
        ));
        assert!(!judge.judge(
            ReflectionContext::JsSingleQuote,
            &html_posture(),
            &chars(";()")
        ));
    }

    #[test]
    fn test_strict_csp_blocks_html_context() {
        let judge = ExploitabilityJudge::new();
        let posture = SecurityPosture {
            csp: Some("default-src 'self'; script-src 'self'".to_string()),
            content_type: Some("text/html".to_string()),
            ..Default::default()
        };
        assert!(!judge.judge(ReflectionContext::Html, &posture, &chars("<>()")));
    }

    #[test]
    fn test_unsafe_inline_csp_still_exploitable() {
        let judge = ExploitabilityJudge::new();
        let posture = SecurityPosture {
            csp: Some("script-src 'self' 'unsafe-inline'".to_string()),
            content_type: Some("text/html".to_string()),
            ..Default::default()
        };
        assert!(judge.judge(ReflectionContext::Html, &posture, &chars("<>()")));
    }

    #[test]
    fn test_strict_csp_allows_url_context() {
        // Open-redirect style navigation is not inline script
        let judge = ExploitabilityJudge::new();
        let posture = SecurityPosture {
            csp: Some("script-src 'self'".to_string()),
            content_type: Some("text/html".to_string()),
            ..Default::default()
        };
        assert!(judge.judge(ReflectionContext::Url, &posture, &chars(":()")));
    }

    #[test]
    fn test_strict_waf_blocks_markup() {
        let judge = ExploitabilityJudge::new();
        let posture = SecurityPosture {
            waf: Some(WafVendor::Cloudflare),
            content_type: Some("text/html".to_string()),
            ..Default::default()
        };
        assert!(!judge.judge(ReflectionContext::Html, &posture, &chars("<>()")));
        // JS string context slips past markup rules
        assert!(judge.judge(
            ReflectionContext::JsSingleQuote,
            &posture,
            &chars("';()")
        ));
    }

    #[test]
    fn test_posture_from_headers() {
        let headers = vec![
            ("Content-Type".to_string(), "text/html".to_string()),
            (
                "Content-Security-Policy".to_string(),
                "script-src 'self'".to_string(),
            ),
            ("CF-RAY".to_string(), "abc".to_string()),
        ];
        let posture = SecurityPosture::from_headers(&headers);
        assert!(posture.csp.is_some());
        assert!(!posture.csp_report_only);
        assert_eq!(posture.waf, Some(WafVendor::Cloudflare));
    }

    #[test]
    fn test_empty_unfiltered_set_is_permissive() {
        let judge = ExploitabilityJudge::new();
        assert!(judge.judge(ReflectionContext::Html, &html_posture(), &BTreeSet::new()));
    }
}
