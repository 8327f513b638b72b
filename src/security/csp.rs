// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Content Security Policy analysis
//!
//! Parses CSP headers/meta tags and identifies the bypasses that matter
//! for XSS exploitability. Consumed by the posture judge: a policy that
//! blocks inline script without a usable bypass downgrades markup and
//! script contexts to not-exploitable.

use std::collections::HashMap;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// CSP analysis result
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CspAnalysis {
    /// Raw policy string
    pub policy: String,
    /// Parsed directives
    pub directives: HashMap<String, Vec<String>>,
    /// Identified bypasses
    pub bypasses: Vec<CspBypass>,
    /// Whether the policy blocks inline scripts
    pub blocks_inline: bool,
    /// Whether the policy blocks eval()
    pub blocks_eval: bool,
}

impl CspAnalysis {
    /// Any bypass strong enough to defeat the policy for script injection
    pub fn is_bypassable(&self) -> bool {
        self.bypasses.iter().any(|b| b.severity() >= 7)
    }
}

/// CSP bypass type
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum CspBypass {
    /// 'unsafe-inline' allows inline scripts
    UnsafeInline,
    /// 'unsafe-eval' allows eval()
    UnsafeEval,
    /// data: allowed in a script-capable directive
    DataUri,
    /// Wildcard in a script-capable source list
    WildcardSource(String),
    /// JSONP-capable endpoint in the allowed origins
    JsonpEndpoint(String),
    /// Whitelisted CDN hosting exploitable scripts
    CdnBypass(String),
    /// Angular CSTI sidesteps script-src entirely
    AngularBypass,
    /// Policy is report-only, not enforced
    ReportOnly,
}

impl CspBypass {
    /// Severity 1-10
    pub fn severity(&self) -> u8 {
        match self {
            CspBypass::UnsafeInline => 10,
            CspBypass::ReportOnly => 10,
            CspBypass::JsonpEndpoint(_) => 9,
            CspBypass::AngularBypass => 9,
            CspBypass::UnsafeEval => 8,
            CspBypass::CdnBypass(_) => 8,
            CspBypass::DataUri => 7,
            CspBypass::WildcardSource(_) => 6,
        }
    }

    /// Human-readable description
    pub fn description(&self) -> String {
        match self {
            CspBypass::UnsafeInline => "unsafe-inline allows arbitrary inline scripts".to_string(),
            CspBypass::UnsafeEval => "unsafe-eval allows eval() and Function()".to_string(),
            CspBypass::DataUri => "data: URIs can carry script payloads".to_string(),
            CspBypass::WildcardSource(src) => format!("Wildcard source {} allows many origins", src),
            CspBypass::JsonpEndpoint(url) => format!("JSONP endpoint {} can bypass CSP", url),
            CspBypass::CdnBypass(cdn) => format!("CDN {} hosts exploitable scripts", cdn),
            CspBypass::AngularBypass => "Angular templates execute without inline script".to_string(),
            CspBypass::ReportOnly => "CSP is report-only, not enforced".to_string(),
        }
    }
}

/// CSP analyzer
#[derive(Debug)]
pub struct CspAnalyzer {
    jsonp_patterns: Vec<Regex>,
    vulnerable_cdns: Vec<&'static str>,
}

impl Default for CspAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl CspAnalyzer {
    pub fn new() -> Self {
        let jsonp_patterns = [r"callback=", r"jsonp=", r"\bcb="]
            .iter()
            .filter_map(|p| Regex::new(p).ok())
            .collect();

        let vulnerable_cdns = vec![
            "cdnjs.cloudflare.com",
            "cdn.jsdelivr.net",
            "unpkg.com",
            "ajax.googleapis.com",
            "code.jquery.com",
        ];

        Self {
            jsonp_patterns,
            vulnerable_cdns,
        }
    }

    /// Parse a policy string
    pub fn parse(&self, csp: &str) -> CspAnalysis {
        let mut analysis = CspAnalysis {
            policy: csp.to_string(),
            ..Default::default()
        };

        for directive in csp.split(';') {
            let directive = directive.trim();
            if directive.is_empty() {
                continue;
            }
            let parts: Vec<&str> = directive.split_whitespace().collect();
            let Some((name, values)) = parts.split_first() else {
                continue;
            };
            let name = name.to_lowercase();
            let values: Vec<String> = values.iter().map(|s| s.to_string()).collect();

            self.check_sources(&name, &values, &mut analysis);
            analysis.directives.insert(name, values);
        }

        analysis.blocks_inline = self.blocks_inline(&analysis);
        analysis.blocks_eval = self.blocks_eval(&analysis);
        analysis
    }

    /// Parse from HTTP response headers (lowercased names)
    pub fn parse_from_headers(&self, headers: &[(String, String)]) -> Option<CspAnalysis> {
        for (name, value) in headers {
            if name.eq_ignore_ascii_case("content-security-policy") {
                return Some(self.parse(value));
            }
        }
        for (name, value) in headers {
            if name.eq_ignore_ascii_case("content-security-policy-report-only") {
                let mut analysis = self.parse(value);
                analysis.bypasses.push(CspBypass::ReportOnly);
                return Some(analysis);
            }
        }
        None
    }

    fn check_sources(&self, name: &str, values: &[String], analysis: &mut CspAnalysis) {
        let script_capable = name == "script-src" || name == "default-src";

        for value in values {
            let value_lower = value.to_lowercase();

            if script_capable {
                match value_lower.as_str() {
                    "'unsafe-inline'" => analysis.bypasses.push(CspBypass::UnsafeInline),
                    "'unsafe-eval'" => analysis.bypasses.push(CspBypass::UnsafeEval),
                    "data:" => analysis.bypasses.push(CspBypass::DataUri),
                    _ => {}
                }

                if value.contains('*') && !value.starts_with('\'') {
                    analysis
                        .bypasses
                        .push(CspBypass::WildcardSource(value.clone()));
                }

                for cdn in &self.vulnerable_cdns {
                    if value_lower.contains(cdn) {
                        analysis.bypasses.push(CspBypass::CdnBypass(cdn.to_string()));
                    }
                }

                if self.jsonp_patterns.iter().any(|p| p.is_match(&value_lower)) {
                    analysis
                        .bypasses
                        .push(CspBypass::JsonpEndpoint(value.clone()));
                }
            }
        }
    }

    fn script_sources<'a>(&self, analysis: &'a CspAnalysis) -> Option<&'a Vec<String>> {
        analysis
            .directives
            .get("script-src")
            .or_else(|| analysis.directives.get("default-src"))
    }

    fn blocks_inline(&self, analysis: &CspAnalysis) -> bool {
        match self.script_sources(analysis) {
            Some(sources) => !sources.iter().any(|s| s.eq_ignore_ascii_case("'unsafe-inline'")),
            // No script-capable directive at all: nothing is blocked
            None => false,
        }
    }

    fn blocks_eval(&self, analysis: &CspAnalysis) -> bool {
        match self.script_sources(analysis) {
            Some(sources) => !sources.iter().any(|s| s.eq_ignore_ascii_case("'unsafe-eval'")),
            None => false,
        }
    }
}

/// Extract a CSP policy from a meta tag in an HTML body
pub fn extract_csp_from_html(html: &str) -> Option<String> {
    let re = Regex::new(
        r#"(?i)<meta[^>]*http-equiv\s*=\s*["']?content-security-policy["']?[^>]*content\s*=\s*["']([^"']+)["']"#,
    )
    .ok()?;
    re.captures(html).map(|c| c[1].to_string())
}
