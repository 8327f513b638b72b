// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Source, sink and sanitizer tables
//!
//! One `ScanPatterns` value is built at startup and passed by reference
//! into every analysis call. Pattern compilation failures are
//! configuration errors, never per-analysis errors. Sink entries carry an
//! explicit name pattern and kind; nothing is derived from a detection
//! regex at match time.

use std::collections::HashSet;

use regex::Regex;

use crate::context::ReflectionContext;
use crate::error::{Error, Result};
use crate::taint::Confidence;

/// Characters injected after the probe marker to learn what survives
/// server-side filtering, in injection order.
pub const PROBE_ALPHABET: [char; 20] = [
    '\'', '"', '<', '>', '(', ')', '{', '}', '[', ']', ';', ':', '|', '&', '$', '%', '=', '`',
    '/', '\\',
];

/// How a sink consumes data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkKind {
    /// Dangerous call argument (`eval(x)`, `document.write(x)`)
    Call,
    /// Dangerous assignment target (`el.innerHTML = x`)
    Assign,
}

/// A dangerous sink: explicit name pattern, kind and reporting metadata
#[derive(Debug, Clone)]
pub struct SinkSpec {
    /// Short name used in findings
    pub name: &'static str,
    /// Pattern matched against the structurally-resolved dotted name
    pub pattern: Regex,
    /// Call or assignment sink
    pub kind: SinkKind,
    /// Which argument is dangerous (call sinks)
    pub arg_index: usize,
    /// Context a payload for this sink lands in
    pub context: ReflectionContext,
    /// Confidence when tainted data reaches it
    pub confidence: Confidence,
    /// Finding description
    pub description: &'static str,
}

/// A taint source pattern matched against resolved dotted names
#[derive(Debug, Clone)]
pub struct SourcePattern {
    pub pattern: Regex,
}

/// Pattern tables threaded through every analysis call
#[derive(Debug)]
pub struct ScanPatterns {
    sources: Vec<SourcePattern>,
    sinks: Vec<SinkSpec>,
    sanitizer_exact: HashSet<&'static str>,
    sanitizer_suffix: Vec<&'static str>,
    safe_accessors: HashSet<&'static str>,
    probe_alphabet: Vec<char>,
}

impl ScanPatterns {
    /// Build the default tables. Compile failure of any entry is a
    /// startup configuration error.
    pub fn new() -> Result<Self> {
        let source_patterns = [
            r"^(?:window\.|self\.|top\.|parent\.|document\.)?location(?:\.(?:href|search|hash|pathname|host|hostname))?$",
            r"^document\.(?:cookie|referrer|URL|documentURI|baseURI)$",
            r"^(?:window\.|self\.)?name$",
            r"^(?:window\.)?(?:localStorage|sessionStorage)(?:\..+)?$",
            r"^event\.data$",
            r"^(?:window\.)?history\.state$",
        ];

        let mut sources = Vec::with_capacity(source_patterns.len());
        for p in source_patterns {
            sources.push(SourcePattern {
                pattern: compile(p)?,
            });
        }

        let sink_table: [(&str, &str, SinkKind, usize, ReflectionContext, Confidence, &str); 16] = [
            (
                "eval",
                r"^(?:window\.)?eval$",
                SinkKind::Call,
                0,
                ReflectionContext::JsRaw,
                Confidence::High,
                "JavaScript execution via eval",
            ),
            (
                "Function",
                r"^(?:window\.)?Function$",
                SinkKind::Call,
                0,
                ReflectionContext::JsRaw,
                Confidence::High,
                "JavaScript execution via Function constructor",
            ),
            (
                "setTimeout",
                r"^(?:window\.)?setTimeout$",
                SinkKind::Call,
                0,
                ReflectionContext::JsRaw,
                Confidence::High,
                "Delayed JavaScript execution via setTimeout",
            ),
            (
                "setInterval",
                r"^(?:window\.)?setInterval$",
                SinkKind::Call,
                0,
                ReflectionContext::JsRaw,
                Confidence::High,
                "Repeated JavaScript execution via setInterval",
            ),
            (
                "document.write",
                r"^document\.write(?:ln)?$",
                SinkKind::Call,
                0,
                ReflectionContext::Html,
                Confidence::High,
                "HTML injection via document.write",
            ),
            (
                "importScripts",
                r"^importScripts$",
                SinkKind::Call,
                0,
                ReflectionContext::Url,
                Confidence::High,
                "Worker script inclusion via importScripts",
            ),
            (
                "innerHTML",
                r"\.innerHTML$",
                SinkKind::Assign,
                0,
                ReflectionContext::Html,
                Confidence::High,
                "HTML injection via innerHTML",
            ),
            (
                "outerHTML",
                r"\.outerHTML$",
                SinkKind::Assign,
                0,
                ReflectionContext::Html,
                Confidence::High,
                "HTML injection via outerHTML",
            ),
            (
                "srcdoc",
                r"\.srcdoc$",
                SinkKind::Assign,
                0,
                ReflectionContext::Html,
                Confidence::High,
                "Frame HTML injection via srcdoc",
            ),
            (
                "insertAdjacentHTML",
                r"\.insertAdjacentHTML$",
                SinkKind::Call,
                1,
                ReflectionContext::Html,
                Confidence::High,
                "HTML injection via insertAdjacentHTML",
            ),
            (
                "jQuery.html",
                r"\.(?:html|append|prepend|after|before|replaceWith)$",
                SinkKind::Call,
                0,
                ReflectionContext::Html,
                Confidence::Medium,
                "HTML injection via jQuery manipulation",
            ),
            (
                "dangerouslySetInnerHTML",
                r"dangerouslySetInnerHTML$",
                SinkKind::Assign,
                0,
                ReflectionContext::Html,
                Confidence::High,
                "HTML injection via React dangerouslySetInnerHTML",
            ),
            (
                "bypassSecurityTrust",
                r"\.bypassSecurityTrust(?:Html|Script|Url|ResourceUrl)$",
                SinkKind::Call,
                0,
                ReflectionContext::Html,
                Confidence::High,
                "Angular sanitizer bypass",
            ),
            (
                "location",
                r"^(?:window\.|self\.|top\.|parent\.)?location(?:\.href)?$",
                SinkKind::Assign,
                0,
                ReflectionContext::Url,
                Confidence::High,
                "Navigation via location assignment",
            ),
            (
                "location.replace",
                r"^(?:window\.|self\.|top\.|parent\.)?location\.(?:replace|assign)$",
                SinkKind::Call,
                0,
                ReflectionContext::Url,
                Confidence::High,
                "Navigation via location method",
            ),
            (
                "element.url",
                r"\.(?:src|href|action)$",
                SinkKind::Assign,
                0,
                ReflectionContext::Url,
                Confidence::Medium,
                "URL injection via element attribute",
            ),
        ];

        let mut sinks = Vec::with_capacity(sink_table.len());
        for (name, pattern, kind, arg_index, context, confidence, description) in sink_table {
            sinks.push(SinkSpec {
                name,
                pattern: compile(pattern)?,
                kind,
                arg_index,
                context,
                confidence,
                description,
            });
        }

        let sanitizer_exact: HashSet<&'static str> = [
            "encodeURIComponent",
            "encodeURIComponent.call",
            "encodeURI",
            "escapeHTML",
            "DOMPurify.sanitize",
            "sanitizeHtml",
        ]
        .into_iter()
        .collect();

        let sanitizer_suffix = vec![".escape", ".sanitize", ".escapeHTML", ".encodeHTML"];

        let safe_accessors: HashSet<&'static str> = [
            "length",
            "size",
            "indexOf",
            "lastIndexOf",
            "includes",
            "charCodeAt",
            "codePointAt",
            "startsWith",
            "endsWith",
            "test",
            "localeCompare",
            "hasOwnProperty",
            "nodeType",
            "tagName",
            "nodeName",
        ]
        .into_iter()
        .collect();

        Ok(Self {
            sources,
            sinks,
            sanitizer_exact,
            sanitizer_suffix,
            safe_accessors,
            probe_alphabet: PROBE_ALPHABET.to_vec(),
        })
    }

    /// Does a resolved dotted name denote attacker-controlled data?
    /// Returns the matched name as the taint-source string.
    pub fn source_for(&self, name: &str) -> Option<String> {
        if self.sources.iter().any(|s| s.pattern.is_match(name)) {
            Some(name.to_string())
        } else {
            None
        }
    }

    /// First sink spec of the given kind matching a resolved name
    pub fn sink_matching(&self, name: &str, kind: SinkKind) -> Option<&SinkSpec> {
        self.sinks
            .iter()
            .find(|s| s.kind == kind && s.pattern.is_match(name))
    }

    /// Recognized sanitizer call name — short-circuits all taint rules
    pub fn is_sanitizer(&self, name: &str) -> bool {
        self.sanitizer_exact.contains(name)
            || self
                .sanitizer_suffix
                .iter()
                .any(|suffix| name.ends_with(suffix))
    }

    /// Property/method that inspects rather than carries a value
    /// (`.length`, `.indexOf`, ...)
    pub fn is_safe_accessor(&self, name: &str) -> bool {
        self.safe_accessors.contains(name)
    }

    /// Characters appended to the probe marker
    pub fn probe_alphabet(&self) -> &[char] {
        &self.probe_alphabet
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| Error::pattern(pattern, e.to_string()))
}
