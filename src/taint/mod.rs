// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Static DOM taint analysis
//!
//! Parses JavaScript into an AST and tracks attacker-controlled data from
//! sources (`location.*`, `document.cookie`, `postMessage` data, storage)
//! to dangerous sinks (`eval`, `innerHTML`, navigation, prototype
//! mutation), with sanitizer recognition, scope-aware propagation and a
//! two-pass interprocedural scheme. Purely static: no DOM, no JS runtime,
//! and approximate by design.

mod dom;
mod scope;
mod walker;

pub use dom::{scan_document, DomScanResult};
pub use scope::{PendingCallback, TaintContext};
pub use walker::JsTaintAnalyzer;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::context::ReflectionContext;

/// Finding confidence tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Confidence::Low => f.write_str("LOW"),
            Confidence::Medium => f.write_str("MEDIUM"),
            Confidence::High => f.write_str("HIGH"),
        }
    }
}

/// A confirmed taint flow or structural detection.
///
/// Immutable once created; duplicates collapse on the
/// (source, sink, description) tuple at the end of a scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    /// Originating taint source (e.g. "location.search", "event.data")
    pub source: String,
    /// Sink or pattern name (e.g. "innerHTML", "eval", "prototype")
    pub sink: String,
    /// 1-based line in the analyzed script, when known
    pub line: Option<usize>,
    /// Confidence tier
    pub confidence: Confidence,
    /// Human-readable description
    pub description: String,
    /// Code snippet around the detection
    pub evidence: String,
    /// Context inferred from the sink, for payload selection
    pub inferred_context: ReflectionContext,
}

impl Finding {
    fn dedup_key(&self) -> (String, String, String) {
        (
            self.source.clone(),
            self.sink.clone(),
            self.description.clone(),
        )
    }
}

impl std::fmt::Display for Finding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}] {} -> {} ({})",
            self.confidence, self.source, self.sink, self.description
        )?;
        if let Some(line) = self.line {
            write!(f, " at line {}", line)?;
        }
        Ok(())
    }
}

/// Result of analyzing one piece of JavaScript
#[derive(Debug, Clone, Default)]
pub struct JsAnalysis {
    /// Findings in detection order, de-duplicated
    pub findings: Vec<Finding>,
    /// Identifiers read but never declared in any enclosing scope
    pub global_accesses: HashSet<String>,
}

/// Analyze one piece of JavaScript with the given pattern tables.
/// Convenience wrapper over [`JsTaintAnalyzer`]; parse failure yields an
/// empty analysis.
pub fn analyze_js(code: &str, patterns: &crate::patterns::ScanPatterns) -> JsAnalysis {
    JsTaintAnalyzer::new(patterns).analyze(code)
}

/// Drop later duplicates of the (source, sink, description) tuple.
/// First occurrence wins; order is otherwise preserved.
pub fn dedup_findings(findings: Vec<Finding>) -> Vec<Finding> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(findings.len());
    for finding in findings {
        if seen.insert(finding.dedup_key()) {
            out.push(finding);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(source: &str, sink: &str, desc: &str, line: usize) -> Finding {
        Finding {
            source: source.to_string(),
            sink: sink.to_string(),
            line: Some(line),
            confidence: Confidence::High,
            description: desc.to_string(),
            evidence: String::new(),
            inferred_context: ReflectionContext::Html,
        }
    }

    #[test]
    fn test_dedup_keeps_first() {
        let all = vec![
            finding("location.search", "innerHTML", "DOM XSS", 3),
            finding("location.search", "eval", "DOM XSS", 5),
            finding("location.search", "innerHTML", "DOM XSS", 9),
        ];
        let deduped = dedup_findings(all);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].line, Some(3));
        assert_eq!(deduped[1].sink, "eval");
    }

    #[test]
    fn test_confidence_ordering() {
        assert!(Confidence::High > Confidence::Medium);
        assert!(Confidence::Medium > Confidence::Low);
    }
}
