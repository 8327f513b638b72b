// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! # Seitti - Context-Aware XSS Prober
//!
//! A command-line XSS prober built around static analysis. No headless
//! browser, no JavaScript runtime: responses are classified textually and
//! scripts are analyzed as ASTs.
//!
//! ## Features
//!
//! - Reflection context classification: ~15 syntactic contexts decided by
//!   a quote/brace/comment-aware scanner, not regex guessing
//! - Multi-reflection resolution: every occurrence judged independently
//! - Static DOM taint analysis: scope-aware, two-pass interprocedural
//!   source-to-sink tracking with sanitizer recognition
//! - Prototype-pollution and postMessage-listener auditing
//! - DOM-clobbering detection confirmed against actual global reads
//! - CSP bypass analysis and WAF-aware exploitability judgment
//! - Context-matched payload suggestion with polyglot fallback
//! - Deep mode: external scripts fetched once through a bounded cache
//!
//! ## Example
//!
//! ```rust
//! use seitti::{classify_reflection, ReflectionContext};
//!
//! let body = "<script>var q = 'PROBE';</script>";
//! let context = classify_reflection(body, "PROBE", None);
//! assert_eq!(context, ReflectionContext::JsSingleQuote);
//! ```

pub mod context;
pub mod error;
pub mod http;
pub mod patterns;
pub mod payload;
pub mod scanner;
pub mod security;
pub mod taint;

// Re-exports for convenience

// Context classification
pub use context::{
    classify_reflection, resolve_reflections, scan_reflections, ReflectionContext, ReflectionSite,
};

// Errors
pub use error::{Error, Result};

// Pattern tables
pub use patterns::{ScanPatterns, SinkKind, SinkSpec, PROBE_ALPHABET};

// Taint analysis
pub use taint::{
    analyze_js, scan_document, Confidence, DomScanResult, Finding, JsAnalysis, JsTaintAnalyzer,
};

// Payloads
pub use payload::{PayloadEncoding, PayloadGenerator, PayloadSuggestion, TechHint};

// Security posture
pub use security::{
    extract_csp_from_html, CspAnalysis, CspAnalyzer, CspBypass, ExploitabilityJudge,
    SecurityPosture, WafVendor,
};

// HTTP
pub use http::{HttpClient, HttpClientConfig, ProbeResponse, ScriptCache};

// Scanning
pub use scanner::{ParameterFinding, ScanConfig, Scanner, UrlScanResult};

/// Seitti version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
