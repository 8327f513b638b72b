// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Reflection context classification
//!
//! Maps a reflected probe inside an HTTP response body to the syntactic
//! location it landed in. The context decides which payload syntax can
//! execute and feeds the exploitability judge.

mod classifier;
mod lexer;
mod reflection;

pub use classifier::classify_reflection;
pub use lexer::{classify_in_js, JsLexState};
pub use reflection::{resolve_reflections, scan_reflections, ReflectionSite};

use serde::{Deserialize, Serialize};

/// Syntactic context a reflected probe occupies.
///
/// Exactly one context is produced per (body, probe-offset) pair.
/// `Unknown` is the fallback when no structural rule matches and the
/// probe is absent or unplaceable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReflectionContext {
    /// Plain HTML text content
    Html,
    /// Inside a quoted attribute value
    Attribute,
    /// Inside a single-quoted JavaScript string
    JsSingleQuote,
    /// Inside a double-quoted JavaScript string
    JsDoubleQuote,
    /// Bare JavaScript code (or a regex literal)
    JsRaw,
    /// Inside a backtick template literal
    TemplateLiteral,
    /// Inside a `<style>` block or `style=""` attribute
    Css,
    /// Inside a URL-bearing attribute (href/src/action/data/formaction)
    Url,
    /// Inside a `data:` URI value
    DataUri,
    /// Inside an `<svg>` subtree
    Svg,
    /// Inside a `<meta http-equiv=refresh>` content value
    MetaRefresh,
    /// Inside an HTML or JavaScript comment
    Comment,
    /// Angular template expression position (CSTI)
    Angular,
    /// The probe is itself a tag name (`<PROBE ...`)
    TagName,
    /// Inside an RCDATA element (`<title>`, `<textarea>`)
    Rcdata,
    /// No structural rule matched
    Unknown,
}

impl ReflectionContext {
    /// Contexts rendered as markup, where breaking out requires `<`/`>`
    pub fn is_markup(&self) -> bool {
        matches!(
            self,
            ReflectionContext::Html
                | ReflectionContext::Svg
                | ReflectionContext::Rcdata
                | ReflectionContext::TagName
        )
    }

    /// Contexts inside executable script text
    pub fn is_script(&self) -> bool {
        matches!(
            self,
            ReflectionContext::JsSingleQuote
                | ReflectionContext::JsDoubleQuote
                | ReflectionContext::JsRaw
                | ReflectionContext::TemplateLiteral
        )
    }

    /// Short lowercase name used in reports
    pub fn as_str(&self) -> &'static str {
        match self {
            ReflectionContext::Html => "html",
            ReflectionContext::Attribute => "attribute",
            ReflectionContext::JsSingleQuote => "js_single_quote",
            ReflectionContext::JsDoubleQuote => "js_double_quote",
            ReflectionContext::JsRaw => "js_raw",
            ReflectionContext::TemplateLiteral => "template_literal",
            ReflectionContext::Css => "css",
            ReflectionContext::Url => "url",
            ReflectionContext::DataUri => "data_uri",
            ReflectionContext::Svg => "svg",
            ReflectionContext::MetaRefresh => "meta_refresh",
            ReflectionContext::Comment => "comment",
            ReflectionContext::Angular => "angular",
            ReflectionContext::TagName => "tag_name",
            ReflectionContext::Rcdata => "rcdata",
            ReflectionContext::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ReflectionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
