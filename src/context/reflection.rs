// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Multi-reflection resolution
//!
//! A single response may reflect the probe at several offsets: once
//! HTML-encoded in a breadcrumb, once verbatim inside a script block.
//! Every occurrence is evaluated independently; picking only the first
//! systematically misses the one non-sanitized sink.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::classifier::classify_reflection;
use super::ReflectionContext;

/// How far past the marker the surviving-character scan may run when the
/// next occurrence is distant. Entity-encoded characters expand; the
/// reflected alphabet never legitimately outgrows this.
const LOCAL_SPAN: usize = 96;

/// One reflected occurrence of the probe marker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReflectionSite {
    /// Byte offset of the occurrence in the body
    pub offset: usize,
    /// Syntactic context at this occurrence
    pub context: ReflectionContext,
    /// Probe-alphabet characters that survived filtering here
    pub unfiltered: BTreeSet<char>,
}

/// Locate every occurrence of `marker` and classify each independently.
///
/// The probe is injected as marker + alphabet (in order), so each
/// occurrence is followed by the server's transformation of the alphabet:
/// raw, entity-encoded, backslash-escaped or removed. Sites come back in
/// left-to-right offset order. A value truncated by the server can make
/// trailing page text line up with a still-expected character; that
/// mis-read is an accepted approximation.
pub fn scan_reflections(body: &str, marker: &str, alphabet: &[char]) -> Vec<ReflectionSite> {
    if marker.is_empty() {
        return Vec::new();
    }

    let mut offsets = Vec::new();
    let mut from = 0usize;
    while let Some(found) = body[from..].find(marker) {
        let at = from + found;
        offsets.push(at);
        from = at + marker.len();
    }

    let mut sites = Vec::with_capacity(offsets.len());
    for (i, &offset) in offsets.iter().enumerate() {
        let context = classify_reflection(body, marker, Some(offset));
        let seg_start = offset + marker.len();
        let mut seg_end = offsets
            .get(i + 1)
            .copied()
            .unwrap_or(body.len())
            .min(seg_start + LOCAL_SPAN)
            .min(body.len());
        while seg_end > seg_start && !body.is_char_boundary(seg_end) {
            seg_end -= 1;
        }
        let segment = if seg_start <= seg_end && body.is_char_boundary(seg_start) {
            &body[seg_start..seg_end]
        } else {
            ""
        };
        sites.push(ReflectionSite {
            offset,
            context,
            unfiltered: surviving_chars(segment, alphabet),
        });
    }
    sites
}

/// Walk the expected alphabet in injection order against the reflected
/// segment: a raw match survived, a recognized encoding was filtered, and
/// anything else means the server removed the character.
fn surviving_chars(segment: &str, alphabet: &[char]) -> BTreeSet<char> {
    let mut out = BTreeSet::new();
    let mut cursor = 0usize;
    for &c in alphabet {
        if cursor > segment.len() {
            break;
        }
        let rest = &segment[cursor..];
        if rest.starts_with(c) {
            out.insert(c);
            cursor += c.len_utf8();
        } else if let Some(n) = encoded_len(rest, c) {
            cursor += n;
        }
        // else: removed by the server; keep the cursor where it is
    }
    out
}

/// Length of a recognized filtered encoding of `c` at the head of `rest`
fn encoded_len(rest: &str, c: char) -> Option<usize> {
    for form in entity_forms(c) {
        if rest.len() >= form.len()
            && rest.as_bytes()[..form.len()].eq_ignore_ascii_case(form.as_bytes())
        {
            return Some(form.len());
        }
    }
    // Backslash escape (JS string filtering)
    if rest.starts_with('\\') && rest[1..].starts_with(c) {
        return Some(1 + c.len_utf8());
    }
    None
}

fn entity_forms(c: char) -> &'static [&'static str] {
    match c {
        '<' => &["&lt;", "&#60;", "&#x3c;"],
        '>' => &["&gt;", "&#62;", "&#x3e;"],
        '"' => &["&quot;", "&#34;", "&#x22;"],
        '\'' => &["&#39;", "&#x27;", "&apos;"],
        '&' => &["&amp;", "&#38;", "&#x26;"],
        _ => &[],
    }
}

/// Keep every site the judge accepts; when none pass, fall back to the
/// single site with the largest surviving-character set (first wins on
/// ties) as a best-effort result.
pub fn resolve_reflections<F>(sites: Vec<ReflectionSite>, judge: F) -> Vec<ReflectionSite>
where
    F: Fn(&ReflectionSite) -> bool,
{
    let exploitable: Vec<ReflectionSite> = sites.iter().filter(|s| judge(s)).cloned().collect();
    if !exploitable.is_empty() {
        return exploitable;
    }

    let mut best: Option<ReflectionSite> = None;
    for site in sites {
        let better = match best {
            Some(ref b) => site.unfiltered.len() > b.unfiltered.len(),
            None => true,
        };
        if better {
            best = Some(site);
        }
    }
    best.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALPHABET: [char; 6] = ['\'', '"', '<', '>', '(', ')'];

    #[test]
    fn test_scan_finds_all_occurrences() {
        let body = "<div>m4rk</div><script>var a='m4rk';</script>";
        let sites = scan_reflections(body, "m4rk", &ALPHABET);
        assert_eq!(sites.len(), 2);
        assert!(sites[0].offset < sites[1].offset);
        assert_eq!(sites[0].context, ReflectionContext::Html);
        assert_eq!(sites[1].context, ReflectionContext::JsSingleQuote);
    }

    #[test]
    fn test_unfiltered_characters_are_local() {
        // First copy entity-encoded, second survives raw
        let body = "<p>m4rk&#39;&quot;&lt;&gt;()</p><script>x='m4rk'\"<>()';</script>";
        let sites = scan_reflections(body, "m4rk", &ALPHABET);
        assert_eq!(sites.len(), 2);
        assert!(!sites[0].unfiltered.contains(&'<'));
        assert!(!sites[0].unfiltered.contains(&'\''));
        assert!(sites[0].unfiltered.contains(&'('));
        assert!(sites[1].unfiltered.contains(&'<'));
        assert!(sites[1].unfiltered.contains(&'\''));
    }

    #[test]
    fn test_escaped_quote_counts_as_filtered() {
        let body = r#"<script>var a='m4rk\'\"';</script>"#;
        let sites = scan_reflections(body, "m4rk", &ALPHABET);
        assert_eq!(sites.len(), 1);
        assert!(!sites[0].unfiltered.contains(&'\''));
        assert!(!sites[0].unfiltered.contains(&'"'));
    }

    #[test]
    fn test_exploitable_site_wins_over_first() {
        let body = "<p>m4rk&lt;</p><script>var q = 'm4rk'\";</script>";
        let sites = scan_reflections(body, "m4rk", &ALPHABET);
        assert_eq!(sites.len(), 2);
        let picked = resolve_reflections(sites, |s| {
            s.context.is_script() && s.unfiltered.contains(&'\'')
        });
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].context, ReflectionContext::JsSingleQuote);
    }

    #[test]
    fn test_best_effort_when_nothing_exploitable() {
        let body = "<p>m4rk</p><div title=\"m4rk'(\">x</div>";
        let sites = scan_reflections(body, "m4rk", &ALPHABET);
        let picked = resolve_reflections(sites, |_| false);
        assert_eq!(picked.len(), 1);
        // The attribute copy kept more characters
        assert_eq!(picked[0].context, ReflectionContext::Attribute);
    }

    #[test]
    fn test_empty_inputs() {
        assert!(scan_reflections("", "m4rk", &ALPHABET).is_empty());
        assert!(scan_reflections("body", "", &ALPHABET).is_empty());
        assert!(resolve_reflections(Vec::new(), |_| true).is_empty());
    }
}
