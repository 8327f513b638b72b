// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! JS lexical state machine
//!
//! Single-pass scanner that decides which lexical region of a piece of
//! JavaScript a probe lands in: quoted string, template literal, comment,
//! regex literal or bare code. Handles escape sequences and nested
//! `${...}` template blocks. The regex/division disambiguation is a
//! documented approximation: a `/` starts a regex only when the previous
//! non-whitespace character is one of `( = , : ? [ { !` or start-of-input.

use super::ReflectionContext;

/// Lexical state at a given offset in JavaScript text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsLexState {
    /// Bare code
    None,
    /// Inside '...'
    SingleQuote,
    /// Inside "..."
    DoubleQuote,
    /// Inside `...`
    TemplateLiteral,
    /// Inside // ...
    CommentLine,
    /// Inside /* ... */
    CommentBlock,
    /// Inside a regex literal
    Regex,
}

impl JsLexState {
    fn to_context(self) -> ReflectionContext {
        match self {
            JsLexState::SingleQuote => ReflectionContext::JsSingleQuote,
            JsLexState::DoubleQuote => ReflectionContext::JsDoubleQuote,
            JsLexState::TemplateLiteral => ReflectionContext::TemplateLiteral,
            JsLexState::CommentLine | JsLexState::CommentBlock => ReflectionContext::Comment,
            JsLexState::Regex | JsLexState::None => ReflectionContext::JsRaw,
        }
    }
}

/// Scan `code` left to right and classify the lexical state at the first
/// occurrence of `probe`. Returns `(false, Unknown)` when the probe never
/// appears.
pub fn classify_in_js(code: &str, probe: &str) -> (bool, ReflectionContext) {
    if probe.is_empty() {
        return (false, ReflectionContext::Unknown);
    }

    let bytes = code.as_bytes();
    let probe_bytes = probe.as_bytes();
    let mut state = JsLexState::None;
    // Brace depth of each open `${` frame; the frame also remembers that
    // the enclosing state was a template literal.
    let mut template_frames: Vec<u32> = Vec::new();
    let mut i = 0usize;

    while i < bytes.len() {
        if bytes[i..].starts_with(probe_bytes) {
            return (true, state.to_context());
        }

        let c = bytes[i];
        match state {
            JsLexState::None => match c {
                b'\'' => state = JsLexState::SingleQuote,
                b'"' => state = JsLexState::DoubleQuote,
                b'`' => state = JsLexState::TemplateLiteral,
                b'/' if i + 1 < bytes.len() && bytes[i + 1] == b'/' => {
                    state = JsLexState::CommentLine;
                    i += 1;
                }
                b'/' if i + 1 < bytes.len() && bytes[i + 1] == b'*' => {
                    state = JsLexState::CommentBlock;
                    i += 1;
                }
                b'/' if regex_can_start(bytes, i) => state = JsLexState::Regex,
                b'{' => {
                    if let Some(depth) = template_frames.last_mut() {
                        *depth += 1;
                    }
                }
                b'}' => {
                    if let Some(depth) = template_frames.last_mut() {
                        if *depth == 0 {
                            template_frames.pop();
                            state = JsLexState::TemplateLiteral;
                        } else {
                            *depth -= 1;
                        }
                    }
                }
                _ => {}
            },
            JsLexState::SingleQuote => {
                if c == b'\'' && !is_escaped(bytes, i) {
                    state = JsLexState::None;
                }
            }
            JsLexState::DoubleQuote => {
                if c == b'"' && !is_escaped(bytes, i) {
                    state = JsLexState::None;
                }
            }
            JsLexState::TemplateLiteral => {
                if c == b'`' && !is_escaped(bytes, i) {
                    state = JsLexState::None;
                } else if c == b'$'
                    && i + 1 < bytes.len()
                    && bytes[i + 1] == b'{'
                    && !is_escaped(bytes, i)
                {
                    template_frames.push(0);
                    state = JsLexState::None;
                    i += 1;
                }
            }
            JsLexState::CommentLine => {
                if c == b'\n' {
                    state = JsLexState::None;
                }
            }
            JsLexState::CommentBlock => {
                if c == b'*' && i + 1 < bytes.len() && bytes[i + 1] == b'/' {
                    state = JsLexState::None;
                    i += 1;
                }
            }
            JsLexState::Regex => {
                if (c == b'/' || c == b'\n') && !is_escaped(bytes, i) {
                    state = JsLexState::None;
                }
            }
        }

        i += 1;
    }

    (false, ReflectionContext::Unknown)
}

/// Odd number of consecutive backslashes immediately before `pos`.
fn is_escaped(bytes: &[u8], pos: usize) -> bool {
    let mut count = 0usize;
    let mut j = pos;
    while j > 0 && bytes[j - 1] == b'\\' {
        count += 1;
        j -= 1;
    }
    count % 2 == 1
}

/// A `/` can start a regex literal when the previous non-whitespace
/// character is an operator or open bracket. Division after an identifier
/// or closing paren is the common false case, accepted as an approximation.
fn regex_can_start(bytes: &[u8], pos: usize) -> bool {
    let mut j = pos;
    while j > 0 {
        j -= 1;
        let c = bytes[j];
        if c.is_ascii_whitespace() {
            continue;
        }
        return matches!(c, b'(' | b'=' | b',' | b':' | b'?' | b'[' | b'{' | b'!');
    }
    true // start of input
}
