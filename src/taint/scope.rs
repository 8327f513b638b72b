// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Taint analysis context
//!
//! Holds the lexical scope stack (name -> taint-source string), the
//! interprocedural call-argument taint map, the pending-callback and
//! tainted-`this` registries, the global-access set and the accumulated
//! findings. One context lives for exactly one `analyze` call; nothing
//! here is shared or persisted.

use std::collections::{HashMap, HashSet};

use swc_ecma_ast::{ArrowExpr, Function};

use super::{dedup_findings, Finding, JsAnalysis};

/// A function literal captured for deferred re-analysis with `this`
/// tainted, once its host object turns out to be attacker-controlled.
#[derive(Debug, Clone)]
pub enum PendingCallback {
    Function(Box<Function>),
    Arrow(Box<ArrowExpr>),
}

#[derive(Debug, Default)]
struct Scope {
    /// name -> originating taint source (e.g. "location.search")
    taint: HashMap<String, String>,
    /// every name declared in this scope, tainted or not
    declared: HashSet<String>,
}

/// Mutable state threaded through both analysis passes
#[derive(Debug, Default)]
pub struct TaintContext {
    scopes: Vec<Scope>,
    /// function name -> argument index -> taint source, from pass 1
    call_taint: HashMap<String, HashMap<usize, String>>,
    /// object name -> callbacks assigned to its properties before the
    /// object was known to be tainted
    pending_callbacks: HashMap<String, Vec<PendingCallback>>,
    /// span-keyed: function literals whose `this` is tainted
    tainted_this: HashMap<u32, String>,
    /// innermost-first `this` taint for the functions being walked;
    /// arrows do not push a frame (they inherit)
    this_stack: Vec<Option<String>>,
    global_accesses: HashSet<String>,
    findings: Vec<Finding>,
}

impl TaintContext {
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::default()],
            ..Default::default()
        }
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(Scope::default());
    }

    pub fn pop_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    /// Drop everything learned about bindings, keeping the
    /// interprocedural map. Used between pass 1 and pass 2.
    pub fn reset_scopes(&mut self) {
        self.scopes = vec![Scope::default()];
        self.this_stack.clear();
    }

    pub fn declare(&mut self, name: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.declared.insert(name.to_string());
        }
    }

    pub fn taint(&mut self, name: &str, source: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.declared.insert(name.to_string());
            scope.taint.insert(name.to_string(), source.to_string());
        }
    }

    /// Innermost-first lookup; closures see outer taint
    pub fn taint_of_ident(&self, name: &str) -> Option<String> {
        for scope in self.scopes.iter().rev() {
            if let Some(source) = scope.taint.get(name) {
                return Some(source.clone());
            }
            // A clean local declaration shadows any outer taint
            if scope.declared.contains(name) {
                return None;
            }
        }
        None
    }

    pub fn is_declared(&self, name: &str) -> bool {
        self.scopes.iter().any(|s| s.declared.contains(name))
    }

    pub fn record_global(&mut self, name: &str) {
        self.global_accesses.insert(name.to_string());
    }

    pub fn call_taint_insert(&mut self, function: &str, arg_index: usize, source: &str) {
        self.call_taint
            .entry(function.to_string())
            .or_default()
            .insert(arg_index, source.to_string());
    }

    pub fn call_taint_get(&self, function: &str) -> Option<&HashMap<usize, String>> {
        self.call_taint.get(function)
    }

    pub fn register_pending(&mut self, object: &str, callback: PendingCallback) {
        self.pending_callbacks
            .entry(object.to_string())
            .or_default()
            .push(callback);
    }

    /// Remove and return the callbacks waiting on `object`
    pub fn take_pending(&mut self, object: &str) -> Vec<PendingCallback> {
        self.pending_callbacks.remove(object).unwrap_or_default()
    }

    pub fn set_this_taint(&mut self, fn_key: u32, source: &str) {
        self.tainted_this.insert(fn_key, source.to_string());
    }

    pub fn this_taint_for(&self, fn_key: u32) -> Option<String> {
        self.tainted_this.get(&fn_key).cloned()
    }

    pub fn push_this(&mut self, taint: Option<String>) {
        self.this_stack.push(taint);
    }

    pub fn pop_this(&mut self) {
        self.this_stack.pop();
    }

    /// `this` taint of the innermost enclosing (non-arrow) function
    pub fn current_this_taint(&self) -> Option<String> {
        self.this_stack.last().cloned().flatten()
    }

    pub fn push_finding(&mut self, finding: Finding) {
        self.findings.push(finding);
    }

    /// Finish the analysis: de-duplicate findings, hand back the result
    pub fn finish(self) -> JsAnalysis {
        JsAnalysis {
            findings: dedup_findings(self.findings),
            global_accesses: self.global_accesses,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_innermost_lookup_and_shadowing() {
        let mut cx = TaintContext::new();
        cx.taint("x", "location.search");
        cx.push_scope();
        assert_eq!(cx.taint_of_ident("x").as_deref(), Some("location.search"));

        // Clean local shadow hides outer taint
        cx.declare("x");
        assert_eq!(cx.taint_of_ident("x"), None);

        cx.pop_scope();
        assert_eq!(cx.taint_of_ident("x").as_deref(), Some("location.search"));
    }

    #[test]
    fn test_scope_pop_drops_taint() {
        let mut cx = TaintContext::new();
        cx.push_scope();
        cx.taint("y", "document.cookie");
        cx.pop_scope();
        assert_eq!(cx.taint_of_ident("y"), None);
    }

    #[test]
    fn test_call_taint_map() {
        let mut cx = TaintContext::new();
        cx.call_taint_insert("handler", 0, "location.hash");
        let seeded = cx.call_taint_get("handler").expect("entry");
        assert_eq!(seeded.get(&0).map(String::as_str), Some("location.hash"));
        assert!(cx.call_taint_get("other").is_none());
    }

    #[test]
    fn test_root_scope_survives_pop() {
        let mut cx = TaintContext::new();
        cx.pop_scope();
        cx.declare("still_works");
        assert!(cx.is_declared("still_works"));
    }

    #[test]
    fn test_this_stack() {
        let mut cx = TaintContext::new();
        assert_eq!(cx.current_this_taint(), None);
        cx.push_this(Some("event.data".to_string()));
        assert_eq!(cx.current_this_taint().as_deref(), Some("event.data"));
        cx.push_this(None);
        assert_eq!(cx.current_this_taint(), None);
        cx.pop_this();
        cx.pop_this();
    }
}
