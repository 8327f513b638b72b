// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! AST walker and taint detectors
//!
//! Recursive visitor over the swc JavaScript AST. Two passes: the first
//! collects call-site argument taint for named function declarations
//! without entering any function body; the second walks everything,
//! seeding declared functions' parameters from that map so taint crosses
//! call boundaries regardless of declaration order.
//!
//! A parse failure aborts analysis of that one script only and yields an
//! empty result.

use swc_common::{sync::Lrc, FileName, SourceFile, SourceMap, Span};
use swc_ecma_ast::{
    ArrowExpr, AssignExpr, AssignTarget, AssignTargetPat, BlockStmtOrExpr, CallExpr, Callee,
    Decl, EsVersion, Expr, ForHead, Function, Lit, MemberExpr, MemberProp, NewExpr, Pat,
    Script, SimpleAssignTarget, Stmt, VarDecl, VarDeclOrExpr,
};
use swc_ecma_parser::{lexer::Lexer, Parser, StringInput, Syntax};

use super::scope::{PendingCallback, TaintContext};
use super::{Confidence, Finding, JsAnalysis};
use crate::context::ReflectionContext;
use crate::patterns::{ScanPatterns, SinkKind};

/// Static taint analyzer for one piece of JavaScript
pub struct JsTaintAnalyzer<'p> {
    patterns: &'p ScanPatterns,
}

impl<'p> JsTaintAnalyzer<'p> {
    pub fn new(patterns: &'p ScanPatterns) -> Self {
        Self { patterns }
    }

    /// Parse and analyze `code`. Unparseable input yields an empty
    /// analysis, never an error.
    pub fn analyze(&self, code: &str) -> JsAnalysis {
        let (script, file) = match parse_script(code) {
            Some(parsed) => parsed,
            None => return JsAnalysis::default(),
        };

        let walk = Walk {
            patterns: self.patterns,
            code,
            base: file.start_pos.0,
        };
        let mut cx = TaintContext::new();

        // Pass 1: top-level call-argument taint, function bodies skipped
        for stmt in &script.body {
            walk.pass1_stmt(stmt, &mut cx);
        }
        cx.reset_scopes();

        // Pass 2: the full walk. Function declarations hoist, so their
        // names are never "global accesses".
        for stmt in &script.body {
            if let Stmt::Decl(Decl::Fn(decl)) = stmt {
                cx.declare(decl.ident.sym.as_ref());
            }
        }
        for stmt in &script.body {
            walk.walk_stmt(stmt, &mut cx);
        }

        cx.finish()
    }
}

fn parse_script(code: &str) -> Option<(Script, Lrc<SourceFile>)> {
    let cm: Lrc<SourceMap> = Default::default();
    let fm = cm.new_source_file(FileName::Anon, code.to_string());
    let lexer = Lexer::new(
        Syntax::Es(Default::default()),
        EsVersion::Es2022,
        StringInput::from(&*fm),
        None,
    );
    let mut parser = Parser::new_from(lexer);
    let result = parser.parse_script();
    let errors = parser.take_errors();
    match result {
        // Recovered syntax errors still mean the script is not trustworthy
        Ok(script) if errors.is_empty() => Some((script, fm)),
        _ => None,
    }
}

struct Walk<'a> {
    patterns: &'a ScanPatterns,
    code: &'a str,
    base: u32,
}

impl<'a> Walk<'a> {
    // ---- pass 1: interprocedural call-argument collection ----

    fn pass1_stmt(&self, stmt: &Stmt, cx: &mut TaintContext) {
        match stmt {
            Stmt::Decl(Decl::Var(var)) => self.pass1_var(var, cx),
            Stmt::Decl(_) => {} // function bodies are skipped in pass 1
            Stmt::Expr(e) => self.pass1_expr(&e.expr, cx),
            Stmt::Block(b) => {
                for s in &b.stmts {
                    self.pass1_stmt(s, cx);
                }
            }
            Stmt::If(i) => {
                self.pass1_expr(&i.test, cx);
                self.pass1_stmt(&i.cons, cx);
                if let Some(alt) = &i.alt {
                    self.pass1_stmt(alt, cx);
                }
            }
            Stmt::While(w) => {
                self.pass1_expr(&w.test, cx);
                self.pass1_stmt(&w.body, cx);
            }
            Stmt::DoWhile(d) => {
                self.pass1_stmt(&d.body, cx);
                self.pass1_expr(&d.test, cx);
            }
            Stmt::For(f) => {
                match &f.init {
                    Some(VarDeclOrExpr::VarDecl(v)) => self.pass1_var(v, cx),
                    Some(VarDeclOrExpr::Expr(e)) => self.pass1_expr(e, cx),
                    None => {}
                }
                if let Some(test) = &f.test {
                    self.pass1_expr(test, cx);
                }
                if let Some(update) = &f.update {
                    self.pass1_expr(update, cx);
                }
                self.pass1_stmt(&f.body, cx);
            }
            Stmt::Try(t) => {
                for s in &t.block.stmts {
                    self.pass1_stmt(s, cx);
                }
                if let Some(handler) = &t.handler {
                    for s in &handler.body.stmts {
                        self.pass1_stmt(s, cx);
                    }
                }
                if let Some(finalizer) = &t.finalizer {
                    for s in &finalizer.stmts {
                        self.pass1_stmt(s, cx);
                    }
                }
            }
            Stmt::Return(r) => {
                if let Some(arg) = &r.arg {
                    self.pass1_expr(arg, cx);
                }
            }
            Stmt::Labeled(l) => self.pass1_stmt(&l.body, cx),
            _ => {}
        }
    }

    fn pass1_var(&self, var: &VarDecl, cx: &mut TaintContext) {
        for decl in &var.decls {
            if let Some(init) = &decl.init {
                self.pass1_expr(init, cx);
                if let Pat::Ident(binding) = &decl.name {
                    let name = binding.id.sym.as_ref();
                    cx.declare(name);
                    if let Some(source) = self.taint_of(init, cx) {
                        cx.taint(name, &source);
                    }
                }
            }
        }
    }

    fn pass1_expr(&self, expr: &Expr, cx: &mut TaintContext) {
        match expr {
            Expr::Call(call) => {
                if let Callee::Expr(callee) = &call.callee {
                    if let Expr::Ident(ident) = &**callee {
                        for (index, arg) in call.args.iter().enumerate() {
                            if let Some(source) = self.taint_of(&arg.expr, cx) {
                                cx.call_taint_insert(ident.sym.as_ref(), index, &source);
                            }
                        }
                    }
                }
                for arg in &call.args {
                    self.pass1_expr(&arg.expr, cx);
                }
            }
            Expr::Assign(assign) => {
                if let AssignTarget::Simple(SimpleAssignTarget::Ident(binding)) = &assign.left {
                    let name = binding.id.sym.as_ref();
                    cx.declare(name);
                    if let Some(source) = self.taint_of(&assign.right, cx) {
                        cx.taint(name, &source);
                    }
                }
                self.pass1_expr(&assign.right, cx);
            }
            Expr::Paren(p) => self.pass1_expr(&p.expr, cx),
            Expr::Seq(s) => {
                for e in &s.exprs {
                    self.pass1_expr(e, cx);
                }
            }
            Expr::Bin(b) => {
                self.pass1_expr(&b.left, cx);
                self.pass1_expr(&b.right, cx);
            }
            Expr::Cond(c) => {
                self.pass1_expr(&c.test, cx);
                self.pass1_expr(&c.cons, cx);
                self.pass1_expr(&c.alt, cx);
            }
            // Function and arrow bodies are deliberately not entered
            _ => {}
        }
    }

    // ---- pass 2: full walk ----

    fn walk_stmt(&self, stmt: &Stmt, cx: &mut TaintContext) {
        match stmt {
            Stmt::Decl(Decl::Var(var)) => self.walk_var_decl(var, cx),
            Stmt::Decl(Decl::Fn(decl)) => {
                let name = decl.ident.sym.as_ref().to_string();
                cx.declare(&name);
                let seed = cx.call_taint_get(&name).cloned();
                self.enter_function(&decl.function, seed.as_ref(), Some(None), cx);
            }
            Stmt::Decl(_) => {}
            Stmt::Expr(e) => self.walk_expr(&e.expr, cx),
            Stmt::Block(b) => {
                for s in &b.stmts {
                    self.walk_stmt(s, cx);
                }
            }
            Stmt::If(i) => {
                self.walk_expr(&i.test, cx);
                self.walk_stmt(&i.cons, cx);
                if let Some(alt) = &i.alt {
                    self.walk_stmt(alt, cx);
                }
            }
            Stmt::While(w) => {
                self.walk_expr(&w.test, cx);
                self.walk_stmt(&w.body, cx);
            }
            Stmt::DoWhile(d) => {
                self.walk_stmt(&d.body, cx);
                self.walk_expr(&d.test, cx);
            }
            Stmt::For(f) => {
                match &f.init {
                    Some(VarDeclOrExpr::VarDecl(v)) => self.walk_var_decl(v, cx),
                    Some(VarDeclOrExpr::Expr(e)) => self.walk_expr(e, cx),
                    None => {}
                }
                if let Some(test) = &f.test {
                    self.walk_expr(test, cx);
                }
                if let Some(update) = &f.update {
                    self.walk_expr(update, cx);
                }
                self.walk_stmt(&f.body, cx);
            }
            Stmt::ForIn(f) => {
                self.walk_for_head(&f.left, cx);
                self.walk_expr(&f.right, cx);
                self.walk_stmt(&f.body, cx);
            }
            Stmt::ForOf(f) => {
                self.walk_for_head(&f.left, cx);
                self.walk_expr(&f.right, cx);
                self.walk_stmt(&f.body, cx);
            }
            Stmt::Switch(s) => {
                self.walk_expr(&s.discriminant, cx);
                for case in &s.cases {
                    if let Some(test) = &case.test {
                        self.walk_expr(test, cx);
                    }
                    for st in &case.cons {
                        self.walk_stmt(st, cx);
                    }
                }
            }
            Stmt::Try(t) => {
                for s in &t.block.stmts {
                    self.walk_stmt(s, cx);
                }
                if let Some(handler) = &t.handler {
                    cx.push_scope();
                    if let Some(Pat::Ident(binding)) = &handler.param {
                        cx.declare(binding.id.sym.as_ref());
                    }
                    for s in &handler.body.stmts {
                        self.walk_stmt(s, cx);
                    }
                    cx.pop_scope();
                }
                if let Some(finalizer) = &t.finalizer {
                    for s in &finalizer.stmts {
                        self.walk_stmt(s, cx);
                    }
                }
            }
            Stmt::Return(r) => {
                if let Some(arg) = &r.arg {
                    self.walk_expr(arg, cx);
                }
            }
            Stmt::Throw(t) => self.walk_expr(&t.arg, cx),
            Stmt::Labeled(l) => self.walk_stmt(&l.body, cx),
            _ => {}
        }
    }

    fn walk_for_head(&self, head: &ForHead, cx: &mut TaintContext) {
        match head {
            ForHead::VarDecl(var) => {
                for decl in &var.decls {
                    self.declare_pat(&decl.name, cx);
                }
            }
            ForHead::Pat(pat) => self.declare_pat(pat, cx),
            _ => {}
        }
    }

    fn walk_var_decl(&self, var: &VarDecl, cx: &mut TaintContext) {
        for decl in &var.decls {
            self.declare_pat(&decl.name, cx);
            let Some(init) = &decl.init else { continue };
            self.walk_expr(init, cx);

            if let Pat::Ident(binding) = &decl.name {
                let name = binding.id.sym.as_ref().to_string();
                // Sanitizer recognition runs inside taint_of and wins
                // over every other rule for this binding.
                if let Some(source) = self.taint_of(init, cx) {
                    cx.taint(&name, &source);
                    self.notify_pending(&name, &source, cx);
                }
            }
        }
    }

    fn declare_pat(&self, pat: &Pat, cx: &mut TaintContext) {
        match pat {
            Pat::Ident(binding) => cx.declare(binding.id.sym.as_ref()),
            Pat::Array(arr) => {
                for elem in arr.elems.iter().flatten() {
                    self.declare_pat(elem, cx);
                }
            }
            Pat::Object(obj) => {
                for prop in &obj.props {
                    if let swc_ecma_ast::ObjectPatProp::Assign(a) = prop {
                        cx.declare(a.key.sym.as_ref());
                    } else if let swc_ecma_ast::ObjectPatProp::KeyValue(kv) = prop {
                        self.declare_pat(&kv.value, cx);
                    }
                }
            }
            Pat::Assign(assign) => self.declare_pat(&assign.left, cx),
            Pat::Rest(rest) => self.declare_pat(&rest.arg, cx),
            _ => {}
        }
    }

    fn walk_expr(&self, expr: &Expr, cx: &mut TaintContext) {
        match expr {
            Expr::Assign(assign) => self.handle_assign(assign, cx),
            Expr::Call(call) => self.handle_call(call, cx),
            Expr::New(new) => self.handle_new(new, cx),
            Expr::Fn(f) => {
                let this = cx.this_taint_for(span_key(f.function.span, self.base));
                self.enter_function(&f.function, None, Some(this), cx);
            }
            Expr::Arrow(arrow) => self.enter_arrow(arrow, None, cx),
            Expr::Ident(ident) => {
                let name = ident.sym.as_ref();
                if !cx.is_declared(name) {
                    cx.record_global(name);
                }
            }
            Expr::Member(member) => self.walk_member(member, cx),
            Expr::Paren(p) => self.walk_expr(&p.expr, cx),
            Expr::Seq(s) => {
                for e in &s.exprs {
                    self.walk_expr(e, cx);
                }
            }
            Expr::Bin(b) => {
                self.walk_expr(&b.left, cx);
                self.walk_expr(&b.right, cx);
            }
            Expr::Unary(u) => self.walk_expr(&u.arg, cx),
            Expr::Update(u) => self.walk_expr(&u.arg, cx),
            Expr::Cond(c) => {
                self.walk_expr(&c.test, cx);
                self.walk_expr(&c.cons, cx);
                self.walk_expr(&c.alt, cx);
            }
            Expr::Tpl(t) => {
                for e in &t.exprs {
                    self.walk_expr(e, cx);
                }
            }
            Expr::TaggedTpl(t) => {
                self.walk_expr(&t.tag, cx);
                for e in &t.tpl.exprs {
                    self.walk_expr(e, cx);
                }
            }
            Expr::Array(arr) => {
                for elem in arr.elems.iter().flatten() {
                    self.walk_expr(&elem.expr, cx);
                }
            }
            Expr::Object(obj) => {
                for prop in &obj.props {
                    if let swc_ecma_ast::PropOrSpread::Prop(p) = prop {
                        if let swc_ecma_ast::Prop::KeyValue(kv) = &**p {
                            self.walk_expr(&kv.value, cx);
                        }
                    }
                }
            }
            Expr::Await(a) => self.walk_expr(&a.arg, cx),
            Expr::Yield(y) => {
                if let Some(arg) = &y.arg {
                    self.walk_expr(arg, cx);
                }
            }
            Expr::OptChain(opt) => match &*opt.base {
                swc_ecma_ast::OptChainBase::Member(member) => self.walk_member(member, cx),
                swc_ecma_ast::OptChainBase::Call(call) => {
                    self.walk_expr(&call.callee, cx);
                    for arg in &call.args {
                        self.walk_expr(&arg.expr, cx);
                    }
                }
            },
            _ => {}
        }
    }

    fn walk_member(&self, member: &MemberExpr, cx: &mut TaintContext) {
        // window.foo / self.foo reads count as global accesses
        if let Expr::Ident(obj) = &*member.obj {
            let obj_name = obj.sym.as_ref();
            if (obj_name == "window" || obj_name == "self") && !cx.is_declared(obj_name) {
                if let MemberProp::Ident(prop) = &member.prop {
                    cx.record_global(prop.sym.as_ref());
                }
            }
        }
        self.walk_expr(&member.obj, cx);
        if let MemberProp::Computed(computed) = &member.prop {
            self.walk_expr(&computed.expr, cx);
        }
    }

    // ---- assignments ----

    fn handle_assign(&self, assign: &AssignExpr, cx: &mut TaintContext) {
        match &assign.left {
            AssignTarget::Simple(SimpleAssignTarget::Ident(binding)) => {
                let name = binding.id.sym.as_ref().to_string();
                cx.declare(&name);

                // Bare `location = x` is a navigation sink
                self.check_assign_sink(&name, &assign.right, assign.span, cx);

                if let Some(source) = self.taint_of(&assign.right, cx) {
                    cx.taint(&name, &source);
                    self.notify_pending(&name, &source, cx);
                }
                self.walk_expr(&assign.right, cx);
            }
            AssignTarget::Simple(SimpleAssignTarget::Member(member)) => {
                self.handle_member_assign(member, assign, cx);
            }
            AssignTarget::Simple(_) => self.walk_expr(&assign.right, cx),
            AssignTarget::Pat(pat) => {
                match pat {
                    AssignTargetPat::Array(arr) => {
                        for elem in arr.elems.iter().flatten() {
                            self.declare_pat(elem, cx);
                        }
                    }
                    AssignTargetPat::Object(obj) => {
                        for prop in &obj.props {
                            if let swc_ecma_ast::ObjectPatProp::Assign(a) = prop {
                                cx.declare(a.key.sym.as_ref());
                            }
                        }
                    }
                    _ => {}
                }
                self.walk_expr(&assign.right, cx);
            }
        }
    }

    fn handle_member_assign(&self, member: &MemberExpr, assign: &AssignExpr, cx: &mut TaintContext) {
        let lhs_name = self.resolve_member(member, cx);

        // Prototype pollution tiers: a tainted computed key is reported
        // even without a proto segment in the chain, because the key can
        // *be* "__proto__".
        if let Some(key_source) = self.tainted_computed_key(member, cx) {
            self.emit(
                cx,
                assign.span,
                &key_source,
                "prototype",
                Confidence::Medium,
                "Dynamic Property Assignment",
                ReflectionContext::JsRaw,
            );
            self.walk_expr(&assign.right, cx);
            return;
        }
        if chain_touches_prototype(&lhs_name) {
            if let Some(source) = self.taint_of(&assign.right, cx) {
                self.emit(
                    cx,
                    assign.span,
                    &source,
                    "prototype",
                    Confidence::High,
                    "Prototype Pollution",
                    ReflectionContext::JsRaw,
                );
            }
            // Static key with a non-tainted value: the ordinary
            // `Class.prototype.method = function(){}` idiom, no finding.
            self.walk_expr(&assign.right, cx);
            return;
        }

        // postMessage handler assigned via `onmessage`
        if lhs_name == "onmessage" || lhs_name.ends_with(".onmessage") {
            if let Some(handler) = callback_of(&assign.right) {
                self.audit_message_listener(&handler, assign.span, cx);
                return;
            }
        }

        // Callback assigned to an object property: remember it in case
        // the object later turns out to be tainted.
        if let Expr::Ident(root) = &*member.obj {
            if let Some(callback) = callback_of(&assign.right) {
                let root_name = root.sym.as_ref().to_string();
                if let Some(source) = cx.taint_of_ident(&root_name) {
                    let key = callback_key(&callback, self.base);
                    cx.set_this_taint(key, &source);
                } else {
                    cx.register_pending(&root_name, callback.clone());
                }
            }
        }

        self.check_assign_sink(&lhs_name, &assign.right, assign.span, cx);
        self.walk_expr(&assign.right, cx);
        if let MemberProp::Computed(computed) = &member.prop {
            self.walk_expr(&computed.expr, cx);
        }
    }

    fn check_assign_sink(&self, lhs_name: &str, rhs: &Expr, span: Span, cx: &mut TaintContext) {
        let Some(spec) = self.patterns.sink_matching(lhs_name, SinkKind::Assign) else {
            return;
        };

        if spec.context == ReflectionContext::Url && is_safe_navigation(lhs_name, rhs) {
            return;
        }
        // Static CSS-selector strings assigned to markup sinks are
        // framework boilerplate, not injection.
        if spec.context == ReflectionContext::Html && is_static_selector(rhs) {
            return;
        }

        if let Some(source) = self.taint_of(rhs, cx) {
            self.emit(
                cx,
                span,
                &source,
                spec.name,
                spec.confidence,
                spec.description,
                spec.context,
            );
        }
    }

    // ---- calls ----

    fn handle_call(&self, call: &CallExpr, cx: &mut TaintContext) {
        let callee_expr = match &call.callee {
            Callee::Expr(e) => Some(&**e),
            _ => None,
        };
        let resolved = callee_expr.and_then(|e| self.resolve_name(e, cx));

        // addEventListener("message", handler)
        if let Some(name) = resolved.as_deref() {
            if name == "addEventListener" || name.ends_with(".addEventListener") {
                if is_string_lit(call.args.first().map(|a| &*a.expr), "message") {
                    if let Some(handler) = call.args.get(1).and_then(|a| callback_of(&a.expr)) {
                        self.audit_message_listener(&handler, call.span, cx);
                        return;
                    }
                }
            }
        }

        if let Some(name) = resolved.as_deref() {
            if let Some(spec) = self.patterns.sink_matching(name, SinkKind::Call) {
                if !self.suppressed_call(spec.name, call) {
                    if let Some(arg) = call.args.get(spec.arg_index) {
                        if let Some(source) = self.taint_of(&arg.expr, cx) {
                            self.emit(
                                cx,
                                call.span,
                                &source,
                                spec.name,
                                spec.confidence,
                                spec.description,
                                spec.context,
                            );
                        }
                    }
                }
            }
        }

        if let Some(callee) = callee_expr {
            self.walk_expr(callee, cx);
        }
        for arg in &call.args {
            self.walk_expr(&arg.expr, cx);
        }
    }

    /// Static-argument suppressions for call sinks
    fn suppressed_call(&self, sink_name: &str, call: &CallExpr) -> bool {
        let first = call.args.first().map(|a| &*a.expr);
        match sink_name {
            "document.write" | "importScripts" => {
                matches!(static_string(first), Some(_))
            }
            "jQuery.html" => match static_string(first) {
                Some(value) => {
                    let v = value.trim();
                    (v.starts_with('#') || v.starts_with('.')) && !v.starts_with('<')
                }
                None => false,
            },
            "setTimeout" | "setInterval" => {
                matches!(first, Some(Expr::Fn(_)) | Some(Expr::Arrow(_)))
            }
            "location.replace" => match first {
                Some(expr) => is_safe_navigation("location.replace", expr),
                None => true,
            },
            _ => false,
        }
    }

    fn handle_new(&self, new: &NewExpr, cx: &mut TaintContext) {
        if let Some(name) = self.resolve_name(&new.callee, cx) {
            if let Some(spec) = self.patterns.sink_matching(&name, SinkKind::Call) {
                if let Some(args) = &new.args {
                    for arg in args {
                        if let Some(source) = self.taint_of(&arg.expr, cx) {
                            self.emit(
                                cx,
                                new.span,
                                &source,
                                spec.name,
                                spec.confidence,
                                spec.description,
                                spec.context,
                            );
                            break;
                        }
                    }
                }
            }
        }
        self.walk_expr(&new.callee, cx);
        if let Some(args) = &new.args {
            for arg in args {
                self.walk_expr(&arg.expr, cx);
            }
        }
    }

    // ---- postMessage auditing ----

    fn audit_message_listener(&self, callback: &PendingCallback, span: Span, cx: &mut TaintContext) {
        let mut has_origin_check = false;

        match callback {
            PendingCallback::Function(function) => {
                cx.push_scope();
                cx.push_this(None);
                for (index, param) in function.params.iter().enumerate() {
                    self.declare_pat(&param.pat, cx);
                    if index == 0 {
                        if let Pat::Ident(binding) = &param.pat {
                            cx.taint(binding.id.sym.as_ref(), "event.data");
                        }
                    }
                }
                if let Some(body) = &function.body {
                    has_origin_check = stmts_check_origin(&body.stmts);
                    for stmt in &body.stmts {
                        self.walk_stmt(stmt, cx);
                    }
                }
                cx.pop_this();
                cx.pop_scope();
            }
            PendingCallback::Arrow(arrow) => {
                cx.push_scope();
                for (index, pat) in arrow.params.iter().enumerate() {
                    self.declare_pat(pat, cx);
                    if index == 0 {
                        if let Pat::Ident(binding) = pat {
                            cx.taint(binding.id.sym.as_ref(), "event.data");
                        }
                    }
                }
                match &*arrow.body {
                    BlockStmtOrExpr::BlockStmt(block) => {
                        has_origin_check = stmts_check_origin(&block.stmts);
                        for stmt in &block.stmts {
                            self.walk_stmt(stmt, cx);
                        }
                    }
                    BlockStmtOrExpr::Expr(expr) => {
                        self.walk_expr(expr, cx);
                    }
                }
                cx.pop_scope();
            }
        }

        if !has_origin_check {
            self.emit(
                cx,
                span,
                "event.data",
                "addEventListener",
                Confidence::Medium,
                "Missing Origin Validation",
                ReflectionContext::Unknown,
            );
        }
    }

    // ---- functions ----

    fn enter_function(
        &self,
        function: &Function,
        seed: Option<&std::collections::HashMap<usize, String>>,
        this_taint: Option<Option<String>>,
        cx: &mut TaintContext,
    ) {
        cx.push_scope();
        let this = this_taint
            .unwrap_or_else(|| cx.this_taint_for(span_key(function.span, self.base)));
        cx.push_this(this);

        for (index, param) in function.params.iter().enumerate() {
            self.declare_pat(&param.pat, cx);
            if let Some(map) = seed {
                if let Some(source) = map.get(&index) {
                    if let Pat::Ident(binding) = &param.pat {
                        cx.taint(binding.id.sym.as_ref(), source);
                    }
                }
            }
        }

        if let Some(body) = &function.body {
            for stmt in &body.stmts {
                self.walk_stmt(stmt, cx);
            }
        }

        cx.pop_this();
        cx.pop_scope();
    }

    fn enter_arrow(&self, arrow: &ArrowExpr, this_taint: Option<String>, cx: &mut TaintContext) {
        cx.push_scope();
        // Arrows inherit `this`; only an explicit re-walk overrides it
        let pushed_this = this_taint.is_some();
        if let Some(source) = this_taint {
            cx.push_this(Some(source));
        }
        for pat in &arrow.params {
            self.declare_pat(pat, cx);
        }
        match &*arrow.body {
            BlockStmtOrExpr::BlockStmt(block) => {
                for stmt in &block.stmts {
                    self.walk_stmt(stmt, cx);
                }
            }
            BlockStmtOrExpr::Expr(expr) => self.walk_expr(expr, cx),
        }
        if pushed_this {
            cx.pop_this();
        }
        cx.pop_scope();
    }

    /// An object a callback was parked under just became tainted:
    /// mark `this` for those literals and re-walk them.
    fn notify_pending(&self, name: &str, source: &str, cx: &mut TaintContext) {
        let pending = cx.take_pending(name);
        for callback in pending {
            let key = callback_key(&callback, self.base);
            cx.set_this_taint(key, source);
            match &callback {
                PendingCallback::Function(function) => {
                    self.enter_function(function, None, Some(Some(source.to_string())), cx);
                }
                PendingCallback::Arrow(arrow) => {
                    self.enter_arrow(arrow, Some(source.to_string()), cx);
                }
            }
        }
    }

    // ---- taint evaluation ----

    fn taint_of(&self, expr: &Expr, cx: &TaintContext) -> Option<String> {
        match expr {
            Expr::Ident(ident) => {
                let name = ident.sym.as_ref();
                if let Some(source) = cx.taint_of_ident(name) {
                    return Some(source);
                }
                if !cx.is_declared(name) {
                    return self.patterns.source_for(name);
                }
                None
            }
            Expr::This(_) => cx.current_this_taint(),
            Expr::Member(member) => {
                if let MemberProp::Ident(prop) = &member.prop {
                    if self.patterns.is_safe_accessor(prop.sym.as_ref()) {
                        return None;
                    }
                }
                if let Some(name) = self.resolve_member_plain(member) {
                    if let Some(source) = self.patterns.source_for(&name) {
                        return Some(source);
                    }
                }
                self.taint_of(&member.obj, cx)
            }
            Expr::Call(call) => self.call_taint(call, cx),
            Expr::Bin(bin) => self
                .taint_of(&bin.left, cx)
                .or_else(|| self.taint_of(&bin.right, cx)),
            Expr::Paren(p) => self.taint_of(&p.expr, cx),
            Expr::Seq(s) => s.exprs.last().and_then(|e| self.taint_of(e, cx)),
            Expr::Cond(c) => self
                .taint_of(&c.cons, cx)
                .or_else(|| self.taint_of(&c.alt, cx)),
            Expr::Assign(a) => self.taint_of(&a.right, cx),
            Expr::Tpl(t) => t.exprs.iter().find_map(|e| self.taint_of(e, cx)),
            Expr::Await(a) => self.taint_of(&a.arg, cx),
            Expr::OptChain(opt) => match &*opt.base {
                swc_ecma_ast::OptChainBase::Member(member) => {
                    self.taint_of(&member.obj, cx)
                }
                _ => None,
            },
            _ => None,
        }
    }

    fn call_taint(&self, call: &CallExpr, cx: &TaintContext) -> Option<String> {
        let callee = match &call.callee {
            Callee::Expr(e) => &**e,
            _ => return None,
        };
        let name = self.resolve_name(callee, cx);

        // Sanitizer recognition short-circuits every other rule
        if let Some(n) = name.as_deref() {
            if self.patterns.is_sanitizer(n) {
                return None;
            }
            let last = n.rsplit('.').next().unwrap_or(n);
            if self.patterns.is_safe_accessor(last) {
                return None;
            }
            // Reading from a source via a call (localStorage.getItem)
            if let Some(source) = self.patterns.source_for(n) {
                return Some(source);
            }
        }

        // Method on a tainted receiver keeps the taint (substring, slice)
        if let Expr::Member(member) = callee {
            if let Some(source) = self.taint_of(&member.obj, cx) {
                return Some(source);
            }
        }

        // A tainted argument taints the call result
        for arg in &call.args {
            if let Some(source) = self.taint_of(&arg.expr, cx) {
                return Some(source);
            }
        }
        None
    }

    fn tainted_computed_key(&self, member: &MemberExpr, cx: &TaintContext) -> Option<String> {
        if let MemberProp::Computed(computed) = &member.prop {
            if let Some(source) = self.taint_of(&computed.expr, cx) {
                return Some(source);
            }
        }
        if let Expr::Member(inner) = &*member.obj {
            return self.tainted_computed_key(inner, cx);
        }
        None
    }

    // ---- name resolution ----

    /// Dotted path of an expression; unresolvable segments become "expr"
    /// so suffix sink patterns still apply while anchored source patterns
    /// cannot be fooled.
    fn resolve_name(&self, expr: &Expr, cx: &TaintContext) -> Option<String> {
        match expr {
            Expr::Ident(ident) => Some(ident.sym.as_ref().to_string()),
            Expr::This(_) => Some("this".to_string()),
            Expr::Member(member) => Some(self.resolve_member(member, cx)),
            Expr::Paren(p) => self.resolve_name(&p.expr, cx),
            Expr::OptChain(opt) => match &*opt.base {
                swc_ecma_ast::OptChainBase::Member(member) => {
                    Some(self.resolve_member(member, cx))
                }
                _ => None,
            },
            _ => None,
        }
    }

    fn resolve_member(&self, member: &MemberExpr, cx: &TaintContext) -> String {
        let object = self
            .resolve_name(&member.obj, cx)
            .unwrap_or_else(|| "expr".to_string());
        let prop = match &member.prop {
            MemberProp::Ident(ident) => ident.sym.as_ref().to_string(),
            MemberProp::Computed(computed) => match &*computed.expr {
                Expr::Lit(Lit::Str(s)) => s.value.as_ref().to_string(),
                _ => "expr".to_string(),
            },
            MemberProp::PrivateName(_) => "#private".to_string(),
        };
        format!("{}.{}", object, prop)
    }

    /// Like `resolve_member` but fails on any unresolvable segment;
    /// used for source matching where a placeholder must not appear.
    fn resolve_member_plain(&self, member: &MemberExpr) -> Option<String> {
        let object = match &*member.obj {
            Expr::Ident(ident) => ident.sym.as_ref().to_string(),
            Expr::Member(inner) => self.resolve_member_plain(inner)?,
            Expr::This(_) => "this".to_string(),
            _ => return None,
        };
        let prop = match &member.prop {
            MemberProp::Ident(ident) => ident.sym.as_ref().to_string(),
            MemberProp::Computed(computed) => match &*computed.expr {
                Expr::Lit(Lit::Str(s)) => s.value.as_ref().to_string(),
                _ => return None,
            },
            MemberProp::PrivateName(_) => return None,
        };
        Some(format!("{}.{}", object, prop))
    }

    // ---- findings ----

    #[allow(clippy::too_many_arguments)]
    fn emit(
        &self,
        cx: &mut TaintContext,
        span: Span,
        source: &str,
        sink: &str,
        confidence: Confidence,
        description: &str,
        context: ReflectionContext,
    ) {
        let offset = (span.lo.0.saturating_sub(self.base)) as usize;
        let offset = offset.min(self.code.len());
        let line = self.code[..offset].matches('\n').count() + 1;
        let evidence = self
            .code
            .lines()
            .nth(line - 1)
            .map(|l| truncate(l.trim(), 160))
            .unwrap_or_default();

        cx.push_finding(Finding {
            source: source.to_string(),
            sink: sink.to_string(),
            line: Some(line),
            confidence,
            description: description.to_string(),
            evidence,
            inferred_context: context,
        });
    }
}

// ---- free helpers ----

fn span_key(span: Span, base: u32) -> u32 {
    span.lo.0.saturating_sub(base)
}

fn callback_key(callback: &PendingCallback, base: u32) -> u32 {
    match callback {
        PendingCallback::Function(f) => span_key(f.span, base),
        PendingCallback::Arrow(a) => span_key(a.span, base),
    }
}

fn callback_of(expr: &Expr) -> Option<PendingCallback> {
    match expr {
        Expr::Fn(f) => Some(PendingCallback::Function(f.function.clone())),
        Expr::Arrow(a) => Some(PendingCallback::Arrow(Box::new(a.clone()))),
        Expr::Paren(p) => callback_of(&p.expr),
        _ => None,
    }
}

fn is_string_lit(expr: Option<&Expr>, value: &str) -> bool {
    matches!(expr, Some(Expr::Lit(Lit::Str(s))) if s.value.as_ref() == value)
}

fn static_string(expr: Option<&Expr>) -> Option<String> {
    match expr {
        Some(Expr::Lit(Lit::Str(s))) => Some(s.value.as_ref().to_string()),
        Some(Expr::Paren(p)) => static_string(Some(&p.expr)),
        _ => None,
    }
}

fn chain_touches_prototype(resolved: &str) -> bool {
    resolved
        .split('.')
        .any(|seg| matches!(seg, "__proto__" | "prototype" | "constructor"))
}

/// Static string without a `javascript:` scheme, or a self-referential
/// location re-assignment: not worth reporting.
fn is_safe_navigation(lhs: &str, rhs: &Expr) -> bool {
    if let Expr::Lit(Lit::Str(s)) = rhs {
        let value = s.value.as_ref().trim().to_ascii_lowercase();
        return !value.starts_with("javascript:");
    }
    if lhs.contains("location") {
        if let Expr::Member(member) = rhs {
            if let Expr::Ident(obj) = &*member.obj {
                return obj.sym.as_ref() == "location";
            }
        }
        if let Expr::Ident(ident) = rhs {
            return ident.sym.as_ref() == "location";
        }
    }
    false
}

/// `#id` / `.class` style static selector strings fed to markup sinks
fn is_static_selector(expr: &Expr) -> bool {
    if let Expr::Lit(Lit::Str(s)) = expr {
        let v = s.value.as_ref().trim();
        return !v.starts_with('<');
    }
    false
}

/// Any `if` in the statement list (recursively) whose condition
/// references `origin`, directly or through a call argument.
fn stmts_check_origin(stmts: &[Stmt]) -> bool {
    stmts.iter().any(stmt_checks_origin)
}

fn stmt_checks_origin(stmt: &Stmt) -> bool {
    match stmt {
        Stmt::If(i) => {
            expr_mentions_origin(&i.test)
                || stmt_checks_origin(&i.cons)
                || i.alt.as_deref().map(stmt_checks_origin).unwrap_or(false)
        }
        Stmt::Block(b) => stmts_check_origin(&b.stmts),
        Stmt::Try(t) => {
            stmts_check_origin(&t.block.stmts)
                || t.handler
                    .as_ref()
                    .map(|h| stmts_check_origin(&h.body.stmts))
                    .unwrap_or(false)
        }
        _ => false,
    }
}

fn expr_mentions_origin(expr: &Expr) -> bool {
    match expr {
        Expr::Ident(ident) => ident.sym.as_ref().to_ascii_lowercase().contains("origin"),
        Expr::Member(member) => {
            let prop_hit = match &member.prop {
                MemberProp::Ident(ident) => {
                    ident.sym.as_ref().to_ascii_lowercase().contains("origin")
                }
                MemberProp::Computed(computed) => expr_mentions_origin(&computed.expr),
                _ => false,
            };
            prop_hit || expr_mentions_origin(&member.obj)
        }
        Expr::Call(call) => {
            let callee_hit = match &call.callee {
                Callee::Expr(e) => expr_mentions_origin(e),
                _ => false,
            };
            callee_hit || call.args.iter().any(|a| expr_mentions_origin(&a.expr))
        }
        Expr::Bin(bin) => expr_mentions_origin(&bin.left) || expr_mentions_origin(&bin.right),
        Expr::Unary(unary) => expr_mentions_origin(&unary.arg),
        Expr::Paren(p) => expr_mentions_origin(&p.expr),
        Expr::Seq(s) => s.exprs.iter().any(|e| expr_mentions_origin(e)),
        _ => false,
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        let mut end = max;
        while end > 0 && !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &s[..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::ScanPatterns;

    fn analyze(code: &str) -> JsAnalysis {
        let patterns = ScanPatterns::new().expect("tables compile");
        JsTaintAnalyzer::new(&patterns).analyze(code)
    }

    #[test]
    fn test_direct_flow() {
        let result = analyze("var x = location.search; document.write(x);");
        assert_eq!(result.findings.len(), 1);
        assert_eq!(result.findings[0].source, "location.search");
        assert_eq!(result.findings[0].sink, "document.write");
        assert_eq!(result.findings[0].confidence, Confidence::High);
    }

    #[test]
    fn test_transitive_taint() {
        let result = analyze("var x = location.search; var y = x; document.write(y);");
        assert_eq!(result.findings.len(), 1);
        assert_eq!(result.findings[0].source, "location.search");
    }

    #[test]
    fn test_sanitizer_suppresses_taint() {
        let result =
            analyze("var x = DOMPurify.sanitize(location.search); document.write(x);");
        assert!(result.findings.is_empty());
    }

    #[test]
    fn test_encode_uri_component_suppresses() {
        let result =
            analyze("var q = encodeURIComponent(location.hash); el.innerHTML = q;");
        assert!(result.findings.is_empty());
    }

    #[test]
    fn test_scope_isolation() {
        let result = analyze(
            "function safe(){var x='safe';document.write(x);} \
             function unsafe(){var y=location.search;}",
        );
        assert!(result.findings.is_empty());
    }

    #[test]
    fn test_closure_sees_outer_taint() {
        let result = analyze(
            "var data = location.hash; function render(){ document.write(data); } render();",
        );
        assert_eq!(result.findings.len(), 1);
    }

    #[test]
    fn test_interprocedural_taint_call_before_decl() {
        let result = analyze(
            "var q = location.search; show(q); \
             function show(value){ document.write(value); }",
        );
        assert_eq!(result.findings.len(), 1);
        assert_eq!(result.findings[0].source, "location.search");
    }

    #[test]
    fn test_interprocedural_taint_decl_before_call() {
        let result = analyze(
            "function show(value){ document.write(value); } \
             var q = location.search; show(q);",
        );
        assert_eq!(result.findings.len(), 1);
    }

    #[test]
    fn test_inner_html_assignment() {
        let result = analyze("document.getElementById('x').innerHTML = location.hash;");
        assert_eq!(result.findings.len(), 1);
        assert_eq!(result.findings[0].sink, "innerHTML");
        assert_eq!(
            result.findings[0].inferred_context,
            ReflectionContext::Html
        );
    }

    #[test]
    fn test_eval_inferred_context() {
        let result = analyze("eval(location.hash);");
        assert_eq!(result.findings.len(), 1);
        assert_eq!(result.findings[0].inferred_context, ReflectionContext::JsRaw);
    }

    #[test]
    fn test_location_sink_inferred_context() {
        let result = analyze("location.href = document.cookie;");
        assert_eq!(result.findings.len(), 1);
        assert_eq!(result.findings[0].inferred_context, ReflectionContext::Url);
    }

    #[test]
    fn test_safe_navigation_static_string() {
        let result = analyze("location.href = '/login';");
        assert!(result.findings.is_empty());
    }

    #[test]
    fn test_safe_navigation_self_referential() {
        let result = analyze("location.href = location.pathname;");
        // Self-referential reload is excluded even though the value is a
        // location read
        assert!(result.findings.is_empty());
    }

    #[test]
    fn test_binary_concat_propagates() {
        let result = analyze("var m = '<b>' + location.search; el.innerHTML = m;");
        assert_eq!(result.findings.len(), 1);
    }

    #[test]
    fn test_safe_accessor_not_tainted() {
        let result = analyze("var n = location.search.length; document.write(n);");
        assert!(result.findings.is_empty());
    }

    #[test]
    fn test_safe_method_call_not_tainted() {
        let result = analyze("var i = location.search.indexOf('x'); eval(i);");
        assert!(result.findings.is_empty());
    }

    #[test]
    fn test_string_method_keeps_taint() {
        let result = analyze("var s = location.search.substring(1); document.write(s);");
        assert_eq!(result.findings.len(), 1);
    }

    #[test]
    fn test_prototype_pollution_static_value_none() {
        let result = analyze("obj.__proto__.polluted = 'static';");
        assert!(result
            .findings
            .iter()
            .all(|f| f.confidence < Confidence::High));
        assert!(result.findings.is_empty());
    }

    #[test]
    fn test_prototype_pollution_tainted_value_high() {
        let result = analyze("obj.__proto__.polluted = location.hash;");
        assert_eq!(result.findings.len(), 1);
        assert_eq!(result.findings[0].description, "Prototype Pollution");
        assert_eq!(result.findings[0].confidence, Confidence::High);
    }

    #[test]
    fn test_dynamic_key_medium() {
        let result = analyze("obj[window.name] = 'x';");
        assert_eq!(result.findings.len(), 1);
        assert_eq!(result.findings[0].description, "Dynamic Property Assignment");
        assert_eq!(result.findings[0].confidence, Confidence::Medium);
    }

    #[test]
    fn test_prototype_extension_idiom_clean() {
        let result = analyze("MyClass.prototype.method = function(){ return 1; };");
        assert!(result.findings.is_empty());
    }

    #[test]
    fn test_message_listener_without_origin_check() {
        let result = analyze(
            "window.addEventListener('message', function(e){ doThing(e.data); });",
        );
        assert_eq!(result.findings.len(), 1);
        assert_eq!(result.findings[0].description, "Missing Origin Validation");
        assert_eq!(result.findings[0].confidence, Confidence::Medium);
    }

    #[test]
    fn test_message_listener_with_origin_check() {
        let result = analyze(
            "window.addEventListener('message', function(e){ \
               if (e.origin === 'https://a.example') { use(e.data); } });",
        );
        assert!(result
            .findings
            .iter()
            .all(|f| f.description != "Missing Origin Validation"));
    }

    #[test]
    fn test_message_listener_data_flows_to_sink() {
        let result = analyze(
            "window.addEventListener('message', function(e){ \
               if (e.origin === 'https://a.example') { el.innerHTML = e.data; } });",
        );
        assert_eq!(result.findings.len(), 1);
        assert_eq!(result.findings[0].source, "event.data");
        assert_eq!(result.findings[0].sink, "innerHTML");
    }

    #[test]
    fn test_origin_check_via_helper_call() {
        let result = analyze(
            "window.addEventListener('message', function(e){ \
               if (isAllowed(e.origin)) { use(e.data); } });",
        );
        assert!(result
            .findings
            .iter()
            .all(|f| f.description != "Missing Origin Validation"));
    }

    #[test]
    fn test_document_write_static_string_suppressed() {
        let result = analyze("document.write('<b>static</b>');");
        assert!(result.findings.is_empty());
    }

    #[test]
    fn test_jquery_selector_suppressed() {
        let result = analyze("$('#app').html('#placeholder');");
        assert!(result.findings.is_empty());
    }

    #[test]
    fn test_jquery_tainted_html() {
        let result = analyze("$('#app').html(location.hash);");
        assert_eq!(result.findings.len(), 1);
        assert_eq!(result.findings[0].sink, "jQuery.html");
    }

    #[test]
    fn test_settimeout_function_arg_not_sink() {
        let result = analyze("var t = location.hash; setTimeout(function(){ spin(); }, 10);");
        assert!(result.findings.is_empty());
    }

    #[test]
    fn test_dedup_same_flow_twice() {
        let result = analyze(
            "var x = location.search; document.write(x); document.write(x);",
        );
        assert_eq!(result.findings.len(), 1);
    }

    #[test]
    fn test_parse_failure_empty() {
        let result = analyze("var x = {{{{ not javascript");
        assert!(result.findings.is_empty());
        assert!(result.global_accesses.is_empty());
    }

    #[test]
    fn test_global_access_set() {
        let result = analyze("doRender(config); var local = 1; use(local);");
        assert!(result.global_accesses.contains("config"));
        assert!(result.global_accesses.contains("doRender"));
        assert!(!result.global_accesses.contains("local"));
    }

    #[test]
    fn test_window_qualified_global_access() {
        let result = analyze("if (window.appSettings) { boot(window.appSettings); }");
        assert!(result.global_accesses.contains("appSettings"));
    }

    #[test]
    fn test_tainted_this_callback_ordering() {
        let result = analyze(
            "var obj = {}; \
             obj.onload = function(){ document.write(this.payload); }; \
             obj = location.search;",
        );
        assert_eq!(result.findings.len(), 1);
        assert_eq!(result.findings[0].source, "location.search");
        assert_eq!(result.findings[0].sink, "document.write");
    }

    #[test]
    fn test_line_numbers() {
        let result = analyze("var a = 1;\nvar x = location.search;\ndocument.write(x);\n");
        assert_eq!(result.findings.len(), 1);
        assert_eq!(result.findings[0].line, Some(3));
    }

    #[test]
    fn test_template_literal_interpolation_taints() {
        let result = analyze("var h = `<div>${location.hash}</div>`; el.innerHTML = h;");
        assert_eq!(result.findings.len(), 1);
    }
}
