//! AST walker that extracts import occurrences from Python source.

use std::path::PathBuf;
use std::sync::Arc;

use rustpython_parser::ast::{self, Ranged};
use rustpython_parser::{Mode, parse};
use thiserror::Error;
use tracing::warn;

use crate::base::{LineIndex, Span, parent_import_path, validate_import_path};
use crate::scan::ModuleRecord;

use super::{ImportKind, ImportOccurrence, ModuleImports};

/// Names of helper functions whose string argument is treated as a lazy
/// import target.
const LAZY_IMPORT_CALLEES: &[&str] = &["lazy_import", "lazy_plugin"];

#[derive(Debug, Error)]
pub enum ImportScanError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path:?}: {message}")]
    Parse { path: PathBuf, message: String },
}

/// Read and scan the file backing `record`.
pub fn scan_file(record: &Arc<ModuleRecord>) -> Result<ModuleImports, ImportScanError> {
    let source = std::fs::read_to_string(record.path()).map_err(|source| ImportScanError::Io {
        path: record.path().to_path_buf(),
        source,
    })?;
    scan_source(record, &source)
}

/// Scan already-loaded source text attributed to `record`.
pub fn scan_source(
    record: &Arc<ModuleRecord>,
    source: &str,
) -> Result<ModuleImports, ImportScanError> {
    let path_str = record.path().display().to_string();
    let parsed = parse(source, Mode::Module, &path_str).map_err(|err| ImportScanError::Parse {
        path: record.path().to_path_buf(),
        message: err.to_string(),
    })?;
    let ast::Mod::Module(module) = parsed else {
        return Err(ImportScanError::Parse {
            path: record.path().to_path_buf(),
            message: "expected a module".to_owned(),
        });
    };
    let mut walker = ImportWalker {
        record,
        line_index: LineIndex::new(source),
        stack: vec!["Module"],
        lazy_depth: 0,
        occurrences: Vec::new(),
    };
    walker.visit_body(&module.body);
    Ok(ModuleImports::new(record.clone(), walker.occurrences))
}

struct ImportWalker<'a> {
    record: &'a Arc<ModuleRecord>,
    line_index: LineIndex,
    /// AST node types from the module root to the current position.
    stack: Vec<&'static str>,
    /// Nesting depth of lazy contexts; any import at depth > 0 is lazy.
    lazy_depth: usize,
    occurrences: Vec<ImportOccurrence>,
}

impl ImportWalker<'_> {
    fn span(&self, range: rustpython_parser::text_size::TextRange) -> Span {
        Span::new(
            self.line_index.position(u32::from(range.start()) as usize),
            self.line_index.position(u32::from(range.end()) as usize),
        )
    }

    fn push_occurrence(
        &mut self,
        target: String,
        kind: ImportKind,
        is_relative: bool,
        force_lazy: bool,
        span: Span,
        terminal: &'static str,
    ) {
        if validate_import_path(&target).is_err() {
            warn!(
                module = self.record.name(),
                target, "skipping import with invalid target"
            );
            return;
        }
        let mut context = self.stack.clone();
        context.push(terminal);
        self.occurrences.push(ImportOccurrence {
            source: self.record.clone(),
            target,
            kind,
            is_lazy: force_lazy || self.lazy_depth > 0,
            is_relative,
            span,
            context,
        });
    }

    /// Dotted prefix relative imports resolve against: the module's own
    /// package, minus one component per `.` beyond the first.
    fn relative_base(&self, level: u32) -> Vec<String> {
        let package = if self.record.is_package() {
            Some(self.record.name())
        } else {
            parent_import_path(self.record.name())
        };
        let mut parts: Vec<String> = package.map_or_else(Vec::new, |pkg| {
            pkg.split('.').map(str::to_owned).collect()
        });
        for _ in 1..level {
            parts.pop();
        }
        parts
    }

    fn visit_body(&mut self, body: &[ast::Stmt]) {
        for stmt in body {
            self.visit_stmt(stmt);
        }
    }

    fn visit_lazy_body(&mut self, body: &[ast::Stmt]) {
        self.lazy_depth += 1;
        self.visit_body(body);
        self.lazy_depth -= 1;
    }

    fn scoped(&mut self, name: &'static str, f: impl FnOnce(&mut Self)) {
        self.stack.push(name);
        f(self);
        self.stack.pop();
    }

    fn visit_stmt(&mut self, stmt: &ast::Stmt) {
        match stmt {
            ast::Stmt::Import(ast::StmtImport { names, range, .. }) => {
                let span = self.span(*range);
                for alias in names {
                    self.push_occurrence(
                        alias.name.as_str().to_owned(),
                        ImportKind::Import,
                        false,
                        false,
                        span,
                        "Import",
                    );
                }
            }
            ast::Stmt::ImportFrom(ast::StmtImportFrom {
                module,
                names,
                level,
                range,
                ..
            }) => {
                let span = self.span(*range);
                let level = level.map_or(0, |lvl| lvl.to_u32());
                if level == 0 {
                    if let Some(module) = module {
                        self.push_occurrence(
                            module.as_str().to_owned(),
                            ImportKind::ImportFrom,
                            false,
                            false,
                            span,
                            "ImportFrom",
                        );
                    }
                    return;
                }
                let base = self.relative_base(level);
                match module {
                    Some(module) => {
                        let target = join_parts(&base, module.as_str());
                        self.push_occurrence(
                            target,
                            ImportKind::ImportFrom,
                            true,
                            false,
                            span,
                            "ImportFrom",
                        );
                    }
                    // `from . import x` names one target per alias.
                    None => {
                        for alias in names {
                            let target = join_parts(&base, alias.name.as_str());
                            self.push_occurrence(
                                target,
                                ImportKind::ImportFrom,
                                true,
                                false,
                                span,
                                "ImportFrom",
                            );
                        }
                    }
                }
            }
            ast::Stmt::FunctionDef(ast::StmtFunctionDef { body, .. }) => {
                self.scoped("FunctionDef", |walker| walker.visit_lazy_body(body));
            }
            ast::Stmt::AsyncFunctionDef(ast::StmtAsyncFunctionDef { body, .. }) => {
                self.scoped("AsyncFunctionDef", |walker| walker.visit_lazy_body(body));
            }
            ast::Stmt::ClassDef(ast::StmtClassDef { body, .. }) => {
                self.scoped("ClassDef", |walker| walker.visit_body(body));
            }
            ast::Stmt::If(ast::StmtIf {
                test, body, orelse, ..
            }) => {
                self.scoped("If", |walker| {
                    if is_type_checking_test(test) {
                        walker.visit_lazy_body(body);
                    } else {
                        walker.visit_body(body);
                    }
                    walker.visit_body(orelse);
                });
            }
            ast::Stmt::While(ast::StmtWhile { body, orelse, .. })
            | ast::Stmt::For(ast::StmtFor { body, orelse, .. })
            | ast::Stmt::AsyncFor(ast::StmtAsyncFor { body, orelse, .. }) => {
                self.scoped(stmt_name(stmt), |walker| {
                    walker.visit_body(body);
                    walker.visit_body(orelse);
                });
            }
            ast::Stmt::With(ast::StmtWith { body, .. })
            | ast::Stmt::AsyncWith(ast::StmtAsyncWith { body, .. }) => {
                self.scoped(stmt_name(stmt), |walker| walker.visit_body(body));
            }
            ast::Stmt::Try(ast::StmtTry {
                body,
                handlers,
                orelse,
                finalbody,
                ..
            })
            | ast::Stmt::TryStar(ast::StmtTryStar {
                body,
                handlers,
                orelse,
                finalbody,
                ..
            }) => {
                self.scoped("Try", |walker| {
                    walker.visit_body(body);
                    for handler in handlers {
                        let ast::ExceptHandler::ExceptHandler(handler) = handler;
                        walker.visit_body(&handler.body);
                    }
                    walker.visit_body(orelse);
                    walker.visit_body(finalbody);
                });
            }
            ast::Stmt::Match(ast::StmtMatch { cases, .. }) => {
                self.scoped("Match", |walker| {
                    for case in cases {
                        walker.visit_body(&case.body);
                    }
                });
            }
            ast::Stmt::Assign(ast::StmtAssign { value, .. }) => {
                self.scoped("Assign", |walker| walker.visit_expr(value));
            }
            ast::Stmt::AnnAssign(ast::StmtAnnAssign { value, .. }) => {
                if let Some(value) = value {
                    self.scoped("AnnAssign", |walker| walker.visit_expr(value));
                }
            }
            ast::Stmt::AugAssign(ast::StmtAugAssign { value, .. }) => {
                self.scoped("AugAssign", |walker| walker.visit_expr(value));
            }
            ast::Stmt::Expr(ast::StmtExpr { value, .. }) => {
                self.scoped("Expr", |walker| walker.visit_expr(value));
            }
            ast::Stmt::Return(ast::StmtReturn { value, .. }) => {
                if let Some(value) = value {
                    self.scoped("Return", |walker| walker.visit_expr(value));
                }
            }
            _ => {}
        }
    }

    /// Look for lazy-import helper calls inside expressions.
    fn visit_expr(&mut self, expr: &ast::Expr) {
        match expr {
            ast::Expr::Call(call) => {
                if let Some(target) = lazy_call_target(call) {
                    let span = self.span(call.range());
                    self.push_occurrence(
                        target,
                        ImportKind::LazyCall,
                        false,
                        true,
                        span,
                        "Call",
                    );
                }
                self.visit_expr(&call.func);
                for arg in &call.args {
                    self.visit_expr(arg);
                }
                for keyword in &call.keywords {
                    self.visit_expr(&keyword.value);
                }
            }
            ast::Expr::Tuple(ast::ExprTuple { elts, .. })
            | ast::Expr::List(ast::ExprList { elts, .. })
            | ast::Expr::Set(ast::ExprSet { elts, .. }) => {
                for elt in elts {
                    self.visit_expr(elt);
                }
            }
            ast::Expr::Dict(ast::ExprDict { values, .. }) => {
                for value in values {
                    self.visit_expr(value);
                }
            }
            ast::Expr::Attribute(ast::ExprAttribute { value, .. })
            | ast::Expr::Await(ast::ExprAwait { value, .. })
            | ast::Expr::Starred(ast::ExprStarred { value, .. }) => {
                self.visit_expr(value);
            }
            ast::Expr::BinOp(ast::ExprBinOp { left, right, .. }) => {
                self.visit_expr(left);
                self.visit_expr(right);
            }
            _ => {}
        }
    }
}

fn stmt_name(stmt: &ast::Stmt) -> &'static str {
    match stmt {
        ast::Stmt::While(_) => "While",
        ast::Stmt::For(_) => "For",
        ast::Stmt::AsyncFor(_) => "AsyncFor",
        ast::Stmt::With(_) => "With",
        ast::Stmt::AsyncWith(_) => "AsyncWith",
        _ => "Stmt",
    }
}

fn join_parts(base: &[String], tail: &str) -> String {
    if base.is_empty() {
        tail.to_owned()
    } else {
        format!("{}.{tail}", base.join("."))
    }
}

/// `if TYPE_CHECKING:` or `if typing.TYPE_CHECKING:` guards.
fn is_type_checking_test(test: &ast::Expr) -> bool {
    match test {
        ast::Expr::Name(name) => name.id.as_str() == "TYPE_CHECKING",
        ast::Expr::Attribute(attr) => attr.attr.as_str() == "TYPE_CHECKING",
        _ => false,
    }
}

/// The string argument of `lazy_import("a.b")`-style calls.
fn lazy_call_target(call: &ast::ExprCall) -> Option<String> {
    let callee = match call.func.as_ref() {
        ast::Expr::Name(name) => name.id.as_str(),
        ast::Expr::Attribute(attr) => attr.attr.as_str(),
        _ => return None,
    };
    if !LAZY_IMPORT_CALLEES.contains(&callee) {
        return None;
    }
    match call.args.first() {
        Some(ast::Expr::Constant(ast::ExprConstant {
            value: ast::Constant::Str(value),
            ..
        })) => Some(value.clone()),
        _ => None,
    }
}
