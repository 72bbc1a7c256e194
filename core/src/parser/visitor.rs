//! Walks a freshly parsed `oxc` program once, capturing the declarations
//! `query_nodes` needs into an owned [`Cst`].
//!
//! Grounded on the teacher's `analyzer/ast_js/visitor.rs` (`JsVisitor`): same
//! `Visit<'a>` delegation style, same `get_line` span-to-line conversion, but
//! generalized from loctree's command/event/import-export extraction to the
//! declaration inventory this engine's `query_nodes` contract needs.

use oxc_ast::ast::*;
use oxc_ast_visit::{Visit, walk};
use oxc_span::{GetSpan, Span};

use super::cst::{Cst, CstNode, CstNodeKind};

pub(super) struct CstVisitor<'a> {
    source_text: &'a str,
    nodes: Vec<CstNode>,
    enclosing: Vec<String>,
}

impl<'a> CstVisitor<'a> {
    pub(super) fn new(source_text: &'a str) -> Self {
        Self {
            source_text,
            nodes: Vec::new(),
            enclosing: Vec::new(),
        }
    }

    pub(super) fn into_cst(self, is_tsx: bool) -> Cst {
        Cst {
            nodes: self.nodes,
            is_tsx,
            locally_referenced: Vec::new(),
        }
    }

    fn line_of(&self, span: Span) -> u32 {
        let offset = (span.start as usize).min(self.source_text.len());
        self.source_text[..offset]
            .bytes()
            .filter(|b| *b == b'\n')
            .count() as u32
            + 1
    }

    fn push(&mut self, kind: CstNodeKind, name: Option<String>, span: Span) {
        let line = self.line_of(span);
        self.nodes.push(CstNode {
            kind,
            name,
            span_start: span.start,
            span_end: span.end,
            line,
            enclosing: self.enclosing.last().cloned(),
        });
    }
}

impl<'a> Visit<'a> for CstVisitor<'a> {
    fn visit_function(&mut self, it: &Function<'a>, flags: oxc_semantic::ScopeFlags) {
        let name = it.id.as_ref().map(|id| id.name.to_string());
        self.push(CstNodeKind::FunctionDeclaration, name, it.span());
        walk::walk_function(self, it, flags);
    }

    fn visit_class(&mut self, it: &Class<'a>) {
        let name = it.id.as_ref().map(|id| id.name.to_string());
        self.push(CstNodeKind::ClassDeclaration, name.clone(), it.span());
        self.enclosing.push(name.unwrap_or_default());
        walk::walk_class(self, it);
        self.enclosing.pop();
    }

    fn visit_method_definition(&mut self, it: &MethodDefinition<'a>) {
        let name = it.key.static_name().map(|n| n.to_string());
        self.push(CstNodeKind::MethodDefinition, name, it.span());
        walk::walk_method_definition(self, it);
    }

    fn visit_ts_interface_declaration(&mut self, it: &TSInterfaceDeclaration<'a>) {
        self.push(
            CstNodeKind::InterfaceDeclaration,
            Some(it.id.name.to_string()),
            it.span(),
        );
        walk::walk_ts_interface_declaration(self, it);
    }

    fn visit_ts_type_alias_declaration(&mut self, it: &TSTypeAliasDeclaration<'a>) {
        self.push(
            CstNodeKind::TypeAlias,
            Some(it.id.name.to_string()),
            it.span(),
        );
        walk::walk_ts_type_alias_declaration(self, it);
    }

    fn visit_ts_enum_declaration(&mut self, it: &TSEnumDeclaration<'a>) {
        self.push(
            CstNodeKind::EnumDeclaration,
            Some(it.id.name.to_string()),
            it.span(),
        );
        walk::walk_ts_enum_declaration(self, it);
    }

    fn visit_import_declaration(&mut self, it: &ImportDeclaration<'a>) {
        self.push(CstNodeKind::ImportDeclaration, None, it.span());
        walk::walk_import_declaration(self, it);
    }

    fn visit_export_named_declaration(&mut self, it: &ExportNamedDeclaration<'a>) {
        self.push(CstNodeKind::ExportDeclaration, None, it.span());
        walk::walk_export_named_declaration(self, it);
    }

    fn visit_export_default_declaration(&mut self, it: &ExportDefaultDeclaration<'a>) {
        self.push(CstNodeKind::ExportDeclaration, None, it.span());
        walk::walk_export_default_declaration(self, it);
    }

    fn visit_export_all_declaration(&mut self, it: &ExportAllDeclaration<'a>) {
        self.push(CstNodeKind::ExportDeclaration, None, it.span());
        walk::walk_export_all_declaration(self, it);
    }

    fn visit_variable_declarator(&mut self, it: &VariableDeclarator<'a>) {
        if let Some(name) = it.id.get_identifier_name() {
            self.push(
                CstNodeKind::VariableDeclarator,
                Some(name.to_string()),
                it.span(),
            );
        }
        walk::walk_variable_declarator(self, it);
    }

    fn visit_call_expression(&mut self, it: &CallExpression<'a>) {
        let name = match &it.callee {
            Expression::Identifier(id) => Some(id.name.to_string()),
            Expression::StaticMemberExpression(member) => Some(member.property.name.to_string()),
            _ => None,
        };
        self.push(CstNodeKind::CallExpression, name, it.span());
        walk::walk_call_expression(self, it);
    }
}
