//! Pass 1 (syntactic) symbol/reference extraction (spec §4.5).
//!
//! Grounded on the teacher's `analyzer/ast_js/visitor.rs` emit-on-visit
//! traversal, generalized from import/export/command extraction to the
//! declaration/definition/call inventory this pass needs. Import bindings
//! reuse [`crate::import_tracker::extract`] rather than re-walking imports
//! a second time.

use std::collections::HashSet;

use oxc_allocator::Allocator;
use oxc_ast::ast::*;
use oxc_ast_visit::{Visit, walk};
use oxc_parser::Parser as OxcParser;
use oxc_span::{GetSpan, SourceType, Span};

use crate::model::{Reference, ReferenceKind, Symbol, SymbolKind};

/// Call targets recognized as test-framework declarations (spec §4.5).
const TEST_CALL_PREFIXES: &[&str] = &["describe", "test", "it", "before", "after"];

/// A `class X implements Y` clause, captured during pass 1 but only turned
/// into a [`Reference`] during pass 2 (spec §4.5 "Pass 2 ... emits
/// references for implements clauses").
#[derive(Debug, Clone)]
pub struct ImplementsClause {
    pub class_name: String,
    pub interface_name: String,
    pub line: u32,
    pub column: u32,
}

pub struct ExtractedSymbols {
    pub symbols: Vec<Symbol>,
    pub references: Vec<Reference>,
    pub implements_clauses: Vec<ImplementsClause>,
}

pub fn extract_syntactic(file: &str, content: &str) -> Option<ExtractedSymbols> {
    let is_jsx = file.ends_with(".tsx") || file.ends_with(".jsx");
    let source_type = SourceType::from_path(std::path::Path::new(file))
        .unwrap_or_default()
        .with_typescript(true)
        .with_jsx(is_jsx);
    let allocator = Allocator::default();
    let ret = OxcParser::new(&allocator, content, source_type).parse();
    if ret.program.body.is_empty() && !ret.errors.is_empty() {
        return None;
    }

    let exported = super::exported_names(file, content);
    let mut visitor = SymbolVisitor::new(file, content, exported);
    Visit::visit_program(&mut visitor, &ret.program);

    // Import bindings are references of kind `import` (spec §4.5 Pass 1);
    // resolution of the specifier to a file happens in pass 2.
    if let Some(extracted) = crate::import_tracker::extract::extract(file, content) {
        for import in &extracted.imports {
            let (line, column) = (import.line, import.column);
            let context = visitor.context_line(line);
            let mut names: Vec<(String, Option<String>)> = import
                .named
                .iter()
                .map(|n| (n.name.clone(), n.alias.clone()))
                .collect();
            if let Some(default) = &import.default_binding {
                names.push((default.clone(), None));
            }
            if let Some(namespace) = &import.namespace_binding {
                names.push((namespace.clone(), None));
            }
            if names.is_empty() {
                // Side-effect or dynamic import with no bound name.
                let mut reference = Reference::new(file, line, column, context.clone(), ReferenceKind::Import);
                reference.import_path = Some(import.module_specifier.clone());
                reference.import_form = Some(import.form);
                visitor.references.push(reference);
            }
            for (name, alias) in names {
                let bound = alias.unwrap_or(name.clone());
                let mut reference = Reference::new(file, line, column, context.clone(), ReferenceKind::Import)
                    .with_symbol(bound);
                reference.import_path = Some(import.module_specifier.clone());
                reference.import_form = Some(import.form);
                visitor.references.push(reference);
            }
        }
    }

    Some(ExtractedSymbols {
        symbols: visitor.symbols,
        references: visitor.references,
        implements_clauses: visitor.implements_clauses,
    })
}

struct SymbolVisitor<'a> {
    file: &'a str,
    source_text: &'a str,
    exported: HashSet<String>,
    class_stack: Vec<String>,
    fn_depth: u32,
    symbols: Vec<Symbol>,
    references: Vec<Reference>,
    implements_clauses: Vec<ImplementsClause>,
}

impl<'a> SymbolVisitor<'a> {
    fn new(file: &'a str, source_text: &'a str, exported: HashSet<String>) -> Self {
        Self {
            file,
            source_text,
            exported,
            class_stack: Vec::new(),
            fn_depth: 0,
            symbols: Vec::new(),
            references: Vec::new(),
            implements_clauses: Vec::new(),
        }
    }

    fn line_col(&self, span: Span) -> (u32, u32) {
        let offset = (span.start as usize).min(self.source_text.len());
        let prefix = &self.source_text[..offset];
        let line = prefix.bytes().filter(|b| *b == b'\n').count() as u32 + 1;
        let col = match prefix.rfind('\n') {
            Some(idx) => (offset - idx - 1) as u32,
            None => offset as u32,
        };
        (line, col)
    }

    fn context_line(&self, line: u32) -> String {
        self.source_text
            .lines()
            .nth(line.saturating_sub(1) as usize)
            .unwrap_or("")
            .trim()
            .to_string()
    }

    fn emit_symbol(&mut self, name: &str, kind: SymbolKind, span: Span, reference_kind: ReferenceKind) {
        let (line, column) = self.line_col(span);
        let mut symbol = Symbol::new(name, kind, self.file, line, column);
        symbol.exported = self.exported.contains(name);
        symbol.enclosing_class = self.class_stack.last().cloned();
        self.symbols.push(symbol);

        let mut reference = Reference::new(self.file, line, column, self.context_line(line), reference_kind)
            .with_symbol(name);
        reference.symbol_kind = Some(kind);
        reference.class_name = self.class_stack.last().cloned();
        self.references.push(reference);
    }

    fn emit_call_reference(&mut self, name: &str, span: Span) {
        let (line, column) = self.line_col(span);
        let reference = Reference::new(self.file, line, column, self.context_line(line), ReferenceKind::Call)
            .with_symbol(name);
        self.references.push(reference);
    }

    fn is_test_call(name: &str) -> bool {
        TEST_CALL_PREFIXES.iter().any(|prefix| name == *prefix || name.starts_with(prefix))
    }

    fn function_params(params: &FormalParameters) -> Vec<String> {
        params
            .items
            .iter()
            .filter_map(|p| p.pattern.get_identifier_name().map(|n| n.to_string()))
            .collect()
    }
}

impl<'a> Visit<'a> for SymbolVisitor<'a> {
    fn visit_function(&mut self, it: &Function<'a>, flags: oxc_semantic::ScopeFlags) {
        if let Some(id) = &it.id {
            if self.fn_depth == 0 {
                let params = Self::function_params(&it.params);
                self.emit_symbol(&id.name, SymbolKind::Function, it.span(), ReferenceKind::Definition);
                if let Some(symbol) = self.symbols.last_mut() {
                    symbol.parameters = Some(params);
                    symbol.return_type = it
                        .return_type
                        .as_ref()
                        .map(|t| t.type_annotation.span().source_text(self.source_text).to_string());
                }
            }
        }
        self.fn_depth += 1;
        walk::walk_function(self, it, flags);
        self.fn_depth -= 1;
    }

    fn visit_class(&mut self, it: &Class<'a>) {
        let name = it.id.as_ref().map(|id| id.name.to_string());
        if let Some(name) = &name {
            self.emit_symbol(name, SymbolKind::Class, it.span(), ReferenceKind::Declaration);
            if let Some(implements) = &it.implements {
                let (line, column) = self.line_col(it.span());
                for clause in implements {
                    let interface_name = match &clause.expression {
                        TSTypeName::IdentifierReference(id) => Some(id.name.to_string()),
                        TSTypeName::QualifiedName(qualified) => Some(qualified.right.name.to_string()),
                        _ => None,
                    };
                    if let Some(interface_name) = interface_name {
                        self.implements_clauses.push(ImplementsClause {
                            class_name: name.clone(),
                            interface_name,
                            line,
                            column,
                        });
                    }
                }
            }
        }
        self.class_stack.push(name.unwrap_or_default());
        walk::walk_class(self, it);
        self.class_stack.pop();
    }

    fn visit_ts_interface_declaration(&mut self, it: &TSInterfaceDeclaration<'a>) {
        self.emit_symbol(&it.id.name, SymbolKind::Interface, it.span(), ReferenceKind::Declaration);
        walk::walk_ts_interface_declaration(self, it);
    }

    fn visit_ts_type_alias_declaration(&mut self, it: &TSTypeAliasDeclaration<'a>) {
        self.emit_symbol(&it.id.name, SymbolKind::TypeAlias, it.span(), ReferenceKind::Declaration);
        walk::walk_ts_type_alias_declaration(self, it);
    }

    fn visit_ts_enum_declaration(&mut self, it: &TSEnumDeclaration<'a>) {
        self.emit_symbol(&it.id.name, SymbolKind::Enum, it.span(), ReferenceKind::Declaration);
        walk::walk_ts_enum_declaration(self, it);
    }

    fn visit_method_definition(&mut self, it: &MethodDefinition<'a>) {
        if let Some(name) = it.key.static_name() {
            // A method with no body is either an abstract method signature or
            // an interface-style overload head; either way it is a
            // declaration rather than a definition.
            let reference_kind = if it.value.body.is_none() {
                ReferenceKind::Declaration
            } else {
                ReferenceKind::Definition
            };
            let params = Self::function_params(&it.value.params);
            self.emit_symbol(&name, SymbolKind::Method, it.span(), reference_kind);
            if let Some(symbol) = self.symbols.last_mut() {
                symbol.parameters = Some(params);
                symbol.return_type = it
                    .value
                    .return_type
                    .as_ref()
                    .map(|t| t.type_annotation.span().source_text(self.source_text).to_string());
            }
        }
        self.fn_depth += 1;
        walk::walk_method_definition(self, it);
        self.fn_depth -= 1;
    }

    fn visit_property_definition(&mut self, it: &PropertyDefinition<'a>) {
        if let Some(name) = it.key.static_name() {
            self.emit_symbol(&name, SymbolKind::Property, it.span(), ReferenceKind::Declaration);
        }
        walk::walk_property_definition(self, it);
    }

    fn visit_variable_declarator(&mut self, it: &VariableDeclarator<'a>) {
        if self.fn_depth == 0 {
            if let Some(name) = it.id.get_identifier_name() {
                let is_function_valued = matches!(
                    it.init,
                    Some(Expression::ArrowFunctionExpression(_)) | Some(Expression::FunctionExpression(_))
                );
                if is_function_valued {
                    self.emit_symbol(&name, SymbolKind::Function, it.span(), ReferenceKind::Definition);
                }
            }
        }
        walk::walk_variable_declarator(self, it);
    }

    fn visit_call_expression(&mut self, it: &CallExpression<'a>) {
        let name = match &it.callee {
            Expression::Identifier(id) => Some(id.name.to_string()),
            Expression::StaticMemberExpression(member) => Some(member.property.name.to_string()),
            _ => None,
        };
        if let Some(name) = &name {
            if Self::is_test_call(name) {
                if let Some(Argument::StringLiteral(lit)) = it.arguments.first() {
                    self.emit_symbol(&lit.value, SymbolKind::Test, it.span(), ReferenceKind::Declaration);
                }
            } else {
                self.emit_call_reference(name, it.span());
            }
        }
        walk::walk_call_expression(self, it);
    }

    fn visit_new_expression(&mut self, it: &NewExpression<'a>) {
        // `new User()` constructs an instance but never appears as a
        // `CallExpression` callee, so pass 1 would otherwise miss it
        // entirely (spec §8 scenario 1 requires a call reference here).
        let name = match &it.callee {
            Expression::Identifier(id) => Some(id.name.to_string()),
            Expression::StaticMemberExpression(member) => Some(member.property.name.to_string()),
            _ => None,
        };
        if let Some(name) = &name {
            self.emit_call_reference(name, it.span());
        }
        walk::walk_new_expression(self, it);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_top_level_function_definition() {
        let extracted = extract_syntactic("a.ts", "export function foo(x: number): number { return x; }").unwrap();
        let symbol = extracted.symbols.iter().find(|s| s.name == "foo").unwrap();
        assert_eq!(symbol.kind, SymbolKind::Function);
        assert!(symbol.exported);
        assert_eq!(symbol.parameters.as_deref(), Some(&["x".to_string()][..]));
    }

    #[test]
    fn extracts_class_and_methods_with_enclosing_class() {
        let extracted = extract_syntactic("a.ts", "class Foo { bar() { return 1; } }").unwrap();
        let class = extracted.symbols.iter().find(|s| s.name == "Foo").unwrap();
        assert_eq!(class.kind, SymbolKind::Class);
        let method = extracted.symbols.iter().find(|s| s.name == "bar").unwrap();
        assert_eq!(method.kind, SymbolKind::Method);
        assert_eq!(method.enclosing_class.as_deref(), Some("Foo"));
    }

    #[test]
    fn extracts_arrow_function_binding() {
        let extracted = extract_syntactic("a.ts", "const add = (a: number, b: number) => a + b;").unwrap();
        let symbol = extracted.symbols.iter().find(|s| s.name == "add").unwrap();
        assert_eq!(symbol.kind, SymbolKind::Function);
    }

    #[test]
    fn extracts_test_framework_call_as_symbol() {
        let extracted = extract_syntactic("a.test.ts", "describe('my suite', () => { it('does a thing', () => {}); });").unwrap();
        assert!(extracted.symbols.iter().any(|s| s.name == "my suite" && s.kind == SymbolKind::Test));
        assert!(extracted.symbols.iter().any(|s| s.name == "does a thing" && s.kind == SymbolKind::Test));
    }

    #[test]
    fn extracts_call_reference_for_non_test_call() {
        let extracted = extract_syntactic("a.ts", "function main() { helper(); }").unwrap();
        assert!(
            extracted
                .references
                .iter()
                .any(|r| r.kind == ReferenceKind::Call && r.symbol_name.as_deref() == Some("helper"))
        );
    }

    #[test]
    fn extracts_call_reference_for_new_expression() {
        let extracted = extract_syntactic("a.ts", "import { User } from './a';\nnew User();\n").unwrap();
        assert!(
            extracted
                .references
                .iter()
                .any(|r| r.kind == ReferenceKind::Call && r.symbol_name.as_deref() == Some("User"))
        );
    }

    #[test]
    fn captures_implements_clause_on_class() {
        let extracted = extract_syntactic("a.ts", "class Foo implements Bar {}").unwrap();
        assert_eq!(extracted.implements_clauses.len(), 1);
        assert_eq!(extracted.implements_clauses[0].class_name, "Foo");
        assert_eq!(extracted.implements_clauses[0].interface_name, "Bar");
    }

    #[test]
    fn import_binding_becomes_import_reference() {
        let extracted = extract_syntactic("a.ts", "import { x } from './b';").unwrap();
        assert!(
            extracted
                .references
                .iter()
                .any(|r| r.kind == ReferenceKind::Import && r.symbol_name.as_deref() == Some("x"))
        );
    }

    #[test]
    fn interface_and_enum_are_declarations() {
        let extracted = extract_syntactic("a.ts", "interface Foo {} enum Bar { A, B }").unwrap();
        let iface = extracted.symbols.iter().find(|s| s.name == "Foo").unwrap();
        assert_eq!(iface.kind, SymbolKind::Interface);
        let en = extracted.symbols.iter().find(|s| s.name == "Bar").unwrap();
        assert_eq!(en.kind, SymbolKind::Enum);
    }
}
