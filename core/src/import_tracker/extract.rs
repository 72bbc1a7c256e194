//! AST-based import/export extraction for a single file (spec §4.4).
//!
//! Grounded on the teacher's `analyzer/ast_js/imports.rs` +
//! `analyzer/ast_js/exports.rs`: same `oxc_ast_visit::Visit` dispatch over
//! `ImportDeclaration`/`Export*Declaration` variants, generalized from
//! loctree's `ImportEntry`/`ExportSymbol` shape to this engine's
//! `ImportRecord`/`ExportRecord` (spec §3), and extended to capture dynamic
//! `import()` calls and the type-only/async flags spec.md requires.
//!
//! Per spec §9's resolved Open Question, only this AST-based path is
//! authoritative; no mock/filename-based import scaffolding is ported.

use oxc_allocator::Allocator;
use oxc_ast::ast::*;
use oxc_ast_visit::{Visit, walk};
use oxc_parser::Parser as OxcParser;
use oxc_span::{GetSpan, SourceType, Span};

use crate::model::{ExportForm, ExportRecord, ImportForm, ImportRecord, ImportedSymbol};

pub struct ExtractedFile {
    pub imports: Vec<ImportRecord>,
    pub exports: Vec<ExportRecord>,
}

/// Parses `content` (already read from `file`) and extracts every import
/// and export statement. Returns `None` on an unrecoverable parse failure;
/// the caller attaches a `PARSE_ERROR` (spec §7).
pub fn extract(file: &str, content: &str) -> Option<ExtractedFile> {
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

    let mut visitor = ImportExportVisitor::new(file, content);
    Visit::visit_program(&mut visitor, &ret.program);
    Some(ExtractedFile {
        imports: visitor.imports,
        exports: visitor.exports,
    })
}

struct ImportExportVisitor<'a> {
    file: &'a str,
    source_text: &'a str,
    imports: Vec<ImportRecord>,
    exports: Vec<ExportRecord>,
}

impl<'a> ImportExportVisitor<'a> {
    fn new(file: &'a str, source_text: &'a str) -> Self {
        Self {
            file,
            source_text,
            imports: Vec::new(),
            exports: Vec::new(),
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
}

impl<'a> Visit<'a> for ImportExportVisitor<'a> {
    fn visit_import_declaration(&mut self, decl: &ImportDeclaration<'a>) {
        let (line, column) = self.line_col(decl.span());
        let specifier = decl.source.value.to_string();
        let type_only = matches!(decl.import_kind, ImportOrExportKind::Type);

        let mut named = Vec::new();
        let mut default_binding = None;
        let mut namespace_binding = None;
        let mut form = ImportForm::SideEffect;

        if let Some(specifiers) = &decl.specifiers {
            for spec in specifiers {
                match spec {
                    ImportDeclarationSpecifier::ImportDefaultSpecifier(s) => {
                        default_binding = Some(s.local.name.to_string());
                        form = ImportForm::Default;
                    }
                    ImportDeclarationSpecifier::ImportSpecifier(s) => {
                        let name = match &s.imported {
                            ModuleExportName::IdentifierName(id) => id.name.to_string(),
                            ModuleExportName::IdentifierReference(id) => id.name.to_string(),
                            ModuleExportName::StringLiteral(lit) => lit.value.to_string(),
                        };
                        let alias = if s.local.name.as_str() != name {
                            Some(s.local.name.to_string())
                        } else {
                            None
                        };
                        named.push(ImportedSymbol { name, alias });
                        if !matches!(form, ImportForm::Default) {
                            form = ImportForm::Named;
                        }
                    }
                    ImportDeclarationSpecifier::ImportNamespaceSpecifier(s) => {
                        namespace_binding = Some(s.local.name.to_string());
                        form = ImportForm::Namespace;
                    }
                }
            }
        }

        self.imports.push(ImportRecord {
            owning_file: self.file.to_string(),
            module_specifier: specifier,
            named,
            default_binding,
            namespace_binding,
            form,
            type_only,
            external: false,
            is_async: false,
            line,
            column,
        });
        walk::walk_import_declaration(self, decl);
    }

    fn visit_call_expression(&mut self, it: &CallExpression<'a>) {
        if matches!(it.callee, Expression::Import(_)) {
            if let Some(Argument::StringLiteral(lit)) = it.arguments.first() {
                let (line, column) = self.line_col(it.span());
                self.imports.push(ImportRecord {
                    owning_file: self.file.to_string(),
                    module_specifier: lit.value.to_string(),
                    named: Vec::new(),
                    default_binding: None,
                    namespace_binding: None,
                    form: ImportForm::Dynamic,
                    type_only: false,
                    external: false,
                    is_async: true,
                    line,
                    column,
                });
            }
        }
        walk::walk_call_expression(self, it);
    }

    fn visit_export_named_declaration(&mut self, it: &ExportNamedDeclaration<'a>) {
        let (line, column) = self.line_col(it.span());
        if let Some(source) = &it.source {
            // `export { X } from './m'` or `export { X as Y } from './m'`.
            let names: Vec<String> = it
                .specifiers
                .iter()
                .map(|s| export_name(&s.exported))
                .collect();
            self.exports.push(ExportRecord {
                owning_file: self.file.to_string(),
                names,
                default_name: None,
                form: ExportForm::Reexport,
                reexport_source: Some(source.value.to_string()),
                line,
                column,
            });
        } else {
            let mut names: Vec<String> = it
                .specifiers
                .iter()
                .map(|s| export_name(&s.exported))
                .collect();
            if let Some(declaration) = &it.declaration {
                names.extend(declared_names(declaration));
            }
            if !names.is_empty() {
                self.exports.push(ExportRecord {
                    owning_file: self.file.to_string(),
                    names,
                    default_name: None,
                    form: ExportForm::Named,
                    reexport_source: None,
                    line,
                    column,
                });
            }
        }
        walk::walk_export_named_declaration(self, it);
    }

    fn visit_export_default_declaration(&mut self, it: &ExportDefaultDeclaration<'a>) {
        let (line, column) = self.line_col(it.span());
        let name = match &it.declaration {
            ExportDefaultDeclarationKind::FunctionDeclaration(f) => {
                f.id.as_ref().map(|id| id.name.to_string())
            }
            ExportDefaultDeclarationKind::ClassDeclaration(c) => {
                c.id.as_ref().map(|id| id.name.to_string())
            }
            _ => None,
        };
        self.exports.push(ExportRecord {
            owning_file: self.file.to_string(),
            names: Vec::new(),
            default_name: name.or_else(|| Some("default".to_string())),
            form: ExportForm::Default,
            reexport_source: None,
            line,
            column,
        });
        walk::walk_export_default_declaration(self, it);
    }

    fn visit_export_all_declaration(&mut self, it: &ExportAllDeclaration<'a>) {
        let (line, column) = self.line_col(it.span());
        self.exports.push(ExportRecord {
            owning_file: self.file.to_string(),
            names: it
                .exported
                .as_ref()
                .map(|n| vec![export_name(n)])
                .unwrap_or_default(),
            default_name: None,
            form: ExportForm::Namespace,
            reexport_source: Some(it.source.value.to_string()),
            line,
            column,
        });
        walk::walk_export_all_declaration(self, it);
    }
}

fn export_name(name: &ModuleExportName) -> String {
    match name {
        ModuleExportName::IdentifierName(id) => id.name.to_string(),
        ModuleExportName::IdentifierReference(id) => id.name.to_string(),
        ModuleExportName::StringLiteral(lit) => lit.value.to_string(),
    }
}

fn declared_names(decl: &Declaration) -> Vec<String> {
    match decl {
        Declaration::FunctionDeclaration(f) => f.id.as_ref().map(|id| id.name.to_string()).into_iter().collect(),
        Declaration::ClassDeclaration(c) => c.id.as_ref().map(|id| id.name.to_string()).into_iter().collect(),
        Declaration::VariableDeclaration(v) => v
            .declarations
            .iter()
            .filter_map(|d| d.id.get_identifier_name().map(|n| n.to_string()))
            .collect(),
        Declaration::TSInterfaceDeclaration(i) => vec![i.id.name.to_string()],
        Declaration::TSTypeAliasDeclaration(t) => vec![t.id.name.to_string()],
        Declaration::TSEnumDeclaration(e) => vec![e.id.name.to_string()],
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_named_import_with_alias() {
        let extracted = extract("b.ts", "import { Foo as Bar } from './a';").unwrap();
        assert_eq!(extracted.imports.len(), 1);
        let import = &extracted.imports[0];
        assert_eq!(import.form, ImportForm::Named);
        assert_eq!(import.named[0].name, "Foo");
        assert_eq!(import.named[0].alias.as_deref(), Some("Bar"));
    }

    #[test]
    fn extracts_default_and_namespace_imports() {
        let extracted = extract(
            "b.ts",
            "import Def from './a';\nimport * as NS from './c';",
        )
        .unwrap();
        assert_eq!(extracted.imports.len(), 2);
        assert_eq!(extracted.imports[0].form, ImportForm::Default);
        assert_eq!(extracted.imports[1].form, ImportForm::Namespace);
        assert_eq!(extracted.imports[1].namespace_binding.as_deref(), Some("NS"));
    }

    #[test]
    fn extracts_dynamic_import() {
        let extracted = extract("b.ts", "async function f() { const m = await import('./a'); }").unwrap();
        assert!(extracted.imports.iter().any(|i| i.form == ImportForm::Dynamic));
    }

    #[test]
    fn extracts_type_only_import() {
        let extracted = extract("b.ts", "import type { Foo } from './a';").unwrap();
        assert!(extracted.imports[0].type_only);
    }

    #[test]
    fn extracts_named_class_export() {
        let extracted = extract("a.ts", "export class User {}").unwrap();
        assert_eq!(extracted.exports[0].form, ExportForm::Named);
        assert_eq!(extracted.exports[0].names, vec!["User".to_string()]);
    }

    #[test]
    fn extracts_reexport_forms() {
        let extracted = extract(
            "index.ts",
            "export * from './a';\nexport { X } from './b';\nexport { Y as Z } from './c';",
        )
        .unwrap();
        assert_eq!(extracted.exports.len(), 3);
        assert_eq!(extracted.exports[0].form, ExportForm::Namespace);
        assert_eq!(extracted.exports[1].form, ExportForm::Reexport);
        assert_eq!(extracted.exports[2].names, vec!["Z".to_string()]);
    }
}
