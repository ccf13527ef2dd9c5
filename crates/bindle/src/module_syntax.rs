//! Structural view of a module: every dependency reference and every piece of
//! import/export syntax, located by byte span.
//!
//! The scanner walks the token stream once. Call-style `require("...")` and
//! dynamic `import("...")` are found at any depth; import and export
//! declarations are only legal at the top level and are rejected elsewhere.

use log::trace;

use crate::{
    error::{BundleError, Result},
    lexer::{Span, TemplatePart, Token, TokenKind, decode_string_literal, tokenize},
};

/// Bindings introduced by an import declaration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportClause {
    /// `import d from`
    pub default: Option<String>,
    /// `import * as ns from`
    pub namespace: Option<String>,
    /// `import { a, b as c } from`, as (imported, local) pairs
    pub named: Vec<(String, String)>,
}

impl ImportClause {
    pub fn is_empty(&self) -> bool {
        self.default.is_none() && self.namespace.is_none() && self.named.is_empty()
    }
}

/// Shape of an `export ... from` declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReExport {
    /// `export * from "s"`
    All,
    /// `export * as ns from "s"`
    Namespace(String),
    /// `export { a, b as c } from "s"`, as (imported, exported) pairs
    Named(Vec<(String, String)>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyntaxItem {
    /// `require("s")`; `literal` covers the string argument
    Require { specifier: String, literal: Span },
    /// `import("s")`; `span` covers the whole call
    DynamicImport { specifier: String, span: Span },
    /// Import declaration, `span` covers the statement
    Import {
        specifier: String,
        span: Span,
        clause: ImportClause,
    },
    /// `export ... from` declaration, `span` covers the statement
    ExportFrom {
        specifier: String,
        span: Span,
        clause: ReExport,
    },
    /// `export { a, b as c }`, as (local, exported) pairs
    ExportLocal {
        span: Span,
        specifiers: Vec<(String, String)>,
    },
    /// `export` in front of a declaration; `keyword` covers `export ` up to the declaration
    ExportDeclaration { keyword: Span, names: Vec<String> },
    /// `export default function name` / `export default class Name`
    ExportDefaultNamed { keyword: Span, name: String },
    /// `export default <expression>`; `keyword` covers `export default`.
    /// `terminator` is where a `;` must be inserted after an anonymous
    /// function or class body.
    ExportDefaultExpression {
        keyword: Span,
        terminator: Option<usize>,
    },
}

impl SyntaxItem {
    /// The dependency specifier this item references, if any
    pub fn specifier(&self) -> Option<&str> {
        match self {
            Self::Require { specifier, .. }
            | Self::DynamicImport { specifier, .. }
            | Self::Import { specifier, .. }
            | Self::ExportFrom { specifier, .. } => Some(specifier),
            _ => None,
        }
    }

    fn is_export(&self) -> bool {
        matches!(
            self,
            Self::ExportFrom { .. }
                | Self::ExportLocal { .. }
                | Self::ExportDeclaration { .. }
                | Self::ExportDefaultNamed { .. }
                | Self::ExportDefaultExpression { .. }
        )
    }
}

/// Result of scanning one module
#[derive(Debug, Clone, Default)]
pub struct ModuleSyntax {
    pub items: Vec<SyntaxItem>,
    /// `#!` line at the very start of the file
    pub hashbang: Option<Span>,
}

impl ModuleSyntax {
    /// Whether the module uses import/export declarations (and is therefore strict code)
    pub fn has_module_syntax(&self) -> bool {
        self.items.iter().any(|item| {
            item.is_export() || matches!(item, SyntaxItem::Import { .. })
        })
    }

    pub fn has_exports(&self) -> bool {
        self.items.iter().any(SyntaxItem::is_export)
    }

    /// Specifiers in order of first appearance, without duplicates
    pub fn specifiers(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for specifier in self.items.iter().filter_map(SyntaxItem::specifier) {
            if !seen.contains(&specifier) {
                seen.push(specifier);
            }
        }
        seen
    }
}

/// Tokenize and scan a module's source
pub fn scan_module(source: &str, module: &str) -> Result<ModuleSyntax> {
    let tokens = tokenize(source, module)?;
    let mut scanner = Scanner {
        source,
        module,
        tokens: &tokens,
        pos: 0,
        depth: 0,
        items: Vec::new(),
    };
    scanner.scan()?;
    let hashbang = source
        .starts_with("#!")
        .then(|| Span::new(0, source.find(['\n', '\r']).unwrap_or(source.len())));
    trace!("Scanned {module}: {} syntax items", scanner.items.len());
    Ok(ModuleSyntax {
        items: scanner.items,
        hashbang,
    })
}

struct Scanner<'a> {
    source: &'a str,
    module: &'a str,
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
    items: Vec<SyntaxItem>,
}

impl Scanner<'_> {
    fn scan(&mut self) -> Result<()> {
        while let Some(token) = self.tokens.get(self.pos).copied() {
            if token.kind == TokenKind::Ident {
                match token.text(self.source) {
                    "require" => {
                        if self.scan_require()? {
                            continue;
                        }
                    }
                    "import" => {
                        if self.scan_import()? {
                            continue;
                        }
                    }
                    "export" if self.depth == 0 && !self.after_member_access(self.pos) => {
                        self.scan_export()?;
                        continue;
                    }
                    _ => {}
                }
            }
            self.track_depth(&token);
            self.pos += 1;
        }
        Ok(())
    }

    fn track_depth(&mut self, token: &Token) {
        if token.opens(self.source) {
            self.depth += 1;
        } else if token.closes(self.source) {
            self.depth = self.depth.saturating_sub(1);
        }
    }

    // Token helpers

    fn token(&self, idx: usize) -> Result<Token> {
        self.tokens.get(idx).copied().ok_or_else(|| {
            BundleError::parse(
                self.module,
                self.source,
                self.source.len(),
                "unexpected end of input",
            )
        })
    }

    fn text(&self, idx: usize) -> &str {
        self.tokens
            .get(idx)
            .map_or("", |token| token.text(self.source))
    }

    fn is_punct(&self, idx: usize, punct: &str) -> bool {
        self.tokens
            .get(idx)
            .is_some_and(|t| t.kind == TokenKind::Punct && t.text(self.source) == punct)
    }

    fn is_ident(&self, idx: usize, word: &str) -> bool {
        self.tokens
            .get(idx)
            .is_some_and(|t| t.kind == TokenKind::Ident && t.text(self.source) == word)
    }

    fn is_kind(&self, idx: usize, kind: TokenKind) -> bool {
        self.tokens.get(idx).is_some_and(|t| t.kind == kind)
    }

    /// String literal or template literal without substitutions
    fn is_string_literal(&self, idx: usize) -> bool {
        self.is_kind(idx, TokenKind::Str) || self.is_kind(idx, TokenKind::Template(TemplatePart::Full))
    }

    fn after_member_access(&self, idx: usize) -> bool {
        idx > 0 && (self.is_punct(idx - 1, ".") || self.is_punct(idx - 1, "?."))
    }

    fn error(&self, idx: usize, message: impl Into<String>) -> BundleError {
        let offset = self
            .tokens
            .get(idx)
            .map_or(self.source.len(), |t| t.span.start);
        BundleError::parse(self.module, self.source, offset, message)
    }

    fn expect_punct(&self, idx: usize, punct: &str) -> Result<()> {
        if self.is_punct(idx, punct) {
            Ok(())
        } else {
            Err(self.error(idx, format!("expected '{punct}', found '{}'", self.text(idx))))
        }
    }

    fn expect_string(&self, idx: usize) -> Result<String> {
        if self.is_string_literal(idx) {
            Ok(decode_string_literal(self.text(idx)))
        } else {
            Err(self.error(
                idx,
                format!("expected a module specifier string, found '{}'", self.text(idx)),
            ))
        }
    }

    /// Identifier or string literal used as an import/export name
    fn module_export_name(&self, idx: usize) -> Result<String> {
        if self.is_kind(idx, TokenKind::Ident) {
            Ok(self.text(idx).to_owned())
        } else if self.is_kind(idx, TokenKind::Str) {
            Ok(decode_string_literal(self.text(idx)))
        } else {
            Err(self.error(idx, format!("expected a binding name, found '{}'", self.text(idx))))
        }
    }

    fn binding_identifier(&self, idx: usize) -> Result<String> {
        if self.is_kind(idx, TokenKind::Ident) {
            Ok(self.text(idx).to_owned())
        } else {
            Err(self.error(idx, format!("expected an identifier, found '{}'", self.text(idx))))
        }
    }

    /// Index of the token closing the delimiter opened at `open`
    fn matching_close(&self, open: usize) -> Result<usize> {
        let mut depth = 0usize;
        let mut idx = open;
        while let Some(token) = self.tokens.get(idx) {
            if token.opens(self.source) {
                depth += 1;
            } else if token.closes(self.source) {
                depth -= 1;
                if depth == 0 {
                    return Ok(idx);
                }
            }
            idx += 1;
        }
        Err(self.error(open, "unclosed delimiter"))
    }

    /// Skip `with { ... }` / `assert { ... }` and an optional `;`, returning the next index
    fn finish_statement(&self, mut idx: usize) -> Result<usize> {
        let attributes = self.is_ident(idx, "with")
            || (self.is_ident(idx, "assert")
                && self.tokens.get(idx).is_some_and(|t| !t.newline_before));
        if attributes && self.is_punct(idx + 1, "{") {
            idx = self.matching_close(idx + 1)? + 1;
        }
        if self.is_punct(idx, ";") {
            idx += 1;
        }
        Ok(idx)
    }

    fn statement_span(&self, start: usize, end_exclusive: usize) -> Span {
        let first = self.tokens[start].span.start;
        let last = self.tokens[end_exclusive - 1].span.end;
        Span::new(first, last)
    }

    // require / import

    /// Returns true when the tokens at `pos` were consumed as a dependency reference
    fn scan_require(&mut self) -> Result<bool> {
        let idx = self.pos;
        if self.after_member_access(idx) || (idx > 0 && self.is_ident(idx - 1, "function")) {
            return Ok(false);
        }
        if !self.is_punct(idx + 1, "(") || !self.is_string_literal(idx + 2) {
            return Ok(false);
        }
        let close = if self.is_punct(idx + 3, ")") {
            idx + 3
        } else if self.is_punct(idx + 3, ",") && self.is_punct(idx + 4, ")") {
            idx + 4
        } else {
            return Ok(false);
        };
        let literal = self.token(idx + 2)?;
        self.items.push(SyntaxItem::Require {
            specifier: decode_string_literal(literal.text(self.source)),
            literal: literal.span,
        });
        self.pos = close + 1;
        Ok(true)
    }

    fn scan_import(&mut self) -> Result<bool> {
        let idx = self.pos;
        if self.after_member_access(idx) || self.is_punct(idx + 1, ":") {
            return Ok(false);
        }
        if self.is_punct(idx + 1, "(") {
            // computed specifiers and import options stay as written
            if !self.is_string_literal(idx + 2) || !self.is_punct(idx + 3, ")") {
                return Ok(false);
            }
            let specifier = decode_string_literal(self.text(idx + 2));
            let span = self.statement_span(idx, idx + 4);
            self.items.push(SyntaxItem::DynamicImport { specifier, span });
            self.pos = idx + 4;
            return Ok(true);
        }
        if self.is_punct(idx + 1, ".") {
            return Err(self.error(idx, "import.meta is not supported in bundled modules"));
        }
        if self.depth != 0 {
            return Err(self.error(idx, "import declarations may only appear at the top level"));
        }

        let mut clause = ImportClause::default();
        let mut cursor = idx + 1;
        let specifier = if self.is_string_literal(cursor) {
            let specifier = self.expect_string(cursor)?;
            cursor += 1;
            specifier
        } else {
            if self.is_kind(cursor, TokenKind::Ident) && !self.is_ident(cursor, "from") {
                clause.default = Some(self.binding_identifier(cursor)?);
                cursor += 1;
                if self.is_punct(cursor, ",") {
                    cursor += 1;
                }
            } else if self.is_ident(cursor, "from") && self.is_ident(cursor + 1, "from") {
                // `import from from "s"` binds a default called `from`
                clause.default = Some("from".to_owned());
                cursor += 1;
            }
            if self.is_punct(cursor, "*") {
                if !self.is_ident(cursor + 1, "as") {
                    return Err(self.error(cursor + 1, "expected 'as' after '*'"));
                }
                clause.namespace = Some(self.binding_identifier(cursor + 2)?);
                cursor += 3;
            } else if self.is_punct(cursor, "{") {
                let (named, next) = self.import_specifiers(cursor)?;
                clause.named = named;
                cursor = next;
            }
            if !self.is_ident(cursor, "from") {
                return Err(self.error(cursor, format!("expected 'from', found '{}'", self.text(cursor))));
            }
            let specifier = self.expect_string(cursor + 1)?;
            cursor += 2;
            specifier
        };
        let end = self.finish_statement(cursor)?;
        let span = self.statement_span(idx, end);
        self.items.push(SyntaxItem::Import {
            specifier,
            span,
            clause,
        });
        self.pos = end;
        Ok(true)
    }

    /// Parse `{ a, b as c, "x" as d }` starting at the `{`; returns (imported, local) pairs
    fn import_specifiers(&self, open: usize) -> Result<(Vec<(String, String)>, usize)> {
        let mut named = Vec::new();
        let mut cursor = open + 1;
        loop {
            if self.is_punct(cursor, "}") {
                return Ok((named, cursor + 1));
            }
            let imported = self.module_export_name(cursor)?;
            cursor += 1;
            let local = if self.is_ident(cursor, "as") {
                cursor += 1;
                let local = self.binding_identifier(cursor)?;
                cursor += 1;
                local
            } else if self.is_kind(cursor - 1, TokenKind::Str) {
                return Err(self.error(cursor, "string import names need an 'as' binding"));
            } else {
                imported.clone()
            };
            named.push((imported, local));
            if self.is_punct(cursor, ",") {
                cursor += 1;
            } else {
                self.expect_punct(cursor, "}")?;
            }
        }
    }

    // export

    fn scan_export(&mut self) -> Result<()> {
        let idx = self.pos;
        let next = idx + 1;
        let keyword_to_next = |this: &Self| -> Result<Span> {
            Ok(Span::new(this.token(idx)?.span.start, this.token(next)?.span.start))
        };

        if self.is_punct(next, "*") {
            let mut cursor = next + 1;
            let clause = if self.is_ident(cursor, "as") {
                let name = self.module_export_name(cursor + 1)?;
                cursor += 2;
                ReExport::Namespace(name)
            } else {
                ReExport::All
            };
            if !self.is_ident(cursor, "from") {
                return Err(self.error(cursor, "expected 'from' after 'export *'"));
            }
            let specifier = self.expect_string(cursor + 1)?;
            let end = self.finish_statement(cursor + 2)?;
            self.items.push(SyntaxItem::ExportFrom {
                specifier,
                span: self.statement_span(idx, end),
                clause,
            });
            self.pos = end;
            return Ok(());
        }

        if self.is_punct(next, "{") {
            let (specifiers, mut cursor) = self.export_specifiers(next)?;
            if self.is_ident(cursor, "from") {
                let specifier = self.expect_string(cursor + 1)?;
                let end = self.finish_statement(cursor + 2)?;
                self.items.push(SyntaxItem::ExportFrom {
                    specifier,
                    span: self.statement_span(idx, end),
                    clause: ReExport::Named(specifiers),
                });
                self.pos = end;
                return Ok(());
            }
            if let Some(bad) = specifiers.iter().position(|(local, _)| !is_identifier_name(local)) {
                return Err(self.error(
                    idx,
                    format!("cannot export string name '{}' without 'from'", specifiers[bad].0),
                ));
            }
            if self.is_punct(cursor, ";") {
                cursor += 1;
            }
            self.items.push(SyntaxItem::ExportLocal {
                span: self.statement_span(idx, cursor),
                specifiers,
            });
            self.pos = cursor;
            return Ok(());
        }

        if self.is_ident(next, "default") {
            self.scan_export_default(idx)?;
            self.pos = idx + 2;
            return Ok(());
        }

        let names = match self.text(next) {
            "const" | "let" | "var" => self.declared_names(next + 1)?,
            "function" => vec![self.function_name(next)?],
            "async" if self.is_ident(next + 1, "function") => vec![self.function_name(next + 1)?],
            "class" => vec![self.binding_identifier(next + 1)?],
            other => {
                return Err(self.error(next, format!("unsupported export syntax near '{other}'")));
            }
        };
        self.items.push(SyntaxItem::ExportDeclaration {
            keyword: keyword_to_next(self)?,
            names,
        });
        // The declaration itself is scanned as ordinary code
        self.pos = next;
        Ok(())
    }

    fn scan_export_default(&mut self, idx: usize) -> Result<()> {
        let default = idx + 1;
        let body = default + 1;
        let keyword = Span::new(self.token(idx)?.span.start, self.token(default)?.span.end);
        let up_to_body = Span::new(self.token(idx)?.span.start, self.token(body)?.span.start);

        let function = if self.is_ident(body, "function") {
            Some(body)
        } else if self.is_ident(body, "async") && self.is_ident(body + 1, "function") {
            Some(body + 1)
        } else {
            None
        };

        let item = if let Some(function) = function {
            let mut name = function + 1;
            if self.is_punct(name, "*") {
                name += 1;
            }
            if self.is_kind(name, TokenKind::Ident) {
                SyntaxItem::ExportDefaultNamed {
                    keyword: up_to_body,
                    name: self.text(name).to_owned(),
                }
            } else {
                let params = name;
                self.expect_punct(params, "(")?;
                let body_open = self.matching_close(params)? + 1;
                self.expect_punct(body_open, "{")?;
                let body_close = self.matching_close(body_open)?;
                SyntaxItem::ExportDefaultExpression {
                    keyword,
                    terminator: Some(self.token(body_close)?.span.end),
                }
            }
        } else if self.is_ident(body, "class") {
            let name = body + 1;
            if self.is_kind(name, TokenKind::Ident) && !self.is_ident(name, "extends") {
                SyntaxItem::ExportDefaultNamed {
                    keyword: up_to_body,
                    name: self.text(name).to_owned(),
                }
            } else {
                let body_close = self.class_body_close(body)?;
                SyntaxItem::ExportDefaultExpression {
                    keyword,
                    terminator: Some(self.token(body_close)?.span.end),
                }
            }
        } else {
            SyntaxItem::ExportDefaultExpression {
                keyword,
                terminator: None,
            }
        };
        self.items.push(item);
        Ok(())
    }

    /// Parse `{ a, b as c }` starting at `{`; returns (local, exported) pairs
    fn export_specifiers(&self, open: usize) -> Result<(Vec<(String, String)>, usize)> {
        let mut specifiers = Vec::new();
        let mut cursor = open + 1;
        loop {
            if self.is_punct(cursor, "}") {
                return Ok((specifiers, cursor + 1));
            }
            let local = self.module_export_name(cursor)?;
            cursor += 1;
            let exported = if self.is_ident(cursor, "as") {
                let exported = self.module_export_name(cursor + 1)?;
                cursor += 2;
                exported
            } else {
                local.clone()
            };
            specifiers.push((local, exported));
            if self.is_punct(cursor, ",") {
                cursor += 1;
            } else {
                self.expect_punct(cursor, "}")?;
            }
        }
    }

    fn function_name(&self, function: usize) -> Result<String> {
        let mut name = function + 1;
        if self.is_punct(name, "*") {
            name += 1;
        }
        self.binding_identifier(name)
    }

    /// Index of the `}` closing a class body; `class` is the index of the keyword
    fn class_body_close(&self, class: usize) -> Result<usize> {
        let mut cursor = class + 1;
        while let Some(token) = self.tokens.get(cursor) {
            if token.kind == TokenKind::Punct && token.text(self.source) == "{" {
                return self.matching_close(cursor);
            }
            if token.opens(self.source) {
                cursor = self.matching_close(cursor)?;
            }
            cursor += 1;
        }
        Err(self.error(class, "class declaration without a body"))
    }

    /// Names bound by the declarators of `const|let|var`, starting after the keyword
    fn declared_names(&self, start: usize) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut cursor = start;
        loop {
            cursor = self.collect_binding(cursor, &mut names)?;
            if self.is_punct(cursor, "=") {
                cursor = self.skip_initializer(cursor + 1);
            }
            if self.is_punct(cursor, ",") {
                cursor += 1;
            } else {
                return Ok(names);
            }
        }
    }

    fn collect_binding(&self, cursor: usize, names: &mut Vec<String>) -> Result<usize> {
        if self.is_kind(cursor, TokenKind::Ident) {
            names.push(self.text(cursor).to_owned());
            Ok(cursor + 1)
        } else if self.is_punct(cursor, "{") {
            self.collect_object_pattern(cursor, names)
        } else if self.is_punct(cursor, "[") {
            self.collect_array_pattern(cursor, names)
        } else {
            Err(self.error(cursor, format!("expected a binding, found '{}'", self.text(cursor))))
        }
    }

    fn collect_object_pattern(&self, open: usize, names: &mut Vec<String>) -> Result<usize> {
        let mut cursor = open + 1;
        loop {
            if self.is_punct(cursor, "}") {
                return Ok(cursor + 1);
            }
            if self.is_punct(cursor, "...") {
                cursor = self.collect_binding(cursor + 1, names)?;
            } else {
                let key = cursor;
                cursor = if self.is_punct(key, "[") {
                    self.matching_close(key)? + 1
                } else {
                    self.token(key)?;
                    key + 1
                };
                if self.is_punct(cursor, ":") {
                    cursor = self.collect_binding(cursor + 1, names)?;
                } else if self.is_kind(key, TokenKind::Ident) {
                    names.push(self.text(key).to_owned());
                } else {
                    return Err(self.error(key, "expected ':' after computed or literal key"));
                }
            }
            if self.is_punct(cursor, "=") {
                cursor = self.skip_pattern_default(cursor + 1);
            }
            if self.is_punct(cursor, ",") {
                cursor += 1;
            } else {
                self.expect_punct(cursor, "}")?;
            }
        }
    }

    fn collect_array_pattern(&self, open: usize, names: &mut Vec<String>) -> Result<usize> {
        let mut cursor = open + 1;
        loop {
            if self.is_punct(cursor, "]") {
                return Ok(cursor + 1);
            }
            if self.is_punct(cursor, ",") {
                cursor += 1;
                continue;
            }
            cursor = if self.is_punct(cursor, "...") {
                self.collect_binding(cursor + 1, names)?
            } else {
                self.collect_binding(cursor, names)?
            };
            if self.is_punct(cursor, "=") {
                cursor = self.skip_pattern_default(cursor + 1);
            }
            if self.is_punct(cursor, ",") {
                cursor += 1;
            } else {
                self.expect_punct(cursor, "]")?;
            }
        }
    }

    /// Skip a default value inside a pattern, stopping at `,` or the closing bracket
    fn skip_pattern_default(&self, mut cursor: usize) -> usize {
        let mut depth = 0usize;
        while let Some(token) = self.tokens.get(cursor) {
            if depth == 0 && (token.closes(self.source) || self.is_punct(cursor, ",")) {
                break;
            }
            if token.opens(self.source) {
                depth += 1;
            } else if token.closes(self.source) {
                depth -= 1;
            }
            cursor += 1;
        }
        cursor
    }

    /// Skip a declarator initializer, stopping at `,`, `;` or an automatic
    /// semicolon insertion point
    fn skip_initializer(&self, mut cursor: usize) -> usize {
        let mut depth = 0usize;
        let mut prev: Option<Token> = None;
        while let Some(token) = self.tokens.get(cursor).copied() {
            if depth == 0 {
                if self.is_punct(cursor, ";") || self.is_punct(cursor, ",") || token.closes(self.source) {
                    break;
                }
                let line_break = token.newline_before
                    && prev.is_some_and(|p| self.ends_operand(&p))
                    && self.starts_operand(&token);
                if line_break {
                    break;
                }
            }
            if token.opens(self.source) {
                depth += 1;
            } else if token.closes(self.source) {
                depth -= 1;
            }
            prev = Some(token);
            cursor += 1;
        }
        cursor
    }

    fn ends_operand(&self, token: &Token) -> bool {
        match token.kind {
            TokenKind::Ident => !is_operator_keyword(token.text(self.source)),
            TokenKind::Number | TokenKind::Str | TokenKind::Regex | TokenKind::PrivateName => true,
            TokenKind::Template(part) => matches!(part, TemplatePart::Full | TemplatePart::Tail),
            TokenKind::Punct => matches!(token.text(self.source), ")" | "]" | "}" | "++" | "--"),
        }
    }

    fn starts_operand(&self, token: &Token) -> bool {
        match token.kind {
            TokenKind::Ident => !matches!(token.text(self.source), "in" | "instanceof" | "of"),
            TokenKind::Number | TokenKind::Str | TokenKind::Regex | TokenKind::PrivateName => true,
            TokenKind::Template(part) => matches!(part, TemplatePart::Full | TemplatePart::Head),
            TokenKind::Punct => matches!(token.text(self.source), "++" | "--" | "!" | "~"),
        }
    }
}

fn is_operator_keyword(word: &str) -> bool {
    matches!(
        word,
        "in" | "instanceof" | "of" | "typeof" | "new" | "delete" | "void" | "await" | "yield"
    )
}

pub(crate) fn is_identifier_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c == '$' || c == '_' || c.is_alphabetic())
        && chars.all(|c| c == '$' || c == '_' || c.is_alphanumeric())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn items(source: &str) -> Vec<SyntaxItem> {
        scan_module(source, "src/test.js").unwrap().items
    }

    fn pairs(list: &[(&str, &str)]) -> Vec<(String, String)> {
        list.iter()
            .map(|(a, b)| ((*a).to_owned(), (*b).to_owned()))
            .collect()
    }

    #[test]
    fn test_call_style_requires() {
        let source = "const a = require('./a');\nfunction f() { return require(\"../b\", ); }\n";
        let syntax = scan_module(source, "src/test.js").unwrap();
        assert_eq!(syntax.specifiers(), vec!["./a", "../b"]);
        assert!(!syntax.has_module_syntax());
        let SyntaxItem::Require { literal, .. } = &syntax.items[0] else {
            panic!("expected a require item");
        };
        assert_eq!(&source[literal.start..literal.end], "'./a'");
    }

    #[test]
    fn test_non_references_are_ignored() {
        let source = r#"
            loader.require("./member");
            require(name);
            const s = "require('./in-string')";
            // require('./in-comment')
            const o = { require: 1, import: 2 };
            function require(x) {}
        "#;
        let syntax = scan_module(source, "src/test.js").unwrap();
        assert!(syntax.specifiers().is_empty(), "{:?}", syntax.items);
    }

    #[test]
    fn test_import_clause_forms() {
        let source = r#"
import def from "./default";
import * as ns from './ns';
import { a, b as c, "d-e" as de } from "./named";
import both, { x } from "./both";
import "./side-effect";
import data from "./data.json" with { type: "json" };
"#;
        let found = items(source);
        let clauses: Vec<_> = found
            .iter()
            .map(|item| match item {
                SyntaxItem::Import { specifier, clause, .. } => (specifier.as_str(), clause.clone()),
                other => panic!("unexpected item {other:?}"),
            })
            .collect();
        assert_eq!(clauses.len(), 6);
        assert_eq!(clauses[0].1.default.as_deref(), Some("def"));
        assert_eq!(clauses[1].1.namespace.as_deref(), Some("ns"));
        assert_eq!(
            clauses[2].1.named,
            pairs(&[("a", "a"), ("b", "c"), ("d-e", "de")])
        );
        assert_eq!(clauses[3].1.default.as_deref(), Some("both"));
        assert_eq!(clauses[3].1.named, pairs(&[("x", "x")]));
        assert_eq!(clauses[4], ("./side-effect", ImportClause::default()));
        assert_eq!(clauses[5].0, "./data.json");
    }

    #[test]
    fn test_import_statement_span_includes_attributes_and_semicolon() {
        let source = "import a from './a' with { type: 'x' };\nrun();";
        let SyntaxItem::Import { span, .. } = &items(source)[0] else {
            panic!("expected import");
        };
        assert_eq!(&source[span.start..span.end], "import a from './a' with { type: 'x' };");
    }

    #[test]
    fn test_export_declaration_names() {
        let source = r#"
export const a = 1, { b, c: [d, ...e], f = g({ h: 1 }) } = obj;
export let x
export function* gen() {}
export async function run() {}
export class Widget extends Base {}
"#;
        let names: Vec<Vec<String>> = items(source)
            .into_iter()
            .filter_map(|item| match item {
                SyntaxItem::ExportDeclaration { names, .. } => Some(names),
                _ => None,
            })
            .collect();
        assert_eq!(
            names,
            vec![
                vec!["a", "b", "d", "e", "f"],
                vec!["x"],
                vec!["gen"],
                vec!["run"],
                vec!["Widget"],
            ]
            .into_iter()
            .map(|v| v.into_iter().map(str::to_owned).collect::<Vec<_>>())
            .collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_initializer_stops_at_line_break() {
        let source = "export const a = compute()\nexport const b = 2";
        let names: Vec<_> = items(source)
            .into_iter()
            .filter_map(|item| match item {
                SyntaxItem::ExportDeclaration { names, .. } => Some(names),
                _ => None,
            })
            .collect();
        assert_eq!(names, vec![vec!["a".to_owned()], vec!["b".to_owned()]]);
    }

    #[test]
    fn test_requires_inside_exported_initializers_are_found() {
        let source = "export const helper = require('./helper').make();";
        let syntax = scan_module(source, "src/test.js").unwrap();
        assert_eq!(syntax.specifiers(), vec!["./helper"]);
        assert!(syntax.has_exports());
    }

    #[test]
    fn test_export_from_forms() {
        let source = r#"
export * from "./all";
export * as tools from "./tools";
export { a as b, default } from "./named";
export { local, other as renamed };
"#;
        let found = items(source);
        assert_eq!(found.len(), 4);
        assert!(matches!(&found[0], SyntaxItem::ExportFrom { clause: ReExport::All, .. }));
        assert!(
            matches!(&found[1], SyntaxItem::ExportFrom { clause: ReExport::Namespace(n), .. } if n == "tools")
        );
        assert!(
            matches!(&found[2], SyntaxItem::ExportFrom { clause: ReExport::Named(list), .. } if *list == pairs(&[("a", "b"), ("default", "default")]))
        );
        assert!(
            matches!(&found[3], SyntaxItem::ExportLocal { specifiers, .. } if *specifiers == pairs(&[("local", "local"), ("other", "renamed")]))
        );
    }

    #[test]
    fn test_export_default_forms() {
        let named = items("export default function main() {}");
        assert!(matches!(&named[0], SyntaxItem::ExportDefaultNamed { name, .. } if name == "main"));

        let class = items("export default class App {}");
        assert!(matches!(&class[0], SyntaxItem::ExportDefaultNamed { name, .. } if name == "App"));

        let source = "export default function () { return 1 }\n(other)";
        let anonymous = items(source);
        let SyntaxItem::ExportDefaultExpression { terminator: Some(at), .. } = anonymous[0] else {
            panic!("expected anonymous default");
        };
        assert_eq!(&source[..at], "export default function () { return 1 }");

        let source = "export default class extends (mixin({})) { run() {} }";
        let SyntaxItem::ExportDefaultExpression { terminator: Some(at), .. } = items(source)[0]
        else {
            panic!("expected anonymous class default");
        };
        assert_eq!(at, source.len());

        let expression = items("export default 42;");
        assert!(matches!(
            &expression[0],
            SyntaxItem::ExportDefaultExpression { terminator: None, .. }
        ));
    }

    #[test]
    fn test_dynamic_import() {
        let source = "button.onclick = () => import('./lazy').then(run);";
        let SyntaxItem::DynamicImport { specifier, span } = &items(source)[0] else {
            panic!("expected dynamic import");
        };
        assert_eq!(specifier, "./lazy");
        assert_eq!(&source[span.start..span.end], "import('./lazy')");
    }

    #[test]
    fn test_computed_dynamic_import_left_alone() {
        let source = "function later(name) { return import(name); }\n\
                      import('./a' + suffix);\nimport('./b', { with: { type: 'json' } });";
        assert!(items(source).is_empty());
    }

    #[test]
    fn test_invalid_module_syntax() {
        let nested = scan_module("if (x) { import a from './a'; }", "src/bad.js").unwrap_err();
        assert!(nested.to_string().contains("top level"), "{nested}");

        let meta = scan_module("console.log(import.meta.url)", "src/bad.js").unwrap_err();
        assert!(meta.to_string().contains("import.meta"), "{meta}");

        let missing_from = scan_module("import { a } './a';", "src/bad.js").unwrap_err();
        assert!(missing_from.to_string().contains("expected 'from'"), "{missing_from}");
    }

    #[test]
    fn test_hashbang_span() {
        let syntax = scan_module("#!/usr/bin/env node\nrequire('./cli');", "bin.js").unwrap();
        assert_eq!(syntax.hashbang, Some(Span::new(0, 19)));
    }
}
