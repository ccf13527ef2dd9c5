//! JavaScript tokenizer
//!
//! Produces the flat token stream the dependency scanner walks. The lexer only
//! needs to be precise about the things that can hide or fake a dependency
//! reference: comments, string literals, template literals (including their
//! `${}` substitutions) and regular-expression literals. Everything else is
//! either an identifier, a number or punctuation.

use log::trace;

use crate::error::{BundleError, Result};

/// Byte range into the module source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// Which piece of a template literal a token covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplatePart {
    /// `` `text` `` with no substitutions
    Full,
    /// `` `text${ ``
    Head,
    /// `` }text${ ``
    Middle,
    /// `` }text` ``
    Tail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Identifiers and keywords
    Ident,
    /// `#name` class members
    PrivateName,
    Number,
    /// Single or double quoted string literal
    Str,
    Template(TemplatePart),
    Regex,
    Punct,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    /// A line terminator appeared between the previous token and this one
    pub newline_before: bool,
}

impl Token {
    pub fn text<'s>(&self, source: &'s str) -> &'s str {
        &source[self.span.start..self.span.end]
    }

    /// Whether the token opens a nesting level (`(`, `[`, `{`, `` `${ ``)
    pub fn opens(&self, source: &str) -> bool {
        match self.kind {
            TokenKind::Punct => matches!(self.text(source), "(" | "[" | "{"),
            TokenKind::Template(TemplatePart::Head) => true,
            _ => false,
        }
    }

    /// Whether the token closes a nesting level (`)`, `]`, `}`, `` }` ``)
    pub fn closes(&self, source: &str) -> bool {
        match self.kind {
            TokenKind::Punct => matches!(self.text(source), ")" | "]" | "}"),
            TokenKind::Template(TemplatePart::Tail) => true,
            _ => false,
        }
    }
}

/// Keywords after which a `/` starts a regular expression rather than a division
const REGEX_PRECEDING_KEYWORDS: &[&str] = &[
    "return",
    "typeof",
    "instanceof",
    "in",
    "of",
    "new",
    "delete",
    "void",
    "throw",
    "case",
    "do",
    "else",
    "yield",
    "await",
];

/// Multi-character punctuators, longest first so the first match is the maximal munch
const PUNCTUATORS: &[&str] = &[
    ">>>=", "...", "===", "!==", "**=", "<<=", ">>=", ">>>", "&&=", "||=", "??=", "=>", "==",
    "!=", "<=", ">=", "&&", "||", "??", "?.", "++", "--", "+=", "-=", "*=", "/=", "%=", "&=",
    "|=", "^=", "**", "<<", ">>",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delimiter {
    Paren,
    Bracket,
    /// `{` of an object literal or other expression
    Brace,
    /// `{` of a statement block, function or class body
    Block,
    Substitution,
}

/// Tokenize a module's source
///
/// `module` is only used to label errors.
pub fn tokenize(source: &str, module: &str) -> Result<Vec<Token>> {
    let tokens = Lexer::new(source, module).run()?;
    trace!("Tokenized {module} into {} tokens", tokens.len());
    Ok(tokens)
}

struct Lexer<'a> {
    source: &'a str,
    module: &'a str,
    pos: usize,
    tokens: Vec<Token>,
    delimiters: Vec<(Delimiter, usize)>,
    /// The most recent `}` punctuator closed a block
    closed_block: bool,
    newline_before: bool,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str, module: &'a str) -> Self {
        Self {
            source,
            module,
            pos: 0,
            tokens: Vec::new(),
            delimiters: Vec::new(),
            closed_block: false,
            newline_before: false,
        }
    }

    fn run(mut self) -> Result<Vec<Token>> {
        loop {
            self.skip_trivia()?;
            let Some(c) = self.peek() else {
                break;
            };
            let start = self.pos;
            let kind = match c {
                '"' | '\'' => {
                    self.read_string(c)?;
                    TokenKind::Str
                }
                '`' => {
                    self.bump(c);
                    self.read_template_chunk(true)?
                }
                '0'..='9' => {
                    self.read_number();
                    TokenKind::Number
                }
                '.' if self.peek_nth(1).is_some_and(|n| n.is_ascii_digit()) => {
                    self.read_number();
                    TokenKind::Number
                }
                '#' => {
                    self.bump(c);
                    self.read_identifier_tail();
                    TokenKind::PrivateName
                }
                c if is_identifier_start(c) => {
                    self.bump(c);
                    self.read_identifier_tail();
                    TokenKind::Ident
                }
                '/' if self.regex_allowed() => {
                    self.read_regex()?;
                    TokenKind::Regex
                }
                '(' | '[' | '{' => {
                    let delimiter = match c {
                        '(' => Delimiter::Paren,
                        '[' => Delimiter::Bracket,
                        _ if self.brace_opens_block() => Delimiter::Block,
                        _ => Delimiter::Brace,
                    };
                    self.delimiters.push((delimiter, start));
                    self.bump(c);
                    TokenKind::Punct
                }
                ')' | ']' => {
                    let expected = if c == ')' {
                        Delimiter::Paren
                    } else {
                        Delimiter::Bracket
                    };
                    self.close(expected, c)?;
                    self.bump(c);
                    TokenKind::Punct
                }
                '}' => match self.delimiters.last() {
                    Some((Delimiter::Substitution, _)) => {
                        self.delimiters.pop();
                        self.bump(c);
                        self.read_template_chunk(false)?
                    }
                    Some((Delimiter::Block, _)) => {
                        self.delimiters.pop();
                        self.closed_block = true;
                        self.bump(c);
                        TokenKind::Punct
                    }
                    _ => {
                        self.close(Delimiter::Brace, c)?;
                        self.closed_block = false;
                        self.bump(c);
                        TokenKind::Punct
                    }
                },
                _ => {
                    self.read_punctuator(c);
                    TokenKind::Punct
                }
            };
            self.tokens.push(Token {
                kind,
                span: Span::new(start, self.pos),
                newline_before: self.newline_before,
            });
            self.newline_before = false;
        }

        if let Some(&(delimiter, at)) = self.delimiters.last() {
            let message = match delimiter {
                Delimiter::Substitution => "unterminated template literal".to_owned(),
                other => format!("unclosed {}", describe(other)),
            };
            return Err(self.error_at(at, message));
        }
        Ok(self.tokens)
    }

    fn peek(&self) -> Option<char> {
        self.source[self.pos..].chars().next()
    }

    fn peek_nth(&self, n: usize) -> Option<char> {
        self.source[self.pos..].chars().nth(n)
    }

    fn bump(&mut self, c: char) {
        self.pos += c.len_utf8();
    }

    fn rest(&self) -> &'a str {
        &self.source[self.pos..]
    }

    fn error_at(&self, offset: usize, message: impl Into<String>) -> BundleError {
        BundleError::parse(self.module, self.source, offset, message)
    }

    fn close(&mut self, expected: Delimiter, c: char) -> Result<()> {
        match self.delimiters.pop() {
            Some((found, _)) if found == expected => Ok(()),
            Some((found, at)) => Err(self.error_at(
                self.pos,
                format!(
                    "unexpected '{c}', {} opened at byte {at} is still open",
                    describe(found)
                ),
            )),
            None => Err(self.error_at(self.pos, format!("unexpected '{c}'"))),
        }
    }

    fn skip_trivia(&mut self) -> Result<()> {
        if self.pos == 0 && self.source.starts_with("#!") {
            self.skip_line();
        }
        while let Some(c) = self.peek() {
            if is_line_terminator(c) {
                self.newline_before = true;
                self.bump(c);
            } else if c.is_whitespace() || c == '\u{feff}' {
                self.bump(c);
            } else if self.rest().starts_with("//") {
                self.skip_line();
            } else if self.rest().starts_with("/*") {
                let start = self.pos;
                let Some(len) = self.rest()[2..].find("*/") else {
                    return Err(self.error_at(start, "unterminated block comment"));
                };
                let body = &self.rest()[2..2 + len];
                if body.chars().any(is_line_terminator) {
                    self.newline_before = true;
                }
                self.pos += len + 4;
            } else {
                break;
            }
        }
        Ok(())
    }

    fn skip_line(&mut self) {
        while let Some(c) = self.peek() {
            if is_line_terminator(c) {
                break;
            }
            self.bump(c);
        }
    }

    fn read_string(&mut self, quote: char) -> Result<()> {
        let start = self.pos;
        self.bump(quote);
        while let Some(c) = self.peek() {
            self.bump(c);
            if c == quote {
                return Ok(());
            }
            if c == '\\' {
                if let Some(escaped) = self.peek() {
                    self.bump(escaped);
                }
            } else if c == '\n' || c == '\r' {
                break;
            }
        }
        Err(self.error_at(start, "unterminated string literal"))
    }

    /// Read template text up to the closing backtick or the next `${`
    ///
    /// The opening backtick or the `}` closing the previous substitution has
    /// already been consumed.
    fn read_template_chunk(&mut self, first: bool) -> Result<TokenKind> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            self.bump(c);
            match c {
                '\\' => {
                    if let Some(escaped) = self.peek() {
                        self.bump(escaped);
                    }
                }
                '`' => {
                    let part = if first {
                        TemplatePart::Full
                    } else {
                        TemplatePart::Tail
                    };
                    return Ok(TokenKind::Template(part));
                }
                '$' if self.peek() == Some('{') => {
                    self.bump('{');
                    self.delimiters.push((Delimiter::Substitution, self.pos - 1));
                    let part = if first {
                        TemplatePart::Head
                    } else {
                        TemplatePart::Middle
                    };
                    return Ok(TokenKind::Template(part));
                }
                _ => {}
            }
        }
        Err(self.error_at(start, "unterminated template literal"))
    }

    fn read_number(&mut self) {
        let hex_like = self.rest().len() > 1
            && self.rest().starts_with('0')
            && self
                .peek_nth(1)
                .is_some_and(|c| matches!(c, 'x' | 'X' | 'b' | 'B' | 'o' | 'O'));
        let mut prev = '\0';
        while let Some(c) = self.peek() {
            let exponent_sign = matches!(c, '+' | '-') && matches!(prev, 'e' | 'E') && !hex_like;
            if c.is_ascii_alphanumeric() || c == '_' || c == '.' || exponent_sign {
                self.bump(c);
                prev = c;
            } else {
                break;
            }
        }
    }

    fn read_identifier_tail(&mut self) {
        while let Some(c) = self.peek() {
            if is_identifier_part(c) {
                self.bump(c);
            } else {
                break;
            }
        }
    }

    fn read_regex(&mut self) -> Result<()> {
        let start = self.pos;
        self.bump('/');
        let mut in_class = false;
        loop {
            let Some(c) = self.peek() else {
                return Err(self.error_at(start, "unterminated regular expression"));
            };
            if is_line_terminator(c) {
                return Err(self.error_at(start, "unterminated regular expression"));
            }
            self.bump(c);
            match c {
                '\\' => {
                    if let Some(escaped) = self.peek() {
                        if is_line_terminator(escaped) {
                            return Err(self.error_at(start, "unterminated regular expression"));
                        }
                        self.bump(escaped);
                    }
                }
                '[' => in_class = true,
                ']' => in_class = false,
                '/' if !in_class => break,
                _ => {}
            }
        }
        self.read_identifier_tail();
        Ok(())
    }

    fn read_punctuator(&mut self, c: char) {
        let rest = self.rest();
        let matched = PUNCTUATORS.iter().find(|op| {
            rest.starts_with(**op)
                && !(**op == "?." && rest[2..].starts_with(|n: char| n.is_ascii_digit()))
        });
        match matched {
            Some(op) => self.pos += op.len(),
            None => self.bump(c),
        }
    }

    /// Decide whether a `/` at the current position starts a regex literal
    fn regex_allowed(&self) -> bool {
        let Some(prev) = self.tokens.last() else {
            return true;
        };
        match prev.kind {
            TokenKind::Number | TokenKind::Str | TokenKind::Regex | TokenKind::PrivateName => false,
            TokenKind::Template(TemplatePart::Full | TemplatePart::Tail) => false,
            TokenKind::Template(TemplatePart::Head | TemplatePart::Middle) => true,
            TokenKind::Ident => REGEX_PRECEDING_KEYWORDS.contains(&prev.text(self.source)),
            TokenKind::Punct => match prev.text(self.source) {
                "}" => self.closed_block,
                ")" | "]" | "++" | "--" => false,
                _ => true,
            },
        }
    }

    /// Decide whether a `{` at the current position opens a block rather than an object literal
    ///
    /// A function expression body followed by `/` is still read as a block.
    fn brace_opens_block(&self) -> bool {
        let Some(prev) = self.tokens.last() else {
            return true;
        };
        match prev.kind {
            TokenKind::Punct => match prev.text(self.source) {
                ";" | "{" | ")" | "=>" => true,
                "}" => self.closed_block,
                _ => false,
            },
            TokenKind::Ident => {
                let text = prev.text(self.source);
                matches!(text, "else" | "do") || !REGEX_PRECEDING_KEYWORDS.contains(&text)
            }
            _ => false,
        }
    }
}

fn describe(delimiter: Delimiter) -> &'static str {
    match delimiter {
        Delimiter::Paren => "'('",
        Delimiter::Bracket => "'['",
        Delimiter::Brace | Delimiter::Block => "'{'",
        Delimiter::Substitution => "'${'",
    }
}

fn is_line_terminator(c: char) -> bool {
    matches!(c, '\n' | '\r' | '\u{2028}' | '\u{2029}')
}

fn is_identifier_start(c: char) -> bool {
    c == '$' || c == '_' || c == '\\' || c.is_alphabetic()
}

fn is_identifier_part(c: char) -> bool {
    is_identifier_start(c) || c.is_alphanumeric() || c == '\u{200c}' || c == '\u{200d}'
}

/// Decode the value of a string or no-substitution template literal token
///
/// `raw` includes the surrounding quotes or backticks.
pub fn decode_string_literal(raw: &str) -> String {
    let inner = raw.get(1..raw.len().saturating_sub(1)).unwrap_or_default();
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let Some(escaped) = chars.next() else {
            break;
        };
        match escaped {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            'v' => out.push('\u{b}'),
            '0' => out.push('\0'),
            'x' => {
                let hex: String = chars.by_ref().take(2).collect();
                push_code_point(&mut out, &hex);
            }
            'u' => {
                if chars.peek() == Some(&'{') {
                    chars.next();
                    let hex: String = chars.by_ref().take_while(|&h| h != '}').collect();
                    push_code_point(&mut out, &hex);
                } else {
                    let hex: String = chars.by_ref().take(4).collect();
                    push_code_point(&mut out, &hex);
                }
            }
            // Line continuation
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
            }
            '\n' | '\u{2028}' | '\u{2029}' => {}
            other => out.push(other),
        }
    }
    out
}

fn push_code_point(out: &mut String, hex: &str) {
    if let Some(c) = u32::from_str_radix(hex, 16).ok().and_then(char::from_u32) {
        out.push(c);
    }
}
