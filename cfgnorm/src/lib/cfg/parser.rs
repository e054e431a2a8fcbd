use std::{error::Error, fmt};

use lazy_static::lazy_static;
use regex::Regex;

use super::ast::{GrammarAST, Symbol};
use crate::Span;

type CfgResult<T> = Result<T, CfgGrammarError>;

/// The various different possible grammar errors, covering both the textual parse and the
/// subsequent AST validation.
#[derive(Debug, PartialEq, Eq)]
pub enum CfgGrammarErrorKind {
    IllegalName,
    IllegalString,
    IncompleteRule,
    IncompleteComment,
    MissingColon,
    PrematureEnd,
    ProgramsNotSupported,
    UnknownDeclaration,
    DuplicateStartDeclaration,
    ReachedEOL,
    NoStartRule,
    InvalidStartRule(String),
    UnknownRuleRef(String),
    UnknownToken(String),
}

/// Any error from grammar parsing or validation returns an instance of this struct.
#[derive(Debug, PartialEq, Eq)]
pub struct CfgGrammarError {
    pub kind: CfgGrammarErrorKind,
    pub span: Span,
}

impl Error for CfgGrammarError {}

impl fmt::Display for CfgGrammarError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl fmt::Display for CfgGrammarErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            CfgGrammarErrorKind::IllegalName => "Illegal name",
            CfgGrammarErrorKind::IllegalString => "Illegal string",
            CfgGrammarErrorKind::IncompleteRule => "Incomplete rule",
            CfgGrammarErrorKind::IncompleteComment => "Incomplete comment",
            CfgGrammarErrorKind::MissingColon => "Missing ':'",
            CfgGrammarErrorKind::PrematureEnd => "File ends prematurely",
            CfgGrammarErrorKind::ProgramsNotSupported => {
                "Trailing sections are not supported"
            }
            CfgGrammarErrorKind::UnknownDeclaration => "Unknown declaration",
            CfgGrammarErrorKind::DuplicateStartDeclaration => {
                "Duplicated %start declaration"
            }
            CfgGrammarErrorKind::ReachedEOL => {
                "Reached end of line without finding expected content"
            }
            CfgGrammarErrorKind::NoStartRule => return write!(f, "No start rule specified"),
            CfgGrammarErrorKind::InvalidStartRule(name) => {
                return write!(f, "Start rule '{}' does not appear in grammar", name);
            }
            CfgGrammarErrorKind::UnknownRuleRef(name) => {
                return write!(f, "Unknown reference to rule '{}'", name);
            }
            CfgGrammarErrorKind::UnknownToken(name) => {
                return write!(f, "Unknown token '{}'", name);
            }
        };
        write!(f, "{}", s)
    }
}

lazy_static! {
    static ref RE_NAME: Regex = Regex::new(r"^[a-zA-Z_.][a-zA-Z0-9_.]*").unwrap();
    static ref RE_TOKEN: Regex =
        Regex::new("^(?:(\".+?\")|('.+?')|([a-zA-Z_][a-zA-Z_0-9]*))").unwrap();
}

/// Parses the textual grammar format into a `GrammarAST`. The format is a pared-down Yacc:
/// an optional declarations section (`%start`, `%token`) terminated by `%%`, followed by
/// rules of the form `Name: alternative | alternative;` where an empty alternative is an ε
/// production. Quoted symbols are tokens (and implicitly declared as such); bare names are
/// tokens if declared by `%token`, rule references otherwise.
pub(crate) struct CfgParser {
    src: String,
    ast: GrammarAST,
}

impl CfgParser {
    pub(crate) fn new(src: String) -> CfgParser {
        CfgParser {
            src,
            ast: GrammarAST::new(),
        }
    }

    pub(crate) fn parse(&mut self) -> CfgResult<usize> {
        // We pass around an index into the *bytes* of self.src. We guarantee that at all
        // times this points to the beginning of a UTF-8 character (since multibyte
        // characters exist, not every byte within the string is also a valid character).
        let mut i = self.parse_declarations(0)?;
        i = self.parse_rules(i)?;
        if i < self.src.len() {
            // The only way parse_rules stops before the end of the input is a second "%%",
            // i.e. a Yacc-style programs section.
            return Err(self.mk_error(CfgGrammarErrorKind::ProgramsNotSupported, i));
        }
        Ok(i)
    }

    pub(crate) fn ast(self) -> GrammarAST {
        self.ast
    }

    fn parse_declarations(&mut self, mut i: usize) -> CfgResult<usize> {
        i = self.parse_ws(i, true)?;
        while i < self.src.len() {
            if self.lookahead_is("%%", i).is_some() {
                return Ok(i);
            }
            if let Some(j) = self.lookahead_is("%token", i) {
                i = self.parse_ws(j, false)?;
                while i < self.src.len() {
                    if self.lookahead_is("%", i).is_some() {
                        break;
                    }
                    let (j, n, span) = self.parse_token(i)?;
                    if self.ast.tokens.insert(n) {
                        self.ast.spans.push(span);
                    }
                    i = self.parse_ws(j, true)?;
                }
                continue;
            }
            if let Some(j) = self.lookahead_is("%start", i) {
                i = self.parse_ws(j, false)?;
                let (j, n) = self.parse_name(i)?;
                let span = Span::new(i, j);
                if self.ast.start.is_some() {
                    return Err(
                        self.mk_error(CfgGrammarErrorKind::DuplicateStartDeclaration, i)
                    );
                }
                self.ast.start = Some((n, span));
                i = self.parse_ws(j, true)?;
                continue;
            }
            return Err(self.mk_error(CfgGrammarErrorKind::UnknownDeclaration, i));
        }
        Err(self.mk_error(CfgGrammarErrorKind::PrematureEnd, i))
    }

    fn parse_rules(&mut self, mut i: usize) -> CfgResult<usize> {
        // self.parse_declarations should have left the input at '%%'
        i = self.lookahead_is("%%", i).unwrap();
        i = self.parse_ws(i, true)?;
        while i < self.src.len() {
            if self.lookahead_is("%%", i).is_some() {
                break;
            }
            i = self.parse_rule(i)?;
            i = self.parse_ws(i, true)?;
        }
        Ok(i)
    }

    fn parse_rule(&mut self, mut i: usize) -> CfgResult<usize> {
        let (j, rn) = self.parse_name(i)?;
        let span = Span::new(i, j);
        if self.ast.start.is_none() {
            // With no %start declaration, the first rule defined is the start rule.
            self.ast.start = Some((rn.clone(), span));
        }
        self.ast.add_rule((rn.clone(), span));
        i = self.parse_ws(j, true)?;
        match self.lookahead_is(":", i) {
            Some(j) => i = j,
            None => {
                return Err(self.mk_error(CfgGrammarErrorKind::MissingColon, i));
            }
        }
        let mut syms = Vec::new();
        i = self.parse_ws(i, true)?;
        while i < self.src.len() {
            if let Some(j) = self.lookahead_is("|", i) {
                self.ast.add_prod(rn.clone(), syms);
                syms = Vec::new();
                i = self.parse_ws(j, true)?;
                continue;
            } else if let Some(j) = self.lookahead_is(";", i) {
                self.ast.add_prod(rn, syms);
                return Ok(j);
            }

            if self.lookahead_is("\"", i).is_some() || self.lookahead_is("'", i).is_some() {
                // Quoted symbols are always tokens and implicitly declare the token.
                let (j, sym, span) = self.parse_token(i)?;
                if self.ast.tokens.insert(sym.clone()) {
                    self.ast.spans.push(span);
                }
                syms.push(Symbol::Token(sym, span));
                i = self.parse_ws(j, true)?;
            } else {
                let (j, sym, span) = self.parse_token(i)?;
                if self.ast.tokens.contains(&sym) {
                    syms.push(Symbol::Token(sym, span));
                } else {
                    syms.push(Symbol::Rule(sym, span));
                }
                i = self.parse_ws(j, true)?;
            }
        }
        Err(self.mk_error(CfgGrammarErrorKind::IncompleteRule, i))
    }

    fn parse_name(&self, i: usize) -> CfgResult<(usize, String)> {
        match RE_NAME.find(&self.src[i..]) {
            Some(m) => {
                assert_eq!(m.start(), 0);
                Ok((i + m.end(), self.src[i..i + m.end()].to_string()))
            }
            None => Err(self.mk_error(CfgGrammarErrorKind::IllegalName, i)),
        }
    }

    fn parse_token(&self, i: usize) -> CfgResult<(usize, String, Span)> {
        match RE_TOKEN.find(&self.src[i..]) {
            Some(m) => {
                assert!(m.start() == 0 && m.end() > 0);
                match self.src[i..].chars().next().unwrap() {
                    '"' | '\'' => {
                        debug_assert!('"'.len_utf8() == 1 && '\''.len_utf8() == 1);
                        let start_cidx = i + 1;
                        let end_cidx = i + m.end() - 1;
                        Ok((
                            i + m.end(),
                            self.src[start_cidx..end_cidx].to_string(),
                            Span::new(start_cidx, end_cidx),
                        ))
                    }
                    _ => Ok((
                        i + m.end(),
                        self.src[i..i + m.end()].to_string(),
                        Span::new(i, i + m.end()),
                    )),
                }
            }
            None => Err(self.mk_error(CfgGrammarErrorKind::IllegalString, i)),
        }
    }

    /// Skip whitespace and comments from `i` onwards. If `inc_newlines` is `false`, will
    /// return `Err` if a newline is encountered; otherwise newlines are consumed and
    /// skipped.
    fn parse_ws(&mut self, mut i: usize, inc_newlines: bool) -> CfgResult<usize> {
        while i < self.src.len() {
            let c = self.src[i..].chars().next().unwrap();
            match c {
                ' ' | '\t' => i += c.len_utf8(),
                '\n' | '\r' => {
                    if !inc_newlines {
                        return Err(self.mk_error(CfgGrammarErrorKind::ReachedEOL, i));
                    }
                    i += c.len_utf8();
                }
                '/' => {
                    if i + c.len_utf8() == self.src.len() {
                        break;
                    } else {
                        let j = i + c.len_utf8();
                        let c = self.src[j..].chars().next().unwrap();
                        match c {
                            '/' => {
                                i = j + c.len_utf8();
                                for c in self.src[i..].chars() {
                                    i += c.len_utf8();
                                    if c == '\n' || c == '\r' {
                                        break;
                                    }
                                }
                            }
                            '*' => {
                                // This is complicated by the fact that we need to deal
                                // with unclosed comments (i.e. '/*' without a
                                // corresponding '*/').
                                let mut k = j + c.len_utf8();
                                let mut found = false;
                                while k < self.src.len() {
                                    let c = self.src[k..].chars().next().unwrap();
                                    k += c.len_utf8();
                                    match c {
                                        '\n' | '\r' => {
                                            if !inc_newlines {
                                                return Err(self.mk_error(
                                                    CfgGrammarErrorKind::ReachedEOL,
                                                    i,
                                                ));
                                            }
                                        }
                                        '*' => (),
                                        _ => continue,
                                    }
                                    if k < self.src.len() {
                                        let c = self.src[k..].chars().next().unwrap();
                                        if c == '/' {
                                            i = k + c.len_utf8();
                                            found = true;
                                            break;
                                        }
                                    }
                                }
                                if !found {
                                    return Err(self.mk_error(
                                        CfgGrammarErrorKind::IncompleteComment,
                                        i,
                                    ));
                                }
                            }
                            _ => break,
                        }
                    }
                }
                _ => break,
            }
        }
        Ok(i)
    }

    fn lookahead_is(&self, s: &'static str, i: usize) -> Option<usize> {
        if self.src[i..].starts_with(s) {
            Some(i + s.len())
        } else {
            None
        }
    }

    fn mk_error(&self, k: CfgGrammarErrorKind, off: usize) -> CfgGrammarError {
        let span = Span::new(off, off);
        CfgGrammarError { kind: k, span }
    }
}
