use std::fmt;

use indexmap::{IndexMap, IndexSet};

use super::parser::{CfgGrammarError, CfgGrammarErrorKind};
use crate::Span;

/// An AST representing a textual grammar. This is built up gradually as the parser works
/// through its input: when it is finished, `complete_and_validate` must be called exactly
/// once before the AST is lowered into a `CfgGrammar`.
pub struct GrammarAST {
    /// The start rule's name, plus the span of either its `%start` declaration or (if it
    /// was defaulted) its definition.
    pub start: Option<(String, Span)>,
    /// Maps rule names to rules, retaining the order in which rules are first defined in
    /// the input.
    pub rules: IndexMap<String, Rule>,
    pub prods: Vec<Production>,
    /// All token names, both `%token`-declared and implicitly declared by quoting, in
    /// order of first appearance.
    pub tokens: IndexSet<String>,
    /// One span per token, parallel to `tokens`.
    pub spans: Vec<Span>,
}

#[derive(Debug)]
pub struct Rule {
    pub name: (String, Span),
    /// Indexes into `GrammarAST::prods`.
    pub pidxs: Vec<usize>,
}

#[derive(Debug, Eq, PartialEq)]
pub struct Production {
    /// The symbols of this production, in order; empty means ε.
    pub symbols: Vec<Symbol>,
}

#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub enum Symbol {
    Rule(String, Span),
    Token(String, Span),
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Symbol::Rule(s, _) => write!(f, "{}", s),
            Symbol::Token(s, _) => write!(f, "{}", s),
        }
    }
}

impl GrammarAST {
    pub(crate) fn new() -> Self {
        GrammarAST {
            start: None,
            rules: IndexMap::new(),
            prods: Vec::new(),
            tokens: IndexSet::new(),
            spans: Vec::new(),
        }
    }

    /// Record that a rule named `name` exists, without any productions yet. Definitions of
    /// a rule name that has already been seen merge into the existing rule (the grammar's
    /// rule collection is a set of alternatives, so repeated definitions are additional
    /// alternatives, not conflicts).
    pub(crate) fn add_rule(&mut self, (name, name_span): (String, Span)) {
        self.rules.entry(name.clone()).or_insert_with(|| Rule {
            name: (name, name_span),
            pidxs: Vec::new(),
        });
    }

    pub(crate) fn add_prod(&mut self, rule_name: String, symbols: Vec<Symbol>) {
        self.rules
            .get_mut(&rule_name)
            .expect("add_prod called before add_rule")
            .pidxs
            .push(self.prods.len());
        self.prods.push(Production { symbols });
    }

    pub fn get_rule(&self, key: &str) -> Option<&Rule> {
        self.rules.get(key)
    }

    pub fn has_token(&self, s: &str) -> bool {
        self.tokens.contains(s)
    }

    /// After the AST has been populated, validate the grammar, checking that:
    ///   1) There is a start rule and it references a rule in the grammar.
    ///   2) Every rule reference references a rule in the grammar.
    ///   3) Every token reference references a declared token.
    pub(crate) fn complete_and_validate(&mut self) -> Result<(), CfgGrammarError> {
        match self.start {
            None => {
                return Err(CfgGrammarError {
                    kind: CfgGrammarErrorKind::NoStartRule,
                    span: Span::new(0, 0),
                });
            }
            Some((ref s, span)) => {
                if !self.rules.contains_key(s) {
                    return Err(CfgGrammarError {
                        kind: CfgGrammarErrorKind::InvalidStartRule(s.clone()),
                        span,
                    });
                }
            }
        }
        for rule in self.rules.values() {
            for &pidx in &rule.pidxs {
                let prod = &self.prods[pidx];
                for sym in &prod.symbols {
                    match *sym {
                        Symbol::Rule(ref name, span) => {
                            if !self.rules.contains_key(name) {
                                return Err(CfgGrammarError {
                                    kind: CfgGrammarErrorKind::UnknownRuleRef(name.clone()),
                                    span,
                                });
                            }
                        }
                        Symbol::Token(ref name, span) => {
                            if !self.tokens.contains(name) {
                                return Err(CfgGrammarError {
                                    kind: CfgGrammarErrorKind::UnknownToken(name.clone()),
                                    span,
                                });
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::{GrammarAST, Symbol};
    use crate::{
        Span,
        cfg::parser::{CfgGrammarError, CfgGrammarErrorKind},
    };

    fn rule(n: &str) -> Symbol {
        Symbol::Rule(n.to_string(), Span::new(0, 0))
    }

    fn token(n: &str) -> Symbol {
        Symbol::Token(n.to_string(), Span::new(0, 0))
    }

    fn add_rule_and_prod(ast: &mut GrammarAST, name: &str, symbols: Vec<Symbol>) {
        ast.add_rule((name.to_string(), Span::new(0, 0)));
        ast.add_prod(name.to_string(), symbols);
    }

    #[test]
    fn test_empty_grammar() {
        let mut ast = GrammarAST::new();
        match ast.complete_and_validate() {
            Err(CfgGrammarError {
                kind: CfgGrammarErrorKind::NoStartRule,
                ..
            }) => (),
            _ => panic!("Validation error"),
        }
    }

    #[test]
    fn test_invalid_start_rule() {
        let mut ast = GrammarAST::new();
        ast.start = Some(("A".to_string(), Span::new(0, 0)));
        add_rule_and_prod(&mut ast, "B", vec![]);
        match ast.complete_and_validate() {
            Err(CfgGrammarError {
                kind: CfgGrammarErrorKind::InvalidStartRule(_),
                ..
            }) => (),
            _ => panic!("Validation error"),
        }
    }

    #[test]
    fn test_valid_start_rule() {
        let mut ast = GrammarAST::new();
        ast.start = Some(("A".to_string(), Span::new(0, 0)));
        add_rule_and_prod(&mut ast, "A", vec![]);
        assert!(ast.complete_and_validate().is_ok());
    }

    #[test]
    fn test_valid_rule_ref() {
        let mut ast = GrammarAST::new();
        ast.start = Some(("A".to_string(), Span::new(0, 0)));
        add_rule_and_prod(&mut ast, "A", vec![rule("B")]);
        add_rule_and_prod(&mut ast, "B", vec![]);
        assert!(ast.complete_and_validate().is_ok());
    }

    #[test]
    fn test_invalid_rule_ref() {
        let mut ast = GrammarAST::new();
        ast.start = Some(("A".to_string(), Span::new(0, 0)));
        add_rule_and_prod(&mut ast, "A", vec![rule("B")]);
        match ast.complete_and_validate() {
            Err(CfgGrammarError {
                kind: CfgGrammarErrorKind::UnknownRuleRef(_),
                ..
            }) => (),
            _ => panic!("Validation error"),
        }
    }

    #[test]
    fn test_valid_token_ref() {
        let mut ast = GrammarAST::new();
        ast.tokens.insert("b".to_string());
        ast.spans.push(Span::new(0, 0));
        ast.start = Some(("A".to_string(), Span::new(0, 0)));
        add_rule_and_prod(&mut ast, "A", vec![token("b")]);
        assert!(ast.complete_and_validate().is_ok());
    }

    #[test]
    fn test_invalid_token_ref() {
        let mut ast = GrammarAST::new();
        ast.start = Some(("A".to_string(), Span::new(0, 0)));
        add_rule_and_prod(&mut ast, "A", vec![token("b")]);
        match ast.complete_and_validate() {
            Err(CfgGrammarError {
                kind: CfgGrammarErrorKind::UnknownToken(_),
                ..
            }) => (),
            _ => panic!("Validation error"),
        }
    }

    #[test]
    fn test_rules_are_not_tokens() {
        // A name declared as a token cannot also be referenced as a rule.
        let mut ast = GrammarAST::new();
        ast.tokens.insert("b".to_string());
        ast.spans.push(Span::new(0, 0));
        ast.start = Some(("A".to_string(), Span::new(0, 0)));
        add_rule_and_prod(&mut ast, "A", vec![rule("b")]);
        assert!(ast.complete_and_validate().is_err());
    }

    #[test]
    fn test_merged_rule_definitions() {
        let mut ast = GrammarAST::new();
        ast.start = Some(("A".to_string(), Span::new(0, 0)));
        add_rule_and_prod(&mut ast, "A", vec![]);
        add_rule_and_prod(&mut ast, "A", vec![rule("A")]);
        assert!(ast.complete_and_validate().is_ok());
        assert_eq!(ast.get_rule("A").unwrap().pidxs, vec![0, 1]);
    }
}
