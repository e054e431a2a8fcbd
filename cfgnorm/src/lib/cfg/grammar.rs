use std::collections::HashMap;

use num_traits::{self, AsPrimitive, PrimInt, Unsigned};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::{
    ast,
    nullable::Nullables,
    parser::{CfgGrammarError, CfgParser},
    unit::UnitPairs,
};
use crate::{PIdx, RIdx, SIdx, Span, Symbol, TIdx};

/// Representation of a `CfgGrammar`. See the [top-level documentation](../../index.html)
/// for the guarantees this struct makes about rules, tokens, productions, and symbols.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CfgGrammar<StorageT = u32> {
    /// How many rules does this grammar have?
    rules_len: RIdx<StorageT>,
    /// A mapping from `RIdx` -> `(String, Span)`.
    rule_names: Vec<(String, Span)>,
    /// How many tokens does this grammar have?
    tokens_len: TIdx<StorageT>,
    /// A mapping from `TIdx` -> `(String, Span)`.
    token_names: Vec<(String, Span)>,
    /// How many productions does this grammar have?
    prods_len: PIdx<StorageT>,
    /// A list of all productions.
    prods: Vec<Vec<Symbol<StorageT>>>,
    /// A mapping from rules to their productions. The order of rules is identical to that
    /// of `rule_names`. A freshly parsed grammar gives every rule at least one production,
    /// but a normalised grammar can contain rules with no productions at all (such a
    /// rule's language is empty).
    rules_prods: Vec<Vec<PIdx<StorageT>>>,
    /// A mapping from productions to their corresponding rule indexes.
    prods_rules: Vec<RIdx<StorageT>>,
    /// The start rule.
    start_rule: RIdx<StorageT>,
}

impl CfgGrammar<u32> {
    pub fn new(s: &str) -> Result<Self, CfgGrammarError> {
        CfgGrammar::new_with_storaget(s)
    }
}

impl<StorageT: 'static + PrimInt + Unsigned> CfgGrammar<StorageT>
where
    usize: AsPrimitive<StorageT>,
{
    /// Takes as input a grammar in the textual format described in
    /// [`parser`](../parser/index.html) as a `&str` `s` and returns a
    /// [`CfgGrammar`](struct.CfgGrammar.html) (or a
    /// [`CfgGrammarError`](../parser/struct.CfgGrammarError.html) on error).
    pub fn new_with_storaget(s: &str) -> Result<Self, CfgGrammarError> {
        let mut cp = CfgParser::new(s.to_string());
        cp.parse()?;
        let mut ast = cp.ast();
        ast.complete_and_validate()?;

        // Check that StorageT is big enough to hold RIdx/PIdx/SIdx/TIdx values; after
        // these checks we can guarantee that things like RIdx(ast.rules.len().as_()) are
        // safe.
        if ast.rules.len() > num_traits::cast(StorageT::max_value()).unwrap() {
            panic!("StorageT is not big enough to store this grammar's rules.");
        }
        if ast.tokens.len() > num_traits::cast(StorageT::max_value()).unwrap() {
            panic!("StorageT is not big enough to store this grammar's tokens.");
        }
        if ast.prods.len() > num_traits::cast(StorageT::max_value()).unwrap() {
            panic!("StorageT is not big enough to store this grammar's productions.");
        }
        for p in &ast.prods {
            if p.symbols.len() > num_traits::cast(StorageT::max_value()).unwrap() {
                panic!(
                    "StorageT is not big enough to store the symbols of at least one of this grammar's productions."
                );
            }
        }

        let mut rule_names: Vec<(String, Span)> = Vec::with_capacity(ast.rules.len());
        let mut rule_map = HashMap::<String, RIdx<StorageT>>::new();
        for (i, (name, rule)) in ast.rules.iter().enumerate() {
            rule_names.push((name.clone(), rule.name.1));
            rule_map.insert(name.clone(), RIdx(i.as_()));
        }

        let mut token_names: Vec<(String, Span)> = Vec::with_capacity(ast.tokens.len());
        let mut token_map = HashMap::<String, TIdx<StorageT>>::new();
        for (i, name) in ast.tokens.iter().enumerate() {
            token_names.push((name.clone(), ast.spans[i]));
            token_map.insert(name.clone(), TIdx(i.as_()));
        }

        // Productions are renumbered here: rules merged from scattered definitions have
        // their productions brought together, in rule order, so that a rule's productions
        // and the global production list agree on ordering.
        let mut prods: Vec<Vec<Symbol<StorageT>>> = Vec::with_capacity(ast.prods.len());
        let mut prods_rules: Vec<RIdx<StorageT>> = Vec::with_capacity(ast.prods.len());
        let mut rules_prods: Vec<Vec<PIdx<StorageT>>> = vec![Vec::new(); rule_names.len()];
        for (name, rule) in &ast.rules {
            let ridx = rule_map[name];
            for &ast_pidx in &rule.pidxs {
                let astprod = &ast.prods[ast_pidx];
                let mut prod = Vec::with_capacity(astprod.symbols.len());
                for astsym in &astprod.symbols {
                    match *astsym {
                        ast::Symbol::Rule(ref n, _) => {
                            prod.push(Symbol::Rule(rule_map[n]));
                        }
                        ast::Symbol::Token(ref n, _) => {
                            prod.push(Symbol::Token(token_map[n]));
                        }
                    }
                }
                rules_prods[usize::from(ridx)].push(PIdx(prods.len().as_()));
                prods_rules.push(ridx);
                prods.push(prod);
            }
        }

        // Validation guarantees the start rule is defined.
        let start_rule = rule_map[&ast.start.as_ref().unwrap().0];

        assert!(!rule_names.is_empty());
        Ok(CfgGrammar {
            rules_len: RIdx(rule_names.len().as_()),
            rule_names,
            tokens_len: TIdx(token_names.len().as_()),
            token_names,
            prods_len: PIdx(prods.len().as_()),
            prods,
            rules_prods,
            prods_rules,
            start_rule,
        })
    }

    /// Build a new grammar over the same rule and token universe, and with the same start
    /// rule, as this one, replacing the productions wholesale: `new_rules_prods[r]` is the
    /// list of productions of rule `r` in the new grammar (and may be empty). This is the
    /// only way a grammar begets a grammar; the normalisation passes all end here.
    ///
    /// # Panics
    ///
    /// If `StorageT` is not big enough to store the new productions.
    pub(crate) fn with_prods(
        &self,
        new_rules_prods: Vec<Vec<Vec<Symbol<StorageT>>>>,
    ) -> Self {
        debug_assert_eq!(new_rules_prods.len(), usize::from(self.rules_len));
        let n_prods = new_rules_prods.iter().map(Vec::len).sum::<usize>();
        if n_prods > num_traits::cast(StorageT::max_value()).unwrap() {
            panic!("StorageT is not big enough to store this grammar's productions.");
        }
        for ps in &new_rules_prods {
            for p in ps {
                if p.len() > num_traits::cast(StorageT::max_value()).unwrap() {
                    panic!(
                        "StorageT is not big enough to store the symbols of at least one of this grammar's productions."
                    );
                }
            }
        }

        let mut prods: Vec<Vec<Symbol<StorageT>>> = Vec::with_capacity(n_prods);
        let mut prods_rules: Vec<RIdx<StorageT>> = Vec::with_capacity(n_prods);
        let mut rules_prods: Vec<Vec<PIdx<StorageT>>> =
            Vec::with_capacity(usize::from(self.rules_len));
        for (i, ps) in new_rules_prods.into_iter().enumerate() {
            // The call to as_() is safe: i ranges over the existing rules, whose count we
            // already know fits in StorageT.
            let ridx = RIdx(i.as_());
            let mut pidxs = Vec::with_capacity(ps.len());
            for p in ps {
                pidxs.push(PIdx(prods.len().as_()));
                prods_rules.push(ridx);
                prods.push(p);
            }
            rules_prods.push(pidxs);
        }

        CfgGrammar {
            rules_len: self.rules_len,
            rule_names: self.rule_names.clone(),
            tokens_len: self.tokens_len,
            token_names: self.token_names.clone(),
            prods_len: PIdx(prods.len().as_()),
            prods,
            rules_prods,
            prods_rules,
            start_rule: self.start_rule,
        }
    }

    /// How many productions does this grammar have?
    pub fn prods_len(&self) -> PIdx<StorageT> {
        self.prods_len
    }

    /// Return an iterator which produces (in order from `0..self.prods_len()`) all this
    /// grammar's valid `PIdx`s.
    pub fn iter_pidxs(&self) -> impl Iterator<Item = PIdx<StorageT>> {
        // We can use as_ safely, because we know that we're only generating integers from
        // 0..self.prods_len() and, since prods_len() returns a PIdx<StorageT>, then by
        // definition the integers we're creating fit within StorageT.
        Box::new((0..usize::from(self.prods_len)).map(|x| PIdx(x.as_())))
    }

    /// Get the sequence of symbols for production `pidx`. Panics if `pidx` doesn't exist.
    pub fn prod(&self, pidx: PIdx<StorageT>) -> &[Symbol<StorageT>] {
        &self.prods[usize::from(pidx)]
    }

    /// How many symbols does production `pidx` have? Panics if `pidx` doesn't exist.
    pub fn prod_len(&self, pidx: PIdx<StorageT>) -> SIdx<StorageT> {
        // Since we've already checked that StorageT can store all the symbols for every
        // production in the grammar, the call to as_ is safe.
        SIdx(self.prods[usize::from(pidx)].len().as_())
    }

    /// Return the rule index of the production `pidx`. Panics if `pidx` doesn't exist.
    pub fn prod_to_rule(&self, pidx: PIdx<StorageT>) -> RIdx<StorageT> {
        self.prods_rules[usize::from(pidx)]
    }

    /// If production `pidx` is a chain production (one whose entire right-hand side is a
    /// single rule reference, e.g. `R: S;`), return `Some` of the referenced rule, or
    /// `None` otherwise. ε productions, productions of a single token, and productions of
    /// two or more symbols are all non-chain.
    pub fn chain_target(&self, pidx: PIdx<StorageT>) -> Option<RIdx<StorageT>> {
        match self.prods[usize::from(pidx)][..] {
            [Symbol::Rule(s_ridx)] => Some(s_ridx),
            _ => None,
        }
    }

    /// How many rules does this grammar have?
    pub fn rules_len(&self) -> RIdx<StorageT> {
        self.rules_len
    }

    /// Return an iterator which produces (in order from `0..self.rules_len()`) all this
    /// grammar's valid `RIdx`s.
    pub fn iter_rules(&self) -> impl Iterator<Item = RIdx<StorageT>> {
        // We can use as_ safely, because we know that we're only generating integers from
        // 0..self.rules_len() and, since rules_len() returns an RIdx<StorageT>, then by
        // definition the integers we're creating fit within StorageT.
        Box::new((0..usize::from(self.rules_len)).map(|x| RIdx(x.as_())))
    }

    /// Return the productions for rule `ridx`. Panics if `ridx` doesn't exist.
    pub fn rule_to_prods(&self, ridx: RIdx<StorageT>) -> &[PIdx<StorageT>] {
        &self.rules_prods[usize::from(ridx)]
    }

    /// Is rule `ridx` a generator, i.e. the left-hand side of at least one production?
    /// This is purely syntactic: a generator's language can still be empty. Panics if
    /// `ridx` doesn't exist.
    pub fn is_generator(&self, ridx: RIdx<StorageT>) -> bool {
        !self.rules_prods[usize::from(ridx)].is_empty()
    }

    /// Return the name of rule `ridx`. Panics if `ridx` doesn't exist.
    pub fn rule_name_str(&self, ridx: RIdx<StorageT>) -> &str {
        self.rule_names[usize::from(ridx)].0.as_str()
    }

    /// Return the span of rule `ridx`'s name. Panics if `ridx` doesn't exist.
    pub fn rule_name_span(&self, ridx: RIdx<StorageT>) -> Span {
        self.rule_names[usize::from(ridx)].1
    }

    /// Return the index of the rule named `n` or `None` if it doesn't exist.
    pub fn rule_idx(&self, n: &str) -> Option<RIdx<StorageT>> {
        self.rule_names
            .iter()
            .position(|(x, _)| x == n)
            // The call to as_() is safe because rule_names is guaranteed to be small
            // enough to fit into StorageT
            .map(|x| RIdx(x.as_()))
    }

    /// What is the index of the start rule?
    pub fn start_rule_idx(&self) -> RIdx<StorageT> {
        self.start_rule
    }

    /// How many tokens does this grammar have?
    pub fn tokens_len(&self) -> TIdx<StorageT> {
        self.tokens_len
    }

    /// Return an iterator which produces (in order from `0..self.tokens_len()`) all this
    /// grammar's valid `TIdx`s.
    pub fn iter_tidxs(&self) -> impl Iterator<Item = TIdx<StorageT>> {
        // We can use as_ safely, because we know that we're only generating integers from
        // 0..self.tokens_len() and, since tokens_len() returns a TIdx<StorageT>, then by
        // definition the integers we're creating fit within StorageT.
        Box::new((0..usize::from(self.tokens_len)).map(|x| TIdx(x.as_())))
    }

    /// Return the name of token `tidx`. Panics if `tidx` doesn't exist.
    pub fn token_name(&self, tidx: TIdx<StorageT>) -> &str {
        self.token_names[usize::from(tidx)].0.as_str()
    }

    /// Return the span of token `tidx`'s first appearance. Panics if `tidx` doesn't
    /// exist.
    pub fn token_span(&self, tidx: TIdx<StorageT>) -> Span {
        self.token_names[usize::from(tidx)].1
    }

    /// Return the index of the token named `n` or `None` if it doesn't exist.
    pub fn token_idx(&self, n: &str) -> Option<TIdx<StorageT>> {
        self.token_names
            .iter()
            .position(|(x, _)| x == n)
            // The call to as_() is safe because token_names is guaranteed to be small
            // enough to fit into StorageT
            .map(|x| TIdx(x.as_()))
    }

    /// Returns the string representation of a given production `pidx`.
    pub fn pp_prod(&self, pidx: PIdx<StorageT>) -> String {
        let mut sprod = String::new();
        let ridx = self.prod_to_rule(pidx);
        sprod.push_str(self.rule_name_str(ridx));
        sprod.push(':');
        for sym in self.prod(pidx) {
            let s = match sym {
                Symbol::Token(tidx) => self.token_name(*tidx),
                Symbol::Rule(ridx) => self.rule_name_str(*ridx),
            };
            sprod.push_str(&format!(" \"{}\"", s));
        }
        sprod
    }

    /// Return a `Nullables` struct for this grammar.
    pub fn nullables(&self) -> Nullables<StorageT> {
        Nullables::new(self)
    }

    /// Return a `UnitPairs` struct for this grammar.
    pub fn unit_pairs(&self) -> UnitPairs<StorageT> {
        UnitPairs::new(self)
    }
}

#[cfg(test)]
mod test {
    use super::CfgGrammar;
    use crate::{PIdx, RIdx, Symbol};

    #[test]
    fn test_minimal() {
        let grm = CfgGrammar::new("%start R %token T %% R: 'T';").unwrap();

        let r_ridx = grm.rule_idx("R").unwrap();
        let t_tidx = grm.token_idx("T").unwrap();
        assert_eq!(grm.start_rule_idx(), r_ridx);
        assert_eq!(grm.rule_to_prods(r_ridx), [PIdx(0)]);
        assert_eq!(*grm.prod(PIdx(0)), [Symbol::Token(t_tidx)]);
        assert_eq!(grm.prod_to_rule(PIdx(0)), r_ridx);
        assert_eq!(grm.iter_rules().collect::<Vec<_>>(), vec![RIdx(0)]);
    }

    #[test]
    fn test_rule_ref() {
        let grm = CfgGrammar::new("%start R %token T %% R: S; S: 'T';").unwrap();

        let r_ridx = grm.rule_idx("R").unwrap();
        let s_ridx = grm.rule_idx("S").unwrap();
        let r_prod = grm.prod(grm.rule_to_prods(r_ridx)[0]);
        assert_eq!(r_prod.len(), 1);
        assert_eq!(r_prod[0], Symbol::Rule(s_ridx));
        let s_prod = grm.prod(grm.rule_to_prods(s_ridx)[0]);
        assert_eq!(s_prod.len(), 1);
        assert_eq!(s_prod[0], Symbol::Token(grm.token_idx("T").unwrap()));
        assert_eq!(usize::from(grm.prods_len()), 2);
    }

    #[test]
    fn test_merged_rule_definitions() {
        let grm = CfgGrammar::new(
            "
            %%
            A: 'a';
            B: 'b';
            A: 'c';
          ",
        )
        .unwrap();

        // A's scattered definitions come together under one rule index.
        let a_ridx = grm.rule_idx("A").unwrap();
        assert_eq!(grm.rule_to_prods(a_ridx).len(), 2);
        assert_eq!(
            grm.prod(grm.rule_to_prods(a_ridx)[0]),
            [Symbol::Token(grm.token_idx("a").unwrap())]
        );
        assert_eq!(
            grm.prod(grm.rule_to_prods(a_ridx)[1]),
            [Symbol::Token(grm.token_idx("c").unwrap())]
        );
    }

    #[test]
    fn test_empty_production() {
        let grm = CfgGrammar::new("%%A: 'a' | ;").unwrap();
        let a_ridx = grm.rule_idx("A").unwrap();
        assert_eq!(grm.rule_to_prods(a_ridx).len(), 2);
        assert!(grm.prod(grm.rule_to_prods(a_ridx)[1]).is_empty());
        assert_eq!(usize::from(grm.prod_len(grm.rule_to_prods(a_ridx)[1])), 0);
    }

    #[test]
    fn test_chain_target() {
        let grm = CfgGrammar::new("%%A: B | 'a' | B B | ; B: 'b';").unwrap();
        let a_prods = grm.rule_to_prods(grm.rule_idx("A").unwrap());
        assert_eq!(grm.chain_target(a_prods[0]), grm.rule_idx("B"));
        assert_eq!(grm.chain_target(a_prods[1]), None);
        assert_eq!(grm.chain_target(a_prods[2]), None);
        assert_eq!(grm.chain_target(a_prods[3]), None);
    }

    #[test]
    fn test_is_generator() {
        let grm = CfgGrammar::new("%%A: B; B: 'b' | ;").unwrap();
        // Every parsed rule is a generator; only normalisation can change that.
        assert!(grm.is_generator(grm.rule_idx("A").unwrap()));
        assert!(grm.is_generator(grm.rule_idx("B").unwrap()));
    }

    #[test]
    fn test_with_prods_preserves_universe() {
        let grm = CfgGrammar::new("%start S %% S: A; A: 'a';").unwrap();
        let s_ridx = grm.rule_idx("S").unwrap();
        let a_ridx = grm.rule_idx("A").unwrap();
        let grm2 = grm.with_prods(vec![
            vec![],
            vec![vec![Symbol::Token(grm.token_idx("a").unwrap())]],
        ]);
        assert_eq!(grm2.start_rule_idx(), s_ridx);
        assert_eq!(grm2.rule_idx("S"), Some(s_ridx));
        assert_eq!(grm2.rule_idx("A"), Some(a_ridx));
        assert!(!grm2.is_generator(s_ridx));
        assert!(grm2.is_generator(a_ridx));
        assert_eq!(usize::from(grm2.prods_len()), 1);
    }

    #[test]
    fn test_pp_prod() {
        let grm = CfgGrammar::new("%%A: B 'a'; B: 'b';").unwrap();
        assert_eq!(grm.pp_prod(PIdx(0)), "A: \"B\" \"a\"");
    }

    #[test]
    #[should_panic]
    fn test_storaget_too_small() {
        let mut src = "%token ".to_string();
        for i in 0..300 {
            src.push_str(&format!("t{} ", i));
        }
        src.push_str("%% A: 'a';");
        CfgGrammar::<u8>::new_with_storaget(&src).ok();
    }
}
