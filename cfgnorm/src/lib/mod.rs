#![allow(clippy::new_without_default)]
#![allow(clippy::upper_case_acronyms)]

//! A library for normalising Context Free Grammars (CFGs): given an arbitrary CFG, it
//! produces equivalent grammars free of the two classes of degenerate production that stand
//! in the way of Chomsky Normal Form: ε productions (whose right-hand side is empty) and
//! unit productions (whose right-hand side is a single nonterminal).
//!
//! CFG terminology is something of a mess, with "token", "terminal", and "nonterminal"
//! meaning subtly different things in different tools and papers. In order to make this
//! library coherent we use the following terminology throughout:
//!
//!   * A *grammar* is an ordered sequence of *productions*.
//!   * A *production* is an ordered sequence of *symbols* (possibly empty, written ε).
//!   * A *rule* maps a name (a nonterminal) to zero or more productions.
//!   * A *token* is the name of a terminal symbol.
//!
//! For example, in the following grammar:
//!
//!   R1: "a" "b" | R2;
//!   R2: "c";
//!
//! the following statements are true:
//!
//!   * There are 3 productions. 1: ["a", "b"] 2: ["R2"] 3: ["c"]
//!   * There are two rules: R1 and R2. The mapping to productions is {R1: {1, 2}, R2: {3}}
//!   * There are three tokens: a, b, and c.
//!   * Production 2 is a unit production; a production "R1: ;" would be an ε production.
//!
//! cfgnorm makes the following guarantees about grammars:
//!
//!   * Productions are numbered from `0` to `prods_len() - 1` (inclusive).
//!   * Rules are numbered from `0` to `rules_len() - 1` (inclusive).
//!   * Tokens are numbered from `0` to `tokens_len() - 1` (inclusive).
//!   * The `StorageT` type used to store production, rule, and token indices can be
//!     infallibly converted into `usize` (see [`RIdx`](struct.RIdx.html) and friends).
//!   * A grammar is never mutated: every normalisation pass builds a new grammar over the
//!     same rule and token universe and the same start rule, replacing only the
//!     productions. A rule can therefore end up with zero productions (its language is
//!     then empty).
//!
//! The main functions to investigate are
//! [`CfgGrammar::new()`](cfg/grammar/struct.CfgGrammar.html#method.new), which takes a
//! grammar in a small Yacc-ish textual format, and the two normalisation entry points
//! [`CfgGrammar::eliminate_nullable_rules()`](cfg/grammar/struct.CfgGrammar.html#method.eliminate_nullable_rules)
//! and
//! [`CfgGrammar::eliminate_unit_rules()`](cfg/grammar/struct.CfgGrammar.html#method.eliminate_unit_rules).

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub mod cfg;
mod idxnewtype;
pub mod span;

pub use span::Span;

pub use crate::idxnewtype::{PIdx, RIdx, SIdx, TIdx};

/// A symbol within a production: either a reference to another rule (a nonterminal) or a
/// token (a terminal).
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Symbol<StorageT> {
    Rule(RIdx<StorageT>),
    Token(TIdx<StorageT>),
}
