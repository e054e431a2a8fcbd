#![deny(unreachable_pub)]

//! The CFG representation and the normalisation passes over it.
//!
//! A grammar starts life as textual input, is parsed into a [`GrammarAST`](ast/struct.GrammarAST.html),
//! validated, and lowered into an immutable index-based [`CfgGrammar`](grammar/struct.CfgGrammar.html).
//! The two normalisation pipelines then each run a fixpoint set computation
//! ([`Nullables`](nullable/struct.Nullables.html), [`UnitPairs`](unit/struct.UnitPairs.html))
//! followed by a production rewrite which builds a fresh grammar.

pub mod ast;
pub mod grammar;
pub mod nullable;
pub mod parser;
mod rewrite;
pub mod unit;

pub use self::{
    grammar::CfgGrammar,
    nullable::Nullables,
    parser::{CfgGrammarError, CfgGrammarErrorKind},
    unit::UnitPairs,
};
