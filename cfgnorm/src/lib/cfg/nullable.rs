use std::marker::PhantomData;

use num_traits::{AsPrimitive, PrimInt, Unsigned};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use vob::Vob;

use super::grammar::CfgGrammar;
use crate::{RIdx, Symbol};

/// `Nullables` stores the nullable set for a given grammar: the set of rules which can
/// derive ε, the empty string. For example, given this code and grammar:
/// ```text
///   let grm = CfgGrammar::new("
///     S: A 'b';
///     A: C C | 'a';
///     C: ;").unwrap();
///   let nullables = grm.nullables();
/// ```
/// then the following assertions (and only the following assertions) about the nullable
/// set are correct:
/// ```text
///   assert!(nullables.is_nullable(grm.rule_idx("A").unwrap()));
///   assert!(nullables.is_nullable(grm.rule_idx("C").unwrap()));
/// ```
/// (`S` is not nullable: every production of `S` contains the token `b`.)
#[derive(Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Nullables<StorageT> {
    nullable: Vob,
    phantom: PhantomData<StorageT>,
}

impl<StorageT: 'static + PrimInt + Unsigned> Nullables<StorageT>
where
    usize: AsPrimitive<StorageT>,
{
    /// Generates and returns the nullable set for the given grammar.
    pub fn new(grm: &CfgGrammar<StorageT>) -> Self {
        let mut nullable = Vob::from_elem(false, usize::from(grm.rules_len()));

        // Loop looking for changes to the nullable set, until we reach a fixed point. A
        // single round marks a production's rule nullable if every symbol of the
        // production is a rule already marked nullable (so in particular an ε production
        // marks its rule in the first round); a token anywhere in the production, or a
        // rule not yet marked, blocks that production for the round. The set only ever
        // grows and is bounded by the number of rules, so the loop terminates after at
        // most rules_len() rounds.
        let mut marked = 0;
        loop {
            let mut changed = false;
            for pidx in grm.iter_pidxs() {
                let ridx = grm.prod_to_rule(pidx);
                if nullable[usize::from(ridx)] {
                    continue;
                }
                let blocked = grm.prod(pidx).iter().any(|sym| match *sym {
                    Symbol::Rule(s_ridx) => !nullable[usize::from(s_ridx)],
                    Symbol::Token(_) => true,
                });
                if !blocked {
                    nullable.set(usize::from(ridx), true);
                    changed = true;
                }
            }
            if !changed {
                return Nullables {
                    nullable,
                    phantom: PhantomData,
                };
            }
            // Each round we continue must strictly grow the set or the bound above is
            // meaningless.
            let now = nullable.iter_set_bits(..).count();
            debug_assert!(now > marked);
            marked = now;
        }
    }

    /// Returns true if the rule `ridx` can derive the empty string.
    pub fn is_nullable(&self, ridx: RIdx<StorageT>) -> bool {
        self.nullable[usize::from(ridx)]
    }

    /// Return the nullable set as a `Vob`, one bit per rule.
    pub fn nullables(&self) -> &Vob {
        &self.nullable
    }
}
