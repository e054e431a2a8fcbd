use std::marker::PhantomData;

use num_traits::{AsPrimitive, PrimInt, Unsigned};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use vob::Vob;

use super::grammar::CfgGrammar;
use crate::RIdx;

/// `UnitPairs` stores the unit-pair relation for a given grammar: `(u, v)` is a unit pair
/// iff rule `u` can derive exactly `[v]` through zero or more chain productions (see
/// [`CfgGrammar::chain_target`](../grammar/struct.CfgGrammar.html#method.chain_target)).
/// The relation is reflexive on the grammar's generators and transitive by construction;
/// it is not generally symmetric. For example, given this code and grammar:
/// ```text
///   let grm = CfgGrammar::new("
///     A: B | 'a';
///     B: C;
///     C: 'c';").unwrap();
///   let pairs = grm.unit_pairs();
/// ```
/// the pairs are exactly (A,A), (B,B), (C,C), (A,B), (B,C), and (A,C).
#[derive(Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct UnitPairs<StorageT> {
    /// One row per rule; bit `v` of row `u` means `(u, v)` is in the relation. Rows of
    /// non-generator rules are empty, and no row has a bit set for a non-generator (a
    /// chain into a rule with no productions derives nothing).
    pairs: Vec<Vob>,
    phantom: PhantomData<StorageT>,
}

impl<StorageT: 'static + PrimInt + Unsigned> UnitPairs<StorageT>
where
    usize: AsPrimitive<StorageT>,
{
    /// Generates and returns the unit-pair relation for the given grammar.
    pub fn new(grm: &CfgGrammar<StorageT>) -> Self {
        let rules_len = usize::from(grm.rules_len());
        let mut pairs = vec![Vob::from_elem(false, rules_len); rules_len];
        for ridx in grm.iter_rules() {
            if grm.is_generator(ridx) {
                pairs[usize::from(ridx)].set(usize::from(ridx), true);
            }
        }

        // Collect the chain productions up front: each fixpoint round then only touches
        // chain productions, and absorbs everything a chain's target has accumulated so
        // far in one bitwise OR, rather than rescanning the grammar pair by pair. A
        // self-chain `A: A;` adds nothing beyond the diagonal and is skipped.
        let mut chains = Vec::new();
        for pidx in grm.iter_pidxs() {
            if let Some(v_ridx) = grm.chain_target(pidx) {
                let u_ridx = grm.prod_to_rule(pidx);
                if u_ridx != v_ridx {
                    chains.push((u_ridx, v_ridx));
                }
            }
        }

        // Loop until a round adds no pair. The relation only ever grows and is bounded by
        // rules_len squared, so the loop terminates after at most that many rounds (in
        // practice: the length of the longest acyclic chain).
        let mut added = 0;
        loop {
            let mut changed = false;
            for &(u_ridx, v_ridx) in &chains {
                // Everything v reaches through chains, u now reaches too. The clone is
                // needed to OR one row of `pairs` into another.
                let v_row = pairs[usize::from(v_ridx)].clone();
                if pairs[usize::from(u_ridx)].or(&v_row) {
                    changed = true;
                }
            }
            if !changed {
                return UnitPairs {
                    pairs,
                    phantom: PhantomData,
                };
            }
            // Each round we continue must strictly grow the relation or the bound above
            // is meaningless.
            let now = pairs
                .iter()
                .map(|r| r.iter_set_bits(..).count())
                .sum::<usize>();
            debug_assert!(now > added);
            added = now;
        }
    }

    /// Returns true if `(u_ridx, v_ridx)` is a unit pair.
    pub fn is_pair(&self, u_ridx: RIdx<StorageT>, v_ridx: RIdx<StorageT>) -> bool {
        self.pairs[usize::from(u_ridx)][usize::from(v_ridx)]
    }

    /// Return the row of the relation for rule `u_ridx` as a `Vob`, one bit per rule.
    pub fn pairs(&self, u_ridx: RIdx<StorageT>) -> &Vob {
        &self.pairs[usize::from(u_ridx)]
    }
}

#[cfg(test)]
mod test {
    use super::super::grammar::CfgGrammar;
    use super::UnitPairs;
    use num_traits::{AsPrimitive, PrimInt, Unsigned};

    fn has<StorageT: 'static + PrimInt + Unsigned>(
        grm: &CfgGrammar<StorageT>,
        pairs: &UnitPairs<StorageT>,
        un: &str,
        should_be: Vec<&str>,
    ) where
        usize: AsPrimitive<StorageT>,
    {
        let u_ridx = grm.rule_idx(un).unwrap();
        for v_ridx in grm.iter_rules() {
            let n = grm.rule_name_str(v_ridx);
            match should_be.iter().position(|&x| x == n) {
                Some(_) => {
                    if !pairs.is_pair(u_ridx, v_ridx) {
                        panic!("({}, {}) is not a unit pair", un, n);
                    }
                }
                None => {
                    if pairs.is_pair(u_ridx, v_ridx) {
                        panic!("({}, {}) is incorrectly a unit pair", un, n);
                    }
                }
            }
        }
    }

    #[test]
    fn test_reflexive_on_generators() {
        let grm = CfgGrammar::new(
            "
          %start A
          %%
          A: 'a' B;
          B: 'b';
          ",
        )
        .unwrap();
        let pairs = grm.unit_pairs();
        // No chain productions at all: the relation is exactly the diagonal.
        has(&grm, &pairs, "A", vec!["A"]);
        has(&grm, &pairs, "B", vec!["B"]);
    }

    #[test]
    fn test_transitive_chain() {
        let grm = CfgGrammar::new(
            "
          %start A
          %%
          A: B | 'a';
          B: C;
          C: 'c';
          ",
        )
        .unwrap();
        let pairs = grm.unit_pairs();
        has(&grm, &pairs, "A", vec!["A", "B", "C"]);
        has(&grm, &pairs, "B", vec!["B", "C"]);
        has(&grm, &pairs, "C", vec!["C"]);
    }

    #[test]
    fn test_not_symmetric() {
        let grm = CfgGrammar::new(
            "
          %start A
          %%
          A: B;
          B: 'b';
          ",
        )
        .unwrap();
        let pairs = grm.unit_pairs();
        assert!(pairs.is_pair(grm.rule_idx("A").unwrap(), grm.rule_idx("B").unwrap()));
        assert!(!pairs.is_pair(grm.rule_idx("B").unwrap(), grm.rule_idx("A").unwrap()));
    }

    #[test]
    fn test_chain_cycle() {
        // A cycle of chain productions makes every participant reach every other; the
        // fixpoint must still terminate.
        let grm = CfgGrammar::new(
            "
          %start A
          %%
          A: B | 'a';
          B: A;
          ",
        )
        .unwrap();
        let pairs = grm.unit_pairs();
        has(&grm, &pairs, "A", vec!["A", "B"]);
        has(&grm, &pairs, "B", vec!["A", "B"]);
    }

    #[test]
    fn test_long_chain_converges() {
        // (A, E) needs as many rounds as the chain is long.
        let grm = CfgGrammar::new(
            "
          %start A
          %%
          A: B;
          B: C;
          C: D;
          D: E;
          E: 'e';
          ",
        )
        .unwrap();
        let pairs = grm.unit_pairs();
        has(&grm, &pairs, "A", vec!["A", "B", "C", "D", "E"]);
        has(&grm, &pairs, "D", vec!["D", "E"]);
        has(&grm, &pairs, "E", vec!["E"]);
    }

    #[test]
    fn test_nullable_tail_is_not_a_chain() {
        // `A: B C;` is not a chain production even though C is nullable: the unit-pair
        // relation is purely syntactic.
        let grm = CfgGrammar::new(
            "
          %start A
          %%
          A: B C;
          B: 'b';
          C: ;
          ",
        )
        .unwrap();
        let pairs = grm.unit_pairs();
        has(&grm, &pairs, "A", vec!["A"]);
        has(&grm, &pairs, "B", vec!["B"]);
        has(&grm, &pairs, "C", vec!["C"]);
    }

    #[test]
    fn test_epsilon_chain_target() {
        // A chain into a rule which only derives ε is still a unit pair: the pair
        // relation doesn't care what the target derives, only that the chain exists.
        let grm = CfgGrammar::new(
            "
          %start A
          %%
          A: B;
          B: ;
          ",
        )
        .unwrap();
        let pairs = grm.unit_pairs();
        has(&grm, &pairs, "A", vec!["A", "B"]);
        has(&grm, &pairs, "B", vec!["B"]);
    }

    #[test]
    fn test_self_chain() {
        let grm = CfgGrammar::new(
            "
          %start A
          %%
          A: A | 'a';
          ",
        )
        .unwrap();
        let pairs = grm.unit_pairs();
        has(&grm, &pairs, "A", vec!["A"]);
    }

    #[test]
    fn test_deterministic() {
        let grm = CfgGrammar::new(
            "
          %start A
          %%
          A: B | 'a';
          B: C | A;
          C: 'c';
          ",
        )
        .unwrap();
        let p1 = grm.unit_pairs();
        let p2 = grm.unit_pairs();
        for u in grm.iter_rules() {
            for v in grm.iter_rules() {
                assert_eq!(p1.is_pair(u, v), p2.is_pair(u, v));
            }
        }
        has(&grm, &p1, "A", vec!["A", "B", "C"]);
        has(&grm, &p1, "B", vec!["A", "B", "C"]);
        has(&grm, &p1, "C", vec!["C"]);
    }
}
