use std::collections::HashSet;
use std::hash::Hash;

use num_traits::{AsPrimitive, PrimInt, Unsigned};

use super::grammar::CfgGrammar;
use crate::{RIdx, Symbol};

impl<StorageT: 'static + Hash + PrimInt + Unsigned> CfgGrammar<StorageT>
where
    usize: AsPrimitive<StorageT>,
{
    /// Returns a grammar with no ε productions which generates the same language as this
    /// one, minus the empty string. The rule and token universe and the start rule are
    /// unchanged; only the productions differ.
    ///
    /// Every production is replaced by all the ways of keeping or dropping each occurrence
    /// of a nullable rule within it, minus any variant which would itself be an ε
    /// production. A production with k nullable occurrences thus
    /// yields at most 2^k replacements, fewer after duplicates and the empty variant are
    /// dropped. Note that a rule all of whose productions are abridged away ends up with
    /// no productions at all.
    pub fn eliminate_nullable_rules(&self) -> CfgGrammar<StorageT> {
        let nullables = self.nullables();
        let mut new_rules_prods = Vec::with_capacity(usize::from(self.rules_len()));
        for ridx in self.iter_rules() {
            let mut rule_prods = Vec::new();
            let mut seen = HashSet::new();
            for &pidx in self.rule_to_prods(ridx) {
                let prod = self.prod(pidx);
                // The positions at which this production may be abridged: occurrences of
                // nullable rules. Tokens and non-nullable rules are always kept.
                let optional = prod
                    .iter()
                    .enumerate()
                    .filter(|(_, sym)| match **sym {
                        Symbol::Rule(s_ridx) => nullables.is_nullable(s_ridx),
                        Symbol::Token(_) => false,
                    })
                    .map(|(sidx, _)| sidx)
                    .collect::<Vec<_>>();

                if optional.is_empty() {
                    // Nothing to abridge: the production survives as-is. This also covers
                    // the ε production itself, whose sole variant is empty and so is
                    // dropped.
                    if !prod.is_empty() && seen.insert(prod.to_vec()) {
                        rule_prods.push(prod.to_vec());
                    }
                    continue;
                }

                // Enumerate every keep/drop combination over the optional positions.
                // `todo[j]` says whether the symbol at `optional[j]` is currently
                // dropped; incrementing works like normal arithmetic with each digit in
                // base 2, so the first variant out is the unabridged production and the
                // last is the fully abridged one.
                let mut todo = vec![false; optional.len()];
                'b: loop {
                    let mut variant = Vec::with_capacity(prod.len());
                    let mut oi = 0;
                    for (sidx, sym) in prod.iter().enumerate() {
                        if oi < optional.len() && optional[oi] == sidx {
                            if !todo[oi] {
                                variant.push(*sym);
                            }
                            oi += 1;
                        } else {
                            variant.push(*sym);
                        }
                    }
                    // An empty variant would be a fresh ε production: drop it.
                    if !variant.is_empty() && seen.insert(variant.clone()) {
                        rule_prods.push(variant);
                    }

                    let mut j = optional.len() - 1;
                    loop {
                        if todo[j] {
                            if j == 0 {
                                break 'b;
                            }
                            todo[j] = false;
                            j -= 1;
                        } else {
                            todo[j] = true;
                            break;
                        }
                    }
                }
            }
            new_rules_prods.push(rule_prods);
        }
        self.with_prods(new_rules_prods)
    }

    /// Returns a grammar with no chain (unit) productions which generates exactly the same
    /// language as this one. The rule and token universe and the start rule are unchanged;
    /// only the productions differ.
    ///
    /// Rule `u` receives the non-chain productions of every rule `v` it has a unit pair
    /// with: anything `u` could derive by chaining through to `v` and then applying a real
    /// production, it now derives in one step. Chain productions themselves are never
    /// copied: only their transitive effect survives. Since every generator has the
    /// reflexive pair with itself, a rule's own non-chain productions are preserved
    /// verbatim; a rule with only chain productions into production-less rules ends up
    /// with no productions at all.
    pub fn eliminate_unit_rules(&self) -> CfgGrammar<StorageT> {
        let pairs = self.unit_pairs();
        let mut new_rules_prods = Vec::with_capacity(usize::from(self.rules_len()));
        for u_ridx in self.iter_rules() {
            let mut rule_prods = Vec::new();
            let mut seen = HashSet::new();
            for v in pairs.pairs(u_ridx).iter_set_bits(..) {
                // The call to as_() is safe: set bits are bounded by rules_len(), which
                // fits in StorageT.
                let v_ridx = RIdx(v.as_());
                for &pidx in self.rule_to_prods(v_ridx) {
                    if self.chain_target(pidx).is_some() {
                        continue;
                    }
                    let prod = self.prod(pidx).to_vec();
                    if seen.insert(prod.clone()) {
                        rule_prods.push(prod);
                    }
                }
            }
            new_rules_prods.push(rule_prods);
        }
        self.with_prods(new_rules_prods)
    }
}
