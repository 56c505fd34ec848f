//! Subspace-equivalence cache: per variable boundary, a fingerprint of the
//! "live state" of the partial assignment maps (via a [`Trie`]) to the OBDD
//! node already built for everything below that boundary.
//!
//! Grounded on spec.md §4.6 directly (no teacher analogue for the
//! cache itself — the surrounding trie comes from `formula::trie`).

use crate::formula::assignment::Assignment;
use crate::formula::clause::{Clause, ClauseAllocator};
use crate::formula::trie::Trie;
use crate::formula::Var;
use crate::obdd::NodeId;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CacheMode {
    Separator,
    Cutset,
}

fn clause_bounds(c: &Clause) -> (usize, usize) {
    let mut lo = usize::MAX;
    let mut hi = 0;
    for lit in c.lits() {
        let v = lit.var().index();
        lo = lo.min(v);
        hi = hi.max(v);
    }
    (lo, hi)
}

pub struct CacheManager {
    mode: CacheMode,
    /// Per boundary `i`: sorted separator variables (separator mode only).
    separators: Vec<Vec<Var>>,
    /// Per boundary `i`: clause indices into `cutset_clauses` spanning `i`
    /// (cutset mode only).
    cutsets: Vec<Vec<usize>>,
    cutset_clauses: Vec<crate::formula::clause::ClauseRef>,
    widths: Vec<usize>,
    tries: Vec<Trie>,
}

impl CacheManager {
    /// Build the separator-mode cache configuration: for each variable `v`,
    /// `w(v)` is the highest variable appearing together with `v` in some
    /// clause; `pathwidth[i]` counts variables `j <= i < w(j)`.
    pub fn new_separator(n: usize, ca: &ClauseAllocator, clause_refs: &[crate::formula::clause::ClauseRef]) -> CacheManager {
        let mut w = vec![0usize; n];
        for &cr in clause_refs {
            let (lo, hi) = clause_bounds(ca.view(cr));
            for v in lo..=hi {
                w[v] = w[v].max(hi);
            }
        }

        let mut separators: Vec<Vec<Var>> = vec![Vec::new(); n];
        for j in 0..n {
            for i in j..w[j] {
                separators[i].push(Var::from_index(j));
            }
        }
        for s in separators.iter_mut() {
            s.sort_by_key(|v| v.index());
        }

        let widths: Vec<usize> = separators.iter().map(|s| s.len()).collect();
        let tries = widths.iter().map(|&w| Trie::create(w)).collect();

        CacheManager {
            mode: CacheMode::Separator,
            separators,
            cutsets: Vec::new(),
            cutset_clauses: Vec::new(),
            widths,
            tries,
        }
    }

    /// Build the cutset-mode cache configuration: `cutwidth[i]` counts
    /// clauses whose minimum variable is `<= i` and maximum variable is
    /// `> i`.
    pub fn new_cutset(n: usize, ca: &ClauseAllocator, clause_refs: &[crate::formula::clause::ClauseRef]) -> CacheManager {
        let mut cutsets: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut cutset_clauses = Vec::with_capacity(clause_refs.len());

        for (ci, &cr) in clause_refs.iter().enumerate() {
            let (lo, hi) = clause_bounds(ca.view(cr));
            cutset_clauses.push(cr);
            for i in lo..hi.min(n) {
                cutsets[i].push(ci);
            }
        }

        let widths: Vec<usize> = cutsets.iter().map(|c| c.len()).collect();
        let tries = widths.iter().map(|&w| Trie::create(w)).collect();

        CacheManager {
            mode: CacheMode::Cutset,
            separators: Vec::new(),
            cutsets,
            cutset_clauses,
            widths,
            tries,
        }
    }

    pub fn mode(&self) -> CacheMode {
        self.mode
    }

    pub fn width(&self, i: usize) -> usize {
        self.widths[i]
    }

    /// Pack the fingerprint at boundary `i` into the bit layout the trie
    /// expects.
    pub fn fingerprint(&self, i: usize, ca: &ClauseAllocator, assigns: &Assignment) -> Vec<u32> {
        match self.mode {
            CacheMode::Separator => self.fingerprint_separator(i, assigns),
            CacheMode::Cutset => self.fingerprint_cutset(i, ca, assigns),
        }
    }

    fn fingerprint_separator(&self, i: usize, assigns: &Assignment) -> Vec<u32> {
        let vars = &self.separators[i];
        let mut key = vec![0u32; self.tries[i].key_words()];
        for (j, &v) in vars.iter().enumerate() {
            if assigns.is_assigned_pos(v.pos_lit()) {
                key[j / 32] |= 1 << (j % 32);
            }
        }
        key
    }

    fn fingerprint_cutset(&self, i: usize, ca: &ClauseAllocator, assigns: &Assignment) -> Vec<u32> {
        let indices = &self.cutsets[i];
        let mut key = vec![0u32; self.tries[i].key_words()];
        for (j, &ci) in indices.iter().enumerate() {
            let cr = self.cutset_clauses[ci];
            let satisfied = ca.view(cr).lits().iter().any(|&lit| {
                assigns.is_decision(lit.var()) && assigns.is_assigned_pos(lit)
            });
            if satisfied {
                key[j / 32] |= 1 << (j % 32);
            }
        }
        key
    }

    pub fn lookup(&self, i: usize, key: &[u32]) -> Option<NodeId> {
        self.tries[i].search(key).map(NodeId::from_usize)
    }

    pub fn insert(&mut self, i: usize, key: &[u32], value: NodeId) {
        self.tries[i].insert(key, value.to_usize());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula::Var;

    fn mk(ca: &mut ClauseAllocator, vars: &[usize]) -> crate::formula::clause::ClauseRef {
        let lits: Vec<_> = vars.iter().map(|&v| Var::from_index(v).pos_lit()).collect();
        ca.alloc(lits, false)
    }

    #[test]
    fn cutset_width_matches_hand_calculation() {
        // c1: vars 0,1 ; c2: vars 1,3 ; c3: vars 2,4
        let mut ca = ClauseAllocator::new();
        let c1 = mk(&mut ca, &[0, 1]);
        let c2 = mk(&mut ca, &[1, 3]);
        let c3 = mk(&mut ca, &[2, 4]);
        let refs = vec![c1, c2, c3];
        let cm = CacheManager::new_cutset(5, &ca, &refs);

        // boundary 0: only c1 spans (0 <= 0 < 1)
        assert_eq!(cm.width(0), 1);
        // boundary 1: c2 spans (1<=1<3); c1 ended (hi=1, not >1)
        assert_eq!(cm.width(1), 1);
        // boundary 2: c2 still spans (1<=2<3); c3 starts (2<=2<4)
        assert_eq!(cm.width(2), 2);
        // boundary 3: c3 spans (2<=3<4)
        assert_eq!(cm.width(3), 1);
    }

    #[test]
    fn separator_cache_round_trips_a_hit() {
        let mut ca = ClauseAllocator::new();
        let c1 = mk(&mut ca, &[0, 2]);
        let refs = vec![c1];
        let mut cm = CacheManager::new_separator(3, &ca, &refs);

        let mut assigns = Assignment::new();
        let v0 = assigns.new_var();
        let _v1 = assigns.new_var();
        let _v2 = assigns.new_var();
        assigns.assign_lit(v0.pos_lit(), None);

        let key = cm.fingerprint(0, &ca, &assigns);
        assert!(cm.lookup(0, &key).is_none());
        cm.insert(0, &key, NodeId::from_usize(7));
        assert_eq!(cm.lookup(0, &key), Some(NodeId::from_usize(7)));
    }
}
