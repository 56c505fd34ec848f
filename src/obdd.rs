//! Pool-allocated OBDD (ordered, not reduced) store and builder.
//!
//! Grounded on `obdd.c`/`obdd.h`: `obdd_node`/`obdd_complete`/`obdd_nsols`/
//! `obdd_to_dot`/`obdd_decompose`. The two unsafe tricks called out for
//! replacement are gone: `obdd_complete`'s sign-flip visit marker becomes a
//! parallel `visited: Vec<bool>`, and the free-list-through-`aux` pointer
//! trick becomes an ordinary `Vec<NodeId>` free list.

use std::io::{self, Write};

use crate::count::SolCount;
use crate::formula::assignment::Assignment;
use crate::formula::Var;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub struct NodeId(u32);

impl NodeId {
    #[inline]
    fn index(&self) -> usize {
        self.0 as usize
    }

    /// Packs into a `usize` for storage in the cache trie's value slot.
    #[inline]
    pub fn to_usize(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub fn from_usize(x: usize) -> NodeId {
        NodeId(x as u32)
    }
}

/// The top terminal: path-counted as 1.
pub const TOP: NodeId = NodeId(0);
/// The bottom terminal: path-counted as 0.
pub const BOT: NodeId = NodeId(1);

struct Node {
    var: u32,
    lo: Option<NodeId>,
    hi: Option<NodeId>,
    next: Option<NodeId>,
    aux: SolCount,
}

/// Owned arena of OBDD nodes. `TOP`/`BOT` are always present at indices 0/1.
pub struct ObddStore {
    nodes: Vec<Node>,
    free: Vec<NodeId>,
    nnodes_created: u64,
}

impl ObddStore {
    pub fn new() -> ObddStore {
        let mut store = ObddStore {
            nodes: Vec::new(),
            free: Vec::new(),
            nnodes_created: 0,
        };
        let top = store.raw_alloc(u32::MAX, None, None);
        let bot = store.raw_alloc(u32::MAX, None, None);
        debug_assert_eq!(top, TOP);
        debug_assert_eq!(bot, BOT);
        store.nodes[TOP.index()].aux = SolCount::one();
        store
    }

    fn raw_alloc(&mut self, var: u32, lo: Option<NodeId>, hi: Option<NodeId>) -> NodeId {
        let node = Node {
            var,
            lo,
            hi,
            next: None,
            aux: SolCount::zero(),
        };
        self.nnodes_created += 1;
        match self.free.pop() {
            Some(id) => {
                self.nodes[id.index()] = node;
                id
            }
            None => {
                let id = NodeId(self.nodes.len() as u32);
                self.nodes.push(node);
                id
            }
        }
    }

    /// Allocate a fresh non-terminal node labelled `v` (1-based). A missing
    /// child is `None`, resolved to `BOT` by the next `complete()`.
    pub fn node(&mut self, v: u32, lo: Option<NodeId>, hi: Option<NodeId>) -> NodeId {
        assert!(v > 0);
        self.raw_alloc(v, lo, hi)
    }

    pub fn nnodes_created(&self) -> u64 {
        self.nnodes_created
    }

    #[inline]
    pub fn is_terminal(&self, id: NodeId) -> bool {
        id == TOP || id == BOT
    }

    #[inline]
    pub fn label(&self, id: NodeId) -> u32 {
        self.nodes[id.index()].var
    }

    #[inline]
    pub fn lo(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].lo
    }

    #[inline]
    pub fn hi(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].hi
    }

    #[inline]
    pub fn set_lo(&mut self, id: NodeId, child: NodeId) {
        self.nodes[id.index()].lo = Some(child);
    }

    #[inline]
    pub fn set_hi(&mut self, id: NodeId, child: NodeId) {
        self.nodes[id.index()].hi = Some(child);
    }

    /// Deallocate every node reachable from `root` via its `next`-chain
    /// (i.e. the chain built by a prior `complete(root)`). Used by refresh.
    pub fn delete_all(&mut self, root: Option<NodeId>) {
        let mut cur = root;
        while let Some(id) = cur {
            let nx = self.nodes[id.index()].next;
            self.nodes[id.index()].next = None;
            self.free.push(id);
            cur = nx;
        }
    }

    /// Walk the DAG from `root`, resolve every `None` child to `BOT`, and
    /// thread every reachable non-terminal into a single `next`-chain in
    /// preorder along `lo`-edges (same shape as `obdd_complete`'s traversal,
    /// minus the pointer-tag visit marker). Returns the non-terminal count.
    pub fn complete(&mut self, root: Option<NodeId>) -> u64 {
        let mut visited = vec![false; self.nodes.len()];
        let mut order = Vec::new();
        let mut stack: Vec<NodeId> = Vec::new();
        let mut p = root;

        loop {
            while let Some(id) = p {
                if self.is_terminal(id) || visited[id.index()] {
                    break;
                }
                visited[id.index()] = true;
                order.push(id);
                stack.push(id);
                p = self.nodes[id.index()].lo;
            }
            match stack.pop() {
                None => break,
                Some(id) => p = self.nodes[id.index()].hi,
            }
        }

        for w in order.windows(2) {
            self.nodes[w[0].index()].next = Some(w[1]);
        }
        if let Some(&last) = order.last() {
            self.nodes[last.index()].next = None;
        }

        for &id in &order {
            let node = &mut self.nodes[id.index()];
            if node.lo.is_none() {
                node.lo = Some(BOT);
            }
            if node.hi.is_none() {
                node.hi = Some(BOT);
            }
        }

        order.len() as u64
    }

    /// Node count via the `next`-chain left by the most recent `complete`
    /// call rooted here — cheaper than re-running `complete`.
    pub fn size(&self, root: NodeId) -> u64 {
        let mut n = 0;
        let mut cur = Some(root);
        while let Some(id) = cur {
            n += 1;
            cur = self.nodes[id.index()].next;
        }
        n
    }

    /// Count satisfying total assignments over `n` variables, via the
    /// bucket-by-variable bottom-up aggregation of `obdd_nsols`. Requires a
    /// prior `complete(Some(root))`.
    pub fn nsols(&mut self, n: usize, root: NodeId) -> SolCount {
        if self.is_terminal(root) {
            return if root == TOP {
                SolCount::from_pow2(n as u32)
            } else {
                SolCount::zero()
            };
        }

        let mut buckets: Vec<Vec<NodeId>> = vec![Vec::new(); n + 1];
        let mut cur = Some(root);
        while let Some(id) = cur {
            let v = self.label(id) as usize;
            assert!(v <= n);
            buckets[v].push(id);
            cur = self.nodes[id.index()].next;
        }

        self.nodes[TOP.index()].aux = SolCount::one();
        self.nodes[BOT.index()].aux = SolCount::zero();

        for i in (1..=n).rev() {
            for &id in &buckets[i] {
                let hi = self.nodes[id.index()].hi.unwrap();
                let lo = self.nodes[id.index()].lo.unwrap();

                let j_hi = if self.is_terminal(hi) { n + 1 } else { self.label(hi) as usize };
                let c1 = self.nodes[hi.index()].aux.mul_pow2((j_hi - i - 1) as u32);

                let j_lo = if self.is_terminal(lo) { n + 1 } else { self.label(lo) as usize };
                let c2 = self.nodes[lo.index()].aux.mul_pow2((j_lo - i - 1) as u32);

                let mut sum = c1;
                sum += &c2;
                self.nodes[id.index()].aux = sum;
            }
        }

        let v = self.label(root) as usize;
        self.nodes[root.index()].aux.mul_pow2((v - 1) as u32)
    }

    /// Extend the path from `root` that the current partial assignment
    /// picks out, down to `target` (`TOP`, or a cached node). Descends while
    /// a chosen child already exists; once it hits a node whose chosen child
    /// is still unbuilt, it bridges every missing variable between that
    /// frontier and `target` with a fresh node (the unchosen child left
    /// `None`, to be resolved to `BOT` by a later `complete()`), then
    /// recomputes `aux` bottom-up along the just-built path. If the descent
    /// instead reaches a terminal, the path was already resolved by an
    /// earlier branch sharing this prefix (a blocking-mode revisit) and
    /// `root` is returned unchanged — no new nodes.
    pub fn extend(&mut self, root: NodeId, target: NodeId, assigns: &Assignment, n: usize) -> NodeId {
        let mut frontier = root;
        let mut went_hi = false;
        loop {
            if self.is_terminal(frontier) {
                return root;
            }
            let v = self.label(frontier) as usize;
            went_hi = assigns.is_assigned_pos(Var::from_index(v - 1).pos_lit());
            let child = if went_hi { self.hi(frontier) } else { self.lo(frontier) };
            match child {
                Some(c) => frontier = c,
                None => break,
            }
        }

        let p_label = self.label(frontier);
        let target_label = if target == TOP {
            n as u32 + 1
        } else {
            self.label(target)
        };

        let mut next = target;
        let mut built = Vec::new();
        for w in (p_label + 1..target_label).rev() {
            let wh = assigns.is_assigned_pos(Var::from_index(w as usize - 1).pos_lit());
            let (lo, hi) = if wh { (None, Some(next)) } else { (Some(next), None) };
            next = self.node(w, lo, hi);
            built.push(next);
        }

        if went_hi {
            self.set_hi(frontier, next);
        } else {
            self.set_lo(frontier, next);
        }
        built.push(frontier);

        for &id in &built {
            let aux_lo = self.child_aux(self.lo(id));
            let aux_hi = self.child_aux(self.hi(id));
            let mut sum = aux_lo;
            sum += &aux_hi;
            self.nodes[id.index()].aux = sum;
        }

        root
    }

    fn child_aux(&self, child: Option<NodeId>) -> SolCount {
        match child {
            Some(id) => self.nodes[id.index()].aux.clone(),
            None => SolCount::zero(),
        }
    }

    /// Emit a graphviz rendering, one rank per variable level.
    pub fn to_dot<W: Write>(&self, n: usize, root: NodeId, out: &mut W) -> io::Result<()> {
        if self.is_terminal(root) {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "root must be non-terminal"));
        }

        let mut buckets: Vec<Vec<NodeId>> = vec![Vec::new(); n + 1];
        let mut cur = Some(root);
        while let Some(id) = cur {
            buckets[self.label(id) as usize].push(id);
            cur = self.nodes[id.index()].next;
        }

        writeln!(out, "digraph obdd {{")?;
        writeln!(out, "{{rank = same; top bot}}")?;
        for i in 1..=n {
            write!(out, "{{rank = same;")?;
            for &id in &buckets[i] {
                write!(out, " n{}", id.index())?;
            }
            writeln!(out, "}}")?;
        }
        for i in 1..=n {
            for &id in &buckets[i] {
                let hi = self.nodes[id.index()].hi.unwrap();
                let lo = self.nodes[id.index()].lo.unwrap();
                writeln!(out, "n{} [label = {}];", id.index(), i)?;
                writeln!(out, "n{} -> {};", id.index(), dot_name(hi))?;
                writeln!(out, "n{} -> {} [style = dotted];", id.index(), dot_name(lo))?;
            }
        }
        writeln!(out, "top [label = 1, shape = box];")?;
        writeln!(out, "bot [label = 0, shape = box];")?;
        writeln!(out, "}}")?;
        Ok(())
    }

    /// Decompose into partial assignments, one `0`/`1`-glyph line per root-to-
    /// `TOP` path (variables absent from the path are omitted, each counting
    /// for a multiplicity of `2^k`). Mirrors `obdd_decompose`/
    /// `fprintf_partial_soh`, iterative via two explicit stacks.
    pub fn decompose<W: Write>(&self, n: usize, root: NodeId, out: &mut W) -> io::Result<SolCount> {
        let mut total = SolCount::zero();
        let mut a: Vec<i64> = Vec::new();
        let mut b: Vec<NodeId> = Vec::new();
        let mut p = Some(root);

        loop {
            while let Some(id) = p {
                if id == BOT || id == TOP {
                    break;
                }
                b.push(id);
                a.push(-(self.label(id) as i64));
                p = self.nodes[id.index()].lo;
            }

            if p == Some(TOP) {
                let mut prev = 0i64;
                let mut sols = SolCount::one();
                for &lit in &a {
                    write!(out, "{}", if lit < 0 { '0' } else { '1' })?;
                    sols = sols.mul_pow2((lit.abs() - prev - 1) as u32);
                    prev = lit.abs();
                }
                writeln!(out)?;
                sols = sols.mul_pow2((n as i64 - prev) as u32);
                total += &sols;
            }

            match b.pop() {
                None => break,
                Some(id) => {
                    loop {
                        let v = a.pop().expect("path stack and label stack stay in sync");
                        if v < 0 {
                            a.push(-v);
                            break;
                        }
                    }
                    p = self.nodes[id.index()].hi;
                }
            }
        }

        Ok(total)
    }
}

fn dot_name(id: NodeId) -> String {
    if id == TOP {
        "top".to_string()
    } else if id == BOT {
        "bot".to_string()
    } else {
        format!("n{}", id.index())
    }
}

impl Default for ObddStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_variable_true_literal_has_one_solution() {
        let mut store = ObddStore::new();
        let p = store.node(1, Some(BOT), Some(TOP));
        store.complete(Some(p));
        let count = store.nsols(1, p);
        assert_eq!(count.exact_decimal(), "1");
    }

    #[test]
    fn unconstrained_two_variables_has_four_solutions() {
        let mut store = ObddStore::new();
        let p = store.node(1, Some(TOP), Some(TOP));
        store.complete(Some(p));
        let count = store.nsols(2, p);
        assert_eq!(count.exact_decimal(), "4");
    }

    #[test]
    fn complete_resolves_dangling_children_to_bot() {
        let mut store = ObddStore::new();
        let p = store.node(1, None, None);
        let size = store.complete(Some(p));
        assert_eq!(size, 1);
        assert_eq!(store.lo(p), Some(BOT));
        assert_eq!(store.hi(p), Some(BOT));
    }

    #[test]
    fn extend_bridges_skipped_variables_with_fresh_nodes() {
        let mut store = ObddStore::new();
        let root = store.node(1, None, None);

        let mut assigns = Assignment::new();
        let v1 = assigns.new_var();
        let v2 = assigns.new_var();
        let v3 = assigns.new_var();
        assigns.new_decision_level();
        assigns.assign_lit(v1.pos_lit(), None);
        assigns.assign_lit(v2.neg_lit(), None); // propagated, no node of its own
        assigns.assign_lit(v3.pos_lit(), None);

        let r = store.extend(root, TOP, &assigns, 3);
        assert_eq!(r, root);
        // root (var 1) went hi; bridged var 2 (lo-ward, since v2 is false)
        // then var 3 (hi-ward) to TOP.
        let mid = store.hi(root).unwrap();
        assert_eq!(store.label(mid), 2);
        let last = store.lo(mid).unwrap();
        assert_eq!(store.label(last), 3);
        assert_eq!(store.hi(last), Some(TOP));
    }

    #[test]
    fn decompose_emits_one_glyph_line_per_path() {
        let mut store = ObddStore::new();
        let p = store.node(1, Some(BOT), Some(TOP));
        store.complete(Some(p));
        let mut buf = Vec::new();
        let total = store.decompose(1, p, &mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "1\n");
        assert_eq!(total.exact_decimal(), "1");
    }
}
