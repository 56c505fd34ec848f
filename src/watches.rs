use crate::formula::assignment::Assignment;
use crate::formula::clause::*;
use crate::formula::{Lit, LitVec, Var};

#[derive(Clone, Copy, Debug)]
struct Watcher {
    cref: ClauseRef,
    blocker: Lit,
}

/// A watch list entry. `Binary` is the fast path for 2-literal clauses: the
/// only other literal is already known, so propagation never has to
/// dereference the allocator to find it. Everything else goes through
/// `Clause`, which carries a `blocker` the way the teacher's watcher does.
#[derive(Clone, Copy, Debug)]
enum Watch {
    Binary(Lit, ClauseRef),
    Clause(Watcher),
}

impl Watch {
    #[inline]
    fn cref(&self) -> ClauseRef {
        match *self {
            Watch::Binary(_, cr) => cr,
            Watch::Clause(Watcher { cref, .. }) => cref,
        }
    }
}

#[derive(Clone, Default, Debug)]
struct WatchesLine {
    watchers: Vec<Watch>,
    dirty: bool,
}

/// Two-literal watched propagation. Grounded on the teacher's
/// `Watches::propagate`, but rewritten to walk the watcher `Vec` with
/// indices and `mem::take` instead of raw pointer splicing — safe, at the
/// cost of one extra `Vec` per propagated literal. Binary clauses get an
/// inline tagged watch (`Watch::Binary`) instead of going through the
/// clause allocator at propagation time, per spec.md §2/§3's binary-clause
/// fast path.
pub struct Watches {
    watches: LitVec<WatchesLine>,
    pub propagations: u64,
}

impl Watches {
    pub fn new() -> Self {
        Watches {
            watches: LitVec::new(),
            propagations: 0,
        }
    }

    pub fn init_var(&mut self, v: Var) {
        self.watches.init(v.pos_lit());
        self.watches.init(v.neg_lit());
    }

    pub fn watch_clause(&mut self, c: &Clause, cr: ClauseRef) {
        let (c0, c1) = c.head_pair();
        if c.len() == 2 {
            self.watches[!c0].watchers.push(Watch::Binary(c1, cr));
            self.watches[!c1].watchers.push(Watch::Binary(c0, cr));
        } else {
            self.watches[!c0].watchers.push(Watch::Clause(Watcher { cref: cr, blocker: c1 }));
            self.watches[!c1].watchers.push(Watch::Clause(Watcher { cref: cr, blocker: c0 }));
        }
    }

    pub fn unwatch_clause_strict(&mut self, c: &Clause, cr: ClauseRef) {
        let (c0, c1) = c.head_pair();
        self.watches[!c0].watchers.retain(|w| w.cref() != cr);
        self.watches[!c1].watchers.retain(|w| w.cref() != cr);
    }

    pub fn unwatch_clause_lazy(&mut self, c: &Clause) {
        let (c0, c1) = c.head_pair();
        self.watches[!c0].dirty = true;
        self.watches[!c1].dirty = true;
    }

    /// Propagate all enqueued facts. Returns the conflicting clause, if any.
    /// Post-condition: the propagation queue is empty, even on conflict.
    pub fn propagate(&mut self, ca: &mut ClauseAllocator, assigns: &mut Assignment) -> Option<ClauseRef> {
        let mut confl = None;

        while let Some(p) = assigns.dequeue() {
            self.propagations += 1;
            let false_lit = !p;

            let mut line = std::mem::take(&mut self.watches[p]);
            if line.dirty {
                line.watchers.retain(|w| !ca.is_deleted(w.cref()));
                line.dirty = false;
            }

            let mut kept = Vec::with_capacity(line.watchers.len());
            let mut it = line.watchers.into_iter();

            while let Some(pwi) = it.next() {
                let (effective, other, cr) = match pwi {
                    Watch::Binary(other, cr) => (pwi, other, cr),
                    Watch::Clause(w) => {
                        if assigns.is_assigned_pos(w.blocker) {
                            kept.push(pwi);
                            continue;
                        }

                        let c = ca.edit(w.cref);
                        if c.head() == false_lit {
                            c.swap(0, 1);
                        }

                        let cw = Watcher {
                            cref: w.cref,
                            blocker: c.head(),
                        };
                        if cw.blocker != w.blocker && assigns.is_assigned_pos(cw.blocker) {
                            kept.push(Watch::Clause(cw));
                            continue;
                        }

                        match c.pull_literal(1, |lit| !assigns.is_assigned_neg(lit)) {
                            Some(lit) => {
                                self.watches[!lit].watchers.push(Watch::Clause(cw));
                                continue;
                            }
                            None => (Watch::Clause(cw), cw.blocker, cw.cref),
                        }
                    }
                };

                // binary clause, or a longer clause pulled down to its last two literals
                kept.push(effective);
                if assigns.is_assigned_neg(other) {
                    assigns.dequeue_all();
                    kept.extend(it);
                    confl = Some(cr);
                    break;
                } else if !assigns.is_assigned_pos(other) {
                    if let Watch::Binary(..) = effective {
                        let c = ca.edit(cr);
                        if c.head() != other {
                            c.swap(0, 1);
                        }
                    }
                    assigns.assign_lit(other, Some(cr));
                }
            }

            let dirty = self.watches[p].dirty;
            self.watches[p] = WatchesLine {
                watchers: kept,
                dirty,
            };

            if confl.is_some() {
                break;
            }
        }

        confl
    }
}

impl Default for Watches {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula::Var;

    #[test]
    fn unit_clause_propagates_immediately() {
        let mut ca = ClauseAllocator::new();
        let mut assigns = Assignment::new();
        let mut watches = Watches::new();

        let a = assigns.new_var();
        let b = assigns.new_var();
        watches.init_var(a);
        watches.init_var(b);

        let cr = ca.alloc(vec![a.neg_lit(), b.pos_lit()], false);
        watches.watch_clause(ca.view(cr), cr);

        assigns.assign_lit(a.pos_lit(), None);
        let confl = watches.propagate(&mut ca, &mut assigns);
        assert!(confl.is_none());
        assert!(assigns.is_assigned_pos(b.pos_lit()));
    }

    #[test]
    fn conflicting_unit_clauses_are_detected() {
        let mut ca = ClauseAllocator::new();
        let mut assigns = Assignment::new();
        let mut watches = Watches::new();

        let a = assigns.new_var();
        let b = assigns.new_var();
        watches.init_var(a);
        watches.init_var(b);

        let cr = ca.alloc(vec![a.neg_lit(), b.pos_lit()], false);
        watches.watch_clause(ca.view(cr), cr);
        let cr2 = ca.alloc(vec![a.neg_lit(), b.neg_lit()], false);
        watches.watch_clause(ca.view(cr2), cr2);

        assigns.assign_lit(a.pos_lit(), None);
        let confl = watches.propagate(&mut ca, &mut assigns);
        assert!(confl.is_some());
    }

    #[test]
    fn ternary_clause_falls_through_to_a_unit_via_the_clause_path() {
        let mut ca = ClauseAllocator::new();
        let mut assigns = Assignment::new();
        let mut watches = Watches::new();

        let a = assigns.new_var();
        let b = assigns.new_var();
        let c = assigns.new_var();
        watches.init_var(a);
        watches.init_var(b);
        watches.init_var(c);

        let cr = ca.alloc(vec![a.pos_lit(), b.pos_lit(), c.pos_lit()], false);
        watches.watch_clause(ca.view(cr), cr);

        assigns.assign_lit(a.neg_lit(), None);
        assert!(watches.propagate(&mut ca, &mut assigns).is_none());

        assigns.assign_lit(b.neg_lit(), None);
        let confl = watches.propagate(&mut ca, &mut assigns);
        assert!(confl.is_none());
        assert!(assigns.is_assigned_pos(c.pos_lit()));
    }
}
