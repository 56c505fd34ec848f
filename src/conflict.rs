use crate::formula::assignment::*;
use crate::formula::clause::*;
use crate::formula::{Lit, Var, VarMap};

#[derive(PartialEq, Eq)]
pub enum CCMinMode {
    None,
    Basic,
    Deep,
}

impl Default for CCMinMode {
    fn default() -> Self {
        CCMinMode::Deep
    }
}

/// Which granularity 1-UIP resolution stops at: the classical decision
/// level, or (non-blocking mode) the finer sublevel opened by a
/// chronological flip.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum UipGranularity {
    Decision,
    Sublevel,
}

impl Default for UipGranularity {
    fn default() -> Self {
        UipGranularity::Decision
    }
}

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[repr(u8)]
enum Seen {
    Undef = 0,
    Source = 1,
    Removable = 2,
    Failed = 3,
}

pub enum Conflict {
    Ground,
    Unit(DecisionLevel, Lit),
    Learned(DecisionLevel, Lit, Vec<Lit>),
}

pub struct AnalyzeContext {
    ccmin_mode: CCMinMode,
    granularity: UipGranularity,
    seen: VarMap<Seen>,
    analyze_toclear: Vec<Lit>,
    pub max_literals: u64,
    pub tot_literals: u64,
}

impl AnalyzeContext {
    pub fn new(ccmin_mode: CCMinMode, granularity: UipGranularity) -> AnalyzeContext {
        AnalyzeContext {
            ccmin_mode,
            granularity,
            seen: VarMap::new(),
            analyze_toclear: Vec::new(),
            max_literals: 0,
            tot_literals: 0,
        }
    }

    pub fn init_var(&mut self, v: Var) {
        self.seen.insert(&v, Seen::Undef);
    }

    /// 1-UIP resolution walk, stopping at the granularity configured at
    /// construction time (decision level or sublevel). Post-conditions
    /// mirror the classical ones: `out_learnt[0]` is the asserting literal,
    /// and if `out_learnt.len() > 1`, `out_learnt[1]` has the greatest
    /// (sub)level among the rest.
    pub fn analyze<BV, BC>(
        &mut self,
        assigns: &Assignment,
        ca: &mut ClauseAllocator,
        confl0: ClauseRef,
        mut bump_var: BV,
        mut bump_cla: BC,
    ) -> Conflict
    where
        BV: FnMut(Var),
        BC: FnMut(&mut ClauseAllocator, ClauseRef),
    {
        if assigns.is_ground_level() {
            return Conflict::Ground;
        }

        let current_sub = |v: &VarData| match self.granularity {
            UipGranularity::Decision => v.level.offset() as i64,
            UipGranularity::Sublevel => v.sublevel.offset() as i64,
        };
        let frontier = match self.granularity {
            UipGranularity::Decision => assigns.decision_level().offset() as i64,
            UipGranularity::Sublevel => assigns.sublevel().offset() as i64,
        };

        let mut out_learnt = Vec::with_capacity(assigns.number_of_assigns());

        {
            let mut confl = confl0;
            let mut path_c = 0;

            let trail = assigns.trail();
            let mut index = trail.len();
            loop {
                bump_cla(ca, confl);

                let base = if confl == confl0 { 0 } else { 1 };
                for &q in &ca.view(confl).lits()[base..] {
                    let v = q.var();
                    if self.seen[&v] == Seen::Undef {
                        let vd = assigns.vardata(q);
                        if vd.level > GROUND_LEVEL {
                            self.seen[&v] = Seen::Source;
                            bump_var(v);
                            if current_sub(vd) >= frontier {
                                path_c += 1;
                            } else {
                                out_learnt.push(q);
                            }
                        }
                    }
                }

                let pl = {
                    loop {
                        index -= 1;
                        if self.seen[&trail[index].var()] != Seen::Undef {
                            break;
                        }
                    }
                    trail[index]
                };

                self.seen[&pl.var()] = Seen::Undef;

                path_c -= 1;
                if path_c <= 0 {
                    out_learnt.insert(0, !pl);
                    break;
                }

                confl = assigns.vardata(!pl).reason.unwrap();
            }
        }

        self.analyze_toclear = out_learnt.clone();
        self.max_literals += out_learnt.len() as u64;
        match self.ccmin_mode {
            CCMinMode::Deep => {
                out_learnt.retain(|&l| !self.lit_redundant(ca, assigns, l));
            }
            CCMinMode::Basic => {
                out_learnt.retain(|&l| !self.lit_redundant_basic(ca, assigns, l));
            }
            CCMinMode::None => {}
        }
        self.tot_literals += out_learnt.len() as u64;

        for l in self.analyze_toclear.iter() {
            self.seen[&l.var()] = Seen::Undef;
        }

        if out_learnt.len() == 1 {
            Conflict::Unit(GROUND_LEVEL, out_learnt[0])
        } else {
            let mut max_i = 1;
            let mut max_level = assigns.vardata(out_learnt[1]).level;
            for i in 2..out_learnt.len() {
                let level = assigns.vardata(out_learnt[i]).level;
                if level > max_level {
                    max_i = i;
                    max_level = level;
                }
            }
            out_learnt.swap(1, max_i);
            Conflict::Learned(max_level, out_learnt[0], out_learnt)
        }
    }

    fn lit_redundant_basic(&self, ca: &ClauseAllocator, assigns: &Assignment, literal: Lit) -> bool {
        match assigns.vardata(literal).reason {
            None => false,
            Some(cr) => ca.view(cr).lits()[1..].iter().all(|&lit| {
                self.seen[&lit.var()] != Seen::Undef || assigns.vardata(lit).level == GROUND_LEVEL
            }),
        }
    }

    /// Self-subsumption minimisation, iterative via an explicit work stack
    /// (no language recursion — see SPEC_FULL.md's recursion-budget note).
    fn lit_redundant(&mut self, ca: &ClauseAllocator, assigns: &Assignment, literal: Lit) -> bool {
        debug_assert!({
            let s = self.seen[&literal.var()];
            s == Seen::Undef || s == Seen::Source
        });

        let mut analyze_stack = match assigns.vardata(literal).reason {
            None => return false,
            Some(cr) => vec![(literal, &ca.view(cr).lits()[1..])],
        };

        while let Some((p, lits)) = analyze_stack.pop() {
            match lits.split_first() {
                Some((&l, tail)) => {
                    analyze_stack.push((p, tail));
                    let vd = assigns.vardata(l);
                    let seen = self.seen[&l.var()];

                    if vd.level == GROUND_LEVEL || seen == Seen::Source || seen == Seen::Removable {
                        continue;
                    }

                    match vd.reason {
                        Some(cr) if seen == Seen::Undef => {
                            analyze_stack.push((l, &ca.view(cr).lits()[1..]));
                        }
                        _ => {
                            for &(l, _) in analyze_stack.iter() {
                                if self.seen[&l.var()] == Seen::Undef {
                                    self.seen[&l.var()] = Seen::Failed;
                                    self.analyze_toclear.push(l);
                                }
                            }
                            return false;
                        }
                    }
                }
                None => {
                    if self.seen[&p.var()] == Seen::Undef {
                        self.seen[&p.var()] = Seen::Removable;
                        self.analyze_toclear.push(p);
                    }
                }
            }
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula::clause::ClauseAllocator;

    #[test]
    fn ground_level_conflict_is_reported_as_ground() {
        let mut ctx = AnalyzeContext::new(CCMinMode::Deep, UipGranularity::Decision);
        let assigns = Assignment::new();
        let mut ca = ClauseAllocator::new();
        let a = Var::from_index(0);
        ctx.init_var(a);
        let cr = ca.alloc(vec![a.pos_lit(), a.neg_lit()], false);
        match ctx.analyze(&assigns, &mut ca, cr, |_| {}, |_, _| {}) {
            Conflict::Ground => {}
            _ => panic!("expected Ground"),
        }
    }
}
