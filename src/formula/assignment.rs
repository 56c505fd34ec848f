use std::{cmp, fmt};

use super::clause;
use super::{Lit, Var};

#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Debug)]
pub struct DecisionLevel(usize);

pub const GROUND_LEVEL: DecisionLevel = DecisionLevel(0);

impl DecisionLevel {
    pub fn offset(&self) -> usize {
        self.0
    }

    pub fn from_offset(offset: usize) -> DecisionLevel {
        DecisionLevel(offset)
    }
}

/// A sublevel is a finer division of a decision level: non-blocking mode's
/// chronological flip opens a new sublevel without opening a new decision
/// level (see spec-level background in SPEC_FULL.md on chronological flips).
#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Debug)]
pub struct Sublevel(usize);

pub const GROUND_SUBLEVEL: Sublevel = Sublevel(0);

impl Sublevel {
    pub fn offset(&self) -> usize {
        self.0
    }

    pub fn from_offset(offset: usize) -> Sublevel {
        Sublevel(offset)
    }
}

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[repr(u8)]
pub enum LitVal {
    Undef,
    False,
    True,
}

impl LitVal {
    #[inline]
    fn is_undef(&self) -> bool {
        matches!(*self, LitVal::Undef)
    }
}

#[derive(Clone, Copy)]
pub struct VarData {
    pub reason: Option<clause::ClauseRef>,
    pub level: DecisionLevel,
    pub sublevel: Sublevel,
}

struct VarLine {
    assign: [LitVal; 2],
    vd: VarData,
}

/// Trail-based assignment store. Two nested notions of backtrack point are
/// kept: `lim` marks decision-level boundaries (classical CDCL), `sub_lim`
/// marks sublevel boundaries, which in non-blocking mode subdivide a
/// decision level every time the search chronologically flips a decision
/// without abandoning its level.
pub struct Assignment {
    assignment: Vec<VarLine>,
    free_vars: Vec<Var>,
    trail: Vec<Lit>,
    lim: Vec<usize>,
    sub_lim: Vec<usize>,
    /// One entry per open decision level: has its decision already been
    /// chronologically flipped? A binary variable has only two values, so
    /// once this is true the level is exhausted and backtracking must climb
    /// past it instead of flipping it again.
    flipped: Vec<bool>,
    qhead: usize,
}

impl Assignment {
    pub fn new() -> Assignment {
        Assignment {
            assignment: Vec::new(),
            free_vars: Vec::new(),
            trail: Vec::new(),
            lim: Vec::new(),
            sub_lim: Vec::new(),
            flipped: Vec::new(),
            qhead: 0,
        }
    }

    #[inline]
    pub fn number_of_vars(&self) -> usize {
        self.assignment.len()
    }

    #[inline]
    pub fn number_of_assigns(&self) -> usize {
        self.trail.len()
    }

    pub fn new_var(&mut self) -> Var {
        let line = VarLine {
            assign: [LitVal::Undef, LitVal::Undef],
            vd: VarData {
                reason: None,
                level: GROUND_LEVEL,
                sublevel: GROUND_SUBLEVEL,
            },
        };

        match self.free_vars.pop() {
            Some(var) => {
                self.assignment[var.index()] = line;
                var
            }
            None => {
                self.assignment.push(line);
                Var::from_index(self.assignment.len() - 1)
            }
        }
    }

    pub fn free_var(&mut self, v: Var) {
        self.free_vars.push(v);
    }

    #[inline]
    pub fn decision_level(&self) -> DecisionLevel {
        DecisionLevel(self.lim.len())
    }

    #[inline]
    pub fn sublevel(&self) -> Sublevel {
        Sublevel(self.sub_lim.len())
    }

    #[inline]
    pub fn is_ground_level(&self) -> bool {
        self.lim.is_empty()
    }

    /// Opens both a new decision level and a new sublevel.
    #[inline]
    pub fn new_decision_level(&mut self) {
        self.lim.push(self.trail.len());
        self.sub_lim.push(self.trail.len());
        self.flipped.push(false);
    }

    /// Opens a new sublevel only, used by the chronological flip: the
    /// decision level stays the same but subsequent assignments belong to a
    /// new sub-division of it.
    #[inline]
    pub fn new_sublevel(&mut self) {
        self.sub_lim.push(self.trail.len());
    }

    /// Has the decision at the current (topmost) decision level already been
    /// chronologically flipped? `false` at ground level.
    #[inline]
    pub fn current_level_flipped(&self) -> bool {
        *self.flipped.last().unwrap_or(&false)
    }

    #[inline]
    pub fn mark_current_level_flipped(&mut self) {
        if let Some(f) = self.flipped.last_mut() {
            *f = true;
        }
    }

    #[inline]
    pub fn assign_lit(&mut self, lit: Lit, reason: Option<clause::ClauseRef>) {
        let line = &mut self.assignment[lit.var_index()];
        assert!(line.assign[0].is_undef());
        line.assign[lit.sign_index()] = LitVal::True;
        line.assign[lit.sign_index() ^ 1] = LitVal::False;
        line.vd.level = DecisionLevel(self.lim.len());
        line.vd.sublevel = Sublevel(self.sub_lim.len());
        line.vd.reason = reason;
        self.trail.push(lit);
    }

    /// Pop assignments back until `decision_level() == target_level`,
    /// calling `f` for every undone literal (with the level it belonged to).
    #[inline]
    pub fn rewind_until_level<F: FnMut(DecisionLevel, Lit)>(
        &mut self,
        DecisionLevel(target_level): DecisionLevel,
        mut f: F,
    ) {
        while self.lim.len() > target_level {
            let level = self.trail.len();
            let bottom = self.lim.pop().unwrap();
            self.flipped.pop();
            while self.sub_lim.last().is_some_and(|&l| l >= bottom) {
                self.sub_lim.pop();
            }
            while self.trail.len() > bottom {
                let lit = self.trail.pop().unwrap();
                f(DecisionLevel(level), lit);

                let line = &mut self.assignment[lit.var_index()];
                line.assign = [LitVal::Undef, LitVal::Undef];
                line.vd.reason = None;
            }
        }
        self.qhead = cmp::min(self.qhead, self.trail.len());
    }

    /// Pop assignments back until `sublevel() == target`, without touching
    /// the decision level (used by the chronological flip and by sublevel
    /// conflict backtracking).
    #[inline]
    pub fn rewind_until_sublevel<F: FnMut(Lit)>(
        &mut self,
        Sublevel(target): Sublevel,
        mut f: F,
    ) {
        while self.sub_lim.len() > target {
            let bottom = self.sub_lim.pop().unwrap();
            while self.trail.len() > bottom {
                let lit = self.trail.pop().unwrap();
                f(lit);

                let line = &mut self.assignment[lit.var_index()];
                line.assign = [LitVal::Undef, LitVal::Undef];
                line.vd.reason = None;
            }
        }
        self.qhead = cmp::min(self.qhead, self.trail.len());
    }

    #[inline]
    pub fn dequeue_all(&mut self) {
        self.qhead = self.trail.len()
    }

    #[inline]
    pub fn dequeue(&mut self) -> Option<Lit> {
        if self.qhead < self.trail.len() {
            let p = self.trail[self.qhead];
            self.qhead += 1;
            Some(p)
        } else {
            None
        }
    }

    #[inline]
    pub fn is_undef(&self, var: Var) -> bool {
        self.assignment[var.index()].assign[0].is_undef()
    }

    #[inline]
    pub fn is_assigned_pos(&self, p: Lit) -> bool {
        matches!(self.of_lit(p), LitVal::True)
    }

    #[inline]
    pub fn is_assigned_neg(&self, p: Lit) -> bool {
        matches!(self.of_lit(p), LitVal::False)
    }

    #[inline]
    pub fn of_lit(&self, lit: Lit) -> LitVal {
        self.assignment[lit.var_index()].assign[lit.sign_index()]
    }

    #[inline]
    pub fn vardata(&self, lit: Lit) -> &VarData {
        let line = &self.assignment[lit.var_index()];
        assert_eq!(line.assign[lit.sign_index()], LitVal::False);
        &line.vd
    }

    #[inline]
    pub fn trail(&self) -> &[Lit] {
        &self.trail
    }

    /// The trail slice belonging to the most recent decision level.
    #[inline]
    pub fn trail_above(&self, DecisionLevel(level): DecisionLevel) -> &[Lit] {
        if level < self.lim.len() {
            &self.trail[self.lim[level]..]
        } else {
            &[]
        }
    }

    /// True if `v` is currently assigned and its assignment was a decision
    /// (or a chronological flip), i.e. has no antecedent clause — as opposed
    /// to a propagated literal.
    #[inline]
    pub fn is_decision(&self, v: Var) -> bool {
        let line = &self.assignment[v.index()];
        !line.assign[0].is_undef() && line.vd.reason.is_none()
    }

    pub fn is_locked(&self, ca: &clause::ClauseAllocator, cr: clause::ClauseRef) -> bool {
        let lit = ca.view(cr).head();
        let line = &self.assignment[lit.var_index()];
        if let LitVal::True = line.assign[lit.sign_index()] {
            line.vd.reason == Some(cr)
        } else {
            false
        }
    }
}

impl Default for Assignment {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Assignment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for level in 0..1 + self.lim.len() {
            let l = if level > 0 { self.lim[level - 1] } else { 0 };
            let r = if level < self.lim.len() {
                self.lim[level]
            } else {
                self.trail.len()
            };

            if r > l {
                write!(f, "[{}:", level)?;
                for lit in self.trail[l..r].iter() {
                    write!(f, " {:?}", lit)?;
                }
                write!(f, " ]")?;
            }
        }
        Ok(())
    }
}

pub fn extract_model(assigns: &Assignment) -> Vec<Lit> {
    let mut model = Vec::with_capacity(assigns.number_of_vars());
    for i in 0..assigns.assignment.len() {
        let v = Var::from_index(i);
        match assigns.assignment[i].assign[0] {
            LitVal::Undef => {}
            LitVal::False => model.push(v.neg_lit()),
            LitVal::True => model.push(v.pos_lit()),
        }
    }
    model
}

pub fn try_assign_lit(
    assigns: &mut Assignment,
    p: Lit,
    from: Option<clause::ClauseRef>,
) -> bool {
    match assigns.of_lit(p) {
        LitVal::True => true,
        LitVal::False => false,
        LitVal::Undef => {
            assigns.assign_lit(p, from);
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chronological_flip_opens_a_sublevel_without_a_decision_level() {
        let mut a = Assignment::new();
        let v = a.new_var();
        a.new_decision_level();
        a.assign_lit(v.neg_lit(), None);
        assert_eq!(a.decision_level(), DecisionLevel(1));
        assert_eq!(a.sublevel(), Sublevel(1));

        a.rewind_until_sublevel(Sublevel(0), |_| {});
        a.new_sublevel();
        a.assign_lit(v.pos_lit(), None);
        assert_eq!(a.decision_level(), DecisionLevel(1));
        assert_eq!(a.sublevel(), Sublevel(1));
    }
}
