use std::cmp::Ordering;

use crate::formula::assignment::Assignment;
use crate::formula::clause::*;
use crate::formula::util::*;

pub struct ClauseDBSettings {
    /// Whether `remove_satisfied` does the (possibly expensive) linear scan
    /// over the original clause set too, not just learnt clauses.
    pub remove_satisfied: bool,
    pub clause_decay: f64,
}

impl Default for ClauseDBSettings {
    fn default() -> ClauseDBSettings {
        ClauseDBSettings {
            remove_satisfied: true,
            clause_decay: 0.999,
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Stats {
    pub num_clauses: usize,
    pub num_learnts: usize,
    pub clauses_literals: u64,
    pub learnts_literals: u64,
}

impl Stats {
    fn add(&mut self, clause: &Clause) {
        if clause.is_learnt() {
            self.num_learnts += 1;
            self.learnts_literals += clause.len() as u64;
        } else {
            self.num_clauses += 1;
            self.clauses_literals += clause.len() as u64;
        }
    }

    fn del(&mut self, clause: &Clause) {
        if clause.is_learnt() {
            self.num_learnts -= 1;
            self.learnts_literals -= clause.len() as u64;
        } else {
            self.num_clauses -= 1;
            self.clauses_literals -= clause.len() as u64;
        }
    }
}

/// Owns the problem/learnt clause reference lists and activity bookkeeping
/// on top of a shared `ClauseAllocator`.
pub struct ClauseDB {
    pub settings: ClauseDBSettings,
    cla_inc: f64,
    clauses: Vec<ClauseRef>,
    learnts: Vec<ClauseRef>,
    pub stats: Stats,
}

impl ClauseDB {
    pub fn new(settings: ClauseDBSettings) -> ClauseDB {
        ClauseDB {
            settings,
            cla_inc: 1.0,
            clauses: Vec::new(),
            learnts: Vec::new(),
            stats: Stats::default(),
        }
    }

    pub fn add_clause(&mut self, ca: &mut ClauseAllocator, literals: Vec<crate::formula::Lit>) -> ClauseRef {
        let cr = ca.alloc(literals, false);
        self.stats.add(ca.view(cr));
        self.clauses.push(cr);
        cr
    }

    pub fn learn_clause(&mut self, ca: &mut ClauseAllocator, literals: Vec<crate::formula::Lit>) -> ClauseRef {
        let cr = ca.alloc(literals, true);
        self.stats.add(ca.view(cr));
        self.learnts.push(cr);
        self.bump_activity(ca, cr);
        cr
    }

    pub fn remove_clause(&mut self, ca: &mut ClauseAllocator, cr: ClauseRef) {
        self.stats.del(ca.view(cr));
        ca.free(cr);
    }

    pub fn bump_activity(&mut self, ca: &mut ClauseAllocator, cr: ClauseRef) {
        let c = ca.edit(cr);
        if !c.is_learnt() {
            return;
        }
        let new = c.activity() + self.cla_inc;
        c.set_activity(new);

        if new > 1e20 {
            self.cla_inc *= 1e-20;
            for &cri in self.learnts.iter() {
                let c = ca.edit(cri);
                let scaled = c.activity() * 1e-20;
                c.set_activity(scaled);
            }
        }
    }

    pub fn decay_activity(&mut self) {
        self.cla_inc *= 1.0 / self.settings.clause_decay;
    }

    pub fn number_of_learnts(&self) -> usize {
        self.learnts.len()
    }

    /// Remove half of the learnt clauses by ascending activity, skipping
    /// binary clauses and clauses locked as a reason by the current trail.
    pub fn reduce<F: FnMut(&Clause)>(
        &mut self,
        ca: &mut ClauseAllocator,
        assigns: &Assignment,
        mut notify: F,
    ) {
        self.learnts.sort_by(|&rx, &ry| {
            let x = ca.view(rx);
            let y = ca.view(ry);
            if x.len() == 2 && y.len() == 2 {
                Ordering::Equal
            } else if x.len() == 2 {
                Ordering::Greater
            } else if y.len() == 2 {
                Ordering::Less
            } else {
                x.activity().partial_cmp(&y.activity()).unwrap()
            }
        });

        let index_lim = self.learnts.len() / 2;
        let extra_lim = if self.learnts.is_empty() {
            0.0
        } else {
            self.cla_inc / self.learnts.len() as f64
        };
        let stats = &mut self.stats;

        let mut i = 0;
        self.learnts.retain(|&cr| {
            if ca.is_deleted(cr) {
                i += 1;
                return false;
            }

            let remove = {
                let c = ca.view(cr);
                c.len() > 2
                    && !assigns.is_locked(ca, cr)
                    && (i < index_lim || c.activity() < extra_lim)
            };

            if remove {
                notify(ca.view(cr));
                stats.del(ca.view(cr));
                ca.free(cr);
            }

            i += 1;
            !remove
        });
    }

    fn retain_clause<F: FnMut(&Clause)>(
        stats: &mut Stats,
        ca: &mut ClauseAllocator,
        assigns: &Assignment,
        notify: &mut F,
        cr: ClauseRef,
    ) -> bool {
        if ca.is_deleted(cr) {
            return false;
        }
        if satisfied_with_assignment(ca.view(cr).lits(), assigns) {
            notify(ca.view(cr));
            stats.del(ca.view(cr));
            ca.free(cr);
            return false;
        }

        let c = ca.edit(cr);
        c.retain_from(2, |lit| !assigns.is_assigned_neg(lit));
        true
    }

    /// Drop satisfied clauses and shrink the rest, dropping literals falsified
    /// outside the two watched positions. Only safe to call at the ground
    /// decision level.
    pub fn remove_satisfied<F>(&mut self, ca: &mut ClauseAllocator, assigns: &Assignment, mut notify: F)
    where
        F: FnMut(&Clause),
    {
        let stats = &mut self.stats;
        self.learnts
            .retain(|&cr| Self::retain_clause(stats, ca, assigns, &mut notify, cr));

        if self.settings.remove_satisfied {
            self.clauses
                .retain(|&cr| Self::retain_clause(stats, ca, assigns, &mut notify, cr));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula::Var;

    #[test]
    fn learnt_clause_is_counted_and_activity_bumped() {
        let mut ca = ClauseAllocator::new();
        let mut db = ClauseDB::new(ClauseDBSettings::default());
        let a = Var::from_index(0);
        let b = Var::from_index(1);
        let cr = db.learn_clause(&mut ca, vec![a.pos_lit(), b.pos_lit()]);
        assert_eq!(db.stats.num_learnts, 1);
        assert!(ca.view(cr).activity() > 0.0);
    }

    #[test]
    fn remove_satisfied_drops_satisfied_original_clauses() {
        let mut ca = ClauseAllocator::new();
        let mut db = ClauseDB::new(ClauseDBSettings::default());
        let mut assigns = Assignment::new();
        let a = assigns.new_var();
        let b = assigns.new_var();
        db.add_clause(&mut ca, vec![a.pos_lit(), b.pos_lit()]);
        assigns.assign_lit(a.pos_lit(), None);

        db.remove_satisfied(&mut ca, &assigns, |_| {});
        assert_eq!(db.stats.num_clauses, 0);
    }
}
