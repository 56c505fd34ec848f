//! Decision driver: fixed natural variable order `0..n-1`, negative phase by
//! default. No activity heap — OBDD variable order is a fixed input-dependent
//! ordering the cache construction depends on, so the decision heuristic
//! must follow it rather than a VSIDS-style activity queue.

use crate::formula::assignment::Assignment;
use crate::formula::Var;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CacheLookupMode {
    /// Compute and probe the cache fingerprint at every newly reached
    /// variable boundary.
    Eager,
    /// Skip straight to the end of the unassigned prefix; only probe the
    /// cache once, at that single point.
    Lazy,
}

/// Either a model (no unassigned variable left, no cache hit along the way)
/// or the next variable to decide on — paired with any boundaries an eager
/// lookup should be tried at on the way there.
pub enum NextStep {
    Model,
    Decide { var: Var, probe_boundaries: Vec<usize> },
}

/// Advance `nextvar` to the next unassigned variable starting from
/// `start`, honoring `mode`. `probe_boundaries` always names the boundaries
/// (0-based variable indices) whose cache fingerprint the caller should
/// compute and look up before committing to the returned decision.
pub fn next_step(assigns: &Assignment, start: usize, mode: CacheLookupMode) -> NextStep {
    let n = assigns.number_of_vars();

    match mode {
        CacheLookupMode::Eager => {
            for i in start..n {
                if assigns.is_undef(Var::from_index(i)) {
                    return NextStep::Decide {
                        var: Var::from_index(i),
                        probe_boundaries: (start..=i).collect(),
                    };
                }
            }
            NextStep::Model
        }
        CacheLookupMode::Lazy => {
            let mut i = start;
            while i < n && !assigns.is_undef(Var::from_index(i)) {
                i += 1;
            }
            if i >= n {
                NextStep::Model
            } else {
                NextStep::Decide {
                    var: Var::from_index(i),
                    probe_boundaries: vec![i],
                }
            }
        }
    }
}

/// The fixed decision phase: always negative, per the contract that the
/// OBDD builder's `lo`-first enumeration assumes.
#[inline]
pub fn decision_literal(v: Var) -> crate::formula::Lit {
    v.neg_lit()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_lowest_unassigned_index_in_natural_order() {
        let mut assigns = Assignment::new();
        let a = assigns.new_var();
        let b = assigns.new_var();
        let _c = assigns.new_var();
        assigns.new_decision_level();
        assigns.assign_lit(a.neg_lit(), None);

        match next_step(&assigns, 0, CacheLookupMode::Eager) {
            NextStep::Decide { var, .. } => assert_eq!(var, b),
            NextStep::Model => panic!("expected a decision"),
        }
    }

    #[test]
    fn decision_phase_is_always_negative() {
        let v = Var::from_index(0);
        assert!(decision_literal(v).sign());
    }

    #[test]
    fn all_assigned_is_a_model() {
        let mut assigns = Assignment::new();
        let a = assigns.new_var();
        assigns.new_decision_level();
        assigns.assign_lit(a.pos_lit(), None);

        match next_step(&assigns, 0, CacheLookupMode::Lazy) {
            NextStep::Model => {}
            NextStep::Decide { .. } => panic!("expected a model"),
        }
    }
}
