use super::assignment::Assignment;
use super::{Lit, Var};

pub fn calc_abstraction(lits: &[Lit]) -> u32 {
    let mut abstraction: u32 = 0;
    for lit in lits {
        abstraction |= lit.abstraction();
    }
    abstraction
}

pub fn satisfied_with_assignment(clause: &[Lit], assignment: &Assignment) -> bool {
    clause.iter().any(|&lit| assignment.is_assigned_pos(lit))
}

/// Resolve `ps` and `qs` over pivot `v` (each contains exactly one literal of
/// `v`, of opposite sign). The two clauses must not carry a second
/// complementary pair outside the pivot; by construction (CBJ only ever folds
/// a clause into the clause that immediately caused its own flip) this cannot
/// arise, so it is an internal invariant violation, not a case to handle.
///
/// Grounded on spec.md §9's design note on `perform_resolution`: the original
/// asserts this rather than handling it, and an implementer is told to add a
/// regression test constructing inputs that would violate it.
pub fn resolve(v: Var, ps: &[Lit], qs: &[Lit]) -> Option<Vec<Lit>> {
    let (longer, shorter) = if ps.len() < qs.len() {
        (qs, ps)
    } else {
        (ps, qs)
    };

    let mut res = Vec::with_capacity(longer.len() + shorter.len());
    for &qsi in shorter {
        if qsi.var() != v {
            let mut ok = true;
            for &psj in longer {
                if psj.var() == qsi.var() {
                    if psj == !qsi {
                        debug_assert!(false, "resolve: {:?} and {:?} cancel outside the pivot {:?}", psj, qsi, v);
                        return None;
                    } else {
                        ok = false;
                        break;
                    }
                }
            }
            if ok {
                res.push(qsi);
            }
        }
    }

    for &lit in longer {
        if lit.var() != v {
            res.push(lit);
        }
    }

    Some(res)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula::Var;

    #[test]
    fn resolution_of_abc_and_not_a_b_d_is_b_c_d() {
        let a = Var::from_index(0);
        let b = Var::from_index(1);
        let c = Var::from_index(2);
        let d = Var::from_index(3);

        let ps = vec![a.pos_lit(), b.pos_lit(), c.pos_lit()];
        let qs = vec![a.neg_lit(), b.pos_lit(), d.pos_lit()];

        let r = resolve(a, &ps, &qs).unwrap();
        let mut vars: Vec<_> = r.iter().map(|l| l.var()).collect();
        vars.sort_by_key(|v| v.index());
        assert_eq!(vars, vec![b, c, d]);
    }

    #[test]
    #[should_panic]
    fn resolution_rejects_mid_cancellation() {
        let a = Var::from_index(0);
        let b = Var::from_index(1);

        let ps = vec![a.pos_lit(), b.pos_lit()];
        let qs = vec![a.neg_lit(), b.neg_lit()];

        resolve(a, &ps, &qs);
    }
}
