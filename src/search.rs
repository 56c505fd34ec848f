//! Main search driver: wires clause storage, propagation, conflict analysis,
//! backtrack policy, the OBDD builder and the subspace cache into the
//! enumerate-all-models loop.
//!
//! Grounded on the teacher's `sat/minisat/search/mod.rs::Searcher`, generalised
//! per spec.md §4.8/§4.9. Two deliberate departures from that file, both
//! driven by spec.md's own text (recorded in DESIGN.md):
//!
//! - No restart machinery. §4.8's loop has no restart step (spec.md's
//!   Non-goals list restarts as explicitly disabled), so the teacher's
//!   `RestartStrategy`/Luby-sequence `LearningGuard` is dropped; only a
//!   simplified learnt-clause-reduction trigger (`|learnts| - qtail >=
//!   nof_learnts`, growing by a fixed factor after each reduction) survives.
//! - Blocking mode's conflict handling is plain non-chronological CDCL
//!   (`Backtracker::on_conflict_plain`), independent of the non-blocking
//!   `Policy` choice, which governs BT/BJ/CBJ/BJ+CBJ's chronological-flip
//!   behaviour instead.
//!
//! Per-variable OBDD nodes are built eagerly at decision time (not lazily
//! inside `extend`): every decided variable gets its own fresh node threaded
//! onto the path the moment it is decided, and `extend` is then left to do
//! only what its own contract promises — bridge the *propagated* variables
//! skipped in between. Variable index 0 is the sole exception: the OBDD root
//! is always pre-allocated labelled 1 (spec.md's "root is a fresh node
//! labelled 1"), so deciding variable 0 reuses the root rather than
//! allocating a second node for the same label.

use crate::backtrack::{self, Backtracker};
use crate::budget::Budget;
use crate::cache::{CacheManager, CacheMode};
use crate::clause_db::{ClauseDB, ClauseDBSettings};
use crate::conflict::{AnalyzeContext, CCMinMode, UipGranularity};
use crate::count::SolCount;
use crate::decision::{self, CacheLookupMode};
use crate::dimacs::ParsedCnf;
use crate::formula::assignment::*;
use crate::formula::clause::{ClauseAllocator, ClauseRef};
use crate::formula::Var;
use crate::obdd::{self, NodeId, ObddStore};
use crate::watches::Watches;

#[derive(Clone, Copy, Debug)]
pub struct SearcherSettings {
    pub blocking: bool,
    pub backtrack_policy: backtrack::Policy,
    pub granularity: UipGranularity,
    pub ccmin_mode_deep: bool,
    pub decide_mode: CacheLookupMode,
    pub cache_mode: Option<CacheMode>,
    /// `maxnodes`; `None` disables refresh (and is forced for blocking mode,
    /// which never refreshes).
    pub refresh_nodes: Option<u64>,
}

impl Default for SearcherSettings {
    fn default() -> SearcherSettings {
        SearcherSettings {
            blocking: false,
            backtrack_policy: backtrack::Policy::Cbj,
            granularity: UipGranularity::Decision,
            ccmin_mode_deep: true,
            decide_mode: CacheLookupMode::Eager,
            cache_mode: Some(CacheMode::Separator),
            refresh_nodes: None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Report {
    pub conflicts: u64,
    pub decisions: u64,
    pub propagations: u64,
    pub refreshes: u64,
    pub cache_hits: u64,
    pub cache_lookups: u64,
    pub num_clauses: usize,
    pub num_learnts: usize,
    pub max_literals: u64,
    pub tot_literals: u64,
    pub obdd_nodes_created: u64,
}

pub enum SolveOutcome {
    /// Enumeration complete; `total` is the exact solution count and `root`
    /// the final OBDD (`None` only if `n == 0`, the empty-formula case).
    Done { total: SolCount, root: Option<NodeId> },
    /// The budget's interrupt flag was observed; `total` accounts for every
    /// completed refresh period plus the partial tree built so far.
    Interrupted { total: SolCount, root: Option<NodeId> },
}

enum ModelEvent {
    Done,
    Continue,
}

/// Owns every piece of per-solve state: clause storage, the trail, the two
/// backtrack mechanisms (CDCL conflict handling and the chronological flip),
/// the OBDD under construction and the subspace cache.
pub struct Searcher {
    pub settings: SearcherSettings,
    n: usize,
    ca: ClauseAllocator,
    db: ClauseDB,
    assigns: Assignment,
    watches: Watches,
    analyze: AnalyzeContext,
    backtrack: Backtracker,
    obdd: ObddStore,
    root: NodeId,
    decision_nodes: Vec<Option<NodeId>>,
    cachedvars: Vec<bool>,
    cache: Option<CacheManager>,
    clause_refs: Vec<ClauseRef>,
    total: SolCount,
    learnts_qtail: usize,
    nof_learnts: f64,
    stats: Report,
}

impl Searcher {
    /// Load `cnf` and build a ready-to-solve `Searcher`, or report the
    /// trivial-UNSAT case spec.md's `addclause` discovers during loading
    /// (a unit clause conflicting with one already on the trail, or an
    /// explicit empty clause).
    pub fn from_cnf(settings: SearcherSettings, cnf: ParsedCnf) -> Result<Searcher, ()> {
        let n = cnf.num_vars;

        let mut ca = ClauseAllocator::new();
        let remove_satisfied = !matches!(settings.cache_mode, Some(CacheMode::Cutset));
        let mut db = ClauseDB::new(ClauseDBSettings {
            remove_satisfied,
            ..ClauseDBSettings::default()
        });
        let mut assigns = Assignment::new();
        let mut watches = Watches::new();
        let ccmin_mode = if settings.ccmin_mode_deep { CCMinMode::Deep } else { CCMinMode::Basic };
        let mut analyze = AnalyzeContext::new(ccmin_mode, settings.granularity);

        for _ in 0..n {
            let v = assigns.new_var();
            watches.init_var(v);
            analyze.init_var(v);
        }

        let mut clause_refs = Vec::new();
        let mut ok = true;
        for lits in cnf.clauses {
            if !add_clause(&mut ca, &mut db, &mut watches, &mut assigns, &mut clause_refs, lits) {
                ok = false;
                break;
            }
        }

        let mut obdd = ObddStore::new();
        let root = if n > 0 { obdd.node(1, None, None) } else { obdd::TOP };

        let cache = settings.cache_mode.map(|mode| match mode {
            CacheMode::Separator => CacheManager::new_separator(n, &ca, &clause_refs),
            CacheMode::Cutset => CacheManager::new_cutset(n, &ca, &clause_refs),
        });

        let num_clauses = db.stats.num_clauses;

        let searcher = Searcher {
            settings,
            n,
            ca,
            db,
            assigns,
            watches,
            analyze,
            backtrack: Backtracker::new(settings.backtrack_policy),
            obdd,
            root,
            decision_nodes: vec![None; n],
            cachedvars: vec![false; n],
            cache,
            clause_refs,
            total: SolCount::zero(),
            learnts_qtail: 0,
            nof_learnts: (num_clauses as f64 / 3.0).max(16.0),
            stats: Report::default(),
        };

        if ok {
            Ok(searcher)
        } else {
            Err(())
        }
    }

    /// Decompose the final OBDD into partial assignments, per spec.md §6's
    /// "Output (models)" contract. Requires `root` from a `SolveOutcome`
    /// returned by this same `solve` call.
    pub fn decompose_into<W: std::io::Write>(&self, out: &mut W, root: obdd::NodeId) -> std::io::Result<SolCount> {
        self.obdd.decompose(self.n, root, out)
    }

    /// Write the final OBDD as Graphviz `.dot`, behind `--dot`. A debug aid
    /// carried from the original's `obdd_to_dot`, not part of the solve
    /// result itself.
    pub fn to_dot_into<W: std::io::Write>(&self, out: &mut W, root: obdd::NodeId) -> std::io::Result<()> {
        self.obdd.to_dot(self.n, root, out)
    }

    pub fn report(&self) -> Report {
        let mut r = self.stats;
        r.propagations = self.watches.propagations;
        r.num_clauses = self.db.stats.num_clauses;
        r.num_learnts = self.db.stats.num_learnts;
        r.max_literals = self.analyze.max_literals;
        r.tot_literals = self.analyze.tot_literals;
        r.obdd_nodes_created = self.obdd.nnodes_created();
        r
    }

    pub fn solve(&mut self, budget: &Budget) -> SolveOutcome {
        if self.n == 0 {
            return SolveOutcome::Done { total: SolCount::one(), root: None };
        }

        loop {
            let confl = self.watches.propagate(&mut self.ca, &mut self.assigns);

            if let Some(confl) = confl {
                self.stats.conflicts += 1;
                self.db.decay_activity();
                if self.assigns.is_ground_level() {
                    return self.finish(false);
                }
                let outcome = if self.settings.blocking {
                    self.backtrack.on_conflict_plain(
                        &mut self.assigns,
                        &mut self.ca,
                        &mut self.db,
                        &mut self.watches,
                        &mut self.analyze,
                        confl,
                    )
                } else {
                    self.backtrack.on_conflict(
                        &mut self.assigns,
                        &mut self.ca,
                        &mut self.db,
                        &mut self.watches,
                        &mut self.analyze,
                        confl,
                    )
                };
                match outcome {
                    backtrack::Outcome::Exhausted => return self.finish(false),
                    backtrack::Outcome::Continue => {
                        self.clear_stale_decision_nodes();
                        continue;
                    }
                }
            }

            if budget.interrupted() {
                return self.finish(true);
            }

            if self.assigns.is_ground_level() {
                self.db.remove_satisfied(&mut self.ca, &self.assigns, |c| self.watches.unwatch_clause_lazy(c));
            }

            self.maybe_reduce();

            let start = self.last_decision_boundary();
            match decision::next_step(&self.assigns, start, self.settings.decide_mode) {
                decision::NextStep::Model => {
                    self.obdd.extend(self.root, obdd::TOP, &self.assigns, self.n);
                    if let ModelEvent::Done = self.model_event() {
                        return self.finish(false);
                    }
                }
                decision::NextStep::Decide { var, probe_boundaries } => {
                    let hit = self.probe_cache(&probe_boundaries);
                    match hit {
                        Some(node) => {
                            self.stats.cache_hits += 1;
                            self.obdd.extend(self.root, node, &self.assigns, self.n);
                            if let ModelEvent::Done = self.model_event() {
                                return self.finish(false);
                            }
                        }
                        None => self.decide(var),
                    }
                }
            }
        }
    }

    fn finish(&mut self, interrupted: bool) -> SolveOutcome {
        self.obdd.complete(Some(self.root));
        let count = self.obdd.nsols(self.n, self.root);
        self.total += &count;
        if interrupted {
            SolveOutcome::Interrupted { total: self.total.clone(), root: Some(self.root) }
        } else {
            SolveOutcome::Done { total: self.total.clone(), root: Some(self.root) }
        }
    }

    /// The variable index just past the most recent real decision — decisions
    /// always proceed in increasing index order under the fixed natural-order
    /// heuristic, so the highest index with a live `decision_nodes` entry is
    /// always the most recent one. Eager mode probes the cache starting here;
    /// Lazy mode only cares about `next_step`'s final boundary either way.
    fn last_decision_boundary(&self) -> usize {
        self.decision_nodes.iter().rposition(|d| d.is_some()).map(|i| i + 1).unwrap_or(0)
    }

    /// Probe every boundary `decision::next_step` offered, in order, stopping
    /// at the first hit. Eager mode offers the whole unassigned prefix so far
    /// (one lookup per still-undecided boundary since the last decision);
    /// Lazy mode offers exactly one, the end of the unassigned prefix.
    fn probe_cache(&mut self, probe_boundaries: &[usize]) -> Option<NodeId> {
        let cache = self.cache.as_ref()?;
        for &i in probe_boundaries {
            self.stats.cache_lookups += 1;
            let key = cache.fingerprint(i, &self.ca, &self.assigns);
            if let Some(node) = cache.lookup(i, &key) {
                return Some(node);
            }
        }
        None
    }

    fn decide(&mut self, var: Var) {
        self.stats.decisions += 1;
        self.place_decision_node(var);
        self.assigns.new_decision_level();
        self.assigns.assign_lit(decision::decision_literal(var), None);
    }

    /// Thread a fresh OBDD node for `var` onto the current path (or reuse
    /// the pre-allocated root, for variable index 0).
    fn place_decision_node(&mut self, var: Var) {
        let i = var.index();
        if i == 0 {
            self.decision_nodes[0] = Some(self.root);
        } else {
            let node = self.obdd.node(var.label() as u32, None, None);
            self.obdd.extend(self.root, node, &self.assigns, self.n);
            self.decision_nodes[i] = Some(node);
        }
    }

    fn model_event(&mut self) -> ModelEvent {
        self.insert_cache_until();

        if self.assigns.is_ground_level() {
            return ModelEvent::Done;
        }

        if self.settings.blocking {
            backtrack::blocking_on_model(&mut self.assigns, &mut self.ca, &mut self.db, &mut self.watches);
            self.clear_stale_decision_nodes();
            return ModelEvent::Continue;
        }

        if let Some(maxnodes) = self.settings.refresh_nodes {
            if self.obdd.nnodes_created() > maxnodes {
                self.refresh();
                return ModelEvent::Continue;
            }
        }

        if self.assigns.current_level_flipped() && !self.backtrack.climb_past_flipped_levels(&mut self.assigns) {
            self.clear_stale_decision_nodes();
            return ModelEvent::Done;
        }

        self.backtrack.chronological_flip(&mut self.assigns);
        self.clear_stale_decision_nodes();
        ModelEvent::Continue
    }

    /// spec.md §4.6's `insertcacheuntil`: for every boundary with a live
    /// decision node on the path just completed, insert its fingerprint once.
    fn insert_cache_until(&mut self) {
        if self.cache.is_none() {
            return;
        }
        for i in 0..self.n {
            if self.cachedvars[i] {
                continue;
            }
            if let Some(node) = self.decision_nodes[i] {
                let cache = self.cache.as_ref().unwrap();
                let key = cache.fingerprint(i, &self.ca, &self.assigns);
                self.cache.as_mut().unwrap().insert(i, &key, node);
                self.cachedvars[i] = true;
            }
        }
    }

    /// After any backtrack, a decision node whose variable became unassigned
    /// again no longer belongs to the live path.
    fn clear_stale_decision_nodes(&mut self) {
        for i in 0..self.n {
            if self.assigns.is_undef(Var::from_index(i)) {
                self.decision_nodes[i] = None;
                self.cachedvars[i] = false;
            }
        }
    }

    fn maybe_reduce(&mut self) {
        let learnts = self.db.number_of_learnts();
        if (learnts as f64 - self.learnts_qtail as f64) >= self.nof_learnts {
            let watches = &mut self.watches;
            self.db.reduce(&mut self.ca, &self.assigns, |c| watches.unwatch_clause_lazy(c));
            self.learnts_qtail = self.db.number_of_learnts();
            self.nof_learnts *= 1.1;
        }
    }

    /// Flush the current OBDD's count into `self.total`, free its nodes and
    /// restart construction from a fresh root, re-threading the prefix the
    /// current (still live) decision trail already picked out.
    fn refresh(&mut self) {
        self.obdd.complete(Some(self.root));
        let count = self.obdd.nsols(self.n, self.root);
        self.total += &count;
        self.obdd.delete_all(Some(self.root));

        self.root = self.obdd.node(1, None, None);
        self.cache = self.cache.as_ref().map(|cm| match cm.mode() {
            CacheMode::Separator => CacheManager::new_separator(self.n, &self.ca, &self.clause_refs),
            CacheMode::Cutset => CacheManager::new_cutset(self.n, &self.ca, &self.clause_refs),
        });
        self.decision_nodes = vec![None; self.n];
        self.cachedvars = vec![false; self.n];
        self.stats.refreshes += 1;

        for i in 0..self.n {
            let v = Var::from_index(i);
            if !self.assigns.is_undef(v) && self.assigns.is_decision(v) {
                self.place_decision_node(v);
            }
        }
    }
}

/// spec.md §4.9's `addclause`: drop always-false literals, sort and dedup,
/// detect tautologies and already-satisfied clauses, then dispatch on the
/// surviving length. Returns `false` only on an irrecoverable empty clause or
/// a unit clause conflicting with one already on the (root-level) trail.
fn add_clause(
    ca: &mut ClauseAllocator,
    db: &mut ClauseDB,
    watches: &mut Watches,
    assigns: &mut Assignment,
    clause_refs: &mut Vec<ClauseRef>,
    mut lits: Vec<crate::formula::Lit>,
) -> bool {
    lits.retain(|&l| !assigns.is_assigned_neg(l));
    lits.sort_by_key(|l| (l.var_index(), l.sign_index()));
    lits.dedup();

    for w in lits.windows(2) {
        if w[0].var() == w[1].var() {
            return true; // tautology: clause is vacuously satisfied, skip it
        }
    }
    if lits.iter().any(|&l| assigns.is_assigned_pos(l)) {
        return true; // already satisfied at the root level, skip it
    }

    match lits.len() {
        0 => false,
        1 => try_assign_lit(assigns, lits[0], None),
        _ => {
            let cr = db.add_clause(ca, lits);
            watches.watch_clause(ca.view(cr), cr);
            clause_refs.push(cr);
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula::Lit;

    fn cnf(num_vars: usize, clauses: &[&[i32]]) -> ParsedCnf {
        ParsedCnf {
            num_vars,
            clauses: clauses
                .iter()
                .map(|c| {
                    c.iter()
                        .map(|&id| Var::from_index((id.unsigned_abs() - 1) as usize).lit(id < 0))
                        .collect::<Vec<Lit>>()
                })
                .collect(),
        }
    }

    #[test]
    fn single_unit_clause_has_exactly_one_model() {
        // scenario A: p cnf 1 1 / 1 0
        let settings = SearcherSettings::default();
        let mut s = Searcher::from_cnf(settings, cnf(1, &[&[1]])).unwrap();
        match s.solve(&Budget::new()) {
            SolveOutcome::Done { total, .. } => assert_eq!(total.exact_decimal(), "1"),
            _ => panic!("expected Done"),
        }
    }

    #[test]
    fn zero_clauses_over_two_vars_has_four_models() {
        // scenario B
        let settings = SearcherSettings::default();
        let mut s = Searcher::from_cnf(settings, cnf(2, &[])).unwrap();
        match s.solve(&Budget::new()) {
            SolveOutcome::Done { total, .. } => assert_eq!(total.exact_decimal(), "4"),
            _ => panic!("expected Done"),
        }
    }

    #[test]
    fn three_var_two_clause_formula_has_five_models() {
        // scenario C: p cnf 3 2 / 1 2 0 / -1 3 0
        let settings = SearcherSettings::default();
        let mut s = Searcher::from_cnf(settings, cnf(3, &[&[1, 2], &[-1, 3]])).unwrap();
        match s.solve(&Budget::new()) {
            SolveOutcome::Done { total, .. } => assert_eq!(total.exact_decimal(), "5"),
            _ => panic!("expected Done"),
        }
    }

    #[test]
    fn contradictory_unit_clauses_are_trivially_unsat() {
        // scenario D: p cnf 2 2 / 1 0 / -1 0
        let settings = SearcherSettings::default();
        let r = Searcher::from_cnf(settings, cnf(2, &[&[1], &[-1]]));
        assert!(r.is_err());
    }

    #[test]
    fn blocking_mode_agrees_with_non_blocking_on_model_count() {
        let blocking = SearcherSettings { blocking: true, ..SearcherSettings::default() };
        let mut sb = Searcher::from_cnf(blocking, cnf(3, &[&[1, 2], &[-1, 3]])).unwrap();
        let total_blocking = match sb.solve(&Budget::new()) {
            SolveOutcome::Done { total, .. } => total,
            _ => panic!("expected Done"),
        };

        let non_blocking = SearcherSettings { blocking: false, ..SearcherSettings::default() };
        let mut snb = Searcher::from_cnf(non_blocking, cnf(3, &[&[1, 2], &[-1, 3]])).unwrap();
        let total_non_blocking = match snb.solve(&Budget::new()) {
            SolveOutcome::Done { total, .. } => total,
            _ => panic!("expected Done"),
        };

        assert_eq!(total_blocking, total_non_blocking);
    }

    #[test]
    fn pigeonhole_php_3_2_is_unsatisfiable() {
        // 3 pigeons, 2 holes: vars 1..6, x_{i,j} = pigeon i in hole j
        let clauses: &[&[i32]] = &[
            &[1, 2],    // pigeon 1 in hole 1 or 2
            &[3, 4],    // pigeon 2
            &[5, 6],    // pigeon 3
            &[-1, -3],  // not both pigeon 1 and 2 in hole 1
            &[-1, -5],
            &[-3, -5],
            &[-2, -4], // not both pigeon 1 and 2 in hole 2
            &[-2, -6],
            &[-4, -6],
        ];
        let settings = SearcherSettings::default();
        let mut s = Searcher::from_cnf(settings, cnf(6, clauses)).unwrap();
        match s.solve(&Budget::new()) {
            SolveOutcome::Done { total, .. } => assert!(total.is_zero()),
            _ => panic!("expected Done"),
        }
    }
}
