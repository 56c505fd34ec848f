#[macro_use]
extern crate log;

use std::{fs, io, path, time};

pub mod backtrack;
pub mod budget;
pub mod cache;
pub mod clause_db;
pub mod conflict;
pub mod count;
pub mod decision;
pub mod dimacs;
pub mod formula;
pub mod obdd;
pub mod search;
pub mod watches;

use budget::Budget;
use search::{SearcherSettings, SolveOutcome};

pub struct Settings {
    pub searcher: SearcherSettings,
    pub strict: bool,
    /// Print the exact decimal solution count (`count::SolCount::exact_decimal`)
    /// instead of the saturating machine-word `Display` form.
    pub big_int: bool,
}

impl Default for Settings {
    fn default() -> Settings {
        Settings {
            searcher: SearcherSettings::default(),
            strict: false,
            big_int: false,
        }
    }
}

pub struct MainOptions {
    pub in_path: path::PathBuf,
    pub out_path: Option<path::PathBuf>,
    pub dot_path: Option<path::PathBuf>,
}

fn format_count(total: &count::SolCount, big_int: bool) -> String {
    if big_int {
        total.exact_decimal()
    } else {
        total.to_string()
    }
}

/// Trivial-UNSAT is reported with exit code 20, matching spec.md §6's CLI
/// contract; anything else returns 0 after a normal (possibly interrupted)
/// solve.
pub enum ExitStatus {
    Ok,
    TrivialUnsat,
}

pub fn solve(settings: Settings, options: MainOptions, budget: &Budget) -> io::Result<ExitStatus> {
    info!("============================[ Problem Statistics ]=============================");

    let start = time::Instant::now();
    let cnf = dimacs::parse_file(&options.in_path, settings.strict)?;
    let parse_time = start.elapsed();

    info!("|  Number of variables:  {:12}", cnf.num_vars);
    info!("|  Number of clauses:    {:12}", cnf.clauses.len());
    info!("|  Parse time:           {:12.2?}", parse_time);

    let mut searcher = match search::Searcher::from_cnf(settings.searcher, cnf) {
        Ok(s) => s,
        Err(()) => {
            info!("Trivial UNSAT detected while loading clauses");
            println!("UNSATISFIABLE");
            return Ok(ExitStatus::TrivialUnsat);
        }
    };

    let outcome = searcher.solve(budget);
    let cpu_time = start.elapsed();

    print_stats(&searcher.report(), settings.searcher, cpu_time);

    let result = match outcome {
        SolveOutcome::Done { total, root } => {
            println!("SATISFIABLE");
            println!("solutions {}", format_count(&total, settings.big_int));
            if let (Some(path), Some(root)) = (&options.out_path, root) {
                write_models(path, &searcher, root)?;
            }
            root
        }
        SolveOutcome::Interrupted { total, root } => {
            println!("INDETERMINATE");
            println!("solutions {}+", format_count(&total, settings.big_int));
            if let (Some(path), Some(root)) = (&options.out_path, root) {
                write_models(path, &searcher, root)?;
            }
            root
        }
    };

    if let (Some(path), Some(root)) = (&options.dot_path, result) {
        write_dot(path, &searcher, root)?;
    }

    Ok(ExitStatus::Ok)
}

fn write_models(path: &path::Path, searcher: &search::Searcher, root: obdd::NodeId) -> io::Result<()> {
    let mut out = fs::File::create(path)?;
    searcher.decompose_into(&mut out, root)?;
    Ok(())
}

fn write_dot(path: &path::Path, searcher: &search::Searcher, root: obdd::NodeId) -> io::Result<()> {
    let mut out = fs::File::create(path)?;
    searcher.to_dot_into(&mut out, root)?;
    Ok(())
}

fn print_stats(report: &search::Report, settings: SearcherSettings, cpu_time: time::Duration) {
    let secs = cpu_time.as_secs_f64();
    info!("restarts              : 0            (restarts are disabled)");
    info!("conflicts             : {:<12}   ({:.0} /sec)", report.conflicts, report.conflicts as f64 / secs.max(1e-9));
    info!("decisions             : {:<12}   ({:.0} /sec)", report.decisions, report.decisions as f64 / secs.max(1e-9));
    info!("propagations          : {:<12}   ({:.0} /sec)", report.propagations, report.propagations as f64 / secs.max(1e-9));

    let del_percent = if report.max_literals == 0 {
        0.0
    } else {
        100.0 * report.max_literals.saturating_sub(report.tot_literals) as f64 / report.max_literals as f64
    };
    info!("conflict literals     : {:<12}   ({:4.2} % deleted)", report.tot_literals, del_percent);

    info!("refreshes             : {:<12}", report.refreshes);
    info!("|obdd| (cumulative)   : {:<12}", report.obdd_nodes_created);
    info!("cache hits            : {:<12}", report.cache_hits);
    info!("cache lookups         : {:<12}", report.cache_lookups);
    info!("cache type            : {:?}", settings.cache_mode);
    info!("backtrack method      : {:?} (blocking = {})", settings.backtrack_policy, settings.blocking);
    info!("1-UIP variant         : {:?}", settings.granularity);
    info!("CPU time              : {:.2?}", cpu_time);
    info!("");
}
