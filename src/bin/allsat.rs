#[macro_use]
extern crate clap;
#[macro_use]
extern crate log;
extern crate env_logger;

use std::path::PathBuf;
use std::process;

use allsat_obdd::backtrack::Policy;
use allsat_obdd::cache::CacheMode;
use allsat_obdd::conflict::UipGranularity;
use allsat_obdd::decision::CacheLookupMode;
use allsat_obdd::search::SearcherSettings;
use allsat_obdd::{solve, budget::Budget, ExitStatus, MainOptions, Settings};

fn main() {
    let matches = clap::App::new("allsat")
        .version(&crate_version!()[..])
        .about("Enumerate all satisfying assignments of a CNF as an OBDD")
        .arg(clap::Arg::with_name("input").required(true).help("DIMACS CNF input file"))
        .arg(clap::Arg::with_name("output").required(false).help("Decomposed-model output file"))
        .arg(clap::Arg::with_name("strict").long("strict").help("Validate the DIMACS header during parsing"))
        .arg(clap::Arg::with_name("blocking").long("blocking").help("Use blocking mode (learn a blocking clause per model)"))
        .arg(
            clap::Arg::with_name("backtrack")
                .long("backtrack")
                .takes_value(true)
                .possible_values(&["bt", "bj", "cbj", "bjcbj"])
                .help("Non-blocking backtrack policy (default: cbj)"),
        )
        .arg(
            clap::Arg::with_name("uip")
                .long("uip")
                .takes_value(true)
                .possible_values(&["decision", "sublevel"])
                .help("1-UIP granularity (default: decision)"),
        )
        .arg(
            clap::Arg::with_name("cache")
                .long("cache")
                .takes_value(true)
                .possible_values(&["separator", "cutset", "off"])
                .help("Subspace-equivalence cache mode (default: separator)"),
        )
        .arg(
            clap::Arg::with_name("decide")
                .long("decide")
                .takes_value(true)
                .possible_values(&["eager", "lazy"])
                .help("Cache lookup granularity (default: eager)"),
        )
        .arg(clap::Arg::with_name("refresh-nodes").long("refresh-nodes").short("n").takes_value(true).help("maxnodes: refresh (flush and restart) the OBDD once this many nodes have been created; 0 disables"))
        .arg(clap::Arg::with_name("reduce").long("reduce").help("Enable the external reduced-BDD pass (reported only; not performed by this crate)"))
        .arg(clap::Arg::with_name("big-int").long("big-int").help("Print the exact decimal solution count instead of the saturating machine-word view"))
        .arg(clap::Arg::with_name("dot").long("dot").takes_value(true).help("Write the final OBDD to PATH in Graphviz dot format"))
        .get_matches();

    env_logger::init();

    let backtrack_policy = match matches.value_of("backtrack") {
        Some("bt") => Policy::Bt,
        Some("bj") => Policy::Bj,
        Some("bjcbj") => Policy::BjPlusCbj,
        _ => Policy::Cbj,
    };
    let granularity = match matches.value_of("uip") {
        Some("sublevel") => UipGranularity::Sublevel,
        _ => UipGranularity::Decision,
    };
    let cache_mode = match matches.value_of("cache") {
        Some("cutset") => Some(CacheMode::Cutset),
        Some("off") => None,
        _ => Some(CacheMode::Separator),
    };
    let decide_mode = match matches.value_of("decide") {
        Some("lazy") => CacheLookupMode::Lazy,
        _ => CacheLookupMode::Eager,
    };
    let refresh_nodes = matches
        .value_of("refresh-nodes")
        .and_then(|s| s.parse::<u64>().ok())
        .filter(|&n| n > 0);

    if matches.is_present("reduce") {
        info!("--reduce requested: the reduced-BDD pass is an external collaborator, not performed here");
    }

    let settings = Settings {
        searcher: SearcherSettings {
            blocking: matches.is_present("blocking"),
            backtrack_policy,
            granularity,
            ccmin_mode_deep: true,
            decide_mode,
            cache_mode,
            refresh_nodes,
        },
        strict: matches.is_present("strict"),
        big_int: matches.is_present("big-int"),
    };

    let options = MainOptions {
        in_path: PathBuf::from(matches.value_of("input").unwrap()),
        out_path: matches.value_of("output").map(PathBuf::from),
        dot_path: matches.value_of("dot").map(PathBuf::from),
    };

    let budget = Budget::new();
    match solve(settings, options, &budget) {
        Ok(ExitStatus::Ok) => process::exit(0),
        Ok(ExitStatus::TrivialUnsat) => process::exit(20),
        Err(e) => {
            eprintln!("PARSE ERROR! {}", e);
            process::exit(1);
        }
    }
}
