//! Sequin's global configuration.
//!
//! Built once from clap, then accessed through the `conf` lazy static in
//! [`common`](../index.html). When embedded as a library the process
//! arguments may belong to someone else (a test harness for instance), so
//! unparseable argument vectors silently fall back to the defaults.

use std::time::Instant;

use ansi_term::{Colour, Style};
use clap::Arg;

use crate::errors::*;

/// Clap `Command`.
pub type App = ::clap::Command<'static>;
/// Clap `ArgMatches`.
pub type Matches = ::clap::ArgMatches;

/// Validates boolean arguments.
fn bool_validator(s: &str) -> ::std::result::Result<(), String> {
    if bool_of_str(s).is_some() {
        Ok(())
    } else {
        Err(format!("expected `on/true` or `off/false`, got `{}`", s))
    }
}

/// Boolean of a string.
fn bool_of_str(s: &str) -> Option<bool> {
    match s {
        "on" | "true" | "yes" => Some(true),
        "off" | "false" | "no" => Some(false),
        _ => None,
    }
}

/// Boolean of some matches.
///
/// Assumes a default is provided.
fn bool_of_matches(matches: &Matches, key: &str) -> bool {
    matches
        .value_of(key)
        .and_then(bool_of_str)
        .expect("failed to retrieve boolean argument")
}

/// Usize of some matches.
///
/// Assumes a default is provided.
fn usize_of_matches(matches: &Matches, key: &str) -> usize {
    matches
        .value_of(key)
        .and_then(|s| s.parse().ok())
        .expect("failed to retrieve integer argument")
}

/// Nested-oracle (SMT solver) configuration.
pub struct SmtConf {
    /// Command used to call z3.
    pub z3_cmd: String,
}
impl SmtConf {
    /// Actual, `rsmt2` solver configuration.
    pub fn conf(&self) -> ::rsmt2::SmtConf {
        let mut conf = ::rsmt2::SmtConf::default_z3();
        conf.cmd(self.z3_cmd.clone());
        conf
    }

    /// Adds clap options to a clap `Command`.
    pub fn add_args(app: App) -> App {
        app.arg(
            Arg::new("z3_cmd")
                .long("--z3")
                .help("sets the command used to call z3 (nested checks)")
                .default_value("z3")
                .takes_value(true)
                .number_of_values(1),
        )
    }

    /// Creates itself from some matches.
    pub fn new(matches: &Matches) -> Self {
        let z3_cmd = matches
            .value_of("z3_cmd")
            .expect("unreachable(z3_cmd): default is provided")
            .to_string();
        SmtConf { z3_cmd }
    }
}

/// Cascade configuration.
pub struct CascadeConf {
    /// (De)activates length-based splitting (tactic 6).
    pub split_on_len: bool,
    /// Initial adaptive unfolding depth.
    pub init_depth: usize,
    /// Maximal literal length for unit-variable branching.
    pub branch_unit_max: usize,
    /// Validation mode: re-check every emitted axiom/conflict on a
    /// disposable oracle instance.
    pub validate: bool,
    /// Seed for the tie-breaking rng.
    pub seed: u64,
}
impl CascadeConf {
    /// Adds clap options to a clap `Command`.
    pub fn add_args(app: App) -> App {
        app.arg(
            Arg::new("split_on_len")
                .long("--split_on_len")
                .help("(de)activates length-based equation splitting")
                .validator(bool_validator)
                .default_value("on")
                .takes_value(true)
                .number_of_values(1),
        )
        .arg(
            Arg::new("init_depth")
                .long("--init_depth")
                .help("initial bound on automaton unfolding depth")
                .default_value("1")
                .takes_value(true)
                .number_of_values(1),
        )
        .arg(
            Arg::new("branch_unit_max")
                .long("--branch_unit_max")
                .help("maximal known length for unit-variable branching")
                .default_value("20")
                .takes_value(true)
                .number_of_values(1),
        )
        .arg(
            Arg::new("validate")
                .long("--validate")
                .help("re-checks every emitted axiom on a disposable oracle")
                .validator(bool_validator)
                .default_value("off")
                .takes_value(true)
                .number_of_values(1),
        )
        .arg(
            Arg::new("seed")
                .long("--seed")
                .help("seed for the tie-breaking rng")
                .default_value("42")
                .takes_value(true)
                .number_of_values(1),
        )
    }

    /// Creates itself from some matches.
    pub fn new(matches: &Matches) -> Self {
        CascadeConf {
            split_on_len: bool_of_matches(matches, "split_on_len"),
            init_depth: usize_of_matches(matches, "init_depth"),
            branch_unit_max: usize_of_matches(matches, "branch_unit_max"),
            validate: bool_of_matches(matches, "validate"),
            seed: usize_of_matches(matches, "seed") as u64,
        }
    }
}

/// Global configuration.
pub struct Config {
    /// Verbosity.
    pub verb: usize,
    /// Print statistics on exit.
    pub stats: bool,
    /// Timeout in seconds, none if zero.
    pub timeout: Option<usize>,
    /// Instant the configuration was created, for the cooperative
    /// resource-limit check.
    start: Instant,
    /// Nested-oracle configuration.
    pub solver: SmtConf,
    /// Cascade configuration.
    pub cascade: CascadeConf,
    /// Styles, for coloured output.
    styles: Styles,
}
impl Config {
    /// Builds the configuration from the process arguments.
    pub fn clap() -> Self {
        let app = App::new("sequin")
            .about("a cascading decision procedure for sequence constraints")
            .arg(
                Arg::new("verb")
                    .short('v')
                    .help("increases verbosity")
                    .multiple_occurrences(true),
            )
            .arg(
                Arg::new("stats")
                    .long("--stats")
                    .help("prints statistics on exit")
                    .validator(bool_validator)
                    .default_value("off")
                    .takes_value(true)
                    .number_of_values(1),
            )
            .arg(
                Arg::new("timeout")
                    .long("--timeout")
                    .short('t')
                    .help("sets a timeout in seconds, `0` for none")
                    .default_value("0")
                    .takes_value(true)
                    .number_of_values(1),
            );
        let app = SmtConf::add_args(app);
        let app = CascadeConf::add_args(app);

        // The process arguments might not be ours (library embedding, test
        // harness): fall back to defaults when they do not parse.
        let matches = app
            .clone()
            .try_get_matches()
            .unwrap_or_else(|_| app.get_matches_from(vec!["sequin"]));

        let verb = matches.occurrences_of("verb") as usize;
        let stats = bool_of_matches(&matches, "stats");
        let timeout = match usize_of_matches(&matches, "timeout") {
            0 => None,
            n => Some(n),
        };

        Config {
            verb,
            stats,
            timeout,
            start: Instant::now(),
            solver: SmtConf::new(&matches),
            cascade: CascadeConf::new(&matches),
            styles: Styles::new(atty::is(atty::Stream::Stdout)),
        }
    }

    /// Fails with a timeout error if the resource limit is reached.
    ///
    /// Consulted at points of unbounded work (automaton unfolding,
    /// extensionality over many terms).
    pub fn check_timeout(&self) -> Res<()> {
        if let Some(timeout) = self.timeout {
            if self.start.elapsed().as_secs() as usize >= timeout {
                bail!(ErrorKind::Timeout)
            }
        }
        Ok(())
    }

    /// String emphasis.
    pub fn emph<S: AsRef<str>>(&self, s: S) -> String {
        format!("{}", self.styles.emph.paint(s.as_ref()))
    }
    /// Happy string.
    pub fn happy<S: AsRef<str>>(&self, s: S) -> String {
        format!("{}", self.styles.happy.paint(s.as_ref()))
    }
    /// Sad string.
    pub fn sad<S: AsRef<str>>(&self, s: S) -> String {
        format!("{}", self.styles.sad.paint(s.as_ref()))
    }
    /// Bad string.
    pub fn bad<S: AsRef<str>>(&self, s: S) -> String {
        format!("{}", self.styles.bad.paint(s.as_ref()))
    }
}

/// Contains some styles for coloured printing.
struct Styles {
    /// Emphasis style.
    emph: Style,
    /// Happy style.
    happy: Style,
    /// Sad style.
    sad: Style,
    /// Bad style.
    bad: Style,
}
impl Styles {
    /// Constructor, with or without colours.
    fn new(colored: bool) -> Self {
        if colored {
            Styles {
                emph: Style::new().bold(),
                happy: Colour::Green.bold(),
                sad: Colour::Yellow.bold(),
                bad: Colour::Red.bold(),
            }
        } else {
            Styles {
                emph: Style::new(),
                happy: Style::new(),
                sad: Style::new(),
                bad: Style::new(),
            }
        }
    }
}
