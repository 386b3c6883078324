use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    version,
    about = "EVB toolkit - build per-window EVB topologies for GROMACS and map the sampled energies onto a free-energy profile.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Merge reactant and product parameters into one topology per lambda window.
    Build(BuildArgs),
    /// Map sampled window energies onto a free-energy profile along the energy gap.
    Map(MapArgs),
    /// Summarise barriers read directly from replica profiles.
    Stats(StatsArgs),
    /// Fit polynomials to replica profiles and summarise the fitted barriers.
    Fit(FitArgs),
    /// Export sampled window energies as Q `qfep` input files.
    Qfep(QfepArgs),
    /// Export sampled window energies as gap files for the Molaris mapping program.
    Molaris(MolarisArgs),
    /// Summarise barriers from Molaris `dG_dE.graph` replica curves.
    MolarisStats(MolarisStatsArgs),
}

/// Arguments for the `build` subcommand.
#[derive(Args, Debug)]
pub struct BuildArgs {
    // --- Inputs ---
    /// Path to the EVB directive file listing atoms, terms and soft-core parameters.
    #[arg(long, value_name = "PATH")]
    pub directive: Option<PathBuf>,

    /// Path to the base GROMACS topology carrying the restraint anchor.
    #[arg(long, value_name = "PATH")]
    pub topology: Option<PathBuf>,

    /// Directory holding the reactant and product fragment parameter files.
    #[arg(long, value_name = "DIR")]
    pub fragments: Option<PathBuf>,

    /// Residue names of the reactant state.
    #[arg(long, value_name = "RES", num_args(1..))]
    pub reactants: Vec<String>,

    /// Residue names of the product state.
    #[arg(long, value_name = "RES", num_args(1..))]
    pub products: Vec<String>,

    // --- Overrides ---
    /// Number of lambda windows to write.
    #[arg(short = 'n', long, value_name = "INT")]
    pub windows: Option<usize>,

    /// Non-bonded cut-off in nm used for the soft-core tables.
    #[arg(long, value_name = "FLOAT")]
    pub cutoff: Option<f64>,

    /// Write tables for a double-precision engine build.
    #[arg(long)]
    pub double: bool,

    /// Directory receiving the window topologies and tables.
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Path to a configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S build.windows=21
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `map` subcommand.
#[derive(Args, Debug)]
pub struct MapArgs {
    // --- Inputs ---
    /// Directory searched for `sysA`, `sysB` and `evbless` energy files.
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub path: PathBuf,

    /// Reactant-surface energy files in window order, instead of searching `--path`.
    #[arg(long, value_name = "PATH", num_args(1..), requires_all = ["product", "reference"])]
    pub reactant: Vec<PathBuf>,

    /// Product-surface energy files in window order.
    #[arg(long, value_name = "PATH", num_args(1..), requires = "reactant")]
    pub product: Vec<PathBuf>,

    /// Reference (EVB-less) energy files in window order.
    #[arg(long, value_name = "PATH", num_args(1..), requires = "reactant")]
    pub reference: Vec<PathBuf>,

    // --- Estimator overrides ---
    /// Energy shift of the product diabatic surface (kcal/mol).
    #[arg(long, value_name = "FLOAT", allow_negative_numbers = true)]
    pub alpha: Option<f64>,

    /// Constant coupling between the diabatic surfaces (kcal/mol).
    #[arg(long, value_name = "FLOAT", allow_negative_numbers = true)]
    pub hij: Option<f64>,

    /// Simulation temperature in K.
    #[arg(short = 't', long = "temp", value_name = "FLOAT")]
    pub temperature: Option<f64>,

    /// Number of energy-gap bins.
    #[arg(short, long, value_name = "INT")]
    pub bins: Option<usize>,

    /// Minimum samples a window must put in a bin to contribute to it.
    #[arg(short, long, value_name = "INT")]
    pub min_points: Option<usize>,

    /// Warm-up samples dropped from every series (default: a tenth of the first file).
    #[arg(short, long, value_name = "INT")]
    pub skip: Option<usize>,

    /// Lambda step between windows (default: 1 / (windows - 1)).
    #[arg(short = 'l', long, value_name = "FLOAT")]
    pub delta_lambda: Option<f64>,

    /// Maxima closer than this to the highest one are merged into it (kcal/mol).
    #[arg(long, value_name = "FLOAT")]
    pub ts_tolerance: Option<f64>,

    /// Path of the written profile.
    #[arg(short, long, value_name = "PATH", default_value = "profile.dat")]
    pub output: PathBuf,

    /// Path to a configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S mapping.hij=60.5
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `stats` subcommand.
#[derive(Args, Debug)]
pub struct StatsArgs {
    /// Replica profile files written by `map`.
    #[arg(required = true, value_name = "PROFILE")]
    pub files: Vec<PathBuf>,

    /// Also write the per-replica barriers as a CSV table.
    #[arg(long, value_name = "PATH")]
    pub csv: Option<PathBuf>,
}

/// Arguments for the `fit` subcommand.
#[derive(Args, Debug)]
pub struct FitArgs {
    /// Replica profile files written by `map`.
    #[arg(required = true, value_name = "PROFILE")]
    pub files: Vec<PathBuf>,

    /// Points dropped from the reactant end of every profile before fitting.
    #[arg(long, value_name = "INT")]
    pub left: Option<usize>,

    /// Points dropped from the product end of every profile before fitting.
    #[arg(long, value_name = "INT")]
    pub right: Option<usize>,

    /// Degree of the fitted polynomial.
    #[arg(long, value_name = "INT")]
    pub degree: Option<usize>,

    /// Write the fit report to a file instead of standard output.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Path to a configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Arguments for the `qfep` subcommand.
#[derive(Args, Debug)]
pub struct QfepArgs {
    /// Directory searched for `sysA`, `sysB` and `evbless` energy files.
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub path: PathBuf,

    /// Write every n-th sample.
    #[arg(long, value_name = "INT", default_value_t = 1)]
    pub stride: usize,

    /// Directory receiving one file per window.
    #[arg(short, long, value_name = "DIR", default_value = "qfep")]
    pub output: PathBuf,
}

/// Arguments for the `molaris` subcommand.
#[derive(Args, Debug)]
pub struct MolarisArgs {
    /// Directory searched for `sysA`, `sysB` and `evbless` energy files.
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub path: PathBuf,

    /// Write every n-th sample.
    #[arg(long, value_name = "INT", default_value_t = 1)]
    pub stride: usize,

    /// Directory receiving one `map_evb.gapNNN` file per window.
    #[arg(short, long, value_name = "DIR", default_value = "molaris")]
    pub output: PathBuf,
}

/// Arguments for the `molaris-stats` subcommand.
#[derive(Args, Debug)]
pub struct MolarisStatsArgs {
    /// `dG_dE.graph` files, one per replica.
    #[arg(required = true, value_name = "GRAPH")]
    pub files: Vec<PathBuf>,

    /// Also write the per-replica barriers as a CSV table.
    #[arg(long, value_name = "PATH")]
    pub csv: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn map_parses_short_flags_and_negative_alpha() {
        let cli = Cli::parse_from([
            "evb", "map", "-t", "310", "-b", "50", "-m", "5", "-s", "100", "--alpha", "-12.5",
        ]);
        let Commands::Map(args) = cli.command else {
            panic!("Expected 'map' subcommand");
        };
        assert_eq!(args.temperature, Some(310.0));
        assert_eq!(args.bins, Some(50));
        assert_eq!(args.min_points, Some(5));
        assert_eq!(args.skip, Some(100));
        assert_eq!(args.alpha, Some(-12.5));
        assert_eq!(args.output, PathBuf::from("profile.dat"));
    }

    #[test]
    fn explicit_energy_files_require_all_surfaces() {
        let result = Cli::try_parse_from(["evb", "map", "--reactant", "a.xvg", "b.xvg"]);
        assert!(result.is_err());
    }

    #[test]
    fn quiet_conflicts_with_verbose() {
        let result = Cli::try_parse_from(["evb", "-q", "-v", "stats", "p.dat"]);
        assert!(result.is_err());
    }

    #[test]
    fn build_collects_residue_lists() {
        let cli = Cli::parse_from([
            "evb", "build", "--reactants", "RSM", "WAT", "--products", "PSM", "-n", "11",
            "--double",
        ]);
        let Commands::Build(args) = cli.command else {
            panic!("Expected 'build' subcommand");
        };
        assert_eq!(args.reactants, vec!["RSM", "WAT"]);
        assert_eq!(args.products, vec!["PSM"]);
        assert_eq!(args.windows, Some(11));
        assert!(args.double);
    }

    #[test]
    fn molaris_commands_parse_with_defaults() {
        let cli = Cli::parse_from(["evb", "molaris", "--stride", "5"]);
        let Commands::Molaris(args) = cli.command else {
            panic!("Expected 'molaris' subcommand");
        };
        assert_eq!(args.stride, 5);
        assert_eq!(args.output, PathBuf::from("molaris"));

        let cli = Cli::parse_from(["evb", "molaris-stats", "rep1/dG_dE.graph", "rep2/dG_dE.graph"]);
        let Commands::MolarisStats(args) = cli.command else {
            panic!("Expected 'molaris-stats' subcommand");
        };
        assert_eq!(args.files.len(), 2);
        assert!(args.csv.is_none());
    }
}
