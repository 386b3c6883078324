use super::defaults::DefaultsConfig;
use super::file::FileConfig;
use crate::cli::{BuildArgs, FitArgs, MapArgs};
use crate::error::{CliError, Result};
use evbkit::core::topology::tables::TablePrecision;
use evbkit::engine::config as core_config;
use std::path::PathBuf;
use std::str::FromStr;

pub fn build_config(args: &BuildArgs) -> Result<core_config::BuildConfig> {
    let defaults = DefaultsConfig::default();
    let file_config = FileConfig::load(args.config.as_deref())?;
    let mut file_config = apply_set_values(file_config, &args.set_values)?;
    let build_file = file_config.build.take().unwrap_or_default();

    let required = |cli: Option<&PathBuf>, file: Option<PathBuf>, key: &str| -> Result<PathBuf> {
        cli.cloned().or(file).ok_or_else(|| {
            CliError::Config(format!(
                "A value for '{}' is required either in the config file or via CLI argument.",
                key
            ))
        })
    };
    let directive = required(args.directive.as_ref(), build_file.directive, "directive")?;
    let topology = required(args.topology.as_ref(), build_file.topology, "topology")?;
    let fragments = required(args.fragments.as_ref(), build_file.fragments, "fragments")?;

    let residues = |cli: &[String], file: Option<Vec<String>>| -> Vec<String> {
        if cli.is_empty() {
            file.unwrap_or_default()
        } else {
            cli.to_vec()
        }
    };
    let reactants = residues(&args.reactants, build_file.reactants);
    let products = residues(&args.products, build_file.products);

    let precision = if args.double {
        TablePrecision::Double
    } else {
        build_file.precision.unwrap_or(defaults.precision)
    };

    let mut builder = core_config::BuildConfigBuilder::new()
        .directive_path(directive)
        .topology_path(topology)
        .fragments_dir(fragments)
        .reactant_residues(reactants)
        .product_residues(products)
        .cutoff(args.cutoff.or(build_file.cutoff).unwrap_or(defaults.cutoff))
        .precision(precision)
        .output_dir(
            args.output
                .clone()
                .or(build_file.output)
                .unwrap_or(defaults.output_dir),
        );
    if let Some(windows) = args.windows.or(build_file.windows) {
        builder = builder.window_count(windows);
    }
    builder.build().map_err(|e| CliError::Config(e.to_string()))
}

pub fn mapping_config(args: &MapArgs) -> Result<core_config::MappingConfig> {
    let defaults = DefaultsConfig::default();
    let file_config = FileConfig::load(args.config.as_deref())?;
    let mut file_config = apply_set_values(file_config, &args.set_values)?;
    let map_file = file_config.mapping.take().unwrap_or_default();

    let mut builder = core_config::MappingConfigBuilder::new()
        .alpha(args.alpha.or(map_file.alpha).unwrap_or(defaults.alpha))
        .hij(args.hij.or(map_file.hij).unwrap_or(defaults.hij))
        .temperature(
            args.temperature
                .or(map_file.temperature)
                .unwrap_or(defaults.temperature),
        )
        .bins(args.bins.or(map_file.bins).unwrap_or(defaults.bins))
        .min_points(
            args.min_points
                .or(map_file.min_points)
                .unwrap_or(defaults.min_points),
        )
        .ts_tolerance(
            args.ts_tolerance
                .or(map_file.ts_tolerance)
                .unwrap_or(defaults.ts_tolerance),
        );
    if let Some(skip) = args.skip.or(map_file.skip) {
        builder = builder.warm_up(core_config::WarmUp::Samples(skip));
    }
    if let Some(step) = args.delta_lambda.or(map_file.delta_lambda) {
        builder = builder.delta_lambda(step);
    }
    if let Some(lines) = map_file.header_lines {
        builder = builder.header_lines(lines);
    }
    if let Some(scale) = map_file.energy_scale {
        builder = builder.energy_scale(scale);
    }
    builder.build().map_err(|e| CliError::Config(e.to_string()))
}

pub fn analysis_config(args: &FitArgs) -> Result<core_config::AnalysisConfig> {
    let defaults = DefaultsConfig::default();
    let mut file_config = FileConfig::load(args.config.as_deref())?;
    let analysis_file = file_config.analysis.take().unwrap_or_default();

    core_config::AnalysisConfigBuilder::new()
        .left(args.left.or(analysis_file.left).unwrap_or(defaults.left))
        .right(args.right.or(analysis_file.right).unwrap_or(defaults.right))
        .degree(args.degree.or(analysis_file.degree).unwrap_or(defaults.degree))
        .build()
        .map_err(|e| CliError::Config(e.to_string()))
}

fn parse_value<T: FromStr>(key: &str, value: &str, kind: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| CliError::Config(format!("Invalid {} value for {}: {}", kind, key, value)))
}

fn apply_set_values(mut config: FileConfig, set_values: &[String]) -> Result<FileConfig> {
    if set_values.is_empty() {
        return Ok(config);
    }
    for kv_pair in set_values {
        let Some((key, value_str)) = kv_pair.split_once('=') else {
            return Err(CliError::Config(format!(
                "Invalid --set format: '{}'. Expected KEY=VALUE.",
                kv_pair
            )));
        };

        match key.split_once('.') {
            Some(("build", field)) => {
                let build = config.build.get_or_insert_with(Default::default);
                match field {
                    "directive" => build.directive = Some(PathBuf::from(value_str)),
                    "topology" => build.topology = Some(PathBuf::from(value_str)),
                    "fragments" => build.fragments = Some(PathBuf::from(value_str)),
                    "output" => build.output = Some(PathBuf::from(value_str)),
                    "windows" => build.windows = Some(parse_value(key, value_str, "integer")?),
                    "cutoff" => build.cutoff = Some(parse_value(key, value_str, "float")?),
                    "precision" => {
                        build.precision = Some(match value_str {
                            "single" => TablePrecision::Single,
                            "double" => TablePrecision::Double,
                            _ => {
                                return Err(CliError::Config(format!(
                                    "Invalid precision for {}: {} (expected 'single' or 'double')",
                                    key, value_str
                                )));
                            }
                        })
                    }
                    _ => return Err(unsupported(key)),
                }
            }
            Some(("mapping", field)) => {
                let mapping = config.mapping.get_or_insert_with(Default::default);
                match field {
                    "alpha" => mapping.alpha = Some(parse_value(key, value_str, "float")?),
                    "hij" => mapping.hij = Some(parse_value(key, value_str, "float")?),
                    "temperature" => {
                        mapping.temperature = Some(parse_value(key, value_str, "float")?)
                    }
                    "bins" => mapping.bins = Some(parse_value(key, value_str, "integer")?),
                    "min-points" => {
                        mapping.min_points = Some(parse_value(key, value_str, "integer")?)
                    }
                    "skip" => mapping.skip = Some(parse_value(key, value_str, "integer")?),
                    "delta-lambda" => {
                        mapping.delta_lambda = Some(parse_value(key, value_str, "float")?)
                    }
                    "header-lines" => {
                        mapping.header_lines = Some(parse_value(key, value_str, "integer")?)
                    }
                    "energy-scale" => {
                        mapping.energy_scale = Some(parse_value(key, value_str, "float")?)
                    }
                    "ts-tolerance" => {
                        mapping.ts_tolerance = Some(parse_value(key, value_str, "float")?)
                    }
                    _ => return Err(unsupported(key)),
                }
            }
            _ => return Err(unsupported(key)),
        }
    }
    Ok(config)
}

fn unsupported(key: &str) -> CliError {
    CliError::Config(format!(
        "Unsupported configuration key for --set: '{}'",
        key
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use evbkit::engine::config::WarmUp;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    fn write_config(dir: &Path, content: &str) -> String {
        let path = dir.join("evb.toml");
        fs::write(&path, content).unwrap();
        path.to_string_lossy().into_owned()
    }

    fn build_args(argv: &[&str]) -> BuildArgs {
        let mut full = vec!["evb", "build"];
        full.extend_from_slice(argv);
        match Cli::parse_from(full).command {
            Commands::Build(args) => args,
            _ => panic!("Expected 'build' subcommand"),
        }
    }

    fn map_args(argv: &[&str]) -> MapArgs {
        let mut full = vec!["evb", "map"];
        full.extend_from_slice(argv);
        match Cli::parse_from(full).command {
            Commands::Map(args) => args,
            _ => panic!("Expected 'map' subcommand"),
        }
    }

    fn fit_args(argv: &[&str]) -> FitArgs {
        let mut full = vec!["evb", "fit", "rep_000.dat"];
        full.extend_from_slice(argv);
        match Cli::parse_from(full).command {
            Commands::Fit(args) => args,
            _ => panic!("Expected 'fit' subcommand"),
        }
    }

    #[test]
    fn build_config_from_cli_uses_defaults_for_the_rest() {
        let args = build_args(&[
            "--directive", "evb.dat", "--topology", "topol.top", "--fragments", "ff",
            "--reactants", "RSM", "--products", "PSM", "-n", "21",
        ]);
        let config = build_config(&args).unwrap();
        assert_eq!(config.directive_path, PathBuf::from("evb.dat"));
        assert_eq!(config.window_count, 21);
        assert_eq!(config.cutoff, DefaultsConfig::default().cutoff);
        assert_eq!(config.precision, TablePrecision::Single);
        assert_eq!(config.output_dir, PathBuf::from("."));
    }

    #[test]
    fn build_config_reads_file_and_cli_wins() {
        let dir = tempdir().unwrap();
        let path = write_config(
            dir.path(),
            r#"
            [build]
            directive = "evb.dat"
            topology = "topol.top"
            fragments = "ff"
            reactants = ["RSM"]
            products = ["PSM"]
            windows = 11
            cutoff = 1.2
            precision = "double"
            "#,
        );
        let args = build_args(&["-c", &path, "-n", "31", "--products", "PSM", "WAT"]);
        let config = build_config(&args).unwrap();
        assert_eq!(config.window_count, 31);
        assert_eq!(config.cutoff, 1.2);
        assert_eq!(config.precision, TablePrecision::Double);
        assert_eq!(config.reactant_residues, vec!["RSM"]);
        assert_eq!(config.product_residues, vec!["PSM", "WAT"]);
    }

    #[test]
    fn set_values_override_file_values() {
        let dir = tempdir().unwrap();
        let path = write_config(
            dir.path(),
            r#"
            [mapping]
            alpha = 10.0
            bins = 80
            "#,
        );
        let args = map_args(&[
            "-c", &path, "-S", "mapping.alpha=-4.5", "-S", "mapping.skip=50", "-S",
            "mapping.header-lines=30",
        ]);
        let config = mapping_config(&args).unwrap();
        assert_eq!(config.alpha, -4.5);
        assert_eq!(config.bins, 80);
        assert_eq!(config.input.warm_up, WarmUp::Samples(50));
        assert_eq!(config.input.header_lines, 30);
    }

    #[test]
    fn mapping_defaults_match_the_documented_values() {
        let config = mapping_config(&map_args(&[])).unwrap();
        assert_eq!(config.alpha, 0.0);
        assert_eq!(config.hij, 0.0);
        assert_eq!(config.temperature, 300.0);
        assert_eq!(config.bins, 100);
        assert_eq!(config.min_points, 10);
        assert_eq!(config.input.warm_up, WarmUp::Tenth);
        assert!(config.delta_lambda.is_none());
    }

    #[test]
    fn cli_flags_override_set_values() {
        let args = map_args(&["-S", "mapping.hij=20", "--hij", "45.5", "-t", "310"]);
        let config = mapping_config(&args).unwrap();
        assert_eq!(config.hij, 45.5);
        assert_eq!(config.temperature, 310.0);
    }

    #[test]
    fn malformed_set_values_are_rejected() {
        let cases = [
            "mapping.alpha",
            "mapping.alpha=abc",
            "mapping.colour=blue",
            "build.precision=quad",
            "sampling.bins=3",
        ];
        for case in cases {
            let args = map_args(&["-S", case]);
            let result = mapping_config(&args);
            assert!(matches!(result, Err(CliError::Config(_))), "{case}");
        }
    }

    #[test]
    fn missing_build_inputs_name_the_key() {
        let args = build_args(&["--topology", "topol.top", "--fragments", "ff", "-n", "5"]);
        let result = build_config(&args);
        assert!(matches!(&result, Err(CliError::Config(msg)) if msg.contains("directive")));
    }

    #[test]
    fn invalid_core_values_surface_as_config_errors() {
        let args = build_args(&[
            "--directive", "evb.dat", "--topology", "topol.top", "--fragments", "ff",
            "--reactants", "RSM", "--products", "PSM", "-n", "1",
        ]);
        assert!(matches!(build_config(&args), Err(CliError::Config(_))));

        let args = map_args(&["-b", "0"]);
        assert!(matches!(mapping_config(&args), Err(CliError::Config(_))));
    }

    #[test]
    fn analysis_config_layers_file_and_cli() {
        let dir = tempdir().unwrap();
        let path = write_config(dir.path(), "[analysis]\nleft = 5\ndegree = 4\n");
        let config = analysis_config(&fit_args(&["-c", &path, "--degree", "8"])).unwrap();
        assert_eq!(config.left, 5);
        assert_eq!(config.right, DefaultsConfig::default().right);
        assert_eq!(config.degree, 8);
    }
}
