// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod headless;
mod logging;
mod runtime;

use anyhow::{Context, Result, anyhow};
use carprice_app::{AppState, FormField};
use carprice_client::Client;
use carprice_tui::PredictionRuntime;
use config::Config;
use headless::HeadlessQuery;
use logging::LogConfig;
use runtime::HttpRuntime;
use std::env;
use std::io;
use std::path::PathBuf;

fn main() {
    match run() {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(error) => {
            eprintln!("{error:#}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<bool> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(true);
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(true);
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(true);
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `carprice --print-example-config` to generate a template",
            options.config_path.display()
        )
    })?;

    logging::init_logging(&LogConfig {
        level: config.log_level().to_owned(),
        file: config.log_file()?,
    })?;

    let client = Client::new(config.base_url(), config.timeout()?).with_context(|| {
        format!(
            "invalid [predictor] config in {}; fix base_url/timeout values",
            options.config_path.display()
        )
    })?;
    let source = config
        .dataset_source(options.dataset.as_deref())
        .context("resolve dataset source -- pass --dataset <path|url> or set [dataset].source")?;
    tracing::info!(
        predictor = %client.predict_url(),
        dataset = %source,
        "starting carprice"
    );
    let mut runtime = HttpRuntime::new(client, source);

    if options.check_only {
        let index = runtime.load_dataset().with_context(|| {
            format!(
                "load dataset {} -- is the prediction server running?",
                runtime.source()
            )
        })?;
        println!("config: {}", options.config_path.display());
        println!("predictor: {}", config.base_url());
        println!(
            "dataset: {} ({} listings, {} companies, {} years, {} fuel types, {} skipped lines)",
            runtime.source(),
            index.rows().len(),
            index.companies().len(),
            index.years().len(),
            index.fuel_types().len(),
            index.skipped_rows()
        );
        return Ok(true);
    }

    if options.query.is_requested() {
        return headless::run(&mut runtime, &options.query, &mut io::stdout().lock());
    }

    let mut state = AppState::default();
    carprice_tui::run_app(&mut state, &mut runtime)?;
    Ok(true)
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    dataset: Option<String>,
    print_config_path: bool,
    print_example: bool,
    check_only: bool,
    show_help: bool,
    query: HeadlessQuery,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        dataset: None,
        print_config_path: false,
        print_example: false,
        check_only: false,
        show_help: false,
        query: HeadlessQuery::default(),
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        let arg = arg.as_ref();
        let field = match arg {
            "--company" => Some(FormField::Company),
            "--model" => Some(FormField::Name),
            "--year" => Some(FormField::Year),
            "--fuel" => Some(FormField::FuelType),
            "--kms" => Some(FormField::KmsDriven),
            _ => None,
        };
        if let Some(field) = field {
            let value = iter
                .next()
                .ok_or_else(|| anyhow!("{arg} requires a value"))?;
            *options.query.slot(field) = Some(value.as_ref().to_owned());
            continue;
        }

        match arg {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--dataset" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--dataset requires a file path or URL"))?;
                options.dataset = Some(value.as_ref().to_owned());
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            unknown => {
                return Err(anyhow!(
                    "unknown argument {unknown:?}; run with --help to see supported options"
                ));
            }
        }
    }

    Ok(options)
}

fn print_help() {
    println!("carprice - used car price estimates");
    println!("  --config <path>          Use a specific config path");
    println!("  --dataset <path|url>     Load listings from this file or URL");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-example-config   Print a config template");
    println!("  --check                  Validate config and load the dataset");
    println!("  --help                   Show this help");
    println!();
    println!("One-shot prediction (no UI; exits 1 when the result is an error):");
    println!("  --company <name>  --model <name>  --year <year>  --fuel <type>  --kms <km>");
}

#[cfg(test)]
mod tests {
    use super::{CliOptions, parse_cli_args};
    use crate::headless::HeadlessQuery;
    use anyhow::Result;
    use std::path::PathBuf;

    fn default_options_path() -> PathBuf {
        PathBuf::from("/tmp/carprice-config.toml")
    }

    #[test]
    fn parse_cli_args_defaults_to_provided_config_path() -> Result<()> {
        let options = parse_cli_args(Vec::<String>::new(), default_options_path())?;
        assert_eq!(
            options,
            CliOptions {
                config_path: default_options_path(),
                dataset: None,
                print_config_path: false,
                print_example: false,
                check_only: false,
                show_help: false,
                query: HeadlessQuery::default(),
            }
        );
        Ok(())
    }

    #[test]
    fn parse_cli_args_sets_config_and_dataset_overrides() -> Result<()> {
        let options = parse_cli_args(
            vec![
                "--config",
                "/custom/config.toml",
                "--dataset",
                "http://cars.local/Cleaned_Car.csv",
            ],
            default_options_path(),
        )?;
        assert_eq!(options.config_path, PathBuf::from("/custom/config.toml"));
        assert_eq!(
            options.dataset.as_deref(),
            Some("http://cars.local/Cleaned_Car.csv")
        );
        Ok(())
    }

    #[test]
    fn parse_cli_args_errors_for_missing_values() {
        let error = parse_cli_args(vec!["--config"], default_options_path())
            .expect_err("missing config value should fail");
        assert!(error.to_string().contains("--config requires a file path"));

        let error = parse_cli_args(vec!["--kms"], default_options_path())
            .expect_err("missing kms value should fail");
        assert!(error.to_string().contains("--kms requires a value"));
    }

    #[test]
    fn parse_cli_args_errors_for_unknown_argument() {
        let error = parse_cli_args(vec!["--wat"], default_options_path())
            .expect_err("unknown arg should fail");
        let message = error.to_string();
        assert!(message.contains("unknown argument"));
        assert!(message.contains("--help"));
    }

    #[test]
    fn parse_cli_args_sets_print_and_check_flags() -> Result<()> {
        let options = parse_cli_args(
            vec!["--print-config-path", "--print-example-config", "--check"],
            default_options_path(),
        )?;
        assert!(options.print_config_path);
        assert!(options.print_example);
        assert!(options.check_only);
        assert!(!options.show_help);
        assert!(!options.query.is_requested());
        Ok(())
    }

    #[test]
    fn parse_cli_args_collects_headless_fields() -> Result<()> {
        let options = parse_cli_args(
            vec![
                "--company",
                "Honda",
                "--model",
                "Honda City",
                "--year",
                "2015",
                "--fuel",
                "Petrol",
                "--kms",
                "40000",
            ],
            default_options_path(),
        )?;
        assert!(options.query.is_requested());
        assert_eq!(
            options.query,
            HeadlessQuery {
                company: Some("Honda".to_owned()),
                model: Some("Honda City".to_owned()),
                year: Some("2015".to_owned()),
                kms: Some("40000".to_owned()),
                fuel: Some("Petrol".to_owned()),
            }
        );
        Ok(())
    }

    #[test]
    fn parse_cli_args_sets_help_flag_for_long_and_short_variants() -> Result<()> {
        let long = parse_cli_args(vec!["--help"], default_options_path())?;
        assert!(long.show_help);

        let short = parse_cli_args(vec!["-h"], default_options_path())?;
        assert!(short.show_help);
        Ok(())
    }
}
