// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod logging;
mod runtime;

use anyhow::{Context, Result};
use config::Config;
use runtime::ApiRuntime;
use shopdesk_api::MediaUploader;
use shopdesk_app::{AppState, EntityKind, RemoteResource, Resources, Session};
use shopdesk_testkit::MemoryBackend;
use std::env;
use std::path::PathBuf;
use tracing::info;

const DEMO_SEED: u64 = 20_240_601;
const DEMO_PRODUCTS: usize = 12;
const DEMO_ORDERS: usize = 30;

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `shopdesk --print-example-config` to generate a v1 template",
            options.config_path.display()
        )
    })?;
    let log_path = logging::init(&config)?;
    info!(
        config = %options.config_path.display(),
        log = %log_path.display(),
        demo = options.demo,
        "starting shopdesk"
    );

    let timeout = config.timeout()?;
    let resources = if options.demo {
        MemoryBackend::seeded(DEMO_SEED, DEMO_PRODUCTS, DEMO_ORDERS).resources()
    } else {
        let base_url = config.base_url();
        shopdesk_api::connect(&base_url, timeout).with_context(|| {
            format!(
                "invalid [api] config in {}; fix base_url/timeout or SHOPDESK_API_URL",
                options.config_path.display()
            )
        })?
    };
    let uploader = match config.media() {
        Some((upload_url, preset)) => Some(
            MediaUploader::new(upload_url, preset, timeout).with_context(|| {
                format!(
                    "invalid [media] config in {}; fix upload_url/upload_preset",
                    options.config_path.display()
                )
            })?,
        ),
        None => None,
    };

    if options.check_only {
        return check_connectivity(&resources);
    }

    let session = Session::new(config.page_size())?;
    let mut state = AppState {
        active_tab: config.start_tab(),
        ..AppState::default()
    };
    let mut runtime = ApiRuntime::new(resources, uploader);
    shopdesk_tui::run_app(&mut state, session, &mut runtime)
}

fn check_connectivity(resources: &Resources) -> Result<()> {
    for entity in EntityKind::ALL {
        let records = resources
            .get(entity)
            .list()
            .with_context(|| format!("check {entity} endpoint -- is the API server running?"))?;
        println!("{entity}: {} records", records.len());
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    print_config_path: bool,
    demo: bool,
    print_example: bool,
    check_only: bool,
    show_help: bool,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        print_config_path: false,
        demo: false,
        print_example: false,
        check_only: false,
        show_help: false,
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--demo" => {
                options.demo = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            unknown => {
                return Err(anyhow::anyhow!(
                    "unknown argument {unknown:?}; run with --help to see supported options"
                ));
            }
        }
    }

    Ok(options)
}

fn print_help() {
    println!("shopdesk: orders and products admin");
    println!("  --config <path>          Use a specific config path");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-example-config   Print a v1 config template");
    println!("  --demo                   Launch against seeded in-memory data");
    println!("  --check                  Validate config and list both endpoints");
    println!("  --help                   Show this help");
}

#[cfg(test)]
mod tests {
    use super::{CliOptions, check_connectivity, parse_cli_args};
    use anyhow::Result;
    use shopdesk_app::RemoteCause;
    use shopdesk_testkit::MemoryBackend;
    use std::path::PathBuf;

    fn default_options_path() -> PathBuf {
        PathBuf::from("/tmp/shopdesk-config.toml")
    }

    #[test]
    fn parse_cli_args_defaults_to_provided_config_path() -> Result<()> {
        let options = parse_cli_args(Vec::<String>::new(), default_options_path())?;
        assert_eq!(
            options,
            CliOptions {
                config_path: default_options_path(),
                print_config_path: false,
                demo: false,
                print_example: false,
                check_only: false,
                show_help: false,
            }
        );
        Ok(())
    }

    #[test]
    fn parse_cli_args_sets_config_path_override() -> Result<()> {
        let options = parse_cli_args(
            vec!["--config", "/custom/config.toml"],
            default_options_path(),
        )?;
        assert_eq!(options.config_path, PathBuf::from("/custom/config.toml"));
        Ok(())
    }

    #[test]
    fn parse_cli_args_errors_for_missing_config_value() {
        let error = parse_cli_args(vec!["--config"], default_options_path())
            .expect_err("missing config value should fail");
        assert!(error.to_string().contains("--config requires a file path"));
    }

    #[test]
    fn parse_cli_args_errors_for_unknown_argument() {
        let error = parse_cli_args(vec!["--print-path"], default_options_path())
            .expect_err("unknown arg should fail");
        let message = error.to_string();
        assert!(message.contains("unknown argument"));
        assert!(message.contains("--help"));
    }

    #[test]
    fn parse_cli_args_sets_demo_print_and_check_flags() -> Result<()> {
        let options = parse_cli_args(
            vec!["--demo", "--print-example-config", "--check", "-h"],
            default_options_path(),
        )?;
        assert!(options.demo);
        assert!(options.print_example);
        assert!(options.check_only);
        assert!(options.show_help);
        assert!(!options.print_config_path);
        Ok(())
    }

    #[test]
    fn check_lists_both_entities() -> Result<()> {
        let backend = MemoryBackend::seeded(2, 3, 4);
        check_connectivity(&backend.resources())?;
        assert_eq!(backend.orders.total_calls(), 1);
        assert_eq!(backend.products.total_calls(), 1);
        Ok(())
    }

    #[test]
    fn check_names_the_failing_endpoint() {
        let backend = MemoryBackend::empty();
        backend.products.fail_with(RemoteCause::BareStatus(502));
        let error = check_connectivity(&backend.resources()).expect_err("products are down");
        assert!(error.to_string().contains("check products endpoint"));
    }
}
