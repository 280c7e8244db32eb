use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, Command};
use dcv_view::{init_tracing, App, BatchOptions, ViewConfig};
use std::path::PathBuf;

fn cli() -> Command {
    Command::new("dcview")
        .version(dcv_view::VERSION)
        .about("Preview images for RT-DC resources")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Log as JSON lines"),
        )
        .subcommand(Command::new("serve").about("Serve preview redirects over HTTP"))
        .subcommand(
            Command::new("run-jobs")
                .about("Compute preview images for all .rtdc resources, drafts included")
                .arg(
                    Arg::new("force")
                        .long("force")
                        .action(ArgAction::SetTrue)
                        .help("Recompute previews that already exist"),
                )
                .arg(
                    Arg::new("modified-days")
                        .long("modified-days")
                        .default_value("-1")
                        .allow_negative_numbers(true)
                        .value_parser(value_parser!(i64))
                        .help("Only datasets modified within this many days (-1 for all)"),
                ),
        )
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "cannot listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("log-json")).context("Failed to initialize logging")?;

    let config = match matches.get_one::<PathBuf>("config") {
        Some(path) => ViewConfig::load(path).with_context(|| format!("Failed to load {}", path.display()))?,
        None => ViewConfig::default(),
    };
    if config.storage.uses_development_secret() {
        tracing::warn!("using the development signing secret, set storage.signing_secret");
    }
    let app = App::build(config).context("Failed to assemble service")?;

    match matches.subcommand() {
        Some(("serve", _)) => {
            app.serve(shutdown_signal()).await?;
        }
        Some(("run-jobs", args)) => {
            let options = BatchOptions::new()
                .with_force(args.get_flag("force"))
                .with_modified_days(args.get_one::<i64>("modified-days").copied().unwrap_or(-1));
            let mut stdout = std::io::stdout();
            let report = app.run_batch(options, &mut stdout).await?;
            if !report.is_clean() {
                anyhow::bail!("{} previews failed", report.failed);
            }
        }
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_is_well_formed() {
        cli().debug_assert();
    }

    #[test]
    fn run_jobs_arguments() {
        let matches = cli()
            .try_get_matches_from(["dcview", "--config", "x.toml", "run-jobs", "--force", "--modified-days", "7"])
            .unwrap();
        assert_eq!(matches.get_one::<PathBuf>("config"), Some(&PathBuf::from("x.toml")));
        let (name, args) = matches.subcommand().unwrap();
        assert_eq!(name, "run-jobs");
        assert!(args.get_flag("force"));
        assert_eq!(args.get_one::<i64>("modified-days"), Some(&7));

        let matches = cli().try_get_matches_from(["dcview", "run-jobs", "--modified-days", "-1"]).unwrap();
        let (_, args) = matches.subcommand().unwrap();
        assert_eq!(args.get_one::<i64>("modified-days"), Some(&-1));
    }
}
