mod cli;
mod config;
mod download;
mod error;
mod extract;
mod install;
mod merge;
mod pipeline;
mod types;

#[cfg(test)]
mod tests;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use cli::{Cli, Commands, ConfigAction};
use config::{
    get_setting, load_config, load_stored_config, normalize_key, save_config, set_setting,
    unset_setting, SETTING_KEYS,
};
use console::style;
use install::InstallPlan;
use pipeline::Pipeline;
use std::env;
use std::io;
use types::{InstallOptions, ReleaseChannel};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    setup_logging(&cli)?;

    match cli.command {
        Commands::Version => {
            println!("octo v{}", env!("CARGO_PKG_VERSION"));
        }

        Commands::New { name, dev, no_tty } => {
            let config = load_config()?;
            let working_dir =
                env::current_dir().context("Could not determine the current directory")?;

            let options = InstallOptions::new(
                working_dir,
                name.as_deref(),
                ReleaseChannel::from_dev_flag(dev),
                config.settings,
            )
            .with_tty(!no_tty);

            tracing::debug!("Install options: {:?}", options);

            let plan = InstallPlan::composer(&options.working_dir, &options.settings.php_binary);
            let pipeline = Pipeline::new(options, plan);
            let mut stdout = io::stdout();
            if let Err(e) = pipeline.run(&mut stdout).await {
                tracing::debug!("Pipeline aborted: {:?} ({:?})", e, e.kind());
                eprintln!("{}", style(e.to_string()).red().bold());
                std::process::exit(1);
            }
        }

        Commands::Config { action } => run_config(action)?,
    }

    Ok(())
}

fn run_config(action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Get { key } => {
            let config = load_config()?;
            if let Some(key) = key {
                let key = normalize_key(&key);
                let value = get_setting(&config.settings, &key)
                    .ok_or_else(|| anyhow!("Setting '{}' not found", key))?;
                println!("{}", value);
            } else {
                println!("--- Octo Settings ---");
                for key in SETTING_KEYS {
                    if let Some(value) = get_setting(&config.settings, key) {
                        println!("  {}: {}", key, value);
                    }
                }
            }
        }
        ConfigAction::Set { args } => {
            let (key, value) = match args.as_slice() {
                [pair] => pair
                    .split_once('=')
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .ok_or_else(|| anyhow!("Invalid format. Use 'key=value' or 'key value'."))?,
                [key, rest @ ..] => (key.clone(), rest.join(" ")),
                [] => return Err(anyhow!("Invalid format. Use 'key=value' or 'key value'.")),
            };
            let key = normalize_key(&key);

            let mut config = load_stored_config()?;
            set_setting(&mut config.settings, &key, &value)?;
            save_config(&config)?;
            tracing::info!("Setting '{}' updated to '{}'", key, value);
        }
        ConfigAction::Unset { key } => {
            let key = normalize_key(&key);

            let mut config = load_stored_config()?;
            unset_setting(&mut config.settings, &key)?;
            save_config(&config)?;
            tracing::info!("Setting '{}' unset", key);
        }
        ConfigAction::Show { format } => {
            let config = load_config()?;
            match format.as_str() {
                "json" => println!("{}", serde_json::to_string_pretty(&config)?),
                "yaml" => print!("{}", serde_yaml::to_string(&config)?),
                other => return Err(anyhow!("Unknown format '{}'. Use json or yaml.", other)),
            }
        }
    }

    Ok(())
}

fn setup_logging(cli: &Cli) -> Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    let level = if cli.quiet {
        "error"
    } else if cli.verbose == 0 {
        "warn"
    } else if cli.verbose == 1 {
        "info"
    } else {
        "debug"
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .init();

    Ok(())
}
