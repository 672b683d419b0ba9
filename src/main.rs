use anyhow::Result;
use clap::{Parser, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use universal_converter::cli::{Cli, Commands, OutputFormat};
use universal_converter::config::Config;
use universal_converter::plugins::actions::ActionSettings;
use universal_converter::{output, utils, Dispatcher, PluginRegistry, Toolbox};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing; logs go to stderr so stdout carries only results
    let default_filter = if cli.verbose {
        "universal_converter=debug,converter=debug"
    } else if cli.quiet {
        "universal_converter=error"
    } else {
        "universal_converter=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = match &cli.config {
        Some(path) => Config::load_from(path).await?,
        None => Config::load().await?,
    };

    let format = cli.format.unwrap_or_else(|| {
        OutputFormat::from_str(&config.app.default_output_format, true).unwrap_or(OutputFormat::Text)
    });

    let toolbox = Toolbox::from_config(&config)?;
    let registry = PluginRegistry::with_defaults(toolbox, ActionSettings::from_config(&config))?;
    let dispatcher = Dispatcher::new(registry);

    match &cli.command {
        Commands::Config { show } => {
            if *show {
                config.display();
            } else {
                config.interactive_setup()?;
            }
        }
        Commands::Plugins => {
            output::print_plugins(&dispatcher.registry().plugins(), format)?;
        }
        command => {
            let Some((domain, payload)) = command.to_request() else {
                anyhow::bail!("Command does not map to a plugin");
            };

            // Missing tools are reported but not fatal; the affected actions fail on their own
            if !cli.quiet {
                let missing_deps = utils::check_dependencies(&config.tools).await;
                if !missing_deps.is_empty() {
                    eprintln!("⚠️  Dependency check warnings:");
                    for dep in missing_deps {
                        eprintln!("   • {}", dep);
                    }
                    eprintln!("   (Continuing anyway - tools may be available)");
                }
            }

            tracing::info!("Dispatching {} request", domain);
            let progress = (!cli.quiet).then(|| output::spinner(format!("Running {} plugin...", domain)));

            let result = dispatcher.run(domain, payload).await;

            if let Some(progress) = progress {
                progress.finish_and_clear();
            }
            output::print_result(&result, format)?;

            if !result.success {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
