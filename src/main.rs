use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::rc::Rc;
use tracing::{info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use hearth::config::Config;
use hearth::panel::Panel;
use hearth::plugins::{PluginLoader, Services};
use hearth::scheduler::LocalScheduler;
use hearth::shell::SpawnRunner;
use hearth::ui::DirectoryIconTheme;

/// Hearth - A desktop panel built from plugin controls
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Extra directory to load plugins from (searched first)
    #[arg(short = 'p', long = "plugin-dir")]
    plugin_dir: Vec<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the panel until interrupted (default)
    Run,
    /// List the available panel modules
    Modules {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the panel layout as it would be saved
    Layout,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Log to stderr so `modules --json` output stays clean
    let log_level = if args.debug {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let builder = FmtSubscriber::builder().with_writer(std::io::stderr);
    if std::env::var_os("RUST_LOG").is_some() {
        tracing::subscriber::set_global_default(
            builder.with_env_filter(EnvFilter::from_default_env()).finish(),
        )
    } else {
        tracing::subscriber::set_global_default(builder.with_max_level(log_level).finish())
    }
    .context("Failed to set global default subscriber")?;

    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => Config::default_config_path()?,
    };
    let config = if args.config.is_some() {
        Config::load_from_file(&config_path)?
    } else {
        Config::load_default()?
    };

    let local = tokio::task::LocalSet::new();
    local
        .run_until(run(args, config, config_path))
        .await
}

async fn run(args: Args, mut config: Config, config_path: PathBuf) -> Result<()> {
    if let Some(Command::Modules { json }) = args.command {
        let mut loader = PluginLoader::new();
        loader.init(&config.plugin_search_path(&args.plugin_dir));
        return print_modules(&loader, json);
    }

    let services = Services {
        icons: Rc::new(DirectoryIconTheme::new(config.icons.search_dirs.clone())),
        runner: Rc::new(SpawnRunner::new(config.commands.terminal.clone())),
        scheduler: Rc::new(LocalScheduler::new()),
    };
    let mut panel = Panel::from_config(
        &config,
        &args.plugin_dir,
        services,
        Panel::logging_activation_handler(),
    );

    if let Some(Command::Layout) = args.command {
        let yaml = serde_yaml::to_string(&panel.layout()).context("Failed to serialize layout")?;
        print!("{yaml}");
        return Ok(());
    }

    info!("Panel running, press Ctrl-C to quit");
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    config.controls = panel.layout();
    panel.shutdown();
    config.save_to_file(&config_path)?;
    info!("Saved panel layout to {}", config_path.display());

    Ok(())
}

fn print_modules(loader: &PluginLoader, json: bool) -> Result<()> {
    let modules = loader.registry().all();

    if json {
        let entries: Vec<serde_json::Value> = modules
            .iter()
            .map(|module| {
                serde_json::json!({
                    "name": module.name,
                    "caption": module.caption,
                    "id": module.id,
                    "filename": module.filename(),
                    "path": module.path(),
                })
            })
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&entries).context("Failed to serialize modules")?
        );
    } else {
        for module in modules {
            match module.path() {
                Some(path) => println!("{:<12} {:<20} {}", module.name, module.caption, path.display()),
                None => println!("{:<12} {:<20} (builtin)", module.name, module.caption),
            }
        }
    }

    Ok(())
}
