//! kbswitch - keeps the Windows input layout in sync with whichever
//! physical keyboard is plugged in.
#![forbid(unsafe_code)]

use std::io;
use std::net::SocketAddr;

use anyhow::Context;
use clap::Parser;
use console::style;
use serde::Serialize;

use kbswitch::cli::{self, Cli, Commands};
use kbswitch::device;
use kbswitch::engine::{AppContext, Engine, TICK_INTERVAL};
use kbswitch::error::KbError;
use kbswitch::profile::ProfileStore;
use kbswitch::{logging, resolver, web};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init_logging(cli.use_json(), cli.verbose, cli.quiet);

    if let Err(e) = run(&cli).await {
        output_error(&cli, &e);
        std::process::exit(1);
    }
}

async fn run(cli: &Cli) -> anyhow::Result<()> {
    match &cli.command {
        None => print_quick_start(cli),
        Some(Commands::Run(args)) => cmd_run(cli, args).await,
        Some(Commands::Serve(args)) => cmd_serve(cli, args).await,
        Some(Commands::Detect(args)) => cmd_detect(cli, args),
        Some(Commands::Status(args)) => cmd_status(cli, args),
        Some(Commands::Config(args)) => cmd_config(cli, args),
        Some(Commands::Completions(args)) => cmd_completions(cli, args),
    }
}

// === Context wiring ===

fn store_for(cli: &Cli) -> ProfileStore {
    ProfileStore::new(
        cli.config
            .clone()
            .unwrap_or_else(ProfileStore::default_path),
    )
}

/// Wire the real OS adapters into an application context.
#[cfg(windows)]
fn os_context(store: ProfileStore) -> anyhow::Result<AppContext> {
    use std::sync::Arc;

    use kbswitch::layout::WindowsLayoutControl;

    Ok(AppContext::new(
        store,
        Arc::new(device::WindowsEnumerator::new()),
        Arc::new(WindowsLayoutControl::new()),
    ))
}

#[cfg(not(windows))]
fn os_context(_store: ProfileStore) -> anyhow::Result<AppContext> {
    Err(KbError::UnsupportedPlatform.into())
}

fn bind_addr(bind: &str, port: u16) -> anyhow::Result<SocketAddr> {
    format!("{bind}:{port}")
        .parse()
        .with_context(|| format!("invalid bind address '{bind}:{port}'"))
}

// === Command Implementations ===

async fn cmd_run(cli: &Cli, args: &cli::RunArgs) -> anyhow::Result<()> {
    let ctx = os_context(store_for(cli))?;
    let addr = bind_addr(&args.bind, args.port)?;

    let engine = Engine::new(ctx.clone());
    let loop_task = tokio::spawn(engine.run(TICK_INTERVAL));

    let signal_ctx = ctx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal_ctx.shutdown();
        }
    });

    if !cli.quiet && !cli.use_json() {
        println!(
            "Watching keyboards; config surface on http://{addr} (Ctrl+C to stop)"
        );
    }

    web::run_server(ctx, addr).await?;
    let _ = loop_task.await;
    Ok(())
}

async fn cmd_serve(cli: &Cli, args: &cli::ServeArgs) -> anyhow::Result<()> {
    let ctx = os_context(store_for(cli))?;
    let addr = bind_addr(&args.bind, args.port)?;

    if !cli.quiet && !cli.use_json() {
        println!("Config surface on http://{addr}");
    }

    web::run_server(ctx, addr).await?;
    Ok(())
}

fn cmd_detect(cli: &Cli, _args: &cli::DetectArgs) -> anyhow::Result<()> {
    let ctx = os_context(store_for(cli))?;
    let observations = device::enumerate(ctx.enumerator.as_ref());

    if cli.use_json() {
        output_json(cli, &observations);
    } else if observations.is_empty() {
        println!("{}", style("No keyboards with detected hardware ids").yellow());
    } else {
        for obs in &observations {
            println!(
                "{} -> {} : VID_{} | PID_{}",
                style(&obs.vendor_name).green(),
                obs.product_name,
                obs.vid,
                obs.pid
            );
        }
    }
    Ok(())
}

fn cmd_status(cli: &Cli, _args: &cli::StatusArgs) -> anyhow::Result<()> {
    let ctx = os_context(store_for(cli))?;
    let profiles = ctx.store.load()?;
    let observations = device::enumerate(ctx.enumerator.as_ref());
    let active = resolver::resolve(&observations, &profiles);
    let current_layout = ctx.layout.current_layout()?;

    if cli.use_json() {
        output_json(
            cli,
            &serde_json::json!({
                "active_keyboard": active,
                "current_layout": current_layout,
            }),
        );
    } else {
        match &active {
            Some(name) => println!("{}: {}", style("Active profile").bold(), name),
            None => println!("{}: none", style("Active profile").bold()),
        }
        println!("{}: {}", style("Current layout").bold(), current_layout);
    }
    Ok(())
}

fn cmd_config(cli: &Cli, args: &cli::ConfigArgs) -> anyhow::Result<()> {
    let store = store_for(cli);

    if args.path {
        println!("{}", store.path().display());
        return Ok(());
    }

    let profiles = store.load()?;
    if cli.use_json() {
        output_json(cli, &profiles);
    } else {
        println!("{}: {}", style("Profile file").bold(), store.path().display());
        println!("{}", serde_json::to_string_pretty(&profiles)?);
    }
    Ok(())
}

fn cmd_completions(_cli: &Cli, args: &cli::CompletionsArgs) -> anyhow::Result<()> {
    use clap::CommandFactory;
    clap_complete::generate(args.shell, &mut Cli::command(), "kbswitch", &mut io::stdout());
    Ok(())
}

// === Quick Start ===

/// Prints quick-start help optimized for both humans and agents.
fn print_quick_start(cli: &Cli) -> anyhow::Result<()> {
    if cli.use_json() {
        print_robot_quick_start();
    } else {
        print_human_quick_start();
    }
    Ok(())
}

fn print_robot_quick_start() {
    let help = RobotQuickStart {
        tool: "kbswitch",
        version: VERSION,
        description: "Switches the Windows input layout to follow the connected keyboard",
        daemon: RobotDaemon {
            run: "kbswitch run --port 5000",
            serve_only: "kbswitch serve --port 5000",
        },
        discovery: RobotDiscovery {
            detect_keyboards: "kbswitch detect --robot",
            current_status: "kbswitch status --robot",
            show_config: "kbswitch config --robot",
        },
        api: RobotApi {
            get_config: "GET /api/config",
            set_config: "POST /api/config",
            status: "GET /api/status",
            detected: "GET /api/detected_keyboards",
            exit: "POST /exit",
        },
        output_modes: RobotOutputModes {
            human: "--format=text (default)",
            robot: "--robot or --format=json",
            compact: "--format=json-compact",
        },
    };

    println!("{}", serde_json::to_string_pretty(&help).unwrap());
}

fn print_human_quick_start() {
    println!("{} {} - keyboard layout switcher\n", style("kbswitch").bold().cyan(), VERSION);

    println!("{}", style("QUICK START").bold().underlined());
    println!();
    println!("  {}  Watch keyboards and serve the config UI", style("kbswitch run").green());
    println!("  {}  List detected keyboards", style("kbswitch detect").green());
    println!("  {}  Show active profile and current layout", style("kbswitch status").green());
    println!("  {}  Show the profile file", style("kbswitch config").green());
    println!();

    println!("{}", style("ROBOT MODE (for scripts)").bold().underlined());
    println!();
    println!("  {}  JSON output", style("kbswitch --robot <command>").cyan());
    println!();

    println!("Run {} for full help", style("kbswitch --help").yellow());
}

// === Robot Mode JSON Structures ===

#[derive(Serialize)]
struct RobotQuickStart {
    tool: &'static str,
    version: &'static str,
    description: &'static str,
    daemon: RobotDaemon,
    discovery: RobotDiscovery,
    api: RobotApi,
    output_modes: RobotOutputModes,
}

#[derive(Serialize)]
struct RobotDaemon {
    run: &'static str,
    serve_only: &'static str,
}

#[derive(Serialize)]
struct RobotDiscovery {
    detect_keyboards: &'static str,
    current_status: &'static str,
    show_config: &'static str,
}

#[derive(Serialize)]
struct RobotApi {
    get_config: &'static str,
    set_config: &'static str,
    status: &'static str,
    detected: &'static str,
    exit: &'static str,
}

#[derive(Serialize)]
struct RobotOutputModes {
    human: &'static str,
    robot: &'static str,
    compact: &'static str,
}

// === Utility Functions ===

fn output_json<T: Serialize>(cli: &Cli, data: &T) {
    let json = if cli.use_compact_json() {
        serde_json::to_string(data).unwrap()
    } else {
        serde_json::to_string_pretty(data).unwrap()
    };
    println!("{json}");
}

fn output_error(cli: &Cli, error: &anyhow::Error) {
    let suggestion = error
        .downcast_ref::<KbError>()
        .and_then(KbError::suggestion);

    if cli.use_json() {
        let json = serde_json::json!({
            "error": true,
            "message": error.to_string(),
            "suggestion": suggestion,
        });
        eprintln!("{}", serde_json::to_string_pretty(&json).unwrap());
    } else {
        eprintln!("{}: {error}", style("Error").red().bold());
        if let Some(suggestion) = suggestion {
            eprintln!("{}: {suggestion}", style("Hint").yellow());
        }
    }
}
