//! `revline` - CLI for the revline telemetry dashboard
//!
//! Runs the live dashboard, replays run logs and manages the vehicle catalog.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use tokio::sync::mpsc;
use tracing::{info, warn};

use revline::cli::{
    Cli, Command, ConfigCommand, LeaderboardCommand, OutputFormat, ReplayCommand, RunCommand,
    VehicleCommand,
};
use revline::dashboard::{render_heatmap, Dashboard};
use revline::gauges;
use revline::poller::CHANNEL_CAPACITY;
use revline::source::{self, Elm327, Timeouts};
use revline::storage::VehicleSpec;
use revline::telemetry::Leaderboard;
use revline::{
    calibration, init_logging, Calibrator, Config, DashboardEvent, Poller, Replayer, RunRecorder,
    Storage, TelemetryBrain,
};

const CLEAR_SCREEN: &str = "\x1B[2J\x1B[H";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    let config = Config::load_from(cli.config.clone()).context("loading configuration")?;

    match cli.command {
        Command::Run(cmd) => handle_run(&config, cmd).await,
        Command::Replay(cmd) => handle_replay(&config, cmd).await,
        Command::Vehicle(cmd) => handle_vehicle(&config, cmd),
        Command::Leaderboard(cmd) => handle_leaderboard(&config, &cmd),
        Command::Status(cmd) => handle_status(&config, cmd.json).await,
        Command::Config(cmd) => handle_config(&config, cmd),
    }
}

async fn handle_run(config: &Config, cmd: RunCommand) -> anyhow::Result<()> {
    let storage = Storage::open(config.database_path())?;
    let vehicle = Calibrator::new(&storage, config).current()?;
    let history = storage.best_runs(config.telemetry.leaderboard_size, Some(&vehicle.model))?;
    let brain = TelemetryBrain::new(vehicle.clone(), &config.telemetry).with_leaderboard(
        Leaderboard::with_times(
            config.telemetry.leaderboard_size,
            history.iter().map(|run| run.seconds),
        ),
    );

    let source = source::open(config, cmd.simulate).await;
    info!(
        source = %source.kind(),
        model = %vehicle.model,
        cc = vehicle.displacement_cc,
        "Starting session"
    );

    let mut recorder = if cmd.no_record || !config.recording.enabled {
        None
    } else {
        match RunRecorder::create(&config.log_dir()) {
            Ok(recorder) => Some(recorder),
            Err(e) => {
                warn!(error = %e, "Run log unavailable, continuing without recording");
                None
            }
        }
    };

    let (tx, mut rx) = mpsc::channel(CHANNEL_CAPACITY);
    if let Some(path) = &cmd.ghost {
        let ghost = Replayer::load(path)
            .with_context(|| format!("loading ghost run {}", path.display()))?;
        let ghost_tx = tx.clone();
        let _ghost_task = tokio::spawn(async move { ghost.play_ghost(ghost_tx).await });
    }
    let (handle, task) = Poller::new(source, brain, config).spawn_with(tx);

    let deadline = cmd.duration.map(Duration::from_secs);
    let timeout = async move {
        match deadline {
            Some(d) => tokio::time::sleep(d).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(timeout);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut dashboard = Dashboard::new(config.display.clone());
    loop {
        let event = tokio::select! {
            event = rx.recv() => match event {
                Some(event) => event,
                None => break,
            },
            _ = &mut ctrl_c => break,
            () = &mut timeout => break,
        };

        match &event {
            DashboardEvent::Frame(frame) => {
                if let Some(rec) = recorder.as_mut() {
                    if let Err(e) = rec.record(&frame.metrics) {
                        warn!(error = %e, "Run log write failed, recording stopped");
                        recorder = None;
                    }
                }
                if !cmd.json {
                    print!("{CLEAR_SCREEN}{}", dashboard.render(frame));
                }
            }
            DashboardEvent::RunCompleted(ranked) => {
                let run = ranked.run;
                if let Err(e) = storage.record_run(run.finished, run.seconds, &vehicle.model) {
                    warn!(error = %e, "Could not store run");
                }
                info!(seconds = ranked.run.seconds, rank = ?ranked.rank, "0-100 run");
            }
            DashboardEvent::Ghost(metrics) => dashboard.set_ghost(metrics.clone()),
            DashboardEvent::FuelMap(_) => {}
        }
        if cmd.json {
            println!("{}", serde_json::to_string(&event)?);
        }
    }

    handle.stop();
    drop(rx);
    let brain = task.await.context("poller task failed")?;

    if let Some(path) = &cmd.heatmap {
        std::fs::write(path, brain.fuel_map().to_pgm())
            .with_context(|| format!("writing heat map {}", path.display()))?;
        info!(path = %path.display(), "Fuel heat map written");
    }

    if !cmd.json {
        println!();
        print!("{}", render_heatmap(brain.fuel_map()));
        println!("Fuel used: {:.3} L", brain.fuel_total());
        if let Some(rec) = &recorder {
            println!("Run log:   {} ({} rows)", rec.path().display(), rec.rows());
        }
    }
    Ok(())
}

async fn handle_replay(config: &Config, cmd: ReplayCommand) -> anyhow::Result<()> {
    let storage = Storage::open(config.database_path())?;
    let vehicle = Calibrator::new(&storage, config).current()?;
    let replayer = Replayer::load(&cmd.file)
        .with_context(|| format!("loading run log {}", cmd.file.display()))?
        .with_vehicle_weight(vehicle.weight_kg);
    if replayer.is_empty() {
        bail!("{} holds no readable frames", cmd.file.display());
    }

    let best = replayer.best_runs(config.telemetry.leaderboard_size);
    let skipped = replayer.skipped();

    let (tx, mut rx) = mpsc::channel(CHANNEL_CAPACITY);
    let speed = cmd.speed;
    let player = tokio::spawn(async move { replayer.play(tx, speed).await });

    let mut dashboard = Dashboard::new(config.display.clone());
    while let Some(event) = rx.recv().await {
        if cmd.json {
            println!("{}", serde_json::to_string(&event)?);
        } else if let DashboardEvent::Frame(frame) = &event {
            print!("{CLEAR_SCREEN}{}", dashboard.render(frame));
        }
    }
    player.await.context("replay task failed")??;

    if !cmd.json {
        println!();
        println!("{}", gauges::leaderboard_label(best.times()));
        if skipped > 0 {
            println!("{skipped} unreadable rows skipped");
        }
    }
    Ok(())
}

fn handle_vehicle(config: &Config, cmd: VehicleCommand) -> anyhow::Result<()> {
    let storage = Storage::open(config.database_path())?;
    let calibrator = Calibrator::new(&storage, config);

    match cmd {
        VehicleCommand::Search {
            query,
            limit,
            format,
        } => {
            let results = storage.search(&query, limit)?;
            if results.is_empty() && format != OutputFormat::Json {
                println!("{}", calibration::search_miss_hint(&query));
            } else {
                print_vehicles(&results, format)?;
            }
        }
        VehicleCommand::Show { model, format } => match model {
            Some(model) => {
                let spec = storage
                    .vehicle(&model)?
                    .with_context(|| format!("vehicle not found: {model}"))?;
                print_vehicles(&[spec], format)?;
            }
            None => {
                let vehicle = calibrator.current()?;
                if format == OutputFormat::Json {
                    println!("{}", serde_json::to_string_pretty(&vehicle)?);
                } else {
                    println!("Model:         {}", vehicle.model);
                    println!("Displacement:  {} cc", vehicle.displacement_cc);
                    println!("Weight:        {} kg", vehicle.weight_kg);
                }
            }
        },
        VehicleCommand::List { format } => {
            let models = storage.models()?;
            if format == OutputFormat::Json {
                println!("{}", serde_json::to_string_pretty(&models)?);
            } else {
                for model in models {
                    println!("{model}");
                }
            }
        }
        VehicleCommand::Select { model } => {
            let calibrated = calibrator.select(&model)?;
            println!(
                "Active vehicle: {} ({} cc)",
                calibrated.vehicle.model, calibrated.vehicle.displacement_cc
            );
            if calibrated.simulated {
                println!("No adapter configured; figures will come from simulated data.");
            }
        }
        VehicleCommand::SetCc { cc } => {
            let cc = calibration::parse_displacement(&cc)?;
            let calibrated = calibrator.set_displacement(cc)?;
            println!(
                "Displacement for {} set to {} cc",
                calibrated.vehicle.model, calibrated.vehicle.displacement_cc
            );
            if calibrated.simulated {
                println!("No adapter configured; figures will come from simulated data.");
            }
        }
        VehicleCommand::Import { file } => {
            let count = storage.import_catalog(&file)?;
            println!("Imported {count} vehicles from {}", file.display());
        }
    }
    Ok(())
}

fn print_vehicles(vehicles: &[VehicleSpec], format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(vehicles)?),
        OutputFormat::Table => {
            println!("{:<28} {:>6} {:<8} {:>6} {:>5}", "MODEL", "CC", "FUEL", "KG", "CD");
            for v in vehicles {
                println!(
                    "{:<28} {:>6} {:<8} {:>6} {:>5.2}",
                    v.model, v.displacement_cc, v.fuel, v.weight_kg, v.drag_coefficient
                );
            }
        }
        OutputFormat::Plain => {
            for v in vehicles {
                println!(
                    "{}: {} cc, {}, {} kg, Cd {:.2}",
                    v.model, v.displacement_cc, v.fuel, v.weight_kg, v.drag_coefficient
                );
            }
        }
    }
    Ok(())
}

fn handle_leaderboard(config: &Config, cmd: &LeaderboardCommand) -> anyhow::Result<()> {
    let storage = Storage::open(config.database_path())?;
    let runs = storage.best_runs(cmd.limit, cmd.vehicle.as_deref())?;

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&runs)?);
        return Ok(());
    }
    if runs.is_empty() {
        println!("No runs recorded yet.");
        return Ok(());
    }
    println!("{:>3}  {:>7}  {:<28} {}", "#", "0-100", "VEHICLE", "WHEN");
    for (rank, run) in runs.iter().enumerate() {
        println!(
            "{:>3}  {:>6.2}s  {:<28} {}",
            rank + 1,
            run.seconds,
            run.vehicle,
            run.timestamp.format("%Y-%m-%d %H:%M")
        );
    }
    Ok(())
}

async fn handle_status(config: &Config, json: bool) -> anyhow::Result<()> {
    let storage = Storage::open(config.database_path())?;
    let vehicle = Calibrator::new(&storage, config).current()?;
    let stats = storage.stats()?;

    let adapter = if config.adapter.enabled {
        match Elm327::connect_tcp(&config.adapter.address, Timeouts::from_config(config)).await {
            Ok(_) => "connected".to_string(),
            Err(e) => format!("unavailable ({e})"),
        }
    } else {
        "disabled".to_string()
    };

    if json {
        let status = serde_json::json!({
            "adapter_address": config.adapter.address,
            "adapter": adapter,
            "vehicle": vehicle,
            "database_path": config.database_path(),
            "log_dir": config.log_dir(),
            "stats": stats,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("revline status");
        println!("--------------");
        println!("Adapter:       {} ({})", config.adapter.address, adapter);
        println!(
            "Vehicle:       {} ({} cc, {} kg)",
            vehicle.model, vehicle.displacement_cc, vehicle.weight_kg
        );
        println!("Database:      {}", config.database_path().display());
        println!("Run logs:      {}", config.log_dir().display());
        println!("Catalog:       {} vehicles", stats.vehicles);
        match stats.best_run {
            Some(best) => println!("Runs:          {} (best {best:.2}s)", stats.runs),
            None => println!("Runs:          {}", stats.runs),
        }
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                print_config(config);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            if !path.exists() {
                println!("File not found; defaults apply.");
            }
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}

fn print_config(config: &Config) {
    println!("Current Configuration");
    println!("=====================");
    println!();
    println!("[Adapter]");
    println!("  Enabled:            {}", config.adapter.enabled);
    println!("  Address:            {}", config.adapter.address);
    println!("  Connect timeout:    {} ms", config.adapter.connect_timeout_ms);
    println!("  Response timeout:   {} ms", config.adapter.response_timeout_ms);
    println!("  Probe timeout:      {} ms", config.adapter.probe_timeout_ms);
    println!();
    println!("[Vehicle]");
    println!("  Displacement:       {} cc", config.vehicle.displacement_cc);
    println!("  Weight:             {} kg", config.vehicle.weight_kg);
    println!();
    println!("[Telemetry]");
    println!("  Poll interval:      {} ms", config.telemetry.poll_interval_ms);
    println!("  Trim window:        {}", config.telemetry.trim_window);
    println!(
        "  Launch band:        {}-{} km/h",
        config.telemetry.launch_min_kmh, config.telemetry.launch_max_kmh
    );
    println!("  Target:             {} km/h", config.telemetry.target_kmh);
    println!("  Leaderboard size:   {}", config.telemetry.leaderboard_size);
    println!();
    println!("[Recording]");
    println!("  Enabled:            {}", config.recording.enabled);
    println!("  Log dir:            {}", config.log_dir().display());
    println!();
    println!("[Storage]");
    println!("  Database path:      {}", config.database_path().display());
    println!();
    println!("[Display]");
    println!(
        "  Redline:            {} rpm warm / {} rpm cold (warm above {} C)",
        config.display.redline_warm_rpm,
        config.display.redline_cold_rpm,
        config.display.warm_coolant_c
    );
    println!("  Stability alert:    {}", config.display.stability_alert);
}
