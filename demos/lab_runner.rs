//! Runs one of the ready-made labs headless and prints a run summary.
//!
//! Usage: `lab_runner [--lab NAME] [--frames N] [--config FILE] [--set UNIT:NAME=VALUE]... [--parallel] [--json]`
//!
//! Frames past steady state are throttled to one tick per `throttle_interval`.

use std::cell::Cell;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;

use clap::Parser;
use log::info;
use serde::Serialize;

use proclab::{
    ConcurrencyMode, LabKind, RecordingDisplay, SimulationConfig, SimulationEngine,
    SimulationObserver, UnitId,
};

#[derive(Parser, Debug)]
#[command(name = "lab_runner")]
#[command(about = "Run a process lab until steady state or a frame limit")]
struct Args {
    /// Lab to run: water-tank, heat-exchanger or bioreactor
    #[arg(long, default_value = "water-tank")]
    lab: LabKind,

    /// Number of frames to drive the lab for
    #[arg(long, default_value = "5000")]
    frames: u64,

    /// Parameter override applied after reset, e.g. `--set 0:Flow=1.5`
    #[arg(long = "set", value_parser = parse_override)]
    overrides: Vec<Override>,

    /// JSON file holding a SimulationConfig; the lab's default otherwise
    #[arg(long)]
    config: Option<PathBuf>,

    /// Update field nodes in parallel on a rayon pool
    #[arg(long)]
    parallel: bool,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone)]
struct Override {
    unit: usize,
    name: String,
    value: f64,
}

fn parse_override(arg: &str) -> Result<Override, String> {
    let (unit, rest) = arg
        .split_once(':')
        .ok_or_else(|| format!("expected UNIT:NAME=VALUE, got '{}'", arg))?;
    let (name, value) = rest
        .split_once('=')
        .ok_or_else(|| format!("expected UNIT:NAME=VALUE, got '{}'", arg))?;
    Ok(Override {
        unit: unit.trim().parse().map_err(|e| format!("bad unit index '{}': {}", unit, e))?,
        name: name.trim().to_string(),
        value: value.trim().parse().map_err(|e| format!("bad value '{}': {}", value, e))?,
    })
}

#[derive(Debug, Serialize)]
struct UnitSummary {
    name: String,
    parameters: BTreeMap<String, f64>,
    outputs: BTreeMap<String, f64>,
}

#[derive(Debug, Serialize)]
struct RunSummary {
    lab: String,
    run_id: String,
    config: SimulationConfig,
    frames: u64,
    ticks: u64,
    ticks_to_steady_state: Option<u64>,
    sim_time: f64,
    converged: bool,
    converged_at: Option<f64>,
    units: Vec<UnitSummary>,
}

/// First (tick, sim time) at which steady state was reached
type FirstConvergence = Rc<Cell<Option<(u64, f64)>>>;

/// Logs convergence transitions and remembers the first steady state
struct ConvergenceLog {
    first: FirstConvergence,
}

impl SimulationObserver for ConvergenceLog {
    fn on_tick(&mut self, tick: u64, sim_time: f64, converged: bool) {
        if tick % 500 == 0 {
            info!("tick {} at t = {:.2}", tick, sim_time);
        }
        if converged && self.first.get().is_none() {
            self.first.set(Some((tick, sim_time)));
        }
    }

    fn on_convergence_change(&mut self, converged: bool, sim_time: f64) {
        if converged {
            info!("steady state at t = {:.2}", sim_time);
        } else {
            info!("left steady state at t = {:.2}", sim_time);
        }
    }
}

fn load_config(args: &Args) -> Result<SimulationConfig, Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => serde_json::from_str(&fs::read_to_string(path)?)?,
        None => args.lab.default_config(),
    };
    if args.parallel {
        config = config.with_concurrency(ConcurrencyMode::Rayon);
        if config.thread_pool_size.is_none() {
            config = config.with_thread_pool_size(num_threads());
        }
    }
    Ok(config)
}

fn num_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .format_timestamp(None)
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;
    config.validate()?;

    let orchestrator = args.lab.builder(config.clone())?.build(RecordingDisplay::new())?;
    let throttle = config.throttle_interval;
    let mut engine = SimulationEngine::new(orchestrator, Some(args.frames), throttle);

    let first = FirstConvergence::default();
    engine.add_observer(Box::new(ConvergenceLog {
        first: Rc::clone(&first),
    }));

    for o in &args.overrides {
        let orchestrator = engine.orchestrator_mut();
        orchestrator.display_mut().set_parameter(UnitId(o.unit), &o.name, o.value);
        orchestrator.notify_parameter_changed(UnitId(o.unit))?;
        info!("unit {} {} set to {}", o.unit, o.name, o.value);
    }

    let frames = engine.run()?;

    let orchestrator = engine.orchestrator();
    let units = (0..orchestrator.unit_count())
        .filter_map(|i| orchestrator.unit(UnitId(i)))
        .map(|unit| UnitSummary {
            name: unit.name().to_string(),
            parameters: unit
                .parameters()
                .iter()
                .map(|d| (d.name.clone(), d.current))
                .collect(),
            outputs: unit
                .exposed_fields()
                .into_iter()
                .filter_map(|f| unit.exposed_value(f).map(|v| (f.to_string(), v)))
                .collect(),
        })
        .collect();

    let summary = RunSummary {
        lab: args.lab.to_string(),
        run_id: orchestrator.run_id().to_string(),
        config,
        frames,
        ticks: orchestrator.clock().ticks(),
        ticks_to_steady_state: first.get().map(|(tick, _)| tick),
        sim_time: orchestrator.clock().sim_time(),
        converged: orchestrator.is_converged(),
        converged_at: first.get().map(|(_, t)| t),
        units,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!("Lab {} (run {})", summary.lab, summary.run_id);
    println!(
        "  {} frames, {} ticks, t = {:.3}",
        summary.frames, summary.ticks, summary.sim_time
    );
    match (summary.ticks_to_steady_state, summary.converged_at) {
        (Some(n), Some(t)) => println!("  steady state after {} ticks (t = {:.3})", n, t),
        _ => println!("  no steady state within the frame limit"),
    }
    if !summary.converged {
        println!("  still active at the last frame");
    }
    for unit in &summary.units {
        println!("  {}", unit.name);
        for (name, value) in &unit.outputs {
            println!("    {:<14} {:>12.4}", name, value);
        }
    }
}
