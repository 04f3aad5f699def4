use anyhow::Result;
use clap::{Parser, ValueEnum};
use log::info;

use traffic_grid::benchmark::{run_episode, Aggregate, SpawnSchedule};
use traffic_grid::control::{FixedTimer, LongestQueue, PhaseController};
use traffic_grid::simulation::{
    SimConfig, Simulation, DEFAULT_MAX_CARS, DEFAULT_RESTART_DELAY, DEFAULT_SPAWN_RATE,
    DEFAULT_TICKS_PER_SECOND,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ControllerKind {
    /// Automatic light timers
    Fixed,
    /// Green for the axis with the longer queues
    LongestQueue,
}

impl ControllerKind {
    fn build(self) -> Box<dyn PhaseController> {
        match self {
            ControllerKind::Fixed => Box::new(FixedTimer),
            ControllerKind::LongestQueue => Box::new(LongestQueue::default()),
        }
    }
}

#[derive(Parser)]
#[command(name = "traffic_grid")]
#[command(about = "Headless grid traffic simulation with light controllers")]
struct Cli {
    /// Number of simulation ticks per episode
    #[arg(long, default_value = "2000")]
    ticks: u64,

    /// Spawn a car every N ticks
    #[arg(long, default_value_t = DEFAULT_SPAWN_RATE)]
    spawn_rate: u32,

    /// Cycle the spawn interval through a fixed high/low traffic pattern
    #[arg(long)]
    fluctuating: bool,

    /// Population cap
    #[arg(long, default_value_t = DEFAULT_MAX_CARS)]
    max_cars: usize,

    /// Reaction lag in ticks for cars resuming after a stop (0 disables)
    #[arg(long, default_value_t = DEFAULT_RESTART_DELAY)]
    restart_delay: u32,

    /// Seed for reproducible runs; run i uses seed + i
    #[arg(long)]
    seed: Option<u64>,

    /// Light controller
    #[arg(long, value_enum, default_value_t = ControllerKind::Fixed)]
    controller: ControllerKind,

    /// Number of episodes; more than one prints aggregate statistics
    #[arg(long, default_value = "1")]
    runs: usize,

    /// Print a summary every N ticks of a single run (0 = only at the end)
    #[arg(long, default_value = "0")]
    report_every: u64,

    /// Draw the map with each summary
    #[arg(long)]
    draw: bool,
}

impl Cli {
    fn schedule(&self) -> SpawnSchedule {
        if self.fluctuating {
            SpawnSchedule::Fluctuating
        } else {
            SpawnSchedule::Fixed(self.spawn_rate)
        }
    }

    fn config(&self, run: usize) -> SimConfig {
        SimConfig {
            spawn_rate: self.spawn_rate,
            max_cars: self.max_cars,
            ticks_per_second: DEFAULT_TICKS_PER_SECOND,
            restart_delay: self.restart_delay,
            seed: self.seed.map(|seed| seed.wrapping_add(run as u64)),
            ..SimConfig::default()
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    if cli.runs > 1 {
        run_batch(&cli)
    } else {
        run_single(&cli)
    }
}

/// Run one episode, printing progress to the terminal
fn run_single(cli: &Cli) -> Result<()> {
    let mut controller = cli.controller.build();
    let schedule = cli.schedule();
    let mut sim = Simulation::new(cli.config(0));

    info!(
        "Running {} ticks with the {} controller",
        cli.ticks,
        controller.name()
    );
    if cli.draw {
        sim.draw_map();
    }

    let mut max_wait_ticks = 0;
    for tick in 0..cli.ticks {
        sim.spawn_rate = schedule.rate_at(tick);
        controller.apply(&mut sim)?;
        sim.step();

        let longest = sim
            .cars()
            .iter()
            .map(|car| car.total_wait_ticks)
            .max()
            .unwrap_or(0);
        max_wait_ticks = max_wait_ticks.max(longest);

        if cli.report_every > 0 && sim.tick_count() % cli.report_every == 0 {
            println!("--- After tick {} ---", sim.tick_count());
            sim.print_summary();
            if cli.draw {
                sim.draw_map();
            }
            println!();
        }
    }

    let ticks_per_second = f64::from(sim.config().ticks_per_second);
    info!("=== SIMULATION COMPLETE ===");
    info!("Controller: {}", controller.name());
    info!("Ticks: {}", sim.tick_count());
    info!("Total cars spawned: {}", sim.total_cars_spawned());
    info!("Total cars exited: {}", sim.cars_exited());
    info!("Active cars: {}", sim.cars().len());
    info!("Average wait time: {:.2}s", sim.average_wait_time_seconds());
    info!(
        "Max wait time: {:.2}s",
        max_wait_ticks as f64 / ticks_per_second
    );
    info!(
        "Average queue length (last 10s): {:.2}",
        sim.average_queue_length()
    );
    info!("Max queue length: {}", sim.max_queue_length());
    Ok(())
}

/// Run several episodes and report aggregate statistics
fn run_batch(cli: &Cli) -> Result<()> {
    let mut controller = cli.controller.build();
    let schedule = cli.schedule();

    info!(
        "Running {} episodes of {} ticks with the {} controller",
        cli.runs,
        cli.ticks,
        controller.name()
    );

    let mut runs = Vec::with_capacity(cli.runs);
    for run in 0..cli.runs {
        let summary = run_episode(cli.config(run), controller.as_mut(), schedule, cli.ticks)?;
        runs.push(summary);
        // Controllers keep per-episode phase state
        controller = cli.controller.build();
    }

    let aggregate = Aggregate::from_runs(&runs);
    info!("=== SIMULATION COMPLETE ===");
    info!("Controller: {}", controller.name());
    info!("Runs: {}", aggregate.runs);
    info!(
        "Average wait time: {:.2}s ± {:.2} (std {:.2}, min {:.2}, max {:.2})",
        aggregate.wait_time.mean,
        aggregate.wait_time.ci95,
        aggregate.wait_time.std_dev,
        aggregate.wait_time.min,
        aggregate.wait_time.max
    );
    info!(
        "Max wait time: {:.2}s (std {:.2})",
        aggregate.max_wait_time.mean, aggregate.max_wait_time.std_dev
    );
    info!(
        "Average queue length: {:.2} ± {:.2} (min {:.2}, max {:.2})",
        aggregate.queue_length.mean,
        aggregate.queue_length.ci95,
        aggregate.queue_length.min,
        aggregate.queue_length.max
    );
    info!(
        "Max queue length: {:.1} (std {:.2})",
        aggregate.max_queue_length.mean, aggregate.max_queue_length.std_dev
    );
    info!("Total cars spawned: {:.1}", aggregate.cars_spawned.mean);
    Ok(())
}
