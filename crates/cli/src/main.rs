#![forbid(unsafe_code)]

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use lpviz_api::catalog::{self, Example};
use lpviz_api::report::constraint_activity;
use lpviz_api::{feasible_region, FeasibleRegion, PivotRule, Solution, SolveStatus, Solver};
use lpviz_core::options::SolveOptions;
use lpviz_core::problem::{Problem, Sense};
use lpviz_io::{default_file_name, read_problem, write_problem, write_region, write_solution};
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "lpviz")]
#[command(version, about = "Linear programs with non-negative variables, solved and drawn")]
struct Cli {
    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true)]
    log_json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve a problem file.
    Solve {
        #[arg(long)]
        problem: PathBuf,
        #[arg(long)]
        tol: Option<f64>,
        #[arg(long)]
        max_iters: Option<usize>,
        /// Wall-clock limit in seconds.
        #[arg(long)]
        time_limit: Option<f64>,
        /// Use Bland's rule for every pivot.
        #[arg(long)]
        bland: bool,
        /// Also write the solution as JSON to this path.
        #[arg(long)]
        output: Option<PathBuf>,
        /// Print the solution as JSON instead of text.
        #[arg(long)]
        json: bool,
    },
    /// Validate a problem file without solving it.
    Check {
        #[arg(long)]
        problem: PathBuf,
    },
    /// Solve a two-variable problem and print its feasible region.
    Region {
        #[arg(long)]
        problem: PathBuf,
        /// Write the region as JSON to this path.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// List the built-in examples, or show one.
    Example {
        name: Option<String>,
        /// Save the example as a problem file. A directory gets the default file name.
        #[arg(long)]
        output: Option<PathBuf>,
        #[arg(long)]
        solve: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    initialize_tracing(cli.log_json)?;
    match cli.command {
        Commands::Solve {
            problem,
            tol,
            max_iters,
            time_limit,
            bland,
            output,
            json,
        } => {
            let options = solve_options(tol, max_iters, time_limit, bland)?;
            solve_command(problem, options, output, json)
        }
        Commands::Check { problem } => check_command(problem),
        Commands::Region { problem, output } => region_command(problem, output),
        Commands::Example {
            name,
            output,
            solve,
        } => example_command(name, output, solve),
    }
}

fn initialize_tracing(log_json: bool) -> Result<()> {
    if log_json {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .json()
            .try_init()
            .ok();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .try_init()
            .ok();
    }
    Ok(())
}

fn solve_options(
    tol: Option<f64>,
    max_iters: Option<usize>,
    time_limit: Option<f64>,
    bland: bool,
) -> Result<SolveOptions> {
    let mut options = SolveOptions::default();
    if let Some(tolerance) = tol {
        if !(tolerance.is_finite() && tolerance > 0.0) {
            return Err(anyhow!("--tol must be a positive number, got {tolerance}"));
        }
        options.tolerance = tolerance;
    }
    if let Some(iters) = max_iters {
        options.max_iterations = iters;
    }
    if let Some(limit) = time_limit {
        let limit = Duration::try_from_secs_f64(limit)
            .with_context(|| format!("invalid --time-limit {limit}"))?;
        options.max_time = Some(limit);
    }
    if bland {
        options.pivot_rule = PivotRule::Bland;
    }
    Ok(options)
}

fn solve_command(
    path: PathBuf,
    options: SolveOptions,
    output: Option<PathBuf>,
    output_json: bool,
) -> Result<()> {
    let problem = read_problem(&path)?;
    let solution = Solver::new().options(options).solve(&problem);
    if output_json {
        print_json(&solution)?;
    } else {
        print_solution(&problem, &solution);
    }
    if let Some(path) = output {
        write_solution(path, &solution)?;
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    serde_json::to_writer_pretty(&mut handle, value)?;
    handle.write_all(b"\n")?;
    handle.flush()?;
    Ok(())
}

fn print_solution(problem: &Problem, solution: &Solution) {
    println!("status: {} ({})", solution.status, solution.status.describe());
    if let Some(message) = &solution.message {
        println!("message: {message}");
    }
    if let (Some(objective), Some(values)) = (solution.objective_value, &solution.values) {
        let label = match problem.sense() {
            Sense::Maximize => "maximum",
            Sense::Minimize => "minimum",
        };
        println!("{label} value: {objective:.6}");
        for (i, value) in values.iter().enumerate() {
            println!("  x{} = {value:.6}", i + 1);
        }
    }
    if let Some(iterations) = solution.iterations {
        println!("iterations: {iterations}");
    }
    let activity = constraint_activity(problem, solution);
    if !activity.is_empty() {
        println!("constraints:");
        for row in activity {
            let usage = row
                .usage_percent()
                .map(|p| format!(" ({p:.0}%)"))
                .unwrap_or_default();
            let state = if row.binding { "binding" } else { "slack" };
            println!(
                "  c{}: {:.6} {} {:.6}{usage}, {state} {:.6}",
                row.index + 1,
                row.lhs,
                row.relation,
                row.bound,
                row.slack
            );
        }
    }
}

fn check_command(path: PathBuf) -> Result<()> {
    let problem = read_problem(&path).context("problem validation failed")?;
    println!(
        "valid: {} variables, {} constraints",
        problem.nvars(),
        problem.nconstraints()
    );
    Ok(())
}

fn region_command(path: PathBuf, output: Option<PathBuf>) -> Result<()> {
    let problem = read_problem(&path)?;
    let solution = Solver::new().solve(&problem);
    let region = feasible_region(&problem, Some(&solution))
        .with_context(|| format!("cannot draw {:?}", path))?;
    print_region(&solution, &region);
    if let Some(path) = output {
        write_region(path, &region)?;
    }
    Ok(())
}

fn print_region(solution: &Solution, region: &FeasibleRegion) {
    println!("status: {}", solution.status);
    println!("shape: {:?}", region.shape);
    println!("viewport: [0, {}] x [0, {}]", region.viewport.extent, region.viewport.extent);
    println!("vertices:");
    for vertex in &region.vertices {
        println!("  ({:.6}, {:.6})", vertex.x, vertex.y);
    }
    for segment in &region.segments {
        println!(
            "c{}: ({:.6}, {:.6}) -> ({:.6}, {:.6})",
            segment.constraint + 1,
            segment.start.x,
            segment.start.y,
            segment.end.x,
            segment.end.y
        );
    }
    if let Some(optimum) = region.optimum {
        println!("optimum: ({:.6}, {:.6})", optimum.x, optimum.y);
    }
}

fn example_command(name: Option<String>, output: Option<PathBuf>, solve: bool) -> Result<()> {
    let Some(name) = name else {
        for example in catalog::all() {
            println!("{:<16}{}", example.name, example.title);
        }
        return Ok(());
    };
    let example = catalog::find(&name).ok_or_else(|| {
        let known: Vec<&str> = catalog::all().iter().map(|e| e.name).collect();
        anyhow!("unknown example {name:?}; choose one of {}", known.join(", "))
    })?;
    print_example(&example);
    if let Some(path) = output {
        let path = if path.is_dir() {
            path.join(default_file_name(&example.problem))
        } else {
            path
        };
        write_problem(&path, &example.problem)?;
        println!("saved to {}", path.display());
    }
    if solve {
        println!();
        let solution = Solver::new().solve(&example.problem);
        print_solution(&example.problem, &solution);
        if solution.status == SolveStatus::Optimal && example.problem.nvars() == 2 {
            let region = feasible_region(&example.problem, Some(&solution))?;
            println!();
            print_region(&solution, &region);
        }
    }
    Ok(())
}

fn print_example(example: &Example) {
    println!("{}", example.title);
    println!("{}", example.description);
    println!();
    println!("{}", example.problem);
}
