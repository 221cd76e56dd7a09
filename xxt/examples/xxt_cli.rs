#[cfg(feature = "cli")]
use clap::{Parser, ValueEnum};

#[cfg(feature = "cli")]
use xxt::gallery::{block_owner, GlobalMatrix};
#[cfg(feature = "cli")]
use xxt::{FactorConfig, HandleRegistry, Hypercube, ThreadCluster, XxtError, XxtStats};

#[cfg(feature = "cli")]
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(about = "XXT CLI - Factor and solve a model Laplacian on simulated processes")]
struct Cli {
    /// Number of simulated processes (power of two)
    #[arg(short, long, default_value_t = 4)]
    processes: usize,

    /// Grid points per dimension
    #[arg(short, long, default_value_t = 32)]
    size: usize,

    /// Model problem
    #[arg(long, value_enum, default_value_t = Problem::Laplace2d)]
    problem: Problem,

    /// Number of solves with the same factor
    #[arg(long, default_value_t = 1)]
    solves: usize,

    /// JSON file with a factor configuration
    #[arg(long)]
    config: Option<std::path::PathBuf>,

    /// Print statistics as JSON
    #[arg(long)]
    json: bool,
}

#[cfg(feature = "cli")]
#[derive(Clone, Copy, ValueEnum)]
enum Problem {
    /// tridiag(-1, 2, -1)
    Laplace1d,
    /// Five-point stencil
    Laplace2d,
}

#[cfg(feature = "cli")]
fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    let start_time = std::time::Instant::now();

    match run(&cli) {
        Ok((stats, residual)) => {
            if cli.json {
                match serde_json::to_string_pretty(&stats) {
                    Ok(json) => println!("{json}"),
                    Err(e) => {
                        eprintln!("Error: {e}");
                        return std::process::ExitCode::FAILURE;
                    }
                }
            } else {
                println!("{stats}");
                println!("max residual |b - A·x| = {residual:.3e}");
            }
            let elapsed = start_time.elapsed();
            println!("Completed in {elapsed:.2?}");
            std::process::ExitCode::SUCCESS
        }
        Err(message) => {
            eprintln!("Error: {message}");
            std::process::ExitCode::FAILURE
        }
    }
}

#[cfg(feature = "cli")]
fn run(cli: &Cli) -> Result<(XxtStats, f64), String> {
    let config = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
            FactorConfig::from_json(&text).map_err(|e| format!("invalid config: {e}"))?
        }
        None => FactorConfig::default(),
    };

    let matrix = match cli.problem {
        Problem::Laplace1d => GlobalMatrix::laplacian_1d(cli.size),
        Problem::Laplace2d => GlobalMatrix::laplacian_2d(cli.size, cli.size),
    };
    let n = matrix.size();
    let owner = block_owner(n, cli.processes);
    let rhs = vec![1.0; n];

    let pieces = ThreadCluster::new(cli.processes)
        .run(|comm| {
            let problem = matrix.distribute(&owner, comm.rank());
            let registry = HandleRegistry::new();
            let mut solver = registry.create(comm).with_config(config.clone());
            let m = problem.m();
            solver.factor(&problem.local2global, problem.n, m, problem.matrix.clone())?;

            let b = problem.restrict(&rhs);
            let mut x = vec![0.0; problem.n];
            for _ in 0..cli.solves.max(1) {
                solver.solve(&b, &mut x)?;
            }
            let stats = solver.stats()?;
            Ok::<_, XxtError>((problem.local2global[..problem.n].to_vec(), x, stats))
        })
        .map_err(|e| e.to_string())?;

    let mut x = vec![0.0; n];
    let mut stats = None;
    for piece in pieces {
        let (owned, local, piece_stats) = piece.map_err(|e| e.to_string())?;
        for (gid, value) in owned.into_iter().zip(local) {
            x[gid as usize] = value;
        }
        stats.get_or_insert(piece_stats);
    }

    let residual = matrix
        .apply(&x)
        .iter()
        .zip(&rhs)
        .map(|(ax, b)| (b - ax).abs())
        .fold(0.0, f64::max);
    let stats = stats.ok_or_else(|| "no processes ran".to_string())?;
    Ok((stats, residual))
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("This example requires the 'cli' feature to be enabled.");
    eprintln!("Run with: cargo run --features cli --example xxt_cli");
    std::process::exit(1);
}
