use clap::Parser;
use pim_kv_tracegen::config::ModelConfig;
use pim_kv_tracegen::{Config, MetricsSummary, ProgressInfo, Simulator, TraceWriter};
use std::path::{Path, PathBuf};
use std::time::Instant;

#[cfg(feature = "cli")]
use colored::Colorize;
#[cfg(feature = "cli")]
use tabled::{settings::Style, Table, Tabled};

#[derive(Parser, Debug)]
#[command(author, version, about = "PIM KV-cache channel allocation trace generator", long_about = None)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Tab-separated workload file (overrides config file)
    #[arg(short, long)]
    dataset: Option<PathBuf>,

    /// Channel assignment algorithm: rr, rrn or clb
    #[arg(short, long)]
    algorithm: Option<String>,

    #[arg(short, long)]
    batch_size: Option<usize>,

    /// Model preset in billions of parameters: 7, 13, 30 or 175
    #[arg(short, long)]
    model_size: Option<u32>,

    /// Tensor-parallel degree
    #[arg(long)]
    tp: Option<u32>,

    /// Pipeline-parallel degree
    #[arg(long)]
    pp: Option<u32>,

    /// Override the random seed (overrides config file)
    #[arg(long)]
    seed: Option<u64>,

    /// Directory for trace CSV files
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Save the run summary to a JSON file
    #[arg(short, long)]
    summary: Option<PathBuf>,

    /// Minimal output (final metrics only)
    #[arg(short, long)]
    quiet: bool,

    /// Report every log interval, not only snapshots
    #[arg(short, long)]
    verbose: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum VerbosityLevel {
    Quiet,
    Normal,
    Verbose,
}

impl Args {
    fn verbosity_level(&self) -> VerbosityLevel {
        if self.verbose {
            VerbosityLevel::Verbose
        } else if self.quiet {
            VerbosityLevel::Quiet
        } else {
            VerbosityLevel::Normal
        }
    }

    /// Apply command-line overrides on top of the file configuration
    fn apply_overrides(&self, config: &mut Config) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(size) = self.model_size {
            let max_seq_len = config.model.max_seq_len;
            config.model = ModelConfig::preset(
                size,
                config.model.tensor_parallel,
                config.model.pipeline_parallel,
            )?;
            config.model.max_seq_len = max_seq_len;
        }
        if let Some(tp) = self.tp {
            config.model.tensor_parallel = tp;
        }
        if let Some(pp) = self.pp {
            config.model.pipeline_parallel = pp;
        }
        if let Some(batch_size) = self.batch_size {
            config.scheduler.max_batch_size = batch_size;
        }
        if let Some(algorithm) = &self.algorithm {
            config.scheduler.algorithm = algorithm.clone();
        }
        if let Some(seed) = self.seed {
            config.workload.seed = seed;
        }
        if let Some(dir) = &self.output_dir {
            config.simulation.output_dir = dir.clone();
        }
        if let Some(dataset) = &self.dataset {
            if config.simulation.trace_label == "synthetic" {
                config.simulation.trace_label = dataset_label(dataset);
            }
            config.workload.dataset_path = Some(dataset.clone());
        }
        Ok(())
    }
}

/// Name traces after the dataset: its directory for `<name>/stats.tsv`, else the file stem
fn dataset_label(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "dataset".to_string());
    if stem == "stats" {
        if let Some(dir) = path.parent().and_then(|p| p.file_name()) {
            return dir.to_string_lossy().into_owned();
        }
    }
    stem
}

#[cfg(feature = "cli")]
#[derive(Tabled)]
struct ChannelRow {
    #[tabled(rename = "Channel")]
    channel: usize,
    #[tabled(rename = "Assigned")]
    assigned: u64,
    #[tabled(rename = "Share")]
    share: String,
}

#[cfg(feature = "cli")]
#[derive(Tabled)]
struct MetricRow {
    #[tabled(rename = "Metric")]
    metric: String,
    #[tabled(rename = "Value")]
    value: String,
}

fn main() {
    env_logger::init();

    let args = Args::parse();
    let verbosity = args.verbosity_level();
    let use_color = !args.no_color;

    if verbosity >= VerbosityLevel::Normal {
        print_heading("PIM KV-Cache Trace Generator", use_color);
        println!("Loading configuration from: {:?}\n", args.config);
    }

    let mut config = match Config::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = args.apply_overrides(&mut config) {
        eprintln!("Error applying overrides: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {}", e);
        std::process::exit(1);
    }

    let writer = match TraceWriter::from_config(&config) {
        Ok(writer) => writer,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let mut simulator = match Simulator::new(config.clone()) {
        Ok(sim) => sim,
        Err(e) => {
            eprintln!("Error creating simulator: {}", e);
            std::process::exit(1);
        }
    };

    if verbosity >= VerbosityLevel::Normal {
        print_configuration(&config, &simulator, use_color);
    }

    let start_time = Instant::now();
    let mut write_error = None;

    let result = simulator.run_with_callback(|progress| {
        if let Some(snapshot) = progress.snapshot {
            match writer.write(snapshot) {
                Ok(path) => {
                    if verbosity >= VerbosityLevel::Normal {
                        println!("  wrote {}", path.display());
                    }
                }
                Err(e) => {
                    if write_error.is_none() {
                        write_error = Some(e);
                    }
                }
            }
        }
        if verbosity >= VerbosityLevel::Verbose {
            print_progress(&progress, use_color);
        }
    });

    let elapsed = start_time.elapsed();

    if let Err(e) = result {
        eprintln!("Simulation aborted at cycle {}: {}", simulator.get_current_cycle(), e);
        print_final_metrics(&simulator.get_metrics_summary(), elapsed, use_color);
        std::process::exit(1);
    }

    if let Some(e) = write_error {
        eprintln!("Error writing traces to {:?}: {}", writer.output_dir(), e);
        std::process::exit(1);
    }

    let summary = simulator.get_metrics_summary();
    print_final_metrics(&summary, elapsed, use_color);

    if let Some(output_path) = args.summary {
        match save_summary_json(&summary, &output_path) {
            Ok(_) => {
                if verbosity >= VerbosityLevel::Normal {
                    println!("\nSummary saved to: {:?}", output_path);
                }
            }
            Err(e) => {
                eprintln!("Error saving summary to JSON: {}", e);
            }
        }
    }
}

fn print_heading(text: &str, use_color: bool) {
    #[cfg(feature = "cli")]
    if use_color {
        println!("{}", text.bright_cyan().bold());
        return;
    }
    let _ = use_color;
    println!("{}", text);
}

fn print_section(text: &str, use_color: bool) {
    #[cfg(feature = "cli")]
    if use_color {
        println!("\n{}", text.yellow().bold());
        return;
    }
    let _ = use_color;
    println!("\n{}", text);
}

fn print_configuration(config: &Config, simulator: &Simulator, use_color: bool) {
    print_section("Configuration:", use_color);
    let scheduler = simulator.scheduler();
    let generator = scheduler.generator();
    println!(
        "  Hardware: {} ({} channels, {} tiles each)",
        config.hardware.name,
        config.hardware.num_channels,
        scheduler.engine().channel_capacity_tiles()
    );
    println!(
        "  Model: {} (TP={}, PP={})",
        config.model.name, config.model.tensor_parallel, config.model.pipeline_parallel
    );
    println!("  Batch size: {}", config.scheduler.max_batch_size);
    println!("  Algorithm: {}", scheduler.algorithm());
    match &config.workload.dataset_path {
        Some(path) => println!("  Workload: {:?} ({} templates)", path, generator.num_templates()),
        None => println!("  Workload: synthetic ({} templates)", generator.num_templates()),
    }
    println!("  Seed: {}", config.workload.seed);
    println!(
        "  Steps: {} x {} cycles, warm-up {}, {} snapshots",
        config.simulation.num_steps,
        config.simulation.cycles_per_step,
        config.simulation.warmup_steps,
        config.simulation.num_snapshots
    );
    println!();
}

fn print_progress(progress: &ProgressInfo, use_color: bool) {
    let line = format!(
        "[step {}/{}] cycle {} | {} ongoing, {} completed | avg seq {:.1} | spread {:.1} | min tiles left {} | {:.1}% used",
        progress.step,
        progress.total_steps,
        progress.cycle_count,
        progress.ongoing,
        progress.completed_requests,
        progress.mean_seq_len,
        progress.mean_latency_spread,
        progress.min_tiles_left,
        progress.utilization * 100.0,
    );
    #[cfg(feature = "cli")]
    if use_color && progress.snapshot.is_some() {
        println!("{}", line.green());
        return;
    }
    let _ = use_color;
    println!("{}", line);
}

#[cfg(feature = "cli")]
fn print_final_metrics(summary: &MetricsSummary, real_time: std::time::Duration, use_color: bool) {
    if use_color {
        println!(
            "\n{} ({} snapshots, {:.2}s real)",
            "Trace Generation Complete".bright_green().bold(),
            summary.snapshots_taken,
            real_time.as_secs_f64()
        );
        println!("{}", "━".repeat(60).bright_black());
    } else {
        println!(
            "\nTrace Generation Complete ({} snapshots, {:.2}s real)",
            summary.snapshots_taken,
            real_time.as_secs_f64()
        );
        println!("{}", "━".repeat(60));
    }

    print_section("LOAD BALANCE", use_color);
    let metric_rows = vec![
        MetricRow {
            metric: "Steps".to_string(),
            value: summary.steps_recorded.to_string(),
        },
        MetricRow {
            metric: "Completed requests".to_string(),
            value: summary.completed_requests.to_string(),
        },
        MetricRow {
            metric: "Latency spread mean (cycles)".to_string(),
            value: format!("{:.1}", summary.mean_latency_spread),
        },
        MetricRow {
            metric: "Latency spread max (cycles)".to_string(),
            value: summary.max_latency_spread.to_string(),
        },
        MetricRow {
            metric: "Seq len p50 / p90 / p99".to_string(),
            value: format!(
                "{:.1} / {:.1} / {:.1}",
                summary.seq_len_p50, summary.seq_len_p90, summary.seq_len_p99
            ),
        },
        MetricRow {
            metric: "Min tiles left".to_string(),
            value: summary.min_tiles_left.to_string(),
        },
        MetricRow {
            metric: "Peak utilization".to_string(),
            value: format!("{:.1}%", summary.peak_utilization * 100.0),
        },
    ];
    println!("{}", Table::new(&metric_rows).with(Style::rounded()).to_string());

    print_section("ASSIGNMENTS PER CHANNEL", use_color);
    let total: u64 = summary.assignments_per_channel.iter().sum();
    let channel_rows: Vec<ChannelRow> = summary
        .assignments_per_channel
        .iter()
        .enumerate()
        .map(|(channel, &assigned)| ChannelRow {
            channel,
            assigned,
            share: if total > 0 {
                format!("{:.2}%", assigned as f64 / total as f64 * 100.0)
            } else {
                "-".to_string()
            },
        })
        .collect();
    println!("{}", Table::new(&channel_rows).with(Style::rounded()).to_string());
    println!(
        "  • Imbalance (max/min): {:.3}",
        summary.assignment_imbalance()
    );
}

#[cfg(not(feature = "cli"))]
fn print_final_metrics(summary: &MetricsSummary, real_time: std::time::Duration, _use_color: bool) {
    println!(
        "\nTrace Generation Complete ({:.2}s real)",
        real_time.as_secs_f64()
    );
    summary.print();
}

fn save_summary_json(
    summary: &MetricsSummary,
    path: &PathBuf,
) -> Result<(), Box<dyn std::error::Error>> {
    std::fs::write(path, serde_json::to_string_pretty(summary)?)?;
    Ok(())
}
