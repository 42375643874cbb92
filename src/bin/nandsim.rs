//! # nandsim CLI Entry Point
//!
//! Runs one of the benchmark-equivalent workloads against a simulated
//! drive and prints the latency report plus FTL statistics.
//!
//! ## Usage
//!
//! ```bash
//! # Sequential write + read sweep over 150 MB
//! nandsim bonnie 150
//!
//! # Random mixed R/W, 88% writes
//! nandsim postmark 150 0.88
//!
//! # Four interleaved stripes with a custom config file
//! nandsim tiotech 4 --config nandsim.conf
//! ```

use eyre::{bail, Result, WrapErr};
use std::env;

use nandsim::workload::postmark::PostmarkOptions;
use nandsim::workload::tiotech::TiotechOptions;
use nandsim::workload::{bonnie, postmark, tiotech, WorkloadReport};
use nandsim::{SimConfig, Ssd};

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let mut args: Vec<String> = env::args().skip(1).collect();

    if args.iter().any(|a| a == "--help" || a == "-h") || args.is_empty() {
        print_usage();
        return Ok(());
    }
    if args.iter().any(|a| a == "--version" || a == "-v") {
        println!("nandsim {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let config = match take_option(&mut args, "--config")? {
        Some(path) => SimConfig::from_file(&path)
            .wrap_err_with(|| format!("failed to load config '{}'", path))?,
        None => SimConfig::default(),
    };
    let mut ssd = Ssd::new(config)?;

    if args.is_empty() {
        print_usage();
        return Ok(());
    }
    let workload = args.remove(0);
    let (title, report): (&str, WorkloadReport) = match workload.as_str() {
        "bonnie" => {
            let dataset_mb = parse_arg(&args, 0, "dataset_MB")?;
            let write_passes = parse_or(&args, 1, 1u32)?;
            println!(
                "Bonnie-equivalent sequential workload: {} MB, {} write pass(es)",
                dataset_mb, write_passes
            );
            (
                "Bonnie Results",
                bonnie::run(&mut ssd, dataset_mb, write_passes)?,
            )
        }
        "postmark" => {
            let options = PostmarkOptions {
                dataset_mb: parse_arg(&args, 0, "dataset_MB")?,
                write_ratio: parse_arg(&args, 1, "write_ratio")?,
                ops_multiplier: parse_or(&args, 2, 20)?,
                warmup_multiplier: parse_or(&args, 3, 2)?,
                seed: parse_or(&args, 4, 1)?,
            };
            println!(
                "Postmark-equivalent random workload: {} MB, write_ratio={:.4}, seed={}",
                options.dataset_mb, options.write_ratio, options.seed
            );
            (
                "Postmark Results (Measured Phase)",
                postmark::run(&mut ssd, &options)?,
            )
        }
        "tiotech" => {
            let options = TiotechOptions {
                threads: parse_arg(&args, 0, "threads")?,
                dataset_mb: parse_or(&args, 1, 200)?,
                write_ratio: parse_or(&args, 2, 0.5)?,
                ops_multiplier: parse_or(&args, 3, 20)?,
                warmup_multiplier: parse_or(&args, 4, 2)?,
                seed: parse_or(&args, 5, 1)?,
            };
            println!(
                "Tiobench-equivalent interleaved workload: {} stripes over {} MB",
                options.threads, options.dataset_mb
            );
            (
                "Tiobench Results (Measured Phase)",
                tiotech::run(&mut ssd, &options)?,
            )
        }
        other => bail!("unknown workload '{}' (expected bonnie, postmark, or tiotech)", other),
    };

    println!();
    let mut stdout = std::io::stdout();
    report.print(title, ssd.config().page_size, &mut stdout)?;
    println!();
    ssd.print_statistics(&mut stdout)?;
    Ok(())
}

/// Remove `--name value` from the argument list, returning the value.
fn take_option(args: &mut Vec<String>, name: &str) -> Result<Option<String>> {
    let Some(index) = args.iter().position(|a| a == name) else {
        return Ok(None);
    };
    if index + 1 >= args.len() {
        bail!("{} requires a value", name);
    }
    let value = args.remove(index + 1);
    args.remove(index);
    Ok(Some(value))
}

fn parse_arg<T: std::str::FromStr>(args: &[String], index: usize, name: &str) -> Result<T> {
    let Some(raw) = args.get(index) else {
        bail!("missing argument <{}>; see --help", name);
    };
    match raw.parse() {
        Ok(value) => Ok(value),
        Err(_) => bail!("invalid value '{}' for <{}>", raw, name),
    }
}

fn parse_or<T: std::str::FromStr + Copy>(args: &[String], index: usize, default: T) -> Result<T> {
    match args.get(index) {
        None => Ok(default),
        Some(raw) => match raw.parse() {
            Ok(value) => Ok(value),
            Err(_) => bail!("invalid argument '{}'", raw),
        },
    }
}

fn print_usage() {
    println!("nandsim - NAND flash FTL simulator");
    println!();
    println!("USAGE:");
    println!("    nandsim <WORKLOAD> [ARGS...] [--config <path>]");
    println!();
    println!("WORKLOADS:");
    println!("    bonnie   <dataset_MB> [write_passes]");
    println!("             Sequential write pass(es) then sequential read");
    println!("    postmark <dataset_MB> <write_ratio> [ops_mul] [warmup_mul] [seed]");
    println!("             Prefill + warmup + measured random mixed R/W");
    println!("    tiotech  <threads> [dataset_MB] [write_ratio] [ops_mul] [warmup_mul] [seed]");
    println!("             Interleaved per-stripe random R/W");
    println!();
    println!("OPTIONS:");
    println!("    --config <path>    Load `KEY value` config overrides");
    println!("    -h, --help         Print help information");
    println!("    -v, --version      Print version information");
    println!();
    println!("EXAMPLES:");
    println!("    nandsim bonnie 150");
    println!("    nandsim postmark 150 0.8786");
    println!("    nandsim tiotech 6 200 0.5 20 2 1");
}
