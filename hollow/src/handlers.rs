use anyhow::{Context, Result};
use clap::ArgMatches;
use colored::Colorize;
use hollow_core::fuzz::{FuzzOptions, FuzzResultCallback, FuzzSession};
use hollow_core::report::{
    FoundOrder, ReportFormat, gather_report_data, generate_report, write_report,
};
use hollow_core::wordlist::{
    DEFAULT_CONFIG_DIR, default_wordlist_path, install_default_wordlist, resolve_wordlist,
};
use hollow_scanner::{ProbeMethod, ProbeResult, RateLimit, Snapshot};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{Level, debug};
use url::Url;

/// Parse a base URL, adding http:// when no scheme is given
pub fn parse_url_line(line: &str) -> Option<String> {
    let line = line.trim();
    let candidate = if line.starts_with("http://") || line.starts_with("https://") {
        line.to_string()
    } else {
        format!("http://{}", line)
    };

    match Url::parse(&candidate) {
        Ok(url) if url.host_str().is_some() => Some(candidate),
        _ => None,
    }
}

/// Turn the `--delay` / `--rate` pair into a limit; `--rate` wins
pub fn rate_limit_from(delay: Option<f64>, rate: Option<f64>) -> Result<RateLimit> {
    if let Some(rate) = rate {
        return Ok(RateLimit::per_second(rate)?);
    }

    match delay {
        None => Ok(RateLimit::Unlimited),
        Some(delay) => Ok(RateLimit::from_secs_f64(delay)?),
    }
}

/// Map `-v` repetitions to a log level
pub fn log_level(verbosity: u8) -> Level {
    match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

fn print_divider() {
    println!("{}", "═".repeat(60).bright_blue().bold());
}

fn print_prompt(msg: &str) -> Result<String> {
    print!("{} ", msg.bright_cyan().bold());
    io::stdout().flush()?;
    let mut response = String::new();
    io::stdin().read_line(&mut response)?;
    Ok(response.trim().to_lowercase())
}

pub fn handle_init(args: &ArgMatches) -> Result<()> {
    let config_dir = args
        .get_one::<String>("PATH")
        .map(String::as_str)
        .unwrap_or(DEFAULT_CONFIG_DIR);
    let force = args.get_flag("force");
    let wordlist_path = default_wordlist_path(config_dir);

    print_divider();
    println!("{}", "  HOLLOW INITIALIZATION".bright_white().bold());
    print_divider();
    println!();
    println!(
        "{} Target: {}",
        "→".blue(),
        wordlist_path.display().to_string().bright_white()
    );
    println!();

    if wordlist_path.exists() && !force {
        println!("{}", "⚠ WARNING".yellow().bold());
        println!("A wordlist already exists at:");
        println!(
            "  {} {}",
            "•".yellow(),
            wordlist_path.display().to_string().bright_white()
        );
        println!();

        let response = print_prompt("Do you want to overwrite it? [y/N]:")?;
        println!();

        if response != "y" && response != "yes" {
            println!("{} Initialization cancelled.", "✗".red().bold());
            return Ok(());
        }
    }

    let installed = install_default_wordlist(config_dir)?;
    println!(
        "{} Default wordlist installed at {}",
        "✓".green().bold(),
        installed.display().to_string().bright_white()
    );
    Ok(())
}

fn fuzz_options_from(args: &ArgMatches) -> Result<FuzzOptions> {
    let raw_url = args.get_one::<String>("url").context("--url is required")?;
    let base_url =
        parse_url_line(raw_url).with_context(|| format!("Invalid URL '{}'", raw_url))?;

    let (wordlist, source) = resolve_wordlist(
        args.get_one::<PathBuf>("wordlist-file").map(PathBuf::as_path),
        DEFAULT_CONFIG_DIR,
    )?;
    debug!("Using {} words from {}", wordlist.len(), source);

    let rate = rate_limit_from(
        args.get_one::<f64>("delay").copied(),
        args.get_one::<f64>("rate").copied(),
    )?;

    let mut options = FuzzOptions::new(base_url, wordlist);
    options.threads = args.get_one::<usize>("threads").copied().unwrap_or(10);
    options.rate = rate;
    options.timeout = Duration::from_secs(args.get_one::<u64>("timeout").copied().unwrap_or(5));
    options.method = if args.get_flag("full-body") {
        ProbeMethod::Get
    } else {
        ProbeMethod::Head
    };
    options.directory_variants = args.get_flag("dirs");
    options.ignore_status = args
        .get_many::<u16>("ignore-status")
        .map(|codes| codes.copied().collect())
        .unwrap_or_default();
    options.show_progress_bars = true;

    Ok(options)
}

pub async fn handle_fuzz(args: &ArgMatches) -> Result<()> {
    let options = fuzz_options_from(args)?;
    let base_url = options.base_url.clone();

    println!("\n{} Fuzzing {}", "→".blue(), base_url.bright_white());
    println!("Workers: {}", options.threads);
    match options.rate {
        RateLimit::Unlimited => println!("Rate: unlimited"),
        RateLimit::Interval(interval) => println!("Rate: one request every {:?}", interval),
    }
    println!("Timeout: {:?}\n", options.timeout);

    let session = FuzzSession::start(options)?;

    let canceller = session.canceller();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            canceller.cancel();
        }
    });

    let on_found: FuzzResultCallback = Arc::new(|result: &ProbeResult| {
        println!(
            "{} Found: {} (Status: {})",
            "[+]".green().bold(),
            result.url,
            result.status_code.unwrap_or(0)
        );
    });

    let snapshot = session.finish(Some(on_found)).await?;
    print_summary(&snapshot);

    let format = args
        .get_one::<String>("format")
        .and_then(|f| ReportFormat::from_str(f))
        .unwrap_or(ReportFormat::Text);
    let order = if args.get_flag("wordlist-order") {
        FoundOrder::Wordlist
    } else {
        FoundOrder::Completion
    };

    let data = gather_report_data(&snapshot, &base_url, order);
    let report = generate_report(&data, format)?;

    match args.get_one::<PathBuf>("output") {
        Some(path) => {
            write_report(path, &report)?;
            println!(
                "{} Results saved to {}",
                "✓".green().bold(),
                path.display().to_string().bright_white()
            );
        }
        None => print!("{}", report),
    }

    Ok(())
}

fn print_summary(snapshot: &Snapshot) {
    println!();
    if snapshot.cancelled {
        println!(
            "{} Interrupted after {}/{} candidates",
            "⚠".yellow().bold(),
            snapshot.processed,
            snapshot.total
        );
    } else {
        println!("{} Fuzz complete!", "✓".green().bold());
    }
    println!(
        "  {} found, {} not found, {} errors\n",
        snapshot.found.len().to_string().green(),
        snapshot.not_found,
        snapshot.errors.to_string().red()
    );
}
