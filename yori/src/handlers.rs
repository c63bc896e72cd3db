use clap::ArgMatches;
use colored::{ColoredString, Colorize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::Level;
use url::Url;
use yori_core::fuzz::{FuzzOptions, ScanEventCallback, execute_fuzz};
use yori_core::report::{ReportFormat, generate_report, write_report};
use yori_scanner::{Classification, ProbeResult, RunSnapshot, ScanEvent};

/// Log level for the number of `-v` flags. Warnings always get through.
pub fn log_level(verbosity: u8) -> Level {
    match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    }
}

pub fn init_logging(verbosity: u8) {
    // Logs go to stderr so that reports on stdout stay clean.
    let _ = tracing_subscriber::fmt()
        .with_max_level(log_level(verbosity))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Collect the scan options from parsed arguments.
pub fn fuzz_options_from_matches(matches: &ArgMatches) -> FuzzOptions {
    let url = matches
        .get_one::<Url>("URL")
        .map(|url| url.as_str().to_string())
        .unwrap_or_default();

    FuzzOptions {
        url,
        wordlist_file: matches.get_one::<String>("wordlist").cloned(),
        extensions: matches.get_one::<String>("extensions").cloned(),
        directories: matches.get_one::<String>("directories").cloned(),
        threads: matches
            .get_one::<u16>("threads")
            .map_or(10, |threads| usize::from(*threads)),
        no_common: matches.get_flag("no-common"),
        recursive: matches.get_flag("recursive"),
        max_depth: *matches.get_one::<usize>("depth").unwrap_or(&2),
        rate: matches.get_one::<u32>("rate").copied(),
        timeout: Duration::from_secs(*matches.get_one::<u64>("timeout").unwrap_or(&5)),
        max_time: matches
            .get_one::<u64>("max-time")
            .map(|secs| Duration::from_secs(*secs)),
        head: matches.get_flag("head"),
        directory_extensions: matches.get_flag("dir-extensions"),
        hide_redirects: matches.get_flag("hide-redirects"),
        hide_forbidden: matches.get_flag("hide-forbidden"),
        user_agent: matches.get_one::<String>("user-agent").cloned(),
        headers: matches
            .get_many::<String>("header")
            .map(|values| values.cloned().collect())
            .unwrap_or_default(),
        show_progress: !matches.get_flag("quiet"),
    }
}

/// One-line description of a result, without colors.
pub fn describe_result(result: &ProbeResult) -> String {
    let mut line = match result.classification {
        Classification::Error => format!(
            "ERR {} {}",
            result.url,
            result
                .error
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default()
        ),
        _ => format!(
            "{} {} ({} bytes)",
            result.status_code, result.url, result.content_length
        ),
    };
    if let Some(ref location) = result.redirect {
        line.push_str(&format!(" -> {}", location));
    }
    if result.directory.is_some() {
        line.push_str(" [dir]");
    }
    line
}

fn status_color(status: u16, text: String) -> ColoredString {
    match status {
        200..=299 => text.green(),
        300..=399 => text.cyan(),
        400..=499 => text.yellow(),
        _ => text.red(),
    }
}

fn print_event(event: &ScanEvent) {
    match event {
        ScanEvent::Result(result) if result.is_hit() => {
            eprintln!(
                "{} {}",
                "✓".green().bold(),
                status_color(result.status_code, describe_result(result))
            );
        }
        ScanEvent::Result(_) => {}
        ScanEvent::Warning(warning) => {
            eprintln!("{} {}", "⚠".yellow().bold(), warning.to_string().yellow());
        }
    }
}

fn print_summary(summary: &RunSnapshot) {
    eprintln!();
    eprintln!("{}", "═".repeat(60).bright_blue().bold());
    if summary.cancelled {
        eprintln!("{} Scan cancelled, partial results below", "⚠".yellow().bold());
    } else {
        eprintln!("{} Scan complete", "✓".green().bold());
    }
    eprintln!(
        "  {} requests in {:.1}s",
        summary.requests.to_string().bright_white(),
        summary.elapsed.as_secs_f64()
    );
    eprintln!(
        "  {} hits, {} misses, {} soft-404s, {} errors",
        summary.hits.to_string().green().bold(),
        summary.misses,
        summary.soft_404s,
        summary.errors.to_string().red()
    );
    if summary.directories_discovered > 0 {
        eprintln!(
            "  {} directories discovered, {} scanned",
            summary.directories_discovered, summary.directories_scanned
        );
    }
    eprintln!("{}", "═".repeat(60).bright_blue().bold());
}

pub async fn handle_fuzz(matches: &ArgMatches) {
    let options = fuzz_options_from_matches(matches);
    let quiet = matches.get_flag("quiet");
    let output = matches.get_one::<PathBuf>("output").cloned();
    let format = matches
        .get_one::<String>("format")
        .and_then(|f| ReportFormat::from_str(f))
        .unwrap_or(ReportFormat::Text);

    if !quiet {
        eprintln!("{} Fuzzing {}", "→".blue(), options.url.bright_white());
        eprintln!(
            "{} Workers: {}{}",
            "→".blue(),
            options.threads,
            if options.recursive {
                format!(", recursive to depth {}", options.max_depth)
            } else {
                String::new()
            }
        );
        eprintln!();
    }

    let printer: ScanEventCallback = Arc::new(print_event);
    let callback = (!quiet).then_some(printer);

    let report = match execute_fuzz(options, callback).await {
        Ok(report) => report,
        Err(e) => {
            eprintln!("{} {:#}", "✗".red().bold(), e);
            std::process::exit(1);
        }
    };

    if !quiet {
        print_summary(&report.summary);
    }

    let contents = match generate_report(&report, format) {
        Ok(contents) => contents,
        Err(e) => {
            eprintln!("{} {:#}", "✗".red().bold(), e);
            std::process::exit(1);
        }
    };

    match output {
        Some(path) => {
            if let Err(e) = write_report(&path, &contents) {
                eprintln!("{} {:#}", "✗".red().bold(), e);
                std::process::exit(1);
            }
            if !quiet {
                eprintln!(
                    "{} Report saved to {}",
                    "✓".green().bold(),
                    path.display().to_string().bright_white()
                );
            }
        }
        None => print!("{}", contents),
    }
}
