// Forced browsing runs: turning user input into a scan and driving it

use anyhow::{Context, Result, bail};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use yori_scanner::prober::ProbeMethod;
use yori_scanner::scanner::DEFAULT_TIMEOUT;
use yori_scanner::wordlist::DEFAULT_WORD;
use yori_scanner::{
    DirectorySet, ExtensionSet, InterestingStatus, RunSnapshot, ScanConfig, ScanEvent, ScanReport,
    Scanner, Wordlist,
};

/// Callback for every result and warning as it comes in
pub type ScanEventCallback = Arc<dyn Fn(&ScanEvent) + Send + Sync>;

/// Options for configuring a fuzz operation
#[derive(Debug, Clone)]
pub struct FuzzOptions {
    pub url: String,
    pub wordlist_file: Option<String>,
    /// Comma-separated, as typed on the command line
    pub extensions: Option<String>,
    pub directories: Option<String>,
    pub threads: usize,
    pub no_common: bool,
    pub recursive: bool,
    pub max_depth: usize,
    pub rate: Option<u32>,
    pub timeout: Duration,
    pub max_time: Option<Duration>,
    pub head: bool,
    pub directory_extensions: bool,
    pub hide_redirects: bool,
    pub hide_forbidden: bool,
    pub user_agent: Option<String>,
    /// `Name: value` pairs
    pub headers: Vec<String>,
    pub show_progress: bool,
}

impl Default for FuzzOptions {
    fn default() -> Self {
        Self {
            url: String::new(),
            wordlist_file: None,
            extensions: None,
            directories: None,
            threads: 10,
            no_common: false,
            recursive: false,
            max_depth: 2,
            rate: None,
            timeout: DEFAULT_TIMEOUT,
            max_time: None,
            head: false,
            directory_extensions: false,
            hide_redirects: false,
            hide_forbidden: false,
            user_agent: None,
            headers: Vec::new(),
            show_progress: true,
        }
    }
}

/// Load a wordlist file. Blank lines and `#` comments are skipped and a
/// leading `~` is expanded.
pub fn load_wordlist(path: &str) -> Result<Wordlist> {
    let expanded = shellexpand::tilde(path);
    let path = Path::new(expanded.as_ref());
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read wordlist {}", path.display()))?;

    let words = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !line.starts_with('#'));

    Wordlist::new(words).with_context(|| {
        format!(
            "Wordlist {} is empty or contains only comments",
            path.display()
        )
    })
}

/// Split a comma-separated list, dropping empty items.
pub fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(String::from)
        .collect()
}

/// Parse a `Name: value` header argument.
pub fn parse_header(raw: &str) -> Result<(String, String)> {
    let Some((name, value)) = raw.split_once(':') else {
        bail!("Invalid header '{}': expected 'Name: value'", raw);
    };
    let name = name.trim();
    if name.is_empty() {
        bail!("Invalid header '{}': missing name", raw);
    }
    Ok((name.to_string(), value.trim().to_string()))
}

/// Turn command-line options into a scan configuration.
pub fn build_scan_config(options: &FuzzOptions) -> Result<ScanConfig> {
    let wordlist = options
        .wordlist_file
        .as_deref()
        .map(load_wordlist)
        .transpose()?;
    let extensions = options.extensions.as_deref().map(parse_list).unwrap_or_default();
    let directories = options.directories.as_deref().map(parse_list).unwrap_or_default();

    let no_inputs = wordlist.is_none() && extensions.is_empty() && directories.is_empty();
    if no_inputs && options.no_common {
        bail!(
            "No fuzzing targets provided. Use --wordlist, --extensions or --directories \
             when --no-common is set"
        );
    }

    // Extensions need something to hang off; without a wordlist that is `index`.
    let wordlist = match wordlist {
        Some(wordlist) => wordlist,
        None if !extensions.is_empty() || !options.no_common => Wordlist::new([DEFAULT_WORD])?,
        None => Wordlist::empty(),
    };
    if no_inputs {
        debug!("No custom targets provided, using the built-in extensions and directories");
    }

    let headers = options
        .headers
        .iter()
        .map(|raw| parse_header(raw))
        .collect::<Result<Vec<_>>>()?;

    let mut config = ScanConfig::new(options.url.clone())
        .with_wordlist(wordlist)
        .with_extensions(ExtensionSet::new(extensions))
        .with_directories(DirectorySet::new(directories))
        .with_no_common(options.no_common)
        .with_directory_extensions(options.directory_extensions)
        .with_concurrency(options.threads)
        .with_rate_limit(options.rate)
        .with_timeout(options.timeout)
        .with_max_time(options.max_time)
        .with_method(if options.head {
            ProbeMethod::Head
        } else {
            ProbeMethod::Get
        })
        .with_recursion(options.recursive, options.max_depth)
        .with_interesting(InterestingStatus {
            redirects: !options.hide_redirects,
            forbidden: !options.hide_forbidden,
        })
        .with_headers(headers);
    if let Some(ref user_agent) = options.user_agent {
        config = config.with_user_agent(user_agent.clone());
    }

    config.validate()?;
    Ok(config)
}

/// Execute a scan with the given options.
///
/// Ctrl-C cancels the scan; whatever was found so far is still returned.
pub async fn execute_fuzz(
    options: FuzzOptions,
    event_callback: Option<ScanEventCallback>,
) -> Result<ScanReport> {
    let config = build_scan_config(&options)?;
    let scanner = Scanner::new(config).context("Failed to set up the scan")?;

    let progress_bar = if options.show_progress {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .context("Invalid progress template")?,
        );
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_message(format!(
            "Fuzzing {} (~{} candidates at the root)",
            scanner.target(),
            scanner.estimated_root_candidates()
        ));
        Some(pb)
    } else {
        None
    };

    let progress_task = progress_bar.clone().map(|pb| {
        let mut progress = scanner.subscribe_progress();
        tokio::spawn(async move {
            while progress.changed().await.is_ok() {
                let snapshot = progress.borrow_and_update().clone();
                pb.set_message(progress_message(&snapshot));
            }
        })
    });

    let cancel = scanner.cancel_signal();
    let interrupt_task = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, finishing in-flight requests");
            cancel.cancel();
        }
    });

    let (tx, mut rx) = mpsc::channel(options.threads.max(1) * 4);
    let mut report = ScanReport::new(scanner.target().as_str());
    let (summary, ()) = tokio::join!(scanner.run(tx), async {
        while let Some(event) = rx.recv().await {
            if let Some(ref callback) = event_callback {
                match progress_bar {
                    Some(ref pb) => pb.suspend(|| callback(&event)),
                    None => callback(&event),
                }
            }
            report.record(event);
        }
    });

    interrupt_task.abort();
    if let Some(task) = progress_task {
        task.abort();
    }
    if let Some(pb) = progress_bar {
        pb.finish_and_clear();
    }

    report.summary = summary.context("Scan failed")?;
    Ok(report)
}

fn progress_message(snapshot: &RunSnapshot) -> String {
    format!(
        "{} requests, {} hits, {} errors, {} directories ({} in flight)",
        snapshot.requests,
        snapshot.hits,
        snapshot.errors,
        snapshot.directories_discovered,
        snapshot.in_flight
    )
}
