pub mod fuzz;
pub mod report;

pub use fuzz::{FuzzOptions, ScanEventCallback, build_scan_config, execute_fuzz, load_wordlist};
pub use report::{ReportFormat, generate_report, write_report};

const BANNER: &str = r#"
 __   __         _
 \ \ / /__  _ __(_)
  \ V / _ \| '__| |
   | | (_) | |  | |
   |_|\___/|_|  |_|
"#;

pub fn print_banner() {
    eprintln!("{}", BANNER);
    eprintln!("  forced browsing, v{}\n", env!("CARGO_PKG_VERSION"));
}
