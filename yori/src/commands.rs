use crate::CLAP_STYLING;
use clap::{ArgAction, arg, value_parser};
use url::Url;

pub fn command_argument_builder() -> clap::Command {
    clap::Command::new("yori")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("yori")
        .about(
            "Forced browsing: probes a web server for unlinked files and directories built \
            from a wordlist, extensions and directory names.",
        )
        .styles(CLAP_STYLING)
        .arg(
            arg!(<URL>)
                .help("The base URL to fuzz")
                .value_parser(value_parser!(Url)),
        )
        .arg(
            arg!(-w --"wordlist" <PATH>)
                .required(false)
                .help("Path to a newline-delimited wordlist ('#' starts a comment)"),
        )
        .arg(
            arg!(-e --"extensions" <LIST>)
                .required(false)
                .help("Comma-separated file extensions to try, e.g. php,html,js"),
        )
        .arg(
            arg!(-d --"directories" <LIST>)
                .required(false)
                .help("Comma-separated directory names to try"),
        )
        .arg(
            arg!(-o --"output" <PATH>)
                .required(false)
                .help("Save report to file (default: print to stdout)")
                .value_parser(value_parser!(std::path::PathBuf)),
        )
        .arg(
            arg!(-f --"format" <FORMAT>)
                .required(false)
                .help("Report format")
                .value_parser(["text", "json", "csv"])
                .default_value("text"),
        )
        .arg(
            arg!(-t --"threads" <NUM_WORKERS>)
                .required(false)
                .help("The number of async workers probing in parallel (1-1024)")
                .value_parser(value_parser!(u16).range(1..=1024))
                .default_value("10"),
        )
        .arg(
            arg!(--"no-common")
                .required(false)
                .help("Do not add the built-in extensions and directory names")
                .action(ArgAction::SetTrue),
        )
        .arg(
            arg!(--"recursive")
                .required(false)
                .help("Fuzz inside every directory that is found")
                .action(ArgAction::SetTrue),
        )
        .arg(
            arg!(--"depth" <DEPTH>)
                .required(false)
                .help("How many directory levels to descend with --recursive")
                .value_parser(value_parser!(usize))
                .default_value("2"),
        )
        .arg(
            arg!(--"dir-extensions")
                .required(false)
                .help("Also try every extension on every directory name (img.php)")
                .action(ArgAction::SetTrue),
        )
        .arg(
            arg!(--"rate" <RPS>)
                .required(false)
                .help("Maximum requests per second across all workers")
                .value_parser(value_parser!(u32).range(1..)),
        )
        .arg(
            arg!(--"timeout" <SECONDS>)
                .required(false)
                .help("Request timeout in seconds")
                .value_parser(value_parser!(u64).range(1..))
                .default_value("5"),
        )
        .arg(
            arg!(--"max-time" <SECONDS>)
                .required(false)
                .help("Stop the scan after this many seconds")
                .value_parser(value_parser!(u64).range(1..)),
        )
        .arg(
            arg!(--"head")
                .required(false)
                .help("Send HEAD instead of GET (no body, no soft-404 body matching)")
                .action(ArgAction::SetTrue),
        )
        .arg(
            arg!(--"hide-redirects")
                .required(false)
                .help("Do not report 3xx responses")
                .action(ArgAction::SetTrue),
        )
        .arg(
            arg!(--"hide-forbidden")
                .required(false)
                .help("Do not report 401 and 403 responses")
                .action(ArgAction::SetTrue),
        )
        .arg(
            arg!(-a --"user-agent" <AGENT>)
                .required(false)
                .help("User-Agent header to send"),
        )
        .arg(
            arg!(-H --"header" <HEADER>)
                .required(false)
                .help("Extra request header as 'Name: value' (repeatable)")
                .action(ArgAction::Append),
        )
        .arg(arg!(-q --"quiet" "Suppress banner, progress and live output").required(false))
        .arg(
            arg!(-v --"verbose" "Log more (-v info, -vv debug)")
                .required(false)
                .action(ArgAction::Count),
        )
}
