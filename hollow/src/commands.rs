use crate::CLAP_STYLING;
use clap::{arg, command};
use hollow_core::wordlist::DEFAULT_CONFIG_DIR;

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("hollow")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("hollow")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress banner and non-essential output").required(false))
        .arg(
            arg!(-v --"verbose" "Increase log verbosity (-v info, -vv debug, -vvv trace)")
                .required(false)
                .action(clap::ArgAction::Count),
        )
        .subcommand_required(false)
        .subcommand(
            command!("init")
                .about("Installs the default wordlist into the hollow configuration directory")
                .arg(
                    arg!([PATH])
                        .required(false)
                        .help("Location of the hollow configuration directory")
                        .default_value(DEFAULT_CONFIG_DIR),
                )
                .arg(
                    arg!(-f --"force")
                        .help("Overwrite an existing wordlist without asking")
                        .required(false),
                ),
        )
        .subcommand(
            command!("fuzz")
                .about(
                    "Probe a host for hidden paths using a wordlist. Every candidate is \
                requested once; anything that is not a 404 is reported.",
                )
                .arg(
                    arg!(-u --"url" <URL>)
                        .required(true)
                        .help("Base URL to probe (http:// is assumed when no scheme is given)"),
                )
                .arg(
                    arg!(-w --"wordlist-file" <PATH>)
                        .required(false)
                        .help("Path to wordlist file (default: ~/.config/hollow/wordlists/default.txt, then the built-in list)")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .arg(
                    arg!(-t --"threads" <NUM_WORKERS>)
                        .required(false)
                        .help("The number of async worker 'threads' in the worker pool.")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("10"),
                )
                .arg(
                    arg!(-d --"delay" <SECONDS>)
                        .required(false)
                        .help("Minimum delay between any two requests, shared by all workers (0 disables pacing)")
                        .value_parser(clap::value_parser!(f64))
                        .default_value("0.1")
                        .conflicts_with("rate"),
                )
                .arg(
                    arg!(-r --"rate" <REQUESTS_PER_SECOND>)
                        .required(false)
                        .help("Maximum aggregate request rate across all workers")
                        .value_parser(clap::value_parser!(f64)),
                )
                .arg(
                    arg!(--"timeout" <SECONDS>)
                        .required(false)
                        .help("Request timeout in seconds")
                        .value_parser(clap::value_parser!(u64))
                        .default_value("5"),
                )
                .arg(
                    arg!(--"full-body")
                        .required(false)
                        .help("Use GET requests instead of HEAD requests")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(--"dirs")
                        .required(false)
                        .help("Also try every word with a trailing slash")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(--"ignore-status" <CODES>)
                        .required(false)
                        .help("Comma separated status codes to treat as not found (e.g. 403,401)")
                        .value_parser(clap::value_parser!(u16))
                        .value_delimiter(','),
                )
                .arg(
                    arg!(--"wordlist-order")
                        .required(false)
                        .help("List findings in wordlist order instead of discovery order")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Save report to file (default: display to screen)")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Report format: text, json, csv")
                        .value_parser(["text", "json", "csv"])
                        .default_value("text"),
                ),
        )
}
