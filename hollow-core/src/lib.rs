pub mod fuzz;
pub mod report;
pub mod wordlist;

use colored::Colorize;

const BANNER: &str = r"
  _           _ _
 | |__   ___ | | | _____      __
 | '_ \ / _ \| | |/ _ \ \ /\ / /
 | | | | (_) | | | (_) \ V  V /
 |_| |_|\___/|_|_|\___/ \_/\_/
";

pub fn print_banner() {
    println!("{}", BANNER.bright_blue().bold());
    println!(
        "  {} {}\n",
        "hidden path discovery".bright_white(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
}
