use std::io::Write;

use crop_health::api;

fn main() {
    api::install_panic_hook();
    let line = api::run(std::env::args_os());
    // Exit status stays 0: outcomes, errors included, travel in the JSON line.
    let _ = writeln!(std::io::stdout().lock(), "{line}");
}
