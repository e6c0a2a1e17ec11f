//! Entry point for the command-line interface.
#![forbid(unsafe_code)]

fn main() {
    if let Err(err) = strandmap_cli::run() {
        eprintln!("strandmap: {err}");
        std::process::exit(1);
    }
}
