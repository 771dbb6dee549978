//! Rill CLI entry point.

use tracing_subscriber::EnvFilter;

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        return;
    }

    let verbose = args.iter().any(|arg| arg == "-v" || arg == "--verbose");
    init_tracing(verbose);

    let command = &args[1];
    match command.as_str() {
        "run" => {
            let Some(path) = positional(&args) else {
                eprintln!("Usage: rill run <file.rill> [-v]");
                std::process::exit(1);
            };
            std::process::exit(rillc::run_file(path));
        }
        "eval" => {
            let Some(source) = positional(&args) else {
                eprintln!("Usage: rill eval <source> [-v]");
                std::process::exit(1);
            };
            std::process::exit(rillc::run_source(source));
        }
        "help" | "--help" | "-h" => print_usage(),
        other => {
            eprintln!("error: unknown command `{other}`");
            print_usage();
            std::process::exit(1);
        }
    }
}

/// First non-flag argument after the command.
fn positional(args: &[String]) -> Option<&str> {
    args.iter()
        .skip(2)
        .find(|arg| !arg.starts_with('-'))
        .map(String::as_str)
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("RILL_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn print_usage() {
    println!("Rill - an embeddable prototype-based scripting language");
    println!();
    println!("Usage: rill <command> [options]");
    println!();
    println!("Commands:");
    println!("  run <file.rill>   Run a script file");
    println!("  eval <source>     Run an inline source string");
    println!("  help              Show this help");
    println!();
    println!("Options:");
    println!("  -v, --verbose     Debug logging (or set RILL_LOG=trace)");
}
