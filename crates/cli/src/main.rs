//! envsecrets command line entry point

// CLI binary needs to output to stdout/stderr
#![allow(clippy::print_stdout, clippy::print_stderr)]

use envsecrets_cli::cli::{self, EXIT_CLI, exit_code_for, render_error};
use envsecrets_cli::commands;
use envsecrets_cli::tracing::{TracingConfig, init_tracing};

fn main() {
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panicked: {panic_info}");
        eprintln!("Internal error occurred. Run with RUST_LOG=debug for more information.");
    }));

    std::process::exit(run());
}

fn run() -> i32 {
    let cli = cli::parse();

    let tracing_config = TracingConfig {
        format: cli.log_format,
        level: cli.level.into(),
        filter: None,
    };
    if let Err(e) = init_tracing(tracing_config) {
        eprintln!("Failed to initialize tracing: {e}");
        return EXIT_CLI;
    }

    // The env file must be applied before any resolver reads the environment
    if let Err(err) = commands::apply_env_file(&cli) {
        render_error(&err, cli.json);
        return exit_code_for(&err);
    }

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Fatal error: Failed to create tokio runtime: {e}");
            return 1;
        }
    };

    match rt.block_on(commands::execute(&cli)) {
        Ok(output) => {
            print!("{}", output.stdout);
            output.exit_code
        }
        Err(err) => {
            render_error(&err, cli.json);
            exit_code_for(&err)
        }
    }
}
