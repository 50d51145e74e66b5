//! rnflow binary entry point

// CLI binary needs to output to stderr for panics - this is intentional
#![allow(clippy::print_stderr)]

use rnflow_cli::cli::{self, EXIT_INTERNAL, EXIT_OK, exit_code_for, render_error};
use rnflow_cli::tracing::{TracingConfig, init_tracing};
use std::io::{self, Write};

fn main() {
    // NOTE: tracing may not be initialized yet, so panics go straight to stderr.
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("rnflow panicked: {panic_info}");
        eprintln!("Internal error occurred. Run with RUST_LOG=debug for more information.");
        std::process::exit(EXIT_INTERNAL);
    }));

    let cli = cli::parse();

    // Ignore error if tracing already initialized (e.g., in tests)
    let _ = init_tracing(TracingConfig {
        format: cli.log_format,
        level: cli.level.into(),
    });

    let mut stdout = io::stdout();
    let mut stderr = io::stderr();
    let code = match rnflow_cli::run(&cli, &mut stdout, &mut stderr) {
        Ok(()) => EXIT_OK,
        Err(err) => {
            let code = exit_code_for(&err);
            tracing::debug!(exit_code = code, "Generation failed");
            render_error(err, &mut stderr);
            code
        }
    };
    let _ = stdout.flush();
    std::process::exit(code);
}
