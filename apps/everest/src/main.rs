//! # EVEREST
//!
//! The command line binary for EVEREST.
//!
//! ## Usage
//!
//! ```bash
//! # Version, data directory and cadences
//! everest info
//!
//! # Search index operations
//! everest index validate -i docs/_build/html/searchindex.js
//! everest index search -i searchindex.js detrend
//! everest index convert -i searchindex.js -o searchindex.evx
//! everest index build -m manifest.json -o searchindex.js
//!
//! # Data validation summaries and de-trending
//! everest dvs -o page.svg --labels
//! everest detrend -i 205071984_raw.json
//! ```

use clap::Parser;
use everest::cli;
use everest_core::utils::{LoggingOptions, init_logging, install_panic_hook};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    let cli = cli::Cli::parse();

    let config = match cli::load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    };

    // JSON output owns stdout; only errors are logged next to it.
    let mut logging = LoggingOptions::from(&config);
    logging.quiet |= cli.quiet || cli.json_mode;
    if let Err(e) = init_logging(&logging) {
        eprintln!("Error: {}", e);
        std::process::exit(2);
    }
    install_panic_hook(cli.verbose);

    if let Err(e) = cli::execute(cli, &config) {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}
