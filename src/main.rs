//! # photo-quarantine CLI
//!
//! Command-line interface for the duplicate photo quarantine.
//!
//! ## Usage
//! ```bash
//! photo-quarantine --path ~/Photos --dryrun
//! photo-quarantine --path ~/Photos --algo fmiq --output json
//! photo-quarantine --path ~/Photos --undo
//! ```

mod cli;

use photo_quarantine::Result;

fn main() -> Result<()> {
    cli::run()
}
