//! Canteen POS CLI
//!
//! Command-line front end for the canteen point-of-sale core, operating on a
//! JSON export of the canteen database.
//!
//! # Usage
//!
//! ```bash
//! canteen-pos --data canteen.json catalog --search juice
//! canteen-pos --data canteen.json checkout --card 0123456789 --item p1:2 --item p2
//! canteen-pos --data canteen.json top-up --card 0123456789 --amount 200
//! canteen-pos --data canteen.json refund --card 0123456789 --amount 50
//! canteen-pos --data canteen.json balance --card 0123456789
//! canteen-pos --data canteen.json report --csv > sales.csv
//! canteen-pos --data canteen.json logs --limit 10
//! ```
//!
//! Results go to stdout, logs to stderr (`RUST_LOG` controls the level).
//!
//! # Exit Codes
//!
//! - 0: Success, including a purchase cancelled at the prompt
//! - 1: Error (snapshot unreadable, card rejected, insufficient stock, etc.)

use canteen_pos::{cli, telemetry};
use std::process;

fn main() {
    let args = cli::parse_args();
    telemetry::setup_tracing(args.verbose);

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let mut output = std::io::stdout();
    if let Err(e) = runtime.block_on(cli::run(args, &mut output)) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
