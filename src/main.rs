//! Entry point for `tftp-fetch`.
//!
//! Parses CLI arguments and delegates the transfer to the library.  This
//! file owns only process setup (logging, argument parsing, exit codes).

use clap::Parser;

use tftp_fetch::TftpError;

/// Fetch a file from a TFTP server.
///
/// The local output file is named after the requested file.  Exits 0 on
/// success; on a server-reported error the exit code is the protocol error
/// code, and any local failure (timeout, malformed packet) exits 1.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// Address of the TFTP server.
    server: String,
    /// The file to fetch (also used as the local output path).
    filename: String,
}

fn main() {
    // Initialise env_logger; set RUST_LOG to control verbosity.
    env_logger::init();

    let cli = Cli::parse();

    match tftp_fetch::fetch_file(&cli.server, &cli.filename) {
        Ok(n) => println!("Received {n} bytes"),
        Err(TftpError::Timeout) => {
            eprintln!("Timeout communicating with {}", cli.server);
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(e.exit_code());
        }
    }
}
