//! Argument parsing, config, logging, and process wiring.
//!
//! Deliberately thin: split between argument parsing (`Cli::new`) and
//! running to completion (`Cli::start`), with everything that actually
//! does PBX work living in `core-pbx` and `core-server`.

mod config;
mod signal;

use std::sync::Arc;

use clap::{App, Arg, ArgMatches};

use core_pbx::Pbx;

pub use config::PbxConfig;

/// Ports below this are rejected.
const MIN_PORT: u16 = 1024;

pub struct Cli {
    port: u16,
    config: PbxConfig,
}

impl Cli {
    /// Parse arguments and run to completion. A missing or invalid `-p`
    /// causes the process to exit successfully without starting -- this
    /// is the one case this function doesn't return from normally.
    pub fn run() {
        match Self::new() {
            Some(cli) => {
                common_logger::init(common_logger::Flag::Main);
                let runtime = tokio::runtime::Runtime::new().expect("failed to start the tokio runtime");
                runtime.block_on(cli.start());
            }
            None => std::process::exit(0),
        }
    }

    fn new() -> Option<Self> {
        let matches = Self::generate_matches();

        let port: u16 = matches
            .value_of("port")?
            .parse()
            .ok()
            .filter(|p| *p >= MIN_PORT)?;

        let config = match matches.value_of("config") {
            Some(path) => common_config_parser::parse(path).unwrap_or_else(|e| {
                log::warn!("cli: failed to parse config at {}: {}, using defaults", path, e);
                PbxConfig::default()
            }),
            None => PbxConfig::default(),
        };

        Some(Cli { port, config })
    }

    fn generate_matches<'a>() -> ArgMatches<'a> {
        App::new("pbx")
            .about("A concurrent Private Branch Exchange (PBX) simulator")
            .arg(
                Arg::with_name("port")
                    .short("p")
                    .long("port")
                    .takes_value(true)
                    .help("TCP port to listen on (>= 1024)"),
            )
            .arg(
                Arg::with_name("config")
                    .short("c")
                    .long("config")
                    .takes_value(true)
                    .help("optional TOML configuration file"),
            )
            .get_matches()
    }

    async fn start(self) {
        let pbx = Pbx::with_capacity(self.config.max_extensions);

        let listener = match tokio::net::TcpListener::bind(("0.0.0.0", self.port)).await {
            Ok(listener) => listener,
            Err(e) => {
                log::error!("cli: failed to bind port {}: {}", self.port, e);
                return;
            }
        };
        log::info!("cli: listening on port {}", self.port);

        let server_pbx = Arc::clone(&pbx);
        let server = tokio::spawn(async move { core_server::run(server_pbx, listener).await });

        signal::wait_for_hangup().await;
        pbx.shutdown().await;
        let _ = server.await;
        log::info!("cli: shutdown complete, exiting");
    }
}
