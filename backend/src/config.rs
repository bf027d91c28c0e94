use clap::{value_t, App, Arg};
use lazy_static::lazy_static;

lazy_static! {
    static ref CONFIG: Config = parse_command_line_flags();
}

#[derive(Debug)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: log::LevelFilter,
    /// Longest accepted line on a connection. The connection is closed when a client sends more.
    pub max_message_bytes: usize,
}

pub fn config() -> &'static Config {
    &CONFIG
}

fn parse_command_line_flags() -> Config {
    let matches = App::new("backend")
        .version("0.1")
        .arg(
            Arg::with_name("host")
                .long("host")
                .help("The address the editing server listens on")
                .takes_value(true)
                .value_name("HOST")
                .default_value("127.0.0.1"),
        )
        .arg(
            Arg::with_name("port")
                .long("port")
                .help("The port the editing server listens on")
                .takes_value(true)
                .value_name("PORT")
                .default_value("9090"),
        )
        .arg(
            Arg::with_name("log_level")
                .long("log_level")
                .help("One of off, error, warn, info, debug, trace")
                .takes_value(true)
                .value_name("LEVEL")
                .default_value("info"),
        )
        .arg(
            Arg::with_name("max_message_bytes")
                .long("max_message_bytes")
                .help("The max size of a single JSON message from a client")
                .takes_value(true)
                .value_name("BYTES")
                .default_value("1048576"),
        )
        .get_matches();

    Config {
        host: matches.value_of("host").unwrap_or("127.0.0.1").to_string(),
        port: value_t!(matches, "port", u16).unwrap_or_else(|e| e.exit()),
        log_level: value_t!(matches, "log_level", log::LevelFilter).unwrap_or_else(|e| e.exit()),
        max_message_bytes: value_t!(matches, "max_message_bytes", usize)
            .unwrap_or_else(|e| e.exit()),
    }
}
