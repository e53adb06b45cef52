// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::{
    io::{self, Write},
    time::Duration,
};

use anyhow::{Context, Error, Result};
use clap::{crate_authors, crate_version, App, AppSettings, Arg, SubCommand};

use rl78::{
    mode::{ResetLine, ResetLineConfig},
    CommunicationMode, EntryOptions, SiliconSignature,
};

mod flash;
mod list;

#[cfg(unix)]
const DEFAULT_PORT: &str = "/dev/ttyUSB0";
#[cfg(windows)]
const DEFAULT_PORT: &str = "COM1";

fn main() -> Result<()> {
    let app = App::new("RL78 Serial Programmer")
        .setting(AppSettings::ColoredHelp)
        .version(crate_version!())
        .author(crate_authors!())
        .about("Programmer for the Renesas RL78 serial bootloader (Protocol A)")
        .arg(
            Arg::with_name("PORT")
                .short("p")
                .long("port")
                .default_value(DEFAULT_PORT)
                .required(true)
                .help("Serial port to use"),
        )
        .arg(
            Arg::with_name("baudrate")
                .short("b")
                .long("baudrate")
                .default_value("115200")
                .help("Baud rate to negotiate with the target [115200|250000|500000|1000000]"),
        )
        .arg(
            Arg::with_name("voltage")
                .long("voltage")
                .default_value("33")
                .help("Target supply voltage, in tenths of a volt (e.g. 33 for 3.3V)"),
        )
        .arg(
            Arg::with_name("mode")
                .long("mode")
                .default_value("one-wire")
                .help("Communication mode [one-wire|two-wire]"),
        )
        .arg(
            Arg::with_name("reset-line")
                .long("reset-line")
                .default_value("rts")
                .help("Modem-control line wired to RESET [dtr|rts]"),
        )
        .arg(
            Arg::with_name("reset-inverted")
                .long("reset-inverted")
                .help("The RESET line mapping is logically inverted"),
        )
        .arg(
            Arg::with_name("wait-for-power")
                .long("wait-for-power")
                .help("Wait for Enter before releasing RESET, to allow manually power-cycling the target"),
        )
        .arg(
            Arg::with_name("v")
                .short("v")
                .multiple(true)
                .help("Sets the level of verbosity, -v (debug), -vv (trace)"),
        )
        .subcommand(
            SubCommand::with_name("list")
                .about("List candidate serial ports")
                .setting(AppSettings::ColoredHelp),
        )
        .subcommand(
            SubCommand::with_name("identify")
                .about("Read the target's silicon signature")
                .setting(AppSettings::ColoredHelp),
        )
        .subcommand(
            SubCommand::with_name("program")
                .about("Program a binary image")
                .setting(AppSettings::ColoredHelp)
                .arg(Arg::with_name("BIN").required(true).help("Binary file to program"))
                .arg(
                    Arg::with_name("address")
                        .short("a")
                        .long("address")
                        .default_value("0x00000000")
                        .help("Start address"),
                )
                .arg(
                    Arg::with_name("verify")
                        .long("verify")
                        .help("Verify the image after programming"),
                ),
        )
        .subcommand(
            SubCommand::with_name("erase")
                .about("Erase a range of flash")
                .setting(AppSettings::ColoredHelp)
                .arg(
                    Arg::with_name("address")
                        .short("a")
                        .long("address")
                        .required(true)
                        .help("Start address, must be block-aligned"),
                )
                .arg(
                    Arg::with_name("size")
                        .short("s")
                        .long("size")
                        .required(true)
                        .help("Number of bytes to erase"),
                ),
        )
        .subcommand(
            SubCommand::with_name("verify")
                .about("Verify a binary image against flash")
                .setting(AppSettings::ColoredHelp)
                .arg(Arg::with_name("BIN").required(true).help("Binary file to verify against"))
                .arg(
                    Arg::with_name("address")
                        .short("a")
                        .long("address")
                        .default_value("0x00000000")
                        .help("Start address"),
                ),
        )
        .subcommand(
            SubCommand::with_name("checksum")
                .about("Read the target's on-chip checksum of a range")
                .setting(AppSettings::ColoredHelp)
                .arg(
                    Arg::with_name("start")
                        .long("start")
                        .required(true)
                        .help("Range start address"),
                )
                .arg(
                    Arg::with_name("end")
                        .long("end")
                        .required(true)
                        .help("Range end address, inclusive"),
                ),
        )
        .subcommand(
            SubCommand::with_name("reset")
                .about("Reset the target back into application code")
                .setting(AppSettings::ColoredHelp),
        );

    #[cfg(windows)]
    let app = app.setting(AppSettings::WaitOnError);

    let matches = app.get_matches();

    init_logger(match matches.occurrences_of("v") {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        2..=u64::MAX => log::LevelFilter::Trace,
    })?;

    if let ("list", Some(_)) = matches.subcommand() {
        return list::list();
    }

    let opts = Opts::from_matches(&matches)?;

    log::info!("Opening serial port `{}`", opts.port);
    let mut port = serial::open(&opts.port)
        .with_context(|| format!("couldn't open serial port `{}`", opts.port))?;
    port.set_timeout(Duration::from_millis(500))?;
    port.configure(&serial::PortSettings {
        baud_rate: serial::BaudRate::Baud115200,
        char_size: serial::CharSize::Bits8,
        parity: serial::Parity::ParityNone,
        stop_bits: serial::StopBits::Stop1,
        flow_control: serial::FlowControl::FlowNone,
    })?;

    log::info!("Entering programming mode");
    let entry_options = EntryOptions {
        mode: opts.mode,
        reset_line: opts.reset_line,
        baud: opts.baudrate,
        voltage_x10: opts.voltage,
        wait_for_power: opts.wait_for_power,
    };

    let mut session = rl78::Session::enter(port, entry_options, || {
        println!("Power-cycle the target, then press Enter to continue...");
        let mut line = String::new();
        let _ = io::stdin().read_line(&mut line);
    })
    .context("failed to synchronize with the bootloader")?;

    log::info!("Identifying target");
    let signature = session.identify().context("failed to read silicon signature")?;
    log_signature(&signature);

    match matches.subcommand() {
        ("identify", Some(_)) => {}
        ("program", Some(m)) => flash::program(m, &mut session)?,
        ("erase", Some(m)) => flash::erase(m, &mut session)?,
        ("verify", Some(m)) => flash::verify(m, &mut session)?,
        ("checksum", Some(m)) => flash::checksum(m, &mut session)?,
        ("reset", Some(_)) => {
            session.reset().context("failed to reset the target")?;
        }
        _ => {
            println!("Error: Sub-command required");
            println!("{}", matches.usage());
        }
    }

    Ok(())
}

struct Opts {
    port: String,
    baudrate: u32,
    voltage: u8,
    mode: CommunicationMode,
    reset_line: ResetLineConfig,
    wait_for_power: bool,
}

impl Opts {
    fn from_matches(matches: &clap::ArgMatches<'_>) -> Result<Opts> {
        let mode = match matches.value_of("mode").unwrap() {
            "one-wire" => CommunicationMode::OneWire,
            "two-wire" => CommunicationMode::TwoWire,
            other => {
                return Err(Error::msg(format!(
                    "invalid mode `{}`, must be one of: `one-wire`, `two-wire`",
                    other
                )))
            }
        };

        let reset_line: ResetLine = matches
            .value_of("reset-line")
            .unwrap()
            .parse()
            .map_err(|e| Error::msg(format!("{}", e)))?;

        Ok(Opts {
            port: matches.value_of("PORT").unwrap().to_owned(),
            baudrate: matches
                .value_of("baudrate")
                .unwrap()
                .parse()
                .context("invalid baud rate")?,
            voltage: matches
                .value_of("voltage")
                .unwrap()
                .parse()
                .context("invalid voltage")?,
            mode,
            reset_line: ResetLineConfig::new(reset_line, matches.is_present("reset-inverted")),
            wait_for_power: matches.is_present("wait-for-power"),
        })
    }
}

fn log_signature(sig: &SiliconSignature) {
    log::info!("device: {}", sig.device_name_str());
    log::info!("code flash: {} KiB", sig.code_flash_size() / 1024);
    if sig.data_flash_end.is_some() {
        log::info!("data flash: {} KiB", sig.data_flash_size() / 1024);
    }
}

fn init_logger(level: log::LevelFilter) -> Result<()> {
    let mut logger = env_logger::Builder::from_env("RL78_PROG_LOG");
    logger.filter_level(level);

    #[cfg(unix)]
    logger.format(log_format_color);
    #[cfg(not(unix))]
    logger.format(log_format_no_color);

    logger.try_init().context("failed to initialize logger")
}

#[cfg(unix)]
fn log_format_color(
    fmt: &mut env_logger::fmt::Formatter,
    record: &log::Record<'_>,
) -> io::Result<()> {
    let level = match record.level() {
        log::Level::Error => ansi_term::Color::Red.bold().paint("ERROR"),
        log::Level::Warn => ansi_term::Color::Yellow.bold().paint("WARN"),
        log::Level::Info => ansi_term::Color::Green.bold().paint("INFO"),
        log::Level::Debug => ansi_term::Color::Cyan.bold().paint("DBG"),
        log::Level::Trace => ansi_term::Color::Cyan.bold().paint("TRACE"),
    };

    writeln!(fmt, "[{}] - {}", level, record.args())
}

#[cfg(not(unix))]
fn log_format_no_color(
    fmt: &mut env_logger::fmt::Formatter,
    record: &log::Record<'_>,
) -> io::Result<()> {
    let level = match record.level() {
        log::Level::Error => "ERROR",
        log::Level::Warn => "WARN",
        log::Level::Info => "INFO",
        log::Level::Debug => "DBG",
        log::Level::Trace => "TRACE",
    };

    writeln!(fmt, "[{}] - {}", level, record.args())
}
