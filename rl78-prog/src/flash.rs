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

use std::{fs::File, io::Read, path::PathBuf};

use anyhow::{bail, Context, Result};
use clap::ArgMatches;
use indicatif::{ProgressBar, ProgressStyle};
use rl78::Session;

fn progress_bar(message: &str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner} {msg} ({elapsed})"),
    );
    bar.set_message(message);
    bar.enable_steady_tick(100);
    bar
}

fn read_address(matches: &ArgMatches<'_>, name: &str) -> Result<u32> {
    let raw = matches.value_of(name).unwrap();
    let raw = raw.strip_prefix("0x").unwrap_or(raw);
    u32::from_str_radix(raw, 16)
        .with_context(|| format!("invalid address `{}`, must be hexadecimal", raw))
}

fn read_image(matches: &ArgMatches<'_>) -> Result<Vec<u8>> {
    let path: PathBuf = matches.value_of("BIN").unwrap().into();
    let mut file = File::open(&path)
        .with_context(|| format!("couldn't open firmware file `{}`", path.display()))?;

    let mut image = Vec::new();
    file.read_to_end(&mut image)
        .context("failed to read firmware file contents")?;

    Ok(image)
}

/// `program` subcommand entry point.
pub fn program<P>(matches: &ArgMatches<'_>, session: &mut Session<P>) -> Result<()>
where
    P: serial::SerialPort,
{
    let address = read_address(matches, "address")?;
    let image = read_image(matches)?;

    log::info!("programming {} bytes at {:#010X}", image.len(), address);

    let bar = progress_bar("programming");
    let result = session.program(address, &image);
    bar.finish_and_clear();
    result.context("programming failed")?;

    if matches.is_present("verify") {
        let bar = progress_bar("verifying");
        let result = session.verify(address, &image);
        bar.finish_and_clear();
        result.context("verification failed")?;
        log::info!("verified ok");
    }

    Ok(())
}

/// `erase` subcommand entry point.
pub fn erase<P>(matches: &ArgMatches<'_>, session: &mut Session<P>) -> Result<()>
where
    P: serial::SerialPort,
{
    let address = read_address(matches, "address")?;
    let size: u32 = matches
        .value_of("size")
        .unwrap()
        .parse()
        .context("invalid size, must be a decimal number of bytes")?;

    if size == 0 {
        bail!("size must be greater than zero");
    }

    let bar = progress_bar("erasing");
    let result = session.erase(address, size);
    bar.finish_and_clear();
    result.context("erase failed")
}

/// `verify` subcommand entry point.
pub fn verify<P>(matches: &ArgMatches<'_>, session: &mut Session<P>) -> Result<()>
where
    P: serial::SerialPort,
{
    let address = read_address(matches, "address")?;
    let image = read_image(matches)?;

    let bar = progress_bar("verifying");
    let result = session.verify(address, &image);
    bar.finish_and_clear();
    result.context("verification failed")?;

    log::info!("verified ok");
    Ok(())
}

/// `checksum` subcommand entry point.
pub fn checksum<P>(matches: &ArgMatches<'_>, session: &mut Session<P>) -> Result<()>
where
    P: serial::SerialPort,
{
    let start = read_address(matches, "start")?;
    let end = read_address(matches, "end")?;

    let sum = session.checksum(start, end).context("checksum failed")?;
    println!("{:#06X}", sum);

    Ok(())
}
