mod scenario;

use std::io::Write;

use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};

use crate::scenario::Scenario;

fn init_logging() {
    let level = std::env::var("CARSIM_LOG")
        .ok()
        .and_then(|value| value.parse::<LevelFilter>().ok())
        .unwrap_or(LevelFilter::Info);
    // Logs go to stderr so stdout stays one JSON snapshot per line.
    if TermLogger::init(level, Config::default(), TerminalMode::Stderr, ColorChoice::Auto).is_err() {
        eprintln!("logger already initialised");
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let path = std::env::args()
        .nth(1)
        .ok_or("usage: carsim-app <scenario.json>")?;
    let scenario = Scenario::from_path(&path)?;
    log::info!("loaded scenario {path} ({} frames)", scenario.frames.len());

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let mut write_error = None;
    scenario.run(|snapshot| {
        if write_error.is_some() {
            return;
        }
        let line = serde_json::to_string(snapshot).map_err(std::io::Error::from);
        if let Err(err) = line.and_then(|line| writeln!(out, "{line}")) {
            write_error = Some(err);
        }
    })?;
    if let Some(err) = write_error {
        return Err(err.into());
    }
    out.flush()?;
    Ok(())
}
