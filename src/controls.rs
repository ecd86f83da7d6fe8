use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crate::params::{SampleMode, SharedParams};

#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Toggle(String),
    Mode(SampleMode),
    Status,
    Quit,
}

pub fn parse_command(line: &str) -> Option<Command> {
    let word = line.trim().to_ascii_lowercase();
    match word.as_str() {
        "gradient" | "bars" | "hearts" | "circles" | "noise" | "invert" | "emboss" => {
            Some(Command::Toggle(word))
        }
        "freq" | "frequency" => Some(Command::Mode(SampleMode::Frequency)),
        "time" | "waveform" => Some(Command::Mode(SampleMode::TimeDomain)),
        "status" | "?" => Some(Command::Status),
        "quit" | "q" | "exit" => Some(Command::Quit),
        _ => None,
    }
}

/// Applies commands line by line until `quit` or end of input. Sets `quit` on either.
pub fn run_controls<R: BufRead>(reader: R, params: &SharedParams, quit: &AtomicBool) {
    for line in reader.lines() {
        let Ok(line) = line else { break };
        if line.trim().is_empty() {
            continue;
        }
        match parse_command(&line) {
            Some(Command::Toggle(name)) => {
                params.update(|p| {
                    p.toggle(&name);
                });
                log::info!("Toggled {}", name);
            }
            Some(Command::Mode(mode)) => {
                params.update(|p| p.sample_mode = mode);
                log::info!("Sample mode: {:?}", mode);
            }
            Some(Command::Status) => log::info!("{:?}", params.snapshot()),
            Some(Command::Quit) => break,
            None => log::warn!("Unknown command: {}", line.trim()),
        }
        if quit.load(Ordering::Relaxed) {
            return;
        }
    }
    quit.store(true, Ordering::Relaxed);
}

/// Reads commands from stdin on a detached thread.
pub fn spawn_stdin_controls(params: SharedParams, quit: Arc<AtomicBool>) {
    log::info!("Controls: gradient, bars, hearts, noise, invert, emboss, freq, time, status, quit");
    thread::spawn(move || {
        let stdin = std::io::stdin();
        run_controls(stdin.lock(), &params, &quit);
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::DrawParams;
    use std::io::Cursor;

    #[test]
    fn parses_commands() {
        assert_eq!(parse_command(" Bars \n"), Some(Command::Toggle("bars".into())));
        assert_eq!(parse_command("time"), Some(Command::Mode(SampleMode::TimeDomain)));
        assert_eq!(parse_command("q"), Some(Command::Quit));
        assert_eq!(parse_command("louder"), None);
    }

    #[test]
    fn commands_update_shared_params() {
        let params = SharedParams::new(DrawParams::default());
        let quit = AtomicBool::new(false);
        run_controls(
            Cursor::new("bars\nhearts\nnonsense\n\ntime\nhearts\n"),
            &params,
            &quit,
        );
        let p = params.snapshot();
        assert!(p.show_bars);
        assert!(!p.show_circles);
        assert_eq!(p.sample_mode, SampleMode::TimeDomain);
        assert!(quit.load(Ordering::Relaxed), "end of input quits");
    }

    #[test]
    fn quit_stops_reading() {
        let params = SharedParams::new(DrawParams::default());
        let quit = AtomicBool::new(false);
        run_controls(Cursor::new("quit\nbars\n"), &params, &quit);
        assert!(!params.snapshot().show_bars);
        assert!(quit.load(Ordering::Relaxed));
    }
}
