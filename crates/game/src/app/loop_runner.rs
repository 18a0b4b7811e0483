use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread;

use rhythm_engine::{run_frame_loop, Direction};
use tracing::{error, info, warn};

use super::bootstrap::{AppWiring, FrontEndEvent};
use super::console::{ConsoleCommandProcessor, ConsoleState};
use super::executor::AdminExecutor;

/// What a stdin line means to the front end.
#[derive(Debug, Clone, PartialEq, Eq)]
enum LineAction {
    Press(Option<Direction>),
    TogglePause,
    ShowHud,
    Console(String),
}

pub(crate) fn run(app: AppWiring) -> ExitCode {
    let AppWiring {
        config,
        session,
        metrics,
        mut executor,
        events_tx,
        events_rx,
    } = app;

    let stop = Arc::new(AtomicBool::new(false));
    let frame_thread = {
        let stop = Arc::clone(&stop);
        let session = session.clone();
        let metrics = metrics.clone();
        thread::Builder::new()
            .name("frame-loop".to_string())
            .spawn(move || run_frame_loop(&session, &config, &stop, &metrics))
    };
    let frame_thread = match frame_thread {
        Ok(handle) => handle,
        Err(err) => {
            error!(error = %err, "frame_thread_spawn_failed");
            return ExitCode::FAILURE;
        }
    };
    if let Err(err) = spawn_stdin_reader(events_tx) {
        error!(error = %err, "stdin_thread_spawn_failed");
        stop.store(true, Ordering::Relaxed);
        let _ = frame_thread.join();
        return ExitCode::FAILURE;
    }

    let mut console = ConsoleState::default();
    let mut processor = ConsoleCommandProcessor::new();
    print_lines(&[
        "Moonwalk Mania ready. Type 'help' for commands, 'game start' to play.".to_string(),
        "Press a/w/s/d (or left/up/down/right) + Enter to hit, 'p' to pause, Enter for HUD."
            .to_string(),
    ]);

    for event in events_rx.iter() {
        match event {
            FrontEndEvent::Line(line) => {
                handle_line(&line, &mut executor, &mut processor, &mut console);
            }
            FrontEndEvent::RunEnded => {
                let summary = executor.finish_run();
                for line in summary {
                    console.append_output_line(line);
                }
            }
            FrontEndEvent::Eof => {
                info!("stdin_closed");
                break;
            }
        }

        let mut output = Vec::new();
        console.drain_output_lines_into(&mut output);
        print_lines(&output);
        if executor.quit_requested() {
            break;
        }
    }

    stop.store(true, Ordering::Relaxed);
    match frame_thread.join() {
        Ok(frames) => {
            info!(frames, "shutdown_complete");
            ExitCode::SUCCESS
        }
        Err(_) => {
            error!("frame_thread_panicked");
            ExitCode::FAILURE
        }
    }
}

fn handle_line(
    line: &str,
    executor: &mut AdminExecutor,
    processor: &mut ConsoleCommandProcessor,
    console: &mut ConsoleState,
) {
    match classify_line(line) {
        LineAction::Press(direction) => {
            console.append_output_line(executor.judge_input(direction));
        }
        LineAction::TogglePause => {
            console.append_output_line(executor.toggle_pause());
        }
        LineAction::ShowHud => {
            console.append_output_line(executor.hud_line());
        }
        LineAction::Console(command) => {
            console.submit_line(&command);
            processor.process_pending_lines(console);
            let mut commands = Vec::new();
            processor.drain_pending_admin_commands_into(&mut commands);
            executor.execute_all(commands, console);
        }
    }
}

fn classify_line(line: &str) -> LineAction {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return LineAction::ShowHud;
    }
    let lower = trimmed.to_ascii_lowercase();
    match lower.as_str() {
        "hit" => LineAction::Press(None),
        "p" | "space" => LineAction::TogglePause,
        _ => match lower.parse::<Direction>() {
            Ok(direction) => LineAction::Press(Some(direction)),
            Err(_) => LineAction::Console(trimmed.to_string()),
        },
    }
}

fn spawn_stdin_reader(events_tx: Sender<FrontEndEvent>) -> io::Result<()> {
    thread::Builder::new()
        .name("stdin-reader".to_string())
        .spawn(move || {
            let stdin = io::stdin();
            for line in stdin.lock().lines() {
                match line {
                    Ok(line) => {
                        if events_tx.send(FrontEndEvent::Line(line)).is_err() {
                            return;
                        }
                    }
                    Err(err) => {
                        warn!(error = %err, "stdin_read_failed");
                        break;
                    }
                }
            }
            let _ = events_tx.send(FrontEndEvent::Eof);
        })
        .map(|_| ())
}

fn print_lines(lines: &[String]) {
    if lines.is_empty() {
        return;
    }
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for line in lines {
        if writeln!(out, "{line}").is_err() {
            return;
        }
    }
    let _ = out.flush();
}
