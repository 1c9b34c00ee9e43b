use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use countdown_core::config;
use countdown_core::fields::DurationFields;
use countdown_core::ipc::{self, ClientMsg, DaemonMsg};
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;

#[derive(Parser)]
#[command(name = "countdownctl", about = "Control the countdownd daemon")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the countdown status
    Status,
    /// Start a countdown, replacing any current one
    Start {
        /// Hours (e.g. 0)
        hours: String,
        /// Minutes (e.g. 05)
        minutes: String,
        /// Seconds (e.g. 30)
        seconds: String,
    },
    /// Pause the countdown, keeping the remaining time
    Pause,
    /// Resume a paused countdown
    Resume,
    /// Stop the countdown and clear the display
    Stop,
    /// Follow the countdown until it finishes
    Watch,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Validate input before bothering the daemon.
    let msg: ClientMsg = match cli.command {
        Command::Status => ClientMsg::GetStatus,
        Command::Start {
            hours,
            minutes,
            seconds,
        } => {
            let fields = DurationFields::parse(&hours, &minutes, &seconds)?;
            ClientMsg::Start {
                duration_ms: fields.ensure_startable()?,
            }
        }
        Command::Pause => ClientMsg::Pause,
        Command::Resume => ClientMsg::Resume,
        Command::Stop => ClientMsg::Stop,
        Command::Watch => ClientMsg::Subscribe,
    };
    let watching = matches!(msg, ClientMsg::Subscribe);
    let mut subscribed = false;

    let socket_path = config::socket_path();
    let stream = UnixStream::connect(&socket_path).with_context(|| {
        format!(
            "connecting to countdownd at {}\nIs the daemon running?",
            socket_path.display()
        )
    })?;

    let mut writer = stream.try_clone().context("cloning stream")?;
    let reader = BufReader::new(stream);

    let line = ipc::encode(&msg);
    writer
        .write_all(line.as_bytes())
        .context("sending command")?;

    // Read responses
    for line in reader.lines() {
        let line = line.context("reading response")?;
        let Some(resp) = ipc::decode_daemon(&line) else {
            continue;
        };
        match resp {
            DaemonMsg::Status {
                phase,
                engine,
                display,
                remaining_ms,
                version,
            } => {
                println!("countdownd v{}", version);
                println!("  phase:     {:?}", phase);
                println!("  engine:    {:?}", engine);
                println!("  remaining: {} ({} ms)", display, remaining_ms);
            }
            DaemonMsg::Ack { ok, message } => {
                if !ok {
                    eprintln!("error: {}", message);
                    std::process::exit(1);
                }
                if watching && !subscribed {
                    // Subscription confirmed; the next ack means someone
                    // paused or stopped the countdown.
                    subscribed = true;
                    continue;
                }
                if watching {
                    println!();
                }
                println!("{}", message);
            }
            DaemonMsg::Tick { display, .. } => {
                print!("\r{}", display);
                std::io::stdout().flush().context("writing display")?;
                continue;
            }
            DaemonMsg::Finished { message } => {
                // BEL stands in for the vibration.
                println!("\r00:00:00\n{}\x07", message);
            }
        }
        break;
    }

    Ok(())
}
