mod alert;
mod countdown;
mod engine;
mod session;

use anyhow::{Context, Result};
use countdown_core::config::{self, Config};
use countdown_core::event::{SessionPhase, TimerEvent};
use countdown_core::ipc::{self, ClientMsg, DaemonMsg};
use engine::CountdownEngine;
use session::{Action, Session};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// A decoded client message plus the channel for writing back to that client.
struct Request {
    msg: ClientMsg,
    reply: mpsc::UnboundedSender<String>,
}

/// Everything the main loop owns.
struct Daemon {
    config: Config,
    session: Session,
    engine: CountdownEngine,
    events: mpsc::UnboundedReceiver<TimerEvent>,
    /// Clients that sent `subscribe`.
    watchers: Vec<mpsc::UnboundedSender<String>>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("countdownd=info".parse().context("parsing log directive")?),
        )
        .init();

    info!("countdownd starting");

    let config = Config::load().context("loading config")?;
    let tick_interval_ms = u64::try_from(config.timer.tick_interval().as_millis()).unwrap_or(u64::MAX);
    info!(tick_interval_ms, "config loaded");

    let mut daemon = Daemon::new(config).await;

    // Start IPC listener
    let socket_path = config::socket_path();
    // Remove stale socket
    let _ = std::fs::remove_file(&socket_path);
    if let Some(parent) = socket_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let listener = UnixListener::bind(&socket_path)
        .with_context(|| format!("binding socket {}", socket_path.display()))?;
    info!(path = %socket_path.display(), "IPC socket listening");

    let (request_tx, mut request_rx) = mpsc::unbounded_channel::<Request>();
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((stream, _)) => {
                    tokio::spawn(handle_ipc_client(stream, request_tx.clone()));
                }
                Err(e) => {
                    warn!(error = %e, "IPC accept error");
                }
            }
        }
    });

    loop {
        tokio::select! {
            Some(event) = daemon.events.recv() => {
                let actions = daemon.session.on_event(event);
                daemon.process_actions(actions).await;
            }
            Some(request) = request_rx.recv() => {
                daemon.handle_request(request).await;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
            else => break,
        }
    }

    info!("countdownd shutting down");
    daemon.engine.stop().await;
    let _ = std::fs::remove_file(&socket_path);
    Ok(())
}

impl Daemon {
    async fn new(config: Config) -> Self {
        let engine = CountdownEngine::new(config.timer.tick_interval());
        let events = engine.subscribe().await;
        Self {
            config,
            session: Session::new(),
            engine,
            events,
            watchers: Vec::new(),
        }
    }

    async fn handle_request(&mut self, request: Request) {
        let Request { msg, reply } = request;
        let response = match msg {
            ClientMsg::Start { duration_ms } => match self.session.start(duration_ms) {
                Ok(actions) => {
                    self.process_actions(actions).await;
                    DaemonMsg::ack(format!("started {}", self.session.display()))
                }
                Err(e) => DaemonMsg::nack(e.to_string()),
            },
            ClientMsg::Pause => {
                let actions = self.session.pause();
                if actions.is_empty() {
                    DaemonMsg::nack("not running")
                } else {
                    self.process_actions(actions).await;
                    let msg = DaemonMsg::ack(format!("paused at {}", self.session.display()));
                    self.release_watchers(&msg);
                    msg
                }
            }
            ClientMsg::Resume => match self.session.resume() {
                Ok(actions) if actions.is_empty() => DaemonMsg::nack("not paused"),
                Ok(actions) => {
                    self.process_actions(actions).await;
                    DaemonMsg::ack(format!("resumed at {}", self.session.display()))
                }
                Err(e) => DaemonMsg::nack(e.to_string()),
            },
            ClientMsg::Stop => {
                let actions = self.session.stop();
                self.process_actions(actions).await;
                let msg = DaemonMsg::ack("stopped");
                self.release_watchers(&msg);
                msg
            }
            ClientMsg::Subscribe => {
                if self.session.phase() == SessionPhase::Running {
                    self.watchers.push(reply.clone());
                    DaemonMsg::ack("subscribed")
                } else {
                    DaemonMsg::nack("not running")
                }
            }
            ClientMsg::GetStatus => DaemonMsg::Status {
                phase: self.session.phase(),
                engine: self.engine.state().await,
                display: self.session.display().to_string(),
                remaining_ms: self.session.remaining_ms(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        };
        let _ = reply.send(ipc::encode(&response));
    }

    async fn process_actions(&mut self, actions: Vec<Action>) {
        for action in actions {
            match action {
                Action::StartEngine(duration_ms) => {
                    // Events already queued belong to the schedule being replaced.
                    self.engine.stop().await;
                    self.drain_stale_events();
                    self.engine.start(duration_ms).await;
                }
                Action::StopEngine => {
                    self.engine.stop().await;
                    self.drain_stale_events();
                }
                Action::Broadcast(event) => {
                    let line = ipc::encode(&DaemonMsg::from_event(event, &self.config.alert.message));
                    self.watchers.retain(|tx| tx.send(line.clone()).is_ok());
                    if event == TimerEvent::Finished {
                        self.watchers.clear();
                    }
                }
                Action::Alert => {
                    let alert = self.config.alert.clone();
                    tokio::spawn(async move {
                        alert::fire(&alert).await;
                    });
                }
            }
        }
    }

    /// Send watchers a last line and forget them; the countdown they
    /// followed will publish nothing more.
    fn release_watchers(&mut self, msg: &DaemonMsg) {
        let line = ipc::encode(msg);
        for tx in self.watchers.drain(..) {
            let _ = tx.send(line.clone());
        }
    }

    fn drain_stale_events(&mut self) {
        while self.events.try_recv().is_ok() {}
    }
}

async fn handle_ipc_client(stream: UnixStream, requests: mpsc::UnboundedSender<Request>) {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    // Channel for sending messages back to this client
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    // Writer task
    let write_handle = tokio::spawn(async move {
        while let Some(line) = rx.recv().await {
            if writer.write_all(line.as_bytes()).await.is_err() {
                break;
            }
        }
    });

    while let Ok(Some(line)) = lines.next_line().await {
        let Some(msg) = ipc::decode_client(&line) else {
            let _ = tx.send(ipc::encode(&DaemonMsg::nack("unrecognized message")));
            continue;
        };
        info!(?msg, "IPC request");
        let request = Request {
            msg,
            reply: tx.clone(),
        };
        if requests.send(request).is_err() {
            error!("main loop gone, dropping client");
            break;
        }
    }

    // Client disconnected; its watcher sender is pruned on the next broadcast.
    write_handle.abort();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::mpsc::error::TryRecvError;

    async fn make_daemon() -> Daemon {
        Daemon::new(Config::default()).await
    }

    /// Handle `msg` as if sent by a client, returning that client's channel.
    async fn send(
        daemon: &mut Daemon,
        msg: ClientMsg,
    ) -> mpsc::UnboundedReceiver<String> {
        let (reply, rx) = mpsc::unbounded_channel();
        daemon.handle_request(Request { msg, reply }).await;
        rx
    }

    fn next_msg(rx: &mut mpsc::UnboundedReceiver<String>) -> DaemonMsg {
        let line = rx.try_recv().expect("a line for the client");
        ipc::decode_daemon(&line).expect("a daemon message")
    }

    fn assert_ack(msg: DaemonMsg, expect_ok: bool, expect_message: &str) {
        match msg {
            DaemonMsg::Ack { ok, message } => {
                assert_eq!(ok, expect_ok, "ack for {:?}", message);
                assert_eq!(message, expect_message);
            }
            other => panic!("expected Ack, got {:?}", other),
        }
    }

    // --- alert runs in the background ---

    #[tokio::test]
    async fn slow_alert_command_does_not_block_the_loop() {
        let mut config = Config::default();
        config.alert.command = Some("sleep 2".into());
        let mut daemon = Daemon::new(config).await;
        daemon.session.start(1000).unwrap();

        let started = std::time::Instant::now();
        let actions = daemon.session.on_event(TimerEvent::Finished);
        assert!(actions.contains(&Action::Alert));
        daemon.process_actions(actions).await;
        assert!(
            started.elapsed() < Duration::from_millis(500),
            "took {:?}",
            started.elapsed()
        );
    }

    // --- watchers always get a final line ---

    #[tokio::test(start_paused = true)]
    async fn subscribe_while_idle_is_refused() {
        let mut daemon = make_daemon().await;
        let mut rx = send(&mut daemon, ClientMsg::Subscribe).await;
        assert_ack(next_msg(&mut rx), false, "not running");
        assert!(daemon.watchers.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn subscribe_while_paused_is_refused() {
        let mut daemon = make_daemon().await;
        send(&mut daemon, ClientMsg::Start { duration_ms: 3000 }).await;
        send(&mut daemon, ClientMsg::Pause).await;
        let mut rx = send(&mut daemon, ClientMsg::Subscribe).await;
        assert_ack(next_msg(&mut rx), false, "not running");
    }

    #[tokio::test(start_paused = true)]
    async fn pause_releases_watchers() {
        let mut daemon = make_daemon().await;
        send(&mut daemon, ClientMsg::Start { duration_ms: 90_000 }).await;
        let mut watcher = send(&mut daemon, ClientMsg::Subscribe).await;
        assert_ack(next_msg(&mut watcher), true, "subscribed");

        let mut pauser = send(&mut daemon, ClientMsg::Pause).await;
        assert_ack(next_msg(&mut pauser), true, "paused at 00:01:30");
        assert_ack(next_msg(&mut watcher), true, "paused at 00:01:30");
        assert!(daemon.watchers.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_releases_watchers() {
        let mut daemon = make_daemon().await;
        send(&mut daemon, ClientMsg::Start { duration_ms: 3000 }).await;
        let mut watcher = send(&mut daemon, ClientMsg::Subscribe).await;
        next_msg(&mut watcher);

        send(&mut daemon, ClientMsg::Stop).await;
        assert_ack(next_msg(&mut watcher), true, "stopped");
        assert!(daemon.watchers.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn finished_reaches_watchers_then_forgets_them() {
        let mut daemon = make_daemon().await;
        send(&mut daemon, ClientMsg::Start { duration_ms: 1000 }).await;
        let mut watcher = send(&mut daemon, ClientMsg::Subscribe).await;
        next_msg(&mut watcher);

        let event = daemon.events.recv().await.expect("engine event");
        assert_eq!(event, TimerEvent::Finished);
        let actions = daemon.session.on_event(event);
        daemon.process_actions(actions).await;

        assert!(matches!(next_msg(&mut watcher), DaemonMsg::Finished { .. }));
        assert_eq!(watcher.try_recv(), Err(TryRecvError::Empty));
        assert!(daemon.watchers.is_empty());
    }

    // --- restarts never leak the old schedule ---

    #[tokio::test(start_paused = true)]
    async fn restart_discards_queued_events_of_replaced_countdown() {
        let mut daemon = make_daemon().await;
        send(&mut daemon, ClientMsg::Start { duration_ms: 3000 }).await;

        // Let the first tick land in the queue without consuming it.
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(!daemon.events.is_empty());

        send(&mut daemon, ClientMsg::Start { duration_ms: 60_000 }).await;
        let event = daemon.events.recv().await.expect("engine event");
        assert_eq!(event, TimerEvent::Tick { remaining_ms: 59_000 });

        daemon.session.on_event(event);
        assert_eq!(daemon.session.display().to_string(), "00:00:59");
    }

    #[tokio::test(start_paused = true)]
    async fn pause_discards_queued_events() {
        let mut daemon = make_daemon().await;
        send(&mut daemon, ClientMsg::Start { duration_ms: 3000 }).await;
        tokio::time::sleep(Duration::from_millis(1500)).await;

        send(&mut daemon, ClientMsg::Pause).await;
        assert_eq!(daemon.events.try_recv(), Err(TryRecvError::Empty));
    }
}
