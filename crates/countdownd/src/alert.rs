use anyhow::{Context, Result};
use countdown_core::config::AlertConfig;
use tokio::process::Command;
use tracing::{info, warn};

/// Announce that the countdown is over: log it, then run the configured
/// alert command if there is one. Failures are logged, never fatal.
pub async fn fire(config: &AlertConfig) {
    info!(message = %config.message, vibrate_ms = config.vibrate_ms, "countdown over");

    let Some(mut command) = build_command(config) else {
        return;
    };
    if let Err(e) = run(&mut command).await {
        warn!(error = %e, "alert command failed");
    }
}

/// `sh -c <command>` with the alert details in its environment.
fn build_command(config: &AlertConfig) -> Option<Command> {
    let script = config.command.as_deref()?.trim();
    if script.is_empty() {
        return None;
    }
    let mut command = Command::new("sh");
    command
        .arg("-c")
        .arg(script)
        .env("COUNTDOWN_ALERT_MESSAGE", &config.message)
        .env("COUNTDOWN_VIBRATE_MS", config.vibrate_ms.to_string())
        .kill_on_drop(true);
    Some(command)
}

async fn run(command: &mut Command) -> Result<()> {
    let status = command.status().await.context("spawning alert command")?;
    if !status.success() {
        anyhow::bail!("alert command exited with {}", status);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with(command: Option<&str>) -> AlertConfig {
        AlertConfig {
            command: command.map(String::from),
            ..AlertConfig::default()
        }
    }

    #[test]
    fn no_command_configured_builds_nothing() {
        assert!(build_command(&config_with(None)).is_none());
        assert!(build_command(&config_with(Some("   "))).is_none());
    }

    #[test]
    fn command_runs_through_sh() {
        let command = build_command(&config_with(Some("true"))).expect("command");
        let std_command = command.as_std();
        assert_eq!(std_command.get_program(), "sh");
        let args: Vec<_> = std_command.get_args().collect();
        assert_eq!(args, ["-c", "true"]);
    }

    #[test]
    fn command_environment_carries_alert_details() {
        let command = build_command(&config_with(Some("true"))).expect("command");
        let envs: Vec<_> = command
            .as_std()
            .get_envs()
            .filter_map(|(k, v)| Some((k.to_str()?.to_string(), v?.to_str()?.to_string())))
            .collect();
        assert!(envs.contains(&("COUNTDOWN_VIBRATE_MS".into(), "1500".into())));
        assert!(envs.contains(&("COUNTDOWN_ALERT_MESSAGE".into(), "Countdown over!".into())));
    }

    #[tokio::test]
    async fn env_is_visible_to_the_script() {
        let mut command =
            build_command(&config_with(Some("test \"$COUNTDOWN_VIBRATE_MS\" = 1500"))).expect("command");
        assert!(run(&mut command).await.is_ok());
    }

    #[tokio::test]
    async fn failing_command_is_an_error() {
        let mut command = build_command(&config_with(Some("exit 3"))).expect("command");
        assert!(run(&mut command).await.is_err());
    }
}
