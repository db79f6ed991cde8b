//! Threading and Async Integration Helpers
//!
//! Channel plumbing between front-end tasks (stdin reader, one-shot driver)
//! and the controller's owner loop.

use super::console::{parse_command, HELP};
use super::Command;
use std::io::BufRead;
use tokio::sync::mpsc;

/// Command channel capacity. Commands are user-paced.
const COMMAND_CAPACITY: usize = 64;

/// Sending half of the controller's command channel.
#[derive(Clone)]
pub struct CommandBridge {
    pub command_tx: mpsc::Sender<Command>,
}

impl CommandBridge {
    pub fn new() -> (Self, mpsc::Receiver<Command>) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CAPACITY);
        (Self { command_tx }, command_rx)
    }

    /// Queue a command. Fails only when the controller is gone.
    pub async fn send(&self, cmd: Command) -> Result<(), mpsc::error::SendError<Command>> {
        self.command_tx.send(cmd).await
    }
}

/// Read console lines from stdin on a dedicated thread and forward parsed
/// commands.
///
/// A plain thread rather than a runtime task: a blocked stdin read must not
/// hold up runtime shutdown. Ends at EOF (dropping its sender) or when the
/// controller is gone.
pub fn spawn_stdin_reader(bridge: CommandBridge) -> std::io::Result<std::thread::JoinHandle<()>> {
    std::thread::Builder::new()
        .name("stdin-reader".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        log::error!("[Console] Failed to read stdin: {}", e);
                        break;
                    }
                };
                if matches!(line.trim(), "help" | "?") {
                    println!("{}", HELP);
                    continue;
                }
                match parse_command(&line) {
                    Ok(cmd) => {
                        if bridge.command_tx.blocking_send(cmd).is_err() {
                            break;
                        }
                    }
                    Err(e) => eprintln!("{} (type 'help')", e),
                }
            }
            log::debug!("[Console] stdin reader finished");
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bridge_delivers_in_order() {
        let (bridge, mut rx) = CommandBridge::new();
        bridge.send(Command::Start).await.unwrap();
        bridge.send(Command::Quit).await.unwrap();

        assert_eq!(rx.recv().await, Some(Command::Start));
        assert_eq!(rx.recv().await, Some(Command::Quit));
    }

    #[tokio::test]
    async fn test_send_fails_once_receiver_dropped() {
        let (bridge, rx) = CommandBridge::new();
        drop(rx);
        assert!(bridge.send(Command::Save).await.is_err());
    }
}
