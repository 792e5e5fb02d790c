//! Command Channel (§4.G)
//!
//! A single-slot, edge-triggered mailbox: the streaming engine polls it
//! once per loop iteration, and a read always consumes (truncates) the
//! slot so a command can never fire twice. Implemented as a plain file,
//! which is what operators/API handlers write to directly, but shaped as
//! a narrow trait-free struct so a socket-backed implementation could
//! stand in without the Engine noticing.

use crate::models::Command;
use std::io::{Read, Seek, SeekFrom};
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::{debug, warn};

pub struct CommandChannel {
    path: PathBuf,
    lock: Mutex<()>,
}

impl CommandChannel {
    pub fn new(path: PathBuf) -> Self {
        Self { path, lock: Mutex::new(()) }
    }

    /// Read and clear the slot, if a command is waiting. Never blocks the
    /// caller on filesystem errors — those are logged and treated as "no
    /// command pending".
    pub async fn poll(&self) -> Option<Command> {
        let _guard = self.lock.lock().await;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || read_and_truncate(&path))
            .await
            .unwrap_or(None)
    }

    /// Write a command into the slot (used by the HTTP API). Plain text so
    /// the file can be written with any text editor or `echo`.
    pub async fn issue(&self, command: Command) -> std::io::Result<()> {
        let _guard = self.lock.lock().await;
        tokio::fs::write(&self.path, command.as_payload()).await
    }
}

fn read_and_truncate(path: &std::path::Path) -> Option<Command> {
    let mut file = match std::fs::OpenOptions::new().read(true).write(true).open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            warn!("failed to open command file {:?}: {}", path, e);
            return None;
        }
    };

    let mut contents = String::new();
    if let Err(e) = file.read_to_string(&mut contents) {
        warn!("failed to read command file {:?}: {}", path, e);
        return None;
    }
    if contents.trim().is_empty() {
        return None;
    }

    if let Err(e) = file.set_len(0).and_then(|_| file.seek(SeekFrom::Start(0)).map(|_| ())) {
        warn!("failed to truncate command file {:?}: {}", path, e);
    }

    match Command::parse(&contents) {
        Some(command) => {
            debug!("consumed command: {:?}", command);
            Some(command)
        }
        None => {
            warn!("unrecognized command file payload, dropping: {:?}", contents.trim());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_then_read_consumes_once() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("command.txt");
        let channel = CommandChannel::new(path);

        channel.issue(Command::Skip).await.unwrap();
        assert_eq!(channel.poll().await, Some(Command::Skip));
        assert_eq!(channel.poll().await, None);
    }

    #[tokio::test]
    async fn echoed_plain_text_payload_is_recognized() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("command.txt");
        std::fs::write(&path, "skip\n").unwrap();
        let channel = CommandChannel::new(path);
        assert_eq!(channel.poll().await, Some(Command::Skip));
    }

    #[tokio::test]
    async fn missing_file_polls_to_none() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("does_not_exist.txt");
        let channel = CommandChannel::new(path);
        assert_eq!(channel.poll().await, None);
    }
}
