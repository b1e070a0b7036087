//! Text console in place of microphone and speakers

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use super::{Listener, Speaker};
use crate::{Error, Result};

/// Reads one utterance per stdin line
pub struct ConsoleListener {
    lines: Lines<BufReader<Stdin>>,
}

impl ConsoleListener {
    #[must_use]
    pub fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }
}

impl Default for ConsoleListener {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait(?Send)]
impl Listener for ConsoleListener {
    async fn listen(&mut self) -> Result<String> {
        match self.lines.next_line().await {
            Ok(Some(line)) => Ok(line.trim().to_string()),
            Ok(None) => Err(Error::InputClosed("stdin closed".to_string())),
            Err(e) => Err(Error::InputClosed(format!("stdin read failed: {e}"))),
        }
    }
}

/// Prints each sentence to stdout
#[derive(Debug, Default)]
pub struct ConsoleSpeaker;

#[async_trait(?Send)]
impl Speaker for ConsoleSpeaker {
    async fn speak(&mut self, text: &str) -> Result<()> {
        println!("assistant: {text}");
        Ok(())
    }
}
