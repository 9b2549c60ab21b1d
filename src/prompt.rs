// src/prompt.rs

//! Interactive fallback input
//!
//! When a package id or version cannot be resolved from the cache, the
//! resolver asks a human. The channel is injected so tests can script
//! answers; the retry-until-non-empty loop belongs to the resolver, not to
//! the source.

use std::io::{self, BufRead, Write};

/// A blocking line-based prompt/response channel.
pub trait PromptSource {
    /// Display `prompt` and return one line of input, trimmed by the caller.
    fn ask(&mut self, prompt: &str) -> io::Result<String>;
}

/// Production wiring: prompt on stdout, read a line from stdin.
///
/// This blocks the whole pipeline until a human answers. That is the
/// intended behavior for a batch run driven from a terminal.
pub struct StdinPrompt;

impl PromptSource for StdinPrompt {
    fn ask(&mut self, prompt: &str) -> io::Result<String> {
        let mut stdout = io::stdout().lock();
        write!(stdout, "{}: ", prompt)?;
        stdout.flush()?;
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        Ok(line)
    }
}

/// Scripted answers for tests; panics when the script runs out.
pub struct ScriptedPrompt {
    answers: std::collections::VecDeque<String>,
}

impl ScriptedPrompt {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
        }
    }

    pub fn exhausted(&self) -> bool {
        self.answers.is_empty()
    }
}

impl PromptSource for ScriptedPrompt {
    fn ask(&mut self, prompt: &str) -> io::Result<String> {
        match self.answers.pop_front() {
            Some(answer) => Ok(answer),
            None => panic!("no scripted answer left for prompt: {}", prompt),
        }
    }
}
