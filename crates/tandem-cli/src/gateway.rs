//! Conflict decisions from the terminal or a fixed `--resolve` policy

use std::io::{self, BufRead, StdinLock, Stdout, Write};

use tandem_core::sync::{ConflictAnswer, ConflictRequest, DecisionGateway, FixedAnswerGateway};
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::task::block_in_place;

use crate::cli::ResolveStrategy;

/// Parse one line of prompt input; `Err` carries a hint for the user
pub fn parse_answer(input: &str) -> Result<ConflictAnswer, String> {
    let input = input.trim();
    let (command, rest) = input
        .split_once(char::is_whitespace)
        .map_or((input, ""), |(command, rest)| (command, rest.trim()));

    match command.to_ascii_lowercase().as_str() {
        "s" | "server" => Ok(ConflictAnswer::UseServer),
        "c" | "client" => Ok(ConflictAnswer::UseClient),
        "k" | "skip" => Ok(ConflictAnswer::Skip),
        "custom" if rest.is_empty() => Err("custom needs a JSON record".to_string()),
        "custom" => serde_json::from_str(rest)
            .map(ConflictAnswer::Custom)
            .map_err(|error| format!("invalid JSON: {error}")),
        "" => Err("no answer given".to_string()),
        other => Err(format!("unknown answer '{other}'")),
    }
}

/// Asks on a line-oriented terminal
pub struct PromptGateway<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> PromptGateway<R, W> {
    pub const fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn show(&mut self, request: &ConflictRequest) -> io::Result<()> {
        writeln!(self.output)?;
        writeln!(
            self.output,
            "Conflict on {} (attempt {})",
            request.record_id, request.attempt
        )?;
        if let Some(reason) = &request.rejection {
            writeln!(self.output, "Previous answer rejected: {reason}")?;
        }
        let local = serde_json::to_string_pretty(&request.candidate)
            .unwrap_or_else(|_| request.candidate.to_string());
        writeln!(self.output, "Your copy:\n{local}")?;
        Ok(())
    }

    /// Terminal reads block, so on a multi-thread runtime the worker is
    /// handed off first
    fn read_line(&mut self, line: &mut String) -> io::Result<usize> {
        let input = &mut self.input;
        match Handle::try_current().map(|handle| handle.runtime_flavor()) {
            Ok(RuntimeFlavor::MultiThread) => block_in_place(|| input.read_line(line)),
            _ => input.read_line(line),
        }
    }

    fn ask(&mut self) -> tandem_core::Result<ConflictAnswer> {
        loop {
            write!(
                self.output,
                "Keep [s]erver, [c]lient, s[k]ip, or `custom <json>`: "
            )?;
            self.output.flush()?;

            let mut line = String::new();
            if self.read_line(&mut line)? == 0 {
                return Err(tandem_core::Error::Gateway(
                    "decision input closed".to_string(),
                ));
            }

            match parse_answer(&line) {
                Ok(answer) => return Ok(answer),
                Err(hint) => writeln!(self.output, "{hint}")?,
            }
        }
    }
}

impl<R: BufRead, W: Write> DecisionGateway for PromptGateway<R, W> {
    async fn request_decision(
        &mut self,
        request: &ConflictRequest,
    ) -> tandem_core::Result<ConflictAnswer> {
        self.show(request)?;
        self.ask()
    }
}

/// Gateway picked by `--resolve`
pub enum CliGateway {
    Prompt(PromptGateway<StdinLock<'static>, Stdout>),
    Fixed(FixedAnswerGateway),
}

impl CliGateway {
    pub fn for_strategy(strategy: ResolveStrategy) -> Self {
        match strategy {
            ResolveStrategy::Prompt => {
                Self::Prompt(PromptGateway::new(io::stdin().lock(), io::stdout()))
            }
            ResolveStrategy::Server => Self::Fixed(FixedAnswerGateway::server_wins()),
            ResolveStrategy::Client => {
                Self::Fixed(FixedAnswerGateway::new(ConflictAnswer::UseClient))
            }
            ResolveStrategy::Skip => Self::Fixed(FixedAnswerGateway::new(ConflictAnswer::Skip)),
        }
    }
}

impl DecisionGateway for CliGateway {
    async fn request_decision(
        &mut self,
        request: &ConflictRequest,
    ) -> tandem_core::Result<ConflictAnswer> {
        match self {
            Self::Prompt(gateway) => gateway.request_decision(request).await,
            Self::Fixed(gateway) => gateway.request_decision(request).await,
        }
    }
}
