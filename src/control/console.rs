//! Line-oriented operator console
//!
//! Edits the persona, commits it to the shared file, and starts or stops
//! the supervised assistant.

use std::str::FromStr;
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use crate::assistant::Control;
use crate::ipc::{AssistantEvent, EventSink};
use crate::persona::{Intensity, PersonaConfig, PersonaSource, PersonaStore, Trait, TraitSet, compile};
use crate::{Error, Result};

use super::status::StatusIndicator;
use super::supervisor::{ChildCommand, Supervisor};

const HELP: &str = "\
commands:
  show                     print traits, prompt and status
  set <trait> <0-100>      adjust a trait slider
  text <prompt>            replace the prompt with custom text
  commit                   write the persona file
  start | stop             launch or stop the assistant
  listen | done            begin or end a capture
  quit                     stop the assistant and exit";

/// Parsed console input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Show,
    Set(Trait, Intensity),
    Text(String),
    Commit,
    Start,
    Stop,
    Listen,
    Done,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = Error;

    fn from_str(line: &str) -> Result<Self> {
        let line = line.trim();
        let (head, rest) = line
            .split_once(char::is_whitespace)
            .map_or((line, ""), |(h, r)| (h, r.trim()));

        match head.to_ascii_lowercase().as_str() {
            "show" => Ok(Self::Show),
            "set" => {
                let (name, value) = rest.rsplit_once(char::is_whitespace).ok_or_else(|| {
                    Error::InvalidInput("usage: set <trait> <0-100>".to_string())
                })?;
                let value: u8 = value
                    .trim()
                    .parse()
                    .map_err(|_| Error::InvalidInput(format!("not a percentage: {value}")))?;
                Ok(Self::Set(name.trim().parse()?, Intensity::new(value)?))
            }
            "text" if !rest.is_empty() => Ok(Self::Text(rest.to_string())),
            "text" => Err(Error::InvalidInput("usage: text <prompt>".to_string())),
            "commit" => Ok(Self::Commit),
            "start" => Ok(Self::Start),
            "stop" => Ok(Self::Stop),
            "listen" => Ok(Self::Listen),
            "done" => Ok(Self::Done),
            "help" | "?" => Ok(Self::Help),
            "quit" | "exit" => Ok(Self::Quit),
            other => Err(Error::InvalidInput(format!("unknown command: {other}"))),
        }
    }
}

/// Persona draft plus assistant status
#[derive(Debug)]
pub struct Console {
    store: PersonaStore,
    traits: TraitSet,
    custom_text: Option<String>,
    committed: Option<PersonaConfig>,
    status: StatusIndicator,
}

impl Console {
    /// Open the console on `store`, seeding the draft from the file
    #[must_use]
    pub fn new(mut store: PersonaStore) -> Self {
        let loaded = store.load();
        let has_config = loaded.source == PersonaSource::File;
        let custom_text = (has_config && loaded.config.custom_text != compile(&loaded.config.traits))
            .then(|| loaded.config.custom_text.clone());

        Self {
            store,
            committed: has_config.then(|| loaded.config.clone()),
            traits: loaded.config.traits,
            custom_text,
            status: StatusIndicator::new(has_config),
        }
    }

    #[must_use]
    pub const fn status(&self) -> &StatusIndicator {
        &self.status
    }

    pub const fn status_mut(&mut self) -> &mut StatusIndicator {
        &mut self.status
    }

    #[must_use]
    pub const fn traits(&self) -> &TraitSet {
        &self.traits
    }

    /// Persona that `commit` would write
    #[must_use]
    pub fn draft(&self) -> PersonaConfig {
        let mut config = PersonaConfig::compiled(self.traits.clone());
        if let Some(text) = &self.custom_text {
            config.custom_text.clone_from(text);
        }
        config
    }

    /// Adjust one slider; drops any custom prompt text
    pub fn set(&mut self, name: Trait, value: Intensity) {
        self.traits.set(name, value);
        if self.custom_text.take().is_some() {
            tracing::debug!("custom prompt replaced by compiled instructions");
        }
    }

    /// Replace the prompt with operator-written text
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.custom_text = Some(text.into());
    }

    /// Write the draft to the persona file
    ///
    /// Status only moves to Updating when the persona differs from the last
    /// commit, since the assistant acknowledges prompt changes only.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be written
    pub fn commit(&mut self) -> Result<PersonaConfig> {
        let config = self.draft();
        self.store.save(&config)?;
        if self.committed.as_ref() == Some(&config) {
            tracing::debug!("persona unchanged since last commit");
        } else {
            self.status.committed();
            self.committed = Some(config.clone());
        }
        Ok(config)
    }

    /// Human-readable summary for `show`
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (name, value) in self.traits.iter() {
            out.push_str(&format!("{:<24} {:>3}%\n", name.label(), value.value()));
        }
        out.push_str("\nprompt:\n");
        out.push_str(&self.draft().system_prompt());
        out.push_str(&format!(
            "\n\nstatus: {} ({})",
            self.status.status(),
            self.status.light()
        ));
        out
    }
}

/// Run the interactive console until `quit` or end of input
///
/// # Errors
///
/// Returns error if console output cannot be written
pub async fn run<R, W>(
    mut console: Console,
    launcher: ChildCommand,
    grace: Duration,
    input: R,
    mut output: W,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let (sink, mut events) = EventSink::channel();
    let mut supervisor: Option<Supervisor> = None;
    let mut lines = input.lines();

    write_line(&mut output, HELP).await?;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if line.trim().is_empty() {
                    continue;
                }
                let command = match line.parse::<Command>() {
                    Ok(command) => command,
                    Err(e) => {
                        write_line(&mut output, &e.to_string()).await?;
                        continue;
                    }
                };
                if command == Command::Quit {
                    break;
                }
                let reply = execute(&mut console, &mut supervisor, &launcher, grace, &sink, command).await;
                match reply {
                    Ok(text) => write_line(&mut output, &text).await?,
                    Err(e) => write_line(&mut output, &format!("error: {e}")).await?,
                }
            }
            Some(event) = events.recv() => {
                let text = present(&mut console, event);
                write_line(&mut output, &text).await?;
            }
        }

        if let Some(child) = supervisor.as_mut()
            && !child.is_running()
        {
            supervisor = None;
            console.status_mut().process_stopped();
            write_line(&mut output, "assistant exited").await?;
        }
    }

    if let Some(child) = supervisor.take() {
        child.stop().await?;
    }
    Ok(())
}

async fn execute(
    console: &mut Console,
    supervisor: &mut Option<Supervisor>,
    launcher: &ChildCommand,
    grace: Duration,
    sink: &EventSink,
    command: Command,
) -> Result<String> {
    match command {
        Command::Show => Ok(console.render()),
        Command::Help => Ok(HELP.to_string()),
        Command::Set(name, value) => {
            console.set(name, value);
            Ok(format!("{}: {}%", name.label(), value.value()))
        }
        Command::Text(text) => {
            console.set_text(text);
            Ok("custom prompt set, commit to apply".to_string())
        }
        Command::Commit => {
            console.commit()?;
            Ok(format!(
                "configuration saved, status {} ({})",
                console.status().status(),
                console.status().light()
            ))
        }
        Command::Start => {
            if supervisor.is_some() {
                return Ok("assistant already running".to_string());
            }
            console.status_mut().launched();
            let child = Supervisor::spawn(launcher, sink, grace)?;
            *supervisor = Some(child);
            console.status_mut().process_running();
            Ok("assistant started".to_string())
        }
        Command::Stop => match supervisor.take() {
            Some(child) => {
                let status = child.stop().await?;
                console.status_mut().process_stopped();
                Ok(format!("assistant stopped ({status})"))
            }
            None => Ok("assistant is not running".to_string()),
        },
        Command::Listen | Command::Done => {
            let child = supervisor
                .as_mut()
                .ok_or_else(|| Error::InvalidInput("assistant is not running".to_string()))?;
            let control = if command == Command::Listen {
                Control::BeginListening
            } else {
                Control::StopListening
            };
            child.send(control).await?;
            Ok(String::new())
        }
        Command::Quit => Ok(String::new()),
    }
}

/// Render an assistant event and update status
fn present(console: &mut Console, event: AssistantEvent) -> String {
    match event {
        AssistantEvent::Diagnostic { line } => line,
        AssistantEvent::Response { text } => format!("assistant:\n{text}"),
        AssistantEvent::ConfigApplied => {
            console.status_mut().config_applied();
            format!(
                "configuration applied, status {} ({})",
                console.status().status(),
                console.status().light()
            )
        }
    }
}

async fn write_line<W: AsyncWrite + Unpin>(output: &mut W, text: &str) -> Result<()> {
    if text.is_empty() {
        return Ok(());
    }
    output.write_all(text.as_bytes()).await?;
    output.write_all(b"\n").await?;
    output.flush().await?;
    Ok(())
}
