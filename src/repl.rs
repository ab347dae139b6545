//! Interactive command loop
//!
//! Reads verbs and follow-up answers from a line source and drives a
//! [`Session`]. Generic over its input and output so the whole dialogue can be
//! exercised in tests.

use std::io::{self, BufRead, Write};
use std::path::Path;

use crate::error::SessionError;
use crate::session::{LoadOutcome, Session, WatchStatus};

pub const PROMPT: &str = "> ";

const VERBS: &str = "load, unload, print, save, exit";

/// A verb typed at the prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Load,
    Save,
    Unload,
    Print,
    Help,
    Exit,
    Unknown(String),
}

impl Command {
    /// Verbs are trimmed and case-insensitive
    pub fn parse(input: &str) -> Self {
        let verb = input.trim().to_lowercase();
        match verb.as_str() {
            "load" => Self::Load,
            "save" => Self::Save,
            "unload" => Self::Unload,
            "print" => Self::Print,
            "help" => Self::Help,
            "exit" => Self::Exit,
            _ => Self::Unknown(verb),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Exit,
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

fn is_no(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "n" | "no")
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

pub struct Repl<R, W> {
    session: Session,
    input: R,
    output: W,
    confirm_load: bool,
}

impl<R: BufRead, W: Write> Repl<R, W> {
    pub fn new(session: Session, input: R, output: W, confirm_load: bool) -> Self {
        Self {
            session,
            input,
            output,
            confirm_load,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn into_session(self) -> Session {
        self.session
    }

    /// Print the banner and handle commands until `exit` or end of input
    pub fn run(&mut self) -> io::Result<()> {
        writeln!(self.output, "In-Memory CSV Database")?;
        writeln!(self.output, "Commands: {}", VERBS)?;

        loop {
            let Some(line) = self.ask(PROMPT)? else {
                break;
            };
            if self.execute(Command::parse(&line))? == Flow::Exit {
                return Ok(());
            }
        }

        self.exit()?;
        Ok(())
    }

    /// Load `path` through the same checks and gate as the `load` verb
    pub fn load_path(&mut self, path: &Path) -> io::Result<()> {
        let Self {
            session,
            input,
            output,
            confirm_load,
        } = self;

        let mut prompt_error = None;
        let result = session.load(path, |p| {
            if !*confirm_load {
                return true;
            }
            match prompt(
                input,
                output,
                &format!("Confirm loading file '{}'? (yes/no): ", p.display()),
            ) {
                Ok(answer) => answer.as_deref().is_some_and(is_yes),
                Err(e) => {
                    prompt_error = Some(e);
                    false
                }
            }
        });
        if let Some(e) = prompt_error {
            return Err(e);
        }

        match result {
            Ok(LoadOutcome::Loaded { watch, .. }) => match watch {
                WatchStatus::Failed(e) => writeln!(
                    self.output,
                    "File loaded into memory (live reload unavailable: {}).",
                    e
                ),
                WatchStatus::Active | WatchStatus::Disabled => {
                    writeln!(self.output, "File loaded into memory.")
                }
            },
            Ok(LoadOutcome::Cancelled) => writeln!(self.output, "Load cancelled."),
            Err(e) => self.report(&e),
        }
    }

    fn execute(&mut self, command: Command) -> io::Result<Flow> {
        tracing::debug!("Command: {:?}", command);
        match command {
            Command::Load => {
                if let Some(loaded) = self.session.watched_file() {
                    let error = SessionError::AlreadyLoaded(loaded.to_path_buf());
                    self.report(&error)?;
                    return Ok(Flow::Continue);
                }
                let Some(name) = self.ask("Enter CSV filename: ")? else {
                    return self.exit();
                };
                self.load_path(Path::new(name.trim()))?;
            }
            Command::Save => return self.save(),
            Command::Unload => match self.session.unload() {
                Ok(()) => writeln!(self.output, "In-memory database unloaded.")?,
                Err(SessionError::NoDataLoaded) => {
                    writeln!(self.output, "No file is currently loaded.")?
                }
                Err(e) => self.report(&e)?,
            },
            Command::Print => match self.session.print() {
                Ok(lines) => {
                    for line in lines {
                        writeln!(self.output, "{}", line)?;
                    }
                }
                Err(e) => self.report(&e)?,
            },
            Command::Help => writeln!(self.output, "Commands: {}", VERBS)?,
            Command::Exit => return self.exit(),
            Command::Unknown(verb) => {
                tracing::debug!("Unknown command: {:?}", verb);
                writeln!(self.output, "Unknown command. Try: {}.", VERBS)?;
            }
        }
        Ok(Flow::Continue)
    }

    fn save(&mut self) -> io::Result<Flow> {
        let Some(watched) = self.session.watched_file().map(Path::to_path_buf) else {
            writeln!(self.output, "No data to save.")?;
            return Ok(Flow::Continue);
        };

        let question = format!("Save to original file ({})? (Y/N): ", display_name(&watched));
        let Some(answer) = self.ask(&question)? else {
            return self.exit();
        };

        let result = if is_yes(&answer) {
            self.session.save(None)
        } else if is_no(&answer) {
            let Some(name) = self.ask("Enter new filename to save as: ")? else {
                return self.exit();
            };
            let name = name.trim();
            if name.is_empty() {
                writeln!(self.output, "Save cancelled: no filename given.")?;
                return Ok(Flow::Continue);
            }
            self.session.save(Some(Path::new(name)))
        } else {
            writeln!(self.output, "Invalid input. Save cancelled.")?;
            return Ok(Flow::Continue);
        };

        match result {
            Ok(path) => writeln!(self.output, "Data saved to {}", path.display())?,
            Err(e) => self.report(&e)?,
        }
        Ok(Flow::Continue)
    }

    fn exit(&mut self) -> io::Result<Flow> {
        self.session.exit();
        writeln!(self.output, "Goodbye!")?;
        self.output.flush()?;
        Ok(Flow::Exit)
    }

    fn report(&mut self, error: &SessionError) -> io::Result<()> {
        tracing::debug!("Command failed: {}", error);
        writeln!(self.output, "{}", error.user_message())
    }

    fn ask(&mut self, question: &str) -> io::Result<Option<String>> {
        prompt(&mut self.input, &mut self.output, question)
    }
}

/// Write `question`, then read one line. `None` at end of input.
fn prompt<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    question: &str,
) -> io::Result<Option<String>> {
    write!(output, "{}", question)?;
    output.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_verbs() {
        assert_eq!(Command::parse("load"), Command::Load);
        assert_eq!(Command::parse("  SAVE \n"), Command::Save);
        assert_eq!(Command::parse("Unload"), Command::Unload);
        assert_eq!(Command::parse("print"), Command::Print);
        assert_eq!(Command::parse("help"), Command::Help);
        assert_eq!(Command::parse("exit"), Command::Exit);
    }

    #[test]
    fn test_parse_unknown_verb() {
        assert_eq!(Command::parse("drop"), Command::Unknown("drop".to_string()));
        assert_eq!(Command::parse(""), Command::Unknown(String::new()));
    }

    #[test]
    fn test_yes_no_answers() {
        assert!(is_yes("y"));
        assert!(is_yes(" YES "));
        assert!(!is_yes("yeah"));
        assert!(is_no("N"));
        assert!(is_no("no"));
        assert!(!is_no(""));
    }

    #[test]
    fn test_prompt_strips_line_ending() {
        let mut input = "people.csv\r\n".as_bytes();
        let mut output = Vec::new();

        let answer = prompt(&mut input, &mut output, "? ").unwrap();

        assert_eq!(answer.as_deref(), Some("people.csv"));
        assert_eq!(output, b"? ");
    }

    #[test]
    fn test_prompt_end_of_input() {
        let mut input = "".as_bytes();
        let mut output = Vec::new();
        assert_eq!(prompt(&mut input, &mut output, "> ").unwrap(), None);
    }
}
