// Line commands read from stdin
// One command per line: a verb followed by its arguments

use crate::journal::Mood;
use crate::journal::mood::UnknownMood;
use thiserror::Error;

pub const HELP: &str = "\
commands:
  record | pause | resume | finish | cancel
  play <entry> | stop
  list | topics
  mood <mood> | topic <name> | clear moods | clear topics
  new-topic [--auto] <name> | auto <topic> | delete-topic <topic>
  default-mood <mood>
  title <entry> <text> | describe <entry> <text>
  set-mood <entry> <mood> | tag <entry> [topic, topic...]
  delete <entry>
  help | quit
<entry> is any unique prefix of an entry id";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Record,
    Pause,
    Resume,
    Finish,
    Cancel,
    Play(String),
    Stop,
    List,
    Topics,
    FilterMood(Mood),
    FilterTopic(String),
    ClearMoods,
    ClearTopics,
    NewTopic { name: String, auto_apply: bool },
    AutoApply(String),
    DeleteTopic(String),
    DefaultMood(Mood),
    Title { entry: String, title: String },
    Describe { entry: String, description: String },
    SetMood { entry: String, mood: Mood },
    /// Replaces the entry's topics with the named ones
    Tag { entry: String, topics: Vec<String> },
    Delete(String),
    Help,
    Quit,
}

#[derive(Error, Debug, PartialEq)]
pub enum CommandError {
    #[error("Empty command")]
    Empty,

    #[error("Unknown command: {0} (try `help`)")]
    Unknown(String),

    #[error("`{command}` needs {argument}")]
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },

    #[error(transparent)]
    Mood(#[from] UnknownMood),
}

/// Parse one input line
pub fn parse(line: &str) -> Result<Command, CommandError> {
    let line = line.trim();
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    let command = match verb.to_ascii_lowercase().as_str() {
        "" => return Err(CommandError::Empty),
        "record" | "r" => Command::Record,
        "pause" => Command::Pause,
        "resume" => Command::Resume,
        "finish" | "done" => Command::Finish,
        "cancel" => Command::Cancel,
        "play" | "p" => Command::Play(required(rest, "play", "an entry")?.to_string()),
        "stop" => Command::Stop,
        "list" | "ls" => Command::List,
        "topics" => Command::Topics,
        "mood" => Command::FilterMood(required(rest, "mood", "a mood")?.parse()?),
        "topic" => Command::FilterTopic(required(rest, "topic", "a topic name")?.to_string()),
        "clear" => match rest {
            "moods" => Command::ClearMoods,
            "topics" => Command::ClearTopics,
            _ => {
                return Err(CommandError::MissingArgument {
                    command: "clear",
                    argument: "`moods` or `topics`",
                });
            }
        },
        "new-topic" => {
            let (name, auto_apply) = match rest.strip_prefix("--auto") {
                Some(name) => (name.trim(), true),
                None => (rest, false),
            };
            Command::NewTopic {
                name: required(name, "new-topic", "a topic name")?.to_string(),
                auto_apply,
            }
        }
        "auto" => Command::AutoApply(required(rest, "auto", "a topic name")?.to_string()),
        "delete-topic" => {
            Command::DeleteTopic(required(rest, "delete-topic", "a topic name")?.to_string())
        }
        "default-mood" => Command::DefaultMood(required(rest, "default-mood", "a mood")?.parse()?),
        "title" => {
            let (entry, title) = entry_and_text(rest, "title")?;
            Command::Title { entry, title }
        }
        "describe" => {
            let (entry, description) = entry_and_text(rest, "describe")?;
            Command::Describe { entry, description }
        }
        "set-mood" => {
            let (entry, mood) = entry_and_text(rest, "set-mood")?;
            Command::SetMood {
                entry,
                mood: required(&mood, "set-mood", "a mood")?.parse()?,
            }
        }
        "tag" => {
            let (entry, topics) = entry_and_text(rest, "tag")?;
            Command::Tag {
                entry,
                topics: topics
                    .split(',')
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(String::from)
                    .collect(),
            }
        }
        "delete" | "rm" => Command::Delete(required(rest, "delete", "an entry")?.to_string()),
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => return Err(CommandError::Unknown(other.to_string())),
    };

    Ok(command)
}

fn required<'a>(
    arg: &'a str,
    command: &'static str,
    argument: &'static str,
) -> Result<&'a str, CommandError> {
    if arg.is_empty() {
        Err(CommandError::MissingArgument { command, argument })
    } else {
        Ok(arg)
    }
}

/// Split `<entry> <text...>`; the text may be empty
fn entry_and_text(rest: &str, command: &'static str) -> Result<(String, String), CommandError> {
    let rest = required(rest, command, "an entry")?;
    Ok(match rest.split_once(char::is_whitespace) {
        Some((entry, text)) => (entry.to_string(), text.trim().to_string()),
        None => (rest.to_string(), String::new()),
    })
}
