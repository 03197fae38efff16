//! Line protocol: command parsing and reply encoding
//!
//! Requests are single newline-terminated lines of the form
//! `CMD arg1 arg2 …`. The command token is case-insensitive; arguments are
//! whitespace-separated. For commands that take a free-form value (SET,
//! PUBLISH) everything from the value position onward is rejoined with
//! single spaces, so runs of embedded whitespace are normalised and no
//! quoting is supported.

use std::fmt;

/// A parsed client command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
  Ping,
  Set { key: String, value: String },
  Get { key: String },
  Del { key: String },
  Subscribe { channel: String },
  Unsubscribe { channel: String },
  Publish { channel: String, message: String },
  Save,
  ReplicaOf { host: String, port: u16 },
  ReplConf,
  Info,
  Quit,
}

impl Command {
  /// Parse a trimmed, non-empty request line.
  pub fn parse(line: &str) -> Result<Command, CommandError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let Some(first) = tokens.first() else {
      return Err(CommandError::Unknown(String::new()));
    };
    let cmd = first.to_uppercase();

    match cmd.as_str() {
      "PING" => Ok(Command::Ping),
      "SET" => {
        if tokens.len() < 3 {
          return Err(CommandError::WrongArity("set"));
        }
        Ok(Command::Set {
          key: tokens[1].to_string(),
          value: tokens[2..].join(" "),
        })
      }
      "GET" => {
        if tokens.len() < 2 {
          return Err(CommandError::WrongArity("get"));
        }
        Ok(Command::Get {
          key: tokens[1].to_string(),
        })
      }
      "DEL" => {
        if tokens.len() < 2 {
          return Err(CommandError::WrongArity("del"));
        }
        Ok(Command::Del {
          key: tokens[1].to_string(),
        })
      }
      "SUBSCRIBE" => {
        if tokens.len() < 2 {
          return Err(CommandError::WrongArity("subscribe"));
        }
        Ok(Command::Subscribe {
          channel: tokens[1].to_string(),
        })
      }
      "UNSUBSCRIBE" => {
        if tokens.len() < 2 {
          return Err(CommandError::WrongArity("unsubscribe"));
        }
        Ok(Command::Unsubscribe {
          channel: tokens[1].to_string(),
        })
      }
      "PUBLISH" => {
        if tokens.len() < 3 {
          return Err(CommandError::WrongArity("publish"));
        }
        Ok(Command::Publish {
          channel: tokens[1].to_string(),
          message: tokens[2..].join(" "),
        })
      }
      "SAVE" => Ok(Command::Save),
      "REPLICAOF" => {
        if tokens.len() < 3 {
          return Err(CommandError::WrongArity("replicaof"));
        }
        let port = tokens[2].parse().map_err(|_| CommandError::InvalidPort)?;
        Ok(Command::ReplicaOf {
          host: tokens[1].to_string(),
          port,
        })
      }
      "REPLCONF" => Ok(Command::ReplConf),
      "INFO" => Ok(Command::Info),
      "QUIT" => Ok(Command::Quit),
      _ => Err(CommandError::Unknown(cmd)),
    }
  }
}

/// Client-visible parse failure. `Display` renders the message carried in
/// the `(error) …` response line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
  /// Too few arguments; carries the lower-case command name.
  WrongArity(&'static str),
  /// REPLICAOF port argument is not a valid port number.
  InvalidPort,
  /// Unrecognised command; carries the case-folded token.
  Unknown(String),
}

impl fmt::Display for CommandError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      CommandError::WrongArity(cmd) => {
        write!(f, "ERR wrong number of arguments for '{}' command", cmd)
      }
      CommandError::InvalidPort => write!(f, "ERR invalid port"),
      CommandError::Unknown(cmd) => write!(f, "ERR unknown command '{}'", cmd),
    }
  }
}

impl std::error::Error for CommandError {}

/// A server response, encoded as one or more newline-terminated lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
  Pong,
  Ok,
  Nil,
  Integer(i64),
  /// Raw value line (GET hit).
  Value(String),
  Subscribed(String),
  Unsubscribed(String),
  /// Pushed pub/sub delivery: `MESSAGE <channel> <payload>`.
  Message { channel: String, payload: String },
  Info { role: String, replicas: usize },
  Error(String),
}

impl Reply {
  /// Encode to wire form, trailing newline included.
  pub fn encode(&self) -> String {
    match self {
      Reply::Pong => "PONG\n".to_string(),
      Reply::Ok => "OK\n".to_string(),
      Reply::Nil => "(nil)\n".to_string(),
      Reply::Integer(n) => format!("(integer) {}\n", n),
      Reply::Value(v) => format!("{}\n", v),
      Reply::Subscribed(channel) => format!("SUBSCRIBED {}\n", channel),
      Reply::Unsubscribed(channel) => format!("UNSUBSCRIBED {}\n", channel),
      Reply::Message { channel, payload } => format!("MESSAGE {} {}\n", channel, payload),
      Reply::Info { role, replicas } => format!("role:{}\nreplicas:{}\n", role, replicas),
      Reply::Error(msg) => format!("(error) {}\n", msg),
    }
  }
}
