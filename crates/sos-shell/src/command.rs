//! Shell Command Parsing
//!
//! Type-safe command representation for shell input.

/// Memory reserved for a file when `create` is not given a size
pub const DEFAULT_FILE_SIZE: usize = 100;

/// Parsed shell command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Display help information
    Help,

    /// Create a file
    Create {
        name: String,
        content: String,
        memory_size: usize,
    },

    /// List files
    List,

    /// Print a file's content
    Read { name: String },

    /// Remove a file
    Remove { name: String },

    /// Rename a file
    Rename { old_name: String, new_name: String },

    /// Show memory status
    Memory,

    /// List kernel processes
    Ps,

    /// Advance the scheduler
    Tick { count: u32 },

    /// Shut down and leave the shell
    Exit,

    /// Unrecognized command (empty for a blank line)
    Unknown { cmd: String },
}

/// Error returned when parsing a command fails.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParseError {
    /// Command requires an argument that was not provided
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },

    /// Argument could not be parsed as expected type
    InvalidArgument {
        argument: &'static str,
        reason: &'static str,
    },

    /// More arguments than the command takes
    TooManyArguments { command: &'static str },

    /// A `"` was opened and never closed
    UnterminatedQuote,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::MissingArgument { command, argument } => {
                write!(f, "{}: missing argument <{}>", command, argument)
            }
            ParseError::InvalidArgument { argument, reason } => {
                write!(f, "invalid <{}>: {}", argument, reason)
            }
            ParseError::TooManyArguments { command } => {
                write!(f, "{}: too many arguments", command)
            }
            ParseError::UnterminatedQuote => write!(f, "unterminated quote"),
        }
    }
}

impl std::error::Error for ParseError {}

/// Split a line on whitespace; `"..."` groups words into one argument.
fn tokenize(line: &str) -> Result<Vec<String>, ParseError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quoted = false;

    for c in line.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                in_token = true;
            }
            c if c.is_whitespace() && !quoted => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            c => {
                current.push(c);
                in_token = true;
            }
        }
    }

    if quoted {
        return Err(ParseError::UnterminatedQuote);
    }
    if in_token {
        tokens.push(current);
    }
    Ok(tokens)
}

fn take_name(
    args: &[String],
    command: &'static str,
    argument: &'static str,
) -> Result<String, ParseError> {
    match args {
        [] => Err(ParseError::MissingArgument { command, argument }),
        [name] => Ok(name.clone()),
        _ => Err(ParseError::TooManyArguments { command }),
    }
}

fn no_args(args: &[String], command: &'static str, cmd: Command) -> Result<Command, ParseError> {
    if args.is_empty() {
        Ok(cmd)
    } else {
        Err(ParseError::TooManyArguments { command })
    }
}

impl Command {
    /// Parse a command line into a Command.
    ///
    /// ```ignore
    /// let cmd = Command::parse(r#"create notes.txt "buy milk" 64"#);
    /// assert_eq!(cmd, Ok(Command::Create {
    ///     name: "notes.txt".to_string(),
    ///     content: "buy milk".to_string(),
    ///     memory_size: 64,
    /// }));
    /// ```
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let parts = tokenize(line)?;
        let (cmd, args) = match parts.split_first() {
            Some((c, a)) => (c.as_str(), a),
            None => return Ok(Command::Unknown { cmd: String::new() }),
        };

        match cmd {
            "help" | "?" => no_args(args, "help", Command::Help),
            "list" | "ls" => no_args(args, "list", Command::List),
            "memory" | "mem" => no_args(args, "memory", Command::Memory),
            "ps" => no_args(args, "ps", Command::Ps),
            "exit" | "quit" => no_args(args, "exit", Command::Exit),

            "create" => {
                let (name, rest) = args.split_first().ok_or(ParseError::MissingArgument {
                    command: "create",
                    argument: "name",
                })?;
                let (content, memory_size) = match rest {
                    [] => (String::new(), DEFAULT_FILE_SIZE),
                    [content] => (content.clone(), DEFAULT_FILE_SIZE),
                    [content, size] => {
                        let size = size.parse::<usize>().map_err(|_| {
                            ParseError::InvalidArgument {
                                argument: "memory_size",
                                reason: "must be a number",
                            }
                        })?;
                        (content.clone(), size)
                    }
                    _ => return Err(ParseError::TooManyArguments { command: "create" }),
                };
                Ok(Command::Create {
                    name: name.clone(),
                    content,
                    memory_size,
                })
            }

            "read" | "cat" => Ok(Command::Read {
                name: take_name(args, "read", "name")?,
            }),

            "remove" | "rm" => Ok(Command::Remove {
                name: take_name(args, "remove", "name")?,
            }),

            "rename" | "mv" => match args {
                [old_name, new_name] => Ok(Command::Rename {
                    old_name: old_name.clone(),
                    new_name: new_name.clone(),
                }),
                [] => Err(ParseError::MissingArgument {
                    command: "rename",
                    argument: "old_name",
                }),
                [_] => Err(ParseError::MissingArgument {
                    command: "rename",
                    argument: "new_name",
                }),
                _ => Err(ParseError::TooManyArguments { command: "rename" }),
            },

            "tick" => match args {
                [] => Ok(Command::Tick { count: 1 }),
                [n] => n
                    .parse::<u32>()
                    .ok()
                    .filter(|&count| count > 0)
                    .map(|count| Command::Tick { count })
                    .ok_or(ParseError::InvalidArgument {
                        argument: "count",
                        reason: "must be a positive number",
                    }),
                _ => Err(ParseError::TooManyArguments { command: "tick" }),
            },

            _ => Ok(Command::Unknown {
                cmd: cmd.to_string(),
            }),
        }
    }

    /// Get a user-friendly usage message for this command.
    pub fn usage(&self) -> &'static str {
        match self {
            Command::Help => "help - Display available commands",
            Command::Create { .. } => {
                "create <name> [content] [memory_size] - Create a file (default size 100)"
            }
            Command::List => "list - List all files",
            Command::Read { .. } => "read <name> - Print file content",
            Command::Remove { .. } => "remove <name> - Remove a file and free its memory",
            Command::Rename { .. } => "rename <old_name> <new_name> - Rename a file",
            Command::Memory => "memory - Display memory status",
            Command::Ps => "ps - List kernel processes",
            Command::Tick { .. } => "tick [count] - Advance the scheduler",
            Command::Exit => "exit - Shut down and exit",
            Command::Unknown { .. } => "Unknown command",
        }
    }

    /// One instance of every command, in help order.
    pub fn all() -> [Command; 10] {
        [
            Command::Create {
                name: String::new(),
                content: String::new(),
                memory_size: DEFAULT_FILE_SIZE,
            },
            Command::List,
            Command::Read {
                name: String::new(),
            },
            Command::Remove {
                name: String::new(),
            },
            Command::Rename {
                old_name: String::new(),
                new_name: String::new(),
            },
            Command::Memory,
            Command::Ps,
            Command::Tick { count: 1 },
            Command::Help,
            Command::Exit,
        ]
    }

    /// Whether a successful run changes the directory
    pub fn mutates(&self) -> bool {
        matches!(
            self,
            Command::Create { .. } | Command::Remove { .. } | Command::Rename { .. }
        )
    }
}
