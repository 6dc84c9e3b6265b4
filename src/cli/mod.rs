pub mod parser;
pub mod schema;

pub use parser::CommandParser;
pub use schema::{ArgumentCount, Flag, FlagSpec, ParameterSchema, DEFAULT_USER_AGENT};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Test,
}

impl Verb {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Test => "test",
        }
    }
}

/// A flag and the arguments collected for it, in argv order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandParameter {
    flag: Flag,
    arguments: Vec<String>,
}

impl CommandParameter {
    pub(crate) fn new(flag: Flag, arguments: Vec<String>) -> Self {
        Self { flag, arguments }
    }

    pub fn flag(&self) -> Flag {
        self.flag
    }

    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }
}

/// Parser output: the verb plus every parameter record in the order given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedInvocation {
    verb: Verb,
    parameters: Vec<CommandParameter>,
}

impl ParsedInvocation {
    pub(crate) fn new(verb: Verb, parameters: Vec<CommandParameter>) -> Self {
        Self { verb, parameters }
    }

    pub fn verb(&self) -> Verb {
        self.verb
    }

    pub fn parameters(&self) -> &[CommandParameter] {
        &self.parameters
    }

    /// First record for `flag`; later repeats are ignored.
    pub fn first(&self, flag: Flag) -> Option<&CommandParameter> {
        self.parameters.iter().find(|p| p.flag == flag)
    }

    pub fn value(&self, flag: Flag) -> Option<&str> {
        self.first(flag).and_then(|p| p.arguments.first()).map(String::as_str)
    }

    pub fn values(&self, flag: Flag) -> Option<&[String]> {
        self.first(flag).map(|p| p.arguments())
    }
}
