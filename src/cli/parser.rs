use std::collections::HashSet;

use super::schema::{ArgumentCount, FlagSpec, ParameterSchema};
use super::{CommandParameter, ParsedInvocation, Verb};
use crate::error::ParseError;

pub const FLAG_PREFIX: &str = "--";

#[derive(Debug, Clone, Copy)]
enum Token<'a, 's> {
    Flag(&'s FlagSpec),
    UnknownFlag(&'a str),
    Value(&'a str),
}

enum State<'s> {
    Idle,
    Collecting { spec: &'s FlagSpec, buffer: Vec<String> },
}

/// Hand-rolled grammar for `<program> test [flags]`.
///
/// Pass one classifies every token after the verb against the schema; pass
/// two walks the classified tokens with an Idle/Collecting state machine.
pub struct CommandParser<'s> {
    schema: &'s ParameterSchema,
}

impl<'s> CommandParser<'s> {
    pub fn new(schema: &'s ParameterSchema) -> Self {
        Self { schema }
    }

    pub fn parse<S: AsRef<str>>(&self, argv: &[S]) -> Result<ParsedInvocation, ParseError> {
        if argv.len() < 2 {
            return Err(ParseError::TooFewTokens(argv.len()));
        }
        let verb = argv[1].as_ref();
        if verb != Verb::Test.as_str() {
            return Err(ParseError::MissingVerb(verb.to_string()));
        }

        let tokens: Vec<Token<'_, 's>> = argv[2..].iter().map(|t| self.classify(t.as_ref())).collect();
        let parameters = self.walk(&tokens)?;

        tracing::debug!(count = parameters.len(), "parsed command parameters");
        Ok(ParsedInvocation::new(Verb::Test, parameters))
    }

    fn classify<'a>(&self, token: &'a str) -> Token<'a, 's> {
        match self.schema.lookup(token) {
            Some(spec) => Token::Flag(spec),
            None if token.starts_with(FLAG_PREFIX) => Token::UnknownFlag(token),
            None => Token::Value(token),
        }
    }

    fn walk(&self, tokens: &[Token<'_, 's>]) -> Result<Vec<CommandParameter>, ParseError> {
        let mut out = Vec::new();
        let mut state = State::Idle;
        let mut i = 0;

        while i < tokens.len() {
            let token = tokens[i];
            state = match state {
                State::Collecting { spec, buffer } => match token {
                    Token::Value(value) => {
                        if !spec.accepts(value) {
                            return Err(invalid_value(spec, value));
                        }
                        let mut buffer = buffer;
                        buffer.push(value.to_string());
                        i += 1;
                        State::Collecting { spec, buffer }
                    }
                    // A flag closes the collection; the token is re-read in Idle.
                    Token::Flag(_) | Token::UnknownFlag(_) => {
                        out.push(close(spec, buffer)?);
                        State::Idle
                    }
                },
                State::Idle => match token {
                    Token::Value(value) => return Err(ParseError::UnexpectedArgument(value.to_string())),
                    Token::UnknownFlag(flag) => return Err(ParseError::UnexpectedArgument(flag.to_string())),
                    Token::Flag(spec) if spec.argument_required => {
                        i += 1;
                        State::Collecting { spec, buffer: Vec::new() }
                    }
                    Token::Flag(spec) => {
                        let argument = match tokens.get(i + 1) {
                            Some(Token::Value(value)) => {
                                if !spec.accepts(value) {
                                    return Err(invalid_value(spec, value));
                                }
                                i += 1;
                                value.to_string()
                            }
                            Some(_) | None => spec.default_value.to_string(),
                        };
                        i += 1;
                        out.push(CommandParameter::new(spec.flag, vec![argument]));
                        State::Idle
                    }
                },
            };
        }

        if let State::Collecting { spec, buffer } = state {
            out.push(close(spec, buffer)?);
        }

        Ok(out)
    }
}

fn invalid_value(spec: &FlagSpec, value: &str) -> ParseError {
    ParseError::InvalidValue {
        flag: spec.flag.to_string(),
        value: value.to_string(),
    }
}

fn close(spec: &FlagSpec, buffer: Vec<String>) -> Result<CommandParameter, ParseError> {
    if buffer.is_empty() {
        return Err(ParseError::MissingArguments(spec.flag.to_string()));
    }

    let mut seen = HashSet::new();
    if let Some(dup) = buffer.iter().find(|v| !seen.insert(v.as_str())) {
        return Err(ParseError::DuplicateArgument {
            flag: spec.flag.to_string(),
            value: dup.clone(),
        });
    }

    if let ArgumentCount::Exactly(expected) = spec.argument_count {
        if buffer.len() > expected {
            return Err(ParseError::TooManyArguments {
                flag: spec.flag.to_string(),
                expected,
                got: buffer.len(),
            });
        }
        if buffer.len() < expected {
            return Err(ParseError::MissingArguments(spec.flag.to_string()));
        }
    }

    Ok(CommandParameter::new(spec.flag, buffer))
}
