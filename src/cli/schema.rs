use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// Flags understood by the `test` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Flag {
    Target,
    UserAgent,
    Referer,
    Tests,
    HttpMethods,
    Files,
}

impl Flag {
    pub const ALL: [Flag; 6] = [
        Flag::Target,
        Flag::UserAgent,
        Flag::Referer,
        Flag::Tests,
        Flag::HttpMethods,
        Flag::Files,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Flag::Target => "--target",
            Flag::UserAgent => "--userAgent",
            Flag::Referer => "--referer",
            Flag::Tests => "--tests",
            Flag::HttpMethods => "--httpMethods",
            Flag::Files => "--files",
        }
    }

    pub fn from_token(token: &str) -> Option<Flag> {
        Flag::ALL.into_iter().find(|f| f.as_str() == token)
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentCount {
    Exactly(usize),
    Unbounded,
}

#[derive(Debug, Clone)]
pub struct FlagSpec {
    pub flag: Flag,
    /// Empty means free text.
    pub allowed_values: BTreeSet<&'static str>,
    pub default_value: &'static str,
    pub argument_required: bool,
    pub argument_count: ArgumentCount,
}

impl FlagSpec {
    fn new(flag: Flag, default_value: &'static str, argument_required: bool, argument_count: ArgumentCount) -> Self {
        Self {
            flag,
            allowed_values: BTreeSet::new(),
            default_value,
            argument_required,
            argument_count,
        }
    }

    fn allow(mut self, values: &[&'static str]) -> Self {
        self.allowed_values.extend(values.iter().copied());
        self
    }

    pub fn accepts(&self, value: &str) -> bool {
        self.allowed_values.is_empty() || self.allowed_values.contains(value)
    }
}

pub const DEFAULT_USER_AGENT: &str = "Scanner/1.0";

pub const TEST_IDS: [&str; 11] = [
    "https",
    "hsts",
    "csp",
    "xFrame",
    "refererPol",
    "xxss",
    "featurePol",
    "listing",
    "openRedirect",
    "fCookies",
    "fHttpOnly",
];

pub const HTTP_METHODS: [&str; 9] = ["GET", "POST", "PUT", "DELETE", "PATCH", "OPTIONS", "TRACE", "CONNECT", "HEAD"];

/// Grammar of the `test` command, built once at startup and handed to the parser.
#[derive(Debug, Clone)]
pub struct ParameterSchema {
    specs: HashMap<Flag, FlagSpec>,
}

impl ParameterSchema {
    pub fn standard() -> Self {
        let specs = [
            FlagSpec::new(Flag::Target, "", true, ArgumentCount::Exactly(1)),
            FlagSpec::new(Flag::UserAgent, DEFAULT_USER_AGENT, false, ArgumentCount::Exactly(1)),
            FlagSpec::new(Flag::Referer, "", false, ArgumentCount::Exactly(1)),
            FlagSpec::new(Flag::Tests, "", true, ArgumentCount::Unbounded).allow(&TEST_IDS),
            FlagSpec::new(Flag::HttpMethods, "", true, ArgumentCount::Unbounded).allow(&HTTP_METHODS),
            FlagSpec::new(Flag::Files, "", true, ArgumentCount::Unbounded),
        ];

        Self {
            specs: specs.into_iter().map(|s| (s.flag, s)).collect(),
        }
    }

    pub fn spec(&self, flag: Flag) -> Option<&FlagSpec> {
        self.specs.get(&flag)
    }

    pub fn lookup(&self, token: &str) -> Option<&FlagSpec> {
        Flag::from_token(token).and_then(|f| self.spec(f))
    }
}
