//! Yes/no prompts

use regex::Regex;
use std::sync::LazyLock;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt};

static YES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^ *y(?:es)?").unwrap());
static NO: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^ *no?").unwrap());

/// Answer used when a response is neither yes nor no
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultAnswer {
    Yes,
    No,
    /// Neither; an unrecognised response is neither yes nor no
    None,
}

/// An interpreted response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Answer {
    pub is_yes: bool,
    pub is_no: bool,
    /// The response was not recognised and the default was used
    pub is_default: bool,
}

/// Turns free-text responses into yes/no answers
#[derive(Debug, Clone, Copy)]
pub struct Confirmer {
    default: DefaultAnswer,
}

impl Confirmer {
    pub fn new(default: DefaultAnswer) -> Self {
        Self { default }
    }

    /// Confirmer that treats anything unrecognised as yes
    pub fn affirmer() -> Self {
        Self::new(DefaultAnswer::Yes)
    }

    /// Confirmer that treats anything unrecognised as no
    pub fn controverter() -> Self {
        Self::new(DefaultAnswer::No)
    }

    pub fn interpret(&self, response: &str) -> Answer {
        if YES.is_match(response) {
            return Answer {
                is_yes: true,
                is_no: false,
                is_default: false,
            };
        }
        if NO.is_match(response) {
            return Answer {
                is_yes: false,
                is_no: true,
                is_default: false,
            };
        }
        Answer {
            is_yes: self.default == DefaultAnswer::Yes,
            is_no: self.default == DefaultAnswer::No,
            is_default: true,
        }
    }

    /// Ask on stdout and read one line of response from `input`
    ///
    /// End of input counts as an empty response.
    pub async fn ask_from<R>(&self, question: &str, input: &mut R) -> std::io::Result<Answer>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut stdout = tokio::io::stdout();
        stdout.write_all(question.as_bytes()).await?;
        stdout.flush().await?;

        let mut response = String::new();
        input.read_line(&mut response).await?;
        Ok(self.interpret(response.trim_end_matches(['\r', '\n'])))
    }
}
