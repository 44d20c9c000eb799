use std::fmt::{self, Display};

#[derive(Debug, Clone, PartialEq)]
pub enum Mismatch {
    Method {
        expected: String,
        actual: String,
    },
    Path {
        expected: String,
        actual: String,
    },
    Query {
        expected: Option<String>,
        actual: Option<String>,
    },
    Header {
        name: String,
        expected: String,
        actual: Option<String>,
    },
    Status {
        expected: u16,
        actual: u16,
    },
    Body {
        path: String,
        message: String,
    },
    MissingRequest {
        description: String,
    },
    UnexpectedRequest {
        method: String,
        uri: String,
    },
    Transport {
        message: String,
    },
}

impl Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mismatch::Method { expected, actual } => {
                write!(f, "method differs. expected {}, got {}", expected, actual)
            }
            Mismatch::Path { expected, actual } => {
                write!(f, "path differs. expected {}, got {}", expected, actual)
            }
            Mismatch::Query { expected, actual } => write!(
                f,
                "query differs. expected \"{}\", got \"{}\"",
                expected.as_deref().unwrap_or_default(),
                actual.as_deref().unwrap_or_default()
            ),
            Mismatch::Header {
                name,
                expected,
                actual,
            } => {
                let actual = match actual {
                    Some(value) => format!("\"{}\"", value),
                    None => "<no header value>".into(),
                };

                write!(
                    f,
                    "header \"{}\" differs. expected \"{}\", got {}",
                    name, expected, actual
                )
            }
            Mismatch::Status { expected, actual } => {
                write!(f, "status differs. expected {}, got {}", expected, actual)
            }
            Mismatch::Body { path, message } => write!(f, "body mismatch at {}: {}", path, message),
            Mismatch::MissingRequest { description } => {
                write!(f, "expected request was never received: {}", description)
            }
            Mismatch::UnexpectedRequest { method, uri } => {
                write!(f, "received an unexpected request: {} {}", method, uri)
            }
            Mismatch::Transport { message } => write!(f, "request failed: {}", message),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InteractionResult {
    pub description: String,
    pub provider_state: Option<String>,
    pub mismatches: Vec<Mismatch>,
}

impl InteractionResult {
    pub fn is_success(&self) -> bool {
        self.mismatches.is_empty()
    }
}

/// Outcome of checking a set of interactions, either on the mock server side or against a real
/// provider. Its `Display` form is the diagnostic printed when verification fails.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MismatchReport {
    pub interactions: Vec<InteractionResult>,
    pub unexpected: Vec<Mismatch>,
}

impl MismatchReport {
    pub fn is_success(&self) -> bool {
        self.unexpected.is_empty() && self.interactions.iter().all(InteractionResult::is_success)
    }

    pub fn mismatches(&self) -> impl Iterator<Item = &Mismatch> {
        self.interactions
            .iter()
            .flat_map(|result| result.mismatches.iter())
            .chain(self.unexpected.iter())
    }
}

impl Display for MismatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for result in &self.interactions {
            let outcome = if result.is_success() { "OK" } else { "FAILED" };
            match &result.provider_state {
                Some(state) => writeln!(
                    f,
                    "  Given {}, upon receiving {} ... {}",
                    state, result.description, outcome
                )?,
                None => writeln!(f, "  Upon receiving {} ... {}", result.description, outcome)?,
            }

            for mismatch in &result.mismatches {
                writeln!(f, "    - {}", mismatch)?;
            }
        }

        for mismatch in &self.unexpected {
            writeln!(f, "  - {}", mismatch)?;
        }

        Ok(())
    }
}
