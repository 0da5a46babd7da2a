//! §4's "Top-level evaluator": parse a line into either a single command
//! or a pipeline, strip the trailing `&`, and hand off to the pipeline
//! builder.

use crate::job_control::Terminal;
use crate::jobs::JobTable;
use crate::parser::{self, Token};
use crate::pipeline::{self, RunOutcome};

pub struct Shell {
    pub table: JobTable,
    pub terminal: Terminal,
}

impl Shell {
    pub fn new() -> Self {
        Self { table: JobTable::new(), terminal: Terminal::open() }
    }

    /// Parse and run one input line.
    pub fn eval(&mut self, line: &str) -> Option<i32> {
        let tokens = parser::tokenize(line);
        if tokens.is_empty() {
            return None;
        }

        let (tokens, background) = parser::strip_background(&tokens);
        if tokens.is_empty() {
            return None;
        }

        if !is_well_formed(tokens) {
            eprintln!("jcsh: syntax error: '&' is only valid at the end of a line");
            return Some(1);
        }

        let stages = parser::split_on_pipes(tokens);
        match pipeline::run_single_or_pipeline(&stages, background, &mut self.table, &self.terminal) {
            RunOutcome::Finished(code) => Some(code),
            RunOutcome::Backgrounded => None,
        }
    }
}

impl Default for Shell {
    fn default() -> Self {
        Self::new()
    }
}

/// `&` is only legal as the final token; reject anything the parser
/// tolerates structurally but the evaluator should not (e.g. a stray `|`
/// with nothing after it is left to the redirection/pipeline builders to
/// fail naturally when they see an empty stage).
pub fn is_well_formed(tokens: &[Token]) -> bool {
    tokens
        .iter()
        .enumerate()
        .all(|(i, tok)| !matches!(tok, Token::Background) || i == tokens.len() - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn background_marker_only_valid_at_end() {
        let tokens = parser::tokenize("sleep 5 &");
        assert!(is_well_formed(&tokens));

        let tokens = parser::tokenize("sleep & 5");
        assert!(!is_well_formed(&tokens));
    }
}
