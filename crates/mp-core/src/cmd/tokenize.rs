//! Split a command line into an argv without involving a shell.
//!
//! The grammar is deliberately tiny:
//!
//! - tokens are separated by runs of space, tab, CR or LF;
//! - a token that begins with `'` extends to the next `'` and may contain
//!   whitespace; the quotes are removed;
//! - nothing else is special (`$`, `*`, `|`, `\` are literal).
//!
//! Strings the grammar cannot represent unambiguously are refused rather
//! than split in a surprising way.

use thiserror::Error;

const WHITESPACE: [char; 4] = [' ', '\t', '\r', '\n'];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenizeError {
    #[error("double quotes are not supported: {0}")]
    DoubleQuote(String),

    #[error("ambiguous single quote in: {0}")]
    AmbiguousQuote(String),

    #[error("unbalanced single quote in: {0}")]
    UnbalancedQuote(String),

    #[error("empty command line")]
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lex {
    /// Between tokens.
    Gap,
    /// Inside an unquoted token.
    Word,
    /// Inside a `'...'` token.
    Quoted,
    /// Just closed a quoted token.
    AfterQuote,
}

/// Tokenize `line` into argv.
pub fn tokenize(line: &str) -> Result<Vec<String>, TokenizeError> {
    if line.contains('"') {
        return Err(TokenizeError::DoubleQuote(line.to_string()));
    }
    if line.contains(" ' ") || line.contains("'''") {
        return Err(TokenizeError::AmbiguousQuote(line.to_string()));
    }

    let mut argv = Vec::new();
    let mut current = String::new();
    let mut state = Lex::Gap;

    for c in line.chars() {
        state = match (state, c) {
            (Lex::Gap | Lex::AfterQuote, c) if WHITESPACE.contains(&c) => Lex::Gap,
            (Lex::Gap | Lex::AfterQuote, '\'') => Lex::Quoted,
            (Lex::Gap | Lex::AfterQuote, c) => {
                current.push(c);
                Lex::Word
            }
            (Lex::Word, c) if WHITESPACE.contains(&c) => {
                argv.push(std::mem::take(&mut current));
                Lex::Gap
            }
            (Lex::Word, c) => {
                current.push(c);
                Lex::Word
            }
            (Lex::Quoted, '\'') => {
                argv.push(std::mem::take(&mut current));
                Lex::AfterQuote
            }
            (Lex::Quoted, c) => {
                current.push(c);
                Lex::Quoted
            }
        };
    }

    match state {
        Lex::Quoted => return Err(TokenizeError::UnbalancedQuote(line.to_string())),
        Lex::Word => argv.push(current),
        Lex::Gap | Lex::AfterQuote => {}
    }

    if argv.is_empty() {
        return Err(TokenizeError::Empty);
    }
    Ok(argv)
}
