//! Splits a raw input line into the token stream the redirection and
//! pipeline builders consume: words plus the distinguished markers `|`,
//! `<`, `>`, and `&`. No quoting, escaping, globbing, or variable expansion
//! — all explicitly out of scope.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Word(String),
    Pipe,
    RedirIn,
    RedirOut,
    Background,
}

impl Token {
    /// The `string_p` predicate from the token-stream interface: true for
    /// words, false for markers.
    pub fn is_word(&self) -> bool {
        matches!(self, Token::Word(_))
    }
}

/// Tokenize a line on whitespace, recognizing `|`, `<`, `>`, and `&` as
/// standalone markers wherever they appear adjacent to whitespace or other
/// markers (e.g. `a>b` splits into `Word(a)`, `RedirOut`, `Word(b)`).
pub fn tokenize(input: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut chars = input.chars().peekable();

    let flush = |current: &mut String, tokens: &mut Vec<Token>| {
        if !current.is_empty() {
            tokens.push(Token::Word(std::mem::take(current)));
        }
    };

    while let Some(ch) = chars.next() {
        match ch {
            ' ' | '\t' => flush(&mut current, &mut tokens),
            '|' => {
                flush(&mut current, &mut tokens);
                tokens.push(Token::Pipe);
            }
            '<' => {
                flush(&mut current, &mut tokens);
                tokens.push(Token::RedirIn);
            }
            '>' => {
                flush(&mut current, &mut tokens);
                tokens.push(Token::RedirOut);
            }
            '&' => {
                flush(&mut current, &mut tokens);
                tokens.push(Token::Background);
            }
            c => current.push(c),
        }
    }
    flush(&mut current, &mut tokens);

    tokens
}

/// Split a token stream on `Pipe`, returning one slice of tokens per
/// pipeline stage. A trailing `Background` marker, if present, is not part
/// of any stage — callers extract it first via [`strip_background`].
pub fn split_on_pipes(tokens: &[Token]) -> Vec<&[Token]> {
    let mut stages = Vec::new();
    let mut start = 0;
    for (i, tok) in tokens.iter().enumerate() {
        if *tok == Token::Pipe {
            stages.push(&tokens[start..i]);
            start = i + 1;
        }
    }
    stages.push(&tokens[start..]);
    stages
}

/// `&` is legal only as the final non-null token. Returns the remaining
/// tokens and whether a trailing background marker was present.
pub fn strip_background(tokens: &[Token]) -> (&[Token], bool) {
    match tokens.last() {
        Some(Token::Background) => (&tokens[..tokens.len() - 1], true),
        _ => (tokens, false),
    }
}
