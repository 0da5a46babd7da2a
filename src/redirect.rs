//! §4.5 Redirection builder: consumes `<`/`>` markers and their filenames
//! out of a stage's token sequence, opening the named files and leaving
//! only the remaining words behind.

use std::os::unix::io::RawFd;

use crate::parser::Token;

/// Result of resolving one stage's redirections: the words that remain
/// once every `<`/`>` pair has been consumed, plus whichever descriptors
/// were opened.
pub struct Resolved {
    pub words: Vec<String>,
    pub input_fd: Option<RawFd>,
    pub output_fd: Option<RawFd>,
}

/// Consume every `(<, filename)`/`(>, filename)` pair from `tokens`. Later
/// redirection of the same kind closes and replaces the earlier one, per
/// §4.5 and the "multiple `>`" boundary behaviour in §8 — only the last
/// file of each kind stays open.
///
/// A marker with no following filename is undefined behaviour per spec;
/// the tokenizer only ever hands this function well-formed input produced
/// by the evaluator, so that case aborts rather than silently misbehaving.
pub fn resolve(tokens: &[Token]) -> std::io::Result<Resolved> {
    let mut words = Vec::new();
    let mut input_fd: Option<RawFd> = None;
    let mut output_fd: Option<RawFd> = None;

    let mut iter = tokens.iter();
    while let Some(tok) = iter.next() {
        match tok {
            Token::Word(w) => words.push(w.clone()),
            Token::RedirIn => {
                let Some(Token::Word(path)) = iter.next() else {
                    panic!("redirection marker with no following filename");
                };
                if let Some(old) = input_fd.take() {
                    unsafe { libc::close(old) };
                }
                input_fd = Some(open_for_read(path)?);
            }
            Token::RedirOut => {
                let Some(Token::Word(path)) = iter.next() else {
                    panic!("redirection marker with no following filename");
                };
                if let Some(old) = output_fd.take() {
                    unsafe { libc::close(old) };
                }
                output_fd = Some(open_for_write(path)?);
            }
            Token::Pipe | Token::Background => {
                unreachable!("stage tokens must not contain pipe or background markers")
            }
        }
    }

    Ok(Resolved { words, input_fd, output_fd })
}

fn open_for_read(path: &str) -> std::io::Result<RawFd> {
    open_raw(path, libc::O_RDONLY, 0)
}

fn open_for_write(path: &str) -> std::io::Result<RawFd> {
    // Owner read/write, group read, other read (0644).
    open_raw(path, libc::O_WRONLY | libc::O_CREAT | libc::O_TRUNC, 0o644)
}

fn open_raw(path: &str, flags: libc::c_int, mode: libc::mode_t) -> std::io::Result<RawFd> {
    let c_path = std::ffi::CString::new(path)
        .map_err(|_| std::io::Error::new(std::io::ErrorKind::InvalidInput, "nul byte in path"))?;
    let fd = unsafe { libc::open(c_path.as_ptr(), flags, mode as libc::c_int) };
    if fd < 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(fd)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::tokenize;

    #[test]
    fn plain_words_pass_through_untouched() {
        let tokens = tokenize("echo hello world");
        let resolved = resolve(&tokens).unwrap();
        assert_eq!(resolved.words, vec!["echo", "hello", "world"]);
        assert!(resolved.input_fd.is_none());
        assert!(resolved.output_fd.is_none());
    }

    #[test]
    fn redirections_are_stripped_from_the_word_list() {
        let dir = std::env::temp_dir();
        let out_path = dir.join("jcsh_redirect_test_out.txt");
        let in_path = dir.join("jcsh_redirect_test_in.txt");
        std::fs::write(&in_path, b"hi\n").unwrap();

        let line = format!("cat < {} > {}", in_path.display(), out_path.display());
        let tokens = tokenize(&line);
        let resolved = resolve(&tokens).unwrap();

        assert_eq!(resolved.words, vec!["cat"]);
        assert!(resolved.input_fd.is_some());
        assert!(resolved.output_fd.is_some());

        unsafe {
            libc::close(resolved.input_fd.unwrap());
            libc::close(resolved.output_fd.unwrap());
        }
        let _ = std::fs::remove_file(&in_path);
        let _ = std::fs::remove_file(&out_path);
    }

    #[test]
    fn later_output_redirection_replaces_earlier_one() {
        let dir = std::env::temp_dir();
        let first = dir.join("jcsh_redirect_test_first.txt");
        let second = dir.join("jcsh_redirect_test_second.txt");

        let line = format!("echo hi > {} > {}", first.display(), second.display());
        let tokens = tokenize(&line);
        let resolved = resolve(&tokens).unwrap();

        assert_eq!(resolved.words, vec!["echo", "hi"]);
        assert!(resolved.output_fd.is_some());
        unsafe { libc::close(resolved.output_fd.unwrap()) };

        assert!(first.exists());
        assert!(second.exists());
        let _ = std::fs::remove_file(&first);
        let _ = std::fs::remove_file(&second);
    }
}
