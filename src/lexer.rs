// ABOUTME: Tokenizes attribute/text strings and drives text evaluation (§4.1)

use crate::context::SharedContext;
use crate::error::{ContextError, XacroError};
use crate::scope::Scope;
use crate::value::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Literal text, including the `$$+{`/`$$+(` escape form with one
    /// leading `$` stripped (priority 1 in §4.1's table).
    Text(String),
    /// `${...}`, inner text only.
    Expr(String),
    /// `$(...)`, inner text only.
    Extension(String),
}

/// Tokenizes `input` per the four ordered rules in §4.1.
pub fn lex(input: &str) -> Result<Vec<Token>, ContextError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut literal = String::new();
    let mut i = 0;

    while i < chars.len() {
        if chars[i] != '$' {
            literal.push(chars[i]);
            i += 1;
            continue;
        }

        let run_start = i;
        let mut run_end = i;
        while run_end < chars.len() && chars[run_end] == '$' {
            run_end += 1;
        }
        let run_len = run_end - run_start;
        let next = chars.get(run_end).copied();

        if run_len >= 2 && matches!(next, Some('{') | Some('(')) {
            // Rule 1: $$+{ or $$+( -> literal text, one leading $ stripped.
            let bracket = next.unwrap();
            literal.push_str(&"$".repeat(run_len - 1));
            literal.push(bracket);
            i = run_end + 1;
            continue;
        }

        if run_len == 1 && next == Some('{') {
            match find_close(&chars, run_end + 1, '{', '}') {
                Some(end) => {
                    flush(&mut literal, &mut tokens);
                    let inner: String = chars[run_end + 1..end].iter().collect();
                    tokens.push(Token::Expr(inner));
                    i = end + 1;
                    continue;
                }
                None => {
                    return Err(ContextError::new(XacroError::EvaluationFailure(format!(
                        "unterminated ${{...}} starting at `{}`",
                        chars[run_start..].iter().collect::<String>()
                    ))));
                }
            }
        }

        if run_len == 1 && next == Some('(') {
            match find_close(&chars, run_end + 1, '(', ')') {
                Some(end) => {
                    flush(&mut literal, &mut tokens);
                    let inner: String = chars[run_end + 1..end].iter().collect();
                    tokens.push(Token::Extension(inner));
                    i = end + 1;
                    continue;
                }
                None => {
                    return Err(ContextError::new(XacroError::ExtensionFailure(format!(
                        "unterminated $(...) starting at `{}`",
                        chars[run_start..].iter().collect::<String>()
                    ))));
                }
            }
        }

        // Rule 4: a $ run that didn't match rules 1-3 (not followed by `{`/`(`,
        // or a trailing lone `$`) is plain text.
        literal.push_str(&"$".repeat(run_len));
        i = run_end;
    }

    flush(&mut literal, &mut tokens);
    Ok(tokens)
}

fn flush(literal: &mut String, tokens: &mut Vec<Token>) {
    if !literal.is_empty() {
        tokens.push(Token::Text(std::mem::take(literal)));
    }
}

/// Finds the position of the first `close` char at or after `start`
/// (shortest-match, no-nesting rule from §4.1 — `open` is unused for
/// matching, nested `open` chars do not extend the search).
fn find_close(chars: &[char], start: usize, _open: char, close: char) -> Option<usize> {
    (start..chars.len()).find(|&i| chars[i] == close)
}

/// Drives the lexer over `input` and composes the result per §4.1: a single
/// token returns its typed value unchanged, multiple tokens are stringified
/// and concatenated.
pub fn evaluate_text(input: &str, scope: &Scope) -> Result<Value, ContextError> {
    let tokens = lex(input)?;
    match tokens.len() {
        0 => Ok(Value::Text(String::new())),
        1 => evaluate_token(&tokens[0], scope),
        _ => {
            let mut out = String::new();
            for token in &tokens {
                out.push_str(&evaluate_token(token, scope)?.stringify());
            }
            Ok(Value::Text(out))
        }
    }
}

fn evaluate_token(token: &Token, scope: &Scope) -> Result<Value, ContextError> {
    match token {
        Token::Text(s) => Ok(Value::Text(s.clone())),
        Token::Expr(inner) => crate::expr::evaluate(inner, scope)
            .map_err(|e| e.with_suffix(format!("${{{inner}}}"))),
        Token::Extension(inner) => evaluate_extension(inner, scope),
    }
}

fn evaluate_extension(inner: &str, scope: &Scope) -> Result<Value, ContextError> {
    let ctx: SharedContext = scope.context().clone();
    if ctx.borrow().launch_mode {
        return Ok(Value::Text(format!("$({inner})")));
    }

    // "$(arg foo)" with an inner "${...}" must be resolved first.
    let resolved = evaluate_text(inner, scope)?.stringify();
    let mut parts = resolved.splitn(2, char::is_whitespace);
    let command = parts.next().unwrap_or("").trim();
    let rest = parts.next().unwrap_or("").trim();

    match command {
        "cwd" => std::env::current_dir()
            .map(|p| Value::Text(p.display().to_string()))
            .map_err(|e| ContextError::new(XacroError::ExtensionFailure(e.to_string()))),
        "find" => ctx
            .borrow()
            .find_package(rest)
            .map(|p| Value::Text(p.display().to_string()))
            .ok_or_else(|| {
                ContextError::new(XacroError::ExtensionFailure(format!(
                    "package not found: {rest}"
                )))
            }),
        "arg" => ctx.borrow().subst_args.get(rest).cloned().map(Value::Text).ok_or_else(|| {
            ContextError::new(XacroError::ExtensionFailure(format!(
                "substitution arg `{rest}` is not set"
            )))
        }),
        "eval" => crate::expr::evaluate(rest, scope),
        "anon" => Ok(Value::Text(ctx.borrow_mut().anon(rest))),
        "env" => std::env::var(rest)
            .map(Value::Text)
            .map_err(|_| ContextError::new(XacroError::ExtensionFailure(format!(
                "environment variable `{rest}` is not set"
            )))),
        "optenv" => {
            let mut it = rest.splitn(2, char::is_whitespace);
            let var = it.next().unwrap_or("");
            let default = it.next().unwrap_or("").trim();
            Ok(Value::Text(std::env::var(var).unwrap_or_else(|_| default.to_string())))
        }
        other => Err(ContextError::new(XacroError::ExtensionFailure(format!(
            "unknown substitution `{other}`"
        )))),
    }
}
