// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-VibeCraft-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of VibeCraft and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Lexer for the build-script language: indentation-significant lines,
//! Python-shaped literals, and f-strings split into literal and expression
//! parts. Denied keywords are rejected here with targeted diagnostics so the
//! caller sees *why* a construct is unavailable rather than a generic parse
//! failure.

use super::SandboxError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Ident(String),
    Int(i64),
    Float(f64),
    Str(String),
    FStr(Vec<FStrPart>),
    Keyword(Keyword),
    Op(Op),
    Newline,
    Indent,
    Dedent,
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FStrPart {
    Literal(String),
    /// Expression source plus an optional `:spec` suffix, parsed later.
    Expression {
        source: String,
        spec: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    For,
    In,
    If,
    Elif,
    Else,
    Break,
    Continue,
    Not,
    And,
    Or,
    True,
    False,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Plus,
    Minus,
    Star,
    Slash,
    DoubleSlash,
    Percent,
    DoubleStar,
    Assign,
    PlusAssign,
    MinusAssign,
    StarAssign,
    EqEq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Colon,
    Dot,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub line: usize,
}

/// Keywords the language deliberately does not have, with the reason text
/// surfaced to the script author.
fn denied_keyword(word: &str) -> Option<&'static str> {
    match word {
        "def" | "lambda" => Some("function and lambda definitions are not allowed"),
        "while" => Some("while loops are not allowed; use a bounded for loop"),
        "import" | "from" => Some("imports are not allowed"),
        "try" | "except" | "finally" | "raise" => Some("exception handling is not allowed"),
        "with" => Some("context managers are not allowed"),
        "class" => Some("class definitions are not allowed"),
        "global" | "nonlocal" | "del" => Some("scope manipulation is not allowed"),
        "yield" | "return" => Some("generators and returns are not allowed"),
        "assert" | "pass" | "match" => Some("statement is not supported"),
        "async" | "await" => Some("async constructs are not allowed"),
        "is" => Some("identity comparison is not supported; use =="),
        _ => None,
    }
}

fn keyword(word: &str) -> Option<Keyword> {
    Some(match word {
        "for" => Keyword::For,
        "in" => Keyword::In,
        "if" => Keyword::If,
        "elif" => Keyword::Elif,
        "else" => Keyword::Else,
        "break" => Keyword::Break,
        "continue" => Keyword::Continue,
        "not" => Keyword::Not,
        "and" => Keyword::And,
        "or" => Keyword::Or,
        "True" => Keyword::True,
        "False" => Keyword::False,
        "None" => Keyword::None,
        _ => return None,
    })
}

pub fn lex(source: &str) -> Result<Vec<Spanned>, SandboxError> {
    let mut tokens = Vec::new();
    let mut indent_stack: Vec<usize> = vec![0];
    let mut bracket_depth: usize = 0;

    for (index, raw_line) in source.lines().enumerate() {
        let line_no = index + 1;
        let stripped = raw_line.trim_end();

        if bracket_depth == 0 {
            let content = stripped.trim_start();
            if content.is_empty() || content.starts_with('#') {
                continue;
            }

            let indent = leading_indent(stripped, line_no)?;
            let current = *indent_stack.last().unwrap_or(&0);
            if indent > current {
                indent_stack.push(indent);
                tokens.push(Spanned {
                    token: Token::Indent,
                    line: line_no,
                });
            } else if indent < current {
                while indent < *indent_stack.last().unwrap_or(&0) {
                    indent_stack.pop();
                    tokens.push(Spanned {
                        token: Token::Dedent,
                        line: line_no,
                    });
                }
                if indent != *indent_stack.last().unwrap_or(&0) {
                    return Err(SandboxError::Syntax {
                        line: line_no,
                        message: "inconsistent indentation".to_owned(),
                    });
                }
            }
        }

        lex_line(stripped, line_no, &mut tokens, &mut bracket_depth)?;

        if bracket_depth == 0 {
            tokens.push(Spanned {
                token: Token::Newline,
                line: line_no,
            });
        }
    }

    if bracket_depth > 0 {
        return Err(SandboxError::Syntax {
            line: source.lines().count(),
            message: "unclosed bracket at end of script".to_owned(),
        });
    }

    let last_line = source.lines().count().max(1);
    while indent_stack.len() > 1 {
        indent_stack.pop();
        tokens.push(Spanned {
            token: Token::Dedent,
            line: last_line,
        });
    }
    tokens.push(Spanned {
        token: Token::Eof,
        line: last_line,
    });

    Ok(tokens)
}

fn leading_indent(line: &str, line_no: usize) -> Result<usize, SandboxError> {
    let mut indent = 0;
    for ch in line.chars() {
        match ch {
            ' ' => indent += 1,
            '\t' => {
                return Err(SandboxError::Syntax {
                    line: line_no,
                    message: "tab indentation is not supported; use spaces".to_owned(),
                });
            }
            _ => break,
        }
    }
    Ok(indent)
}

fn lex_line(
    line: &str,
    line_no: usize,
    tokens: &mut Vec<Spanned>,
    bracket_depth: &mut usize,
) -> Result<(), SandboxError> {
    let chars: Vec<char> = line.chars().collect();
    let mut pos = if *bracket_depth > 0 {
        // Continuation line inside brackets; leading whitespace is free-form.
        chars.iter().take_while(|c| c.is_whitespace()).count()
    } else {
        chars.iter().take_while(|c| **c == ' ').count()
    };

    while pos < chars.len() {
        let ch = chars[pos];

        if ch == ' ' {
            pos += 1;
            continue;
        }
        if ch == '#' {
            break;
        }

        if ch.is_ascii_alphabetic() || ch == '_' {
            let start = pos;
            while pos < chars.len() && (chars[pos].is_ascii_alphanumeric() || chars[pos] == '_') {
                pos += 1;
            }
            let word: String = chars[start..pos].iter().collect();

            // `f"…"` introduces an f-string.
            if (word == "f" || word == "F")
                && pos < chars.len()
                && (chars[pos] == '"' || chars[pos] == '\'')
            {
                let (parts, next) = lex_fstring(&chars, pos, line_no)?;
                tokens.push(Spanned {
                    token: Token::FStr(parts),
                    line: line_no,
                });
                pos = next;
                continue;
            }

            if let Some(reason) = denied_keyword(&word) {
                return Err(SandboxError::DeniedConstruct {
                    line: line_no,
                    construct: format!("'{word}': {reason}"),
                });
            }
            if word.starts_with("__") && word.ends_with("__") && word.len() > 4 {
                return Err(SandboxError::BlockedName {
                    line: line_no,
                    name: word,
                });
            }
            match keyword(&word) {
                Some(kw) => tokens.push(Spanned {
                    token: Token::Keyword(kw),
                    line: line_no,
                }),
                None => tokens.push(Spanned {
                    token: Token::Ident(word),
                    line: line_no,
                }),
            }
            continue;
        }

        if ch.is_ascii_digit() {
            let (token, next) = lex_number(&chars, pos, line_no)?;
            tokens.push(Spanned {
                token,
                line: line_no,
            });
            pos = next;
            continue;
        }

        if ch == '"' || ch == '\'' {
            let (text, next) = lex_string(&chars, pos, line_no)?;
            tokens.push(Spanned {
                token: Token::Str(text),
                line: line_no,
            });
            pos = next;
            continue;
        }

        let (op, advance) = lex_operator(&chars, pos, line_no)?;
        match op {
            Op::LParen | Op::LBracket => *bracket_depth += 1,
            Op::RParen | Op::RBracket => {
                *bracket_depth = bracket_depth.saturating_sub(1);
            }
            _ => {}
        }
        tokens.push(Spanned {
            token: Token::Op(op),
            line: line_no,
        });
        pos += advance;
    }

    Ok(())
}

fn lex_operator(chars: &[char], pos: usize, line_no: usize) -> Result<(Op, usize), SandboxError> {
    let ch = chars[pos];
    let next = chars.get(pos + 1).copied();
    let op = match (ch, next) {
        ('*', Some('*')) => return Ok((Op::DoubleStar, 2)),
        ('*', Some('=')) => return Ok((Op::StarAssign, 2)),
        ('/', Some('/')) => return Ok((Op::DoubleSlash, 2)),
        ('+', Some('=')) => return Ok((Op::PlusAssign, 2)),
        ('-', Some('=')) => return Ok((Op::MinusAssign, 2)),
        ('=', Some('=')) => return Ok((Op::EqEq, 2)),
        ('!', Some('=')) => return Ok((Op::NotEq, 2)),
        ('<', Some('=')) => return Ok((Op::LtEq, 2)),
        ('>', Some('=')) => return Ok((Op::GtEq, 2)),
        ('+', _) => Op::Plus,
        ('-', _) => Op::Minus,
        ('*', _) => Op::Star,
        ('/', _) => Op::Slash,
        ('%', _) => Op::Percent,
        ('=', _) => Op::Assign,
        ('<', _) => Op::Lt,
        ('>', _) => Op::Gt,
        ('(', _) => Op::LParen,
        (')', _) => Op::RParen,
        ('[', _) => Op::LBracket,
        (']', _) => Op::RBracket,
        (',', _) => Op::Comma,
        (':', _) => Op::Colon,
        ('.', _) => Op::Dot,
        _ => {
            return Err(SandboxError::Syntax {
                line: line_no,
                message: format!("unexpected character {ch:?}"),
            });
        }
    };
    Ok((op, 1))
}

fn lex_number(
    chars: &[char],
    start: usize,
    line_no: usize,
) -> Result<(Token, usize), SandboxError> {
    let mut pos = start;
    while pos < chars.len() && chars[pos].is_ascii_digit() {
        pos += 1;
    }
    let mut is_float = false;
    if pos < chars.len() && chars[pos] == '.' && chars.get(pos + 1) != Some(&'.') {
        is_float = true;
        pos += 1;
        while pos < chars.len() && chars[pos].is_ascii_digit() {
            pos += 1;
        }
    }

    let text: String = chars[start..pos].iter().collect();
    if is_float {
        let value: f64 = text.parse().map_err(|_| SandboxError::Syntax {
            line: line_no,
            message: format!("invalid number literal {text:?}"),
        })?;
        Ok((Token::Float(value), pos))
    } else {
        let value: i64 = text.parse().map_err(|_| SandboxError::Syntax {
            line: line_no,
            message: format!("integer literal {text:?} is out of range"),
        })?;
        Ok((Token::Int(value), pos))
    }
}

fn lex_string(
    chars: &[char],
    start: usize,
    line_no: usize,
) -> Result<(String, usize), SandboxError> {
    let quote = chars[start];
    let mut pos = start + 1;
    let mut text = String::new();

    while pos < chars.len() {
        let ch = chars[pos];
        if ch == quote {
            return Ok((text, pos + 1));
        }
        if ch == '\\' {
            let escaped = chars.get(pos + 1).copied().ok_or_else(|| SandboxError::Syntax {
                line: line_no,
                message: "dangling escape at end of string".to_owned(),
            })?;
            text.push(unescape(escaped));
            pos += 2;
            continue;
        }
        text.push(ch);
        pos += 1;
    }

    Err(SandboxError::Syntax {
        line: line_no,
        message: "unterminated string literal".to_owned(),
    })
}

fn unescape(ch: char) -> char {
    match ch {
        'n' => '\n',
        't' => '\t',
        'r' => '\r',
        '0' => '\0',
        other => other,
    }
}

fn lex_fstring(
    chars: &[char],
    quote_pos: usize,
    line_no: usize,
) -> Result<(Vec<FStrPart>, usize), SandboxError> {
    let quote = chars[quote_pos];
    let mut pos = quote_pos + 1;
    let mut parts = Vec::new();
    let mut literal = String::new();

    while pos < chars.len() {
        let ch = chars[pos];

        if ch == quote {
            if !literal.is_empty() {
                parts.push(FStrPart::Literal(std::mem::take(&mut literal)));
            }
            return Ok((parts, pos + 1));
        }

        if ch == '\\' {
            let escaped = chars.get(pos + 1).copied().ok_or_else(|| SandboxError::Syntax {
                line: line_no,
                message: "dangling escape in f-string".to_owned(),
            })?;
            literal.push(unescape(escaped));
            pos += 2;
            continue;
        }

        if ch == '{' {
            if chars.get(pos + 1) == Some(&'{') {
                literal.push('{');
                pos += 2;
                continue;
            }
            if !literal.is_empty() {
                parts.push(FStrPart::Literal(std::mem::take(&mut literal)));
            }
            let (part, next) = lex_fstring_expression(chars, pos + 1, quote, line_no)?;
            parts.push(part);
            pos = next;
            continue;
        }

        if ch == '}' {
            if chars.get(pos + 1) == Some(&'}') {
                literal.push('}');
                pos += 2;
                continue;
            }
            return Err(SandboxError::Syntax {
                line: line_no,
                message: "unmatched '}' in f-string".to_owned(),
            });
        }

        literal.push(ch);
        pos += 1;
    }

    Err(SandboxError::Syntax {
        line: line_no,
        message: "unterminated f-string".to_owned(),
    })
}

fn lex_fstring_expression(
    chars: &[char],
    start: usize,
    quote: char,
    line_no: usize,
) -> Result<(FStrPart, usize), SandboxError> {
    let mut pos = start;
    let mut depth: usize = 0;
    let mut source = String::new();
    let mut spec: Option<String> = None;

    while pos < chars.len() {
        let ch = chars[pos];
        if ch == quote {
            break;
        }
        match ch {
            '}' if depth == 0 => {
                if source.trim().is_empty() {
                    return Err(SandboxError::Syntax {
                        line: line_no,
                        message: "empty expression in f-string".to_owned(),
                    });
                }
                return Ok((
                    FStrPart::Expression {
                        source: source.trim().to_owned(),
                        spec,
                    },
                    pos + 1,
                ));
            }
            ':' if depth == 0 && spec.is_none() => {
                spec = Some(String::new());
            }
            '(' | '[' => {
                depth += 1;
                push_fstring_char(&mut source, &mut spec, ch);
            }
            ')' | ']' => {
                depth = depth.saturating_sub(1);
                push_fstring_char(&mut source, &mut spec, ch);
            }
            _ => push_fstring_char(&mut source, &mut spec, ch),
        }
        pos += 1;
    }

    Err(SandboxError::Syntax {
        line: line_no,
        message: "unterminated expression in f-string".to_owned(),
    })
}

fn push_fstring_char(source: &mut String, spec: &mut Option<String>, ch: char) {
    match spec {
        Some(spec) => spec.push(ch),
        None => source.push(ch),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token> {
        lex(source).expect("lex").into_iter().map(|spanned| spanned.token).collect()
    }

    #[test]
    fn lexes_assignment_line() {
        let tokens = kinds("x = 1 + 2");
        assert_eq!(
            tokens,
            vec![
                Token::Ident("x".to_owned()),
                Token::Op(Op::Assign),
                Token::Int(1),
                Token::Op(Op::Plus),
                Token::Int(2),
                Token::Newline,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn tracks_indentation_blocks() {
        let tokens = kinds("for x in range(3):\n    y = x\nz = 1");
        assert!(tokens.contains(&Token::Indent));
        assert!(tokens.contains(&Token::Dedent));
    }

    #[test]
    fn skips_blank_and_comment_lines() {
        let tokens = kinds("x = 1\n\n# comment\nx = 2");
        let newlines = tokens.iter().filter(|t| **t == Token::Newline).count();
        assert_eq!(newlines, 2);
    }

    #[test]
    fn rejects_denied_keywords_with_reasons() {
        let err = lex("while True:").unwrap_err();
        assert!(matches!(err, SandboxError::DeniedConstruct { line: 1, .. }));
        let err = lex("import os").unwrap_err();
        assert!(err.to_string().contains("imports are not allowed"));
        let err = lex("def foo():").unwrap_err();
        assert!(err.to_string().contains("function and lambda"));
    }

    #[test]
    fn rejects_dunder_names() {
        let err = lex("x = __class__").unwrap_err();
        assert!(matches!(err, SandboxError::BlockedName { .. }));
    }

    #[test]
    fn lexes_fstring_parts() {
        let tokens = kinds("c = f\"/setblock {x} 64 {z} stone\"");
        let fstr = tokens
            .iter()
            .find_map(|token| match token {
                Token::FStr(parts) => Some(parts.clone()),
                _ => None,
            })
            .expect("fstring token");
        assert_eq!(
            fstr,
            vec![
                FStrPart::Literal("/setblock ".to_owned()),
                FStrPart::Expression {
                    source: "x".to_owned(),
                    spec: None
                },
                FStrPart::Literal(" 64 ".to_owned()),
                FStrPart::Expression {
                    source: "z".to_owned(),
                    spec: None
                },
                FStrPart::Literal(" stone".to_owned()),
            ]
        );
    }

    #[test]
    fn fstring_supports_format_spec_and_brace_escapes() {
        let tokens = kinds("c = f\"{{lit}} {y:.2f}\"");
        let fstr = tokens
            .iter()
            .find_map(|token| match token {
                Token::FStr(parts) => Some(parts.clone()),
                _ => None,
            })
            .expect("fstring token");
        assert_eq!(
            fstr,
            vec![
                FStrPart::Literal("{lit} ".to_owned()),
                FStrPart::Expression {
                    source: "y".to_owned(),
                    spec: Some(".2f".to_owned())
                },
            ]
        );
    }

    #[test]
    fn brackets_allow_line_continuation() {
        let tokens = kinds("xs = [\n    1,\n    2,\n]");
        let newlines = tokens.iter().filter(|t| **t == Token::Newline).count();
        assert_eq!(newlines, 1);
        assert!(!tokens.contains(&Token::Indent));
    }

    #[test]
    fn rejects_tabs_and_unterminated_strings() {
        assert!(matches!(lex("\tx = 1"), Err(SandboxError::Syntax { .. })));
        assert!(matches!(lex("x = \"open"), Err(SandboxError::Syntax { .. })));
    }

    #[test]
    fn rejects_inconsistent_dedent() {
        let err = lex("if x:\n        y = 1\n   z = 2").unwrap_err();
        assert!(matches!(err, SandboxError::Syntax { line: 3, .. }));
    }
}
