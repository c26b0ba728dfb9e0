//! Statement parser for `.sdl` schema sources
//!
//! The grammar is statement oriented: `keyword [argument] (";" | "{ ... }")`.
//! Arguments are unquoted tokens or quoted strings with `+` concatenation.
//! `//` starts a line comment, `/* ... */` a block comment.

use std::iter::Peekable;
use std::str::CharIndices;

use crate::errors::{SchemaError, SchemaResult};

/// One parsed statement with its substatements.
///
/// Keywords are not validated here; the semantic pass rejects statements
/// that are unknown in their context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub keyword: String,
    pub argument: Option<String>,
    pub children: Vec<Statement>,
    pub line: usize,
}

impl Statement {
    /// First substatement with the given keyword.
    pub fn child(&self, keyword: &str) -> Option<&Statement> {
        self.children.iter().find(|s| s.keyword == keyword)
    }

    /// All substatements with the given keyword.
    pub fn children_named<'a>(&'a self, keyword: &'a str) -> impl Iterator<Item = &'a Statement> {
        self.children.iter().filter(move |s| s.keyword == keyword)
    }

    /// Argument of the first substatement with the given keyword.
    pub fn child_arg(&self, keyword: &str) -> Option<&str> {
        self.child(keyword).and_then(|s| s.argument.as_deref())
    }

    /// Argument, or an error naming the statement when it is missing.
    pub fn require_arg(&self, source_name: &str) -> SchemaResult<&str> {
        self.argument.as_deref().ok_or_else(|| SchemaError::Parse {
            source_name: source_name.to_string(),
            line: self.line,
            message: format!("'{}' requires an argument", self.keyword),
        })
    }
}

/// Parse one source into its top-level statements.
pub fn parse(source_name: &str, text: &str) -> SchemaResult<Vec<Statement>> {
    let mut parser = Parser::new(source_name, text);
    let mut statements = Vec::new();
    while let Some(token) = parser.next_token()? {
        statements.push(parser.statement(token)?);
    }
    Ok(statements)
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    LeftBrace,
    RightBrace,
    Semicolon,
    Str(String),
}

#[derive(Debug)]
struct Located {
    token: Token,
    line: usize,
}

struct Parser<'a> {
    source_name: &'a str,
    chars: Peekable<CharIndices<'a>>,
    text: &'a str,
    line: usize,
}

impl<'a> Parser<'a> {
    fn new(source_name: &'a str, text: &'a str) -> Self {
        Self {
            source_name,
            chars: text.char_indices().peekable(),
            text,
            line: 1,
        }
    }

    fn error(&self, line: usize, message: impl Into<String>) -> SchemaError {
        SchemaError::Parse {
            source_name: self.source_name.to_string(),
            line,
            message: message.into(),
        }
    }

    fn statement(&mut self, first: Located) -> SchemaResult<Statement> {
        let keyword = match first.token {
            Token::Str(s) => s,
            other => {
                return Err(self.error(
                    first.line,
                    format!("expected statement keyword, found {}", token_name(&other)),
                ))
            }
        };
        let line = first.line;

        let mut argument = None;
        let mut next = self
            .next_token()?
            .ok_or_else(|| self.error(self.line, format!("unterminated '{keyword}' statement")))?;
        if let Token::Str(arg) = next.token {
            argument = Some(arg);
            next = self
                .next_token()?
                .ok_or_else(|| self.error(self.line, format!("unterminated '{keyword}' statement")))?;
        }

        let mut children = Vec::new();
        match next.token {
            Token::Semicolon => {}
            Token::LeftBrace => loop {
                let token = self.next_token()?.ok_or_else(|| {
                    self.error(self.line, format!("missing '}}' for '{keyword}' statement"))
                })?;
                if token.token == Token::RightBrace {
                    break;
                }
                children.push(self.statement(token)?);
            },
            other => {
                return Err(self.error(
                    next.line,
                    format!(
                        "expected ';' or '{{' after '{keyword}', found {}",
                        token_name(&other)
                    ),
                ))
            }
        }

        Ok(Statement {
            keyword,
            argument,
            children,
            line,
        })
    }

    fn next_token(&mut self) -> SchemaResult<Option<Located>> {
        self.skip_trivia()?;

        let (start, c) = match self.chars.next() {
            Some(pair) => pair,
            None => return Ok(None),
        };
        let line = self.line;

        let token = match c {
            '{' => Token::LeftBrace,
            '}' => Token::RightBrace,
            ';' => Token::Semicolon,
            '"' | '\'' => Token::Str(self.quoted_string(c)?),
            _ => Token::Str(self.unquoted_string(start)),
        };

        // Quoted strings may continue with `+ "..."` concatenation.
        if let Token::Str(ref s) = token {
            if matches!(c, '"' | '\'') {
                let mut value = s.clone();
                while self.concat_follows()? {
                    value.push_str(&self.next_quoted_part()?);
                }
                return Ok(Some(Located {
                    token: Token::Str(value),
                    line,
                }));
            }
        }

        Ok(Some(Located { token, line }))
    }

    /// True when the next non-trivia character is a `+` joining two quoted
    /// strings; consumes the `+` in that case.
    fn concat_follows(&mut self) -> SchemaResult<bool> {
        self.skip_trivia()?;
        if let Some(&(_, '+')) = self.chars.peek() {
            self.chars.next();
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn next_quoted_part(&mut self) -> SchemaResult<String> {
        self.skip_trivia()?;
        match self.chars.next() {
            Some((_, quote @ ('"' | '\''))) => self.quoted_string(quote),
            _ => Err(self.error(self.line, "expected quoted string after '+'")),
        }
    }

    fn quoted_string(&mut self, quote: char) -> SchemaResult<String> {
        let start_line = self.line;
        let mut value = String::new();
        loop {
            match self.chars.next() {
                None => return Err(self.error(start_line, "unterminated string")),
                Some((_, c)) if c == quote => return Ok(value),
                Some((_, '\\')) if quote == '"' => match self.chars.next() {
                    Some((_, 'n')) => value.push('\n'),
                    Some((_, 't')) => value.push('\t'),
                    Some((_, '"')) => value.push('"'),
                    Some((_, '\\')) => value.push('\\'),
                    Some((_, other)) => {
                        return Err(
                            self.error(self.line, format!("invalid escape sequence '\\{other}'"))
                        )
                    }
                    None => return Err(self.error(start_line, "unterminated string")),
                },
                Some((_, '\n')) => {
                    self.line += 1;
                    value.push('\n');
                }
                Some((_, c)) => value.push(c),
            }
        }
    }

    fn unquoted_string(&mut self, start: usize) -> String {
        let mut end = self.text.len();
        while let Some(&(idx, c)) = self.chars.peek() {
            if c.is_whitespace() || matches!(c, ';' | '{' | '}' | '"' | '\'') || self.comment_ahead()
            {
                end = idx;
                break;
            }
            self.chars.next();
        }
        self.text[start..end].to_string()
    }

    fn comment_ahead(&mut self) -> bool {
        let rest = match self.chars.peek() {
            Some(&(idx, _)) => &self.text[idx..],
            None => return false,
        };
        rest.starts_with("//") || rest.starts_with("/*")
    }

    fn skip_trivia(&mut self) -> SchemaResult<()> {
        loop {
            match self.chars.peek() {
                Some(&(_, c)) if c.is_whitespace() => {
                    if c == '\n' {
                        self.line += 1;
                    }
                    self.chars.next();
                }
                Some(&(idx, '/')) => {
                    let rest = &self.text[idx..];
                    if rest.starts_with("//") {
                        for (_, c) in self.chars.by_ref() {
                            if c == '\n' {
                                self.line += 1;
                                break;
                            }
                        }
                    } else if rest.starts_with("/*") {
                        self.block_comment()?;
                    } else {
                        return Ok(());
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn block_comment(&mut self) -> SchemaResult<()> {
        let start_line = self.line;
        self.chars.next(); // '/'
        self.chars.next(); // '*'
        let mut prev = '\0';
        for (_, c) in self.chars.by_ref() {
            if c == '\n' {
                self.line += 1;
            }
            if prev == '*' && c == '/' {
                return Ok(());
            }
            prev = c;
        }
        Err(self.error(start_line, "unterminated block comment"))
    }
}

fn token_name(token: &Token) -> &'static str {
    match token {
        Token::LeftBrace => "'{'",
        Token::RightBrace => "'}'",
        Token::Semicolon => "';'",
        Token::Str(_) => "string",
    }
}
