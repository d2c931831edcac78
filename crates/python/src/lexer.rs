//! Line-oriented lexer with indentation tracking.
//!
//! Indentation is significant outside parentheses: each physical line opens
//! with a run of spaces compared against the indent stack, producing
//! `Indent`/`Dedent` tokens the parser consumes as block delimiters. Blank
//! and comment-only lines are invisible to the parser.

use codemend_core::ParseError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tok {
  Newline,
  Indent,
  Dedent,
  Name(String),
  Number(String),
  Str(String),
  Keyword(&'static str),
  Op(&'static str),
}

#[derive(Debug, Clone)]
pub struct Token {
  pub tok: Tok,
  pub line: usize,
}

const KEYWORDS: &[&str] = &[
  "and", "def", "elif", "else", "for", "if", "in", "not", "or", "pass", "return", "while",
  "True", "False", "None",
];

// longest first so that `**=` wins over `**` and `*`
const OPERATORS: &[&str] = &[
  "**=", "//=", "==", "!=", "<=", ">=", "+=", "-=", "*=", "/=", "%=", "**", "//", "(", ")",
  ",", ":", "<", ">", "+", "-", "*", "/", "%", "=",
];

pub fn tokenize(source: &str) -> Result<Vec<Token>, ParseError> {
  let mut tokens = Vec::new();
  let mut indents = vec![0usize];
  let mut paren_depth = 0usize;
  let mut line_no = 0;
  for (index, raw) in source.lines().enumerate() {
    line_no = index + 1;
    let mut rest = raw;
    if paren_depth == 0 {
      let indent = raw.len() - raw.trim_start_matches(' ').len();
      rest = &raw[indent..];
      if rest.is_empty() || rest.starts_with('#') {
        continue;
      }
      let current = *indents.last().expect("indent stack is never empty");
      if indent > current {
        indents.push(indent);
        tokens.push(Token {
          tok: Tok::Indent,
          line: line_no,
        });
      } else {
        while indent < *indents.last().expect("indent stack is never empty") {
          indents.pop();
          tokens.push(Token {
            tok: Tok::Dedent,
            line: line_no,
          });
        }
        if indent != *indents.last().expect("indent stack is never empty") {
          return Err(ParseError::new(line_no, "inconsistent indentation"));
        }
      }
    }
    let produced = lex_line(rest, line_no, &mut paren_depth, &mut tokens)?;
    if produced && paren_depth == 0 {
      tokens.push(Token {
        tok: Tok::Newline,
        line: line_no,
      });
    }
  }
  while indents.len() > 1 {
    indents.pop();
    tokens.push(Token {
      tok: Tok::Dedent,
      line: line_no + 1,
    });
  }
  Ok(tokens)
}

fn lex_line(
  line: &str,
  line_no: usize,
  paren_depth: &mut usize,
  tokens: &mut Vec<Token>,
) -> Result<bool, ParseError> {
  let bytes = line.as_bytes();
  let mut i = 0;
  let mut produced = false;
  'outer: while i < bytes.len() {
    let c = bytes[i] as char;
    if c == ' ' {
      i += 1;
      continue;
    }
    if c == '\t' {
      return Err(ParseError::new(line_no, "tabs are not supported, use spaces"));
    }
    if c == '#' {
      break;
    }
    produced = true;
    if c.is_ascii_alphabetic() || c == '_' {
      let start = i;
      while i < bytes.len() && ((bytes[i] as char).is_ascii_alphanumeric() || bytes[i] == b'_') {
        i += 1;
      }
      let word = &line[start..i];
      let tok = match KEYWORDS.iter().find(|k| **k == word).copied() {
        Some(keyword) => Tok::Keyword(keyword),
        None => Tok::Name(word.to_string()),
      };
      tokens.push(Token { tok, line: line_no });
      continue;
    }
    if c.is_ascii_digit() {
      let start = i;
      while i < bytes.len() && (bytes[i] as char).is_ascii_digit() {
        i += 1;
      }
      if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        while i < bytes.len() && (bytes[i] as char).is_ascii_digit() {
          i += 1;
        }
      }
      tokens.push(Token {
        tok: Tok::Number(line[start..i].to_string()),
        line: line_no,
      });
      continue;
    }
    if c == '\'' || c == '"' {
      let quote = bytes[i];
      let start = i;
      i += 1;
      while i < bytes.len() {
        if bytes[i] == b'\\' {
          i += 2;
          continue;
        }
        if bytes[i] == quote {
          i += 1;
          tokens.push(Token {
            tok: Tok::Str(line[start..i].to_string()),
            line: line_no,
          });
          continue 'outer;
        }
        i += 1;
      }
      return Err(ParseError::new(line_no, "unterminated string literal"));
    }
    for &op in OPERATORS {
      if line[i..].starts_with(op) {
        match op {
          "(" => *paren_depth += 1,
          ")" => *paren_depth = paren_depth.saturating_sub(1),
          _ => {}
        }
        tokens.push(Token {
          tok: Tok::Op(op),
          line: line_no,
        });
        i += op.len();
        continue 'outer;
      }
    }
    return Err(ParseError::new(
      line_no,
      format!("unexpected character: {c:?}"),
    ));
  }
  Ok(produced)
}
