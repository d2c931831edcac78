//! Recursive-descent parser for the beginner Python subset.
//!
//! Statements: assignments, augmented assignments, expression statements,
//! `return`, `pass`, `if`/`elif`/`else`, `while`, `for` and `def`.
//! Expressions: conditionals, `or`/`and`/`not`, comparisons, arithmetic,
//! unary minus, power, calls, names, literals, tuples and parentheses.
//! `elif` chains desugar into an else-suite holding a nested `If`.

use crate::lexer::{Tok, Token};
use codemend_core::{NodeKind, ParseError, Parsed};

pub fn parse_module(tokens: Vec<Token>) -> Result<Parsed, ParseError> {
  Parser { tokens, pos: 0 }.module()
}

struct Parser {
  tokens: Vec<Token>,
  pos: usize,
}

impl Parser {
  fn peek(&self) -> Option<&Tok> {
    self.tokens.get(self.pos).map(|t| &t.tok)
  }

  fn line(&self) -> usize {
    self
      .tokens
      .get(self.pos)
      .or_else(|| self.tokens.last())
      .map_or(1, |t| t.line)
  }

  fn error<S: Into<String>>(&self, message: S) -> ParseError {
    ParseError::new(self.line(), message)
  }

  fn eat(&mut self, tok: &Tok) -> bool {
    if self.peek() == Some(tok) {
      self.pos += 1;
      true
    } else {
      false
    }
  }

  fn at_op(&self, op: &str) -> bool {
    matches!(self.peek(), Some(Tok::Op(o)) if *o == op)
  }

  fn eat_op(&mut self, op: &str) -> bool {
    if self.at_op(op) {
      self.pos += 1;
      true
    } else {
      false
    }
  }

  fn expect_op(&mut self, op: &str) -> Result<(), ParseError> {
    if self.eat_op(op) {
      Ok(())
    } else {
      Err(self.error(format!("expected `{op}`")))
    }
  }

  fn at_keyword(&self, keyword: &str) -> bool {
    matches!(self.peek(), Some(Tok::Keyword(k)) if *k == keyword)
  }

  fn eat_keyword(&mut self, keyword: &str) -> bool {
    if self.at_keyword(keyword) {
      self.pos += 1;
      true
    } else {
      false
    }
  }

  fn expect_keyword(&mut self, keyword: &str) -> Result<(), ParseError> {
    if self.eat_keyword(keyword) {
      Ok(())
    } else {
      Err(self.error(format!("expected `{keyword}`")))
    }
  }

  fn name(&mut self, what: &str) -> Result<String, ParseError> {
    match self.peek() {
      Some(Tok::Name(n)) => {
        let n = n.clone();
        self.pos += 1;
        Ok(n)
      }
      _ => Err(self.error(format!("expected {what}"))),
    }
  }

  fn module(&mut self) -> Result<Parsed, ParseError> {
    let mut module = Parsed::new(NodeKind::Module);
    while self.peek().is_some() {
      if self.eat(&Tok::Newline) {
        continue;
      }
      module.children.push(self.statement()?);
    }
    Ok(module)
  }

  fn statement(&mut self) -> Result<Parsed, ParseError> {
    match self.peek() {
      Some(Tok::Keyword("def")) => self.function_def(),
      Some(Tok::Keyword("if")) => self.if_statement("if"),
      Some(Tok::Keyword("while")) => self.while_statement(),
      Some(Tok::Keyword("for")) => self.for_statement(),
      _ => {
        let stmt = self.simple_statement()?;
        self.end_of_statement()?;
        Ok(stmt)
      }
    }
  }

  fn end_of_statement(&mut self) -> Result<(), ParseError> {
    if self.eat(&Tok::Newline) || self.peek().is_none() {
      Ok(())
    } else {
      Err(self.error("expected end of statement"))
    }
  }

  fn simple_statement(&mut self) -> Result<Parsed, ParseError> {
    if self.eat_keyword("return") {
      if matches!(self.peek(), Some(Tok::Newline) | None) {
        return Ok(Parsed::new(NodeKind::Return));
      }
      let value = self.testlist()?;
      return Ok(Parsed::new(NodeKind::Return).child(value));
    }
    if self.eat_keyword("pass") {
      return Ok(Parsed::new(NodeKind::Pass));
    }
    let target = self.testlist()?;
    if self.eat_op("=") {
      let value = self.testlist()?;
      return Ok(Parsed::new(NodeKind::Assign).child(target).child(value));
    }
    if let Some(op) = self.peek_augmented_op() {
      self.pos += 1;
      let value = self.testlist()?;
      return Ok(
        Parsed::with_value(NodeKind::AugAssign, op)
          .child(target)
          .child(value),
      );
    }
    Ok(Parsed::new(NodeKind::ExpressionStatement).child(target))
  }

  fn peek_augmented_op(&self) -> Option<&'static str> {
    const AUGMENTED: &[(&str, &str)] = &[
      ("+=", "+"),
      ("-=", "-"),
      ("*=", "*"),
      ("/=", "/"),
      ("//=", "//"),
      ("%=", "%"),
      ("**=", "**"),
    ];
    match self.peek() {
      Some(Tok::Op(o)) => AUGMENTED
        .iter()
        .find(|(symbol, _)| symbol == o)
        .map(|(_, stripped)| *stripped),
      _ => None,
    }
  }

  fn function_def(&mut self) -> Result<Parsed, ParseError> {
    self.expect_keyword("def")?;
    let name = self.name("function name")?;
    self.expect_op("(")?;
    let mut def = Parsed::with_value(NodeKind::FunctionDef, name);
    if !self.eat_op(")") {
      loop {
        let param = self.name("parameter name")?;
        def
          .children
          .push(Parsed::with_value(NodeKind::Parameter, param));
        if self.eat_op(",") {
          if self.eat_op(")") {
            break;
          }
          continue;
        }
        self.expect_op(")")?;
        break;
      }
    }
    self.expect_op(":")?;
    def.children.push(self.suite()?);
    Ok(def)
  }

  fn if_statement(&mut self, keyword: &str) -> Result<Parsed, ParseError> {
    self.expect_keyword(keyword)?;
    let test = self.test()?;
    self.expect_op(":")?;
    let body = self.suite()?;
    let mut node = Parsed::new(NodeKind::If)
      .child(Parsed::new(NodeKind::IfTest).child(test))
      .child(body);
    if self.at_keyword("elif") {
      let nested = self.if_statement("elif")?;
      node
        .children
        .push(Parsed::new(NodeKind::Suite).child(nested));
    } else if self.eat_keyword("else") {
      self.expect_op(":")?;
      node.children.push(self.suite()?);
    }
    Ok(node)
  }

  fn while_statement(&mut self) -> Result<Parsed, ParseError> {
    self.expect_keyword("while")?;
    let test = self.test()?;
    self.expect_op(":")?;
    let body = self.suite()?;
    Ok(Parsed::new(NodeKind::While).child(test).child(body))
  }

  fn for_statement(&mut self) -> Result<Parsed, ParseError> {
    self.expect_keyword("for")?;
    let target = self.testlist()?;
    self.expect_keyword("in")?;
    let iterable = self.testlist()?;
    self.expect_op(":")?;
    let body = self.suite()?;
    Ok(
      Parsed::new(NodeKind::For)
        .child(target)
        .child(iterable)
        .child(body),
    )
  }

  fn suite(&mut self) -> Result<Parsed, ParseError> {
    if self.eat(&Tok::Newline) {
      if !self.eat(&Tok::Indent) {
        return Err(self.error("expected an indented block"));
      }
      let mut suite = Parsed::new(NodeKind::Suite);
      loop {
        if self.eat(&Tok::Dedent) || self.peek().is_none() {
          break;
        }
        if self.eat(&Tok::Newline) {
          continue;
        }
        suite.children.push(self.statement()?);
      }
      Ok(suite)
    } else {
      // single-line form: `if x: return 1`
      let stmt = self.simple_statement()?;
      self.end_of_statement()?;
      Ok(Parsed::new(NodeKind::Suite).child(stmt))
    }
  }

  fn testlist(&mut self) -> Result<Parsed, ParseError> {
    let first = self.test()?;
    if !self.at_op(",") {
      return Ok(first);
    }
    let mut tuple = Parsed::new(NodeKind::Tuple).child(first);
    while self.eat_op(",") {
      if !self.expression_ahead() {
        break;
      }
      tuple.children.push(self.test()?);
    }
    Ok(tuple)
  }

  fn expression_ahead(&self) -> bool {
    matches!(
      self.peek(),
      Some(Tok::Name(_))
        | Some(Tok::Number(_))
        | Some(Tok::Str(_))
        | Some(Tok::Keyword("not" | "True" | "False" | "None"))
        | Some(Tok::Op("(" | "-" | "+"))
    )
  }

  fn test(&mut self) -> Result<Parsed, ParseError> {
    let body = self.or_test()?;
    if self.eat_keyword("if") {
      let test = self.or_test()?;
      self.expect_keyword("else")?;
      let orelse = self.test()?;
      return Ok(
        Parsed::new(NodeKind::Conditional)
          .child(body)
          .child(test)
          .child(orelse),
      );
    }
    Ok(body)
  }

  fn or_test(&mut self) -> Result<Parsed, ParseError> {
    let mut node = self.and_test()?;
    while self.eat_keyword("or") {
      node = Parsed::with_value(NodeKind::BinaryOp, "or")
        .child(node)
        .child(self.and_test()?);
    }
    Ok(node)
  }

  fn and_test(&mut self) -> Result<Parsed, ParseError> {
    let mut node = self.not_test()?;
    while self.eat_keyword("and") {
      node = Parsed::with_value(NodeKind::BinaryOp, "and")
        .child(node)
        .child(self.not_test()?);
    }
    Ok(node)
  }

  fn not_test(&mut self) -> Result<Parsed, ParseError> {
    if self.eat_keyword("not") {
      return Ok(Parsed::with_value(NodeKind::UnaryOp, "not").child(self.not_test()?));
    }
    self.comparison()
  }

  fn comparison(&mut self) -> Result<Parsed, ParseError> {
    const COMPARATORS: &[&str] = &["==", "!=", "<", "<=", ">", ">="];
    let mut node = self.arith()?;
    loop {
      let op = match self.peek() {
        Some(Tok::Op(o)) if COMPARATORS.contains(o) => *o,
        _ => break,
      };
      self.pos += 1;
      node = Parsed::with_value(NodeKind::BinaryOp, op)
        .child(node)
        .child(self.arith()?);
    }
    Ok(node)
  }

  fn arith(&mut self) -> Result<Parsed, ParseError> {
    let mut node = self.term()?;
    loop {
      let op = match self.peek() {
        Some(Tok::Op(o @ ("+" | "-"))) => *o,
        _ => break,
      };
      self.pos += 1;
      node = Parsed::with_value(NodeKind::BinaryOp, op)
        .child(node)
        .child(self.term()?);
    }
    Ok(node)
  }

  fn term(&mut self) -> Result<Parsed, ParseError> {
    let mut node = self.factor()?;
    loop {
      let op = match self.peek() {
        Some(Tok::Op(o @ ("*" | "/" | "//" | "%"))) => *o,
        _ => break,
      };
      self.pos += 1;
      node = Parsed::with_value(NodeKind::BinaryOp, op)
        .child(node)
        .child(self.factor()?);
    }
    Ok(node)
  }

  fn factor(&mut self) -> Result<Parsed, ParseError> {
    if self.eat_op("-") {
      return Ok(Parsed::with_value(NodeKind::UnaryOp, "-").child(self.factor()?));
    }
    if self.eat_op("+") {
      return Ok(Parsed::with_value(NodeKind::UnaryOp, "+").child(self.factor()?));
    }
    self.power()
  }

  fn power(&mut self) -> Result<Parsed, ParseError> {
    let base = self.atom_with_trailers()?;
    if self.eat_op("**") {
      // right associative
      let exponent = self.factor()?;
      return Ok(
        Parsed::with_value(NodeKind::BinaryOp, "**")
          .child(base)
          .child(exponent),
      );
    }
    Ok(base)
  }

  fn atom_with_trailers(&mut self) -> Result<Parsed, ParseError> {
    let mut node = self.atom()?;
    while self.eat_op("(") {
      let mut call = Parsed::new(NodeKind::Call).child(node);
      if !self.eat_op(")") {
        loop {
          let arg = self.test()?;
          call.children.push(Parsed::new(NodeKind::Arg).child(arg));
          if self.eat_op(",") {
            if self.eat_op(")") {
              break;
            }
            continue;
          }
          self.expect_op(")")?;
          break;
        }
      }
      node = call;
    }
    Ok(node)
  }

  fn atom(&mut self) -> Result<Parsed, ParseError> {
    let tok = self.peek().cloned();
    match tok {
      Some(Tok::Name(n)) => {
        self.pos += 1;
        Ok(Parsed::with_value(NodeKind::Name, n))
      }
      Some(Tok::Number(v)) => {
        self.pos += 1;
        Ok(Parsed::with_value(NodeKind::Constant, v))
      }
      Some(Tok::Str(s)) => {
        self.pos += 1;
        Ok(Parsed::with_value(NodeKind::Constant, s))
      }
      Some(Tok::Keyword(k)) if k == "True" || k == "False" || k == "None" => {
        self.pos += 1;
        Ok(Parsed::with_value(NodeKind::Constant, k))
      }
      Some(Tok::Op("(")) => {
        self.pos += 1;
        if self.eat_op(")") {
          return Ok(Parsed::new(NodeKind::Parenthesis).child(Parsed::new(NodeKind::Tuple)));
        }
        let inner = self.testlist()?;
        self.expect_op(")")?;
        Ok(Parsed::new(NodeKind::Parenthesis).child(inner))
      }
      _ => Err(self.error("expected an expression")),
    }
  }
}
