use crate::error::ParseError;
use crate::lexer::{self, Token};
use std::fmt;

/// Nesting limit for parenthesized sub-expressions.
pub const MAX_NESTING: usize = 64;

/// Operators joining the steps of a [`Flow`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// `&&`: continue only while the previous step succeeded.
    And,
    /// `||`: continue only while the previous step failed.
    Or,
    /// `|`: recognized, never executed.
    Pipe,
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operator::And => "&&",
            Operator::Or => "||",
            Operator::Pipe => "|",
        })
    }
}

/// A single element of a parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// The raw words of a command, e.g. `instances`, `-g`, `"my group"`.
    ///
    /// Quoting is preserved; the interpreter unquotes each word right before
    /// the command runs.
    Command(Vec<String>),
    /// An operator token at the current nesting level.
    Operator(Operator),
    /// A parenthesized sub-expression, evaluated as an independent flow.
    Group(Flow),
}

/// A sequence of commands and operators at one nesting level.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Flow {
    nodes: Vec<Node>,
}

impl Flow {
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether a `|` appears anywhere in this flow or its sub-expressions.
    pub fn contains_pipe(&self) -> bool {
        self.nodes.iter().any(|node| match node {
            Node::Operator(op) => *op == Operator::Pipe,
            Node::Group(inner) => inner.contains_pipe(),
            Node::Command(_) => false,
        })
    }

    /// Rejects flows that use the pipe operator anywhere.
    pub fn ensure_supported(&self) -> Result<(), ParseError> {
        if self.contains_pipe() {
            Err(ParseError::PipeUnsupported)
        } else {
            Ok(())
        }
    }
}

struct FlowBuilder {
    tokens: Vec<Token>,
    pos: usize,
}

impl FlowBuilder {
    fn from(tokens: Vec<Token>) -> Self {
        FlowBuilder { tokens, pos: 0 }
    }

    /// A top-level flow either consumes every token or fails on a stray `)`.
    fn build_flow(mut self) -> Result<Flow, ParseError> {
        self.parse_flow(0)
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn consume(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    /// Parse a flow: step (operator step)*, where a step is a command or a group.
    ///
    /// Returns at the end of input or in front of the `)` closing this level.
    fn parse_flow(&mut self, depth: usize) -> Result<Flow, ParseError> {
        let mut nodes: Vec<Node> = Vec::new();

        while let Some(token) = self.peek().cloned() {
            match token {
                Token::CloseParen => {
                    if depth == 0 {
                        return Err(ParseError::UnbalancedParen);
                    }
                    break;
                }
                Token::Word(_) => {
                    if matches!(nodes.last(), Some(Node::Group(_))) {
                        return Err(ParseError::MissingOperator);
                    }
                    nodes.push(self.parse_command());
                }
                Token::OpenParen => {
                    if matches!(nodes.last(), Some(Node::Command(_) | Node::Group(_))) {
                        return Err(ParseError::MissingOperator);
                    }
                    nodes.push(self.parse_group(depth)?);
                }
                Token::AndOp | Token::OrOp | Token::PipeOp => {
                    let op = match token {
                        Token::AndOp => Operator::And,
                        Token::OrOp => Operator::Or,
                        _ => Operator::Pipe,
                    };
                    match nodes.last() {
                        None => return Err(ParseError::LeadingOperator(op)),
                        Some(Node::Operator(prev)) => {
                            return Err(ParseError::ConsecutiveOperators(*prev, op));
                        }
                        Some(_) => {}
                    }
                    self.consume();
                    nodes.push(Node::Operator(op));
                }
            }
        }

        if let Some(Node::Operator(op)) = nodes.last() {
            return Err(ParseError::TrailingOperator(*op));
        }

        Ok(Flow { nodes })
    }

    /// Parse a command: word+
    fn parse_command(&mut self) -> Node {
        let mut words = Vec::new();
        while let Some(Token::Word(word)) = self.peek() {
            words.push(word.clone());
            self.consume();
        }
        Node::Command(words)
    }

    /// Parse a group: '(' flow ')'
    fn parse_group(&mut self, depth: usize) -> Result<Node, ParseError> {
        if depth + 1 > MAX_NESTING {
            return Err(ParseError::TooDeep(MAX_NESTING));
        }
        self.consume(); // consume the '('

        let inner = self.parse_flow(depth + 1)?;
        match self.consume() {
            Some(Token::CloseParen) => {}
            _ => return Err(ParseError::UnbalancedParen),
        }

        if inner.is_empty() {
            return Err(ParseError::EmptyGroup);
        }
        Ok(Node::Group(inner))
    }
}

/// Parses a raw command line into a [`Flow`].
///
/// An empty or blank line yields an empty flow. Pipes are accepted here and
/// rejected by [`Flow::ensure_supported`] before execution.
pub fn parse(line: &str) -> Result<Flow, ParseError> {
    let tokens = lexer::split_into_tokens(line)?;
    FlowBuilder::from(tokens).build_flow()
}
