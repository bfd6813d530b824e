use std::str::Bytes;

use super::{
    ast::{ASTNode, Expression, Function, Prototype},
    lexer::{Scanner, Token},
    precedence::PrecedenceTable,
};

pub const DEFAULT_MAX_DEPTH: usize = 512;

#[derive(Debug, PartialEq, Clone, thiserror::Error)]
pub enum ParseError {
    #[error("unknown token when expecting an expression")]
    ExpectedExpression,
    #[error("Expected ')' or ',' in argument list")]
    ExpectedArgSeparator,
    #[error("expected ')'")]
    ExpectedCloseParen,
    #[error("Expected function name in prototype")]
    ExpectedFunctionName,
    #[error("Expected '(' in prototype")]
    ExpectedPrototypeOpen,
    #[error("Expected ')' in prototype")]
    ExpectedPrototypeClose,
    #[error("expression nesting exceeds {0} levels")]
    TooDeep(usize),
}

pub type PartialParseResult = Result<Expression, ParseError>;

/// Recursive descent parser with one token of lookahead in `current`.
///
/// Every `parse_*` method expects `current` to sit on the first token of its
/// construct and, on success, leaves it on the token right after. Nothing is
/// rewound on failure.
#[derive(Debug, Clone)]
pub struct Parser<I> {
    scanner: Scanner<I>,
    current: Token,
    operator_precedence: PrecedenceTable,
    max_depth: usize,
    depth: usize,
}

impl<I: Iterator<Item = u8>> Parser<I> {
    /// The first token is not read until [`Parser::advance`] is called.
    pub fn new(scanner: Scanner<I>) -> Self {
        Self {
            scanner,
            current: Token::Eof,
            operator_precedence: PrecedenceTable::default(),
            max_depth: DEFAULT_MAX_DEPTH,
            depth: 0,
        }
    }

    pub fn with_precedence(mut self, operator_precedence: PrecedenceTable) -> Self {
        self.operator_precedence = operator_precedence;
        self
    }

    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn current(&self) -> &Token {
        &self.current
    }

    pub fn advance(&mut self) -> &Token {
        self.current = self.scanner.next_token();
        &self.current
    }

    pub fn into_scanner(self) -> Scanner<I> {
        self.scanner
    }

    /// one level deeper into the tree being built, parens and operators alike
    fn enter(&mut self) -> Result<(), ParseError> {
        if self.depth >= self.max_depth {
            return Err(ParseError::TooDeep(self.max_depth));
        }
        self.depth += 1;
        Ok(())
    }

    fn current_precedence(&self) -> i32 {
        self.operator_precedence.precedence(&self.current)
    }

    fn parse_number(&mut self, value: f64) -> PartialParseResult {
        self.advance();
        Ok(Expression::Number(value))
    }

    fn parse_identifier(&mut self, ident: String) -> PartialParseResult {
        if self.advance() != &Token::Char('(') {
            return Ok(Expression::Variable(ident));
        }
        self.advance();

        let mut args = Vec::new();
        if self.current != Token::Char(')') {
            loop {
                args.push(self.parse_expr()?);

                match self.current {
                    Token::Char(')') => break,
                    Token::Char(',') => self.advance(),
                    _ => return Err(ParseError::ExpectedArgSeparator),
                };
            }
        }
        self.advance();

        Ok(Expression::Call(ident, args))
    }

    fn parse_nested(&mut self) -> PartialParseResult {
        self.advance();
        let res = self.parse_expr()?;
        if self.current != Token::Char(')') {
            return Err(ParseError::ExpectedCloseParen);
        }
        self.advance();
        Ok(res)
    }

    fn parse_primary(&mut self) -> PartialParseResult {
        match self.current {
            Token::Number(value) => self.parse_number(value),
            Token::Ident(ref ident) => {
                let ident = ident.clone();
                self.parse_identifier(ident)
            }
            Token::Char('(') => self.parse_nested(),
            _ => Err(ParseError::ExpectedExpression),
        }
    }

    /// Precedence climbing. Folds `op primary` pairs onto `lhs` for as long as
    /// the operator binds at least as tightly as `expr_precedence`. Only a
    /// strictly tighter operator after the right hand side takes that side for
    /// itself, so equal precedences group to the left (`^` included).
    fn parse_rhs(&mut self, expr_precedence: i32, lhs: Expression) -> PartialParseResult {
        let mut result = lhs;

        loop {
            let precedence = self.current_precedence();
            if precedence < expr_precedence {
                return Ok(result);
            }

            let operator = match self.current {
                Token::Char(op) => op,
                // only single characters have a precedence
                _ => return Ok(result),
            };
            // each fold makes a left-deep chain one node taller
            self.enter()?;
            self.advance();

            let mut rhs = self.parse_primary()?;

            if precedence < self.current_precedence() {
                rhs = self.parse_rhs(precedence + 1, rhs)?;
            }

            result = Expression::Binary(operator, Box::new(result), Box::new(rhs));
        }
    }

    pub fn parse_expr(&mut self) -> PartialParseResult {
        let depth = self.depth;
        let res = self
            .enter()
            .and_then(|_| self.parse_primary())
            .and_then(|lhs| self.parse_rhs(0, lhs));
        self.depth = depth;
        res
    }

    pub fn parse_prototype(&mut self) -> Result<Prototype, ParseError> {
        let name = match self.current {
            Token::Ident(ref name) => name.clone(),
            _ => return Err(ParseError::ExpectedFunctionName),
        };

        if self.advance() != &Token::Char('(') {
            return Err(ParseError::ExpectedPrototypeOpen);
        }

        let mut args = Vec::new();
        while let Token::Ident(arg) = self.advance() {
            args.push(arg.clone());
        }
        if self.current != Token::Char(')') {
            return Err(ParseError::ExpectedPrototypeClose);
        }
        self.advance();

        Ok(Prototype { name, args })
    }

    /// `def` prototype expression
    pub fn parse_definition(&mut self) -> Result<Function, ParseError> {
        self.advance();
        let prototype = self.parse_prototype()?;
        let body = self.parse_expr()?;
        Ok(Function { prototype, body })
    }

    /// `extern` prototype
    pub fn parse_extern(&mut self) -> Result<Prototype, ParseError> {
        self.advance();
        self.parse_prototype()
    }

    /// a bare expression, wrapped up as an anonymous function of no arguments
    pub fn parse_top_level_expr(&mut self) -> Result<Function, ParseError> {
        let body = self.parse_expr()?;
        Ok(Function {
            prototype: Prototype::anonymous(),
            body,
        })
    }

    /// Parse everything up to the end of input, stopping at the first error.
    /// Reads the first token itself; top-level semicolons are skipped.
    pub fn parse(&mut self) -> Result<Vec<ASTNode>, ParseError> {
        let mut ast = Vec::new();
        self.advance();

        loop {
            let node = match self.current {
                Token::Eof => break,
                Token::Char(';') => {
                    self.advance();
                    continue;
                }
                Token::Def => ASTNode::Function(self.parse_definition()?),
                Token::Extern => ASTNode::Extern(self.parse_extern()?),
                _ => ASTNode::Function(self.parse_top_level_expr()?),
            };
            ast.push(node);
        }

        Ok(ast)
    }
}

impl<'a> Parser<Bytes<'a>> {
    pub fn for_str(input: &'a str) -> Self {
        Self::new(Scanner::for_str(input))
    }
}

/// parse a complete source string with the default operators
pub fn parse_str(input: &str) -> Result<Vec<ASTNode>, ParseError> {
    Parser::for_str(input).parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn primed(input: &str) -> Parser<Bytes<'_>> {
        let mut parser = Parser::for_str(input);
        parser.advance();
        parser
    }

    fn expr(input: &str) -> PartialParseResult {
        primed(input).parse_expr()
    }

    fn num(value: f64) -> Box<Expression> {
        Box::new(Expression::Number(value))
    }

    fn var(name: &str) -> Box<Expression> {
        Box::new(Expression::Variable(name.to_string()))
    }

    fn bin(op: char, lhs: Box<Expression>, rhs: Box<Expression>) -> Box<Expression> {
        Box::new(Expression::Binary(op, lhs, rhs))
    }

    #[test]
    fn parse_expr_works() {
        let res = expr("x + 1 * (2 - 3)").unwrap();
        let target = bin('+', var("x"), bin('*', num(1.0), bin('-', num(2.0), num(3.0))));
        assert_eq!(res, *target);
    }

    #[test]
    fn multiplication_binds_tighter() {
        assert_eq!(
            expr("1+2*3").unwrap(),
            *bin('+', num(1.0), bin('*', num(2.0), num(3.0)))
        );
        assert_eq!(
            expr("1*2+3").unwrap(),
            *bin('+', bin('*', num(1.0), num(2.0)), num(3.0))
        );
    }

    #[test]
    fn equal_precedence_groups_left() {
        assert_eq!(
            expr("2^3^2").unwrap(),
            *bin('^', bin('^', num(2.0), num(3.0)), num(2.0))
        );
        assert_eq!(expr("a-b-c").unwrap().to_string(), "(- (- a b) c)");
        assert_eq!(expr("a/b*c%d").unwrap().to_string(), "(% (* (/ a b) c) d)");
    }

    #[test]
    fn mixed_precedence_levels() {
        assert_eq!(
            expr("a < b + c * d ^ e").unwrap().to_string(),
            "(< a (+ b (* c (^ d e))))"
        );
        assert_eq!(
            expr("a ^ b * c + d < e").unwrap().to_string(),
            "(< (+ (* (^ a b) c) d) e)"
        );
        assert_eq!(
            expr("a + b * c - d").unwrap().to_string(),
            "(- (+ a (* b c)) d)"
        );
    }

    #[test]
    fn parens_do_not_make_nodes() {
        assert_eq!(expr("(((x)))").unwrap(), Expression::Variable("x".to_string()));
        assert_eq!(expr("(1+2)*3").unwrap().to_string(), "(* (+ 1 2) 3)");
    }

    #[test]
    fn calls() {
        assert_eq!(
            expr("foo(1,2,3)").unwrap(),
            Expression::Call(
                "foo".to_string(),
                vec![
                    Expression::Number(1.0),
                    Expression::Number(2.0),
                    Expression::Number(3.0),
                ]
            )
        );
        assert_eq!(expr("foo()").unwrap(), Expression::Call("foo".to_string(), vec![]));
        assert_eq!(
            expr("f(g(x), y+1) * 2").unwrap().to_string(),
            "(* (f (g x) (+ y 1)) 2)"
        );
    }

    #[test]
    fn expression_stops_before_non_operator() {
        let mut parser = primed("a + b ; c");
        assert_eq!(parser.parse_expr().unwrap().to_string(), "(+ a b)");
        assert_eq!(parser.current(), &Token::Char(';'));

        // '>' has no precedence, so it ends the expression
        let mut parser = primed("a > b");
        assert_eq!(parser.parse_expr().unwrap(), *var("a"));
        assert_eq!(parser.current(), &Token::Char('>'));
    }

    #[test]
    fn expression_errors() {
        assert_eq!(expr("(1+2"), Err(ParseError::ExpectedCloseParen));
        assert_eq!(expr(")"), Err(ParseError::ExpectedExpression));
        assert_eq!(expr("1 +"), Err(ParseError::ExpectedExpression));
        assert_eq!(expr("def"), Err(ParseError::ExpectedExpression));
        assert_eq!(expr("foo(1 2)"), Err(ParseError::ExpectedArgSeparator));
        assert_eq!(expr("foo(1,"), Err(ParseError::ExpectedExpression));
        assert_eq!(expr("foo(1"), Err(ParseError::ExpectedArgSeparator));
    }

    #[test]
    fn failure_leaves_lookahead_at_offending_token() {
        let mut parser = primed("foo(1 2)");
        assert!(parser.parse_expr().is_err());
        assert_eq!(parser.current(), &Token::Number(2.0));
    }

    #[test]
    fn prototypes() {
        let mut parser = primed("foo(a b a) rest");
        assert_eq!(
            parser.parse_prototype().unwrap(),
            Prototype {
                name: "foo".to_string(),
                args: vec!["a".to_string(), "b".to_string(), "a".to_string()],
            }
        );
        assert_eq!(parser.current(), &Token::Ident("rest".to_string()));

        assert_eq!(primed("f()").parse_prototype().unwrap().args.len(), 0);
        assert_eq!(primed("(a)").parse_prototype(), Err(ParseError::ExpectedFunctionName));
        assert_eq!(primed("f a)").parse_prototype(), Err(ParseError::ExpectedPrototypeOpen));
        assert_eq!(primed("f(a, b)").parse_prototype(), Err(ParseError::ExpectedPrototypeClose));
        assert_eq!(primed("f(a").parse_prototype(), Err(ParseError::ExpectedPrototypeClose));
    }

    #[test]
    fn definitions_and_externs() {
        let mut parser = primed("def add(a b) a + b");
        let func = parser.parse_definition().unwrap();
        assert_eq!(func.prototype.name, "add");
        assert_eq!(func.body, *bin('+', var("a"), var("b")));
        assert_eq!(parser.current(), &Token::Eof);

        let mut parser = primed("extern sin(x)");
        assert_eq!(
            parser.parse_extern().unwrap(),
            Prototype {
                name: "sin".to_string(),
                args: vec!["x".to_string()],
            }
        );

        assert_eq!(primed("def foo(x)").parse_definition(), Err(ParseError::ExpectedExpression));
        assert_eq!(primed("extern 1").parse_extern(), Err(ParseError::ExpectedFunctionName));
    }

    #[test]
    fn top_level_expr_is_anonymous() {
        let func = primed("1 + x").parse_top_level_expr().unwrap();
        assert!(func.prototype.is_anonymous());
        assert!(func.prototype.args.is_empty());
        assert_eq!(func.body.to_string(), "(+ 1 x)");
    }

    #[test]
    fn parse_whole_program() {
        let ast = parse_str("extern sin(x); def thing(x) sin(x) * x;; thing(2)").unwrap();
        let printed: Vec<String> = ast.iter().map(ToString::to_string).collect();
        assert_eq!(
            printed,
            vec![
                "(extern sin(x))",
                "(def thing(x) (* (sin x) x))",
                "(def __anon_expr() (thing 2))",
            ]
        );
        assert!(parse_str("  # nothing\n;;").unwrap().is_empty());
        assert_eq!(parse_str("def 1"), Err(ParseError::ExpectedFunctionName));
    }

    #[test]
    fn nesting_limit() {
        let deep = format!("{}1{}", "(".repeat(10), ")".repeat(10));
        assert_eq!(primed(&deep).max_depth(11).parse_expr(), Ok(Expression::Number(1.0)));
        assert_eq!(primed(&deep).max_depth(10).parse_expr(), Err(ParseError::TooDeep(10)));

        // depth is restored after a failure
        let mut parser = primed("(((x) 1; y").max_depth(4);
        assert!(parser.parse_expr().is_err());
        parser.advance();
        parser.advance();
        assert_eq!(parser.parse_expr(), Ok(*var("y")));
    }

    #[test]
    fn operator_chain_counts_toward_limit() {
        assert_eq!(
            primed("a+b+c+d").max_depth(4).parse_expr().unwrap().to_string(),
            "(+ (+ (+ a b) c) d)"
        );
        let mut parser = primed("a+b+c+d").max_depth(3);
        assert_eq!(parser.parse_expr(), Err(ParseError::TooDeep(3)));
        // stopped before eating the third operator
        assert_eq!(parser.current(), &Token::Char('+'));

        // folds inside parens are released once the parens close
        assert_eq!(
            primed("(a+b)+(c+d)").max_depth(4).parse_expr().unwrap().to_string(),
            "(+ (+ a b) (+ c d))"
        );
    }

    #[test]
    fn custom_operators() {
        let mut table = PrecedenceTable::empty();
        table.install('>', 10).unwrap();
        table.install('&', 30).unwrap();
        let mut parser = Parser::for_str("a > b & c + d").with_precedence(table);
        parser.advance();
        assert_eq!(parser.parse_expr().unwrap().to_string(), "(> a (& b c))");
        assert_eq!(parser.current(), &Token::Char('+'));
    }
}
