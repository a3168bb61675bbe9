pub mod ast;

use crate::errors::{CompileError, ErrorCode, SourceFile, SourceLocation};
use crate::lexer::{Token, TokenInfo};
use ast::*;
use std::collections::HashSet;

pub struct Parser {
    tokens: Vec<TokenInfo>,
    pos: usize,
    source_file: Option<SourceFile>,
    /// Struct names seen so far, so `Point p;` can be told apart from an
    /// expression statement starting with an identifier.
    struct_names: HashSet<String>,
}

impl Parser {
    pub fn new(tokens: Vec<TokenInfo>) -> Self {
        Parser {
            tokens,
            pos: 0,
            source_file: None,
            struct_names: HashSet::new(),
        }
    }

    pub fn with_source(mut self, filename: &str, content: &str) -> Self {
        self.source_file = Some(SourceFile::new(filename, content));
        self
    }

    fn current(&self) -> &Token {
        self.tokens.get(self.pos).map(|t| &t.token).unwrap_or(&Token::Eof)
    }

    fn current_info(&self) -> Option<&TokenInfo> {
        self.tokens.get(self.pos)
    }

    fn current_position(&self) -> (usize, usize) {
        self.current_info().map(|t| (t.line, t.column)).unwrap_or((0, 0))
    }

    fn current_location(&self) -> Option<SourceLocation> {
        if let (Some(info), Some(ref src)) = (self.current_info(), &self.source_file) {
            Some(src.make_location(info.line, info.column))
        } else {
            None
        }
    }

    fn err(&self, code: ErrorCode, message: &str) -> CompileError {
        let mut err = CompileError::new(code, message);
        if let Some(loc) = self.current_location() {
            err = err.with_location(loc);
        }
        err
    }

    fn err_expected(&self, expected: &str) -> CompileError {
        self.err(
            ErrorCode::UnexpectedToken,
            &format!("expected {}, got {:?}", expected, self.current()),
        )
    }

    fn peek(&self, offset: usize) -> &Token {
        self.tokens
            .get(self.pos + offset)
            .map(|t| &t.token)
            .unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) -> Token {
        let tok = self.current().clone();
        self.pos += 1;
        tok
    }

    fn expect(&mut self, expected: &Token, what: &str) -> Result<(), CompileError> {
        if self.current() == expected {
            self.advance();
            Ok(())
        } else {
            Err(self.err_expected(what))
        }
    }

    fn expect_identifier(&mut self, what: &str) -> Result<String, CompileError> {
        match self.current().clone() {
            Token::Identifier(name) => {
                self.advance();
                Ok(name)
            }
            _ => Err(self.err_expected(what)),
        }
    }

    pub fn parse(&mut self) -> Result<Program, CompileError> {
        let mut statements = Vec::new();
        while *self.current() != Token::Eof {
            statements.push(self.parse_statement()?);
        }
        Ok(Program { statements })
    }

    fn parse_statement(&mut self) -> Result<Statement, CompileError> {
        match self.current() {
            Token::Int | Token::Float | Token::Bool | Token::Str => self.parse_var_decl(),
            Token::Struct => self.parse_struct_def(),
            Token::Fn => self.parse_function_def(),
            Token::Return => self.parse_return(),
            Token::At => self.parse_loop(),
            Token::LBrace => Ok(Statement::Block(self.parse_block()?)),
            Token::Identifier(name)
                if self.struct_names.contains(name)
                    && matches!(self.peek(1), Token::Identifier(_)) =>
            {
                self.parse_struct_var_decl()
            }
            _ => self.parse_expr_statement(),
        }
    }

    fn parse_prim_type(&mut self) -> Result<Type, CompileError> {
        let ty = match self.current() {
            Token::Int => Type::Int,
            Token::Float => Type::Float,
            Token::Bool => Type::Bool,
            Token::Str => Type::Str,
            _ => return Err(self.err_expected("a type")),
        };
        self.advance();
        Ok(ty)
    }

    fn parse_var_decl(&mut self) -> Result<Statement, CompileError> {
        let (line, column) = self.current_position();
        let ty = self.parse_prim_type()?;
        let name = self.expect_identifier("a variable name")?;

        let init = if *self.current() == Token::Assign {
            self.advance();
            Some(self.parse_expression()?)
        } else {
            None
        };

        self.expect(&Token::Semicolon, "';' after declaration")?;
        Ok(Statement::VarDecl { name, ty, init, line, column })
    }

    fn parse_struct_var_decl(&mut self) -> Result<Statement, CompileError> {
        let (line, column) = self.current_position();
        let struct_name = self.expect_identifier("a struct name")?;
        let name = self.expect_identifier("a variable name")?;
        self.expect(&Token::Semicolon, "';' after declaration")?;
        Ok(Statement::StructVarDecl { name, struct_name, line, column })
    }

    fn parse_struct_def(&mut self) -> Result<Statement, CompileError> {
        let (line, column) = self.current_position();
        self.advance(); // struct
        let name = self.expect_identifier("a struct name")?;
        self.expect(&Token::LBrace, "'{' after struct name")?;

        let mut fields = Vec::new();
        while *self.current() != Token::RBrace {
            let ty = self.parse_prim_type()?;
            let field_name = self.expect_identifier("a field name")?;
            self.expect(&Token::Semicolon, "';' after field")?;
            fields.push(Field { name: field_name, ty });
        }
        self.advance(); // }

        self.struct_names.insert(name.clone());
        Ok(Statement::StructDef { name, fields, line, column })
    }

    fn parse_function_def(&mut self) -> Result<Statement, CompileError> {
        let (line, column) = self.current_position();
        self.advance(); // fn
        let name = self.expect_identifier("a function name")?;
        self.expect(&Token::LParen, "'(' after function name")?;

        let mut params = Vec::new();
        if *self.current() != Token::RParen {
            loop {
                let ty = self.parse_prim_type()?;
                let param_name = self.expect_identifier("a parameter name")?;
                params.push(Param { name: param_name, ty });
                if *self.current() == Token::Comma {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.expect(&Token::RParen, "')' after parameters")?;

        let return_type = if *self.current() == Token::Arrow {
            self.advance();
            self.parse_prim_type()?
        } else {
            Type::Void
        };

        let body = self.parse_block()?;
        Ok(Statement::FunctionDef { name, params, return_type, body, line, column })
    }

    fn parse_return(&mut self) -> Result<Statement, CompileError> {
        self.advance(); // return
        let value = if *self.current() != Token::Semicolon {
            Some(self.parse_expression()?)
        } else {
            None
        };
        self.expect(&Token::Semicolon, "';' after return")?;
        Ok(Statement::Return { value })
    }

    fn parse_loop(&mut self) -> Result<Statement, CompileError> {
        self.advance(); // @
        let condition = self.parse_expression()?;
        let body = self.parse_block()?;
        Ok(Statement::Loop { condition, body })
    }

    fn parse_block(&mut self) -> Result<Vec<Statement>, CompileError> {
        self.expect(&Token::LBrace, "'{'")?;
        let mut statements = Vec::new();
        while *self.current() != Token::RBrace {
            if *self.current() == Token::Eof {
                return Err(self.err_expected("'}'"));
            }
            statements.push(self.parse_statement()?);
        }
        self.advance(); // }
        Ok(statements)
    }

    /// A statement that starts with an expression: plain assignment, compound
    /// assignment, the `cond ? { .. } : { .. }` conditional, or an expression
    /// evaluated for effect. Non-lvalue assignment targets are accepted here
    /// and rejected by the analyzer so the diagnostic carries the right code.
    fn parse_expr_statement(&mut self) -> Result<Statement, CompileError> {
        let expr = self.parse_expression()?;

        match self.current() {
            Token::Assign => {
                self.advance();
                let value = self.parse_expression()?;
                self.expect(&Token::Semicolon, "';' after assignment")?;
                Ok(Statement::Assignment { target: expr, value })
            }
            Token::PlusAssign
            | Token::MinusAssign
            | Token::StarAssign
            | Token::SlashAssign
            | Token::PercentAssign => {
                let op = match self.advance() {
                    Token::PlusAssign => BinaryOperator::Add,
                    Token::MinusAssign => BinaryOperator::Subtract,
                    Token::StarAssign => BinaryOperator::Multiply,
                    Token::SlashAssign => BinaryOperator::Divide,
                    _ => BinaryOperator::Modulo,
                };
                let value = self.parse_expression()?;
                self.expect(&Token::Semicolon, "';' after assignment")?;
                Ok(Statement::CompoundAssignment { target: expr, op, value })
            }
            Token::Question => {
                self.advance();
                let then_block = self.parse_block()?;
                let else_block = if *self.current() == Token::Colon {
                    self.advance();
                    Some(self.parse_block()?)
                } else {
                    None
                };
                Ok(Statement::Conditional { condition: expr, then_block, else_block })
            }
            Token::Semicolon => {
                self.advance();
                Ok(Statement::Expression(expr))
            }
            _ => Err(self.err_expected("';', '?', or an assignment operator")),
        }
    }

    pub fn parse_expression(&mut self) -> Result<Expr, CompileError> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr, CompileError> {
        let mut left = self.parse_and()?;
        while *self.current() == Token::OrOr {
            self.advance();
            let right = self.parse_and()?;
            left = Expr::BinaryOp {
                left: Box::new(left),
                op: BinaryOperator::Or,
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, CompileError> {
        let mut left = self.parse_equality()?;
        while *self.current() == Token::AndAnd {
            self.advance();
            let right = self.parse_equality()?;
            left = Expr::BinaryOp {
                left: Box::new(left),
                op: BinaryOperator::And,
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr, CompileError> {
        let mut left = self.parse_relational()?;
        loop {
            let op = match self.current() {
                Token::EqEq => BinaryOperator::Equal,
                Token::NotEq => BinaryOperator::NotEqual,
                _ => break,
            };
            self.advance();
            let right = self.parse_relational()?;
            left = Expr::BinaryOp { left: Box::new(left), op, right: Box::new(right) };
        }
        Ok(left)
    }

    fn parse_relational(&mut self) -> Result<Expr, CompileError> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.current() {
                Token::Less => BinaryOperator::Less,
                Token::LessEq => BinaryOperator::LessEqual,
                Token::Greater => BinaryOperator::Greater,
                Token::GreaterEq => BinaryOperator::GreaterEqual,
                _ => break,
            };
            self.advance();
            let right = self.parse_additive()?;
            left = Expr::BinaryOp { left: Box::new(left), op, right: Box::new(right) };
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expr, CompileError> {
        let mut left = self.parse_term()?;
        loop {
            let op = match self.current() {
                Token::Plus => BinaryOperator::Add,
                Token::Minus => BinaryOperator::Subtract,
                _ => break,
            };
            self.advance();
            let right = self.parse_term()?;
            left = Expr::BinaryOp { left: Box::new(left), op, right: Box::new(right) };
        }
        Ok(left)
    }

    fn parse_term(&mut self) -> Result<Expr, CompileError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.current() {
                Token::Star => BinaryOperator::Multiply,
                Token::Slash => BinaryOperator::Divide,
                Token::Percent => BinaryOperator::Modulo,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = Expr::BinaryOp { left: Box::new(left), op, right: Box::new(right) };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, CompileError> {
        match self.current() {
            Token::Minus => {
                self.advance();
                let operand = self.parse_unary()?;
                Ok(Expr::UnaryOp { op: UnaryOperator::Negate, operand: Box::new(operand) })
            }
            Token::Bang => {
                self.advance();
                let operand = self.parse_unary()?;
                Ok(Expr::UnaryOp { op: UnaryOperator::Not, operand: Box::new(operand) })
            }
            Token::Plus => {
                self.advance();
                let operand = self.parse_unary()?;
                Ok(Expr::UnaryOp { op: UnaryOperator::Plus, operand: Box::new(operand) })
            }
            Token::PlusPlus | Token::MinusMinus => {
                let increment = *self.current() == Token::PlusPlus;
                self.advance();
                let target = self.parse_unary()?;
                Ok(Expr::IncDec { target: Box::new(target), increment, prefix: true })
            }
            _ => self.parse_postfix(),
        }
    }

    fn parse_postfix(&mut self) -> Result<Expr, CompileError> {
        let mut expr = self.parse_primary()?;

        loop {
            match self.current() {
                Token::Dot => {
                    let (line, column) = self.current_position();
                    self.advance();
                    let field = self.expect_identifier("a field name")?;
                    match expr {
                        Expr::Variable { name, .. } => {
                            expr = Expr::MemberAccess { base: name, field, line, column };
                        }
                        // Chained access (a.b.c) is not supported.
                        _ => {
                            return Err(self.err(
                                ErrorCode::InvalidExpression,
                                "member access requires a variable on the left of '.'",
                            ));
                        }
                    }
                }
                Token::PlusPlus | Token::MinusMinus => {
                    let increment = *self.current() == Token::PlusPlus;
                    self.advance();
                    expr = Expr::IncDec { target: Box::new(expr), increment, prefix: false };
                }
                _ => break,
            }
        }

        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, CompileError> {
        let (line, column) = self.current_position();
        match self.current().clone() {
            Token::IntLiteral(n) => {
                self.advance();
                Ok(Expr::IntLit(n))
            }
            Token::FloatLiteral(f) => {
                self.advance();
                Ok(Expr::FloatLit(f))
            }
            Token::StringLiteral(s) => {
                self.advance();
                Ok(Expr::StringLit(s))
            }
            Token::True => {
                self.advance();
                Ok(Expr::BoolLit(true))
            }
            Token::False => {
                self.advance();
                Ok(Expr::BoolLit(false))
            }
            Token::Identifier(name) => {
                self.advance();
                if *self.current() == Token::LParen {
                    self.advance();
                    let mut args = Vec::new();
                    if *self.current() != Token::RParen {
                        loop {
                            args.push(self.parse_expression()?);
                            if *self.current() == Token::Comma {
                                self.advance();
                            } else {
                                break;
                            }
                        }
                    }
                    self.expect(&Token::RParen, "')' after arguments")?;
                    Ok(Expr::FunctionCall { name, args, line, column })
                } else {
                    Ok(Expr::Variable { name, line, column })
                }
            }
            Token::LParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(&Token::RParen, "')'")?;
                Ok(expr)
            }
            _ => Err(self.err_expected("an expression")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;

    fn parse(source: &str) -> Program {
        let mut lexer = Lexer::new(source);
        let tokens = lexer.tokenize();
        assert!(lexer.errors.is_empty());
        Parser::new(tokens).parse().expect("parse failed")
    }

    #[test]
    fn test_var_decl_with_init() {
        let program = parse("int x = 5;");
        assert_eq!(program.statements.len(), 1);
        match &program.statements[0] {
            Statement::VarDecl { name, ty, init, .. } => {
                assert_eq!(name, "x");
                assert_eq!(*ty, Type::Int);
                assert!(matches!(init, Some(Expr::IntLit(5))));
            }
            other => panic!("unexpected statement: {:?}", other),
        }
    }

    #[test]
    fn test_loop_statement() {
        let program = parse("@ i > 0 { i -= 1; }");
        match &program.statements[0] {
            Statement::Loop { condition, body } => {
                assert!(matches!(condition, Expr::BinaryOp { .. }));
                assert_eq!(body.len(), 1);
                assert!(matches!(body[0], Statement::CompoundAssignment { .. }));
            }
            other => panic!("unexpected statement: {:?}", other),
        }
    }

    #[test]
    fn test_conditional_with_else() {
        let program = parse("x > 0 ? { print(x); } : { exit(1); }");
        match &program.statements[0] {
            Statement::Conditional { then_block, else_block, .. } => {
                assert_eq!(then_block.len(), 1);
                assert!(else_block.is_some());
            }
            other => panic!("unexpected statement: {:?}", other),
        }
    }

    #[test]
    fn test_function_def_and_call() {
        let program = parse("fn add(int a, int b) -> int { return a + b; } int r = add(4, 5);");
        match &program.statements[0] {
            Statement::FunctionDef { name, params, return_type, body, .. } => {
                assert_eq!(name, "add");
                assert_eq!(params.len(), 2);
                assert_eq!(*return_type, Type::Int);
                assert_eq!(body.len(), 1);
            }
            other => panic!("unexpected statement: {:?}", other),
        }
        match &program.statements[1] {
            Statement::VarDecl { init: Some(Expr::FunctionCall { name, args, .. }), .. } => {
                assert_eq!(name, "add");
                assert_eq!(args.len(), 2);
            }
            other => panic!("unexpected statement: {:?}", other),
        }
    }

    #[test]
    fn test_struct_def_and_member_assignment() {
        let program = parse("struct Point { int x; int y; } Point p; p.x = 3;");
        assert!(matches!(program.statements[0], Statement::StructDef { .. }));
        assert!(matches!(program.statements[1], Statement::StructVarDecl { .. }));
        match &program.statements[2] {
            Statement::Assignment { target: Expr::MemberAccess { base, field, .. }, .. } => {
                assert_eq!(base, "p");
                assert_eq!(field, "x");
            }
            other => panic!("unexpected statement: {:?}", other),
        }
    }

    #[test]
    fn test_precedence() {
        let program = parse("bool ok = (2 * 3) == 6 && !(1 > 2);");
        match &program.statements[0] {
            Statement::VarDecl { init: Some(Expr::BinaryOp { op, .. }), .. } => {
                assert_eq!(*op, BinaryOperator::And);
            }
            other => panic!("unexpected statement: {:?}", other),
        }
    }

    #[test]
    fn test_postfix_increment_statement() {
        let program = parse("i++;");
        match &program.statements[0] {
            Statement::Expression(Expr::IncDec { increment, prefix, .. }) => {
                assert!(*increment);
                assert!(!*prefix);
            }
            other => panic!("unexpected statement: {:?}", other),
        }
    }

    #[test]
    fn test_assignment_to_literal_parses() {
        // The analyzer, not the parser, rejects this with
        // INVALID_ASSIGNMENT_TARGET.
        let program = parse("5 = x;");
        assert!(matches!(
            program.statements[0],
            Statement::Assignment { target: Expr::IntLit(5), .. }
        ));
    }
}
