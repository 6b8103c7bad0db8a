//! Recursive-descent parser over the lexer's single token of lookahead.
//!
//! Classes are resolved while parsing: a `class` definition registers its
//! `Rc<Class>` before the method bodies are read, so methods may
//! instantiate the class they belong to, and `Name(args)` expressions
//! resolve to `NewInstance` nodes immediately. Calls on a single bare name
//! are therefore either `str(x)` or the instantiation of a known class;
//! free functions do not exist in the language.

use std::collections::HashMap;
use std::rc::Rc;

use anyhow::{Result, anyhow, bail, ensure};

use crate::ast::{BinaryOperator, Comparator, Statement};
use crate::lexer::Lexer;
use crate::runtime::{Class, Method};
use crate::token::TokenKind;

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    classes: HashMap<String, Rc<Class>>,
}

impl<'a> Parser<'a> {
    pub fn new(lexer: Lexer<'a>) -> Self {
        Self {
            lexer,
            classes: HashMap::new(),
        }
    }

    /// Parses the whole program into its root `Compound`.
    pub fn parse_program(mut self) -> Result<Statement> {
        let mut statements = Vec::new();
        while !matches!(self.current(), TokenKind::Eof) {
            if self.eat(&TokenKind::Newline)? {
                continue;
            }
            statements.push(self.parse_statement(false)?);
        }
        Ok(Statement::Compound { statements })
    }

    fn parse_statement(&mut self, in_method: bool) -> Result<Statement> {
        match self.current() {
            TokenKind::Class => self.parse_class_definition(),
            TokenKind::If => self.parse_if(in_method),
            TokenKind::Return => self.parse_return(in_method),
            TokenKind::Print => self.parse_print(),
            TokenKind::Def => Err(self.error("a statement ('def' is only valid inside a class)")),
            _ => {
                let expr = self.parse_expression()?;
                if self.eat(&TokenKind::Char('='))? {
                    let rhs = self.parse_expression()?;
                    self.expect(&TokenKind::Newline, "newline")?;
                    return into_assignment(expr, rhs);
                }
                self.expect(&TokenKind::Newline, "newline")?;
                Ok(expr)
            }
        }
    }

    fn parse_class_definition(&mut self) -> Result<Statement> {
        self.expect(&TokenKind::Class, "class")?;
        let name = self.expect_id()?;

        let parent = if self.eat(&TokenKind::Char('('))? {
            let parent_name = self.expect_id()?;
            let parent = self
                .classes
                .get(&parent_name)
                .cloned()
                .ok_or_else(|| anyhow!("Unknown base class '{parent_name}' for class '{name}'"))?;
            self.expect(&TokenKind::Char(')'), ")")?;
            Some(parent)
        } else {
            None
        };

        self.expect(&TokenKind::Char(':'), ":")?;
        self.expect(&TokenKind::Newline, "newline")?;
        self.expect(&TokenKind::Indent, "indent")?;

        // Register the class before its methods parse so the bodies can
        // instantiate it.
        let class = Class::declare(name.clone(), parent);
        self.classes.insert(name.clone(), Rc::clone(&class));

        let mut methods = Vec::new();
        while !matches!(self.current(), TokenKind::Dedent | TokenKind::Eof) {
            methods.push(self.parse_method()?);
        }
        self.expect(&TokenKind::Dedent, "dedent")?;

        ensure!(
            class.define_methods(methods),
            "Method table of class '{name}' defined twice"
        );
        Ok(Statement::ClassDefinition { class })
    }

    fn parse_method(&mut self) -> Result<Method> {
        self.expect(&TokenKind::Def, "def")?;
        let name = self.expect_id()?;
        self.expect(&TokenKind::Char('('), "(")?;

        let first = self.expect_id()?;
        ensure!(
            first == "self",
            "First parameter of method '{name}' must be 'self', got '{first}'"
        );
        let mut formal_params = Vec::new();
        while self.eat(&TokenKind::Char(','))? {
            formal_params.push(self.expect_id()?);
        }
        self.expect(&TokenKind::Char(')'), ")")?;
        self.expect(&TokenKind::Char(':'), ":")?;

        let body = self.parse_suite(true)?;
        Ok(Method {
            name,
            formal_params,
            body: Statement::MethodBody {
                body: Box::new(body),
            },
        })
    }

    fn parse_suite(&mut self, in_method: bool) -> Result<Statement> {
        self.expect(&TokenKind::Newline, "newline")?;
        self.expect(&TokenKind::Indent, "indent")?;

        let mut statements = Vec::new();
        while !matches!(self.current(), TokenKind::Dedent | TokenKind::Eof) {
            statements.push(self.parse_statement(in_method)?);
        }
        self.expect(&TokenKind::Dedent, "dedent")?;
        Ok(Statement::Compound { statements })
    }

    fn parse_if(&mut self, in_method: bool) -> Result<Statement> {
        self.expect(&TokenKind::If, "if")?;
        let condition = self.parse_expression()?;
        self.expect(&TokenKind::Char(':'), ":")?;
        let if_body = self.parse_suite(in_method)?;

        let else_body = if self.eat(&TokenKind::Else)? {
            self.expect(&TokenKind::Char(':'), ":")?;
            Some(Box::new(self.parse_suite(in_method)?))
        } else {
            None
        };

        Ok(Statement::IfElse {
            condition: Box::new(condition),
            if_body: Box::new(if_body),
            else_body,
        })
    }

    fn parse_return(&mut self, in_method: bool) -> Result<Statement> {
        if !in_method {
            return Err(self.error("a statement ('return' is only valid inside a method)"));
        }
        self.expect(&TokenKind::Return, "return")?;
        let statement = if matches!(self.current(), TokenKind::Newline) {
            Statement::None
        } else {
            self.parse_expression()?
        };
        self.expect(&TokenKind::Newline, "newline")?;
        Ok(Statement::Return {
            statement: Box::new(statement),
        })
    }

    fn parse_print(&mut self) -> Result<Statement> {
        self.expect(&TokenKind::Print, "print")?;
        let mut args = Vec::new();
        if !matches!(self.current(), TokenKind::Newline) {
            args.push(self.parse_expression()?);
            while self.eat(&TokenKind::Char(','))? {
                args.push(self.parse_expression()?);
            }
        }
        self.expect(&TokenKind::Newline, "newline")?;
        Ok(Statement::Print { args })
    }

    fn parse_expression(&mut self) -> Result<Statement> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Statement> {
        let mut expr = self.parse_and()?;
        while self.eat(&TokenKind::Or)? {
            let rhs = self.parse_and()?;
            expr = Statement::Or {
                lhs: Box::new(expr),
                rhs: Box::new(rhs),
            };
        }
        Ok(expr)
    }

    fn parse_and(&mut self) -> Result<Statement> {
        let mut expr = self.parse_not()?;
        while self.eat(&TokenKind::And)? {
            let rhs = self.parse_not()?;
            expr = Statement::And {
                lhs: Box::new(expr),
                rhs: Box::new(rhs),
            };
        }
        Ok(expr)
    }

    fn parse_not(&mut self) -> Result<Statement> {
        if self.eat(&TokenKind::Not)? {
            let argument = self.parse_not()?;
            return Ok(Statement::Not {
                argument: Box::new(argument),
            });
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Statement> {
        let lhs = self.parse_additive()?;
        let cmp = match self.current() {
            TokenKind::Eq => Comparator::Equal,
            TokenKind::NotEq => Comparator::NotEqual,
            TokenKind::Char('<') => Comparator::Less,
            TokenKind::Char('>') => Comparator::Greater,
            TokenKind::LessOrEq => Comparator::LessOrEqual,
            TokenKind::GreaterOrEq => Comparator::GreaterOrEqual,
            _ => return Ok(lhs),
        };
        self.advance()?;
        let rhs = self.parse_additive()?;
        Ok(Statement::Comparison {
            cmp,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    fn parse_additive(&mut self) -> Result<Statement> {
        let mut expr = self.parse_multiplicative()?;
        loop {
            let op = match self.current() {
                TokenKind::Char('+') => BinaryOperator::Add,
                TokenKind::Char('-') => BinaryOperator::Sub,
                _ => break,
            };
            self.advance()?;
            let rhs = self.parse_multiplicative()?;
            expr = Statement::BinaryOp {
                op,
                lhs: Box::new(expr),
                rhs: Box::new(rhs),
            };
        }
        Ok(expr)
    }

    fn parse_multiplicative(&mut self) -> Result<Statement> {
        let mut expr = self.parse_postfix()?;
        loop {
            let op = match self.current() {
                TokenKind::Char('*') => BinaryOperator::Mult,
                TokenKind::Char('/') => BinaryOperator::Div,
                _ => break,
            };
            self.advance()?;
            let rhs = self.parse_postfix()?;
            expr = Statement::BinaryOp {
                op,
                lhs: Box::new(expr),
                rhs: Box::new(rhs),
            };
        }
        Ok(expr)
    }

    fn parse_postfix(&mut self) -> Result<Statement> {
        let mut expr = self.parse_primary()?;
        loop {
            if matches!(self.current(), TokenKind::Char('(')) {
                expr = self.finish_call(expr)?;
            } else if matches!(self.current(), TokenKind::Char('.')) {
                self.advance()?;
                let name = self.expect_id()?;
                if matches!(self.current(), TokenKind::Char('(')) {
                    let args = self.parse_args()?;
                    expr = Statement::MethodCall {
                        object: Box::new(expr),
                        method: name,
                        args,
                    };
                } else {
                    let Statement::VariableValue { mut dotted_ids } = expr else {
                        return Err(self.error("( to call a method on this expression"));
                    };
                    dotted_ids.push(name);
                    expr = Statement::VariableValue { dotted_ids };
                }
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Statement> {
        match self.current() {
            TokenKind::Number(value) => {
                let value = *value;
                self.advance()?;
                Ok(Statement::Number(value))
            }
            TokenKind::String(value) => {
                let value = value.clone();
                self.advance()?;
                Ok(Statement::Str(value))
            }
            TokenKind::True => {
                self.advance()?;
                Ok(Statement::Bool(true))
            }
            TokenKind::False => {
                self.advance()?;
                Ok(Statement::Bool(false))
            }
            TokenKind::None => {
                self.advance()?;
                Ok(Statement::None)
            }
            TokenKind::Char('(') => {
                self.advance()?;
                let expr = self.parse_expression()?;
                self.expect(&TokenKind::Char(')'), ")")?;
                Ok(expr)
            }
            TokenKind::Id(name) => {
                let name = name.clone();
                self.advance()?;
                Ok(Statement::VariableValue {
                    dotted_ids: vec![name],
                })
            }
            _ => Err(self.error("an expression")),
        }
    }

    /// A call on a bare name: `str(x)` or the instantiation of a declared
    /// class.
    fn finish_call(&mut self, callee: Statement) -> Result<Statement> {
        let Statement::VariableValue { dotted_ids } = &callee else {
            return Err(self.error("a callable name"));
        };
        let [name] = dotted_ids.as_slice() else {
            return Err(self.error("a callable name"));
        };
        let name = name.clone();
        let mut args = self.parse_args()?;

        if name == "str" {
            ensure!(
                args.len() == 1,
                "str() takes exactly one argument, got {}",
                args.len()
            );
            let Some(argument) = args.pop() else {
                bail!("str() takes exactly one argument");
            };
            return Ok(Statement::Stringify {
                argument: Box::new(argument),
            });
        }

        if let Some(class) = self.classes.get(&name) {
            return Ok(Statement::NewInstance {
                class_name: name,
                class: Rc::downgrade(class),
                args,
            });
        }
        bail!("Unknown class or function '{name}'")
    }

    fn parse_args(&mut self) -> Result<Vec<Statement>> {
        self.expect(&TokenKind::Char('('), "(")?;
        let mut args = Vec::new();
        if !matches!(self.current(), TokenKind::Char(')')) {
            args.push(self.parse_expression()?);
            while self.eat(&TokenKind::Char(','))? {
                args.push(self.parse_expression()?);
            }
        }
        self.expect(&TokenKind::Char(')'), ")")?;
        Ok(args)
    }

    fn current(&self) -> &TokenKind {
        self.lexer.current().kind()
    }

    fn advance(&mut self) -> Result<()> {
        self.lexer.next_token()?;
        Ok(())
    }

    fn eat(&mut self, kind: &TokenKind) -> Result<bool> {
        if self.current() == kind {
            self.advance()?;
            return Ok(true);
        }
        Ok(false)
    }

    fn expect(&mut self, kind: &TokenKind, label: &str) -> Result<()> {
        if self.current() == kind {
            self.advance()?;
            return Ok(());
        }
        Err(self.error(label))
    }

    fn expect_id(&mut self) -> Result<String> {
        if let TokenKind::Id(name) = self.current() {
            let name = name.clone();
            self.advance()?;
            return Ok(name);
        }
        Err(self.error("an identifier"))
    }

    fn error(&self, expected: &str) -> anyhow::Error {
        anyhow!(
            "Expected {expected}, got {:?} at position {}",
            self.lexer.current().kind(),
            self.lexer.current().span().start
        )
    }
}

fn into_assignment(target: Statement, rhs: Statement) -> Result<Statement> {
    let Statement::VariableValue { mut dotted_ids } = target else {
        bail!("Assignment target must be a name or a field");
    };
    let Some(last) = dotted_ids.pop() else {
        bail!("Assignment target must be a name or a field");
    };
    if dotted_ids.is_empty() {
        return Ok(Statement::Assignment {
            name: last,
            rhs: Box::new(rhs),
        });
    }
    Ok(Statement::FieldAssignment {
        object: Box::new(Statement::VariableValue { dotted_ids }),
        field_name: last,
        rhs: Box::new(rhs),
    })
}

/// Tokenizes and parses a full source text.
pub fn parse_source(source: &str) -> Result<Statement> {
    let lexer = Lexer::new(source)?;
    Parser::new(lexer).parse_program()
}
