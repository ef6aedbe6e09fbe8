//! Converts sequences of tokens to an AST.
//!
//! The parser is a recursive descent over the token stream.
//! The [`parse`] function is the main entry point.
//!
//! Within the parser, the methods come in two flavors:
//! - `expect_X`: this method must match the next tokens in the stream,
//!   and if it does not, the program is invalid.
//! - `match_X`: this method may or may not match the next tokens in
//!   the stream. If it does not, it does nothing.

use std::collections::VecDeque;
use std::fmt::Display;
use std::rc::Rc;

use crate::ast::{self, PatErr};
use crate::err::{Cursor, CursorRange, FiaErr, FullFiaErr};
use crate::lexer::token::{token, FullToken, Token};

/// Parse a sequence of tokens into a program.
pub fn parse(tokens: impl IntoIterator<Item=FullToken>) -> ParseResult<ast::Program> {
    Parser::new(tokens).parse()
}

/// A struct that does the conversion of tokens to a parseable program tree.
pub struct Parser {
    tokens: VecDeque<FullToken>,
    eof: Cursor
}

/// An error that occurs in the parsing process.
#[derive(Debug, PartialEq, Eq)]
pub enum ParseErr {
    /// The parser expected one of the tokens.
    ExpectedTokens(Vec<Token>),

    /// The parser expected an identifier.
    ExpectedIdent,

    /// The parser expected an expression here.
    ExpectedExpr,

    /// The parser expected a statement here.
    ExpectedStmt,

    /// The parser expected a string literal here (e.g. for an import path).
    ExpectedStrLiteral,

    /// The parser expected a dict entry (a literal key and a value).
    ExpectedEntry,

    /// The string of the numeric token cannot be parsed into a number.
    CannotParseNumeric,

    /// The left side of an assignment cannot be assigned to.
    AsgPatErr(PatErr)
}

/// A [`Result`] type for operations in the parsing process.
pub type ParseResult<T> = Result<T, FullParseErr>;
/// A [`ParseErr`] with position information.
pub type FullParseErr = FullFiaErr<ParseErr>;

impl FiaErr for ParseErr {
    fn err_name(&self) -> &'static str {
        "erreur de syntaxe"
    }
}

impl Display for ParseErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseErr::ExpectedTokens(tokens) => match &tokens[..] {
                []  => f.write_str("jeton attendu"),
                [t] => write!(f, "'{t}' attendu"),
                _ => {
                    let ts = tokens.iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join("', '");
                    write!(f, "l'un de '{ts}' attendu")
                }
            },
            ParseErr::ExpectedIdent      => f.write_str("identifiant attendu"),
            ParseErr::ExpectedExpr       => f.write_str("expression attendue"),
            ParseErr::ExpectedStmt       => f.write_str("instruction attendue"),
            ParseErr::ExpectedStrLiteral => f.write_str("chaîne de caractères attendue"),
            ParseErr::ExpectedEntry      => f.write_str("entrée de dictionnaire attendue"),
            ParseErr::CannotParseNumeric => f.write_str("littéral numérique invalide"),
            ParseErr::AsgPatErr(e)       => Display::fmt(e, f),
        }
    }
}

macro_rules! left_assoc_op {
    ($n:ident = $ds:ident (($($op:tt),+) $_:ident)*;) => {
        fn $n(&mut self) -> ParseResult<Option<ast::Expr>> {
            if let Some(mut e) = self.$ds()? {
                while let Some(op) = self.match_n(&[$(token![$op]),+]) {
                    e = ast::Expr::BinaryOp {
                        op: op.tt.try_into().unwrap(),
                        left: Box::new(e),
                        right: self.$ds()?
                            .map(Box::new)
                            .ok_or_else(|| ParseErr::ExpectedExpr.at_range(self.peek_loc()))?
                    };
                }

                Ok(Some(e))
            } else {
                Ok(None)
            }
        }
    };
}
macro_rules! left_assoc_rules {
    ($($n:ident = $ds:ident (($($op:tt),+) $_:ident)*;)+) => {
        $(
            left_assoc_op! { $n = $ds (($($op),+) $_)*; }
        )+
    };
}

impl Parser {
    /// Create a parser from a sequence of tokens.
    ///
    /// The closing [`Token::Eof`] is only needed for its position.
    /// It is taken off the stream here and kept as the fallback
    /// cursor for end-of-input errors.
    pub fn new(tokens: impl IntoIterator<Item=FullToken>) -> Self {
        let mut tokens: VecDeque<_> = tokens.into_iter().collect();

        let eof = match tokens.back() {
            Some(FullToken { tt: Token::Eof, loc }) => *loc.start(),
            Some(FullToken { loc, .. }) => {
                let &(lno, cno) = loc.end();
                (lno, cno + 1)
            },
            None => (0, 0),
        };
        if matches!(tokens.back(), Some(t) if t.tt == Token::Eof) {
            tokens.pop_back();
        }

        Self { tokens, eof }
    }

    /// Consume the stream and parse it into a program.
    pub fn parse(mut self) -> ParseResult<ast::Program> {
        let stmts = self.expect_stmts()?;

        if let Some(ft) = self.tokens.front() {
            // something that does not start a statement is left over
            Err(ParseErr::ExpectedStmt.at_range(ft.loc.clone()))
        } else {
            Ok(ast::Program(stmts))
        }
    }

    fn peek_token(&self) -> Option<&Token> {
        self.tokens.front().map(|ft| &ft.tt)
    }

    fn peek_nth_token(&self, n: usize) -> Option<&Token> {
        self.tokens.get(n).map(|ft| &ft.tt)
    }

    fn next(&mut self) -> Option<FullToken> {
        self.tokens.pop_front()
    }

    fn next_token(&mut self) -> Option<Token> {
        self.next().map(|ft| ft.tt)
    }

    /// The range of the next token, or the end of input.
    fn peek_loc(&self) -> CursorRange {
        self.tokens.front()
            .map_or(self.eof ..= self.eof, |ft| ft.loc.clone())
    }

    /// Expect that the next token is the given one, and consume it.
    fn expect1(&mut self, u: Token) -> ParseResult<()> {
        match self.next() {
            Some(ft) if ft.tt == u => Ok(()),
            Some(ft) => Err(ParseErr::ExpectedTokens(vec![u]).at_range(ft.loc)),
            None     => Err(ParseErr::ExpectedTokens(vec![u]).at(self.eof)),
        }
    }

    /// Consume the next token if it is the given one.
    fn match1(&mut self, u: Token) -> bool {
        let matches = self.peek_token() == Some(&u);
        if matches { self.next(); }
        matches
    }

    /// Consume the next token if it is one of the given ones.
    fn match_n(&mut self, us: &[Token]) -> Option<FullToken> {
        match self.peek_token() {
            Some(t) if us.contains(t) => self.next(),
            _ => None
        }
    }

    /// Statements until something that does not start one.
    /// A `;` after any statement is allowed but never required,
    /// and stray `;` are skipped.
    fn expect_stmts(&mut self) -> ParseResult<Vec<ast::Stmt>> {
        let mut stmts = vec![];

        loop {
            if self.match1(token![;]) { continue; }

            match self.match_stmt()? {
                Some(st) => {
                    stmts.push(st);
                    self.match1(token![;]);
                },
                None => break,
            }
        }

        Ok(stmts)
    }

    fn match_stmt(&mut self) -> ParseResult<Option<ast::Stmt>> {
        let st = match self.peek_token() {
            Some(token![soit])      => Some(self.expect_decl()?),
            Some(token![fonction])  => Some(self.expect_fun_decl()?),
            Some(token![retourner]) => Some(self.expect_return()?),
            Some(token![si])        => Some(self.expect_if()?),
            Some(token![tant_que])  => Some(self.expect_while()?),
            Some(token![pour])      => Some(self.expect_for()?),
            Some(token![importer])  => Some(self.expect_import()?),
            Some(token![depuis])    => Some(self.expect_import_from()?),
            Some(_)                 => self.match_expr_stmt()?,
            None                    => None,
        };

        Ok(st)
    }

    /// Expect a variable declaration (`soit x`, `soit x = 1`).
    fn expect_decl(&mut self) -> ParseResult<ast::Stmt> {
        self.expect1(token![soit])?;
        let ident = self.expect_ident()?;

        let val = match self.match1(token![=]) {
            true  => Some(self.expect_expr()?),
            false => None,
        };

        Ok(ast::Stmt::Decl { ident, val })
    }

    /// Expect a function declaration.
    fn expect_fun_decl(&mut self) -> ParseResult<ast::Stmt> {
        self.expect1(token![fonction])?;
        let ident = self.expect_ident()?;

        self.expect1(token!["("])?;
        let params = self.expect_closing_tuple_of(
            Parser::match_ident_opt,
            token![")"],
            ParseErr::ExpectedIdent
        )?;

        let block = self.expect_block()?;

        Ok(ast::Stmt::FunDecl { ident, params, block: Rc::new(block) })
    }

    fn expect_return(&mut self) -> ParseResult<ast::Stmt> {
        self.expect1(token![retourner])?;
        let me = self.match_expr()?;
        Ok(ast::Stmt::Return(me))
    }

    /// Expect a conditional statement.
    ///
    /// `sinon si` chains fold into an else block holding one nested `si`.
    fn expect_if(&mut self) -> ParseResult<ast::Stmt> {
        self.expect1(token![si])?;
        self.expect1(token!["("])?;
        let cond = self.expect_expr()?;
        self.expect1(token![")"])?;
        let then = self.expect_block()?;

        let els = if self.match1(token![sinon]) {
            if matches!(self.peek_token(), Some(token![si])) {
                let nested = self.expect_if()?;
                Some(ast::Block(vec![nested]))
            } else {
                Some(self.expect_block()?)
            }
        } else {
            None
        };

        Ok(ast::Stmt::If { cond, then, els })
    }

    fn expect_while(&mut self) -> ParseResult<ast::Stmt> {
        self.expect1(token![tant_que])?;
        self.expect1(token!["("])?;
        let cond = self.expect_expr()?;
        self.expect1(token![")"])?;
        let block = self.expect_block()?;

        Ok(ast::Stmt::While { cond, block })
    }

    /// Expect one of the two `pour` forms. A `(` right after the
    /// keyword means the three-part loop, an identifier means `dans`.
    fn expect_for(&mut self) -> ParseResult<ast::Stmt> {
        self.expect1(token![pour])?;

        match self.peek_token() {
            Some(token!["("]) => {
                self.next();

                let init = self.match_stmt()?
                    .ok_or_else(|| ParseErr::ExpectedStmt.at_range(self.peek_loc()))?;
                self.expect1(token![;])?;
                let cond = self.expect_expr()?;
                self.expect1(token![;])?;
                let step = self.match_stmt()?
                    .ok_or_else(|| ParseErr::ExpectedStmt.at_range(self.peek_loc()))?;
                self.expect1(token![")"])?;

                let block = self.expect_block()?;

                Ok(ast::Stmt::ForClassic {
                    init: Box::new(init),
                    cond,
                    step: Box::new(step),
                    block
                })
            },
            Some(Token::Ident(_)) => {
                let ident = self.expect_ident()?;
                self.expect1(token![dans])?;
                let iter = self.expect_expr()?;
                let block = self.expect_block()?;

                Ok(ast::Stmt::ForIn { ident, iter, block })
            },
            _ => Err(ParseErr::ExpectedIdent.at_range(self.peek_loc())),
        }
    }

    /// Expect a whole-module import (`importer "m.fia" comme m`).
    fn expect_import(&mut self) -> ParseResult<ast::Stmt> {
        self.expect1(token![importer])?;
        let path = self.expect_str_literal()?;

        let alias = match self.match1(token![comme]) {
            true  => self.expect_ident()?,
            false => default_alias(&path),
        };

        Ok(ast::Stmt::ImportModule { path, alias })
    }

    /// Expect a named import (`depuis "m.fia" importer a, b comme c`).
    fn expect_import_from(&mut self) -> ParseResult<ast::Stmt> {
        self.expect1(token![depuis])?;
        let path = self.expect_str_literal()?;
        self.expect1(token![importer])?;

        let (names, _) = self.expect_tuple_of(Parser::match_import_name)?;
        if names.is_empty() {
            return Err(ParseErr::ExpectedIdent.at_range(self.peek_loc()));
        }

        Ok(ast::Stmt::ImportFrom { path, names })
    }

    fn match_import_name(&mut self) -> ParseResult<Option<(String, String)>> {
        let Some(name) = self.match_ident_opt()? else { return Ok(None) };

        let alias = match self.match1(token![comme]) {
            true  => self.expect_ident()?,
            false => name.clone(),
        };

        Ok(Some((name, alias)))
    }

    /// Match a statement led by an expression: an assignment,
    /// a compound assignment, or a plain expression statement.
    fn match_expr_stmt(&mut self) -> ParseResult<Option<ast::Stmt>> {
        let Some(e) = self.match_expr()? else { return Ok(None) };

        static AUG_OPS: [Token; 5] = [
            token![+=], token![-=], token![*=], token![/=], token![%=]
        ];

        let st = if self.match1(token![=]) {
            let pat = self.expr_to_pat(e)?;
            let val = self.expect_expr()?;
            ast::Stmt::Assign(pat, val)
        } else if let Some(op) = self.match_n(&AUG_OPS) {
            let pat = self.expr_to_pat(e)?;
            let bop = match op.tt {
                token![+=] => ast::op::Binary::Add,
                token![-=] => ast::op::Binary::Sub,
                token![*=] => ast::op::Binary::Mul,
                token![/=] => ast::op::Binary::Div,
                token![%=] => ast::op::Binary::Mod,
                _ => unreachable!(),
            };
            let val = self.expect_expr()?;
            ast::Stmt::AugAssign(pat, bop, val)
        } else {
            ast::Stmt::Expr(e)
        };

        Ok(Some(st))
    }

    fn expr_to_pat(&self, e: ast::Expr) -> ParseResult<ast::AsgPat> {
        ast::AsgPat::try_from(e)
            .map_err(|pe| ParseErr::AsgPatErr(pe).at_range(self.peek_loc()))
    }

    /// Expect a braced block of statements.
    fn expect_block(&mut self) -> ParseResult<ast::Block> {
        self.expect1(token!["{"])?;
        let stmts = self.expect_stmts()?;
        self.expect1(token!["}"])?;
        Ok(ast::Block(stmts))
    }

    fn expect_ident(&mut self) -> ParseResult<String> {
        match self.next() {
            Some(FullToken { tt: Token::Ident(s), .. }) => Ok(s),
            Some(ft) => Err(ParseErr::ExpectedIdent.at_range(ft.loc)),
            None     => Err(ParseErr::ExpectedIdent.at(self.eof)),
        }
    }

    fn match_ident_opt(&mut self) -> ParseResult<Option<String>> {
        match self.peek_token() {
            Some(Token::Ident(_)) => {
                let Some(Token::Ident(s)) = self.next_token() else { unreachable!() };
                Ok(Some(s))
            },
            _ => Ok(None),
        }
    }

    fn expect_str_literal(&mut self) -> ParseResult<String> {
        match self.next() {
            Some(FullToken { tt: Token::Str(s), .. }) => Ok(s),
            Some(ft) => Err(ParseErr::ExpectedStrLiteral.at_range(ft.loc)),
            None     => Err(ParseErr::ExpectedStrLiteral.at(self.eof)),
        }
    }

    /// Match items parsed by `f`, separated by commas. The bool of the
    /// result tells whether the tuple ended on a comma.
    fn expect_tuple_of<T>(
        &mut self,
        mut f: impl FnMut(&mut Self) -> ParseResult<Option<T>>
    ) -> ParseResult<(Vec<T>, bool /* ends with comma? */)> {
        let mut vals = vec![];

        while let Some(v) = f(self)? {
            vals.push(v);
            if !self.match1(token![,]) {
                return Ok((vals, false));
            }
        }

        Ok((vals, true))
    }

    /// Expect a comma-separated tuple of items parsed by `f`, closed
    /// by the given token. When the closing token cannot appear here,
    /// `or_else` describes the item that was expected instead.
    fn expect_closing_tuple_of<T>(
        &mut self,
        f: impl FnMut(&mut Self) -> ParseResult<Option<T>>,
        close_with: Token,
        or_else: ParseErr
    ) -> ParseResult<Vec<T>> {
        let (vals, comma_end) = self.expect_tuple_of(f)?;

        // if the tuple ended on an item, only the close or another
        // comma can follow it
        if self.match1(close_with.clone()) {
            Ok(vals)
        } else if comma_end {
            Err(or_else.at_range(self.peek_loc()))
        } else {
            Err(ParseErr::ExpectedTokens(vec![token![,], close_with])
                .at_range(self.peek_loc()))
        }
    }

    fn expect_expr(&mut self) -> ParseResult<ast::Expr> {
        self.match_expr()?
            .ok_or_else(|| ParseErr::ExpectedExpr.at_range(self.peek_loc()))
    }

    fn match_expr(&mut self) -> ParseResult<Option<ast::Expr>> {
        self.match_lor()
    }

    // the precedence tiers, loosest first
    left_assoc_rules! {
        match_lor    = match_land   ((ou) match_land)*;
        match_land   = match_cmp    ((et) match_cmp)*;
        match_cmp    = match_addsub ((==, !=, <, <=, >, >=) match_addsub)*;
        match_addsub = match_muldiv ((+, -) match_muldiv)*;
        match_muldiv = match_unary  ((*, /, %) match_unary)*;
    }

    /// Match a prefix unary operation (`-x`, `non x`), which may stack.
    fn match_unary(&mut self) -> ParseResult<Option<ast::Expr>> {
        if let Some(op) = self.match_n(&[token![-], token![non]]) {
            let e = self.match_unary()?
                .ok_or_else(|| ParseErr::ExpectedExpr.at_range(self.peek_loc()))?;

            Ok(Some(ast::Expr::UnaryOp {
                op: op.tt.try_into().unwrap(),
                expr: Box::new(e)
            }))
        } else {
            self.match_postfix()
        }
    }

    /// Match a unit followed by any number of calls, indexings,
    /// and attribute accesses.
    fn match_postfix(&mut self) -> ParseResult<Option<ast::Expr>> {
        let Some(mut e) = self.match_unit()? else { return Ok(None) };

        loop {
            if self.match1(token!["("]) {
                let args = self.expect_closing_tuple_of(
                    Parser::match_expr,
                    token![")"],
                    ParseErr::ExpectedExpr
                )?;

                e = ast::Expr::Call { funct: Box::new(e), args };
            } else if self.match1(token!["["]) {
                // a lone string literal key resolves to dict access here
                let lone_str_key = matches!(self.peek_token(), Some(Token::Str(_)))
                    && self.peek_nth_token(1) == Some(&token!["]"]);

                if lone_str_key {
                    let Some(Token::Str(key)) = self.next_token() else { unreachable!() };
                    self.next(); // the "]"

                    e = ast::Expr::DictKey { expr: Box::new(e), key };
                } else {
                    let index = self.expect_expr()?;
                    self.expect1(token!["]"])?;

                    e = ast::Expr::Index {
                        expr: Box::new(e),
                        index: Box::new(index)
                    };
                }
            } else if self.match1(token![.]) {
                let attr = self.expect_ident()?;
                e = ast::Expr::Attr { obj: Box::new(e), attr };
            } else {
                break;
            }
        }

        Ok(Some(e))
    }

    /// Match an expression unit: an identifier, a literal, a list or
    /// dict literal, or a parenthesized expression.
    fn match_unit(&mut self) -> ParseResult<Option<ast::Expr>> {
        let Some(tok) = self.peek_token() else { return Ok(None) };

        let unit = match tok {
            Token::Ident(_) => {
                let Some(id) = self.match_ident_opt()? else { unreachable!() };
                ast::Expr::Ident(id)
            },
            | Token::Numeric(_)
            | Token::Str(_)
            | token![vrai] | token![faux] | token![nul]
            => ast::Expr::Literal(self.expect_literal()?),
            token!["["] => self.expect_list()?,
            token!["{"] => self.expect_dict()?,
            token!["("] => {
                self.next();
                let e = self.expect_expr()?;
                self.expect1(token![")"])?;
                e
            },
            _ => return Ok(None),
        };

        Ok(Some(unit))
    }

    fn expect_literal(&mut self) -> ParseResult<ast::Literal> {
        let Some(FullToken { tt, loc }) = self.next() else {
            return Err(ParseErr::ExpectedExpr.at(self.eof));
        };

        match tt {
            Token::Numeric(s) => ast::Literal::from_numeric(&s)
                .ok_or_else(|| ParseErr::CannotParseNumeric.at_range(loc)),
            Token::Str(s) => Ok(ast::Literal::Str(s)),
            token![vrai]  => Ok(ast::Literal::Bool(true)),
            token![faux]  => Ok(ast::Literal::Bool(false)),
            token![nul]   => Ok(ast::Literal::Null),
            _ => Err(ParseErr::ExpectedExpr.at_range(loc)),
        }
    }

    fn expect_list(&mut self) -> ParseResult<ast::Expr> {
        self.expect1(token!["["])?;
        let exprs = self.expect_closing_tuple_of(
            Parser::match_expr,
            token!["]"],
            ParseErr::ExpectedExpr
        )?;

        Ok(ast::Expr::ListLiteral(exprs))
    }

    fn expect_dict(&mut self) -> ParseResult<ast::Expr> {
        self.expect1(token!["{"])?;
        let entries = self.expect_closing_tuple_of(
            Parser::match_entry,
            token!["}"],
            ParseErr::ExpectedEntry
        )?;

        Ok(ast::Expr::DictLiteral(entries))
    }

    /// Match a dict literal entry. Keys are literals and are stored
    /// by their string form.
    fn match_entry(&mut self) -> ParseResult<Option<(String, ast::Expr)>> {
        let key = match self.peek_token() {
            Some(
                | Token::Numeric(_)
                | Token::Str(_)
                | token![vrai] | token![faux] | token![nul]
            ) => self.expect_literal()?.to_string(),
            Some(token!["}"]) | None => return Ok(None),
            _ => return Err(ParseErr::ExpectedEntry.at_range(self.peek_loc())),
        };

        self.expect1(token![:])?;
        let val = self.expect_expr()?;

        Ok(Some((key, val)))
    }
}

/// The name a module binds to when no `comme` alias is given:
/// the last path segment without its `.fia` suffix.
pub(crate) fn default_alias(path: &str) -> String {
    let base = path.rsplit(['/', '\\']).next().unwrap_or(path);
    let base = base.strip_suffix(".fia").unwrap_or(base);
    base.to_string()
}
