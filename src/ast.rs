//! The components of the F-IA abstract syntax tree (AST).
//!
//! The AST is the representation of a program after it has gone
//! through the parser. These components make up that representation.
//!
//! The root of a parsed file is [`Program`], which holds statements
//! ([`Stmt`]). Statements hold expressions ([`Expr`]), and so on.

use std::fmt::Display;
use std::rc::Rc;

pub mod op;

/// A complete program.
///
/// # Syntax
/// ```text
/// program = (stmt ";"?)*;
/// ```
///
/// # Example
/// ```text
/// soit a = 1;
/// soit b = 2;
/// imprimer(a + b);
/// ```
#[derive(Debug, PartialEq, Clone)]
pub struct Program(pub Vec<Stmt>);

/// A block, which is a sequence of statements
/// wrapped in curly braces.
///
/// # Syntax
/// ```text
/// block = "{" (stmt ";"?)* "}";
/// ```
///
/// # Example
/// ```text
/// {
///     soit a = 1;
///     imprimer(a);
/// }
/// ```
#[derive(Debug, PartialEq, Clone)]
pub struct Block(pub Vec<Stmt>);

/// A statement.
#[derive(Debug, PartialEq, Clone)]
pub enum Stmt {
    /// A variable declaration.
    ///
    /// # Syntax
    /// ```text
    /// decl = "soit" IDENT ("=" expr)?;
    /// ```
    ///
    /// # Example
    /// ```text
    /// soit a = 1;
    /// soit b;
    /// ```
    Decl {
        /// The name of the variable
        ident: String,
        /// The initial value, `nul` if omitted
        val: Option<Expr>
    },

    /// A function declaration.
    ///
    /// # Syntax
    /// ```text
    /// fun_decl = "fonction" IDENT "(" (IDENT ",")* IDENT? ")" block;
    /// ```
    ///
    /// # Example
    /// ```text
    /// fonction somme(a, b) {
    ///     retourner a + b;
    /// }
    /// ```
    FunDecl {
        /// The name of the function
        ident: String,
        /// The parameter names
        params: Vec<String>,
        /// The function body
        block: Rc<Block>
    },

    /// A return statement, only meaningful inside a function body.
    ///
    /// # Syntax
    /// ```text
    /// return = "retourner" expr?;
    /// ```
    Return(Option<Expr>),

    /// A whole-module import.
    ///
    /// # Syntax
    /// ```text
    /// import = "importer" STR ("comme" IDENT)?;
    /// ```
    ///
    /// # Example
    /// ```text
    /// importer "maths_utiles.fia";
    /// importer "lib/outils" comme outils;
    /// ```
    ImportModule {
        /// The module path as written in the source
        path: String,
        /// The name the module is bound to
        alias: String
    },

    /// An import of specific names out of a module.
    ///
    /// # Syntax
    /// ```text
    /// import_from = "depuis" STR "importer" IDENT ("comme" IDENT)?
    ///                                 ("," IDENT ("comme" IDENT)?)*;
    /// ```
    ///
    /// # Example
    /// ```text
    /// depuis "outils.fia" importer aire, somme comme total;
    /// ```
    ImportFrom {
        /// The module path as written in the source
        path: String,
        /// Pairs of (exported name, local binding)
        names: Vec<(String, String)>
    },

    /// An assignment to an existing target.
    ///
    /// # Syntax
    /// ```text
    /// assign = asg_pat "=" expr;
    /// ```
    ///
    /// # Example
    /// ```text
    /// a = 2;
    /// liste[0] = 5;
    /// d["clé"] = "valeur";
    /// ```
    Assign(AsgPat, Expr),

    /// A compound assignment (`+=`, `-=`, `*=`, `/=`, `%=`).
    ///
    /// # Example
    /// ```text
    /// compteur += 1;
    /// ```
    AugAssign(AsgPat, op::Binary, Expr),

    /// A conditional statement.
    ///
    /// A `sinon si` chain parses as an `sinon` block holding
    /// a single nested `si` statement.
    ///
    /// # Syntax
    /// ```text
    /// if = "si" "(" expr ")" block
    ///      ("sinon" "si" "(" expr ")" block)*
    ///      ("sinon" block)?;
    /// ```
    If {
        /// The condition
        cond: Expr,
        /// The block to run when the condition holds
        then: Block,
        /// The block to run otherwise
        els: Option<Block>
    },

    /// A while loop.
    ///
    /// # Syntax
    /// ```text
    /// while = "tant_que" "(" expr ")" block;
    /// ```
    While {
        /// The condition checked before every iteration
        cond: Expr,
        /// The body
        block: Block
    },

    /// A three-part loop.
    ///
    /// # Syntax
    /// ```text
    /// for_classic = "pour" "(" stmt ";" expr ";" stmt ")" block;
    /// ```
    ///
    /// # Example
    /// ```text
    /// pour (soit i = 0; i < 10; i += 1) {
    ///     imprimer(i);
    /// }
    /// ```
    ForClassic {
        /// The statement run once before the loop
        init: Box<Stmt>,
        /// The condition checked before every iteration
        cond: Expr,
        /// The statement run after every iteration
        step: Box<Stmt>,
        /// The body
        block: Block
    },

    /// An iterating loop.
    ///
    /// # Syntax
    /// ```text
    /// for_in = "pour" IDENT "dans" expr block;
    /// ```
    ///
    /// # Example
    /// ```text
    /// pour x dans [1, 2, 3] {
    ///     imprimer(x);
    /// }
    /// ```
    ForIn {
        /// The loop variable
        ident: String,
        /// The value iterated over
        iter: Expr,
        /// The body
        block: Block
    },

    /// An expression run for its side effects.
    Expr(Expr)
}

/// An expression.
#[derive(Debug, PartialEq, Clone)]
pub enum Expr {
    /// A variable or function name.
    Ident(String),

    /// A literal value.
    Literal(Literal),

    /// A list literal (e.g. `[1, 2, 3, 4]`).
    ListLiteral(Vec<Expr>),

    /// A dict literal (e.g. `{"a": 1, "b": 2}`).
    ///
    /// Keys are literals in the source but are held here
    /// as their string form.
    DictLiteral(Vec<(String, Expr)>),

    /// An operation on one value (e.g. `-x`, `non x`).
    UnaryOp {
        /// The operator
        op: op::Unary,
        /// The operand
        expr: Box<Expr>
    },

    /// An operation on two values (e.g. `a + b`, `a et b`).
    BinaryOp {
        /// The operator
        op: op::Binary,
        /// The left operand
        left: Box<Expr>,
        /// The right operand
        right: Box<Expr>
    },

    /// Attribute access on a module value (e.g. `maths.PI`).
    Attr {
        /// The value whose attribute is accessed
        obj: Box<Expr>,
        /// The attribute name
        attr: String
    },

    /// Indexing (e.g. `liste[0]`, `texte[i]`).
    Index {
        /// The value being indexed
        expr: Box<Expr>,
        /// The index
        index: Box<Expr>
    },

    /// Dict access with a string key known at parse time (e.g. `d["clé"]`).
    DictKey {
        /// The dict expression
        expr: Box<Expr>,
        /// The key
        key: String
    },

    /// A function call.
    Call {
        /// The function being called
        funct: Box<Expr>,
        /// The call arguments
        args: Vec<Expr>
    }
}

/// A primitive literal.
#[derive(Debug, PartialEq, Clone)]
pub enum Literal {
    #[allow(missing_docs)] Int(isize),
    #[allow(missing_docs)] Float(f64),
    #[allow(missing_docs)] Str(String),
    #[allow(missing_docs)] Bool(bool),
    #[allow(missing_docs)] Null
}

impl Literal {
    /// Create a literal from a numeric string, trying int first.
    pub fn from_numeric(s: &str) -> Option<Self> {
        s.parse::<isize>().map(Literal::Int)
            .or_else(|_| s.parse::<f64>().map(Literal::Float))
            .ok()
    }
}

impl Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Literal::Int(n)   => Display::fmt(n, f),
            Literal::Float(n) if n.fract() == 0.0 => write!(f, "{n:.1}"),
            Literal::Float(n) => Display::fmt(n, f),
            Literal::Str(s)   => f.write_str(s),
            Literal::Bool(b)  => f.write_str(if *b { "vrai" } else { "faux" }),
            Literal::Null     => f.write_str("nul"),
        }
    }
}

/// A pattern of things that can be assigned to.
///
/// Only a subset of expressions are valid targets of `=`.
/// The conversion from [`Expr`] rejects everything else.
#[derive(Debug, PartialEq, Clone)]
pub enum AsgPat {
    /// A plain variable (e.g. `a = ...`)
    Ident(String),

    /// An element of a list or a dict entry under a computed key
    /// (e.g. `liste[0] = ...`, `d[cle] = ...`)
    Index {
        /// The value being indexed
        expr: Box<Expr>,
        /// The index
        index: Box<Expr>
    },

    /// A dict entry under a string key known at parse time
    /// (e.g. `d["clé"] = ...`)
    DictKey {
        /// The dict expression
        expr: Box<Expr>,
        /// The key
        key: String
    }
}

/// An error in converting an expression to an assignment pattern.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum PatErr {
    /// The expression is not something that can be assigned to.
    InvalidAssignTarget
}

impl Display for PatErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PatErr::InvalidAssignTarget => f.write_str("cible d'affectation invalide"),
        }
    }
}

impl TryFrom<Expr> for AsgPat {
    type Error = PatErr;

    fn try_from(value: Expr) -> Result<Self, Self::Error> {
        match value {
            Expr::Ident(ident)            => Ok(AsgPat::Ident(ident)),
            Expr::Index { expr, index }   => Ok(AsgPat::Index { expr, index }),
            Expr::DictKey { expr, key }   => Ok(AsgPat::DictKey { expr, key }),
            _ => Err(PatErr::InvalidAssignTarget)
        }
    }
}
