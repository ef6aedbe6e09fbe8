//! Executes the AST.
//!
//! [`RtContext`] holds the state of one program run: the scope stack,
//! the declared functions, and the module resolver. The traversal
//! itself is implemented through [`TraverseRt`] on the AST nodes.
//!
//! Control flow that leaves a statement early (a `retourner`, an
//! `arreter()`, or an error) travels through [`TermOp`], the error
//! half of [`RtTraversal`].

pub mod value;
pub mod vars;
pub mod modules;
pub mod ml;
mod gstd;

use std::collections::HashMap;
use std::cell::RefCell;
use std::fmt::Display;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use indexmap::IndexMap;

use crate::ast;
use crate::err::{FiaErr, FullFiaErr};
use crate::{lexer, parser};

use self::ml::{MlBackend, NoBackend};
use self::modules::{ModuleErr, ModuleHandle, ModuleResolver};
use self::vars::Scopes;

pub use self::rtio::IoHook;
pub use self::value::Value;

/// Iterations a loop may run before the safety stop.
pub const LOOP_LIMIT: usize = 1000;

/// The ways a statement can leave its enclosing traversal early.
#[derive(Debug)]
pub enum TermOp<T, E> {
    /// An error occurred.
    Err(E),

    /// A `retourner` is unwinding to the nearest call boundary.
    Return(T),

    /// `arreter()` ended the program.
    Stop
}

impl<T, E: Into<FullRuntimeErr>> From<E> for TermOp<T, FullRuntimeErr> {
    fn from(e: E) -> Self {
        TermOp::Err(e.into())
    }
}

/// A [`Result`] type for the statement and expression traversal.
pub type RtTraversal<T> = Result<T, TermOp<Value, FullRuntimeErr>>;

/// A [`Result`] type for operations that cannot unwind,
/// only succeed or error.
pub type RtResult<T> = Result<T, FullRuntimeErr>;

/// A [`RuntimeErr`] with position information.
pub type FullRuntimeErr = FullFiaErr<RuntimeErr>;

/// An operation was applied to values of the wrong type.
#[derive(Debug, PartialEq, Eq)]
pub enum TypeErr {
    /// Unary operator has no meaning for the type.
    CannotUnary(ast::op::Unary, &'static str),

    /// Binary operator has no meaning for the types.
    CannotBinary(ast::op::Binary, &'static str, &'static str),

    /// The value cannot be indexed into.
    CannotIndex(&'static str),

    /// Lists and strings only take integer indices.
    IndexMustBeInt(&'static str),

    /// The value cannot drive a `pour ... dans` loop.
    NotIterable(&'static str),

    /// The value cannot be called.
    NotCallable(&'static str),

    /// Attribute access only works on modules.
    CannotAttr(&'static str),

    /// The value has no length.
    NoLength(&'static str),

    /// A builtin received an argument of the wrong type.
    BadArgument {
        /// The builtin's name
        fun: &'static str,
        /// What it wanted
        expected: &'static str,
        /// The type it got
        got: &'static str
    },

    /// `trier()` cannot order values of different types.
    MixedSort
}

impl FiaErr for TypeErr {
    fn err_name(&self) -> &'static str {
        "erreur de type"
    }
}

impl Display for TypeErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TypeErr::CannotUnary(op, t) =>
                write!(f, "opération '{op}' non supportée pour '{t}'"),
            TypeErr::CannotBinary(op, l, r) =>
                write!(f, "opération '{op}' non supportée entre '{l}' et '{r}'"),
            TypeErr::CannotIndex(t)    => write!(f, "'{t}' n'est pas indexable"),
            TypeErr::IndexMustBeInt(t) => write!(f, "l'indice doit être un entier, pas '{t}'"),
            TypeErr::NotIterable(t)    => write!(f, "'{t}' n'est pas itérable"),
            TypeErr::NotCallable(t)    => write!(f, "'{t}' n'est pas appelable"),
            TypeErr::CannotAttr(t)     => write!(f, "accès aux attributs non supporté pour '{t}'"),
            TypeErr::NoLength(t)       => write!(f, "'{t}' n'a pas de longueur"),
            TypeErr::BadArgument { fun, expected, got } =>
                write!(f, "{fun}() attend {expected}, '{got}' fourni"),
            TypeErr::MixedSort =>
                f.write_str("trier() ne peut pas comparer des types différents"),
        }
    }
}

/// An operation received a value it cannot work with.
#[derive(Debug, PartialEq)]
pub enum ValueErr {
    /// Division or modulo by zero.
    DivisionByZero,

    /// A list or string index fell outside the value.
    IndexOutOfBounds(isize),

    /// A dict was read under a key it does not hold.
    KeyNotFound(String),

    /// A call passed the wrong number of arguments.
    WrongArity {
        /// The function's name
        name: String,
        /// The number of parameters it declares
        expected: usize,
        /// The number of arguments it got
        got: usize
    },

    /// A conversion builtin could not read its argument.
    InvalidConversion {
        /// The builtin's name
        fun: &'static str,
        /// The argument, rendered
        val: String
    },

    /// A conversion builtin was given a list or dict.
    ConversionUnsupported(&'static str),

    /// `racine()` of a negative number.
    NegativeSqrt
}

impl FiaErr for ValueErr {
    fn err_name(&self) -> &'static str {
        "erreur de valeur"
    }
}

impl Display for ValueErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueErr::DivisionByZero => f.write_str("division par zéro"),
            ValueErr::IndexOutOfBounds(i) => write!(f, "indice {i} hors limites"),
            ValueErr::KeyNotFound(k) =>
                write!(f, "clé '{k}' non trouvée dans le dictionnaire"),
            ValueErr::WrongArity { name, expected, got } =>
                write!(f, "la fonction '{name}' attend {expected} arguments, {got} fournis"),
            ValueErr::InvalidConversion { fun, val } =>
                write!(f, "conversion invalide: {fun}('{val}')"),
            ValueErr::ConversionUnsupported(fun) =>
                write!(f, "{fun}() ne supporte pas les listes ou dictionnaires"),
            ValueErr::NegativeSqrt => f.write_str("racine() d'un nombre négatif"),
        }
    }
}

/// A name was used without being bound.
#[derive(Debug, PartialEq, Eq)]
pub enum NameErr {
    /// The variable is not declared in any visible scope.
    UndefinedVar(String),

    /// The name is neither a declared function nor a builtin.
    UndefinedFun(String),

    /// The module has no such variable or function.
    UndefinedAttr(String),

    /// A `depuis ... importer` asked for a name the module lacks.
    UndefinedExport {
        /// The module's display name
        module: String,
        /// The requested name
        name: String
    }
}

impl FiaErr for NameErr {
    fn err_name(&self) -> &'static str {
        "erreur de nom"
    }
}

impl Display for NameErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NameErr::UndefinedVar(n) => write!(f, "variable '{n}' non définie"),
            NameErr::UndefinedFun(n) => write!(f, "fonction '{n}' non définie"),
            NameErr::UndefinedAttr(n) => write!(f, "le module n'a pas d'attribut '{n}'"),
            NameErr::UndefinedExport { module, name } =>
                write!(f, "'{name}' introuvable dans le module '{module}'"),
        }
    }
}

/// A feature this build of the interpreter does not provide.
#[derive(Debug, PartialEq, Eq)]
pub enum FeatureErr {
    /// `appeler_python_ml` ran without a registered backend.
    MlUnavailable(String)
}

impl FiaErr for FeatureErr {
    fn err_name(&self) -> &'static str {
        "erreur de fonctionnalité"
    }
}

impl Display for FeatureErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeatureErr::MlUnavailable(name) =>
                write!(f, "backend ML non disponible (fonction '{name}')"),
        }
    }
}

/// IO errors are runtime errors too.
pub use std::io::Error as IoErr;

impl FiaErr for IoErr {
    fn err_name(&self) -> &'static str {
        "erreur d'entrée/sortie"
    }
}

macro_rules! rt_err {
    ($($e:ident),+) => {
        /// The umbrella of everything that can go wrong during a program run.
        #[derive(Debug)]
        pub enum RuntimeErr {
            $(
                #[allow(missing_docs)] $e($e)
            ),+
        }

        $(
            impl From<$e> for RuntimeErr {
                fn from(err: $e) -> Self {
                    Self::$e(err)
                }
            }
            impl From<$e> for FullRuntimeErr {
                fn from(err: $e) -> Self {
                    RuntimeErr::from(err).at_unknown()
                }
            }
            $crate::err::full_fia_cast_impl! { $e, RuntimeErr }
        )+

        impl FiaErr for RuntimeErr {
            fn err_name(&self) -> &'static str {
                match self {
                    $(Self::$e(e) => e.err_name()),+
                }
            }
        }

        impl Display for RuntimeErr {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$e(e) => Display::fmt(e, f)),+
                }
            }
        }
    }
}

rt_err! { TypeErr, ValueErr, NameErr, FeatureErr, ModuleErr, IoErr }

pub mod rtio {
    //! Hooks to reroute the standard input and output of a program run.

    use std::io::{self, Read, Write};
    use std::ptr::NonNull;

    /// Reroutes reads and writes during a program run.
    ///
    /// A hook without a registered stream falls back to the real
    /// stdin/stdout. Hooks created by [`IoHook::clone`] alias the
    /// parent's streams but are only usable while the parent is
    /// mutably borrowed, so accesses stay serial.
    pub struct IoHook<'ctx> {
        stdin: Option<NonNull<dyn Read + 'ctx>>,
        stdout: Option<NonNull<dyn Write + 'ctx>>
    }

    impl<'ctx> IoHook<'ctx> {
        /// Hook the input only.
        pub fn new_r(stdin: &'ctx mut (dyn Read + 'ctx)) -> Self {
            Self { stdin: Some(NonNull::from(stdin)), stdout: None }
        }

        /// Hook the output only.
        pub fn new_w(stdout: &'ctx mut (dyn Write + 'ctx)) -> Self {
            Self { stdin: None, stdout: Some(NonNull::from(stdout)) }
        }

        /// Hook both ends.
        pub fn new_rw(
            stdin: &'ctx mut (dyn Read + 'ctx),
            stdout: &'ctx mut (dyn Write + 'ctx)
        ) -> Self {
            Self {
                stdin: Some(NonNull::from(stdin)),
                stdout: Some(NonNull::from(stdout))
            }
        }

        /// Duplicate the hook for a shorter lifetime.
        pub fn clone(&mut self) -> IoHook {
            IoHook { stdin: self.stdin, stdout: self.stdout }
        }
    }

    impl Default for IoHook<'_> {
        fn default() -> Self {
            Self { stdin: None, stdout: None }
        }
    }

    impl Read for IoHook<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.stdin.as_mut() {
                // SAFETY: the pointee is borrowed for 'ctx and only
                // reachable through this hook while it is
                Some(r) => unsafe { r.as_mut() }.read(buf),
                None => io::stdin().read(buf),
            }
        }
    }

    impl Write for IoHook<'_> {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            match self.stdout.as_mut() {
                // SAFETY: as in read
                Some(w) => unsafe { w.as_mut() }.write(buf),
                None => io::stdout().write(buf),
            }
        }

        fn flush(&mut self) -> io::Result<()> {
            match self.stdout.as_mut() {
                // SAFETY: as in read
                Some(w) => unsafe { w.as_mut() }.flush(),
                None => io::stdout().flush(),
            }
        }
    }
}

/// A declared function: its name, parameters, and body.
#[derive(Debug)]
pub struct FunDef {
    pub(crate) name: String,
    pub(crate) params: Vec<String>,
    pub(crate) block: Rc<ast::Block>
}

/// The state of a program run.
pub struct RtContext<'ctx> {
    vars: Scopes,
    funs: HashMap<String, Rc<FunDef>>,
    resolver: Rc<RefCell<ModuleResolver>>,
    current_file: Option<PathBuf>,
    ml: Rc<dyn MlBackend>,
    pub(super) io: rtio::IoHook<'ctx>
}

impl<'ctx> RtContext<'ctx> {
    /// Create a context using the real stdin/stdout.
    pub fn new() -> Self {
        Self::with_io(rtio::IoHook::default())
    }

    /// Create a context whose IO goes through the given hook.
    pub fn with_io(io: rtio::IoHook<'ctx>) -> Self {
        Self {
            vars: Scopes::new(),
            funs: HashMap::new(),
            resolver: Rc::new(RefCell::new(ModuleResolver::new())),
            current_file: None,
            ml: Rc::new(NoBackend),
            io
        }
    }

    /// Create a context for running the given script file. Relative
    /// imports resolve against the file's directory.
    pub fn for_file(path: impl Into<PathBuf>) -> Self {
        Self::for_file_with_io(path, rtio::IoHook::default())
    }

    /// [`RtContext::for_file`], with the IO rerouted through a hook.
    pub fn for_file_with_io(path: impl Into<PathBuf>, io: rtio::IoHook<'ctx>) -> Self {
        let mut ctx = Self::with_io(io);
        ctx.current_file = Some(path.into());
        ctx
    }

    /// Register the backend `appeler_python_ml` dispatches into.
    pub fn use_ml_backend(&mut self, backend: Rc<dyn MlBackend>) {
        self.ml = backend;
    }

    /// The module resolver, shared with every module this context
    /// loads. Resetting it makes the next import re-execute files.
    pub fn resolver(&self) -> Rc<RefCell<ModuleResolver>> {
        Rc::clone(&self.resolver)
    }

    /// Run a whole program. The value of its last statement comes
    /// back, and `arreter()` ends the run cleanly.
    pub fn run_program(&mut self, prog: &ast::Program) -> RtResult<Value> {
        match self.traverse_stmts(&prog.0) {
            Ok(v) => Ok(v),
            Err(TermOp::Return(v)) => Ok(v),
            Err(TermOp::Stop) => Ok(Value::Null),
            Err(TermOp::Err(e)) => Err(e),
        }
    }

    fn traverse_stmts(&mut self, stmts: &[ast::Stmt]) -> RtTraversal<Value> {
        let mut result = Value::Null;
        for st in stmts {
            result = st.traverse_rt(self)?;
        }

        Ok(result)
    }

    fn get_var(&self, id: &str) -> RtResult<Value> {
        self.vars.get(id)
            .cloned()
            .ok_or_else(|| NameErr::UndefinedVar(id.to_string()).into())
    }

    /// Dispatch a call by name. The builtins take precedence over
    /// declared functions, so a `fonction longueur(...)` never hides
    /// the builtin `longueur`.
    fn call_name(&mut self, name: &str, args: Vec<Value>) -> RtTraversal<Value> {
        if let Some(f) = gstd::STD_MAP.get(name) {
            return f(self.io.clone(), args);
        }

        if name == "appeler_python_ml" {
            return self.call_ml(args);
        }

        match self.funs.get(name).cloned() {
            Some(def) => {
                let globals = self.vars.globals().clone();
                self.call_fun(&def, globals, args)
            },
            None => Err(NameErr::UndefinedFun(name.to_string()))?,
        }
    }

    /// Run a function over a fresh `[globals, params]` scope stack.
    /// A `retourner` unwinding out of the body stops here.
    fn call_fun(
        &mut self,
        def: &FunDef,
        globals: HashMap<String, Value>,
        args: Vec<Value>
    ) -> RtTraversal<Value> {
        if def.params.len() != args.len() {
            return Err(ValueErr::WrongArity {
                name: def.name.clone(),
                expected: def.params.len(),
                got: args.len()
            }.into());
        }

        let params = def.params.iter()
            .cloned()
            .zip(args)
            .collect();
        let saved = self.vars.swap_for_call(globals, params);

        let result = self.traverse_stmts(&def.block.0);
        self.vars.restore(saved);

        match result {
            Ok(_) => Ok(Value::Null),
            Err(TermOp::Return(v)) => Ok(v),
            Err(term) => Err(term),
        }
    }

    fn call_ml(&mut self, args: Vec<Value>) -> RtTraversal<Value> {
        let Some((name, rest)) = args.split_first() else {
            return Err(ValueErr::WrongArity {
                name: String::from("appeler_python_ml"),
                expected: 1,
                got: 0
            }.into());
        };
        let Value::Str(name) = name else {
            return Err(TypeErr::BadArgument {
                fun: "appeler_python_ml",
                expected: "un nom de fonction",
                got: name.ty()
            }.into());
        };

        let ml = Rc::clone(&self.ml);
        Ok(ml.invoke(name, rest)?)
    }

    /// Count one iteration against the ceiling. Once the ceiling is
    /// hit, the stop is announced on the program's output and the
    /// loop ends.
    fn tick_loop(&mut self, iterations: &mut usize) -> RtResult<bool> {
        *iterations += 1;
        if *iterations > LOOP_LIMIT {
            log::warn!("boucle interrompue après {LOOP_LIMIT} itérations");
            writeln!(self.io, "Boucle interrompue après {LOOP_LIMIT} itérations (limite de sécurité)")?;
            Ok(false)
        } else {
            Ok(true)
        }
    }

    fn assign_pat(&mut self, pat: &ast::AsgPat, v: Value) -> RtTraversal<Value> {
        match pat {
            ast::AsgPat::Ident(id) => {
                // assignment always lands in the innermost scope,
                // shadowing rather than updating an enclosing binding
                self.vars.declare(id.clone(), v);
                Ok(Value::Null)
            },
            ast::AsgPat::Index { expr, index } => {
                let target = expr.traverse_rt(self)?;
                let idx = index.traverse_rt(self)?;
                value::set_index(target, idx, v)?;
                Ok(Value::Null)
            },
            ast::AsgPat::DictKey { expr, key } => {
                let target = expr.traverse_rt(self)?;
                match target {
                    Value::Dict(d) => {
                        d.borrow_mut().insert(key.clone(), v);
                        Ok(Value::Null)
                    },
                    t => Err(TypeErr::CannotIndex(t.ty()))?,
                }
            },
        }
    }

    /// Apply `op` between the target's current value and `rhs` and
    /// write the result back. The target's base and index expressions
    /// evaluate once, for the read and the write both.
    fn update_pat(
        &mut self,
        pat: &ast::AsgPat,
        op: ast::op::Binary,
        rhs: Value
    ) -> RtTraversal<Value> {
        match pat {
            ast::AsgPat::Ident(id) => {
                let cur = self.get_var(id)?;
                let v = value::apply_binary(op, cur, rhs)?;
                self.vars.declare(id.clone(), v);
            },
            ast::AsgPat::Index { expr, index } => {
                let target = expr.traverse_rt(self)?;
                let idx = index.traverse_rt(self)?;
                let cur = value::get_index(target.clone(), idx.clone())?;
                let v = value::apply_binary(op, cur, rhs)?;
                value::set_index(target, idx, v)?;
            },
            ast::AsgPat::DictKey { expr, key } => {
                let target = expr.traverse_rt(self)?;
                let cur = value::get_dict_key(&target, key)?;
                let v = value::apply_binary(op, cur, rhs)?;
                match target {
                    Value::Dict(d) => { d.borrow_mut().insert(key.clone(), v); },
                    t => return Err(TypeErr::CannotIndex(t.ty()).into()),
                }
            },
        }

        Ok(Value::Null)
    }

    fn import_module(&mut self, path: &str, alias: &str) -> RtResult<()> {
        let handle = self.load_module(path)?;
        self.vars.declare(alias.to_string(), Value::Module(handle));
        Ok(())
    }

    fn import_from(&mut self, path: &str, names: &[(String, String)]) -> RtResult<()> {
        let handle = self.load_module(path)?;

        for (name, alias) in names {
            if let Some(v) = handle.get_variable(name) {
                self.vars.declare(alias.clone(), v);
            } else if let Some(def) = handle.get_function(name) {
                self.funs.insert(alias.clone(), def);
            } else {
                return Err(NameErr::UndefinedExport {
                    module: handle.name(),
                    name: name.clone()
                }.into());
            }
        }

        Ok(())
    }

    /// Load a module, executing its file at most once per resolver.
    fn load_module(&mut self, path: &str) -> RtResult<Rc<ModuleHandle>> {
        let resolver = Rc::clone(&self.resolver);

        let canonical = resolver.borrow()
            .resolve(path, self.current_file.as_deref())?;
        if let Some(handle) = resolver.borrow().handle(&canonical) {
            return Ok(handle);
        }

        resolver.borrow_mut().begin_load(&canonical)?;
        let result = self.execute_module(&canonical);
        // the loading stack unwinds whether the module ran or failed
        resolver.borrow_mut().end_load(&canonical);

        let handle = result?;
        resolver.borrow_mut().store_handle(canonical, Rc::clone(&handle));
        Ok(handle)
    }

    fn execute_module(&mut self, canonical: &Path) -> RtResult<Rc<ModuleHandle>> {
        let source = fs::read_to_string(canonical)?;

        let tokens = lexer::tokenize(&source)
            .map_err(|e| in_module(canonical, e.full_msg(&source)))?;
        let prog = parser::parse(tokens)
            .map_err(|e| in_module(canonical, e.full_msg(&source)))?;

        let resolver = Rc::clone(&self.resolver);
        let ml = Rc::clone(&self.ml);

        let mut sub = RtContext::with_io(self.io.clone());
        sub.resolver = resolver;
        sub.ml = ml;
        sub.current_file = Some(canonical.to_path_buf());

        if let Err(e) = sub.run_program(&prog) {
            return Err(in_module(canonical, e.full_msg(&source)));
        }

        Ok(Rc::new(ModuleHandle::new(
            canonical.to_path_buf(),
            sub.vars.into_globals(),
            sub.funs
        )))
    }
}

impl Default for RtContext<'_> {
    fn default() -> Self {
        Self::new()
    }
}

fn in_module(path: &Path, msg: String) -> FullRuntimeErr {
    ModuleErr::InModule {
        path: path.display().to_string(),
        msg
    }.into()
}

/// This trait enables the traversal of a program tree.
pub trait TraverseRt {
    /// Apply the effects of this node on the context,
    /// evaluating the expressions within.
    fn traverse_rt(&self, ctx: &mut RtContext) -> RtTraversal<Value>;
}

impl TraverseRt for ast::Block {
    // blocks run in the enclosing scope, so a `soit` inside an
    // `si` block is visible after it
    fn traverse_rt(&self, ctx: &mut RtContext) -> RtTraversal<Value> {
        ctx.traverse_stmts(&self.0)
    }
}

impl TraverseRt for ast::Stmt {
    fn traverse_rt(&self, ctx: &mut RtContext) -> RtTraversal<Value> {
        match self {
            ast::Stmt::Decl { ident, val } => {
                let v = match val {
                    Some(e) => e.traverse_rt(ctx)?,
                    None => Value::Null,
                };

                ctx.vars.declare(ident.clone(), v);
                Ok(Value::Null)
            },
            ast::Stmt::FunDecl { ident, params, block } => {
                let def = FunDef {
                    name: ident.clone(),
                    params: params.clone(),
                    block: Rc::clone(block)
                };

                ctx.funs.insert(ident.clone(), Rc::new(def));
                Ok(Value::Null)
            },
            ast::Stmt::Return(me) => {
                let v = match me {
                    Some(e) => e.traverse_rt(ctx)?,
                    None => Value::Null,
                };

                Err(TermOp::Return(v))
            },
            ast::Stmt::ImportModule { path, alias } => {
                ctx.import_module(path, alias)?;
                Ok(Value::Null)
            },
            ast::Stmt::ImportFrom { path, names } => {
                ctx.import_from(path, names)?;
                Ok(Value::Null)
            },
            ast::Stmt::Assign(pat, e) => {
                let v = e.traverse_rt(ctx)?;
                ctx.assign_pat(pat, v)
            },
            ast::Stmt::AugAssign(pat, op, e) => {
                let rhs = e.traverse_rt(ctx)?;
                ctx.update_pat(pat, *op, rhs)
            },
            ast::Stmt::If { cond, then, els } => {
                if cond.traverse_rt(ctx)?.truth() {
                    then.traverse_rt(ctx)?;
                } else if let Some(b) = els {
                    b.traverse_rt(ctx)?;
                }

                Ok(Value::Null)
            },
            ast::Stmt::While { cond, block } => {
                let mut iterations = 0;
                while cond.traverse_rt(ctx)?.truth() {
                    if !ctx.tick_loop(&mut iterations)? {
                        break;
                    }
                    block.traverse_rt(ctx)?;
                }

                Ok(Value::Null)
            },
            ast::Stmt::ForClassic { init, cond, step, block } => {
                init.traverse_rt(ctx)?;

                let mut iterations = 0;
                while cond.traverse_rt(ctx)?.truth() {
                    if !ctx.tick_loop(&mut iterations)? {
                        break;
                    }
                    block.traverse_rt(ctx)?;
                    step.traverse_rt(ctx)?;
                }

                Ok(Value::Null)
            },
            ast::Stmt::ForIn { ident, iter, block } => {
                let itval = iter.traverse_rt(ctx)?;
                let Some(items) = itval.iterate() else {
                    return Err(TypeErr::NotIterable(itval.ty()).into());
                };

                // the loop variable lives in its own scope
                ctx.vars.push();
                let mut result = Ok(Value::Null);
                let mut iterations = 0;
                for item in items {
                    match ctx.tick_loop(&mut iterations) {
                        Ok(true) => {},
                        Ok(false) => break,
                        Err(e) => {
                            result = Err(e.into());
                            break;
                        },
                    }

                    ctx.vars.declare(ident.clone(), item);
                    if let Err(term) = block.traverse_rt(ctx) {
                        result = Err(term);
                        break;
                    }
                }
                ctx.vars.pop_discard();

                result
            },
            ast::Stmt::Expr(e) => e.traverse_rt(ctx),
        }
    }
}

impl TraverseRt for ast::Expr {
    fn traverse_rt(&self, ctx: &mut RtContext) -> RtTraversal<Value> {
        match self {
            ast::Expr::Ident(id) => Ok(ctx.get_var(id)?),
            ast::Expr::Literal(lit) => Ok(Value::from(lit)),
            ast::Expr::ListLiteral(exprs) => {
                let items = exprs.iter()
                    .map(|e| e.traverse_rt(ctx))
                    .collect::<Result<Vec<_>, _>>()?;

                Ok(Value::new_list(items))
            },
            ast::Expr::DictLiteral(entries) => {
                let mut map = IndexMap::new();
                for (k, e) in entries {
                    let v = e.traverse_rt(ctx)?;
                    map.insert(k.clone(), v);
                }

                Ok(Value::new_dict(map))
            },
            ast::Expr::UnaryOp { op, expr } => {
                let v = expr.traverse_rt(ctx)?;
                Ok(value::apply_unary(*op, v)?)
            },
            ast::Expr::BinaryOp { op, left, right } => {
                // both operands always evaluate, `et` and `ou` included
                let l = left.traverse_rt(ctx)?;
                let r = right.traverse_rt(ctx)?;
                Ok(value::apply_binary(*op, l, r)?)
            },
            ast::Expr::Attr { obj, attr } => {
                let v = obj.traverse_rt(ctx)?;
                match v {
                    Value::Module(handle) => handle.get_variable(attr)
                        .ok_or_else(|| NameErr::UndefinedAttr(attr.clone()).into()),
                    v => Err(TypeErr::CannotAttr(v.ty()))?,
                }
            },
            ast::Expr::Index { expr, index } => {
                let val = expr.traverse_rt(ctx)?;
                let idx = index.traverse_rt(ctx)?;
                Ok(value::get_index(val, idx)?)
            },
            ast::Expr::DictKey { expr, key } => {
                let val = expr.traverse_rt(ctx)?;
                Ok(value::get_dict_key(&val, key)?)
            },
            ast::Expr::Call { funct, args } => {
                let vals = args.iter()
                    .map(|a| a.traverse_rt(ctx))
                    .collect::<Result<Vec<_>, _>>()?;

                match &**funct {
                    ast::Expr::Ident(name) => ctx.call_name(name, vals),
                    // `m.f(...)` runs f over the module's own globals
                    ast::Expr::Attr { obj, attr } => {
                        let objv = obj.traverse_rt(ctx)?;
                        match objv {
                            Value::Module(handle) => {
                                let Some(def) = handle.get_function(attr) else {
                                    return Err(NameErr::UndefinedAttr(attr.clone()).into());
                                };

                                ctx.call_fun(&def, handle.globals_snapshot(), vals)
                            },
                            v => Err(TypeErr::NotCallable(v.ty()))?,
                        }
                    },
                    other => {
                        let v = other.traverse_rt(ctx)?;
                        Err(TypeErr::NotCallable(v.ty()))?
                    },
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{lexer, parser};

    use super::*;

    fn run_in(ctx: &mut RtContext, input: &str) -> Value {
        let tokens = lexer::tokenize(input).unwrap();
        let prog = parser::parse(tokens).unwrap();
        match ctx.run_program(&prog) {
            Ok(v) => v,
            Err(e) => panic!("{}", e.full_msg(input)),
        }
    }

    fn run(input: &str) -> Value {
        run_in(&mut RtContext::new(), input)
    }

    fn run_captured(input: &str) -> (Value, String) {
        let mut out = vec![];
        let value = {
            let hook = rtio::IoHook::new_w(&mut out);
            let mut ctx = RtContext::with_io(hook);
            run_in(&mut ctx, input)
        };

        (value, String::from_utf8(out).unwrap())
    }

    fn run_err(input: &str) -> FullRuntimeErr {
        let tokens = lexer::tokenize(input).unwrap();
        let prog = parser::parse(tokens).unwrap();
        RtContext::new().run_program(&prog)
            .expect_err("program should fail")
    }

    #[test]
    fn arithmetic() {
        assert_eq!(run("1 + 2 * 3"), Value::Int(7));
        assert_eq!(run("(1 + 2) * 3"), Value::Int(9));
        assert_eq!(run("7 % 3"), Value::Int(1));
        assert_eq!(run("7 / 2"), Value::Float(3.5));
        assert_eq!(run("\"a\" + 1"), Value::Str(String::from("a1")));
    }

    #[test]
    fn declarations_and_assignment() {
        assert_eq!(run("soit a = 1; a = a + 1; a"), Value::Int(2));
        assert_eq!(run("soit a = 1; a += 4; a"), Value::Int(5));

        // a `soit` inside an `si` block is visible after it
        assert_eq!(run("si (vrai) { soit b = 3; } b"), Value::Int(3));
    }

    #[test]
    fn return_unwinds() {
        assert_eq!(run("
            fonction f(n) {
                si (n > 0) {
                    pour x dans [1, 2, 3] {
                        retourner n * 10;
                    }
                }
                retourner 0;
            }
            f(5)
        "), Value::Int(50));
    }

    #[test]
    fn function_scope_isolation() {
        // functions see a copy of the globals; writes stay inside
        assert_eq!(run("
            soit x = 1;
            fonction f() { x = 5; retourner x; }
            f() + x
        "), Value::Int(6));

        // locals do not leak out
        let e = run_err("fonction f() { soit y = 2; } f(); y");
        assert!(matches!(
            e.err,
            RuntimeErr::NameErr(NameErr::UndefinedVar(ref n)) if n == "y"
        ));
    }

    #[test]
    fn wrong_arity() {
        let e = run_err("fonction f(a, b) { retourner a; } f(1)");
        assert!(matches!(
            e.err,
            RuntimeErr::ValueErr(ValueErr::WrongArity { expected: 2, got: 1, .. })
        ));
    }

    #[test]
    fn loop_ceiling() {
        let (v, out) = run_captured("soit i = 0; tant_que (vrai) { i += 1; } i");
        assert_eq!(v, Value::Int(1000));
        assert!(out.contains("1000 itérations"));

        // a loop under the ceiling stays silent
        let (v, out) = run_captured("soit i = 0; tant_que (i < 10) { i += 1; } i");
        assert_eq!(v, Value::Int(10));
        assert!(out.is_empty());
    }

    #[test]
    fn for_loops() {
        assert_eq!(run("
            soit total = 0;
            pour (soit i = 1; i <= 4; i += 1) { total += i; }
            total
        "), Value::Int(10));

        let (_, out) = run_captured("pour x dans [1, 2, 3] { imprimer(x); }");
        assert_eq!(out, "1\n2\n3\n");

        // strings iterate by character, dicts by key; mutations of a
        // shared list reach out of the loop scope
        assert_eq!(run("
            soit l = [];
            pour c dans \"abc\" { ajouter(l, c); }
            pour k dans {\"x\": 1, \"y\": 2} { ajouter(l, k); }
            joindre(l, \"\")
        "), Value::Str(String::from("abcxy")));
    }

    #[test]
    fn loop_scope_writes_are_discarded() {
        // `pour ... dans` runs its body in a pushed scope, and an
        // assignment lands there, not in the enclosing scope
        assert_eq!(run("
            soit total = 0;
            pour x dans [1, 2, 3] { total = total + x; }
            total
        "), Value::Int(0));
    }

    #[test]
    fn eager_logic_ops() {
        assert_eq!(run("0 ou \"b\""), Value::Str(String::from("b")));
        assert_eq!(run("1 et \"b\""), Value::Str(String::from("b")));

        // the right side runs even when the left already decides
        let (_, out) = run_captured("
            fonction bruit() { imprimer(\"effet\"); retourner faux; }
            vrai ou bruit();
        ");
        assert_eq!(out, "effet\n");
    }

    #[test]
    fn arreter_stops_cleanly() {
        let (v, out) = run_captured("imprimer(1); arreter(); imprimer(2);");
        assert_eq!(v, Value::Null);
        assert_eq!(out, "1\n");

        // arreter unwinds through function calls
        let (_, out) = run_captured("
            fonction f() { arreter(); }
            imprimer(1); f(); imprimer(2);
        ");
        assert_eq!(out, "1\n");
    }

    #[test]
    fn dict_and_list_access() {
        assert_eq!(run("soit d = {\"a\": 1}; d[\"b\"] = 2; d[\"a\"] + d[\"b\"]"), Value::Int(3));
        assert_eq!(run("soit l = [1, 2]; l[0] = 9; l[0] + l[-1]"), Value::Int(11));
        assert_eq!(run("\"chat\"[1]"), Value::Str(String::from("h")));

        let e = run_err("soit d = {}; d[\"x\"]");
        assert!(matches!(e.err, RuntimeErr::ValueErr(ValueErr::KeyNotFound(_))));
    }

    #[test]
    fn division_by_zero() {
        let e = run_err("1 / 0");
        assert!(matches!(e.err, RuntimeErr::ValueErr(ValueErr::DivisionByZero)));
    }

    #[test]
    fn undefined_names() {
        let e = run_err("inconnu");
        assert!(matches!(e.err, RuntimeErr::NameErr(NameErr::UndefinedVar(_))));

        let e = run_err("inconnue(1)");
        assert!(matches!(e.err, RuntimeErr::NameErr(NameErr::UndefinedFun(_))));
    }

    #[test]
    fn builtins_outrank_user_functions() {
        let (_, out) = run_captured("
            fonction longueur(l) { retourner 42; }
            imprimer(longueur([1]));
        ");
        assert_eq!(out, "1\n");

        // a free name still reaches the declared function
        let (_, out) = run_captured("
            fonction taille(l) { retourner 42; }
            imprimer(taille([1]));
        ");
        assert_eq!(out, "42\n");
    }

    #[test]
    fn augmented_index_evaluates_base_once() {
        let (_, out) = run_captured("
            soit l = [10];
            fonction indice() { imprimer(\"calcul\"); retourner 0; }
            l[indice()] += 5;
            imprimer(l[0]);
        ");
        assert_eq!(out, "calcul\n15\n");
    }

    #[test]
    fn ml_backend_unavailable() {
        let e = run_err("appeler_python_ml(\"predire\", 1)");
        assert!(matches!(e.err, RuntimeErr::FeatureErr(FeatureErr::MlUnavailable(_))));
    }
}
