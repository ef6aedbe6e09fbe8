//! Locating, caching, and executing imported modules.
//!
//! [`ModuleResolver`] turns import paths into canonical file paths,
//! remembers which modules already ran, and detects import cycles.
//! [`ModuleHandle`] is the executed module: a snapshot of its global
//! variables and its function table.

use std::collections::HashMap;
use std::env;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::err::FiaErr;

use super::value::Value;
use super::FunDef;

/// An executed module.
///
/// A handle is created once per module file per resolver lifetime.
/// Re-imports under any alias reuse it, so top-level side effects of
/// the module fire exactly once.
#[derive(Debug)]
pub struct ModuleHandle {
    path: PathBuf,
    globals: HashMap<String, Value>,
    funs: HashMap<String, Rc<FunDef>>
}

impl ModuleHandle {
    /// Wrap the outcome of a module run.
    pub fn new(
        path: PathBuf,
        globals: HashMap<String, Value>,
        funs: HashMap<String, Rc<FunDef>>
    ) -> Self {
        Self { path, globals, funs }
    }

    /// The canonical path of the module file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The module's display name: its file stem.
    pub fn name(&self) -> String {
        self.path.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    /// Read a global variable of the module.
    pub fn get_variable(&self, name: &str) -> Option<Value> {
        self.globals.get(name).cloned()
    }

    /// Look up a function declared in the module.
    pub fn get_function(&self, name: &str) -> Option<Rc<FunDef>> {
        self.funs.get(name).cloned()
    }

    /// A copy of the module's global scope, used as the globals of
    /// calls into the module's functions.
    pub fn globals_snapshot(&self) -> HashMap<String, Value> {
        self.globals.clone()
    }
}

/// An error raised while resolving or running a module.
#[derive(Debug, PartialEq, Eq)]
pub enum ModuleErr {
    /// No candidate file exists for the import path.
    NotFound {
        /// The path as written in the import
        path: String,
        /// Every file path that was probed
        probed: Vec<PathBuf>
    },

    /// A module is importing itself, possibly through other modules.
    /// The chain runs from the first import to the repeated one.
    CircularImport(Vec<PathBuf>),

    /// The module's own code failed. The message holds the rendered
    /// error from the module source.
    InModule {
        /// The module file
        path: String,
        /// The rendered inner error
        msg: String
    }
}

impl FiaErr for ModuleErr {
    fn err_name(&self) -> &'static str {
        "erreur de module"
    }
}

impl Display for ModuleErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModuleErr::NotFound { path, probed } => {
                let probed: Vec<_> = probed.iter()
                    .map(|p| p.display().to_string())
                    .collect();
                write!(f, "module '{path}' introuvable (chemins essayés: {})", probed.join(", "))
            },
            ModuleErr::CircularImport(chain) => {
                let chain: Vec<_> = chain.iter()
                    .map(|p| p.display().to_string())
                    .collect();
                write!(f, "import circulaire détecté: {}", chain.join(" -> "))
            },
            ModuleErr::InModule { path, msg } => {
                write!(f, "erreur dans le module '{path}': {msg}")
            },
        }
    }
}

/// The resolver and cache for imported modules.
pub struct ModuleResolver {
    search_paths: Vec<PathBuf>,
    cache: HashMap<PathBuf, Rc<ModuleHandle>>,
    loading: Vec<PathBuf>
}

impl ModuleResolver {
    /// Create a resolver with the default search paths: the working
    /// directory, its `lib/` directory when present, and the entries
    /// of the `FIA_PATH` environment variable.
    pub fn new() -> Self {
        let mut search_paths = vec![];

        if let Ok(cwd) = env::current_dir() {
            let lib = cwd.join("lib");
            search_paths.push(cwd);
            if lib.is_dir() {
                search_paths.push(lib);
            }
        }
        if let Ok(fia_path) = env::var("FIA_PATH") {
            search_paths.extend(env::split_paths(&fia_path).filter(|p| p.is_dir()));
        }

        Self { search_paths, cache: HashMap::new(), loading: vec![] }
    }

    /// Resolve an import path to a canonical file path.
    ///
    /// A path starting with `./` is pinned to the directory of the
    /// importing file; any other path goes through the search paths
    /// alone. Paths without the `.fia` suffix are probed with it
    /// added. Backslashes are accepted as separators.
    pub fn resolve(&self, path: &str, importer: Option<&Path>) -> Result<PathBuf, ModuleErr> {
        let normalized = path.replace('\\', "/");

        let mut candidates = vec![PathBuf::from(&normalized)];
        if !normalized.ends_with(".fia") {
            candidates.push(PathBuf::from(format!("{normalized}.fia")));
        }

        let roots = match (normalized.starts_with("./"), importer.and_then(Path::parent)) {
            (true, Some(dir)) => vec![dir.to_path_buf()],
            _ => self.search_paths.clone(),
        };

        let mut probed = vec![];
        for root in &roots {
            for cand in &candidates {
                let full = root.join(cand);
                if full.is_file() {
                    if let Ok(canonical) = full.canonicalize() {
                        return Ok(canonical);
                    }
                }
                probed.push(full);
            }
        }

        Err(ModuleErr::NotFound { path: path.to_string(), probed })
    }

    /// The handle of a module that already ran, if any.
    pub fn handle(&self, canonical: &Path) -> Option<Rc<ModuleHandle>> {
        let handle = self.cache.get(canonical).cloned();
        if handle.is_some() {
            log::debug!("module déjà chargé: {}", canonical.display());
        }
        handle
    }

    /// Mark a module as loading. Errors with the whole chain when the
    /// module is already on the loading stack.
    pub fn begin_load(&mut self, canonical: &Path) -> Result<(), ModuleErr> {
        if self.loading.iter().any(|p| p == canonical) {
            let mut chain = self.loading.clone();
            chain.push(canonical.to_path_buf());
            return Err(ModuleErr::CircularImport(chain));
        }

        self.loading.push(canonical.to_path_buf());
        Ok(())
    }

    /// Take a module off the loading stack. This runs whether its
    /// load succeeded or failed.
    pub fn end_load(&mut self, canonical: &Path) {
        if let Some(i) = self.loading.iter().rposition(|p| p == canonical) {
            self.loading.remove(i);
        }
    }

    /// Remember the handle of a module that finished running.
    pub fn store_handle(&mut self, canonical: PathBuf, handle: Rc<ModuleHandle>) {
        self.cache.insert(canonical, handle);
    }

    /// Drop every cached module and the loading stack, so the next
    /// import executes module files again.
    pub fn reset(&mut self) {
        self.cache.clear();
        self.loading.clear();
    }
}

impl Default for ModuleResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn fixture_dir(name: &str) -> PathBuf {
        let dir = env::temp_dir().join("fia-resolver-tests").join(name);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn suffix_added_when_missing() {
        let dir = fixture_dir("suffix");
        fs::write(dir.join("outils.fia"), "soit a = 1;").unwrap();

        let resolver = ModuleResolver::new();
        let importer = dir.join("principal.fia");

        let found = resolver.resolve("./outils", Some(&importer)).unwrap();
        assert_eq!(found, dir.join("outils.fia").canonicalize().unwrap());

        let found = resolver.resolve("./outils.fia", Some(&importer)).unwrap();
        assert_eq!(found, dir.join("outils.fia").canonicalize().unwrap());
    }

    #[test]
    fn plain_paths_skip_the_importer_dir() {
        let dir = fixture_dir("plain");
        fs::write(dir.join("outils.fia"), "soit a = 1;").unwrap();

        let resolver = ModuleResolver::new();
        let importer = dir.join("principal.fia");

        // without the `./` marker only the search paths are probed,
        // and the fixture dir is not one of them
        assert!(resolver.resolve("outils", Some(&importer)).is_err());
        assert!(resolver.resolve("./outils", Some(&importer)).is_ok());
    }

    #[test]
    fn missing_module_lists_probes() {
        let dir = fixture_dir("missing");
        let resolver = ModuleResolver::new();
        let importer = dir.join("principal.fia");

        match resolver.resolve("./fantome", Some(&importer)) {
            Err(ModuleErr::NotFound { path, probed }) => {
                assert_eq!(path, "./fantome");
                assert!(probed.contains(&dir.join("./fantome")));
                assert!(probed.contains(&dir.join("./fantome.fia")));
            },
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn cycle_reports_chain() {
        let a = PathBuf::from("/tmp/a.fia");
        let b = PathBuf::from("/tmp/b.fia");

        let mut resolver = ModuleResolver::new();
        resolver.begin_load(&a).unwrap();
        resolver.begin_load(&b).unwrap();

        match resolver.begin_load(&a) {
            Err(ModuleErr::CircularImport(chain)) => {
                assert_eq!(chain, vec![a.clone(), b.clone(), a.clone()]);
            },
            other => panic!("expected CircularImport, got {other:?}"),
        }

        // cleanup still leaves the stack consistent
        resolver.end_load(&b);
        resolver.end_load(&a);
        assert!(resolver.begin_load(&a).is_ok());
    }

    #[test]
    fn reset_clears_cache() {
        let dir = fixture_dir("reset");
        let path = dir.join("m.fia");
        fs::write(&path, "").unwrap();
        let canonical = path.canonicalize().unwrap();

        let mut resolver = ModuleResolver::new();
        let handle = Rc::new(ModuleHandle::new(
            canonical.clone(),
            HashMap::new(),
            HashMap::new()
        ));
        resolver.store_handle(canonical.clone(), handle);
        assert!(resolver.handle(&canonical).is_some());

        resolver.reset();
        assert!(resolver.handle(&canonical).is_none());
    }
}
