// ABOUTME: Process-wide state bundled into an explicit, shareable context (§5, §9)

use crate::error::Diagnostic;
use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use std::rc::Rc;

/// Diagnostic verbosity, mirroring the CLI's `--verbosity N` (§6a).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Verbosity(pub u8);

impl Default for Verbosity {
    fn default() -> Self {
        Verbosity(1)
    }
}

/// Everything §5 calls "shared resources": the substitution-argument
/// context, file stack, macro stack, all-includes record, verbosity, and
/// launch-mode flag. Bundled into one struct passed by reference rather
/// than kept in process globals, per the design note in §9. `Rc<RefCell<_>>`
/// so a `Scope` can reach it for lazy `xacro.*` expression evaluation
/// without threading an extra parameter through every lookup.
pub struct Context {
    pub file_stack: Vec<String>,
    pub macro_stack: Vec<String>,
    pub subst_args: HashMap<String, String>,
    pub all_includes: BTreeSet<PathBuf>,
    pub verbosity: Verbosity,
    pub launch_mode: bool,
    pub max_depth: usize,
    pub package_paths: Vec<PathBuf>,
    pub diagnostics: Vec<Diagnostic>,
    anon_names: HashMap<String, String>,
    anon_counter: usize,
}

impl Default for Context {
    fn default() -> Self {
        Context {
            file_stack: Vec::new(),
            macro_stack: Vec::new(),
            subst_args: HashMap::new(),
            all_includes: BTreeSet::new(),
            verbosity: Verbosity::default(),
            launch_mode: false,
            max_depth: 256,
            package_paths: package_paths_from_env(),
            diagnostics: Vec::new(),
            anon_names: HashMap::new(),
            anon_counter: 0,
        }
    }
}

fn package_paths_from_env() -> Vec<PathBuf> {
    std::env::var_os("XACRO_PACKAGE_PATH")
        .map(|v| std::env::split_paths(&v).collect())
        .unwrap_or_default()
}

impl Context {
    pub fn push_file(&mut self, path: impl Into<String>) {
        self.file_stack.push(path.into());
    }

    pub fn pop_file(&mut self) {
        self.file_stack.pop();
    }

    pub fn current_file(&self) -> Option<&str> {
        self.file_stack.last().map(String::as_str)
    }

    pub fn push_macro(&mut self, activation: impl Into<String>) {
        self.macro_stack.push(activation.into());
    }

    pub fn pop_macro(&mut self) {
        self.macro_stack.pop();
    }

    pub fn record_include(&mut self, path: PathBuf) {
        self.all_includes.insert(path);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            message: message.into(),
            file_stack: self.file_stack.clone(),
        });
    }

    /// `$(find PKG)` resolution: searches `XACRO_PACKAGE_PATH` entries for a
    /// directory named `pkg`. A real ROS package index is out of scope
    /// (§6a); this is the best-effort stand-in.
    pub fn find_package(&self, pkg: &str) -> Option<PathBuf> {
        self.package_paths
            .iter()
            .map(|base| base.join(pkg))
            .find(|candidate| candidate.is_dir())
    }

    /// `$(anon NAME)`: the first use of a given name is remembered for the
    /// rest of the run so repeated references agree, without relying on
    /// real randomness (§5 forbids non-deterministic output).
    pub fn anon(&mut self, name: &str) -> String {
        if let Some(existing) = self.anon_names.get(name) {
            return existing.clone();
        }
        self.anon_counter += 1;
        let generated = format!("{name}_{}", self.anon_counter);
        self.anon_names.insert(name.to_string(), generated.clone());
        generated
    }

    /// Resolves a path relative to the currently processing file (the top
    /// of the file stack), for `xacro.abs_filename`.
    pub fn abs_filename(&self, path: &str) -> PathBuf {
        let p = PathBuf::from(path);
        if p.is_absolute() {
            return p;
        }
        match self.current_file() {
            Some(current) => PathBuf::from(current)
                .parent()
                .map(|dir| dir.join(&p))
                .unwrap_or(p),
            None => p,
        }
    }
}

pub type SharedContext = Rc<RefCell<Context>>;

pub fn new_shared() -> SharedContext {
    Rc::new(RefCell::new(Context::default()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_stack_pushes_and_pops() {
        let mut ctx = Context::default();
        ctx.push_file("a.xacro");
        ctx.push_file("b.xacro");
        assert_eq!(ctx.current_file(), Some("b.xacro"));
        ctx.pop_file();
        assert_eq!(ctx.current_file(), Some("a.xacro"));
    }

    #[test]
    fn all_includes_is_sorted_and_deduplicated() {
        let mut ctx = Context::default();
        ctx.record_include(PathBuf::from("/b.xacro"));
        ctx.record_include(PathBuf::from("/a.xacro"));
        ctx.record_include(PathBuf::from("/a.xacro"));
        let ordered: Vec<_> = ctx.all_includes.iter().collect();
        assert_eq!(ordered, vec![&PathBuf::from("/a.xacro"), &PathBuf::from("/b.xacro")]);
    }
}
