use std::collections::HashMap;
use std::env as stdenv;
use std::path::{Path, PathBuf};

/// Shell-level view of the process environment.
///
/// - `vars`: variables captured at startup, overridable by the shell.
/// - `current_dir`: the working directory the shell believes it is in. Kept in
///   sync with the real process directory by `cd`, since children spawned by
///   `fork` inherit the process directory, not this field.
#[derive(Debug, Clone)]
pub struct Environment {
    /// Key-value store of environment variables (e.g., PATH, HOME).
    pub vars: HashMap<String, String>,
    /// The current working directory of the shell.
    pub current_dir: PathBuf,
}

impl Environment {
    /// Capture the current process state into a new `Environment` instance.
    pub fn new() -> Self {
        let vars = stdenv::vars().collect();
        let current_dir = stdenv::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self { vars, current_dir }
    }

    /// Get the value of an environment variable.
    ///
    /// Looks up the key in `self.vars` first, falling back to `std::env::var`.
    pub fn get_var(&self, key: &str) -> Option<String> {
        self.vars
            .get(key)
            .cloned()
            .or_else(|| stdenv::var(key).ok())
    }

    /// Set or override an environment variable in `self.vars`.
    pub fn set_var(&mut self, key: impl Into<String>, val: impl Into<String>) {
        self.vars.insert(key.into(), val.into());
    }

    /// The `HOME` directory, if set.
    pub fn home(&self) -> Option<PathBuf> {
        self.get_var("HOME")
            .filter(|h| !h.is_empty())
            .map(PathBuf::from)
    }

    /// Resolve `target` against the shell's working directory.
    pub fn resolve(&self, target: &Path) -> PathBuf {
        if target.is_absolute() {
            target.to_path_buf()
        } else {
            self.current_dir.join(target)
        }
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}
