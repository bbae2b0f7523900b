//! Top-level import scanning and resolution.
//!
//! Test modules pull helpers in through `import a.b` and `from a.b import x`
//! statements. Only top-level statements count (an import inside a function
//! body is invisible to the fingerprint, matching the structural-analysis
//! rule that inclusion follows the module header, not runtime behavior).
//! Resolution maps a dotted module name to a file location; whether that
//! location is inside the project decides if it is folded into the
//! fingerprint.

use std::path::{Component, Path, PathBuf};

use crate::error::FingerprintError;
use crate::lexer::{Token, TokenKind};

/// A top-level import statement found in a module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    /// Dotted module name; leading dots for relative imports are kept.
    pub module: String,
    /// One-based source line of the statement.
    pub line: usize,
}

/// Scans a token stream for top-level import statements.
///
/// A statement is top-level when its line starts at column zero; statements
/// split off by a semicolon inherit their line's indentation, so
/// `x = 1; import helpers` is still top-level. For `import a, b` only the
/// first name is taken; for `from a.b import x` the source module `a.b` is
/// taken; an `as` alias never contributes to the name.
pub fn scan_imports(tokens: &[Token]) -> Vec<Import> {
    let mut imports = Vec::new();
    let mut base_col = 0;
    for (i, token) in tokens.iter().enumerate() {
        let at_statement_start = i == 0 || tokens[i - 1].kind == TokenKind::Newline;
        if !at_statement_start {
            continue;
        }
        if i == 0 || tokens[i - 1].text == "\n" {
            base_col = token.col;
        }
        if token.kind != TokenKind::Ident || base_col != 0 {
            continue;
        }
        let module = match token.text.as_str() {
            "import" | "from" => collect_dotted(&tokens[i + 1..]),
            _ => continue,
        };
        if !module.is_empty() {
            imports.push(Import {
                module,
                line: token.line,
            });
        }
    }
    imports
}

fn collect_dotted(tokens: &[Token]) -> String {
    let mut name = String::new();
    for token in tokens {
        // An identifier only continues the name right after a dot (or at the
        // very start); anything else — `as`, a second name, `import` — ends
        // the dotted chain.
        let continuing = name.is_empty() || name.ends_with('.');
        match token.kind {
            TokenKind::Op if token.text == "." => name.push('.'),
            TokenKind::Ident if continuing && token.text != "import" => {
                name.push_str(&token.text);
            }
            _ => break,
        }
    }
    name
}

/// Resolves dotted module names to file locations within a project.
///
/// This is the seam between fingerprinting and the surrounding tooling's
/// knowledge of where source lives. `resolve_import` returns `Ok(None)` for
/// modules that are not part of the project (installed dependencies,
/// builtins); those are never folded into a fingerprint.
pub trait ProjectResolver {
    /// The enclosing project root directory.
    fn project_root(&self) -> &Path;

    /// Maps a dotted module name, as imported from `importer`, to a file.
    fn resolve_import(
        &self,
        name: &str,
        importer: &Path,
    ) -> Result<Option<PathBuf>, FingerprintError>;
}

/// Filesystem-backed project layout: a root directory with dotted module
/// names mapping onto `<root>/a/b.py` or package `__init__.py` files.
#[derive(Debug, Clone)]
pub struct ProjectLayout {
    root: PathBuf,
}

impl ProjectLayout {
    /// Creates a layout rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: normalize(&root.into()),
        }
    }

    /// Returns `true` if `path` is inside the project root.
    ///
    /// This is a path-ancestor test on normalized components, not a string
    /// comparison: `/work/proj-extras/x.py` is not inside `/work/proj`.
    pub fn contains(&self, path: &Path) -> bool {
        normalize(path).starts_with(&self.root)
    }

    fn candidate(&self, base: &Path, segments: &[&str]) -> Option<PathBuf> {
        let mut dir = base.to_path_buf();
        for segment in &segments[..segments.len() - 1] {
            dir.push(segment);
        }
        let leaf = segments[segments.len() - 1];
        let as_file = dir.join(format!("{leaf}.py"));
        if as_file.is_file() {
            return Some(as_file);
        }
        let as_package = dir.join(leaf).join("__init__.py");
        if as_package.is_file() {
            return Some(as_package);
        }
        None
    }
}

impl ProjectResolver for ProjectLayout {
    fn project_root(&self) -> &Path {
        &self.root
    }

    fn resolve_import(
        &self,
        name: &str,
        importer: &Path,
    ) -> Result<Option<PathBuf>, FingerprintError> {
        let dots = name.chars().take_while(|&c| c == '.').count();
        let segments: Vec<&str> = name[dots..].split('.').filter(|s| !s.is_empty()).collect();

        if dots > 0 {
            // Relative import: anchored at the importer's package, one level
            // up per extra dot. These must land on a project file.
            let mut base = importer.parent().map(normalize).unwrap_or_default();
            for _ in 1..dots {
                if !base.pop() {
                    break;
                }
            }
            if !segments.is_empty() {
                if let Some(found) = self.candidate(&base, &segments) {
                    return Ok(Some(found));
                }
            }
            return Err(FingerprintError::Resolution {
                name: name.to_string(),
                path: importer.to_path_buf(),
            });
        }

        if segments.is_empty() {
            return Err(FingerprintError::Resolution {
                name: name.to_string(),
                path: importer.to_path_buf(),
            });
        }

        // Absolute name: look under the project root; anything else is an
        // installed dependency and stays out of the fingerprint.
        Ok(self.candidate(&self.root, &segments))
    }
}

/// Lexically normalizes a path: folds `.` and resolves `..` components.
pub(crate) fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(Component::ParentDir);
                }
            }
            other => out.push(other),
        }
    }
    out
}
