//! URL path to docroot-confined filesystem path.

use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};

use crate::error::ServeError;

/// Outcome of resolving a request target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    /// The bare root `/`: render the generated listing page.
    Listing,
    File(ResolvedFile),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFile {
    /// Canonical absolute path, inside the docroot
    pub path: PathBuf,
    /// Counter key: "/" followed by the docroot-relative path
    pub key: String,
}

#[derive(Debug, Clone)]
pub struct PathResolver {
    root: PathBuf,
}

impl PathResolver {
    /// Canonicalizes `docroot` once; every resolution is checked against it.
    pub fn new(docroot: impl AsRef<Path>) -> std::io::Result<Self> {
        let root = std::fs::canonicalize(docroot)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves a raw request target.
    ///
    /// The result is either the listing marker or the canonical path of an
    /// existing regular file under the docroot. Missing paths and
    /// non-files are `NotFound`; anything that lands outside the docroot,
    /// lexically or through a symlink, is `PathEscape`.
    pub async fn resolve(&self, raw: &str) -> Result<Resolved, ServeError> {
        let Some(relative) = normalize(raw)? else {
            return Ok(Resolved::Listing);
        };

        let joined = self.root.join(&relative);
        // Missing entries, file-as-directory and the like all read as 404.
        let canonical = match tokio::fs::canonicalize(&joined).await {
            Ok(path) => path,
            Err(e) => {
                debug!(path = %raw, error = %e, "cannot canonicalize");
                return Err(ServeError::NotFound);
            }
        };

        if !canonical.starts_with(&self.root) {
            warn!(path = %raw, resolved = %canonical.display(), "symlink escapes docroot");
            return Err(ServeError::PathEscape);
        }

        let meta = tokio::fs::metadata(&canonical).await?;
        if !meta.is_file() {
            return Err(ServeError::NotFound);
        }

        let key = counter_key(&self.root, &canonical)?;
        Ok(Resolved::File(ResolvedFile { path: canonical, key }))
    }
}

/// Lexical half of resolution: decodes the target and folds `.` and `..`.
///
/// Returns `None` for the listing root, otherwise a relative path with
/// only normal components. Touches no filesystem state.
pub fn normalize(raw: &str) -> Result<Option<PathBuf>, ServeError> {
    let target = strip_query(raw);

    if target == "/" {
        return Ok(None);
    }
    if !target.starts_with('/') {
        return Err(ServeError::Malformed(format!("request target {:?}", raw)));
    }

    let decoded = urlencoding::decode(target)
        .map_err(|_| ServeError::Malformed("path is not valid UTF-8".to_string()))?;

    if decoded.contains('\0') || decoded.starts_with("//") {
        return Err(ServeError::PathEscape);
    }

    let mut segments: Vec<&str> = Vec::new();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err(ServeError::PathEscape);
                }
            }
            other => segments.push(other),
        }
    }

    let relative: PathBuf = segments.iter().collect();
    // A segment can still smuggle a root or prefix on some platforms.
    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        return Err(ServeError::PathEscape);
    }
    Ok(Some(relative))
}

fn strip_query(raw: &str) -> &str {
    match raw.find(|c: char| c == '?' || c == '#') {
        Some(idx) => &raw[..idx],
        None => raw,
    }
}

fn counter_key(root: &Path, canonical: &Path) -> Result<String, ServeError> {
    let rel = canonical
        .strip_prefix(root)
        .map_err(|_| ServeError::PathEscape)?;

    Ok(key_for(rel))
}

/// "/" followed by `rel` with forward-slash separators.
pub(crate) fn key_for(rel: &Path) -> String {
    let mut key = String::new();
    for component in rel.components() {
        key.push('/');
        key.push_str(&component.as_os_str().to_string_lossy());
    }
    if key.is_empty() {
        key.push('/');
    }
    key
}
