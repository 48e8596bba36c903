use crate::config::DriftConfig;
use crate::error::{DriftError, Result};
use crate::region_tags::scan_marker_tags;
use ignore::WalkBuilder;
use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// Source and test files under a root, each list sorted
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScannedFiles {
    pub sources: Vec<PathBuf>,
    pub tests: Vec<PathBuf>,
}

/// Scanner for sample sources, tests, override files and raw markers
pub struct FileScanner<'c> {
    root: PathBuf,
    config: &'c DriftConfig,
}

impl<'c> FileScanner<'c> {
    pub fn new(root: impl AsRef<Path>, config: &'c DriftConfig) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            config,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Scan for source and test files (.gitignore aware, hidden entries skipped)
    pub fn scan(&self) -> ScannedFiles {
        let mut files = ScannedFiles::default();

        let root = self.root.clone();
        let excluded = self.config.excluded_dirs.clone();
        let mut builder = WalkBuilder::new(&self.root);
        builder
            .hidden(true)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true);
        builder.filter_entry(move |entry| !is_excluded_scope(entry.path(), &root, &excluded));

        for result in builder.build() {
            match result {
                Ok(entry) => {
                    if !entry.file_type().is_some_and(|t| t.is_file()) {
                        continue;
                    }

                    let path = entry.path();
                    if !self.config.is_source_extension(path) {
                        continue;
                    }

                    if self.config.is_test_path(path) {
                        files.tests.push(path.to_path_buf());
                    } else {
                        files.sources.push(path.to_path_buf());
                    }
                }
                Err(e) => log::warn!("Failed to read entry: {e}"),
            }
        }

        files.sources.sort();
        files.tests.sort();
        log::info!(
            "Found {} source file(s) and {} test file(s) under {}",
            files.sources.len(),
            files.tests.len(),
            self.root.display()
        );
        files
    }

    /// Every override file under the root, sorted
    pub fn override_files(&self) -> Vec<PathBuf> {
        let name = self.config.override_file_name.as_str();
        let mut paths: Vec<PathBuf> = self
            .walk_all()
            .filter(|path| path.file_name().is_some_and(|n| n == name))
            .collect();
        paths.sort();
        paths
    }

    /// Tags named by start markers in any scanned file, independent of parsing
    pub fn marker_tags(&self) -> Result<BTreeSet<String>> {
        let mut tags = BTreeSet::new();
        for path in self
            .walk_all()
            .filter(|path| self.config.is_marker_scan_extension(path))
        {
            let bytes = std::fs::read(&path).map_err(|e| DriftError::io(&path, e))?;
            tags.extend(scan_marker_tags(&String::from_utf8_lossy(&bytes)));
        }
        Ok(tags)
    }

    /// All files, hidden ones included, outside excluded directories
    fn walk_all(&self) -> impl Iterator<Item = PathBuf> + '_ {
        WalkDir::new(&self.root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| {
                entry.depth() == 0 || !is_excluded_scope(entry.path(), &self.root, &self.config.excluded_dirs)
            })
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    log::warn!("Failed to read entry: {e}");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .map(walkdir::DirEntry::into_path)
    }
}

/// True when any path component below `root` is an excluded directory name
fn is_excluded_scope(path: &Path, root: &Path, excluded: &[String]) -> bool {
    let Ok(relative) = path.strip_prefix(root) else {
        return false;
    };
    relative.components().any(|component| match component {
        Component::Normal(name) => {
            let name = name.to_string_lossy();
            name == ".git" || excluded.iter().any(|e| *e == name)
        }
        _ => false,
    })
}
