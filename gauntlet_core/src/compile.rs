use crate::note;
use crate::program::Program;
use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;

/// Cache filename used by [`CompileCache::in_home_dir`].
pub const DEFAULT_CACHE_FILE: &str = ".gauntlet_hash";

/// Errors from compiling a source file.
#[derive(Error, Debug)]
pub enum CompileError {
    #[error("{0} does not exist")]
    MissingSource(PathBuf),

    #[error("failed to invoke the compiler: {0}")]
    CompilerLaunch(io::Error),

    #[error("compiler exited with non-zero status")]
    CompilerFailed,

    #[error("compile cache I/O error: {0}")]
    Cache(io::Error),
}

/// Compiler flag presets.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Preset {
    /// Debug-friendly: sanitizers and checked libstdc++ containers.
    #[default]
    Normal,
    /// Optimized, for profiling runs.
    Fast,
}

impl Preset {
    fn tag(&self) -> &'static str {
        match self {
            Preset::Normal => "normal",
            Preset::Fast => "fast",
        }
    }

    fn flags(&self) -> &'static [&'static str] {
        match self {
            Preset::Normal => &[
                "-std=c++17",
                "-Wall",
                "-g",
                "-fsanitize=address,undefined",
                "-D_GLIBCXX_DEBUG",
            ],
            Preset::Fast => &["-std=c++17", "-O2", "-Wall", "-g"],
        }
    }
}

/// Location of the compile-hash cache file.
///
/// The cache remembers the digest of the most recently compiled source so an
/// unchanged file is not recompiled. It is passed in explicitly rather than
/// read from ambient process state.
#[derive(Debug, Clone)]
pub struct CompileCache {
    path: PathBuf,
}

impl CompileCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        CompileCache { path: path.into() }
    }

    /// The conventional location: `~/.gauntlet_hash`.
    pub fn in_home_dir() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        CompileCache::new(home.join(DEFAULT_CACHE_FILE))
    }

    fn previous_hash(&self) -> String {
        fs::read_to_string(&self.path).unwrap_or_default()
    }

    fn record_hash(&self, hash: &str) -> io::Result<()> {
        fs::write(&self.path, hash)
    }
}

fn hash_source(source: &Path, preset: Preset) -> Result<String, CompileError> {
    let mut data = preset.tag().as_bytes().to_vec();
    data.extend(fs::read(source).map_err(CompileError::Cache)?);
    Ok(format!("{:x}", md5::compute(&data)))
}

/// Compiles `<stem>.cpp` into `<stem>.exe` with g++, skipping the compiler
/// when the cache shows the source and preset are unchanged.
///
/// Returns the [`Program`] for the produced executable.
pub fn compile(stem: &str, preset: Preset, cache: &CompileCache) -> Result<Program, CompileError> {
    let source = PathBuf::from(format!("{stem}.cpp"));
    if !source.exists() {
        note!("{} does not exist, stopping", source.display());
        return Err(CompileError::MissingSource(source));
    }
    let artifact = format!("{stem}.exe");

    let current_hash = hash_source(&source, preset)?;
    if cache.previous_hash() != current_hash {
        note!("recompiling {}", source.display());
        let status = Command::new("g++")
            .args(preset.flags())
            .arg(&source)
            .arg("-o")
            .arg(&artifact)
            .status()
            .map_err(CompileError::CompilerLaunch)?;
        if !status.success() {
            return Err(CompileError::CompilerFailed);
        }
        cache.record_hash(&current_hash).map_err(CompileError::Cache)?;
        note!("recompilation complete");
    }

    Ok(Program::new(format!("./{artifact}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_source(dir: &TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(body.as_bytes()).unwrap();
        path
    }

    #[test]
    fn hash_is_stable_for_identical_source_and_preset() {
        let dir = TempDir::new().unwrap();
        let source = write_source(&dir, "a.cpp", "int main() {}\n");
        let first = hash_source(&source, Preset::Normal).unwrap();
        let second = hash_source(&source, Preset::Normal).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn hash_changes_with_source_content() {
        let dir = TempDir::new().unwrap();
        let a = write_source(&dir, "a.cpp", "int main() {}\n");
        let b = write_source(&dir, "b.cpp", "int main() { return 1; }\n");
        assert_ne!(
            hash_source(&a, Preset::Normal).unwrap(),
            hash_source(&b, Preset::Normal).unwrap()
        );
    }

    #[test]
    fn hash_changes_with_preset() {
        let dir = TempDir::new().unwrap();
        let source = write_source(&dir, "a.cpp", "int main() {}\n");
        assert_ne!(
            hash_source(&source, Preset::Normal).unwrap(),
            hash_source(&source, Preset::Fast).unwrap()
        );
    }

    #[test]
    fn cache_round_trips_a_hash() {
        let dir = TempDir::new().unwrap();
        let cache = CompileCache::new(dir.path().join("hashes"));
        assert_eq!(cache.previous_hash(), "");
        cache.record_hash("abc123").unwrap();
        assert_eq!(cache.previous_hash(), "abc123");
    }

    #[test]
    fn compile_missing_source_fails_fast() {
        let dir = TempDir::new().unwrap();
        let cache = CompileCache::new(dir.path().join("hashes"));
        match compile("no_such_source_file_321", Preset::Normal, &cache) {
            Err(CompileError::MissingSource(path)) => {
                assert_eq!(path, PathBuf::from("no_such_source_file_321.cpp"));
            }
            other => panic!("expected a missing-source error, got {other:?}"),
        }
    }
}
