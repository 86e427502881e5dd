// Wordlist loading and expansion

use anyhow::{Context, Result, bail};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Common directory names probed when no wordlist is supplied
pub const DEFAULT_WORDLIST: &[&str] = &[
    "admin", "backup", "bin", "config", "data", "database", "doc", "docs", "download", "ftp",
    "files", "images", "img", "include", "inc", "js", "lib", "log", "logs", "media", "old",
    "secret", "secure", "src", "static", "temp", "test", "tmp", "upload", "uploads", "var", "web",
];

pub const DEFAULT_CONFIG_DIR: &str = "~/.config/hollow/";

/// Where a wordlist came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WordlistSource {
    File(PathBuf),
    BuiltIn,
}

impl std::fmt::Display for WordlistSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WordlistSource::File(path) => write!(f, "{}", path.display()),
            WordlistSource::BuiltIn => f.write_str("built-in list"),
        }
    }
}

pub fn default_wordlist() -> Vec<String> {
    DEFAULT_WORDLIST.iter().map(|w| w.to_string()).collect()
}

/// Text written by `init`, one entry per line
pub fn default_wordlist_contents() -> String {
    let mut contents = String::from("# Hollow default wordlist\n");
    for word in DEFAULT_WORDLIST {
        contents.push_str(word);
        contents.push('\n');
    }
    contents
}

/// Expand a leading `~` and return `<config_dir>/wordlists/default.txt`
pub fn default_wordlist_path(config_dir: &str) -> PathBuf {
    let expanded = shellexpand::tilde(config_dir);
    Path::new(expanded.as_ref()).join("wordlists").join("default.txt")
}

/// Load a wordlist file, skipping blank lines and `#` comments
pub fn load_wordlist(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read wordlist {}", path.display()))?;

    let words: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !line.starts_with('#'))
        .map(String::from)
        .collect();

    if words.is_empty() {
        bail!(
            "Wordlist {} is empty or contains only comments",
            path.display()
        );
    }

    debug!("Loaded {} entries from {}", words.len(), path.display());
    Ok(words)
}

/// Pick the wordlist for a run: an explicit file, else the user's default
/// file under `config_dir`, else the built-in list.
pub fn resolve_wordlist(explicit: Option<&Path>, config_dir: &str) -> Result<(Vec<String>, WordlistSource)> {
    if let Some(path) = explicit {
        let words = load_wordlist(path)?;
        return Ok((words, WordlistSource::File(path.to_path_buf())));
    }

    let user_default = default_wordlist_path(config_dir);
    if user_default.exists() {
        let words = load_wordlist(&user_default)?;
        return Ok((words, WordlistSource::File(user_default)));
    }

    info!("No wordlist given, using the built-in list");
    Ok((default_wordlist(), WordlistSource::BuiltIn))
}

/// Add a `word/` entry after every word so directories answering only on
/// the slashed form are caught too.
pub fn with_directory_variants(words: &[String]) -> Vec<String> {
    let mut expanded = Vec::with_capacity(words.len() * 2);
    for word in words {
        expanded.push(word.clone());
        if !word.ends_with('/') {
            expanded.push(format!("{}/", word));
        }
    }
    expanded
}

/// Write the default wordlist to `<config_dir>/wordlists/default.txt`
pub fn install_default_wordlist(config_dir: &str) -> Result<PathBuf> {
    let path = default_wordlist_path(config_dir);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(&path, default_wordlist_contents())
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_wordlist_contents_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("default.txt");
        fs::write(&path, default_wordlist_contents()).unwrap();

        assert_eq!(load_wordlist(&path).unwrap(), default_wordlist());
    }

    #[test]
    fn test_directory_variants_keep_order() {
        let words = vec!["admin".to_string(), "logs/".to_string()];
        assert_eq!(with_directory_variants(&words), ["admin", "admin/", "logs/"]);
    }
}
