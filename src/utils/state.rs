use std::{
    collections::BTreeSet,
    fs,
    io::ErrorKind,
    path::Path,
};

use eyre::{Result, WrapErr};
use log::{debug, info};

/// Loads the seen-jobs file, one URL per line. A missing file is an empty set.
pub fn load_seen(path: &Path) -> Result<BTreeSet<String>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            info!("no state file at {}, starting fresh", path.display());
            return Ok(BTreeSet::new());
        }
        Err(e) => {
            return Err(e).wrap_err_with(|| format!("failed to read state file {}", path.display()));
        }
    };

    let seen: BTreeSet<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect();

    debug!("loaded {} urls from {}", seen.len(), path.display());
    Ok(seen)
}

/// Overwrites the seen-jobs file with exactly `urls`, sorted, even when empty.
pub fn save_seen(path: &Path, urls: &BTreeSet<String>) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut content = urls.iter().map(String::as_str).collect::<Vec<_>>().join("\n");
    if !content.is_empty() {
        content.push('\n');
    }

    fs::write(path, content)
        .wrap_err_with(|| format!("failed to write state file {}", path.display()))?;
    debug!("wrote {} urls to {}", urls.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_empty() -> Result<()> {
        let dir = tempfile::tempdir()?;
        assert!(load_seen(&dir.path().join("absent.txt"))?.is_empty());
        Ok(())
    }

    #[test]
    fn save_overwrites_and_creates_parents() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("nested/seen.txt");

        let first: BTreeSet<String> = ["https://a.test/2", "https://a.test/1"]
            .into_iter()
            .map(String::from)
            .collect();
        save_seen(&path, &first)?;
        assert_eq!(fs::read_to_string(&path)?, "https://a.test/1\nhttps://a.test/2\n");

        save_seen(&path, &BTreeSet::new())?;
        assert!(load_seen(&path)?.is_empty());
        Ok(())
    }
}
