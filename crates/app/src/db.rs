use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

pub const DEFAULT_DB_URL: &str = "sqlite://textbook.sqlite3";

fn is_in_memory(url: &str) -> bool {
    url == "sqlite::memory:" || url.contains("mode=memory")
}

/// Turn a bare path or `sqlite:` URL into an absolute `sqlite://` URL.
pub fn normalize_sqlite_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if is_in_memory(trimmed) || trimmed.starts_with("sqlite://") {
        return trimmed.to_owned();
    }

    let path = Path::new(trimmed.strip_prefix("sqlite:").unwrap_or(trimmed));
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

/// Create the database file and its parent directories if missing.
pub fn prepare_sqlite_file(db_url: &str) -> Result<()> {
    if is_in_memory(db_url) {
        return Ok(());
    }

    let Some(path) = db_url.strip_prefix("sqlite://") else {
        bail!("invalid database url: {db_url}");
    };
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        bail!("invalid database url: {db_url}");
    }

    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)
            .with_context(|| format!("creating {}", path.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_are_made_absolute() {
        assert_eq!(normalize_sqlite_url("sqlite:///tmp/a.db"), "sqlite:///tmp/a.db");
        assert_eq!(normalize_sqlite_url("sqlite:/tmp/b.db"), "sqlite:///tmp/b.db");
        assert_eq!(normalize_sqlite_url("/tmp/c.db"), "sqlite:///tmp/c.db");
        assert_eq!(normalize_sqlite_url(" sqlite::memory: "), "sqlite::memory:");

        let relative = normalize_sqlite_url("book.sqlite3");
        assert!(relative.starts_with("sqlite:///"));
        assert!(relative.ends_with("/book.sqlite3"));
    }

    #[test]
    fn memory_urls_need_no_file() {
        prepare_sqlite_file("sqlite::memory:").unwrap();
        prepare_sqlite_file("sqlite:file:cli?mode=memory&cache=shared").unwrap();
        assert!(prepare_sqlite_file("postgres://nope").is_err());
    }

    #[test]
    fn file_and_parents_are_created() {
        let dir = std::env::temp_dir().join(format!("textbook-cli-{}", std::process::id()));
        let file = dir.join("nested").join("book.sqlite3");
        prepare_sqlite_file(&format!("sqlite://{}?mode=rwc", file.display())).unwrap();
        assert!(file.exists());
        std::fs::remove_dir_all(dir).unwrap();
    }
}
