//! Default filesystem locations for `buildfinder`'s persistent state.

use camino::Utf8PathBuf;
use std::cell::RefCell;

// Thread-local override used only in tests to avoid process-global env races.
thread_local! {
    static THREAD_HOME: RefCell<Option<Utf8PathBuf>> = const { RefCell::new(None) };
}

/// Resolve the buildfinder home directory:
/// 1) thread-local override (tests use this)
/// 2) env `BUILDFINDER_HOME`
/// 3) `dirs::cache_dir()/buildfinder`, falling back to `.buildfinder`
#[must_use]
pub fn buildfinder_home() -> Utf8PathBuf {
    if let Some(tl) = THREAD_HOME.with(|tl| tl.borrow().clone()) {
        return tl;
    }
    if let Ok(p) = std::env::var("BUILDFINDER_HOME") {
        return Utf8PathBuf::from(p);
    }
    dirs::cache_dir()
        .and_then(|p| Utf8PathBuf::from_path_buf(p).ok())
        .map(|p| p.join("buildfinder"))
        .unwrap_or_else(|| Utf8PathBuf::from(".buildfinder"))
}

/// Returns `<buildfinder_home>/cache`, the default root for the persistent
/// JSON maps described in spec.md §6 ("Cached files").
#[must_use]
pub fn cache_dir() -> Utf8PathBuf {
    buildfinder_home().join("cache")
}

/// `mkdir -p`, treating `AlreadyExists` as success.
pub fn ensure_dir_all<P: AsRef<std::path::Path>>(p: P) -> std::io::Result<()> {
    match std::fs::create_dir_all(&p) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(()),
        Err(e) => Err(e),
    }
}

/// Test helper: give the current thread an isolated home under the system
/// temp dir, held alive for the returned guard's lifetime.
#[cfg(any(test, feature = "test-utils"))]
#[must_use]
pub fn with_isolated_home() -> tempfile::TempDir {
    let td = tempfile::TempDir::new().expect("create temp home");
    let p = Utf8PathBuf::from_path_buf(td.path().to_path_buf()).unwrap();
    THREAD_HOME.with(|tl| *tl.borrow_mut() = Some(p));
    td
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn isolated_home_overrides_default() {
        let guard = with_isolated_home();
        let home = buildfinder_home();
        assert_eq!(home.as_std_path(), guard.path());
        assert!(ensure_dir_all(cache_dir()).is_ok());
        assert!(cache_dir().starts_with(&home));
    }
}
