//! Shared test utilities for graph builds

use std::{fs, path::Path};
use tempfile::TempDir;

/// Initialize logging for tests
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}

/// Writes `files` (relative path, content) below a fresh temporary folder.
pub fn write_corpus(files: &[(&str, &str)]) -> TempDir {
    init_logging();
    let dir = TempDir::new().unwrap();
    for (relative, content) in files {
        write_file(dir.path(), relative, content);
    }
    dir
}

pub fn write_file(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

/// The two-document family used across tests: Alice with child Bob in `a.xml`, Carol in
/// `nested/c.xml` referenced from Alice.
pub fn family_corpus() -> TempDir {
    write_corpus(&[
        (
            "a.xml",
            r#"<Person Guid="p1" Name="Alice"><Person Guid="p2" Name="Bob"/><ChildRef RefId="p3" RefDirection="out"/></Person>"#,
        ),
        ("nested/c.xml", r#"<Person Guid="p3" Name="Carol"/>"#),
    ])
}
