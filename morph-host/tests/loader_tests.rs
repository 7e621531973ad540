//! Loading modules from disk

use morph_host::{HostError, Loader, Value};
use pretty_assertions::assert_eq;
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn test_load_file_runs_module() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "def greet(name):").unwrap();
    writeln!(file, "    return 'hello ' + name").unwrap();
    writeln!(file, "message = greet('world')").unwrap();

    let loader = Loader::default();
    let ns = loader.load_file(file.path()).unwrap();
    assert_eq!(ns.get("message"), Some(Value::from("hello world")));

    // The text is registered under the path for later citation
    let id = morph_host::FileId::new(file.path().display().to_string());
    assert_eq!(
        loader.sources().get_line(&id, 1).as_deref(),
        Some("def greet(name):")
    );
}

#[test]
fn test_load_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let loader = Loader::default();
    let err = loader.load_file(&dir.path().join("absent.mo")).unwrap_err();
    assert!(matches!(err, HostError::Io(_)));
}

#[test]
fn test_runtime_error_in_loaded_file_names_the_path() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "x = 1").unwrap();
    writeln!(file, "y = x / 0").unwrap();

    let loader = Loader::default();
    let err = loader.load_file(file.path()).unwrap_err();
    let HostError::Runtime(err) = err else {
        panic!("expected runtime error");
    };
    let (path, position) = err.location.unwrap();
    assert_eq!(path.as_str(), file.path().display().to_string());
    assert_eq!((position.line, position.col), (2, 4));
}
