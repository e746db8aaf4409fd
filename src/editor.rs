//! Edit files through a command line editor
//!
//! The file is copied to a temporary file which is opened in the editor.
//! Only once the editor exits successfully and the contents validate is the
//! temporary copied back over the original, so a failed session never
//! clobbers the source.

use crate::defaults::DEFAULT_EDITORS;
use crate::error::{AppError, Result};
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

const ENV_EDITOR: &str = "EDITOR";
const ENV_PATH: &str = "PATH";

/// Check applied to the edited temporary file before it replaces the source
pub type Validator<'a> = &'a dyn Fn(&Path) -> Result<()>;

/// Edit `path` with the editor from `$EDITOR` or the first standard editor
/// found on the `$PATH`.
pub fn edit(path: &Path, validate: Option<Validator<'_>>) -> Result<()> {
    edit_with(path, None, validate)
}

/// Edit `path` with a specific editor (a name on the `$PATH` or a path)
pub fn edit_with(path: &Path, editor: Option<&str>, validate: Option<Validator<'_>>) -> Result<()> {
    let editor = find_editor(editor)?;

    let tmpf = tempfile::Builder::new()
        .prefix("xkit-edit-")
        .tempfile()
        .map_err(|e| AppError::editor(format!("could not create temporary file for editing: {}", e)))?
        .into_temp_path();

    copy_file(path, &tmpf).map_err(|e| {
        AppError::editor(format!(
            "could not copy source contents into temporary file for editing: {}",
            e
        ))
    })?;

    crate::debug!("editing {} with {}", path.display(), editor.display());
    let status = Command::new(&editor)
        .arg(&*tmpf)
        .status()
        .map_err(|e| AppError::editor(format!("could not exec {}: {}", editor.display(), e)))?;
    if !status.success() {
        return Err(AppError::editor(format!("could not exec {}: {}", editor.display(), status)));
    }

    if let Some(validate) = validate {
        validate(&tmpf).map_err(|e| AppError::validation(format!("validation error: {}", e)))?;
    }

    copy_file(&tmpf, path).map_err(|e| {
        AppError::editor(format!(
            "could not copy temporary file contents back to source after editing: {}",
            e
        ))
    })
}

/// Validator accepting any well formed JSON document
pub fn validate_json(path: &Path) -> Result<()> {
    let data = fs::read(path)?;
    serde_json::from_slice::<serde_json::Value>(&data)?;
    Ok(())
}

/// Locate an editor executable.
///
/// An explicit name wins, then `$EDITOR`; both have `~` and `$VARS`
/// expanded and may be a path to an executable or a name on the `$PATH`.
/// With neither set, the standard editors are searched in order.
pub fn find_editor(name: Option<&str>) -> Result<PathBuf> {
    let name = match name.filter(|n| !n.is_empty()) {
        Some(name) => Some(name.to_string()),
        None => env::var(ENV_EDITOR).ok().filter(|n| !n.is_empty()),
    };

    if let Some(name) = name {
        let name = expand(&name);
        let candidate = PathBuf::from(&name);
        if is_executable(&candidate) {
            return Ok(candidate);
        }
        return in_path(&name);
    }

    DEFAULT_EDITORS
        .iter()
        .find_map(|name| in_path(name).ok())
        .ok_or_else(|| AppError::editor("could not find an editor"))
}

/// Expand a leading `~` to `$HOME`, then `$VAR` and `${VAR}` references.
/// Unset variables expand to nothing.
pub fn expand(path: &str) -> String {
    let path = match path.strip_prefix('~') {
        Some(rest) => format!("$HOME{}", rest),
        None => path.to_string(),
    };

    let mut out = String::with_capacity(path.len());
    let mut chars = path.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }

        let mut var = String::new();
        if chars.peek() == Some(&'{') {
            chars.next();
            for c in chars.by_ref() {
                if c == '}' {
                    break;
                }
                var.push(c);
            }
        } else {
            while let Some(&c) = chars.peek() {
                if !(c.is_ascii_alphanumeric() || c == '_') {
                    break;
                }
                var.push(c);
                chars.next();
            }
        }

        if var.is_empty() {
            out.push('$');
        } else {
            out.push_str(&env::var(&var).unwrap_or_default());
        }
    }
    out
}

/// Whether `path` is a file with an execute bit set
fn is_executable(path: &Path) -> bool {
    match fs::metadata(path) {
        Ok(meta) if meta.is_file() => has_exec_bit(&meta),
        _ => false,
    }
}

#[cfg(unix)]
fn has_exec_bit(meta: &fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn has_exec_bit(_meta: &fs::Metadata) -> bool {
    true
}

/// Search the `$PATH` for `name`, returning an absolute path
fn in_path(name: &str) -> Result<PathBuf> {
    let not_found = || AppError::editor(format!("could not find {:?} in $PATH", name));

    // Names with a separator are not searched for
    if name.contains(std::path::MAIN_SEPARATOR) {
        return Err(not_found());
    }

    let paths = env::var_os(ENV_PATH).ok_or_else(not_found)?;
    for dir in env::split_paths(&paths) {
        let dir = if dir.as_os_str().is_empty() { PathBuf::from(".") } else { dir };
        let candidate = dir.join(name);
        if is_executable(&candidate) {
            if candidate.is_absolute() {
                return Ok(candidate);
            }
            return Ok(env::current_dir().map(|cwd| cwd.join(&candidate)).unwrap_or(candidate));
        }
    }
    Err(not_found())
}

/// Copy a regular file's contents from `src` to `dst`, then carry over the
/// permissions and, on unix, the ownership. Mode and owner failures are
/// ignored.
fn copy_file(src: &Path, dst: &Path) -> io::Result<()> {
    let meta = fs::metadata(src)
        .map_err(|e| io::Error::new(e.kind(), format!("could not stat source file: {}", e)))?;
    if !meta.is_file() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{:?} is not a regular file", src),
        ));
    }

    let data = fs::read(src).map_err(|e| io::Error::new(e.kind(), format!("could not open {:?}: {}", src, e)))?;
    fs::write(dst, data).map_err(|e| io::Error::new(e.kind(), format!("could not create {:?}: {}", dst, e)))?;

    let _ = fs::set_permissions(dst, meta.permissions());
    preserve_owner(&meta, dst);
    Ok(())
}

#[cfg(unix)]
fn preserve_owner(meta: &fs::Metadata, dst: &Path) {
    use std::os::unix::fs::MetadataExt;
    let _ = std::os::unix::fs::chown(dst, Some(meta.uid()), Some(meta.gid()));
}

#[cfg(not(unix))]
fn preserve_owner(_meta: &fs::Metadata, _dst: &Path) {}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    /// A fake editor that overwrites its argument with `contents`
    fn fake_editor(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        let script = format!("#!/bin/sh\nprintf '%s' '{}' > \"$1\"\n", contents);
        fs::write(&path, script).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn failing_editor(dir: &Path) -> PathBuf {
        let path = dir.join("broken");
        fs::write(&path, "#!/bin/sh\nexit 3\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[test]
    fn test_expand() {
        let _guard = crate::ENV_LOCK.lock();
        env::set_var("XKIT_EDITOR_TEST", "nano");
        assert_eq!(expand("$XKIT_EDITOR_TEST"), "nano");
        assert_eq!(expand("/usr/bin/${XKIT_EDITOR_TEST}"), "/usr/bin/nano");
        assert_eq!(expand("$XKIT_EDITOR_UNSET_VALUE/vi"), "/vi");
        assert_eq!(expand("price$"), "price$");
        env::remove_var("XKIT_EDITOR_TEST");

        let home = env::var("HOME").unwrap_or_default();
        assert_eq!(expand("~/bin/vi"), format!("{}/bin/vi", home));
    }

    #[test]
    fn test_find_editor_by_path_and_name() {
        let _guard = crate::ENV_LOCK.lock();
        let dir = TempDir::new().unwrap();
        let editor = fake_editor(dir.path(), "myedit", "{}");

        assert_eq!(find_editor(Some(editor.to_str().unwrap())).unwrap(), editor);

        let old_path = env::var_os(ENV_PATH).unwrap_or_default();
        let mut paths = vec![dir.path().to_path_buf()];
        paths.extend(env::split_paths(&old_path));
        env::set_var(ENV_PATH, env::join_paths(paths).unwrap());

        let found = find_editor(Some("myedit"));
        env::set_var(ENV_PATH, &old_path);
        assert_eq!(found.unwrap(), editor);
    }

    #[test]
    fn test_find_editor_from_env_and_missing() {
        let _guard = crate::ENV_LOCK.lock();
        let dir = TempDir::new().unwrap();
        let editor = fake_editor(dir.path(), "envedit", "{}");

        env::set_var(ENV_EDITOR, &editor);
        let found = find_editor(None);
        env::remove_var(ENV_EDITOR);
        assert_eq!(found.unwrap(), editor);

        let err = find_editor(Some("definitely-not-an-editor-xkit")).unwrap_err();
        assert!(err.to_string().contains("in $PATH"));
    }

    #[test]
    fn test_find_editor_without_any_candidate() {
        let _guard = crate::ENV_LOCK.lock();
        let empty = TempDir::new().unwrap();
        let old_path = env::var_os(ENV_PATH).unwrap_or_default();
        env::remove_var(ENV_EDITOR);
        env::set_var(ENV_PATH, empty.path());

        let result = find_editor(None);
        env::set_var(ENV_PATH, &old_path);
        assert_eq!(result.unwrap_err().to_string(), "Editor error: could not find an editor");
    }

    #[test]
    fn test_edit_with_replaces_contents_and_keeps_mode() {
        let _guard = crate::ENV_LOCK.lock();
        let dir = TempDir::new().unwrap();
        let editor = fake_editor(dir.path(), "ed", r#"{"edited": true}"#);

        let target = dir.path().join("config.json");
        fs::write(&target, "{}").unwrap();
        fs::set_permissions(&target, fs::Permissions::from_mode(0o640)).unwrap();

        let validator: Validator<'_> = &validate_json;
        edit_with(&target, editor.to_str(), Some(validator)).unwrap();

        assert_eq!(fs::read_to_string(&target).unwrap(), r#"{"edited": true}"#);
        let mode = fs::metadata(&target).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o640);
    }

    #[test]
    fn test_failed_validation_leaves_original() {
        let _guard = crate::ENV_LOCK.lock();
        let dir = TempDir::new().unwrap();
        let editor = fake_editor(dir.path(), "ed", "not json at all");

        let target = dir.path().join("config.json");
        fs::write(&target, r#"{"original": 1}"#).unwrap();

        let validator: Validator<'_> = &validate_json;
        let err = edit_with(&target, editor.to_str(), Some(validator)).unwrap_err();
        assert!(err.to_string().contains("validation error"));
        assert_eq!(fs::read_to_string(&target).unwrap(), r#"{"original": 1}"#);
    }

    #[test]
    fn test_failing_editor_leaves_original() {
        let _guard = crate::ENV_LOCK.lock();
        let dir = TempDir::new().unwrap();
        let editor = failing_editor(dir.path());

        let target = dir.path().join("notes.txt");
        fs::write(&target, "keep me").unwrap();

        let err = edit_with(&target, editor.to_str(), None).unwrap_err();
        assert!(err.to_string().contains("could not exec"));
        assert_eq!(fs::read_to_string(&target).unwrap(), "keep me");
    }

    #[test]
    fn test_only_regular_files_are_editable() {
        let _guard = crate::ENV_LOCK.lock();
        let dir = TempDir::new().unwrap();
        let editor = fake_editor(dir.path(), "ed", "x");

        let err = edit_with(dir.path(), editor.to_str(), None).unwrap_err();
        assert!(err.to_string().contains("is not a regular file"));

        let err = edit_with(&dir.path().join("missing"), editor.to_str(), None).unwrap_err();
        assert!(err.to_string().contains("could not stat source file"));
    }
}
