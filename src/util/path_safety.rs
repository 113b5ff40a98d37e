use std::path::{Path, PathBuf};

use crate::error::{CmsError, Result};

/// True when `relative` stays inside whatever root it is joined to.
pub fn is_safe(relative: &str) -> bool {
    if relative.trim().is_empty() || relative.contains('\0') {
        return false;
    }

    if relative.starts_with('/') || relative.starts_with('\\') {
        return false;
    }

    // Windows drive prefix, e.g. `C:\` or `c:foo`
    let bytes = relative.as_bytes();
    if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
        return false;
    }

    relative
        .split(['/', '\\'])
        .all(|segment| segment != "..")
}

pub fn has_post_extension(relative: &str) -> bool {
    relative.ends_with(".md") || relative.ends_with(".mdx")
}

pub fn validate_post_id(post_id: &str) -> Result<()> {
    if !is_safe(post_id) {
        return Err(CmsError::UnsafePath(post_id.to_string()));
    }
    if !has_post_extension(post_id) {
        return Err(CmsError::Validation(format!(
            "Post id must end with .md or .mdx: {}",
            post_id
        )));
    }
    Ok(())
}

/// Joins a validated post id to `root`, skipping `.` and empty segments.
pub fn resolve(root: &Path, post_id: &str) -> Result<PathBuf> {
    validate_post_id(post_id)?;

    let mut path = root.to_path_buf();
    for segment in post_id.split(['/', '\\']) {
        if segment.is_empty() || segment == "." {
            continue;
        }
        path.push(segment);
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_traversal_and_absolute() {
        assert!(!is_safe("../../etc/passwd"));
        assert!(!is_safe("/etc/passwd"));
        assert!(!is_safe("notes/../../secret.md"));
        assert!(!is_safe("..\\windows\\system.ini"));
        assert!(!is_safe("C:\\boot.ini"));
        assert!(!is_safe(""));
    }

    #[test]
    fn test_accepts_nested_relative() {
        assert!(is_safe("note/a.md"));
        assert!(is_safe("./a.md"));
        assert!(is_safe("a..b.md"));
    }

    #[test]
    fn test_validate_extension() {
        assert!(validate_post_id("note/a.md").is_ok());
        assert!(validate_post_id("note/a.mdx").is_ok());
        assert!(matches!(validate_post_id("note/a.txt"), Err(CmsError::Validation(_))));
        assert!(matches!(validate_post_id("../a.md"), Err(CmsError::UnsafePath(_))));
    }

    #[test]
    fn test_resolve() {
        let path = resolve(Path::new("/blog/posts"), "./note//a.md").unwrap();
        assert_eq!(path, PathBuf::from("/blog/posts/note/a.md"));
    }
}
