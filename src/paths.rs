//! Local path expansion for values read from the config file.

use std::path::PathBuf;

/// Expand `~` and environment variables in a local path.
///
/// Unknown variables leave the path untouched.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_absolute() {
        assert_eq!(expand("/keys/id_rsa"), PathBuf::from("/keys/id_rsa"));
    }

    #[test]
    fn test_expand_with_tilde() {
        let Ok(home) = std::env::var("HOME") else {
            return;
        };
        assert_eq!(expand("~/.ssh/id_rsa"), PathBuf::from(home).join(".ssh/id_rsa"));
    }

    #[test]
    fn test_expand_unknown_env_var_unchanged() {
        assert_eq!(
            expand("/keys/$ROUNDSMAN_NONEXISTENT_VAR_12345/id"),
            PathBuf::from("/keys/$ROUNDSMAN_NONEXISTENT_VAR_12345/id")
        );
    }
}
