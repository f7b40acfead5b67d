//! `io::Result` adapters that attach the file being worked on.

use std::io;
use std::path::Path;

use crate::application::{ApplicationError, ApplicationResult};

pub trait IoResultExt<T> {
    /// Wrap a failure as `OperationFailed` naming `action` and `path`.
    fn with_path_context(self, action: &str, path: &Path) -> ApplicationResult<T>;

    /// Like `with_path_context`, but a missing file becomes `NotFound(path)`.
    fn or_not_found(self, action: &str, path: &Path) -> ApplicationResult<T>;
}

impl<T> IoResultExt<T> for io::Result<T> {
    fn with_path_context(self, action: &str, path: &Path) -> ApplicationResult<T> {
        self.map_err(|e| ApplicationError::OperationFailed {
            context: format!("{action} {}", path.display()),
            source: Box::new(e),
        })
    }

    fn or_not_found(self, action: &str, path: &Path) -> ApplicationResult<T> {
        match self {
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(ApplicationError::NotFound(path.to_path_buf()))
            }
            other => other.with_path_context(action, path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_missing_file_error_when_mapping_then_not_found() {
        let res: io::Result<()> = Err(io::Error::from(io::ErrorKind::NotFound));
        let err = res.or_not_found("read", Path::new("gone.yml")).unwrap_err();
        assert!(matches!(err, ApplicationError::NotFound(p) if p == Path::new("gone.yml")));
    }

    #[test]
    fn given_permission_error_when_mapping_then_operation_failed_names_path() {
        let res: io::Result<()> = Err(io::Error::from(io::ErrorKind::PermissionDenied));
        let err = res.or_not_found("read", Path::new("locked.yml")).unwrap_err();
        assert!(err.to_string().contains("read locked.yml"), "{err}");
    }
}
