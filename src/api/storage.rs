//! Static files under `/storage/`.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use crate::api::{param, ApiContext};
use crate::http::{status_line, JsonRequest, JsonResponse};
use crate::routing::{HandlerResult, MatchedRoute};

/// Content type inferred from the file extension.
pub fn content_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        _ => "application/octet-stream",
    }
}

/// `storage_dir/file`, or `None` if `file` would leave `storage_dir`.
pub fn resolve_in(storage_dir: &Path, file: &str) -> Option<PathBuf> {
    let relative = Path::new(file);
    let confined = relative
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    (confined && !file.is_empty()).then(|| storage_dir.join(relative))
}

/// `GET /storage/<file>`
pub async fn serve_file(
    context: ApiContext,
    _request: JsonRequest,
    response: JsonResponse,
    route: MatchedRoute,
) -> HandlerResult {
    let file = param(&route, "file")?;
    let Some(path) = resolve_in(&context.storage_dir, file) else {
        tracing::debug!(file = %file, "Rejecting storage path outside the storage directory");
        response.end_as(status_line::NOT_FOUND)?;
        return Ok(());
    };

    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::IsADirectory) => {
            response.end_as(status_line::NOT_FOUND)?;
            return Ok(());
        }
        Err(e) if path.is_dir() => {
            tracing::debug!(path = ?path, error = %e, "Storage path is a directory");
            response.end_as(status_line::NOT_FOUND)?;
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    response.write_status(status_line::OK, &[("content-type", content_type_for(&path))])?;
    response.end(bytes)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for(Path::new("a.png")), "image/png");
        assert_eq!(content_type_for(Path::new("a.JPG")), "image/jpeg");
        assert_eq!(content_type_for(Path::new("a.jpeg")), "image/jpeg");
        assert_eq!(content_type_for(Path::new("a.gif")), "image/gif");
        assert_eq!(content_type_for(Path::new("a.txt")), "application/octet-stream");
        assert_eq!(content_type_for(Path::new("noext")), "application/octet-stream");
    }

    #[test]
    fn test_resolve_in_confines_paths() {
        let root = Path::new("/srv/storage");
        assert_eq!(resolve_in(root, "img/a.png"), Some(root.join("img/a.png")));
        assert_eq!(resolve_in(root, "../secret"), None);
        assert_eq!(resolve_in(root, "/etc/passwd"), None);
        assert_eq!(resolve_in(root, ""), None);
    }
}
