use http::StatusCode;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, error};

use crate::dispatcher::Response;

/// Files below one directory, addressed by URL sub-path.
#[derive(Debug, Clone)]
pub struct StaticFiles {
    base_dir: PathBuf,
}

impl StaticFiles {
    pub fn new<P: Into<PathBuf>>(base: P) -> Self {
        Self {
            base_dir: base.into(),
        }
    }

    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Map a URL sub-path onto the base directory, refusing anything that
    /// could step outside it.
    fn map_path(&self, url_path: &str) -> Option<PathBuf> {
        let mut pb = self.base_dir.clone();
        for comp in Path::new(url_path.trim_start_matches('/')).components() {
            match comp {
                Component::Normal(s) => pb.push(s),
                Component::CurDir => {}
                _ => return None,
            }
        }
        Some(pb)
    }

    fn content_type(path: &Path) -> &'static str {
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        match ext.as_str() {
            "html" | "htm" => "text/html; charset=utf-8",
            "css" => "text/css",
            "js" | "mjs" => "application/javascript",
            "json" => "application/json",
            "txt" => "text/plain; charset=utf-8",
            "svg" => "image/svg+xml",
            "png" => "image/png",
            "jpg" | "jpeg" => "image/jpeg",
            "gif" => "image/gif",
            "ico" => "image/x-icon",
            "wasm" => "application/wasm",
            "pdf" => "application/pdf",
            _ => "application/octet-stream",
        }
    }

    /// Read the file at `url_path` with its content type.
    ///
    /// # Errors
    ///
    /// `NotFound` for traversal attempts, missing files and directories;
    /// any other I/O error from reading the file.
    pub fn load(&self, url_path: &str) -> io::Result<(Vec<u8>, &'static str)> {
        let path = self
            .map_path(url_path)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "invalid path"))?;
        if !path.is_file() {
            return Err(io::Error::new(io::ErrorKind::NotFound, "file not found"));
        }
        let bytes = fs::read(&path)?;
        Ok((bytes, Self::content_type(&path)))
    }

    /// [`load`](Self::load) turned into a response: 200, 404 or 500.
    #[must_use]
    pub fn serve(&self, url_path: &str) -> Response {
        match self.load(url_path) {
            Ok((bytes, content_type)) => Response::bytes(StatusCode::OK, content_type, bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %url_path, dir = %self.base_dir.display(), "Static file not found");
                Response::error(StatusCode::NOT_FOUND, "Not Found")
            }
            Err(e) => {
                error!(path = %url_path, error = %e, "Failed to read static file");
                Response::error(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> (tempfile::TempDir, StaticFiles) {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("hello.txt"), "Hello\n").unwrap();
        fs::create_dir(dir.path().join("css")).unwrap();
        fs::write(dir.path().join("css").join("site.css"), "body{}").unwrap();
        let files = StaticFiles::new(dir.path());
        (dir, files)
    }

    #[test]
    fn test_map_path_prevents_traversal() {
        let (_dir, sf) = fixture();
        assert!(sf.map_path("../Cargo.toml").is_none());
        assert!(sf.map_path("css/../../Cargo.toml").is_none());
    }

    #[test]
    fn test_load_plain_file() {
        let (_dir, sf) = fixture();
        let (bytes, ct) = sf.load("hello.txt").unwrap();
        assert_eq!(ct, "text/plain; charset=utf-8");
        assert_eq!(String::from_utf8(bytes).unwrap(), "Hello\n");
    }

    #[test]
    fn test_serve_nested_and_missing() {
        let (_dir, sf) = fixture();
        let res = sf.serve("css/site.css");
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.header("content-type"), Some("text/css"));
        assert_eq!(sf.serve("nope.txt").status, StatusCode::NOT_FOUND);
        assert_eq!(sf.serve("css").status, StatusCode::NOT_FOUND);
    }
}
