//! Directory-backed HTML templates rendered with `minijinja`.

use http::StatusCode;
use minijinja::Environment;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::error;

use crate::dispatcher::Response;

#[derive(Debug)]
pub enum TemplateError {
    /// The configured template directory does not exist
    MissingDir(PathBuf),
    Render(minijinja::Error),
}

impl fmt::Display for TemplateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateError::MissingDir(dir) => {
                write!(f, "template directory '{}' does not exist", dir.display())
            }
            TemplateError::Render(e) => write!(f, "template error: {e}"),
        }
    }
}

impl std::error::Error for TemplateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TemplateError::Render(e) => Some(e),
            TemplateError::MissingDir(_) => None,
        }
    }
}

impl From<minijinja::Error> for TemplateError {
    fn from(e: minijinja::Error) -> Self {
        TemplateError::Render(e)
    }
}

/// Templates loaded lazily from one directory, by file name.
pub struct Templates {
    env: Environment<'static>,
    dir: PathBuf,
}

impl Templates {
    /// # Errors
    ///
    /// [`TemplateError::MissingDir`] when `dir` is not a directory.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self, TemplateError> {
        let dir = dir.as_ref().to_path_buf();
        if !dir.is_dir() {
            return Err(TemplateError::MissingDir(dir));
        }
        let mut env = Environment::new();
        env.set_loader(minijinja::path_loader(&dir));
        Ok(Self { env, dir })
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Render template `name` (e.g. `greet.html`) with `context`.
    ///
    /// # Errors
    ///
    /// [`TemplateError::Render`] when the template is missing or fails.
    pub fn render<S: Serialize>(&self, name: &str, context: &S) -> Result<String, TemplateError> {
        let tmpl = self.env.get_template(name)?;
        Ok(tmpl.render(context)?)
    }

    /// Render straight into an HTML response; failures become a logged 500.
    #[must_use]
    pub fn render_response<S: Serialize>(&self, name: &str, context: &S) -> Response {
        match self.render(name, context) {
            Ok(html) => Response::html(StatusCode::OK, html),
            Err(e) => {
                error!(template = %name, error = %e, "Template rendering failed");
                Response::error(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
            }
        }
    }
}

impl fmt::Debug for Templates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Templates").field("dir", &self.dir).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_html() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("hello.html"), "<h1>Hello {{ name }}!</h1>").unwrap();
        let t = Templates::from_dir(dir.path()).unwrap();
        let out = t.render("hello.html", &json!({"name": "World"})).unwrap();
        assert_eq!(out, "<h1>Hello World!</h1>");

        let res = t.render_response("hello.html", &json!({"name": "Ada"}));
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.header("content-type"), Some("text/html"));
    }

    #[test]
    fn test_missing_template_and_dir() {
        let dir = tempfile::tempdir().unwrap();
        let t = Templates::from_dir(dir.path()).unwrap();
        assert!(matches!(
            t.render("nope.html", &json!({})),
            Err(TemplateError::Render(_))
        ));
        assert!(matches!(
            Templates::from_dir(dir.path().join("missing")),
            Err(TemplateError::MissingDir(_))
        ));
    }
}
