//! Flat template rendering.
//!
//! A template is a plain text file with `~~key~~` tokens. Rendering replaces
//! each token whose key appears in the substitution map; unmatched tokens are
//! left untouched. No nesting, no logic.

use crate::handler::{HandlerError, HandlerResult};
use crate::mime::content_type_for_path;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Renders templates from a root directory.
#[derive(Debug, Clone)]
pub struct Renderer {
    root: PathBuf,
}

impl Renderer {
    /// Create a renderer rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The configured root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Render `path` (relative to the root) with the given substitutions.
    /// The content type comes from the template's file extension.
    ///
    /// # Errors
    /// [`HandlerError::NotFound`] when the template is absent, and
    /// [`HandlerError::Io`] for other read failures (including non-UTF-8
    /// content).
    pub fn render(
        &self,
        path: &str,
        substitutions: &HashMap<String, String>,
    ) -> Result<HandlerResult, HandlerError> {
        let full = self.root.join(path.trim_start_matches('/'));
        let mut body = std::fs::read_to_string(&full).map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                HandlerError::NotFound
            } else {
                HandlerError::Io(e)
            }
        })?;
        for (key, value) in substitutions {
            body = body.replace(&format!("~~{key}~~"), value);
        }
        Ok(HandlerResult::Rendered {
            body,
            headers: vec![(
                "content-type".to_string(),
                content_type_for_path(&full).to_string(),
            )],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_template(name: &str, content: &str) -> PathBuf {
        let dir = std::env::temp_dir().join("litespeed-render-test");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(name), content).unwrap();
        dir
    }

    #[test]
    fn tokens_are_replaced_and_unmatched_ones_kept() {
        let dir = temp_template("page.html", "<p>~~greeting~~, ~~nobody~~</p>");
        let renderer = Renderer::new(&dir);
        let mut vars = HashMap::new();
        vars.insert("greeting".to_string(), "hello".to_string());

        let result = renderer.render("page.html", &vars).unwrap();
        match result {
            HandlerResult::Rendered { body, headers } => {
                assert_eq!(body, "<p>hello, ~~nobody~~</p>");
                assert!(headers.iter().any(|(n, v)| n == "content-type" && v == "text/html"));
            }
            other => panic!("expected Rendered, got {other:?}"),
        }
    }

    #[test]
    fn missing_template_is_not_found() {
        let renderer = Renderer::new(std::env::temp_dir());
        let err = renderer
            .render("absent-litespeed.html", &HashMap::new())
            .unwrap_err();
        assert_eq!(err.status(), 404);
    }
}
