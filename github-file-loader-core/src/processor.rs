//! Processor registry: dispatches raw file text to a render function by extension.
//!
//! Lookups never fail. An extension with no registered processor resolves to a
//! fallback that returns an empty render with a diagnostic in `metadata.error`,
//! so one unsupported file never blocks the rest of a load.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::error::RenderError;
use crate::record::RenderedContent;

/// Opaque host configuration, passed through unmodified to every render function.
pub type HostConfig = serde_json::Value;

pub type RenderFuture = BoxFuture<'static, Result<RenderedContent, RenderError>>;

/// An async render function `(raw_text, host_config) -> RenderedContent`.
pub type RenderFn = Arc<dyn Fn(String, HostConfig) -> RenderFuture + Send + Sync>;

/// Wraps an async closure into a [`RenderFn`].
pub fn render_fn<F, Fut>(f: F) -> RenderFn
where
    F: Fn(String, HostConfig) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<RenderedContent, RenderError>> + Send + 'static,
{
    Arc::new(move |body: String, config: HostConfig| -> RenderFuture {
        Box::pin(f(body, config))
    })
}

/// Diagnostic stored in `metadata.error` for an unregistered extension.
pub fn missing_processor_message(extension: &str) -> String {
    format!(
        "Could not find processor for extension: .{extension}, are you sure you passed one in?"
    )
}

/// Mapping from file extension to render function. Read-only once built.
#[derive(Clone, Default)]
pub struct ProcessorRegistry {
    processors: HashMap<String, RenderFn>,
}

impl ProcessorRegistry {
    pub fn new(processors: HashMap<String, RenderFn>) -> Self {
        Self { processors }
    }

    /// Registers `f` for `extension` (without the leading dot).
    pub fn with_processor<F, Fut>(mut self, extension: impl Into<String>, f: F) -> Self
    where
        F: Fn(String, HostConfig) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<RenderedContent, RenderError>> + Send + 'static,
    {
        self.processors.insert(extension.into(), render_fn(f));
        self
    }

    pub fn is_registered(&self, extension: &str) -> bool {
        self.processors.contains_key(extension)
    }

    /// Registered extensions, sorted.
    pub fn extensions(&self) -> Vec<&str> {
        let mut extensions: Vec<&str> = self.processors.keys().map(String::as_str).collect();
        extensions.sort_unstable();
        extensions
    }

    /// Returns the registered function for `extension`, or the fallback.
    pub fn resolve(&self, extension: &str) -> RenderFn {
        match self.processors.get(extension) {
            Some(f) => Arc::clone(f),
            None => fallback(extension),
        }
    }
}

impl fmt::Debug for ProcessorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessorRegistry")
            .field("extensions", &self.extensions())
            .finish()
    }
}

fn fallback(extension: &str) -> RenderFn {
    let message = missing_processor_message(extension);
    Arc::new(move |_body: String, _config: HostConfig| -> RenderFuture {
        let rendered = RenderedContent::degraded(message.clone());
        Box::pin(async move { Ok(rendered) })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    #[tokio::test]
    async fn unknown_extension_resolves_to_fallback() {
        let registry = ProcessorRegistry::default();
        let render = registry.resolve("csv");
        let rendered = render("a,b\n1,2".to_string(), json!({}))
            .await
            .expect("fallback never fails");
        assert_eq!(rendered.html, "");
        let error = rendered.error().expect("fallback sets metadata.error");
        assert!(error.contains(".csv"), "unexpected message: {error}");
        assert_eq!(error, missing_processor_message("csv"));
    }

    #[tokio::test]
    async fn fallback_ignores_input() {
        let registry = ProcessorRegistry::default();
        let render = registry.resolve("bin");
        let a = render("one".into(), json!({"x": 1})).await.unwrap();
        let b = render("two".into(), json!(null)).await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn registered_extension_passes_arguments_and_result_through() {
        let seen: Arc<Mutex<Vec<(String, HostConfig)>>> = Arc::default();
        let captured = Arc::clone(&seen);
        let registry = ProcessorRegistry::default().with_processor("md", move |body, config| {
            captured.lock().unwrap().push((body.clone(), config));
            async move {
                let mut metadata = crate::record::Metadata::new();
                metadata.insert("length".into(), json!(body.len()));
                Ok::<_, RenderError>(
                    RenderedContent::new(format!("<p>{body}</p>")).with_metadata(metadata),
                )
            }
        });

        let config = json!({"markdown": {"gfm": true}});
        let render = registry.resolve("md");
        let rendered = render("hi".to_string(), config.clone())
            .await
            .expect("render succeeds");

        assert_eq!(rendered.html, "<p>hi</p>");
        assert_eq!(rendered.metadata.unwrap()["length"], json!(2));
        assert_eq!(*seen.lock().unwrap(), vec![("hi".to_string(), config)]);
    }

    #[tokio::test]
    async fn registered_extension_returns_the_same_function() {
        let registry = ProcessorRegistry::default()
            .with_processor("md", |_, _| async { Ok::<_, RenderError>(RenderedContent::new("x")) });
        let first = registry.resolve("md");
        let second = registry.resolve("md");
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn render_errors_propagate_unchanged() {
        let registry = ProcessorRegistry::default().with_processor("md", |_, _| async {
            Err::<RenderedContent, RenderError>("bad front matter".into())
        });
        let render = registry.resolve("md");
        let err = render(String::new(), json!({}))
            .await
            .expect_err("error is passed through");
        assert_eq!(err.to_string(), "bad front matter");
    }

    #[test]
    fn extensions_are_sorted() {
        let registry = ProcessorRegistry::default()
            .with_processor("txt", |_, _| async {
                Ok::<_, RenderError>(RenderedContent::default())
            })
            .with_processor("md", |_, _| async {
                Ok::<_, RenderError>(RenderedContent::default())
            });
        assert_eq!(registry.extensions(), vec!["md", "txt"]);
        assert!(registry.is_registered("md"));
        assert!(!registry.is_registered("csv"));
    }
}
