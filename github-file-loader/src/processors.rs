//! Built-in processors the CLI registers, and the digest it supplies.
//!
//! - `md`: CommonMark via `pulldown-cmark`, with YAML front matter, heading and
//!   image path metadata. The configured parser is cached per markdown configuration.
//! - `txt`: escaped text in a `<pre>` block.
//! - `html`: passed through as-is.

use std::collections::HashMap;
use std::sync::Arc;

use github_file_loader_core::cache::ProcessorCache;
use github_file_loader_core::error::RenderError;
use github_file_loader_core::processor::{HostConfig, ProcessorRegistry};
use github_file_loader_core::record::{Metadata, RenderedContent};
use pulldown_cmark::escape::escape_html;
use pulldown_cmark::{html, Event, Options, Parser, Tag};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

/// SHA-256 hex digest of `text`.
pub fn sha256_digest(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

/// Markdown options, read from the `markdown` key of the host configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkdownOptions {
    /// Tables, strikethrough and task lists.
    pub gfm: bool,
    pub smartypants: bool,
    pub footnotes: bool,
}

impl Default for MarkdownOptions {
    fn default() -> Self {
        Self {
            gfm: true,
            smartypants: false,
            footnotes: false,
        }
    }
}

#[derive(Debug)]
pub struct MarkdownProcessor {
    options: Options,
}

impl MarkdownProcessor {
    pub fn new(markdown: &MarkdownOptions) -> Self {
        let mut options = Options::empty();
        if markdown.gfm {
            options.insert(Options::ENABLE_TABLES);
            options.insert(Options::ENABLE_STRIKETHROUGH);
            options.insert(Options::ENABLE_TASKLISTS);
        }
        if markdown.smartypants {
            options.insert(Options::ENABLE_SMART_PUNCTUATION);
        }
        if markdown.footnotes {
            options.insert(Options::ENABLE_FOOTNOTES);
        }
        Self { options }
    }

    pub fn from_host_config(config: &HostConfig) -> Result<Self, RenderError> {
        let markdown = match config.get("markdown") {
            Some(value) => serde_json::from_value(value.clone())?,
            None => MarkdownOptions::default(),
        };
        Ok(Self::new(&markdown))
    }

    /// Renders `text` to HTML with `headings`, `imagePaths` and, if present,
    /// `frontmatter` metadata.
    pub fn render(&self, text: &str) -> Result<RenderedContent, RenderError> {
        let (frontmatter, content) = match split_frontmatter(text) {
            Some((yaml, rest)) => (Some(parse_frontmatter(yaml)?), rest),
            None => (None, text),
        };

        let events: Vec<Event> = Parser::new_ext(content, self.options).collect();
        let headings = collect_headings(&events);
        let image_paths = collect_image_paths(&events);
        let mut html = String::with_capacity(content.len() * 3 / 2);
        html::push_html(&mut html, events.into_iter());

        let mut metadata = Metadata::new();
        metadata.insert("headings".to_string(), Value::Array(headings));
        metadata.insert("imagePaths".to_string(), json!(image_paths));
        if let Some(frontmatter) = frontmatter {
            metadata.insert("frontmatter".to_string(), frontmatter);
        }
        Ok(RenderedContent::new(html).with_metadata(metadata))
    }
}

/// Splits a leading `---` fenced block from the document body.
fn split_frontmatter(text: &str) -> Option<(&str, &str)> {
    let rest = text
        .strip_prefix("---\n")
        .or_else(|| text.strip_prefix("---\r\n"))?;
    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == "---" {
            return Some((&rest[..offset], &rest[offset + line.len()..]));
        }
        offset += line.len();
    }
    None
}

fn parse_frontmatter(yaml: &str) -> Result<Value, RenderError> {
    if yaml.trim().is_empty() {
        return Ok(Value::Object(Metadata::new()));
    }
    Ok(serde_yaml::from_str(yaml)?)
}

fn collect_headings(events: &[Event]) -> Vec<Value> {
    let mut headings = Vec::new();
    let mut slugs: HashMap<String, usize> = HashMap::new();
    let mut current: Option<(usize, String)> = None;

    for event in events {
        match event {
            Event::Start(Tag::Heading(level, _, _)) => {
                current = Some((*level as usize, String::new()));
            }
            Event::Text(text) | Event::Code(text) => {
                if let Some((_, buf)) = current.as_mut() {
                    buf.push_str(text);
                }
            }
            Event::End(Tag::Heading(..)) => {
                if let Some((depth, text)) = current.take() {
                    let slug = unique_slug(&mut slugs, &text);
                    headings.push(json!({ "depth": depth, "slug": slug, "text": text }));
                }
            }
            _ => {}
        }
    }
    headings
}

/// Image destinations in document order, without duplicates.
fn collect_image_paths(events: &[Event]) -> Vec<String> {
    let mut paths: Vec<String> = Vec::new();
    for event in events {
        if let Event::Start(Tag::Image(_, dest, _)) = event {
            if !paths.iter().any(|p| p.as_str() == &**dest) {
                paths.push(dest.to_string());
            }
        }
    }
    paths
}

fn unique_slug(seen: &mut HashMap<String, usize>, text: &str) -> String {
    let base: String = text
        .trim()
        .to_lowercase()
        .chars()
        .filter_map(|c| match c {
            ' ' | '-' => Some('-'),
            c if c.is_alphanumeric() || c == '_' => Some(c),
            _ => None,
        })
        .collect();
    let count = seen.entry(base.clone()).or_insert(0);
    let slug = if *count == 0 {
        base
    } else {
        format!("{}-{}", base, count)
    };
    *count += 1;
    slug
}

pub fn render_text(body: &str) -> Result<RenderedContent, RenderError> {
    let mut html = String::with_capacity(body.len() + 11);
    html.push_str("<pre>");
    escape_html(&mut html, body)?;
    html.push_str("</pre>");
    Ok(RenderedContent::new(html))
}

/// Registry with the built-in `md`, `txt` and `html` processors.
pub fn builtin_processors(cache: Arc<ProcessorCache<MarkdownProcessor>>) -> ProcessorRegistry {
    ProcessorRegistry::default()
        .with_processor("md", move |body: String, config: HostConfig| {
            let cache = Arc::clone(&cache);
            async move {
                let config = &config;
                let processor = cache
                    .get_or_try_init(config, move || async move {
                        MarkdownProcessor::from_host_config(config)
                    })
                    .await?;
                processor.render(&body)
            }
        })
        .with_processor("txt", |body: String, _| async move { render_text(&body) })
        .with_processor("html", |body: String, _| async move {
            Ok::<_, RenderError>(RenderedContent::new(body))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_markdown_with_headings() {
        let processor = MarkdownProcessor::new(&MarkdownOptions::default());
        let rendered = processor
            .render("# Privacy Policy\n\nHello.\n\n## Data `we` keep\n\n## Data we keep\n")
            .unwrap();

        assert!(rendered.html.contains("<h1>Privacy Policy</h1>"));
        assert!(rendered.html.contains("<p>Hello.</p>"));
        let metadata = rendered.metadata.unwrap();
        assert_eq!(
            metadata["headings"],
            json!([
                {"depth": 1, "slug": "privacy-policy", "text": "Privacy Policy"},
                {"depth": 2, "slug": "data-we-keep", "text": "Data we keep"},
                {"depth": 2, "slug": "data-we-keep-1", "text": "Data we keep"}
            ])
        );
        assert!(metadata.get("frontmatter").is_none());
        assert_eq!(metadata["imagePaths"], json!([]));
    }

    #[test]
    fn collects_image_paths() {
        let processor = MarkdownProcessor::new(&MarkdownOptions::default());
        let rendered = processor
            .render(
                "![Logo](./img/logo.png)\n\nSee ![chart](img/chart.svg \"Chart\") and \
                 ![again](./img/logo.png).\n\n[not an image](https://example.com/a.png)\n",
            )
            .unwrap();

        assert!(rendered.html.contains(r#"<img src="./img/logo.png" alt="Logo" />"#));
        assert_eq!(
            rendered.metadata.unwrap()["imagePaths"],
            json!(["./img/logo.png", "img/chart.svg"])
        );
    }

    #[test]
    fn extracts_frontmatter() {
        let processor = MarkdownProcessor::new(&MarkdownOptions::default());
        let rendered = processor
            .render("---\ntitle: Terms\nupdated: 2024-01-01\n---\n# Terms\n")
            .unwrap();

        assert!(rendered.html.starts_with("<h1>Terms</h1>"));
        let metadata = rendered.metadata.unwrap();
        assert_eq!(metadata["frontmatter"]["title"], "Terms");
    }

    #[test]
    fn empty_frontmatter_is_an_empty_object() {
        assert_eq!(split_frontmatter("---\n---\nbody"), Some(("", "body")));
        let processor = MarkdownProcessor::new(&MarkdownOptions::default());
        let rendered = processor.render("---\n---\nbody").unwrap();
        assert_eq!(rendered.metadata.unwrap()["frontmatter"], json!({}));
    }

    #[test]
    fn unterminated_frontmatter_is_plain_markdown() {
        assert_eq!(split_frontmatter("---\ntitle: x\n"), None);
    }

    #[test]
    fn invalid_frontmatter_fails_the_render() {
        let processor = MarkdownProcessor::new(&MarkdownOptions::default());
        assert!(processor.render("---\n: [\n---\nbody").is_err());
    }

    #[test]
    fn gfm_toggles_tables() {
        let table = "| a | b |\n|---|---|\n| 1 | 2 |\n";
        let with = MarkdownProcessor::new(&MarkdownOptions::default())
            .render(table)
            .unwrap();
        let without = MarkdownProcessor::new(&MarkdownOptions {
            gfm: false,
            ..MarkdownOptions::default()
        })
        .render(table)
        .unwrap();
        assert!(with.html.contains("<table>"));
        assert!(!without.html.contains("<table>"));
    }

    #[test]
    fn markdown_options_come_from_host_config() {
        let processor =
            MarkdownProcessor::from_host_config(&json!({"markdown": {"smartypants": true}}))
                .unwrap();
        assert!(processor.options.contains(Options::ENABLE_SMART_PUNCTUATION));
        assert!(processor.options.contains(Options::ENABLE_TABLES));
        assert!(MarkdownProcessor::from_host_config(&json!({"markdown": {"gfm": "yes"}})).is_err());
    }

    #[test]
    fn text_is_escaped() {
        assert_eq!(
            render_text("a < b & \"c\" 'd'").unwrap().html,
            "<pre>a &lt; b &amp; &quot;c&quot; 'd'</pre>"
        );
    }

    #[test]
    fn digest_is_stable_sha256() {
        assert_eq!(
            sha256_digest("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[tokio::test]
    async fn builtin_markdown_reuses_processor_per_config() {
        let cache = Arc::new(ProcessorCache::new());
        let registry = builtin_processors(Arc::clone(&cache));
        let render = registry.resolve("md");
        let config = json!({"markdown": {"gfm": true}});

        render("# One".to_string(), config.clone()).await.unwrap();
        render("# Two".to_string(), config.clone()).await.unwrap();
        assert_eq!(cache.len().await, 1);

        render("# Three".to_string(), json!({"markdown": {"gfm": false}}))
            .await
            .unwrap();
        assert_eq!(cache.len().await, 2);
    }
}
