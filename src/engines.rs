//! Built-in Engines

use crate::filter::{EngineError, FilterContext, FilterEngine};

/// Replaces every occurrence of `search` with `replacement`.
#[derive(Debug, Clone)]
pub struct ReplaceEngine {
    search: String,
    replacement: String,
}

impl ReplaceEngine {
    pub const NAME: &'static str = "Replace";

    pub fn new(search: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self {
            search: search.into(),
            replacement: replacement.into(),
        }
    }

    pub fn from_arguments(arguments: &[String]) -> Result<Box<dyn FilterEngine>, String> {
        match arguments {
            [search, rest @ ..] if !search.is_empty() => {
                let replacement = rest.first().cloned().unwrap_or_default();
                Ok(Box::new(Self::new(search.clone(), replacement)))
            }
            _ => Err("expected a non-empty search string".to_string()),
        }
    }
}

impl FilterEngine for ReplaceEngine {
    fn filter_load(&mut self, _context: &mut FilterContext) -> Result<(), EngineError> {
        Ok(())
    }

    fn filter_dump(&mut self, context: &mut FilterContext) -> Result<(), EngineError> {
        let replaced = context.content().replace(&self.search, &self.replacement);
        context.set_content(replaced);
        Ok(())
    }

    fn configure(&mut self, option: &str, value: &str) -> bool {
        match option {
            "search" if !value.is_empty() => self.search = value.to_string(),
            "replacement" => self.replacement = value.to_string(),
            _ => return false,
        }
        true
    }
}

/// Prepends a `/* ... */` banner comment.
#[derive(Debug, Clone)]
pub struct BannerEngine {
    text: String,
}

impl BannerEngine {
    pub const NAME: &'static str = "Banner";

    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn from_arguments(arguments: &[String]) -> Result<Box<dyn FilterEngine>, String> {
        let text = arguments
            .first()
            .ok_or_else(|| "expected banner text".to_string())?;
        Ok(Box::new(Self::new(text.clone())))
    }
}

impl FilterEngine for BannerEngine {
    fn filter_load(&mut self, context: &mut FilterContext) -> Result<(), EngineError> {
        context
            .metadata_mut()
            .insert("banner".to_string(), self.text.clone());
        Ok(())
    }

    fn filter_dump(&mut self, context: &mut FilterContext) -> Result<(), EngineError> {
        if self.text.contains("*/") {
            return Err(format!("banner text may not contain '*/': {}", self.text).into());
        }
        let banner = format!("/* {} */\n{}", self.text, context.content());
        context.set_content(banner);
        Ok(())
    }

    fn configure(&mut self, option: &str, value: &str) -> bool {
        if option == "text" {
            self.text = value.to_string();
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(engine: &mut dyn FilterEngine, content: &str) -> FilterContext {
        let mut ctx = FilterContext::new("app.css", content);
        engine.filter_load(&mut ctx).unwrap();
        engine.filter_dump(&mut ctx).unwrap();
        ctx
    }

    #[test]
    fn test_replace_all_occurrences() {
        let mut engine = ReplaceEngine::new("html", "body");
        let ctx = run(&mut engine, "html { } html > p { }");
        assert_eq!(ctx.content(), "body { } body > p { }");
    }

    #[test]
    fn test_replace_requires_search() {
        assert!(ReplaceEngine::from_arguments(&[]).is_err());
        assert!(ReplaceEngine::from_arguments(&["".to_string()]).is_err());
        assert!(ReplaceEngine::from_arguments(&["a".to_string()]).is_ok());
    }

    #[test]
    fn test_banner_prepends_and_records_metadata() {
        let mut engine = BannerEngine::new("v1.0");
        let ctx = run(&mut engine, "body {}");
        assert_eq!(ctx.content(), "/* v1.0 */\nbody {}");
        assert_eq!(ctx.relative_path(), "app.css");
        assert_eq!(ctx.metadata().get("banner").map(String::as_str), Some("v1.0"));
    }

    #[test]
    fn test_banner_rejects_comment_terminator() {
        let mut engine = BannerEngine::new("bad */ text");
        let mut ctx = FilterContext::new("app.css", "body {}");
        assert!(engine.filter_dump(&mut ctx).is_err());
        assert_eq!(ctx.content(), "body {}");
    }

    #[test]
    fn test_configure_known_options() {
        let mut engine = BannerEngine::new("old");
        assert!(engine.configure("text", "new"));
        assert!(!engine.configure("color", "red"));
        let ctx = run(&mut engine, "");
        assert_eq!(ctx.content(), "/* new */\n");
    }
}
