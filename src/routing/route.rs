//! A single compiled page route.

use regex::Regex;

use crate::routing::pattern;

/// Suffix every page file carries.
pub const PAGE_SUFFIX: &str = ".html";

/// A page template paired with the file it serves.
#[derive(Debug, Clone)]
pub struct Route {
    template: String,
    pattern: Regex,
    target_file: String,
}

impl Route {
    /// Build the route for a page file, e.g. `blog/[slug].html`.
    ///
    /// Returns `Ok(None)` for files that are not pages.
    pub fn from_page(file: &str) -> Result<Option<Self>, regex::Error> {
        let Some(template) = file.strip_suffix(PAGE_SUFFIX) else {
            return Ok(None);
        };

        let pattern = Regex::new(&pattern::translate(template))?;
        Ok(Some(Self {
            template: template.to_string(),
            pattern,
            target_file: file.to_string(),
        }))
    }

    /// Un-suffixed page path this route was derived from.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Anchored matcher over normalized request paths.
    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }

    /// Page file to serve on a match.
    pub fn target_file(&self) -> &str {
        &self.target_file
    }

    /// Byte index of the first dynamic marker, `None` for static pages.
    pub fn first_dynamic_index(&self) -> Option<usize> {
        pattern::first_dynamic_index(&self.template)
    }

    /// True if the whole normalized path matches.
    pub fn matches(&self, path: &str) -> bool {
        self.pattern.is_match(path)
    }
}
