//! HTML rendering for the upload page.

use crate::models::page::IndexPage;
use minijinja::Environment;

const INDEX_TEMPLATE: &str = "index.html";

/// Template environment, built once at startup and shared by handlers.
pub struct Views {
    env: Environment<'static>,
}

impl Views {
    pub fn new() -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        env.add_template(INDEX_TEMPLATE, include_str!("index.html"))?;
        Ok(Self { env })
    }

    pub fn render_index(&self, page: &IndexPage) -> Result<String, minijinja::Error> {
        self.env.get_template(INDEX_TEMPLATE)?.render(page)
    }
}
