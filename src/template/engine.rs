use handlebars::Handlebars;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use walkdir::WalkDir;

use super::types::{StubContext, DEFAULT_STUB_TEMPLATE};

/// File name of an optional custom stub template inside the migrations directory
pub const CUSTOM_TEMPLATE_FILE: &str = "migration.rs.hbs";

/// Stub names become Rust module names
static NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-z0-9_]*$").expect("stub name pattern should compile"));

/// `REVISION` constant of a generated stub
static REVISION_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^\s*pub const REVISION: &str = "([^"]+)";"#)
        .expect("revision pattern should compile")
});

#[derive(Error, Debug)]
pub enum StubError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Template error: {0}")]
    TemplateError(#[from] handlebars::TemplateError),

    #[error("Render error: {0}")]
    RenderError(#[from] handlebars::RenderError),

    #[error("Invalid migration name '{0}': use lowercase letters, digits and underscores, starting with a letter")]
    InvalidName(String),
}

/// Renders and writes migration stubs into a migrations directory.
pub struct StubGenerator {
    handlebars: Handlebars<'static>,
    migrations_dir: PathBuf,
}

impl StubGenerator {
    pub fn new(migrations_dir: impl Into<PathBuf>) -> Self {
        let mut handlebars = Handlebars::new();
        handlebars.register_escape_fn(handlebars::no_escape);
        Self {
            handlebars,
            migrations_dir: migrations_dir.into(),
        }
    }

    pub fn migrations_dir(&self) -> &Path {
        &self.migrations_dir
    }

    /// Path a stub named `name` is written to
    pub fn stub_path(&self, name: &str) -> PathBuf {
        self.migrations_dir.join(format!("{}.rs", name))
    }

    /// Check that `name` can be used as a module name
    pub fn validate_name(name: &str) -> Result<(), StubError> {
        if NAME_PATTERN.is_match(name) && name != "mod" {
            Ok(())
        } else {
            Err(StubError::InvalidName(name.to_string()))
        }
    }

    /// Names of the `.rs` files already present in the migrations directory
    pub fn existing_names(&self) -> BTreeSet<String> {
        if !self.migrations_dir.exists() {
            return BTreeSet::new();
        }

        WalkDir::new(&self.migrations_dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "rs"))
            .filter_map(|e| {
                e.path()
                    .file_stem()
                    .map(|stem| stem.to_string_lossy().to_string())
            })
            .filter(|stem| stem != "mod")
            .collect()
    }

    /// Revision declared by the stub named `name`, if it declares one
    pub async fn stub_revision(&self, name: &str) -> Result<Option<String>, StubError> {
        let content = fs::read_to_string(self.stub_path(name)).await?;
        Ok(REVISION_PATTERN
            .captures(&content)
            .map(|caps| caps[1].to_string()))
    }

    /// Load the custom template if the migrations directory has one
    pub async fn load_template(&self) -> Result<String, StubError> {
        let custom = self.migrations_dir.join(CUSTOM_TEMPLATE_FILE);
        if custom.exists() {
            Ok(fs::read_to_string(&custom).await?)
        } else {
            Ok(DEFAULT_STUB_TEMPLATE.to_string())
        }
    }

    /// Render a stub without writing it
    pub async fn render(&self, context: &StubContext) -> Result<String, StubError> {
        let template = self.load_template().await?;
        self.handlebars
            .render_template(&template, context)
            .map_err(StubError::from)
    }

    /// Render and write a stub, returning its path
    pub async fn write(&self, context: &StubContext) -> Result<PathBuf, StubError> {
        Self::validate_name(&context.name)?;
        let content = self.render(context).await?;

        fs::create_dir_all(&self.migrations_dir).await?;
        let path = self.stub_path(&context.name);
        fs::write(&path, content).await?;
        Ok(path)
    }
}
