//! Feature-file and step-stub rendering.
//!
//! Rendering is the only place generated text is produced: planners hand
//! over skeleton values and this module turns them into Gherkin features and
//! Rust step-definition stubs via Tera. The built-in templates are compiled
//! into the binary; a template directory can override them for customized
//! output.

// Internal imports (std, crate)
use std::path::{Path, PathBuf};

use crate::assemble::CanonicalEndpoint;
use crate::crud::CrudScenarioSet;
use crate::error::{Error, Result};
use crate::scenario::ScenarioSkeleton;
use crate::utils::{endpoint_file_stem, to_snake_case};

// External imports (alphabetized)
use tera::{Context, Tera};
use tokio::fs;

const FEATURE_TEMPLATE: &str = include_str!("../templates/feature.tera");
const CRUD_FEATURE_TEMPLATE: &str = include_str!("../templates/crud_feature.tera");
const STEPS_TEMPLATE: &str = include_str!("../templates/steps.rs.tera");

/// Renders and writes generated artifacts.
#[derive(Debug)]
pub struct FeatureRenderer {
    tera: Tera,
    base_url: String,
}

impl FeatureRenderer {
    /// Build a renderer with the built-in templates, or from a template
    /// directory overriding them.
    pub fn new(template_dir: Option<&Path>, base_url: impl Into<String>) -> Result<Self> {
        let tera = match template_dir {
            Some(dir) => {
                let dir_str = dir
                    .to_str()
                    .ok_or_else(|| Error::template("Template path contains invalid UTF-8"))?;
                log::info!("Loading templates from {}", dir_str);
                Tera::new(&format!("{}/**/*.tera", dir_str))?
            }
            None => {
                let mut tera = Tera::default();
                tera.add_raw_templates(vec![
                    ("feature.tera", FEATURE_TEMPLATE),
                    ("crud_feature.tera", CRUD_FEATURE_TEMPLATE),
                    ("steps.rs.tera", STEPS_TEMPLATE),
                ])?;
                tera
            }
        };
        Ok(Self {
            tera,
            base_url: base_url.into(),
        })
    }

    /// Render the Gherkin feature for one endpoint.
    pub fn render_feature(
        &self,
        endpoint: &CanonicalEndpoint,
        skeletons: &[ScenarioSkeleton],
    ) -> Result<String> {
        let mut context = Context::new();
        context.insert("method", &endpoint.method);
        context.insert("path", &endpoint.path);
        context.insert("scenarios", skeletons);
        Ok(self.tera.render("feature.tera", &context)?)
    }

    /// Render the CRUD lifecycle feature for one resource group.
    pub fn render_crud_feature(&self, set: &CrudScenarioSet) -> Result<String> {
        let mut context = Context::new();
        context.insert("group", &set.group);
        context.insert("scenarios", &set.skeletons);
        Ok(self.tera.render("crud_feature.tera", &context)?)
    }

    /// Render the step-definition stub for one endpoint.
    pub fn render_steps(&self, endpoint: &CanonicalEndpoint) -> Result<String> {
        let stem = endpoint_file_stem(&endpoint.method, &endpoint.path);
        let mut context = Context::new();
        context.insert("method", &endpoint.method);
        context.insert("path", &endpoint.path);
        context.insert("base_url", &self.base_url);
        context.insert("feature_file", &format!("{}.feature", stem));
        Ok(self.tera.render("steps.rs.tera", &context)?)
    }

    /// Render and write the feature file for one endpoint. Returns the path.
    pub async fn write_feature(
        &self,
        output_dir: &Path,
        endpoint: &CanonicalEndpoint,
        skeletons: &[ScenarioSkeleton],
    ) -> Result<PathBuf> {
        let stem = endpoint_file_stem(&endpoint.method, &endpoint.path);
        let path = output_dir.join("features").join(format!("{}.feature", stem));
        let content = self.render_feature(endpoint, skeletons)?;
        write_file(&path, &content).await?;
        Ok(path)
    }

    /// Render and write the step stub for one endpoint. Returns the path.
    /// Step stubs are Rust sources, so their filenames are snake_case.
    pub async fn write_steps(
        &self,
        output_dir: &Path,
        endpoint: &CanonicalEndpoint,
    ) -> Result<PathBuf> {
        let stem = endpoint_file_stem(&endpoint.method, &endpoint.path);
        let path = output_dir
            .join("steps")
            .join(format!("{}_steps.rs", to_snake_case(&stem)));
        let content = self.render_steps(endpoint)?;
        write_file(&path, &content).await?;
        Ok(path)
    }

    /// Render and write one group's CRUD feature. Returns the path.
    pub async fn write_crud_feature(
        &self,
        output_dir: &Path,
        set: &CrudScenarioSet,
    ) -> Result<PathBuf> {
        let path = output_dir
            .join("features")
            .join("crud")
            .join(format!("test_{}_crud_e2e.feature", set.group.to_lowercase()));
        let content = self.render_crud_feature(set)?;
        write_file(&path, &content).await?;
        Ok(path)
    }
}

async fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    log::debug!("Writing {} ({} bytes)", path.display(), content.len());
    fs::write(path, content).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assemble::assemble;
    use crate::record::RawEndpointRecord;
    use crate::scenario;
    use serde_json::json;
    use tempfile::tempdir;

    fn sample_endpoint() -> CanonicalEndpoint {
        let record = RawEndpointRecord::from_llm_json(&json!({
            "path": "/BookStore/v1/Books",
            "method": "GET",
            "parameters": [
                {"name": "ISBN", "in": "query", "required": true, "type": "string"}
            ],
            "responses": {"200": {"description": "OK"}, "404": {"description": "missing"}}
        }));
        assemble(vec![record]).catalog.remove(0)
    }

    #[test]
    fn test_render_feature_contains_scenarios() -> crate::Result<()> {
        let endpoint = sample_endpoint();
        let skeletons = scenario::plan(&endpoint, 4);
        let renderer = FeatureRenderer::new(None, "http://localhost:8080")?;

        let feature = renderer.render_feature(&endpoint, &skeletons)?;
        assert!(feature.starts_with("Feature: GET /BookStore/v1/Books API Endpoint"));
        assert!(feature.contains("Background:"));
        assert!(feature.contains("Scenario: Missing required parameters"));
        assert!(feature.contains("@negative @validation"));
        assert!(feature.contains("Given I am making a GET request to \"/BookStore/v1/Books\""));
        Ok(())
    }

    #[test]
    fn test_render_steps_embeds_endpoint() -> crate::Result<()> {
        let endpoint = sample_endpoint();
        let renderer = FeatureRenderer::new(None, "http://localhost:8080")?;

        let steps = renderer.render_steps(&endpoint)?;
        assert!(steps.contains("const BASE_URL: &str = \"http://localhost:8080\";"));
        assert!(steps.contains("GET_BookStore_v1_Books.feature"));
        assert!(steps.contains("pub struct ApiWorld"));
        Ok(())
    }

    #[tokio::test]
    async fn test_write_emits_deterministic_paths() -> crate::Result<()> {
        let dir = tempdir()?;
        let endpoint = sample_endpoint();
        let skeletons = scenario::plan(&endpoint, 4);
        let renderer = FeatureRenderer::new(None, "http://localhost:8080")?;

        let feature_path = renderer
            .write_feature(dir.path(), &endpoint, &skeletons)
            .await?;
        let steps_path = renderer.write_steps(dir.path(), &endpoint).await?;

        assert!(feature_path.ends_with("features/GET_BookStore_v1_Books.feature"));
        assert!(steps_path.ends_with("steps/get_book_store_v1_books_steps.rs"));
        assert!(feature_path.exists());
        assert!(steps_path.exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_write_crud_feature_path() -> crate::Result<()> {
        let dir = tempdir()?;
        let catalog = vec![sample_endpoint()];
        let groups = crate::crud::group(&catalog);
        let renderer = FeatureRenderer::new(None, "http://localhost:8080")?;

        let path = renderer
            .write_crud_feature(dir.path(), &groups["BookStore"])
            .await?;
        assert!(path.ends_with("features/crud/test_bookstore_crud_e2e.feature"));

        let content = fs::read_to_string(&path).await?;
        assert!(content.contains("Feature: End-to-end CRUD testing for BookStore API"));
        assert!(content.contains("Scenario: Read BookStore resource"));
        Ok(())
    }
}
