//! Handle manifests
//!
//! The boundary with the site's asset-registration system. A manifest
//! enumerates registered stylesheet/script handles with their source URLs
//! and metadata; a sync pass answers with a registration plan that swaps
//! external sources for local copies while leaving handles, dependencies,
//! versions, and media/position untouched.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::category::Category;
use crate::error::{Error, Result};

/// Where a script registration loads on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptPosition {
    Head,
    #[default]
    Footer,
}

/// One registered stylesheet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StyleHandle {
    pub handle: String,
    pub src: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deps: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default = "default_media")]
    pub media: String,
}

fn default_media() -> String {
    "all".to_string()
}

/// One registered script.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptHandle {
    pub handle: String,
    pub src: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deps: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default)]
    pub position: ScriptPosition,
}

/// The full set of registrations for one site.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub styles: Vec<StyleHandle>,

    #[serde(default)]
    pub scripts: Vec<ScriptHandle>,
}

impl Manifest {
    /// Load a manifest from YAML or JSON, chosen by file extension.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::Manifest(format!("Failed to read {}: {}", path.display(), e)))?;

        let manifest = if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&contents)
                .map_err(|e| Error::Manifest(format!("Failed to parse {}: {}", path.display(), e)))?
        } else {
            serde_yaml::from_str(&contents)
                .map_err(|e| Error::Manifest(format!("Failed to parse {}: {}", path.display(), e)))?
        };
        Ok(manifest)
    }

    /// Write the manifest back out, format chosen by file extension.
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::to_string_pretty(self)?
        } else {
            serde_yaml::to_string(self)
                .map_err(|e| Error::Manifest(format!("Failed to serialize manifest: {e}")))?
        };
        std::fs::write(path, contents)
            .map_err(|e| Error::Manifest(format!("Failed to write {}: {}", path.display(), e)))?;
        Ok(())
    }

    /// Apply a registration plan: each localized handle's source is swapped
    /// to its local URL; everything else is carried over unchanged.
    pub fn with_plan(&self, plan: &RegistrationPlan) -> Manifest {
        let mut rewritten = self.clone();
        for style in &mut rewritten.styles {
            if let Some(local) = plan.local_src(&style.handle, Category::Stylesheet) {
                style.src = local.to_string();
            }
        }
        for script in &mut rewritten.scripts {
            if let Some(local) = plan.local_src(&script.handle, Category::Script) {
                script.src = local.to_string();
            }
        }
        rewritten
    }
}

/// What happened to one handle during a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HandleAction {
    /// Source swapped to the local copy.
    Localized,
    /// Source already points at the site's own host; nothing to do.
    Local,
    /// Category disabled in configuration.
    Disabled,
    /// No cached copy available; the original source stays live.
    Failed,
}

impl HandleAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            HandleAction::Localized => "localized",
            HandleAction::Local => "local",
            HandleAction::Disabled => "disabled",
            HandleAction::Failed => "failed",
        }
    }
}

/// Outcome for one handle.
#[derive(Debug, Clone, Serialize)]
pub struct HandleOutcome {
    pub handle: String,
    pub category: Category,
    pub original_src: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_src: Option<String>,

    pub action: HandleAction,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// The registration plan produced by one sync or render pass: one outcome
/// per manifest handle, in manifest order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RegistrationPlan {
    pub outcomes: Vec<HandleOutcome>,
}

impl RegistrationPlan {
    pub fn push(&mut self, outcome: HandleOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn localized_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.action == HandleAction::Localized)
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.action == HandleAction::Failed)
            .count()
    }

    fn local_src(&self, handle: &str, category: Category) -> Option<&str> {
        self.outcomes
            .iter()
            .find(|o| o.handle == handle && o.category == category)
            .and_then(|o| o.local_src.as_deref())
    }
}
