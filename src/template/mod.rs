//! Versioned prompt template management.
//!
//! Templates are YAML files loaded from three roots in precedence order:
//! project (`.gitguard/templates`), global (`~/.gitguard/templates`), and
//! built-in defaults embedded in the binary. The registry is built once by
//! an explicit load step and read-only afterwards; identity is the
//! template id, and a higher-precedence source replaces a lower one.

pub mod render;

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use semver::Version;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub use render::{render, RenderError};

/// What a template generates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TemplateType {
    /// A single commit message.
    Commit,
    /// A commit split proposal.
    SplitCommit,
    /// A PR description.
    Pr,
    /// A PR split proposal.
    SplitPr,
}

impl fmt::Display for TemplateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Commit => "commit",
            Self::SplitCommit => "split-commit",
            Self::Pr => "pr",
            Self::SplitPr => "split-pr",
        };
        write!(f, "{name}")
    }
}

/// Output audience of a template.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateFormat {
    /// Structured JSON for the orchestrator.
    #[default]
    Api,
    /// Prose for direct display.
    Human,
}

impl fmt::Display for TemplateFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Api => write!(f, "api"),
            Self::Human => write!(f, "human"),
        }
    }
}

/// Where a template was loaded from. Ordering is precedence: project
/// beats global beats default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateSource {
    /// `.gitguard/templates` at the repository root.
    Project,
    /// `~/.gitguard/templates`.
    Global,
    /// Embedded in the binary.
    Default,
}

/// On-disk template shape. `type` and `template` are required; a file
/// missing either is skipped at load time.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TemplateFile {
    #[serde(default)]
    id: Option<String>,
    #[serde(rename = "type")]
    template_type: TemplateType,
    #[serde(default)]
    format: TemplateFormat,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    provider: Option<String>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    temperature: Option<f32>,
    template: String,
    #[serde(default)]
    system_prompt: Option<String>,
}

/// A template ready for rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadedPromptTemplate {
    /// Identity key; explicit `id` field or `type.format.basename`.
    pub id: String,
    /// What this template generates.
    pub template_type: TemplateType,
    /// Output audience.
    pub format: TemplateFormat,
    /// Semantic version string; `"0.0.0"` when the file omits one.
    pub version: String,
    /// Which root supplied this template.
    pub source: TemplateSource,
    /// Raw template text with `{{variable}}` tags.
    pub template: String,
    /// Optional system prompt, also templated.
    pub system_prompt: Option<String>,
    /// Provider hint for the orchestrator.
    pub provider: Option<String>,
    /// Model hint for the orchestrator.
    pub model: Option<String>,
    /// Temperature hint for the orchestrator.
    pub temperature: Option<f32>,
}

/// A rendered prompt pair ready for the AI orchestrator.
#[derive(Debug, Clone)]
pub struct RenderedPrompt {
    /// The user prompt.
    pub prompt: String,
    /// The system prompt, when the template defines one.
    pub system_prompt: Option<String>,
}

/// Relationship of an installed template to a newer candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateVersionStatus {
    /// No installed template with this id.
    New,
    /// Installed version is at least the candidate version.
    UpToDate,
    /// Candidate is strictly newer than the installed version.
    NeedsUpdate,
}

/// Classifies an installed template version against a candidate.
///
/// Unparseable or missing versions are treated as `"0.0.0"`.
pub fn compare_template_versions(
    installed: Option<&str>,
    candidate: &str,
) -> TemplateVersionStatus {
    let Some(installed) = installed else {
        return TemplateVersionStatus::New;
    };
    if parse_version(installed) >= parse_version(candidate) {
        TemplateVersionStatus::UpToDate
    } else {
        TemplateVersionStatus::NeedsUpdate
    }
}

fn parse_version(version: &str) -> Version {
    Version::parse(version).unwrap_or_else(|_| Version::new(0, 0, 0))
}

/// Built-in templates embedded at compile time, as `(stem, yaml)` pairs.
const BUILT_IN_TEMPLATES: &[(&str, &str)] = &[
    ("commit", include_str!("../templates/commit.yaml")),
    ("split-commit", include_str!("../templates/split-commit.yaml")),
    ("pr", include_str!("../templates/pr.yaml")),
    ("split-pr", include_str!("../templates/split-pr.yaml")),
];

/// Immutable id-keyed template lookup table.
pub struct TemplateRegistry {
    templates: HashMap<String, LoadedPromptTemplate>,
}

impl TemplateRegistry {
    /// Loads templates from the standard roots.
    ///
    /// `repo_root` is the working tree root; `None` skips the project
    /// layer. Missing directories contribute nothing.
    pub fn load(repo_root: Option<&Path>) -> Self {
        let global = dirs::home_dir().map(|home| home.join(".gitguard").join("templates"));
        let project = repo_root.map(|root| root.join(".gitguard").join("templates"));
        Self::load_from(global.as_deref(), project.as_deref())
    }

    /// Loads templates from explicit roots (used by tests).
    pub fn load_from(global_dir: Option<&Path>, project_dir: Option<&Path>) -> Self {
        let mut templates: HashMap<String, LoadedPromptTemplate> = HashMap::new();

        for template in built_in_templates() {
            templates.insert(template.id.clone(), template);
        }
        for (dir, source) in [
            (global_dir, TemplateSource::Global),
            (project_dir, TemplateSource::Project),
        ] {
            if let Some(dir) = dir {
                for template in load_dir(dir, source) {
                    templates.insert(template.id.clone(), template);
                }
            }
        }

        debug!(count = templates.len(), "Template registry loaded");
        Self { templates }
    }

    /// Looks up a template by id.
    pub fn get(&self, id: &str) -> Option<&LoadedPromptTemplate> {
        self.templates.get(id)
    }

    /// All templates of a given type and format, highest precedence first.
    pub fn templates_for_type(
        &self,
        template_type: TemplateType,
        format: TemplateFormat,
    ) -> Vec<&LoadedPromptTemplate> {
        let mut matching: Vec<&LoadedPromptTemplate> = self
            .templates
            .values()
            .filter(|t| t.template_type == template_type && t.format == format)
            .collect();
        matching.sort_by(|a, b| a.source.cmp(&b.source).then_with(|| a.id.cmp(&b.id)));
        matching
    }

    /// The preferred template for a type and format, if any exists.
    pub fn default_template(
        &self,
        template_type: TemplateType,
        format: TemplateFormat,
    ) -> Option<&LoadedPromptTemplate> {
        self.templates_for_type(template_type, format)
            .into_iter()
            .next()
    }

    /// All known template ids, sorted.
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.templates.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Renders a template's prompt and system prompt against a variable set.
    pub fn render_prompt(
        &self,
        template: &LoadedPromptTemplate,
        variables: &HashMap<String, String>,
    ) -> std::result::Result<RenderedPrompt, RenderError> {
        let prompt = render(&template.template, variables)?;
        let system_prompt = template
            .system_prompt
            .as_deref()
            .map(|text| render(text, variables))
            .transpose()?;
        Ok(RenderedPrompt {
            prompt,
            system_prompt,
        })
    }
}

/// Writes a template to `<root>/<id>.yaml`, creating the root if needed.
pub fn save_template(root: &Path, template: &LoadedPromptTemplate) -> Result<PathBuf> {
    std::fs::create_dir_all(root)
        .with_context(|| format!("Failed to create template directory {}", root.display()))?;

    let file = TemplateFile {
        id: Some(template.id.clone()),
        template_type: template.template_type,
        format: template.format,
        version: Some(template.version.clone()),
        provider: template.provider.clone(),
        model: template.model.clone(),
        temperature: template.temperature,
        template: template.template.clone(),
        system_prompt: template.system_prompt.clone(),
    };
    let yaml = serde_yaml::to_string(&file).context("Failed to serialize template")?;

    let path = root.join(format!("{}.yaml", template.id));
    std::fs::write(&path, yaml)
        .with_context(|| format!("Failed to write template {}", path.display()))?;
    Ok(path)
}

fn built_in_templates() -> Vec<LoadedPromptTemplate> {
    BUILT_IN_TEMPLATES
        .iter()
        .filter_map(|(stem, yaml)| match serde_yaml::from_str(yaml) {
            Ok(file) => Some(into_loaded(file, stem, TemplateSource::Default)),
            Err(e) => {
                // Embedded templates ship with the binary; a parse failure
                // here is a packaging bug, but loading still degrades
                // instead of failing.
                warn!(stem = %stem, error = %e, "Skipping malformed built-in template");
                None
            }
        })
        .collect()
}

/// Loads all YAML templates in one directory, sorted by file name.
/// Unreadable or malformed files are skipped; the first file claiming an
/// id wins within a directory.
fn load_dir(dir: &Path, source: TemplateSource) -> Vec<LoadedPromptTemplate> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => {
            debug!(dir = %dir.display(), "No template directory");
            return Vec::new();
        }
    };

    let mut paths: Vec<PathBuf> = entries
        .filter_map(std::result::Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            matches!(
                path.extension().and_then(|ext| ext.to_str()),
                Some("yaml" | "yml")
            )
        })
        .collect();
    paths.sort();

    let mut loaded: Vec<LoadedPromptTemplate> = Vec::new();
    for path in paths {
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read template, skipping");
                continue;
            }
        };
        let file: TemplateFile = match serde_yaml::from_str(&content) {
            Ok(file) => file,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Malformed template, skipping");
                continue;
            }
        };
        let stem = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("template");
        let template = into_loaded(file, stem, source);
        if loaded.iter().any(|t| t.id == template.id) {
            warn!(id = %template.id, path = %path.display(), "Duplicate template id, keeping first");
            continue;
        }
        loaded.push(template);
    }
    loaded
}

fn into_loaded(file: TemplateFile, stem: &str, source: TemplateSource) -> LoadedPromptTemplate {
    let id = file
        .id
        .unwrap_or_else(|| format!("{}.{}.{stem}", file.template_type, file.format));
    LoadedPromptTemplate {
        id,
        template_type: file.template_type,
        format: file.format,
        version: file.version.unwrap_or_else(|| "0.0.0".to_string()),
        source,
        template: file.template,
        system_prompt: file.system_prompt,
        provider: file.provider,
        model: file.model,
        temperature: file.temperature,
    }
}
