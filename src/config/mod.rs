//! Layered configuration management.
//!
//! Configuration is resolved once, before any analysis runs, by merging
//! four layers in increasing precedence: built-in defaults, the global
//! file (`~/.gitguard/config.yaml`), the project file
//! (`.gitguard/config.yaml` at the repository root), and `GITGUARD_*` /
//! `AZURE_OPENAI_*` environment variables. The result is an immutable
//! [`GitGuardConfig`]; the engine never re-reads raw config.

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::analysis::security::Severity;

/// Effective configuration for one analysis run.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GitGuardConfig {
    /// Skip interactive confirmation and accept suggestions automatically.
    pub auto_mode: bool,

    /// Whether AI-assisted suggestions are enabled.
    pub use_ai: bool,

    /// Emit extra diagnostics.
    pub debug: bool,

    /// Monorepo package path patterns (e.g. `packages/*`).
    pub monorepo_patterns: Vec<String>,

    /// Paths excluded from all analysis.
    pub ignore_patterns: Vec<String>,

    /// Complexity scoring thresholds, weights, and category patterns.
    pub complexity: ComplexityOptions,

    /// Security scanning rules.
    pub security: SecurityConfig,

    /// AI provider settings and prompt budget.
    pub ai: AiSettings,
}

impl Default for GitGuardConfig {
    fn default() -> Self {
        Self {
            auto_mode: false,
            use_ai: false,
            debug: false,
            monorepo_patterns: vec!["packages/*".to_string()],
            ignore_patterns: Vec::new(),
            complexity: ComplexityOptions::default(),
            security: SecurityConfig::default(),
            ai: AiSettings::default(),
        }
    }
}

/// Complexity scoring configuration.
///
/// Invariant: all weights are ≥ 0; negative values from config files are
/// clamped to zero at load time.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ComplexityOptions {
    /// Size and file-count thresholds.
    pub thresholds: SizeThresholds,
    /// Per-category score weights.
    pub scoring: ScoringWeights,
    /// Per-category path patterns.
    pub patterns: CategoryPatterns,
    /// Cutoffs for the needs-structure decision.
    pub structure_thresholds: StructureThresholds,
}

/// Line-count and file-count thresholds for complexity reasons.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SizeThresholds {
    /// Changed-line count marking a large file.
    pub large_file: usize,
    /// Changed-line count marking a very large file.
    pub very_large_file: usize,
    /// Changed-line count marking a huge file.
    pub huge_file: usize,
    /// File count triggering the multiple-files reason.
    pub multiple_files: usize,
    /// File count triggering the many-files reason.
    pub many_files: usize,
}

impl Default for SizeThresholds {
    fn default() -> Self {
        Self {
            large_file: 100,
            very_large_file: 300,
            huge_file: 500,
            multiple_files: 5,
            many_files: 10,
        }
    }
}

/// Score weights applied per matched category or size tier.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScoringWeights {
    /// Added for every changed file.
    pub base_file_score: f64,
    /// Added when a file crosses the large-file threshold.
    pub large_file_score: f64,
    /// Added when a file crosses the very-large-file threshold.
    pub very_large_file_score: f64,
    /// Added when a file crosses the huge-file threshold.
    pub huge_file_score: f64,
    /// Weight for source files. A file may match several categories and
    /// all matched weights accumulate.
    pub source_file_score: f64,
    /// Weight for test files.
    pub test_file_score: f64,
    /// Weight for configuration files.
    pub config_file_score: f64,
    /// Weight for API surface files.
    pub api_file_score: f64,
    /// Weight for database migration files.
    pub migration_file_score: f64,
    /// Weight for UI component files.
    pub component_file_score: f64,
    /// Weight for hook files.
    pub hook_file_score: f64,
    /// Weight for shared utility files.
    pub utility_file_score: f64,
    /// Weight for critical configuration files.
    pub critical_file_score: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            base_file_score: 1.0,
            large_file_score: 2.0,
            very_large_file_score: 3.0,
            huge_file_score: 5.0,
            source_file_score: 1.0,
            test_file_score: 1.0,
            config_file_score: 0.5,
            api_file_score: 2.0,
            migration_file_score: 2.0,
            component_file_score: 1.0,
            hook_file_score: 1.0,
            utility_file_score: 0.5,
            critical_file_score: 2.0,
        }
    }
}

impl ScoringWeights {
    /// Clamps any negative weight to zero.
    fn clamp_non_negative(&mut self) {
        for weight in [
            &mut self.base_file_score,
            &mut self.large_file_score,
            &mut self.very_large_file_score,
            &mut self.huge_file_score,
            &mut self.source_file_score,
            &mut self.test_file_score,
            &mut self.config_file_score,
            &mut self.api_file_score,
            &mut self.migration_file_score,
            &mut self.component_file_score,
            &mut self.hook_file_score,
            &mut self.utility_file_score,
            &mut self.critical_file_score,
        ] {
            if *weight < 0.0 {
                warn!(weight = *weight, "Negative complexity weight clamped to 0");
                *weight = 0.0;
            }
        }
    }
}

/// Path patterns for each file category.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CategoryPatterns {
    /// Source code files.
    pub source_files: Vec<String>,
    /// Test files.
    pub test_files: Vec<String>,
    /// Configuration files.
    pub config_files: Vec<String>,
    /// Critical configuration whose change alone warrants structure.
    pub critical_files: Vec<String>,
    /// API surface files.
    pub api_files: Vec<String>,
    /// Database migration files.
    pub migration_files: Vec<String>,
    /// UI component files.
    pub component_files: Vec<String>,
    /// Hook files (React hooks, git hooks).
    pub hook_files: Vec<String>,
    /// Shared utility files.
    pub utility_files: Vec<String>,
}

impl Default for CategoryPatterns {
    fn default() -> Self {
        let v = |patterns: &[&str]| patterns.iter().map(|s| (*s).to_string()).collect();
        Self {
            source_files: v(&["src/**/*", "lib/**/*"]),
            test_files: v(&["*.test.*", "*.spec.*", "tests/**/*", "__tests__/**/*"]),
            config_files: v(&["*.json", "*.yaml", "*.yml", "*.toml", "*.config.*"]),
            critical_files: v(&[
                "package.json",
                "Cargo.toml",
                "go.mod",
                "pnpm-lock.yaml",
                "package-lock.json",
                "Cargo.lock",
                "tsconfig.json",
                ".github/workflows/**/*",
            ]),
            api_files: v(&["**/api/**/*", "**/routes/**/*", "*.proto", "*.graphql"]),
            migration_files: v(&["**/migrations/**/*", "*.sql"]),
            component_files: v(&["**/components/**/*", "*.tsx", "*.vue", "*.svelte"]),
            hook_files: v(&["**/hooks/**/*", "use*.ts", "use*.tsx"]),
            utility_files: v(&["**/utils/**/*", "**/helpers/**/*"]),
        }
    }
}

/// Cutoffs for deciding a commit needs structuring help.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StructureThresholds {
    /// Complexity score above which structure is needed.
    pub score_threshold: f64,
    /// Reason count above which structure is needed.
    pub reasons_threshold: usize,
}

impl Default for StructureThresholds {
    fn default() -> Self {
        Self {
            score_threshold: 10.0,
            reasons_threshold: 2,
        }
    }
}

/// Security scanning configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Master switch for the scanner.
    pub enabled: bool,
    /// Paths excluded from scanning (in addition to the top-level ignores).
    pub ignore_patterns: Vec<String>,
    /// Secret pattern rules applied to diff content.
    pub secrets: SecretRules,
    /// Risky-file rules applied to changed paths.
    pub files: FileRules,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ignore_patterns: Vec::new(),
            secrets: SecretRules::default(),
            files: FileRules::default(),
        }
    }
}

/// Secret detection rules.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecretRules {
    /// Whether the secret pass runs.
    pub enabled: bool,
    /// Severity assigned to matches without a per-pattern override.
    pub severity: Severity,
    /// Regex patterns matched against added diff lines.
    pub patterns: Vec<SecretPattern>,
}

impl Default for SecretRules {
    fn default() -> Self {
        Self {
            enabled: true,
            severity: Severity::High,
            patterns: default_secret_patterns(),
        }
    }
}

/// One named secret regex.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SecretPattern {
    /// Human-readable rule name.
    pub name: String,
    /// Regex source matched against added diff lines.
    pub pattern: String,
    /// Per-pattern severity override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
}

fn default_secret_patterns() -> Vec<SecretPattern> {
    let p = |name: &str, pattern: &str| SecretPattern {
        name: name.to_string(),
        pattern: pattern.to_string(),
        severity: None,
    };
    vec![
        p("AWS access key", r"AKIA[A-Z0-9]{16}"),
        p("GitHub token", r"gh[pousr]_[A-Za-z0-9]{36}"),
        p(
            "Private key",
            r"-----BEGIN (?:RSA |EC |OPENSSH |DSA )?PRIVATE KEY-----",
        ),
        p(
            "Generic API key assignment",
            r#"(?i)(?:api[_-]?key|secret|token|password)["']?\s*[:=]\s*["'][^"'\s]{8,}["']"#,
        ),
        p("Slack token", r"xox[baprs]-[A-Za-z0-9-]{10,}"),
    ]
}

/// Risky-file detection rules.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FileRules {
    /// Whether the file pass runs.
    pub enabled: bool,
    /// Severity assigned to matched paths.
    pub severity: Severity,
    /// Path patterns considered risky to commit.
    pub patterns: Vec<String>,
}

impl Default for FileRules {
    fn default() -> Self {
        let v = |patterns: &[&str]| patterns.iter().map(|s| (*s).to_string()).collect();
        Self {
            enabled: true,
            severity: Severity::High,
            patterns: v(&[
                ".env",
                ".env.*",
                "*.pem",
                "*.key",
                "*.p12",
                "*.pfx",
                "id_rsa",
                "id_ed25519",
                "*credentials*.json",
                ".npmrc",
                ".netrc",
            ]),
        }
    }
}

/// AI provider settings and prompt budget.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AiSettings {
    /// Provider to construct: `azure`, `openai`, or `ollama`.
    pub provider: String,
    /// Model identifier (for Azure this is the deployment name).
    pub model: String,
    /// Sampling temperature; falls back to the orchestrator default.
    pub temperature: Option<f32>,
    /// Maximum estimated prompt tokens before the call is refused.
    pub max_prompt_tokens: usize,
    /// Maximum estimated prompt cost (USD) before the call is refused.
    pub max_prompt_cost: f64,
    /// Base URL override for OpenAI-compatible providers.
    pub base_url: Option<String>,
    /// Azure OpenAI settings.
    pub azure: AzureSettings,
}

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            provider: "azure".to_string(),
            model: "gpt-4o".to_string(),
            temperature: None,
            max_prompt_tokens: 4096,
            max_prompt_cost: 0.10,
            base_url: None,
            azure: AzureSettings::default(),
        }
    }
}

/// Azure OpenAI endpoint settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AzureSettings {
    /// Resource endpoint, e.g. `https://example.openai.azure.com/`.
    pub endpoint: String,
    /// Deployment name to invoke.
    pub deployment: String,
    /// API version query parameter.
    pub api_version: String,
}

impl Default for AzureSettings {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            deployment: "gpt-4o".to_string(),
            api_version: "2024-02-15-preview".to_string(),
        }
    }
}

/// Loads and merges configuration layers.
pub struct ConfigLoader {
    global_path: PathBuf,
    project_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Creates a loader for the standard locations.
    ///
    /// `repo_root` is the working tree root; `None` skips the project layer.
    pub fn new(repo_root: Option<&Path>) -> Self {
        let global_path = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".gitguard")
            .join("config.yaml");
        let project_path = repo_root.map(|root| root.join(".gitguard").join("config.yaml"));
        Self {
            global_path,
            project_path,
        }
    }

    /// Creates a loader with explicit file paths (used by tests).
    pub fn with_paths(global_path: PathBuf, project_path: Option<PathBuf>) -> Self {
        Self {
            global_path,
            project_path,
        }
    }

    /// Resolves the effective configuration.
    ///
    /// Missing files contribute nothing; a malformed file is logged and
    /// skipped so configuration problems never abort an analysis.
    pub fn resolve(&self) -> Result<GitGuardConfig> {
        let mut value = serde_yaml::to_value(GitGuardConfig::default())
            .context("Failed to serialize default configuration")?;

        for path in [Some(&self.global_path), self.project_path.as_ref()]
            .into_iter()
            .flatten()
        {
            match Self::load_layer(path) {
                Some(layer) => {
                    debug!(path = %path.display(), "Merging configuration layer");
                    merge_yaml(&mut value, layer);
                }
                None => debug!(path = %path.display(), "No configuration layer"),
            }
        }

        let mut config: GitGuardConfig =
            serde_yaml::from_value(value).context("Failed to deserialize merged configuration")?;
        apply_env_overrides(&mut config);
        config.complexity.scoring.clamp_non_negative();
        Ok(config)
    }

    fn load_layer(path: &Path) -> Option<serde_yaml::Value> {
        if !path.exists() {
            return None;
        }
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read config file, skipping");
                return None;
            }
        };
        match serde_yaml::from_str(&content) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Malformed config file, skipping");
                None
            }
        }
    }
}

/// Deep-merges `overlay` onto `base`; mappings merge key-wise, everything
/// else (including sequences) is replaced wholesale.
fn merge_yaml(base: &mut serde_yaml::Value, overlay: serde_yaml::Value) {
    match (base, overlay) {
        (serde_yaml::Value::Mapping(base_map), serde_yaml::Value::Mapping(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(base_value) => merge_yaml(base_value, overlay_value),
                    None => {
                        base_map.insert(key, overlay_value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

/// Applies `GITGUARD_*` and `AZURE_OPENAI_*` environment overrides.
fn apply_env_overrides(config: &mut GitGuardConfig) {
    if let Some(value) = env_bool("GITGUARD_AUTO") {
        config.auto_mode = value;
    }
    if let Some(value) = env_bool("GITGUARD_USE_AI") {
        config.use_ai = value;
    }
    if let Some(value) = env_bool("GITGUARD_DEBUG") {
        config.debug = value;
    }
    if let Ok(endpoint) = env::var("AZURE_OPENAI_ENDPOINT") {
        config.ai.azure.endpoint = endpoint;
    }
    if let Ok(deployment) = env::var("AZURE_OPENAI_DEPLOYMENT") {
        config.ai.azure.deployment = deployment;
    }
    if let Ok(api_version) = env::var("AZURE_OPENAI_API_VERSION") {
        config.ai.azure.api_version = api_version;
    }
}

fn env_bool(key: &str) -> Option<bool> {
    env::var(key)
        .ok()
        .map(|value| matches!(value.to_lowercase().as_str(), "1" | "true" | "yes"))
}
