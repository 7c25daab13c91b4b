//! CLI interface for gitguard.
//!
//! A thin surface: flags are parsed here, everything else is delegated to
//! the analysis engine, the template registry, and the AI orchestrator.
//! Output is plain serialized data for the caller (or hook) to act on.

use std::collections::HashMap;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::{info, warn};

use crate::ai::orchestrator::{AiSplitResponse, CommitSuggestions};
use crate::ai::{create_provider, AiOrchestrator, AiOutcome};
use crate::analysis::split::{suggest_pr_split, PrSplitSuggestion};
use crate::analysis::{analyze, AnalysisResult};
use crate::config::{ConfigLoader, GitGuardConfig};
use crate::git::GitRepository;
use crate::template::{save_template, TemplateFormat, TemplateRegistry, TemplateType};

/// gitguard: git change analysis and commit suggestions
#[derive(Parser)]
#[command(name = "gitguard")]
#[command(about = "Analyzes git changes and suggests commit structure", long_about = None)]
#[command(version)]
pub struct Cli {
    /// The main command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Main command categories
#[derive(Subcommand)]
pub enum Commands {
    /// Analyze staged changes or a branch diff
    Analyze(AnalyzeCommand),
    /// Prompt template management
    Templates(TemplatesCommand),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Analyze(cmd) => cmd.execute().await,
            Commands::Templates(cmd) => cmd.execute(),
        }
    }
}

/// Output serialization format.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// YAML (default).
    Yaml,
    /// JSON.
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Yaml => write!(f, "yaml"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Analyze staged changes or a branch diff
#[derive(Parser)]
pub struct AnalyzeCommand {
    /// Analyze the branch diff against this base instead of the staged set
    #[arg(long)]
    pub base: Option<String>,

    /// Also propose a PR split (requires --base)
    #[arg(long, requires = "base")]
    pub pr: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Yaml)]
    pub format: OutputFormat,

    /// Enable AI suggestions for this run
    #[arg(long)]
    pub ai: bool,

    /// Disable AI suggestions for this run
    #[arg(long, conflicts_with = "ai")]
    pub no_ai: bool,
}

/// Full report emitted by `gitguard analyze`.
#[derive(Debug, Serialize)]
pub struct AnalyzeReport {
    /// Deterministic analysis result.
    pub analysis: AnalysisResult,
    /// PR split proposal for branch analyses.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pr_split: Option<PrSplitSuggestion>,
    /// AI commit message suggestions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_suggestions: Option<CommitSuggestions>,
    /// AI split proposal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_split: Option<AiSplitResponse>,
    /// Why AI output is absent ("skipped: ..." or "unavailable").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_status: Option<String>,
}

impl AnalyzeCommand {
    /// Run the analysis and print the report.
    pub async fn execute(self) -> Result<()> {
        let git = GitRepository::open()?;
        let config = ConfigLoader::new(git.workdir()).resolve()?;

        let (files, diff) = match self.base.as_deref() {
            Some(base) => (git.branch_changes(base)?, git.branch_diff_text(base)?),
            None => (git.staged_changes()?, git.staged_diff_text()?),
        };

        if files.is_empty() {
            info!("No changes to analyze");
        }

        let analysis = analyze(files, &diff, &config);

        let pr_split = if self.pr && !analysis.security.should_block {
            let base = self.base.as_deref().unwrap_or_default();
            suggest_pr_split(&analysis.files, base, &git.current_branch()?, &config)
        } else {
            None
        };

        let use_ai = (config.use_ai || self.ai) && !self.no_ai;
        let mut report = AnalyzeReport {
            analysis,
            pr_split,
            ai_suggestions: None,
            ai_split: None,
            ai_status: None,
        };

        // Security findings are reported before anything AI-generated; a
        // blocking result suppresses the AI path entirely.
        if use_ai && !report.analysis.security.should_block {
            self.run_ai(&git, &config, &diff, &mut report).await;
        }

        let output = match self.format {
            OutputFormat::Yaml => serde_yaml::to_string(&report)?,
            OutputFormat::Json => serde_json::to_string_pretty(&report)?,
        };
        println!("{output}");

        if report.analysis.security.should_block {
            anyhow::bail!(
                "High-severity security findings detected ({} file(s) to unstage)",
                report.analysis.security.files_to_unstage.len()
            );
        }
        Ok(())
    }

    /// Fills in the AI fields of the report. All failures degrade to an
    /// `ai_status` note; this never errors.
    async fn run_ai(
        &self,
        git: &GitRepository,
        config: &GitGuardConfig,
        diff: &str,
        report: &mut AnalyzeReport,
    ) {
        let orchestrator = match create_provider(&config.ai) {
            Ok(provider) => AiOrchestrator::new(provider, &config.ai),
            Err(e) => {
                warn!(error = %e, "AI provider unavailable");
                report.ai_status = Some(format!("unavailable: {e}"));
                return;
            }
        };

        let registry = TemplateRegistry::load(git.workdir());
        let template_type = ai_template_type(
            self.pr,
            report.pr_split.is_some(),
            report.analysis.commit_split.is_some(),
        );
        let wants_split = matches!(
            template_type,
            TemplateType::SplitCommit | TemplateType::SplitPr
        );
        let Some(template) = registry.default_template(template_type, TemplateFormat::Api) else {
            report.ai_status = Some("unavailable: no template".to_string());
            return;
        };

        let variables = prompt_variables(&report.analysis, diff, git, self.base.as_deref());
        let prompt = match registry.render_prompt(template, &variables) {
            Ok(prompt) => prompt,
            Err(e) => {
                warn!(error = %e, template = %template.id, "Template rendering failed");
                report.ai_status = Some(format!("unavailable: {e}"));
                return;
            }
        };

        if wants_split {
            match orchestrator
                .generate_split(&prompt, template.temperature, &report.analysis.files)
                .await
            {
                AiOutcome::Generated(split) => report.ai_split = Some(split),
                AiOutcome::Skipped { reason } => {
                    report.ai_status = Some(format!("skipped: {reason}"));
                }
                AiOutcome::Unavailable => report.ai_status = Some("unavailable".to_string()),
            }
        } else {
            match orchestrator
                .generate_commit_suggestions(&prompt, template.temperature)
                .await
            {
                AiOutcome::Generated(suggestions) => report.ai_suggestions = Some(suggestions),
                AiOutcome::Skipped { reason } => {
                    report.ai_status = Some(format!("skipped: {reason}"));
                }
                AiOutcome::Unavailable => report.ai_status = Some("unavailable".to_string()),
            }
        }
    }
}

/// Picks the prompt template for an AI run.
///
/// Branch analyses (`--pr`) use the PR templates; a proposed split of
/// either kind switches to the matching split template so the AI refines
/// the partition instead of describing it as one unit.
fn ai_template_type(pr: bool, has_pr_split: bool, has_commit_split: bool) -> TemplateType {
    match (pr, has_pr_split, has_commit_split) {
        (true, true, _) => TemplateType::SplitPr,
        (true, false, _) => TemplateType::Pr,
        (false, _, true) => TemplateType::SplitCommit,
        (false, _, false) => TemplateType::Commit,
    }
}

/// Builds the variable set shared by all prompt templates.
fn prompt_variables(
    analysis: &AnalysisResult,
    diff: &str,
    git: &GitRepository,
    base: Option<&str>,
) -> HashMap<String, String> {
    let files = analysis
        .files
        .iter()
        .map(|f| format!("{} (+{}/-{})", f.path, f.additions, f.deletions))
        .collect::<Vec<_>>()
        .join("\n");

    let mut variables = HashMap::new();
    variables.insert("files".to_string(), files);
    variables.insert("diff".to_string(), diff.to_string());
    variables.insert(
        "scope".to_string(),
        analysis.scope.clone().unwrap_or_default(),
    );
    variables.insert(
        "reasons".to_string(),
        analysis.complexity.reasons.join("\n"),
    );
    variables.insert(
        "branch".to_string(),
        git.current_branch().unwrap_or_default(),
    );
    variables.insert(
        "base_branch".to_string(),
        base.unwrap_or_default().to_string(),
    );
    variables
}

/// Prompt template management
#[derive(Parser)]
pub struct TemplatesCommand {
    /// Template operation
    #[command(subcommand)]
    pub command: TemplatesSubcommand,
}

/// Template operations
#[derive(Subcommand)]
pub enum TemplatesSubcommand {
    /// List all known templates
    List,
    /// Copy a template into the project (or global) template directory
    Save {
        /// Template id to save
        id: String,
        /// Save to ~/.gitguard/templates instead of the project
        #[arg(long)]
        global: bool,
    },
}

impl TemplatesCommand {
    /// Execute the template operation.
    pub fn execute(self) -> Result<()> {
        let git = GitRepository::open()?;
        let registry = TemplateRegistry::load(git.workdir());

        match self.command {
            TemplatesSubcommand::List => {
                for id in registry.ids() {
                    if let Some(template) = registry.get(id) {
                        println!(
                            "{id}\t{}\t{}\tv{}\t{:?}",
                            template.template_type,
                            template.format,
                            template.version,
                            template.source
                        );
                    }
                }
                Ok(())
            }
            TemplatesSubcommand::Save { id, global } => {
                let template = registry
                    .get(&id)
                    .with_context(|| format!("No template with id '{id}'"))?;
                let root = if global {
                    dirs::home_dir()
                        .context("Cannot determine home directory")?
                        .join(".gitguard")
                        .join("templates")
                } else {
                    git.workdir()
                        .context("Repository has no working tree")?
                        .join(".gitguard")
                        .join("templates")
                };
                let path = save_template(&root, template)?;
                println!("Saved {id} to {}", path.display());
                Ok(())
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn staged_analysis_picks_commit_templates() {
        assert_eq!(ai_template_type(false, false, false), TemplateType::Commit);
        assert_eq!(
            ai_template_type(false, false, true),
            TemplateType::SplitCommit
        );
    }

    #[test]
    fn branch_analysis_picks_pr_templates() {
        assert_eq!(ai_template_type(true, false, false), TemplateType::Pr);
        assert_eq!(ai_template_type(true, true, false), TemplateType::SplitPr);
        // A commit split never overrides the PR path.
        assert_eq!(ai_template_type(true, false, true), TemplateType::Pr);
    }
}
