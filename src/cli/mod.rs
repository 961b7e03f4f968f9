//! Thin CLI over the runtime: run a goal, inspect tools and skills.

use clap::{Parser, Subcommand};
use comfy_table::{presets::UTF8_FULL, Table};
use console::style;

use crate::domain::models::{CustomTool, ToolDescriptor};

/// Heike: autonomous agent runtime.
#[derive(Debug, Parser)]
#[command(name = "heike", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Session identifier
    #[arg(long, global = true, default_value = "default")]
    pub session: String,

    /// Workspace identifier for sandboxes and skill tools
    #[arg(long, global = true, default_value = "default")]
    pub workspace: String,

    /// Path to a config file (defaults to .heike/config.yaml discovery)
    #[arg(long, global = true)]
    pub config: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run a goal through the agent
    Run {
        /// The goal text
        goal: String,
    },
    /// List registered tools
    Tools,
    /// List discovered skill tools
    Skills,
}

/// Render the tool registry as a table.
pub fn render_tools(descriptors: &[ToolDescriptor]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["Name", "Source", "Risk", "Capabilities", "Description"]);
    for descriptor in descriptors {
        table.add_row(vec![
            descriptor.def.name.clone(),
            descriptor.metadata.source.as_str().to_string(),
            descriptor.metadata.risk.as_str().to_string(),
            descriptor.metadata.capabilities.join(", "),
            descriptor.def.description.clone(),
        ]);
    }
    table
}

/// Render discovered skill tools as a table.
pub fn render_skills(tools: &[CustomTool]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["Name", "Language", "Sandbox", "Script"]);
    for tool in tools {
        table.add_row(vec![
            tool.descriptor.def.name.clone(),
            tool.language.as_str().to_string(),
            format!("{:?}", tool.sandbox).to_lowercase(),
            tool.script_path.display().to_string(),
        ]);
    }
    table
}

/// A green success line for terminal output.
pub fn success_line(text: &str) -> String {
    format!("{} {}", style("✓").green().bold(), text)
}

/// A red failure line for terminal output.
pub fn failure_line(text: &str) -> String {
    format!("{} {}", style("✗").red().bold(), text)
}
