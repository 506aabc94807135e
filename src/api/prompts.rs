//! System prompts for generation runs.

use crate::types::snapshot::Snapshot;

/// Workflow policy for the tool loop.
///
/// The ordering below is an instruction to the model, not a guarantee:
/// the executor tolerates any call order and still produces a valid
/// snapshot at every step.
pub const WORKFLOW_SYSTEM_PROMPT: &str = "\
You are an infrastructure-as-code generator. Follow this exact workflow for every project:

STEP 1: Call initialize_project.
   - You MUST include 'plan.md' and 'README.md' in the file list.
   - Include all other required .tf files (main.tf, variables.tf, etc.).

STEP 2: Call write_file for 'plan.md'.
   - This file MUST contain a detailed implementation plan, architecture overview, and resource breakdown.
   - Do this BEFORE generating any other code.

STEP 3: Call write_project_files for the remaining files.
   - Include 'README.md' and all .tf files.
   - 'README.md' should explain prerequisites, usage, and what gets deployed.

ORGANIZATION RULES:
- Use forward slashes ('/') in filenames to indicate directory structure (e.g. 'modules/networking/main.tf').
- Keep the root directory clean; 'main.tf', 'variables.tf', 'plan.md', and 'README.md' belong at the root.

CRITICAL RULES:
- NEVER skip the 'plan.md' step. It is your design phase.
- EVERY project MUST have a 'README.md'.
- DO NOT generate text responses - ONLY use tool calls.
- Each file MUST contain complete, valid content (Markdown for .md, HCL for .tf).";

/// Builds the system prompt for authoring one file's content.
#[must_use]
pub fn file_content_prompt(
    filename: &str,
    file_titles: &[String],
    project_title: &str,
    files: &Snapshot,
) -> String {
    let mut prompt = format!(
        "You are writing the file '{filename}' for the infrastructure project: {project_title}.\n\
         The project consists of these files: {}.\n\
         Output ONLY the raw content of '{filename}' with no surrounding prose or code fences.\n",
        file_titles.join(", ")
    );
    let written: Vec<&str> = files
        .files
        .iter()
        .filter(|f| f.title != filename && !f.content.is_empty() && !f.is_placeholder())
        .map(|f| f.title.as_str())
        .collect();
    if !written.is_empty() {
        prompt.push_str(&format!(
            "Files already written (keep names, variables, and outputs consistent with them): {}.\n",
            written.join(", ")
        ));
    }
    prompt
}

/// Builds the system prompt for revising an existing document.
///
/// The model must answer with a complete snapshot document:
/// `{"files":[{"title":...,"content":...}]}`.
#[must_use]
pub fn revision_prompt(current_content: &str) -> String {
    format!(
        "Update the following infrastructure project according to the user's request.\n\
         Respond with ONLY a JSON object of the form \
         {{\"files\":[{{\"title\":\"<path>\",\"content\":\"<text>\"}}]}} containing the FULL \
         updated project - every file, not just the changed ones.\n\n\
         Current project:\n{current_content}"
    )
}
