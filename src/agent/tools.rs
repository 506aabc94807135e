//! Tool requests for the generation loop.
//!
//! The model sends loosely-typed JSON inputs, historically with alias
//! fields for the same concept (`filename` / `path` / `filePath`). All of
//! that is resolved here, once, at the boundary: [`ToolRequest::parse`]
//! turns a raw name + input into a tagged union with exactly one canonical
//! field per concept, or a descriptive error string the loop hands back to
//! the model.

use serde_json::Value;

/// A raw tool invocation as received from the generation model.
#[derive(Debug, Clone, PartialEq)]
pub struct RawToolCall {
    /// Correlation id for the tool result (e.g. `toolu_01abc123`).
    pub id: String,
    /// Tool name as sent by the model.
    pub name: String,
    /// Unvalidated JSON input.
    pub input: Value,
}

impl RawToolCall {
    /// Creates a raw call.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, input: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            input,
        }
    }
}

/// One string replacement inside a `multiEdit` call.
#[derive(Debug, Clone, PartialEq)]
pub struct EditOp {
    /// Exact string to replace.
    pub old_string: String,
    /// Replacement text.
    pub new_string: String,
    /// Replace every occurrence instead of the first.
    pub replace_all: bool,
}

/// Fully-qualified module coordinates for a registry lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleRef {
    pub registry_host: String,
    pub module_namespace: String,
    pub module_name: String,
    pub module_provider: String,
    pub module_version: String,
    pub sub_module_path: Option<String>,
}

/// A validated, normalized tool request.
///
/// One variant per tool the generation loop exposes; each concept has
/// exactly one canonical field.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolRequest {
    /// Record the canonical file list; missing files are created with the
    /// placeholder sentinel. Re-calling union-merges.
    InitializeProject { files: Vec<String> },
    /// Stream model-generated content into one file.
    WriteFile { filename: String },
    /// Stream content for several files sequentially, in listed order.
    WriteProjectFiles { filenames: Vec<String> },
    /// Replace a string in one file.
    Edit {
        file_path: String,
        old_string: String,
        new_string: String,
        replace_all: bool,
    },
    /// Apply an ordered list of replacements to one file.
    MultiEdit {
        file_path: String,
        edits: Vec<EditOp>,
    },
    /// Read-only: fetch current content of the named files.
    FetchFiles { files: Vec<String> },
    /// Read-only: module schema/metadata lookup.
    FetchModules { modules: Vec<ModuleRef> },
    /// Read-only: public module documentation lookup.
    FetchPublicModuleDocs { modules: Vec<String> },
}

impl ToolRequest {
    /// Normalizes a raw tool name + input into a request.
    ///
    /// # Errors
    ///
    /// Returns a descriptive message suitable for handing straight back to
    /// the model as a tool result.
    pub fn parse(name: &str, input: &Value) -> Result<Self, String> {
        match name {
            "initialize_project" => Ok(Self::InitializeProject {
                files: str_list(input, &["files", "filenames"])?,
            }),
            "write_file" => Ok(Self::WriteFile {
                filename: str_field(input, &["filename", "filePath", "path"])?,
            }),
            "write_project_files" => Ok(Self::WriteProjectFiles {
                filenames: str_list(input, &["filenames", "files"])?,
            }),
            "edit" => Ok(Self::Edit {
                file_path: str_field(input, &["filePath", "filename", "path"])?,
                old_string: str_field(input, &["oldString"])?,
                new_string: str_field(input, &["newString"])?,
                replace_all: bool_field(input, "replaceAll"),
            }),
            "multiEdit" => Ok(Self::MultiEdit {
                file_path: str_field(input, &["filePath", "filename", "path"])?,
                edits: edit_list(input)?,
            }),
            "fetchFiles" => Ok(Self::FetchFiles {
                files: str_list(input, &["files", "filenames"])?,
            }),
            "fetchModules" => Ok(Self::FetchModules {
                modules: module_list(input)?,
            }),
            "fetchPublicModuleDocs" => Ok(Self::FetchPublicModuleDocs {
                modules: str_list(input, &["modules"])?,
            }),
            other => Err(format!("Error: unknown tool '{other}'.")),
        }
    }

    /// Canonical name of this request's tool.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::InitializeProject { .. } => "initialize_project",
            Self::WriteFile { .. } => "write_file",
            Self::WriteProjectFiles { .. } => "write_project_files",
            Self::Edit { .. } => "edit",
            Self::MultiEdit { .. } => "multiEdit",
            Self::FetchFiles { .. } => "fetchFiles",
            Self::FetchModules { .. } => "fetchModules",
            Self::FetchPublicModuleDocs { .. } => "fetchPublicModuleDocs",
        }
    }

    /// Returns true if this request cannot mutate project state.
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        matches!(
            self,
            Self::FetchFiles { .. } | Self::FetchModules { .. } | Self::FetchPublicModuleDocs { .. }
        )
    }
}

/// Outcome of one executed tool step.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// The tool ran; the string is its result for the model.
    Completed(String),
    /// The tool could not run as asked; the string describes why. Handed
    /// to the model as an error result so it can self-correct.
    Failed(String),
}

impl StepOutcome {
    /// The text sent back to the model, regardless of outcome.
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Completed(s) | Self::Failed(s) => s,
        }
    }

    /// Returns true for failed outcomes.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Transcript record of one tool invocation within a run.
///
/// Exists only for the duration of the generation loop; never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolStep {
    /// Correlation id from the originating call.
    pub id: String,
    /// Tool name as invoked.
    pub name: String,
    /// Raw input the model sent.
    pub input: Value,
    /// Result or error.
    pub outcome: StepOutcome,
}

fn str_field(input: &Value, keys: &[&str]) -> Result<String, String> {
    for key in keys {
        if let Some(s) = input.get(key).and_then(Value::as_str) {
            return Ok(s.to_string());
        }
    }
    Err(format!("Error: missing required field '{}'.", keys[0]))
}

fn str_list(input: &Value, keys: &[&str]) -> Result<Vec<String>, String> {
    for key in keys {
        if let Some(arr) = input.get(key).and_then(Value::as_array) {
            return arr
                .iter()
                .map(|v| {
                    v.as_str()
                        .map(String::from)
                        .ok_or_else(|| format!("Error: '{key}' must be a list of strings."))
                })
                .collect();
        }
    }
    Err(format!("Error: missing required field '{}'.", keys[0]))
}

fn bool_field(input: &Value, key: &str) -> bool {
    input.get(key).and_then(Value::as_bool).unwrap_or(false)
}

fn edit_list(input: &Value) -> Result<Vec<EditOp>, String> {
    let arr = input
        .get("edits")
        .and_then(Value::as_array)
        .ok_or_else(|| "Error: missing required field 'edits'.".to_string())?;
    arr.iter()
        .map(|e| {
            Ok(EditOp {
                old_string: str_field(e, &["oldString"])?,
                new_string: str_field(e, &["newString"])?,
                replace_all: bool_field(e, "replaceAll"),
            })
        })
        .collect()
}

fn module_list(input: &Value) -> Result<Vec<ModuleRef>, String> {
    let arr = input
        .get("modules")
        .and_then(Value::as_array)
        .ok_or_else(|| "Error: missing required field 'modules'.".to_string())?;
    arr.iter()
        .map(|m| {
            Ok(ModuleRef {
                registry_host: str_field(m, &["registry_host"])?,
                module_namespace: str_field(m, &["module_namespace"])?,
                module_name: str_field(m, &["module_name"])?,
                module_provider: str_field(m, &["module_provider"])?,
                module_version: str_field(m, &["module_version"])?,
                sub_module_path: m
                    .get("sub_module_path")
                    .and_then(Value::as_str)
                    .map(String::from),
            })
        })
        .collect()
}
