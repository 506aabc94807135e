//! Tool definitions sent to the generation model.
//!
//! The Messages API requires tools to be declared in the request payload
//! with a JSON schema; the model answers with `tool_use` content blocks
//! naming one of these.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// A tool definition for the Messages API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolDefinition {
    /// The unique name of the tool.
    pub name: String,

    /// Human-readable description the model uses to decide when to call it.
    pub description: String,

    /// JSON Schema for the input parameters.
    pub input_schema: Value,
}

impl ToolDefinition {
    /// Creates a new tool definition.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }
}

/// The full tool set a generation run exposes.
#[must_use]
pub fn generation_tools() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::new(
            "initialize_project",
            "Initialize the project with a list of filenames. Files are created \
             as pending placeholders until content is written.",
            json!({
                "type": "object",
                "properties": {
                    "files": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "List of filenames to create (e.g. ['main.tf', 'variables.tf'])"
                    }
                },
                "required": ["files"]
            }),
        ),
        ToolDefinition::new(
            "write_file",
            "Write or stream the content for a specific file. Use this for \
             single file updates.",
            json!({
                "type": "object",
                "properties": {
                    "filename": {"type": "string", "description": "The name of the file to write to."}
                },
                "required": ["filename"]
            }),
        ),
        ToolDefinition::new(
            "write_project_files",
            "Write content for multiple files sequentially. Recommended for \
             initial project generation.",
            json!({
                "type": "object",
                "properties": {
                    "filenames": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "List of filenames to write sequentially."
                    }
                },
                "required": ["filenames"]
            }),
        ),
        ToolDefinition::new(
            "edit",
            "Perform a string replacement in a file.",
            json!({
                "type": "object",
                "properties": {
                    "filePath": {"type": "string", "description": "Path of the file to edit."},
                    "oldString": {"type": "string", "description": "The exact string to replace."},
                    "newString": {"type": "string", "description": "The new string."},
                    "replaceAll": {"type": "boolean", "description": "Replace all occurrences."}
                },
                "required": ["filePath", "oldString", "newString"]
            }),
        ),
        ToolDefinition::new(
            "multiEdit",
            "Perform multiple ordered edits to a single file.",
            json!({
                "type": "object",
                "properties": {
                    "filePath": {"type": "string"},
                    "edits": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "oldString": {"type": "string"},
                                "newString": {"type": "string"},
                                "replaceAll": {"type": "boolean"}
                            },
                            "required": ["oldString", "newString"]
                        }
                    }
                },
                "required": ["filePath", "edits"]
            }),
        ),
        ToolDefinition::new(
            "fetchFiles",
            "Fetch the current content of specific files from the project.",
            json!({
                "type": "object",
                "properties": {
                    "files": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "List of filenames to fetch."
                    }
                },
                "required": ["files"]
            }),
        ),
        ToolDefinition::new(
            "fetchModules",
            "Fetch module schema and metadata from the registry (read-only).",
            json!({
                "type": "object",
                "properties": {
                    "modules": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "registry_host": {"type": "string"},
                                "module_namespace": {"type": "string"},
                                "module_name": {"type": "string"},
                                "module_provider": {"type": "string"},
                                "module_version": {"type": "string"},
                                "sub_module_path": {"type": "string"}
                            },
                            "required": [
                                "registry_host",
                                "module_namespace",
                                "module_name",
                                "module_provider",
                                "module_version"
                            ]
                        }
                    }
                },
                "required": ["modules"]
            }),
        ),
        ToolDefinition::new(
            "fetchPublicModuleDocs",
            "Fetch documentation for public modules (read-only).",
            json!({
                "type": "object",
                "properties": {
                    "modules": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "Module ids (hostname/namespace/name/provider/version)"
                    }
                },
                "required": ["modules"]
            }),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_generation_tools_present() {
        let tools = generation_tools();
        let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
        for expected in [
            "initialize_project",
            "write_file",
            "write_project_files",
            "edit",
            "multiEdit",
            "fetchFiles",
            "fetchModules",
            "fetchPublicModuleDocs",
        ] {
            assert!(names.contains(&expected), "missing tool: {expected}");
        }
    }

    #[test]
    fn test_schemas_are_objects() {
        for tool in generation_tools() {
            assert_eq!(tool.input_schema["type"], "object", "{}", tool.name);
        }
    }
}
