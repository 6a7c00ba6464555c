//! Editor multi-root workspace file emitter (spec.md §6, "Editor workspace
//! file").

use std::path::{Path, PathBuf};

use serde::Serialize;

#[derive(Debug, Serialize)]
struct Folder {
    path: String,
}

#[derive(Debug, Serialize)]
struct WorkspaceDocument {
    folders: Vec<Folder>,
}

/// Build the `{"folders": [...]}` document for `entire-project.code-workspace`
/// (or an equivalent name): the current directory first, then each
/// reconciled target as `../<dir>` relative to the parent directory.
pub fn build_document(working_dir: &Path, targets: &[PathBuf]) -> serde_json::Value {
    let mut folders = vec![Folder {
        path: ".".to_string(),
    }];
    for target in targets {
        if let Some(name) = target.file_name() {
            let _ = working_dir;
            folders.push(Folder {
                path: format!("../{}", name.to_string_lossy()),
            });
        }
    }
    let doc = WorkspaceDocument { folders };
    serde_json::to_value(doc).expect("WorkspaceDocument always serializes")
}

/// Render `targets` into the workspace JSON text, suitable for writing
/// directly to `entire-project.code-workspace`.
pub fn render(working_dir: &Path, targets: &[PathBuf]) -> String {
    let value = build_document(working_dir, targets);
    serde_json::to_string_pretty(&value).expect("workspace document is always valid JSON")
}
