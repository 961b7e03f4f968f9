//! Skill tool discovery across the configured filesystem roots.
//!
//! Roots are scanned in precedence order; a later root overrides an
//! earlier one on tool name collision. Under each root, every direct
//! subdirectory is a skill carrying a `tools/tools.yaml` manifest. A
//! skill without a manifest still contributes: script files with a
//! recognised extension register as shell-like tools.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::domain::models::{
    canonical_name, CustomTool, SandboxLevel, ScriptLanguage, ToolDef, ToolDescriptor,
    ToolMetadata, ToolSource,
};
use crate::infrastructure::skills::manifest::ToolManifest;

/// Discovers custom tools from skill directories.
pub struct SkillDiscovery {
    roots: Vec<PathBuf>,
}

impl SkillDiscovery {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self { roots }
    }

    /// The standard root set, lowest precedence first: global skills in
    /// the home directory, bundled workspace skills, workspace overrides,
    /// then project skills.
    pub fn standard_roots(workspace: &Path, project: Option<&Path>) -> Vec<PathBuf> {
        let mut roots = Vec::new();
        if let Some(home) = std::env::var_os("HOME") {
            roots.push(PathBuf::from(home).join(".heike").join("skills"));
        }
        roots.push(workspace.join("skills"));
        roots.push(workspace.join(".heike").join("skills"));
        if let Some(project) = project {
            roots.push(project.join("skills"));
        }
        roots
    }

    /// Scan every root and return the effective tool set, sorted by name.
    pub fn discover(&self) -> Vec<CustomTool> {
        let mut tools: BTreeMap<String, CustomTool> = BTreeMap::new();

        for root in &self.roots {
            let Ok(entries) = std::fs::read_dir(root) else {
                continue;
            };
            let mut skill_dirs: Vec<PathBuf> = entries
                .filter_map(Result::ok)
                .map(|e| e.path())
                .filter(|p| p.is_dir())
                .collect();
            skill_dirs.sort();

            for skill_dir in skill_dirs {
                for tool in discover_skill(&skill_dir) {
                    // Later roots override earlier on name collision.
                    tools.insert(canonical_name(&tool.descriptor.def.name), tool);
                }
            }
        }

        tools.into_values().collect()
    }
}

fn discover_skill(skill_dir: &Path) -> Vec<CustomTool> {
    let manifest_path = skill_dir.join("tools").join("tools.yaml");
    if manifest_path.is_file() {
        return load_manifest(skill_dir, &manifest_path);
    }
    scan_scripts(skill_dir)
}

fn load_manifest(skill_dir: &Path, manifest_path: &Path) -> Vec<CustomTool> {
    let yaml = match std::fs::read_to_string(manifest_path) {
        Ok(yaml) => yaml,
        Err(err) => {
            tracing::warn!(path = %manifest_path.display(), error = %err, "unreadable manifest");
            return Vec::new();
        }
    };
    let manifest = match ToolManifest::parse(&yaml) {
        Ok(manifest) => manifest,
        Err(err) => {
            tracing::warn!(path = %manifest_path.display(), error = %err, "skipping manifest");
            return Vec::new();
        }
    };

    let mut tools = Vec::new();
    for entry in manifest.tools {
        match entry.resolve(skill_dir) {
            Ok(tool) => tools.push(tool),
            Err(err) => {
                tracing::warn!(path = %manifest_path.display(), error = %err, "skipping tool");
            }
        }
    }
    tools
}

/// Manifest-less fallback: register recognised script files directly.
fn scan_scripts(skill_dir: &Path) -> Vec<CustomTool> {
    let mut candidates: Vec<PathBuf> = Vec::new();
    for dir in [skill_dir.to_path_buf(), skill_dir.join("tools")] {
        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };
        candidates.extend(
            entries
                .filter_map(Result::ok)
                .map(|e| e.path())
                .filter(|p| p.is_file()),
        );
    }
    candidates.sort();

    let mut tools = Vec::new();
    for path in candidates {
        let Some(language) = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(ScriptLanguage::from_extension)
        else {
            continue;
        };
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };

        let def = ToolDef::new(
            stem,
            format!("script tool from {}", path.display()),
            serde_json::json!({"type": "object", "properties": {}}),
        );
        if def.validate().is_err() {
            tracing::warn!(path = %path.display(), "script name is not a valid tool name");
            continue;
        }

        tools.push(CustomTool {
            descriptor: ToolDescriptor::new(
                def,
                ToolMetadata {
                    source: ToolSource::Skill,
                    ..Default::default()
                },
            ),
            language,
            script_path: path,
            sandbox: SandboxLevel::Basic,
            dependencies: Vec::new(),
        });
    }
    tools
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(path: &Path, contents: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn manifest_yaml(name: &str, description: &str) -> String {
        format!(
            "tools:\n  - name: {name}\n    language: shell\n    script: tools/{name}.sh\n    description: {description}\n"
        )
    }

    #[test]
    fn test_discover_from_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("skills");
        write(
            &root.join("reporting/tools/tools.yaml"),
            &manifest_yaml("report", "first"),
        );

        let discovery = SkillDiscovery::new(vec![root.clone()]);
        let tools = discovery.discover();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].descriptor.def.name, "report");
        assert_eq!(
            tools[0].script_path,
            root.join("reporting/tools/report.sh")
        );
    }

    #[test]
    fn test_later_root_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let low = dir.path().join("global");
        let high = dir.path().join("project");
        write(
            &low.join("skill/tools/tools.yaml"),
            &manifest_yaml("report", "global version"),
        );
        write(
            &high.join("skill/tools/tools.yaml"),
            &manifest_yaml("report", "project version"),
        );

        let discovery = SkillDiscovery::new(vec![low, high]);
        let tools = discovery.discover();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].descriptor.def.description, "project version");
    }

    #[test]
    fn test_manifestless_skill_scans_scripts() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("skills");
        write(&root.join("adhoc/fixup.py"), "print('hi')\n");
        write(&root.join("adhoc/notes.txt"), "not a script\n");
        write(&root.join("adhoc/tools/extra.sh"), "echo hi\n");

        let discovery = SkillDiscovery::new(vec![root]);
        let tools = discovery.discover();
        let names: Vec<&str> = tools
            .iter()
            .map(|t| t.descriptor.def.name.as_str())
            .collect();
        assert_eq!(names, ["extra", "fixup"]);
        assert_eq!(tools[1].language, ScriptLanguage::Python);
        assert_eq!(tools[0].sandbox, SandboxLevel::Basic);
    }

    #[test]
    fn test_missing_root_is_not_an_error() {
        let discovery = SkillDiscovery::new(vec![PathBuf::from("/does/not/exist")]);
        assert!(discovery.discover().is_empty());
    }

    #[test]
    fn test_standard_roots_resolve_home() {
        temp_env::with_var("HOME", Some("/home/agent"), || {
            let roots = SkillDiscovery::standard_roots(Path::new("/ws"), Some(Path::new("/proj")));
            assert_eq!(
                roots,
                vec![
                    PathBuf::from("/home/agent/.heike/skills"),
                    PathBuf::from("/ws/skills"),
                    PathBuf::from("/ws/.heike/skills"),
                    PathBuf::from("/proj/skills"),
                ]
            );
        });
    }
}
