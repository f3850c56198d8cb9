use std::{
    error::Error,
    fs,
    path::{Path, PathBuf},
};

use walkdir::WalkDir;

use crate::log;

pub const TEMPLATE_SUFFIX: &str = ".handlebars";
pub const PARTIAL_SUFFIX: &str = ".partial.handlebars";

/// A named piece of template text. Names are `/`-separated paths relative to
/// the template root, without the template suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateSource {
    pub name: String,
    pub text: String,
}

impl TemplateSource {
    fn new(name: impl Into<String>, text: impl Into<String>) -> TemplateSource {
        TemplateSource {
            name: name.into(),
            text: text.into(),
        }
    }

    /// Where the rendered output lands, relative to the output directory.
    pub fn output_path(&self) -> PathBuf {
        self.name.split('/').collect()
    }
}

/// The templates to render and the partials they may include.
#[derive(Debug, Clone, Default)]
pub struct TemplateSet {
    pub templates: Vec<TemplateSource>,
    pub partials: Vec<TemplateSource>,
}

impl TemplateSet {
    /// The TypeScript + Angular templates shipped with the binary.
    pub fn bundled() -> TemplateSet {
        TemplateSet {
            templates: vec![
                TemplateSource::new(
                    "schemas.ts",
                    include_str!("../../templates/typescript/schemas.ts.handlebars"),
                ),
                TemplateSource::new(
                    "angular/client.ts",
                    include_str!("../../templates/typescript/angular/client.ts.handlebars"),
                ),
                TemplateSource::new(
                    "angular/client.module.ts",
                    include_str!("../../templates/typescript/angular/client.module.ts.handlebars"),
                ),
            ],
            partials: vec![
                partial(
                    "schema",
                    include_str!("../../templates/typescript/schema.partial.handlebars"),
                ),
                partial(
                    "object",
                    include_str!("../../templates/typescript/object.partial.handlebars"),
                ),
            ],
        }
    }

    /// Collects every `*.handlebars` file below `dir`. Files ending in
    /// `.partial.handlebars` become partials; the rest become templates.
    pub fn from_dir(dir: &Path) -> Result<TemplateSet, Box<dyn Error>> {
        if !dir.is_dir() {
            Err(format!("templates directory not found: {}", dir.display()))?
        }
        let mut set = TemplateSet::default();
        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry.path().strip_prefix(dir)?;
            let Some(relative) = relative_name(relative) else {
                log!("skipping non-UTF-8 path {}", entry.path().display());
                continue;
            };
            if let Some(name) = relative.strip_suffix(PARTIAL_SUFFIX) {
                let text = fs::read_to_string(entry.path())
                    .map_err(|e| format!("reading {}: {e}", entry.path().display()))?;
                set.partials.push(partial(name, &text));
            } else if let Some(name) = relative.strip_suffix(TEMPLATE_SUFFIX) {
                let text = fs::read_to_string(entry.path())
                    .map_err(|e| format!("reading {}: {e}", entry.path().display()))?;
                set.templates.push(TemplateSource::new(name, text));
            }
        }
        if set.templates.is_empty() {
            Err(format!("no templates found in {}", dir.display()))?
        }
        Ok(set)
    }
}

// Partials are included inline, so the file's trailing newline is dropped.
fn partial(name: &str, text: &str) -> TemplateSource {
    TemplateSource::new(name, text.trim_end_matches(['\r', '\n']))
}

fn relative_name(path: &Path) -> Option<String> {
    let parts = path
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<Vec<_>>>()?;
    Some(parts.join("/"))
}
