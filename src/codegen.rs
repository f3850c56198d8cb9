use std::{
    error::Error,
    fs,
    path::{Path, PathBuf},
};

use handlebars::Handlebars;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use crate::{
    codegen::{document::Document, resolver::DerefMode, templates::TemplateSet},
    log,
};

pub mod casing;
pub mod document;
pub mod helpers;
pub mod resolver;
pub mod templates;

/// Run-wide toggles. Each option is merged into the root of every render
/// context under its camelCase name (`generateEnums`), replacing a document
/// member of the same name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct GenerationOptions {
    /// Emit top-level enum schemas as `enum` declarations instead of literal
    /// unions.
    pub generate_enums: bool,
}

impl GenerationOptions {
    pub fn load(path: &Path) -> Result<GenerationOptions, Box<dyn Error>> {
        let content = fs::read_to_string(path)
            .map_err(|e| format!("reading options file {}: {e}", path.display()))?;
        Ok(serde_yaml::from_str(&content)?)
    }
}

/// A compiled template set with the helper catalogue registered. Built once
/// and shared read-only across renders.
pub struct Codegen {
    registry: Handlebars<'static>,
    templates: TemplateSet,
}

impl Codegen {
    pub fn new(templates: TemplateSet, mode: DerefMode) -> Result<Codegen, Box<dyn Error>> {
        let mut registry = Handlebars::new();
        registry.register_escape_fn(handlebars::no_escape);
        helpers::register(&mut registry, mode);
        for partial in &templates.partials {
            registry
                .register_partial(&partial.name, &partial.text)
                .map_err(|e| format!("compiling partial {}: {e}", partial.name))?;
        }
        for template in &templates.templates {
            registry
                .register_template_string(&template.name, &template.text)
                .map_err(|e| format!("compiling template {}: {e}", template.name))?;
        }
        Ok(Codegen {
            registry,
            templates,
        })
    }

    /// Renders one template by name.
    pub fn render(
        &self,
        name: &str,
        document: &Document,
        options: &GenerationOptions,
    ) -> Result<String, Box<dyn Error>> {
        let context = render_context(document, options)?;
        self.render_with(name, &context)
            .map_err(|e| e as Box<dyn Error>)
    }

    fn render_with(&self, name: &str, context: &Json) -> Result<String, Box<dyn Error + Send + Sync>> {
        self.registry
            .render(name, context)
            .map_err(|e| format!("rendering {name}: {e}").into())
    }

    /// Renders every template into `out_dir`, mirroring template names as
    /// relative paths. Files are generated in parallel; the first failure
    /// aborts the run, and files already written are left in place.
    pub fn generate(
        &self,
        document: &Document,
        options: &GenerationOptions,
        out_dir: &Path,
    ) -> Result<Vec<PathBuf>, Box<dyn Error>> {
        let context = render_context(document, options)?;
        let written: Result<Vec<PathBuf>, Box<dyn Error + Send + Sync>> = self
            .templates
            .templates
            .par_iter()
            .map(|template| -> Result<PathBuf, Box<dyn Error + Send + Sync>> {
                let content = self.render_with(&template.name, &context)?;
                let path = out_dir.join(template.output_path());
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent)
                        .map_err(|e| format!("creating {}: {e}", parent.display()))?;
                }
                fs::write(&path, content).map_err(|e| format!("writing {}: {e}", path.display()))?;
                log!("wrote {}", path.display());
                Ok(path)
            })
            .collect();
        written.map_err(|e| e as Box<dyn Error>)
    }
}

fn render_context(document: &Document, options: &GenerationOptions) -> Result<Json, Box<dyn Error>> {
    let mut context = document.to_json();
    let Json::Object(root) = &mut context else {
        return Err("document root must be a mapping".into());
    };
    let Json::Object(options) = serde_json::to_value(options)? else {
        return Err("generation options must serialize to a mapping".into());
    };
    root.extend(options);
    Ok(context)
}
