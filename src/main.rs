use std::{error::Error, path::PathBuf, process};

use clap::Parser;

use crate::codegen::{
    Codegen, GenerationOptions, document::Document, resolver::DerefMode, templates::TemplateSet,
};

mod codegen;
mod util;

#[derive(Parser)]
#[command(about = "Render source files from an OpenAPI 3 document and a Handlebars template set")]
struct Args {
    /// Path or http(s) URL of the OpenAPI document (YAML or JSON).
    input: String,

    /// Templates directory. The bundled TypeScript templates are used when
    /// omitted.
    #[arg(short, long)]
    templates: Option<PathBuf>,

    /// Output directory.
    #[arg(short, long, default_value = "out")]
    output: PathBuf,

    /// Generate top-level enum schemas as enums instead of literal unions.
    #[arg(long)]
    generate_enums: bool,

    /// YAML file with generation options; flags given on the command line
    /// take precedence.
    #[arg(long)]
    options: Option<PathBuf>,

    /// Make `deref` follow chained references to the final value instead of
    /// a single hop.
    #[arg(long)]
    transitive_refs: bool,
}

fn main() {
    let args = Args::parse();
    if let Err(e) = run(args) {
        eprint!("error: {e}");
        let mut e = &*e;
        while let Some(source) = e.source() {
            eprint!(": {source}");
            e = source;
        }
        eprintln!();
        process::exit(1);
    }
}

fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let mut options = match &args.options {
        Some(path) => {
            log!("reading generation options from {}", path.display());
            GenerationOptions::load(path)?
        }
        None => GenerationOptions::default(),
    };
    options.generate_enums |= args.generate_enums;

    let templates = match &args.templates {
        Some(dir) => {
            log!("loading templates from {}", dir.display());
            TemplateSet::from_dir(dir)?
        }
        None => {
            log!("using bundled templates");
            TemplateSet::bundled()
        }
    };

    let mode = if args.transitive_refs {
        DerefMode::Transitive
    } else {
        DerefMode::SingleHop
    };

    let document = Document::load(&args.input)?;

    log!("compiling {} templates", templates.templates.len());
    let codegen = Codegen::new(templates, mode)?;

    let written = codegen.generate(&document, &options, &args.output)?;
    log!(
        "generated {} files in {}",
        written.len(),
        args.output.display()
    );

    Ok(())
}
