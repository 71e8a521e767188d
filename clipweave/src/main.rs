use clap::Parser;
use clipweave_lib::{
    convert, CancelToken, ConvertRequest, EmptyRegistry, StaticRegistry,
};
use log::info;
use std::fs;

const CLIPWEAVE_INTRO: &str = r#"
     _ _
  __| (_)_ ____      _____  __ ___   _____
 / _| | | '_ \ \ /\ / / _ \/ _` \ \ / / _ \
| (_| | | |_) \ V  V /  __/ (_| |\ V /  __/
 \__|_|_| .__/ \_/\_/ \___|\__,_| \_/ \___|
        |_|   HTML/CSS -> design-tool clipboard
"#;

#[derive(Parser)]
#[command(name = "clipweave")]
#[command(about = "Convert HTML + CSS into a design-tool clipboard document")]
struct Args {
    /// HTML input file.
    input: String,

    /// CSS input file.
    #[arg(long)]
    css: Option<String>,

    /// Optional JavaScript file, preserved via the embed escape hatch.
    #[arg(long)]
    js: Option<String>,

    /// Output file for the JSON document (stdout when omitted).
    #[arg(short, long)]
    output: Option<String>,

    /// Also write the original HTML as a plain-text clipboard fallback.
    #[arg(long)]
    fallback: Option<String>,

    /// Comma-separated class names that already exist in the
    /// destination project (colliding styles are dropped).
    #[arg(long)]
    existing_classes: Option<String>,
}

fn main() {
    env_logger::init();
    eprintln!("{}", CLIPWEAVE_INTRO);

    let args: Args = Args::parse();

    let html = read_or_exit(&args.input);
    let css = args.css.as_deref().map(read_or_exit).unwrap_or_default();
    let js = args.js.as_deref().map(read_or_exit);

    let mut request = ConvertRequest::single(html.clone(), css);
    request.js = js;

    let result = match &args.existing_classes {
        Some(list) => {
            let registry = StaticRegistry::new(list.split(',').map(str::trim));
            convert(&request, &registry, &CancelToken::new(), &mut report_progress)
        }
        None => convert(&request, &EmptyRegistry, &CancelToken::new(), &mut report_progress),
    };

    let result = match result {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Conversion failed: {}", e);
            std::process::exit(1);
        }
    };

    for warning in &result.warnings {
        eprintln!("warning: {}", warning);
    }
    for error in &result.errors {
        eprintln!("section {} failed: {}", error.section, error.message);
    }
    info!(
        "{} nodes, {} styles, {} embeds, {} -> {} bytes",
        result.size_stats.node_count,
        result.size_stats.style_count,
        result.size_stats.embed_count,
        result.size_stats.input_bytes,
        result.size_stats.output_bytes
    );

    let json = match serde_json::to_string_pretty(&result.document) {
        Ok(json) => json,
        Err(e) => {
            eprintln!("Error serializing document: {}", e);
            std::process::exit(1);
        }
    };

    match &args.output {
        Some(path) => write_or_exit(path, &json),
        None => println!("{}", json),
    }
    if let Some(path) = &args.fallback {
        write_or_exit(path, &html);
    }
}

fn report_progress(event: clipweave_lib::ProgressEvent) {
    info!(
        "[{:>3}%] {} {}",
        event.percentage,
        event.phase.as_str(),
        event.current_item
    );
}

fn read_or_exit(path: &str) -> String {
    match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("Error reading {}: {}", path, e);
            std::process::exit(1);
        }
    }
}

fn write_or_exit(path: &str, content: &str) {
    if let Err(e) = fs::write(path, content) {
        eprintln!("Error writing {}: {}", path, e);
        std::process::exit(1);
    }
}
