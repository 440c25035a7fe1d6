use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use pdf_generator::client::{download_all, plan_downloads, FormInput};
use pdf_generator::render::RenderMode;

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    Desktop,
    Mobile,
}

/// Download desktop or mobile PDFs of a web page and/or a text snippet.
#[derive(Parser)]
#[command(name = "pdf-client", version)]
struct Args {
    #[arg(value_enum)]
    mode: Mode,

    /// Page to capture
    #[arg(long)]
    url: Option<String>,

    /// Filename for the web version
    #[arg(long, default_value = "")]
    web_name: String,

    /// File whose contents become the text version ("-" reads stdin)
    #[arg(long)]
    text_file: Option<PathBuf>,

    /// Filename for the text version
    #[arg(long, default_value = "")]
    text_name: String,

    #[arg(long, default_value = "http://127.0.0.1:3000")]
    server: String,

    #[arg(long, short, default_value = ".")]
    out_dir: PathBuf,
}

fn read_text(path: &PathBuf) -> std::io::Result<String> {
    if path.as_os_str() == "-" {
        std::io::read_to_string(std::io::stdin())
    } else {
        std::fs::read_to_string(path)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let text_content = match args.text_file.as_ref().map(read_text).transpose() {
        Ok(text) => text.unwrap_or_default(),
        Err(e) => {
            eprintln!("Could not read text file: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let form = FormInput {
        web_name: args.web_name,
        web_url: args.url.unwrap_or_default(),
        text_name: args.text_name,
        text_content,
    };
    let mode = match args.mode {
        Mode::Desktop => RenderMode::Desktop,
        Mode::Mobile => RenderMode::Mobile,
    };

    let jobs = match plan_downloads(mode, &form) {
        Ok(jobs) => jobs,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut failed = false;
    for outcome in download_all(&args.server, &jobs, &args.out_dir).await {
        match outcome {
            Ok(path) => println!("Saved {}", path.display()),
            Err(e) => {
                failed = true;
                eprintln!("{}", e);
            }
        }
    }

    if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS }
}
