use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "reporter",
    version,
    about = "Generates a daily economic briefing with Gemini and Google Search grounding"
)]
pub struct Cli {
    #[arg(long, help = "Path to a YAML configuration file")]
    pub config: Option<PathBuf>,
    #[arg(long, help = "Where to write the HTML report page (overrides configuration)")]
    pub output: Option<PathBuf>,
    #[arg(
        long,
        default_value_t = false,
        help = "Keep running and generate a new report on every Enter keypress"
    )]
    pub interactive: bool,
}
