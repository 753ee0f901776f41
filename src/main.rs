use std::{path::PathBuf, process::ExitCode, time::Duration};

use clap::Parser;
use glyphscan::{
    BatchReporter, Config, EdgeSettings, RetryPolicy, StoredAnnotations, TextRecognizer,
    VisionClient,
};
use tracing_subscriber::{fmt::format::FmtSpan, EnvFilter};

/// Flags scanned pages with encoding-error squares or low-confidence text.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Directory holding the .jpg/.png pages to check.
    input_dir: PathBuf,

    /// Where to write annotated copies of flagged pages.
    output_dir: Option<PathBuf>,

    /// Read saved Vision responses (<file>.json) from this directory instead
    /// of calling the service.
    #[arg(long)]
    annotations: Option<PathBuf>,

    #[arg(long, env = "GLYPHSCAN_VISION_API_KEY", hide_env_values = true)]
    vision_api_key: Option<String>,

    #[arg(long, env = "GLYPHSCAN_VISION_TOKEN", hide_env_values = true)]
    vision_token: Option<String>,

    #[arg(
        long,
        env = "GLYPHSCAN_VISION_ENDPOINT",
        default_value = glyphscan::recognizer::DEFAULT_VISION_ENDPOINT
    )]
    vision_endpoint: String,

    /// Timeout of a single OCR request, in seconds.
    #[arg(long, default_value_t = 30)]
    ocr_timeout: u64,

    /// Retries of a failed OCR request.
    #[arg(long, default_value_t = 3)]
    ocr_retries: u32,

    #[arg(long, default_value_t = 20.0)]
    canny_low: f32,

    #[arg(long, default_value_t = 50.0)]
    canny_high: f32,
}

impl Cli {
    fn config(&self) -> Config {
        let edges = EdgeSettings {
            canny_low: self.canny_low,
            canny_high: self.canny_high,
            ..EdgeSettings::default()
        };
        let retry = RetryPolicy {
            max_retries: self.ocr_retries,
            ..RetryPolicy::default()
        };
        Config::new(&self.input_dir)
            .with_output_dir(self.output_dir.clone())
            .with_edges(edges)
            .with_retry(retry)
    }

    fn recognizer(&self) -> Result<Box<dyn TextRecognizer>, glyphscan::OcrError> {
        if let Some(dir) = &self.annotations {
            return Ok(Box::new(StoredAnnotations::new(dir)));
        }
        let client = VisionClient::builder()
            .endpoint(&self.vision_endpoint)
            .api_key(self.vision_api_key.clone())
            .bearer_token(self.vision_token.clone())
            .timeout(Duration::from_secs(self.ocr_timeout))
            .build()?;
        Ok(Box::new(client))
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_span_events(FmtSpan::CLOSE)
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let recognizer = match cli.recognizer() {
        Ok(recognizer) => recognizer,
        Err(err) => {
            eprintln!("Failed to set up text recognition: {err}");
            return ExitCode::FAILURE;
        }
    };
    let reporter = BatchReporter::new(cli.config(), recognizer);
    match reporter.config().output_dir() {
        Some(dir) => tracing::info!("Writing overlays to {}", dir.display()),
        None => tracing::info!("No output directory, overlays are not written"),
    }
    let reports = match reporter.run() {
        Ok(reports) => reports,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };
    for report in reports {
        println!("{report}");
    }
    ExitCode::SUCCESS
}
