use std::{
    path::PathBuf,
    pin::Pin,
};

use clap::{
    Parser,
    Subcommand,
};
use color_eyre::eyre::Error;
use fisbee_uat::{
    DecoderConfig,
    ParseError,
    UplinkMessage,
    frame::{
        FramePayload,
        InformationFrame,
        Product,
    },
};
use tokio::io::{
    AsyncBufReadExt,
    AsyncRead,
    BufReader,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Error> {
    let _ = dotenvy::dotenv();
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match args.command {
        Command::Reports { input, strict } => {
            let config = if strict {
                DecoderConfig::strict()
            }
            else {
                DecoderConfig::default()
            };

            input
                .run(|line_number, message| {
                    match message.text_reports_with(&config) {
                        Ok(reports) => {
                            for report in reports {
                                println!("{report}");
                            }
                        }
                        Err(error) => {
                            tracing::warn!(line_number, %error, "failed to decode uplink");
                        }
                    }
                    Ok(())
                })
                .await?;
        }
        Command::Frames { input, json } => {
            input
                .run(|line_number, message| {
                    let decoded = match message.decode() {
                        Ok(decoded) => decoded,
                        Err(error) => {
                            tracing::warn!(line_number, %error, "failed to decode uplink");
                            return Ok(());
                        }
                    };

                    if json {
                        let line = serde_json::json!({
                            "line": line_number,
                            "rs_errors": message.rs_errors(),
                            "signal_strength": message.signal_strength(),
                            "uplink": decoded,
                        });
                        println!("{line}");
                    }
                    else {
                        println!(
                            "{line_number:>5}: {:.4},{:.4} slot {} rs={:?} ss={:?}",
                            decoded.header.latitude,
                            decoded.header.longitude,
                            decoded.header.slot_id,
                            message.rs_errors(),
                            message.signal_strength(),
                        );
                        for frame in &decoded.frames {
                            println!("       {}", summarize(frame));
                        }
                    }
                    Ok(())
                })
                .await?;
        }
    }

    Ok(())
}

#[derive(Debug, Parser)]
struct Args {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the text reports of every uplink.
    Reports {
        #[clap(flatten)]
        input: InputArgs,

        /// Drop the whole uplink if one of its frames is malformed.
        #[clap(long, env = "FISBEE_STRICT")]
        strict: bool,
    },
    /// Print the information frames of every uplink.
    Frames {
        #[clap(flatten)]
        input: InputArgs,

        /// Print one JSON object per uplink.
        #[clap(long)]
        json: bool,
    },
}

#[derive(Debug, clap::Args)]
struct InputArgs {
    /// File with one capture record per line.
    ///
    /// Defaults to stdin.
    #[clap(short, long, env = "FISBEE_INPUT")]
    input: Option<PathBuf>,
}

impl InputArgs {
    async fn run<P>(&self, mut p: P) -> Result<(), Error>
    where
        P: FnMut(usize, UplinkMessage) -> Result<(), Error>,
    {
        let input: Pin<Box<dyn AsyncRead>> = match &self.input {
            Some(path) => Box::pin(tokio::fs::File::open(path).await?),
            None => Box::pin(tokio::io::stdin()),
        };

        let mut lines = BufReader::new(input).lines();
        let mut line_number = 0;
        while let Some(line) = lines.next_line().await? {
            line_number += 1;

            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            match line.parse::<UplinkMessage>() {
                Ok(message) => p(line_number, message)?,
                Err(ParseError::Direction(error)) => {
                    tracing::debug!(line_number, %error, "skipping record");
                }
                Err(error) => {
                    tracing::warn!(line_number, %error, "skipping malformed record");
                }
            }
        }

        Ok(())
    }
}

fn summarize(frame: &InformationFrame) -> String {
    let FramePayload::FisB(apdu) = &frame.payload
    else {
        return format!("{:?}", frame.frame_type);
    };

    let product = match &apdu.product {
        Product::Text(_) => "text",
        Product::Twgo(_) => "twgo",
        Product::Segmented(_) => "segmented",
        Product::Unsupported(_) => "unsupported",
    };
    let mut summary = format!(
        "product {} ({product}) at {}",
        apdu.header.product_id,
        apdu.time()
    );

    if let Some(start) = frame.start_time() {
        summary.push_str(&format!(" from {start}"));
    }
    if let Some(end) = frame.end_time() {
        summary.push_str(&format!(" until {end}"));
    }
    if let Some(geometry) = frame.geometry() {
        summary.push_str(&format!(" {:?}:", geometry.shape));
        for (latitude, longitude) in geometry.positions() {
            summary.push_str(&format!(" {latitude:.4},{longitude:.4}"));
        }
    }
    for report in frame.text().iter().filter(|report| !report.is_empty()) {
        summary.push_str(&format!("\n         {report}"));
    }

    summary
}
