use std::path::PathBuf;
use std::process::ExitCode;

use client::{BatchInput, PredictionClient};

struct Args {
    images: Vec<PathBuf>,
    status: bool,
    server: String,
}

const USAGE: &str = "Usage: client [--image <path>]... [--status] [--server <url>]";

fn parse_args() -> Result<Args, String> {
    let mut args = Args {
        images: Vec::new(),
        status: false,
        server: "http://localhost:50051".to_string(),
    };

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--image" | "-i" => {
                let path = iter.next().ok_or("--image requires a path")?;
                args.images.push(PathBuf::from(path));
            }
            "--status" | "-s" => args.status = true,
            "--server" => {
                args.server = iter.next().ok_or("--server requires a url")?;
            }
            other => return Err(format!("unrecognized argument {:?}", other)),
        }
    }
    Ok(args)
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let args = match parse_args() {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{}\n{}", message, USAGE);
            return ExitCode::from(2);
        }
    };
    if !args.status && args.images.is_empty() {
        eprintln!("Please specify --image or --status\n{}", USAGE);
        return ExitCode::from(2);
    }

    let client = PredictionClient::new(&args.server);
    let mut failed = false;

    if args.status {
        match client.status().await {
            Ok(status) => {
                println!("\n=== Model Status ===");
                println!("Status: {}", status.status);
                println!("Model Name: {}", status.model_name);
                println!("Model Type: {}", status.model_type);
                println!("Local Path: {}", status.local_path);
                println!("Is Loaded: {}", status.is_loaded);
            }
            Err(err) => {
                eprintln!("Failed to get model status: {}", err);
                failed = true;
            }
        }
    }

    if !args.images.is_empty() {
        let inputs: Vec<BatchInput> = args
            .images
            .iter()
            .cloned()
            .map(BatchInput::File)
            .collect();
        let results = client.predict_batch(&inputs).await;

        for (path, result) in args.images.iter().zip(results) {
            match result {
                Ok(prediction) => {
                    println!("\n=== Liveness Prediction Results ===");
                    println!("Image: {}", path.display());
                    println!("Is Live: {}", prediction.is_live);
                    println!("Confidence: {:.3}", prediction.confidence);
                    println!("Predicted Class: {}", prediction.predicted_class);
                    println!("Probabilities:");
                    println!("  - Fake: {:.3}", prediction.probabilities.fake);
                    println!("  - Live: {:.3}", prediction.probabilities.live);
                }
                Err(err) => {
                    eprintln!("\nPrediction failed for {}: {}", path.display(), err);
                    failed = true;
                }
            }
        }
    }

    if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS }
}
