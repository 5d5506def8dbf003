//! Command-line driver: assess every descriptor of a JSON file against its live API.

// std
use std::{path::PathBuf, time::Duration};
// crates.io
use clap::Parser;
use color_eyre::{Result, eyre::eyre};
use serde_json::Value;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
// self
use authz_assess::{
	assess::{Assessor, BatchEntry},
	http::ReqwestHttpClient,
	matrix::StatusPolicy,
};

#[derive(Debug, Parser)]
#[command(name = "authz-assess", version, about, long_about = None)]
struct Cli {
	/// JSON file holding a list of API descriptors (a single object is also accepted).
	#[arg(short, long, default_value = "data.json")]
	input: PathBuf,
	/// Per-request timeout in seconds.
	#[arg(long, default_value_t = 30)]
	timeout_secs: u64,
	/// Reject a 500 for a corrupted token instead of accepting and flagging it.
	#[arg(long)]
	strict: bool,
	/// Seed enabling the unmapped-path probe.
	#[arg(long)]
	unmapped_path_seed: Option<u64>,
	/// Print results as JSON instead of text.
	#[arg(long)]
	json: bool,
	/// Log filter (trace, debug, info, warn, error); `RUST_LOG` wins when set.
	#[arg(long, default_value = "warn")]
	log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let cli = Cli::parse();
	let filter = EnvFilter::try_from_default_env()
		.or_else(|_| EnvFilter::try_new(&cli.log_level))
		.unwrap_or_else(|_| EnvFilter::new("warn"));

	tracing_subscriber::registry()
		.with(filter)
		.with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
		.init();

	let raw = tokio::fs::read(&cli.input).await?;
	let descriptors = match serde_json::from_slice::<Value>(&raw) {
		Ok(Value::Array(descriptors)) => descriptors,
		Ok(descriptor @ Value::Object(_)) => vec![descriptor],
		_ => return Err(eyre!("descriptor file {} is malformed", cli.input.display())),
	};
	let http_client = ReqwestHttpClient::with_timeout(Duration::from_secs(cli.timeout_secs))?;
	let mut assessor = <Assessor<ReqwestHttpClient>>::with_http_client(http_client);

	if cli.strict {
		assessor = assessor.with_policy(StatusPolicy::strict());
	}
	if let Some(seed) = cli.unmapped_path_seed {
		assessor = assessor.with_unmapped_path_seed(seed);
	}

	if cli.json {
		let mut rendered = Vec::with_capacity(descriptors.len());

		for descriptor in &descriptors {
			rendered.push(match assessor.assess_entry(descriptor).await {
				BatchEntry::Assessed(result) => {
					let mut value = serde_json::to_value(&result)?;

					value["verdict"] = serde_json::to_value(result.verdict())?;

					value
				},
				BatchEntry::Aborted { owner, error } => serde_json::json!({
					"owner": owner,
					"verdict": "fail",
					"error": authz_assess::error::render_chain(&error),
				}),
			});
		}

		println!("{}", serde_json::to_string_pretty(&rendered)?);
	} else {
		for descriptor in &descriptors {
			let owner = descriptor.get("owner").and_then(Value::as_str).unwrap_or("<unknown owner>");

			println!("Processing {owner}");
			println!("{}", assessor.assess_entry(descriptor).await);
		}
	}

	Ok(())
}
