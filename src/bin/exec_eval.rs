//! Evaluation CLI
//!
//! Reads a serialized context holding `receivedResponse` and
//! `expectedResponse` engine results and prints the equivalence verdict
//! as a JSON boolean on stdout. A negative verdict still exits 0; only
//! unusable input (missing argument, malformed JSON, unrecognized type
//! tag, uncoercible cells) exits non-zero.

use anyhow::Result;
use clap::Parser;
use query_equiv::equiv::evaluate_context;

#[derive(Parser)]
#[command(name = "exec-eval")]
#[command(about = "Execution-accuracy check for two tabular query results")]
#[command(version)]
struct Args {
    /// JSON object with `receivedResponse` and `expectedResponse` keys,
    /// each a raw `{schema, datarows}` engine response
    context: String,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let verdict = evaluate_context(&args.context)?;
    println!("{}", serde_json::to_string(&verdict)?);
    Ok(())
}
