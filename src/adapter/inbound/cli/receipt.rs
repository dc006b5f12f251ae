//! Handler for `verify`.

use crate::adapter::inbound::cli::command::ReceiptArgs;
use crate::adapter::inbound::cli::context::Context;
use crate::adapter::inbound::cli::output;
use crate::domain::ReceiptId;
use crate::error::Result;

/// Execute `verify`.
///
/// Recomputes the stored receipt's content hash and, with `--copy`, checks
/// that a downloaded copy hashes to the same value.
pub async fn execute(context: &Context, args: &ReceiptArgs) -> Result<()> {
    let engine = context.engine()?;
    let receipt_id = ReceiptId::from(args.receipt.as_str());
    let receipt = engine.verify_receipt(&receipt_id).await?;

    output::record("receipt", &receipt);
    output::success("Stored receipt matches its content hash");
    output::field("Receipt", &receipt.id);
    output::field("Model", &receipt.model_id);
    output::field("Recorded", receipt.recorded_at.to_rfc3339());
    output::field("Drift", format!("{:.4}%", receipt.drift_percentage));
    output::field("Hash", &receipt.content_hash);
    if let Some(evidence) = &receipt.evidence {
        let location = if evidence.mirrored {
            output::highlight(&evidence.url)
        } else {
            output::muted(format!("{} (fallback)", evidence.url))
        };
        output::field("Evidence", location);
    }

    if let Some(path) = &args.copy {
        let bytes = std::fs::read(path)?;
        engine.verify_receipt_copy(&receipt_id, &bytes).await?;
        output::success(&format!("Copy at {} matches", path.display()));
    }
    Ok(())
}
