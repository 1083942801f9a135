//! VLAN reassignment engine
//!
//! Moves every access port found in the source VLAN to the destination VLAN:
//! filter the status table, show the operator what will change, push the
//! batch after confirmation, and save only when the device raised no error.

use tracing::{info, instrument, warn};

use vlanswap_common::{CommandChannel, Operator, SessionResult};

use crate::commands::CommandBatch;
use crate::selector::confirm;
use crate::session::DeviceSession;
use crate::tables::InterfaceStatusTable;
use crate::types::{ReassignOutcome, VlanPair};

const CONFIRM_PROMPT: &str = "Please type \"y\" to make changes or \"n\" to exit ==>";

/// IOS marks rejected commands with this character.
const ERROR_MARKER: char = '%';

/// Verdict on configuration output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyStatus {
    /// No error marker seen.
    Clean,
    /// The device printed an error marker somewhere in the output.
    Suspect,
}

/// Looks for IOS error markers in configuration output.
pub fn classify_apply_output(output: &str) -> ApplyStatus {
    if output.contains(ERROR_MARKER) {
        ApplyStatus::Suspect
    } else {
        ApplyStatus::Clean
    }
}

/// Runs one reassignment against an open, ready session.
///
/// Never disconnects; the caller owns the session's lifetime.
#[instrument(skip_all, fields(source = %pair.source, destination = %pair.destination))]
pub async fn reassign<C: CommandChannel>(
    session: &mut DeviceSession<C>,
    table: &InterfaceStatusTable,
    pair: &VlanPair,
    operator: &mut dyn Operator,
) -> SessionResult<ReassignOutcome> {
    let targets = table.filter_by_vlan(&pair.source);
    if targets.is_empty() {
        operator.say(&format!("No interfaces found in VLAN {}", pair.source));
        info!("No interfaces matched");
        return Ok(ReassignOutcome::NoMatch);
    }

    let batch = CommandBatch::reassign(&targets, &pair.destination);

    operator.say(&format!(
        "Changing the following interfaces to VLAN: {}:",
        pair.destination
    ));
    for target in &targets {
        operator.say(target);
    }
    operator.say(&format!(
        "{} interface(s), {} configuration commands",
        targets.len(),
        batch.len()
    ));

    let approved = match confirm(operator, CONFIRM_PROMPT) {
        Ok(approved) => approved,
        Err(e) => {
            warn!(error = %e, "Confirmation aborted");
            false
        }
    };
    if !approved {
        operator.say("Exiting. No changes were made");
        return Ok(ReassignOutcome::Declined);
    }

    operator.say("Entering config mode...");
    operator.say("Configuring interfaces...");
    let output = match session.execute_config_batch(batch.as_slice()).await {
        Ok(output) => output,
        Err(e) => {
            warn!(error = %e, "Configuration batch failed");
            session.mark_config_failed();
            report_unsaved(operator, &e.to_string());
            return Ok(ReassignOutcome::Failed {
                output: e.to_string(),
            });
        }
    };

    let status = classify_apply_output(&output);
    match status {
        ApplyStatus::Suspect => {
            warn!("Device reported an error while applying configuration");
            session.mark_config_failed();
            report_unsaved(operator, &output);
        }
        ApplyStatus::Clean => operator.say("VLAN successfully set."),
    }
    // The batch ends with the config exit command.
    operator.say("Exiting config mode...");
    if status == ApplyStatus::Suspect {
        return Ok(ReassignOutcome::Failed { output });
    }

    operator.say("Saving config...");
    session.save_config().await?;
    info!(count = targets.len(), "Interfaces reassigned and saved");
    Ok(ReassignOutcome::Applied)
}

fn report_unsaved(operator: &mut dyn Operator, output: &str) {
    operator.say(&format!(
        "There might be a problem. Last output was: {}",
        output
    ));
    operator.say("Changes were made but config will not be saved.");
    operator.say("Please confirm all is OK and back out or save the config.");
}
