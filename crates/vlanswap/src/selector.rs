//! VLAN pair selection

use std::io;
use tracing::debug;

use vlanswap_common::{is_exit, parse_yes_no, Operator};

use crate::types::{VlanId, VlanPair};

/// Banner shown before the first prompt.
pub const BANNER: &str = "VLAN Replacement Tool";

const SOURCE_PROMPT: &str = "Please enter the VLAN you would like to replace (1 - 4096)";
const DESTINATION_PROMPT: &str =
    "Please enter the VLAN you would like to replace it with (1 - 4096)";
const EXIT_HINT: &str = "Hit 'E' to exit";
const INPUT_MARKER: &str = "===> ";

/// Shown when the destination names the source VLAN again.
pub const SAME_VLAN_MESSAGE: &str = "Destination VLAN must differ from the source VLAN";

/// Asks for one VLAN until a valid token or the exit signal is entered.
fn ask_vlan(operator: &mut dyn Operator, question: &str) -> io::Result<Option<VlanId>> {
    loop {
        operator.say(question);
        operator.say(EXIT_HINT);
        let answer = operator.ask(INPUT_MARKER)?;
        if is_exit(&answer) {
            return Ok(None);
        }
        match answer.parse::<VlanId>() {
            Ok(vlan) => return Ok(Some(vlan)),
            Err(e) => debug!(error = %e, "Re-prompting for VLAN"),
        }
    }
}

/// Prompts for the source and destination VLANs.
///
/// Returns `Ok(None)` when the operator exits at either prompt. The tokens
/// are returned exactly as typed (surrounding whitespace removed).
pub fn select_vlans(operator: &mut dyn Operator) -> io::Result<Option<VlanPair>> {
    operator.say(BANNER);

    let Some(source) = ask_vlan(operator, SOURCE_PROMPT)? else {
        operator.say("Exiting...");
        return Ok(None);
    };

    loop {
        let Some(destination) = ask_vlan(operator, DESTINATION_PROMPT)? else {
            operator.say("Exiting...");
            return Ok(None);
        };
        if destination.number() == source.number() {
            operator.say(SAME_VLAN_MESSAGE);
            continue;
        }
        return Ok(Some(VlanPair::new(source, destination)));
    }
}

/// Asks `prompt` until the operator answers y or n (either case).
pub fn confirm(operator: &mut dyn Operator, prompt: &str) -> io::Result<bool> {
    loop {
        if let Some(answer) = parse_yes_no(&operator.ask(prompt)?) {
            return Ok(answer);
        }
    }
}
