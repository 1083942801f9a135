//! Workflow driver
//!
//! Sequences one run of the tool: VLAN selection, device lookup, login,
//! status retrieval and the reassignment itself. The driver owns the device
//! session; once connected, it disconnects on every path before returning.

use std::io;
use std::net::Ipv4Addr;
use tracing::{info, instrument, warn};

use vlanswap_common::{
    qualify, CommandChannel, Connector, DeviceCredentials, HostQuery, Operator, Resolver,
    Template,
};

use crate::commands::SHOW_INTERFACES_STATUS_CMD;
use crate::config::WorkflowConfig;
use crate::reassign::reassign;
use crate::selector::select_vlans;
use crate::session::DeviceSession;
use crate::tables::{InterfaceStatusTable, TableResult};
use crate::types::{ReassignOutcome, VlanPair, WorkflowOutcome};

/// Resolves the operator's device string to an IPv4 address.
///
/// IPv4 literals are returned as typed; names are qualified with `domain`
/// and looked up, reporting progress to the operator.
pub async fn resolve_device<R: Resolver + ?Sized>(
    resolver: &R,
    input: &str,
    domain: &str,
    operator: &mut dyn Operator,
) -> Option<Ipv4Addr> {
    match qualify(input, domain) {
        HostQuery::Address(address) => Some(address),
        HostQuery::Name(name) => {
            operator.say(&format!("Looking up {} in DNS...", name));
            match resolver.lookup(&name).await {
                Some(address) => {
                    operator.say(&format!("found {}", address));
                    Some(address)
                }
                None => {
                    operator.say(&format!("Unable to find address for {}", name));
                    None
                }
            }
        }
    }
}

/// One-device VLAN reassignment run.
pub struct Workflow<K, R> {
    connector: K,
    resolver: R,
    config: WorkflowConfig,
    template: Template,
}

impl<K, R> Workflow<K, R>
where
    K: Connector,
    R: Resolver,
{
    /// Creates a workflow, compiling the configured status grammar up front.
    pub fn new(connector: K, resolver: R, config: WorkflowConfig) -> TableResult<Self> {
        let template = config.status_template()?;
        Ok(Self {
            connector,
            resolver,
            config,
            template,
        })
    }

    /// Returns the run configuration.
    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    /// Runs the whole workflow once.
    #[instrument(skip_all)]
    pub async fn run(&self, operator: &mut dyn Operator) -> WorkflowOutcome {
        let pair = match select_vlans(operator) {
            Ok(Some(pair)) => pair,
            Ok(None) => return WorkflowOutcome::Cancelled,
            Err(e) => {
                warn!(error = %e, "Operator input ended");
                return WorkflowOutcome::Cancelled;
            }
        };

        let credentials = match self.device_info(operator).await {
            Ok(Some(credentials)) => credentials,
            Ok(None) => return WorkflowOutcome::Unresolved,
            Err(e) => {
                warn!(error = %e, "Operator input ended");
                return WorkflowOutcome::Cancelled;
            }
        };

        let mut session = match DeviceSession::connect(&self.connector, &credentials).await {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, "Connection failed");
                operator.say(&format!("Unable to connect to {}", credentials.address));
                return WorkflowOutcome::ConnectFailed;
            }
        };
        operator.say(&format!(
            "Connected to: {} at IP: {}",
            session.hostname(),
            session.address()
        ));

        let outcome = self.run_connected(&mut session, &pair, operator).await;

        operator.say("Disconnecting...");
        if let Err(e) = session.disconnect().await {
            warn!(error = %e, "Disconnect failed");
        }
        operator.say("Done.");

        info!(outcome = ?outcome, "Workflow finished");
        outcome
    }

    /// Asks for the device and login, returning `None` if the device does
    /// not resolve.
    async fn device_info(
        &self,
        operator: &mut dyn Operator,
    ) -> io::Result<Option<DeviceCredentials>> {
        let input = operator.ask("Name or IP address of device")?;
        let Some(address) =
            resolve_device(&self.resolver, &input, &self.config.domain, operator).await
        else {
            return Ok(None);
        };

        let username = operator.ask("User name")?;
        let password = operator.ask_secret("Password")?;
        Ok(Some(
            DeviceCredentials::new(address, username.trim(), password)
                .with_port(self.config.port),
        ))
    }

    /// Everything between connect and disconnect.
    async fn run_connected<C: CommandChannel>(
        &self,
        session: &mut DeviceSession<C>,
        pair: &VlanPair,
        operator: &mut dyn Operator,
    ) -> WorkflowOutcome {
        if let Err(e) = session.ensure_privileged(operator).await {
            warn!(error = %e, "Privilege check failed");
            operator.say(&format!("Unable to check privilege level: {}", e));
            return WorkflowOutcome::StatusUnavailable;
        }
        if let Err(e) = session.disable_paging().await {
            warn!(error = %e, "Could not disable paging");
            operator.say(&format!("Unable to disable paging: {}", e));
            return WorkflowOutcome::StatusUnavailable;
        }

        operator.say("Getting interface status...");
        let raw = match session.execute(SHOW_INTERFACES_STATUS_CMD).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "Status retrieval failed");
                operator.say(&format!("Unable to get interface status: {}", e));
                return WorkflowOutcome::StatusUnavailable;
            }
        };
        let table = match InterfaceStatusTable::parse(&self.template, &raw) {
            Ok(table) => table,
            Err(e) => {
                warn!(error = %e, "Status output not understood");
                operator.say(&format!("Unable to read interface status: {}", e));
                return WorkflowOutcome::StatusUnavailable;
            }
        };

        operator.say(&format!(
            "Replacing VLAN {} with VLAN {} in device {}",
            pair.source,
            pair.destination,
            session.address()
        ));

        match reassign(session, &table, pair, operator).await {
            Ok(outcome) => WorkflowOutcome::Reassign(outcome),
            Err(e) => {
                warn!(error = %e, "Reassignment failed");
                operator.say(&format!("Reassignment failed: {}", e));
                WorkflowOutcome::Reassign(ReassignOutcome::Failed {
                    output: e.to_string(),
                })
            }
        }
    }
}
