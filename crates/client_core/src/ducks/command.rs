use serde_json::Value;
use shared::{
    domain::{CommandOutput, SubscriptionId},
    operations::{COMMAND_EXECUTE_FIELD, COMMAND_EXECUTE_SUBSCRIPTION},
    protocol::GraphqlRequest,
};
use tracing::{debug, error, warn};

use super::decode_field;
use crate::{
    error::LogicError,
    logic::LogicDeps,
    store::{Action, Dispatcher},
    subscriptions::{Channel, ChannelEvents},
};

#[derive(Debug, Clone, PartialEq)]
pub enum CommandAction {
    /// Starts a run, clearing the log and waiting for its acknowledgement.
    ///
    /// While another run is live no new run is started: the request is
    /// acknowledged with the live run's id, and the log keeps filling from
    /// that run under the new title.
    Execute { command: String },
    ExecuteSucceeded { subid: SubscriptionId },
    ExecuteFailed { error: String },
    OutputReceived { subid: SubscriptionId, output: String },
    OutputFinished { subid: SubscriptionId },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CommandStatus {
    #[default]
    Idle,
    Running,
    Finished,
    Failed,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandState {
    /// Run whose events are applied; `None` while an execute is unacknowledged.
    pub subscription_id: Option<SubscriptionId>,
    pub command: Option<String>,
    pub output: Vec<String>,
    pub status: CommandStatus,
    pub error: Option<String>,
}

pub fn reduce(mut state: CommandState, action: &Action) -> CommandState {
    let Action::Command(action) = action else {
        return state;
    };
    match action {
        CommandAction::Execute { command } => {
            state.subscription_id = None;
            state.command = Some(command.clone());
            state.output.clear();
            state.status = CommandStatus::Running;
            state.error = None;
        }
        CommandAction::ExecuteSucceeded { subid }
            if state.status == CommandStatus::Running && state.subscription_id.is_none() =>
        {
            state.subscription_id = Some(subid.clone());
        }
        CommandAction::ExecuteSucceeded { subid } => {
            debug!(%subid, status = ?state.status, "command: ignoring acknowledgement");
        }
        CommandAction::ExecuteFailed { error } => {
            state.output.clear();
            state.status = CommandStatus::Failed;
            state.error = Some(error.clone());
        }
        CommandAction::OutputReceived { subid, output } => {
            // The log is frozen once the run is over or superseded.
            if is_current_run(&state, subid) {
                state.output.push(output.clone());
            } else {
                debug!(%subid, status = ?state.status, "command: dropping stale output");
            }
        }
        CommandAction::OutputFinished { subid } => {
            if is_current_run(&state, subid) {
                state.status = CommandStatus::Finished;
                state.subscription_id = None;
            } else {
                debug!(%subid, "command: ignoring finish of another run");
            }
        }
    }
    state
}

fn is_current_run(state: &CommandState, subid: &SubscriptionId) -> bool {
    state.status == CommandStatus::Running && state.subscription_id.as_ref() == Some(subid)
}

pub fn execute(command: impl Into<String>) -> Action {
    CommandAction::Execute {
        command: command.into(),
    }
    .into()
}

pub fn execute_succeeded(subid: SubscriptionId) -> Action {
    CommandAction::ExecuteSucceeded { subid }.into()
}

pub fn execute_failed(error: impl Into<String>) -> Action {
    CommandAction::ExecuteFailed {
        error: error.into(),
    }
    .into()
}

pub fn output_received(subid: SubscriptionId, output: impl Into<String>) -> Action {
    CommandAction::OutputReceived {
        subid,
        output: output.into(),
    }
    .into()
}

pub fn output_finished(subid: SubscriptionId) -> Action {
    CommandAction::OutputFinished { subid }.into()
}

/// Output of one command run; completes on the `finished` marker.
struct CommandFeed {
    dispatch: Dispatcher,
}

impl ChannelEvents for CommandFeed {
    fn on_attached(&mut self, id: &SubscriptionId) {
        self.dispatch.dispatch(execute_succeeded(id.clone()));
    }

    fn on_data(&mut self, id: &SubscriptionId, data: Value) -> bool {
        match decode_field::<CommandOutput>(data, COMMAND_EXECUTE_FIELD) {
            Ok(event) => {
                if let Some(line) = event.stdout {
                    self.dispatch.dispatch(output_received(id.clone(), line));
                }
                event.finished
            }
            Err(err) => {
                warn!(%err, "command: undecodable output payload");
                false
            }
        }
    }

    fn on_finished(&mut self, id: &SubscriptionId) {
        self.dispatch.dispatch(output_finished(id.clone()));
    }
}

pub async fn execute_logic(
    deps: LogicDeps,
    dispatch: Dispatcher,
    command: String,
) -> Result<(), LogicError> {
    let request = GraphqlRequest::new(COMMAND_EXECUTE_SUBSCRIPTION).variable("command", command);
    let feed = CommandFeed {
        dispatch: dispatch.clone(),
    };
    // The feed acknowledges the run it is attached to.
    if let Err(err) = deps
        .subscriptions
        .subscribe(Channel::Command, request, feed)
        .await
    {
        error!(%err, "command: execute failed");
        dispatch.dispatch(execute_failed(err.to_string()));
    }
    Ok(())
}

#[cfg(test)]
#[path = "../tests/command_tests.rs"]
mod tests;
