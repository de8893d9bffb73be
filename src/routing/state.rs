use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::step::{Delivery, Destination, Flow, Reception, RoutingStep};
use crate::dates;

/// Situação de um passo de tramitação (`SITUACAO_TRAMIT`).
///
/// Every step flows through: AWAITING → DELIVERED → RECEIVED
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RoutingStatus {
    /// `T`: aguardando o custodiante atual despachar.
    Awaiting,
    /// `E`: entregue ao destino, ainda não aberto.
    Delivered,
    /// `R`: recebido pelo destino.
    Received,
}

impl RoutingStatus {
    pub fn code(&self) -> &'static str {
        match self {
            RoutingStatus::Awaiting => "T",
            RoutingStatus::Delivered => "E",
            RoutingStatus::Received => "R",
        }
    }
}

impl fmt::Display for RoutingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoutingStatus::Awaiting => write!(f, "AWAITING"),
            RoutingStatus::Delivered => write!(f, "DELIVERED"),
            RoutingStatus::Received => write!(f, "RECEIVED"),
        }
    }
}

impl FromStr for RoutingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "T" => Ok(RoutingStatus::Awaiting),
            "E" => Ok(RoutingStatus::Delivered),
            "R" => Ok(RoutingStatus::Received),
            other => Err(format!("unknown routing status {other:?}")),
        }
    }
}

impl TryFrom<String> for RoutingStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RoutingStatus> for String {
    fn from(status: RoutingStatus) -> Self {
        status.code().to_string()
    }
}

/// Obrigatoriedade de retorno (`IND_RETORNO_OBRIG`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ReturnIndicator {
    Yes,
    No,
    /// Conforme o fluxo.
    PerFlow,
}

impl ReturnIndicator {
    pub fn code(&self) -> &'static str {
        match self {
            ReturnIndicator::Yes => "S",
            ReturnIndicator::No => "N",
            ReturnIndicator::PerFlow => "F",
        }
    }
}

impl TryFrom<String> for ReturnIndicator {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.trim() {
            "S" => Ok(ReturnIndicator::Yes),
            "N" => Ok(ReturnIndicator::No),
            "F" => Ok(ReturnIndicator::PerFlow),
            other => Err(format!("unknown return indicator {other:?}")),
        }
    }
}

impl From<ReturnIndicator> for String {
    fn from(indicator: ReturnIndicator) -> Self {
        indicator.code().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoutingError {
    #[error(
        "routing of document {document_id} is corrupted: step {sequence} is {found}, expected {expected}"
    )]
    Corrupted {
        document_id: i64,
        sequence: i64,
        found: RoutingStatus,
        expected: RoutingStatus,
    },

    #[error("step {sequence} of document {document_id} is {found} and must be received first")]
    PreviousStepPending {
        document_id: i64,
        sequence: i64,
        found: RoutingStatus,
    },

    #[error("flow {flow_id} resolves its destination by query and no resolver was given")]
    MissingResolver { flow_id: i64 },

    #[error("flow {flow_id} has no destination")]
    FlowWithoutDestination { flow_id: i64 },

    #[error("flow {flow_id} has an out-of-range deadline of {days} days")]
    DeadlineOutOfRange { flow_id: i64, days: i64 },
}

/// Result of opening the current step.
#[derive(Debug, Clone, PartialEq)]
pub enum ReceiveOutcome {
    /// The step was delivered and is now received; ownership moves.
    Received(Reception),
    /// The step is still awaiting dispatch; nothing to receive.
    AlreadyOpen,
}

/// Regras de transição dos passos de tramitação, sem I/O.
pub struct RoutingMachine;

impl RoutingMachine {
    /// Sequence for a step appended after `current`.
    ///
    /// A new step is only allowed once the current one has been received.
    pub fn next_sequence(current: &RoutingStep) -> Result<i64, RoutingError> {
        if current.status != RoutingStatus::Received {
            return Err(RoutingError::PreviousStepPending {
                document_id: current.document_id,
                sequence: current.sequence,
                found: current.status,
            });
        }
        Ok(current.sequence + 1)
    }

    /// Only an AWAITING step can be dispatched.
    pub fn ensure_awaiting(current: &RoutingStep) -> Result<(), RoutingError> {
        if current.status != RoutingStatus::Awaiting {
            return Err(RoutingError::Corrupted {
                document_id: current.document_id,
                sequence: current.sequence,
                found: current.status,
                expected: RoutingStatus::Awaiting,
            });
        }
        Ok(())
    }

    /// Dispatch the awaiting step `current` through `flow` to `destination`.
    pub fn deliver(
        current: &RoutingStep,
        flow: &Flow,
        destination: Destination,
        dispatch: &str,
        user_id: i64,
        now: NaiveDateTime,
    ) -> Result<Delivery, RoutingError> {
        Self::ensure_awaiting(current)?;

        let today = now.date();
        let days = flow.days.unwrap_or(0);
        let valid_until = dates::add_days(today, days).ok_or(RoutingError::DeadlineOutOfRange {
            flow_id: flow.id,
            days,
        })?;
        Ok(Delivery {
            step_id: current.id,
            destination_type: destination.kind,
            destination_id: destination.id,
            sent_on: Some(today),
            valid_until: Some(valid_until),
            dispatch: dispatch.to_string(),
            dispatch_rtf: dispatch.to_string(),
            status: RoutingStatus::Delivered,
            return_indicator: ReturnIndicator::PerFlow,
            flow_id: flow.id,
            changed_on: Some(today),
            changed_at: Some(now.time()),
            concurrency: current.concurrency + 1,
            informed_by: user_id,
            dispatched_on: Some(today),
            dispatched_at: Some(now.time()),
            action_id: flow.action_id,
        })
    }

    /// Open the current step at its destination.
    pub fn receive(current: &RoutingStep, now: NaiveDateTime) -> Result<ReceiveOutcome, RoutingError> {
        match current.status {
            RoutingStatus::Delivered => {
                let new_owner = current.destination().ok_or(RoutingError::Corrupted {
                    document_id: current.document_id,
                    sequence: current.sequence,
                    found: current.status,
                    expected: RoutingStatus::Delivered,
                })?;
                Ok(ReceiveOutcome::Received(Reception {
                    step_id: current.id,
                    status: RoutingStatus::Received,
                    received_on: Some(now.date()),
                    received_at: Some(now.time()),
                    new_owner,
                }))
            }
            RoutingStatus::Awaiting => Ok(ReceiveOutcome::AlreadyOpen),
            RoutingStatus::Received => Err(RoutingError::Corrupted {
                document_id: current.document_id,
                sequence: current.sequence,
                found: current.status,
                expected: RoutingStatus::Delivered,
            }),
        }
    }

    /// Destination defined by the flow itself.
    pub fn flow_destination(flow: &Flow) -> Result<Destination, RoutingError> {
        if flow.destination_resolved_by_query() {
            return Err(RoutingError::MissingResolver { flow_id: flow.id });
        }
        flow.destination()
            .ok_or(RoutingError::FlowWithoutDestination { flow_id: flow.id })
    }
}
