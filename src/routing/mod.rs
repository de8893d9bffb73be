mod audit;
mod state;
mod step;

pub use audit::{AuditBuilder, RoutingAudit};
pub use state::{ReceiveOutcome, ReturnIndicator, RoutingError, RoutingMachine, RoutingStatus};
pub use step::{
    Delivery, Destination, Flow, NewRoutingStep, OWNER_TYPE_USER, PRIORITY_NORMAL,
    PRIORITY_TABLE, Reception, RoutingStep, StepStatusUpdate,
};

use crate::error::SieError;

/// Supplies the destination of a flow flagged `IND_QUERY = 'S'`.
#[allow(async_fn_in_trait)]
pub trait ResolveDestination {
    async fn resolve(&self, flow: &Flow) -> Result<Destination, SieError>;
}

/// For flows whose destination is fixed in `FLUXOS`.
pub struct NoResolver;

impl ResolveDestination for NoResolver {
    async fn resolve(&self, flow: &Flow) -> Result<Destination, SieError> {
        Err(RoutingError::MissingResolver { flow_id: flow.id }.into())
    }
}

impl ResolveDestination for Destination {
    async fn resolve(&self, _flow: &Flow) -> Result<Destination, SieError> {
        Ok(*self)
    }
}

/// Destination of `flow`, asking `resolver` only for query-resolved flows.
pub async fn destination_for<R: ResolveDestination>(
    flow: &Flow,
    resolver: &R,
) -> Result<Destination, SieError> {
    if flow.destination_resolved_by_query() {
        resolver.resolve(flow).await
    } else {
        Ok(RoutingMachine::flow_destination(flow)?)
    }
}
