//! Ordered operation batches.

use crate::error::{ProtocolError, ProtocolResult};
use crate::operation::{Endpoint, HandlerId, Operation};
use crate::wire::WireOperationList;

/// An ordered group of operations bound for a single endpoint.
///
/// The server applies a batch as one unit, in insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationBatch {
    endpoint: Endpoint,
    operations: Vec<Operation>,
}

impl OperationBatch {
    /// Creates an empty batch for an endpoint.
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            operations: Vec::new(),
        }
    }

    /// Creates a batch holding one operation.
    pub fn single(operation: Operation) -> Self {
        Self {
            endpoint: operation.endpoint(),
            operations: vec![operation],
        }
    }

    /// Appends an operation.
    ///
    /// Fails if the operation belongs to a different endpoint.
    pub fn push(&mut self, operation: Operation) -> ProtocolResult<()> {
        let actual = operation.endpoint();
        if actual != self.endpoint {
            return Err(ProtocolError::MixedEndpoints {
                expected: self.endpoint,
                actual,
            });
        }
        self.operations.push(operation);
        Ok(())
    }

    /// Returns the endpoint.
    pub fn endpoint(&self) -> Endpoint {
        self.endpoint
    }

    /// Returns the number of operations.
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Returns true if the batch holds no operations.
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Iterates over the operations in order.
    pub fn iter(&self) -> impl Iterator<Item = &Operation> {
        self.operations.iter()
    }

    /// Returns the handlers in order.
    pub fn handlers(&self) -> Vec<HandlerId> {
        self.operations.iter().map(Operation::handler).collect()
    }

    /// Converts to the wire record.
    pub fn to_wire(&self) -> WireOperationList {
        WireOperationList {
            operations: self.operations.iter().map(Operation::to_wire).collect(),
        }
    }
}
