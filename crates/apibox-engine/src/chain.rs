//! Chained-PoW driver: splits an attach-to-tangle request into an ordered
//! sequence of tasks, feeding each result's hash into the trunk field of
//! the next, and assembles the final response.

use std::time::Instant;

use apibox_core::error::ApiError;
use apibox_core::task::Task;
use apibox_core::trytes::Trytes;
use serde::{Deserialize, Serialize};

use crate::dispatcher::Dispatcher;
use crate::transaction::{transaction_hash, with_links};

#[derive(Debug, Clone, Deserialize)]
pub struct AttachRequest {
    pub trunk: Trytes,
    pub branch: Trytes,
    #[serde(rename = "minWeightMagnitude")]
    pub min_weight_magnitude: i64,
    pub trytes: Vec<Trytes>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AttachResponse {
    pub trytes: Vec<Trytes>,
    pub duration: i64,
}

/// Runs the chained-PoW driver for one attach-to-tangle request. Items are
/// processed strictly in order: parallel execution would break the trunk
/// chaining invariant, so this never spawns concurrent tasks across items.
pub async fn attach_to_tangle(
    dispatcher: &Dispatcher,
    request: AttachRequest,
) -> Result<AttachResponse, ApiError> {
    if request.trytes.is_empty() {
        return Err(ApiError::BadRequest("no trytes supplied".to_string()));
    }

    let start = Instant::now();
    let mut output = Vec::with_capacity(request.trytes.len());
    let mut trunk = request.trunk.clone();

    for (i, body) in request.trytes.iter().enumerate() {
        let branch = if i == 0 {
            request.branch.clone()
        } else {
            request.trunk.clone()
        };
        let candidate = with_links(body.as_str(), &trunk, &branch);
        let task = Task::new(request.min_weight_magnitude, candidate);

        let winning = dispatcher.submit(task).await;
        trunk = transaction_hash(&winning);
        output.push(winning);
    }

    let duration_s = start.elapsed().as_secs() as i64;
    Ok(AttachResponse {
        trytes: output,
        duration: duration_s,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pow::PowEngine;
    use apibox_core::trytes::NONCE_LEN;

    fn nines(n: usize) -> Trytes {
        Trytes::parse(&"9".repeat(n)).unwrap()
    }

    async fn run_embedded_round(dispatcher: &Dispatcher) {
        let task = dispatcher.claim().await;
        let won = PowEngine::global().run(task.trytes.clone(), task.difficulty).unwrap();
        let nonce_start = won.len() - NONCE_LEN;
        let nonce = Trytes::parse(&won.as_str()[nonce_start..]).unwrap();
        dispatcher.complete(task.id, &nonce).ok();
    }

    #[tokio::test]
    async fn rejects_empty_trytes_list() {
        let dispatcher = Dispatcher::new();
        let req = AttachRequest {
            trunk: nines(81),
            branch: nines(81),
            min_weight_magnitude: 1,
            trytes: vec![],
        };
        let err = attach_to_tangle(&dispatcher, req).await.unwrap_err();
        assert_eq!(err, ApiError::BadRequest("no trytes supplied".to_string()));
    }

    #[tokio::test]
    async fn single_element_preserves_trunk_and_branch() {
        let dispatcher = std::sync::Arc::new(Dispatcher::new());
        let trunk = Trytes::parse(&"A".repeat(81)).unwrap();
        let branch = Trytes::parse(&"B".repeat(81)).unwrap();
        let req = AttachRequest {
            trunk: trunk.clone(),
            branch: branch.clone(),
            min_weight_magnitude: 1,
            trytes: vec![nines(crate::transaction::TX_LEN)],
        };

        let worker_dispatcher = dispatcher.clone();
        let worker = tokio::spawn(async move { run_embedded_round(&worker_dispatcher).await });

        let response = attach_to_tangle(&dispatcher, req).await.unwrap();
        worker.await.unwrap();

        assert_eq!(response.trytes.len(), 1);
        assert_eq!(crate::transaction::trunk_of(&response.trytes[0]), trunk);
        assert_eq!(crate::transaction::branch_of(&response.trytes[0]), branch);
        assert!(crate::transaction::valid_nonce(&response.trytes[0], 1));
    }

    #[tokio::test]
    async fn two_elements_chain_trunk_to_previous_hash() {
        let dispatcher = std::sync::Arc::new(Dispatcher::new());
        let trunk = Trytes::parse(&"A".repeat(81)).unwrap();
        let branch = Trytes::parse(&"B".repeat(81)).unwrap();
        let req = AttachRequest {
            trunk: trunk.clone(),
            branch,
            min_weight_magnitude: 1,
            trytes: vec![
                nines(crate::transaction::TX_LEN),
                nines(crate::transaction::TX_LEN),
            ],
        };

        let worker_dispatcher = dispatcher.clone();
        let worker = tokio::spawn(async move {
            for _ in 0..2 {
                run_embedded_round(&worker_dispatcher).await;
            }
        });

        let response = attach_to_tangle(&dispatcher, req).await.unwrap();
        worker.await.unwrap();

        assert_eq!(response.trytes.len(), 2);
        let hash0 = transaction_hash(&response.trytes[0]);
        assert_eq!(crate::transaction::trunk_of(&response.trytes[1]), hash0);
        assert_eq!(crate::transaction::branch_of(&response.trytes[1]), trunk);
        assert!(response.duration >= 0);
    }
}
