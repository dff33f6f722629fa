//! Device-set query engine: evaluates a list of top-level `LogicalOperation`s
//! against the SMS and produces a deduplicated device set.

use crate::sms::{evaluate_condition_set, SmsClient, SmsError};
use fleetscan_model::{DeviceInfo, LogicalOp, LogicalOperation};
use std::collections::HashMap;

pub struct QueryOutcome {
    pub devices: Vec<DeviceInfo>,
    pub operations_executed: usize,
}

/// Evaluate the full operation list per the spec's top-level combination
/// rule: the first non-`NOT` op seeds the accumulator (a leading `NOT`
/// starts from the empty set); later `NOT`s subtract, later non-`NOT`s
/// intersect.
pub async fn evaluate(
    client: &SmsClient,
    operations: &[LogicalOperation],
) -> Result<QueryOutcome, SmsError> {
    let mut operations_executed = 0usize;
    let mut accumulator: Option<HashMap<String, DeviceInfo>> = None;

    for operation in operations {
        let set = evaluate_operation(client, operation, &mut operations_executed).await?;
        accumulator = Some(match accumulator {
            None => {
                if operation.operation_type == LogicalOp::Not {
                    HashMap::new()
                } else {
                    set
                }
            }
            Some(acc) => {
                if operation.operation_type == LogicalOp::Not {
                    difference(acc, &set)
                } else {
                    intersect(acc, &set)
                }
            }
        });
    }

    let devices = accumulator.unwrap_or_default().into_values().collect();
    Ok(QueryOutcome {
        devices,
        operations_executed,
    })
}

/// Evaluate one operation's own children (conditions + nested operations)
/// and combine per its `operation_type`. `NOT` combines its children with a
/// union here; the semantic negation happens one level up, in `evaluate`.
fn evaluate_operation<'a>(
    client: &'a SmsClient,
    operation: &'a LogicalOperation,
    operations_executed: &'a mut usize,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<HashMap<String, DeviceInfo>, SmsError>> + 'a>> {
    Box::pin(async move {
        let mut child_sets = Vec::with_capacity(operation.conditions.len() + operation.nested_operations.len());

        for condition in &operation.conditions {
            child_sets.push(evaluate_condition_set(client, condition, operations_executed).await?);
        }
        for nested in &operation.nested_operations {
            child_sets.push(evaluate_operation(client, nested, operations_executed).await?);
        }

        Ok(match operation.operation_type {
            LogicalOp::And => intersect_all(child_sets),
            LogicalOp::Or | LogicalOp::Not => union_all(child_sets),
        })
    })
}

fn intersect_all(sets: Vec<HashMap<String, DeviceInfo>>) -> HashMap<String, DeviceInfo> {
    let mut iter = sets.into_iter();
    let Some(first) = iter.next() else {
        return HashMap::new();
    };
    iter.fold(first, |acc, set| intersect(acc, &set))
}

fn union_all(sets: Vec<HashMap<String, DeviceInfo>>) -> HashMap<String, DeviceInfo> {
    let mut result = HashMap::new();
    for set in sets {
        result.extend(set);
    }
    result
}

fn intersect(acc: HashMap<String, DeviceInfo>, other: &HashMap<String, DeviceInfo>) -> HashMap<String, DeviceInfo> {
    acc.into_iter().filter(|(id, _)| other.contains_key(id)).collect()
}

fn difference(acc: HashMap<String, DeviceInfo>, other: &HashMap<String, DeviceInfo>) -> HashMap<String, DeviceInfo> {
    acc.into_iter().filter(|(id, _)| !other.contains_key(id)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(id: &str) -> DeviceInfo {
        DeviceInfo {
            id: id.to_string(),
            name: id.to_string(),
            primary_ip4: None,
            status: None,
            device_type: None,
            role: None,
            location: None,
            platform: None,
            manufacturer: None,
            tags: vec![],
        }
    }

    fn set(ids: &[&str]) -> HashMap<String, DeviceInfo> {
        ids.iter().map(|id| (id.to_string(), device(id))).collect()
    }

    #[test]
    fn intersect_keeps_only_common_ids() {
        let result = intersect(set(&["a", "b", "c"]), &set(&["b", "c", "d"]));
        let mut ids: Vec<_> = result.keys().cloned().collect();
        ids.sort();
        assert_eq!(ids, vec!["b".to_string(), "c".to_string()]);
    }

    #[test]
    fn difference_removes_excluded_ids() {
        let result = difference(set(&["a", "b", "c"]), &set(&["b"]));
        let mut ids: Vec<_> = result.keys().cloned().collect();
        ids.sort();
        assert_eq!(ids, vec!["a".to_string(), "c".to_string()]);
    }

    #[test]
    fn union_all_combines_distinct_ids() {
        let result = union_all(vec![set(&["a"]), set(&["b"])]);
        let mut ids: Vec<_> = result.keys().cloned().collect();
        ids.sort();
        assert_eq!(ids, vec!["a".to_string(), "b".to_string()]);
    }
}
