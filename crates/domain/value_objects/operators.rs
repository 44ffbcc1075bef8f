use std::collections::BTreeMap;

use crate::domain::entities::subscriptions::SubscriptionEntity;

/// Subscriptions one operator is responsible for, as returned by the grouped store queries.
#[derive(Debug, Clone, PartialEq)]
pub struct OperatorSubscriptions {
    pub operator_id: i64,
    pub subscriptions: Vec<SubscriptionEntity>,
}

/// Groups by `assistant_id`, operators in ascending id order, subscriptions keeping input order.
pub fn group_by_operator(subscriptions: Vec<SubscriptionEntity>) -> Vec<OperatorSubscriptions> {
    let mut grouped: BTreeMap<i64, Vec<SubscriptionEntity>> = BTreeMap::new();
    for subscription in subscriptions {
        grouped
            .entry(subscription.assistant_id)
            .or_default()
            .push(subscription);
    }

    grouped
        .into_iter()
        .map(|(operator_id, subscriptions)| OperatorSubscriptions {
            operator_id,
            subscriptions,
        })
        .collect()
}
