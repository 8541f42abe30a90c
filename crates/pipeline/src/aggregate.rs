//! Batch aggregation
//!
//! Collapses duplicate records within a single batch. The aggregation
//! key is the tuple of the policy's key field values; records sharing a
//! key become one output record carrying the first occurrence's event
//! plus `aggregated_count`, `aggregated_first_time`, and
//! `aggregated_last_time`. Records missing any key field pass through
//! untouched, as do singleton groups.
//!
//! Output order follows the batch's receive order: each passthrough and
//! each group (at its first occurrence) keeps its original position.

use std::collections::HashMap;

use serde_json::{Map, Value};

use sluice_config::AggregationPolicy;
use sluice_event::{CanonicalLog, EventPayload};

use crate::worker::ProcessedRecord;

/// Field added to a collapsed record: group size
const COUNT_FIELD: &str = "aggregated_count";

/// Field added to a collapsed record: earliest receive time (unix secs)
const FIRST_TIME_FIELD: &str = "aggregated_first_time";

/// Field added to a collapsed record: latest receive time (unix secs)
const LAST_TIME_FIELD: &str = "aggregated_last_time";

struct Group {
    first: ProcessedRecord,
    count: u64,
    first_time: u64,
    last_time: u64,
}

enum Slot {
    Passthrough(ProcessedRecord),
    Group(usize),
}

/// Collapse a batch under the given policy.
///
/// `time` is the batch processing time stamped into every output record;
/// `source` is the source display name.
pub fn collapse(
    policy: &AggregationPolicy,
    records: Vec<ProcessedRecord>,
    time: u64,
    source: &str,
) -> Vec<CanonicalLog> {
    let mut slots = Vec::with_capacity(records.len());
    let mut groups: Vec<Option<Group>> = Vec::new();
    let mut index: HashMap<Vec<String>, usize> = HashMap::new();

    for record in records {
        let Some(key) = key_of(policy, &record) else {
            slots.push(Slot::Passthrough(record));
            continue;
        };

        match index.get(&key) {
            Some(&i) => {
                let group = groups[i].as_mut().expect("group present until build");
                group.count += 1;
                group.first_time = group.first_time.min(record.received_unix);
                group.last_time = group.last_time.max(record.received_unix);
            }
            None => {
                let i = groups.len();
                groups.push(Some(Group {
                    first_time: record.received_unix,
                    last_time: record.received_unix,
                    count: 1,
                    first: record,
                }));
                index.insert(key, i);
                slots.push(Slot::Group(i));
            }
        }
    }

    slots
        .into_iter()
        .map(|slot| match slot {
            Slot::Passthrough(record) => CanonicalLog::new(time, &record.raw, source),
            Slot::Group(i) => {
                let group = groups[i].take().expect("group consumed once");
                group.into_log(time, source)
            }
        })
        .collect()
}

/// The aggregation key for a record, or `None` when any key field is
/// absent (the record passes through unaggregated).
fn key_of(policy: &AggregationPolicy, record: &ProcessedRecord) -> Option<Vec<String>> {
    policy
        .key_fields
        .iter()
        .map(|field| record.fields.get(field).map(str::to_owned))
        .collect()
}

impl Group {
    fn into_log(self, time: u64, source: &str) -> CanonicalLog {
        if self.count == 1 {
            return CanonicalLog::new(time, &self.first.raw, source);
        }

        let mut event = match EventPayload::parse(&self.first.raw) {
            EventPayload::Object(map) => map,
            EventPayload::Text(text) => {
                // String events have nowhere to carry the counters, so
                // the raw payload moves under a "message" key.
                let mut map = Map::new();
                map.insert("message".into(), Value::String(text));
                map
            }
        };

        event.insert(COUNT_FIELD.into(), Value::from(self.count));
        event.insert(FIRST_TIME_FIELD.into(), Value::from(self.first_time));
        event.insert(LAST_TIME_FIELD.into(), Value::from(self.last_time));

        CanonicalLog {
            time,
            event: EventPayload::Object(event),
            source: source.to_owned(),
        }
    }
}

#[cfg(test)]
#[path = "aggregate_test.rs"]
mod aggregate_test;
