use serde_json::{Map, Value};

/// Events pushed to live-update subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum LiveEvent {
    /// Snapshot sent once on connect.
    Initial(Vec<Map<String, Value>>),
    /// One newly created item.
    New(Map<String, Value>),
}

impl LiveEvent {
    /// SSE `event:` name.
    pub fn event_name(&self) -> &'static str {
        match self {
            LiveEvent::Initial(_) => "initial",
            LiveEvent::New(_) => "new",
        }
    }

    /// SSE `data:` payload.
    pub fn payload(&self) -> Value {
        match self {
            LiveEvent::Initial(items) => {
                Value::Array(items.iter().cloned().map(Value::Object).collect())
            }
            LiveEvent::New(item) => Value::Object(item.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn names_and_payloads() {
        let item = json!({"id": "a"}).as_object().unwrap().clone();
        let initial = LiveEvent::Initial(vec![item.clone()]);
        assert_eq!(initial.event_name(), "initial");
        assert_eq!(initial.payload(), json!([{"id": "a"}]));

        let new = LiveEvent::New(item);
        assert_eq!(new.event_name(), "new");
        assert_eq!(new.payload(), json!({"id": "a"}));
    }
}
