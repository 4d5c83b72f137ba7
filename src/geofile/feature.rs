use std::collections::HashMap;

/// Scalar value of a single attribute field.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Binary(Vec<u8>),
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Text(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::Text(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Integer(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Real(value)
    }
}

impl From<Vec<u8>> for AttributeValue {
    fn from(value: Vec<u8>) -> Self {
        AttributeValue::Binary(value)
    }
}

impl From<&AttributeValue> for serde_json::Value {
    fn from(value: &AttributeValue) -> Self {
        match value {
            AttributeValue::Null => serde_json::Value::Null,
            AttributeValue::Integer(value) => serde_json::Value::from(*value),
            // Non-finite reals have no JSON representation and end up as null.
            AttributeValue::Real(value) => serde_json::Value::from(*value),
            AttributeValue::Text(value) => serde_json::Value::from(value.as_str()),
            AttributeValue::Binary(bytes) => serde_json::Value::from(
                bytes
                    .iter()
                    .map(|byte| format!("{:02x}", byte))
                    .collect::<String>(),
            ),
        }
    }
}

/// Field name to value mapping for a node, an edge or a source feature.
pub type AttributeMap = HashMap<String, AttributeValue>;

/// A feature read from a feature source. `geometry` is `None` when the record has no shape.
#[derive(Debug, Clone)]
pub struct Feature {
    pub geometry: Option<geo::Geometry>,
    pub attributes: AttributeMap,
}

impl Feature {
    pub fn new(geometry: Option<geo::Geometry>, attributes: AttributeMap) -> Self {
        Self {
            geometry,
            attributes,
        }
    }
}

impl From<geo::Geometry> for Feature {
    fn from(value: geo::Geometry) -> Self {
        Self {
            geometry: Some(value),
            attributes: AttributeMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::AttributeValue;

    #[rstest]
    #[case(AttributeValue::Null, serde_json::Value::Null)]
    #[case(AttributeValue::Integer(7), serde_json::json!(7))]
    #[case(AttributeValue::Real(2.5), serde_json::json!(2.5))]
    #[case(AttributeValue::from("Mill Creek"), serde_json::json!("Mill Creek"))]
    #[case(AttributeValue::Binary(vec![0x01, 0xab, 0x00]), serde_json::json!("01ab00"))]
    fn test_attribute_value_to_json(
        #[case] value: AttributeValue,
        #[case] expected: serde_json::Value,
    ) {
        assert_eq!(expected, serde_json::Value::from(&value));
    }
}
