//! Capability descriptors: the immutable description of one remote
//! capability, built from a skill advertised in an agent card.

use serde_json::Value;
use thiserror::Error;

use super::schema::{Schema, SchemaError};
use crate::a2a::types::AgentSkill;

/// A skill advertisement that cannot become a descriptor.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DescriptorError {
    #[error("skill #{index} is missing required field '{field}'")]
    MissingField { index: usize, field: &'static str },

    #[error("capability '{capability}' has an invalid {which} schema: {source}")]
    InvalidSchema {
        capability: String,
        which: &'static str,
        #[source]
        source: SchemaError,
    },

    #[error("capability '{capability}' argument schema does not describe an object")]
    ArgumentsNotObject { capability: String },
}

/// Describes one capability of a remote agent.
#[derive(Debug, Clone, PartialEq)]
pub struct CapabilityDescriptor {
    /// Unique within one remote agent; the tool name.
    pub name: String,
    pub description: Option<String>,
    pub argument_schema: Schema,
    pub result_schema: Schema,
    /// Argument schema as advertised, for tool listings.
    pub raw_argument_schema: Value,
    pub raw_result_schema: Value,
    pub tags: Vec<String>,
    /// The remote agent can stream partial results.
    pub streaming: bool,
}

impl CapabilityDescriptor {
    /// Build a descriptor from raw JSON Schema documents.
    pub fn new(
        name: impl Into<String>,
        argument_schema: Value,
        result_schema: Value,
    ) -> Result<Self, DescriptorError> {
        let name = name.into();
        let parsed_args = Schema::from_json(&argument_schema).map_err(|source| {
            DescriptorError::InvalidSchema {
                capability: name.clone(),
                which: "argument",
                source,
            }
        })?;
        if !parsed_args.accepts_objects() {
            return Err(DescriptorError::ArgumentsNotObject { capability: name });
        }
        let parsed_result = Schema::from_json(&result_schema).map_err(|source| {
            DescriptorError::InvalidSchema {
                capability: name.clone(),
                which: "result",
                source,
            }
        })?;

        Ok(Self {
            name,
            description: None,
            argument_schema: parsed_args,
            result_schema: parsed_result,
            raw_argument_schema: argument_schema,
            raw_result_schema: result_schema,
            tags: Vec::new(),
            streaming: false,
        })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }

    /// Build from the skill at position `index` of an agent card.
    ///
    /// `id`, `inputSchema` and `outputSchema` are required.
    pub fn from_skill(
        index: usize,
        skill: &AgentSkill,
        streaming: bool,
    ) -> Result<Self, DescriptorError> {
        let name = skill
            .id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or(DescriptorError::MissingField { index, field: "id" })?;
        let input = skill
            .input_schema
            .clone()
            .ok_or(DescriptorError::MissingField {
                index,
                field: "inputSchema",
            })?;
        let output = skill
            .output_schema
            .clone()
            .ok_or(DescriptorError::MissingField {
                index,
                field: "outputSchema",
            })?;

        let mut descriptor = Self::new(name, input, output)?
            .with_tags(skill.tags.clone())
            .with_streaming(streaming);
        descriptor.description = skill.description.clone().or_else(|| skill.name.clone());
        Ok(descriptor)
    }

    /// Advertise this descriptor as an agent-card skill.
    pub fn to_skill(&self) -> AgentSkill {
        AgentSkill {
            id: Some(self.name.clone()),
            name: Some(self.name.clone()),
            description: self.description.clone(),
            tags: self.tags.clone(),
            input_schema: Some(self.raw_argument_schema.clone()),
            output_schema: Some(self.raw_result_schema.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn skill() -> AgentSkill {
        AgentSkill {
            id: Some("convertCurrency".into()),
            name: Some("Convert currency".into()),
            description: None,
            tags: vec!["finance".into()],
            input_schema: Some(json!({
                "type": "object",
                "properties": {"amount": {"type": "number"}},
                "required": ["amount"]
            })),
            output_schema: Some(json!({"type": "object"})),
        }
    }

    #[test]
    fn test_from_skill() {
        let d = CapabilityDescriptor::from_skill(0, &skill(), true).unwrap();
        assert_eq!(d.name, "convertCurrency");
        assert_eq!(d.description.as_deref(), Some("Convert currency"));
        assert_eq!(d.argument_schema.required_fields(), vec!["amount"]);
        assert!(d.streaming);
        assert_eq!(d.to_skill().input_schema, skill().input_schema);
    }

    #[test]
    fn test_missing_fields() {
        let mut no_id = skill();
        no_id.id = None;
        assert_eq!(
            CapabilityDescriptor::from_skill(2, &no_id, false).unwrap_err(),
            DescriptorError::MissingField { index: 2, field: "id" }
        );

        let mut no_output = skill();
        no_output.output_schema = None;
        assert_eq!(
            CapabilityDescriptor::from_skill(0, &no_output, false).unwrap_err(),
            DescriptorError::MissingField { index: 0, field: "outputSchema" }
        );
    }

    #[test]
    fn test_ill_formed_schema() {
        let mut bad = skill();
        bad.input_schema = Some(json!({"type": "object", "properties": {"x": {"type": "decimal"}}}));
        assert!(matches!(
            CapabilityDescriptor::from_skill(0, &bad, false).unwrap_err(),
            DescriptorError::InvalidSchema { which: "argument", .. }
        ));
    }

    #[test]
    fn test_arguments_must_be_an_object() {
        let err = CapabilityDescriptor::new("x", json!({"type": "string"}), json!({})).unwrap_err();
        assert!(matches!(err, DescriptorError::ArgumentsNotObject { .. }));
    }
}
