//! Schema types and builders for tfplug
//!
//! This module provides the schema system for defining resource schemas.
//! Beyond describing the resource to Terraform, a schema block is the shape
//! descriptor that drives state masking and sparse-object normalization.

use std::collections::HashMap;

/// AttributeType defines the type system for Terraform attributes
/// This must match Terraform's type system exactly
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeType {
    String,
    Number, // Always f64
    Bool,
    List(Box<AttributeType>),               // Ordered, allows duplicates
    Set(Box<AttributeType>),                // Unordered, no duplicates
    Map(Box<AttributeType>),                // String keys only
    Object(HashMap<String, AttributeType>), // Fixed structure
}

impl AttributeType {
    pub fn list(element: AttributeType) -> Self {
        AttributeType::List(Box::new(element))
    }

    pub fn set(element: AttributeType) -> Self {
        AttributeType::Set(Box::new(element))
    }

    pub fn map(element: AttributeType) -> Self {
        AttributeType::Map(Box::new(element))
    }

    pub fn object<K: Into<String>>(fields: impl IntoIterator<Item = (K, AttributeType)>) -> Self {
        AttributeType::Object(fields.into_iter().map(|(k, t)| (k.into(), t)).collect())
    }

    pub fn name(&self) -> &'static str {
        match self {
            AttributeType::String => "string",
            AttributeType::Number => "number",
            AttributeType::Bool => "bool",
            AttributeType::List(_) => "list",
            AttributeType::Set(_) => "set",
            AttributeType::Map(_) => "map",
            AttributeType::Object(_) => "object",
        }
    }
}

/// Schema is returned by resources
/// Version is used for state migration
#[derive(Debug, Clone)]
pub struct Schema {
    pub version: i64, // Increment when schema changes require migration
    pub block: Block, // Root block containing all attributes
}

/// Block represents a configuration block
#[derive(Debug, Clone, Default)]
pub struct Block {
    pub attributes: Vec<Attribute>,
    pub block_types: Vec<NestedBlock>,
    pub description: String,
    pub deprecated: bool,
}

impl Block {
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn nested_block(&self, name: &str) -> Option<&NestedBlock> {
        self.block_types.iter().find(|b| b.type_name == name)
    }

    /// Names of every attribute and nested block, in declaration order
    pub fn field_names(&self) -> Vec<&str> {
        self.attributes
            .iter()
            .map(|a| a.name.as_str())
            .chain(self.block_types.iter().map(|b| b.type_name.as_str()))
            .collect()
    }
}

/// Attribute represents a single configuration attribute
#[derive(Debug, Clone)]
pub struct Attribute {
    pub name: String,
    pub r#type: AttributeType,
    pub description: String,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    pub sensitive: bool,
    /// Accepted on write, never echoed back by the remote API
    pub write_only: bool,
    pub deprecated: bool,
}

impl Attribute {
    /// Computed without being configurable: owned entirely by the server
    pub fn is_computed_only(&self) -> bool {
        self.computed && !self.optional && !self.required
    }
}

/// NestedBlock represents a nested configuration block
#[derive(Debug, Clone)]
pub struct NestedBlock {
    pub type_name: String,
    pub block: Block,
    pub nesting: NestingMode,
    pub min_items: i64,
    pub max_items: i64,
}

impl NestedBlock {
    /// A block that appears at most once and is stored as an object
    pub fn single(type_name: &str, block: Block) -> Self {
        Self {
            type_name: type_name.to_string(),
            block,
            nesting: NestingMode::Single,
            min_items: 0,
            max_items: 1,
        }
    }

    /// A block stored as a list, optionally capped at `max_items`
    pub fn list(type_name: &str, block: Block, max_items: i64) -> Self {
        Self {
            type_name: type_name.to_string(),
            block,
            nesting: NestingMode::List,
            min_items: 0,
            max_items,
        }
    }
}

/// NestingMode defines how nested blocks are structured
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NestingMode {
    Invalid,
    Single,
    List,
    Set,
    Map,
    Group,
}

/// AttributeBuilder provides fluent API for building attributes
/// ALWAYS use this instead of constructing Attribute directly
pub struct AttributeBuilder {
    attribute: Attribute,
}

impl AttributeBuilder {
    /// Create a new attribute builder
    pub fn new(name: &str, type_: AttributeType) -> Self {
        Self {
            attribute: Attribute {
                name: name.to_string(),
                r#type: type_,
                description: String::new(),
                required: false,
                optional: false,
                computed: false,
                sensitive: false,
                write_only: false,
                deprecated: false,
            },
        }
    }

    /// Set description
    pub fn description(mut self, desc: &str) -> Self {
        self.attribute.description = desc.to_string();
        self
    }

    /// Mark as required
    pub fn required(mut self) -> Self {
        self.attribute.required = true;
        self.attribute.optional = false;
        self
    }

    /// Mark as optional
    pub fn optional(mut self) -> Self {
        self.attribute.optional = true;
        self.attribute.required = false;
        self
    }

    /// Mark as computed
    pub fn computed(mut self) -> Self {
        self.attribute.computed = true;
        self
    }

    /// Mark as sensitive (hidden)
    pub fn sensitive(mut self) -> Self {
        self.attribute.sensitive = true;
        self
    }

    /// Mark as write-only. Refresh keeps the prior value
    pub fn write_only(mut self) -> Self {
        self.attribute.write_only = true;
        self
    }

    /// Mark as deprecated
    pub fn deprecated(mut self) -> Self {
        self.attribute.deprecated = true;
        self
    }

    /// Finalize the attribute
    pub fn build(self) -> Attribute {
        self.attribute
    }
}

/// BlockBuilder assembles nested blocks the same way SchemaBuilder
/// assembles the root block
#[derive(Default)]
pub struct BlockBuilder {
    block: Block,
}

impl BlockBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attribute(mut self, attr: Attribute) -> Self {
        self.block.attributes.push(attr);
        self
    }

    pub fn block(mut self, block: NestedBlock) -> Self {
        self.block.block_types.push(block);
        self
    }

    pub fn description(mut self, desc: &str) -> Self {
        self.block.description = desc.to_string();
        self
    }

    pub fn build(self) -> Block {
        self.block
    }
}

/// SchemaBuilder provides fluent API for building schemas
/// ALWAYS use this for consistency
pub struct SchemaBuilder {
    schema: Schema,
}

impl SchemaBuilder {
    /// Create a new schema builder
    pub fn new() -> Self {
        Self {
            schema: Schema {
                version: 0,
                block: Block::default(),
            },
        }
    }

    /// Set schema version
    pub fn version(mut self, version: i64) -> Self {
        self.schema.version = version;
        self
    }

    /// Add attribute
    pub fn attribute(mut self, attr: Attribute) -> Self {
        self.schema.block.attributes.push(attr);
        self
    }

    /// Add nested block
    pub fn block(mut self, block: NestedBlock) -> Self {
        self.schema.block.block_types.push(block);
        self
    }

    /// Set description
    pub fn description(mut self, desc: &str) -> Self {
        self.schema.block.description = desc.to_string();
        self
    }

    /// Mark as deprecated
    pub fn deprecated(mut self) -> Self {
        self.schema.block.deprecated = true;
        self
    }

    /// Finalize the schema
    pub fn build(self) -> Schema {
        self.schema
    }
}

impl std::default::Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}
