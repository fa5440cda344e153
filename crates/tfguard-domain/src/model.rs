use serde_json::{Map, Value};
use tfguard_types::Location;

/// One infrastructure object as seen by the rules: a type, a name, a unique address and an
/// attribute tree. Built by an extractor, then only read.
#[derive(Clone, Debug, PartialEq)]
pub struct Resource {
    pub resource_type: String,
    pub name: String,

    /// Unique within a run, e.g. `aws_s3_bucket.logs` or `module.net.aws_security_group.web`.
    pub address: String,

    /// Always a JSON object at the root.
    pub attributes: Value,

    pub location: Option<Location>,
}

impl Resource {
    /// Build a resource whose address is `<type>.<name>`. A non-object attribute value is
    /// replaced by an empty map.
    pub fn new(resource_type: impl Into<String>, name: impl Into<String>, attributes: Value) -> Self {
        let resource_type = resource_type.into();
        let name = name.into();
        let address = format!("{resource_type}.{name}");
        let attributes = match attributes {
            Value::Object(_) => attributes,
            _ => Value::Object(Map::new()),
        };
        Self {
            resource_type,
            name,
            address,
            attributes,
            location: None,
        }
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = address.into();
        self
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    pub fn file(&self) -> Option<&str> {
        self.location.as_ref().map(|l| l.path.as_str())
    }
}
