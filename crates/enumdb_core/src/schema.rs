//! Enumeration type declarations.

use crate::config::Config;
use crate::types::MissPolicy;
use enumdb_store::{Record, Value};
use std::borrow::Borrow;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// Derives an indexed value from a record.
pub type Extractor = Arc<dyn Fn(&Record) -> Value + Send + Sync>;

/// A secondary attribute index declaration.
///
/// # Example
///
/// ```rust
/// use enumdb_core::{AttributeSpec, Value};
///
/// let html = AttributeSpec::new("html").unique();
/// let initial = AttributeSpec::computed("initial", |record| {
///     record
///         .value_of("name")
///         .as_text()
///         .and_then(|name| name.chars().next())
///         .map_or(Value::Null, |c| Value::from(c.to_string()))
/// });
/// assert!(html.is_unique());
/// assert!(!initial.is_unique());
/// ```
#[derive(Clone)]
pub struct AttributeSpec {
    name: String,
    unique: bool,
    safe_alias: bool,
    extractor: Option<Extractor>,
}

impl AttributeSpec {
    /// Indexes the named attribute as stored.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            unique: false,
            safe_alias: false,
            extractor: None,
        }
    }

    /// Indexes a value computed from the whole record.
    pub fn computed<F>(name: impl Into<String>, extractor: F) -> Self
    where
        F: Fn(&Record) -> Value + Send + Sync + 'static,
    {
        Self {
            extractor: Some(Arc::new(extractor)),
            ..Self::new(name)
        }
    }

    /// Requires every record to have a distinct value.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Also indexes the [`safe_alias`](crate::safe_alias) of text values.
    #[must_use]
    pub fn safe_alias(mut self) -> Self {
        self.safe_alias = true;
        self
    }

    /// Attribute name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether values must be distinct.
    pub fn is_unique(&self) -> bool {
        self.unique
    }

    /// Whether text values are also indexed by alias.
    pub fn has_safe_alias(&self) -> bool {
        self.safe_alias
    }

    /// Reads the indexed value from a record.
    pub fn extract(&self, record: &Record) -> Value {
        match &self.extractor {
            Some(extractor) => extractor(record),
            None => record.value_of(&self.name),
        }
    }
}

impl fmt::Debug for AttributeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttributeSpec")
            .field("name", &self.name)
            .field("unique", &self.unique)
            .field("safe_alias", &self.safe_alias)
            .field("computed", &self.extractor.is_some())
            .finish()
    }
}

/// Schema-level declaration of an enumeration.
///
/// Names the backing collection, the enumerator attribute(s) that identify
/// a record semantically, and how the cache in front of it behaves. Options
/// left unset fall back to the registry's [`Config`].
///
/// # Example
///
/// ```rust
/// use enumdb_core::{AttributeSpec, EnumerationType, MissPolicy};
///
/// let access_path = EnumerationType::new("AccessPath")
///     .enumerate_by(["controller", "action"])
///     .miss_policy(MissPolicy::Silent)
///     .index(AttributeSpec::new("path").unique());
///
/// assert_eq!(access_path.collection_name(), "accesspaths");
/// assert_eq!(access_path.arity(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct EnumerationType {
    name: String,
    collection: String,
    enumerator: Vec<String>,
    cache: bool,
    miss_policy: Option<MissPolicy>,
    safe_aliases: Option<bool>,
    indexes: Vec<AttributeSpec>,
    updates_permitted: bool,
    order_by: Option<String>,
}

impl EnumerationType {
    /// Declares an enumeration enumerated by `name`, stored in the
    /// lowercased, pluralized collection.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let collection = format!("{}s", name.to_lowercase());
        Self {
            name,
            collection,
            enumerator: vec!["name".to_string()],
            cache: true,
            miss_policy: None,
            safe_aliases: None,
            indexes: Vec::new(),
            updates_permitted: false,
            order_by: None,
        }
    }

    /// Sets the backing collection.
    #[must_use]
    pub fn collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    /// Sets the enumerator attribute(s), in key order.
    #[must_use]
    pub fn enumerate_by<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enumerator = attributes.into_iter().map(Into::into).collect();
        self
    }

    /// Enables or disables caching for this type.
    #[must_use]
    pub fn cache(mut self, enabled: bool) -> Self {
        self.cache = enabled;
        self
    }

    /// Sets the miss policy.
    #[must_use]
    pub fn miss_policy(mut self, policy: MissPolicy) -> Self {
        self.miss_policy = Some(policy);
        self
    }

    /// Enables or disables safe alias keys on the enumerator.
    #[must_use]
    pub fn safe_aliases(mut self, enabled: bool) -> Self {
        self.safe_aliases = Some(enabled);
        self
    }

    /// Adds a secondary index.
    #[must_use]
    pub fn index(mut self, spec: AttributeSpec) -> Self {
        self.indexes.push(spec);
        self
    }

    /// Allows writes outside an [`UpdatePermit`](crate::UpdatePermit) scope.
    #[must_use]
    pub fn updates_permitted(mut self, permitted: bool) -> Self {
        self.updates_permitted = permitted;
        self
    }

    /// Orders snapshots by an attribute instead of store order.
    #[must_use]
    pub fn order_by(mut self, attribute: impl Into<String>) -> Self {
        self.order_by = Some(attribute.into());
        self
    }

    /// Type name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Backing collection name.
    pub fn collection_name(&self) -> &str {
        &self.collection
    }

    /// Enumerator attribute names.
    pub fn enumerator(&self) -> &[String] {
        &self.enumerator
    }

    /// Number of enumerator attributes.
    pub fn arity(&self) -> usize {
        self.enumerator.len()
    }

    /// Whether this type wants its records cached.
    pub fn caches(&self) -> bool {
        self.cache
    }

    /// Effective miss policy.
    pub fn effective_miss_policy(&self, config: &Config) -> MissPolicy {
        self.miss_policy.unwrap_or(config.default_miss_policy)
    }

    /// Effective safe alias setting.
    pub fn effective_safe_aliases(&self, config: &Config) -> bool {
        self.safe_aliases.unwrap_or(config.safe_aliases)
    }

    /// Secondary indexes.
    pub fn indexes(&self) -> &[AttributeSpec] {
        &self.indexes
    }

    /// Whether writes are allowed without a permit.
    pub fn allows_updates(&self) -> bool {
        self.updates_permitted
    }

    /// Attribute snapshots are ordered by, if any.
    pub fn ordering(&self) -> Option<&str> {
        self.order_by.as_deref()
    }

    /// Enumerator values of a record, in key order.
    pub fn enumerator_values(&self, record: &Record) -> Vec<Value> {
        self.enumerator
            .iter()
            .map(|attribute| record.value_of(attribute))
            .collect()
    }

    /// Checks a record against the model rules.
    ///
    /// # Errors
    ///
    /// Returns a message if the id is not positive or an enumerator
    /// attribute is blank.
    pub fn validate(&self, record: &Record) -> Result<(), String> {
        if record.id <= 0 {
            return Err(format!("id must be positive (got {})", record.id));
        }
        for attribute in &self.enumerator {
            if record.value_of(attribute).is_blank() {
                return Err(format!("{attribute} can't be blank"));
            }
        }
        Ok(())
    }

    /// Puts records into snapshot order. Stable, so ties keep store order.
    pub fn sort<R: Borrow<Record>>(&self, records: &mut [R]) {
        if let Some(attribute) = &self.order_by {
            records.sort_by(|a, b| {
                compare_values(
                    &a.borrow().value_of(attribute),
                    &b.borrow().value_of(attribute),
                )
            });
        }
    }

    /// Validates the declaration itself.
    pub(crate) fn check(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("enumeration name can't be blank".to_string());
        }
        if self.enumerator.is_empty() {
            return Err(format!("{}: at least one enumerator attribute is required", self.name));
        }
        let mut seen = std::collections::HashSet::new();
        for attribute in self.enumerator.iter().chain(self.indexes.iter().map(|spec| &spec.name)) {
            if attribute == "id" {
                return Err(format!("{}: id is always indexed", self.name));
            }
            if !seen.insert(attribute.as_str()) {
                return Err(format!("{}: attribute {attribute} is indexed twice", self.name));
            }
        }
        Ok(())
    }
}

/// Orders values for `order_by`: nulls first, then booleans, numbers and
/// text, lists last.
fn compare_values(a: &Value, b: &Value) -> Ordering {
    fn rank(value: &Value) -> u8 {
        match value {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Integer(_) | Value::Float(_) => 2,
            Value::Text(_) => 3,
            Value::List(_) => 4,
        }
    }

    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Integer(x), Value::Integer(y)) => x.cmp(y),
        (Value::Text(x), Value::Text(y)) => x.cmp(y),
        (Value::Integer(_) | Value::Float(_), Value::Integer(_) | Value::Float(_)) => {
            let x = a.as_float().or_else(|| a.as_integer().map(|n| n as f64));
            let y = b.as_float().or_else(|| b.as_integer().map(|n| n as f64));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::List(x), Value::List(y)) => x
            .iter()
            .zip(y)
            .map(|(x, y)| compare_values(x, y))
            .find(|ord| ord.is_ne())
            .unwrap_or_else(|| x.len().cmp(&y.len())),
        _ => rank(a).cmp(&rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let color = EnumerationType::new("Color");
        assert_eq!(color.collection_name(), "colors");
        assert_eq!(color.enumerator(), ["name".to_string()]);
        assert!(color.caches());
        assert!(!color.allows_updates());
        assert_eq!(color.ordering(), None);
    }

    #[test]
    fn config_fallbacks() {
        let config = Config::default().safe_aliases(true);
        let color = EnumerationType::new("Color");
        assert!(color.effective_safe_aliases(&config));
        assert_eq!(color.effective_miss_policy(&config), MissPolicy::Raise);

        let color = color.safe_aliases(false).miss_policy(MissPolicy::Silent);
        assert!(!color.effective_safe_aliases(&config));
        assert_eq!(color.effective_miss_policy(&config), MissPolicy::Silent);
    }

    #[test]
    fn validate_requires_positive_id_and_enumerator() {
        let color = EnumerationType::new("Color");
        assert!(color.validate(&Record::new(1).with("name", "red")).is_ok());
        assert_eq!(
            color.validate(&Record::new(1)).unwrap_err(),
            "name can't be blank"
        );
        assert!(color.validate(&Record::new(0).with("name", "red")).is_err());

        let path = EnumerationType::new("AccessPath").enumerate_by(["controller", "action"]);
        let err = path
            .validate(&Record::new(1).with("controller", "users").with("action", " "))
            .unwrap_err();
        assert_eq!(err, "action can't be blank");
    }

    #[test]
    fn check_rejects_bad_declarations() {
        assert!(EnumerationType::new("Color").check().is_ok());
        assert!(EnumerationType::new("").check().is_err());
        assert!(EnumerationType::new("Color")
            .enumerate_by(Vec::<String>::new())
            .check()
            .is_err());
        assert!(EnumerationType::new("Color")
            .index(AttributeSpec::new("name"))
            .check()
            .is_err());
        assert!(EnumerationType::new("Color").enumerate_by(["id"]).check().is_err());
    }

    #[test]
    fn computed_extractor() {
        let spec = AttributeSpec::computed("upper", |r| {
            Value::from(r.value_of("name").to_string().to_uppercase())
        });
        assert_eq!(spec.extract(&Record::new(1).with("name", "red")), Value::from("RED"));
        assert_eq!(
            AttributeSpec::new("name").extract(&Record::new(1).with("name", "red")),
            Value::from("red")
        );
    }

    #[test]
    fn order_by_is_stable() {
        let kind = EnumerationType::new("Book").enumerate_by(["title"]).order_by("rank");
        let mut records = vec![
            Record::new(1).with("title", "c").with("rank", 2),
            Record::new(2).with("title", "a").with("rank", 1),
            Record::new(3).with("title", "b").with("rank", 2),
            Record::new(4).with("title", "d"),
        ];
        kind.sort(&mut records);

        let ids: Vec<_> = records.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![4, 2, 1, 3]);
    }
}
