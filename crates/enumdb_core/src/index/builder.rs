//! One-pass index construction over a snapshot.

use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::index::hash::{HashIndex, IndexCollision};
use crate::index::prefix::PrefixIndex;
use crate::normalize::{safe_alias, Atom};
use crate::schema::{AttributeSpec, EnumerationType};
use enumdb_store::{Record, RecordId};
use std::collections::HashMap;
use std::sync::Arc;

/// Index over one attribute, with optional safe alias entries.
#[derive(Debug, Clone)]
pub struct AttributeIndex {
    spec: AttributeSpec,
    values: HashIndex<Atom>,
    aliases: Option<HashIndex<String>>,
    required: bool,
}

impl AttributeIndex {
    fn new(spec: AttributeSpec, required: bool) -> Self {
        let (values, aliases) = if spec.is_unique() {
            (HashIndex::unique(spec.name()), HashIndex::unique(spec.name()))
        } else {
            (HashIndex::new(spec.name()), HashIndex::new(spec.name()))
        };
        let aliases = spec.has_safe_alias().then_some(aliases);
        Self {
            spec,
            values,
            aliases,
            required,
        }
    }

    /// The attribute declaration.
    pub fn spec(&self) -> &AttributeSpec {
        &self.spec
    }

    /// Records with the value, or failing that with the value's alias.
    pub fn find(&self, atom: &Atom) -> &[Arc<Record>] {
        let literal = self.values.get_all(atom);
        if !literal.is_empty() {
            return literal;
        }
        match (&self.aliases, atom) {
            (Some(aliases), Atom::Str(s)) => aliases.get_all(&safe_alias(s)),
            _ => &[],
        }
    }

    fn atom_of(&self, enumeration: &str, record: &Record) -> CoreResult<Option<Atom>> {
        let value = self.spec.extract(record);
        match Atom::from_value(&value) {
            Some(atom) => Ok(Some(atom)),
            None if self.required => Err(CoreError::integrity_violation(
                enumeration,
                self.spec.name(),
                format!("record {} has a {} value, which can't be indexed", record.id, value.type_name()),
            )),
            None => Ok(None),
        }
    }

    fn insert(&mut self, enumeration: &str, record: &Arc<Record>) -> CoreResult<()> {
        let Some(atom) = self.atom_of(enumeration, record)? else {
            return Ok(());
        };
        let name = self.spec.name().to_string();

        if let (Some(aliases), Atom::Str(s)) = (&mut self.aliases, &atom) {
            let alias = safe_alias(s);
            if !alias.is_empty() {
                aliases
                    .insert(alias.clone(), Arc::clone(record))
                    .map_err(|c| collision(enumeration, &name, c, &format!("alias {alias:?}")))?;
            }
        }
        let shown = atom.to_string();
        self.values
            .insert(atom, Arc::clone(record))
            .map_err(|c| collision(enumeration, &name, c, &format!("value {shown}")))
    }

    fn remove(&mut self, record: &Record) {
        let Some(atom) = Atom::from_value(&self.spec.extract(record)) else {
            return;
        };
        if let (Some(aliases), Atom::Str(s)) = (&mut self.aliases, &atom) {
            aliases.remove(&safe_alias(s), record.id);
        }
        self.values.remove(&atom, record.id);
    }
}

fn collision(enumeration: &str, attribute: &str, c: IndexCollision, what: &str) -> CoreError {
    CoreError::integrity_violation(
        enumeration,
        attribute,
        format!("records {} and {} share the {what}", c.existing, c.incoming),
    )
}

/// The complete index set of one snapshot.
///
/// Built once per load by [`IndexBuilder`]. [`push`](Indexes::push) and
/// [`remove`](Indexes::remove) return a patched copy and leave `self`
/// untouched, so readers holding the previous snapshot never see a change.
#[derive(Debug, Clone)]
pub struct Indexes {
    enumeration: String,
    enumerator: Vec<String>,
    ids: HashIndex<RecordId>,
    attributes: HashMap<String, AttributeIndex>,
    prefix: Option<PrefixIndex>,
}

impl Indexes {
    /// Record with the given id.
    pub fn by_id(&self, id: RecordId) -> Option<&Arc<Record>> {
        self.ids.get(&id)
    }

    /// Index over a named attribute, if one was declared.
    pub fn attribute(&self, name: &str) -> Option<&AttributeIndex> {
        self.attributes.get(name)
    }

    /// Record identified by the leading enumerator components.
    ///
    /// Single-attribute enumerators take exactly one component and also
    /// match by safe alias when enabled.
    pub fn lookup_enumerator(&self, atoms: &[Atom]) -> Option<&Arc<Record>> {
        if self.prefix.is_some() {
            return self.lookup_prefix(atoms);
        }
        match atoms {
            [atom] => self
                .enumerator
                .first()
                .and_then(|name| self.attributes.get(name))
                .and_then(|index| index.find(atom).first()),
            _ => None,
        }
    }

    /// First record, in insertion order, whose enumerator tuple starts with
    /// `prefix`. Always misses for single-attribute enumerators.
    pub fn lookup_prefix(&self, prefix: &[Atom]) -> Option<&Arc<Record>> {
        self.prefix.as_ref().and_then(|index| index.lookup(prefix))
    }

    /// Number of indexed records.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether no records are indexed.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Returns a copy with `record` added.
    ///
    /// # Errors
    ///
    /// Returns `IndexIntegrityViolation` if the record collides with an
    /// indexed one on a unique key.
    pub fn push(&self, record: Arc<Record>) -> CoreResult<Indexes> {
        let mut next = self.clone();
        next.insert(&record)?;
        Ok(next)
    }

    /// Returns a copy without `record`.
    #[must_use]
    pub fn remove(&self, record: &Record) -> Indexes {
        let mut next = self.clone();
        next.ids.remove(&record.id, record.id);
        for index in next.attributes.values_mut() {
            index.remove(record);
        }
        if let Some(prefix) = &mut next.prefix {
            let tuple: Vec<Atom> = self
                .enumerator
                .iter()
                .map_while(|name| Atom::from_value(&record.value_of(name)))
                .collect();
            prefix.remove(&tuple, record.id);
        }
        next
    }

    pub(crate) fn insert(&mut self, record: &Arc<Record>) -> CoreResult<()> {
        let enumeration = self.enumeration.as_str();
        self.ids
            .insert(record.id, Arc::clone(record))
            .map_err(|c| collision(enumeration, "id", c, "id"))?;

        for index in self.attributes.values_mut() {
            index.insert(enumeration, record)?;
        }

        if let Some(prefix) = &mut self.prefix {
            let tuple = self
                .enumerator
                .iter()
                .map(|name| {
                    let value = record.value_of(name);
                    Atom::from_value(&value).ok_or_else(|| {
                        CoreError::integrity_violation(
                            enumeration,
                            name.as_str(),
                            format!(
                                "record {} has a {} value, which can't be indexed",
                                record.id,
                                value.type_name()
                            ),
                        )
                    })
                })
                .collect::<CoreResult<Vec<_>>>()?;
            prefix
                .insert(tuple, Arc::clone(record))
                .map_err(|c| collision(enumeration, &self.enumerator.join(", "), c, "enumerator"))?;
        }
        Ok(())
    }
}

/// Builds the index set for an enumeration type.
///
/// # Example
///
/// ```rust
/// use enumdb_core::{Config, EnumerationType, IndexBuilder, Record};
/// use std::sync::Arc;
///
/// let color = EnumerationType::new("Color").safe_aliases(true);
/// let builder = IndexBuilder::new(&color, &Config::default());
/// let records = vec![Arc::new(Record::new(1).with("name", "Hot-Red!"))];
///
/// let indexes = builder.build(&records).unwrap();
/// assert_eq!(indexes.by_id(1).unwrap().id, 1);
/// ```
#[derive(Debug)]
pub struct IndexBuilder<'a> {
    kind: &'a EnumerationType,
    safe_aliases: bool,
}

impl<'a> IndexBuilder<'a> {
    /// Creates a builder for `kind`.
    pub fn new(kind: &'a EnumerationType, config: &Config) -> Self {
        Self {
            kind,
            safe_aliases: kind.effective_safe_aliases(config),
        }
    }

    /// An index set with no records.
    pub fn empty(&self) -> Indexes {
        let mut attributes = HashMap::new();
        let enumerator = self.kind.enumerator().to_vec();

        let prefix = if let [single] = enumerator.as_slice() {
            let mut spec = AttributeSpec::new(single.as_str()).unique();
            if self.safe_aliases {
                spec = spec.safe_alias();
            }
            attributes.insert(single.clone(), AttributeIndex::new(spec, true));
            None
        } else {
            Some(PrefixIndex::new(&enumerator.join(", "), enumerator.len()))
        };

        for spec in self.kind.indexes() {
            attributes.insert(spec.name().to_string(), AttributeIndex::new(spec.clone(), false));
        }

        Indexes {
            enumeration: self.kind.name().to_string(),
            enumerator,
            ids: HashIndex::unique("id"),
            attributes,
            prefix,
        }
    }

    /// Indexes `records` in one pass.
    ///
    /// # Errors
    ///
    /// Returns `IndexIntegrityViolation` if two records share an id or a
    /// unique value, or an enumerator value can't be indexed.
    pub fn build(&self, records: &[Arc<Record>]) -> CoreResult<Indexes> {
        let mut indexes = self.empty();
        for record in records {
            if let Err(err) = indexes.insert(record) {
                tracing::warn!(enumeration = %self.kind.name(), error = %err, "index build failed");
                return Err(err);
            }
        }
        Ok(indexes)
    }
}
