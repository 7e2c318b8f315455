use serde::{Deserialize, Serialize};

use super::KeySpec;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexKind {
    /// Shares the table's partition key; only the sort key differs.
    Local,
    /// May redefine both keys.
    Global,
}

/// A named secondary index with its own key and an optional projection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Index {
    name: String,
    kind: IndexKind,
    key: KeySpec,
    projection: Option<Vec<String>>,
}

impl Index {
    pub fn local(name: impl Into<String>, key: KeySpec) -> Self {
        Self::new(name, IndexKind::Local, key)
    }

    pub fn global(name: impl Into<String>, key: KeySpec) -> Self {
        Self::new(name, IndexKind::Global, key)
    }

    fn new(name: impl Into<String>, kind: IndexKind, key: KeySpec) -> Self {
        Self {
            name: name.into(),
            kind,
            key,
            projection: None,
        }
    }

    /// Restricts the attributes copied into the index. An empty list keeps
    /// only the key attributes; without a projection every attribute is kept.
    pub fn with_projection<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.projection = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> IndexKind {
        self.kind
    }

    pub fn key(&self) -> &KeySpec {
        &self.key
    }

    pub fn projection(&self) -> Option<&[String]> {
        self.projection.as_deref()
    }

    /// The fields readable through this index, or `None` when it projects
    /// every attribute. Always includes the table and index key fields.
    pub fn readable_fields(&self, table_key: &KeySpec) -> Option<Vec<String>> {
        let projection = self.projection.as_ref()?;
        let mut fields: Vec<String> = Vec::with_capacity(projection.len() + 4);
        let keys = table_key.fields().chain(self.key.fields());
        for field in projection.iter().map(String::as_str).chain(keys) {
            if !fields.iter().any(|f| f == field) {
                fields.push(field.to_string());
            }
        }
        Some(fields)
    }

    /// How the projection is declared to the backend. Key attributes are
    /// always projected, so they are stripped from `INCLUDE` lists.
    pub fn projection_declaration(&self, table_key: &KeySpec) -> ProjectionDeclaration {
        let Some(projection) = &self.projection else {
            return ProjectionDeclaration::All;
        };
        let non_key: Vec<String> = projection
            .iter()
            .filter(|field| !table_key.contains(field) && !self.key.contains(field))
            .cloned()
            .collect();
        if non_key.is_empty() {
            ProjectionDeclaration::KeysOnly
        } else {
            ProjectionDeclaration::Include(non_key)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectionDeclaration {
    All,
    KeysOnly,
    Include(Vec<String>),
}

impl ProjectionDeclaration {
    /// The backend's `ProjectionType` name.
    pub fn projection_type(&self) -> &'static str {
        match self {
            ProjectionDeclaration::All => "ALL",
            ProjectionDeclaration::KeysOnly => "KEYS_ONLY",
            ProjectionDeclaration::Include(_) => "INCLUDE",
        }
    }

    pub fn non_key_attributes(&self) -> &[String] {
        match self {
            ProjectionDeclaration::Include(fields) => fields,
            _ => &[],
        }
    }
}
