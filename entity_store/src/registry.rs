use crate::errors::StoreError;
use crate::query::{Query, QuerySpec};
use crate::schema::Model;
use crate::transform::TransformRegistry;
use std::sync::{Arc, PoisonError, RwLock};

/// Name-keyed collection of queries for one entity type
///
/// Adding a query under an existing name replaces it in place; the last write
/// wins and keeps the original position in iteration order.
pub struct QueryRegistry<E> {
    queries: RwLock<Vec<Arc<Query<E>>>>,
    transforms: TransformRegistry<E>,
}

impl<E> std::fmt::Debug for QueryRegistry<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<String> = self
            .queries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|query| query.name().to_string())
            .collect();

        f.debug_struct("QueryRegistry")
            .field("queries", &names)
            .field("transforms", &self.transforms)
            .finish()
    }
}

impl<E: Model> QueryRegistry<E> {
    pub fn new() -> Self {
        Self {
            queries: RwLock::new(Vec::new()),
            transforms: TransformRegistry::new(),
        }
    }

    /// Transforms used to resolve `kind` in [`create`](Self::create)
    pub fn transforms(&self) -> &TransformRegistry<E> {
        &self.transforms
    }

    /// Add a query, replacing any query with the same name
    pub fn add(&self, query: Query<E>) -> Arc<Query<E>> {
        let query = Arc::new(query);
        let mut queries = self.queries.write().unwrap_or_else(PoisonError::into_inner);

        match queries.iter_mut().find(|existing| existing.name() == query.name()) {
            Some(existing) => *existing = Arc::clone(&query),
            None => queries.push(Arc::clone(&query)),
        }

        query
    }

    /// Build a query from a spec and add it
    pub fn create(&self, spec: QuerySpec<E>) -> Result<Arc<Query<E>>, StoreError> {
        let query = Query::with_transforms(spec, &self.transforms)?;
        Ok(self.add(query))
    }

    pub fn get(&self, name: &str) -> Option<Arc<Query<E>>> {
        self.queries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|query| query.name() == name)
            .cloned()
    }

    /// Like [`get`](Self::get) but unknown names are an error
    pub fn require(&self, name: &str) -> Result<Arc<Query<E>>, StoreError> {
        self.get(name)
            .ok_or_else(|| StoreError::UnknownQuery(name.to_string()))
    }

    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Snapshot of every query in insertion order
    pub fn queries(&self) -> Vec<Arc<Query<E>>> {
        self.queries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn names(&self) -> Vec<String> {
        self.queries()
            .iter()
            .map(|query| query.name().to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.queries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<E: Model> Default for QueryRegistry<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::Statement;
    use crate::transform::{QueryOutput, BOOLEAN, MULTIPLE};
    use crate::testing::User;

    fn spec(name: &str) -> QuerySpec<User> {
        QuerySpec::new(name).generate(|_| Ok(Statement::new("SELECT 1", vec![])))
    }

    #[test]
    fn test_add_and_lookup() {
        let registry = QueryRegistry::<User>::new();
        assert!(registry.is_empty());

        registry.create(spec("fetch")).unwrap();
        registry.create(spec("save").kind(BOOLEAN)).unwrap();

        assert!(registry.has("fetch"));
        assert!(!registry.has("missing"));
        assert_eq!(registry.get("save").unwrap().transform_type(), Some(BOOLEAN));
        assert_eq!(registry.names(), vec!["fetch", "save"]);
        assert!(matches!(
            registry.require("missing"),
            Err(StoreError::UnknownQuery(name)) if name == "missing"
        ));
    }

    #[test]
    fn test_duplicate_names_overwrite_in_place() {
        let registry = QueryRegistry::<User>::new();
        registry.create(spec("a")).unwrap();
        registry.create(spec("b")).unwrap();
        registry.create(spec("a").kind(MULTIPLE)).unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.names(), vec!["a", "b"]);
        assert_eq!(registry.get("a").unwrap().transform_type(), Some(MULTIPLE));
    }

    #[test]
    fn test_create_validates_spec() {
        let registry = QueryRegistry::<User>::new();
        assert!(registry.create(spec("9lives")).is_err());
        assert!(registry.create(QuerySpec::new("no_generator")).is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_create_resolves_registered_transforms() {
        let registry = QueryRegistry::<User>::new();
        assert!(matches!(
            registry.create(spec("total").kind("count")),
            Err(StoreError::UnknownTransform(_))
        ));

        registry
            .transforms()
            .register("count", |params| {
                Ok(QueryOutput::Boolean(params.response()?.row_count > 0))
            })
            .unwrap();

        let query = registry.create(spec("total").kind("count")).unwrap();
        assert_eq!(query.transform_type(), Some("count"));
    }

    #[test]
    fn test_debug_lists_query_names() {
        let registry = QueryRegistry::<User>::new();
        registry.create(spec("fetch")).unwrap();
        registry.create(spec("save").kind(BOOLEAN)).unwrap();

        let rendered = format!("{:?}", registry);
        assert!(rendered.contains("[\"fetch\", \"save\"]"), "{}", rendered);
    }
}
