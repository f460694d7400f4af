//! Query execution
//!
//! A [`Query`] is a named operation: a statement generator, a result transform
//! and its own hook chain. [`Query::run`] drives one execution through
//! before-hooks, the database call, the transform and after-hooks, in that order.
//! Any failing step stops the run; nothing is retried or rolled back.

use crate::errors::StoreError;
use crate::executor::Statement;
use crate::params::QueryParameters;
use crate::schema::Model;
use crate::transform::{single_row, QueryOutput, Transform, TransformRegistry};
use crate::validation::QueryName;
use crate::{debug_log, trace_log};
use hook_system::{HookChain, HookPhase};
use std::fmt;
use std::sync::Arc;

/// Pure function producing the statement for one run
pub type Generator<E> =
    Arc<dyn Fn(&QueryParameters<E>) -> Result<Statement, StoreError> + Send + Sync>;

/// Declarative description of a query, validated by [`Query::new`]
pub struct QuerySpec<E> {
    name: String,
    generate: Option<Generator<E>>,
    transform: Option<Transform<E>>,
    kind: Option<String>,
}

impl<E: Model> QuerySpec<E> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            generate: None,
            transform: None,
            kind: None,
        }
    }

    pub fn generate<F>(mut self, generate: F) -> Self
    where
        F: Fn(&QueryParameters<E>) -> Result<Statement, StoreError> + Send + Sync + 'static,
    {
        self.generate = Some(Arc::new(generate));
        self
    }

    /// Custom transform; exclusive with [`kind`](Self::kind)
    pub fn transform<F>(mut self, transform: F) -> Self
    where
        F: Fn(&QueryParameters<E>) -> Result<QueryOutput<E>, StoreError> + Send + Sync + 'static,
    {
        self.transform = Some(Arc::new(transform));
        self
    }

    /// Name of a registered transform, resolved at construction
    pub fn kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }
}

pub struct Query<E> {
    name: QueryName,
    generate: Generator<E>,
    transform: Option<Transform<E>>,
    kind: Option<String>,
    hooks: HookChain<QueryParameters<E>>,
}

impl<E> fmt::Debug for Query<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("custom_transform", &(self.transform.is_some() && self.kind.is_none()))
            .field("hooks", &self.hooks)
            .finish()
    }
}

impl<E> Query<E> {
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Registered transform type, if the query was built with one
    pub fn transform_type(&self) -> Option<&str> {
        self.kind.as_deref()
    }

    pub fn hooks(&self) -> &HookChain<QueryParameters<E>> {
        &self.hooks
    }
}

impl<E: Model> Query<E> {
    /// Build a query resolving transform types against the built-in transforms
    pub fn new(spec: QuerySpec<E>) -> Result<Self, StoreError> {
        Self::with_transforms(spec, &TransformRegistry::new())
    }

    pub fn with_transforms(
        spec: QuerySpec<E>,
        transforms: &TransformRegistry<E>,
    ) -> Result<Self, StoreError> {
        let name = QueryName::new(&spec.name)?;

        let generate = spec
            .generate
            .ok_or_else(|| StoreError::MissingGenerator(spec.name.clone()))?;

        let transform = match (spec.transform, &spec.kind) {
            (Some(_), Some(_)) => return Err(StoreError::ConflictingTransform(spec.name)),
            (Some(transform), None) => Some(transform),
            (None, Some(kind)) => Some(
                transforms
                    .get(kind)
                    .ok_or_else(|| StoreError::UnknownTransform(kind.clone()))?,
            ),
            (None, None) => None,
        };

        Ok(Self {
            name,
            generate,
            transform,
            kind: spec.kind,
            hooks: HookChain::new(),
        })
    }

    /// Generate the statement without executing it
    pub fn generate(&self, params: &QueryParameters<E>) -> Result<Statement, StoreError> {
        (self.generate)(params)
    }

    fn apply_transform(&self, params: &QueryParameters<E>) -> Result<QueryOutput<E>, StoreError> {
        match &self.transform {
            Some(transform) => transform(params),
            None => single_row(params),
        }
    }

    /// Execute the query against the connection of `params.conf()`
    ///
    /// Executor failures pass through the config's error normalizer; hook and
    /// transform failures are returned as raised. After-hook failures surface
    /// after the database effect has already happened.
    pub async fn run(
        self: &Arc<Self>,
        params: &mut QueryParameters<E>,
    ) -> Result<QueryOutput<E>, StoreError> {
        params.query = Some(Arc::clone(self));

        self.hooks
            .run(Some(HookPhase::Before), params)
            .await
            .map_err(StoreError::Hook)?;

        let statement = self.generate(params)?;
        let conf = Arc::clone(params.conf());
        let executor = conf.executor()?;

        debug_log!("[{}] {}", self.name, statement.text);
        trace_log!("[{}] values: {:?}", self.name, statement.values);

        let response = executor
            .query(&statement)
            .await
            .map_err(|e| StoreError::Database(conf.normalize_error(e)))?;

        debug_log!("[{}] {} row(s)", self.name, response.row_count);
        params.res = Some(response);

        let output = self.apply_transform(params)?;
        params.ret = Some(output);

        self.hooks
            .run(Some(HookPhase::After), params)
            .await
            .map_err(StoreError::Hook)?;

        Ok(params.ret.clone().unwrap_or(QueryOutput::Empty))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{user_config, user_row, RecordingExecutor, User};
    use crate::transform::BOOLEAN;
    use type_mapping::SqlValue;

    fn select_all(params: &QueryParameters<User>) -> Result<Statement, StoreError> {
        Ok(Statement::new(
            format!("SELECT * FROM {}", params.conf().table()),
            vec![],
        ))
    }

    #[test]
    fn test_invalid_name_is_rejected() {
        let result = Query::new(QuerySpec::<User>::new("0bad").generate(select_all));
        assert!(matches!(result, Err(StoreError::Validation(_))));
    }

    #[test]
    fn test_missing_generator_is_rejected() {
        let result = Query::new(QuerySpec::<User>::new("ok"));
        assert!(matches!(result, Err(StoreError::MissingGenerator(name)) if name == "ok"));
    }

    #[test]
    fn test_transform_and_type_are_exclusive() {
        let result = Query::new(
            QuerySpec::<User>::new("ok")
                .generate(select_all)
                .transform(|_| Ok(QueryOutput::Empty))
                .kind(BOOLEAN),
        );
        assert!(matches!(result, Err(StoreError::ConflictingTransform(_))));
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let result = Query::new(
            QuerySpec::<User>::new("ok")
                .generate(select_all)
                .kind("nonexistent"),
        );
        assert!(matches!(result, Err(StoreError::UnknownTransform(kind)) if kind == "nonexistent"));
    }

    #[test]
    fn test_type_is_recorded() {
        let query = Query::new(QuerySpec::<User>::new("ok").generate(select_all).kind(BOOLEAN))
            .unwrap();
        assert_eq!(query.name(), "ok");
        assert_eq!(query.transform_type(), Some(BOOLEAN));
    }

    #[tokio::test]
    async fn test_default_transform_and_singular_diverge_on_many_rows() {
        let executor = RecordingExecutor::new();
        executor.respond_with_rows(vec![user_row(1, "x"), user_row(1, "x-dup")]);
        let conf = user_config();
        conf.setup(executor.clone());

        let untyped = Arc::new(Query::new(QuerySpec::new("lookup").generate(select_all)).unwrap());
        let mut params = QueryParameters::new(&conf);
        let err = untyped.run(&mut params).await.unwrap_err();
        assert!(matches!(err, StoreError::UnexpectedRowCount { actual: 2, .. }));

        executor.respond_with_rows(vec![user_row(1, "x"), user_row(1, "x-dup")]);
        let typed = Arc::new(
            Query::new(QuerySpec::new("lookup").generate(select_all).kind("singular")).unwrap(),
        );
        let mut params = QueryParameters::new(&conf);
        let output = typed.run(&mut params).await.unwrap();
        assert_eq!(output, QueryOutput::Entity(User::new(1, "x")));
    }

    #[tokio::test]
    async fn test_run_sets_scratch_fields() {
        let executor = RecordingExecutor::new();
        executor.respond_with_rows(vec![user_row(5, "five")]);
        let conf = user_config();
        conf.setup(executor.clone());

        let query = Arc::new(Query::new(QuerySpec::new("lookup").generate(select_all)).unwrap());
        let mut params = QueryParameters::new(&conf);
        query.run(&mut params).await.unwrap();

        assert_eq!(params.query_name(), Some("lookup"));
        assert_eq!(params.res.as_ref().map(|r| r.row_count), Some(1));
        assert_eq!(params.ret, Some(QueryOutput::Entity(User::new(5, "five"))));
    }

    #[tokio::test]
    async fn test_before_hook_failure_skips_database() {
        let executor = RecordingExecutor::new();
        let conf = user_config();
        conf.setup(executor.clone());

        let query = Arc::new(Query::new(QuerySpec::new("lookup").generate(select_all)).unwrap());
        query.hooks().add_sync(Some(HookPhase::Before), |_| {
            Err(anyhow::anyhow!("vetoed"))
        });

        let mut params = QueryParameters::new(&conf);
        let err = query.run(&mut params).await.unwrap_err();

        assert!(matches!(&err, StoreError::Hook(e) if e.to_string() == "vetoed"));
        assert!(executor.statements().is_empty());
        assert!(params.res.is_none());
    }

    #[tokio::test]
    async fn test_executor_failure_is_normalized() {
        let executor = RecordingExecutor::new();
        executor.fail_with("connection reset");
        let conf = crate::testing::user_config_with_normalizer(|e| {
            anyhow::anyhow!("normalized: {}", e)
        });
        conf.setup(executor.clone());

        let query = Arc::new(Query::new(QuerySpec::new("lookup").generate(select_all)).unwrap());
        let after_ran = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let flag = Arc::clone(&after_ran);
        query.hooks().add_sync(Some(HookPhase::After), move |_| {
            flag.store(true, std::sync::atomic::Ordering::SeqCst);
            Ok(())
        });

        let mut params = QueryParameters::new(&conf);
        let err = query.run(&mut params).await.unwrap_err();

        assert_eq!(err.to_string(), "Database error: normalized: connection reset");
        assert!(!after_ran.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_hook_errors_are_not_normalized() {
        let executor = RecordingExecutor::new();
        let conf = crate::testing::user_config_with_normalizer(|e| {
            anyhow::anyhow!("normalized: {}", e)
        });
        conf.setup(executor.clone());

        let query = Arc::new(Query::new(QuerySpec::new("lookup").generate(select_all)).unwrap());
        query.hooks().add_sync(Some(HookPhase::Before), |_| {
            Err(anyhow::anyhow!("raw hook error"))
        });

        let mut params = QueryParameters::new(&conf);
        let err = query.run(&mut params).await.unwrap_err();
        assert_eq!(err.to_string(), "raw hook error");
    }

    #[tokio::test]
    async fn test_after_hook_failure_surfaces_after_database_call() {
        let executor = RecordingExecutor::new();
        executor.respond_with_affected(1);
        let conf = user_config();
        conf.setup(executor.clone());

        let query = Arc::new(
            Query::new(QuerySpec::new("touch").generate(select_all).kind(BOOLEAN)).unwrap(),
        );
        query.hooks().add_sync(Some(HookPhase::After), |_| {
            Err(anyhow::anyhow!("notification failed"))
        });

        let mut params = QueryParameters::new(&conf);
        let err = query.run(&mut params).await.unwrap_err();

        assert!(matches!(err, StoreError::Hook(_)));
        assert_eq!(executor.statements().len(), 1);
        assert_eq!(params.ret, Some(QueryOutput::Boolean(true)));
    }

    #[tokio::test]
    async fn test_after_hook_can_replace_result() {
        let executor = RecordingExecutor::new();
        executor.respond_with_affected(3);
        let conf = user_config();
        conf.setup(executor.clone());

        let query = Arc::new(
            Query::new(QuerySpec::new("touch").generate(select_all).kind(BOOLEAN)).unwrap(),
        );
        query.hooks().add_sync(Some(HookPhase::After), |params| {
            let affected = params.response()?.row_count as i64;
            params.ret = Some(QueryOutput::Scalar(SqlValue::BigInt(affected)));
            Ok(())
        });

        let mut params = QueryParameters::new(&conf);
        let output = query.run(&mut params).await.unwrap();
        assert_eq!(output, QueryOutput::Scalar(SqlValue::BigInt(3)));
    }

    #[tokio::test]
    async fn test_transform_errors_propagate() {
        let executor = RecordingExecutor::new();
        let conf = user_config();
        conf.setup(executor.clone());

        let query = Arc::new(
            Query::new(
                QuerySpec::new("broken")
                    .generate(select_all)
                    .transform(|_| Err(StoreError::Transform(anyhow::anyhow!("bad shape")))),
            )
            .unwrap(),
        );

        let mut params = QueryParameters::new(&conf);
        let err = query.run(&mut params).await.unwrap_err();
        assert_eq!(err.to_string(), "Transform error: bad shape");
    }

    #[tokio::test]
    async fn test_run_without_connection_fails() {
        let conf = user_config();
        let query = Arc::new(Query::new(QuerySpec::new("lookup").generate(select_all)).unwrap());

        let mut params = QueryParameters::new(&conf);
        let err = query.run(&mut params).await.unwrap_err();
        assert!(matches!(err, StoreError::NotConnected(table) if table == "users"));
    }
}
