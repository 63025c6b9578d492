//! Pagination Service
//!
//! Runs a composed [`QuerySpec`] against a repository in one of two modes.
//!
//! - **Offset** (`page` present): skip `take * (page - 1)` rows and report the
//!   total number of matching rows.
//! - **Cursor** (default): return at most `take` rows and, when the page is
//!   full, a `next` link that repeats the request with an identity bound on
//!   the last row returned.
//!
//! Both modes order by `createdAt ASC` when the caller gave no ordering, and
//! always end the ordering with the identity field so rows sharing a
//! timestamp come back in a stable order.

use url::Url;

use crate::application::dto::{Cursor, CursorPage, OffsetPage, Page};
use crate::domain::query::{Direction, FindOptions, OrderSpec, PageMode, Predicate, QuerySpec};
use crate::domain::value_objects::{CREATED_AT_FIELD, ID_FIELD};
use crate::domain::Entity;
use crate::infrastructure::database::Backend;
use crate::infrastructure::metrics;
use crate::infrastructure::repositories::EntityRepository;
use crate::shared::error::AppError;

/// Cursor key for ascending listings.
pub const CURSOR_AFTER_KEY: &str = "where__id__more_than";

/// Cursor key for descending listings.
pub const CURSOR_BEFORE_KEY: &str = "where__id__less_than";

/// Executes paginated reads and builds continuation links.
#[derive(Debug, Clone)]
pub struct PaginationService {
    base_url: Url,
}

impl PaginationService {
    /// `base_url` is the server root, e.g. `http://localhost:3000/`.
    pub fn new(base_url: Url) -> Self {
        Self { base_url }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Fetch one page of `E`.
    ///
    /// `scope` holds predicates fixed by the caller (e.g. the parent post of
    /// a comment listing); they are applied before the request's own
    /// predicates. `path` is relative to the base URL and names the listing
    /// in `next` links.
    pub async fn paginate<E, B>(
        &self,
        repository: &EntityRepository<E, B>,
        spec: &QuerySpec,
        scope: Vec<Predicate>,
        path: &str,
    ) -> Result<Page<E>, AppError>
    where
        E: Entity,
        B: Backend,
    {
        let orderings = effective_orderings(&spec.orderings);
        let mut predicates = scope;
        predicates.extend(spec.predicates.iter().cloned());

        match spec.page_mode {
            PageMode::Offset(_) => {
                metrics::record_pagination("offset");
                self.offset_paginate(repository, spec, predicates, orderings)
                    .await
            }
            PageMode::Cursor => {
                metrics::record_pagination("cursor");
                self.cursor_paginate(repository, spec, predicates, orderings, path)
                    .await
            }
        }
    }

    async fn offset_paginate<E, B>(
        &self,
        repository: &EntityRepository<E, B>,
        spec: &QuerySpec,
        predicates: Vec<Predicate>,
        orderings: Vec<OrderSpec>,
    ) -> Result<Page<E>, AppError>
    where
        E: Entity,
        B: Backend,
    {
        let total = repository
            .count(None, &predicates)
            .await
            .map_err(AppError::QueryExecution)?;

        let options = FindOptions {
            predicates,
            orderings,
            skip: spec.skip(),
            take: Some(u64::from(spec.page_size)),
        };
        let data = repository
            .find(None, &options)
            .await
            .map_err(AppError::QueryExecution)?;

        tracing::debug!(table = repository.table(), rows = data.len(), total, "Offset page served");
        Ok(Page::Offset(OffsetPage { data, total }))
    }

    async fn cursor_paginate<E, B>(
        &self,
        repository: &EntityRepository<E, B>,
        spec: &QuerySpec,
        predicates: Vec<Predicate>,
        orderings: Vec<OrderSpec>,
        path: &str,
    ) -> Result<Page<E>, AppError>
    where
        E: Entity,
        B: Backend,
    {
        let direction = orderings
            .iter()
            .find(|o| o.field == ID_FIELD)
            .map(|o| o.direction)
            .unwrap_or_default();

        let options = FindOptions {
            predicates,
            orderings,
            skip: None,
            take: Some(u64::from(spec.page_size)),
        };
        let data = repository
            .find(None, &options)
            .await
            .map_err(AppError::QueryExecution)?;

        let after = if data.len() == spec.page_size as usize {
            data.last().map(Entity::id)
        } else {
            None
        };
        let next = after
            .map(|id| self.next_link(path, &spec.params, direction, id))
            .transpose()?;

        tracing::debug!(
            table = repository.table(),
            rows = data.len(),
            ?after,
            "Cursor page served"
        );
        Ok(Page::Cursor(CursorPage {
            count: data.len(),
            cursor: Cursor { after },
            next,
            data,
        }))
    }

    /// Absolute link to the page after `last_id`.
    ///
    /// Every original parameter is echoed except the cursor keys, which are
    /// replaced by a fresh bound in the listing's direction.
    pub fn next_link(
        &self,
        path: &str,
        params: &[(String, String)],
        direction: Direction,
        last_id: i64,
    ) -> Result<String, AppError> {
        let mut url = self
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| AppError::Internal(format!("Invalid listing path '{}': {}", path, e)))?;

        let cursor_key = match direction {
            Direction::Asc => CURSOR_AFTER_KEY,
            Direction::Desc => CURSOR_BEFORE_KEY,
        };

        url.query_pairs_mut()
            .extend_pairs(
                params
                    .iter()
                    .filter(|(key, _)| key != CURSOR_AFTER_KEY && key != CURSOR_BEFORE_KEY),
            )
            .append_pair(cursor_key, &last_id.to_string());

        Ok(url.into())
    }
}

/// Caller orderings, defaulted and completed with the identity tie-break.
fn effective_orderings(requested: &[OrderSpec]) -> Vec<OrderSpec> {
    let mut orderings = if requested.is_empty() {
        vec![OrderSpec::new(CREATED_AT_FIELD, Direction::Asc)]
    } else {
        requested.to_vec()
    };

    if !orderings.iter().any(|o| o.field == ID_FIELD) {
        let direction = orderings
            .iter()
            .find(|o| o.field == CREATED_AT_FIELD)
            .or_else(|| orderings.first())
            .map(|o| o.direction)
            .unwrap_or_default();
        orderings.push(OrderSpec::new(ID_FIELD, direction));
    }
    orderings
}
