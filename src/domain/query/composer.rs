//! Query composer.
//!
//! Folds an ordered list of raw query parameters into a [`QuerySpec`]:
//! `where__*` keys become predicates, `order__*` keys become orderings and
//! `take` / `page` select the page size and the pagination mode. Keys with
//! any other shape are left for other consumers.

use super::error::FilterError;
use super::predicate::{FilterParser, OrderSpec, Predicate, ORDER_PREFIX, WHERE_PREFIX, KEY_SEPARATOR};
use crate::domain::value_objects::{Schema, CREATED_AT_FIELD, ID_FIELD};

/// Parameter selecting the page size.
pub const TAKE_PARAM: &str = "take";

/// Parameter selecting offset pagination and the page number.
pub const PAGE_PARAM: &str = "page";

/// Page size used when `take` is absent.
pub const DEFAULT_TAKE: u32 = 20;

/// Upper bound applied to `take`.
pub const MAX_TAKE: u32 = 100;

/// Which pagination strategy a query uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageMode {
    /// Page-number pagination; the number is 1-based.
    Offset(u32),
    /// Keyset pagination on the identity field.
    Cursor,
}

/// Backend-agnostic description of one read request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySpec {
    pub predicates: Vec<Predicate>,
    pub orderings: Vec<OrderSpec>,
    /// Always greater than zero.
    pub page_size: u32,
    pub page_mode: PageMode,
    /// The raw parameters in input order, echoed into continuation links.
    pub params: Vec<(String, String)>,
}

impl QuerySpec {
    /// Rows skipped before the page starts (offset mode only).
    pub fn skip(&self) -> Option<u64> {
        match self.page_mode {
            PageMode::Offset(page) => Some(u64::from(self.page_size) * u64::from(page - 1)),
            PageMode::Cursor => None,
        }
    }
}

/// Composes [`QuerySpec`]s from raw parameters.
#[derive(Debug, Clone)]
pub struct QueryComposer {
    parser: FilterParser,
    default_take: u32,
    max_take: u32,
}

impl Default for QueryComposer {
    fn default() -> Self {
        Self::new(FilterParser::default(), DEFAULT_TAKE, MAX_TAKE)
    }
}

impl QueryComposer {
    pub fn new(parser: FilterParser, default_take: u32, max_take: u32) -> Self {
        let max_take = max_take.max(1);
        Self {
            parser,
            default_take: default_take.clamp(1, max_take),
            max_take,
        }
    }

    pub fn parser(&self) -> &FilterParser {
        &self.parser
    }

    /// Build a query from parameters in input order.
    ///
    /// A later key with the same field and operator replaces the earlier one
    /// in place, so the resulting order always follows first appearance.
    pub fn compose<I, K, V>(&self, schema: &Schema, params: I) -> Result<QuerySpec, FilterError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let params: Vec<(String, String)> = params
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();

        let where_prefix = format!("{}{}", WHERE_PREFIX, KEY_SEPARATOR);
        let order_prefix = format!("{}{}", ORDER_PREFIX, KEY_SEPARATOR);

        let mut predicates: Vec<Predicate> = Vec::new();
        let mut orderings: Vec<OrderSpec> = Vec::new();
        let mut page_size = self.default_take;
        let mut page = None;

        for (key, value) in &params {
            if key.starts_with(&where_prefix) {
                let predicate = self.parser.parse(schema, key, value)?;
                match predicates
                    .iter_mut()
                    .find(|p| p.field == predicate.field && p.operator == predicate.operator)
                {
                    Some(existing) => *existing = predicate,
                    None => predicates.push(predicate),
                }
            } else if key.starts_with(&order_prefix) {
                let order = self.parser.parse_order(schema, key, value)?;
                match orderings.iter_mut().find(|o| o.field == order.field) {
                    Some(existing) => *existing = order,
                    None => orderings.push(order),
                }
            } else if key == TAKE_PARAM {
                let take = parse_positive(key, value)?;
                if take > self.max_take {
                    tracing::debug!(take, max = self.max_take, "Clamping page size");
                }
                page_size = take.min(self.max_take);
            } else if key == PAGE_PARAM {
                page = Some(parse_positive(key, value)?);
            }
        }

        let page_mode = match page {
            Some(number) => PageMode::Offset(number),
            None => PageMode::Cursor,
        };
        if page_mode == PageMode::Cursor {
            check_cursor_orderings(&orderings)?;
        }

        tracing::debug!(
            table = schema.table,
            predicates = predicates.len(),
            orderings = orderings.len(),
            page_size,
            ?page_mode,
            "Composed query"
        );

        Ok(QuerySpec {
            predicates,
            orderings,
            page_size,
            page_mode,
            params,
        })
    }
}

/// Cursor links bound on `id`, so a cursor listing must sort in `id` order:
/// only `createdAt` and `id`, both in the same direction.
fn check_cursor_orderings(orderings: &[OrderSpec]) -> Result<(), FilterError> {
    let Some(leading) = orderings.first() else {
        return Ok(());
    };
    match orderings.iter().find(|o| {
        (o.field != ID_FIELD && o.field != CREATED_AT_FIELD) || o.direction != leading.direction
    }) {
        Some(order) => Err(FilterError::CursorOrdering {
            key: format!("{}{}{}", ORDER_PREFIX, KEY_SEPARATOR, order.field),
        }),
        None => Ok(()),
    }
}

fn parse_positive(key: &str, raw: &str) -> Result<u32, FilterError> {
    let number: i64 = raw
        .trim()
        .parse()
        .map_err(|_| FilterError::type_coercion(key, raw, "integer"))?;
    if number < 1 {
        return Err(FilterError::malformed_operand(key, raw, "must be at least 1"));
    }
    u32::try_from(number).map_err(|_| FilterError::malformed_operand(key, raw, "too large"))
}
