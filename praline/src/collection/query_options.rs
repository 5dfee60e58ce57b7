use crate::common::{
    FieldMap, Key, SortOrder, Value, DOC_ID, OPT_FIELDS, OPT_HINT, OPT_LIMIT, OPT_SKIP,
    OPT_SNAPSHOT, OPT_SORT, OPT_TIMEOUT,
};
use crate::errors::{ErrorKind, PralineError, PralineResult};

/// An accumulated sort specification: field names paired with directions, in
/// call order. Chained refinements append; they never replace earlier terms.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SortSpec {
    terms: Vec<(String, SortOrder)>,
}

impl SortSpec {
    pub fn new() -> Self {
        SortSpec { terms: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn terms(&self) -> &[(String, SortOrder)] {
        &self.terms
    }

    /// Appends sort terms.
    ///
    /// A [`SortTerm::Field`] sorts ascending; a [`SortTerm::Direction`]
    /// modifies the immediately preceding field and fails with
    /// [`ErrorKind::IndexDirection`] when there is none.
    pub fn apply(&mut self, terms: Vec<SortTerm>) -> PralineResult<()> {
        for term in terms {
            match term {
                SortTerm::Field(field) => self.terms.push((field, SortOrder::Ascending)),
                SortTerm::Pair(field, order) => self.terms.push((field, order)),
                SortTerm::Direction(order) => match self.terms.last_mut() {
                    Some(last) => last.1 = order,
                    None => {
                        log::error!("Sort direction given without a preceding field");
                        return Err(PralineError::new(
                            "Sort direction given without a preceding field",
                            ErrorKind::IndexDirection,
                        ));
                    }
                },
            }
        }
        Ok(())
    }
}

/// One term of a sort specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortTerm {
    /// A field name, ascending unless a direction follows.
    Field(String),
    /// A direction applying to the preceding field.
    Direction(SortOrder),
    /// A pre-paired field and direction.
    Pair(String, SortOrder),
}

fn term_from_token(token: &str) -> SortTerm {
    if SortOrder::is_token(token) {
        // is_token guarantees from_token succeeds
        SortTerm::Direction(SortOrder::from_token(token).unwrap_or(SortOrder::Ascending))
    } else {
        SortTerm::Field(token.to_string())
    }
}

/// Conversion into sort terms, so [`Cursor::sort`](crate::collection::Cursor::sort)
/// accepts single fields, pre-paired terms, and token lists alike.
pub trait IntoSortTerms {
    fn into_terms(self) -> Vec<SortTerm>;
}

impl IntoSortTerms for &str {
    fn into_terms(self) -> Vec<SortTerm> {
        vec![term_from_token(self)]
    }
}

impl IntoSortTerms for String {
    fn into_terms(self) -> Vec<SortTerm> {
        vec![term_from_token(&self)]
    }
}

impl IntoSortTerms for SortOrder {
    fn into_terms(self) -> Vec<SortTerm> {
        vec![SortTerm::Direction(self)]
    }
}

impl IntoSortTerms for (&str, SortOrder) {
    fn into_terms(self) -> Vec<SortTerm> {
        vec![SortTerm::Pair(self.0.to_string(), self.1)]
    }
}

impl IntoSortTerms for (String, SortOrder) {
    fn into_terms(self) -> Vec<SortTerm> {
        vec![SortTerm::Pair(self.0, self.1)]
    }
}

impl<const N: usize> IntoSortTerms for [&str; N] {
    fn into_terms(self) -> Vec<SortTerm> {
        self.iter().map(|token| term_from_token(token)).collect()
    }
}

impl IntoSortTerms for Vec<&str> {
    fn into_terms(self) -> Vec<SortTerm> {
        self.iter().map(|token| term_from_token(token)).collect()
    }
}

impl IntoSortTerms for Vec<SortTerm> {
    fn into_terms(self) -> Vec<SortTerm> {
        self
    }
}

/// Options controlling a collection query: field projection, pagination,
/// sorting, and pass-through hints for the backing store.
///
/// Recognized option keys inside a filter map are pulled out into a
/// `QueryOptions` at cursor construction; see [`QueryOptions::extract_from`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryOptions {
    projection: Option<Vec<String>>,
    skip: Option<u64>,
    limit: Option<u64>,
    sort: SortSpec,
    hint: Option<String>,
    snapshot: bool,
    timeout: Option<bool>,
}

impl QueryOptions {
    pub fn new() -> Self {
        QueryOptions::default()
    }

    /// Options projecting the document id only, the default hydration
    /// profile for single-document finders.
    pub fn id_only() -> Self {
        QueryOptions {
            projection: Some(vec![DOC_ID.to_string()]),
            ..QueryOptions::default()
        }
    }

    pub fn project(mut self, fields: Vec<String>) -> Self {
        self.projection = Some(fields);
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn sort_by(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sort.terms.push((field.into(), order));
        self
    }

    pub fn projection(&self) -> Option<&[String]> {
        self.projection.as_deref()
    }

    pub fn skip_count(&self) -> Option<u64> {
        self.skip
    }

    pub fn limit_count(&self) -> Option<u64> {
        self.limit
    }

    pub fn sort_spec(&self) -> &SortSpec {
        &self.sort
    }

    pub(crate) fn sort_spec_mut(&mut self) -> &mut SortSpec {
        &mut self.sort
    }

    pub fn hint(&self) -> Option<&str> {
        self.hint.as_deref()
    }

    pub fn snapshot(&self) -> bool {
        self.snapshot
    }

    pub fn timeout(&self) -> Option<bool> {
        self.timeout
    }

    /// Pulls recognized option keys out of a filter map, leaving only query
    /// predicates behind.
    ///
    /// Option values of the wrong shape fail with
    /// [`ErrorKind::InvalidOperation`]; bad sort direction tokens fail with
    /// [`ErrorKind::IndexDirection`].
    pub fn extract_from(filter: &mut FieldMap) -> PralineResult<QueryOptions> {
        let mut options = QueryOptions::new();

        if let Some(value) = filter.shift_remove(&Key::name(OPT_FIELDS)) {
            options.projection = Some(parse_projection(&value)?);
        }
        if let Some(value) = filter.shift_remove(&Key::name(OPT_SKIP)) {
            options.skip = Some(parse_count(OPT_SKIP, &value)?);
        }
        if let Some(value) = filter.shift_remove(&Key::name(OPT_LIMIT)) {
            options.limit = Some(parse_count(OPT_LIMIT, &value)?);
        }
        if let Some(value) = filter.shift_remove(&Key::name(OPT_SORT)) {
            options.sort.apply(parse_sort_value(&value)?)?;
        }
        if let Some(value) = filter.shift_remove(&Key::name(OPT_HINT)) {
            match value.as_str() {
                Some(hint) => options.hint = Some(hint.to_string()),
                None => return Err(bad_option(OPT_HINT, "a string", &value)),
            }
        }
        if let Some(value) = filter.shift_remove(&Key::name(OPT_SNAPSHOT)) {
            match value.as_bool() {
                Some(snapshot) => options.snapshot = snapshot,
                None => return Err(bad_option(OPT_SNAPSHOT, "a bool", &value)),
            }
        }
        if let Some(value) = filter.shift_remove(&Key::name(OPT_TIMEOUT)) {
            match value.as_bool() {
                Some(timeout) => options.timeout = Some(timeout),
                None => return Err(bad_option(OPT_TIMEOUT, "a bool", &value)),
            }
        }

        Ok(options)
    }
}

fn bad_option(option: &str, expected: &str, value: &Value) -> PralineError {
    log::error!("Query option {} must be {}, got: {}", option, expected, value);
    PralineError::new(
        &format!("Query option {} must be {}", option, expected),
        ErrorKind::InvalidOperation,
    )
}

fn parse_projection(value: &Value) -> PralineResult<Vec<String>> {
    match value {
        Value::String(field) => Ok(vec![field.clone()]),
        Value::Array(array) => {
            let mut fields = Vec::new();
            for element in array.values() {
                match element.as_str() {
                    Some(field) => fields.push(field.to_string()),
                    None => return Err(bad_option(OPT_FIELDS, "field names", &element)),
                }
            }
            Ok(fields)
        }
        other => Err(bad_option(OPT_FIELDS, "field names", other)),
    }
}

fn parse_count(option: &str, value: &Value) -> PralineResult<u64> {
    match value.as_int() {
        Some(count) if count >= 0 => Ok(count as u64),
        _ => Err(bad_option(option, "a non-negative integer", value)),
    }
}

fn parse_sort_value(value: &Value) -> PralineResult<Vec<SortTerm>> {
    let elements = match value {
        Value::String(token) => return Ok(vec![term_from_token(token)]),
        Value::Array(array) => array.values(),
        other => return Err(bad_option(OPT_SORT, "sort terms", other)),
    };

    let mut terms = Vec::new();
    for element in elements {
        match &element {
            Value::String(token) => terms.push(term_from_token(token)),
            Value::Array(pair) => {
                let pair = pair.values();
                let field = pair
                    .first()
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| bad_option(OPT_SORT, "a [field, direction] pair", &element))?
                    .to_string();
                let order = match pair.get(1) {
                    Some(Value::String(token)) => SortOrder::from_token(token)?,
                    Some(Value::Int(wire)) => SortOrder::from_wire(*wire)?,
                    None => SortOrder::Ascending,
                    Some(other) => {
                        return Err(bad_option(OPT_SORT, "a direction token", other));
                    }
                };
                terms.push(SortTerm::Pair(field, order));
            }
            other => return Err(bad_option(OPT_SORT, "sort terms", other)),
        }
    }
    Ok(terms)
}
