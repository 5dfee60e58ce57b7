use crate::codec;
use crate::collection::{Collection, IntoSortTerms, QueryOptions};
use crate::common::{StoredMap, Value};
use crate::errors::PralineResult;
use crate::piece::Piece;
use crate::store::RawCursor;
use std::fmt::{Debug, Formatter};

/// A lazy, chainable query over one collection.
///
/// A cursor holds its filter and options; the live result stream is created
/// on first pull and dropped by every chained refinement, so the query
/// re-runs with the new state. Iteration is one-pass and non-restartable;
/// [`Cursor::each`] and [`Cursor::reset`] re-issue the query from the
/// beginning.
///
/// Each raw result document materializes into a [Piece] bound to the
/// cursor's collection, cache pre-loaded and ownership threaded into every
/// embedded container.
pub struct Cursor {
    collection: Collection,
    filter: StoredMap,
    options: QueryOptions,
    stream: Option<RawCursor>,
}

impl Cursor {
    pub(crate) fn open(collection: Collection, filter: StoredMap, options: QueryOptions) -> Cursor {
        Cursor {
            collection,
            filter,
            options,
            stream: None,
        }
    }

    /// Appends sort terms, in call order. Chained calls refine; they never
    /// replace earlier terms.
    ///
    /// Terms can be field names (`"weight"`, ascending), token lists
    /// (`["weight", "down", "name"]`, where a direction token modifies the field
    /// before it), or pre-paired terms (`("weight", SortOrder::Descending)`).
    pub fn sort<T: IntoSortTerms>(mut self, terms: T) -> PralineResult<Cursor> {
        self.options.sort_spec_mut().apply(terms.into_terms())?;
        self.stream = None;
        Ok(self)
    }

    /// Skips the first `skip` results.
    pub fn skip(mut self, skip: u64) -> Cursor {
        self.options = self.options.skip(skip);
        self.stream = None;
        self
    }

    /// Caps the number of results.
    pub fn limit(mut self, limit: u64) -> Cursor {
        self.options = self.options.limit(limit);
        self.stream = None;
        self
    }

    /// Projects results down to the given fields.
    pub fn project(mut self, fields: Vec<String>) -> Cursor {
        self.options = self.options.project(fields);
        self.stream = None;
        self
    }

    /// Adds (or overwrites) one equality filter term and re-runs the query;
    /// the explicit spelling of per-field scoping.
    pub fn refine(mut self, field: &str, value: impl Into<Value>) -> PralineResult<Cursor> {
        let encoded = codec::encode(&value.into())?;
        self.filter.insert(field.to_string(), encoded);
        self.stream = None;
        Ok(self)
    }

    /// Counts matching documents. Delegates straight to the store; skip and
    /// limit do not apply.
    pub fn size(&self) -> PralineResult<u64> {
        self.collection
            .backend()
            .count(&self.collection.qualified_name(), &self.filter)
    }

    /// Restarts the stream; the next pull re-issues the query.
    pub fn reset(&mut self) {
        self.stream = None;
    }

    /// Re-issues the query and returns the first result, or `None`.
    pub fn first(&mut self) -> PralineResult<Option<Piece>> {
        self.reset();
        self.next().transpose()
    }

    /// Re-issues the query and walks every result from the beginning.
    pub fn each(&mut self, mut f: impl FnMut(Piece) -> PralineResult<()>) -> PralineResult<()> {
        self.reset();
        while let Some(result) = self.next() {
            f(result?)?;
        }
        Ok(())
    }

    fn ensure_stream(&mut self) -> PralineResult<()> {
        if self.stream.is_none() {
            let stream = self.collection.backend().find(
                &self.collection.qualified_name(),
                &self.filter,
                &self.options,
            )?;
            self.stream = Some(stream);
        }
        Ok(())
    }
}

impl Iterator for Cursor {
    type Item = PralineResult<Piece>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Err(err) = self.ensure_stream() {
            // park an exhausted stream so a failing query doesn't retry forever
            self.stream = Some(RawCursor::empty());
            return Some(Err(err));
        }
        let stream = self.stream.as_mut()?;
        match stream.next() {
            Some(Ok(raw)) => Some(Piece::materialize(self.collection.clone(), &raw)),
            Some(Err(err)) => Some(Err(err)),
            None => None,
        }
    }
}

impl Debug for Cursor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Cursor({}, filter: {} terms)",
            self.collection.qualified_name(),
            self.filter.len()
        )
    }
}
