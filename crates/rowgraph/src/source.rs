//! Pull-based row sources.

use rowgraph_core::{Result, Row};

/// Produces rows one at a time.
///
/// `Ok(None)` means the source is exhausted. Errors are handed to the caller
/// unchanged.
pub trait RowSource {
    fn pull(&mut self) -> Result<Option<Row>>;
}

impl RowSource for std::vec::IntoIter<Row> {
    fn pull(&mut self) -> Result<Option<Row>> {
        Ok(self.next())
    }
}

impl<S: RowSource + ?Sized> RowSource for &mut S {
    fn pull(&mut self) -> Result<Option<Row>> {
        (**self).pull()
    }
}

impl<S: RowSource + ?Sized> RowSource for Box<S> {
    fn pull(&mut self) -> Result<Option<Row>> {
        (**self).pull()
    }
}

/// Adapts any iterator of fallible rows into a [`RowSource`].
#[derive(Debug, Clone)]
pub struct IterSource<I> {
    inner: I,
}

impl<I> IterSource<I>
where
    I: Iterator<Item = Result<Row>>,
{
    pub fn new(rows: impl IntoIterator<IntoIter = I>) -> Self {
        Self {
            inner: rows.into_iter(),
        }
    }
}

impl<I> RowSource for IterSource<I>
where
    I: Iterator<Item = Result<Row>>,
{
    fn pull(&mut self) -> Result<Option<Row>> {
        self.inner.next().transpose()
    }
}
