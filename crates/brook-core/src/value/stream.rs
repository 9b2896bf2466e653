use std::fmt;

use futures_util::stream::{self, BoxStream, StreamExt};
use tokio::sync::Mutex;

use crate::error::Result;

use super::Value;

/// An element source whose `next` may suspend. Backs both the synchronous
/// iteration protocol (`Value::Iterator`) and the asynchronous one
/// (`Value::AsyncIterator`); the protocol tag lives on the `Value` variant,
/// not here.
pub struct ValueStream {
    name: String,
    inner: Mutex<BoxStream<'static, Result<Value>>>,
}

impl ValueStream {
    pub fn new(name: impl Into<String>, stream: BoxStream<'static, Result<Value>>) -> Self {
        Self {
            name: name.into(),
            inner: Mutex::new(stream),
        }
    }

    pub fn from_values(name: impl Into<String>, values: Vec<Value>) -> Self {
        Self::new(name, stream::iter(values.into_iter().map(Ok)).boxed())
    }

    pub async fn next(&self) -> Result<Option<Value>> {
        let mut inner = self.inner.lock().await;
        inner.next().await.transpose()
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for ValueStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<iterator {}>", self.name)
    }
}
