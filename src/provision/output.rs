//! Apply-time resource outputs.
//!
//! Resource identities (account names, keys, SAS tokens) do not exist until
//! the engine realizes the resource, so every consumer holds an [`Output`]:
//! a lazy, clonable handle that resolves once and is shared by everyone who
//! awaits it. Derived values are built with [`Output::map`] and the
//! [`join2`]/[`join4`] combinators, which also carry the dependency edges
//! the stack records in its graph.

use futures_util::future::{BoxFuture, FutureExt, Shared};
use petgraph::graph::NodeIndex;
use thiserror::Error;
use tokio::sync::oneshot;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OutputError {
    #[error("output '{0}' was never resolved")]
    Unresolved(String),
}

/// A value produced by a resource at apply time.
pub struct Output<T: Clone> {
    inner: Shared<BoxFuture<'static, Result<T, OutputError>>>,
    deps: Vec<NodeIndex>,
}

impl<T: Clone> Clone for Output<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            deps: self.deps.clone(),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Output<T> {
    /// An output that is already known (a literal input).
    pub fn resolved(value: T) -> Self {
        Self {
            inner: async move { Ok(value) }.boxed().shared(),
            deps: Vec::new(),
        }
    }

    /// An output the engine resolves later. Dropping the [`Resolver`]
    /// without resolving surfaces [`OutputError::Unresolved`] to every
    /// consumer instead of hanging them.
    pub fn pending(name: impl Into<String>) -> (Resolver<T>, Self) {
        let name = name.into();
        let (tx, rx) = oneshot::channel();
        let inner = async move { rx.await.map_err(|_| OutputError::Unresolved(name)) }
            .boxed()
            .shared();
        (
            Resolver { tx },
            Self {
                inner,
                deps: Vec::new(),
            },
        )
    }

    /// Waits for the resolved value.
    pub async fn get(&self) -> Result<T, OutputError> {
        self.inner.clone().await
    }

    /// Derives a new output; the derivation runs only once the source has
    /// resolved, and the source's dependencies carry over.
    pub fn map<U, F>(&self, f: F) -> Output<U>
    where
        U: Clone + Send + Sync + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        let inner = self.inner.clone();
        Output {
            inner: async move { inner.await.map(f) }.boxed().shared(),
            deps: self.deps.clone(),
        }
    }

    /// Resource nodes this output (transitively) depends on.
    pub fn deps(&self) -> &[NodeIndex] {
        &self.deps
    }

    pub(crate) fn with_deps(mut self, deps: Vec<NodeIndex>) -> Self {
        self.deps = deps;
        self
    }
}

/// Resolves one pending output; consumed on use.
pub struct Resolver<T> {
    tx: oneshot::Sender<T>,
}

impl<T> Resolver<T> {
    pub fn resolve(self, value: T) {
        let _ = self.tx.send(value);
    }
}

/// Joins two outputs; the pair resolves when both have resolved.
pub fn join2<A, B>(a: &Output<A>, b: &Output<B>) -> Output<(A, B)>
where
    A: Clone + Send + Sync + 'static,
    B: Clone + Send + Sync + 'static,
{
    let (fa, fb) = (a.inner.clone(), b.inner.clone());
    Output {
        inner: async move { futures_util::try_join!(fa, fb) }.boxed().shared(),
        deps: merge_deps(&[a.deps(), b.deps()]),
    }
}

/// Joins four outputs; used for the package-URL computation, which needs
/// account, container, blob and SAS token at once.
pub fn join4<A, B, C, D>(
    a: &Output<A>,
    b: &Output<B>,
    c: &Output<C>,
    d: &Output<D>,
) -> Output<(A, B, C, D)>
where
    A: Clone + Send + Sync + 'static,
    B: Clone + Send + Sync + 'static,
    C: Clone + Send + Sync + 'static,
    D: Clone + Send + Sync + 'static,
{
    let (fa, fb, fc, fd) = (
        a.inner.clone(),
        b.inner.clone(),
        c.inner.clone(),
        d.inner.clone(),
    );
    Output {
        inner: async move { futures_util::try_join!(fa, fb, fc, fd) }
            .boxed()
            .shared(),
        deps: merge_deps(&[a.deps(), b.deps(), c.deps(), d.deps()]),
    }
}

fn merge_deps(sources: &[&[NodeIndex]]) -> Vec<NodeIndex> {
    let mut merged: Vec<NodeIndex> = Vec::new();
    for source in sources {
        for dep in *source {
            if !merged.contains(dep) {
                merged.push(*dep);
            }
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolved_output_is_immediately_available() {
        let output = Output::resolved("value".to_string());
        assert_eq!(output.get().await.unwrap(), "value");
    }

    #[tokio::test]
    async fn pending_output_waits_for_its_resolver() {
        let (resolver, output) = Output::pending("account.name");
        resolver.resolve("storacct".to_string());
        assert_eq!(output.get().await.unwrap(), "storacct");
    }

    #[tokio::test]
    async fn every_clone_sees_the_same_resolution() {
        let (resolver, output) = Output::pending("account.name");
        let other = output.clone();
        resolver.resolve("storacct".to_string());
        assert_eq!(output.get().await.unwrap(), "storacct");
        assert_eq!(other.get().await.unwrap(), "storacct");
    }

    #[tokio::test]
    async fn dropped_resolver_yields_unresolved_error() {
        let (resolver, output) = Output::<String>::pending("account.key");
        drop(resolver);
        assert_eq!(
            output.get().await.unwrap_err(),
            OutputError::Unresolved("account.key".to_string())
        );
    }

    #[tokio::test]
    async fn map_derives_lazily() {
        let (resolver, output) = Output::pending("container.name");
        let derived = output.map(|name: String| format!("/blob/{}", name));
        resolver.resolve("app-container".to_string());
        assert_eq!(derived.get().await.unwrap(), "/blob/app-container");
    }

    #[tokio::test]
    async fn join4_preserves_argument_order() {
        let (ra, a) = Output::pending("a");
        let (rb, b) = Output::pending("b");
        let joined = join4(&a, &b, &Output::resolved("c".to_string()), &Output::resolved("d".to_string()));
        rb.resolve("2".to_string());
        ra.resolve("1".to_string());
        assert_eq!(
            joined.get().await.unwrap(),
            ("1".to_string(), "2".to_string(), "c".to_string(), "d".to_string())
        );
    }

    #[tokio::test]
    async fn join_fails_if_any_input_is_unresolved() {
        let (resolver, a) = Output::pending("a");
        let (dropped, b) = Output::<String>::pending("b");
        drop(dropped);
        let joined = join2(&a, &b);
        resolver.resolve("1".to_string());
        assert!(joined.get().await.is_err());
    }
}
