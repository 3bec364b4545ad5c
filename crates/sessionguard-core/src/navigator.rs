//! Route notifications issued on login and logout.

/// Fire-and-forget "replace the current view with `route`" sink.
///
/// Called after the session manager has released its state lock, so an
/// implementation may query the manager.
pub trait Navigator: Send + Sync {
    fn replace(&self, route: &str);
}

impl<F> Navigator for F
where
    F: Fn(&str) + Send + Sync,
{
    fn replace(&self, route: &str) {
        self(route)
    }
}
