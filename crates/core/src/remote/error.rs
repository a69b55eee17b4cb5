use crate::remote::Method;
use std::fmt;

/// A request reached the backend and came back with a non-2xx status.
#[derive(Debug, Clone)]
pub struct RemoteFailure {
    pub method: Method,
    pub path: String,
    pub status: u16,
    pub body: String,
}

impl RemoteFailure {
    /// The backend answers a duplicate watchlist insert with 400 ("Stock already in
    /// watchlist"); 409 is accepted as well.
    pub fn is_conflict(&self) -> bool {
        matches!(self.status, 400 | 409)
    }

    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }
}

impl fmt::Display for RemoteFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "backend error (method={}, path={}, status={}): {}",
            self.method, self.path, self.status, self.body
        )
    }
}

impl std::error::Error for RemoteFailure {}

pub fn is_conflict(err: &anyhow::Error) -> bool {
    err.downcast_ref::<RemoteFailure>()
        .is_some_and(RemoteFailure::is_conflict)
}

pub fn is_not_found(err: &anyhow::Error) -> bool {
    err.downcast_ref::<RemoteFailure>()
        .is_some_and(RemoteFailure::is_not_found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    fn failure(status: u16) -> RemoteFailure {
        RemoteFailure {
            method: Method::Post,
            path: "/api/watchlist".to_string(),
            status,
            body: "{}".to_string(),
        }
    }

    #[test]
    fn conflict_survives_added_context() {
        let err = anyhow::Error::from(failure(400));
        let err = Err::<(), _>(err).context("add to watchlist").unwrap_err();
        assert!(is_conflict(&err));
    }

    #[test]
    fn server_errors_are_not_conflicts() {
        assert!(!is_conflict(&anyhow::Error::from(failure(500))));
        assert!(!is_conflict(&anyhow::anyhow!("connection refused")));
        assert!(failure(404).is_not_found());
        assert!(is_not_found(&anyhow::Error::from(failure(404))));
        assert!(!is_not_found(&anyhow::anyhow!("timed out")));
    }
}
