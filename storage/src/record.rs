//! The [`Record`] trait every stored entity implements.

use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;

/// An entity owned by one user, identified by an immutable string id.
///
/// `updated_at` never moves backwards; [`touch`](Record::touch) guarantees a strictly later value
/// even when the clock has not advanced since the last mutation.
pub trait Record: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Partial update: fields that are `Some` are applied, the rest are left alone.
    type Patch: Send;

    fn id(&self) -> &str;
    fn owner_id(&self) -> i64;
    fn created_at(&self) -> DateTime<Utc>;
    fn updated_at(&self) -> DateTime<Utc>;
    fn set_updated_at(&mut self, at: DateTime<Utc>);

    /// Applies the present fields of `patch`. An error leaves the stored record untouched.
    fn apply(&mut self, patch: Self::Patch) -> Result<()>;

    /// Bumps `updated_at` to now, or 1µs past the previous value if the clock lags.
    fn touch(&mut self) {
        let now = Utc::now();
        let prev = self.updated_at();
        let next = if now > prev {
            now
        } else {
            prev + Duration::microseconds(1)
        };
        self.set_updated_at(next);
    }
}
