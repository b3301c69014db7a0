//! Pure classifiers shared by every adapter: where a job is, what kind of
//! role it is, and the per-adapter policy that combines the two.

pub mod location;
pub mod policy;
pub mod title;

pub use location::{CountryFilter, infer_countries, is_allowed, normalize_country};
pub use policy::{FilterPolicy, KeywordMode, TitleVerdict};
