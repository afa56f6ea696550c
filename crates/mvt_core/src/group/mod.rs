//! Named visibility/color buckets toggled together.

pub mod visibility;
