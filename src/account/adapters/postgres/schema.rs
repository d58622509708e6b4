//! Diesel schema for the accounts owned by the web application.

diesel::table! {
    /// Application users; only the columns read by the dispatcher are mapped.
    users (id) {
        /// Account identifier.
        id -> Int8,
        /// Display username.
        username -> Text,
        /// Account role.
        role -> Text,
        /// API key used by programmatic callers.
        api_key -> Nullable<Text>,
        /// Account balance.
        balance -> Float8,
    }
}
