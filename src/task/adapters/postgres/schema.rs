//! Diesel schema for task persistence.

diesel::table! {
    /// Authoritative task records.
    tasks (id) {
        /// Store-assigned task identifier.
        id -> Int8,
        /// Submitting requester.
        user_id -> Int8,
        /// Current or final solver.
        solver_id -> Nullable<Int8>,
        /// CAPTCHA kind.
        #[max_length = 32]
        captcha_type -> Varchar,
        /// Site key.
        sitekey -> Text,
        /// Target URL.
        target_url -> Text,
        /// Solution token.
        captcha_response -> Nullable<Text>,
        /// Lifecycle status.
        #[max_length = 16]
        status -> Varchar,
        /// Failure reason.
        error_message -> Nullable<Text>,
        /// Number of successful claims.
        attempts -> Int4,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last update timestamp.
        updated_at -> Timestamptz,
    }
}
