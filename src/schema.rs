// Diesel table definitions. Kept in sync by hand with `DbContext::init_schema`.

diesel::table! {
    users (id) {
        id -> Text,
        name -> Text,
        email -> Text,
        password_hash -> Text,
        role -> Text,
        bio -> Nullable<Text>,
        skills -> Text,
        city -> Nullable<Text>,
        lat -> Nullable<Double>,
        lng -> Nullable<Double>,
        avatar_url -> Nullable<Text>,
        rating_avg -> Double,
        rating_count -> Integer,
        banned -> Bool,
        created_at -> Text,
        updated_at -> Text,
    }
}

diesel::table! {
    sessions (token_hash) {
        token_hash -> Text,
        user_id -> Text,
        created_at -> Text,
        expires_at -> Text,
    }
}

diesel::table! {
    help_requests (id) {
        id -> Text,
        requester_id -> Text,
        helper_id -> Nullable<Text>,
        title -> Text,
        description -> Text,
        category -> Text,
        urgency -> Text,
        status -> Text,
        lat -> Double,
        lng -> Double,
        address_hint -> Nullable<Text>,
        image_urls -> Text,
        created_at -> Text,
        updated_at -> Text,
        completed_at -> Nullable<Text>,
    }
}

diesel::table! {
    applications (id) {
        id -> Text,
        request_id -> Text,
        helper_id -> Text,
        message -> Nullable<Text>,
        status -> Text,
        created_at -> Text,
        updated_at -> Text,
    }
}

diesel::table! {
    messages (id) {
        id -> Text,
        request_id -> Text,
        sender_id -> Text,
        body -> Text,
        created_at -> Text,
    }
}

diesel::table! {
    reviews (id) {
        id -> Text,
        request_id -> Text,
        reviewer_id -> Text,
        reviewee_id -> Text,
        rating -> Integer,
        comment -> Nullable<Text>,
        created_at -> Text,
    }
}

diesel::table! {
    reports (id) {
        id -> Text,
        reporter_id -> Text,
        target_kind -> Text,
        target_id -> Text,
        reason -> Text,
        status -> Text,
        resolution -> Nullable<Text>,
        created_at -> Text,
        resolved_at -> Nullable<Text>,
        resolved_by -> Nullable<Text>,
    }
}

diesel::table! {
    notifications (id) {
        id -> Text,
        user_id -> Text,
        kind -> Text,
        payload -> Text,
        read -> Bool,
        created_at -> Text,
    }
}

diesel::allow_tables_to_appear_in_same_query!(
    users,
    sessions,
    help_requests,
    applications,
    messages,
    reviews,
    reports,
    notifications,
);
