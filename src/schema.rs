diesel::table! {
    users (id) {
        id -> Uuid,
        email -> Text,
        token -> Nullable<VarChar>,
        is_admin -> Bool,
    }
}

diesel::table! {
    stations (id) {
        id -> Integer,
        name -> Text,
        latitude -> Nullable<Double>,
        longitude -> Nullable<Double>,
    }
}

diesel::table! {
    routes (id) {
        id -> Integer,
        source_id -> Integer,
        destination_id -> Integer,
        distance -> Integer,
    }
}

diesel::table! {
    train_types (id) {
        id -> Integer,
        name -> Text,
    }
}

diesel::table! {
    trains (id) {
        id -> Integer,
        name -> Text,
        cargo_num -> Integer,
        places_in_cargo -> Integer,
        train_type_id -> Integer,
    }
}

diesel::table! {
    crew (id) {
        id -> Integer,
        first_name -> Text,
        last_name -> Text,
    }
}

diesel::table! {
    trips (id) {
        id -> Integer,
        route_id -> Integer,
        train_id -> Integer,
        departure_time -> Timestamptz,
        arrival_time -> Timestamptz,
    }
}

diesel::table! {
    orders (id) {
        id -> Integer,
        created_at -> Timestamptz,
        user_id -> Uuid,
    }
}

diesel::table! {
    tickets (id) {
        id -> Integer,
        cargo -> Integer,
        seat -> Integer,
        trip_id -> Integer,
        order_id -> Integer,
    }
}

diesel::joinable!(trains -> train_types (train_type_id));
diesel::joinable!(trips -> routes (route_id));
diesel::joinable!(trips -> trains (train_id));
diesel::joinable!(tickets -> trips (trip_id));
diesel::joinable!(tickets -> orders (order_id));
diesel::joinable!(orders -> users (user_id));

diesel::allow_tables_to_appear_in_same_query!(
    users,
    stations,
    routes,
    train_types,
    trains,
    crew,
    trips,
    orders,
    tickets,
);
